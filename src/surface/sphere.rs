//! Sphere primitive: center + radius.
//!
//! Grounded on `original_source/core/geometry/surface/sphere.cpp`.

use crate::aabb::BoundingBox;
use crate::vecmath::{invalid_point, same_double, Matrix4, Point, EPS};

use super::plane::Plane;
use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: Point,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point, radius: f64) -> Self {
        assert!(radius > 0.0, "sphere radius must be positive");
        Self { center, radius }
    }
}

impl SurfaceOps for Sphere {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let outside = self.radius - (point - self.center).norm() < 0.0;
        outside != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        // |point + t*dir - center|^2 = r^2, solved for t.
        let d = direction.normalize();
        let oc = point - self.center;
        let b = 2.0 * oc.dot(&d);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * c;
        if discriminant < 0.0 {
            return invalid_point();
        }
        let sqrt_disc = discriminant.sqrt();
        let t_minus = 0.5 * (-b - sqrt_disc);
        let t_plus = 0.5 * (-b + sqrt_disc);

        // Grazing tangent point: treat as a single (non-)intersection rather than two
        // near-identical roots, following sphere.cpp's isSameDouble check.
        if same_double(t_minus, t_plus) {
            return if t_minus > EPS {
                point + d * t_minus
            } else {
                invalid_point()
            };
        }
        // Prefer the nearest forward root; fall back to the farther one if the near
        // one is behind the ray origin (inside the sphere looking out).
        if t_minus > EPS {
            point + d * t_minus
        } else if t_plus > EPS {
            point + d * t_plus
        } else {
            invalid_point()
        }
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        self.center = matrix.transform_point(&self.center);
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        let axes = [
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
        ];
        // Circumscribed box: six outward planes, OR'd (each is its own singleton group).
        let f = 0.5 * 2.0f64.sqrt();
        let mut groups = Vec::with_capacity(6);
        for axis in axes {
            for sign in [1.0, -1.0] {
                let n = axis * sign;
                groups.push(vec![Plane::through_point(n, self.center + n * (f * self.radius))]);
            }
        }
        groups
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        if reversed {
            BoundingBox::universal()
        } else {
            BoundingBox::new(
                self.center.x - self.radius,
                self.center.x + self.radius,
                self.center.y - self.radius,
                self.center.y + self.radius,
                self.center.z - self.radius,
                self.center.z + self.radius,
            )
        }
    }
}

/// Reversed (inward) sphere bounding planes: the inscribed box, AND'd into a single
/// group, used directly by [`SurfaceOps::bounding_planes`] callers that need the
/// reversed view (the cell pipeline always asks for both signs of a surface).
pub fn reversed_bounding_planes(sphere: &Sphere) -> BoundingPlaneGroups {
    let axes = [
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
    ];
    let mut group = Vec::with_capacity(6);
    for axis in axes {
        for sign in [1.0, -1.0] {
            let n = axis * sign;
            group.push(Plane::through_point(-n, sphere.center + n * sphere.radius));
        }
    }
    vec![group]
}
