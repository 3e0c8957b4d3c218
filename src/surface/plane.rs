//! Half-space defined by a unit normal and signed distance from the origin.
//!
//! Grounded on `original_source/core/geometry/surface/plane.hpp`.

use crate::aabb::{BoundingBox, MAX_EXTENT};
use crate::vecmath::{invalid_point, is_dependent, same_double, Matrix4, Point, EPS};

use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Copy, Debug)]
pub enum NormalType {
    /// `normal_` points toward the forward region (the common case).
    Outward,
    /// `normal_` points away from the forward region (used by some bounding-plane
    /// constructions, e.g. inward box faces built from a sphere center).
    Inward,
}

/// `normal . p == distance` is the dividing plane; forward is `normal . p >= distance`.
#[derive(Clone, Debug)]
pub struct Plane {
    pub normal: Point,
    pub distance: f64,
}

impl Plane {
    pub fn new(normal: Point, distance: f64) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Plane through `point` with the given normal.
    pub fn through_point(normal: Point, point: Point) -> Self {
        let normal = normal.normalize();
        let distance = normal.dot(&point);
        Self { normal, distance }
    }

    /// Plane through `point`, built from a possibly-inward-facing normal (flips it to
    /// outward first), matching the `(normal, point, NormalType)` constructor.
    pub fn through_point_typed(normal: Point, point: Point, kind: NormalType) -> Self {
        let normal = match kind {
            NormalType::Outward => normal,
            NormalType::Inward => -normal,
        };
        Self::through_point(normal, point)
    }

    /// Plane through three non-collinear points, right-hand oriented by `(b-a)x(c-a)`.
    pub fn through_three_points(a: Point, b: Point, c: Point) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        if normal.norm() < EPS {
            return None;
        }
        Some(Self::through_point(normal, a))
    }

    /// Orthogonal projection of `p` onto this plane.
    pub fn projection(&self, p: &Point) -> Point {
        p - self.normal * (self.normal.dot(p) - self.distance)
    }

    /// Signed perpendicular distance from `p` to the plane (positive on the forward side).
    pub fn signed_distance(&self, p: &Point) -> f64 {
        self.normal.dot(p) - self.distance
    }

    /// Intersection point of three planes, or `None` if any pair is parallel /
    /// degenerate (Cramer's rule on the 3x3 normal matrix).
    pub fn intersection_of_three(a: &Plane, b: &Plane, c: &Plane) -> Option<Point> {
        let m = nalgebra::Matrix3::from_rows(&[
            a.normal.transpose(),
            b.normal.transpose(),
            c.normal.transpose(),
        ]);
        let rhs = Point::new(a.distance, b.distance, c.distance);
        m.try_inverse().map(|inv| inv * rhs)
    }

    /// The half-space `{p : signed_distance(p) >= 0}` as an AABB (infinite in the two
    /// directions tangent to the plane, bounded along the normal).
    pub fn half_space_bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::universal();
        let axis = if self.normal.x.abs() > 1.0 - EPS {
            0
        } else if self.normal.y.abs() > 1.0 - EPS {
            1
        } else if self.normal.z.abs() > 1.0 - EPS {
            2
        } else {
            return bb; // non-axis-aligned plane: no tighter AABB available
        };
        let bound = self.distance / self.normal[axis];
        if self.normal[axis] > 0.0 {
            bb.min[axis] = bound.max(-MAX_EXTENT);
        } else {
            bb.max[axis] = bound.min(MAX_EXTENT);
        }
        bb
    }
}

impl SurfaceOps for Plane {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let forward = self.signed_distance(point) >= 0.0;
        forward != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        let denom = self.normal.dot(direction);
        if same_double(denom, 0.0) {
            return invalid_point();
        }
        let t = (self.distance - self.normal.dot(point)) / denom;
        if t <= EPS {
            return invalid_point();
        }
        point + direction * t
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        let p0 = self.normal * self.distance;
        let new_p0 = matrix.transform_point(&p0);
        let new_normal = matrix.transform_vector(&self.normal).normalize();
        self.distance = new_normal.dot(&new_p0);
        self.normal = new_normal;
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        vec![vec![self.clone()]]
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        let effective = if reversed {
            Plane::new(-self.normal, -self.distance)
        } else {
            self.clone()
        };
        effective.half_space_bounding_box()
    }
}

/// True if `v` is (anti)parallel to `normal` — used while deciding whether a lattice
/// axis aligns with a cylinder/cone's canonical frame.
pub fn is_axis_aligned(v: &Point, normal: &Point) -> bool {
    is_dependent(v, normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_side_is_normal_direction() {
        let p = Plane::new(Point::new(0.0, 0.0, 1.0), 2.0);
        assert!(p.is_forward(&Point::new(0.0, 0.0, 5.0), false));
        assert!(!p.is_forward(&Point::new(0.0, 0.0, -5.0), false));
    }

    #[test]
    fn reversed_flips_forward() {
        let p = Plane::new(Point::new(0.0, 0.0, 1.0), 2.0);
        assert!(!p.is_forward(&Point::new(0.0, 0.0, 5.0), true));
    }

    #[test]
    fn ray_intersects_plane_ahead_only() {
        let p = Plane::new(Point::new(1.0, 0.0, 0.0), 5.0);
        let hit = p.intersect(&Point::new(0.0, 0.0, 0.0), &Point::new(1.0, 0.0, 0.0));
        assert!(crate::vecmath::same_point(&hit, &Point::new(5.0, 0.0, 0.0)));
        let behind = p.intersect(&Point::new(10.0, 0.0, 0.0), &Point::new(1.0, 0.0, 0.0));
        assert!(!crate::vecmath::is_valid(&behind));
    }

    #[test]
    fn three_plane_intersection_recovers_corner() {
        let a = Plane::new(Point::new(1.0, 0.0, 0.0), 1.0);
        let b = Plane::new(Point::new(0.0, 1.0, 0.0), 2.0);
        let c = Plane::new(Point::new(0.0, 0.0, 1.0), 3.0);
        let corner = Plane::intersection_of_three(&a, &b, &c).unwrap();
        assert!(crate::vecmath::same_point(&corner, &Point::new(1.0, 2.0, 3.0)));
    }
}
