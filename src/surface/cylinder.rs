//! Infinite cylinder: reference point on the axis, unit axis direction, radius.
//!
//! Grounded on `original_source/core/geometry/surface/cylinder.cpp`.

use crate::aabb::{BoundingBox, MAX_EXTENT};
use crate::vecmath::{invalid_point, is_dependent, is_valid, two_orthogonal_unit_vectors, Matrix4, Point, EPS};

use super::plane::Plane;
use super::sphere::Sphere;
use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Debug)]
pub struct Cylinder {
    pub ref_point: Point,
    pub axis: Point,
    pub radius: f64,
}

impl Cylinder {
    pub fn new(ref_point: Point, axis: Point, radius: f64) -> Self {
        Self {
            ref_point,
            axis: axis.normalize(),
            radius,
        }
    }

    fn perpendicular_offset(&self, p: &Point) -> Point {
        let rel = p - self.ref_point;
        rel - self.axis * self.axis.dot(&rel)
    }
}

impl SurfaceOps for Cylinder {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let outside = self.perpendicular_offset(point).norm() >= self.radius;
        outside != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        if is_dependent(direction, &self.axis) {
            return invalid_point();
        }
        // Project onto the plane perpendicular to the axis through `point`, solve the
        // 2D circle intersection there, then lift the result back along the ray.
        let alpha_plane = Plane::new(self.axis, self.axis.dot(point));
        let p_a = alpha_plane.projection(point);
        let p0_a = alpha_plane.projection(&self.ref_point);
        let d_a = alpha_plane.projection(&(direction + point)) - p_a;

        if d_a.norm() < EPS {
            return invalid_point();
        }

        let sp = Sphere::new(p0_a, self.radius);
        let section_a = sp.intersect(point, &d_a);
        if !is_valid(&section_a) {
            return invalid_point();
        }

        let dir_norm = direction.normalize();
        let cosine = dir_norm.dot(&d_a.normalize());
        if cosine.abs() < EPS {
            return invalid_point();
        }
        point + dir_norm * ((section_a - point).norm() / cosine)
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        self.ref_point = matrix.transform_point(&self.ref_point);
        self.axis = matrix.transform_vector(&self.axis).normalize();
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        let (v1, v2) = two_orthogonal_unit_vectors(&self.axis);
        let n1p = v1;
        let n1m = -v1;
        let n2p = v2;
        let n2m = -v2;
        let f = 0.5 * 2.0f64.sqrt();
        vec![
            vec![Plane::through_point(n1p, self.ref_point + n1p * (f * self.radius))],
            vec![Plane::through_point(n1m, self.ref_point + n1m * (f * self.radius))],
            vec![Plane::through_point(n2p, self.ref_point + n2p * (f * self.radius))],
            vec![Plane::through_point(n2m, self.ref_point + n2m * (f * self.radius))],
        ]
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        if !reversed {
            // Outside-the-cylinder region is unbounded.
            return BoundingBox::universal();
        }
        let x_axis = Point::new(1.0, 0.0, 0.0);
        let y_axis = Point::new(0.0, 1.0, 0.0);
        let z_axis = Point::new(0.0, 0.0, 1.0);
        if is_dependent(&self.axis, &x_axis) {
            BoundingBox::new(
                -MAX_EXTENT,
                MAX_EXTENT,
                self.ref_point.y - self.radius,
                self.ref_point.y + self.radius,
                self.ref_point.z - self.radius,
                self.ref_point.z + self.radius,
            )
        } else if is_dependent(&self.axis, &y_axis) {
            BoundingBox::new(
                self.ref_point.x - self.radius,
                self.ref_point.x + self.radius,
                -MAX_EXTENT,
                MAX_EXTENT,
                self.ref_point.z - self.radius,
                self.ref_point.z + self.radius,
            )
        } else if is_dependent(&self.axis, &z_axis) {
            BoundingBox::new(
                self.ref_point.x - self.radius,
                self.ref_point.x + self.radius,
                self.ref_point.y - self.radius,
                self.ref_point.y + self.radius,
                -MAX_EXTENT,
                MAX_EXTENT,
            )
        } else {
            BoundingBox::universal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_aligned_point_is_inside() {
        let c = Cylinder::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 1.0), 1.0);
        assert!(!c.is_forward(&Point::new(0.5, 0.0, 100.0), false));
        assert!(c.is_forward(&Point::new(5.0, 0.0, 0.0), false));
    }

    #[test]
    fn ray_perpendicular_to_axis_hits_radius() {
        let c = Cylinder::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 1.0), 2.0);
        let hit = c.intersect(&Point::new(-10.0, 0.0, 0.0), &Point::new(1.0, 0.0, 0.0));
        assert!(is_valid(&hit));
        assert!(crate::vecmath::same_double(hit.x, -2.0));
    }

    #[test]
    fn ray_parallel_to_axis_never_hits() {
        let c = Cylinder::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 1.0), 1.0);
        let hit = c.intersect(&Point::new(5.0, 0.0, 0.0), &Point::new(0.0, 0.0, 1.0));
        assert!(!is_valid(&hit));
    }
}
