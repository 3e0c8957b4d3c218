//! Single planar triangle, used both standalone and as a building block of
//! [`super::polyhedron::Polyhedron`].
//!
//! Grounded on `original_source/core/geometry/surface/triangle.hpp`: three vertices plus
//! a cached normal, clockwise-is-forward by convention, with an edge-hit-aware
//! intersection query (`getIntersection2` in the original) used by the polyhedron to
//! avoid double-counting a ray that grazes a shared edge.

use crate::aabb::BoundingBox;
use crate::vecmath::{invalid_point, is_valid, Matrix4, Point, EPS};

use super::plane::Plane;
use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Debug)]
pub struct Triangle {
    pub vertices: [Point; 3],
    pub normal: Point,
}

impl Triangle {
    /// Builds from three vertices; `ccw` selects whether they are wound
    /// counter-clockwise (as seen from the forward side) or clockwise (the deck
    /// convention default).
    pub fn new(vertices: [Point; 3], ccw: bool) -> Self {
        let [a, b, c] = vertices;
        let raw_normal = (b - a).cross(&(c - a));
        let normal = if ccw { raw_normal } else { -raw_normal };
        Self {
            vertices,
            normal: normal.normalize(),
        }
    }

    pub fn center(&self) -> Point {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }

    fn plane(&self) -> Plane {
        Plane::through_point(self.normal, self.vertices[0])
    }

    /// Barycentric membership test for a point already known to lie on the triangle's plane.
    fn contains_coplanar_point(&self, p: &Point) -> bool {
        let [a, b, c] = self.vertices;
        let v0 = c - a;
        let v1 = b - a;
        let v2 = p - a;
        let dot00 = v0.dot(&v0);
        let dot01 = v0.dot(&v1);
        let dot02 = v0.dot(&v2);
        let dot11 = v1.dot(&v1);
        let dot12 = v1.dot(&v2);
        let denom = dot00 * dot11 - dot01 * dot01;
        if denom.abs() < EPS {
            return false;
        }
        let inv_denom = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
        let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;
        u >= -EPS && v >= -EPS && (u + v) <= 1.0 + EPS
    }

    /// Like [`SurfaceOps::intersect`] but also reports whether the hit landed on an edge
    /// (within tolerance), mirroring `getIntersection2`'s `(onEdge, point)` pair.
    pub fn intersect_with_edge_flag(&self, point: &Point, direction: &Point) -> (bool, Point) {
        let hit = self.plane().intersect(point, direction);
        if !is_valid(&hit) || !self.contains_coplanar_point(&hit) {
            return (false, invalid_point());
        }
        let on_edge = [0, 1, 2].iter().any(|&i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % 3];
            let edge = b - a;
            let to_hit = hit - a;
            let cross = edge.cross(&to_hit);
            cross.norm() < EPS && to_hit.dot(&edge) >= -EPS && to_hit.dot(&edge) <= edge.dot(&edge) + EPS
        });
        (on_edge, hit)
    }
}

impl SurfaceOps for Triangle {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let forward = self.plane().signed_distance(point) >= 0.0;
        forward != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        // A ray landing exactly on an edge is treated as a miss, matching the
        // original's `getIntersection` (the edge-aware variant is
        // `intersect_with_edge_flag`, used by the polyhedron assembly).
        let hit = self.plane().intersect(point, direction);
        if is_valid(&hit) && self.contains_coplanar_point(&hit) {
            hit
        } else {
            invalid_point()
        }
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        for v in &mut self.vertices {
            *v = matrix.transform_point(v);
        }
        self.normal = matrix.transform_vector(&self.normal).normalize();
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        vec![vec![self.plane()]]
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        if reversed {
            BoundingBox::universal()
        } else {
            BoundingBox::from_points(&self.vertices)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_inside_triangle_is_detected() {
        let tri = Triangle::new(
            [
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            true,
        );
        assert!(tri.contains_coplanar_point(&Point::new(0.2, 0.2, 0.0)));
        assert!(!tri.contains_coplanar_point(&Point::new(2.0, 2.0, 0.0)));
    }

    #[test]
    fn ray_through_triangle_hits_it() {
        let tri = Triangle::new(
            [
                Point::new(-1.0, -1.0, 0.0),
                Point::new(1.0, -1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            true,
        );
        let hit = tri.intersect(&Point::new(0.0, 0.0, -5.0), &Point::new(0.0, 0.0, 1.0));
        assert!(is_valid(&hit));
    }

    #[test]
    fn ray_missing_triangle_plane_area_is_invalid() {
        let tri = Triangle::new(
            [
                Point::new(-1.0, -1.0, 0.0),
                Point::new(1.0, -1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            true,
        );
        let hit = tri.intersect(&Point::new(5.0, 5.0, -5.0), &Point::new(0.0, 0.0, 1.0));
        assert!(!is_valid(&hit));
    }
}
