//! Torus of revolution: placed by an affine transform away from its canonical,
//! origin-centered, z-axis-aligned form.
//!
//! Grounded on `original_source/core/geometry/surface/torus.hpp`: canonical fields
//! `center_`/`axis_`/major radius `R`/minor semi-axes `a`,`b`, with a placement
//! transform and its inverse cached alongside so every query can work in the simple
//! canonical frame and transform the result back out.

use crate::aabb::BoundingBox;
use crate::vecmath::{invalid_point, is_valid, Matrix4, Point, EPS};

use super::{BoundingPlaneGroups, SurfaceOps};

/// A torus with major radius `r_major` and minor semi-axes `a` (in-plane) / `b` (axial),
/// placed in world space by `to_world` (canonical form is centered at the origin, axis
/// along +z). `a == b` gives a surface of circular cross-section.
#[derive(Clone, Debug)]
pub struct Torus {
    pub r_major: f64,
    pub a: f64,
    pub b: f64,
    pub to_world: Matrix4,
    pub to_local: Matrix4,
}

impl Torus {
    pub fn new(r_major: f64, a: f64, b: f64, to_world: Matrix4) -> Self {
        let to_local = to_world
            .inverse()
            .expect("torus placement transform must be invertible");
        Self {
            r_major,
            a,
            b,
            to_world,
            to_local,
        }
    }

    /// Canonical implicit value: `<0` inside the tube, `0` on the surface, `>0` outside.
    fn canonical_value(&self, local: &Point) -> f64 {
        let rho = (local.x * local.x + local.y * local.y).sqrt();
        let u = (rho - self.r_major) / self.a;
        let v = local.z / self.b;
        u * u + v * v - 1.0
    }
}

impl SurfaceOps for Torus {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let local = self.to_local.transform_point(point);
        let outside = self.canonical_value(&local) >= 0.0;
        outside != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        // Solve the canonical quartic numerically: march along the ray in local space
        // with a coarse-to-fine bisection, which is robust for the torus's
        // non-polynomial-in-one-variable implicit form once `a != b`.
        let local_p = self.to_local.transform_point(point);
        let local_d = self.to_local.transform_vector(direction).normalize();

        let max_extent = self.r_major + self.a.max(self.b) + 1.0;
        let step = (self.a.min(self.b) / 8.0).max(1e-4);
        let max_t = 4.0 * max_extent;

        let mut t = EPS;
        let mut prev_val = self.canonical_value(&(local_p + local_d * t));
        t += step;
        while t < max_t {
            let val = self.canonical_value(&(local_p + local_d * t));
            if prev_val.signum() != val.signum() {
                // Bisect between t-step and t for a tighter root.
                let mut lo = t - step;
                let mut hi = t;
                let mut lo_val = prev_val;
                for _ in 0..40 {
                    let mid = 0.5 * (lo + hi);
                    let mid_val = self.canonical_value(&(local_p + local_d * mid));
                    if mid_val.signum() == lo_val.signum() {
                        lo = mid;
                        lo_val = mid_val;
                    } else {
                        hi = mid;
                    }
                }
                let root = 0.5 * (lo + hi);
                return point + direction.normalize() * root;
            }
            prev_val = val;
            t += step;
        }
        invalid_point()
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        self.to_world = self.to_world.then(matrix);
        self.to_local = self
            .to_world
            .inverse()
            .expect("composed torus transform must remain invertible");
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        // A torus's exact bounding region is not plane-expressible; its contribution to
        // the medium tier of §4.5 is the rough box reinterpreted as six half-space
        // planes, which is the same fallback the original reserves for surfaces with
        // no native `boundingPlanes()` decomposition.
        let bb = self.rough_bounding_box(false);
        let axes = [
            (Point::new(1.0, 0.0, 0.0), bb.max.x),
            (Point::new(-1.0, 0.0, 0.0), -bb.min.x),
            (Point::new(0.0, 1.0, 0.0), bb.max.y),
            (Point::new(0.0, -1.0, 0.0), -bb.min.y),
            (Point::new(0.0, 0.0, 1.0), bb.max.z),
            (Point::new(0.0, 0.0, -1.0), -bb.min.z),
        ];
        axes.into_iter()
            .map(|(n, d)| vec![super::plane::Plane::new(n, d)])
            .collect()
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        if reversed {
            return BoundingBox::universal();
        }
        let outer = self.r_major + self.a;
        let corners = [
            Point::new(outer, outer, self.b),
            Point::new(-outer, -outer, -self.b),
        ];
        let local_bb = BoundingBox::from_points(&corners);
        // Transform the eight corners of the local box into world space and re-enclose,
        // since an arbitrary rotation does not preserve axis alignment.
        let mut world_corners = Vec::with_capacity(8);
        for x in [local_bb.min.x, local_bb.max.x] {
            for y in [local_bb.min.y, local_bb.max.y] {
                for z in [local_bb.min.z, local_bb.max.z] {
                    world_corners.push(self.to_world.transform_point(&Point::new(x, y, z)));
                }
            }
        }
        BoundingBox::from_points(&world_corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_center_of_tube_is_on_surface() {
        let t = Torus::new(5.0, 1.0, 1.0, Matrix4::identity());
        let on_tube = Point::new(5.0, 0.0, 1.0);
        assert!(t.canonical_value(&on_tube).abs() < 1e-9);
    }

    #[test]
    fn far_point_is_forward() {
        let t = Torus::new(5.0, 1.0, 1.0, Matrix4::identity());
        assert!(t.is_forward(&Point::new(100.0, 0.0, 0.0), false));
    }

    #[test]
    fn center_hole_point_is_forward() {
        let t = Torus::new(5.0, 1.0, 1.0, Matrix4::identity());
        assert!(t.is_forward(&Point::new(0.0, 0.0, 0.0), false));
    }

    #[test]
    fn ray_through_tube_hits_something() {
        let t = Torus::new(5.0, 1.0, 1.0, Matrix4::identity());
        let hit = t.intersect(&Point::new(5.0, -10.0, 0.0), &Point::new(0.0, 1.0, 0.0));
        assert!(is_valid(&hit));
    }
}
