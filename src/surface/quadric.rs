//! General quadric surface: `A x^2 + B y^2 + C z^2 + D xy + E xz + F yz + G x + H y + J z + K = 0`.
//!
//! Covers both the `SQ` (axis-aligned, no cross terms) and `GQ` (fully general) deck
//! mnemonics; both reduce to the same ten-coefficient form, matching
//! `original_source/core/geometry/surface/new.quadric/quadric.hpp`'s `A_..K_` fields.

use crate::aabb::BoundingBox;
use crate::vecmath::{invalid_point, Matrix4, Point, EPS};

use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Copy, Debug)]
pub struct Quadric {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub g: f64,
    pub h: f64,
    pub j: f64,
    pub k: f64,
}

impl Quadric {
    #[allow(clippy::too_many_arguments)]
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64, g: f64, h: f64, j: f64, k: f64) -> Self {
        Self { a, b, c, d, e, f, g, h, j, k }
    }

    /// Implicit value at `p`: `< 0` inside, `> 0` outside, by MCNP/PHITS convention.
    pub fn value(&self, p: &Point) -> f64 {
        self.a * p.x * p.x
            + self.b * p.y * p.y
            + self.c * p.z * p.z
            + self.d * p.x * p.y
            + self.e * p.x * p.z
            + self.f * p.y * p.z
            + self.g * p.x
            + self.h * p.y
            + self.j * p.z
            + self.k
    }

    fn gradient(&self, p: &Point) -> Point {
        Point::new(
            2.0 * self.a * p.x + self.d * p.y + self.e * p.z + self.g,
            2.0 * self.b * p.y + self.d * p.x + self.f * p.z + self.h,
            2.0 * self.c * p.z + self.e * p.x + self.f * p.y + self.j,
        )
    }
}

impl SurfaceOps for Quadric {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let outside = self.value(point) >= 0.0;
        outside != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        let d = direction.normalize();
        // Substitute p(t) = point + t*d into value() and collect the t^2, t, const terms.
        let qd = Point::new(
            self.a * d.x + 0.5 * self.d * d.y + 0.5 * self.e * d.z,
            self.b * d.y + 0.5 * self.d * d.x + 0.5 * self.f * d.z,
            self.c * d.z + 0.5 * self.e * d.x + 0.5 * self.f * d.y,
        );
        let a_coef = d.dot(&qd);
        let b_coef = self.gradient(point).dot(&d);
        let c_coef = self.value(point);

        let mut candidates = Vec::new();
        if a_coef.abs() < EPS {
            if b_coef.abs() > EPS {
                candidates.push(-c_coef / b_coef);
            }
        } else {
            let disc = b_coef * b_coef - 4.0 * a_coef * c_coef;
            if disc >= 0.0 {
                let sq = disc.sqrt();
                candidates.push((-b_coef - sq) / (2.0 * a_coef));
                candidates.push((-b_coef + sq) / (2.0 * a_coef));
            }
        }

        let mut best: Option<f64> = None;
        for t in candidates {
            if t > EPS && best.map_or(true, |cur| t < cur) {
                best = Some(t);
            }
        }
        match best {
            Some(t) => point + d * t,
            None => invalid_point(),
        }
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        // General quadrics are re-derived by sampling: transform the implicit function
        // by composing with the inverse transform is exact, but since only
        // rotation+translation (no shear/scale) ever reaches this path (§4.2), the
        // coefficient matrix can be rotated directly: Q' = R^-T Q R^-1 with the linear
        // term and translation folded in via the standard affine-quadric rule.
        let inv = matrix
            .inverse()
            .expect("quadric transform must be invertible");
        let r = inv.rotation;
        let t = inv.translation;
        let quad = nalgebra::Matrix3::new(
            self.a,
            0.5 * self.d,
            0.5 * self.e,
            0.5 * self.d,
            self.b,
            0.5 * self.f,
            0.5 * self.e,
            0.5 * self.f,
            self.c,
        );
        let lin = Point::new(self.g, self.h, self.j);

        let new_quad = r.transpose() * quad * r;
        let new_lin = r.transpose() * (lin + 2.0 * quad * t);
        let new_k = self.k + lin.dot(&t) + (t.transpose() * quad * t)[(0, 0)];

        self.a = new_quad[(0, 0)];
        self.b = new_quad[(1, 1)];
        self.c = new_quad[(2, 2)];
        self.d = 2.0 * new_quad[(0, 1)];
        self.e = 2.0 * new_quad[(0, 2)];
        self.f = 2.0 * new_quad[(1, 2)];
        self.g = new_lin.x;
        self.h = new_lin.y;
        self.j = new_lin.z;
        self.k = new_k;
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        // No closed-form plane decomposition exists for a general quadric; the medium
        // tier of §4.5 falls back to the rough box for these, same as torus.
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

    fn rough_bounding_box(&self, _reversed: bool) -> BoundingBox {
        // A general quadric can be a paraboloid/hyperboloid with genuinely unbounded
        // extent in either sense; without classifying its type there is no safe finite
        // box to offer.
        BoundingBox::universal()
    }
}
