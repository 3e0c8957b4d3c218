//! Right circular cone: apex, unit axis, half-angle. May be a full double nappe or
//! restricted to a single sheet (the `+1`/`-1` sheet selector some deck dialects carry
//! on a `K*` card).
//!
//! Grounded on `original_source/core/geometry/surface/cone.cpp`: the axis tensor
//! `M = axis⊗axis - cos²θ·I` used for the implicit quadratic, and the sheet
//! disambiguation against `axisProjection` when solving for ray intersections.

use crate::aabb::BoundingBox;
use crate::vecmath::{invalid_point, tensor_prod, two_orthogonal_unit_vectors, Matrix4, Point, EPS};

use super::plane::Plane;
use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Debug)]
pub struct Cone {
    pub apex: Point,
    pub axis: Point,
    /// Half-angle in radians, `0 < half_angle < pi/2`.
    pub half_angle: f64,
    /// `Some(sign)` restricts the solid to the nappe on the `sign` side of the apex
    /// along `axis` (matching the original's one-sheet cone variant); `None` is the
    /// full double nappe.
    pub sheet: Option<f64>,
}

impl Cone {
    pub fn new(apex: Point, axis: Point, half_angle: f64, sheet: Option<f64>) -> Self {
        Self {
            apex,
            axis: axis.normalize(),
            half_angle,
            sheet: sheet.map(|s| s.signum()),
        }
    }

    fn cos_theta(&self) -> f64 {
        self.half_angle.cos()
    }

    fn tensor(&self) -> nalgebra::Matrix3<f64> {
        let c2 = self.cos_theta().powi(2);
        tensor_prod(&self.axis, &self.axis) - nalgebra::Matrix3::identity() * c2
    }

    /// Quadratic form value: `> 0` means `p` lies within the half-angle of the axis
    /// (i.e. radially inside the cone's lateral surface), `< 0` means outside it.
    fn quadratic_value(&self, u: &Point) -> f64 {
        (u.transpose() * self.tensor() * u)[(0, 0)]
    }

    fn on_active_sheet(&self, u: &Point) -> bool {
        match self.sheet {
            None => true,
            Some(sign) => {
                let axial = self.axis.dot(u);
                axial * sign >= 0.0
            }
        }
    }
}

impl SurfaceOps for Cone {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        let u = point - self.apex;
        let inside_angle = self.quadratic_value(&u) > 0.0 && self.on_active_sheet(&u);
        // "Outside the solid cone" is forward, matching the sphere/cylinder convention.
        let outside = !inside_angle;
        outside != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        let d = direction.normalize();
        let u = point - self.apex;
        let m = self.tensor();
        let md = m * d;
        let a = (d.transpose() * md)[(0, 0)];
        let b = 2.0 * (u.transpose() * md)[(0, 0)];
        let c = self.quadratic_value(&u);

        let mut candidates: Vec<f64> = Vec::new();
        if a.abs() < EPS {
            if b.abs() > EPS {
                candidates.push(-c / b);
            }
        } else {
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let sqrt_disc = disc.sqrt();
                candidates.push((-b - sqrt_disc) / (2.0 * a));
                candidates.push((-b + sqrt_disc) / (2.0 * a));
            }
        }

        let mut best: Option<f64> = None;
        for t in candidates {
            if t <= EPS {
                continue;
            }
            let hit_u = u + d * t;
            if !self.on_active_sheet(&hit_u) {
                continue;
            }
            if best.map_or(true, |cur| t < cur) {
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
        self.apex = matrix.transform_point(&self.apex);
        self.axis = matrix.transform_vector(&self.axis).normalize();
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        // Lateral planes tangent to the cone at a reference distance along the axis,
        // built from two vectors orthogonal to the axis, matching the circumscribed
        // box construction used for cylinders/spheres.
        let (v1, v2) = two_orthogonal_unit_vectors(&self.axis);
        let reach = self.half_angle.tan().max(EPS) * 10.0; // reference lateral extent
        let tip = self.apex + self.axis * 10.0;
        let mut groups = Vec::new();
        for v in [v1, -v1, v2, -v2] {
            let n = (v - self.axis * self.half_angle.tan()).normalize();
            groups.push(vec![Plane::through_point(n, tip + v * reach)]);
        }
        groups
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        // A cone's lateral surface is unbounded along its axis; only the fully
        // reversed (interior-wedge) view admits a finite box, and even then only
        // loosely, so fall back to universal in both cases and let the medium/detailed
        // tiers of §4.5 refine it from `bounding_planes`.
        let _ = reversed;
        BoundingBox::universal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apex_is_on_axis_boundary() {
        let cone = Cone::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            std::f64::consts::FRAC_PI_4,
            None,
        );
        // Far along the axis, close to it radially: inside (not forward).
        assert!(!cone.is_forward(&Point::new(0.01, 0.0, 10.0), false));
        // Far off-axis at the same height: outside (forward).
        assert!(cone.is_forward(&Point::new(20.0, 0.0, 10.0), false));
    }

    #[test]
    fn one_sheet_excludes_opposite_nappe() {
        let cone = Cone::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            std::f64::consts::FRAC_PI_4,
            Some(1.0),
        );
        // On the excluded (-z) nappe, even a radially-inside point counts as forward.
        assert!(cone.is_forward(&Point::new(0.01, 0.0, -10.0), false));
    }

    #[test]
    fn ray_along_axis_direction_finds_forward_hit() {
        let cone = Cone::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            std::f64::consts::FRAC_PI_4,
            None,
        );
        let hit = cone.intersect(&Point::new(5.0, 0.0, 5.0), &Point::new(-1.0, 0.0, 0.0));
        assert!(crate::vecmath::is_valid(&hit));
    }
}
