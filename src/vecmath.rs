//! 3/4-D vector and affine-transform algebra used throughout the geometry engine.
//!
//! Grounded on `original_source/core/math/nvector.hpp`: a `Point`/`Vector3` pair with
//! an invalid sentinel and a shared epsilon/delta tolerance, plus a 4x4 affine
//! transform with a separable rotation block and translation row.

use nalgebra::{Matrix3, Vector3};

/// A point or free vector in 3-space. Geometrically identical to a [`Vector3`] but kept
/// as a distinct alias so call sites read the way the original source's `math::Point`
/// vs `math::Vector<3>` distinction did.
pub type Point = Vector3<f64>;

/// Tolerance used for "is this intersection the point I started from" checks and for
/// general floating point equality throughout the surface primitives.
pub const EPS: f64 = 1e-10;

/// Slightly looser tolerance used to walk past the current position before searching
/// for the next forward intersection (`Cell::delta()` in the original source).
pub const DELTA: f64 = 1e-6;

/// Sentinel returned by all "no intersection" / "no meaningful point" queries.
/// Matches `math::Point::INVALID_VECTOR()`: every component is NaN so that any
/// arithmetic performed on it without checking [`is_valid`] poisons the result instead
/// of silently producing a plausible-looking point.
pub fn invalid_point() -> Point {
    Point::new(f64::NAN, f64::NAN, f64::NAN)
}

/// True if none of `p`'s components are NaN, i.e. `p` is not the [`invalid_point`] sentinel.
pub fn is_valid(p: &Point) -> bool {
    p.iter().all(|c| c.is_finite())
}

/// `a` and `b` agree to within [`EPS`].
pub fn same_double(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

/// `a` and `b` name the same point to within [`EPS`] on every axis.
pub fn same_point(a: &Point, b: &Point) -> bool {
    (a - b).norm() < EPS
}

/// True if `v1` and `v2` are parallel (either direction), e.g. a ray direction that
/// cannot meaningfully be projected perpendicular to an axis.
pub fn is_dependent(v1: &Point, v2: &Point) -> bool {
    v1.cross(v2).norm() < EPS
}

/// Returns two unit vectors orthogonal to `axis` and to each other, used to build the
/// lateral bounding planes of cones and cylinders.
pub fn two_orthogonal_unit_vectors(axis: &Point) -> (Point, Point) {
    let axis = axis.normalize();
    // Pick whichever cardinal axis is least parallel to `axis` to avoid a degenerate cross product.
    let helper = if axis.x.abs() <= axis.y.abs() && axis.x.abs() <= axis.z.abs() {
        Point::new(1.0, 0.0, 0.0)
    } else if axis.y.abs() <= axis.z.abs() {
        Point::new(0.0, 1.0, 0.0)
    } else {
        Point::new(0.0, 0.0, 1.0)
    };
    let v1 = axis.cross(&helper).normalize();
    let v2 = axis.cross(&v1).normalize();
    (v1, v2)
}

/// Rodrigues rotation of `v` by `angle` radians around unit axis `axis`.
pub fn rotate_about(v: &Point, axis: &Point, angle: f64) -> Point {
    let axis = axis.normalize();
    let (s, c) = angle.sin_cos();
    v * c + axis.cross(v) * s + axis * axis.dot(v) * (1.0 - c)
}

/// A rotation matrix carrying unit vector `from` onto unit vector `to`.
///
/// Used to re-orient canonical-frame surfaces (cone axis, torus axis) after an
/// `apply_affine` that is a pure rotation, and to build the cone/torus implicit-frame
/// transforms.
pub fn rotation_between(from: &Point, to: &Point) -> Matrix3<f64> {
    let from = from.normalize();
    let to = to.normalize();
    let v = from.cross(&to);
    let c = from.dot(&to);
    if (c - 1.0).abs() < EPS {
        return Matrix3::identity();
    }
    if (c + 1.0).abs() < EPS {
        // 180 degree rotation: pick any axis orthogonal to `from`.
        let (orth, _) = two_orthogonal_unit_vectors(&from);
        return rotation_about_matrix(&orth, std::f64::consts::PI);
    }
    let vx = Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0);
    Matrix3::identity() + vx + vx * vx * (1.0 / (1.0 + c))
}

/// Matrix form of [`rotate_about`], useful when the same rotation is applied to many vectors.
pub fn rotation_about_matrix(axis: &Point, angle: f64) -> Matrix3<f64> {
    let axis = axis.normalize();
    let (s, c) = angle.sin_cos();
    let k = Matrix3::new(
        0.0, -axis.z, axis.y, axis.z, 0.0, -axis.x, -axis.y, axis.x, 0.0,
    );
    Matrix3::identity() + k * s + k * k * (1.0 - c)
}

/// Outer product `a * aᵀ`, used to build the cone axis tensor `M = n nᵀ − cos²θ·I`.
pub fn tensor_prod(a: &Point, b: &Point) -> Matrix3<f64> {
    a * b.transpose()
}

/// Affine 4x4 transform: a 3x3 rotation/scale block plus a translation row, matching
/// `math::Matrix<4>` in the original source (rotation block + translation vector).
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix4 {
    pub rotation: Matrix3<f64>,
    pub translation: Point,
}

impl Matrix4 {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Point::zeros(),
        }
    }

    /// The all-zero matrix: `apply_affine` by this is specified as a no-op (§4.2).
    pub fn zero() -> Self {
        Self {
            rotation: Matrix3::zeros(),
            translation: Point::zeros(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.rotation.iter().all(|c| *c == 0.0) && self.translation.iter().all(|c| *c == 0.0)
    }

    pub fn from_rotation_translation(rotation: Matrix3<f64>, translation: Point) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Re-orthonormalizes the rotation block via Gram-Schmidt, tolerating small drift
    /// that accumulates from chained TRCL composition (§4.2: "an explicit
    /// orthonormalisation step is available on the matrix type").
    pub fn orthonormalize(&mut self) {
        let c0 = self.rotation.column(0).normalize();
        let c1_raw = self.rotation.column(1) - c0 * c0.dot(&self.rotation.column(1).into());
        let c1 = c1_raw.normalize();
        let c2 = c0.cross(&c1);
        self.rotation = Matrix3::from_columns(&[c0, c1, c2]);
    }

    pub fn inverse(&self) -> Option<Self> {
        let rot_inv = self.rotation.try_inverse()?;
        Some(Self {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        })
    }

    /// Composes `self` then `other`, i.e. `other.apply(self.apply(p))`.
    pub fn then(&self, other: &Matrix4) -> Matrix4 {
        Matrix4 {
            rotation: other.rotation * self.rotation,
            translation: other.rotation * self.translation + other.translation,
        }
    }

    /// Applies the affine transform to a point (rotation + translation).
    pub fn transform_point(&self, p: &Point) -> Point {
        self.rotation * p + self.translation
    }

    /// Applies only the rotation part, for transforming direction vectors / normals.
    pub fn transform_vector(&self, v: &Point) -> Point {
        self.rotation * v
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_point_is_invalid() {
        assert!(!is_valid(&invalid_point()));
        assert!(is_valid(&Point::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn identity_transform_is_noop() {
        let m = Matrix4::identity();
        let p = Point::new(1.0, -2.0, 3.5);
        assert!(same_point(&m.transform_point(&p), &p));
    }

    #[test]
    fn inverse_round_trips() {
        let rot = rotation_about_matrix(&Point::new(0.0, 0.0, 1.0), 0.7);
        let m = Matrix4::from_rotation_translation(rot, Point::new(3.0, -1.0, 2.0));
        let inv = m.inverse().unwrap();
        let p = Point::new(5.0, 6.0, -7.0);
        let roundtrip = inv.transform_point(&m.transform_point(&p));
        assert!(same_point(&roundtrip, &p));
    }

    #[test]
    fn rotation_between_maps_from_to_to() {
        let from = Point::new(1.0, 0.0, 0.0);
        let to = Point::new(0.0, 1.0, 0.0);
        let r = rotation_between(&from, &to);
        let mapped = r * from;
        assert!(same_point(&mapped, &to));
    }
}
