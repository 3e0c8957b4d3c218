//! Closed set of implicit surface primitives and the single dispatch trait they share.
//!
//! Grounded on `original_source/core/geometry/surface/surface.hpp`'s abstract `Surface`
//! base class, re-modeled per the redesign note in spec.md §9: rather than a
//! `shared_ptr<Surface>` hierarchy with virtual dispatch, `Surface` here is a tagged
//! union over the eight primitive kinds, and the four hot virtual methods
//! (`isForward`/`getIntersection`/`transform`/`boundingPlanes`) become a small sealed
//! trait implemented once per variant.

pub mod cone;
pub mod cylinder;
pub mod plane;
pub mod polyhedron;
pub mod quadric;
pub mod sphere;
pub mod torus;
pub mod triangle;

use crate::aabb::BoundingBox;
use crate::vecmath::{Matrix4, Point};

pub use cone::Cone;
pub use cylinder::Cylinder;
pub use plane::Plane;
pub use polyhedron::Polyhedron;
pub use quadric::Quadric;
pub use sphere::Sphere;
pub use torus::Torus;
pub use triangle::Triangle;

/// A disjunction of plane lists describing how a surface's forward region can be
/// approximated by planes: the outer `Vec` is OR'd together, each inner `Vec<Plane>` is
/// AND'd together. A circumscribed sphere, for instance, yields six singleton inner
/// vectors (OR of six half-spaces); its reversed (inward) view yields one inner vector
/// of six planes (AND of six half-spaces), matching `boundingPlanes()` throughout
/// `sphere.cpp`/`cone.cpp`.
pub type BoundingPlaneGroups = Vec<Vec<Plane>>;

/// The four operations every surface primitive must provide. Kept as a sealed trait
/// (not exposed outside this module) so `Surface` stays a closed tagged union from a
/// caller's perspective, while each variant still gets normal trait-method ergonomics
/// internally.
pub(crate) trait SurfaceOps {
    /// True if `point` lies in the forward (un-reversed) half of this surface.
    /// `reversed` additionally flips the sense, for querying the complementary "back"
    /// view without duplicating storage (see [`crate::registry::SurfaceRegistry`]).
    fn is_forward(&self, point: &Point, reversed: bool) -> bool;

    /// Nearest point along the ray `point + t*direction, t > 0` where this surface is
    /// crossed, or [`crate::vecmath::invalid_point`] if the ray never crosses it.
    fn intersect(&self, point: &Point, direction: &Point) -> Point;

    /// Applies an affine transform in place (translation + rotation from a `TRCL`/`TR`
    /// card). A zero matrix is a documented no-op (§4.2).
    fn apply_affine(&mut self, matrix: &Matrix4);

    /// Plane approximation used to seed bounding-box construction tiers (§4.5).
    fn bounding_planes(&self) -> BoundingPlaneGroups;

    /// Axis-aligned bounding box directly derivable from the primitive's own
    /// parameters, without going through the plane-intersection machinery (the "rough"
    /// tier of §4.5).
    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox;
}

/// One of the eight implicit surface primitives a deck surface card can describe.
#[derive(Clone, Debug)]
pub enum Surface {
    Plane(Plane),
    Sphere(Sphere),
    Cylinder(Cylinder),
    Cone(Cone),
    Torus(Torus),
    Triangle(Triangle),
    Polyhedron(Polyhedron),
    Quadric(Quadric),
}

macro_rules! dispatch {
    ($self:expr, $pat:ident => $body:expr) => {
        match $self {
            Surface::Plane($pat) => $body,
            Surface::Sphere($pat) => $body,
            Surface::Cylinder($pat) => $body,
            Surface::Cone($pat) => $body,
            Surface::Torus($pat) => $body,
            Surface::Triangle($pat) => $body,
            Surface::Polyhedron($pat) => $body,
            Surface::Quadric($pat) => $body,
        }
    };
}

impl Surface {
    pub fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        dispatch!(self, s => s.is_forward(point, reversed))
    }

    pub fn intersect(&self, point: &Point, direction: &Point) -> Point {
        dispatch!(self, s => s.intersect(point, direction))
    }

    pub fn apply_affine(&mut self, matrix: &Matrix4) {
        dispatch!(self, s => s.apply_affine(matrix))
    }

    pub fn bounding_planes(&self) -> BoundingPlaneGroups {
        dispatch!(self, s => s.bounding_planes())
    }

    pub fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        dispatch!(self, s => s.rough_bounding_box(reversed))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Surface::Plane(_) => "PLANE",
            Surface::Sphere(_) => "SPHERE",
            Surface::Cylinder(_) => "CYLINDER",
            Surface::Cone(_) => "CONE",
            Surface::Torus(_) => "TORUS",
            Surface::Triangle(_) => "TRIANGLE",
            Surface::Polyhedron(_) => "POLYHEDRON",
            Surface::Quadric(_) => "QUADRIC",
        }
    }
}
