//! Signed-id surface registry: front/back views over a shared pool of surfaces.
//!
//! Grounded on `original_source/core/geometry/surface/surfacemap.hpp`'s `SurfaceMap`:
//! positive indices address the "front" (forward) view of a surface, negative indices
//! its complementary dual, `O(1)` numeric lookup is required (consulted on every
//! `is_inside`/intersection test), while name lookup may be slow. Backed here by
//! `DashMap` (teacher dependency) instead of a mutex-guarded `unordered_map`, since
//! registry reads happen from multiple fill-worker threads concurrently (§5).

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{GeomError, Location};
use crate::logic::LogicalExpression;
use crate::surface::Surface;
use crate::vecmath::Point;

/// A registered surface, keyed by its positive ("front") id. The negative id is never
/// stored separately: `is_forward` is simply inverted when queried through the back view.
struct Entry {
    name: String,
    surface: Surface,
    /// True for a surface that came from a deck's own surface card ([`register`]);
    /// false for one this crate generated internally ([`register_auto`] — a lattice
    /// element's implicit bounding plane, a `TRCL`-transformed duplicate, ...). Drives
    /// the warn-vs-silent distinction in [`crate::surface_creator::remove_unused_surfaces`]
    /// (§4.3: "warnings are emitted only for primary-side, user-authored surfaces").
    user_authored: bool,
}

/// Owns every surface in a deck and answers `is_forward(signed_id, point)` queries used
/// by [`LogicalExpression::evaluate`]. Positive keys are the "front" view; the same key
/// negated is the dual ("back") view, which is never stored twice.
pub struct SurfaceRegistry {
    surfaces: DashMap<i32, Entry, fxhash::FxBuildHasher>,
    name_to_id: DashMap<String, i32, fxhash::FxBuildHasher>,
    next_auto_id: AtomicI32,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self {
            surfaces: DashMap::default(),
            name_to_id: DashMap::default(),
            next_auto_id: AtomicI32::new(1),
        }
    }

    /// Number of distinct front surfaces, the count used for fast size queries during
    /// intersection sweeps (mirrors `SurfaceMap::size()` using only `frontSurfaces_`).
    pub fn front_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Registers a surface under `id` (must be a positive, non-zero id — the dual is
    /// implicit and never stored). Fails with [`GeomError::MultipleDefinition`] if `id`
    /// or `name` is already taken.
    pub fn register(
        &self,
        id: i32,
        name: impl Into<String>,
        surface: Surface,
        location: Location,
    ) -> Result<(), GeomError> {
        assert!(id > 0, "surfaces are registered under their positive id");
        let name = name.into();
        if self.surfaces.contains_key(&id) {
            return Err(GeomError::MultipleDefinition {
                name: name.clone(),
                location,
                hint: "a surface with this id is already registered",
            });
        }
        if !name.is_empty() && self.name_to_id.contains_key(&name) {
            return Err(GeomError::MultipleDefinition {
                name,
                location,
                hint: "a surface with this name is already registered",
            });
        }
        if !name.is_empty() {
            self.name_to_id.insert(name.clone(), id);
        }
        self.surfaces.insert(
            id,
            Entry {
                name,
                surface,
                user_authored: true,
            },
        );
        self.next_auto_id.fetch_max(id + 1, Ordering::Relaxed);
        Ok(())
    }

    /// Registers an auto-generated surface (produced internally — e.g. a lattice
    /// element's implicit bounding plane) under a fresh unused positive id, returning
    /// that id.
    pub fn register_auto(&self, surface: Surface) -> i32 {
        loop {
            let id = self.next_auto_id.fetch_add(1, Ordering::Relaxed);
            if !self.surfaces.contains_key(&id) {
                self.surfaces.insert(
                    id,
                    Entry {
                        name: String::new(),
                        surface,
                        user_authored: false,
                    },
                );
                return id;
            }
        }
    }

    /// Registers a `TRCL`-transformed clone of `base_id` under the `<base>_<cell>`
    /// derived name (§4.3/§6), returning the fresh positive id. Falls back to an
    /// anonymous [`register_auto`] id when `base_id` has no name to derive from (e.g.
    /// it was itself auto-generated). The clone is always marked non-user-authored:
    /// it didn't come from a surface card, even when its base did.
    pub fn register_with_transform(&self, base_id: i32, cell_name: &str, surface: Surface) -> i32 {
        let base_name = self.name_of(base_id.abs()).filter(|n| !n.is_empty());
        let id = {
            let mut id;
            loop {
                id = self.next_auto_id.fetch_add(1, Ordering::Relaxed);
                if !self.surfaces.contains_key(&id) {
                    break id;
                }
            }
        };
        let name = match &base_name {
            Some(base) => format!("{base}_{cell_name}"),
            None => String::new(),
        };
        if !name.is_empty() && !self.name_to_id.contains_key(&name) {
            self.name_to_id.insert(name.clone(), id);
        }
        self.surfaces.insert(
            id,
            Entry {
                name,
                surface,
                user_authored: false,
            },
        );
        id
    }

    /// Removes a surface entirely (used by the unused-surface pruning pass, §4.6 stage 8).
    pub fn erase(&self, id: i32) {
        let id = id.abs();
        if let Some((_, entry)) = self.surfaces.remove(&id) {
            if !entry.name.is_empty() {
                self.name_to_id.remove(&entry.name);
            }
        }
    }

    pub fn contains(&self, id: i32) -> bool {
        self.surfaces.contains_key(&id.abs())
    }

    pub fn name_of(&self, id: i32) -> Option<String> {
        let entry = self.surfaces.get(&id.abs())?;
        if entry.name.is_empty() {
            None
        } else if id < 0 {
            Some(format!("-{}", entry.name))
        } else {
            Some(entry.name.clone())
        }
    }

    pub fn id_of(&self, name: &str) -> Option<i32> {
        if let Some(stripped) = name.strip_prefix('-') {
            self.name_to_id.get(stripped).map(|id| -*id)
        } else {
            self.name_to_id.get(name).map(|id| *id)
        }
    }

    /// Runs `f` with shared access to the surface at the given signed id (positive for
    /// the front view, negative for the complementary back view). Returns `None` if the
    /// id is not registered.
    pub fn with_surface<R>(&self, id: i32, f: impl FnOnce(&Surface, bool) -> R) -> Option<R> {
        let entry = self.surfaces.get(&id.abs())?;
        Some(f(&entry.surface, id < 0))
    }

    /// Evaluator functor handed to [`LogicalExpression::evaluate`]: is `point` on the
    /// "inside" side of the (possibly-complemented) surface named by `id`?
    pub fn is_forward(&self, id: &i32, point: &Point) -> bool {
        match self.with_surface(*id, |surf, reversed| surf.is_forward(point, reversed)) {
            Some(v) => v,
            None => {
                log::warn!("is_forward queried for unregistered surface id {id}");
                false
            }
        }
    }

    /// Rewrites a deck equation's surface-name tokens into signed ids, the Rust
    /// counterpart of `SurfaceMap::makeIndexEquation`.
    pub fn make_index_equation(
        &self,
        text: &str,
    ) -> Result<LogicalExpression<i32>, GeomError> {
        LogicalExpression::from_string(text, &|name| self.id_of(name))
    }

    /// Front-view ids currently registered, in no particular order — used by pruning
    /// and by bounding-box construction over "all surfaces touching this cell".
    pub fn front_ids(&self) -> Vec<i32> {
        self.surfaces.iter().map(|e| *e.key()).collect()
    }

    /// Whether the surface at `id` came from a deck's own surface card, as opposed to
    /// one this crate generated internally (lattice boundary plane, `TRCL` clone, ...).
    /// Unregistered ids are treated as not user-authored.
    pub fn is_user_authored(&self, id: i32) -> bool {
        self.surfaces
            .get(&id.abs())
            .map(|e| e.user_authored)
            .unwrap_or(false)
    }

    /// Looks up a surface by name (front or, with a `-` prefix, back view), resolved to
    /// its current [`Surface`] value. Returns `None` if `name` is not registered.
    pub fn at(&self, name: &str) -> Option<Surface> {
        let id = self.id_of(name)?;
        self.with_surface(id, |surf, _reversed| surf.clone())
    }

    /// All currently-registered front (positive-id) surfaces, as `(id, name, surface)`
    /// triples — used by consumers that need to enumerate the whole deck (pruning,
    /// bounding-box sweeps, diagnostics).
    pub fn front_surfaces(&self) -> Vec<(i32, String, Surface)> {
        self.surfaces
            .iter()
            .map(|e| (*e.key(), e.value().name.clone(), e.value().surface.clone()))
            .collect()
    }

    /// The dual ("back") view of every registered surface, as negated ids paired with
    /// their names (via [`name_of`], which prefixes `-`). Complements [`front_surfaces`]
    /// for consumers that enumerate both signed views.
    pub fn back_surfaces(&self) -> Vec<(i32, String)> {
        self.surfaces
            .iter()
            .filter(|e| !e.value().name.is_empty())
            .map(|e| (-*e.key(), format!("-{}", e.value().name)))
            .collect()
    }
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a registry, the shape every multi-threaded consumer (fill worker,
/// cache, cell) actually holds.
pub type SharedRegistry = Arc<SurfaceRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::plane::Plane;

    fn plane_surface(normal: Point, distance: f64) -> Surface {
        Surface::Plane(Plane::new(normal, distance))
    }

    #[test]
    fn register_and_lookup_round_trips() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "topPlane",
            plane_surface(Point::new(0.0, 0.0, 1.0), 5.0),
            Location::unknown(),
        )
        .unwrap();
        assert_eq!(reg.id_of("topPlane"), Some(1));
        assert_eq!(reg.id_of("-topPlane"), Some(-1));
        assert_eq!(reg.name_of(-1), Some("-topPlane".to_string()));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "a",
            plane_surface(Point::new(1.0, 0.0, 0.0), 0.0),
            Location::unknown(),
        )
        .unwrap();
        let err = reg.register(
            1,
            "b",
            plane_surface(Point::new(0.0, 1.0, 0.0), 0.0),
            Location::unknown(),
        );
        assert!(matches!(err, Err(GeomError::MultipleDefinition { .. })));
    }

    #[test]
    fn dual_view_inverts_forwardness() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "p",
            plane_surface(Point::new(0.0, 0.0, 1.0), 0.0),
            Location::unknown(),
        )
        .unwrap();
        let above = Point::new(0.0, 0.0, 5.0);
        assert!(reg.is_forward(&1, &above));
        assert!(!reg.is_forward(&-1, &above));
    }

    #[test]
    fn register_marks_user_authored_register_auto_does_not() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "p",
            plane_surface(Point::new(0.0, 0.0, 1.0), 0.0),
            Location::unknown(),
        )
        .unwrap();
        let auto_id = reg.register_auto(plane_surface(Point::new(1.0, 0.0, 0.0), 0.0));
        assert!(reg.is_user_authored(1));
        assert!(!reg.is_user_authored(auto_id));
        assert!(!reg.is_user_authored(999));
    }

    #[test]
    fn register_with_transform_derives_base_cell_name() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "p",
            plane_surface(Point::new(0.0, 0.0, 1.0), 0.0),
            Location::unknown(),
        )
        .unwrap();
        let cloned = plane_surface(Point::new(0.0, 0.0, 1.0), 3.0);
        let id = reg.register_with_transform(1, "c7", cloned);
        assert_eq!(reg.name_of(id), Some("p_c7".to_string()));
        assert!(!reg.is_user_authored(id));
    }

    #[test]
    fn register_with_transform_falls_back_to_anonymous_when_base_unnamed() {
        let reg = SurfaceRegistry::new();
        let base_id = reg.register_auto(plane_surface(Point::new(0.0, 0.0, 1.0), 0.0));
        let cloned = plane_surface(Point::new(0.0, 0.0, 1.0), 3.0);
        let id = reg.register_with_transform(base_id, "c7", cloned);
        assert_eq!(reg.name_of(id), None);
    }

    #[test]
    fn at_resolves_registered_surface_by_name() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "p",
            plane_surface(Point::new(0.0, 0.0, 1.0), 5.0),
            Location::unknown(),
        )
        .unwrap();
        assert!(reg.at("p").is_some());
        assert!(reg.at("missing").is_none());
    }

    #[test]
    fn front_and_back_surfaces_enumerate_registered_entries() {
        let reg = SurfaceRegistry::new();
        reg.register(
            1,
            "p",
            plane_surface(Point::new(0.0, 0.0, 1.0), 5.0),
            Location::unknown(),
        )
        .unwrap();
        let fronts = reg.front_surfaces();
        assert_eq!(fronts.len(), 1);
        assert_eq!(fronts[0].1, "p");
        let backs = reg.back_surfaces();
        assert_eq!(backs, vec![(-1, "-p".to_string())]);
    }
}
