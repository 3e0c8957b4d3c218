//! Rectangular and hexagonal lattice expansion: turns a `LAT=1`/`LAT=2` cell card into
//! one element cell per `(i, j, k)` lattice index, each clipped to its unit cell by a
//! fresh set of bounding planes.
//!
//! Grounded on `original_source/core/geometry/latticecreator.{hpp,cpp}`: lattice planes
//! are generated once per axis and shared across the whole index range
//! (`latticeSurfaceNameMap_`/`hexSurfaceNameMap_`), rather than rebuilt per element.

use crate::registry::SurfaceRegistry;
use crate::surface::{Plane, Surface};
use crate::vecmath::Point;

/// The kind of lattice a `LAT=` card declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatticeKind {
    Rectangular,
    Hexagonal,
}

impl LatticeKind {
    /// Maps the deck's `lat=1`/`lat=2` value onto a kind; `None` for anything else
    /// (`lat=3`, the tetrahedral case, is handled separately by `tetra.rs`).
    pub fn from_card_value(v: u8) -> Option<Self> {
        match v {
            1 => Some(LatticeKind::Rectangular),
            2 => Some(LatticeKind::Hexagonal),
            _ => None,
        }
    }
}

/// Inclusive index range along one lattice axis, as declared by a deck's dimension
/// declarator (e.g. `fill=-1:1 -1:1 0:0`).
#[derive(Clone, Copy, Debug)]
pub struct AxisRange {
    pub lo: i32,
    pub hi: i32,
}

impl AxisRange {
    pub fn len(&self) -> usize {
        (self.hi - self.lo + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.hi < self.lo
    }

    pub fn indices(&self) -> impl Iterator<Item = i32> {
        self.lo..=self.hi
    }
}

/// Declared extent of a `fill=` card along all three lattice axes.
#[derive(Clone, Copy, Debug)]
pub struct LatticeDimensions {
    pub i: AxisRange,
    pub j: AxisRange,
    pub k: AxisRange,
}

impl LatticeDimensions {
    /// Row-major `(k, j, i)` nesting order: outermost loop is `k`, then `j`, then `i`,
    /// matching the original's `fill=` unpacking (§6 SUPPLEMENT).
    pub fn flat_indices(&self) -> Vec<(i32, i32, i32)> {
        let mut out = Vec::with_capacity(self.i.len() * self.j.len() * self.k.len());
        for k in self.k.indices() {
            for j in self.j.indices() {
                for i in self.i.indices() {
                    out.push((i, j, k));
                }
            }
        }
        out
    }
}

/// One lattice element's geometric contribution: the element index and the two bounding
/// planes (low/high) along each of the three lattice axes, already registered in the
/// surface registry.
pub struct LatticeElementPlanes {
    pub index: (i32, i32, i32),
    /// Per axis: `(low_plane_id, high_plane_id)`, both positive front ids. The element
    /// region is `AND(low_id, -high_id)` on each axis (inside the low plane's forward
    /// half and outside the high plane's).
    pub axis_planes: [(i32, i32); 3],
}

/// Generates (and registers) the full family of lattice planes for a rectangular
/// lattice with basis vectors `basis` (one per axis) and per-axis pitch `pitch`,
/// centered on `origin`, then returns each requested element's plane ids. Mirrors
/// `LatticeCreator::generatePlanes` generating the whole range's planes up front so
/// neighbor elements share a plane instance instead of each carrying a duplicate.
pub fn generate_rectangular_lattice(
    registry: &SurfaceRegistry,
    origin: Point,
    basis: [Point; 3],
    pitch: [f64; 3],
    dims: &LatticeDimensions,
) -> Vec<LatticeElementPlanes> {
    let axis_ranges = [dims.i, dims.j, dims.k];
    // One plane per integer boundary along each axis, shared by adjacent elements.
    let mut boundary_ids: [Vec<(i32, i32)>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for (axis, range) in axis_ranges.iter().enumerate() {
        let normal = basis[axis].normalize();
        for boundary in range.lo..=(range.hi + 1) {
            let offset = (boundary as f64 - 0.5) * pitch[axis];
            let point = origin + basis[axis] * offset;
            let id = registry.register_auto(Surface::Plane(Plane::through_point(normal, point)));
            boundary_ids[axis].push((boundary, id));
        }
    }
    let lookup = |axis: usize, boundary: i32| -> i32 {
        boundary_ids[axis]
            .iter()
            .find(|(b, _)| *b == boundary)
            .map(|(_, id)| *id)
            .expect("boundary plane generated for every index in range")
    };

    dims.flat_indices()
        .into_iter()
        .map(|(i, j, k)| {
            let idx = [i, j, k];
            let mut axis_planes = [(0, 0); 3];
            for axis in 0..3 {
                let low = lookup(axis, idx[axis]);
                let high = lookup(axis, idx[axis] + 1);
                axis_planes[axis] = (low, high);
            }
            LatticeElementPlanes {
                index: (i, j, k),
                axis_planes,
            }
        })
        .collect()
}

/// Builds the logical-expression factor list an element's unit-cell region AND's onto
/// the lattice cell's own equation: `low_x -high_x low_y -high_y low_z -high_z`.
pub fn element_factors(element: &LatticeElementPlanes) -> Vec<i32> {
    let mut factors = Vec::with_capacity(6);
    for (low, high) in element.axis_planes {
        factors.push(low);
        factors.push(-high);
    }
    factors
}

/// Suffix appended to an element's cell name, `<baseName>_<i>_<j>_<k>`, matching the
/// original's hierarchical naming (`getHierarchialCellNames`).
pub fn element_cell_name(base_name: &str, index: (i32, i32, i32)) -> String {
    format!("{base_name}_{}_{}_{}", index.0, index.1, index.2)
}

/// One hexagonal-prism lattice element's geometric contribution: axial `(i, j)` plus
/// vertical `k`, bounded by four mirrored plane pairs — `u`/`v`/`w` forming the
/// hexagonal cross-section in cube-coordinate convention (`u + v + w == 0`, the
/// standard way to bound a hex tile with three 120°-separated axes instead of the
/// rectangular case's two orthogonal ones) plus the vertical `z` pair. All ids already
/// registered.
pub struct HexElementPlanes {
    pub index: (i32, i32, i32),
    /// `[(u_low, u_high), (v_low, v_high), (w_low, w_high), (z_low, z_high)]`, all
    /// positive front ids.
    pub axis_planes: [(i32, i32); 4],
}

/// Generates (and registers) a hexagonal lattice's plane family and returns each
/// requested element's plane ids. `basis[0]`/`basis[1]` are the two in-plane hex axes
/// (conventionally 60° apart, equal `pitch[0]`); the third cube-coordinate axis `w =
/// -(u+v)` is derived rather than declared, so a true hexagonal (not rhombic) prism
/// results without the caller having to name a sixth face direction explicitly.
/// `basis[2]`/`pitch[2]` are the vertical axis, exactly as in the rectangular case.
/// Mirrors `LatticeCreator::generatePlanes`'s `LAT=2` branch (`hexSurfaceNameMap_`).
pub fn generate_hexagonal_lattice(
    registry: &SurfaceRegistry,
    origin: Point,
    basis: [Point; 3],
    pitch: [f64; 3],
    dims: &LatticeDimensions,
) -> Vec<HexElementPlanes> {
    let u_dir = basis[0].normalize();
    let v_dir = basis[1].normalize();
    let w_dir = -(basis[0] + basis[1]).normalize();
    let z_dir = basis[2].normalize();

    let u_range = dims.i;
    let v_range = dims.j;
    let w_range = AxisRange {
        lo: -(v_range.hi + u_range.hi),
        hi: -(v_range.lo + u_range.lo),
    };
    let z_range = dims.k;

    let make_boundaries = |dir: Point, range: AxisRange, pitch_axis: f64| -> Vec<(i32, i32)> {
        let mut ids = Vec::new();
        for boundary in range.lo..=(range.hi + 1) {
            let offset = (boundary as f64 - 0.5) * pitch_axis;
            let point = origin + dir * offset;
            let id = registry.register_auto(Surface::Plane(Plane::through_point(dir, point)));
            ids.push((boundary, id));
        }
        ids
    };
    let u_ids = make_boundaries(u_dir, u_range, pitch[0]);
    let v_ids = make_boundaries(v_dir, v_range, pitch[0]);
    let w_ids = make_boundaries(w_dir, w_range, pitch[0]);
    let z_ids = make_boundaries(z_dir, z_range, pitch[2]);

    let find = |ids: &[(i32, i32)], boundary: i32| -> i32 {
        ids.iter()
            .find(|(b, _)| *b == boundary)
            .map(|(_, id)| *id)
            .expect("boundary plane generated for every index in range")
    };

    dims.flat_indices()
        .into_iter()
        .map(|(i, j, k)| {
            let w = -(i + j);
            HexElementPlanes {
                index: (i, j, k),
                axis_planes: [
                    (find(&u_ids, i), find(&u_ids, i + 1)),
                    (find(&v_ids, j), find(&v_ids, j + 1)),
                    (find(&w_ids, w), find(&w_ids, w + 1)),
                    (find(&z_ids, k), find(&z_ids, k + 1)),
                ],
            }
        })
        .collect()
}

/// Builds the logical-expression factor list a hexagonal element's unit-cell region
/// AND's onto the lattice cell's own equation: four `low -high` pairs (u, v, w, z).
pub fn hex_element_factors(element: &HexElementPlanes) -> Vec<i32> {
    let mut factors = Vec::with_capacity(8);
    for (low, high) in element.axis_planes {
        factors.push(low);
        factors.push(-high);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_indices_are_k_j_i_nested() {
        let dims = LatticeDimensions {
            i: AxisRange { lo: 0, hi: 1 },
            j: AxisRange { lo: 0, hi: 1 },
            k: AxisRange { lo: 0, hi: 0 },
        };
        let flat = dims.flat_indices();
        assert_eq!(flat, vec![(0, 0, 0), (1, 0, 0), (0, 1, 0), (1, 1, 0)]);
    }

    #[test]
    fn rectangular_lattice_generates_one_element_per_index() {
        let reg = SurfaceRegistry::new();
        let dims = LatticeDimensions {
            i: AxisRange { lo: -1, hi: 1 },
            j: AxisRange { lo: 0, hi: 0 },
            k: AxisRange { lo: 0, hi: 0 },
        };
        let elements = generate_rectangular_lattice(
            &reg,
            Point::new(0.0, 0.0, 0.0),
            [
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
                Point::new(0.0, 0.0, 1.0),
            ],
            [1.0, 1.0, 1.0],
            &dims,
        );
        assert_eq!(elements.len(), 3);
        for e in &elements {
            assert_eq!(element_factors(e).len(), 6);
        }
    }

    #[test]
    fn lattice_kind_maps_lat_card_values() {
        assert_eq!(LatticeKind::from_card_value(1), Some(LatticeKind::Rectangular));
        assert_eq!(LatticeKind::from_card_value(2), Some(LatticeKind::Hexagonal));
        assert_eq!(LatticeKind::from_card_value(3), None);
    }

    #[test]
    fn hexagonal_lattice_generates_one_element_per_index_with_four_plane_pairs() {
        let reg = SurfaceRegistry::new();
        let dims = LatticeDimensions {
            i: AxisRange { lo: 0, hi: 1 },
            j: AxisRange { lo: 0, hi: 1 },
            k: AxisRange { lo: 0, hi: 0 },
        };
        let half_sqrt3 = 3.0f64.sqrt() / 2.0;
        let elements = generate_hexagonal_lattice(
            &reg,
            Point::new(0.0, 0.0, 0.0),
            [
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.5, half_sqrt3, 0.0),
                Point::new(0.0, 0.0, 1.0),
            ],
            [1.0, 1.0, 1.0],
            &dims,
        );
        assert_eq!(elements.len(), 4);
        for e in &elements {
            assert_eq!(hex_element_factors(e).len(), 8);
        }
    }
}
