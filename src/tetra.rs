//! Tetrahedral mesh expansion for `LAT=3` cells.
//!
//! Grounded on `original_source/core/geometry/tetrahedron.hpp`/`tetracreator.cpp`: each
//! tetrahedron is four nodes and four triangular face planes; two tetrahedra sharing a
//! face share the same plane (registered once, referenced with opposite sign by each
//! side) instead of each emitting its own duplicate, and the mesh's outer (unshared)
//! faces are unioned into a "surrounding equation" used as the fill boundary.

use fxhash::FxHashMap;

use crate::registry::SurfaceRegistry;
use crate::surface::{Plane, Surface};
use crate::vecmath::Point;

/// Node index within the shared node table, as referenced by each tetrahedron's
/// four-corner topology.
pub type NodeId = usize;

/// One tetrahedral element: four node indices into a shared point table.
#[derive(Clone, Copy, Debug)]
pub struct TetraElement {
    pub nodes: [NodeId; 4],
}

/// The four faces of a tetrahedron as sorted node-index triples, used as a dedup key: a
/// face shared between two elements produces the same key regardless of winding order.
fn face_keys(elem: &TetraElement) -> [[NodeId; 3]; 4] {
    let n = elem.nodes;
    let mut faces = [
        [n[0], n[1], n[2]],
        [n[0], n[1], n[3]],
        [n[0], n[2], n[3]],
        [n[1], n[2], n[3]],
    ];
    for f in &mut faces {
        f.sort_unstable();
    }
    faces
}

/// Builds, registers, and dedups every face plane across `elements`, returning each
/// element's four signed face ids (positive = outward from that element's centroid).
pub fn build_tetra_faces(
    registry: &SurfaceRegistry,
    nodes: &FxHashMap<NodeId, Point>,
    elements: &[TetraElement],
) -> Vec<[i32; 4]> {
    let mut face_plane_id: FxHashMap<[NodeId; 3], i32> = FxHashMap::default();
    let mut out = Vec::with_capacity(elements.len());

    for elem in elements {
        let keys = face_keys(elem);
        let centroid: Point = elem
            .nodes
            .iter()
            .map(|id| nodes[id])
            .fold(Point::zeros(), |acc, p| acc + p)
            / 4.0;
        let mut signed_ids = [0i32; 4];
        for (i, key) in keys.iter().enumerate() {
            let id = *face_plane_id.entry(*key).or_insert_with(|| {
                let [a, b, c] = *key;
                let plane =
                    Plane::through_three_points(nodes[&a], nodes[&b], nodes[&c])
                        .expect("tetrahedron face must be non-degenerate");
                registry.register_auto(Surface::Plane(plane))
            });
            // Orient so the centroid is on the forward (outward-normal) side means the
            // interior of the element lies on the *back* side: the element's region is
            // the AND of each face's back (negative) view.
            let on_forward = registry
                .with_surface(id, |surf, _| surf.is_forward(&centroid, false))
                .unwrap_or(false);
            signed_ids[i] = if on_forward { -id } else { id };
        }
        out.push(signed_ids);
    }
    out
}

/// Logical-expression factor list for one element: the AND of its four (correctly
/// signed) face ids, i.e. "inside all four faces".
pub fn element_factors(face_ids: &[i32; 4]) -> Vec<i32> {
    face_ids.to_vec()
}

/// A face id used by exactly one element is an outer (boundary) face of the whole mesh;
/// their OR forms the mesh's surrounding equation, the region a `LAT=3` cell's `fill=`
/// universe is clipped against.
pub fn outer_face_ids(all_faces: &[[i32; 4]]) -> Vec<i32> {
    let mut counts: FxHashMap<i32, u32> = FxHashMap::default();
    for faces in all_faces {
        for &id in faces {
            *counts.entry(id.abs()).or_insert(0) += 1;
        }
    }
    let mut outer = Vec::new();
    for faces in all_faces {
        for &id in faces {
            if counts[&id.abs()] == 1 {
                outer.push(id);
            }
        }
    }
    outer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeomError;

    fn two_tetra_nodes() -> FxHashMap<NodeId, Point> {
        let mut nodes = FxHashMap::default();
        nodes.insert(0, Point::new(0.0, 0.0, 0.0));
        nodes.insert(1, Point::new(1.0, 0.0, 0.0));
        nodes.insert(2, Point::new(0.0, 1.0, 0.0));
        nodes.insert(3, Point::new(0.0, 0.0, 1.0));
        nodes.insert(4, Point::new(1.0, 1.0, 1.0));
        nodes
    }

    #[test]
    fn shared_face_is_deduplicated_and_opposite_signed() -> Result<(), GeomError> {
        let reg = SurfaceRegistry::new();
        let nodes = two_tetra_nodes();
        let elements = vec![
            TetraElement { nodes: [0, 1, 2, 3] },
            TetraElement { nodes: [1, 2, 3, 4] },
        ];
        let faces = build_tetra_faces(&reg, &nodes, &elements);
        let shared_abs: Vec<i32> = faces[0].iter().map(|f| f.abs()).collect();
        let shared_abs_2: Vec<i32> = faces[1].iter().map(|f| f.abs()).collect();
        let common = shared_abs.iter().filter(|id| shared_abs_2.contains(id)).count();
        assert_eq!(common, 1, "elements sharing a face must reuse its plane id");
        Ok(())
    }

    #[test]
    fn outer_faces_exclude_the_shared_one() {
        let reg = SurfaceRegistry::new();
        let nodes = two_tetra_nodes();
        let elements = vec![
            TetraElement { nodes: [0, 1, 2, 3] },
            TetraElement { nodes: [1, 2, 3, 4] },
        ];
        let faces = build_tetra_faces(&reg, &nodes, &elements);
        let outer = outer_face_ids(&faces);
        // 2 elements * 4 faces - 2 (the shared face counted once per side) = 6 outer faces.
        assert_eq!(outer.len(), 6);
    }
}
