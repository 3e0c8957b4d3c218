//! Closed triangulated mesh (an STL import or explicit triangle list).
//!
//! Grounded on `original_source/core/geometry/surface/polyhedron.hpp`'s `PolyHedron`:
//! a deduplicated vertex pool plus a set of triangle faces, with neighbor-adjacency used
//! in the original to classify interior/exterior edges for dihedral-angle bookkeeping.
//! That adjacency graph only matters for STL repair diagnostics (out of scope, §1
//! Non-goals: "mesh generation" beyond this convenience); the geometric queries below
//! only need the face list itself.

use crate::aabb::BoundingBox;
use crate::vecmath::{invalid_point, is_valid, same_point, Matrix4, Point, EPS};

use super::triangle::Triangle;
use super::{BoundingPlaneGroups, SurfaceOps};

#[derive(Clone, Debug)]
pub struct Polyhedron {
    pub faces: Vec<Triangle>,
}

impl Polyhedron {
    pub fn new(faces: Vec<Triangle>) -> Self {
        assert!(!faces.is_empty(), "polyhedron needs at least one face");
        Self { faces }
    }

    /// Deduplicated vertex pool, matching the original's `uniqueVertices_` bookkeeping;
    /// exposed for STL-export style consumers, not used by the geometric queries.
    pub fn unique_vertices(&self) -> Vec<Point> {
        let mut verts: Vec<Point> = Vec::new();
        for face in &self.faces {
            for v in face.vertices {
                if !verts.iter().any(|existing| same_point(existing, &v)) {
                    verts.push(v);
                }
            }
        }
        verts
    }

    /// Every face's raw `(face_index, on_edge, hit)` candidate along `(point,
    /// direction)`, before edge-ownership resolution.
    fn raw_hits(&self, point: &Point, direction: &Point) -> Vec<(usize, bool, Point)> {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(i, face)| {
                let (on_edge, hit) = face.intersect_with_edge_flag(point, direction);
                is_valid(&hit).then_some((i, on_edge, hit))
            })
            .collect()
    }
}

/// §4.2's edge-hit disambiguation: when several faces report a hit at (numerically)
/// the same point and at least one of them landed on an edge, only the face whose
/// centroid has the lexicographically smaller `(z, y, x)` survives — the others are
/// dropped as if they had missed. Faces that don't land on a shared edge are returned
/// unchanged. This keeps both the parity test and the nearest-hit search from
/// double-counting a ray that grazes a shared edge between two triangles.
fn resolve_edge_ownership(faces: &[Triangle], hits: Vec<(usize, bool, Point)>) -> Vec<(usize, Point)> {
    let mut groups: Vec<Vec<(usize, bool, Point)>> = Vec::new();
    for hit in hits {
        match groups.iter_mut().find(|g| same_point(&g[0].2, &hit.2)) {
            Some(group) => group.push(hit),
            None => groups.push(vec![hit]),
        }
    }
    let mut out = Vec::new();
    for group in groups {
        if group.len() == 1 || !group.iter().any(|(_, on_edge, _)| *on_edge) {
            out.extend(group.into_iter().map(|(i, _, p)| (i, p)));
            continue;
        }
        let winner = group
            .into_iter()
            .min_by(|a, b| zyx_key(faces[a.0].center()).partial_cmp(&zyx_key(faces[b.0].center())).unwrap())
            .expect("group is non-empty");
        out.push((winner.0, winner.2));
    }
    out
}

/// Sort key implementing §4.2's "lexicographically smaller `(z, y, x)`" tie-break.
fn zyx_key(p: Point) -> (f64, f64, f64) {
    (p.z, p.y, p.x)
}

impl SurfaceOps for Polyhedron {
    fn is_forward(&self, point: &Point, reversed: bool) -> bool {
        // Parity ray-cast along the non-degenerate test direction of §4.2: an odd
        // number of forward crossings means `point` is enclosed by the mesh (not
        // forward). Edge-hit ownership (§4.2) is resolved first so a ray grazing a
        // shared edge between two faces is counted exactly once, not twice.
        let probe = Point::new(1.1, 0.1, -0.1);
        let hits = self.raw_hits(point, &probe);
        let owned = resolve_edge_ownership(&self.faces, hits);
        let enclosed = owned.len() % 2 == 1;
        let outside = !enclosed;
        outside != reversed
    }

    fn intersect(&self, point: &Point, direction: &Point) -> Point {
        let hits = self.raw_hits(point, direction);
        let owned = resolve_edge_ownership(&self.faces, hits);
        let mut nearest: Option<(f64, Point)> = None;
        for (_, hit) in owned {
            let dist = (hit - point).norm();
            if dist <= EPS {
                continue;
            }
            if nearest.as_ref().map_or(true, |&(best, _)| dist < best) {
                nearest = Some((dist, hit));
            }
        }
        match nearest {
            Some((_, p)) => p,
            None => invalid_point(),
        }
    }

    fn apply_affine(&mut self, matrix: &Matrix4) {
        if matrix.is_zero() {
            return;
        }
        for face in &mut self.faces {
            face.apply_affine(matrix);
        }
    }

    fn bounding_planes(&self) -> BoundingPlaneGroups {
        self.faces.iter().map(|f| vec![f.bounding_planes()[0][0].clone()]).collect()
    }

    fn rough_bounding_box(&self, reversed: bool) -> BoundingBox {
        if reversed {
            return BoundingBox::universal();
        }
        let all_verts: Vec<Point> = self.faces.iter().flat_map(|f| f.vertices).collect();
        BoundingBox::from_points(&all_verts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tetrahedron() -> Polyhedron {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(0.0, 1.0, 0.0);
        let d = Point::new(0.0, 0.0, 1.0);
        Polyhedron::new(vec![
            Triangle::new([a, c, b], true),
            Triangle::new([a, b, d], true),
            Triangle::new([a, d, c], true),
            Triangle::new([b, c, d], true),
        ])
    }

    #[test]
    fn centroid_is_enclosed() {
        let poly = unit_tetrahedron();
        let centroid = Point::new(0.2, 0.2, 0.2);
        assert!(!poly.is_forward(&centroid, false));
    }

    #[test]
    fn far_point_is_forward() {
        let poly = unit_tetrahedron();
        assert!(poly.is_forward(&Point::new(50.0, 50.0, 50.0), false));
    }

    #[test]
    fn bounding_box_encloses_vertices() {
        let poly = unit_tetrahedron();
        let bb = poly.rough_bounding_box(false);
        for v in poly.unique_vertices() {
            assert!(bb.contains(&v));
        }
    }
}
