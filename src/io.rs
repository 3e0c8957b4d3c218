//! ASCII STL and PHITS/TetGen `.node`/`.ele` mesh file loading, gated behind the `io`
//! feature (§6 "STL files", "Tetra files").
//!
//! Grounded on `original_source/core/geometry/surface/polyhedron.cpp`'s `fromStlFile`
//! (line-oriented `solid`/`facet`/`vertex`/`endfacet`/`endsolid` scan over the ASCII STL
//! dialect; binary STL was never supported there either) and
//! `original_source/core/geometry/tetracreator.cpp`'s `.node`/`.ele` reader (header row
//! giving the element/node count plus a fixed column count, one data row per line).

use std::path::Path;

use fxhash::FxHashMap;
use nom::character::complete::multispace0;
use nom::number::complete::double;
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::error::GeomError;
use crate::surface::{Polyhedron, Triangle};
use crate::tetra::{NodeId, TetraElement};
use crate::vecmath::Point;

/// Vertex snap-to-grid tolerance the original's STL loader applies so coincident seams
/// between adjacent facets compare equal once floating-point noise is involved.
pub const DEFAULT_STL_TOLERANCE: f64 = 1.0e-6;

/// A `.node`/`.ele` pair parsed into the shared node table plus one element per row,
/// the attribute column (the `<attr>` in `<id> v1 v2 v3 v4 <attr>`) carried alongside
/// each element since it names the universe the element belongs to (§6 "Tetra files").
pub struct TetraMesh {
    pub nodes: FxHashMap<NodeId, Point>,
    pub elements: Vec<TetraElement>,
    pub attributes: Vec<String>,
}

fn ws_double(input: &str) -> IResult<&str, f64> {
    preceded(multispace0, double)(input)
}

fn parse_xyz(input: &str) -> Option<(f64, f64, f64)> {
    let (_, (x, y, z)) = tuple((ws_double, ws_double, ws_double))(input).ok()?;
    Some((x, y, z))
}

fn snap(value: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        value
    } else {
        (value / tolerance).round() * tolerance
    }
}

fn mesh_err(path: &str, hint: &'static str) -> GeomError {
    GeomError::MeshFormat { path: path.to_string(), hint }
}

/// Parses already-read ASCII STL text (`solid ... endsolid`) into a [`Polyhedron`].
/// `tolerance` snaps vertices to a grid before each facet's triangle is built, so
/// shared-edge vertices written with slightly different trailing digits still compare
/// equal; pass `0.0` to disable snapping.
pub fn parse_stl_ascii(text: &str, tolerance: f64, path: &str) -> Result<Polyhedron, GeomError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines.next().ok_or_else(|| mesh_err(path, "empty STL file"))?;
    if !header.to_ascii_lowercase().starts_with("solid") {
        return Err(mesh_err(path, "STL file must begin with a `solid` header line"));
    }

    let mut faces = Vec::new();
    let mut pending: Vec<Point> = Vec::with_capacity(3);
    let mut saw_endsolid = false;

    for line in lines {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("endsolid") {
            saw_endsolid = true;
            break;
        }
        if lower.starts_with("facet") || lower.starts_with("outer loop") || lower.starts_with("endloop") {
            continue;
        }
        if lower.starts_with("endfacet") {
            if pending.len() != 3 {
                return Err(mesh_err(path, "facet did not contain exactly three vertices"));
            }
            let v: Vec<Point> = pending.drain(..).collect();
            // STL's right-hand-rule winding is counter-clockwise as seen from outside.
            faces.push(Triangle::new([v[0], v[1], v[2]], true));
            continue;
        }
        if let Some(rest) = lower.strip_prefix("vertex") {
            let (x, y, z) = parse_xyz(rest).ok_or_else(|| mesh_err(path, "malformed vertex line"))?;
            pending.push(Point::new(snap(x, tolerance), snap(y, tolerance), snap(z, tolerance)));
        }
    }

    if !saw_endsolid {
        return Err(mesh_err(path, "missing `endsolid` terminator"));
    }
    if faces.is_empty() {
        return Err(mesh_err(path, "STL file contained no facets"));
    }
    Ok(Polyhedron::new(faces))
}

/// Reads `path` from disk and parses it as an ASCII STL mesh (the `stl=` surface key).
pub fn load_stl_file(path: &Path, tolerance: f64) -> Result<Polyhedron, GeomError> {
    let text = std::fs::read_to_string(path).map_err(|source| GeomError::FileIO {
        path: path.display().to_string(),
        source,
    })?;
    parse_stl_ascii(&text, tolerance, &path.display().to_string())
}

/// First non-blank, non-comment (`#`-led) line, trimmed.
fn next_record<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Option<&'a str> {
    for line in lines {
        let stripped = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let trimmed = stripped.trim();
        if !trimmed.is_empty() {
            return Some(trimmed);
        }
    }
    None
}

/// Parses already-read `.node` file text: a header `N 3 ...` followed by `N` rows of
/// `<id> x y z`.
fn parse_node_text(text: &str, path: &str) -> Result<FxHashMap<NodeId, Point>, GeomError> {
    let mut lines = text.lines();
    let header = next_record(&mut lines).ok_or_else(|| mesh_err(path, "missing node-file header"))?;
    let header_cols: Vec<&str> = header.split_whitespace().collect();
    if header_cols.len() < 2 {
        return Err(mesh_err(path, "node-file header needs at least a count and a dimension field"));
    }
    let expected: usize = header_cols[0].parse().map_err(|_| mesh_err(path, "node-file header count is not an integer"))?;
    let dims: usize = header_cols[1].parse().map_err(|_| mesh_err(path, "node-file header dimension is not an integer"))?;
    if dims != 3 {
        return Err(mesh_err(path, "only 3-dimensional node files are supported"));
    }

    let mut nodes = FxHashMap::default();
    while let Some(row) = next_record(&mut lines) {
        let cols: Vec<&str> = row.split_whitespace().collect();
        if cols.len() < 4 {
            return Err(mesh_err(path, "node row needs an id and three coordinates"));
        }
        let id: NodeId = cols[0].parse().map_err(|_| mesh_err(path, "node id is not an integer"))?;
        let x: f64 = cols[1].parse().map_err(|_| mesh_err(path, "node x coordinate is not a number"))?;
        let y: f64 = cols[2].parse().map_err(|_| mesh_err(path, "node y coordinate is not a number"))?;
        let z: f64 = cols[3].parse().map_err(|_| mesh_err(path, "node z coordinate is not a number"))?;
        nodes.insert(id, Point::new(x, y, z));
    }

    if nodes.len() < expected {
        return Err(mesh_err(path, "unexpected EOF before the declared node count was reached"));
    }
    Ok(nodes)
}

/// Parses already-read `.ele` file text: a header `N 4 attrs` followed by `N` rows of
/// `<id> v1 v2 v3 v4 <attr>`, where `attr` names the filling universe of that element.
fn parse_ele_text(text: &str, path: &str) -> Result<(Vec<TetraElement>, Vec<String>), GeomError> {
    let mut lines = text.lines();
    let header = next_record(&mut lines).ok_or_else(|| mesh_err(path, "missing element-file header"))?;
    let header_cols: Vec<&str> = header.split_whitespace().collect();
    if header_cols.len() != 3 {
        return Err(mesh_err(path, "element-file header must have exactly three fields"));
    }
    let expected: usize = header_cols[0].parse().map_err(|_| mesh_err(path, "element-file header count is not an integer"))?;
    let verts_per_elem: usize = header_cols[1].parse().map_err(|_| mesh_err(path, "element-file header vertex count is not an integer"))?;
    if verts_per_elem != 4 {
        return Err(mesh_err(path, "only first-order (4-node) tetrahedra are supported"));
    }

    let mut elements = Vec::with_capacity(expected);
    let mut attributes = Vec::with_capacity(expected);
    while let Some(row) = next_record(&mut lines) {
        let cols: Vec<&str> = row.split_whitespace().collect();
        if cols.len() < 6 {
            return Err(mesh_err(path, "element row needs an id, four vertex ids, and an attribute"));
        }
        let parse_node = |s: &str| s.parse::<NodeId>().map_err(|_| mesh_err(path, "element vertex id is not an integer"));
        let nodes = [parse_node(cols[1])?, parse_node(cols[2])?, parse_node(cols[3])?, parse_node(cols[4])?];
        elements.push(TetraElement { nodes });
        attributes.push(cols[5].to_string());
        if elements.len() == expected {
            break;
        }
    }

    if elements.len() < expected {
        return Err(mesh_err(path, "unexpected EOF before the declared element count was reached"));
    }
    Ok((elements, attributes))
}

/// Reads and parses a `.node`/`.ele` pair sharing `base_path` as their common stem (e.g.
/// `mesh` for `mesh.node`/`mesh.ele`), the `tfile=` form of a `LAT=3` cell card.
pub fn load_tetra_mesh(base_path: &Path) -> Result<TetraMesh, GeomError> {
    let node_path = base_path.with_extension("node");
    let ele_path = base_path.with_extension("ele");

    let node_text = std::fs::read_to_string(&node_path).map_err(|source| GeomError::FileIO {
        path: node_path.display().to_string(),
        source,
    })?;
    let ele_text = std::fs::read_to_string(&ele_path).map_err(|source| GeomError::FileIO {
        path: ele_path.display().to_string(),
        source,
    })?;

    let nodes = parse_node_text(&node_text, &node_path.display().to_string())?;
    let (elements, attributes) = parse_ele_text(&ele_text, &ele_path.display().to_string())?;
    Ok(TetraMesh { nodes, elements, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA_STL: &str = "solid tetra\n\
facet normal 0 0 -1\n\
  outer loop\n\
    vertex 0 0 0\n\
    vertex 1 0 0\n\
    vertex 0 1 0\n\
  endloop\n\
endfacet\n\
facet normal 0 -1 0\n\
  outer loop\n\
    vertex 0 0 0\n\
    vertex 1 0 0\n\
    vertex 0 0 1\n\
  endloop\n\
endfacet\n\
endsolid tetra\n";

    #[test]
    fn parses_two_facet_ascii_stl() {
        let poly = parse_stl_ascii(TETRA_STL, DEFAULT_STL_TOLERANCE, "tetra.stl").unwrap();
        assert_eq!(poly.faces.len(), 2);
    }

    #[test]
    fn rejects_stl_without_header() {
        let err = parse_stl_ascii("facet normal 0 0 1\nendsolid\n", DEFAULT_STL_TOLERANCE, "bad.stl");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_stl_missing_endsolid() {
        let err = parse_stl_ascii("solid x\nfacet normal 0 0 1\n", DEFAULT_STL_TOLERANCE, "bad.stl");
        assert!(err.is_err());
    }

    const NODE_TEXT: &str = "5 3 0 0\n\
0 0.0 0.0 0.0\n\
1 1.0 0.0 0.0\n\
2 0.0 1.0 0.0\n\
3 0.0 0.0 1.0\n\
4 1.0 1.0 1.0\n";

    const ELE_TEXT: &str = "2 4 1\n\
0 0 1 2 3 uA\n\
1 1 2 3 4 uB\n";

    #[test]
    fn parses_node_and_element_files() {
        let nodes = parse_node_text(NODE_TEXT, "t.node").unwrap();
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[&4], Point::new(1.0, 1.0, 1.0));

        let (elements, attrs) = parse_ele_text(ELE_TEXT, "t.ele").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].nodes, [0, 1, 2, 3]);
        assert_eq!(attrs, vec!["uA".to_string(), "uB".to_string()]);
    }

    #[test]
    fn rejects_node_file_with_wrong_dimension() {
        let bad = "3 2 0\n0 0.0 0.0\n";
        assert!(parse_node_text(bad, "t.node").is_err());
    }

    #[test]
    fn rejects_element_file_with_non_tetra_vertex_count() {
        let bad = "1 3 1\n0 0 1 2 uA\n";
        assert!(parse_ele_text(bad, "t.ele").is_err());
    }

    #[test]
    fn rejects_truncated_element_file() {
        let bad = "2 4 1\n0 0 1 2 3 uA\n";
        assert!(parse_ele_text(bad, "t.ele").is_err());
    }
}
