//! End-to-end scenarios exercising the full parse -> register -> construct -> query path.

use mc_geom::cell::{Cell, CellAttributes};
use mc_geom::cell_creator;
use mc_geom::error::{GeomError, Location};
use mc_geom::logic::LogicalExpression;
use mc_geom::registry::SurfaceRegistry;
use mc_geom::surface::{Plane, Sphere, Surface, Torus};
use mc_geom::vecmath::{Matrix4, Point};

fn origin() -> Point {
    Point::new(0.0, 0.0, 0.0)
}

fn sphere(reg: &SurfaceRegistry, id: i32, name: &str, center: Point, radius: f64) {
    reg.register(id, name, Surface::Sphere(Sphere::new(center, radius)), Location::unknown())
        .unwrap();
}

fn plane(reg: &SurfaceRegistry, id: i32, name: &str, normal: Point, distance: f64) {
    reg.register(id, name, Surface::Plane(Plane::new(normal, distance)), Location::unknown())
        .unwrap();
}

/// 1. Concentric spheres: a ray from the common center crosses the inner sphere first,
/// then the outer one, each at its radius from the origin (a track-length sanity check).
#[test]
fn concentric_spheres_track_length() {
    let reg = SurfaceRegistry::new();
    sphere(&reg, 1, "inner", origin(), 3.0);
    sphere(&reg, 2, "outer", origin(), 7.0);

    let inner = Cell::new(
        "inner_cell",
        reg.make_index_equation("-1").unwrap(),
        CellAttributes::default(),
    );
    let shell = Cell::new(
        "shell_cell",
        reg.make_index_equation("1 -2").unwrap(),
        CellAttributes::default(),
    );

    let origin = origin();
    let dir = Point::new(1.0, 0.0, 0.0);

    assert!(inner.is_inside(&origin, &reg));
    let exit_inner = inner.nearest_forward_intersection(&origin, &dir, &reg).unwrap();
    assert!(mc_geom::vecmath::same_double(exit_inner.distance, 3.0));

    let just_past_inner = Point::new(3.0 + 1.0e-6, 0.0, 0.0);
    assert!(shell.is_inside(&just_past_inner, &reg));
    let exit_shell = shell
        .nearest_forward_intersection(&just_past_inner, &dir, &reg)
        .unwrap();
    assert!((exit_shell.distance - (7.0 - 3.0)).abs() < 1.0e-5);
}

/// 2. A single plane splits space into exactly two complementary half-cells.
#[test]
fn plane_split_is_complementary() {
    let reg = SurfaceRegistry::new();
    plane(&reg, 1, "mid", Point::new(0.0, 0.0, 1.0), 0.0);

    let upper = Cell::new("upper", reg.make_index_equation("1").unwrap(), CellAttributes::default());
    let lower = Cell::new("lower", reg.make_index_equation("-1").unwrap(), CellAttributes::default());

    let above = Point::new(0.0, 0.0, 5.0);
    let below = Point::new(0.0, 0.0, -5.0);
    assert!(upper.is_inside(&above, &reg) && !lower.is_inside(&above, &reg));
    assert!(lower.is_inside(&below, &reg) && !upper.is_inside(&below, &reg));
}

/// 3. `#(1 2)` (complement of an AND) is equivalent to `-1 : -2` (De Morgan), checked by
/// sampling points in all four sign combinations relative to two half-spaces.
#[test]
fn complement_expansion_matches_de_morgan() {
    let reg = SurfaceRegistry::new();
    plane(&reg, 1, "a", Point::new(1.0, 0.0, 0.0), 0.0);
    plane(&reg, 2, "b", Point::new(0.0, 1.0, 0.0), 0.0);

    let complemented = Cell::new(
        "c1",
        reg.make_index_equation("#(1 2)").unwrap(),
        CellAttributes::default(),
    );
    let demorgan = Cell::new(
        "c2",
        reg.make_index_equation("-1 : -2").unwrap(),
        CellAttributes::default(),
    );

    for (x, y) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
        let p = Point::new(x, y, 0.0);
        assert_eq!(complemented.is_inside(&p, &reg), demorgan.is_inside(&p, &reg));
    }
}

/// 4. A rectangular 2x2x1 lattice (`LAT=1`) expands into exactly four elements, each
/// containing its own cell center and none of its neighbors'.
#[test]
fn rectangular_lattice_2x2x1_expansion() {
    use mc_geom::lattice::{AxisRange, LatticeDimensions};

    let reg = SurfaceRegistry::new();
    // A generously sized bounding sphere standing in for "inside the lattice universe",
    // the region every element's unit-cell planes further clip down.
    sphere(&reg, 99, "lattice_bound", origin(), 1000.0);
    let dims = LatticeDimensions {
        i: AxisRange { lo: 0, hi: 1 },
        j: AxisRange { lo: 0, hi: 1 },
        k: AxisRange { lo: 0, hi: 0 },
    };
    let base_eq = LogicalExpression::factor(-99);
    let elements = cell_creator::expand_rectangular_lattice(
        "lat",
        &base_eq,
        &reg,
        origin(),
        [Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0), Point::new(0.0, 0.0, 1.0)],
        [2.0, 2.0, 2.0],
        &dims,
    );
    assert_eq!(elements.len(), 4);

    let cells: Vec<Cell> = elements
        .iter()
        .map(|(name, eq, _)| Cell::new(name.clone(), eq.clone(), CellAttributes::default()))
        .collect();

    // Each element's own center (at pitch*(index)) must be inside exactly that element.
    for (idx, (_, _, index)) in elements.iter().enumerate() {
        let center = Point::new(index.0 as f64 * 2.0, index.1 as f64 * 2.0, 0.0);
        let mut containing = 0;
        for cell in &cells {
            if cell.is_inside(&center, &reg) {
                containing += 1;
            }
        }
        assert_eq!(containing, 1, "element {idx} center must land in exactly one lattice cell");
    }
}

/// 5. A torus ray intersection: a ray along the torus's own symmetry axis, offset to
/// pass through the tube, crosses it twice (entering and leaving the donut's tube).
#[test]
fn torus_ray_intersections() {
    let r_major = 10.0;
    let tube = 2.0;
    let torus = Torus::new(r_major, tube, tube, Matrix4::identity());
    let reg = SurfaceRegistry::new();
    reg.register(1, "t", Surface::Torus(torus), Location::unknown()).unwrap();

    let cell = Cell::new("t_cell", reg.make_index_equation("-1").unwrap(), CellAttributes::default());

    // Start inside the tube cross-section at (r_major, 0, 0), shoot along +x: this exits
    // through the near tube wall at distance ~tube.
    let start = Point::new(r_major, 0.0, 0.0);
    assert!(cell.is_inside(&start, &reg));
    let dir = Point::new(1.0, 0.0, 0.0);
    let hit = cell.nearest_forward_intersection(&start, &dir, &reg);
    assert!(hit.is_some());
    let hit = hit.unwrap();
    assert!((hit.distance - tube).abs() < 1.0e-3);
}

/// 6. Two cells whose `like...but` references form a cycle are rejected rather than
/// looping forever.
#[test]
fn circular_like_but_is_detected() {
    use fxhash::FxHashMap;
    use mc_geom::cell_creator::CellCard;

    let mut cards: FxHashMap<String, CellCard> = FxHashMap::default();
    cards.insert(
        "a".to_string(),
        CellCard {
            name: "a".to_string(),
            location: Location::unknown(),
            equation_text: None,
            like: Some("b".to_string()),
            but_overrides: vec![],
            attributes: CellAttributes::default(),
            trcl: None,
            universe: None,
            lat: None,
            fill_universe: None,
            fill_dims: None,
            fill_universe_grid: vec![],
        },
    );
    cards.insert(
        "b".to_string(),
        CellCard {
            name: "b".to_string(),
            location: Location::unknown(),
            equation_text: None,
            like: Some("a".to_string()),
            but_overrides: vec![],
            attributes: CellAttributes::default(),
            trcl: None,
            universe: None,
            lat: None,
            fill_universe: None,
            fill_dims: None,
            fill_universe_grid: vec![],
        },
    );

    let result = cell_creator::solve_cell_dependency(cards);
    assert!(matches!(result, Err(GeomError::CircularDependency { .. })));
}
