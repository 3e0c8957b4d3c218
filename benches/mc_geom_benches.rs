use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mc_geom::cell::{Cell, CellAttributes};
use mc_geom::error::Location;
use mc_geom::registry::SurfaceRegistry;
use mc_geom::surface::{Sphere, Surface};
use mc_geom::vecmath::Point;

fn shell_registry() -> SurfaceRegistry {
    let reg = SurfaceRegistry::new();
    reg.register(
        1,
        "inner",
        Surface::Sphere(Sphere::new(Point::new(0.0, 0.0, 0.0), 3.0)),
        Location::unknown(),
    )
    .unwrap();
    reg.register(
        2,
        "outer",
        Surface::Sphere(Sphere::new(Point::new(0.0, 0.0, 0.0), 7.0)),
        Location::unknown(),
    )
    .unwrap();
    reg
}

fn point_in_cell(c: &mut Criterion) {
    let reg = shell_registry();
    let shell = Cell::new("shell", reg.make_index_equation("1 -2").unwrap(), CellAttributes::default());
    let point = Point::new(5.0, 0.0, 0.0);

    c.bench_function("cell is_inside", |b| {
        b.iter(|| black_box(shell.is_inside(black_box(&point), black_box(&reg))))
    });
}

fn nearest_intersection(c: &mut Criterion) {
    let reg = shell_registry();
    let shell = Cell::new("shell", reg.make_index_equation("1 -2").unwrap(), CellAttributes::default());
    let point = Point::new(5.0, 0.0, 0.0);
    let dir = Point::new(1.0, 0.0, 0.0);

    c.bench_function("cell nearest_forward_intersection", |b| {
        b.iter(|| {
            black_box(shell.nearest_forward_intersection(black_box(&point), black_box(&dir), black_box(&reg)))
        })
    });
}

criterion_group!(benches, point_in_cell, nearest_intersection);
criterion_main!(benches);
