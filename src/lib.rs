//!
//! Constructive-solid-geometry engine for MCNP/PHITS-style radiation-transport input
//! decks. Surfaces are combined through a logical-expression algebra into cells; cells
//! are resolved (`like...but`, lattices, universe fills) into a flat registry that
//! supports point-in-cell and ray-intersection queries. Entry points are
//! [`cell_creator::solve_cell_dependency`] and [`cell_creator::instantiate_cells`] for
//! building a geometry, and [`cell::Cell::is_inside`]/[`cell::Cell::nearest_forward_intersection`]
//! for querying one.
//!

pub use nalgebra;

/// Vector/matrix helpers (the `Point` alias, rotation utilities, the homogeneous
/// `Matrix4` transform type) shared by every surface primitive.
pub mod vecmath;

/// The logical-expression algebra (`Mono`/`AndOf`/`OrOf`) cell equations are built from.
pub mod logic;

/// Error and source-location types returned by the parsing/construction pipeline.
pub mod error;

/// Axis-aligned bounding boxes and the cooperative-cancellation timeout flag.
pub mod aabb;

/// The `Surface` sum type and its eight implicit-primitive variants.
pub mod surface;

/// The signed-id surface registry (front/back dual views, name lookup).
pub mod registry;

/// The `Cell` runtime type: point-in-cell, ray intersection, tiered bounding boxes.
pub mod cell;

/// Per-thread "last hit cell" cache used to speed up repeated nearby queries.
pub mod cache;

/// `TRn`/`*TRn` transform-card parsing and lookup.
pub mod transform;

/// Deck-syntax logical-equation tokenising/parsing (`1 -2 : 3`, `#(1 -2)`, ...).
pub mod deck;

/// Builds and registers `Surface`s from parsed surface cards.
pub mod surface_creator;

/// The cell construction pipeline: dependency resolution, TRCL, lattice/tetra
/// expansion, universe fill, final instantiation and surface pruning.
pub mod cell_creator;

/// Rectangular/hexagonal lattice expansion (`LAT=1`/`LAT=2`).
pub mod lattice;

/// Tetrahedral mesh expansion (`LAT=3`).
pub mod tetra;

/// ASCII STL and `.node`/`.ele` tetrahedral mesh file loading (`stl=`/`tfile=` deck keys).
#[cfg(feature = "io")]
pub mod io;

pub use aabb::BoundingBox;
pub use cache::guess_cell;
pub use cell::Cell;
pub use error::{GeomError, GeomResult, Location};
pub use logic::LogicalExpression;
pub use registry::{SharedRegistry, SurfaceRegistry};
pub use surface::Surface;
pub use vecmath::{Matrix4, Point};
