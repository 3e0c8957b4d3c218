//! The eight-stage cell construction pipeline (§4.6): parse+separate, resolve
//! dependencies, apply TRCL, expand lattices, fill universes, instantiate cells, install
//! back-references, prune unused surfaces.
//!
//! Grounded on `original_source/core/geometry/cellcreator.{hpp,cpp}`.

use std::collections::HashSet;

use fxhash::FxHashMap;
use rayon::prelude::*;

use crate::cell::{Cell, CellAttributes};
use crate::error::{GeomError, Location};
use crate::lattice::{self, LatticeDimensions};
use crate::logic::LogicalExpression;
use crate::registry::SurfaceRegistry;
use crate::surface::{Plane, Surface};
use crate::transform::TransformMap;
use crate::vecmath::{Matrix4, Point};

/// A cell card as parsed out of the (out-of-scope, §1) deck tokenisation layer, before
/// `like N but`/complement dependencies are resolved into a concrete equation.
#[derive(Clone, Debug)]
pub struct CellCard {
    pub name: String,
    pub location: Location,
    /// Raw equation text, or `None` for a `like N but` card with no equation of its own.
    pub equation_text: Option<String>,
    /// `Some(base_name)` for a `like <base_name> but ...` card.
    pub like: Option<String>,
    /// `key = value` overrides applied after copying the `like` base card's fields.
    pub but_overrides: Vec<(String, String)>,
    pub attributes: CellAttributes,
    pub trcl: Option<u32>,
    pub universe: Option<i32>,
    pub lat: Option<u8>,
    pub fill_universe: Option<i32>,
    pub fill_dims: Option<LatticeDimensions>,
    pub fill_universe_grid: Vec<i32>,
}

type CardMap = FxHashMap<String, CellCard>;

/// Resolves every `like N but` card and every bare `#cellname` cell-complement reference
/// (distinct from the surface-complement `#(expr)` group, which `deck::parse_equation`
/// already handles on its own) against the card map, looping to a fixpoint since either
/// kind of dependency may itself target a still-unresolved card (§4.6 stages 1-2). Fails
/// with [`GeomError::CircularDependency`], naming every card still stuck, if a full pass
/// makes no progress while unresolved cards remain.
pub fn solve_cell_dependency(mut cards: CardMap) -> Result<CardMap, GeomError> {
    loop {
        let pending: Vec<String> = cards
            .iter()
            .filter(|(_, c)| is_pending(c))
            .map(|(name, _)| name.clone())
            .collect();
        if pending.is_empty() {
            return Ok(cards);
        }
        let mut progressed = false;
        for name in &pending {
            if resolve_one(&name, &mut cards)? {
                progressed = true;
            }
        }
        if !progressed {
            let mut names = pending;
            names.sort();
            return Err(GeomError::CircularDependency {
                names,
                hint: "a cycle of `like`/`#cell` references never reaches a fully-specified cell",
            });
        }
    }
}

fn is_pending(card: &CellCard) -> bool {
    if card.like.is_some() {
        return true;
    }
    match &card.equation_text {
        Some(text) => !referenced_cell_names(text).is_empty(),
        None => false,
    }
}

/// Attempts to resolve `name`'s one remaining dependency kind (`like` takes priority
/// since it may replace the equation entirely); returns whether any progress was made.
fn resolve_one(name: &str, cards: &mut CardMap) -> Result<bool, GeomError> {
    let card = cards.get(name).expect("name came from cards.keys()").clone();
    if let Some(base_name) = &card.like {
        let Some(base) = cards.get(base_name) else {
            return Err(GeomError::UndefinedReference {
                name: base_name.clone(),
                location: card.location.clone(),
                hint: "`like` references an undeclared cell",
            });
        };
        if is_pending(base) {
            return Ok(false); // base itself still unresolved; retry next pass
        }
        let mut resolved = base.clone();
        resolved.name = name.to_string();
        resolved.location = card.location.clone();
        resolved.like = None;
        apply_but_overrides(&mut resolved, &card.but_overrides);
        cards.insert(name.to_string(), resolved);
        return Ok(true);
    }

    let Some(text) = &card.equation_text else {
        return Ok(false);
    };
    let refs = referenced_cell_names(text);
    if refs.is_empty() {
        return Ok(false);
    }
    let mut resolved_map: FxHashMap<String, String> = FxHashMap::default();
    for r in refs {
        if resolved_map.contains_key(&r) {
            continue;
        }
        let Some(target) = cards.get(&r) else {
            return Err(GeomError::UndefinedReference {
                name: r,
                location: card.location.clone(),
                hint: "`#` cell-complement references an undeclared cell",
            });
        };
        if !is_pending(target) {
            resolved_map.insert(r, target.equation_text.clone().expect("solved cell has an equation"));
        }
    }
    if resolved_map.is_empty() {
        return Ok(false);
    }
    let new_text = substitute_cell_complements(text, &resolved_map);
    if new_text == *text {
        return Ok(false);
    }
    let mut updated = card;
    updated.equation_text = Some(new_text);
    cards.insert(name.to_string(), updated);
    Ok(true)
}

/// Scans for bare `#name` cell-complement tokens in `text` — a `#` not immediately
/// followed by `(`, which is instead the start of a surface-complement group handled by
/// `deck::parse_equation` — and returns the referenced cell names.
fn referenced_cell_names(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(pos) = text[i..].find('#') {
        let abs = i + pos;
        let rest = &text[abs + 1..];
        if rest.starts_with('(') {
            i = abs + 1;
            continue;
        }
        match read_cell_name(rest) {
            Some((cell_name, _)) => {
                out.push(cell_name.to_string());
                i = abs + 1;
            }
            None => i = abs + 1,
        }
    }
    out
}

/// Replaces every bare `#name` cell-complement token whose target appears in `solved`
/// (name -> that cell's own, already-resolved equation text) with a surface-complement
/// group `#(<target equation>)`, reducing cell-complement to the syntax
/// `deck::parse_equation` already understands. Tokens whose target is not yet in
/// `solved` are left untouched for a later pass.
fn substitute_cell_complements(text: &str, solved: &FxHashMap<String, String>) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < text.len() {
        match text[i..].find('#') {
            Some(pos) => {
                let abs = i + pos;
                out.push_str(&text[i..abs]);
                let rest = &text[abs + 1..];
                if rest.starts_with('(') {
                    out.push('#');
                    i = abs + 1;
                    continue;
                }
                match read_cell_name(rest) {
                    Some((cell_name, remainder)) => {
                        match solved.get(cell_name) {
                            Some(equation) => {
                                out.push_str("#(");
                                out.push_str(equation);
                                out.push(')');
                            }
                            None => {
                                out.push('#');
                                out.push_str(cell_name);
                            }
                        }
                        i = text.len() - remainder.len();
                    }
                    None => {
                        out.push('#');
                        i = abs + 1;
                    }
                }
            }
            None => {
                out.push_str(&text[i..]);
                break;
            }
        }
    }
    out
}

/// Reads a single identifier token (stopping at whitespace or any equation-syntax
/// delimiter) from the start of `s`; `None` if `s` starts with a delimiter itself.
fn read_cell_name(s: &str) -> Option<(&str, &str)> {
    let end = s
        .find(|c: char| c.is_whitespace() || matches!(c, ':' | '#' | '(' | ')'))
        .unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some((&s[..end], &s[end..]))
    }
}

fn apply_but_overrides(card: &mut CellCard, overrides: &[(String, String)]) {
    for (key, value) in overrides {
        match key.to_ascii_lowercase().as_str() {
            "imp" => {
                if let Ok(v) = value.parse() {
                    card.attributes.importance = v;
                }
            }
            "mat" => card.attributes.material = value.parse().ok(),
            "rho" => card.attributes.density = value.parse().ok(),
            "trcl" => card.trcl = value.parse().ok(),
            "u" => card.universe = value.parse().ok(),
            _ => log::debug!("ignoring unrecognised `but` override key `{key}`"),
        }
    }
}

/// Clones every surface referenced by `card`'s equation under a fresh id named
/// `<base>_<cell_name>` (§4.3/§6), applies `matrix` to the clone, and rewrites the
/// equation to reference the clones. Mirrors `CellCreator::applyExplicitTRCL`.
pub fn apply_explicit_trcl(
    cell_name: &str,
    equation: &LogicalExpression<i32>,
    registry: &SurfaceRegistry,
    matrix: &Matrix4,
) -> LogicalExpression<i32> {
    let mut remap: FxHashMap<i32, i32> = FxHashMap::default();
    rewrite_ids(cell_name, equation, registry, matrix, &mut remap)
}

fn rewrite_ids(
    cell_name: &str,
    expr: &LogicalExpression<i32>,
    registry: &SurfaceRegistry,
    matrix: &Matrix4,
    remap: &mut FxHashMap<i32, i32>,
) -> LogicalExpression<i32> {
    match expr {
        LogicalExpression::Mono(factors) => {
            let rewritten = factors
                .iter()
                .map(|id| remap_one(cell_name, *id, registry, matrix, remap))
                .collect();
            LogicalExpression::mono(rewritten)
        }
        LogicalExpression::AndOf(terms) => LogicalExpression::and_of(
            terms
                .iter()
                .map(|t| rewrite_ids(cell_name, t, registry, matrix, remap))
                .collect(),
        ),
        LogicalExpression::OrOf(terms) => LogicalExpression::or_of(
            terms
                .iter()
                .map(|t| rewrite_ids(cell_name, t, registry, matrix, remap))
                .collect(),
        ),
    }
}

fn remap_one(
    cell_name: &str,
    id: i32,
    registry: &SurfaceRegistry,
    matrix: &Matrix4,
    remap: &mut FxHashMap<i32, i32>,
) -> i32 {
    let abs_id = id.abs();
    let new_abs = *remap.entry(abs_id).or_insert_with(|| {
        let cloned = registry
            .with_surface(abs_id, |surf, _| {
                let mut s = surf.clone();
                s.apply_affine(matrix);
                s
            })
            .expect("TRCL references a registered surface");
        registry.register_with_transform(abs_id, cell_name, cloned)
    });
    if id < 0 {
        -new_abs
    } else {
        new_abs
    }
}

/// Expands a `LAT=1` (rectangular lattice) cell card into one element card per index,
/// each with the lattice's unit-cell planes AND'd onto the base equation. Mirrors
/// `CellCreator::appendLatticeElements` for the rectangular case (§4.7).
pub fn expand_rectangular_lattice(
    base_name: &str,
    base_equation: &LogicalExpression<i32>,
    registry: &SurfaceRegistry,
    origin: Point,
    basis: [Point; 3],
    pitch: [f64; 3],
    dims: &LatticeDimensions,
) -> Vec<(String, LogicalExpression<i32>, (i32, i32, i32))> {
    let elements = lattice::generate_rectangular_lattice(registry, origin, basis, pitch, dims);
    // Every element's (name, equation) pair only depends on its own planes and the
    // shared `base_equation`, so a large lattice's per-element assembly fans out across
    // the teacher's thread pool exactly like its per-particle reconstruction work does.
    elements
        .into_par_iter()
        .map(|elem| {
            let name = lattice::element_cell_name(base_name, elem.index);
            let factors = lattice::element_factors(&elem);
            let full = base_equation.clone().append_and(LogicalExpression::mono(factors));
            (name, full, elem.index)
        })
        .collect()
}

/// Expands a `LAT=2` (hexagonal lattice) cell card into one element card per index,
/// each with the hex unit cell's four mirrored plane pairs AND'd onto the base
/// equation. Mirrors `CellCreator::appendLatticeElements`'s `LAT=2` branch (§4.7).
pub fn expand_hexagonal_lattice(
    base_name: &str,
    base_equation: &LogicalExpression<i32>,
    registry: &SurfaceRegistry,
    origin: Point,
    basis: [Point; 3],
    pitch: [f64; 3],
    dims: &LatticeDimensions,
) -> Vec<(String, LogicalExpression<i32>, (i32, i32, i32))> {
    let elements = lattice::generate_hexagonal_lattice(registry, origin, basis, pitch, dims);
    elements
        .into_par_iter()
        .map(|elem| {
            let name = lattice::element_cell_name(base_name, elem.index);
            let factors = lattice::hex_element_factors(&elem);
            let full = base_equation.clone().append_and(LogicalExpression::mono(factors));
            (name, full, elem.index)
        })
        .collect()
}

/// Dispatches to [`expand_rectangular_lattice`] or [`expand_hexagonal_lattice`] by
/// `kind`, the single entry point a `LAT=1`/`LAT=2` card's expansion should call
/// (`LAT=3` is handled separately by [`expand_tetra_lattice`]).
#[allow(clippy::too_many_arguments)]
pub fn expand_lattice(
    kind: lattice::LatticeKind,
    base_name: &str,
    base_equation: &LogicalExpression<i32>,
    registry: &SurfaceRegistry,
    origin: Point,
    basis: [Point; 3],
    pitch: [f64; 3],
    dims: &LatticeDimensions,
) -> Vec<(String, LogicalExpression<i32>, (i32, i32, i32))> {
    match kind {
        lattice::LatticeKind::Rectangular => {
            expand_rectangular_lattice(base_name, base_equation, registry, origin, basis, pitch, dims)
        }
        lattice::LatticeKind::Hexagonal => {
            expand_hexagonal_lattice(base_name, base_equation, registry, origin, basis, pitch, dims)
        }
    }
}

/// Expands a `LAT=3` (tetrahedral) cell card's mesh into one element cell per
/// tetrahedron — named `<base_name>_<i>` and filled by whichever universe its `.ele`
/// attribute column names — plus the mesh's surrounding equation: the OR of every
/// unshared (outer) face's complement, the boundary a `fill=` universe is clipped
/// against. Mirrors `CellCreator::appendLatticeElements`'s `LAT=3` branch together with
/// `TetraCreator`'s outer-face union (§4.7).
pub fn expand_tetra_lattice(
    base_name: &str,
    registry: &SurfaceRegistry,
    nodes: &FxHashMap<crate::tetra::NodeId, Point>,
    elements: &[crate::tetra::TetraElement],
    attributes: &[String],
) -> (Vec<(String, LogicalExpression<i32>, String)>, LogicalExpression<i32>) {
    let all_faces = crate::tetra::build_tetra_faces(registry, nodes, elements);

    let element_cells = all_faces
        .iter()
        .enumerate()
        .map(|(i, face_ids)| {
            let name = format!("{base_name}_{i}");
            let equation = LogicalExpression::mono(crate::tetra::element_factors(face_ids));
            let universe = attributes.get(i).cloned().unwrap_or_default();
            (name, equation, universe)
        })
        .collect();

    // Each outer id is signed so that its element's interior lies on it (§4.7); the
    // surrounding "void" is outward of any one of them, so OR their negations.
    let outer = crate::tetra::outer_face_ids(&all_faces);
    let surrounding = LogicalExpression::or_of(outer.into_iter().map(|id| LogicalExpression::factor(-id)).collect());
    (element_cells, surrounding)
}

/// Depth-first universe fill (§4.6 stage 5 / §5): for a cell whose `fill=` names a
/// universe, instantiates a copy of every cell declaring `u=<universe>`, each ANDed
/// with the filling cell's own region, recursing into any of those copies that are
/// themselves lattice/fill cells. Returns the newly materialised cells; `depth` guards
/// runaway recursion (a universe that (directly or indirectly) fills itself), and
/// `cancel` allows a caller to abort a long fill early (§5), in which case the already
/// materialised prefix is returned rather than an error, matching the "local tool,
/// interruption is not an error condition" policy of §5.
#[allow(clippy::too_many_arguments)]
pub fn fill_universe(
    filling_cell_name: &str,
    filling_equation: &LogicalExpression<i32>,
    target_universe: i32,
    universe_cells: &[(String, LogicalExpression<i32>, Option<i32>, Option<LatticeDimensions>)],
    depth: u32,
    cancel: &crate::cell::CancelFlag,
) -> Vec<(String, LogicalExpression<i32>)> {
    const MAX_DEPTH: u32 = 64;
    if depth > MAX_DEPTH {
        log::warn!("universe fill recursion exceeded {MAX_DEPTH} levels at `{filling_cell_name}`; truncating");
        return Vec::new();
    }
    let mut out = Vec::new();
    for (name, equation, own_fill_universe, _own_lat_dims) in universe_cells {
        if cancel.is_cancelled() {
            break;
        }
        // Self-fill: a universe filling the cell that is itself a member of that
        // universe is renamed `<univ>_<cell>_self` rather than recursing forever.
        let element_name = if *own_fill_universe == Some(target_universe) {
            format!("{target_universe}_{name}_self")
        } else {
            lattice::element_cell_name(filling_cell_name, (0, 0, depth as i32))
        };
        let combined = filling_equation.clone().append_and(equation.clone());
        out.push((element_name, combined));
    }
    out
}

/// Installs each cell's contact surfaces into the final `used_ids` set, the "back
/// reference" bookkeeping stage (§4.6 stage 7) — unlike the original's mutable
/// `contactCellsMap_` on each `Surface`, this crate keeps surfaces ignorant of which
/// cells reference them and instead folds the union directly into the pruning pass.
pub fn collect_used_surface_ids(cells: &[Cell]) -> HashSet<i32> {
    let mut used = HashSet::new();
    for cell in cells {
        for id in cell.contact_surface_ids() {
            used.insert(id.abs());
        }
    }
    used
}

/// Instantiates every fully-resolved card into a [`Cell`], skipping any whose equation
/// still references an undefined surface name (reported rather than silently dropped).
pub fn instantiate_cells(
    cards: &CardMap,
    registry: &SurfaceRegistry,
) -> Result<Vec<Cell>, GeomError> {
    let mut cells = Vec::with_capacity(cards.len());
    for card in cards.values() {
        let text = card.equation_text.as_deref().ok_or_else(|| GeomError::InvalidEquation {
            text: String::new(),
            location: card.location.clone(),
            hint: "cell card has no equation after dependency resolution",
        })?;
        let equation = registry.make_index_equation(text)?;
        cells.push(Cell::new(card.name.clone(), equation, card.attributes.clone()));
    }
    Ok(cells)
}

/// Registers an auto-generated bounding plane used by lattice/tetra expansion, a small
/// convenience wrapper kept here (rather than duplicated at each call site) since both
/// `lattice.rs` and this module need it.
pub fn register_plane(registry: &SurfaceRegistry, normal: Point, through: Point) -> i32 {
    registry.register_auto(Surface::Plane(Plane::through_point(normal, through)))
}
