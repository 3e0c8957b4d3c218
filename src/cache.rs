//! Per-thread "last hit cell" cache behind `guess_cell`.
//!
//! Grounded on the teacher's `ReconstructionWorkspace`
//! (`splashsurf_lib::workspace::ReconstructionWorkspace`): a
//! `ThreadLocal<RefCell<...>>` so every worker thread gets its own scratch slot without
//! any locking, reused across calls instead of reallocated each time.

use std::cell::RefCell;

use thread_local::ThreadLocal;

use crate::cell::Cell;
use crate::registry::SurfaceRegistry;
use crate::vecmath::Point;

/// Thread-local single-entry cache of the last cell a `guess_cell` query resolved to.
/// Checking it first before falling back to a full linear/registry search turns the
/// common "many queries near the same point" access pattern (track-length tallying,
/// ray marching) into an O(1) hit.
#[derive(Default)]
pub struct LastHitCache {
    slot: ThreadLocal<RefCell<Option<String>>>,
}

impl LastHitCache {
    pub fn new() -> Self {
        Self {
            slot: ThreadLocal::new(),
        }
    }

    /// The name of the cell this thread last resolved to, if any.
    pub fn get(&self) -> Option<String> {
        self.slot
            .get_or(|| RefCell::new(None))
            .borrow()
            .clone()
    }

    pub fn set(&self, cell_name: impl Into<String>) {
        *self.slot.get_or(|| RefCell::new(None)).borrow_mut() = Some(cell_name.into());
    }

    pub fn clear(&self) {
        *self.slot.get_or(|| RefCell::new(None)).borrow_mut() = None;
    }
}

/// Consumer-facing cell lookup (§6): returns the first of `cells` containing `pos`, or
/// `undefined` if none do. In `strict` mode, more than one cell claiming `pos` (an
/// overlap the deck shouldn't have) also resolves to `undefined` rather than picking one
/// arbitrarily. When `cache` is supplied, the last-hit cell is checked first and, on a
/// fresh (non-cached) hit, becomes the new last-hit.
pub fn guess_cell<'a>(
    cells: &'a [Cell],
    undefined: &'a Cell,
    pos: &Point,
    registry: &SurfaceRegistry,
    strict: bool,
    cache: Option<&LastHitCache>,
) -> &'a Cell {
    if let Some(cache) = cache {
        if let Some(last_name) = cache.get() {
            if let Some(cell) = cells.iter().find(|c| c.name == last_name) {
                if cell.is_inside(pos, registry) {
                    return cell;
                }
            }
        }
    }

    let mut hits = cells.iter().filter(|c| c.is_inside(pos, registry));
    let first = hits.next();
    let found = if strict && first.is_some() && hits.next().is_some() {
        None
    } else {
        first
    };

    match found {
        Some(cell) => {
            if let Some(cache) = cache {
                cache.set(cell.name.clone());
            }
            cell
        }
        None => undefined,
    }
}
