//! Error types for deck parsing and geometry construction.
//!
//! Mirrors the teacher's `ReconstructionError` (`src/lib.rs`): a closed, named-variant
//! `thiserror` enum for everything this crate itself can diagnose, plus an
//! `anyhow::Error` catch-all for collaborator failures (I/O, transform parsing) it only
//! passes through.

use thiserror::Error;

/// A source location within a parsed deck, attached to construction errors so a caller
/// can point a user back at the offending card.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.file.is_empty() {
            write!(f, "<unknown location>")
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// Every error this crate can raise while parsing a deck or constructing cells/surfaces.
///
/// Runtime queries (`is_inside`, `get_next_intersections`, bounding-box lookups) never
/// return this type: per the error-handling policy they return sentinel values and log
/// a warning instead, matching the teacher's `getIntersection` contract.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeomError {
    #[error("{location}: invalid equation `{text}`: {hint}")]
    InvalidEquation {
        text: String,
        location: Location,
        hint: &'static str,
    },

    #[error("{location}: undefined reference to `{name}`: {hint}")]
    UndefinedReference {
        name: String,
        location: Location,
        hint: &'static str,
    },

    #[error("{location}: invalid surface `{name}`: {hint}")]
    InvalidSurface {
        name: String,
        location: Location,
        hint: &'static str,
    },

    #[error("{location}: invalid transform `{name}`: {hint}")]
    InvalidTransform {
        name: String,
        location: Location,
        hint: &'static str,
    },

    #[error("circular dependency among cells [{}]: {hint}", names.join(", "))]
    CircularDependency { names: Vec<String>, hint: &'static str },

    #[error("{location}: `{name}` is defined more than once: {hint}")]
    MultipleDefinition {
        name: String,
        location: Location,
        hint: &'static str,
    },

    #[error("{location}: invalid lattice specification for `{name}`: {hint}")]
    LatticeSpec {
        name: String,
        location: Location,
        hint: &'static str,
    },

    #[error("{location}: cell `{name}` has lat= but no fill=: {hint}")]
    FillMissing {
        name: String,
        location: Location,
        hint: &'static str,
    },

    #[error("I/O error reading `{path}`: {source}")]
    FileIO {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{path}`: invalid mesh data: {hint}")]
    MeshFormat { path: String, hint: &'static str },

    #[error("construction cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GeomResult<T> = Result<T, GeomError>;
