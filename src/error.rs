//! Error types for architecture loading, per-circuit optimization and the
//! top-level run.

use std::time::Duration;

use crate::selector::Infeasible;

/// Errors raised while loading or validating a RAM architecture.
///
/// All of these are fatal: nothing is solved with a broken catalog.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The architecture file could not be read.
    #[error("failed to read RAM architecture: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse RAM architecture: {0}")]
    Parse(String),

    /// A declared (width, depth) tile does not cover the primitive's bit size.
    #[error("{primitive}: tile {width}x{depth} does not multiply to bit_size {bit_size}")]
    TileMismatch {
        primitive: String,
        width: u32,
        depth: u32,
        bit_size: u32,
    },

    /// Width and depth lists of different length.
    #[error("{primitive}: {widths} widths but {depths} depths")]
    TileCount {
        primitive: String,
        widths: usize,
        depths: usize,
    },

    /// A primitive without any candidate tile.
    #[error("{0}: no candidate widths")]
    NoTiles(String),

    /// Availability must be strictly positive.
    #[error("{primitive}: availability {availability} must be > 0")]
    Availability { primitive: String, availability: f64 },

    /// Neither LUTRAM nor any block RAM was described.
    #[error("architecture has no RAM primitive")]
    Empty,
}

/// Errors reported by a MILP backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("model is infeasible")]
    Infeasible,

    #[error("model is unbounded")]
    Unbounded,

    /// The time budget expired before any incumbent was found.
    #[error("no solution within {0:?}")]
    TimeLimit(Duration),

    #[error("solver backend failed: {0}")]
    Backend(String),
}

/// Failure of a single circuit. Other circuits are still attempted.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    /// No primitive can realize this logical RAM.
    #[error("circuit {circuit}: logical RAM {ram} cannot be mapped ({})", describe(.reasons))]
    InfeasibleRam {
        circuit: u32,
        ram: u32,
        reasons: Vec<(String, Infeasible)>,
    },

    #[error("circuit {circuit}: {source}")]
    Solver {
        circuit: u32,
        #[source]
        source: SolveError,
    },

    /// The solver returned values that select no primitive for a RAM.
    #[error("circuit {circuit}: solution selects no primitive for logical RAM {ram}")]
    NoSelection { circuit: u32, ram: u32 },
}

impl CircuitError {
    pub fn circuit(&self) -> u32 {
        match self {
            CircuitError::InfeasibleRam { circuit, .. }
            | CircuitError::Solver { circuit, .. }
            | CircuitError::NoSelection { circuit, .. } => *circuit,
        }
    }
}

fn describe(reasons: &[(String, Infeasible)]) -> String {
    if reasons.is_empty() {
        return "no primitive available".to_string();
    }
    reasons
        .iter()
        .map(|(name, why)| format!("{name}: {why}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that stop the whole run.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{path}: {message}")]
    Manifest { path: String, message: String },
}
