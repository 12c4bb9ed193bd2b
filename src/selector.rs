//! Tiling of one logical RAM onto one physical primitive.
//!
//! Units placed in parallel widen the RAM for free. Units placed in series
//! deepen it but need an address decoder and an output multiplexer per bit,
//! which cost extra LUTs.

use crate::LogicalRam;
use crate::catalog::Primitive;
use crate::mode::MemMode;

/// Series chains of this length or longer are not supported by the decoder.
pub const MAX_SERIES: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestConfig {
    pub units: u32,
    pub extra_luts: u32,
    pub parallel: u32,
    pub series: u32,
    pub width: u32,
    pub depth: u32,
}

/// Why a primitive cannot realize a logical RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Infeasible {
    #[error("mode {0} not supported")]
    UnsupportedMode(MemMode),

    #[error("no tile usable in {0} mode")]
    NoTile(MemMode),

    #[error("needs {series} units in series")]
    TooDeep { series: u32 },

    #[error("unit or LUT count overflows")]
    Overflow,
}

/// Picks the tile needing the fewest physical units, earliest tile on ties.
pub fn select_config(ram: &LogicalRam, prim: &Primitive) -> Result<BestConfig, Infeasible> {
    if !prim.supports(ram.mode) {
        return Err(Infeasible::UnsupportedMode(ram.mode));
    }
    // the widest tile has no second port
    let usable = if ram.mode.is_true_dual_port() {
        prim.tiles.len().saturating_sub(1)
    } else {
        prim.tiles.len()
    };

    let (tile, parallel, series) = prim.tiles[..usable]
        .iter()
        .map(|tile| {
            let parallel = ram.width.div_ceil(tile.width);
            let series = ram.depth.div_ceil(tile.depth);
            (tile, parallel, series)
        })
        .min_by_key(|&(_, parallel, series)| u64::from(parallel) * u64::from(series))
        .ok_or(Infeasible::NoTile(ram.mode))?;

    if series >= MAX_SERIES {
        return Err(Infeasible::TooDeep { series });
    }

    let mut extra_luts = extra_luts(series, ram.width).ok_or(Infeasible::Overflow)?;
    if ram.mode.is_true_dual_port() {
        extra_luts = extra_luts.checked_mul(2).ok_or(Infeasible::Overflow)?;
    }

    Ok(BestConfig {
        units: parallel.checked_mul(series).ok_or(Infeasible::Overflow)?,
        extra_luts,
        parallel,
        series,
        width: tile.width,
        depth: tile.depth,
    })
}

/// LUTs for an `s`-way decoder plus one `s:1` multiplexer per data bit.
/// `None` when the count does not fit in a `u32`.
pub fn extra_luts(series: u32, width: u32) -> Option<u32> {
    if series <= 1 {
        return Some(0);
    }
    width
        .checked_mul(mux_luts_per_bit(series))?
        .checked_add(decoder_luts(series))
}

fn decoder_luts(series: u32) -> u32 {
    if series == 2 { 1 } else { series }
}

fn mux_luts_per_bit(series: u32) -> u32 {
    match series {
        0..=4 => 1,
        5..=8 => 3,
        9..=12 => 4,
        _ => 5,
    }
}
