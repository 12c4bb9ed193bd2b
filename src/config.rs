//! RAM architecture files.
//!
//! ```toml
//! [lutram]
//! bit_size = 640
//! availability = 2.0
//! modes = ["ROM", "SinglePort", "SimpleDualPort"]
//! widths = [10, 20]
//!
//! [[bram]]
//! name = "M8K"
//! bit_size = 8192
//! availability = 10.0
//! modes = ["ROM", "SinglePort", "SimpleDualPort", "TrueDualPort"]
//! widths = [1, 2, 4, 8, 16, 32]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::catalog::{Primitive, PrimitiveCatalog, Tile, block_ram_area, tiles_from_widths};
use crate::error::ConfigError;
use crate::mode::MemMode;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchitectureFile {
    #[serde(default)]
    pub lutram: Option<PrimitiveSection>,
    #[serde(default)]
    pub bram: Vec<PrimitiveSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrimitiveSection {
    #[serde(default)]
    pub name: Option<String>,
    pub bit_size: u32,
    pub availability: f64,
    pub modes: Vec<MemMode>,
    pub widths: Vec<u32>,
    /// Defaults to `bit_size / width` for each width.
    #[serde(default)]
    pub depths: Option<Vec<u32>>,
    /// Defaults to the block RAM area formula. Ignored for LUTRAM.
    #[serde(default)]
    pub area: Option<f64>,
}

pub fn load_catalog(path: &Path) -> Result<PrimitiveCatalog, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_catalog_from_str(&content)
}

pub fn load_catalog_from_str(content: &str) -> Result<PrimitiveCatalog, ConfigError> {
    let file: ArchitectureFile =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let lutram = file
        .lutram
        .map(|section| {
            let name = section.name.clone().unwrap_or_else(|| "LUTRAM".to_string());
            let tiles = section_tiles(&name, &section)?;
            Primitive::new(
                name,
                section.bit_size,
                section.modes,
                tiles,
                section.availability,
                0.0,
            )
        })
        .transpose()?;

    let brams = file
        .bram
        .into_iter()
        .enumerate()
        .map(|(k, section)| {
            let name = section.name.clone().unwrap_or_else(|| format!("BRAM{k}"));
            let tiles = section_tiles(&name, &section)?;
            let mut prim = Primitive::new(
                name,
                section.bit_size,
                section.modes,
                tiles,
                section.availability,
                0.0,
            )?;
            prim.area_per_unit = section
                .area
                .unwrap_or_else(|| block_ram_area(prim.bit_size, prim.max_width()));
            Ok(prim)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    PrimitiveCatalog::new(lutram, brams)
}

fn section_tiles(name: &str, section: &PrimitiveSection) -> Result<Vec<Tile>, ConfigError> {
    match &section.depths {
        None => Ok(tiles_from_widths(section.bit_size, &section.widths)),
        Some(depths) if depths.len() != section.widths.len() => Err(ConfigError::TileCount {
            primitive: name.to_string(),
            widths: section.widths.len(),
            depths: depths.len(),
        }),
        Some(depths) => Ok(section
            .widths
            .iter()
            .zip(depths)
            .map(|(&width, &depth)| Tile { width, depth })
            .collect()),
    }
}
