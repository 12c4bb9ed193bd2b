use crate::error::ConfigError;
use crate::mode::MemMode;

//logic block area without LUTRAM
pub const PLAIN_LB_AREA: f64 = 35000.0;
pub const LUTRAM_LB_AREA: f64 = 40000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysType {
    Lutram,
    Bram(usize),
}

impl PhysType {
    /// Code used in the mapping file: 1 for LUTRAM, `k + 2` for block RAM `k`.
    pub fn type_id(&self) -> u32 {
        match self {
            PhysType::Lutram => 1,
            PhysType::Bram(k) => *k as u32 + 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub width: u32,
    pub depth: u32,
}

#[derive(Clone, Debug)]
pub struct Primitive {
    pub name: String,
    pub bit_size: u32,
    pub modes: Vec<MemMode>,
    /// Candidate tiles, narrowest first. The last one is not usable in true dual port mode.
    pub tiles: Vec<Tile>,
    pub availability: f64,
    pub area_per_unit: f64,
}

impl Primitive {
    pub fn new(
        name: impl Into<String>,
        bit_size: u32,
        modes: Vec<MemMode>,
        tiles: Vec<Tile>,
        availability: f64,
        area_per_unit: f64,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if tiles.is_empty() {
            return Err(ConfigError::NoTiles(name));
        }
        for tile in &tiles {
            let bits = u64::from(tile.width) * u64::from(tile.depth);
            if bits == 0 || bits != u64::from(bit_size) {
                return Err(ConfigError::TileMismatch {
                    primitive: name,
                    width: tile.width,
                    depth: tile.depth,
                    bit_size,
                });
            }
        }
        if !(availability > 0.0) {
            return Err(ConfigError::Availability {
                primitive: name,
                availability,
            });
        }
        Ok(Primitive {
            name,
            bit_size,
            modes,
            tiles,
            availability,
            area_per_unit,
        })
    }

    pub fn supports(&self, mode: MemMode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn max_width(&self) -> u32 {
        self.tiles.last().map(|t| t.width).unwrap_or(0)
    }
}

//widths that do not divide bit_size give a tile that fails validation
pub fn tiles_from_widths(bit_size: u32, widths: &[u32]) -> Vec<Tile> {
    widths
        .iter()
        .map(|&width| Tile {
            width,
            depth: if width == 0 { 0 } else { bit_size / width },
        })
        .collect()
}

pub fn block_ram_area(bits: u32, max_width: u32) -> f64 {
    let bits_f = bits as f64;
    9000.0 + 5.0 * bits_f + 90.0 * bits_f.sqrt() + 600.0 * 2.0 * (max_width as f64)
}

pub fn avg_logic_block_area(lutram_availability: Option<f64>) -> f64 {
    match lutram_availability {
        Some(a) => (PLAIN_LB_AREA * (a - 1.0) + LUTRAM_LB_AREA) / a,
        None => PLAIN_LB_AREA,
    }
}

#[derive(Clone, Debug)]
pub struct PrimitiveCatalog {
    pub lutram: Option<Primitive>,
    pub brams: Vec<Primitive>,
}

impl PrimitiveCatalog {
    pub fn new(lutram: Option<Primitive>, brams: Vec<Primitive>) -> Result<Self, ConfigError> {
        if lutram.is_none() && brams.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(PrimitiveCatalog { lutram, brams })
    }

    /// LUTRAM with 10x64/20x32 tiles at half of the logic blocks, an 8K
    /// block every 10 logic blocks and a 128K block every 300.
    pub fn default_architecture() -> Result<Self, ConfigError> {
        let lutram = Primitive::new(
            "LUTRAM",
            640,
            vec![MemMode::Rom, MemMode::SinglePort, MemMode::SimpleDualPort],
            tiles_from_widths(640, &[10, 20]),
            2.0,
            0.0,
        )?;
        let ram8k = bram("M8K", 8192, &[1, 2, 4, 8, 16, 32], 10.0)?;
        let ram128k = bram("M128K", 128 * 1024, &[1, 2, 4, 8, 16, 32, 64, 128], 300.0)?;
        PrimitiveCatalog::new(Some(lutram), vec![ram8k, ram128k])
    }

    pub fn avg_logic_block_area(&self) -> f64 {
        avg_logic_block_area(self.lutram.as_ref().map(|p| p.availability))
    }

    //LUTRAM first
    pub fn iter(&self) -> impl Iterator<Item = (PhysType, &Primitive)> {
        self.lutram
            .iter()
            .map(|p| (PhysType::Lutram, p))
            .chain(self.brams.iter().enumerate().map(|(k, p)| (PhysType::Bram(k), p)))
    }
}

fn bram(
    name: &str,
    bits: u32,
    widths: &[u32],
    availability: f64,
) -> Result<Primitive, ConfigError> {
    let mut prim = Primitive::new(
        name,
        bits,
        MemMode::ALL.to_vec(),
        tiles_from_widths(bits, widths),
        availability,
        0.0,
    )?;
    prim.area_per_unit = block_ram_area(bits, prim.max_width());
    Ok(prim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiles_cover_bit_size() {
        let catalog = PrimitiveCatalog::default_architecture().unwrap();
        for (_, prim) in catalog.iter() {
            for tile in &prim.tiles {
                assert_eq!(tile.width * tile.depth, prim.bit_size, "{}", prim.name);
            }
        }
        assert_eq!(catalog.brams.len(), 2);
        assert_eq!(catalog.brams[0].tiles[5], Tile { width: 32, depth: 256 });
    }

    #[test]
    fn rejects_tile_that_misses_bit_size() {
        let err = Primitive::new(
            "odd",
            640,
            vec![MemMode::SinglePort],
            tiles_from_widths(640, &[10, 30]),
            1.0,
            0.0,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::TileMismatch { width: 30, depth: 21, .. }));
    }

    #[test]
    fn rejects_non_positive_availability() {
        let err = Primitive::new(
            "zero",
            64,
            vec![MemMode::Rom],
            tiles_from_widths(64, &[8]),
            0.0,
            0.0,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Availability { .. }));
    }

    #[test]
    fn empty_catalog_is_an_error() {
        assert!(matches!(
            PrimitiveCatalog::new(None, Vec::new()),
            Err(ConfigError::Empty)
        ));
    }

    #[test]
    fn block_area_formula() {
        let area = block_ram_area(8192, 32);
        let expected = 9000.0 + 5.0 * 8192.0 + 90.0 * 8192f64.sqrt() + 1200.0 * 32.0;
        assert!((area - expected).abs() < 1e-9);
    }

    #[test]
    fn logic_block_area_depends_on_lutram() {
        assert_eq!(avg_logic_block_area(None), 35000.0);
        assert_eq!(avg_logic_block_area(Some(2.0)), 37500.0);
        assert_eq!(avg_logic_block_area(Some(1.0)), 40000.0);
    }

    #[test]
    fn type_codes() {
        assert_eq!(PhysType::Lutram.type_id(), 1);
        assert_eq!(PhysType::Bram(0).type_id(), 2);
        assert_eq!(PhysType::Bram(3).type_id(), 5);
    }
}
