use serde::{Deserialize, Serialize};

use super::TileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TerrainType {
    Ocean,
    Mountains,
    Hills,
    Flats,
}

string_enum!(TerrainType {
    Ocean => "ocean",
    Mountains => "mountains",
    Hills => "hills",
    Flats => "flats",
});

impl TerrainType {
    pub const ALL: [TerrainType; 4] = [
        TerrainType::Ocean,
        TerrainType::Mountains,
        TerrainType::Hills,
        TerrainType::Flats,
    ];

    pub fn is_land(self) -> bool {
        self != TerrainType::Ocean
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Biome {
    Grassland,
    Plains,
    Desert,
    Tundra,
    Alpine,
}

string_enum!(Biome {
    Grassland => "grassland",
    Plains => "plains",
    Desert => "desert",
    Tundra => "tundra",
    Alpine => "alpine",
});

impl Biome {
    pub const ALL: [Biome; 5] = [
        Biome::Grassland,
        Biome::Plains,
        Biome::Desert,
        Biome::Tundra,
        Biome::Alpine,
    ];

    /// Fertility before the per-tile seeded perturbation.
    pub fn base_fertility(self) -> i32 {
        match self {
            Biome::Grassland => 80,
            Biome::Plains => 70,
            Biome::Desert => 20,
            Biome::Tundra => 30,
            Biome::Alpine => 25,
        }
    }
}

/// People may live on land that is neither mountainous nor desert, tundra
/// or alpine.
pub fn is_habitable(terrain: TerrainType, biome: Option<Biome>) -> bool {
    if matches!(terrain, TerrainType::Ocean | TerrainType::Mountains) {
        return false;
    }
    !matches!(
        biome,
        Some(Biome::Desert) | Some(Biome::Tundra) | Some(Biome::Alpine)
    )
}

/// A generated world tile. Immutable for a given seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub center: [f64; 3],
    pub latitude: f64,
    pub longitude: f64,
    pub terrain: TerrainType,
    pub biome: Option<Biome>,
    pub fertility: u8,
    pub habitable: bool,
    pub boundary: Vec<[f64; 3]>,
    pub neighbors: Vec<TileId>,
}
