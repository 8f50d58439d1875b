use serde::Deserialize;

/// Configuration for world generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    /// Seed used when a restart does not supply one.
    pub seed: u64,
    /// Sphere radius in world units. Terrain noise frequencies are tuned for ~30.
    pub radius: f64,
    /// Number of tiles in the generated topology.
    pub tile_count: u32,
    /// Nearest neighbours recorded per tile.
    pub neighbor_count: usize,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            radius: 30.0,
            tile_count: 1000,
            neighbor_count: 6,
        }
    }
}
