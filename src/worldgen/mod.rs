pub mod config;
pub mod terrain;
pub mod topology;

use crate::error::GenerationError;
use crate::model::{Tile, TileId};

pub use config::WorldGenConfig;
pub use terrain::{TileProperties, derive_tile_properties};
pub use topology::{SphereTopology, TileSeed};

/// Derive a full tile set from `topology` and `seed`.
pub fn generate_tiles(topology: &SphereTopology, seed: u64) -> Result<Vec<Tile>, GenerationError> {
    if topology.is_empty() {
        return Err(GenerationError::EmptyTopology);
    }
    if !(topology.radius.is_finite() && topology.radius > 0.0) {
        return Err(GenerationError::InvalidRadius(topology.radius));
    }

    let tiles = topology
        .tiles
        .iter()
        .map(|seed_tile| {
            let [x, y, z] = seed_tile.center;
            let props = derive_tile_properties(x, y, z, seed);
            Tile {
                id: seed_tile.id,
                center: seed_tile.center,
                latitude: props.latitude,
                longitude: props.longitude,
                terrain: props.terrain,
                biome: props.biome,
                fertility: props.fertility,
                habitable: props.habitable,
                boundary: seed_tile.boundary.clone(),
                neighbors: seed_tile.neighbors.clone(),
            }
        })
        .collect();
    Ok(tiles)
}

/// Number of tiles covered by `percent` of `available`, rounded up.
pub fn percent_of(available: usize, percent: u32) -> usize {
    (available * percent as usize).div_ceil(100)
}

/// Pick `count` tiles from `candidates` with a seeded Fisher–Yates shuffle.
///
/// Uses a 64-bit LCG (Knuth's MMIX constants) so the selection depends on
/// nothing but `seed` and the candidate order.
pub fn select_tiles(candidates: &[TileId], seed: u64, count: usize) -> Vec<TileId> {
    let mut indices: Vec<usize> = (0..candidates.len()).collect();
    let mut state = seed;
    for i in (1..indices.len()).rev() {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let j = (state >> 33) as usize % (i + 1);
        indices.swap(i, j);
    }
    indices
        .into_iter()
        .take(count)
        .map(|i| candidates[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Biome, TerrainType};

    #[test]
    fn same_seed_same_world() {
        let topo = SphereTopology::fibonacci(300, 30.0, 6);
        let a = generate_tiles(&topo, 42).unwrap();
        let b = generate_tiles(&topo, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let topo = SphereTopology::fibonacci(300, 30.0, 6);
        let a = generate_tiles(&topo, 1).unwrap();
        let b = generate_tiles(&topo, 2).unwrap();
        assert!(a.iter().zip(&b).any(|(x, y)| x.terrain != y.terrain || x.biome != y.biome));
    }

    #[test]
    fn habitable_partition_holds_for_generated_world() {
        let topo = SphereTopology::fibonacci(500, 30.0, 6);
        let tiles = generate_tiles(&topo, 7).unwrap();
        for t in &tiles {
            let hostile_terrain = matches!(t.terrain, TerrainType::Ocean | TerrainType::Mountains);
            let hostile_biome = matches!(
                t.biome,
                Some(Biome::Desert) | Some(Biome::Tundra) | Some(Biome::Alpine)
            );
            assert_eq!(t.habitable, !hostile_terrain && !hostile_biome);
        }
    }

    #[test]
    fn empty_topology_is_rejected() {
        let topo = SphereTopology::from_tiles(30.0, Vec::new());
        assert!(matches!(
            generate_tiles(&topo, 1),
            Err(GenerationError::EmptyTopology)
        ));
    }

    #[test]
    fn percent_rounds_up() {
        assert_eq!(percent_of(10, 60), 6);
        assert_eq!(percent_of(7, 60), 5);
        assert_eq!(percent_of(0, 60), 0);
    }

    #[test]
    fn selection_is_seeded_and_unique() {
        let candidates: Vec<TileId> = (10..30).collect();
        let a = select_tiles(&candidates, 99, 5);
        let b = select_tiles(&candidates, 99, 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        let mut sorted = a.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
        assert!(a.iter().all(|t| candidates.contains(t)));
        assert_eq!(select_tiles(&candidates, 99, 100).len(), candidates.len());
    }
}
