//! Deterministic terrain, biome and fertility derivation.
//!
//! Everything here is a pure function of a tile's centre position and the
//! world seed. The hash term is computed with integer arithmetic only, so it
//! is bit-identical on every platform:
//!
//! ```text
//! q(v)       = round(v * 1e6) as i64                       (IEEE exact)
//! mix(z)     = SplitMix64 finaliser
//! h          = mix(seed ^ rotl(sample, 32))
//! h          = mix(h ^ q(x)); h = mix(h ^ rotl(q(y), 21)); h = mix(h ^ rotl(q(z), 42))
//! hash       = (h >> 11) * 2^-53                           in [0, 1)
//! ```
//!
//! Biome jitter samples the hash with `seed + BIOME_SEED_OFFSET`; fertility
//! jitter uses `seed + FERTILITY_SEED_OFFSET` so the two are uncorrelated.

use std::f64::consts::TAU;

use serde::Serialize;

use crate::model::{Biome, TerrainType, is_habitable};

pub const BIOME_SEED_OFFSET: u64 = 0;
pub const FERTILITY_SEED_OFFSET: u64 = 1000;

/// Continent bias: noise values below this are ocean.
const LAND_THRESHOLD: f64 = -0.05;
const MOUNTAIN_ELEVATION: f64 = 0.7;
const HILL_ELEVATION: f64 = 0.4;
const FERTILITY_JITTER: f64 = 20.0;

/// Fixed-point scale applied to coordinates before hashing.
const QUANTUM: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileProperties {
    pub terrain: TerrainType,
    pub biome: Option<Biome>,
    pub fertility: u8,
    pub habitable: bool,
    pub latitude: f64,
    pub longitude: f64,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn quantize(v: f64) -> u64 {
    (v * QUANTUM).round() as i64 as u64
}

fn unit(h: u64) -> f64 {
    (h >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Position-seeded hash in `[0, 1)`.
pub fn position_hash(x: f64, y: f64, z: f64, seed: u64, sample: u64) -> f64 {
    let mut h = splitmix64(seed ^ sample.rotate_left(32));
    h = splitmix64(h ^ quantize(x));
    h = splitmix64(h ^ quantize(y).rotate_left(21));
    h = splitmix64(h ^ quantize(z).rotate_left(42));
    unit(h)
}

/// Seed-only hash used for the noise phase offsets.
fn seed_phase(seed: u64, index: u64) -> f64 {
    unit(splitmix64(splitmix64(seed) ^ index)) * TAU
}

/// Sequence of hash samples drawn at a fixed position.
struct PositionRandom {
    x: f64,
    y: f64,
    z: f64,
    seed: u64,
    sample: u64,
}

impl PositionRandom {
    fn new(x: f64, y: f64, z: f64, seed: u64) -> Self {
        Self {
            x,
            y,
            z,
            seed,
            sample: 0,
        }
    }

    fn next(&mut self) -> f64 {
        self.sample += 1;
        position_hash(self.x, self.y, self.z, self.seed, self.sample)
    }
}

/// Latitude and longitude in degrees. The origin maps to (0, 0).
pub fn lat_long(x: f64, y: f64, z: f64) -> (f64, f64) {
    let radius = (x * x + y * y + z * z).sqrt();
    if radius == 0.0 {
        return (0.0, 0.0);
    }
    let latitude = (y / radius).clamp(-1.0, 1.0).asin().to_degrees();
    let longitude = z.atan2(x).to_degrees();
    (latitude, longitude)
}

pub fn terrain_at(x: f64, y: f64, z: f64, seed: u64) -> TerrainType {
    let p1 = seed_phase(seed, 1);
    let p2 = seed_phase(seed, 2);
    let p3 = seed_phase(seed, 3);
    let p4 = seed_phase(seed, 4);

    let c1 = (x * 0.10 + p1).sin() * (z * 0.12 + p2).cos();
    let c2 = (z * 0.14 + p3).sin() * (y * 0.10 + p1).cos() * 0.6;
    let c3 = (y * 0.12 + p2).sin() * (x * 0.08 + p4).cos() * 0.4;
    let c4 = (x * 0.22 + z * 0.18 + p4).sin() * 0.25;
    let continent = c1 + c2 + c3 + c4;

    if continent < LAND_THRESHOLD {
        return TerrainType::Ocean;
    }

    let land_height = continent - LAND_THRESHOLD;
    let detail = (x * 0.35 + z * 0.30 + p1).sin() * (y * 0.32 + p2).cos() * 0.12;
    let grain = position_hash(x, y, z, seed, 0) * 0.08 - 0.04;
    let elevation = land_height + detail + grain;

    if elevation > MOUNTAIN_ELEVATION {
        TerrainType::Mountains
    } else if elevation > HILL_ELEVATION {
        TerrainType::Hills
    } else {
        TerrainType::Flats
    }
}

/// Latitude-banded biome with seeded jitter. Ocean has none; mountains are alpine.
pub fn biome_at(x: f64, y: f64, z: f64, terrain: TerrainType, seed: u64) -> Option<Biome> {
    match terrain {
        TerrainType::Ocean => return None,
        TerrainType::Mountains => return Some(Biome::Alpine),
        TerrainType::Hills | TerrainType::Flats => {}
    }

    let latitude = lat_long(x, y, z).0.abs();
    let roll = PositionRandom::new(x, y, z, seed.wrapping_add(BIOME_SEED_OFFSET)).next();
    let pick = |threshold: f64, below: Biome, above: Biome| {
        if roll < threshold { below } else { above }
    };

    Some(if latitude > 60.0 {
        pick(0.8, Biome::Tundra, Biome::Alpine)
    } else if latitude > 45.0 {
        pick(0.7, Biome::Plains, Biome::Tundra)
    } else if latitude > 30.0 {
        pick(0.6, Biome::Grassland, Biome::Plains)
    } else if latitude > 15.0 {
        pick(0.5, Biome::Grassland, Biome::Desert)
    } else {
        pick(0.7, Biome::Grassland, Biome::Desert)
    })
}

pub fn fertility_at(
    x: f64,
    y: f64,
    z: f64,
    terrain: TerrainType,
    biome: Option<Biome>,
    seed: u64,
) -> u8 {
    let biome = match (terrain, biome) {
        (TerrainType::Ocean | TerrainType::Mountains, _) | (_, None) => return 0,
        (_, Some(b)) => b,
    };
    let roll = PositionRandom::new(x, y, z, seed.wrapping_add(FERTILITY_SEED_OFFSET)).next();
    let variation = ((roll - 0.5) * FERTILITY_JITTER) as i32;
    (biome.base_fertility() + variation).clamp(0, 100) as u8
}

/// Derive every generated property of the tile centred at `(x, y, z)`.
pub fn derive_tile_properties(x: f64, y: f64, z: f64, seed: u64) -> TileProperties {
    let terrain = terrain_at(x, y, z, seed);
    let biome = biome_at(x, y, z, terrain, seed);
    let fertility = fertility_at(x, y, z, terrain, biome, seed);
    let (latitude, longitude) = lat_long(x, y, z);
    TileProperties {
        terrain,
        biome,
        fertility,
        habitable: is_habitable(terrain, biome),
        latitude,
        longitude,
    }
}
