use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::model::TileId;

/// Geometry of one tile before terrain is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSeed {
    pub id: TileId,
    pub center: [f64; 3],
    #[serde(default)]
    pub boundary: Vec<[f64; 3]>,
    #[serde(default)]
    pub neighbors: Vec<TileId>,
}

/// Tile layout over a sphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereTopology {
    pub radius: f64,
    pub tiles: Vec<TileSeed>,
}

impl SphereTopology {
    /// Wrap externally supplied tile geometry (e.g. a client's hexasphere).
    pub fn from_tiles(radius: f64, tiles: Vec<TileSeed>) -> Self {
        Self { radius, tiles }
    }

    /// Spread `count` tile centres evenly over the sphere along a Fibonacci
    /// spiral, link each to its `k` nearest neighbours, and approximate the
    /// tile boundary from the angular ring of neighbours.
    ///
    /// Neighbour search is quadratic in `count`.
    pub fn fibonacci(count: u32, radius: f64, k: usize) -> Self {
        let golden_angle = PI * (3.0 - 5f64.sqrt());
        let n = count as f64;
        let centers: Vec<[f64; 3]> = (0..count)
            .map(|i| {
                let y = 1.0 - 2.0 * (i as f64 + 0.5) / n;
                let ring = (1.0 - y * y).max(0.0).sqrt();
                let theta = golden_angle * i as f64;
                [
                    theta.cos() * ring * radius,
                    y * radius,
                    theta.sin() * ring * radius,
                ]
            })
            .collect();

        let tiles = centers
            .iter()
            .enumerate()
            .map(|(i, center)| {
                let neighbors = nearest(&centers, i, k);
                let boundary = boundary_ring(center, &neighbors, &centers, radius);
                TileSeed {
                    id: i as TileId,
                    center: *center,
                    boundary,
                    neighbors: neighbors.into_iter().map(|j| j as TileId).collect(),
                }
            })
            .collect();

        Self { radius, tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn scale(a: &[f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn normalize(a: &[f64; 3]) -> [f64; 3] {
    let len = dot(a, a).sqrt();
    if len == 0.0 { *a } else { scale(a, 1.0 / len) }
}

/// Indices of the `k` closest centres to `centers[i]`, nearest first.
fn nearest(centers: &[[f64; 3]], i: usize, k: usize) -> Vec<usize> {
    let origin = &centers[i];
    let mut by_distance: Vec<(f64, usize)> = centers
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(j, c)| {
            let d = sub(c, origin);
            (dot(&d, &d), j)
        })
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    by_distance.into_iter().take(k).map(|(_, j)| j).collect()
}

/// Boundary vertices: centroids of the centre and each pair of angularly
/// adjacent neighbours, pushed back onto the sphere surface.
fn boundary_ring(
    center: &[f64; 3],
    neighbors: &[usize],
    centers: &[[f64; 3]],
    radius: f64,
) -> Vec<[f64; 3]> {
    if neighbors.len() < 2 {
        return Vec::new();
    }
    let normal = normalize(center);
    let up = if normal[1].abs() < 0.99 {
        [0.0, 1.0, 0.0]
    } else {
        [1.0, 0.0, 0.0]
    };
    let e1 = normalize(&cross(&up, &normal));
    let e2 = cross(&normal, &e1);

    let mut ring: Vec<(f64, [f64; 3])> = neighbors
        .iter()
        .map(|&j| {
            let d = sub(&centers[j], center);
            (dot(&d, &e2).atan2(dot(&d, &e1)), centers[j])
        })
        .collect();
    ring.sort_by(|a, b| a.0.total_cmp(&b.0));

    (0..ring.len())
        .map(|idx| {
            let a = &ring[idx].1;
            let b = &ring[(idx + 1) % ring.len()].1;
            let centroid = [
                (center[0] + a[0] + b[0]) / 3.0,
                (center[1] + a[1] + b[1]) / 3.0,
                (center[2] + a[2] + b[2]) / 3.0,
            ];
            scale(&normalize(&centroid), radius)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centres_lie_on_sphere() {
        let topo = SphereTopology::fibonacci(200, 30.0, 6);
        assert_eq!(topo.len(), 200);
        for tile in &topo.tiles {
            let r = dot(&tile.center, &tile.center).sqrt();
            assert!((r - 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn neighbours_are_distinct_and_exclude_self() {
        let topo = SphereTopology::fibonacci(100, 30.0, 6);
        for tile in &topo.tiles {
            assert_eq!(tile.neighbors.len(), 6);
            assert!(!tile.neighbors.contains(&tile.id));
            let mut sorted = tile.neighbors.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), 6);
            assert_eq!(tile.boundary.len(), 6);
        }
    }

    #[test]
    fn generation_is_repeatable() {
        assert_eq!(
            SphereTopology::fibonacci(50, 30.0, 4),
            SphereTopology::fibonacci(50, 30.0, 4)
        );
    }

    #[test]
    fn tiny_topologies_have_no_boundary() {
        let topo = SphereTopology::fibonacci(2, 30.0, 6);
        assert!(topo.tiles.iter().all(|t| t.boundary.is_empty()));
        assert!(SphereTopology::fibonacci(0, 30.0, 6).is_empty());
    }
}
