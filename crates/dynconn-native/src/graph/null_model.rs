//! Degree-preserving random graphs
//!
//! Randomizes a connected binary graph by repeated double-edge swaps
//! (`a–b, c–d → a–d, c–b`). Every swap keeps each node's degree; swaps that
//! would disconnect the graph are undone.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::binary::BinaryGraph;

/// Null-model parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullModelConfig {
    /// Rewiring rounds per edge
    pub iterations: usize,
    /// Base seed; slices derive their own with [`slice_seed`]
    pub seed: u64,
}

/// Mix a base seed with a timepoint and optional component id
#[must_use]
pub fn slice_seed(seed: u64, timepoint: usize, component: Option<usize>) -> u64 {
    let component_tag = component.map_or(0, |c| c as u64 + 1);
    let mut x = seed;
    for v in [timepoint as u64, component_tag] {
        x = splitmix64(x ^ splitmix64(v));
    }
    x
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Whether some pair of edges shares no endpoint
fn has_disjoint_pair(edges: &[(usize, usize)]) -> bool {
    edges.iter().enumerate().any(|(e, &(a, b))| {
        edges[e + 1..].iter().any(|&(c, d)| a != c && a != d && b != c && b != d)
    })
}

/// Randomize `graph` preserving its degree sequence and connectedness.
///
/// Runs `iterations * |E|` rounds; each round makes up to
/// `max(1, round(|E| / (n - 1)))` attempts and stops at the first
/// successful swap. Graphs with fewer than 4 nodes, fewer than 2 edges or no
/// pair of disjoint edges are returned unchanged.
#[must_use]
pub fn randomize_connected(graph: &BinaryGraph, iterations: usize, seed: u64) -> BinaryGraph {
    let mut g = graph.clone();
    let n = g.n_nodes();
    let mut edges = g.edges();
    let k = edges.len();
    if n < 4 || k < 2 || !has_disjoint_pair(&edges) {
        return g;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let max_attempts = ((k as f64 / (n - 1) as f64).round() as usize).max(1);
    let check_connectivity = g.is_connected();

    for _ in 0..iterations * k {
        for _ in 0..=max_attempts {
            let (e1, e2, a, b, mut c, mut d) = loop {
                let e1 = rng.gen_range(0..k);
                let e2 = rng.gen_range(0..k);
                if e1 == e2 {
                    continue;
                }
                let (a, b) = edges[e1];
                let (c, d) = edges[e2];
                if a != c && a != d && b != c && b != d {
                    break (e1, e2, a, b, c, d);
                }
            };
            if rng.gen_bool(0.5) {
                std::mem::swap(&mut c, &mut d);
            }

            // Would create a multi-edge
            if g.has_edge(a, d) || g.has_edge(c, b) {
                continue;
            }

            g.remove_edge(a, b);
            g.remove_edge(c, d);
            g.add_edge(a, d);
            g.add_edge(c, b);

            // With a–c or b–d present the swap cannot split the graph
            let may_split = !(g.has_edge(a, c) || g.has_edge(b, d));
            if check_connectivity && may_split && !g.is_connected() {
                g.remove_edge(a, d);
                g.remove_edge(c, b);
                g.add_edge(a, b);
                g.add_edge(c, d);
                continue;
            }

            edges[e1] = (a, d);
            edges[e2] = (c, b);
            break;
        }
    }
    g
}
