//! Binary undirected graphs
//!
//! Dense adjacency graphs with the structural measures the metrics engine
//! needs: BFS distances, connected components, transitivity and local
//! clustering. Self-loops are never stored.

use std::collections::VecDeque;

use rayon::prelude::*;

use dynconn_core::Matrix;

use crate::error::{AnalysisError, AnalysisResult};
use crate::processing::SynchronyTensor;

/// Binary undirected graph over nodes `0..n`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryGraph {
    n: usize,
    adjacency: Vec<bool>,
}

impl BinaryGraph {
    /// Graph with `n` nodes and no edges
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n, adjacency: vec![false; n * n] }
    }

    /// Complete graph on `n` nodes
    #[must_use]
    pub fn complete(n: usize) -> Self {
        let mut g = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                g.add_edge(i, j);
            }
        }
        g
    }

    /// Graph from an undirected edge list
    #[must_use]
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut g = Self::new(n);
        for &(i, j) in edges {
            g.add_edge(i, j);
        }
        g
    }

    /// Graph from a square 0/1 matrix; any non-zero off-diagonal entry in
    /// either triangle becomes an edge
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for a non-square matrix.
    pub fn from_matrix(m: &Matrix) -> AnalysisResult<Self> {
        if !m.is_square() {
            return Err(AnalysisError::invalid_input(format!(
                "adjacency matrix must be square, got {:?}",
                m.shape()
            )));
        }
        let n = m.rows();
        let mut g = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                if m[(i, j)] != 0.0 || m[(j, i)] != 0.0 {
                    g.add_edge(i, j);
                }
            }
        }
        Ok(g)
    }

    /// Number of nodes
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.n
    }

    /// Whether `i` and `j` are adjacent
    #[inline]
    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.adjacency[i * self.n + j]
    }

    /// Add the undirected edge `i`–`j` (ignored for `i == j`)
    pub fn add_edge(&mut self, i: usize, j: usize) {
        if i != j {
            self.adjacency[i * self.n + j] = true;
            self.adjacency[j * self.n + i] = true;
        }
    }

    /// Remove the undirected edge `i`–`j`
    pub fn remove_edge(&mut self, i: usize, j: usize) {
        self.adjacency[i * self.n + j] = false;
        self.adjacency[j * self.n + i] = false;
    }

    /// Neighbours of node `i` in ascending order
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[i * self.n..(i + 1) * self.n]
            .iter()
            .enumerate()
            .filter_map(|(j, &e)| e.then_some(j))
    }

    /// Degree of node `i`
    pub fn degree(&self, i: usize) -> usize {
        self.neighbors(i).count()
    }

    /// Degree of every node
    #[must_use]
    pub fn degrees(&self) -> Vec<usize> {
        (0..self.n).map(|i| self.degree(i)).collect()
    }

    /// Edges as `(i, j)` pairs with `i < j`, in row-major order
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        (0..self.n)
            .flat_map(|i| ((i + 1)..self.n).filter(move |&j| self.has_edge(i, j)).map(move |j| (i, j)))
            .collect()
    }

    /// Number of undirected edges
    #[must_use]
    pub fn n_edges(&self) -> usize {
        self.adjacency.iter().filter(|&&e| e).count() / 2
    }

    /// Fraction of possible edges present (connection cost)
    #[must_use]
    pub fn density(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        (2 * self.n_edges()) as f64 / (self.n * (self.n - 1)) as f64
    }

    /// BFS hop counts from `source`; `None` for unreachable nodes
    fn bfs(&self, source: usize) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.n];
        let mut queue = VecDeque::new();
        dist[source] = Some(0);
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            let du = dist[u].unwrap_or_default();
            for v in self.neighbors(u) {
                if dist[v].is_none() {
                    dist[v] = Some(du + 1);
                    queue.push_back(v);
                }
            }
        }
        dist
    }

    /// All-pairs shortest path lengths; unreachable pairs are `f64::INFINITY`
    #[must_use]
    pub fn distances(&self) -> Matrix {
        let mut d = Matrix::zeros(self.n, self.n);
        for i in 0..self.n {
            for (j, hops) in self.bfs(i).into_iter().enumerate() {
                d[(i, j)] = hops.map_or(f64::INFINITY, |h| h as f64);
            }
        }
        d
    }

    /// Connected components, each sorted, ordered by smallest node
    #[must_use]
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.n];
        let mut components = Vec::new();
        for start in 0..self.n {
            if seen[start] {
                continue;
            }
            let mut members: Vec<usize> = self
                .bfs(start)
                .into_iter()
                .enumerate()
                .filter_map(|(j, d)| d.map(|_| j))
                .collect();
            for &m in &members {
                seen[m] = true;
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    /// Whether every node is reachable from node 0 (true for `n <= 1`)
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.n <= 1 || self.bfs(0).iter().all(Option::is_some)
    }

    /// Subgraph induced by `nodes`, relabelled `0..nodes.len()` in the given order
    #[must_use]
    pub fn induced_subgraph(&self, nodes: &[usize]) -> Self {
        let mut g = Self::new(nodes.len());
        for (a, &i) in nodes.iter().enumerate() {
            for (b, &j) in nodes.iter().enumerate().skip(a + 1) {
                if self.has_edge(i, j) {
                    g.add_edge(a, b);
                }
            }
        }
        g
    }

    /// Number of edges among the neighbours of `i`
    fn triangles_at(&self, i: usize) -> usize {
        let nbrs: Vec<usize> = self.neighbors(i).collect();
        nbrs.iter()
            .enumerate()
            .map(|(a, &u)| nbrs[a + 1..].iter().filter(|&&v| self.has_edge(u, v)).count())
            .sum()
    }

    /// Ratio of closed triplets to connected triplets (0 with no triplets)
    #[must_use]
    pub fn transitivity(&self) -> f64 {
        let (closed, triplets) = (0..self.n).fold((0usize, 0usize), |(c, t), i| {
            let d = self.degree(i);
            (c + 2 * self.triangles_at(i), t + d * d.saturating_sub(1))
        });
        if triplets == 0 {
            0.0
        } else {
            closed as f64 / triplets as f64
        }
    }

    /// Local clustering coefficient per node (0 for degree < 2)
    #[must_use]
    pub fn local_clustering(&self) -> Vec<f64> {
        (0..self.n)
            .map(|i| {
                let d = self.degree(i);
                if d < 2 {
                    0.0
                } else {
                    (2 * self.triangles_at(i)) as f64 / (d * (d - 1)) as f64
                }
            })
            .collect()
    }

    /// Mean local clustering coefficient
    #[must_use]
    pub fn mean_clustering(&self) -> f64 {
        dynconn_core::mean(&self.local_clustering())
    }

    /// Adjacency as a 0/1 matrix
    #[must_use]
    pub fn to_matrix(&self) -> Matrix {
        let mut m = Matrix::zeros(self.n, self.n);
        for (i, j) in self.edges() {
            m[(i, j)] = 1.0;
            m[(j, i)] = 1.0;
        }
        m
    }

    /// Row-major flattened 0/1 adjacency
    #[must_use]
    pub fn flatten(&self) -> Vec<f64> {
        self.adjacency.iter().map(|&e| if e { 1.0 } else { 0.0 }).collect()
    }
}

/// Mean of the finite off-diagonal entries of a distance matrix (0 when none)
#[must_use]
pub fn characteristic_path_length(distances: &Matrix) -> f64 {
    let n = distances.rows();
    let finite: Vec<f64> = (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .map(|(i, j)| distances[(i, j)])
        .filter(|d| d.is_finite())
        .collect();
    dynconn_core::mean(&finite)
}

// ============================================================================
// Graph Sequence
// ============================================================================

/// One binary graph per timepoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryGraphSequence {
    n_nodes: usize,
    slices: Vec<BinaryGraph>,
}

impl BinaryGraphSequence {
    /// Threshold every slice of a synchrony tensor at `k`
    #[must_use]
    pub fn from_tensor(tensor: &SynchronyTensor, k: f64) -> Self {
        let slices = tensor.slices().par_iter().map(|s| super::threshold::binarize(s, k)).collect();
        Self {
            n_nodes: tensor.n_regions(),
            slices,
        }
    }

    /// Build from explicit slices
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if slice sizes disagree.
    pub fn new(n_nodes: usize, slices: Vec<BinaryGraph>) -> AnalysisResult<Self> {
        if let Some((t, g)) = slices.iter().enumerate().find(|(_, g)| g.n_nodes() != n_nodes) {
            return Err(AnalysisError::invalid_input(format!(
                "graph slice {t} has {} nodes, expected {n_nodes}",
                g.n_nodes()
            )));
        }
        Ok(Self { n_nodes, slices })
    }

    /// Nodes per slice
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Number of timepoints
    pub fn n_timepoints(&self) -> usize {
        self.slices.len()
    }

    /// Slice at timepoint `t`
    pub fn slice(&self, t: usize) -> &BinaryGraph {
        &self.slices[t]
    }

    /// All slices in time order
    pub fn slices(&self) -> &[BinaryGraph] {
        &self.slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_transitivity() {
        let g = BinaryGraph::from_edges(3, &[(0, 1), (1, 2), (0, 2)]);
        assert!((g.transitivity() - 1.0).abs() < 1e-12);
        assert!((g.mean_clustering() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_star_transitivity() {
        let g = BinaryGraph::from_edges(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        assert_eq!(g.transitivity(), 0.0);
        assert_eq!(g.local_clustering(), vec![0.0; 5]);
        assert_eq!(g.degrees(), vec![4, 1, 1, 1, 1]);
    }

    #[test]
    fn test_paw_graph_measures() {
        // Triangle 0-1-2 with pendant 3 attached to 2
        let g = BinaryGraph::from_edges(4, &[(0, 1), (1, 2), (0, 2), (2, 3)]);
        // 3 closed out of 5 connected triplets
        assert!((g.transitivity() - 0.6).abs() < 1e-12);
        let c = g.local_clustering();
        assert!((c[2] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(c[3], 0.0);
    }

    #[test]
    fn test_distances_and_path_length() {
        let g = BinaryGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        let d = g.distances();
        assert_eq!(d[(0, 3)], 3.0);
        assert_eq!(d[(3, 0)], 3.0);
        assert_eq!(d[(1, 1)], 0.0);
        // (1+2+3+1+1+2) * 2 / 12
        assert!((characteristic_path_length(&d) - 10.0 / 6.0).abs() < 1e-12);

        let split = BinaryGraph::from_edges(3, &[(0, 1)]);
        let d = split.distances();
        assert!(d[(0, 2)].is_infinite());
        assert!((characteristic_path_length(&d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_components_ordered_by_smallest_node() {
        let g = BinaryGraph::from_edges(6, &[(1, 4), (0, 5), (5, 3)]);
        assert_eq!(g.components(), vec![vec![0, 3, 5], vec![1, 4], vec![2]]);
        assert!(!g.is_connected());
        assert!(BinaryGraph::complete(4).is_connected());
    }

    #[test]
    fn test_induced_subgraph() {
        let g = BinaryGraph::from_edges(5, &[(0, 1), (1, 3), (3, 4)]);
        let sub = g.induced_subgraph(&[1, 3, 4]);
        assert_eq!(sub.edges(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_matrix_round_trip_symmetrizes() {
        let m = Matrix::from_rows(vec![vec![1.0, 1.0, 0.0], vec![0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap();
        let g = BinaryGraph::from_matrix(&m).unwrap();
        assert_eq!(g.edges(), vec![(0, 1), (1, 2)]);
        let back = g.to_matrix();
        assert!(back.is_symmetric(0.0));
        assert_eq!(back.diagonal(), vec![0.0; 3]);
        assert!((g.density() - 2.0 / 3.0).abs() < 1e-12);
    }
}
