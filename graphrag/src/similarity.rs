//! Pairwise cosine similarity over combined embeddings, computed in tiles.
//!
//! The full n x n matrix is never materialized: one `tile_size x tile_size`
//! working buffer is reused for every block, and each row only keeps its
//! best `fan_out_cap` candidates.

use config::AdjacencyMode;
use errors::BuildError;
pub use rag_core::{cosine_similarity, cosine_with_norms, l2_norm};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};
use tracing::debug;

/// One adjacency entry: the neighbour's position in the corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub similarity: f32
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityParams {
    pub threshold: f32,
    pub fan_out_cap: usize,
    pub tile_size: usize,
    pub adjacency: AdjacencyMode
}

/// Per-node adjacency lists, each sorted by similarity (best first, ties by
/// corpus position).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityGraph {
    pub neighbors: Vec<Vec<Neighbor>>
}

impl SimilarityGraph {
    /// Stored adjacency entries over all nodes.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }

    pub fn nodes_with_edges(&self) -> usize {
        self.neighbors.iter().filter(|n| !n.is_empty()).count()
    }

    pub fn max_fan_out(&self) -> usize {
        self.neighbors.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Candidate ordering: higher similarity is better, then lower corpus index.
#[derive(Debug, Clone, Copy)]
struct Candidate(Neighbor);

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .similarity
            .total_cmp(&other.0.similarity)
            .then_with(|| other.0.index.cmp(&self.0.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Bounded set of the best `cap` candidates; the heap top is the worst kept.
struct TopK {
    cap: usize,
    heap: BinaryHeap<Reverse<Candidate>>
}

impl TopK {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            heap: BinaryHeap::with_capacity(cap + 1)
        }
    }

    fn offer(&mut self, neighbor: Neighbor) {
        if self.cap == 0 {
            return;
        }
        let candidate = Candidate(neighbor);
        if self.heap.len() < self.cap {
            self.heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = self.heap.peek()
            && candidate > *worst
        {
            self.heap.pop();
            self.heap.push(Reverse(candidate));
        }
    }

    fn into_sorted(self) -> Vec<Neighbor> {
        let mut kept: Vec<Candidate> = self.heap.into_iter().map(|Reverse(c)| c).collect();
        kept.sort_by(|a, b| b.cmp(a));
        kept.into_iter().map(|c| c.0).collect()
    }
}

/// Builds the capped similarity graph for `vectors`.
///
/// Every ordered pair `(i, j)`, `i != j`, with similarity at or above the
/// threshold is a candidate. [`AdjacencyMode::Directed`] keeps each node's
/// top `fan_out_cap` candidates as-is. [`AdjacencyMode::Symmetric`] unions
/// the per-node candidates and admits pairs best-first while both endpoints
/// are under the cap, so every stored edge appears on both endpoints.
///
/// # Errors
///
/// [`BuildError::Similarity`] when the vectors do not share one dimension.
pub fn build_similarity_graph(
    vectors: &[Vec<f32>],
    params: &SimilarityParams
) -> Result<SimilarityGraph, BuildError> {
    let n = vectors.len();
    if n == 0 {
        return Ok(SimilarityGraph::default());
    }

    let dimension = vectors[0].len();
    if let Some((position, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
        return Err(BuildError::Similarity {
            reason: format!(
                "vector {position} has dimension {}, expected {dimension}",
                v.len()
            )
        });
    }

    let tile = params.tile_size.max(1);
    let norms: Vec<f32> = vectors.iter().map(|v| l2_norm(v)).collect();
    let mut rows: Vec<TopK> = (0..n).map(|_| TopK::new(params.fan_out_cap)).collect();
    let mut buffer = vec![0.0_f32; tile * tile];

    for row_start in (0..n).step_by(tile) {
        let row_end = (row_start + tile).min(n);
        for col_start in (0..n).step_by(tile) {
            let col_end = (col_start + tile).min(n);

            for i in row_start..row_end {
                for j in col_start..col_end {
                    buffer[(i - row_start) * tile + (j - col_start)] =
                        cosine_with_norms(&vectors[i], &vectors[j], norms[i], norms[j]);
                }
            }

            for i in row_start..row_end {
                for j in col_start..col_end {
                    let similarity = buffer[(i - row_start) * tile + (j - col_start)];
                    if i != j && similarity >= params.threshold {
                        rows[i].offer(Neighbor {
                            index: j,
                            similarity
                        });
                    }
                }
            }
        }
        debug!("Similarity rows {}..{} of {} done", row_start, row_end, n);
    }

    let per_node: Vec<Vec<Neighbor>> = rows.into_iter().map(TopK::into_sorted).collect();

    let graph = match params.adjacency {
        AdjacencyMode::Directed => SimilarityGraph {
            neighbors: per_node
        },
        AdjacencyMode::Symmetric => symmetrize(&per_node, params.fan_out_cap)
    };
    Ok(graph)
}

fn symmetrize(per_node: &[Vec<Neighbor>], cap: usize) -> SimilarityGraph {
    let n = per_node.len();

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut candidates: Vec<(usize, usize, f32)> = Vec::new();
    for (i, neighbors) in per_node.iter().enumerate() {
        for neighbor in neighbors {
            let key = (i.min(neighbor.index), i.max(neighbor.index));
            if pairs.insert(key) {
                candidates.push((key.0, key.1, neighbor.similarity));
            }
        }
    }

    candidates.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

    let mut neighbors: Vec<Vec<Neighbor>> = vec![Vec::new(); n];
    for (i, j, similarity) in candidates {
        if neighbors[i].len() < cap && neighbors[j].len() < cap {
            neighbors[i].push(Neighbor {
                index: j,
                similarity
            });
            neighbors[j].push(Neighbor {
                index: i,
                similarity
            });
        }
    }

    for list in &mut neighbors {
        list.sort_by(|a, b| Candidate(*b).cmp(&Candidate(*a)));
    }

    SimilarityGraph { neighbors }
}
