//! Substructure evaluation: MDL, SIZE, and SETCOVER.
//!
//! The default evaluation is minimum description length: a substructure is
//! good when describing it once plus describing the graph compressed by it
//! takes fewer bits than describing the graph outright. A simpler size-based
//! ratio and a set-cover measure are selectable alternatives. Higher values
//! are better in every mode.

use serde::{Deserialize, Serialize};

use ganom_core::{Graph, LabelRegistry, Substructure};

use crate::compress::{compress, size_of_compressed_graph};

/// Which evaluation a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvalMethod {
    /// Minimum description length (the default).
    #[default]
    Mdl,
    /// Vertex + edge counts in the same ratio shape as MDL.
    Size,
    /// Fraction of positive examples covered.
    SetCover,
}

/// Base-2 logarithm with `lg(x) = 0` for `x <= 0`, matching the encoding
/// convention (zero symbols take zero bits).
pub fn lg(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x.log2()
    }
}

/// Cache of `lg(n!)` values in a monotonically growing table.
///
/// The table only ever grows; callers must never assume its prior capacity.
#[derive(Debug, Clone, Default)]
pub struct LgFactTable {
    table: Vec<f64>,
}

impl LgFactTable {
    /// Creates a table holding `lg(0!) = 0`.
    pub fn new() -> Self {
        LgFactTable { table: vec![0.0] }
    }

    /// Returns `lg(n!)`, growing the table as needed.
    pub fn lg_fact(&mut self, n: usize) -> f64 {
        if self.table.is_empty() {
            self.table.push(0.0);
        }
        while self.table.len() <= n {
            let k = self.table.len();
            let prev = self.table[k - 1];
            self.table.push(prev + lg(k as f64));
        }
        self.table[n]
    }
}

/// Description length of `graph` in bits, given `label_count` available
/// labels.
///
/// Encodes the vertex labels, the adjacency-matrix rows (as a choice of
/// `k_i` neighbors out of `V`, plus the row-count header), and the edges
/// (multiplicity within a cell, directedness bit, label). Undirected edges
/// occupy the row of their smaller-numbered endpoint.
pub fn mdl(graph: &Graph, label_count: usize, lgfact: &mut LgFactTable) -> f64 {
    let v = graph.vertex_count();
    if v == 0 {
        return 0.0;
    }
    let l = label_count.max(1) as f64;
    let e = graph.edge_count() as f64;

    let vertex_bits = lg(v as f64) + v as f64 * lg(l);

    // Cell occupancy of the upper-triangular-normalized adjacency matrix:
    // directed edges in the row of their source, undirected edges in the row
    // of their smaller endpoint.
    let mut cells: std::collections::HashMap<(u32, u32), usize> = std::collections::HashMap::new();
    for e_id in graph.edge_ids() {
        let edge = &graph[e_id];
        let (row, col) = if edge.directed {
            (edge.v1.0, edge.v2.0)
        } else {
            (edge.v1.0.min(edge.v2.0), edge.v1.0.max(edge.v2.0))
        };
        *cells.entry((row, col)).or_insert(0) += 1;
    }

    let mut unique_neighbors = vec![0usize; v];
    let mut max_multiplicity = 0usize;
    for (&(row, _), &count) in &cells {
        unique_neighbors[row as usize] += 1;
        max_multiplicity = max_multiplicity.max(count);
    }

    let b = unique_neighbors.iter().copied().max().unwrap_or(0);
    let k_total: usize = unique_neighbors.iter().sum();

    let mut row_bits = v as f64 * lgfact.lg_fact(v) + (v as f64 + 1.0) * lg(b as f64 + 1.0);
    for &k in &unique_neighbors {
        row_bits -= lgfact.lg_fact(k) + lgfact.lg_fact(v - k);
    }

    let edge_bits =
        e * (1.0 + lg(l)) + (k_total as f64 + 1.0) * lg(max_multiplicity as f64);

    vertex_bits + row_bits + edge_bits
}

/// Evaluator for one discovery run. Caches the host graph's measure so each
/// candidate evaluation only prices the substructure side of the ratio.
#[derive(Debug)]
pub struct Evaluator {
    method: EvalMethod,
    lgfact: LgFactTable,
    host_mdl: f64,
    host_size: usize,
    label_count: usize,
    total_examples: usize,
}

/// Marker iteration for throwaway compressions performed during evaluation.
const EVAL_ITERATION: u32 = u32::MAX;

impl Evaluator {
    /// Prepares an evaluator for `host` under `method`.
    pub fn new(method: EvalMethod, host: &Graph, labels: &LabelRegistry) -> Self {
        let mut lgfact = LgFactTable::new();
        let host_mdl = match method {
            EvalMethod::Mdl => mdl(host, labels.len(), &mut lgfact),
            _ => 0.0,
        };
        Evaluator {
            method,
            lgfact,
            host_mdl,
            host_size: host.size(),
            label_count: labels.len(),
            total_examples: host.example_count(),
        }
    }

    /// Computes and stores `sub.value`. Also refreshes `sub.num_examples`.
    pub fn evaluate(&mut self, sub: &mut Substructure, host: &Graph, labels: &LabelRegistry) {
        sub.recount_examples(host);
        sub.value = match self.method {
            EvalMethod::Mdl => self.mdl_value(sub, host, labels),
            EvalMethod::Size => self.size_value(sub, host),
            EvalMethod::SetCover => {
                if self.total_examples == 0 {
                    0.0
                } else {
                    sub.num_examples as f64 / self.total_examples as f64
                }
            }
        };
    }

    fn mdl_value(&mut self, sub: &Substructure, host: &Graph, labels: &LabelRegistry) -> f64 {
        let mut working = labels.clone();
        let compressed = compress(host, &mut working, &sub.instances, EVAL_ITERATION);

        let sub_bits = mdl(&sub.definition, self.label_count, &mut self.lgfact);
        let compressed_bits = mdl(&compressed, working.len(), &mut self.lgfact);
        let external_bits = external_edge_bits(&compressed, sub.definition.vertex_count());

        let denom = sub_bits + compressed_bits + external_bits;
        if denom <= 0.0 {
            return 0.0;
        }
        self.host_mdl / denom
    }

    fn size_value(&mut self, sub: &Substructure, host: &Graph) -> f64 {
        let denom = (sub.definition.size() + size_of_compressed_graph(host, &sub.instances)) as f64;
        if denom <= 0.0 {
            return 0.0;
        }
        self.host_size as f64 / denom
    }
}

/// Bits needed to record, for every external edge endpoint that lands on a
/// SUB vertex, which definition vertex the edge originally attached to:
/// `lg |V(S)|` per such endpoint, twice for a self-edge on a SUB vertex.
fn external_edge_bits(compressed: &Graph, sub_vertex_count: usize) -> f64 {
    let per_endpoint = lg(sub_vertex_count as f64);
    let mut endpoints = 0usize;
    for v in compressed.vertex_ids() {
        if compressed[v].introduced_by_compression.is_some() {
            endpoints += compressed.incident_edges(v).len()
                + compressed
                    .incident_edges(v)
                    .iter()
                    .filter(|&&e| compressed[e].v1 == compressed[e].v2)
                    .count();
        }
    }
    endpoints as f64 * per_endpoint
}
