//! Beam-search substructure discovery.
//!
//! Seeds one single-vertex substructure per distinct vertex label, then
//! repeatedly extends every parent by one edge, evaluates the children, and
//! keeps the best `beam_width` of them as the next generation. Parents of
//! acceptable size feed a bounded best list, which is the discovery output.
//!
//! Ties in value are broken by earliest insertion, and every iteration order
//! follows host-graph indices, so a run is deterministic for a given input.

use indexmap::IndexMap;
use tracing::{debug, info};

use ganom_core::{Graph, Instance, LabelId, LabelRegistry, Substructure};

use crate::evaluate::Evaluator;
use crate::extend::{extend_substructure, ExtendOptions};
use crate::matcher::MatchCosts;
use crate::params::MineParams;

/// Two values within this distance count as tied.
pub const VALUE_EPSILON: f64 = 1e-6;

/// What kind of discovery pass is running; affects seeding and termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Plain discovery (also the first probabilistic iteration).
    #[default]
    Normal,
    /// Discovery feeding the information-theoretic anomaly search; retains
    /// single-occurrence seeds.
    InfoTheoretic,
    /// Discovery feeding the partial-substructure anomaly search; retains
    /// single-occurrence seeds.
    Mps,
    /// Probabilistic iterations after the first: seed only from vertices
    /// introduced by compression, run a single expansion round, and keep
    /// children at two vertices or fewer. Overlap is always allowed and
    /// pruning is off.
    ProbSubsequent,
}

impl Mode {
    fn retains_singletons(self) -> bool {
        matches!(self, Mode::InfoTheoretic | Mode::Mps | Mode::ProbSubsequent)
    }
}

// ---------------------------------------------------------------------------
// Bounded, value-ordered substructure list
// ---------------------------------------------------------------------------

/// A list of substructures kept sorted by descending value and bounded
/// either by count or by number of distinct values.
///
/// Equal-valued entries keep insertion order, so earlier discoveries win
/// ties.
#[derive(Debug, Default)]
pub struct SubstructureList {
    subs: Vec<Substructure>,
    max_len: usize,
    value_based: bool,
}

impl SubstructureList {
    /// Creates a list bounded to `max_len` entries (or distinct values).
    pub fn new(max_len: usize, value_based: bool) -> Self {
        SubstructureList {
            subs: Vec::new(),
            max_len,
            value_based,
        }
    }

    /// Inserts keeping descending value order, then trims the tail.
    ///
    /// A substructure whose definition exactly matches an existing entry
    /// replaces it only when strictly more valuable; otherwise the earlier
    /// entry wins.
    pub fn insert(&mut self, sub: Substructure) {
        if let Some(existing) = self
            .subs
            .iter()
            .position(|s| crate::matcher::graphs_match_exactly(&s.definition, &sub.definition))
        {
            if sub.value <= self.subs[existing].value + VALUE_EPSILON {
                return;
            }
            self.subs.remove(existing);
        }
        let pos = self
            .subs
            .iter()
            .position(|s| s.value < sub.value - VALUE_EPSILON)
            .unwrap_or(self.subs.len());
        self.subs.insert(pos, sub);
        self.trim();
    }

    fn trim(&mut self) {
        if self.value_based {
            // Bound the number of distinct values, not entries.
            let mut distinct = 0;
            let mut last_value = f64::INFINITY;
            let mut cut = self.subs.len();
            for (i, sub) in self.subs.iter().enumerate() {
                if (last_value - sub.value).abs() > VALUE_EPSILON {
                    distinct += 1;
                    last_value = sub.value;
                }
                if distinct > self.max_len {
                    cut = i;
                    break;
                }
            }
            self.subs.truncate(cut);
        } else {
            self.subs.truncate(self.max_len);
        }
    }

    /// True when no substructure is held.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of held substructures.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Consumes the list, yielding substructures best-first.
    pub fn into_vec(self) -> Vec<Substructure> {
        self.subs
    }

    fn drain(&mut self) -> Vec<Substructure> {
        std::mem::take(&mut self.subs)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Runs beam-search discovery over `host`, returning the top-K
/// substructures best-first.
pub fn discover(
    host: &Graph,
    labels: &LabelRegistry,
    params: &MineParams,
    mode: Mode,
) -> Vec<Substructure> {
    let mut evaluator = Evaluator::new(params.eval, host, labels);

    // Pruning must not eliminate rare extensions in later probabilistic
    // iterations; overlap among them is always legal.
    let prune = params.prune && mode != Mode::ProbSubsequent;
    let allow_overlap = params.allow_overlap || mode == Mode::ProbSubsequent;

    let extend_opts = ExtendOptions {
        threshold: params.threshold,
        allow_overlap,
        mark_anomalous: mode == Mode::ProbSubsequent,
        costs: MatchCosts::default(),
    };

    let mut parents = SubstructureList::new(params.beam_width, params.value_based);
    for mut seed in seed_substructures(host, mode) {
        if seed.num_instances() < 2 && !mode.retains_singletons() {
            continue;
        }
        evaluator.evaluate(&mut seed, host, labels);
        parents.insert(seed);
    }

    let mut best = SubstructureList::new(params.num_best_subs, false);
    let mut remaining = if params.limit == 0 {
        host.edge_count() / 2 + 1
    } else {
        params.limit
    };
    debug!(
        seeds = parents.len(),
        limit = remaining,
        ?mode,
        "discovery start"
    );

    while !parents.is_empty() && remaining > 0 {
        let generation = parents.drain();
        let mut children_list = SubstructureList::new(params.beam_width, params.value_based);

        for parent in generation {
            if remaining == 0 {
                consider_best(&mut best, parent, params);
                continue;
            }
            remaining -= 1;

            if parent.num_instances() >= 2 && parent.definition.vertex_count() <= params.max_vertices
            {
                for mut child in extend_substructure(&parent, host, &extend_opts) {
                    if child.definition.vertex_count() > params.max_vertices {
                        continue;
                    }
                    if mode == Mode::ProbSubsequent && child.definition.vertex_count() > 2 {
                        continue;
                    }
                    evaluator.evaluate(&mut child, host, labels);
                    if prune && child.value < parent.value {
                        continue;
                    }
                    children_list.insert(child);
                }
            }
            consider_best(&mut best, parent, params);
        }

        parents = children_list;
        if mode == Mode::ProbSubsequent {
            // Only the single-edge extensions of the compressed normative
            // vertex matter; deeper rounds are never run.
            for parent in parents.drain() {
                consider_best(&mut best, parent, params);
            }
            break;
        }
    }

    // Whatever is left unexpanded still competes for the best list.
    for parent in parents.drain() {
        consider_best(&mut best, parent, params);
    }

    let result = best.into_vec();
    info!(
        best = result.len(),
        top_value = result.first().map(|s| s.value).unwrap_or(0.0),
        "discovery finished"
    );
    result
}

fn consider_best(best: &mut SubstructureList, sub: Substructure, params: &MineParams) {
    if sub.definition.vertex_count() >= params.min_vertices && !sub.is_compressed_singleton() {
        best.insert(sub);
    }
}

/// One single-vertex substructure per distinct vertex label, in first-seen
/// order. In [`Mode::ProbSubsequent`] only compression-introduced vertices
/// seed.
fn seed_substructures(host: &Graph, mode: Mode) -> Vec<Substructure> {
    let mut seeds: IndexMap<LabelId, Substructure> = IndexMap::new();
    for v in host.vertex_ids() {
        let vertex = &host[v];
        if mode == Mode::ProbSubsequent && vertex.introduced_by_compression.is_none() {
            continue;
        }
        let sub = seeds.entry(vertex.label).or_insert_with(|| {
            let mut def = Graph::new();
            def.add_vertex_from(vertex);
            Substructure::new(def)
        });
        let mut inst = Instance::single(v);
        inst.mapping = inst.vertices.clone();
        sub.instances.push(std::rc::Rc::new(inst));
    }
    seeds.into_values().collect()
}
