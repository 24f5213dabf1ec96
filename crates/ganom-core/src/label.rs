//! Interned vertex and edge labels.
//!
//! A [`Label`] is either numeric or string valued; equality is by kind and
//! value. The [`LabelRegistry`] owns every label used by a run and hands out
//! stable nonnegative [`LabelId`]s. Labels are never removed from a live
//! registry; after compression a *compacted* copy is rebuilt from the graph
//! so indices stay dense (see [`LabelRegistry::compact`]).

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::id::LabelId;

/// A vertex or edge label: numeric or string valued.
///
/// Numeric labels compare by exact value (the parser never produces NaN, so
/// bit-level interning in the registry agrees with `==` everywhere the
/// pipeline compares labels).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Label {
    /// Numeric label, e.g. `v 1 2.5`.
    Num(f64),
    /// String label, bareword or quoted in the input grammar.
    Str(String),
}

impl Label {
    /// True for [`Label::Str`].
    pub fn is_string(&self) -> bool {
        matches!(self, Label::Str(_))
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Label::Num(a), Label::Num(b)) => a == b,
            (Label::Str(a), Label::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Num(n) => write!(f, "{}", n),
            Label::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Str(s.to_owned())
    }
}

impl From<f64> for Label {
    fn from(n: f64) -> Self {
        Label::Num(n)
    }
}

/// Owner of all labels in a run, keyed both ways.
///
/// String labels are interned through an insertion-ordered map so that ids
/// are stable across identical inputs; numeric labels are interned by their
/// bit pattern. The registry is `Clone` so callers can keep an original
/// alongside a working copy that compression mutates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelRegistry {
    labels: Vec<Label>,
    by_string: IndexMap<String, LabelId>,
    by_number: HashMap<u64, LabelId>,
}

impl LabelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        LabelRegistry::default()
    }

    /// Interns a label, returning its stable id.
    ///
    /// Interning an already-known label returns the existing id.
    pub fn intern(&mut self, label: Label) -> LabelId {
        match &label {
            Label::Str(s) => {
                if let Some(&id) = self.by_string.get(s.as_str()) {
                    return id;
                }
                let id = LabelId(self.labels.len() as u32);
                self.by_string.insert(s.clone(), id);
                self.labels.push(label);
                id
            }
            Label::Num(n) => {
                if let Some(&id) = self.by_number.get(&n.to_bits()) {
                    return id;
                }
                let id = LabelId(self.labels.len() as u32);
                self.by_number.insert(n.to_bits(), id);
                self.labels.push(label);
                id
            }
        }
    }

    /// Looks up a label by id.
    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(id.index())
    }

    /// Looks up the id of an already-interned label.
    pub fn lookup(&self, label: &Label) -> Option<LabelId> {
        match label {
            Label::Str(s) => self.by_string.get(s.as_str()).copied(),
            Label::Num(n) => self.by_number.get(&n.to_bits()).copied(),
        }
    }

    /// Number of distinct labels interned so far.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when no label has been interned.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates over `(id, label)` pairs in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (LabelId, &Label)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, l)| (LabelId(i as u32), l))
    }

    /// Rebuilds a registry containing only the labels `graph` references and
    /// rewrites every vertex and edge label id in `graph` to the new, dense
    /// numbering.
    ///
    /// Interning order follows graph order (vertices first, then edges), so
    /// the result is deterministic for a given graph.
    pub fn compact(&self, graph: &mut Graph) -> LabelRegistry {
        let mut compacted = LabelRegistry::new();
        let mut remap: HashMap<LabelId, LabelId> = HashMap::new();

        for i in 0..graph.vertex_count() {
            let old = graph.vertices[i].label;
            let new = *remap
                .entry(old)
                .or_insert_with(|| compacted.intern(self.labels[old.index()].clone()));
            graph.vertices[i].label = new;
        }
        for i in 0..graph.edge_count() {
            let old = graph.edges[i].label;
            let new = *remap
                .entry(old)
                .or_insert_with(|| compacted.intern(self.labels[old.index()].clone()));
            graph.edges[i].label = new;
        }
        compacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let b = reg.intern(Label::from("b"));
        let a2 = reg.intern(Label::from("a"));

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn numeric_and_string_labels_are_distinct() {
        let mut reg = LabelRegistry::new();
        let n = reg.intern(Label::Num(1.0));
        let s = reg.intern(Label::from("1"));

        assert_ne!(n, s);
        assert_eq!(reg.get(n), Some(&Label::Num(1.0)));
        assert_eq!(reg.get(s), Some(&Label::Str("1".into())));
    }

    #[test]
    fn ids_are_stable_and_sequential() {
        let mut reg = LabelRegistry::new();
        for i in 0..10 {
            let id = reg.intern(Label::Num(i as f64));
            assert_eq!(id, LabelId(i));
        }
        // Re-interning does not disturb existing ids.
        assert_eq!(reg.intern(Label::Num(3.0)), LabelId(3));
        assert_eq!(reg.len(), 10);
    }

    #[test]
    fn lookup_finds_interned_labels_only() {
        let mut reg = LabelRegistry::new();
        let id = reg.intern(Label::from("x"));
        assert_eq!(reg.lookup(&Label::from("x")), Some(id));
        assert_eq!(reg.lookup(&Label::from("y")), None);
        assert_eq!(reg.lookup(&Label::Num(0.5)), None);
    }

    #[test]
    fn clone_gives_independent_working_copy() {
        let mut original = LabelRegistry::new();
        original.intern(Label::from("a"));

        let mut working = original.clone();
        working.intern(Label::from("b"));

        assert_eq!(original.len(), 1);
        assert_eq!(working.len(), 2);
    }

    #[test]
    fn label_display() {
        assert_eq!(format!("{}", Label::Num(3.0)), "3");
        assert_eq!(format!("{}", Label::Num(2.5)), "2.5");
        assert_eq!(format!("{}", Label::from("edge")), "edge");
    }
}
