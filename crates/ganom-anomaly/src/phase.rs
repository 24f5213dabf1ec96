//! Lifecycle of an anomaly search.
//!
//! Every search walks the same forward-only phase machine:
//! `Init -> Seeded -> Extending -> AtTargetSize -> Scored -> Emitted`.
//! An empty seed set or a dead-end extension jumps straight to `Scored`
//! with an empty result, which renders as "Anomalous Instances: NONE".

/// Phase of an anomaly search. Ordering follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SearchPhase {
    /// Nothing has happened yet.
    #[default]
    Init,
    /// Seed instances selected.
    Seeded,
    /// Candidates growing one edge at a time.
    Extending,
    /// Candidates reached the target size.
    AtTargetSize,
    /// Scores assigned (possibly over an empty candidate set).
    Scored,
    /// Results handed to the caller.
    Emitted,
}

impl SearchPhase {
    /// Moves to `next`, which must not be earlier than the current phase.
    /// Skipping ahead is legal (empty seeds jump directly to `Scored`).
    pub fn advance(&mut self, next: SearchPhase) {
        debug_assert!(
            next >= *self,
            "anomaly search phase may only move forward ({:?} -> {:?})",
            self,
            next
        );
        *self = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_move_forward() {
        let mut phase = SearchPhase::default();
        assert_eq!(phase, SearchPhase::Init);
        phase.advance(SearchPhase::Seeded);
        phase.advance(SearchPhase::Extending);
        phase.advance(SearchPhase::AtTargetSize);
        phase.advance(SearchPhase::Scored);
        phase.advance(SearchPhase::Emitted);
        assert_eq!(phase, SearchPhase::Emitted);
    }

    #[test]
    fn empty_search_may_jump_to_scored() {
        let mut phase = SearchPhase::Init;
        phase.advance(SearchPhase::Scored);
        assert_eq!(phase, SearchPhase::Scored);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn moving_backward_asserts() {
        let mut phase = SearchPhase::Scored;
        phase.advance(SearchPhase::Seeded);
    }
}
