//! Diagnostics hooks for the match engine
//!
//! An observer is handed to `MatchEngine::compute_coverage_with` and is
//! called at fixed points of the search. All methods default to doing
//! nothing, so an implementation only overrides what it cares about.

use crate::pattern::PatternIdx;
use crate::tree::NodeId;

pub trait MatchObserver {
    /// A pattern node was scored against a target node
    fn node_entered(&mut self, _pattern: PatternIdx, _target: NodeId, _local_score: f32) {}

    /// A branch was abandoned because its running score fell below threshold
    fn branch_pruned(
        &mut self,
        _pattern: PatternIdx,
        _target: NodeId,
        _cumulative_score: f32,
        _threshold: f32,
    ) {
    }

    /// A (pattern root, target node) trial finished
    fn root_tried(&mut self, _pattern_root: PatternIdx, _target: NodeId, _score: f32) {}

    /// A trial became the best alignment so far
    fn root_committed(&mut self, _pattern_root: PatternIdx, _target: NodeId, _score: f32) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MatchObserver for NoopObserver {}

/// Observer that forwards every event to the `log` facade at trace level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn node_entered(&mut self, pattern: PatternIdx, target: NodeId, local_score: f32) {
        log::trace!(
            "enter pattern node {pattern} at target node {target}: local score {local_score}"
        );
    }

    fn branch_pruned(
        &mut self,
        pattern: PatternIdx,
        target: NodeId,
        cumulative_score: f32,
        threshold: f32,
    ) {
        log::trace!(
            "prune pattern node {pattern} at target node {target}: {cumulative_score} < {threshold}"
        );
    }

    fn root_tried(&mut self, pattern_root: PatternIdx, target: NodeId, score: f32) {
        log::trace!("root pair ({pattern_root}, {target}) scored {score}");
    }

    fn root_committed(&mut self, pattern_root: PatternIdx, target: NodeId, score: f32) {
        log::trace!("root pair ({pattern_root}, {target}) is the new best at {score}");
    }
}

/// Observer that keeps every event, for tests and offline debugging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingObserver {
    pub events: Vec<MatchEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchEvent {
    Entered {
        pattern: PatternIdx,
        target: NodeId,
        local_score: f32,
    },
    Pruned {
        pattern: PatternIdx,
        target: NodeId,
        cumulative_score: f32,
    },
    Tried {
        pattern_root: PatternIdx,
        target: NodeId,
        score: f32,
    },
    Committed {
        pattern_root: PatternIdx,
        target: NodeId,
        score: f32,
    },
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pruned_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MatchEvent::Pruned { .. }))
            .count()
    }

    pub fn entered_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MatchEvent::Entered { .. }))
            .count()
    }
}

impl MatchObserver for RecordingObserver {
    fn node_entered(&mut self, pattern: PatternIdx, target: NodeId, local_score: f32) {
        self.events.push(MatchEvent::Entered {
            pattern,
            target,
            local_score,
        });
    }

    fn branch_pruned(
        &mut self,
        pattern: PatternIdx,
        target: NodeId,
        cumulative_score: f32,
        _threshold: f32,
    ) {
        self.events.push(MatchEvent::Pruned {
            pattern,
            target,
            cumulative_score,
        });
    }

    fn root_tried(&mut self, pattern_root: PatternIdx, target: NodeId, score: f32) {
        self.events.push(MatchEvent::Tried {
            pattern_root,
            target,
            score,
        });
    }

    fn root_committed(&mut self, pattern_root: PatternIdx, target: NodeId, score: f32) {
        self.events.push(MatchEvent::Committed {
            pattern_root,
            target,
            score,
        });
    }
}

impl<O: MatchObserver + ?Sized> MatchObserver for &mut O {
    fn node_entered(&mut self, pattern: PatternIdx, target: NodeId, local_score: f32) {
        (**self).node_entered(pattern, target, local_score)
    }

    fn branch_pruned(
        &mut self,
        pattern: PatternIdx,
        target: NodeId,
        cumulative_score: f32,
        threshold: f32,
    ) {
        (**self).branch_pruned(pattern, target, cumulative_score, threshold)
    }

    fn root_tried(&mut self, pattern_root: PatternIdx, target: NodeId, score: f32) {
        (**self).root_tried(pattern_root, target, score)
    }

    fn root_committed(&mut self, pattern_root: PatternIdx, target: NodeId, score: f32) {
        (**self).root_committed(pattern_root, target, score)
    }
}
