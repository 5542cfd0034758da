//! Per-pattern-node match results
//!
//! A `Coverage` records, for every node of a pattern, how well it was
//! matched and by which target node. Confidence 0 and "no target" always go
//! together.

use crate::pattern::{PatternIdx, PatternTree};
use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coverage {
    confidence: Vec<f32>,
    matched: Vec<Option<NodeId>>,
}

impl Coverage {
    /// An empty coverage for a pattern with `len` nodes
    pub fn new(len: usize) -> Self {
        Self {
            confidence: vec![0.0; len],
            matched: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.confidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confidence.is_empty()
    }

    /// Best local match probability recorded for pattern node `idx`
    #[inline]
    pub fn confidence(&self, idx: PatternIdx) -> f32 {
        self.confidence[idx]
    }

    /// Target node assigned to pattern node `idx`, if any
    #[inline]
    pub fn matched(&self, idx: PatternIdx) -> Option<NodeId> {
        self.matched[idx]
    }

    pub fn confidences(&self) -> &[f32] {
        &self.confidence
    }

    pub fn matches(&self) -> &[Option<NodeId>] {
        &self.matched
    }

    /// Iterate `(pattern index, confidence, matched target)` triples
    pub fn iter(&self) -> impl Iterator<Item = (PatternIdx, f32, Option<NodeId>)> + '_ {
        self.confidence
            .iter()
            .zip(&self.matched)
            .enumerate()
            .map(|(idx, (&conf, &target))| (idx, conf, target))
    }

    /// Target nodes referenced by the coverage, in pattern order
    pub fn matched_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.matched.iter().filter_map(|m| *m)
    }

    pub fn covered_count(&self) -> usize {
        self.matched.iter().filter(|m| m.is_some()).count()
    }

    /// True if every pattern node has a match
    pub fn is_complete(&self) -> bool {
        !self.is_empty() && self.matched.iter().all(Option::is_some)
    }

    /// Weight-averaged confidence over the pattern's nodes
    ///
    /// Returns 0 when the pattern's weights sum to 0.
    pub fn weighted_score(&self, pattern: &PatternTree) -> f32 {
        self.weighted_mean(pattern.nodes().iter().map(|node| node.weight))
    }

    /// Confidence averaged under explicit per-node weights
    ///
    /// Nodes with weight 0 drop out of the average entirely.
    pub fn weighted_average(&self, weights: &[f32]) -> f32 {
        self.weighted_mean(weights.iter().copied())
    }

    fn weighted_mean(&self, weights: impl Iterator<Item = f32>) -> f32 {
        let mut total = 0.0;
        let mut weighted = 0.0;
        for (weight, &conf) in weights.zip(&self.confidence) {
            total += weight;
            weighted += weight * conf;
        }
        if total > 0.0 { weighted / total } else { 0.0 }
    }

    /// Store a local match; a zero score leaves the slot unmatched
    #[inline]
    pub(crate) fn record(&mut self, idx: PatternIdx, score: f32, target: NodeId) {
        if score > 0.0 {
            self.confidence[idx] = score;
            self.matched[idx] = Some(target);
        } else {
            self.confidence[idx] = 0.0;
            self.matched[idx] = None;
        }
    }

    /// Resize to `len` nodes and zero every entry
    pub(crate) fn reset(&mut self, len: usize) {
        self.confidence.clear();
        self.confidence.resize(len, 0.0);
        self.matched.clear();
        self.matched.resize(len, None);
    }

    pub(crate) fn clear_entries(&mut self, indices: &[PatternIdx]) {
        for &idx in indices {
            self.confidence[idx] = 0.0;
            self.matched[idx] = None;
        }
    }

    pub(crate) fn copy_entries(&mut self, from: &Coverage, indices: &[PatternIdx]) {
        for &idx in indices {
            self.confidence[idx] = from.confidence[idx];
            self.matched[idx] = from.matched[idx];
        }
    }

    pub(crate) fn copy_all(&mut self, from: &Coverage) {
        self.confidence.clone_from(&from.confidence);
        self.matched.clone_from(&from.matched);
    }
}
