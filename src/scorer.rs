//! Local match scoring
//!
//! The matcher only needs to know how well one pattern node matches one
//! target node given the roles each fills under its parent. Everything about
//! predicate and role compatibility lives behind the `LocalScorer` trait.

use crate::pattern::{PatternLabel, PatternNode};
use crate::symbols::Sym;
use crate::tree::{NodeKind, TargetNode};
use rustc_hash::FxHashMap;

/// Scores a single pattern node against a single target node
///
/// Roles are `None` for the pair being tried as the alignment root.
/// Implementations must return a value in [0, 1] and must not depend on
/// anything but their arguments; the matcher calls them many times per
/// sentence in an order that is not part of the contract.
pub trait LocalScorer {
    fn score(
        &self,
        pattern: &PatternNode,
        target: &TargetNode,
        pattern_role: Option<Sym>,
        target_role: Option<Sym>,
    ) -> f32;
}

impl<F> LocalScorer for F
where
    F: Fn(&PatternNode, &TargetNode, Option<Sym>, Option<Sym>) -> f32,
{
    #[inline]
    fn score(
        &self,
        pattern: &PatternNode,
        target: &TargetNode,
        pattern_role: Option<Sym>,
        target_role: Option<Sym>,
    ) -> f32 {
        self(pattern, target, pattern_role, target_role)
    }
}

/// Label-level similarity, used directly by the node and edge matchers
///
/// Both methods must return values in [0, 1].
pub trait ConfusionModel {
    /// How well target predicate `target` stands in for `pattern`
    fn predicate_confusion(&self, pattern: Sym, target: Sym) -> f32;

    /// How well target role `target` stands in for `pattern`; `None` is a
    /// root position and matches anything
    fn role_confusion(&self, pattern: Option<Sym>, target: Option<Sym>) -> f32;
}

/// Exact label matching
///
/// 1.0 when predicates are identical, 1.0 when a wildcard meets a leaf or a
/// mention, 0.0 otherwise. A node reached through a different role than the
/// pattern asks for scores 0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelScorer;

#[inline]
fn label_score(pattern: &PatternNode, target: &TargetNode) -> Option<f32> {
    match pattern.label {
        PatternLabel::Predicate(pred) if pred == target.predicate => Some(1.0),
        PatternLabel::Predicate(_) => None,
        PatternLabel::Wildcard(_) if target.is_leaf() || target.kind == NodeKind::Mention => {
            Some(1.0)
        }
        PatternLabel::Wildcard(_) => Some(0.0),
    }
}

impl LocalScorer for LabelScorer {
    fn score(
        &self,
        pattern: &PatternNode,
        target: &TargetNode,
        pattern_role: Option<Sym>,
        target_role: Option<Sym>,
    ) -> f32 {
        if let (Some(p), Some(t)) = (pattern_role, target_role)
            && p != t
        {
            return 0.0;
        }
        label_score(pattern, target).unwrap_or(0.0)
    }
}

impl ConfusionModel for LabelScorer {
    fn predicate_confusion(&self, pattern: Sym, target: Sym) -> f32 {
        if pattern == target { 1.0 } else { 0.0 }
    }

    fn role_confusion(&self, pattern: Option<Sym>, target: Option<Sym>) -> f32 {
        match (pattern, target) {
            (Some(p), Some(t)) if p != t => 0.0,
            _ => 1.0,
        }
    }
}

/// Label matching softened by confusion tables
///
/// The score is a predicate term times a role term. The predicate term is
/// as in `LabelScorer`, except that differing predicates look up
/// `(pattern predicate, target predicate)` in the predicate table (default
/// 0). The role term is 1 when the roles agree or either is absent, and the
/// `(pattern role, target role)` entry of the role table otherwise (default
/// `default_role`, initially 1).
#[derive(Debug, Clone)]
pub struct ConfusionScorer {
    predicates: FxHashMap<(Sym, Sym), f32>,
    roles: FxHashMap<(Sym, Sym), f32>,
    default_role: f32,
}

impl Default for ConfusionScorer {
    fn default() -> Self {
        Self {
            predicates: FxHashMap::default(),
            roles: FxHashMap::default(),
            default_role: 1.0,
        }
    }
}

impl ConfusionScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability that target predicate `target` stands in for `pattern`
    pub fn with_predicate_confusion(mut self, pattern: Sym, target: Sym, prob: f32) -> Self {
        self.predicates.insert((pattern, target), prob);
        self
    }

    /// Probability that target role `target` stands in for `pattern`
    pub fn with_role_confusion(mut self, pattern: Sym, target: Sym, prob: f32) -> Self {
        self.roles.insert((pattern, target), prob);
        self
    }

    /// Role term for mismatched roles without a table entry
    pub fn with_default_role_confusion(mut self, prob: f32) -> Self {
        self.default_role = prob;
        self
    }

    pub fn predicate_confusion(&self, pattern: Sym, target: Sym) -> f32 {
        if pattern == target {
            return 1.0;
        }
        self.predicates.get(&(pattern, target)).copied().unwrap_or(0.0)
    }

    pub fn role_confusion(&self, pattern: Option<Sym>, target: Option<Sym>) -> f32 {
        match (pattern, target) {
            (Some(p), Some(t)) if p != t => {
                self.roles.get(&(p, t)).copied().unwrap_or(self.default_role)
            }
            _ => 1.0,
        }
    }
}

impl ConfusionModel for ConfusionScorer {
    fn predicate_confusion(&self, pattern: Sym, target: Sym) -> f32 {
        ConfusionScorer::predicate_confusion(self, pattern, target)
    }

    fn role_confusion(&self, pattern: Option<Sym>, target: Option<Sym>) -> f32 {
        ConfusionScorer::role_confusion(self, pattern, target)
    }
}

impl LocalScorer for ConfusionScorer {
    fn score(
        &self,
        pattern: &PatternNode,
        target: &TargetNode,
        pattern_role: Option<Sym>,
        target_role: Option<Sym>,
    ) -> f32 {
        let label = match (label_score(pattern, target), pattern.label) {
            (Some(score), _) => score,
            (None, PatternLabel::Predicate(pred)) => {
                self.predicate_confusion(pred, target.predicate)
            }
            (None, PatternLabel::Wildcard(_)) => 0.0,
        };
        if label == 0.0 {
            return 0.0;
        }
        label * self.role_confusion(pattern_role, target_role)
    }
}
