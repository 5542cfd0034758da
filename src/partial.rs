//! Node and edge matching
//!
//! Cheaper companions to the full tree alignment in `matcher`. A
//! `NodeMatcher` scores each pattern predicate against its best counterpart
//! anywhere in the target. An `EdgeMatcher` scores each predicate-to-predicate
//! edge of the pattern against every edge of the target. Neither looks at
//! how the matched pieces hang together.
//!
//! Both fill a `Coverage` and reduce it to one score with per-node weights.
//! Wildcard nodes have no predicate and weigh 0. Nodes a matcher can never
//! cover are marked invalid and also weigh 0, so they do not drag the
//! average down.

use crate::coverage::Coverage;
use crate::matcher::MatchError;
use crate::pattern::{PatternIdx, PatternTree};
use crate::scorer::ConfusionModel;
use crate::symbols::Sym;
use crate::tree::{NodeId, TargetTree};
use std::sync::Arc;

/// A pattern edge between two predicates, filed under its child node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedEdge {
    pub parent: Sym,
    pub child: Sym,
    pub role: Sym,
    pub source: PatternIdx,
}

/// A pattern predicate matched on its own when the pattern has no edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedRoot {
    pub predicate: Sym,
    pub source: PatternIdx,
}

fn checked(score: f32, pattern: PatternIdx, target: NodeId) -> Result<f32, MatchError> {
    if (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(MatchError::InvalidScore {
            pattern,
            target,
            score,
        })
    }
}

/// Pattern weights with wildcard and invalid nodes zeroed
fn effective_weights(pattern: &PatternTree, valid: &[bool]) -> Vec<f32> {
    pattern
        .nodes()
        .iter()
        .zip(valid)
        .map(|(node, &valid)| {
            if valid && node.label.predicate().is_some() {
                node.weight
            } else {
                0.0
            }
        })
        .collect()
}

/// Matches pattern predicates one node at a time
#[derive(Debug)]
pub struct NodeMatcher<C> {
    pattern: Arc<PatternTree>,
    model: C,
    valid: Vec<bool>,
    weights: Vec<f32>,
    coverage: Coverage,
}

impl<C: ConfusionModel> NodeMatcher<C> {
    pub fn new(pattern: impl Into<Arc<PatternTree>>, model: C) -> Self {
        let pattern = pattern.into();
        let valid: Vec<bool> = pattern
            .nodes()
            .iter()
            .map(|node| node.label.predicate().is_some())
            .collect();
        let weights = effective_weights(&pattern, &valid);
        let coverage = Coverage::new(pattern.len());
        Self {
            pattern,
            model,
            valid,
            weights,
            coverage,
        }
    }

    /// Record, for every pattern predicate, the target node that best
    /// stands in for it
    ///
    /// On error the coverage is left empty.
    pub fn compute_coverage(&mut self, target: &TargetTree) -> Result<(), MatchError> {
        let result = self.fill(target);
        if result.is_err() {
            self.coverage.reset(self.pattern.len());
        }
        log::debug!(
            "node coverage: {} of {} pattern nodes covered in {} target nodes",
            self.coverage.covered_count(),
            self.pattern.len(),
            target.len()
        );
        result
    }

    fn fill(&mut self, target: &TargetTree) -> Result<(), MatchError> {
        self.coverage.reset(self.pattern.len());
        for target_node in target.nodes() {
            for (idx, node) in self.pattern.nodes().iter().enumerate() {
                let Some(predicate) = node.label.predicate() else {
                    continue;
                };
                let prob = checked(
                    self.model.predicate_confusion(predicate, target_node.predicate),
                    idx,
                    target_node.id,
                )?;
                if prob > self.coverage.confidence(idx) {
                    self.coverage.record(idx, prob, target_node.id);
                }
            }
        }
        Ok(())
    }

    /// Compute the coverage and reduce it to one weighted score
    pub fn compare_to_target(&mut self, target: &TargetTree) -> Result<f32, MatchError> {
        self.compute_coverage(target)?;
        Ok(self.score())
    }

    /// Weighted average of the current coverage
    pub fn score(&self) -> f32 {
        self.coverage.weighted_average(&self.weights)
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    pub fn is_valid(&self, idx: PatternIdx) -> bool {
        self.valid[idx]
    }

    /// Weight of each pattern node in `score`
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn pattern(&self) -> &Arc<PatternTree> {
        &self.pattern
    }
}

/// Matches pattern edges one (parent, role, child) triple at a time
///
/// Every pattern edge whose endpoints both carry predicates, and whose
/// predicates differ, becomes a `LocatedEdge` scored on behalf of its child
/// node. The children of wildcard nodes act as separate roots. Only when a
/// pattern has no located edges at all are its root predicates matched on
/// their own. Nodes that end up in neither list are invalid.
#[derive(Debug)]
pub struct EdgeMatcher<C> {
    pattern: Arc<PatternTree>,
    model: C,
    edges: Vec<LocatedEdge>,
    roots: Vec<LocatedRoot>,
    valid: Vec<bool>,
    weights: Vec<f32>,
    coverage: Coverage,
}

impl<C: ConfusionModel> EdgeMatcher<C> {
    pub fn new(pattern: impl Into<Arc<PatternTree>>, model: C) -> Self {
        let pattern = pattern.into();

        let mut edges = Vec::new();
        let mut detached = Vec::new();
        for edge in pattern.edges() {
            let parent = pattern.node(edge.parent).label.predicate();
            let child = pattern.node(edge.child).label.predicate();
            match (parent, child) {
                (None, _) => detached.push(edge.child),
                (Some(parent), Some(child)) if parent != child => edges.push(LocatedEdge {
                    parent,
                    child,
                    role: edge.role,
                    source: edge.child,
                }),
                _ => {}
            }
        }

        let mut roots = Vec::new();
        if edges.is_empty() {
            for &idx in detached.iter().chain(pattern.roots()) {
                if let Some(predicate) = pattern.node(idx).label.predicate() {
                    roots.push(LocatedRoot {
                        predicate,
                        source: idx,
                    });
                }
            }
        }

        let mut valid = vec![false; pattern.len()];
        for source in edges.iter().map(|e| e.source).chain(roots.iter().map(|r| r.source)) {
            valid[source] = true;
        }
        let weights = effective_weights(&pattern, &valid);
        let coverage = Coverage::new(pattern.len());

        Self {
            pattern,
            model,
            edges,
            roots,
            valid,
            weights,
            coverage,
        }
    }

    /// Record, for every located edge, the best-scoring target edge; the
    /// target child is stored as the match of the edge's child node
    ///
    /// On error the coverage is left empty.
    pub fn compute_coverage(&mut self, target: &TargetTree) -> Result<(), MatchError> {
        let result = self.fill(target);
        if result.is_err() {
            self.coverage.reset(self.pattern.len());
        }
        log::debug!(
            "edge coverage: {} located edges, {} located roots, {} pattern nodes covered",
            self.edges.len(),
            self.roots.len(),
            self.coverage.covered_count()
        );
        result
    }

    fn fill(&mut self, target: &TargetTree) -> Result<(), MatchError> {
        self.coverage.reset(self.pattern.len());
        for parent in target.nodes() {
            for target_edge in &parent.children {
                let child = target.node(target_edge.child);
                for located in &self.edges {
                    let prob = self.model.predicate_confusion(located.parent, parent.predicate)
                        * self.model.predicate_confusion(located.child, child.predicate)
                        * self
                            .model
                            .role_confusion(Some(located.role), Some(target_edge.role));
                    let prob = checked(prob, located.source, child.id)?;
                    if prob > self.coverage.confidence(located.source) {
                        self.coverage.record(located.source, prob, child.id);
                    }
                }
            }

            for located in &self.roots {
                let prob = checked(
                    self.model.predicate_confusion(located.predicate, parent.predicate),
                    located.source,
                    parent.id,
                )?;
                if prob > self.coverage.confidence(located.source) {
                    self.coverage.record(located.source, prob, parent.id);
                }
            }
        }
        Ok(())
    }

    /// Compute the coverage and reduce it to one weighted score
    pub fn compare_to_target(&mut self, target: &TargetTree) -> Result<f32, MatchError> {
        self.compute_coverage(target)?;
        Ok(self.score())
    }

    /// Weighted average of the current coverage over valid nodes
    pub fn score(&self) -> f32 {
        self.coverage.weighted_average(&self.weights)
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    pub fn located_edges(&self) -> &[LocatedEdge] {
        &self.edges
    }

    pub fn located_roots(&self) -> &[LocatedRoot] {
        &self.roots
    }

    /// False for nodes no located edge or root stands for
    pub fn is_valid(&self, idx: PatternIdx) -> bool {
        self.valid[idx]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn pattern(&self) -> &Arc<PatternTree> {
        &self.pattern
    }
}
