//! Pattern-to-target alignment
//!
//! The matcher aligns a compiled pattern against every subtree of a target
//! tree and keeps the single best-scoring alignment. Scores multiply down
//! the pattern: a node's total is its local score times, for each of its
//! pattern children, the best total that child reaches under any child of
//! the aligned target node. Because every factor lies in [0, 1] the running
//! product never grows, so a branch whose product has fallen below the
//! threshold can be abandoned.
//!
//! Two commit disciplines decide what ends up in the coverage:
//!
//! - `MatchMode::Greedy` writes straight into the trial buffer and keeps the
//!   best local score seen per pattern node, whichever alternative it came
//!   from.
//! - `MatchMode::Constrained` gives each recursion level its own buffer.
//!   A child alignment is tried in the next level's buffer and copied up only
//!   when it beats the previous candidates for that child, so the committed
//!   coverage always describes one alignment.

use crate::config::{ConfigError, MatchConfig, MatchMode};
use crate::coverage::Coverage;
use crate::observer::{MatchObserver, NoopObserver};
use crate::pattern::{PatternIdx, PatternTree};
use crate::scorer::LocalScorer;
use crate::symbols::Sym;
use crate::tree::{NodeId, TargetTree};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Match error: pattern height {height} exceeds max_depth {max_depth}")]
    PatternTooDeep { height: usize, max_depth: usize },

    #[error("Match error: score {score} for pattern node {pattern} at target node {target}")]
    InvalidScore {
        pattern: PatternIdx,
        target: NodeId,
        score: f32,
    },
}

/// Best alignment found by one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestRoot {
    pub pattern_root: PatternIdx,
    pub target: NodeId,
    pub score: f32,
}

fn check_pattern(pattern: &PatternTree, config: &MatchConfig) -> Result<(), MatchError> {
    config.validate()?;
    if pattern.height() > config.max_depth {
        return Err(MatchError::PatternTooDeep {
            height: pattern.height(),
            max_depth: config.max_depth,
        });
    }
    Ok(())
}

/// State shared by every step of one recursive search
struct Search<'a, S: ?Sized, O: ?Sized> {
    pattern: &'a PatternTree,
    target: &'a TargetTree,
    scorer: &'a S,
    observer: &'a mut O,
    /// Coverage buffers by recursion depth; greedy mode only uses the first
    levels: &'a mut Vec<Coverage>,
    threshold: f32,
    mode: MatchMode,
}

impl<S: LocalScorer + ?Sized, O: MatchObserver + ?Sized> Search<'_, S, O> {
    fn local_score(
        &mut self,
        pattern_idx: PatternIdx,
        target_id: NodeId,
        pattern_role: Option<Sym>,
        target_role: Option<Sym>,
    ) -> Result<f32, MatchError> {
        let score = self.scorer.score(
            self.pattern.node(pattern_idx),
            self.target.node(target_id),
            pattern_role,
            target_role,
        );
        if !(0.0..=1.0).contains(&score) {
            return Err(MatchError::InvalidScore {
                pattern: pattern_idx,
                target: target_id,
                score,
            });
        }
        self.observer.node_entered(pattern_idx, target_id, score);
        Ok(score)
    }

    /// Score the pattern subtree at `pattern_idx` aligned to `target_id`
    ///
    /// The alignment is written to `levels[depth]`. In constrained mode each
    /// child alternative is scored into `levels[depth + 1]` and copied up
    /// when it wins.
    fn match_subtree(
        &mut self,
        depth: usize,
        pattern_idx: PatternIdx,
        target_id: NodeId,
        pattern_role: Option<Sym>,
        target_role: Option<Sym>,
        mut cumulative: f32,
    ) -> Result<f32, MatchError> {
        let pattern = self.pattern;
        let target = self.target;
        let local = self.local_score(pattern_idx, target_id, pattern_role, target_role)?;

        let out = &mut self.levels[depth];
        match self.mode {
            MatchMode::Greedy => {
                if local > out.confidence(pattern_idx) {
                    out.record(pattern_idx, local, target_id);
                }
            }
            MatchMode::Constrained => {
                out.clear_entries(pattern.subtree(pattern_idx));
                out.record(pattern_idx, local, target_id);
            }
        }

        let children = pattern.children(pattern_idx);
        let child_depth = match self.mode {
            MatchMode::Greedy => depth,
            MatchMode::Constrained => depth + 1,
        };
        if !children.is_empty() && self.levels.len() <= child_depth {
            let len = pattern.len();
            self.levels.resize_with(child_depth + 1, || Coverage::new(len));
        }

        cumulative *= local;
        let mut total = local;
        for edge in children {
            let mut best_child = 0.0;
            for target_edge in target.children(target_id) {
                if cumulative < self.threshold {
                    self.observer
                        .branch_pruned(pattern_idx, target_id, cumulative, self.threshold);
                    return Ok(0.0);
                }
                let child_score = self.match_subtree(
                    child_depth,
                    edge.child,
                    target_edge.child,
                    Some(edge.role),
                    Some(target_edge.role),
                    cumulative,
                )?;
                // Strict: on ties the earlier target child keeps the slot
                if child_score > best_child {
                    best_child = child_score;
                    if let (MatchMode::Constrained, [.., out, candidate]) =
                        (self.mode, &mut self.levels[..=child_depth])
                    {
                        out.copy_entries(candidate, pattern.subtree(edge.child));
                    }
                }
            }
            total *= best_child;
            cumulative *= best_child;
        }

        Ok(total)
    }
}

/// Try every (pattern root, target node) pair and leave the best alignment
/// in `best`
///
/// A pair is only committed when its score reaches the threshold.
fn run_search<S, O>(
    pattern: &PatternTree,
    target: &TargetTree,
    scorer: &S,
    config: &MatchConfig,
    observer: &mut O,
    levels: &mut Vec<Coverage>,
    best: &mut Coverage,
) -> Result<Option<BestRoot>, MatchError>
where
    S: LocalScorer + ?Sized,
    O: MatchObserver + ?Sized,
{
    let len = pattern.len();
    best.reset(len);

    let depth = match config.mode {
        MatchMode::Greedy => 1,
        MatchMode::Constrained => pattern.height().max(1),
    };
    levels.resize_with(depth, Coverage::default);
    for level in levels.iter_mut() {
        level.reset(len);
    }

    let mut search = Search {
        pattern,
        target,
        scorer,
        observer,
        levels,
        threshold: config.threshold,
        mode: config.mode,
    };

    let mut best_root: Option<BestRoot> = None;
    for &pattern_root in pattern.roots() {
        for target_id in target.node_ids() {
            search.levels[0].reset(len);
            let score = search.match_subtree(0, pattern_root, target_id, None, None, 1.0)?;
            search.observer.root_tried(pattern_root, target_id, score);
            log::trace!("pattern root {pattern_root} at target node {target_id}: {score}");

            if score >= config.threshold && score > best_root.map_or(0.0, |b| b.score) {
                best.copy_all(&search.levels[0]);
                best_root = Some(BestRoot {
                    pattern_root,
                    target: target_id,
                    score,
                });
                search.observer.root_committed(pattern_root, target_id, score);
            }
        }
    }

    log::debug!(
        "{} coverage: {} pattern nodes vs {} target nodes, best {:?}, {} nodes covered",
        config.mode,
        len,
        target.len(),
        best_root,
        best.covered_count()
    );
    Ok(best_root)
}

/// Align `pattern` against `target` with freshly allocated buffers
///
/// Convenience form of `MatchEngine` for one-off calls; it holds no state
/// between calls and can be used from any number of threads at once.
pub fn compute_coverage<S: LocalScorer + ?Sized>(
    pattern: &PatternTree,
    target: &TargetTree,
    scorer: &S,
    config: &MatchConfig,
) -> Result<Coverage, MatchError> {
    check_pattern(pattern, config)?;
    let mut levels = Vec::new();
    let mut coverage = Coverage::new(pattern.len());
    run_search(
        pattern,
        target,
        scorer,
        config,
        &mut NoopObserver,
        &mut levels,
        &mut coverage,
    )?;
    Ok(coverage)
}

/// Reusable matcher for one compiled pattern
///
/// The engine keeps its coverage and scratch buffers between calls, so
/// matching a pattern against every sentence of a document allocates only
/// once. `compute_coverage` takes `&mut self`: one engine serves one caller
/// at a time. For parallel matching give each thread its own engine; they
/// can share the pattern through the `Arc`.
#[derive(Debug)]
pub struct MatchEngine<S> {
    pattern: Arc<PatternTree>,
    scorer: S,
    config: MatchConfig,
    coverage: Coverage,
    best: Option<BestRoot>,
    levels: Vec<Coverage>,
}

impl<S: LocalScorer> MatchEngine<S> {
    /// Create an engine, checking the config and the pattern's height
    pub fn new(
        pattern: impl Into<Arc<PatternTree>>,
        scorer: S,
        config: MatchConfig,
    ) -> Result<Self, MatchError> {
        let pattern = pattern.into();
        check_pattern(&pattern, &config)?;
        let coverage = Coverage::new(pattern.len());
        Ok(Self {
            pattern,
            scorer,
            config,
            coverage,
            best: None,
            levels: Vec::new(),
        })
    }

    /// Overwrite the coverage with the best alignment of the pattern
    /// anywhere in `target`
    pub fn compute_coverage(&mut self, target: &TargetTree) -> Result<(), MatchError> {
        self.compute_coverage_with(target, &mut NoopObserver)
    }

    /// Like `compute_coverage`, reporting search events to `observer`
    ///
    /// On error the coverage is left empty.
    pub fn compute_coverage_with<O: MatchObserver + ?Sized>(
        &mut self,
        target: &TargetTree,
        observer: &mut O,
    ) -> Result<(), MatchError> {
        let result = run_search(
            &self.pattern,
            target,
            &self.scorer,
            &self.config,
            observer,
            &mut self.levels,
            &mut self.coverage,
        );
        match result {
            Ok(best) => {
                self.best = best;
                Ok(())
            }
            Err(e) => {
                self.coverage.reset(self.pattern.len());
                self.best = None;
                Err(e)
            }
        }
    }

    /// Compute the coverage and reduce it to one weight-averaged score
    pub fn compare_to_target(&mut self, target: &TargetTree) -> Result<f32, MatchError> {
        self.compute_coverage(target)?;
        Ok(self.coverage.weighted_score(&self.pattern))
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// Confidence of pattern node `idx` from the last call
    pub fn confidence(&self, idx: PatternIdx) -> f32 {
        self.coverage.confidence(idx)
    }

    /// Target node matched to pattern node `idx` in the last call
    pub fn matched(&self, idx: PatternIdx) -> Option<NodeId> {
        self.coverage.matched(idx)
    }

    /// Total score of the committed alignment, 0 if nothing matched
    pub fn best_score(&self) -> f32 {
        self.best.map_or(0.0, |b| b.score)
    }

    pub fn best_root(&self) -> Option<BestRoot> {
        self.best
    }

    pub fn pattern(&self) -> &Arc<PatternTree> {
        &self.pattern
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{MatchEvent, RecordingObserver};
    use crate::parser::{parse_pattern, parse_target};
    use crate::pattern::PatternNode;
    use crate::scorer::{ConfusionScorer, LabelScorer};
    use crate::symbols::SymbolTable;
    use crate::tree::{TargetBuilder, TargetNode};

    fn label_engine(
        pattern: &str,
        symbols: &SymbolTable,
        config: MatchConfig,
    ) -> MatchEngine<LabelScorer> {
        let pattern = parse_pattern(pattern, symbols).unwrap();
        MatchEngine::new(pattern, LabelScorer, config).unwrap()
    }

    /// buy ~ purchase at 0.9, car ~ auto at 0.8, mismatched roles score 0
    fn purchase_scorer(symbols: &SymbolTable) -> ConfusionScorer {
        ConfusionScorer::new()
            .with_predicate_confusion(symbols.intern("buy"), symbols.intern("purchase"), 0.9)
            .with_predicate_confusion(symbols.intern("car"), symbols.intern("auto"), 0.8)
            .with_default_role_confusion(0.0)
    }

    #[test]
    fn test_buy_scenario() {
        let symbols = SymbolTable::new();
        let target = parse_target("buy(agent: John, object: car)", &symbols).unwrap();

        for config in [MatchConfig::constrained(), MatchConfig::greedy()] {
            let mut engine = label_engine("buy(agent: ?, object: ?)", &symbols, config);
            engine.compute_coverage(&target).unwrap();

            assert_eq!(engine.coverage().confidences(), &[1.0, 1.0, 1.0]);
            assert_eq!(engine.matched(0), Some(0));
            assert_eq!(symbols.resolve(target.node(engine.matched(1).unwrap()).predicate), "John");
            assert_eq!(symbols.resolve(target.node(engine.matched(2).unwrap()).predicate), "car");
            assert_eq!(engine.best_score(), 1.0);
        }
    }

    #[test]
    fn test_missing_argument() {
        let symbols = SymbolTable::new();
        let target = parse_target("buy(agent: John)", &symbols).unwrap();

        for config in [MatchConfig::constrained(), MatchConfig::greedy()] {
            let mut engine = label_engine("buy(agent: ?, object: ?)", &symbols, config);
            engine.compute_coverage(&target).unwrap();

            assert_eq!(engine.confidence(0), 0.0);
            assert_eq!(engine.matched(0), None);
            assert_eq!(engine.best_root(), None);
        }
    }

    #[test]
    fn test_identity_match() {
        let symbols = SymbolTable::new();
        let text = "a(x: b(y: c, w: e), z: d(v: f))";
        let target = parse_target(text, &symbols).unwrap();
        let mut engine = label_engine(text, &symbols, MatchConfig::default());
        engine.compute_coverage(&target).unwrap();

        assert!(engine.coverage().confidences().iter().all(|&c| c == 1.0));
        let expected: Vec<Option<NodeId>> = (0..target.len()).map(Some).collect();
        assert_eq!(engine.coverage().matches(), expected.as_slice());
        assert!(engine.coverage().is_complete());
    }

    #[test]
    fn test_structural_incompatibility() {
        let symbols = SymbolTable::new();
        let target = parse_target("buy; sell(agent: Mary)", &symbols).unwrap();

        for config in [MatchConfig::constrained(), MatchConfig::greedy()] {
            let mut engine = label_engine("buy(agent: ?)", &symbols, config);
            engine.compute_coverage(&target).unwrap();

            assert_eq!(engine.best_score(), 0.0);
            assert_eq!(engine.coverage().covered_count(), 0);
        }
    }

    #[test]
    fn test_roles_are_not_structural_filters() {
        // Every target child is offered to the scorer, whatever its role
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("buy(agent: ?)", &symbols).unwrap();
        let target = parse_target("buy(object: car, agent: John)", &symbols).unwrap();
        let mut observer = RecordingObserver::new();
        let mut engine = MatchEngine::new(pattern, LabelScorer, MatchConfig::default()).unwrap();
        engine.compute_coverage_with(&target, &mut observer).unwrap();

        assert!(observer.events.contains(&MatchEvent::Entered {
            pattern: 1,
            target: 1,
            local_score: 0.0,
        }));
        assert_eq!(engine.matched(1), Some(2));
    }

    #[test]
    fn test_recorded_confidence_is_local_score() {
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("buy(agent: ?, object: car)", &symbols).unwrap();
        let target = parse_target(
            "say(agent: Mary, comp: purchase(agent: John, object: auto))",
            &symbols,
        )
        .unwrap();
        let scorer = purchase_scorer(&symbols);
        let mut engine = MatchEngine::new(pattern, scorer, MatchConfig::default()).unwrap();
        engine.compute_coverage(&target).unwrap();

        let pattern = engine.pattern().clone();
        for idx in 0..pattern.len() {
            let Some(target_id) = engine.matched(idx) else {
                panic!("pattern node {idx} unmatched");
            };
            let (pattern_role, target_role) = match pattern.parent(idx) {
                None => (None, None),
                Some((parent, role)) => {
                    let parent_target = engine.matched(parent).unwrap();
                    let edge = target
                        .children(parent_target)
                        .iter()
                        .find(|e| e.child == target_id)
                        .unwrap();
                    (Some(role), Some(edge.role))
                }
            };
            let local = engine.scorer().score(
                pattern.node(idx),
                target.node(target_id),
                pattern_role,
                target_role,
            );
            assert_eq!(engine.confidence(idx), local);
        }
        assert!(engine.best_score() <= engine.confidence(0));
        assert!((engine.best_score() - 0.72).abs() < 1e-6);
        assert_eq!(engine.best_root().unwrap().target, 2);
    }

    #[test]
    fn test_pruning_soundness() {
        let symbols = SymbolTable::new();
        let target = parse_target(
            "purchase(agent: John, object: auto); buy(agent: Mary, object: bike)",
            &symbols,
        )
        .unwrap();

        let run = |threshold: f32| {
            let pattern = parse_pattern("buy(agent: ?, object: car)", &symbols).unwrap();
            let config = MatchConfig::default().with_threshold(threshold);
            let mut engine = MatchEngine::new(pattern, purchase_scorer(&symbols), config).unwrap();
            let mut observer = RecordingObserver::new();
            engine.compute_coverage_with(&target, &mut observer).unwrap();
            (engine.coverage().clone(), engine.best_score(), observer)
        };

        let (unpruned, best, _) = run(0.0);
        assert!((best - 0.72).abs() < 1e-6);
        assert_eq!(unpruned.matches(), &[Some(0), Some(1), Some(2)]);

        for threshold in [1e-4, 0.5, 0.7] {
            let (pruned, pruned_best, _) = run(threshold);
            assert_eq!(pruned, unpruned, "threshold {threshold}");
            assert_eq!(pruned_best, best);
        }

        let (empty, zero, observer) = run(1.0);
        assert_eq!(empty, Coverage::new(3));
        assert_eq!(zero, 0.0);
        assert!(observer.pruned_count() > 0);
    }

    #[test]
    fn test_threshold_one_with_perfect_scores() {
        let symbols = SymbolTable::new();
        let target = parse_target("buy(agent: John, object: car)", &symbols).unwrap();
        let config = MatchConfig::default().with_threshold(1.0);
        let mut engine = label_engine("buy(agent: ?, object: ?)", &symbols, config);
        engine.compute_coverage(&target).unwrap();

        assert!(engine.coverage().is_complete());
        assert_eq!(engine.best_score(), 1.0);
    }

    #[test]
    fn test_root_below_threshold_is_not_committed() {
        // Perfect at the root, half-hearted at the only argument
        let symbols = SymbolTable::new();
        let target = parse_target("buy(agent: John)", &symbols).unwrap();
        let scorer = |_: &PatternNode, _: &TargetNode, role: Option<Sym>, _: Option<Sym>| -> f32 {
            if role.is_none() { 1.0 } else { 0.5 }
        };

        let run = |threshold: f32| {
            let pattern = parse_pattern("buy(agent: ?)", &symbols).unwrap();
            let config = MatchConfig::default().with_threshold(threshold);
            let mut engine = MatchEngine::new(pattern, scorer, config).unwrap();
            engine.compute_coverage(&target).unwrap();
            (engine.coverage().clone(), engine.best_root())
        };

        let (coverage, best) = run(1.0);
        assert_eq!(coverage, Coverage::new(2));
        assert_eq!(best, None);

        let (coverage, best) = run(0.5);
        assert_eq!(coverage.confidences(), &[1.0, 0.5]);
        assert_eq!(best.map(|b| b.score), Some(0.5));
    }

    #[test]
    fn test_target_nodes_stay_in_range() {
        let symbols = SymbolTable::new();
        let target = parse_target("say(agent: Mary, comp: buy(agent: John))", &symbols).unwrap();
        for node in target.nodes() {
            assert!(node.children.iter().all(|e| e.child < target.len()));
        }
        let mut engine = label_engine("buy(agent: ?)", &symbols, MatchConfig::default());
        engine.compute_coverage(&target).unwrap();
        assert_eq!(engine.coverage().matches(), &[Some(2), Some(3)]);
    }

    #[test]
    fn test_pruning_skips_search() {
        let symbols = SymbolTable::new();
        let target = parse_target("purchase(agent: John, object: auto)", &symbols).unwrap();
        let pattern = parse_pattern("buy(agent: ?, object: car)", &symbols).unwrap();

        let mut full = RecordingObserver::new();
        let mut engine =
            MatchEngine::new(pattern.clone(), purchase_scorer(&symbols), MatchConfig::default())
                .unwrap();
        engine.compute_coverage_with(&target, &mut full).unwrap();

        let mut pruned = RecordingObserver::new();
        let config = MatchConfig::default().with_threshold(0.95);
        let mut engine = MatchEngine::new(pattern, purchase_scorer(&symbols), config).unwrap();
        engine.compute_coverage_with(&target, &mut pruned).unwrap();

        assert_eq!(full.pruned_count(), 0);
        assert_eq!(pruned.pruned_count(), 1);
        assert!(pruned.entered_count() < full.entered_count());
    }

    #[test]
    fn test_greedy_vs_constrained() {
        // Only the second x has the y the pattern asks for
        let symbols = SymbolTable::new();
        let target = parse_target("p(a: x(b: z), a: x(b: y))", &symbols).unwrap();

        let mut constrained = label_engine("p(a: x(b: y))", &symbols, MatchConfig::constrained());
        constrained.compute_coverage(&target).unwrap();
        assert_eq!(constrained.coverage().matches(), &[Some(0), Some(3), Some(4)]);
        assert_eq!(constrained.coverage().confidences(), &[1.0, 1.0, 1.0]);

        let mut greedy = label_engine("p(a: x(b: y))", &symbols, MatchConfig::greedy());
        greedy.compute_coverage(&target).unwrap();
        assert_eq!(greedy.best_score(), 1.0);
        // x kept the first x it saw, y was found under the other one
        assert_eq!(greedy.coverage().matches(), &[Some(0), Some(1), Some(4)]);
        let x = greedy.matched(1).unwrap();
        let y = greedy.matched(2).unwrap();
        assert!(!target.children(x).iter().any(|e| e.child == y));
    }

    #[test]
    fn test_constrained_discards_losing_alternative() {
        // The first x matches deeper but loses on its second argument
        let symbols = SymbolTable::new();
        let target = parse_target("p(a: x(b: y, c: Sam), a: x(b: y, c: w))", &symbols).unwrap();
        let mut engine = label_engine("p(a: x(b: y, c: w))", &symbols, MatchConfig::constrained());
        engine.compute_coverage(&target).unwrap();

        assert_eq!(engine.coverage().matches(), &[Some(0), Some(4), Some(5), Some(6)]);
    }

    #[test]
    fn test_multiple_pattern_roots() {
        let symbols = SymbolTable::new();
        let target = parse_target("buy(agent: John)", &symbols).unwrap();
        let mut engine =
            label_engine("sell(agent: ?); buy(agent: ?)", &symbols, MatchConfig::default());
        engine.compute_coverage(&target).unwrap();

        assert_eq!(engine.coverage().matches(), &[None, None, Some(0), Some(1)]);
        assert_eq!(
            engine.best_root(),
            Some(BestRoot {
                pattern_root: 2,
                target: 0,
                score: 1.0
            })
        );
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let symbols = SymbolTable::new();
        let target = parse_target("buy(agent: John); buy(agent: Mary)", &symbols).unwrap();
        let mut engine = label_engine("buy(agent: ?)", &symbols, MatchConfig::default());
        engine.compute_coverage(&target).unwrap();

        assert_eq!(engine.coverage().matches(), &[Some(0), Some(1)]);
    }

    #[test]
    fn test_every_target_node_is_a_candidate_root() {
        let symbols = SymbolTable::new();
        let target = parse_target("say(agent: Mary, comp: buy(agent: John))", &symbols).unwrap();
        let mut engine = label_engine("buy(agent: ?)", &symbols, MatchConfig::default());
        engine.compute_coverage(&target).unwrap();

        assert_eq!(engine.coverage().matches(), &[Some(2), Some(3)]);
    }

    #[test]
    fn test_shared_target_node() {
        let symbols = SymbolTable::new();
        let agent = symbols.intern("agent");
        let mut builder = TargetBuilder::new();
        let say = builder.add_proposition(symbols.intern("say"));
        let buy = builder.add_proposition(symbols.intern("buy"));
        let john = builder.add_mention(symbols.intern("John"));
        builder.add_edge(say, agent, john);
        builder.add_edge(say, symbols.intern("comp"), buy);
        builder.add_edge(buy, agent, john);
        let target = builder.build().unwrap();

        let mut engine = label_engine(
            "say(agent: ?, comp: buy(agent: ?))",
            &symbols,
            MatchConfig::default(),
        );
        engine.compute_coverage(&target).unwrap();

        assert_eq!(engine.coverage().matches(), &[Some(say), Some(john), Some(buy), Some(john)]);
    }

    #[test]
    fn test_empty_inputs() {
        let symbols = SymbolTable::new();
        let empty_target = parse_target("", &symbols).unwrap();
        let mut engine = label_engine("buy(agent: ?)", &symbols, MatchConfig::default());
        engine.compute_coverage(&empty_target).unwrap();
        assert_eq!(engine.coverage(), &Coverage::new(2));

        let mut engine = label_engine("", &symbols, MatchConfig::default());
        let target = parse_target("buy", &symbols).unwrap();
        engine.compute_coverage(&target).unwrap();
        assert!(engine.coverage().is_empty());
        assert_eq!(engine.compare_to_target(&target).unwrap(), 0.0);
    }

    #[test]
    fn test_engine_reuse_overwrites() {
        let symbols = SymbolTable::new();
        let full = parse_target("buy(agent: John, object: car)", &symbols).unwrap();
        let partial = parse_target("buy(agent: John)", &symbols).unwrap();
        let mut engine = label_engine("buy(agent: ?, object: ?)", &symbols, MatchConfig::default());

        engine.compute_coverage(&full).unwrap();
        assert!(engine.coverage().is_complete());
        engine.compute_coverage(&partial).unwrap();
        assert_eq!(engine.coverage(), &Coverage::new(3));
        engine.compute_coverage(&full).unwrap();
        assert!(engine.coverage().is_complete());
    }

    #[test]
    fn test_invalid_score() {
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("buy", &symbols).unwrap();
        let target = parse_target("buy", &symbols).unwrap();
        let broken = |_: &PatternNode, _: &TargetNode, _: Option<Sym>, _: Option<Sym>| 1.5;
        let mut engine = MatchEngine::new(pattern, broken, MatchConfig::default()).unwrap();

        assert_eq!(
            engine.compute_coverage(&target),
            Err(MatchError::InvalidScore {
                pattern: 0,
                target: 0,
                score: 1.5
            })
        );
        assert_eq!(engine.coverage(), &Coverage::new(1));
    }

    #[test]
    fn test_pattern_too_deep() {
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("a(x: b(y: c))", &symbols).unwrap();
        let config = MatchConfig::default().with_max_depth(2);

        assert_eq!(
            MatchEngine::new(pattern, LabelScorer, config).unwrap_err(),
            MatchError::PatternTooDeep {
                height: 3,
                max_depth: 2
            }
        );
    }

    #[test]
    fn test_invalid_config() {
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("buy", &symbols).unwrap();
        let config = MatchConfig::default().with_threshold(-0.1);

        assert_eq!(
            MatchEngine::new(pattern, LabelScorer, config).unwrap_err(),
            MatchError::Config(ConfigError::InvalidThreshold(-0.1))
        );
    }

    #[test]
    fn test_compare_to_target() {
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("buy(agent: ?, object: car)", &symbols).unwrap();
        let target = parse_target("purchase(agent: John, object: auto)", &symbols).unwrap();
        let mut engine =
            MatchEngine::new(pattern, purchase_scorer(&symbols), MatchConfig::default()).unwrap();

        let score = engine.compare_to_target(&target).unwrap();
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_free_function_matches_engine() {
        let symbols = SymbolTable::new();
        let pattern = parse_pattern("p(a: x(b: y))", &symbols).unwrap();
        let target = parse_target("q(r: p(a: x(b: z), a: x(b: y)))", &symbols).unwrap();

        for config in [MatchConfig::constrained(), MatchConfig::greedy()] {
            let coverage = compute_coverage(&pattern, &target, &LabelScorer, &config).unwrap();
            let mut engine = MatchEngine::new(pattern.clone(), LabelScorer, config).unwrap();
            engine.compute_coverage(&target).unwrap();
            assert_eq!(&coverage, engine.coverage());
        }
    }

    #[test]
    fn test_shared_pattern_across_threads() {
        let symbols = SymbolTable::new();
        let pattern = Arc::new(parse_pattern("buy(agent: ?)", &symbols).unwrap());

        let handles: Vec<_> = ["buy(agent: John)", "sell(agent: Mary)"]
            .into_iter()
            .map(|text| {
                let pattern = Arc::clone(&pattern);
                let symbols = symbols.clone();
                std::thread::spawn(move || {
                    let target = parse_target(text, &symbols).unwrap();
                    let mut engine =
                        MatchEngine::new(pattern, LabelScorer, MatchConfig::default()).unwrap();
                    engine.compute_coverage(&target).unwrap();
                    engine.best_score()
                })
            })
            .collect();
        let scores: Vec<f32> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(scores, vec![1.0, 0.0]);
    }
}
