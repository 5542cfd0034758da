//! Proptree: constrained proposition-tree pattern matching
//!
//! Aligns small, hand-written pattern trees against the proposition trees of
//! parsed sentences and reports, per pattern node, how well it was matched and
//! by which target node.

pub mod config; // Threshold, match mode and depth bound
pub mod coverage; // Per-pattern-node match results
pub mod matcher; // Alignment search and the match engine
pub mod observer; // Diagnostics hooks
pub mod parser; // Bracket notation for patterns and targets
pub mod partial; // Node-by-node and edge-by-edge matchers
pub mod pattern; // Compiled pattern trees
pub mod scorer; // Local node-to-node scoring
pub mod smoothing; // Per-sentence score smoothing
pub mod symbols; // Interned predicate and role labels
pub mod tree; // Target trees

// Re-exports for convenience
pub use config::{ConfigError, MatchConfig, MatchMode};
pub use coverage::Coverage;
pub use matcher::{BestRoot, MatchEngine, MatchError, compute_coverage};
pub use observer::{LogObserver, MatchEvent, MatchObserver, NoopObserver, RecordingObserver};
pub use parser::{ParseError, parse_pattern, parse_target};
pub use partial::{EdgeMatcher, LocatedEdge, LocatedRoot, NodeMatcher};
pub use pattern::{PatternBuilder, PatternError, PatternIdx, PatternLabel, PatternNode, PatternTree};
pub use scorer::{ConfusionModel, ConfusionScorer, LabelScorer, LocalScorer};
pub use smoothing::{SmoothingError, smoothed_score};
pub use symbols::{Sym, SymbolTable};
pub use tree::{NodeId, NodeKind, TargetBuilder, TargetNode, TargetTree, TokenSpan, TreeError};
