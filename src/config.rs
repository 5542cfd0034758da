//! Match engine configuration

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default bound on pattern height, far above any hand-written template
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// How matches are committed while searching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MatchMode {
    /// Record every visited alignment immediately, keeping the best local
    /// score per pattern node. Cheaper, but siblings may end up matched
    /// against parts of the target that no single alignment uses together.
    Greedy,
    /// Record a subtree's alignment only when it beats every earlier
    /// alternative for the same slot
    #[default]
    Constrained,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Greedy => write!(f, "greedy"),
            MatchMode::Constrained => write!(f, "constrained"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" | "full" => Ok(MatchMode::Greedy),
            "constrained" => Ok(MatchMode::Constrained),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Config error: threshold {0} is outside [0, 1]")]
    InvalidThreshold(f32),

    #[error("Config error: max_depth must be at least 1")]
    ZeroDepth,

    #[error("Config error: unknown match mode {0:?}")]
    UnknownMode(String),
}

/// Pruning threshold, commit mode and recursion bound for a `MatchEngine`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Branches whose running score falls below this are abandoned
    pub threshold: f32,
    pub mode: MatchMode,
    /// Patterns taller than this are rejected when the engine is built
    pub max_depth: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            mode: MatchMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn greedy() -> Self {
        Self::default().with_mode(MatchMode::Greedy)
    }

    pub fn constrained() -> Self {
        Self::default().with_mode(MatchMode::Constrained)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Written this way round so NaN fails too
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }
}
