//! Table to layer-metadata matching.
//!
//! Table names (`main_line_a`) and layer names (`Main Line A`) are written
//! by different people, so they are compared in a normalized form: every
//! non-alphanumeric character removed, lower-cased.
//!
//! # Architecture
//!
//! ```text
//! table names ─┐
//!              ├─► LayerMatcher ─► Vec<LayerMatch> ─► bind() ─► TableBinding / BindingGap
//! layer names ─┘                                       ▲
//!                                    LayerMetadata ────┘
//! ```

mod binding;
mod positional;

pub use binding::{bind, BindingGap, GapReason, TableBinding};
pub use positional::PositionalMatcher;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Anything but a Unicode letter or digit; underscores count as separators.
static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\W_]+").expect("valid regex"));

/// Normalize a table or layer name for comparison.
pub fn normalize(name: &str) -> String {
    NON_ALPHANUMERIC.replace_all(name, "").to_lowercase()
}

/// Matcher tuning, read from `[discovery.matcher]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Lowest best-effort score that still binds.
    pub min_score: usize,
    /// Withhold exactly-matched layers from the best-effort pass.
    pub exclusive_layers: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_score: 1,
            exclusive_layers: false,
        }
    }
}

/// How a binding was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    /// Heuristic match; `perfect` is the score an identical name would get.
    BestEffort { score: usize, perfect: usize },
}

impl MatchKind {
    pub fn is_exact(&self) -> bool {
        matches!(self, MatchKind::Exact)
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => f.write_str("exact"),
            MatchKind::BestEffort { score, perfect } => {
                write!(f, "best-effort {}/{}", score, perfect)
            }
        }
    }
}

/// One table paired with one layer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerMatch {
    pub table: String,
    pub layer: String,
    pub kind: MatchKind,
}

/// A strategy for pairing tables with layers.
///
/// Implementations must be deterministic: the same inputs in the same order
/// give the same matches. Each table appears in at most one match.
pub trait LayerMatcher: Send + Sync {
    fn match_layers(&self, tables: &[String], layers: &[String]) -> Vec<LayerMatch>;
}
