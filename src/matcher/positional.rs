//! Exact-then-positional matcher.

use super::{normalize, LayerMatch, LayerMatcher, MatchKind, MatcherConfig};

/// Two-pass matcher.
///
/// 1. **Exact**: normalized names equal. A layer taken here is not offered
///    to a later table in this pass.
/// 2. **Best effort**: each remaining table is scored against every
///    candidate layer by counting index-paired equal characters of the
///    normalized names, up to the shorter length. Highest score wins, ties go
///    to the earlier layer, and scores below `min_score` leave the table
///    unbound.
#[derive(Debug, Clone, Default)]
pub struct PositionalMatcher {
    config: MatcherConfig,
}

impl PositionalMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }
}

/// Count of positions where both strings hold the same character.
pub fn positional_score(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x == y).count()
}

impl LayerMatcher for PositionalMatcher {
    fn match_layers(&self, tables: &[String], layers: &[String]) -> Vec<LayerMatch> {
        let normalized_layers: Vec<String> = layers.iter().map(|l| normalize(l)).collect();
        let mut consumed = vec![false; layers.len()];
        let mut matched: Vec<Option<LayerMatch>> = vec![None; tables.len()];

        for (ti, table) in tables.iter().enumerate() {
            let key = normalize(table);
            let hit = normalized_layers
                .iter()
                .enumerate()
                .find(|(li, layer)| !consumed[*li] && **layer == key);
            if let Some((li, _)) = hit {
                consumed[li] = true;
                matched[ti] = Some(LayerMatch {
                    table: table.clone(),
                    layer: layers[li].clone(),
                    kind: MatchKind::Exact,
                });
            }
        }

        for (ti, table) in tables.iter().enumerate() {
            if matched[ti].is_some() {
                continue;
            }
            let key = normalize(table);
            let mut best: Option<(usize, usize)> = None;
            for (li, layer) in normalized_layers.iter().enumerate() {
                if self.config.exclusive_layers && consumed[li] {
                    continue;
                }
                let score = positional_score(&key, layer);
                if score >= self.config.min_score && best.map_or(true, |(_, s)| score > s) {
                    best = Some((li, score));
                }
            }

            if let Some((li, score)) = best {
                let perfect = key.chars().count().max(normalized_layers[li].chars().count());
                tracing::debug!(
                    table = %table,
                    layer = %layers[li],
                    score,
                    perfect,
                    "best-effort layer match"
                );
                matched[ti] = Some(LayerMatch {
                    table: table.clone(),
                    layer: layers[li].clone(),
                    kind: MatchKind::BestEffort { score, perfect },
                });
            }
        }

        matched.into_iter().flatten().collect()
    }
}
