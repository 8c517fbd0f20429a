//! Turning name matches into queryable bindings.

use serde::Serialize;

use super::{LayerMatch, LayerMatcher, MatchKind};
use crate::catalog::{LayerMetadata, TableDescriptor};
use crate::reproject::Srid;

/// A table paired with the metadata it is queried and styled with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBinding {
    pub table: TableDescriptor,
    pub layer: LayerMetadata,
    /// The layer's SRID, known to be present.
    pub srid: Srid,
    pub kind: MatchKind,
}

/// Why a geometry table will not be queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GapReason {
    NoMatchingLayer,
    MissingSrid { layer: String },
    UnknownSrid { layer: String, srid: Srid },
}

/// A table left out of querying. Informational, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingGap {
    pub table: String,
    #[serde(flatten)]
    pub reason: GapReason,
}

impl std::fmt::Display for BindingGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            GapReason::NoMatchingLayer => write!(f, "{}: no matching layer", self.table),
            GapReason::MissingSrid { layer } => {
                write!(f, "{}: layer '{}' has no SRID", self.table, layer)
            }
            GapReason::UnknownSrid { layer, srid } => {
                write!(f, "{}: layer '{}' uses unknown SRID {}", self.table, layer, srid)
            }
        }
    }
}

/// Match tables to layers and keep the pairs that can be queried.
///
/// `resolvable` decides whether a layer's SRID can be handled; bindings and
/// gaps come back in table order.
pub fn bind(
    matcher: &dyn LayerMatcher,
    tables: &[TableDescriptor],
    layers: &[LayerMetadata],
    resolvable: &dyn Fn(Srid) -> bool,
) -> (Vec<TableBinding>, Vec<BindingGap>) {
    let table_names: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
    let layer_names: Vec<String> = layers.iter().map(|l| l.layer_name.clone()).collect();
    let matches = matcher.match_layers(&table_names, &layer_names);

    let mut bindings = Vec::new();
    let mut gaps = Vec::new();

    for table in tables {
        let found = matches
            .iter()
            .find(|m| m.table == table.name)
            .and_then(|m: &LayerMatch| {
                layers
                    .iter()
                    .find(|l| l.layer_name == m.layer)
                    .map(|layer| (layer, m.kind))
            });

        let gap = |reason| BindingGap {
            table: table.name.clone(),
            reason,
        };

        match found {
            None => gaps.push(gap(GapReason::NoMatchingLayer)),
            Some((layer, kind)) => match layer.srid {
                None => gaps.push(gap(GapReason::MissingSrid {
                    layer: layer.layer_name.clone(),
                })),
                Some(srid) if !resolvable(srid) => gaps.push(gap(GapReason::UnknownSrid {
                    layer: layer.layer_name.clone(),
                    srid,
                })),
                Some(srid) => bindings.push(TableBinding {
                    table: table.clone(),
                    layer: layer.clone(),
                    srid,
                    kind,
                }),
            },
        }
    }

    for gap in &gaps {
        tracing::info!(%gap, "table not bound");
    }

    (bindings, gaps)
}
