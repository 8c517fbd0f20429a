use geosift::catalog::{LayerMetadata, TableDescriptor};
use geosift::matcher::{
    bind, normalize, GapReason, LayerMatcher, MatchKind, MatcherConfig, PositionalMatcher,
};
use serde_json::Value;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_exact_match_ignores_separators_and_case() {
    assert_eq!(normalize("main_line_a"), "mainlinea");
    assert_eq!(normalize("Main Line A"), "mainlinea");
    assert_eq!(normalize("Main-Line  A"), "mainlinea");

    let matches = PositionalMatcher::default()
        .match_layers(&names(&["main_line_a"]), &names(&["Main Line A"]));
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].layer, "Main Line A");
    assert_eq!(matches[0].kind, MatchKind::Exact);
}

#[test]
fn test_best_effort_scores_against_perfect() {
    let matches = PositionalMatcher::default().match_layers(
        &names(&["main_line_a", "main_line_b"]),
        &names(&["Main Line A"]),
    );

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].kind, MatchKind::Exact);
    assert_eq!(matches[1].table, "main_line_b");
    assert_eq!(matches[1].layer, "Main Line A");
    assert_eq!(
        matches[1].kind,
        MatchKind::BestEffort {
            score: 8,
            perfect: 9
        }
    );
    assert_eq!(matches[1].kind.to_string(), "best-effort 8/9");
}

#[test]
fn test_best_effort_prefers_highest_score() {
    let matches = PositionalMatcher::default().match_layers(
        &names(&["parcel_lines"]),
        &names(&["Parks", "Parcels", "Parcel Line"]),
    );
    assert_eq!(matches[0].layer, "Parcel Line");
}

#[test]
fn test_matching_is_deterministic() {
    let tables = names(&["roads", "road_lines", "wells", "zz_scratch"]);
    let layers = names(&["Road Lines", "Roads", "Water Wells"]);
    let matcher = PositionalMatcher::default();
    assert_eq!(
        matcher.match_layers(&tables, &layers),
        matcher.match_layers(&tables, &layers)
    );
}

#[test]
fn test_exclusive_layers_leaves_table_unbound() {
    let matcher = PositionalMatcher::new(MatcherConfig {
        min_score: 1,
        exclusive_layers: true,
    });
    let matches = matcher.match_layers(
        &names(&["main_line_a", "main_line_b"]),
        &names(&["Main Line A"]),
    );
    assert_eq!(matches.len(), 1);
}

#[test]
fn test_bind_reports_gaps_without_failing() {
    let tables = vec![
        TableDescriptor::new("public", "road_lines", "SHAPE"),
        TableDescriptor::new("public", "storm_drains", "SHAPE"),
        TableDescriptor::new("public", "qq", "SHAPE"),
    ];
    let layers = vec![
        LayerMetadata::new("Road Lines", Some(2229), Value::Null),
        LayerMetadata::new("Storm Drains", None, Value::Null),
    ];

    let (bindings, gaps) = bind(&PositionalMatcher::default(), &tables, &layers, &|_| true);

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].layer.layer_name, "Road Lines");
    assert_eq!(gaps.len(), 2);
    assert_eq!(
        gaps[0].reason,
        GapReason::MissingSrid {
            layer: "Storm Drains".into()
        }
    );
    assert_eq!(gaps[1].table, "qq");
    assert_eq!(gaps[1].reason, GapReason::NoMatchingLayer);
}

#[test]
fn test_matcher_config_from_toml() {
    let config: MatcherConfig = toml::from_str("min_score = 4\nexclusive_layers = true").unwrap();
    assert_eq!(
        config,
        MatcherConfig {
            min_score: 4,
            exclusive_layers: true
        }
    );
    let defaults: MatcherConfig = toml::from_str("").unwrap();
    assert_eq!(defaults, MatcherConfig::default());
}
