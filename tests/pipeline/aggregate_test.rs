#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{polygon, session, session_with, FakeDatabase};
use geosift::aggregate::{Progress, TableQueryError};
use geosift::config::QuerySettings;
use geosift::matcher::GapReason;
use geosift::session::{PipelineError, PipelineState, EMPTY_RESULT_MESSAGE};
use geosift::sql::ReprojectionSite;
use serde_json::{json, Value};

fn point(lon: f64, lat: f64) -> String {
    json!({"type": "Point", "coordinates": [lon, lat]}).to_string()
}

/// `n` tables `t1..tn`, each with one hit and a matching WGS 84 layer.
fn tables(n: usize) -> FakeDatabase {
    let mut db = FakeDatabase::new();
    for i in 1..=n {
        let name = format!("t{}", i);
        db = db
            .table(&name, &["id", "SHAPE"])
            .hit(&name, &point(-118.25, 34.0), vec![json!(i), Value::Null])
            .layer(&format!("T{}", i), json!(4326), Value::Null);
    }
    db
}

#[tokio::test]
async fn test_failing_table_is_isolated() {
    let db = Arc::new(tables(4).failing("t2", "permission denied for table t2"));
    let session = session(db.clone(), ReprojectionSite::Database);

    let report = session.submit(&polygon()).await.unwrap();

    let mut sources: Vec<&str> = report
        .features
        .iter()
        .map(|f| f.source_table.as_str())
        .collect();
    sources.sort();
    assert_eq!(sources, vec!["t1", "t3", "t4"]);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table, "t2");
    assert!(matches!(report.failures[0].error, TableQueryError::Remote(_)));
    assert_eq!(report.row_counts.len(), 3);
    assert_eq!(
        report.message(),
        "Found 3 features in 3 tables. Skipped tables: t2."
    );
}

#[tokio::test]
async fn test_every_table_failing_still_succeeds() {
    let db = Arc::new(tables(2).failing("t1", "boom").failing("t2", "boom"));
    let report = session(db, ReprojectionSite::Database)
        .submit(&polygon())
        .await
        .unwrap();
    assert!(report.features.is_empty());
    assert_eq!(report.failures.len(), 2);
}

#[tokio::test]
async fn test_no_intersecting_rows() {
    let db = Arc::new(
        FakeDatabase::new()
            .table("road_lines", &["id", "SHAPE"])
            .table("parcels", &["apn", "SHAPE"])
            .layer("Road Lines", json!(2229), Value::Null)
            .layer("Parcels", json!(4326), Value::Null),
    );
    let report = session(db, ReprojectionSite::Database)
        .submit(&polygon())
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.message(), EMPTY_RESULT_MESSAGE);
    assert_eq!(report.row_counts.len(), 2);
    assert!(report.row_counts.iter().all(|(_, n)| *n == 0));
}

#[tokio::test]
async fn test_discovery_failure_is_fatal() {
    let db = Arc::new(tables(2).catalog_down());
    let err = session(db.clone(), ReprojectionSite::Database)
        .submit(&polygon())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Discovery(_)));
    assert!(err.user_message().starts_with("Could not read schema"));
    assert_ne!(err.user_message(), EMPTY_RESULT_MESSAGE);
    assert_eq!(db.count("ST_Intersects"), 0);
}

#[tokio::test]
async fn test_invalid_polygon_is_rejected_before_discovery() {
    let db = Arc::new(tables(1));
    let session = session(db.clone(), ReprojectionSite::Database);
    let err = session
        .submit(&json!({"type": "Point", "coordinates": [0, 0]}))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidPolygon(_)));
    assert!(db.executed().is_empty());
    assert_eq!(*session.state().borrow(), PipelineState::Idle);
}

#[tokio::test]
async fn test_unbound_tables_are_skipped() {
    let db = Arc::new(
        tables(1)
            .table("scratch", &["id", "SHAPE"])
            .table("drains", &["id", "SHAPE"])
            .layer("Drains", Value::Null, Value::Null),
    );
    let report = session(db.clone(), ReprojectionSite::Database)
        .submit(&polygon())
        .await
        .unwrap();

    assert_eq!(report.features.len(), 1);
    assert!(report.failures.is_empty());
    assert_eq!(db.count("ST_Intersects"), 1);

    let reasons: Vec<(&str, &GapReason)> = report
        .gaps
        .iter()
        .map(|g| (g.table.as_str(), &g.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (
                "drains",
                &GapReason::MissingSrid {
                    layer: "Drains".into()
                }
            ),
            ("scratch", &GapReason::NoMatchingLayer),
        ]
    );
}

#[tokio::test]
async fn test_unknown_srid_needs_registry_on_client() {
    let db = Arc::new(
        FakeDatabase::new()
            .table("mystery", &["id", "SHAPE"])
            .layer("Mystery", json!(990_001), Value::Null),
    );

    let client = session(db.clone(), ReprojectionSite::Client)
        .discover()
        .await
        .unwrap();
    assert!(client.bindings.is_empty());
    assert!(matches!(client.gaps[0].reason, GapReason::UnknownSrid { srid: 990_001, .. }));

    let database = session(db, ReprojectionSite::Database)
        .discover()
        .await
        .unwrap();
    assert_eq!(database.bindings.len(), 1);
}

#[tokio::test]
async fn test_progress_is_reported_per_table() {
    let db = Arc::new(tables(3).failing("t3", "boom"));
    let session = session(db, ReprojectionSite::Database);
    let seen = Mutex::new(Vec::new());
    let sink = |p: Progress| seen.lock().unwrap().push(p);

    session.submit_with_progress(&polygon(), &sink).await.unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.first(), Some(&Progress::new(0, 3)));
    assert_eq!(seen.last(), Some(&Progress::new(3, 3)));
    assert_eq!(seen.len(), 4);
    assert!(seen.windows(2).all(|w| w[0].completed < w[1].completed));
    assert_eq!(*session.state().borrow(), PipelineState::Ready);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let mut db = tables(6);
    for i in 1..=6 {
        db = db.slow(&format!("t{}", i), Duration::from_millis(50));
    }
    let db = Arc::new(db);
    let query = QuerySettings {
        max_concurrent_queries: 2,
        ..QuerySettings::default()
    };

    let report = session_with(db.clone(), ReprojectionSite::Database, query)
        .submit(&polygon())
        .await
        .unwrap();

    assert_eq!(report.features.len(), 6);
    assert!(db.peak_concurrency() <= 2, "peak {}", db.peak_concurrency());
}

#[tokio::test]
async fn test_slow_table_times_out() {
    let db = Arc::new(tables(2).slow("t1", Duration::from_secs(10)));
    let query = QuerySettings {
        query_timeout_secs: 1,
        ..QuerySettings::default()
    };

    let report = session_with(db, ReprojectionSite::Database, query)
        .submit(&polygon())
        .await
        .unwrap();

    assert_eq!(report.features.len(), 1);
    assert_eq!(report.failures[0].table, "t1");
    assert!(matches!(report.failures[0].error, TableQueryError::Timeout(_)));
}

#[tokio::test]
async fn test_newer_submission_supersedes() {
    let db = Arc::new(tables(2).slow("t1", Duration::from_millis(300)));
    let session = session(db, ReprojectionSite::Database);
    let polygon = polygon();

    let (first, second) = tokio::join!(session.submit(&polygon), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.submit(&polygon).await
    });

    assert!(matches!(first, Err(PipelineError::Superseded)));
    let second = second.unwrap();
    assert_eq!(second.features.len(), 2);
    assert_eq!(*session.state().borrow(), PipelineState::Ready);
}
