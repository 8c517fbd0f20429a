#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{polygon, red_line, session, FakeDatabase};
use geosift::feature::Rgba;
use geosift::geometry::{FeatureGeometry, GeometryType};
use geosift::render::{render_all, RenderItem};
use geosift::reproject::CrsRegistry;
use geosift::session::PipelineState;
use geosift::sql::ReprojectionSite;
use serde_json::{json, Value};

const LON: f64 = -118.25;
const LAT: f64 = 34.0;

fn line(coords: &[(f64, f64)]) -> String {
    let coords: Vec<[f64; 2]> = coords.iter().map(|&(x, y)| [x, y]).collect();
    json!({"type": "LineString", "coordinates": coords}).to_string()
}

/// A road line crossing the polygon, stored in the given coordinates, and a
/// parcels table with nothing inside it.
fn county(road: &[(f64, f64)]) -> FakeDatabase {
    FakeDatabase::new()
        .table("road_lines", &["id", "name", "SHAPE"])
        .table("parcels", &["apn", "SHAPE"])
        .hit("road_lines", &line(road), vec![json!(7), json!("Main St"), Value::Null])
        .layer("Road Lines", json!(2229), red_line())
        .layer("Parcels", json!(4326), Value::Null)
}

fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
    assert!(
        (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

#[tokio::test]
async fn test_client_side_reprojection() {
    let zone_v = CrsRegistry::default().get(2229).unwrap().projection;
    let start = zone_v.forward(LON, LAT);
    let end = zone_v.forward(LON + 0.01, LAT + 0.01);
    let db = Arc::new(county(&[start, end]));
    let session = session(db.clone(), ReprojectionSite::Client);

    let report = session.submit(&polygon()).await.unwrap();

    assert_eq!(report.features.len(), 1);
    assert_eq!(report.message(), "Found 1 feature in 1 table.");
    let feature = &report.features[0];
    assert_eq!(feature.source_table, "road_lines");
    assert_eq!(feature.geometry_type, GeometryType::LineString);
    assert_eq!(feature.style.color, Some(Rgba::new(255, 0, 0, 255)));
    assert_eq!(feature.attributes.get("id"), Some(&json!(7)));
    assert_eq!(feature.attributes.get("name"), Some(&json!("Main St")));
    assert_eq!(feature.attributes.get("SHAPE"), None);

    let FeatureGeometry::LineString(ls) = &feature.geometry else {
        panic!("expected a line, got {:?}", feature.geometry);
    };
    assert_close(ls.0[0].x_y(), (LON, LAT));
    assert_close(ls.0[1].x_y(), (LON + 0.01, LAT + 0.01));

    // Client-side queries return native coordinates.
    let roads = db
        .executed()
        .into_iter()
        .find(|q| q.sql.contains(r#""road_lines""#))
        .unwrap();
    let (select, _) = roads.sql.split_once(r#" AS "geometry""#).unwrap();
    assert!(!select.contains("4326"), "{}", select);

    assert_eq!(*session.state().borrow(), PipelineState::Ready);
}

#[tokio::test]
async fn test_drawn_ring_finds_red_road() {
    let ring = json!([
        [-118.27, 33.88],
        [-118.26, 33.91],
        [-118.20, 33.90],
        [-118.22, 33.87],
        [-118.27, 33.88]
    ]);
    let zone_v = CrsRegistry::default().get(2229).unwrap().projection;
    let road = [
        zone_v.forward(-118.25, 33.89),
        zone_v.forward(-118.23, 33.895),
    ];
    let db = Arc::new(county(&road));
    let session = session(db.clone(), ReprojectionSite::Client);

    let report = session.submit(&ring).await.unwrap();

    assert_eq!(report.features.len(), 1);
    assert!(report.failures.is_empty());
    let feature = &report.features[0];
    assert_eq!(feature.source_table, "road_lines");
    assert_eq!(feature.geometry_type, GeometryType::LineString);
    assert_eq!(feature.style.color, Some(Rgba::new(255, 0, 0, 255)));
    let FeatureGeometry::LineString(ls) = &feature.geometry else {
        panic!("expected a line, got {:?}", feature.geometry);
    };
    assert_close(ls.0[0].x_y(), (-118.25, 33.89));
    assert_close(ls.0[1].x_y(), (-118.23, 33.895));

    assert!(report.row_counts.contains(&("parcels".to_string(), 0)));

    let roads = db
        .executed()
        .into_iter()
        .find(|q| q.sql.contains(r#""road_lines""#))
        .unwrap();
    let sent: Value = serde_json::from_str(roads.args[1].as_str().unwrap()).unwrap();
    assert_eq!(sent["type"], "Polygon");
    assert_eq!(sent["coordinates"][0], ring);
}

#[tokio::test]
async fn test_database_side_reprojection() {
    let db = Arc::new(county(&[(LON, LAT), (LON + 0.01, LAT + 0.01)]));
    let session = session(db.clone(), ReprojectionSite::Database);

    let report = session.submit(&polygon()).await.unwrap();

    assert_eq!(report.features.len(), 1);
    let FeatureGeometry::LineString(ls) = &report.features[0].geometry else {
        panic!("expected a line");
    };
    assert_close(ls.0[0].x_y(), (LON, LAT));

    let roads = db
        .executed()
        .into_iter()
        .find(|q| q.sql.contains(r#""road_lines""#))
        .unwrap();
    assert_eq!(roads.args.len(), 2);
    assert_eq!(roads.args[0], json!(2229));
    let sent: Value = serde_json::from_str(roads.args[1].as_str().unwrap()).unwrap();
    assert_eq!(sent["type"], "Polygon");
}

#[tokio::test]
async fn test_render_output() {
    let db = Arc::new(county(&[(LON, LAT), (LON + 0.01, LAT + 0.01)]));
    let report = session(db, ReprojectionSite::Database)
        .submit(&polygon())
        .await
        .unwrap();

    let items = render_all(&report.features);
    assert_eq!(items.len(), 1);
    match &items[0] {
        RenderItem::Path { locations, popup, .. } => {
            assert_close(locations[0], (LAT, LON));
            assert!(popup.starts_with("<b>Table: road_lines</b>"));
            assert!(popup.contains("<b>name:</b> Main St"));
        }
        other => panic!("expected a path, got {:?}", other),
    }
}

#[tokio::test]
async fn test_repeated_submissions_reuse_discovery() {
    let db = Arc::new(county(&[(LON, LAT), (LON + 0.01, LAT + 0.01)]));
    let session = session(db.clone(), ReprojectionSite::Database);

    let first = session.submit(&polygon()).await.unwrap();
    let second = session.submit(&polygon()).await.unwrap();

    assert_eq!(first.features, second.features);
    assert_eq!(db.count("SELECT DISTINCT table_name"), 1);
    assert_eq!(db.count("ST_Intersects"), 4);

    session.refresh().await;
    session.submit(&polygon()).await.unwrap();
    assert_eq!(db.count("SELECT DISTINCT table_name"), 2);
}

#[tokio::test]
async fn test_submit_text_rejects_garbage() {
    let db = Arc::new(county(&[(LON, LAT), (LON + 0.01, LAT + 0.01)]));
    let session = session(db.clone(), ReprojectionSite::Database);

    assert!(session.submit_text("not json").await.is_err());
    assert!(db.executed().is_empty());

    let report = session.submit_text(common::LA_POLYGON).await.unwrap();
    assert_eq!(report.features.len(), 1);
}
