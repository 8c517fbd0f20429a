use geosift::catalog::TableDescriptor;
use geosift::geometry::{GeometryError, QueryScope};
use geosift::sql::{
    Dialect, GeometryEncoding, IntrospectionQueries, QueryBuildError, ReprojectionSite,
    SpatialQueryBuilder,
};
use serde_json::{json, Value};
use sqlparser::dialect::{DuckDbDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

fn assert_parses(sql: &str, dialect: Dialect) {
    let result = match dialect {
        Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
        Dialect::DuckDb => Parser::parse_sql(&DuckDbDialect {}, sql),
    };
    assert!(result.is_ok(), "{:?} rejected {}: {:?}", dialect, sql, result.err());
}

fn tables() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("public", "road_lines", "SHAPE"),
        TableDescriptor::new("public", "parcels", "SHAPE"),
    ]
}

fn scope() -> QueryScope {
    QueryScope::from_value(
        &json!({
            "type": "Polygon",
            "coordinates": [[[-118.3, 33.9], [-118.2, 33.9], [-118.2, 34.0], [-118.3, 33.9]]]
        }),
        4326,
        true,
    )
    .unwrap()
}

#[test]
fn test_every_combination_parses() {
    for dialect in [Dialect::Postgres, Dialect::DuckDb] {
        for encoding in [GeometryEncoding::GeojsonText, GeometryEncoding::Native] {
            for site in [ReprojectionSite::Database, ReprojectionSite::Client] {
                let builder = SpatialQueryBuilder::new(dialect, encoding, site, 4326, &tables());
                let q = builder.build(&tables()[0], 2229, &scope()).unwrap();
                assert_parses(&q.sql, dialect);
            }
        }
    }
}

#[test]
fn test_srid_and_polygon_are_bound() {
    let builder = SpatialQueryBuilder::new(
        Dialect::Postgres,
        GeometryEncoding::GeojsonText,
        ReprojectionSite::Database,
        4326,
        &tables(),
    );
    let scope = scope();
    let q = builder.build(&tables()[0], 2229, &scope).unwrap();

    assert!(!q.sql.contains("2229"));
    assert!(!q.sql.contains("-118.3"));
    assert_eq!(q.args, vec![Value::from(2229), Value::from(scope.geojson())]);

    let polygon: Value = serde_json::from_str(q.args[1].as_str().unwrap()).unwrap();
    assert_eq!(polygon["type"], "Polygon");
}

#[test]
fn test_same_scope_reused_across_tables() {
    let builder = SpatialQueryBuilder::new(
        Dialect::Postgres,
        GeometryEncoding::GeojsonText,
        ReprojectionSite::Database,
        4326,
        &tables(),
    );
    let scope = scope();
    let roads = builder.build(&tables()[0], 2229, &scope).unwrap();
    let parcels = builder.build(&tables()[1], 4326, &scope).unwrap();
    assert_eq!(roads.args[1], parcels.args[1]);
    assert_ne!(roads.args[0], parcels.args[0]);
}

#[test]
fn test_only_introspected_tables_are_queryable() {
    let builder = SpatialQueryBuilder::new(
        Dialect::Postgres,
        GeometryEncoding::GeojsonText,
        ReprojectionSite::Database,
        4326,
        &tables(),
    );
    let other_schema = TableDescriptor::new("private", "road_lines", "SHAPE");
    assert!(matches!(
        builder.build(&other_schema, 2229, &scope()),
        Err(QueryBuildError::NotAllowed(_))
    ));
}

#[test]
fn test_polygon_validation() {
    let unclosed = json!([[-118.3, 33.9], [-118.2, 33.9], [-118.2, 34.0], [-118.3, 34.0]]);
    assert!(matches!(
        QueryScope::from_value(&unclosed, 4326, true),
        Err(GeometryError::InvalidRing { .. })
    ));

    let degenerate = json!([[-118.3, 33.9], [-118.2, 33.9], [-118.3, 33.9]]);
    assert!(QueryScope::from_value(&degenerate, 4326, true).is_err());

    let off_earth = json!([[-190.0, 33.9], [-118.2, 33.9], [-118.2, 34.0], [-190.0, 33.9]]);
    assert!(matches!(
        QueryScope::from_value(&off_earth, 4326, true),
        Err(GeometryError::OutOfRange { .. })
    ));

    let line = json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]});
    assert!(matches!(
        QueryScope::from_value(&line, 4326, true),
        Err(GeometryError::NotAPolygon(_))
    ));

    assert!(QueryScope::parse("not json", 4326, true).is_err());
}

#[test]
fn test_bare_ring_and_feature_are_accepted() {
    let ring = json!([[-118.3, 33.9], [-118.2, 33.9], [-118.2, 34.0], [-118.3, 33.9]]);
    let from_ring = QueryScope::from_value(&ring, 4326, true).unwrap();
    let from_feature = QueryScope::from_value(
        &json!({"type": "Feature", "properties": {}, "geometry": {"type": "Polygon", "coordinates": [ring]}}),
        4326,
        true,
    )
    .unwrap();
    assert_eq!(from_ring.geojson(), from_feature.geojson());
}

#[test]
fn test_introspection_queries_parse() {
    for dialect in [Dialect::Postgres, Dialect::DuckDb] {
        let queries = IntrospectionQueries::new(dialect);
        assert_parses(&queries.geometry_tables("public", "SHAPE").sql, dialect);
        assert_parses(&queries.table_columns("public", "road_lines").sql, dialect);
        assert_parses(&queries.layers("public", "metadata").sql, dialect);
    }
}
