//! Axum server for the polygon query API.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregate::TableFailure;
use crate::matcher::{BindingGap, TableBinding};
use crate::render::{feature_collection, render_all, RenderItem};
use crate::session::{PipelineError, PipelineState, Session};

/// Application state shared across handlers.
pub struct AppState {
    pub session: Arc<Session>,
}

/// Build the axum router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query_polygon", post(query_polygon))
        .route("/api/layers", get(list_layers))
        .route("/api/refresh", post(refresh))
        .route("/api/state", get(current_state))
        .layer(cors)
        .with_state(state)
}

/// Start the web server.
pub async fn serve(session: Arc<Session>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(AppState { session }));

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "serving polygon query API");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Polygon queries
// ============================================================================

#[derive(Serialize)]
struct QueryPolygonResponse {
    message: String,
    /// GeoJSON FeatureCollection in the canonical CRS.
    features: Value,
    render: Vec<RenderItem>,
    failures: Vec<TableFailure>,
    gaps: Vec<BindingGap>,
    skipped_geometries: usize,
}

/// POST /api/query_polygon - Features intersecting a GeoJSON polygon
async fn query_polygon(
    State(state): State<Arc<AppState>>,
    Json(polygon): Json<Value>,
) -> Result<Json<QueryPolygonResponse>, (StatusCode, String)> {
    let report = state.session.submit(&polygon).await.map_err(error_response)?;

    Ok(Json(QueryPolygonResponse {
        message: report.message(),
        features: feature_collection(&report.features),
        render: render_all(&report.features),
        skipped_geometries: report.skipped_geometries,
        failures: report.failures,
        gaps: report.gaps,
    }))
}

fn error_response(e: PipelineError) -> (StatusCode, String) {
    let status = match &e {
        PipelineError::InvalidPolygon(_) => StatusCode::BAD_REQUEST,
        PipelineError::Discovery(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Superseded => StatusCode::CONFLICT,
    };
    (status, e.user_message())
}

// ============================================================================
// Discovery
// ============================================================================

#[derive(Serialize)]
struct LayersResponse {
    bindings: Vec<TableBinding>,
    gaps: Vec<BindingGap>,
}

/// GET /api/layers - Current table-to-layer bindings
async fn list_layers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LayersResponse>, (StatusCode, String)> {
    let discovery = state
        .session
        .discover()
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(LayersResponse {
        bindings: discovery.bindings.clone(),
        gaps: discovery.gaps.clone(),
    }))
}

/// POST /api/refresh - Drop cached discovery results
async fn refresh(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.refresh().await;
    StatusCode::NO_CONTENT
}

/// GET /api/state - Where the latest cycle is
async fn current_state(State(state): State<Arc<AppState>>) -> Json<PipelineState> {
    let current = *state.session.state().borrow();
    Json(current)
}
