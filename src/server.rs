use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::geo;
use crate::responses::{ErrorResponse, StudioResponse};
use crate::store::Store;

struct AppState {
    store: Arc<Store>,
}

/// API routes plus the single page app fallback for everything else.
pub fn router(store: Arc<Store>, static_dir: impl Into<PathBuf>) -> Router {
    let static_dir = static_dir.into();
    let spa = ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let state = Arc::new(AppState { store });

    Router::new()
        .route("/api/utilization/{studio_id}", get(get_utilization))
        .route("/api/studios", get(get_studios))
        .with_state(state)
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server(
    store: Arc<Store>,
    static_dir: PathBuf,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = router(store, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;
    Ok(())
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message))).into_response()
}

async fn get_utilization(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let studio_id = match raw_id.parse::<u64>() {
        Ok(id) => id,
        Err(_) => {
            debug!(%raw_id, "rejecting unparsable studio id");
            return not_found("could not parse studio id");
        }
    };

    if !state.store.studio_exists(studio_id) {
        return not_found("studio not found");
    }

    match state.store.get_utilization(studio_id).await {
        Some(utilization) => Json(utilization.as_ref()).into_response(),
        None => not_found("could not get utilization"),
    }
}

#[derive(Debug, Deserialize)]
struct StudiosParams {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

async fn get_studios(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StudiosParams>,
) -> Response {
    let Some(studios) = state.store.get_studios().await else {
        return not_found("could not get studios");
    };

    let mut content = studios.as_ref().clone();
    if let (Some(latitude), Some(longitude)) = (params.latitude, params.longitude) {
        geo::sort_by_distance(&mut content, latitude, longitude);
    }

    Json(StudioResponse { content }).into_response()
}
