use crate::config::{AppConfig, DisplayConfig};
use crate::processing::neighborhood_options;
use crate::render::{map_figure, scatter_figure, Figure};
use crate::types::{BoroughTotal, Dataset, SelectOption};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub struct AppState {
    pub dataset: Dataset,
    pub config: AppConfig,
    // Static, so built once
    pub scatter: Figure,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        let scatter = scatter_figure(&dataset);
        AppState {
            dataset,
            config,
            scatter,
        }
    }
}

#[derive(Deserialize)]
pub struct NeighborhoodParams {
    borough: Option<String>,
}

#[derive(Deserialize)]
pub struct MapParams {
    borough: Option<String>,
    neighborhood: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/layout", get(layout_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/boroughs", get(boroughs_handler))
        .route("/api/neighborhoods", get(neighborhoods_handler))
        .route("/api/scatter", get(scatter_handler))
        .route("/api/map", get(map_handler))
        .layer(CorsLayer::permissive());

    let app = if state.config.server.debug {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };

    app.with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, dataset));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Dashboard listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn layout_handler(State(state): State<Arc<AppState>>) -> Json<DisplayConfig> {
    Json(state.config.display.clone())
}

async fn summary_handler(State(state): State<Arc<AppState>>) -> Json<Vec<BoroughTotal>> {
    Json(state.dataset.borough_totals.clone())
}

async fn boroughs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<SelectOption>> {
    Json(
        state
            .dataset
            .boroughs
            .iter()
            .map(|b| SelectOption::new(b))
            .collect(),
    )
}

async fn neighborhoods_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NeighborhoodParams>,
) -> Json<Vec<SelectOption>> {
    let options = neighborhood_options(&state.dataset, params.borough.as_deref());
    Json(options.iter().map(|n| SelectOption::new(n)).collect())
}

async fn scatter_handler(State(state): State<Arc<AppState>>) -> Json<Figure> {
    Json(state.scatter.clone())
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Json<Figure> {
    Json(map_figure(
        &state.dataset,
        params.borough.as_deref(),
        params.neighborhood.as_deref(),
        &state.config.map,
    ))
}
