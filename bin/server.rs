// Province Timeline - Web Server
// REST API over one in-memory map session

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::Parser;
use province_timeline::{
    FilterCategory, Legend, Scene, Session, SessionEvent, SessionOpts, SymbolState, ViewState, YearKey,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeline-server", version, about = "Province GDP timeline JSON API")]
struct ServerCli {
    #[command(flatten)]
    opts: SessionOpts,

    /// Address to listen on
    #[arg(long, env = "TIMELINE_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session<Scene>>>,
}

impl AppState {
    fn lock(&self) -> MutexGuard<'_, Session<Scene>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Current symbol state of the session
#[derive(Serialize)]
struct StateResponse {
    session_id: String,
    year: YearKey,
    view: ViewState,
    visible: usize,
    total: usize,
    symbols: Vec<SymbolState>,
}

impl From<&Session<Scene>> for StateResponse {
    fn from(session: &Session<Scene>) -> Self {
        let symbols = session.states().to_vec();
        Self {
            session_id: session.id().to_string(),
            year: session.current_year().clone(),
            view: session.view(),
            visible: symbols.iter().filter(|s| s.visible).count(),
            total: symbols.len(),
            symbols,
        }
    }
}

#[derive(Serialize)]
struct YearsResponse {
    years: Vec<YearKey>,
    current: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/years - Time axis
async fn get_years(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.lock();
    Json(ApiResponse::ok(YearsResponse {
        years: session.years().to_vec(),
        current: session.view().index,
    }))
}

/// GET /api/state - Symbols for the current year and filter
async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.lock();
    Json(ApiResponse::ok(StateResponse::from(&*session)))
}

/// GET /api/legend - Fixed reference circles
async fn get_legend(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.lock();
    Json(ApiResponse::<Legend>::ok(session.legend().clone()))
}

/// POST /api/time/:index - Move the slider
async fn set_time(State(state): State<AppState>, Path(index): Path<usize>) -> impl IntoResponse {
    let mut session = state.lock();
    session.handle(SessionEvent::SliderMoved(index));
    (StatusCode::OK, Json(ApiResponse::ok(StateResponse::from(&*session))))
}

/// POST /api/year/:year - Move the slider to a year key
async fn set_year(State(state): State<AppState>, Path(year): Path<String>) -> impl IntoResponse {
    // Decode URL-encoded year key
    let decoded = urlencoding::decode(&year)
        .unwrap_or_else(|_| year.clone().into())
        .into_owned();

    let mut session = state.lock();
    match session.select_year(&YearKey::new(decoded.as_str())) {
        Some(_) => (StatusCode::OK, Json(ApiResponse::ok(StateResponse::from(&*session)))),
        None => {
            warn!(year = %decoded, "unknown year requested");
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err(format!("year {} is not in the dataset", decoded))),
            )
        }
    }
}

/// POST /api/filter/:category - Click a filter button
async fn set_filter(State(state): State<AppState>, Path(category): Path<String>) -> impl IntoResponse {
    let filter = match category.parse::<FilterCategory>() {
        Ok(filter) => filter,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e.to_string()))),
    };

    let mut session = state.lock();
    session.handle(SessionEvent::FilterClicked(filter));
    (StatusCode::OK, Json(ApiResponse::ok(StateResponse::from(&*session))))
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/years", get(get_years))
        .route("/state", get(get_state))
        .route("/legend", get(get_legend))
        .route("/time/:index", post(set_time))
        .route("/year/:year", post(set_year))
        .route("/filter/:category", post(set_filter))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run().await {
        error!("{err:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = ServerCli::parse();
    let config = cli.opts.config();
    config.validate().context("invalid options")?;

    // Data must be loaded before any route can mutate the session
    let session = Session::start(&config, Scene::new())
        .with_context(|| format!("failed to start session from {}", config.dataset.display()))?;

    let state = AppState {
        session: Arc::new(Mutex::new(session)),
    };

    let addr = cli.addr;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!(%addr, "server running; API under /api");

    axum::serve(listener, app(state))
        .await
        .context("server stopped")?;

    Ok(())
}
