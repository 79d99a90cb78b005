use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartrisk_core::domain::{Objective, StockRecord};
use smartrisk_core::optimizer::{HttpOptimizerClient, OptimizerClient};
use smartrisk_core::projection::ProjectedPortfolio;
use smartrisk_core::questionnaire::{
    Catalog, QuestionId, QuestionnaireFlow, RiskBand, RiskScoreResult,
};
use smartrisk_core::session::{Completion, PortfolioSession, SessionError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = smartrisk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let optimizer = HttpOptimizerClient::from_settings(&settings)?;
    tracing::info!(base_url = settings.optimizer_base_url(), "optimizer client ready");

    let state = AppState {
        catalog: Arc::new(Catalog::standard()),
        optimizer: Arc::new(optimizer),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| captured(anyhow::Error::new(e).context("bind failed")))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| captured(anyhow::Error::new(e).context("server error")))?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/questionnaire", get(get_questionnaire))
        .route("/questionnaire/score", post(score_questionnaire))
        .route("/questionnaire/skip", post(skip_questionnaire))
        .route("/stocks", get(get_stocks))
        .route("/portfolio", post(post_portfolio))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    optimizer: Arc<dyn OptimizerClient>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn failure(status: StatusCode, error: impl ToString) -> ApiFailure {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
struct ApiRiskProfile {
    total_score: u32,
    band: RiskBand,
    message: String,
    skipped: bool,
}

impl From<RiskScoreResult> for ApiRiskProfile {
    fn from(result: RiskScoreResult) -> Self {
        Self {
            total_score: result.total_score,
            band: result.band,
            message: result.band.message(),
            skipped: result.skipped,
        }
    }
}

async fn get_questionnaire(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}

#[derive(Debug, Deserialize)]
struct ScoreBody {
    answers: BTreeMap<QuestionId, f64>,
}

async fn score_questionnaire(
    State(state): State<AppState>,
    Json(body): Json<ScoreBody>,
) -> Result<Json<ApiRiskProfile>, ApiFailure> {
    let flow = QuestionnaireFlow::new(state.catalog.as_ref().clone());
    let result = flow
        .complete_with(&body.answers)
        .map_err(|e| failure(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    tracing::info!(total_score = result.total_score, band = %result.band, "risk profile scored");
    Ok(Json(result.into()))
}

async fn skip_questionnaire(State(state): State<AppState>) -> Json<ApiRiskProfile> {
    let flow = QuestionnaireFlow::new(state.catalog.as_ref().clone());
    Json(flow.skip().into())
}

async fn get_stocks(State(state): State<AppState>) -> Json<Vec<StockRecord>> {
    let mut session = PortfolioSession::new();
    session.load_candidates(state.optimizer.as_ref()).await;
    Json(session.candidates().to_vec())
}

#[derive(Debug, Deserialize)]
struct PortfolioBody {
    objective: Option<Objective>,
    #[serde(default)]
    risk_target_percent: Option<f64>,
    investable_cash: f64,
    #[serde(default)]
    allocations: Vec<AllocationBody>,
}

#[derive(Debug, Deserialize)]
struct AllocationBody {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    minimum_weight_percent: i64,
}

/// Replays a request body through the session mutations. Weights the slot cannot
/// take are rejected, not clamped.
fn session_from_body(body: &PortfolioBody) -> Result<PortfolioSession, SessionError> {
    let mut session = PortfolioSession::new();
    session.set_asset_count(body.allocations.len())?;
    for (index, slot) in body.allocations.iter().enumerate() {
        if let Some(symbol) = slot.symbol.as_deref().filter(|s| !s.trim().is_empty()) {
            session.set_slot_symbol(index, symbol)?;
        }
        session.require_slot_minimum_weight(index, slot.minimum_weight_percent)?;
    }
    if let Some(objective) = body.objective {
        session.set_objective(objective);
    }
    session.set_risk_target(body.risk_target_percent);
    session.set_investable_cash(body.investable_cash);
    Ok(session)
}

fn session_error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::SubmissionInFlight { .. } => StatusCode::CONFLICT,
        SessionError::Validation(_) | SessionError::Allocation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

async fn post_portfolio(
    State(state): State<AppState>,
    Json(body): Json<PortfolioBody>,
) -> Result<Json<ProjectedPortfolio>, ApiFailure> {
    let mut session =
        session_from_body(&body).map_err(|e| failure(session_error_status(&e), e))?;

    let completion = session
        .submit(state.optimizer.as_ref())
        .await
        .map_err(|e| failure(session_error_status(&e), e))?;

    match completion {
        Completion::Applied => session
            .last_result()
            .cloned()
            .map(Json)
            .ok_or_else(|| failure(StatusCode::INTERNAL_SERVER_ERROR, "result missing")),
        Completion::Failed => {
            let message = session.last_error().unwrap_or("optimizer failed").to_string();
            sentry_anyhow::capture_anyhow(&anyhow::anyhow!(
                "portfolio computation failed: {message}"
            ));
            tracing::error!(error = %message, "portfolio computation failed");
            Err(failure(StatusCode::BAD_GATEWAY, message))
        }
        Completion::Discarded => Err(failure(
            StatusCode::CONFLICT,
            "portfolio request was superseded",
        )),
    }
}

fn captured(err: anyhow::Error) -> anyhow::Error {
    sentry_anyhow::capture_anyhow(&err);
    err
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &smartrisk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
