mod classifier;
mod config;
mod engine;
mod error;
mod openai_engine;
mod session;
mod types;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use config::Config;
use engine::CompletionEngine;
use openai_engine::OpenAiEngine;
use session::{CATEGORY_OPTIONS, ReviewPolicy, SessionError, SessionState};
use types::{
    ClassificationRequest, ClassificationResponse, CommentsResponse, PostCommentRequest,
    ReviewResponse, SettingsResponse, UpdateSettingsRequest,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.json_logs);
    tracing::info!("Starting comment guard with config: {:?}", config);

    let engine = build_engine(&config);
    let policy = ReviewPolicy {
        review_category: config.review_category.clone(),
        honor_settings: config.honor_settings,
    };

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = router(AppState::new(engine, policy))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,comment_guard=debug".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Builds the completion client. A missing key or a construction failure is
/// reported here once and leaves the service running without a client.
fn build_engine(config: &Config) -> Option<Arc<dyn CompletionEngine>> {
    let Some(client_config) = config.client_config() else {
        tracing::warn!("No API key configured, classification is disabled");
        return None;
    };

    match OpenAiEngine::new(client_config) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            tracing::error!(error = %e, "Error initializing completion client");
            None
        }
    }
}

#[derive(Clone)]
struct AppState {
    engine: Option<Arc<dyn CompletionEngine>>,
    session: Arc<RwLock<SessionState>>,
    policy: Arc<ReviewPolicy>,
}

impl AppState {
    fn new(engine: Option<Arc<dyn CompletionEngine>>, policy: ReviewPolicy) -> Self {
        Self {
            engine,
            session: Arc::new(RwLock::new(SessionState::default())),
            policy: Arc::new(policy),
        }
    }

    fn engine(&self) -> Option<&dyn CompletionEngine> {
        self.engine.as_deref()
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/classify", post(classify_handler))
        .route("/comments", get(review_handler).post(post_comment_handler))
        .route("/settings", get(settings_handler).put(update_settings_handler))
        .with_state(state)
}

struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.0.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[tracing::instrument(skip(state, request), fields(category = %request.category))]
async fn classify_handler(
    State(state): State<AppState>,
    Json(request): Json<ClassificationRequest>,
) -> Json<ClassificationResponse> {
    let classification =
        classifier::classify(&request.comment, &request.category, state.engine()).await;

    Json(ClassificationResponse {
        id: format!("classify-{}", uuid::Uuid::new_v4().simple()),
        object: "classification".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: state.engine().map(|e| e.model().to_string()),
        category: request.category,
        classification,
    })
}

#[tracing::instrument(skip(state))]
async fn review_handler(State(state): State<AppState>) -> Json<ReviewResponse> {
    // Snapshot so the lock is not held across completion calls.
    let snapshot = state.session.read().await.clone();

    let data = snapshot.review(state.engine(), &state.policy).await;

    Json(ReviewResponse {
        archive_mode: snapshot.archive_mode().to_string(),
        category: snapshot.review_category(&state.policy).to_string(),
        data,
    })
}

#[tracing::instrument(skip(state, request))]
async fn post_comment_handler(
    State(state): State<AppState>,
    Json(request): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<CommentsResponse>), ApiError> {
    let mut session = state.session.write().await;
    session.post_comment(&request.comment)?;
    tracing::info!(total = session.comments().len(), "Comment posted");

    Ok((
        StatusCode::CREATED,
        Json(CommentsResponse {
            comments: session.comments().to_vec(),
        }),
    ))
}

fn settings_response(session: &SessionState) -> SettingsResponse {
    SettingsResponse {
        archive_mode: session.archive_mode(),
        label: session.archive_mode().to_string(),
        custom_category: session.custom_category().to_string(),
        category_options: CATEGORY_OPTIONS.iter().map(|c| c.to_string()).collect(),
    }
}

async fn settings_handler(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(settings_response(&*state.session.read().await))
}

#[tracing::instrument(skip(state, request), fields(mode = ?request.archive_mode))]
async fn update_settings_handler(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let mut session = state.session.write().await;
    session.update_settings(request.archive_mode, request.custom_category.as_deref())?;
    tracing::info!(
        mode = %session.archive_mode(),
        category = session.custom_category(),
        "Settings updated"
    );

    Ok(Json(settings_response(&session)))
}
