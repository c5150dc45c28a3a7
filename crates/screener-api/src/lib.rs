use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::Method,
    http::Request,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use clap::Parser;
use dotenvy::dotenv;
use screener_core::{
    BatchConfig, BatchScreener, EmbedderConfig, LearningCatalog, ScreeningConfig,
    ScreeningPipeline, SkillTaxonomy, create_embedder,
};
use tokio::sync::watch;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod auth;
pub mod error;
pub mod handlers;

use auth::{API_KEY_HEADER, AuthConfig};
use error::ApiError;
use handlers::{batch, compare, health, learning, screen, skills};
use screener_core::logging::{init_tracing_subscriber, install_tracing_panic_hook};

const SHUTDOWN_DRAIN_GRACE: std::time::Duration = std::time::Duration::from_millis(200);

#[derive(Debug, Clone, Parser)]
#[command(name = "screener-api", about = "HTTP API for resume/job screening")]
struct Cli {
    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// API key for X-API-Key authentication
    #[arg(long, env = "SCREENER_API_KEY")]
    api_key: Option<String>,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "SCREENER_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Skill taxonomy JSON (built-in taxonomy when omitted)
    #[arg(long, env = "SCREENER_TAXONOMY_PATH")]
    taxonomy_path: Option<PathBuf>,

    /// Course catalog JSON for learning plans (search links only when omitted)
    #[arg(long, env = "SCREENER_LEARNING_CATALOG_PATH")]
    learning_catalog_path: Option<PathBuf>,

    /// Embedding providers in fallback order: hash | none (comma separated)
    #[arg(long, env = "SCREENER_EMBEDDER", default_value = "hash")]
    embedder: String,

    /// Maximum request body size in bytes
    #[arg(long, env = "SCREENER_BODY_LIMIT_BYTES", default_value_t = 2 * 1024 * 1024)]
    body_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
    pub taxonomy_path: Option<PathBuf>,
    pub learning_catalog_path: Option<PathBuf>,
    pub embedder: String,
    pub body_limit_bytes: usize,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "SCREENER_CORS_ORIGINS must list explicit origins".into(),
            ));
        }

        let api_key = cli
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("SCREENER_API_KEY is required".into()))?;

        if cli.body_limit_bytes == 0 {
            return Err(ApiError::BadRequest(
                "SCREENER_BODY_LIMIT_BYTES must be positive".into(),
            ));
        }

        Ok(Self {
            port: cli.port,
            cors_origins,
            auth: AuthConfig { api_key },
            taxonomy_path: cli.taxonomy_path,
            learning_catalog_path: cli.learning_catalog_path,
            embedder: cli.embedder,
            body_limit_bytes: cli.body_limit_bytes,
        })
    }

    pub fn for_tests(auth: AuthConfig) -> Self {
        Self {
            port: 3001,
            cors_origins: vec!["http://localhost:3000".into()],
            auth,
            taxonomy_path: None,
            learning_catalog_path: None,
            embedder: "hash".into(),
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub pipeline: ScreeningPipeline,
    pub batch: BatchScreener,
    pub learning: LearningCatalog,
    pub readiness: Arc<AtomicBool>,
    /// true を送るとバッチの未着手分がキャンセルされる
    pub shutdown: watch::Sender<bool>,
}

pub type SharedState = Arc<AppState>;

impl axum::extract::FromRef<SharedState> for AuthConfig {
    fn from_ref(input: &SharedState) -> AuthConfig {
        input.config.auth.clone()
    }
}

/// タクソノミー・埋め込み器・パイプラインを構築する。いずれかが不正なら起動しない。
pub fn build_state(
    config: AppConfig,
    screening: ScreeningConfig,
    batch: BatchConfig,
) -> Result<SharedState, ApiError> {
    let taxonomy = SkillTaxonomy::load(config.taxonomy_path.as_deref())?;
    let learning = LearningCatalog::load(config.learning_catalog_path.as_deref())?;
    let embedder = create_embedder(
        &config.embedder,
        EmbedderConfig {
            dimension: screening.embedding_dimension,
            min_tokens: screening.min_tokens,
        },
    );
    info!(
        taxonomy_version = taxonomy.version(),
        skills = taxonomy.len(),
        embedder = embedder.name(),
        embedder_version = embedder.version(),
        learning_catalog_skills = learning.len(),
        "screening pipeline configured"
    );

    let pipeline = ScreeningPipeline::new(Arc::new(taxonomy), Arc::from(embedder), screening)?;
    let batch = BatchScreener::new(pipeline.clone(), batch)?;
    let (shutdown, _) = watch::channel(false);

    Ok(Arc::new(AppState {
        config,
        pipeline,
        batch,
        learning,
        readiness: Arc::new(AtomicBool::new(true)),
        shutdown,
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    error::with_request_id(request_id, next.run(req)).await
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.body_limit_bytes;

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let api_routes = Router::new()
        .route("/screen", post(screen::screen))
        .route("/skills", post(skills::extract_skills))
        .route("/batch", post(batch::screen_batch))
        .route("/compare", post(compare::compare_jobs))
        .route("/learning-plan", post(learning::learning_plan));

    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
        .layer(cors)
        .with_state(state)
}

pub fn test_state(api_key: &str) -> SharedState {
    let auth = AuthConfig {
        api_key: api_key.to_string(),
    };

    build_state(
        AppConfig::for_tests(auth),
        ScreeningConfig::default(),
        BatchConfig::default(),
    )
    .expect("built-in taxonomy and default config should be valid")
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let state = build_state(config.clone(), ScreeningConfig::from_env(), BatchConfig::from_env())?;

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(%addr, run_id = screener_core::run_id::get(), "screener-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received; draining");
    state.readiness.store(false, Ordering::SeqCst);
    state.shutdown.send_replace(true);

    // /readyz が 503 になったことをロードバランサが観測するまで待つ
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}
