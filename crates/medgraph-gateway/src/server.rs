//! Gateway server — task submission, status streaming, and graph export
//!
//! Every service is constructed here and injected through the router
//! state; nothing is ambient. Workflow failures never surface as 5xx:
//! they end up in the task record, and clients observe them through the
//! status stream or the report endpoint.

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use medgraph_agent::{task_events, Orchestrator, ResearchPipeline, TaskEvent, TaskRegistry};
use medgraph_core::{Config, TaskId};
use medgraph_llm::{LlmProvider, OpenAiCompatProvider};
use medgraph_store::{ClaimGraph, ObjectStore};
use medgraph_tools::create_default_registry;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct ExtendedConfig {
    pub port: u16,
    pub bind: String,
    pub config: Config,
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind: "0.0.0.0".to_string(),
            config: Config::default(),
        }
    }
}

pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub graph: Arc<ClaimGraph>,
    pub poll_interval: Duration,
}

pub async fn start_gateway(config: ExtendedConfig) -> anyhow::Result<()> {
    // LLM credentials are never fatal at startup; a keyless provider makes
    // every workflow fail with a logged task error instead.
    let api_key = match &config.config.llm.api_key {
        Some(key) => key.clone(),
        None => {
            warn!("No LLM API key set (XAI_API_KEY or OPENAI_API_KEY); workflows will fail");
            String::new()
        }
    };
    let mut provider = OpenAiCompatProvider::new(api_key);
    if let Some(base_url) = &config.config.llm.base_url {
        provider = provider.with_base_url(base_url);
    }
    let provider: Arc<dyn LlmProvider> = Arc::new(provider);

    let tools = Arc::new(create_default_registry(
        config.config.tavily_api_key.clone(),
    ));
    info!("Registered tools: {:?}", tools.list());

    let graph = Arc::new(ClaimGraph::open(&config.config.graph_file, &config.config.graph_db).await);
    let objects = Arc::new(ObjectStore::connect(&config.config.object_store).await?);

    let registry = Arc::new(TaskRegistry::new(config.config.task_capacity));
    let runner = Arc::new(ResearchPipeline::new(
        provider,
        tools,
        graph.clone(),
        config.config.llm.model.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        runner,
        objects,
        Duration::from_secs(config.config.workflow_timeout_secs),
    ));

    let state = Arc::new(AppState {
        registry,
        orchestrator,
        graph,
        poll_interval: STATUS_POLL_INTERVAL,
    });

    let app = build_router(state);

    let bind_addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {}", e))?;

    info!("Medgraph v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Graph file:   {}", config.config.graph_file.display());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/research", post(research_handler))
        .route("/status/{task_id}", get(status_handler))
        .route("/report/{task_id}", get(report_handler))
        .route("/graph", get(graph_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({ "message": "Medgraph research platform is running" }))
}

async fn research_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(topic) = body["topic"].as_str().filter(|t| !t.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Topic required" })),
        )
            .into_response();
    };

    let task_id = state.orchestrator.submit(topic);
    match state.registry.get(&task_id) {
        Some(record) => Json(record).into_response(),
        // Only reachable if the record was evicted between submit and read.
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Server-push event stream: log events per new line, then one status
/// event and (on success) one result event when the task is terminal.
async fn status_handler(
    AxumPath(task_id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, StatusCode> {
    let events = task_events(
        state.registry.clone(),
        TaskId::from(task_id),
        state.poll_interval,
    )
    .map_err(|_| StatusCode::NOT_FOUND)?;

    let stream = events.map(|event| {
        let event = match event {
            TaskEvent::Log(line) => Event::default().event("log").data(line),
            TaskEvent::Status(status) => Event::default().event("status").data(status.as_str()),
            TaskEvent::Result(value) => Event::default().event("result").data(value.to_string()),
        };
        Ok::<_, Infallible>(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn report_handler(
    AxumPath(task_id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.registry.get(&TaskId::from(task_id)) {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Task not found" })),
        )
            .into_response(),
    }
}

async fn graph_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.graph.snapshot().await)
}
