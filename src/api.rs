use crate::{
    cache::ModelCache,
    clean::clean_response,
    device::Device,
    error::ApiError,
    generate,
    prompt::{format_prompt, Message, Role},
    registry::{ModelRegistry, DEFAULT_MODEL},
    util::word_count,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub cache: Arc<ModelCache>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: ModelRegistry, cache: ModelCache) -> Self {
        Self { registry: Arc::new(registry), cache: Arc::new(cache), metrics: None }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    1000
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Defaults to false and is ignored; responses are never streamed.
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: String,
}

/// Word counts, not tokenizer counts.
#[derive(Debug, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: Option<String>,
    pub context_length: Option<u32>,
    pub loaded: bool,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/models/:name/load", post(load_model))
        .route("/models/:name/unload", delete(unload_model))
        .route("/chat/completions", post(chat_completions))
        .route("/metrics", get(prometheus_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root(State(s): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "AlterEgo PWA Backend Server",
        "version": env!("CARGO_PKG_VERSION"),
        "device": s.cache.device(),
        "loaded_models": s.cache.loaded_ids(),
    }))
}

async fn health(State(s): State<AppState>) -> Json<Value> {
    let device = s.cache.device();
    let mut memory = serde_json::Map::new();
    if device == Device::Cuda {
        let usage = s.cache.memory_usage(device);
        memory.insert("gpu_allocated".into(), json!(format!("{:.2} GB", usage.allocated as f64 / 1e9)));
        memory.insert("gpu_reserved".into(), json!(format!("{:.2} GB", usage.reserved as f64 / 1e9)));
    }
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
        "device": device,
        "loaded_models": s.cache.len(),
        "available_models": s.registry.len(),
        "memory": memory,
    }))
}

async fn list_models(State(s): State<AppState>) -> Json<Vec<ModelInfo>> {
    let models = s
        .registry
        .list()
        .iter()
        .map(|m| ModelInfo {
            id: m.id.clone(),
            name: m.name.clone(),
            description: m.description.clone(),
            parameters: m.parameters.clone(),
            context_length: m.context_length,
            loaded: s.cache.is_loaded(&m.id),
        })
        .collect();
    Json(models)
}

async fn chat_completions(
    State(s): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatCompletion>, ApiError> {
    let result = complete(&s, req).await;
    if result.is_err() {
        metrics::counter!("chat_completion_errors_total").increment(1);
    }
    result.map(Json)
}

async fn complete(s: &AppState, req: ChatRequest) -> Result<ChatCompletion, ApiError> {
    let descriptor = s
        .registry
        .get(&req.model)
        .ok_or_else(|| ApiError::UnknownModel(req.model.clone()))?;
    metrics::counter!("chat_completions_total", "model" => req.model.clone()).increment(1);

    let handle = s.cache.get_or_load(&req.model).await?;
    let prompt = format_prompt(&req.messages, descriptor.family());
    tracing::info!(model = %req.model, messages = req.messages.len(), "chat completion");

    let raw = generate::generate(handle, prompt.clone(), req.temperature, req.max_tokens).await?;
    let content = clean_response(&raw);

    let prompt_tokens = word_count(&prompt);
    let completion_tokens = word_count(&content);
    let created = chrono::Utc::now().timestamp();
    Ok(ChatCompletion {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        object: "chat.completion".to_string(),
        created,
        model: req.model,
        choices: vec![Choice {
            index: 0,
            message: Message::new(Role::Assistant, content),
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    })
}

async fn load_model(State(s): State<AppState>, Path(name): Path<String>) -> Result<Json<Value>, ApiError> {
    if !s.registry.exists(&name) {
        return Err(ApiError::UnknownModel(name));
    }
    if s.cache.is_loaded(&name) {
        return Ok(Json(json!({ "status": "already_loaded", "model": name })));
    }

    let cache = s.cache.clone();
    let id = name.clone();
    tokio::spawn(async move {
        if let Err(e) = cache.get_or_load(&id).await {
            tracing::error!(model = %id, error = %e, "background load failed");
        }
    });
    Ok(Json(json!({ "status": "loading", "model": name })))
}

async fn unload_model(State(s): State<AppState>, Path(name): Path<String>) -> Result<Json<Value>, ApiError> {
    s.cache.unload(&name)?;
    Ok(Json(json!({ "status": "unloaded", "model": name })))
}

async fn prometheus_metrics(State(s): State<AppState>) -> impl IntoResponse {
    match &s.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
