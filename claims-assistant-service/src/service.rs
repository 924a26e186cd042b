use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use claims_flow::{
    Action, ClaimRecord, ConversationEngine, ConversationRunner, ExecutionStatus, FlowCatalog,
    FlowId, InMemorySessionStorage, NoPacing, Pacer, Session, StaticTravelProvider, Timeline,
    TokioPacer,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{config::ServiceConfig, error::ApiError};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub runner: ConversationRunner,
}

impl AppState {
    pub fn new(runner: ConversationRunner) -> Self {
        Self { runner }
    }

    fn view(&self, session: Session, status: Option<ExecutionStatus>) -> SessionView {
        let catalog = self.runner.engine().catalog();
        let menu = session
            .menu
            .iter()
            .filter_map(|id| {
                catalog.get(*id).ok().map(|flow| MenuEntry {
                    id: *id,
                    label: flow.menu_label.clone(),
                })
            })
            .collect();

        SessionView {
            busy: self.runner.is_busy(&session.id),
            complete: session.is_complete(),
            session_id: session.id,
            passenger_id: session.passenger_id,
            step: session.step,
            flow: session.flow,
            menu,
            collected_documents: session.collected_documents,
            optional_document: session.optional_document,
            claim: session.claim_record,
            timeline: session.timeline,
            status,
        }
    }
}

/// Wires the static providers, in-memory storage and the configured pacing into a runner.
pub fn create_app_state(config: &ServiceConfig) -> claims_flow::Result<AppState> {
    let catalog = Arc::new(FlowCatalog::standard(&config.engine)?);
    let provider = Arc::new(StaticTravelProvider::new());
    let pacer: Arc<dyn Pacer> = if config.engine.pacing_enabled() {
        Arc::new(TokioPacer::new(config.engine.base_pause))
    } else {
        Arc::new(NoPacing)
    };

    let engine = ConversationEngine::new(catalog, provider.clone(), provider).with_pacer(pacer);
    let storage = Arc::new(InMemorySessionStorage::new());
    info!(
        payout_currency = %config.engine.payout_currency,
        pacing = config.engine.pacing_enabled(),
        "Conversation runner ready"
    );
    Ok(AppState::new(ConversationRunner::new(Arc::new(engine), storage)))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/actions", post(apply_action))
        .route("/sessions/{session_id}/reset", post(reset_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub passenger_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: FlowId,
    pub label: String,
}

/// What a client needs to render the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub passenger_id: String,
    pub step: String,
    pub flow: Option<FlowId>,
    pub menu: Vec<MenuEntry>,
    pub timeline: Timeline,
    pub collected_documents: Vec<String>,
    pub optional_document: Option<String>,
    pub claim: Option<ClaimRecord>,
    /// An action is still running; the timeline is an intermediate snapshot.
    pub busy: bool,
    pub complete: bool,
    /// Outcome of the request that produced this view. Absent on plain reads.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<ExecutionStatus>,
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Travel Claims Assistant",
        "version": "1.0.0",
        "description": "Scripted travel-insurance claim conversations",
        "endpoints": {
            "POST /sessions": "Start a conversation for a passenger",
            "GET /sessions/{session_id}": "Get the session and its timeline",
            "POST /sessions/{session_id}/actions": "Apply one user action",
            "POST /sessions/{session_id}/reset": "Cancel any running action and start over",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let passenger_id = request.passenger_id.trim();
    if passenger_id.is_empty() {
        return Err(ApiError::Validation("passenger_id is required".to_string()));
    }

    let outcome = state.runner.create(passenger_id).await.map_err(|e| {
        error!(passenger_id, error = %e, "Failed to create session");
        e
    })?;
    info!(
        session_id = %outcome.session.id,
        status = ?outcome.result.status,
        "Session started"
    );
    let view = state.view(outcome.session, Some(outcome.result.status));
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionView> {
    let session = state.runner.get(&session_id).await?;
    Ok(Json(state.view(session, None)))
}

async fn apply_action(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(action): Json<Action>,
) -> ApiResult<SessionView> {
    info!(session_id, action = action.name(), "Applying action");
    let outcome = state.runner.run(&session_id, action).await?;
    Ok(Json(state.view(outcome.session, Some(outcome.result.status))))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionView> {
    info!(session_id, "Resetting session");
    let outcome = state.runner.reset(&session_id).await?;
    Ok(Json(state.view(outcome.session, Some(outcome.result.status))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use claims_flow::EngineConfig;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = ServiceConfig {
            engine: EngineConfig::default().with_base_pause(Duration::ZERO),
            ..ServiceConfig::default()
        };
        build_router(create_app_state(&config).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_blank_passenger_is_rejected() {
        let response = app()
            .oneshot(
                Request::post("/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"passenger_id":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let response = app()
            .oneshot(Request::get("/sessions/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Session not found: nope");
    }
}
