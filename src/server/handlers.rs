//! Request handlers for the panel server.
//!
//! Each handler decodes its payload, builds a per-request OpenRouter client
//! around the shared connection pool, runs one pipeline stage, and returns
//! the stage's entity as JSON. Unusable input and a missing credential map
//! to 400; upstream failures map to 500. Both carry `{"error": msg}`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::{LlmError, PanelError};
use crate::llm::{resolve_api_key, ModelClient, OpenRouterClient};
use crate::panel::{
    ConsensusAggregator, EvaluationGoal, EvaluationResult, ImageData, ImageSynthesizer, Persona,
    PersonaEvaluator, DEFAULT_IMAGE_MIME,
};

use super::AppState;

/// Default number of generation calls when the form omits `count`.
const DEFAULT_GENERATION_COUNT: usize = 4;

// ============================================================================
// Health
// ============================================================================

/// GET / - liveness probe.
pub(super) async fn handle_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "swipejury" })),
    )
}

// ============================================================================
// Evaluate
// ============================================================================

/// Decoded multipart payload for `/api/evaluate`.
struct EvaluateForm {
    api_key: Option<String>,
    persona: Persona,
    goal: EvaluationGoal,
    image: ImageData,
}

/// POST /api/evaluate - run one persona's judgement over one uploaded photo.
///
/// Multipart fields: `openRouterKey` (optional), `persona` (JSON object as
/// text), `goal` (optional, defaults to right), `image` (file; its content
/// type is kept as the mime, defaulting to jpeg).
pub(super) async fn handle_evaluate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let form = match read_evaluate_form(multipart).await {
        Ok(form) => form,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    let client = match build_client(&state, form.api_key.as_deref()) {
        Ok(client) => client,
        Err(response) => return response,
    };

    let evaluator = PersonaEvaluator::with_defaults(client);
    match evaluator.evaluate(&form.image, &form.persona, form.goal).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(error) => {
            tracing::warn!(%error, persona_id = form.persona.id, "evaluation request failed");
            panel_error_response(&error)
        }
    }
}

async fn read_evaluate_form(mut multipart: Multipart) -> Result<EvaluateForm, String> {
    let mut api_key = None;
    let mut persona_raw: Option<String> = None;
    let mut goal_raw: Option<String> = None;
    let mut image = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "openRouterKey" => api_key = Some(read_text(field).await?),
            "persona" => persona_raw = Some(read_text(field).await?),
            "goal" => goal_raw = Some(read_text(field).await?),
            "image" => image = Some(read_image(field).await?),
            _ => {}
        }
    }

    let persona_raw = persona_raw.ok_or("missing 'persona' field")?;
    let persona: Persona = serde_json::from_str(&persona_raw)
        .map_err(|error| format!("invalid 'persona' JSON: {error}"))?;
    let goal = parse_goal(goal_raw.as_deref())?;
    let image = image.ok_or("missing 'image' upload")?;

    Ok(EvaluateForm {
        api_key,
        persona,
        goal,
        image,
    })
}

// ============================================================================
// Combine
// ============================================================================

/// JSON payload for `/api/combine`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CombineBody {
    #[serde(default)]
    open_router_key: Option<String>,
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    feedbacks: Vec<EvaluationResult>,
}

/// POST /api/combine - merge judge feedback into one consensus directive.
///
/// Accepts the evaluation results as the caller collected them; an empty
/// `feedbacks` list is allowed and yields a zero-tally directive.
pub(super) async fn handle_combine(
    State(state): State<AppState>,
    body: Result<Json<CombineBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    let goal = match parse_goal(body.goal.as_deref()) {
        Ok(goal) => goal,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    let client = match build_client(&state, body.open_router_key.as_deref()) {
        Ok(client) => client,
        Err(response) => return response,
    };

    let aggregator = ConsensusAggregator::with_defaults(client);
    match aggregator.aggregate(&body.feedbacks, goal).await {
        Ok(directive) => (StatusCode::OK, Json(json!(directive))),
        Err(error) => {
            tracing::warn!(%error, feedback_count = body.feedbacks.len(), "combine request failed");
            panel_error_response(&error)
        }
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Decoded multipart payload for `/api/generate`.
struct GenerateForm {
    api_key: Option<String>,
    suggestions: String,
    count: usize,
    image: ImageData,
}

/// POST /api/generate - produce revised photos from a directive.
///
/// Multipart fields: `openRouterKey` (optional), `suggestions` (directive
/// text), `count` (optional, defaults to 4), `originalImage` (file,
/// required). Returns `{"images": [...]}` with however many calls succeeded.
pub(super) async fn handle_generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let form = match read_generate_form(multipart).await {
        Ok(form) => form,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    let client = match build_client(&state, form.api_key.as_deref()) {
        Ok(client) => client,
        Err(response) => return response,
    };

    let synthesizer = ImageSynthesizer::with_defaults(client);
    let images = synthesizer
        .generate(&form.suggestions, &form.image, form.count)
        .await;

    tracing::debug!(
        requested = form.count,
        produced = images.len(),
        "generate request finished"
    );
    (StatusCode::OK, Json(json!({ "images": images })))
}

async fn read_generate_form(mut multipart: Multipart) -> Result<GenerateForm, String> {
    let mut api_key = None;
    let mut suggestions = String::new();
    let mut count_raw: Option<String> = None;
    let mut image = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "openRouterKey" => api_key = Some(read_text(field).await?),
            "suggestions" => suggestions = read_text(field).await?,
            "count" => count_raw = Some(read_text(field).await?),
            "originalImage" => image = Some(read_image(field).await?),
            _ => {}
        }
    }

    let count = parse_count(count_raw.as_deref())?;
    let image = image.ok_or("missing 'originalImage' upload")?;

    Ok(GenerateForm {
        api_key,
        suggestions,
        count,
        image,
    })
}

// ============================================================================
// Shared helpers
// ============================================================================

async fn next_field(
    multipart: &mut Multipart,
) -> Result<Option<axum::extract::multipart::Field<'_>>, String> {
    multipart
        .next_field()
        .await
        .map_err(|error| format!("invalid multipart payload: {error}"))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, String> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|error| format!("unreadable '{name}' field: {error}"))
}

async fn read_image(field: axum::extract::multipart::Field<'_>) -> Result<ImageData, String> {
    let name = field.name().unwrap_or_default().to_string();
    let mime = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
    let bytes = field
        .bytes()
        .await
        .map_err(|error| format!("unreadable '{name}' upload: {error}"))?;
    Ok(ImageData::new(bytes.to_vec(), mime))
}

/// Parse an optional goal field, treating blank as absent.
fn parse_goal(raw: Option<&str>) -> Result<EvaluationGoal, String> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(EvaluationGoal::default()),
        Some(value) => value.parse(),
    }
}

/// Parse an optional count field, treating blank as absent.
fn parse_count(raw: Option<&str>) -> Result<usize, String> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(DEFAULT_GENERATION_COUNT),
        Some(value) => value
            .parse()
            .map_err(|_| format!("invalid 'count' value '{value}'")),
    }
}

/// Resolve the credential and wrap the shared pool in a model client.
///
/// A missing credential is the caller's problem, so it maps to 400 here
/// rather than the 500 used for upstream failures.
fn build_client(
    state: &AppState,
    explicit_key: Option<&str>,
) -> Result<Arc<dyn ModelClient>, (StatusCode, Json<serde_json::Value>)> {
    match resolve_api_key(explicit_key) {
        Ok(key) => Ok(Arc::new(OpenRouterClient::with_http_client(
            state.http.clone(),
            key,
        ))),
        Err(error) => Err(error_response(StatusCode::BAD_REQUEST, &error.to_string())),
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": message })))
}

fn panel_error_response(error: &PanelError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error {
        PanelError::Llm(LlmError::MissingApiKey) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let response = handle_health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "swipejury");
    }

    #[test]
    fn test_parse_goal_defaults_to_right() {
        assert_eq!(parse_goal(None).unwrap(), EvaluationGoal::Right);
        assert_eq!(parse_goal(Some("  ")).unwrap(), EvaluationGoal::Right);
        assert_eq!(parse_goal(Some("left")).unwrap(), EvaluationGoal::Left);
        assert_eq!(parse_goal(Some("RIGHT")).unwrap(), EvaluationGoal::Right);
        assert!(parse_goal(Some("sideways")).is_err());
    }

    #[test]
    fn test_parse_count_defaults_and_rejects_garbage() {
        assert_eq!(parse_count(None).unwrap(), DEFAULT_GENERATION_COUNT);
        assert_eq!(parse_count(Some("")).unwrap(), DEFAULT_GENERATION_COUNT);
        assert_eq!(parse_count(Some("2")).unwrap(), 2);
        assert_eq!(parse_count(Some(" 0 ")).unwrap(), 0);
        assert!(parse_count(Some("four")).is_err());
        assert!(parse_count(Some("-1")).is_err());
    }

    #[test]
    fn test_error_response_shape() {
        let (status, Json(body)) = error_response(StatusCode::BAD_REQUEST, "missing 'image' upload");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing 'image' upload");
    }

    #[test]
    fn test_missing_credential_maps_to_bad_request() {
        let error = PanelError::Llm(LlmError::MissingApiKey);
        let (status, _) = panel_error_response(&error);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_failures_map_to_server_error() {
        let transport = PanelError::Llm(LlmError::RequestFailed("connection reset".into()));
        let (status, Json(body)) = panel_error_response(&transport);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("connection reset"));

        let empty = PanelError::EmptyCompletion;
        let (status, _) = panel_error_response(&empty);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_combine_body_accepts_camel_case_and_defaults() {
        let body: CombineBody = serde_json::from_str(
            r#"{
                "openRouterKey": "sk-or-test",
                "goal": "left",
                "feedbacks": [
                    { "personaId": 1, "name": "Maya", "swipe": "right", "reason": "warm smile" }
                ]
            }"#,
        )
        .expect("valid body");

        assert_eq!(body.open_router_key.as_deref(), Some("sk-or-test"));
        assert_eq!(body.goal.as_deref(), Some("left"));
        assert_eq!(body.feedbacks.len(), 1);
        assert_eq!(body.feedbacks[0].name, "Maya");

        let bare: CombineBody = serde_json::from_str("{}").expect("all fields optional");
        assert!(bare.open_router_key.is_none());
        assert!(bare.goal.is_none());
        assert!(bare.feedbacks.is_empty());
    }
}
