//! Routes for the Content Generation bounded context.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use quill_content::application::streaming::start_streaming_generation;
use quill_content::domain::commands::{DeleteContent, GenerateContent, StreamContent};
use quill_content::domain::events::ContentEvent;
use quill_content::domain::queries::{
    GetContentGeneration, GetContentGenerations, GetContentHistory,
};
use quill_content::domain::read_model::ContentGeneration;
use quill_core::error::DomainError;
use quill_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Minimum prompt length, in characters.
pub const MIN_PROMPT_CHARS: usize = 10;

/// Request body for POST / and POST /stream.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    /// The user's prompt. Kept untyped so a non-string value is reported
    /// as a field error rather than a malformed body.
    #[serde(default)]
    pub prompt: Option<serde_json::Value>,
}

/// One entry of a generation's event history.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Event identifier.
    pub event_id: Uuid,
    /// Event type discriminator.
    pub event_type: &'static str,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Variant fields.
    pub payload: serde_json::Value,
}

impl From<&ContentEvent> for EventResponse {
    fn from(event: &ContentEvent) -> Self {
        Self {
            event_id: event.metadata.event_id,
            event_type: event.event_type(),
            occurred_at: event.metadata.occurred_at,
            payload: event.to_payload(),
        }
    }
}

/// A server-sent event frame on the streaming route.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamFrame {
    Start {
        #[serde(rename = "aggregateId")]
        aggregate_id: Uuid,
    },
    Chunk {
        content: String,
    },
}

impl StreamFrame {
    fn into_event(self) -> Result<Event, axum::Error> {
        Event::default().json_data(self)
    }
}

/// Trims the prompt and checks it is present and long enough.
fn validate_prompt(
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(request) = payload?;
    let prompt = match request.prompt {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(prompt)) => prompt.trim().to_owned(),
        Some(_) => {
            return Err(ApiError::invalid_field(
                "prompt",
                "The prompt field must be a string.",
            ));
        }
    };
    if prompt.is_empty() {
        return Err(ApiError::invalid_field(
            "prompt",
            "The prompt field is required.",
        ));
    }
    if prompt.chars().count() < MIN_PROMPT_CHARS {
        return Err(ApiError::invalid_field(
            "prompt",
            format!("The prompt field must be at least {MIN_PROMPT_CHARS} characters."),
        ));
    }
    Ok(prompt)
}

fn detail_uri(aggregate_id: Uuid) -> String {
    format!("/api/v1/content/{aggregate_id}")
}

/// POST /
///
/// Generates content to completion, then redirects to the new generation.
#[instrument(skip_all)]
async fn create_content(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Redirect, ApiError> {
    let command = GenerateContent {
        correlation_id: Uuid::new_v4(),
        prompt: validate_prompt(payload)?,
    };

    info!(correlation_id = %command.correlation_id, "handling generate_content command");

    let aggregate_id = state.commands.dispatch(command).await?;
    Ok(Redirect::to(&detail_uri(aggregate_id)))
}

/// GET /
#[instrument(skip_all)]
async fn list_content(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContentGeneration>>, ApiError> {
    let generations = state.queries.dispatch(GetContentGenerations).await?;
    Ok(Json(generations))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentGeneration>, ApiError> {
    let generation = state
        .queries
        .dispatch(GetContentGeneration {
            aggregate_id: Some(id),
        })
        .await?
        .ok_or(DomainError::AggregateNotFound(id))?;
    Ok(Json(generation))
}

/// GET /{id}/events
#[instrument(skip(state))]
async fn get_content_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let history = state
        .queries
        .dispatch(GetContentHistory { aggregate_id: id })
        .await?;
    if history.is_empty() {
        return Err(DomainError::AggregateNotFound(id).into());
    }
    Ok(Json(history.iter().map(EventResponse::from).collect()))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = DeleteContent {
        correlation_id: Uuid::new_v4(),
        aggregate_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_content command");

    state.commands.dispatch(command).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /stream
///
/// Streams chunks as server-sent events. The first frame carries the new
/// aggregate id. Closing the connection cancels the generation.
#[instrument(skip_all)]
async fn stream_content(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let command = StreamContent {
        correlation_id: Uuid::new_v4(),
        prompt: validate_prompt(payload)?,
    };

    info!(correlation_id = %command.correlation_id, "handling stream_content request");

    let generation = start_streaming_generation(
        &command,
        Arc::clone(&state.content.clock),
        Arc::clone(&state.content.store),
        Arc::clone(&state.content.generator),
    )
    .await?;

    let start = StreamFrame::Start {
        aggregate_id: generation.aggregate_id,
    };
    let frames = stream::once(async move { start.into_event() }).chain(
        ReceiverStream::new(generation.chunks)
            .map(|content| StreamFrame::Chunk { content }.into_event()),
    );

    let headers = [
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (
            header::HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        ),
    ];
    Ok((headers, Sse::new(frames).keep_alive(KeepAlive::default())).into_response())
}

/// Returns the router for the content context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_content).post(create_content))
        .route("/stream", post(stream_content))
        .route("/{id}", get(get_content).delete(delete_content))
        .route("/{id}/events", get(get_content_events))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use quill_content::application::projector::DeletePolicy;
    use quill_core::generation::GenerationError;
    use quill_test_support::{FailingGenerator, FixedClock, StubGenerator};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app_state() -> AppState {
        AppState::in_memory(
            Arc::new(FixedClock::standard()),
            Arc::new(StubGenerator::new("Oceans cover 71%...")),
            DeletePolicy::Retain,
        )
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_content_redirects_to_detail() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = post_json("/", &serde_json::json!({ "prompt": "Tell me about oceans" }));

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/api/v1/content/"));
        let id = location.trim_start_matches("/api/v1/content/");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_create_content_with_short_prompt_returns_422() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = post_json("/", &serde_json::json!({ "prompt": "too short" }));

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "validation_error");
        assert_eq!(
            json["fields"]["prompt"],
            "The prompt field must be at least 10 characters."
        );
    }

    #[tokio::test]
    async fn test_create_content_without_prompt_returns_422() {
        let app = router().with_state(test_app_state());

        let response = app
            .oneshot(post_json("/", &serde_json::json!({ "prompt": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["fields"]["prompt"], "The prompt field is required.");
    }

    #[tokio::test]
    async fn test_create_content_with_non_string_prompt_returns_422() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = post_json("/", &serde_json::json!({ "prompt": 12_345_678_901_u64 }));

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["fields"]["prompt"], "The prompt field must be a string.");
    }

    #[tokio::test]
    async fn test_create_content_with_null_prompt_reports_required() {
        let app = router().with_state(test_app_state());

        let response = app
            .oneshot(post_json("/", &serde_json::json!({ "prompt": null })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["fields"]["prompt"],
            "The prompt field is required."
        );
    }

    #[tokio::test]
    async fn test_create_content_with_malformed_json_returns_400() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_create_content_with_failing_generator_still_redirects() {
        // Arrange
        let state = AppState::in_memory(
            Arc::new(FixedClock::standard()),
            Arc::new(FailingGenerator(GenerationError::Timeout(Duration::from_secs(100)))),
            DeletePolicy::Retain,
        );
        let app = router().with_state(state);

        // Act
        let response = app
            .oneshot(post_json(
                "/",
                &serde_json::json!({ "prompt": "Tell me about oceans" }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_get_unknown_content_returns_404() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .uri(format!("/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");
    }

    #[tokio::test]
    async fn test_get_content_with_invalid_id_returns_400() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .uri("/not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_content_returns_204() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_stream_with_short_prompt_returns_422() {
        let app = router().with_state(test_app_state());

        let response = app
            .oneshot(post_json("/stream", &serde_json::json!({ "prompt": "short" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_stream_frames_serialize_with_type_tag() {
        let id = Uuid::nil();

        let start = serde_json::to_value(StreamFrame::Start { aggregate_id: id }).unwrap();
        let chunk = serde_json::to_value(StreamFrame::Chunk {
            content: "Oceans ".to_owned(),
        })
        .unwrap();

        assert_eq!(
            start,
            serde_json::json!({ "type": "start", "aggregateId": id })
        );
        assert_eq!(
            chunk,
            serde_json::json!({ "type": "chunk", "content": "Oceans " })
        );
    }
}
