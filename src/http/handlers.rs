//! Route handlers.
//!
//! Per request: received → validated (extractor) → calling-upstream →
//! formatted response or mapped error response. `GatewayError` is turned into
//! an HTTP response only here, through its `IntoResponse` impl.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};

use crate::error::GatewayResult;
use crate::generation::run_generation;
use crate::http::request::{RequestId, ValidatedJson};
use crate::http::server::AppState;
use crate::http::sse::to_event;
use crate::http::types::{
    AccountResponse, CompletionRequest, CompletionResponse, GenerateRequest, HealthResponse,
};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/completion`: single prompt in, `{ text, model }` out.
pub async fn completion(
    State(state): State<AppState>,
    request_id: RequestId,
    ValidatedJson(request): ValidatedJson<CompletionRequest>,
) -> GatewayResult<Json<CompletionResponse>> {
    tracing::debug!(
        request_id = %request_id.as_str(),
        prompt_len = request.prompt.len(),
        model = ?request.model,
        "Completion request validated"
    );

    let completion = state
        .llm
        .complete(
            "llm.completion",
            &request.prompt,
            request.model.as_deref(),
            Some(request_id.as_str()),
        )
        .await?;

    tracing::debug!(request_id = %request_id.as_str(), model = %completion.model, "Completion succeeded");

    Ok(Json(CompletionResponse {
        text: completion.text,
        model: completion.model,
    }))
}

/// `GET /api/scopestack/account`: who the configured token belongs to.
pub async fn account(
    State(state): State<AppState>,
    request_id: RequestId,
) -> GatewayResult<Json<AccountResponse>> {
    let resource = state.scopestack.current_account(Some(request_id.as_str())).await?;

    tracing::debug!(request_id = %request_id.as_str(), account_id = %resource.id, "Account lookup succeeded");

    Ok(Json(AccountResponse {
        success: true,
        data: resource,
        account_slug: state.scopestack.account_slug().map(str::to_string),
    }))
}

/// `POST /api/generate`: multi-step generation as an event stream.
///
/// Validation failures are ordinary JSON errors; once the stream opens,
/// failures arrive as a terminal `error` event.
pub async fn generate(
    State(state): State<AppState>,
    request_id: RequestId,
    ValidatedJson(request): ValidatedJson<GenerateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(request_id = %request_id.as_str(), input_len = request.input.len(), "Generate request validated");

    let events = run_generation(state.llm.clone(), request, request_id.0)
        .map(|event| Ok::<_, Infallible>(to_event(&event)));

    Sse::new(events).keep_alive(KeepAlive::default())
}
