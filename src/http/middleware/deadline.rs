//! Whole-request deadline.
//!
//! Bounds the time until a handler produces its response. Event-stream
//! bodies keep flowing after the response head is sent; each upstream call
//! inside them has its own deadline.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::resilience::with_timeout;

/// Answer with a `timeout` error once `deadline` elapses.
pub async fn enforce_deadline(State(deadline): State<Duration>, request: Request, next: Next) -> Response {
    let message = format!("request timed out after {}s", deadline.as_secs());
    match with_timeout(deadline, message, async { Ok(next.run(request).await) }).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
