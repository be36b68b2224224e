//! The streaming conversation endpoint (§4.6, §6): turns a prepared turn's
//! event stream into a Server-Sent Events HTTP response.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::pipeline::prepare_turn;
use crate::state::AppState;
use crate::types::ConversationRequestBody;

/// `POST /api/conversation/stream` — opens an SSE stream for one turn
/// (§4.6 steps 1-5). The turn's session is persisted by a detached task
/// that outlives the response body, so a client disconnect never loses the
/// turn's result (§5).
pub async fn stream_conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ConversationRequestBody>,
) -> Result<Response, GatewayError> {
    let prepared = prepare_turn(&state, &headers, body).await?;
    let conversation_id = prepared.conversation_id;
    let guard = prepared.guard;

    let wire = gateway_agent::adapt(prepared.handle.events, state.config.heartbeat_interval);
    let mut outcome_rx = prepared.handle.outcome;
    let sessions = Arc::clone(&state.sessions);
    let conversation_id_for_persist = conversation_id.clone();

    tokio::spawn(async move {
        let _guard = guard;
        match outcome_rx.await {
            Ok(outcome) => {
                if let Err(err) = sessions.save(&outcome.session).await {
                    warn!(conversation_id = %conversation_id_for_persist, error = %err, "failed to persist session after turn");
                } else {
                    info!(conversation_id = %conversation_id_for_persist, reason = %outcome.metrics.terminated_reason, "turn persisted");
                }
            }
            Err(_) => {
                warn!(conversation_id = %conversation_id_for_persist, "turn outcome channel closed without a result");
            }
        }
    });

    let body_stream = wire.map(|frame| Ok::<_, Infallible>(frame.to_sse_string()));

    let mut response = Response::new(Body::from_stream(body_stream));
    *response.status_mut() = StatusCode::OK;
    let header_map = response.headers_mut();
    header_map.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    header_map.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    header_map.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    header_map.insert("X-Accel-Buffering", HeaderValue::from_static("no"));

    Ok(response.into_response())
}
