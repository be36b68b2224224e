//! The pre-turn pipeline shared by the streaming and non-streaming
//! conversation endpoints (§4.6): auth, validation, rate limiting, session
//! load, and turn kickoff. Everything after this point is either the wire
//! relay ([`crate::sse`]) or a drain-to-JSON loop ([`crate::api`]).

use std::sync::Arc;

use axum::http::HeaderMap;
use gateway_agent::{AgentContext, TurnHandle};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::state::{AppState, InFlightGuard};
use crate::types::ConversationRequestBody;

/// Everything prepared for a turn: the minted/resumed conversation id, the
/// live turn handle, and the in-flight guard the caller must hold until the
/// turn (and its persistence) is done.
pub struct PreparedTurn {
    pub conversation_id: String,
    pub handle: TurnHandle,
    pub guard: InFlightGuard,
}

pub async fn prepare_turn(
    state: &AppState,
    headers: &HeaderMap,
    body: ConversationRequestBody,
) -> Result<PreparedTurn, GatewayError> {
    if !state.config.native_agent_enabled {
        return Err(GatewayError::AgentDisabled);
    }

    if let Some(verifier) = &state.auth {
        match verifier.verify(headers).await {
            Some(verified_id) if verified_id == body.teacher_id => {}
            _ => return Err(GatewayError::Unauthorized),
        }
    }

    if body.message.trim().is_empty() {
        return Err(GatewayError::Validation("message must not be empty".into()));
    }
    if body.teacher_id.trim().is_empty() {
        return Err(GatewayError::Validation("teacherId must not be empty".into()));
    }

    if !state.rate_limiter.try_acquire(&body.teacher_id) {
        return Err(GatewayError::RateLimited);
    }

    let conversation_id = body
        .conversation_id
        .clone()
        .unwrap_or_else(|| format!("conv_{}", Uuid::now_v7()));

    let guard = InFlightGuard::acquire(Arc::clone(&state.in_flight), conversation_id.clone())
        .ok_or(GatewayError::ConversationBusy)?;

    let session = state.sessions.load(&conversation_id, &body.teacher_id).await?;

    let mut ctx = AgentContext::new(body.teacher_id.clone(), conversation_id.clone());
    ctx.language_hint = body.language.clone();
    ctx.class_id = body.context.as_ref().and_then(|c| c.class_id.clone());

    let handle = state.runtime.run_turn(session, body.message, ctx);

    Ok(PreparedTurn { conversation_id, handle, guard })
}
