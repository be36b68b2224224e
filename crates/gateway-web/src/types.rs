//! Wire-level request/response shapes for the conversation endpoints (§6).

use serde::Deserialize;

/// `context.classId`, the one optional field the selector consults (§4.4).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    #[serde(rename = "classId")]
    pub class_id: Option<String>,
}

/// The request body shared by `/api/conversation/stream` and
/// `/api/conversation` (§6's frozen wire contract).
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRequestBody {
    pub message: String,
    #[serde(rename = "teacherId")]
    pub teacher_id: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub context: Option<RequestContext>,
    pub language: Option<String>,
}
