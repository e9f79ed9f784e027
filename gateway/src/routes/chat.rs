//! Chat WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::chat::chat_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the chat WebSocket router
///
/// # Endpoint
///
/// `GET /ws/chat` - WebSocket upgrade for a voice/text chat session
///
/// # Example
///
/// ```json
/// // Client sends setup
/// {"setup": {"voice_name": "Puck", "vad_settings": {"silence_duration_ms": 800}}}
///
/// // Client streams audio as binary frames, server answers with
/// {"type": "transcript_partial", "text": "Book a fl", "role": "user"}
/// {"type": "subagent_start", "agent": "Flight Specialist", "args": {"to": "LIS"}}
/// {"type": "ttfb", "duration": 1.84}
/// ```
pub fn create_chat_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/chat", get(chat_handler))
        .layer(TraceLayer::new_for_http())
}
