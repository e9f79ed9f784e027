//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `chat` - Voice/text chat sessions bridged to the agent backend

pub mod api;
pub mod chat;

pub use chat::chat_handler;
