//! # Slash API
//!
//! Everything that crosses the network lives here: the wire types, the
//! reqwest-backed [`ApiClient`], and the [`ChatApi`] seam the core flows are
//! written against.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::{ApiClient, Payload};
pub use error::ApiError;
pub use types::{
    BlockStatus, ConversationSummary, LoginRequest, Message, MessageBody, MessageKind,
    OutgoingMessage, RegisterRequest, Upload, User,
};

/// The endpoint set of the Slash API, one method per route.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError>;

    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError>;

    async fn search_users(&self, query: &str) -> Result<Vec<User>, ApiError>;

    /// Discoverable users, shown before the account has any conversations.
    async fn public_users(&self) -> Result<Vec<User>, ApiError>;

    async fn update_avatar(&self, username: &str, file: Upload) -> Result<User, ApiError>;

    async fn conversations(
        &self,
        user: &str,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, ApiError>;

    async fn history(&self, user1: &str, user2: &str, limit: u32)
    -> Result<Vec<Message>, ApiError>;

    async fn send_message(&self, message: OutgoingMessage) -> Result<Message, ApiError>;

    async fn block(&self, blocker: &str, blocked: &str) -> Result<(), ApiError>;

    async fn unblock(&self, blocker: &str, blocked: &str) -> Result<(), ApiError>;

    async fn block_status(&self, user1: &str, user2: &str) -> Result<BlockStatus, ApiError>;

    /// Liveness check (`/test`).
    async fn status(&self) -> Result<serde_json::Value, ApiError>;

    /// Resolve a server-relative media reference to a full URL.
    fn media_url(&self, reference: &str) -> String;
}
