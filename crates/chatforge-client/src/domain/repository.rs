#![allow(async_fn_in_trait)]

use crate::domain::types::{Bot, Exchange, OtpPurpose, Session};
use crate::error::ClientError;

/// Result of a login attempt. A denial is not a transport failure: the
/// backend answered, refused, and may have flagged the account as unverified.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(Session),
    Denied {
        message: Option<String>,
        needs_verification: bool,
    },
}

/// Backend reply to a chat query: the bot's response plus the id under which
/// the exchange (user query + bot response) was persisted.
#[derive(Debug, Clone)]
pub struct QueryReply {
    pub response: String,
    pub exchange_id: String,
}

/// Port for the backend's unauthenticated and credential endpoints.
pub trait AuthApi: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<(), ClientError>;
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ClientError>;

    /// Mark the account verified and obtain a session. Only called after the
    /// code has been validated locally.
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, ClientError>;

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ClientError>;

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError>;
}

/// Port for per-bot chat endpoints (all bearer-authenticated).
pub trait ChatApi: Send + Sync {
    /// Fetch the persisted exchange history, newest first (backend order).
    async fn chat_history(&self, token: &str, bot_id: &str) -> Result<Vec<Exchange>, ClientError>;

    async fn query(&self, token: &str, bot_id: &str, text: &str)
    -> Result<QueryReply, ClientError>;

    /// Delete one exchange pair by its server-assigned id.
    async fn delete_exchange(&self, token: &str, exchange_id: &str) -> Result<(), ClientError>;

    /// Delete every exchange for a bot.
    async fn clear_history(&self, token: &str, bot_id: &str) -> Result<(), ClientError>;
}

/// Port for dashboard bot management (all bearer-authenticated).
pub trait BotApi: Send + Sync {
    async fn list_bots(&self, token: &str) -> Result<Vec<Bot>, ClientError>;

    async fn create_bot(
        &self,
        token: &str,
        name: &str,
        description: &str,
        context_text: &str,
    ) -> Result<Bot, ClientError>;

    async fn delete_bot(&self, token: &str, bot_id: &str) -> Result<(), ClientError>;

    async fn export_bot(&self, token: &str, bot_id: &str)
    -> Result<serde_json::Value, ClientError>;

    async fn import_bot(&self, token: &str, doc: &serde_json::Value) -> Result<(), ClientError>;
}

/// Port for the external email delivery collaborator. Fire-and-forget:
/// reports only success or failure.
pub trait MailPort: Send + Sync {
    async fn send_code(
        &self,
        recipient: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), ClientError>;
}

/// Durable storage for the credential session. Read once at startup, written
/// only by login/logout/registration-completion paths.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}
