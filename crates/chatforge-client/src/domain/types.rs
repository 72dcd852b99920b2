use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator for one-time codes. A code issued for one action can never
/// be replayed for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Verify,
    Reset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Reset => "reset",
        }
    }
}

/// One pending one-time code for a `(recipient, purpose)` pair.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub recipient: String,
    pub purpose: OtpPurpose,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Account profile returned by the backend on login / verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub is_verified: bool,
    pub tier: String,
    pub created_at: String,
}

/// Authenticated session. Token and identity live in one struct so partial
/// session state is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// Whether a message has been stored server-side. Deletion requires the
/// server-assigned exchange id, so eligibility is a type-level fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Pending,
    Persisted { exchange_id: String },
}

/// One row of the active chat set. A user message and its paired bot response
/// share an exchange id once the backend has stored the exchange.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub local_id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub persistence: Persistence,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            persistence: Persistence::Pending,
        }
    }

    pub fn exchange_id(&self) -> Option<&str> {
        match &self.persistence {
            Persistence::Persisted { exchange_id } => Some(exchange_id),
            Persistence::Pending => None,
        }
    }
}

/// One persisted exchange as returned by the backend history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

/// A chatbot as listed on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub location: String,
    pub message_count: u64,
}

/// One-time code length in digits.
pub const OTP_LEN: usize = 6;

/// One-time code time-to-live.
pub fn otp_ttl() -> Duration {
    Duration::minutes(10)
}

/// Resend cooldown in seconds.
pub const RESEND_COOLDOWN_SECS: u64 = 60;

/// Visual settle delay before a deletion request is issued.
pub const SETTLE_DELAY: std::time::Duration = std::time::Duration::from_millis(800);

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Synthetic greeting shown when a bot has no stored history.
pub const WELCOME_MESSAGE: &str = "Hello! I'm here to help. How can I assist you today?";

/// Tag field required on exported bot documents.
pub const EXPORT_TAG: &str = "chatforge_export";
