/// Client error variants. Every flow boundary converts these into a
/// user-facing notification via [`ClientError::user_message`]; none escape
/// a flow uncaught.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Local format check failed. Never reaches the network.
    #[error("{0}")]
    Validation(String),
    /// The email delivery collaborator reported failure.
    #[error("failed to send email")]
    Delivery,
    /// Non-2xx response from the backend.
    #[error("backend error ({status})")]
    Backend { status: u16, message: Option<String> },
    /// The request failed before a response arrived.
    #[error("network error")]
    Network,
    /// 401 on an authenticated call. Caller clears the credential session.
    #[error("session expired")]
    AuthExpired,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Delivery => "DELIVERY",
            Self::Backend { .. } => "BACKEND",
            Self::Network => "NETWORK",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// User-facing notification text. Backend messages are surfaced verbatim
    /// when the response body carried one; everything else gets a generic line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Delivery => "Failed to send email. Please try again.".to_owned(),
            Self::Backend {
                message: Some(msg), ..
            } => msg.clone(),
            Self::Backend { message: None, .. } => "Something went wrong. Please try again.".to_owned(),
            Self::Network => "Network error. Please try again.".to_owned(),
            Self::AuthExpired => "Your session has expired. Please log in again.".to_owned(),
            Self::Internal(_) => "Something went wrong. Please try again.".to_owned(),
        }
    }
}
