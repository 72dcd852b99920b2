use std::sync::Arc;

use rand::RngExt;

use crate::domain::repository::MailPort;
use crate::domain::types::{OtpPurpose, otp_ttl};
use crate::error::ClientError;
use crate::otp::store::OtpStore;

/// Generate a 6-digit code. Drawn from 100000–999999 so the decimal rendering
/// never loses a leading zero.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000..=999_999u32).to_string()
}

/// Generates codes, records them in the store, and hands them to the external
/// delivery collaborator.
pub struct OtpIssuer<M: MailPort> {
    pub store: Arc<OtpStore>,
    pub mailer: M,
}

impl<M: MailPort> OtpIssuer<M> {
    /// Issue a fresh code for the pair, overwriting any prior unconsumed one.
    ///
    /// The store write happens before the delivery call so a verification
    /// attempt racing the send cannot fail spuriously. On delivery failure the
    /// stored code remains valid; an explicit resend regenerates regardless.
    pub async fn issue(&self, recipient: &str, purpose: OtpPurpose) -> Result<(), ClientError> {
        let code = generate_code();
        self.store.put(recipient, purpose, &code, otp_ttl());
        self.mailer.send_code(recipient, purpose, &code).await
    }
}
