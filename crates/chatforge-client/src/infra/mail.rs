use reqwest::Client;

use crate::config::MailConfig;
use crate::domain::repository::MailPort;
use crate::domain::types::OtpPurpose;
use crate::error::ClientError;

const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Email delivery via the EmailJS REST API. Fire-and-forget: the caller only
/// learns success or failure.
pub struct EmailJsMailer {
    client: Client,
    config: MailConfig,
}

impl EmailJsMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

fn render_message(purpose: OtpPurpose, code: &str) -> (String, String) {
    match purpose {
        OtpPurpose::Verify => (
            "Chatforge - Verify Your Email".to_owned(),
            format!(
                "Welcome to Chatforge!\n\n\
                 Your email verification code is:\n\n{code}\n\n\
                 This code expires in 10 minutes.\n\n\
                 If you didn't create an account, please ignore this email."
            ),
        ),
        OtpPurpose::Reset => (
            "Chatforge - Password Reset Code".to_owned(),
            format!(
                "Password Reset Request\n\n\
                 You requested to reset your password.\n\n\
                 Your reset code is:\n\n{code}\n\n\
                 This code expires in 10 minutes.\n\n\
                 If you didn't request this, please ignore this email."
            ),
        ),
    }
}

impl MailPort for EmailJsMailer {
    async fn send_code(
        &self,
        recipient: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), ClientError> {
        let (subject, message) = render_message(purpose, code);
        let to_name = recipient.split('@').next().unwrap_or(recipient);

        let payload = serde_json::json!({
            "service_id": self.config.service_id,
            "template_id": self.config.template_id,
            "user_id": self.config.public_key,
            "template_params": {
                "to_email": recipient,
                "to_name": to_name,
                "from_name": "Chatforge",
                "reply_to": "noreply@chatforge.dev",
                "code": code,
                "subject": subject,
                "message": message,
            },
        });

        let resp = self
            .client
            .post(EMAILJS_ENDPOINT)
            .json(&payload)
            .send()
            .await
            .map_err(|_| ClientError::Delivery)?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Delivery)
        }
    }
}
