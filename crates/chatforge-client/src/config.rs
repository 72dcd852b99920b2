use std::path::PathBuf;

use url::Url;

/// EmailJS delivery credentials.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// EmailJS service id. Env var: `EMAILJS_SERVICE_ID`.
    pub service_id: String,
    /// EmailJS template id. Env var: `EMAILJS_TEMPLATE_ID`.
    pub template_id: String,
    /// EmailJS public key. Env var: `EMAILJS_PUBLIC_KEY`.
    pub public_key: String,
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL (default `http://localhost:5050/api`).
    /// Env var: `CHATFORGE_API_URL`.
    pub api_base_url: String,
    /// Directory for durable client state such as the credential session
    /// (default `.chatforge`). Env var: `CHATFORGE_STATE_DIR`.
    pub state_dir: PathBuf,
    pub mail: MailConfig,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("CHATFORGE_API_URL")
            .unwrap_or_else(|_| "http://localhost:5050/api".to_owned());
        Url::parse(&api_base_url).expect("CHATFORGE_API_URL must be an absolute URL");

        Self {
            api_base_url,
            state_dir: std::env::var("CHATFORGE_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".chatforge")),
            mail: MailConfig {
                service_id: std::env::var("EMAILJS_SERVICE_ID").expect("EMAILJS_SERVICE_ID"),
                template_id: std::env::var("EMAILJS_TEMPLATE_ID").expect("EMAILJS_TEMPLATE_ID"),
                public_key: std::env::var("EMAILJS_PUBLIC_KEY").expect("EMAILJS_PUBLIC_KEY"),
            },
        }
    }
}
