use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::domain::repository::{AuthApi, BotApi, ChatApi, LoginOutcome, QueryReply};
use crate::domain::types::{Bot, Exchange, Identity, Session};
use crate::error::ClientError;

/// Backend HTTP client. All request/response bodies are opaque JSON beyond
/// the fields named by the wire DTOs below.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// ── Wire DTOs ────────────────────────────────────────────────────────────────

/// Ids arrive as strings or numbers depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    #[serde(default)]
    needs_verification: bool,
}

#[derive(Deserialize)]
struct SessionBody {
    token: String,
    user: Identity,
}

#[derive(Deserialize)]
struct HistoryBody {
    #[serde(default)]
    history: Vec<ExchangeDto>,
}

#[derive(Deserialize)]
struct ExchangeDto {
    id: WireId,
    query: String,
    response: String,
    timestamp: String,
}

#[derive(Deserialize)]
struct QueryBody {
    response: String,
    chat_id: WireId,
}

#[derive(Deserialize)]
struct OrganizationDto {
    id: WireId,
    name: String,
    description: Option<String>,
    created_at: String,
    location: Option<String>,
    #[serde(default)]
    message_count: u64,
}

impl From<OrganizationDto> for Bot {
    fn from(org: OrganizationDto) -> Self {
        Bot {
            id: org.id.into_string(),
            name: org.name,
            description: org.description.unwrap_or_default(),
            created_at: org.created_at,
            location: org.location.unwrap_or_else(|| "Global".to_owned()),
            message_count: org.message_count,
        }
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

fn transport(_: reqwest::Error) -> ClientError {
    // The request threw before a response arrived.
    ClientError::Network
}

async fn backend_error(resp: Response) -> ClientError {
    let status = resp.status().as_u16();
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);
    ClientError::Backend { status, message }
}

/// Shared non-2xx handling for bearer-authenticated calls: 401 destroys the
/// caller's session via `AuthExpired`, everything else is a `Backend` error.
async fn check_authed(resp: Response) -> Result<Response, ClientError> {
    if resp.status() == StatusCode::UNAUTHORIZED {
        return Err(ClientError::AuthExpired);
    }
    if !resp.status().is_success() {
        return Err(backend_error(resp).await);
    }
    Ok(resp)
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    if !resp.status().is_success() {
        return Err(backend_error(resp).await);
    }
    Ok(resp)
}

fn parse(e: reqwest::Error) -> ClientError {
    ClientError::Internal(anyhow::anyhow!("unexpected response shape: {e}"))
}

// ── AuthApi ──────────────────────────────────────────────────────────────────

impl AuthApi for HttpBackend {
    async fn register(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        check(resp).await?;
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            let body = resp.json::<ErrorBody>().await.unwrap_or(ErrorBody {
                error: None,
                needs_verification: false,
            });
            return Ok(LoginOutcome::Denied {
                message: body.error,
                needs_verification: body.needs_verification,
            });
        }

        let body: SessionBody = resp.json().await.map_err(parse)?;
        Ok(LoginOutcome::Success(Session {
            token: body.token,
            user: body.user,
        }))
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/verify-otp"))
            .json(&serde_json::json!({ "email": email, "code": code }))
            .send()
            .await
            .map_err(transport)?;
        let body: SessionBody = check(resp).await?.json().await.map_err(parse)?;
        Ok(Session {
            token: body.token,
            user: body.user,
        })
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/reset-password"))
            .json(&serde_json::json!({
                "email": email,
                "code": code,
                "new_password": new_password,
            }))
            .send()
            .await
            .map_err(transport)?;
        check(resp).await?;
        Ok(())
    }

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/change-password"))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "current_password": current_password,
                "new_password": new_password,
            }))
            .send()
            .await
            .map_err(transport)?;
        check_authed(resp).await?;
        Ok(())
    }
}

// ── ChatApi ──────────────────────────────────────────────────────────────────

impl ChatApi for HttpBackend {
    async fn chat_history(&self, token: &str, bot_id: &str) -> Result<Vec<Exchange>, ClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/bot/{bot_id}/chat-history")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let body: HistoryBody = check_authed(resp).await?.json().await.map_err(parse)?;
        Ok(body
            .history
            .into_iter()
            .map(|e| Exchange {
                id: e.id.into_string(),
                query: e.query,
                response: e.response,
                timestamp: e.timestamp,
            })
            .collect())
    }

    async fn query(
        &self,
        token: &str,
        bot_id: &str,
        text: &str,
    ) -> Result<QueryReply, ClientError> {
        let resp = self
            .client
            .post(self.url(&format!("/query/{bot_id}")))
            .bearer_auth(token)
            .json(&serde_json::json!({ "query": text }))
            .send()
            .await
            .map_err(transport)?;
        let body: QueryBody = check_authed(resp).await?.json().await.map_err(parse)?;
        Ok(QueryReply {
            response: body.response,
            exchange_id: body.chat_id.into_string(),
        })
    }

    async fn delete_exchange(&self, token: &str, exchange_id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/chat-history/{exchange_id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        check_authed(resp).await?;
        Ok(())
    }

    async fn clear_history(&self, token: &str, bot_id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/bot/{bot_id}/chat-history")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        check_authed(resp).await?;
        Ok(())
    }
}

// ── BotApi ───────────────────────────────────────────────────────────────────

impl BotApi for HttpBackend {
    async fn list_bots(&self, token: &str) -> Result<Vec<Bot>, ClientError> {
        let resp = self
            .client
            .get(self.url("/organizations"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let orgs: Vec<OrganizationDto> = check_authed(resp).await?.json().await.map_err(parse)?;
        Ok(orgs.into_iter().map(Bot::from).collect())
    }

    async fn create_bot(
        &self,
        token: &str,
        name: &str,
        description: &str,
        context_text: &str,
    ) -> Result<Bot, ClientError> {
        let resp = self
            .client
            .post(self.url("/create-bot"))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "name": name,
                "description": description,
                "context_text": context_text,
            }))
            .send()
            .await
            .map_err(transport)?;
        let org: OrganizationDto = check_authed(resp).await?.json().await.map_err(parse)?;
        Ok(org.into())
    }

    async fn delete_bot(&self, token: &str, bot_id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/bot/{bot_id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        check_authed(resp).await?;
        Ok(())
    }

    async fn export_bot(
        &self,
        token: &str,
        bot_id: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/bot/{bot_id}/export")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        check_authed(resp).await?.json().await.map_err(parse)
    }

    async fn import_bot(&self, token: &str, doc: &serde_json::Value) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url("/bot/import"))
            .bearer_auth(token)
            .json(doc)
            .send()
            .await
            .map_err(transport)?;
        check_authed(resp).await?;
        Ok(())
    }
}
