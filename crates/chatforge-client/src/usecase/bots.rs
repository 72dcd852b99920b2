use std::sync::{Arc, Mutex};

use crate::domain::repository::{BotApi, SessionStore};
use crate::domain::types::{Bot, EXPORT_TAG};
use crate::error::ClientError;
use crate::session::SessionHandle;

/// Dashboard bot list with a session-scoped cache of aggregate counts.
///
/// The cache serves stale data while a refresh is in flight and absorbs the
/// message-count deltas reported by [`crate::usecase::chat::ChatSession`].
pub struct Dashboard<B, S>
where
    B: BotApi,
    S: SessionStore,
{
    backend: Arc<B>,
    session: Arc<SessionHandle<S>>,
    cache: Mutex<Option<Vec<Bot>>>,
}

impl<B, S> Dashboard<B, S>
where
    B: BotApi,
    S: SessionStore,
{
    pub fn new(backend: Arc<B>, session: Arc<SessionHandle<S>>) -> Self {
        Self {
            backend,
            session,
            cache: Mutex::new(None),
        }
    }

    fn on_backend_error(&self, e: ClientError) -> ClientError {
        if matches!(e, ClientError::AuthExpired) {
            let _ = self.session.destroy();
        }
        e
    }

    /// Last fetched list, if any.
    pub fn cached(&self) -> Option<Vec<Bot>> {
        self.cache.lock().unwrap().clone()
    }

    /// Fetch the bot list and replace the cache.
    pub async fn refresh(&self) -> Result<Vec<Bot>, ClientError> {
        let token = self.session.require_token()?;
        let bots = self
            .backend
            .list_bots(&token)
            .await
            .map_err(|e| self.on_backend_error(e))?;
        *self.cache.lock().unwrap() = Some(bots.clone());
        Ok(bots)
    }

    /// Serve the cache when warm, otherwise fetch.
    pub async fn list(&self) -> Result<Vec<Bot>, ClientError> {
        if let Some(bots) = self.cached() {
            return Ok(bots);
        }
        self.refresh().await
    }

    /// Apply a message-count delta reported by a chat session. Clamped at
    /// zero; unknown bot ids are ignored (the next refresh reconciles).
    pub fn apply_message_delta(&self, bot_id: &str, delta: i64) {
        let mut cache = self.cache.lock().unwrap();
        if let Some(bots) = cache.as_mut() {
            if let Some(bot) = bots.iter_mut().find(|b| b.id == bot_id) {
                bot.message_count = bot.message_count.saturating_add_signed(delta);
            }
        }
    }

    pub fn total_messages(&self) -> u64 {
        self.cached()
            .map(|bots| bots.iter().map(|b| b.message_count).sum())
            .unwrap_or(0)
    }

    pub async fn create_bot(
        &self,
        name: &str,
        description: &str,
        context_text: &str,
    ) -> Result<Bot, ClientError> {
        let token = self.session.require_token()?;
        let bot = self
            .backend
            .create_bot(&token, name, description, context_text)
            .await
            .map_err(|e| self.on_backend_error(e))?;
        if let Some(bots) = self.cache.lock().unwrap().as_mut() {
            bots.push(bot.clone());
        }
        Ok(bot)
    }

    pub async fn delete_bot(&self, bot_id: &str) -> Result<(), ClientError> {
        let token = self.session.require_token()?;
        self.backend
            .delete_bot(&token, bot_id)
            .await
            .map_err(|e| self.on_backend_error(e))?;
        if let Some(bots) = self.cache.lock().unwrap().as_mut() {
            bots.retain(|b| b.id != bot_id);
        }
        Ok(())
    }

    pub async fn export_bot(&self, bot_id: &str) -> Result<serde_json::Value, ClientError> {
        let token = self.session.require_token()?;
        self.backend
            .export_bot(&token, bot_id)
            .await
            .map_err(|e| self.on_backend_error(e))
    }

    /// Validate the export tag locally before the upload; a mistagged file
    /// never reaches the network.
    pub async fn import_bot(&self, doc: &serde_json::Value) -> Result<(), ClientError> {
        if doc.get("type").and_then(|v| v.as_str()) != Some(EXPORT_TAG) {
            return Err(ClientError::Validation(
                "Invalid export file".to_owned(),
            ));
        }
        let token = self.session.require_token()?;
        self.backend
            .import_bot(&token, doc)
            .await
            .map_err(|e| self.on_backend_error(e))?;
        // The imported bot's id is server-assigned; refetch to pick it up.
        self.refresh().await.map(|_| ())
    }
}
