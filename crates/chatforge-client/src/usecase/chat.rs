use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::warn;

use crate::domain::repository::{ChatApi, SessionStore};
use crate::domain::types::{
    ChatMessage, Exchange, Persistence, Role, SETTLE_DELAY, WELCOME_MESSAGE,
};
use crate::error::ClientError;
use crate::session::SessionHandle;

/// Delta-accounting callback: `(bot_id, message_count_delta)`. Keeps the
/// dashboard aggregate in sync with every mutating chat operation.
pub type DeltaFn = dyn Fn(&str, i64) + Send + Sync;

/// Per-bot message list with optimistic send and settle-delayed deletion.
///
/// The active set lives behind a shared lock so a cloned handle observes the
/// optimistic append while the network call is still in flight.
pub struct ChatSession<C, S>
where
    C: ChatApi,
    S: SessionStore,
{
    bot_id: String,
    backend: Arc<C>,
    session: Arc<SessionHandle<S>>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    pending_removal: Arc<Mutex<HashSet<String>>>,
    on_delta: Arc<DeltaFn>,
}

impl<C, S> Clone for ChatSession<C, S>
where
    C: ChatApi,
    S: SessionStore,
{
    fn clone(&self) -> Self {
        Self {
            bot_id: self.bot_id.clone(),
            backend: Arc::clone(&self.backend),
            session: Arc::clone(&self.session),
            messages: Arc::clone(&self.messages),
            pending_removal: Arc::clone(&self.pending_removal),
            on_delta: Arc::clone(&self.on_delta),
        }
    }
}

fn welcome() -> ChatMessage {
    ChatMessage::new(Role::Bot, WELCOME_MESSAGE)
}

/// Backend timestamps come without a zone suffix; treat them as UTC.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    let candidate = if raw.ends_with('Z') {
        raw.to_owned()
    } else {
        format!("{raw}Z")
    };
    candidate
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|_| Utc::now())
}

impl<C, S> ChatSession<C, S>
where
    C: ChatApi,
    S: SessionStore,
{
    pub fn new(
        bot_id: impl Into<String>,
        backend: Arc<C>,
        session: Arc<SessionHandle<S>>,
        on_delta: impl Fn(&str, i64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            bot_id: bot_id.into(),
            backend,
            session,
            messages: Arc::new(Mutex::new(Vec::new())),
            pending_removal: Arc::new(Mutex::new(HashSet::new())),
            on_delta: Arc::new(on_delta),
        }
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn pending_removal(&self) -> HashSet<String> {
        self.pending_removal.lock().unwrap().clone()
    }

    fn emit_delta(&self, delta: i64) {
        (self.on_delta)(&self.bot_id, delta);
    }

    fn on_backend_error(&self, e: ClientError) -> ClientError {
        if matches!(e, ClientError::AuthExpired) {
            let _ = self.session.destroy();
        }
        e
    }

    /// Replace the active set with the persisted history in chronological
    /// order: one user and one bot message per exchange, sharing its id.
    /// An empty history or a failed fetch leaves the synthetic welcome
    /// message (the error, if any, is still surfaced to the caller).
    pub async fn load_history(&self) -> Result<(), ClientError> {
        let token = self.session.require_token()?;

        match self.backend.chat_history(&token, &self.bot_id).await {
            Ok(exchanges) => {
                let loaded = Self::materialize(exchanges);
                let mut messages = self.messages.lock().unwrap();
                *messages = if loaded.is_empty() { vec![welcome()] } else { loaded };
                Ok(())
            }
            Err(e) => {
                *self.messages.lock().unwrap() = vec![welcome()];
                Err(self.on_backend_error(e))
            }
        }
    }

    fn materialize(exchanges: Vec<Exchange>) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(exchanges.len() * 2);
        // Backend returns newest first; reverse into chronological order.
        for entry in exchanges.into_iter().rev() {
            let timestamp = parse_timestamp(&entry.timestamp);
            let persisted = Persistence::Persisted {
                exchange_id: entry.id.clone(),
            };
            out.push(ChatMessage {
                local_id: uuid::Uuid::new_v4(),
                role: Role::User,
                content: entry.query,
                timestamp,
                persistence: persisted.clone(),
            });
            out.push(ChatMessage {
                local_id: uuid::Uuid::new_v4(),
                role: Role::Bot,
                content: entry.response,
                timestamp,
                persistence: persisted,
            });
        }
        out
    }

    /// Optimistically append the user message, then query the backend.
    ///
    /// On success the exchange id is back-filled on the user message (matched
    /// by local id, never by content) and the bot response is appended; the
    /// aggregate gains two rows. On failure a bot-authored error message is
    /// appended instead and the user message stays pending (not deletable).
    pub async fn send(&self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let token = self.session.require_token()?;

        let user_message = ChatMessage::new(Role::User, text);
        let user_local_id = user_message.local_id;
        self.messages.lock().unwrap().push(user_message);

        match self.backend.query(&token, &self.bot_id, text).await {
            Ok(reply) => {
                let mut messages = self.messages.lock().unwrap();
                if let Some(sent) = messages.iter_mut().find(|m| m.local_id == user_local_id) {
                    sent.persistence = Persistence::Persisted {
                        exchange_id: reply.exchange_id.clone(),
                    };
                }
                let mut bot_message = ChatMessage::new(Role::Bot, reply.response);
                bot_message.persistence = Persistence::Persisted {
                    exchange_id: reply.exchange_id,
                };
                messages.push(bot_message);
                drop(messages);
                self.emit_delta(2);
                Ok(())
            }
            Err(e) => {
                let e = self.on_backend_error(e);
                warn!(kind = e.kind(), bot_id = %self.bot_id, "query failed");
                self.messages.lock().unwrap().push(ChatMessage::new(
                    Role::Bot,
                    format!("Sorry, I encountered an error: {}", e.user_message()),
                ));
                Ok(())
            }
        }
    }

    /// Delete one exchange pair: mark it for removal, hold for the visual
    /// settle delay, then confirm with the backend. A failed delete restores
    /// the pair untouched.
    pub async fn delete_one(&self, exchange_id: &str) -> Result<(), ClientError> {
        let token = self.session.require_token()?;

        self.pending_removal
            .lock()
            .unwrap()
            .insert(exchange_id.to_owned());
        tokio::time::sleep(SETTLE_DELAY).await;

        match self.backend.delete_exchange(&token, exchange_id).await {
            Ok(()) => {
                self.remove_exchanges(&[exchange_id.to_owned()]);
                self.emit_delta(-2);
                Ok(())
            }
            Err(e) => {
                self.pending_removal.lock().unwrap().remove(exchange_id);
                Err(self.on_backend_error(e))
            }
        }
    }

    /// Bulk delete: one settle delay for the whole selection, then all
    /// backend deletes issued concurrently. Each call's outcome is tracked
    /// individually — only pairs whose delete succeeded leave the set, and
    /// pending-removal marks are restored only on the failures.
    pub async fn delete_many(&self, exchange_ids: &[String]) -> Result<(), ClientError> {
        if exchange_ids.is_empty() {
            return Ok(());
        }
        let token = self.session.require_token()?;

        {
            let mut pending = self.pending_removal.lock().unwrap();
            for id in exchange_ids {
                pending.insert(id.clone());
            }
        }
        tokio::time::sleep(SETTLE_DELAY).await;

        let results = join_all(
            exchange_ids
                .iter()
                .map(|id| self.backend.delete_exchange(&token, id)),
        )
        .await;

        let mut succeeded = Vec::new();
        let mut first_failure = None;
        for (id, result) in exchange_ids.iter().zip(results) {
            match result {
                Ok(()) => succeeded.push(id.clone()),
                Err(e) => {
                    self.pending_removal.lock().unwrap().remove(id);
                    if first_failure.is_none() {
                        first_failure = Some(self.on_backend_error(e));
                    }
                }
            }
        }

        if !succeeded.is_empty() {
            self.remove_exchanges(&succeeded);
            self.emit_delta(-2 * succeeded.len() as i64);
        }

        match first_failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Delete every exchange for the bot and reset to the welcome message.
    pub async fn clear_history(&self) -> Result<(), ClientError> {
        let token = self.session.require_token()?;

        match self.backend.clear_history(&token, &self.bot_id).await {
            Ok(()) => {
                let removed = {
                    let mut messages = self.messages.lock().unwrap();
                    let previous = messages.len();
                    *messages = vec![welcome()];
                    previous.saturating_sub(1)
                };
                self.pending_removal.lock().unwrap().clear();
                if removed > 0 {
                    self.emit_delta(-(removed as i64));
                }
                Ok(())
            }
            Err(e) => Err(self.on_backend_error(e)),
        }
    }

    fn remove_exchanges(&self, exchange_ids: &[String]) {
        let mut messages = self.messages.lock().unwrap();
        messages.retain(|m| match m.exchange_id() {
            Some(id) => !exchange_ids.iter().any(|target| target == id),
            None => true,
        });
        let mut pending = self.pending_removal.lock().unwrap();
        for id in exchange_ids {
            pending.remove(id);
        }
    }
}
