use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatforge_client::domain::types::{Exchange, Persistence, Role, WELCOME_MESSAGE};
use chatforge_client::error::ClientError;
use chatforge_client::session::SessionHandle;
use chatforge_client::usecase::chat::ChatSession;

use crate::helpers::{MemorySessionStore, MockChatApi, test_session};

const ALICE: &str = "alice@example.com";
const BOT: &str = "bot-1";

type Deltas = Arc<Mutex<Vec<(String, i64)>>>;

fn authed_session() -> Arc<SessionHandle<MemorySessionStore>> {
    let session = Arc::new(SessionHandle::restore(MemorySessionStore::default()));
    session.establish(test_session(ALICE)).unwrap();
    session
}

fn chat_session(api: MockChatApi) -> (ChatSession<MockChatApi, MemorySessionStore>, Deltas) {
    let deltas: Deltas = Arc::default();
    let handle = Arc::clone(&deltas);
    let session = ChatSession::new(BOT, Arc::new(api), authed_session(), move |bot_id, delta| {
        handle.lock().unwrap().push((bot_id.to_owned(), delta));
    });
    (session, deltas)
}

fn exchange(id: &str, query: &str, response: &str, timestamp: &str) -> Exchange {
    Exchange {
        id: id.to_owned(),
        query: query.to_owned(),
        response: response.to_owned(),
        timestamp: timestamp.to_owned(),
    }
}

// ── History ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_materialize_history_in_chronological_pairs() {
    // Newest first, as the backend returns it.
    let api = MockChatApi::with_history(vec![
        exchange("ex-b", "second question", "second answer", "2026-03-01T11:00:00"),
        exchange("ex-a", "first question", "first answer", "2026-03-01T10:00:00"),
    ]);
    let (chat, _) = chat_session(api);

    chat.load_history().await.unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "first question");
    assert_eq!(messages[1].role, Role::Bot);
    assert_eq!(messages[1].content, "first answer");
    assert_eq!(messages[2].content, "second question");
    assert_eq!(messages[3].content, "second answer");

    // Both halves of a pair carry the exchange id.
    assert_eq!(messages[0].exchange_id(), Some("ex-a"));
    assert_eq!(messages[1].exchange_id(), Some("ex-a"));
    assert_eq!(messages[2].exchange_id(), Some("ex-b"));
    assert_eq!(messages[3].exchange_id(), Some("ex-b"));
}

#[tokio::test]
async fn should_show_welcome_message_for_empty_history() {
    let (chat, _) = chat_session(MockChatApi::default());

    chat.load_history().await.unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Bot);
    assert_eq!(messages[0].content, WELCOME_MESSAGE);
    assert_eq!(messages[0].exchange_id(), None);
}

#[tokio::test]
async fn should_fall_back_to_welcome_and_surface_history_failure() {
    let api = MockChatApi {
        fail_history: true,
        ..MockChatApi::default()
    };
    let (chat, _) = chat_session(api);

    let err = chat.load_history().await.unwrap_err();
    assert_eq!(err.kind(), "BACKEND");

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, WELCOME_MESSAGE);
}

// ── Send ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_back_fill_exchange_id_and_count_two_on_send() {
    let (chat, deltas) = chat_session(MockChatApi::default());

    chat.send("hello").await.unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].exchange_id(), Some("ex-0"));
    assert_eq!(messages[1].role, Role::Bot);
    assert_eq!(messages[1].content, "echo: hello");
    assert_eq!(messages[1].exchange_id(), Some("ex-0"));

    assert_eq!(deltas.lock().unwrap().as_slice(), &[(BOT.to_owned(), 2)]);
}

#[tokio::test]
async fn should_back_fill_the_right_message_when_text_repeats() {
    let (chat, _) = chat_session(MockChatApi::default());

    chat.send("same words").await.unwrap();
    chat.send("same words").await.unwrap();

    // Identical content, distinct exchanges: back-fill goes by identity,
    // not by text.
    let messages = chat.snapshot();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].exchange_id(), Some("ex-0"));
    assert_eq!(messages[2].exchange_id(), Some("ex-1"));
    assert_ne!(messages[0].local_id, messages[2].local_id);
}

#[tokio::test]
async fn should_ignore_whitespace_only_input() {
    let (chat, deltas) = chat_session(MockChatApi::default());

    chat.send("   \n\t").await.unwrap();

    assert!(chat.snapshot().is_empty());
    assert!(deltas.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_append_error_reply_and_keep_user_message_pending_on_query_failure() {
    let api = MockChatApi {
        fail_query: true,
        ..MockChatApi::default()
    };
    let (chat, deltas) = chat_session(api);

    chat.send("hello").await.unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert!(matches!(messages[0].persistence, Persistence::Pending));
    assert_eq!(messages[1].role, Role::Bot);
    assert_eq!(
        messages[1].content,
        "Sorry, I encountered an error: backend exploded"
    );
    assert!(matches!(messages[1].persistence, Persistence::Pending));

    // The failed exchange never reached the backend's count.
    assert!(deltas.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_show_user_message_while_query_is_in_flight() {
    let api = MockChatApi {
        query_delay: Duration::from_millis(150),
        ..MockChatApi::default()
    };
    let (chat, _) = chat_session(api);

    let sender = chat.clone();
    let in_flight = tokio::spawn(async move { sender.send("hello").await });

    // Let the send run up to its network await.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    let messages = chat.snapshot();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");
    assert!(matches!(messages[0].persistence, Persistence::Pending));

    in_flight.await.unwrap().unwrap();
    let messages = chat.snapshot();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].exchange_id(), Some("ex-0"));
}

#[tokio::test]
async fn should_refuse_to_send_without_a_session() {
    let unauthed = Arc::new(SessionHandle::restore(MemorySessionStore::default()));
    let chat: ChatSession<MockChatApi, MemorySessionStore> =
        ChatSession::new(BOT, Arc::new(MockChatApi::default()), unauthed, |_, _| {});

    let err = chat.send("hello").await.unwrap_err();
    assert!(matches!(err, ClientError::AuthExpired));
    assert!(chat.snapshot().is_empty());
}

// ── Deletion ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn should_remove_both_halves_on_delete() {
    let api = MockChatApi::with_history(vec![
        exchange("ex-b", "q2", "a2", "2026-03-01T11:00:00"),
        exchange("ex-a", "q1", "a1", "2026-03-01T10:00:00"),
    ]);
    let deleted = Arc::clone(&api.deleted);
    let (chat, deltas) = chat_session(api);
    chat.load_history().await.unwrap();

    chat.delete_one("ex-a").await.unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.exchange_id() == Some("ex-b")));
    assert!(chat.pending_removal().is_empty());
    assert_eq!(deleted.lock().unwrap().as_slice(), &["ex-a".to_owned()]);
    assert_eq!(deltas.lock().unwrap().as_slice(), &[(BOT.to_owned(), -2)]);
}

#[tokio::test(start_paused = true)]
async fn should_restore_pair_when_delete_fails() {
    let api = MockChatApi {
        history: Mutex::new(vec![exchange("ex-a", "q1", "a1", "2026-03-01T10:00:00")]),
        fail_delete_ids: ["ex-a".to_owned()].into_iter().collect(),
        ..MockChatApi::default()
    };
    let (chat, deltas) = chat_session(api);
    chat.load_history().await.unwrap();

    let err = chat.delete_one("ex-a").await.unwrap_err();
    assert_eq!(err.kind(), "BACKEND");

    // The pair survives and the removal mark is withdrawn.
    assert_eq!(chat.snapshot().len(), 2);
    assert!(chat.pending_removal().is_empty());
    assert!(deltas.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_delete_selection_and_count_each_pair() {
    let api = MockChatApi::with_history(vec![
        exchange("ex-c", "q3", "a3", "2026-03-01T12:00:00"),
        exchange("ex-b", "q2", "a2", "2026-03-01T11:00:00"),
        exchange("ex-a", "q1", "a1", "2026-03-01T10:00:00"),
    ]);
    let (chat, deltas) = chat_session(api);
    chat.load_history().await.unwrap();

    chat.delete_many(&["ex-a".to_owned(), "ex-c".to_owned()])
        .await
        .unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.exchange_id() == Some("ex-b")));
    assert_eq!(deltas.lock().unwrap().as_slice(), &[(BOT.to_owned(), -4)]);
}

#[tokio::test(start_paused = true)]
async fn should_keep_only_failed_pairs_on_partial_bulk_delete() {
    let api = MockChatApi {
        history: Mutex::new(vec![
            exchange("ex-c", "q3", "a3", "2026-03-01T12:00:00"),
            exchange("ex-b", "q2", "a2", "2026-03-01T11:00:00"),
            exchange("ex-a", "q1", "a1", "2026-03-01T10:00:00"),
        ]),
        fail_delete_ids: ["ex-b".to_owned()].into_iter().collect(),
        ..MockChatApi::default()
    };
    let (chat, deltas) = chat_session(api);
    chat.load_history().await.unwrap();

    let err = chat
        .delete_many(&["ex-a".to_owned(), "ex-b".to_owned(), "ex-c".to_owned()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "BACKEND");

    // The two successful deletes took effect; the failed pair is restored.
    let messages = chat.snapshot();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.exchange_id() == Some("ex-b")));
    assert!(chat.pending_removal().is_empty());
    assert_eq!(deltas.lock().unwrap().as_slice(), &[(BOT.to_owned(), -4)]);
}

#[tokio::test]
async fn should_reset_to_welcome_on_clear() {
    let api = MockChatApi::with_history(vec![
        exchange("ex-b", "q2", "a2", "2026-03-01T11:00:00"),
        exchange("ex-a", "q1", "a1", "2026-03-01T10:00:00"),
    ]);
    let cleared = Arc::clone(&api.cleared);
    let (chat, deltas) = chat_session(api);
    chat.load_history().await.unwrap();

    chat.clear_history().await.unwrap();

    let messages = chat.snapshot();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, WELCOME_MESSAGE);
    assert_eq!(cleared.lock().unwrap().as_slice(), &[BOT.to_owned()]);
    assert_eq!(deltas.lock().unwrap().as_slice(), &[(BOT.to_owned(), -3)]);
}
