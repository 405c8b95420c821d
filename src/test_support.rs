//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::{
    ApiError, BlockStatus, ChatApi, ConversationSummary, LoginRequest, Message, MessageBody,
    MessageKind, OutgoingMessage, RegisterRequest, Upload, User,
};
use crate::audio::{CaptureDevice, CaptureError, CaptureStream, CapturedAudio};
use crate::core::config::ResolvedConfig;
use crate::core::session::{MemorySessionStore, SessionStore};
use crate::core::state::App;

const EPOCH: i64 = 1_700_000_000;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(EPOCH + secs, 0).unwrap()
}

pub fn user(username: &str) -> User {
    User {
        id: 0,
        name: username.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        avatar: None,
    }
}

pub fn summary(username: &str) -> ConversationSummary {
    ConversationSummary { peer: user(username), last_message: None }
}

/// A text message `"message {id}"` sent `secs` after a fixed epoch.
pub fn message(id: i64, sender: &str, receiver: &str, secs: i64) -> Message {
    Message {
        id,
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        body: MessageBody::Text(format!("message {id}")),
        created_at: at(secs),
    }
}

// ============================================================================
// FakeApi: an in-memory Slash server
// ============================================================================

#[derive(Default)]
struct FakeServer {
    accounts: Vec<(User, String)>,
    messages: Vec<Message>,
    blocks: HashSet<(String, String)>,
    next_id: i64,
}

impl FakeServer {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn account(&self, username: &str) -> Option<&User> {
        self.accounts.iter().map(|(u, _)| u).find(|u| u.username == username)
    }

    fn between<'a>(&'a self, a: &'a str, b: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages.iter().filter(move |m| {
            (m.sender == a && m.receiver == b) || (m.sender == b && m.receiver == a)
        })
    }
}

#[derive(Default)]
pub struct FakeApi {
    server: Mutex<FakeServer>,
    calls: AtomicUsize,
}

fn api_error(status: u16, detail: &str) -> ApiError {
    ApiError::Api { status, detail: detail.to_string() }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of endpoint calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> std::sync::MutexGuard<'_, FakeServer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.server.lock().unwrap()
    }

    pub fn add_account(&self, username: &str, password: &str) -> User {
        let mut server = self.server.lock().unwrap();
        let mut account = user(username);
        account.id = server.next_id();
        server.accounts.push((account.clone(), password.to_string()));
        account
    }

    /// Put a text message on the server without counting a call.
    pub fn seed_text(&self, sender: &str, receiver: &str, text: &str) -> Message {
        let mut server = self.server.lock().unwrap();
        let id = server.next_id();
        let message = Message {
            id,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            body: MessageBody::Text(text.to_string()),
            created_at: at(id),
        };
        server.messages.push(message.clone());
        message
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let mut server = self.hit();
        if server.account(&request.username).is_some() {
            return Err(api_error(400, "Username already registered"));
        }
        let account = User {
            id: server.next_id(),
            name: request.name.clone(),
            username: request.username.clone(),
            email: request.email.clone(),
            avatar: None,
        };
        server.accounts.push((account.clone(), request.password.clone()));
        Ok(account)
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        let server = self.hit();
        server
            .accounts
            .iter()
            .find(|(u, password)| {
                (u.username == request.identifier || u.email == request.identifier)
                    && *password == request.password
            })
            .map(|(u, _)| u.clone())
            .ok_or_else(|| api_error(401, "invalid credentials"))
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        let server = self.hit();
        let query = query.to_lowercase();
        Ok(server
            .accounts
            .iter()
            .map(|(u, _)| u)
            .filter(|u| {
                u.username.to_lowercase().contains(&query) || u.name.to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }

    async fn public_users(&self) -> Result<Vec<User>, ApiError> {
        let server = self.hit();
        Ok(server.accounts.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn update_avatar(&self, username: &str, file: Upload) -> Result<User, ApiError> {
        let mut server = self.hit();
        let (account, _) = server
            .accounts
            .iter_mut()
            .find(|(u, _)| u.username == username)
            .ok_or_else(|| api_error(404, "User not found"))?;
        account.avatar = Some(format!("/media/avatars/{}", file.file_name));
        Ok(account.clone())
    }

    async fn conversations(
        &self,
        user: &str,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, ApiError> {
        let server = self.hit();
        let mut peers: Vec<String> = Vec::new();
        for m in &server.messages {
            let peer = if m.sender == user {
                &m.receiver
            } else if m.receiver == user {
                &m.sender
            } else {
                continue;
            };
            if !peers.contains(peer) {
                peers.push(peer.clone());
            }
        }
        let mut summaries: Vec<ConversationSummary> = peers
            .iter()
            .map(|peer| ConversationSummary {
                peer: server.account(peer).cloned().unwrap_or_else(|| self::user(peer)),
                last_message: server.between(user, peer).max_by_key(|m| m.order_key()).cloned(),
            })
            .collect();
        summaries.sort_by_key(|s| std::cmp::Reverse(s.last_message.as_ref().map(Message::order_key)));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }

    async fn history(&self, user1: &str, user2: &str, limit: u32) -> Result<Vec<Message>, ApiError> {
        let server = self.hit();
        let mut messages: Vec<Message> = server.between(user1, user2).cloned().collect();
        messages.sort_by_key(Message::order_key);
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.split_off(skip))
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<Message, ApiError> {
        let mut server = self.hit();
        let blocked = server.blocks.contains(&(message.sender.clone(), message.receiver.clone()))
            || server.blocks.contains(&(message.receiver.clone(), message.sender.clone()));
        if blocked {
            return Err(api_error(403, "Messaging is blocked"));
        }
        let body = match (message.kind, message.text, message.file) {
            (MessageKind::Text, Some(text), _) => MessageBody::Text(text),
            (kind, _, Some(file)) if kind.is_media() => MessageBody::Media {
                kind,
                reference: format!("/media/{}", file.file_name),
            },
            _ => return Err(api_error(422, "Invalid message")),
        };
        let id = server.next_id();
        let sent = Message {
            id,
            sender: message.sender,
            receiver: message.receiver,
            body,
            created_at: at(id),
        };
        server.messages.push(sent.clone());
        Ok(sent)
    }

    async fn block(&self, blocker: &str, blocked: &str) -> Result<(), ApiError> {
        let mut server = self.hit();
        server.blocks.insert((blocker.to_string(), blocked.to_string()));
        Ok(())
    }

    async fn unblock(&self, blocker: &str, blocked: &str) -> Result<(), ApiError> {
        let mut server = self.hit();
        server.blocks.remove(&(blocker.to_string(), blocked.to_string()));
        Ok(())
    }

    async fn block_status(&self, user1: &str, user2: &str) -> Result<BlockStatus, ApiError> {
        let server = self.hit();
        Ok(BlockStatus {
            blocked_by_me: server.blocks.contains(&(user1.to_string(), user2.to_string())),
            blocked_by_them: server.blocks.contains(&(user2.to_string(), user1.to_string())),
        })
    }

    async fn status(&self) -> Result<serde_json::Value, ApiError> {
        let _server = self.hit();
        Ok(serde_json::json!({ "status": "ok" }))
    }

    fn media_url(&self, reference: &str) -> String {
        format!("http://fake{reference}")
    }
}

// ============================================================================
// FakeCapture: a microphone that hands back canned samples
// ============================================================================

pub const FAKE_SAMPLE_RATE: u32 = 8_000;

#[derive(Clone)]
pub struct FakeCapture {
    samples: Vec<f32>,
    deny: bool,
    acquired: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl FakeCapture {
    /// Grants access; every capture yields `samples` (8 kHz mono).
    pub fn granting(samples: Vec<f32>) -> Self {
        Self {
            samples,
            deny: false,
            acquired: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn denying() -> Self {
        Self { deny: true, ..Self::granting(Vec::new()) }
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for FakeCapture {
    fn open(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied("microphone access denied".to_string()));
        }
        self.acquired.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            samples: self.samples.clone(),
            acquired: self.acquired.clone(),
            paused: self.paused.clone(),
        }))
    }
}

struct FakeStream {
    samples: Vec<f32>,
    acquired: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl CaptureStream for FakeStream {
    fn set_paused(&mut self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    fn finish(mut self: Box<Self>) -> CapturedAudio {
        CapturedAudio {
            samples: std::mem::take(&mut self.samples),
            sample_rate: FAKE_SAMPLE_RATE,
            channels: 1,
        }
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.acquired.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Apps
// ============================================================================

/// An app on the auth screen, wired to fakes.
pub fn test_app() -> App {
    App::new(
        ResolvedConfig::default(),
        Arc::new(FakeApi::new()),
        Arc::new(MemorySessionStore::new()),
        Box::new(FakeCapture::granting(vec![0.1; FAKE_SAMPLE_RATE as usize])),
    )
}

/// An app resumed from a persisted session for `username`.
pub fn test_app_with_session(username: &str) -> App {
    signed_in_app(username, Arc::new(FakeApi::new()))
}

/// Like [`test_app_with_session`], but talking to a fake the test keeps a handle on.
pub fn signed_in_app(username: &str, api: Arc<FakeApi>) -> App {
    let store = MemorySessionStore::new();
    store.save(&user(username)).unwrap();
    App::new(
        ResolvedConfig::default(),
        api,
        Arc::new(store),
        Box::new(FakeCapture::granting(vec![0.1; FAKE_SAMPLE_RATE as usize])),
    )
}
