//! Wire types for the Slash HTTP API.
//!
//! The server speaks plain JSON for identities, conversations and messages,
//! and multipart forms for anything that carries a file.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A registered account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Unique public handle.
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// Display name, falling back to the handle when the server sent none.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// `/login` and `/register` answer either with the bare user or wrapped in `{"user": ...}`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum IdentityResponse {
    Wrapped { user: User },
    Bare(User),
}

impl From<IdentityResponse> for User {
    fn from(response: IdentityResponse) -> Self {
        match response {
            IdentityResponse::Wrapped { user } | IdentityResponse::Bare(user) => user,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Handle or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
        }
    }

    pub fn is_media(self) -> bool {
        !matches!(self, MessageKind::Text)
    }

    /// Infer a media kind from a mime type such as `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.split('/').next()? {
            "image" => Some(MessageKind::Image),
            "video" => Some(MessageKind::Video),
            "audio" => Some(MessageKind::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one of text or media is authoritative for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    Media { kind: MessageKind, reference: String },
}

/// An immutable chat message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match &self.body {
            MessageBody::Text(_) => MessageKind::Text,
            MessageBody::Media { kind, .. } => *kind,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(text) => Some(text),
            MessageBody::Media { .. } => None,
        }
    }

    pub fn media_reference(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Media { reference, .. } => Some(reference),
            MessageBody::Text(_) => None,
        }
    }

    /// Sort key: creation time, ties broken by id.
    pub fn order_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireMessage {
    #[serde(default)]
    id: i64,
    sender: String,
    receiver: String,
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "media", skip_serializing_if = "Option::is_none")]
    media_url: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    created_at: DateTime<Utc>,
}

impl TryFrom<WireMessage> for Message {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let media = wire.media_url.filter(|reference| !reference.is_empty());
        let body = match (wire.kind, wire.text, media) {
            (MessageKind::Text, Some(text), None) => MessageBody::Text(text),
            (MessageKind::Text, _, _) => {
                return Err(format!("text message {} must carry text and no media", wire.id));
            }
            (kind, _, Some(reference)) => MessageBody::Media { kind, reference },
            (kind, _, None) => {
                return Err(format!("{kind} message {} has no media reference", wire.id));
            }
        };
        Ok(Message {
            id: wire.id,
            sender: wire.sender,
            receiver: wire.receiver,
            body,
            created_at: wire.created_at,
        })
    }
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let kind = message.kind();
        let (text, media_url) = match message.body {
            MessageBody::Text(text) => (Some(text), None),
            MessageBody::Media { reference, .. } => (None, Some(reference)),
        };
        WireMessage {
            id: message.id,
            sender: message.sender,
            receiver: message.receiver,
            kind,
            text,
            media_url,
            created_at: message.created_at,
        }
    }
}

/// Accepts RFC 3339 timestamps as well as the naive `2024-01-01T12:00:00[.ffffff]`
/// form some servers emit; naive values are taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}

/// A JSON array decoded one row at a time. A row that does not decode is
/// logged and skipped, so one bad record never loses the whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rows<T>(pub Vec<T>);

impl<T> Rows<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Rows<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
        let total = raw.len();
        let rows: Vec<T> = raw.into_iter().filter_map(decode_row).collect();
        if rows.len() < total {
            warn!("Skipped {} of {} rows that did not decode", total - rows.len(), total);
        }
        Ok(Rows(rows))
    }
}

fn decode_row<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(row) => Some(row),
        Err(e) => {
            warn!("Skipping row: {}", e);
            None
        }
    }
}

/// A summary whose last message does not decode still names its peer.
fn lenient_last_message<'de, D>(deserializer: D) -> Result<Option<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(decode_row))
}

// ============================================================================
// Conversations & blocking
// ============================================================================

/// Last message per peer, computed by the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    #[serde(alias = "user")]
    pub peer: User,
    #[serde(default, deserialize_with = "lenient_last_message")]
    pub last_message: Option<Message>,
}

/// Block relation between the current user and a peer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStatus {
    #[serde(default)]
    pub blocked_by_me: bool,
    #[serde(default)]
    pub blocked_by_them: bool,
}

impl BlockStatus {
    pub fn is_blocked(&self) -> bool {
        self.blocked_by_me || self.blocked_by_them
    }

    /// Which side imposed the block, phrased for the composer banner.
    pub fn describe(&self, peer: &str) -> Option<String> {
        match (self.blocked_by_me, self.blocked_by_them) {
            (true, true) => Some(format!("You and @{peer} have blocked each other")),
            (true, false) => Some(format!("You blocked @{peer}")),
            (false, true) => Some(format!("@{peer} has blocked you")),
            (false, false) => None,
        }
    }
}

// ============================================================================
// Outgoing payloads
// ============================================================================

/// A file payload for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// A validated message ready for `/messages/send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub sender: String,
    pub receiver: String,
    pub kind: MessageKind,
    pub text: Option<String>,
    pub file: Option<Upload>,
}
