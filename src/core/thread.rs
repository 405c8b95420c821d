//! # Message Thread
//!
//! The open conversation with one peer: its history, the block relation, and
//! the composer draft.
//!
//! Network work is split into a synchronous `prepare`/`begin` half that
//! validates and issues a ticket, and an `apply` half that folds the answer
//! back in. The reducer drives the two halves across a spawned task; the
//! async helpers (`load_history`, `send`, ...) run both back to back.

use log::{debug, info};

use crate::api::{ApiError, BlockStatus, ChatApi, Message, MessageBody, MessageKind, OutgoingMessage, User};
use crate::core::attachment::Attachment;
use crate::core::conversations::Sequencer;
use crate::core::error::ClientError;

/// What the user is composing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Draft {
    /// An attachment turns the draft into a media message.
    pub fn kind(&self) -> MessageKind {
        self.attachment
            .as_ref()
            .map(|a| a.kind)
            .unwrap_or(MessageKind::Text)
    }
}

/// Where the message in flight came from, so a success clears the right thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOrigin {
    Composer,
    Voice,
}

#[derive(Debug, Clone)]
pub struct MessageThread {
    me: String,
    peer: User,
    limit: u32,
    pub messages: Vec<Message>,
    pub block: BlockStatus,
    pub draft: Draft,
    in_flight: Option<SendOrigin>,
    history: Sequencer,
    pub loaded: bool,
}

impl MessageThread {
    pub fn open(me: impl Into<String>, peer: User, limit: u32) -> Self {
        Self {
            me: me.into(),
            peer,
            limit,
            messages: Vec::new(),
            block: BlockStatus::default(),
            draft: Draft::default(),
            in_flight: None,
            history: Sequencer::default(),
            loaded: false,
        }
    }

    /// Continue the history numbering of an earlier thread, so its late
    /// responses can never pass for this one's.
    pub(crate) fn after(mut self, earlier: Sequencer) -> Self {
        self.history = earlier.superseded();
        self
    }

    pub(crate) fn history_tickets(&self) -> Sequencer {
        self.history
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn peer(&self) -> &User {
        &self.peer
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_mine(&self, message: &Message) -> bool {
        message.sender == self.me
    }

    /// Banner text while the composer is disabled by a block.
    pub fn block_notice(&self) -> Option<String> {
        self.block.describe(&self.peer.username)
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    pub fn begin_history(&mut self) -> u64 {
        self.history.issue()
    }

    /// Replace the held messages with a fresh history page.
    ///
    /// Returns `Ok(false)` when a newer page has already been applied.
    pub fn apply_history(&mut self, seq: u64, result: Result<Vec<Message>, ApiError>) -> Result<bool, ApiError> {
        if !self.history.accept(seq) {
            debug!("Dropping stale history #{} for @{}", seq, self.peer.username);
            return Ok(false);
        }
        let mut messages = result?;
        messages.sort_by_key(Message::order_key);
        messages.dedup_by_key(|m| m.id);
        self.messages = messages;
        self.loaded = true;
        Ok(true)
    }

    pub async fn load_history(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let seq = self.begin_history();
        let result = api.history(&self.me, &self.peer.username, self.limit).await;
        self.apply_history(seq, result).map(|_| ())
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    fn check_can_send(&self) -> Result<(), ClientError> {
        if self.is_sending() {
            return Err(ClientError::skipped("A message is already being sent"));
        }
        if let Some(reason) = self.block_notice() {
            return Err(ClientError::skipped(reason));
        }
        Ok(())
    }

    /// Validate the composer draft and mark a send in flight.
    pub fn prepare_send(&mut self) -> Result<OutgoingMessage, ClientError> {
        self.check_can_send()?;
        let outgoing = match &self.draft.attachment {
            None => {
                if self.draft.text.trim().is_empty() {
                    return Err(ClientError::skipped("Message is empty"));
                }
                OutgoingMessage {
                    sender: self.me.clone(),
                    receiver: self.peer.username.clone(),
                    kind: MessageKind::Text,
                    text: Some(self.draft.text.clone()),
                    file: None,
                }
            }
            Some(attachment) => self.media_message(attachment.clone())?,
        };
        self.in_flight = Some(SendOrigin::Composer);
        Ok(outgoing)
    }

    /// Validate a recorded clip for sending without touching the draft.
    pub fn prepare_voice(&mut self, attachment: Attachment) -> Result<OutgoingMessage, ClientError> {
        self.check_can_send()?;
        let outgoing = self.media_message(attachment)?;
        self.in_flight = Some(SendOrigin::Voice);
        Ok(outgoing)
    }

    fn media_message(&self, attachment: Attachment) -> Result<OutgoingMessage, ClientError> {
        if !attachment.kind.is_media() || attachment.upload.bytes.is_empty() {
            return Err(ClientError::skipped("Attach a file or recording first"));
        }
        Ok(OutgoingMessage {
            sender: self.me.clone(),
            receiver: self.peer.username.clone(),
            kind: attachment.kind,
            text: None,
            file: Some(attachment.upload),
        })
    }

    /// Fold in the outcome of a send. The composer keeps its content on failure.
    pub fn apply_sent(&mut self, result: Result<Message, ApiError>) -> Result<(), ClientError> {
        let origin = self.in_flight.take();
        let message = result?;
        self.insert(message);
        if origin == Some(SendOrigin::Composer) {
            self.draft = Draft::default();
        }
        Ok(())
    }

    /// Add a message unless a history refresh already brought it in.
    fn insert(&mut self, message: Message) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        let at = self
            .messages
            .partition_point(|m| m.order_key() <= message.order_key());
        self.messages.insert(at, message);
    }

    pub async fn send(&mut self, api: &dyn ChatApi) -> Result<(), ClientError> {
        let outgoing = self.prepare_send()?;
        let result = api.send_message(outgoing).await;
        self.apply_sent(result)
    }

    // ------------------------------------------------------------------------
    // Blocking
    // ------------------------------------------------------------------------

    pub fn apply_block_status(&mut self, status: BlockStatus) {
        if status != self.block {
            info!("Block status with @{} is now {:?}", self.peer.username, status);
        }
        self.block = status;
    }

    pub async fn check_block_status(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let status = api.block_status(&self.me, &self.peer.username).await?;
        self.apply_block_status(status);
        Ok(())
    }

    pub async fn block(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let status = set_block(api, &self.me, &self.peer.username, true).await?;
        self.apply_block_status(status);
        Ok(())
    }

    pub async fn unblock(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let status = set_block(api, &self.me, &self.peer.username, false).await?;
        self.apply_block_status(status);
        Ok(())
    }
}

/// Block or unblock `peer`, then read back the resulting relation.
pub async fn set_block(
    api: &dyn ChatApi,
    me: &str,
    peer: &str,
    blocked: bool,
) -> Result<BlockStatus, ApiError> {
    if blocked {
        api.block(me, peer).await?;
    } else {
        api.unblock(me, peer).await?;
    }
    api.block_status(me, peer).await
}

/// Placeholder shown for a media message.
pub fn media_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "",
        MessageKind::Image => "[image]",
        MessageKind::Video => "[video]",
        MessageKind::Audio => "[audio]",
    }
}

/// What a message bubble shows: the text, or a media label with its URL.
pub fn body_text(message: &Message, media_url: impl Fn(&str) -> String) -> String {
    match &message.body {
        MessageBody::Text(text) => text.clone(),
        MessageBody::Media { kind, reference } => {
            format!("{} {}", media_label(*kind), media_url(reference))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, message, user};

    fn thread() -> MessageThread {
        MessageThread::open("alice", user("bob"), 200)
    }

    fn accounts() -> FakeApi {
        let api = FakeApi::new();
        api.add_account("alice", "pw");
        api.add_account("bob", "pw");
        api
    }

    #[tokio::test]
    async fn test_send_appends_once_and_clears_composer() {
        let api = accounts();
        let mut thread = thread();
        thread.draft.text = "hi".to_string();

        thread.send(&api).await.unwrap();
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].text(), Some("hi"));
        assert!(thread.draft.text.is_empty());
        assert!(!thread.is_sending());

        // A history refresh that includes the message does not duplicate it.
        thread.load_history(&api).await.unwrap();
        assert_eq!(thread.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_issues_no_call() {
        let api = accounts();
        let mut thread = thread();
        thread.draft.text = "  \n ".to_string();

        let err = thread.send(&api).await.unwrap_err();
        assert_eq!(err, ClientError::skipped("Message is empty"));
        assert!(thread.messages.is_empty());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blocked_send_issues_no_call() {
        let api = accounts();
        let mut thread = thread();
        thread.apply_block_status(BlockStatus { blocked_by_me: false, blocked_by_them: true });
        thread.draft.text = "hello?".to_string();

        let err = thread.send(&api).await.unwrap_err();
        assert_eq!(err.to_string(), "@bob has blocked you");
        assert_eq!(api.call_count(), 0);
        assert_eq!(thread.draft.text, "hello?");
    }

    #[test]
    fn test_text_is_sent_as_typed() {
        let api = accounts();
        let mut thread = thread();
        thread.draft.text = "  hi  ".to_string();

        tokio_test::assert_ok!(tokio_test::block_on(thread.send(&api)));
        tokio_test::assert_ok!(tokio_test::block_on(thread.load_history(&api)));
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].text(), Some("  hi  "));
    }

    #[test]
    fn test_second_send_rejected_while_in_flight() {
        let mut thread = thread();
        thread.draft.text = "one".to_string();
        thread.prepare_send().unwrap();
        assert!(matches!(thread.prepare_send(), Err(ClientError::ValidationSkipped(_))));
    }

    #[test]
    fn test_failed_send_keeps_text() {
        let mut thread = thread();
        thread.draft.text = "keep me".to_string();
        thread.prepare_send().unwrap();
        let err = ApiError::Api { status: 500, detail: "boom".to_string() };

        assert_eq!(thread.apply_sent(Err(err.clone())), Err(ClientError::Api(err)));
        assert_eq!(thread.draft.text, "keep me");
        assert!(!thread.is_sending());
    }

    #[test]
    fn test_media_without_file_is_rejected() {
        let mut thread = thread();
        let empty = Attachment {
            kind: MessageKind::Image,
            upload: crate::api::Upload {
                file_name: "a.png".to_string(),
                mime: "image/png".to_string(),
                bytes: Vec::new(),
            },
        };
        assert!(matches!(thread.prepare_voice(empty), Err(ClientError::ValidationSkipped(_))));
        assert!(!thread.is_sending());
    }

    #[tokio::test]
    async fn test_voice_send_leaves_draft_alone() {
        let api = accounts();
        let mut thread = thread();
        thread.draft.text = "typing...".to_string();
        let clip = crate::core::recorder::AudioClip { wav: vec![0; 64], duration_secs: 1.0 };

        let outgoing = thread.prepare_voice(Attachment::from_clip(clip)).unwrap();
        assert_eq!(outgoing.kind, MessageKind::Audio);
        let result = api.send_message(outgoing).await;
        thread.apply_sent(result).unwrap();

        assert_eq!(thread.messages[0].kind(), MessageKind::Audio);
        assert_eq!(thread.draft.text, "typing...");
    }

    #[test]
    fn test_history_sorted_and_stale_dropped() {
        let mut thread = thread();
        let old = thread.begin_history();
        let new = thread.begin_history();

        let page = vec![message(2, "bob", "alice", 20), message(1, "alice", "bob", 10)];
        assert_eq!(thread.apply_history(new, Ok(page)), Ok(true));
        let ids: Vec<_> = thread.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(thread.apply_history(old, Ok(vec![])), Ok(false));
        assert_eq!(thread.messages.len(), 2);
    }

    #[test]
    fn test_stale_history_failure_is_ignored() {
        let mut thread = thread();
        let old = thread.begin_history();
        let new = thread.begin_history();
        assert_eq!(thread.apply_history(new, Ok(vec![message(1, "bob", "alice", 0)])), Ok(true));

        let err = ApiError::Api { status: 500, detail: "boom".to_string() };
        assert_eq!(thread.apply_history(old, Err(err)), Ok(false));
        assert_eq!(thread.messages.len(), 1);
    }

    #[test]
    fn test_reopened_thread_ignores_earlier_tickets() {
        let mut first = thread();
        first.begin_history();
        let late = first.begin_history();

        let mut reopened = thread().after(first.history_tickets());
        let fresh = reopened.begin_history();
        assert!(fresh > late);
        assert_eq!(reopened.apply_history(late, Ok(vec![])), Ok(false));
        assert!(!reopened.loaded);
    }

    #[tokio::test]
    async fn test_block_then_unblock_refreshes_status() {
        let api = accounts();
        let mut thread = thread();

        thread.block(&api).await.unwrap();
        assert!(thread.block.blocked_by_me);
        assert_eq!(thread.block_notice().as_deref(), Some("You blocked @bob"));

        thread.unblock(&api).await.unwrap();
        assert!(!thread.block.is_blocked());
    }

    #[test]
    fn test_body_text_resolves_media() {
        let text = message(1, "alice", "bob", 0);
        assert_eq!(body_text(&text, |r| r.to_string()), "message 1");

        let mut media = text.clone();
        media.body = MessageBody::Media {
            kind: MessageKind::Video,
            reference: "/media/clip.mp4".to_string(),
        };
        let shown = body_text(&media, |r| format!("http://h:8000{r}"));
        assert_eq!(shown, "[video] http://h:8000/media/clip.mp4");
    }
}
