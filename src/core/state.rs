//! # Application State
//!
//! Core business state for Slash. Domain logic only, no TUI types;
//! presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── config: ResolvedConfig          // poll intervals, limits, stop policy
//! ├── api: Arc<dyn ChatApi>           // HTTP client (or a fake in tests)
//! ├── store: Arc<dyn SessionStore>    // persisted identity
//! ├── session: Option<User>           // who is signed in
//! ├── screen: Screen                  // Auth or Chat
//! ├── auth: AuthForm                  // login / register form
//! ├── conversations: ConversationList // recent peers + search
//! ├── thread: Option<MessageThread>   // the open conversation
//! ├── recorder: VoiceRecorder         // voice note state machine
//! └── notice: Option<Notice>          // inline status / error line
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use log::warn;

use crate::api::{ChatApi, User};
use crate::audio::CaptureDevice;
use crate::core::auth::AuthForm;
use crate::core::config::ResolvedConfig;
use crate::core::conversations::{ConversationList, Sequencer};
use crate::core::recorder::VoiceRecorder;
use crate::core::session::SessionStore;
use crate::core::thread::MessageThread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One line of feedback under the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Raised by a background refresh; the next successful refresh clears it.
    pub from_poll: bool,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into(), from_poll: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into(), from_poll: false }
    }

    pub fn poll_error(text: impl Into<String>) -> Self {
        Self { from_poll: true, ..Self::error(text) }
    }
}

/// What should be refreshing in the background right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPlan {
    pub conversations: bool,
    /// Handle of the peer whose history is polled.
    pub thread: Option<String>,
    pub recorder: bool,
}

pub struct App {
    pub config: ResolvedConfig,
    pub api: Arc<dyn ChatApi>,
    pub store: Arc<dyn SessionStore>,
    pub session: Option<User>,
    pub screen: Screen,
    pub auth: AuthForm,
    pub conversations: ConversationList,
    pub thread: Option<MessageThread>,
    pub recorder: VoiceRecorder,
    pub notice: Option<Notice>,
    /// History numbering carried from one thread to the next.
    history_tickets: Sequencer,
}

impl App {
    /// Build the app, resuming a persisted session when there is one.
    pub fn new(
        config: ResolvedConfig,
        api: Arc<dyn ChatApi>,
        store: Arc<dyn SessionStore>,
        device: Box<dyn CaptureDevice>,
    ) -> Self {
        let recorder = VoiceRecorder::new(device, config.stop_policy);
        let mut app = Self {
            conversations: ConversationList::new("", config.conversation_limit),
            config,
            api,
            store,
            session: None,
            screen: Screen::Auth,
            auth: AuthForm::new(),
            thread: None,
            recorder,
            notice: None,
            history_tickets: Sequencer::default(),
        };
        if let Some(user) = app.store.load() {
            app.sign_in(user);
        }
        app
    }

    pub fn me(&self) -> Option<&str> {
        self.session.as_ref().map(|u| u.username.as_str())
    }

    /// Enter the chat screen as `user`.
    pub fn sign_in(&mut self, user: User) {
        self.conversations = ConversationList::new(&user.username, self.config.conversation_limit);
        self.drop_thread();
        self.session = Some(user);
        self.screen = Screen::Chat;
        self.notice = None;
    }

    /// Forget the session everywhere and go back to the auth screen.
    pub fn sign_out(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Could not clear persisted session: {}", e);
        }
        self.close_thread();
        self.session = None;
        self.conversations = ConversationList::new("", self.config.conversation_limit);
        self.auth = AuthForm::new();
        self.screen = Screen::Auth;
        self.notice = None;
    }

    /// Leave the open thread. Any recording in progress goes with it.
    pub fn close_thread(&mut self) {
        self.recorder.discard();
        self.drop_thread();
    }

    /// Make `thread` the open one, replacing whatever was open.
    pub fn open_thread(&mut self, thread: MessageThread) {
        self.close_thread();
        self.thread = Some(thread.after(self.history_tickets));
    }

    fn drop_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.history_tickets = thread.history_tickets();
        }
    }

    pub fn peer(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.peer().username.as_str())
    }

    pub fn poll_plan(&self) -> PollPlan {
        let chatting = self.screen == Screen::Chat && self.session.is_some();
        PollPlan {
            conversations: chatting,
            thread: if chatting { self.peer().map(str::to_string) } else { None },
            recorder: self.recorder.is_active(),
        }
    }

    pub fn media_url(&self, reference: &str) -> String {
        self.api.media_url(reference)
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::error(text));
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::info(text));
    }

    /// A background refresh succeeded; drop the error it may have raised.
    pub fn clear_poll_notice(&mut self) {
        if self.notice.as_ref().is_some_and(|n| n.from_poll) {
            self.notice = None;
        }
    }
}
