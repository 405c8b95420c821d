//! # Actions
//!
//! Everything that can happen in Slash becomes an `Action`.
//! User presses Enter on the login form? That's `Action::SubmitAuth`.
//! The server answers? That's `Action::AuthCompleted(result)`.
//!
//! `update()` applies an action to the state and returns the `Effect` to run.
//! No I/O here: the TUI spawns effects on tokio and feeds their results back
//! as actions.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! Responses that race each other carry the sequence number (and peer) of
//! the request that produced them; anything older than what is already
//! shown, or meant for a thread that has since closed, is dropped.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::api::{ApiError, BlockStatus, ConversationSummary, Message, OutgoingMessage, Upload, User};
use crate::core::attachment::Attachment;
use crate::core::auth::{self, AuthRequest};
use crate::core::command::{self, Command};
use crate::core::error::ClientError;
use crate::core::recorder::{AudioClip, StopOutcome};
use crate::core::state::{App, Notice, Screen};
use crate::core::thread::MessageThread;

#[derive(Debug, Clone)]
pub enum Action {
    // Auth
    SubmitAuth,
    ToggleAuthMode,
    AuthCompleted(Result<User, ApiError>),
    Logout,

    // Conversation list
    Search(String),
    SearchCompleted { seq: u64, result: Result<Vec<User>, ApiError> },
    RefreshConversations,
    ConversationsLoaded { seq: u64, result: Result<Vec<ConversationSummary>, ApiError> },
    DiscoverLoaded(Result<Vec<User>, ApiError>),
    OpenPeer(User),
    CloseThread,

    // Thread
    RefreshHistory,
    HistoryLoaded { peer: String, seq: u64, result: Result<Vec<Message>, ApiError> },
    BlockStatusLoaded { peer: String, result: Result<BlockStatus, ApiError> },
    /// Send the composer line, or run it when it is a command.
    SubmitComposer,
    MessageSent { peer: String, result: Result<Message, ApiError> },
    SetBlocked(bool),
    Attach(PathBuf),
    Detach,

    // Voice notes
    StartRecording,
    PauseRecording,
    ResumeRecording,
    StopRecording,
    SendRecording,
    ClearRecording,
    RecorderTick,

    // Profile
    UpdateAvatar(PathBuf),
    AvatarUpdated(Result<User, ApiError>),

    ShowHelp,
    DismissNotice,
    Quit,
}

/// Side effects `update` asks the runtime to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    Authenticate(AuthRequest),
    Search { seq: u64, query: String },
    RefreshConversations { seq: u64 },
    Discover,
    LoadHistory { peer: String, seq: u64 },
    CheckBlockStatus { peer: String },
    Send(OutgoingMessage),
    SetBlock { peer: String, blocked: bool },
    UploadAvatar { username: String, upload: Upload },
}

impl From<Command> for Action {
    fn from(command: Command) -> Self {
        match command {
            Command::Attach(path) => Action::Attach(path),
            Command::Detach => Action::Detach,
            Command::Record => Action::StartRecording,
            Command::Pause => Action::PauseRecording,
            Command::Resume => Action::ResumeRecording,
            Command::Stop => Action::StopRecording,
            Command::SendVoice => Action::SendRecording,
            Command::ClearVoice => Action::ClearRecording,
            Command::Block => Action::SetBlocked(true),
            Command::Unblock => Action::SetBlocked(false),
            Command::Avatar(path) => Action::UpdateAvatar(path),
            Command::Back => Action::CloseThread,
            Command::Logout => Action::Logout,
            Command::Help => Action::ShowHelp,
        }
    }
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        // ====================================================================
        // Auth
        // ====================================================================
        Action::SubmitAuth => {
            if app.screen != Screen::Auth {
                return Effect::None;
            }
            match app.auth.begin_submit() {
                Ok(request) => Effect::Authenticate(request),
                Err(e) => {
                    debug!("Auth submit skipped: {}", e);
                    Effect::None
                }
            }
        }
        Action::ToggleAuthMode => {
            app.auth.toggle_mode();
            Effect::None
        }
        Action::AuthCompleted(result) => {
            if app.screen != Screen::Auth {
                return Effect::None;
            }
            match app.auth.finish_submit(result, app.store.as_ref()) {
                Ok(user) => {
                    app.sign_in(user);
                    Effect::Discover
                }
                Err(_) => Effect::None,
            }
        }
        Action::Logout => {
            if let Some(me) = app.me() {
                info!("Logging out @{}", me);
            }
            app.sign_out();
            Effect::None
        }

        // ====================================================================
        // Conversation list
        // ====================================================================
        Action::Search(query) => match app.conversations.begin_search(&query) {
            Some(seq) => Effect::Search { seq, query: query.trim().to_string() },
            None => Effect::None,
        },
        Action::SearchCompleted { seq, result } => {
            if let Err(e) = app.conversations.apply_search(seq, result) {
                app.set_error(e.to_string());
            }
            Effect::None
        }
        Action::RefreshConversations => {
            if app.screen != Screen::Chat {
                return Effect::None;
            }
            Effect::RefreshConversations { seq: app.conversations.begin_refresh() }
        }
        Action::ConversationsLoaded { seq, result } => {
            match app.conversations.apply_refresh(seq, result) {
                Ok(_) => app.clear_poll_notice(),
                Err(e) => app.notice = Some(Notice::poll_error(e.to_string())),
            }
            Effect::None
        }
        Action::DiscoverLoaded(result) => {
            match result {
                Ok(users) => app.conversations.apply_discover(users),
                Err(e) => warn!("Could not load discoverable users: {}", e),
            }
            Effect::None
        }
        Action::OpenPeer(peer) => {
            let Some(me) = app.me().map(str::to_string) else {
                return Effect::None;
            };
            if peer.username == me || app.peer() == Some(peer.username.as_str()) {
                return Effect::None;
            }
            info!("Opening thread with @{}", peer.username);
            let username = peer.username.clone();
            app.open_thread(MessageThread::open(me, peer, app.config.history_limit));
            app.notice = None;
            Effect::CheckBlockStatus { peer: username }
        }
        Action::CloseThread => {
            app.close_thread();
            Effect::None
        }

        // ====================================================================
        // Thread
        // ====================================================================
        Action::RefreshHistory => match app.thread.as_mut() {
            Some(thread) => Effect::LoadHistory {
                peer: thread.peer().username.clone(),
                seq: thread.begin_history(),
            },
            None => Effect::None,
        },
        Action::HistoryLoaded { peer, seq, result } => {
            let Some(thread) = open_thread(app, &peer) else {
                debug!("Dropping history for closed thread @{}", peer);
                return Effect::None;
            };
            match thread.apply_history(seq, result) {
                Ok(_) => app.clear_poll_notice(),
                Err(e) => app.notice = Some(Notice::poll_error(e.to_string())),
            }
            Effect::None
        }
        Action::BlockStatusLoaded { peer, result } => {
            let Some(thread) = open_thread(app, &peer) else {
                return Effect::None;
            };
            match result {
                Ok(status) => thread.apply_block_status(status),
                Err(e) => app.set_error(e.to_string()),
            }
            Effect::None
        }
        Action::SubmitComposer => {
            let Some(thread) = app.thread.as_mut() else {
                return Effect::None;
            };
            if command::is_command(&thread.draft.text) {
                let parsed = command::parse(&thread.draft.text);
                return match parsed {
                    Ok(cmd) => {
                        thread.draft.text.clear();
                        update(app, cmd.into())
                    }
                    Err(e) => {
                        app.set_error(e.to_string());
                        Effect::None
                    }
                };
            }
            match thread.prepare_send() {
                Ok(message) => Effect::Send(message),
                Err(e) => {
                    app.set_error(e.to_string());
                    Effect::None
                }
            }
        }
        Action::MessageSent { peer, result } => {
            let Some(thread) = open_thread(app, &peer) else {
                debug!("Send to @{} completed after the thread closed", peer);
                return Effect::None;
            };
            match thread.apply_sent(result) {
                Ok(()) => app.notice = None,
                Err(e) => app.set_error(e.to_string()),
            }
            Effect::None
        }
        Action::SetBlocked(blocked) => match app.peer() {
            Some(peer) => Effect::SetBlock { peer: peer.to_string(), blocked },
            None => Effect::None,
        },
        Action::Attach(path) => {
            let Some(thread) = app.thread.as_mut() else {
                return Effect::None;
            };
            match Attachment::from_path(&path) {
                Ok(attachment) => {
                    let text = format!(
                        "Attached {} ({}). Enter sends it, /detach drops it",
                        attachment.file_name(),
                        attachment.kind
                    );
                    thread.draft.attachment = Some(attachment);
                    app.set_info(text);
                }
                Err(e) => app.set_error(e.to_string()),
            }
            Effect::None
        }
        Action::Detach => {
            if let Some(thread) = app.thread.as_mut() {
                thread.draft.attachment = None;
            }
            Effect::None
        }

        // ====================================================================
        // Voice notes
        // ====================================================================
        Action::StartRecording => {
            if app.thread.is_none() {
                return Effect::None;
            }
            match app.recorder.start() {
                Ok(()) => app.notice = None,
                Err(e) => app.set_error(e.to_string()),
            }
            Effect::None
        }
        Action::PauseRecording => {
            report(app, |app| app.recorder.pause());
            Effect::None
        }
        Action::ResumeRecording => {
            report(app, |app| app.recorder.resume());
            Effect::None
        }
        Action::StopRecording => match app.recorder.stop() {
            Ok(StopOutcome::Send(clip)) => send_voice(app, clip),
            Ok(StopOutcome::Staged) => {
                app.set_info("Voice note ready: /send-voice to send, /clear-voice to discard");
                Effect::None
            }
            Err(e) => {
                app.set_error(e.to_string());
                Effect::None
            }
        },
        Action::SendRecording => {
            let Some(clip) = app.recorder.staged().cloned() else {
                app.set_error(ClientError::skipped("No voice note to send").to_string());
                return Effect::None;
            };
            let Some(thread) = app.thread.as_mut() else {
                return Effect::None;
            };
            // Validate before taking the clip so a rejected send keeps it staged.
            let outgoing = match thread.prepare_voice(Attachment::from_clip(clip)) {
                Ok(outgoing) => outgoing,
                Err(e) => {
                    app.set_error(e.to_string());
                    return Effect::None;
                }
            };
            if let Err(e) = app.recorder.take_clip() {
                warn!("Staged clip vanished before sending: {}", e);
            }
            Effect::Send(outgoing)
        }
        Action::ClearRecording => {
            report(app, |app| app.recorder.clear());
            Effect::None
        }
        Action::RecorderTick => {
            app.recorder.tick();
            Effect::None
        }

        // ====================================================================
        // Profile
        // ====================================================================
        Action::UpdateAvatar(path) => {
            let Some(username) = app.me().map(str::to_string) else {
                return Effect::None;
            };
            match Attachment::from_path(&path).and_then(auth::avatar_upload) {
                Ok(upload) => Effect::UploadAvatar { username, upload },
                Err(e) => {
                    app.set_error(e.to_string());
                    Effect::None
                }
            }
        }
        Action::AvatarUpdated(result) => {
            match auth::apply_avatar(result, app.store.as_ref()) {
                Ok(user) => {
                    if app.me() == Some(user.username.as_str()) {
                        app.session = Some(user);
                        app.set_info("Avatar updated");
                    }
                }
                Err(e) => app.set_error(e.to_string()),
            }
            Effect::None
        }

        Action::ShowHelp => {
            app.set_info(command::HELP);
            Effect::None
        }
        Action::DismissNotice => {
            app.notice = None;
            Effect::None
        }
        Action::Quit => Effect::Quit,
    }
}

/// The open thread, if it is still the one with `peer`.
fn open_thread<'a>(app: &'a mut App, peer: &str) -> Option<&'a mut MessageThread> {
    app.thread
        .as_mut()
        .filter(|thread| thread.peer().username == peer)
}

fn send_voice(app: &mut App, clip: AudioClip) -> Effect {
    let Some(thread) = app.thread.as_mut() else {
        return Effect::None;
    };
    match thread.prepare_voice(Attachment::from_clip(clip)) {
        Ok(outgoing) => Effect::Send(outgoing),
        Err(e) => {
            app.set_error(format!("Voice note not sent: {e}"));
            Effect::None
        }
    }
}

/// Run a recorder transition, surfacing a rejection as a notice.
fn report<E: std::fmt::Display>(app: &mut App, op: impl FnOnce(&mut App) -> Result<(), E>) {
    match op(app) {
        Ok(()) => app.notice = None,
        Err(e) => app.set_error(e.to_string()),
    }
}
