//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into core::Action values, and runs the
//! effects `update()` asks for on tokio.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Loop
//!
//! ```text
//! keys ──route_event──▶ Action ─┐
//!                               ├─▶ update(app) ─▶ Effect ─▶ spawn_effect ─┐
//! poll jobs / tasks ──▶ rx ─────┘                                          │
//!        ▲                                                                 │
//!        └─────────────────── result Action ◀─────────────── API call ◀────┘
//! ```
//!
//! ## Redraw Strategy
//!
//! Nothing animates, so the loop sleeps up to 250ms waiting for input and
//! only redraws after an event or a background action arrived.

mod component;
mod components;
mod event;
mod ui;

use log::{debug, info, warn};
use std::future::Future;
use std::io::stdout;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;

use crate::core::action::{Action, Effect, update};
use crate::core::auth;
use crate::core::config::ResolvedConfig;
use crate::core::scheduler::PollScheduler;
use crate::core::state::{App, PollPlan, Screen};
use crate::core::thread;
use crate::tui::component::EventHandler;
use crate::tui::components::MessageListState;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const RECORDER_TICK: Duration = Duration::from_secs(1);
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Which chat-screen widget receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    List,
    Composer,
}

impl Focus {
    fn next(self, has_thread: bool) -> Self {
        match self {
            Focus::Search => Focus::List,
            Focus::List if has_thread => Focus::Composer,
            Focus::List | Focus::Composer => Focus::Search,
        }
    }

    fn prev(self, has_thread: bool) -> Self {
        match self {
            Focus::Search if has_thread => Focus::Composer,
            Focus::Search | Focus::Composer => Focus::List,
            Focus::List => Focus::Search,
        }
    }
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub focus: Focus,
    /// Search box contents
    pub search_input: String,
    pub thread_view: MessageListState,
    /// Peer the thread view's scroll state belongs to
    last_peer: Option<String>,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            focus: Focus::Search, // Type a name straight away
            search_input: String::new(),
            thread_view: MessageListState::new(),
            last_peer: None,
        }
    }

    /// Follow state changes made by `update()`: a new peer gets a fresh
    /// scroll position, and focus never rests on a composer that is gone.
    fn sync(&mut self, app: &App) {
        let peer = app.peer().map(str::to_string);
        if peer != self.last_peer {
            self.thread_view = MessageListState::new();
            if peer.is_some() {
                self.focus = Focus::Composer;
            }
            self.last_peer = peer;
        }
        if app.thread.is_none() && self.focus == Focus::Composer {
            self.focus = Focus::List;
        }
        if app.screen == Screen::Auth {
            self.search_input.clear();
            self.focus = Focus::Search;
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,                        // Show cursor for input editing
            SetCursorStyle::SteadyBlock, // Non-blinking: avoids blink timer reset from redraws
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture, DisableBracketedPaste, Hide);
    }
}

// ============================================================================
// Background polling
// ============================================================================

/// Keeps the scheduler's jobs in line with what the app currently shows.
struct Pollers {
    scheduler: PollScheduler,
    plan: PollPlan,
}

impl Pollers {
    fn new() -> Self {
        Self {
            scheduler: PollScheduler::new(),
            plan: PollPlan { conversations: false, thread: None, recorder: false },
        }
    }

    fn sync(&mut self, plan: PollPlan, config: &ResolvedConfig, tx: &mpsc::Sender<Action>) {
        if plan == self.plan {
            return;
        }
        debug!("Poll plan changed: {:?} -> {:?}", self.plan, plan);

        if plan.conversations != self.plan.conversations {
            if plan.conversations {
                self.scheduler.every(
                    "conversations",
                    config.conversation_poll,
                    send_job(tx, || Action::RefreshConversations),
                );
            } else {
                self.scheduler.cancel("conversations");
            }
        }

        if plan.thread != self.plan.thread {
            if plan.thread.is_some() {
                // Re-registering restarts the job for the new peer
                self.scheduler.every(
                    "messages",
                    config.message_poll,
                    send_job(tx, || Action::RefreshHistory),
                );
            } else {
                self.scheduler.cancel("messages");
            }
        }

        if plan.recorder != self.plan.recorder {
            if plan.recorder {
                self.scheduler
                    .every_after("recorder", RECORDER_TICK, send_job(tx, || Action::RecorderTick));
            } else {
                self.scheduler.cancel("recorder");
            }
        }

        self.plan = plan;
    }
}

/// A poll job that posts `make()` to the event loop on every tick.
fn send_job(
    tx: &mpsc::Sender<Action>,
    make: fn() -> Action,
) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
    let tx = tx.clone();
    move || {
        if tx.send(make()).is_err() {
            debug!("Poll tick dropped: receiver gone");
        }
        std::future::ready(())
    }
}

// ============================================================================
// Event loop
// ============================================================================

pub fn run(mut app: App) -> std::io::Result<()> {
    let mut tui = TuiState::new();
    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();
    let mut pollers = Pollers::new();

    // A resumed session starts on the chat screen; fill the sidebar right away
    if app.screen == Screen::Chat {
        spawn_effect(Effect::Discover, &app, &tx);
    }

    let mut needs_redraw = true; // Force first frame

    loop {
        tui.sync(&app);
        pollers.sync(app.poll_plan(), &app.config, &tx);

        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        let first_event = poll_event_timeout(IDLE_POLL);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if let Some(action) = route_event(&mut app, &mut tui, event) {
                should_quit |= dispatch(&mut app, action, &tx);
                tui.sync(&app);
            }
        }

        // Handle background task actions (API results, poll ticks)
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            should_quit |= dispatch(&mut app, action, &tx);
        }

        if should_quit {
            break;
        }
    }

    info!("Slash shutting down");
    pollers.scheduler.cancel_all();
    app.close_thread();
    ratatui::restore();
    Ok(())
}

/// Apply `action` and run its effect. Returns true when the app should quit.
fn dispatch(app: &mut App, action: Action, tx: &mpsc::Sender<Action>) -> bool {
    let effect = update(app, action);
    if effect == Effect::Quit {
        return true;
    }
    spawn_effect(effect, app, tx);
    false
}

/// Translate a key into an action. Plain text edits go straight into the
/// field being typed in and produce no action.
fn route_event(app: &mut App, tui: &mut TuiState, event: TuiEvent) -> Option<Action> {
    match event {
        TuiEvent::ForceQuit => return Some(Action::Quit),
        TuiEvent::Resize => return None,
        _ => {}
    }
    match app.screen {
        Screen::Auth => route_auth(app, event),
        Screen::Chat => route_chat(app, tui, event),
    }
}

fn route_auth(app: &mut App, event: TuiEvent) -> Option<Action> {
    let form = &mut app.auth;
    match event {
        TuiEvent::Submit => return Some(Action::SubmitAuth),
        TuiEvent::ToggleAuthMode => return Some(Action::ToggleAuthMode),
        TuiEvent::FocusNext | TuiEvent::CursorDown => form.focus_next(),
        TuiEvent::FocusPrev | TuiEvent::CursorUp => form.focus_prev(),
        _ if form.submitting => {}
        TuiEvent::InputChar(c) => {
            let field = form.focused();
            form.value_mut(field).push(c);
        }
        TuiEvent::Paste(text) => {
            let field = form.focused();
            form.value_mut(field).push_str(text.trim());
        }
        TuiEvent::Backspace => {
            let field = form.focused();
            form.value_mut(field).pop();
        }
        _ => {}
    }
    None
}

fn route_chat(app: &mut App, tui: &mut TuiState, event: TuiEvent) -> Option<Action> {
    let has_thread = app.thread.is_some();
    match event {
        TuiEvent::FocusNext => {
            tui.focus = tui.focus.next(has_thread);
            return None;
        }
        TuiEvent::FocusPrev => {
            tui.focus = tui.focus.prev(has_thread);
            return None;
        }
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown => {
            tui.thread_view.handle_event(&event);
            return None;
        }
        _ => {}
    }

    match tui.focus {
        Focus::Search => match event {
            TuiEvent::InputChar(c) => {
                tui.search_input.push(c);
                Some(Action::Search(tui.search_input.clone()))
            }
            TuiEvent::Paste(text) => {
                tui.search_input.push_str(text.trim());
                Some(Action::Search(tui.search_input.clone()))
            }
            TuiEvent::Backspace => {
                tui.search_input.pop();
                Some(Action::Search(tui.search_input.clone()))
            }
            TuiEvent::Escape => {
                tui.search_input.clear();
                Some(Action::Search(String::new()))
            }
            TuiEvent::Submit | TuiEvent::CursorDown => {
                tui.focus = Focus::List;
                None
            }
            _ => None,
        },
        Focus::List => match event {
            TuiEvent::CursorUp => {
                app.conversations.select_prev();
                None
            }
            TuiEvent::CursorDown => {
                app.conversations.select_next();
                None
            }
            TuiEvent::Submit => app.conversations.selected_peer().map(Action::OpenPeer),
            TuiEvent::InputChar(c) => {
                tui.focus = Focus::Search;
                tui.search_input.push(c);
                Some(Action::Search(tui.search_input.clone()))
            }
            TuiEvent::Escape => Some(Action::DismissNotice),
            _ => None,
        },
        Focus::Composer => {
            let Some(thread) = app.thread.as_mut() else {
                tui.focus = Focus::List;
                return None;
            };
            match event {
                TuiEvent::InputChar(c) => thread.draft.text.push(c),
                // Single-line composer: pasted newlines become spaces
                TuiEvent::Paste(text) => thread.draft.text.push_str(&text.replace(['\r', '\n'], " ")),
                TuiEvent::Backspace => {
                    thread.draft.text.pop();
                }
                TuiEvent::Submit => return Some(Action::SubmitComposer),
                TuiEvent::CursorUp | TuiEvent::CursorDown => {
                    tui.thread_view.handle_event(&event);
                }
                TuiEvent::Escape => {
                    tui.focus = Focus::List;
                    return Some(Action::DismissNotice);
                }
                _ => {}
            }
            None
        }
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Run `fut` on tokio and post the action it resolves to.
fn spawn_task<F>(tx: &mpsc::Sender<Action>, fut: F)
where
    F: Future<Output = Action> + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        let action = fut.await;
        if tx.send(action).is_err() {
            warn!("Failed to deliver background result: receiver dropped");
        }
    });
}

fn spawn_effect(effect: Effect, app: &App, tx: &mpsc::Sender<Action>) {
    let api = app.api.clone();
    let me = app.me().unwrap_or_default().to_string();
    match effect {
        Effect::None | Effect::Quit => {}
        Effect::Authenticate(request) => {
            info!("Spawning auth request");
            spawn_task(tx, async move {
                Action::AuthCompleted(auth::perform(api.as_ref(), &request).await)
            });
        }
        Effect::Search { seq, query } => spawn_task(tx, async move {
            Action::SearchCompleted { seq, result: api.search_users(&query).await }
        }),
        Effect::RefreshConversations { seq } => {
            let limit = app.conversations.limit();
            spawn_task(tx, async move {
                Action::ConversationsLoaded { seq, result: api.conversations(&me, limit).await }
            });
        }
        Effect::Discover => spawn_task(tx, async move {
            Action::DiscoverLoaded(api.public_users().await)
        }),
        Effect::LoadHistory { peer, seq } => {
            let limit = app.config.history_limit;
            let (history_api, history_me, history_peer) = (api.clone(), me.clone(), peer.clone());
            spawn_task(tx, async move {
                let result = history_api.history(&history_me, &history_peer, limit).await;
                Action::HistoryLoaded { peer: history_peer, seq, result }
            });
            // A block can land mid-conversation, so each history poll re-reads it.
            // A failed read keeps the last known status.
            let tx = tx.clone();
            tokio::spawn(async move {
                match api.block_status(&me, &peer).await {
                    Ok(status) => {
                        if tx.send(Action::BlockStatusLoaded { peer, result: Ok(status) }).is_err() {
                            warn!("Failed to deliver block status: receiver dropped");
                        }
                    }
                    Err(e) => debug!("Block status poll for @{} failed: {}", peer, e),
                }
            });
        }
        Effect::CheckBlockStatus { peer } => spawn_task(tx, async move {
            let result = api.block_status(&me, &peer).await;
            Action::BlockStatusLoaded { peer, result }
        }),
        Effect::Send(message) => {
            info!("Sending {} message to @{}", message.kind, message.receiver);
            let peer = message.receiver.clone();
            spawn_task(tx, async move {
                Action::MessageSent { peer, result: api.send_message(message).await }
            });
        }
        Effect::SetBlock { peer, blocked } => {
            info!("Setting block on @{} to {}", peer, blocked);
            spawn_task(tx, async move {
                let result = thread::set_block(api.as_ref(), &me, &peer, blocked).await;
                Action::BlockStatusLoaded { peer, result }
            });
        }
        Effect::UploadAvatar { username, upload } => spawn_task(tx, async move {
            Action::AvatarUpdated(api.update_avatar(&username, upload).await)
        }),
    }
}
