//! Top-level layout: title bar, the active screen, and the notice line.
//!
//! ```text
//! ┌ title ───────────────────────────────────────────────┐
//! │ sidebar (32) │ thread messages                       │
//! │  search      │                                       │
//! │  peers       │ recorder bar (when not idle)          │
//! │              │ composer                              │
//! └ notice ──────────────────────────────────────────────┘
//! ```

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::core::recorder::RecorderState;
use crate::core::state::{App, NoticeLevel, Screen};
use crate::core::thread::body_text;
use crate::tui::component::Component;
use crate::tui::components::{
    AuthView, Composer, ConversationPanel, RecorderBar, ThreadView, TitleBar,
};
use crate::tui::{Focus, TuiState};

const SIDEBAR_WIDTH: u16 = 32;
const COMPOSER_HEIGHT: u16 = 3;
const MAX_NOTICE_LINES: u16 = 3;

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};

    let area = frame.area();
    let notice_height = notice_height(app, area.width);
    let [title_area, body_area, notice_area] =
        Layout::vertical([Length(1), Min(0), Length(notice_height)]).areas(area);

    TitleBar::new(
        app.config.api_base.clone(),
        app.me().map(str::to_string),
        app.peer().map(str::to_string),
    )
    .render(frame, title_area);

    match app.screen {
        Screen::Auth => AuthView::new(&app.auth).render(frame, body_area),
        Screen::Chat => draw_chat(frame, body_area, app, tui),
    }

    draw_notice(frame, notice_area, app);
}

fn notice_height(app: &App, width: u16) -> u16 {
    let Some(notice) = &app.notice else {
        return 1;
    };
    let width = width.max(1) as usize;
    let lines = notice.text.width().div_ceil(width).max(1);
    (lines as u16).min(MAX_NOTICE_LINES)
}

fn draw_notice(frame: &mut Frame, area: Rect, app: &App) {
    let Some(notice) = &app.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    frame.render_widget(
        Paragraph::new(notice.text.as_str())
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_chat(frame: &mut Frame, area: Rect, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};

    let [sidebar, main] = Layout::horizontal([Length(SIDEBAR_WIDTH.min(area.width)), Min(0)]).areas(area);

    ConversationPanel {
        list: &app.conversations,
        search: &tui.search_input,
        search_focused: tui.focus == Focus::Search,
        list_focused: tui.focus == Focus::List,
        open_peer: app.peer(),
    }
    .render(frame, sidebar);

    let Some(thread) = &app.thread else {
        frame.render_widget(
            Paragraph::new("Select a conversation, or search for someone to chat with")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true }),
            Rect { y: main.y + main.height / 2, height: 2.min(main.height), ..main },
        );
        return;
    };

    let recorder_height = if app.recorder.state() == RecorderState::Idle { 0 } else { 1 };
    let [messages_area, recorder_area, composer_area] =
        Layout::vertical([Min(0), Length(recorder_height), Length(COMPOSER_HEIGHT)]).areas(main);

    let bodies: Vec<String> = thread
        .messages
        .iter()
        .map(|m| body_text(m, |reference| app.media_url(reference)))
        .collect();
    ThreadView {
        state: &mut tui.thread_view,
        messages: &thread.messages,
        bodies: &bodies,
        me: thread.me(),
        loaded: thread.loaded,
    }
    .render(frame, messages_area);

    if recorder_height > 0 {
        RecorderBar { recorder: &app.recorder }.render(frame, recorder_area);
    }

    Composer {
        draft: &thread.draft,
        block_notice: thread.block_notice(),
        sending: thread.is_sending(),
        focused: tui.focus == Focus::Composer,
    }
    .render(frame, composer_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::{Action, update};
    use crate::test_support::{test_app, test_app_with_session, user};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered(app: &App, tui: &mut TuiState) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw_ui(f, app, tui)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_auth_screen() {
        let app = test_app();
        let text = rendered(&app, &mut TuiState::new());
        assert!(text.contains("Sign in to Slash"));
        assert!(!text.contains("Conversations"));
    }

    #[test]
    fn test_chat_screen_without_thread() {
        let app = test_app_with_session("alice");
        let text = rendered(&app, &mut TuiState::new());
        assert!(text.contains("@alice"));
        assert!(text.contains("Select a conversation"));
    }

    #[test]
    fn test_chat_screen_with_thread_and_notice() {
        let mut app = test_app_with_session("alice");
        update(&mut app, Action::OpenPeer(user("bob")));
        app.set_error("Message is empty");
        let mut tui = TuiState::new();
        tui.focus = Focus::Composer;
        let text = rendered(&app, &mut tui);
        assert!(text.contains("with @bob"));
        assert!(text.contains("Loading..."));
        assert!(text.contains("Message"));
        assert!(text.contains("Message is empty"));
    }
}
