//! # ThreadView Component
//!
//! Scrollable view of the open conversation.
//!
//! `ThreadView` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent scroll state) and the thread's
//! messages (props). New messages keep the view pinned to the bottom unless
//! the user has scrolled up; scrolling back down to the end re-pins it.

use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect, Size};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::api::Message;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::MessageBubble;
use crate::tui::event::TuiEvent;

/// Scroll state for the thread view. Lives in `TuiState` and is reset when
/// a different peer is opened.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    /// Per-message heights from the last render
    pub heights: Vec<u16>,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            heights: Vec::new(),
            stick_to_bottom: true,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        let total: u16 = self.heights.iter().sum();
        total.saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Re-engage auto-scroll once the user is back at the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }
}

impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp | TuiEvent::CursorUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown | TuiEvent::CursorDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

pub struct ThreadView<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    /// Rendered body per message, same order as `messages`
    pub bodies: &'a [String],
    pub me: &'a str,
    /// False until the first history page arrives
    pub loaded: bool,
}

impl<'a> Component for ThreadView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        if self.messages.is_empty() {
            let hint = if self.loaded { "No messages yet. Say hi!" } else { "Loading..." };
            frame.render_widget(
                Paragraph::new(hint)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray)),
                Rect { y: area.y + area.height / 2, height: 1, ..area },
            );
            return;
        }

        let content_width = area.width.saturating_sub(1); // -1 for scrollbar
        self.state.heights = self
            .bodies
            .iter()
            .map(|body| MessageBubble::calculate_height(body, content_width))
            .collect();
        let total_height: u16 = self.state.heights.iter().sum();

        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = 0;
        for ((message, body), height) in self.messages.iter().zip(self.bodies).zip(&self.state.heights) {
            let rect = Rect::new(0, y_offset, content_width, *height);
            let bubble = MessageBubble::new(message, body, message.sender == self.me);
            scroll_view.render_widget(bubble, rect);
            y_offset += height;
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }
        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::message;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(state: &mut MessageListState, messages: &[Message], loaded: bool) -> String {
        let bodies: Vec<String> = messages
            .iter()
            .map(|m| m.text().unwrap_or_default().to_string())
            .collect();
        let backend = TestBackend::new(50, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                ThreadView { state: &mut *state, messages, bodies: &bodies, me: "alice", loaded }
                    .render(f, f.area())
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_empty_thread_hint() {
        let mut state = MessageListState::new();
        assert!(draw(&mut state, &[], false).contains("Loading..."));
        assert!(draw(&mut state, &[], true).contains("No messages yet"));
    }

    #[test]
    fn test_renders_own_and_peer_messages() {
        let mut state = MessageListState::new();
        let messages = vec![message(1, "bob", "alice", 0), message(2, "alice", "bob", 60)];
        let text = draw(&mut state, &messages, true);
        assert!(text.contains("@bob"));
        assert!(text.contains("you"));
        assert!(text.contains("message 2"));
        assert_eq!(state.heights, vec![3, 3]);
    }

    #[test]
    fn test_scrolling_up_unpins_and_bottom_repins() {
        let mut state = MessageListState::new();
        let messages: Vec<Message> = (1..=10).map(|i| message(i, "bob", "alice", i)).collect();
        draw(&mut state, &messages, true);
        assert!(state.stick_to_bottom);

        state.handle_event(&TuiEvent::ScrollUp);
        assert!(!state.stick_to_bottom);

        // 30 rows of content in a 10-row viewport
        for _ in 0..25 {
            state.handle_event(&TuiEvent::ScrollDown);
        }
        assert!(state.stick_to_bottom);
        assert_eq!(state.scroll_state.offset().y, 20);
    }
}
