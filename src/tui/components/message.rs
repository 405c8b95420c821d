use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::api::{Message, MessageKind};
use crate::tui::component::Component;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// A stateless component that renders a single chat message.
///
/// # Design
///
/// `MessageBubble` is a **transient component**: it's created fresh each frame
/// with the data it needs. The body is resolved by the caller (text, or a
/// media label with its URL) so the bubble never touches the API client.
///
/// # Styling
///
/// - **Own messages** (green), titled "you"
/// - **Peer messages** (blue), titled with the peer's handle
/// - **Media** bodies are magenta regardless of sender
///
/// # Height Calculation
///
/// [`calculate_height`](Self::calculate_height) predicts the rendered height
/// with `textwrap` options that match Ratatui's `Paragraph` wrapping, so the
/// thread view can lay out its scroll canvas without rendering.
#[derive(Clone, Copy)]
pub struct MessageBubble<'a> {
    pub message: &'a Message,
    pub body: &'a str,
    pub is_mine: bool,
}

impl<'a> MessageBubble<'a> {
    pub fn new(message: &'a Message, body: &'a str, is_mine: bool) -> Self {
        Self { message, body, is_mine }
    }

    /// Calculate the height required for `body` given a width.
    pub fn calculate_height(body: &str, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Too narrow for borders + padding; still occupy a row.
            return 1;
        }

        let content = body.trim();
        if content.is_empty() {
            return VERTICAL_OVERHEAD;
        }

        let options = textwrap::Options::new(content_width as usize)
            .break_words(true)
            .word_separator(textwrap::WordSeparator::AsciiSpace);

        let lines = textwrap::wrap(content, options);
        (lines.len() as u16).max(1) + VERTICAL_OVERHEAD
    }

    fn title(&self) -> String {
        let who = if self.is_mine {
            "you".to_string()
        } else {
            format!("@{}", self.message.sender)
        };
        format!("{} · {}", who, self.message.created_at.format("%H:%M"))
    }
}

pub fn sender_style(is_mine: bool) -> Style {
    if is_mine {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Blue)
    }
}

impl<'a> Widget for MessageBubble<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = sender_style(self.is_mine);
        let border_style = style.add_modifier(Modifier::DIM);
        let body_style = if self.message.kind() == MessageKind::Text {
            Style::default()
        } else {
            Style::default().fg(Color::Magenta)
        };

        let block = Block::bordered()
            .title(self.title())
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);

        Paragraph::new(self.body.trim())
            .style(body_style)
            .wrap(Wrap { trim: true })
            .render(inner_area, buf);
    }
}

impl<'a> Component for MessageBubble<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculate_height_empty_content_returns_border_height() {
        assert_eq!(MessageBubble::calculate_height("", 80), VERTICAL_OVERHEAD);
        assert_eq!(MessageBubble::calculate_height("  \n\t ", 80), VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_zero_width_returns_minimum() {
        assert_eq!(MessageBubble::calculate_height("Hello world", 0), 1);
        assert_eq!(MessageBubble::calculate_height("Hello world", HORIZONTAL_OVERHEAD), 1);
    }

    #[test]
    fn calculate_height_wraps_at_width_boundary() {
        // width 9 → content width 5: "Hello" | "world"
        assert_eq!(MessageBubble::calculate_height("Hello world", 9), 2 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_breaks_long_urls() {
        // width 8 → content width 4
        assert_eq!(MessageBubble::calculate_height("abcdefghij", 8), 3 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn style_follows_sender() {
        assert_eq!(sender_style(true).fg, Some(Color::Green));
        assert_eq!(sender_style(false).fg, Some(Color::Blue));
    }
}
