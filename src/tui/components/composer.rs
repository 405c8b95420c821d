//! # Composer Component
//!
//! Single-line message input under the thread. The draft text itself lives
//! in `core::thread::Draft`; this component only draws it.
//!
//! When the conversation is blocked the input is replaced by the block
//! notice and no cursor is shown. A staged attachment is named in the
//! border title.

use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::thread::Draft;
use crate::tui::component::Component;

pub struct Composer<'a> {
    pub draft: &'a Draft,
    /// Why sending is disabled, if it is
    pub block_notice: Option<String>,
    pub sending: bool,
    pub focused: bool,
}

impl<'a> Composer<'a> {
    fn title(&self) -> String {
        let mut title = String::from("Message");
        if let Some(attachment) = &self.draft.attachment {
            title.push_str(&format!(" [{}: {}]", attachment.kind, attachment.file_name()));
        }
        if self.sending {
            title.push_str(" (sending...)");
        }
        title
    }
}

/// The tail of `text` that fits in `width` columns.
pub fn visible_tail(text: &str, width: usize) -> &str {
    if text.width() <= width {
        return text;
    }
    let mut used = 0;
    let mut start = text.len();
    for (idx, ch) in text.char_indices().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = idx;
    }
    &text[start..]
}

impl<'a> Component for Composer<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(self.title());

        if let Some(notice) = &self.block_notice {
            let banner = Paragraph::new(notice.as_str())
                .style(Style::default().fg(Color::Red))
                .block(block);
            frame.render_widget(banner, area);
            return;
        }

        // Leave one column for the cursor
        let width = area.width.saturating_sub(3) as usize;
        let shown = visible_tail(&self.draft.text, width);
        frame.render_widget(Paragraph::new(shown).block(block), area);

        if self.focused {
            let x = area.x + 1 + shown.width() as u16;
            frame.set_cursor_position(Position::new(x, area.y + 1));
        }
    }
}
