//! # ConversationPanel Component
//!
//! Left sidebar: a search box over a list of peers. The list shows search
//! results while a query is typed, recent conversations otherwise, and
//! discoverable users for an account that has no conversations yet.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::api::{ConversationSummary, User};
use crate::core::conversations::{ConversationList, ListSource};
use crate::core::thread::media_label;
use crate::tui::component::Component;

const PREVIEW_CHARS: usize = 24;

pub struct ConversationPanel<'a> {
    pub list: &'a ConversationList,
    /// Text in the search box (may be ahead of the last issued query)
    pub search: &'a str,
    pub search_focused: bool,
    pub list_focused: bool,
    /// Handle of the open thread, marked in the list
    pub open_peer: Option<&'a str>,
}

/// One-line preview of a conversation's last message.
pub fn preview(summary: &ConversationSummary, me: &str) -> String {
    let Some(last) = &summary.last_message else {
        return String::new();
    };
    let body = match last.text() {
        Some(text) => text.lines().next().unwrap_or_default().to_string(),
        None => media_label(last.kind()).to_string(),
    };
    let body = if body.chars().count() > PREVIEW_CHARS {
        let cut: String = body.chars().take(PREVIEW_CHARS - 1).collect();
        format!("{cut}…")
    } else {
        body
    };
    if last.sender == me {
        format!("You: {body}")
    } else {
        body
    }
}

fn peer_line<'a>(user: &'a User, is_open: bool) -> Line<'a> {
    let marker = if is_open { "▸ " } else { "  " };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(user.display_name(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!(" @{}", user.username), Style::default().fg(Color::DarkGray)),
    ])
}

impl<'a> Component for ConversationPanel<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [search_area, list_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);

        let focus_style = |focused: bool| {
            if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            }
        };

        let search = Paragraph::new(self.search).block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .border_style(focus_style(self.search_focused))
                .title("Search"),
        );
        frame.render_widget(search, search_area);
        if self.search_focused {
            let x = search_area.x + 1 + (self.search.width() as u16).min(search_area.width.saturating_sub(3));
            frame.set_cursor_position(Position::new(x, search_area.y + 1));
        }

        let source = self.list.source();
        let title = match source {
            ListSource::SearchResults => "Results",
            ListSource::Conversations => "Conversations",
            ListSource::Discover => "Discover",
        };
        let items: Vec<ListItem> = match source {
            ListSource::Conversations => self
                .list
                .conversations
                .iter()
                .map(|summary| {
                    let is_open = self.open_peer == Some(summary.peer.username.as_str());
                    ListItem::new(vec![
                        peer_line(&summary.peer, is_open),
                        Line::styled(
                            format!("  {}", preview(summary, self.list.me())),
                            Style::default().fg(Color::Gray),
                        ),
                    ])
                })
                .collect(),
            _ => self
                .list
                .peers()
                .into_iter()
                .map(|user| {
                    let is_open = self.open_peer == Some(user.username.as_str());
                    ListItem::new(peer_line(user, is_open))
                })
                .collect(),
        };

        let empty = items.is_empty();
        let list = List::new(items)
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(focus_style(self.list_focused))
                    .title(title),
            )
            .highlight_style(Style::default().bg(Color::DarkGray));
        let mut state = ListState::default();
        if self.list_focused && !empty {
            state.select(Some(self.list.selected));
        }
        frame.render_stateful_widget(list, list_area, &mut state);

        if empty {
            let hint = match source {
                ListSource::SearchResults => "No users found",
                _ => "No conversations yet. Search for someone to chat with",
            };
            let inner = Rect::new(
                list_area.x + 2,
                list_area.y + 1,
                list_area.width.saturating_sub(4),
                list_area.height.saturating_sub(2),
            );
            frame.render_widget(
                Paragraph::new(hint)
                    .style(Style::default().fg(Color::DarkGray))
                    .wrap(ratatui::widgets::Wrap { trim: true }),
                inner,
            );
        }
    }
}
