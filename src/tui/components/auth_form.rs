//! # AuthView Component
//!
//! The login / registration form, centered on screen. One bordered input
//! per field of the active mode; the focused one is highlighted and gets the
//! terminal cursor. Passwords are masked.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::core::auth::{AuthField, AuthForm, AuthMode};
use crate::tui::component::Component;

const FORM_WIDTH: u16 = 48;
const FIELD_HEIGHT: u16 = 3;

pub struct AuthView<'a> {
    pub form: &'a AuthForm,
}

impl<'a> AuthView<'a> {
    pub fn new(form: &'a AuthForm) -> Self {
        Self { form }
    }

    /// What a field shows: its value, or bullets for secrets.
    pub fn shown_value(field: AuthField, value: &str) -> String {
        if field.is_secret() {
            "•".repeat(value.chars().count())
        } else {
            value.to_string()
        }
    }

    fn height(&self) -> u16 {
        // heading + fields + error + hint
        1 + self.form.fields().len() as u16 * FIELD_HEIGHT + 2
    }
}

impl<'a> Component for AuthView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [_, column, _] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(FORM_WIDTH.min(area.width)),
            Constraint::Min(0),
        ])
        .areas(area);
        let [_, form_area, _] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(self.height().min(area.height)),
            Constraint::Min(0),
        ])
        .areas(column);

        let fields = self.form.fields();
        let mut constraints = vec![Constraint::Length(1)];
        constraints.extend(fields.iter().map(|_| Constraint::Length(FIELD_HEIGHT)));
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(1));
        let rows = Layout::vertical(constraints).split(form_area);

        let heading = match self.form.mode {
            AuthMode::Login => "Sign in to Slash",
            AuthMode::Register => "Create a Slash account",
        };
        frame.render_widget(
            Line::styled(heading, Style::default().add_modifier(Modifier::BOLD)),
            rows[0],
        );

        let focused = self.form.focused();
        for (i, field) in fields.iter().enumerate() {
            let is_focused = *field == focused;
            let border_style = if is_focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            let shown = Self::shown_value(*field, self.form.value(*field));
            let input = Paragraph::new(shown.as_str()).block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(border_style)
                    .title(field.label()),
            );
            let field_area = rows[i + 1];
            frame.render_widget(input, field_area);

            if is_focused && !self.form.submitting {
                let x = field_area.x + 1 + (shown.width() as u16).min(field_area.width.saturating_sub(3));
                frame.set_cursor_position(Position::new(x, field_area.y + 1));
            }
        }

        let status_row = rows[fields.len() + 1];
        if self.form.submitting {
            frame.render_widget(
                Line::styled("Signing in...", Style::default().fg(Color::Yellow)),
                status_row,
            );
        } else if let Some(error) = &self.form.error {
            frame.render_widget(
                Line::styled(error.as_str(), Style::default().fg(Color::Red)),
                status_row,
            );
        }

        let hint = match self.form.mode {
            AuthMode::Login => "Enter: sign in  Tab: next field  Ctrl+R: register",
            AuthMode::Register => "Enter: register  Tab: next field  Ctrl+R: sign in",
        };
        frame.render_widget(
            Line::styled(hint, Style::default().fg(Color::DarkGray)),
            rows[fields.len() + 2],
        );
    }
}
