//! # TitleBar Component
//!
//! Top status bar: which server we talk to, who is signed in, and who the
//! open thread is with.
//!
//! Stateless: it receives everything as props and renders a single line.
//! The title text changes with state:
//!
//! 1. **In a thread**: `"Slash (http://localhost:8000) | @alice | with @bob"`
//! 2. **Signed in**: `"Slash (http://localhost:8000) | @alice"`
//! 3. **Signed out**: `"Slash (http://localhost:8000)"`

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

use crate::tui::component::Component;

pub struct TitleBar {
    /// API base URL
    pub server: String,
    /// Handle of the signed-in user
    pub user: Option<String>,
    /// Handle of the open thread's peer
    pub peer: Option<String>,
}

impl TitleBar {
    pub fn new(server: String, user: Option<String>, peer: Option<String>) -> Self {
        Self { server, user, peer }
    }

    pub fn text(&self) -> String {
        let mut title = format!("Slash ({})", self.server);
        if let Some(user) = &self.user {
            title.push_str(&format!(" | @{user}"));
        }
        if let Some(peer) = &self.peer {
            title.push_str(&format!(" | with @{peer}"));
        }
        title
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let span = Span::styled(self.text(), Style::default().add_modifier(Modifier::BOLD));
        frame.render_widget(span, area);
    }
}
