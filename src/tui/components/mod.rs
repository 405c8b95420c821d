//! # TUI Components
//!
//! All UI components for the terminal interface.
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Created fresh each frame with everything they draw:
//! - `TitleBar`: server, signed-in user, open peer
//! - `AuthView`: login / registration form
//! - `ConversationPanel`: search box and peer list
//! - `MessageBubble`: a single message
//! - `Composer`: message input, or the block banner
//! - `RecorderBar`: voice note clock and hints
//!
//! ### Stateful Components (Event-Driven)
//!
//! - `ThreadView`: scrollable thread, backed by `MessageListState` which
//!   lives in `TuiState` and handles scroll events
//!
//! Components receive external data as "props" (struct fields), never the
//! whole `App`, so each one can be rendered against a `TestBackend` alone.
//!
//! ```text
//! components/
//! ├── mod.rs                (this file)
//! ├── title_bar.rs
//! ├── auth_form.rs
//! ├── conversation_list.rs
//! ├── message.rs
//! ├── message_list.rs
//! ├── composer.rs
//! └── recorder_bar.rs
//! ```

mod auth_form;
mod composer;
mod conversation_list;
pub mod message;
pub mod message_list;
mod recorder_bar;
mod title_bar;

pub use auth_form::AuthView;
pub use composer::Composer;
pub use conversation_list::ConversationPanel;
pub use message_list::{MessageListState, ThreadView};
pub use recorder_bar::RecorderBar;
pub use title_bar::TitleBar;
