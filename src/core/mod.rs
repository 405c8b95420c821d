//! # Core Application Logic
//!
//! This module contains Slash's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No UI. Talks to the    │
//!                    │  server via ChatApi.    │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    TUI     │      │  ChatApi   │      │   Audio    │
//!     │  Adapter   │      │ (reqwest)  │      │  Capture   │
//!     │ (ratatui)  │      │            │      │  (cpal)    │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`auth`], [`conversations`], [`thread`], [`recorder`]: one per screen area
//! - [`scheduler`]: background polling
//! - [`session`], [`config`]: persistence and settings

pub mod action;
pub mod attachment;
pub mod auth;
pub mod command;
pub mod config;
pub mod conversations;
pub mod error;
pub mod recorder;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod thread;

pub use error::ClientError;
