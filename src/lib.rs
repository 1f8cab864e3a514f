//! Askdesk - terminal client for a document Q&A service
//!
//! This library provides the client-side coordination for a retrieval
//! backed chat service: session management, the message-send lifecycle
//! with cancellation, an authenticated HTTP client with a bounded retry
//! policy, and client-local settings.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: the chat store owning sessions, the active message log,
//!   and the send state machine
//! - `api`: authenticated request client and the backend wire types
//! - `auth`: bearer-token persistence and the credential accessor
//! - `settings`: client-local retrieval/generation settings blob
//! - `config`: configuration loading and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line surface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use askdesk::api::ApiClient;
//! use askdesk::auth::KeyringTokenSource;
//! use askdesk::session::ChatStore;
//! use askdesk::settings::SettingsStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let tokens = Arc::new(KeyringTokenSource::new("askdesk"));
//!     let client = Arc::new(ApiClient::new(
//!         "http://localhost:8000",
//!         tokens,
//!         Duration::from_secs(30),
//!     )?);
//!     let mut store = ChatStore::new(client, SettingsStore::new()?);
//!     store.load_sessions().await;
//!     store.send_message("What is the refund policy?").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use api::ApiClient;
pub use config::Config;
pub use error::{AskdeskError, Result};
pub use session::{ChatMessage, ChatStore, Citation, Role, SessionSummary};
pub use settings::{Settings, SettingsStore};
