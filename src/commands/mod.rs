//! Command handlers for the Askdesk CLI
//!
//! Each submodule handles one top-level subcommand: authentication,
//! the interactive chat loop, session management, and settings.

pub mod chat;
pub mod login;
pub mod sessions;
pub mod settings;

use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::auth::KeyringTokenSource;
use crate::config::Config;
use crate::error::Result;

/// Build the authenticated API client from the loaded configuration.
///
/// The keyring-backed token source is what lets a token stored by
/// `askdesk login` in another terminal become visible to the retry path
/// of an already-running chat.
pub fn build_client(config: &Config) -> Result<Arc<ApiClient>> {
    let tokens = Arc::new(KeyringTokenSource::new(config.auth.keyring_service.clone()));
    let client = ApiClient::new(
        config.base_url(),
        tokens,
        Duration::from_secs(config.server.timeout_secs),
    )?;
    Ok(Arc::new(client))
}
