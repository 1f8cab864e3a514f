//! Login/logout command handlers
//!
//! `login` exchanges email + password for a bearer token via
//! `POST /api/auth/login` and stores it in the OS keyring; `logout`
//! removes the stored token.

use colored::Colorize;
use std::io::Write;

use crate::api::types::{LoginRequest, LoginResponse};
use crate::auth::TokenStore;
use crate::commands::build_client;
use crate::config::Config;
use crate::error::{AskdeskError, Result};

/// Handle `askdesk login`.
///
/// The email comes from `--email`, falling back to `auth.email` in the
/// config; the password is read from stdin.
pub async fn run_login(config: Config, email: Option<String>) -> Result<()> {
    let email = email
        .or_else(|| config.auth.email.clone())
        .ok_or_else(|| {
            AskdeskError::Config(
                "no email given; pass --email or set auth.email in the config".to_string(),
            )
        })?;

    print!("Password for {}: ", email);
    std::io::stdout().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end().to_string();

    let client = build_client(&config)?;
    let response: LoginResponse = client
        .post(
            "/api/auth/login",
            &LoginRequest {
                email: email.clone(),
                password,
            },
        )
        .await?;

    let store = TokenStore::new(config.auth.keyring_service.clone());
    store.save(&response.token)?;

    let name = response.user.name.unwrap_or(response.user.email);
    println!("{}", format!("Logged in as {}", name).green());
    Ok(())
}

/// Handle `askdesk logout`: drop the stored bearer token.
pub fn run_logout(config: &Config) -> Result<()> {
    let store = TokenStore::new(config.auth.keyring_service.clone());
    store.clear()?;
    println!("{}", "Logged out.".green());
    Ok(())
}
