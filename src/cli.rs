//! Command-line interface definition for Askdesk
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for login, chat, session management, and settings.

use clap::{Parser, Subcommand};

/// Askdesk - terminal client for a document Q&A service
///
/// Ask questions against your indexed document collections and manage
/// chat sessions from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "askdesk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Override the backend base URL from config
    #[arg(long, env = "ASKDESK_SERVER")]
    pub server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Askdesk
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Authenticate against the backend and store the bearer token
    Login {
        /// Account email (falls back to `auth.email` from config)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Remove the stored bearer token
    Logout,

    /// Start an interactive chat session
    Chat {
        /// Resume a specific session instead of the most recent one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Manage chat sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Inspect or change retrieval/generation settings
    Settings {
        /// Settings subcommand
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List your chat sessions
    List,

    /// Rename a session
    Rename {
        /// Session id
        id: String,

        /// New title
        title: String,
    },

    /// Delete a session
    Delete {
        /// Session id
        id: String,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Show the current settings
    Show,

    /// Set one settings field
    Set {
        /// Field name (top_k, mmr_lambda, temperature, show_images, compact_layout)
        key: String,

        /// New value
        value: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
