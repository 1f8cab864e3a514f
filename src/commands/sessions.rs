//! Session management command handlers

use colored::Colorize;
use prettytable::{format, Table};

use crate::api::types::{RenameBody, SessionRecord};
use crate::cli::SessionCommand;
use crate::commands::build_client;
use crate::config::Config;
use crate::error::Result;

/// Handle `askdesk sessions ...` subcommands.
pub async fn handle_sessions(config: Config, command: SessionCommand) -> Result<()> {
    let client = build_client(&config)?;

    match command {
        SessionCommand::List => {
            let sessions: Vec<SessionRecord> = client.get("/api/chat/sessions").await?;

            if sessions.is_empty() {
                println!("{}", "No chat sessions found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Last Message".bold(),
                "Updated".bold()
            ]);

            for session in sessions {
                let title = session
                    .session_title
                    .unwrap_or_else(|| "New Chat".to_string());
                let title = if title.len() > 40 {
                    format!("{}...", &title[..37])
                } else {
                    title
                };
                let preview = session
                    .last_message
                    .map(|m| {
                        if m.len() > 30 {
                            format!("{}...", &m[..27])
                        } else {
                            m
                        }
                    })
                    .unwrap_or_else(|| "-".to_string());
                let updated = session
                    .last_message_at
                    .unwrap_or(session.updated_at)
                    .format("%Y-%m-%d %H:%M")
                    .to_string();

                table.add_row(prettytable::row![
                    session.id.cyan(),
                    title,
                    preview,
                    updated
                ]);
            }

            println!("\nChat Sessions:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume a session.",
                "askdesk chat --session <ID>".cyan()
            );
            println!();
        }
        SessionCommand::Rename { id, title } => {
            let _updated: SessionRecord = client
                .patch(
                    &format!("/api/chat/sessions/{}", id),
                    &RenameBody {
                        session_title: title.clone(),
                    },
                )
                .await?;
            println!("{}", format!("Renamed session {} to '{}'", id, title).green());
        }
        SessionCommand::Delete { id } => {
            client.delete(&format!("/api/chat/sessions/{}", id)).await?;
            println!("{}", format!("Deleted session {}", id).green());
        }
    }

    Ok(())
}
