//! Interactive chat command handler
//!
//! Runs a readline-based loop over a [`ChatStore`]: plain lines are sent
//! as questions, slash commands manage sessions, and Ctrl+C during a
//! pending answer stops generation without quitting the loop.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::api::types::Feedback;
use crate::commands::build_client;
use crate::config::Config;
use crate::error::Result;
use crate::session::{ChatMessage, ChatStore, Role};
use crate::settings::SettingsStore;

/// Start interactive chat.
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `session` - Optional session id to resume instead of the most recent
pub async fn run_chat(config: Config, session: Option<String>) -> Result<()> {
    tracing::info!("Starting interactive chat");

    let client = build_client(&config)?;
    let settings = SettingsStore::new()?;
    let mut store = ChatStore::new(client, settings);

    store.load_sessions().await;
    if let Some(id) = session {
        if let Err(e) = store.select_session(&id).await {
            println!("{}", format!("Cannot resume session {}: {}", id, e).yellow());
        }
    }

    print_banner(&store);
    for message in store.messages() {
        print_message(message);
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("ask> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                // A new keystroke dismisses the previous error banner.
                store.clear_error();

                if let Some(command) = trimmed.strip_prefix('/') {
                    if !handle_command(&mut store, command).await? {
                        break;
                    }
                    continue;
                }

                send_and_render(&mut store, trimmed).await?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("{}", "Bye.".cyan());
    Ok(())
}

/// Dispatch a question and render the outcome, racing the pending answer
/// against Ctrl+C so the user can stop generation.
async fn send_and_render(store: &mut ChatStore, text: &str) -> Result<()> {
    let stop = store.stop_handle();
    println!("{}", "Thinking... (Ctrl+C to stop)".dimmed());

    tokio::select! {
        result = store.send_message(text) => result?,
        _ = tokio::signal::ctrl_c() => {
            stop.stop();
            println!("{}", "Stopped.".yellow());
            return Ok(());
        }
    }

    if let Some(error) = store.last_error() {
        println!("{}", error.red());
        println!("{}", "Your question is kept; use /regen to retry.".dimmed());
        return Ok(());
    }
    if let Some(message) = store.messages().last() {
        if message.role == Role::Assistant {
            print_message(message);
        }
    }
    Ok(())
}

/// Handle a slash command. Returns `false` when the loop should exit.
async fn handle_command(store: &mut ChatStore, command: &str) -> Result<bool> {
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(false),
        "help" => print_help(),
        "sessions" => {
            for session in store.sessions() {
                let marker = if store.active_id() == Some(session.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    " {} {}  {}  {}",
                    marker,
                    session.id.cyan(),
                    session.title,
                    session.recency().format("%Y-%m-%d %H:%M").to_string().dimmed()
                );
            }
        }
        "new" => {
            if let Err(e) = store.create_session().await {
                println!("{}", format!("Failed to create session: {}", e).red());
            } else {
                println!("{}", "Started a new chat.".green());
            }
        }
        "switch" => {
            if rest.is_empty() {
                println!("Usage: /switch <session-id>");
            } else if let Err(e) = store.select_session(rest).await {
                println!("{}", e.to_string().yellow());
            } else {
                print_banner(store);
                for message in store.messages() {
                    print_message(message);
                }
            }
        }
        "rename" => {
            if rest.is_empty() {
                println!("Usage: /rename <new title>");
            } else {
                let id = store.active_id().map(ToString::to_string);
                match id {
                    Some(id) => {
                        if let Err(e) = store.rename_session(&id, rest).await {
                            println!("{}", format!("Rename failed: {}", e).red());
                        }
                    }
                    None => println!("{}", "No active session.".yellow()),
                }
            }
        }
        "regen" => {
            let stop = store.stop_handle();
            println!("{}", "Thinking... (Ctrl+C to stop)".dimmed());
            tokio::select! {
                result = store.regenerate() => {
                    if let Err(e) = result {
                        println!("{}", e.to_string().yellow());
                    } else if let Some(error) = store.last_error() {
                        println!("{}", error.red());
                    } else if let Some(message) = store.messages().last() {
                        if message.role == Role::Assistant {
                            print_message(message);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    stop.stop();
                    println!("{}", "Stopped.".yellow());
                }
            }
        }
        "up" | "down" => {
            let feedback = if name == "up" { Feedback::Up } else { Feedback::Down };
            let target = store
                .messages()
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant && m.query_id.is_some())
                .map(|m| m.id.clone());
            match target {
                Some(id) => {
                    store.submit_feedback(&id, feedback).await?;
                    if let Some(error) = store.last_error() {
                        println!("{}", error.yellow());
                    } else {
                        println!("{}", "Feedback recorded.".green());
                    }
                }
                None => println!("{}", "No answer to rate yet.".yellow()),
            }
        }
        other => println!("Unknown command: /{} (try /help)", other),
    }
    Ok(true)
}

fn print_banner(store: &ChatStore) {
    match store.active_session() {
        Some(session) => {
            println!();
            println!("{} {}", "Session:".bold(), session.title);
        }
        None => println!("{}", "No active session; /new starts one.".yellow()),
    }
}

fn print_message(message: &ChatMessage) {
    match message.role {
        Role::User => println!("{} {}", "you:".bold().cyan(), message.text),
        Role::Assistant => {
            println!("{} {}", "answer:".bold().green(), message.text);
            for citation in &message.citations {
                println!(
                    "    {} {} p.{} ({})",
                    "↳".dimmed(),
                    citation.filename,
                    citation.page,
                    citation.collection_name
                );
            }
            if !message.followups.is_empty() {
                println!("    {}", "You could also ask:".dimmed());
                for followup in &message.followups {
                    println!("    - {}", followup.dimmed());
                }
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /sessions          list your sessions (* marks the active one)");
    println!("  /new               start a new session");
    println!("  /switch <id>       switch to another session");
    println!("  /rename <title>    rename the active session");
    println!("  /regen             re-ask the last question");
    println!("  /up, /down         rate the last answer");
    println!("  /quit              leave");
}
