//! Settings command handlers

use colored::Colorize;

use crate::cli::SettingsCommand;
use crate::error::{AskdeskError, Result};
use crate::settings::SettingsStore;

/// Handle `askdesk settings ...` subcommands.
pub fn handle_settings(command: SettingsCommand) -> Result<()> {
    let mut store = SettingsStore::new()?;

    match command {
        SettingsCommand::Show => {
            let settings = store.get();
            println!("top_k          = {}", settings.top_k);
            println!("mmr_lambda     = {}", settings.mmr_lambda);
            println!("temperature    = {}", settings.temperature);
            println!("show_images    = {}", settings.show_images);
            println!("compact_layout = {}", settings.compact_layout);
        }
        SettingsCommand::Set { key, value } => {
            let mut settings = store.get();
            match key.as_str() {
                "top_k" => {
                    settings.top_k = value.parse().map_err(|_| {
                        AskdeskError::Settings(format!("top_k must be an integer, got '{}'", value))
                    })?;
                }
                "mmr_lambda" => {
                    settings.mmr_lambda = parse_unit_interval("mmr_lambda", &value)?;
                }
                "temperature" => {
                    settings.temperature = value.parse().map_err(|_| {
                        AskdeskError::Settings(format!(
                            "temperature must be a number, got '{}'",
                            value
                        ))
                    })?;
                }
                "show_images" => {
                    settings.show_images = parse_bool("show_images", &value)?;
                }
                "compact_layout" => {
                    settings.compact_layout = parse_bool("compact_layout", &value)?;
                }
                other => {
                    return Err(AskdeskError::Settings(format!(
                        "unknown settings field: {}",
                        other
                    ))
                    .into());
                }
            }
            store.update(settings)?;
            println!("{}", format!("Set {} = {}", key, value).green());
        }
    }

    Ok(())
}

fn parse_unit_interval(field: &str, value: &str) -> Result<f64> {
    let parsed: f64 = value.parse().map_err(|_| {
        AskdeskError::Settings(format!("{} must be a number, got '{}'", field, value))
    })?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(
            AskdeskError::Settings(format!("{} must be between 0.0 and 1.0", field)).into(),
        );
    }
    Ok(parsed)
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(AskdeskError::Settings(format!(
            "{} must be true or false, got '{}'",
            field, value
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("f", "true").unwrap());
        assert!(parse_bool("f", "ON").unwrap());
        assert!(!parse_bool("f", "no").unwrap());
        assert!(parse_bool("f", "maybe").is_err());
    }

    #[test]
    fn test_parse_unit_interval_bounds() {
        assert_eq!(parse_unit_interval("f", "0.5").unwrap(), 0.5);
        assert!(parse_unit_interval("f", "1.5").is_err());
        assert!(parse_unit_interval("f", "abc").is_err());
    }
}
