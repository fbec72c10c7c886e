//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use namesync_core::{Config, SortMode};

use crate::output::{Output, OutputFormat};

/// Keys accepted by `config set`
const KEYS: &str =
    "api_url, ws_url, request_timeout_secs, snapshot_fallback_ms, default_sort, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "ws_url": config.ws_url,
                    "request_timeout_secs": config.request_timeout_secs,
                    "snapshot_fallback_ms": config.snapshot_fallback_ms,
                    "default_sort": config.default_sort,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.api_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  api_url:              {}", config.api_url);
            println!(
                "  ws_url:               {}",
                config.live_url().unwrap_or("(disabled)")
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  snapshot_fallback_ms: {}",
                if config.snapshot_fallback_ms == 0 {
                    "0 (disabled)".to_string()
                } else {
                    config.snapshot_fallback_ms.to_string()
                }
            );
            println!("  default_sort:         {}", config.default_sort);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: &str, value: &str, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply_setting(&mut config, key, value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Parse `value` for `key` and store it in `config`
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "api_url" => {
            config.api_url = value.to_string();
        }
        "ws_url" => {
            config.ws_url = if value == "none" {
                String::new()
            } else {
                value.to_string()
            };
        }
        "request_timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a number of seconds.")?;
            if secs == 0 {
                bail!("request_timeout_secs must be at least 1 second");
            }
            config.request_timeout_secs = secs;
        }
        "snapshot_fallback_ms" => {
            config.snapshot_fallback_ms = value.parse().context(
                "Invalid value for snapshot_fallback_ms. Use milliseconds (0 disables).",
            )?;
        }
        "default_sort" => {
            config.default_sort = value.parse::<SortMode>().map_err(anyhow::Error::msg)?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}
