//! `unillm status` — show configuration and key status.

use anyhow::Result;
use colored::Colorize;

use unillm_core::config::get_config_path;
use unillm_core::keys::{env_key_name, KeySource};
use unillm_providers::transcription::WhisperTranscriber;
use unillm_providers::SchemaSource;

use crate::runtime::Runtime;

/// Run the status command.
pub async fn run(runtime: &Runtime) -> Result<()> {
    let config = &runtime.config;
    let config_path = get_config_path();

    println!();
    println!("{}", "unillm status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );
    println!("  {:<18} {}", "Default provider:".bold(), config.defaults.provider);
    println!(
        "  {:<18} {} | {} | {} | {}",
        "Defaults:".bold(),
        format!(
            "max_tokens: {}",
            config.defaults.max_tokens.map_or("-".to_string(), |n| n.to_string())
        )
        .dimmed(),
        format!(
            "temp: {}",
            config.defaults.temperature.map_or("-".to_string(), |t| t.to_string())
        )
        .dimmed(),
        format!("stream: {}", config.defaults.stream).dimmed(),
        format!("validation: {}", config.defaults.validation).dimmed(),
    );
    println!("  {:<18} {}", "Schemas:".bold(), runtime.source.describe());

    println!();
    println!("  {}", "Providers:".bold());
    for name in runtime.source.available().await {
        println!("    {:<20} {}", name, key_status(runtime, &name));
    }

    println!();
    let transcription = if WhisperTranscriber::new(&config.transcription).is_configured() {
        format!("{} ({})", "✓".green(), config.transcription.model)
    } else {
        format!("{}", "· not configured".dimmed())
    };
    println!("  {:<18} {}", "Transcription:".bold(), transcription);
    println!();

    Ok(())
}

fn key_status(runtime: &Runtime, provider: &str) -> String {
    match runtime.keys.source(provider) {
        Some(KeySource::Explicit) => format!("{} (key set)", "✓".green()),
        Some(KeySource::Session) => format!("{} (key from {})", "✓".green(), env_key_name(provider)),
        Some(KeySource::Persistent) => format!("{} (key in config)", "✓".green()),
        None => format!("{}", "· not configured".dimmed()),
    }
}
