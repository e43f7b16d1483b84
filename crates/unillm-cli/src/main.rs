//! unillm CLI — entry point.
//!
//! # Commands
//!
//! - `unillm chat [-p PROVIDER] [-m MESSAGE]` — chat with one provider (single-shot or REPL)
//! - `unillm broadcast -m MESSAGE -p a,b,c` — send one message to several providers at once
//! - `unillm providers` — list known provider schemas
//! - `unillm status` — show configuration and key status
//! - `unillm transcribe FILE` — speech-to-text

mod broadcast;
mod chat;
mod helpers;
mod providers_cmd;
mod repl;
mod runtime;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::runtime::Runtime;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// unillm — one chat interface over many LLM APIs, driven by JSON schemas
#[derive(Parser)]
#[command(name = "unillm", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with one provider (single-shot or interactive REPL)
    Chat {
        /// Provider name. Defaults to `defaults.provider` from the config.
        #[arg(short, long)]
        provider: Option<String>,

        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Print the reply as it streams in
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Attach an image to the message
        #[arg(long)]
        image: Option<PathBuf>,

        /// System prompt
        #[arg(long)]
        system: Option<String>,

        /// Model (defaults to the schema's default model)
        #[arg(long)]
        model: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Send one message to several providers concurrently
    Broadcast {
        /// Message to send
        #[arg(short, long)]
        message: String,

        /// Comma-separated provider names
        #[arg(short, long, value_delimiter = ',', required = true)]
        providers: Vec<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// List known provider schemas
    Providers,

    /// Show configuration and key status
    Status,

    /// Transcribe an audio file
    Transcribe {
        /// Audio file
        file: PathBuf,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            provider,
            message,
            stream,
            image,
            system,
            model,
            logs,
        } => {
            init_logging(logs);
            let runtime = Runtime::load()?;
            let options = chat::ChatOptions {
                provider,
                stream,
                image,
                system,
                model,
            };
            chat::run(&runtime, options, message).await
        }
        Commands::Broadcast {
            message,
            providers,
            logs,
        } => {
            init_logging(logs);
            broadcast::run(Runtime::load()?, &message, providers).await
        }
        Commands::Providers => {
            init_logging(false);
            providers_cmd::run(&Runtime::load()?).await
        }
        Commands::Status => {
            init_logging(false);
            status::run(&Runtime::load()?).await
        }
        Commands::Transcribe { file, logs } => {
            init_logging(logs);
            chat::transcribe(&Runtime::load()?, &file).await
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("unillm=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_broadcast_provider_list() {
        let cli = Cli::try_parse_from(["unillm", "broadcast", "-m", "hi", "-p", "openai,claude"]).unwrap();
        match cli.command {
            Commands::Broadcast { message, providers, .. } => {
                assert_eq!(message, "hi");
                assert_eq!(providers, vec!["openai", "claude"]);
            }
            _ => panic!("expected broadcast"),
        }
    }

    #[test]
    fn parse_chat_flags() {
        let cli = Cli::try_parse_from([
            "unillm", "chat", "-p", "claude", "-m", "hello", "--stream", "--system", "Be brief",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat {
                provider,
                message,
                stream,
                system,
                image,
                ..
            } => {
                assert_eq!(provider.as_deref(), Some("claude"));
                assert_eq!(message.as_deref(), Some("hello"));
                assert!(stream);
                assert_eq!(system.as_deref(), Some("Be brief"));
                assert!(image.is_none());
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn broadcast_requires_providers() {
        assert!(Cli::try_parse_from(["unillm", "broadcast", "-m", "hi"]).is_err());
    }
}
