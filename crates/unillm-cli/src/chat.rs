//! `unillm chat` and `unillm transcribe`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use unillm_core::Media;
use unillm_providers::transcription::is_audio_file;
use unillm_providers::{ChatReply, SchemaProvider, TranscriptionProvider, WhisperTranscriber};

use crate::helpers;
use crate::repl;
use crate::runtime::Runtime;

/// Flags shared by single-shot and REPL chat.
#[derive(Debug, Default)]
pub struct ChatOptions {
    pub provider: Option<String>,
    pub stream: bool,
    pub image: Option<PathBuf>,
    pub system: Option<String>,
    pub model: Option<String>,
}

pub async fn run(runtime: &Runtime, options: ChatOptions, message: Option<String>) -> Result<()> {
    let name = runtime.provider_name(options.provider.as_deref());
    let mut provider = runtime.open(&name).await?;
    configure(&mut provider, &options)?;

    let stream = options.stream || runtime.config.defaults.stream;
    let image = options.image.as_deref().map(helpers::load_image).transpose()?;

    match message {
        Some(msg) => {
            info!(provider = %name, "processing single message");
            let reply = send_turn(&mut provider, &msg, image.as_ref(), stream).await?;
            if !stream {
                helpers::print_response(provider.display_name(), &reply.text);
            }
            Ok(())
        }
        None => repl::run(provider, stream, image).await,
    }
}

/// Apply `--model` and `--system` to a fresh session.
pub fn configure(provider: &mut SchemaProvider, options: &ChatOptions) -> Result<()> {
    let context = provider.context_mut();
    if let Some(model) = &options.model {
        context.set_model(model.as_str()).context("invalid --model")?;
    }
    if let Some(system) = &options.system {
        context
            .set_system_message(system.as_str())
            .context("cannot use --system")?;
    }
    Ok(())
}

/// Send one turn, printing deltas live when streaming.
pub async fn send_turn(
    provider: &mut SchemaProvider,
    text: &str,
    media: Option<&Media>,
    stream: bool,
) -> Result<ChatReply> {
    if !stream {
        return Ok(provider.chat(text, media).await?);
    }

    helpers::print_stream_header(provider.display_name());
    let reply = provider
        .chat_stream(text, media, |delta| {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();
    println!();
    Ok(reply?)
}

// ─────────────────────────────────────────────
// Transcribe
// ─────────────────────────────────────────────

pub async fn transcribe(runtime: &Runtime, file: &Path) -> Result<()> {
    let transcriber = WhisperTranscriber::new(&runtime.config.transcription);
    if !transcriber.is_configured() {
        anyhow::bail!(
            "no transcription API key: set transcription.apiKey in the config or GROQ_API_KEY"
        );
    }

    let path = helpers::expand_tilde(&file.to_string_lossy());
    if !path.exists() {
        anyhow::bail!("file not found: {}", path.display());
    }
    if !is_audio_file(&path.to_string_lossy()) {
        warn!(path = %path.display(), "file does not look like audio, sending anyway");
    }

    let transcript = transcriber
        .transcribe(&path)
        .await
        .with_context(|| format!("transcription of {} failed", path.display()))?;

    println!();
    println!(
        "{}  {}",
        transcriber.display_name().cyan().bold(),
        format!("confidence {:.2}", transcript.confidence).dimmed()
    );
    println!("{}", transcript.text);
    println!();
    Ok(())
}
