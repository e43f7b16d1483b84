//! Interactive REPL over one provider session.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Lines starting with `/` drive the session's context directly.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use serde_json::Value;
use tracing::debug;

use unillm_core::utils::truncate_string;
use unillm_core::Media;
use unillm_providers::SchemaProvider;

use crate::chat::send_turn;
use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

const HELP: &str = "\
/help              show this help
/reset             forget messages, system prompt, parameters and model
/clear             forget messages only
/model NAME        switch model
/system [TEXT]     set the system prompt (no text clears it)
/set KEY VALUE     set a request parameter (VALUE is JSON, else a string)
/unset KEY         remove a request parameter
/image PATH        attach an image to the next message
/stream            toggle streaming
/history           show how many messages are in the conversation";

/// A parsed slash command.
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Reset,
    Clear,
    Model(String),
    System(Option<String>),
    Set(String, Value),
    Unset(String),
    Image(String),
    Stream,
    History,
    Unknown(String),
}

/// Run the interactive REPL loop.
pub async fn run(mut provider: SchemaProvider, mut stream: bool, mut pending_image: Option<Media>) -> Result<()> {
    helpers::print_banner(provider.display_name(), provider.context().model());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if let Some(command) = parse_command(trimmed) {
            apply_command(&mut provider, command, &mut stream, &mut pending_image);
            continue;
        }

        debug!(
            provider = provider.context().provider_name(),
            input = %truncate_string(trimmed, 80),
            "processing input"
        );
        if !stream {
            helpers::print_thinking();
        }

        let result = send_turn(&mut provider, trimmed, pending_image.as_ref(), stream).await;
        if !stream {
            helpers::clear_thinking();
        }
        match result {
            Ok(reply) => {
                pending_image = None;
                if !stream {
                    helpers::print_response(provider.display_name(), &reply.text);
                }
            }
            Err(e) => helpers::print_error(&e),
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Parse a `/command`. Returns `None` for ordinary chat input.
fn parse_command(input: &str) -> Option<Command> {
    let rest = input.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match (name.to_lowercase().as_str(), arg) {
        ("help", _) => Command::Help,
        ("reset", _) => Command::Reset,
        ("clear", _) => Command::Clear,
        ("stream", _) => Command::Stream,
        ("history", _) => Command::History,
        ("model", model) if !model.is_empty() => Command::Model(model.to_string()),
        ("system", "") => Command::System(None),
        ("system", text) => Command::System(Some(text.to_string())),
        ("unset", key) if !key.is_empty() => Command::Unset(key.to_string()),
        ("image", path) if !path.is_empty() => Command::Image(path.to_string()),
        ("set", args) => match args.split_once(char::is_whitespace) {
            Some((key, raw)) => Command::Set(key.to_string(), parse_value(raw.trim())),
            None => Command::Unknown(input.to_string()),
        },
        _ => Command::Unknown(input.to_string()),
    };
    Some(command)
}

/// JSON when it parses (`0.5`, `true`, `["a"]`), otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn apply_command(
    provider: &mut SchemaProvider,
    command: Command,
    stream: &mut bool,
    pending_image: &mut Option<Media>,
) {
    let context = provider.context_mut();
    let outcome: Result<String> = match command {
        Command::Help => Ok(HELP.to_string()),
        Command::Reset => {
            context.reset();
            // Reseed the schema default so the session can still send.
            if let Some(default) = context.schema().default_model().map(String::from) {
                let _ = context.set_model(default);
            }
            *pending_image = None;
            Ok("Context reset.".to_string())
        }
        Command::Clear => {
            context.clear_messages();
            Ok("Conversation cleared.".to_string())
        }
        Command::Model(model) => context
            .set_model(model.as_str())
            .map(|_| format!("Model set to {model}."))
            .map_err(Into::into),
        Command::System(None) => {
            context.clear_system_message();
            Ok("System prompt cleared.".to_string())
        }
        Command::System(Some(text)) => context
            .set_system_message(text)
            .map(|_| "System prompt set.".to_string())
            .map_err(Into::into),
        Command::Set(key, value) => context
            .set_parameter(&key, value.clone())
            .map(|_| format!("{key} = {value}"))
            .map_err(Into::into),
        Command::Unset(key) => Ok(match context.remove_parameter(&key) {
            Some(_) => format!("{key} removed."),
            None => format!("{key} was not set."),
        }),
        Command::Image(path) => helpers::load_image(std::path::Path::new(&path)).map(|media| {
            let note = format!("Attached {} for the next message.", media.media_type);
            *pending_image = Some(media);
            note
        }),
        Command::Stream => {
            *stream = !*stream;
            Ok(format!("Streaming {}.", if *stream { "on" } else { "off" }))
        }
        Command::History => Ok(format!("{} message(s) in context.", context.messages().len())),
        Command::Unknown(input) => Err(anyhow::anyhow!("unknown command {input}, try /help")),
    };

    match outcome {
        Ok(message) => println!("{}", message.dimmed()),
        Err(e) => helpers::print_error(&e),
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    unillm_core::utils::get_data_path().join("history").join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
