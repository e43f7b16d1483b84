//! Shared CLI helpers — path expansion, image loading, response printing, banner.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use unillm_core::Media;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Guess an image MIME type from the file extension.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file into base64 media.
pub fn load_image(path: &Path) -> Result<Media> {
    let path = expand_tilde(&path.to_string_lossy());
    let Some(media_type) = guess_mime(&path) else {
        bail!("unsupported image type: {}", path.display());
    };
    let bytes = std::fs::read(&path)
        .with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(Media::from_bytes(media_type, &bytes))
}

/// Print a full (non-streamed) reply to stdout.
pub fn print_response(label: &str, response: &str) {
    println!();
    println!("{}", label.cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print the header shown before a streamed reply.
pub fn print_stream_header(label: &str) {
    println!();
    println!("{}", label.cyan().bold());
}

/// Print an error line to stderr.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("\n{} {err:#}\n", "Error:".red().bold());
}

/// Print the banner shown at REPL start.
pub fn print_banner(provider: &str, model: Option<&str>) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "unillm".cyan().bold(), version.dimmed());
    println!(
        "{} {}",
        provider.bold(),
        model.map(|m| format!("({m})")).unwrap_or_default().dimmed()
    );
    println!(
        "{}",
        "Type a message, /help for commands, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/foo/bar");
        assert!(result.ends_with("foo/bar"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand_tilde("relative/path"), PathBuf::from("relative/path"));
    }

    #[test]
    fn guess_mime_by_extension() {
        assert_eq!(guess_mime(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(guess_mime(Path::new("/x/photo.jpeg")), Some("image/jpeg"));
        assert_eq!(guess_mime(Path::new("anim.gif")), Some("image/gif"));
        assert_eq!(guess_mime(Path::new("notes.txt")), None);
        assert_eq!(guess_mime(Path::new("no_extension")), None);
    }

    #[test]
    fn load_image_encodes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let media = load_image(&path).unwrap();
        assert_eq!(media.media_type, "image/png");
        assert_eq!(media.data, "iVBORw==");
    }

    #[test]
    fn load_image_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        assert!(load_image(&path).is_err());
    }

    #[test]
    fn load_image_missing_file() {
        assert!(load_image(Path::new("/nonexistent/pic.png")).is_err());
    }
}
