//! `unillm broadcast` — one message, several providers, concurrently.
//!
//! Each provider gets its own task and its own context; nothing is shared
//! between them but the runtime (config, keys, schema lookup, transport).

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tracing::{debug, error};

use crate::helpers;
use crate::runtime::Runtime;

/// Result of one provider's turn.
#[derive(Debug)]
pub struct BroadcastResult {
    pub provider: String,
    pub outcome: Result<String>,
}

pub async fn run(runtime: Runtime, message: &str, providers: Vec<String>) -> Result<()> {
    let names = normalize(providers);
    if names.is_empty() {
        anyhow::bail!("no providers given");
    }

    helpers::print_thinking();
    let results = fan_out(Arc::new(runtime), message, &names).await;
    helpers::clear_thinking();

    let mut failures = 0;
    for result in &results {
        match &result.outcome {
            Ok(text) => helpers::print_response(&result.provider, text),
            Err(e) => {
                failures += 1;
                println!();
                println!("{}", result.provider.cyan().bold());
                println!("{} {e:#}", "Error:".red().bold());
                println!();
            }
        }
    }

    if failures == results.len() {
        anyhow::bail!("every provider failed");
    }
    Ok(())
}

/// Send `message` to every provider at once. Results come back in `names` order.
pub async fn fan_out(runtime: Arc<Runtime>, message: &str, names: &[String]) -> Vec<BroadcastResult> {
    let tasks: Vec<_> = names
        .iter()
        .cloned()
        .map(|name| {
            let runtime = runtime.clone();
            let message = message.to_string();
            tokio::spawn(async move {
                let outcome = ask(&runtime, &name, &message).await;
                BroadcastResult { provider: name, outcome }
            })
        })
        .collect();

    let mut results = Vec::with_capacity(tasks.len());
    for (name, joined) in names.iter().zip(futures::future::join_all(tasks).await) {
        results.push(joined.unwrap_or_else(|e| {
            error!(provider = %name, error = %e, "broadcast task failed");
            BroadcastResult {
                provider: name.clone(),
                outcome: Err(anyhow::anyhow!("task failed: {e}")),
            }
        }));
    }
    results
}

async fn ask(runtime: &Runtime, name: &str, message: &str) -> Result<String> {
    let mut provider = runtime.open(name).await?;
    debug!(provider = name, "broadcasting");
    let reply = provider.chat(message, None).await?;
    Ok(reply.text)
}

/// Trim, lowercase and de-duplicate provider names, keeping first-seen order.
fn normalize(providers: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in providers {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use unillm_core::config::Config;

    #[test]
    fn normalize_names() {
        let names = normalize(vec![
            " OpenAI".to_string(),
            "claude".to_string(),
            "openai".to_string(),
            "".to_string(),
        ]);
        assert_eq!(names, vec!["openai", "claude"]);
    }

    #[tokio::test]
    async fn fan_out_keeps_order_and_isolates_failures() {
        let mut config = Config::default();
        // Point every provider at a closed port with a key, so each fails at
        // transport level independently.
        for name in ["openai", "claude"] {
            let entry = config.providers.entry(name.to_string()).or_default();
            entry.api_key = "sk-test".to_string();
            entry.endpoint = Some("http://127.0.0.1:1/v1".to_string());
        }
        let runtime = Arc::new(Runtime::from_config(config).unwrap());
        let names = vec!["claude".to_string(), "missing".to_string(), "openai".to_string()];

        let results = fan_out(runtime, "hi", &names).await;
        let order: Vec<&str> = results.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(order, vec!["claude", "missing", "openai"]);
        assert!(results.iter().all(|r| r.outcome.is_err()));
    }
}
