//! `unillm providers` — list every schema the lookup chain can resolve.

use anyhow::Result;
use colored::Colorize;

use unillm_core::Schema;
use unillm_providers::SchemaSource;

use crate::runtime::Runtime;

pub async fn run(runtime: &Runtime) -> Result<()> {
    println!();
    println!("{}", "unillm providers".cyan().bold());
    println!("  {}", format!("sources: {}", runtime.source.describe()).dimmed());
    println!();

    for name in runtime.source.available().await {
        match runtime.source.load(&name).await {
            Ok(schema) => println!("  {:<12} {}", name.bold(), describe(&schema)),
            Err(e) => println!("  {:<12} {}", name.bold(), format!("invalid: {e}").red()),
        }
    }
    println!();

    Ok(())
}

/// One-line summary: display name, default model, capabilities.
fn describe(schema: &Schema) -> String {
    let features = schema.features();
    let mut caps = Vec::new();
    if features.streaming {
        caps.push("stream");
    }
    if features.multimodal {
        caps.push("images");
    }
    if features.system_messages {
        caps.push("system");
    }
    format!(
        "{:<18} {:<28} {}",
        schema.display_name(),
        schema.default_model().unwrap_or("-"),
        caps.join(", ")
    )
}
