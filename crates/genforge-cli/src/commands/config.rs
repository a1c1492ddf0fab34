//! Config command - Show resolved configuration

use crate::config::SettingsManager;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Show current configuration
pub async fn show(config: Option<&Path>) -> Result<()> {
    let settings = SettingsManager::load(config).context("Failed to load settings")?;

    println!("{}", "Genforge Configuration".bold().underline());
    println!();

    println!("{}", "Storage:".cyan().bold());
    println!("  Generated root: {}", settings.generated_root.display());
    match settings.prompts_dir {
        Some(ref dir) => println!("  Prompts dir:    {}", dir.display()),
        None => println!("  Prompts dir:    {}", "(embedded)".dimmed()),
    }
    println!();

    println!("{}", "Model backend:".cyan().bold());
    println!("  Base URL:    {}", display_or_unset(&settings.llm.base_url));
    println!("  API key:     {}", mask_secret(&settings.llm.api_key));
    println!("  Model:       {}", settings.llm.model);
    println!("  Streaming:   {}", settings.llm.stream);
    println!("  Timeout:     {}s", settings.llm.timeout_secs);
    println!("  Retries:     {}", settings.llm.retry_count);
    println!("  Concurrency: {}", settings.llm.concurrency_limit.max(1));
    let status = if settings.llm.is_configured() {
        "configured".green()
    } else {
        "not configured".yellow()
    };
    println!("  Status:      {}", status);
    println!();

    println!("{}", "Prompt guard:".cyan().bold());
    println!("  Max length:       {}", settings.guard.effective_max_length());
    println!("  Blocked keywords: {}", settings.guard.blocked_keywords.join(", "));

    if let Ok(home) = SettingsManager::genforge_home() {
        println!();
        println!("  Home: {}", home.display().to_string().dimmed());
    }

    Ok(())
}

fn display_or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "(unset)".dimmed().to_string()
    } else {
        value.to_string()
    }
}

/// Keep the last four characters of a secret
fn mask_secret(secret: &str) -> String {
    let secret = secret.trim();
    if secret.is_empty() {
        return "(unset)".dimmed().to_string();
    }
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(8), tail)
}
