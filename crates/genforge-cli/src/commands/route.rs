//! Route command - Choose a generation mode for a prompt

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub async fn run(config: Option<&Path>, prompt: &str, prefer: Option<&str>) -> Result<()> {
    let (_settings, pipeline) = super::load_pipeline(config)?;
    let decision = pipeline.router().route(prompt, prefer).await;

    eprintln!(
        "{} {} ({})",
        "Route:".cyan().bold(),
        decision.code_gen_type.to_string().green(),
        decision.source.to_string().dimmed()
    );
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
