//! Export command - Zip an app's current files

use anyhow::{Context, Result};
use colored::Colorize;
use genforge_core::ArtifactTarget;
use genforge_types::CodeGenType;
use std::path::Path;

pub async fn run(config: Option<&Path>, code_gen_type: CodeGenType, app_id: u64, out: &Path) -> Result<()> {
    let (_settings, pipeline) = super::load_pipeline(config)?;
    let bytes = pipeline
        .versions()
        .export_archive(ArtifactTarget::new(code_gen_type, app_id))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{} Exported {}_{} to {} ({} bytes)",
        "✓".green(),
        code_gen_type,
        app_id,
        out.display().to_string().cyan(),
        bytes.len()
    );
    Ok(())
}
