//! Versions command - Manage app snapshots

use anyhow::Result;
use colored::Colorize;
use genforge_core::ArtifactTarget;
use genforge_types::{CodeGenType, EditMode};
use std::path::Path;

pub async fn list(config: Option<&Path>, code_gen_type: CodeGenType, app_id: u64) -> Result<()> {
    let (_settings, pipeline) = super::load_pipeline(config)?;
    let entries = pipeline
        .versions()
        .list_snapshots(ArtifactTarget::new(code_gen_type, app_id));

    if entries.is_empty() {
        println!("{}", "No snapshots yet".dimmed());
        return Ok(());
    }

    println!("{}", format!("Snapshots of {}_{}", code_gen_type, app_id).bold().underline());
    for entry in entries {
        println!(
            "  {} {:<12} {} {}",
            format!("v{}", entry.version).cyan().bold(),
            entry.edit_mode.to_string(),
            entry.created_time.format("%Y-%m-%d %H:%M:%S"),
            entry.message.unwrap_or_default().dimmed()
        );
    }
    Ok(())
}

pub async fn create(
    config: Option<&Path>,
    code_gen_type: CodeGenType,
    app_id: u64,
    message: Option<&str>,
    edit_mode: EditMode,
) -> Result<()> {
    let (_settings, pipeline) = super::load_pipeline(config)?;
    let entry = pipeline.versions().create_snapshot(
        ArtifactTarget::new(code_gen_type, app_id),
        message,
        edit_mode,
    )?;

    println!(
        "{} Created snapshot {} ({})",
        "✓".green(),
        format!("v{}", entry.version).cyan(),
        entry.file_name.dimmed()
    );
    Ok(())
}

pub async fn rollback(
    config: Option<&Path>,
    code_gen_type: CodeGenType,
    app_id: u64,
    version: u32,
) -> Result<()> {
    let (_settings, pipeline) = super::load_pipeline(config)?;
    let report = pipeline
        .versions()
        .rollback(ArtifactTarget::new(code_gen_type, app_id), version)?;

    println!(
        "{} Rolled back {}_{} to {} ({} files restored)",
        "✓".green(),
        code_gen_type,
        app_id,
        format!("v{}", report.version).cyan(),
        report.restored_files
    );
    Ok(())
}
