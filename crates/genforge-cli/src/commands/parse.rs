//! Parse command - Extract files from a saved model response

use anyhow::{Context, Result};
use colored::Colorize;
use genforge_core::parser::{self, ParsedCode};
use genforge_core::FileMaterializer;
use genforge_types::{CodeGenType, EditMode};
use std::path::Path;

pub async fn run(
    config: Option<&Path>,
    code_gen_type: CodeGenType,
    app_id: Option<u64>,
    edit_mode: EditMode,
    file: &Path,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let parsed = parser::parse(code_gen_type, &raw)?;

    match &parsed {
        ParsedCode::Single(html) => {
            println!("{} single document ({} chars)", "✓".green(), html.chars().count());
        }
        ParsedCode::Files(files) => {
            println!("{} {} file(s)", "✓".green(), files.len());
            for f in files {
                println!("  {} {}", f.path.cyan(), format!("({} bytes)", f.content.len()).dimmed());
            }
        }
    }

    if let Some(app_id) = app_id {
        let settings = crate::config::SettingsManager::load(config)?;
        let materializer = FileMaterializer::new(settings.generated_root);
        let output_dir = materializer.save(code_gen_type, app_id, &parsed, edit_mode)?;
        println!("  Saved to {}", output_dir.display().to_string().dimmed());
    }

    Ok(())
}
