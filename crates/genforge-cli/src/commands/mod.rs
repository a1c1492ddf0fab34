//! CLI command implementations

pub mod config;
pub mod export;
pub mod generate;
pub mod parse;
pub mod route;
pub mod versions;

use crate::config::SettingsManager;
use anyhow::{Context, Result};
use genforge_adapters::create_default_model_client;
use genforge_core::{GenerationPipeline, Settings};
use std::path::Path;

/// Load settings and wire the pipeline with the HTTP model client
pub(crate) fn load_pipeline(config: Option<&Path>) -> Result<(Settings, GenerationPipeline)> {
    let settings = SettingsManager::load(config)?;
    let client =
        create_default_model_client(&settings.llm).context("Failed to create model client")?;
    let pipeline = GenerationPipeline::from_settings(&settings, client);
    Ok((settings, pipeline))
}
