//! Genforge CLI
//!
//! Turns prompts into generated web artifacts and manages their version
//! history from the command line.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use genforge_types::{CodeGenType, EditMode};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "genforge")]
#[command(author, version, about = "Genforge - prompt to code artifact generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to genforge.{toml,yaml,json} in the working directory or ~/.genforge)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose a generation mode for a prompt
    Route {
        /// Prompt to classify
        prompt: String,

        /// Preferred mode (html, multi_file, vue_project)
        #[arg(long)]
        prefer: Option<String>,
    },

    /// Generate code for an app and save it
    Generate {
        /// App identifier
        #[arg(short, long)]
        app: u64,

        /// Generation mode (html, multi_file, vue_project)
        #[arg(short = 't', long = "type")]
        code_gen_type: CodeGenType,

        /// Edit mode (full, incremental)
        #[arg(short, long, default_value = "full")]
        mode: EditMode,

        /// Run through the staged workflow
        #[arg(short, long)]
        workflow: bool,

        /// Initial prompt the app was created with
        #[arg(long)]
        init_prompt: Option<String>,

        /// Skip the snapshot after a successful generation
        #[arg(long)]
        no_snapshot: bool,

        /// Write SSE frames to stdout instead of plain content
        #[arg(long)]
        sse: bool,

        /// User message
        message: String,
    },

    /// Parse a saved model response and optionally save it
    Parse {
        /// Generation mode (html, multi_file, vue_project)
        #[arg(short = 't', long = "type")]
        code_gen_type: CodeGenType,

        /// Save the parsed files for this app
        #[arg(short, long)]
        app: Option<u64>,

        /// Edit mode used when saving
        #[arg(short, long, default_value = "full")]
        mode: EditMode,

        /// File holding the raw model output
        file: PathBuf,
    },

    /// Manage app version snapshots
    Versions {
        #[command(subcommand)]
        action: VersionsAction,
    },

    /// Export an app's current files as a zip archive
    Export {
        /// App identifier
        #[arg(short, long)]
        app: u64,

        /// Generation mode of the app
        #[arg(short = 't', long = "type")]
        code_gen_type: CodeGenType,

        /// Output archive path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum VersionsAction {
    /// List snapshots, most recent first
    List {
        #[arg(short, long)]
        app: u64,
        #[arg(short = 't', long = "type")]
        code_gen_type: CodeGenType,
    },
    /// Snapshot the current files
    Create {
        #[arg(short, long)]
        app: u64,
        #[arg(short = 't', long = "type")]
        code_gen_type: CodeGenType,
        /// Snapshot message
        #[arg(long)]
        message: Option<String>,
        /// Edit mode recorded with the snapshot
        #[arg(short, long, default_value = "full")]
        mode: EditMode,
    },
    /// Restore the files of a snapshot
    Rollback {
        #[arg(short, long)]
        app: u64,
        #[arg(short = 't', long = "type")]
        code_gen_type: CodeGenType,
        /// Version to restore
        version: u32,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "genforge_cli=debug,genforge_core=debug,genforge_adapters=debug"
        } else {
            "genforge_cli=info,genforge_core=warn,genforge_adapters=warn"
        })
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting Genforge CLI");

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Route { prompt, prefer } => {
            commands::route::run(config, &prompt, prefer.as_deref()).await
        }
        Commands::Generate {
            app,
            code_gen_type,
            mode,
            workflow,
            init_prompt,
            no_snapshot,
            sse,
            message,
        } => {
            commands::generate::run(
                config,
                commands::generate::GenerateOptions {
                    app_id: app,
                    code_gen_type,
                    edit_mode: mode,
                    use_workflow: workflow,
                    init_prompt,
                    snapshot: !no_snapshot,
                    sse,
                    message,
                },
            )
            .await
        }
        Commands::Parse {
            code_gen_type,
            app,
            mode,
            file,
        } => commands::parse::run(config, code_gen_type, app, mode, &file).await,
        Commands::Versions { action } => match action {
            VersionsAction::List { app, code_gen_type } => {
                commands::versions::list(config, code_gen_type, app).await
            }
            VersionsAction::Create {
                app,
                code_gen_type,
                message,
                mode,
            } => commands::versions::create(config, code_gen_type, app, message.as_deref(), mode).await,
            VersionsAction::Rollback {
                app,
                code_gen_type,
                version,
            } => commands::versions::rollback(config, code_gen_type, app, version).await,
        },
        Commands::Export {
            app,
            code_gen_type,
            out,
        } => commands::export::run(config, code_gen_type, app, &out).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(config).await,
        },
    };

    if let Err(ref e) = result {
        error!("Command failed: {}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
