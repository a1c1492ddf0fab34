//! Generate command - Stream a generation for an app

use anyhow::Result;
use colored::Colorize;
use futures::StreamExt;
use genforge_core::ChatRequest;
use genforge_types::{
    sse_event, sse_frame, CodeGenType, EditMode, Phase, ProgressEvent, StreamItem, SSE_DONE_EVENT,
};
use std::io::Write;
use std::path::Path;

pub struct GenerateOptions {
    pub app_id: u64,
    pub code_gen_type: CodeGenType,
    pub edit_mode: EditMode,
    pub use_workflow: bool,
    pub init_prompt: Option<String>,
    pub snapshot: bool,
    pub sse: bool,
    pub message: String,
}

pub async fn run(config: Option<&Path>, options: GenerateOptions) -> Result<()> {
    let (_settings, pipeline) = super::load_pipeline(config)?;

    let request = ChatRequest {
        app_id: options.app_id,
        code_gen_type: options.code_gen_type,
        edit_mode: options.edit_mode,
        message: options.message,
        init_prompt: options.init_prompt,
        use_workflow: options.use_workflow,
        snapshot: options.snapshot,
    };

    let mut stream = pipeline.chat(request);
    let mut stdout = std::io::stdout();
    let mut failure = None;

    while let Some(item) = stream.next().await {
        if options.sse {
            write!(stdout, "{}", sse_frame(&item)?)?;
        } else {
            match &item {
                StreamItem::Content(chunk) => write!(stdout, "{}", chunk)?,
                StreamItem::Progress(event) => print_progress(event),
                StreamItem::Error(_) => {}
            }
        }
        stdout.flush()?;

        if let StreamItem::Error(event) = item {
            failure = Some(event);
        }
    }

    match failure {
        Some(event) => {
            anyhow::bail!("generation failed [{}]: {}", event.code, event.message)
        }
        None => {
            if options.sse {
                write!(stdout, "{}", sse_event(SSE_DONE_EVENT, "done")?)?;
                stdout.flush()?;
            } else {
                println!();
                eprintln!("{} generation complete", "✓".green());
            }
            Ok(())
        }
    }
}

fn print_progress(event: &ProgressEvent) {
    let marker = match event.phase() {
        Phase::Start => "▶".cyan(),
        Phase::Delta => "•".normal(),
        Phase::End => "✓".green(),
    };
    eprintln!(
        "  {} {} {}",
        marker,
        event.stage().bold(),
        event.message().dimmed()
    );
}
