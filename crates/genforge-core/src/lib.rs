//! Genforge - Core Library
//!
//! Turns natural-language prompts into generated code artifacts: routing a
//! prompt to a generation mode, streaming the model output, extracting a
//! file tree from it, writing that tree into a sandboxed app directory, and
//! keeping a zip-backed version history per app.

pub mod config;
pub mod error;
pub mod facade;
pub mod limiter;
pub mod materializer;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod router;
pub mod stream;
pub mod versions;
pub mod workflow;

pub use config::*;
pub use error::*;
pub use facade::{GenerationFacade, PreparedPrompt, FILE_SAVER_TOOL};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use materializer::FileMaterializer;
pub use model::{ModelClient, TokenStream};
pub use parser::{GeneratedFile, ParsedCode};
pub use pipeline::{ChatRequest, GenerationPipeline};
pub use prompt::{PromptGuard, PromptLoader};
pub use router::RoutingService;
pub use stream::{Emitter, GenerationStream};
pub use versions::{ArtifactTarget, ExportManifest, RollbackReport, VersionStore, EXPORT_MANIFEST};
pub use workflow::WorkflowRunner;
