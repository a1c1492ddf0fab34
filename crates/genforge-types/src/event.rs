//! Stream items emitted by generation runs
//!
//! A generation yields plain content chunks interleaved with structured
//! progress events, and ends in at most one terminal error event.

use serde::{Deserialize, Serialize};

/// Stable numeric codes carried by terminal error events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum ErrorCode {
    Success,
    ParamsError,
    NotFoundError,
    SystemError,
}

impl ErrorCode {
    pub fn as_u32(&self) -> u32 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::ParamsError => 40000,
            ErrorCode::NotFoundError => 40400,
            ErrorCode::SystemError => 50000,
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.as_u32()
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            40000 => Ok(ErrorCode::ParamsError),
            40400 => Ok(ErrorCode::NotFoundError),
            50000 => Ok(ErrorCode::SystemError),
            other => Err(format!("unknown error code: {}", other)),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Stage transition reported by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Delta,
    End,
}

/// Structured progress record interleaved with content chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Pipeline tool stage (e.g. file writing) inside a generation
    Tool {
        event: Phase,
        tool: String,
        message: String,
    },
    /// Named workflow node around a generation
    Workflow {
        node: String,
        event: Phase,
        message: String,
    },
}

impl ProgressEvent {
    pub fn tool(tool: &str, event: Phase, message: impl Into<String>) -> Self {
        ProgressEvent::Tool {
            event,
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub fn workflow(node: &str, event: Phase, message: impl Into<String>) -> Self {
        ProgressEvent::Workflow {
            node: node.to_string(),
            event,
            message: message.into(),
        }
    }

    /// Stage name of the event (tool or workflow node)
    pub fn stage(&self) -> &str {
        match self {
            ProgressEvent::Tool { tool, .. } => tool,
            ProgressEvent::Workflow { node, .. } => node,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ProgressEvent::Tool { event, .. } | ProgressEvent::Workflow { event, .. } => *event,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Tool { message, .. } | ProgressEvent::Workflow { message, .. } => {
                message
            }
        }
    }
}

/// Terminal failure of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "error")]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorEvent {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Element of a generation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamItem {
    Content(String),
    Progress(ProgressEvent),
    Error(ErrorEvent),
}

impl StreamItem {
    pub fn as_content(&self) -> Option<&str> {
        match self {
            StreamItem::Content(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_progress(&self) -> Option<&ProgressEvent> {
        match self {
            StreamItem::Progress(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorEvent> {
        match self {
            StreamItem::Error(event) => Some(event),
            _ => None,
        }
    }
}

impl From<ProgressEvent> for StreamItem {
    fn from(event: ProgressEvent) -> Self {
        StreamItem::Progress(event)
    }
}

impl From<ErrorEvent> for StreamItem {
    fn from(event: ErrorEvent) -> Self {
        StreamItem::Error(event)
    }
}
