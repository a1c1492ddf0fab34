//! Server-sent-event framing for stream items

use crate::StreamItem;
use serde::Serialize;

/// Event name for a terminal error frame
pub const SSE_ERROR_EVENT: &str = "business-error";

/// Event name for a successful end-of-stream frame
pub const SSE_DONE_EVENT: &str = "done";

/// Frame a payload as an unnamed `data:` event
pub fn sse_data<T: Serialize + ?Sized>(payload: &T) -> serde_json::Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(payload)?))
}

/// Frame a payload as a named event; string payloads are written verbatim
pub fn sse_event<T: Serialize + ?Sized>(event: &str, payload: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(payload)?;
    let serialized = match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    Ok(format!("event: {}\ndata: {}\n\n", event, serialized))
}

/// Frame a stream item the way clients consume it: content as `{"d": chunk}`,
/// progress events verbatim, terminal errors as a `business-error` event.
pub fn sse_frame(item: &StreamItem) -> serde_json::Result<String> {
    match item {
        StreamItem::Content(chunk) => sse_data(&serde_json::json!({ "d": chunk })),
        StreamItem::Progress(event) => sse_data(event),
        StreamItem::Error(event) => sse_event(
            SSE_ERROR_EVENT,
            &serde_json::json!({ "code": event.code, "message": event.message }),
        ),
    }
}
