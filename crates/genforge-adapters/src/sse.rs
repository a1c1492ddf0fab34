//! Incremental decoder for chat-completion SSE bodies

use serde::Deserialize;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Buffers raw bytes and yields content deltas line by line
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one network chunk; returns the content deltas it completed
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(content) = self.decode_line(&line) {
                out.push(content);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Flush a trailing line that arrived without a newline
    pub fn finish(&mut self) -> Option<String> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw);
        let data = line.trim().strip_prefix("data:")?.trim();
        if data.is_empty() {
            return None;
        }
        if data == DONE_SENTINEL {
            self.done = true;
            return None;
        }

        let chunk: StreamChunk = serde_json::from_str(data).ok()?;
        chunk
            .choices
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[test]
    fn test_decodes_lines_across_chunk_boundaries() {
        let body = format!("{}{}data: [DONE]\n\n", delta("Hel"), delta("lo"));
        let (a, b) = body.as_bytes().split_at(17);

        let mut decoder = SseDecoder::new();
        let mut out = decoder.feed(a);
        out.extend(decoder.feed(b));
        assert_eq!(out, vec!["Hel", "lo"]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_skips_noise_and_malformed_payloads() {
        let body = format!(
            ": keep-alive\nevent: ping\ndata: {{not json\ndata: {{\"choices\": []}}\n{}",
            delta("ok")
        );
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(body.as_bytes()), vec!["ok"]);
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_nothing_after_done() {
        let body = format!("data: [DONE]\n{}", delta("late"));
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(body.as_bytes()).is_empty());
        assert!(decoder.feed(delta("later").as_bytes()).is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_multibyte_split_is_reassembled() {
        let body = delta("页面");
        let bytes = body.as_bytes();
        let split = body.find('页').unwrap() + 1;

        let mut decoder = SseDecoder::new();
        let mut out = decoder.feed(&bytes[..split]);
        out.extend(decoder.feed(&bytes[split..]));
        assert_eq!(out, vec!["页面"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let body = delta("tail");
        assert!(decoder.feed(body.trim_end().as_bytes()).is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
    }
}
