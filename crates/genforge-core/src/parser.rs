//! Code extraction from raw model output
//!
//! `html` output collapses to a single document. `multi_file` and
//! `vue_project` output is scanned for `<file path="...">` blocks and for
//! fenced blocks that name their path in the fence header or on the first
//! body line. Every path is sanitized; an entry whose path fails
//! sanitation is dropped on its own.

use crate::error::{GenforgeError, Result};
use genforge_types::CodeGenType;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Path of the guaranteed preview entry of a Vue project
pub const VUE_PREVIEW_ENTRY: &str = "dist/index.html";

/// Characters of raw output embedded in the fallback Vue scaffold
const FALLBACK_EXCERPT_CHARS: usize = 3000;

static HTML_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```html\s*(.*?)```").expect("valid regex"));

static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z0-9_-]*\s*(.*?)```").expect("valid regex"));

static FILE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?P<header>[^\n`]*)\n(?P<body>.*?)```").expect("valid regex")
});

static FILE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<file\s+path=["'](?P<path>[^"']+)["']\s*>(?P<body>.*?)</file>"#)
        .expect("valid regex")
});

static LINE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:#|//|;)?\s*(?:file|filename|path)\s*[:=]\s*(.+)$").expect("valid regex")
});

/// Fence info strings that name a language, never a path
const KNOWN_LANG_HEADERS: &[&str] = &[
    "html",
    "css",
    "javascript",
    "js",
    "typescript",
    "ts",
    "tsx",
    "json",
    "md",
    "txt",
    "yaml",
    "yml",
    "vue",
    "bash",
    "sh",
];

/// One extracted file; consumed once by the materializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Sanitized relative path using `/` separators
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Result of parsing model output for one generation mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCode {
    /// Single HTML document
    Single(String),
    /// File tree, in first-seen path order
    Files(Vec<GeneratedFile>),
}

impl ParsedCode {
    pub fn file_count(&self) -> usize {
        match self {
            ParsedCode::Single(_) => 1,
            ParsedCode::Files(files) => files.len(),
        }
    }
}

/// Parse raw model text for the given mode
pub fn parse(code_gen_type: CodeGenType, raw_text: &str) -> Result<ParsedCode> {
    match code_gen_type {
        CodeGenType::Html => parse_html(raw_text).map(ParsedCode::Single),
        CodeGenType::MultiFile => {
            let mut files = extract_generated_files(raw_text);
            if files.is_empty() {
                files.push(GeneratedFile::new("README.md", raw_text.trim()));
            }
            Ok(ParsedCode::Files(files))
        }
        CodeGenType::VueProject => {
            let mut files = extract_generated_files(raw_text);
            if files.is_empty() {
                files = default_vue_project_files(raw_text);
            }
            Ok(ParsedCode::Files(ensure_vue_preview_entry(files)))
        }
    }
}

/// Extract the single document of an `html` generation
pub fn parse_html(raw_text: &str) -> Result<String> {
    let html = HTML_FENCE
        .captures(raw_text)
        .or_else(|| ANY_FENCE.captures(raw_text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| raw_text.trim().to_string());

    if html.is_empty() {
        return Err(GenforgeError::system("parsed code is empty"));
    }
    Ok(html)
}

/// Scan text for tag-delimited and fenced file blocks
///
/// A later block with the same sanitized path overwrites the earlier content
/// but keeps the earlier position.
pub fn extract_generated_files(raw_text: &str) -> Vec<GeneratedFile> {
    let text = raw_text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut files: IndexMap<String, String> = IndexMap::new();

    for caps in FILE_TAG.captures_iter(text) {
        let path = sanitize_relative_path(&caps["path"]);
        let content = caps["body"].trim_matches('\n');
        if let Some(path) = path {
            if !content.is_empty() {
                files.insert(path, content.to_string());
            }
        }
    }

    for caps in FILE_FENCE.captures_iter(text) {
        let header = caps.name("header").map(|m| m.as_str().trim()).unwrap_or("");
        let mut body = caps["body"].to_string();

        let mut path = path_from_fence_header(header);
        if path.is_none() {
            if let Some((first, rest)) = split_first_line(&body) {
                if let Some(hint) = path_from_line_hint(first) {
                    path = Some(hint);
                    body = rest.to_string();
                }
            }
        }

        let content = body.trim_matches('\n');
        if let Some(path) = path.as_deref().and_then(sanitize_relative_path) {
            if !content.is_empty() {
                files.insert(path, content.to_string());
            }
        }
    }

    files
        .into_iter()
        .map(|(path, content)| GeneratedFile { path, content })
        .collect()
}

/// Normalize a model-provided relative path
///
/// Returns `None` for empty paths, absolute paths, any `..` segment, or a
/// drive-style first segment. Otherwise the result uses `/` separators,
/// carries no `.` or empty segments, and never starts with `/`.
pub fn sanitize_relative_path(path: &str) -> Option<String> {
    let normalized = path.trim().replace('\\', "/");
    if normalized.starts_with('/') {
        return None;
    }

    let mut parts = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            other => parts.push(other),
        }
    }

    let first = parts.first()?;
    if first.contains(':') {
        return None;
    }
    Some(parts.join("/"))
}

fn split_first_line(body: &str) -> Option<(&str, &str)> {
    if body.is_empty() {
        return None;
    }
    Some(match body.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (body, ""),
    })
}

fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'').trim()
}

fn is_known_lang(token: &str) -> bool {
    KNOWN_LANG_HEADERS.contains(&token.to_lowercase().as_str())
}

fn path_from_fence_header(header: &str) -> Option<String> {
    if header.is_empty() {
        return None;
    }

    let lowered = header.to_lowercase();
    for prefix in ["file:", "filename:", "path:", "file=", "filename=", "path="] {
        if lowered.starts_with(prefix) {
            let value = strip_quotes(&header[prefix.len()..]);
            return (!value.is_empty()).then(|| value.to_string());
        }
    }

    if header.contains(char::is_whitespace) {
        return header
            .split_whitespace()
            .rev()
            .find(|token| (token.contains('/') || token.contains('.')) && !is_known_lang(token))
            .map(|token| strip_quotes(token).to_string());
    }

    if is_known_lang(header) {
        return None;
    }
    (header.contains('/') || header.contains('.')).then(|| header.to_string())
}

fn path_from_line_hint(first_line: &str) -> Option<String> {
    let caps = LINE_HINT.captures(first_line.trim())?;
    let value = strip_quotes(caps.get(1)?.as_str());
    (!value.is_empty()).then(|| value.to_string())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Minimal Vite + Vue scaffold used when no file blocks were found
fn default_vue_project_files(raw_text: &str) -> Vec<GeneratedFile> {
    let excerpt: String = raw_text.trim().chars().take(FALLBACK_EXCERPT_CHARS).collect();
    let escaped = escape_html(&excerpt);
    let shown = if escaped.is_empty() {
        "No content".to_string()
    } else {
        escaped
    };

    let package_json = serde_json::json!({
        "name": "generated-vue-project",
        "version": "0.0.0",
        "private": true,
        "type": "module",
        "scripts": {
            "dev": "vite",
            "build": "vite build",
            "preview": "vite preview"
        },
        "dependencies": {
            "vue": "^3.5.0"
        },
        "devDependencies": {
            "vite": "^5.4.0",
            "@vitejs/plugin-vue": "^5.1.0",
            "typescript": "^5.5.0"
        }
    });
    let package_json =
        serde_json::to_string_pretty(&package_json).unwrap_or_else(|_| package_json.to_string());

    let index_html = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Generated Vue Project</title>
  </head>
  <body>
    <div id="app"></div>
    <script type="module" src="/src/main.ts"></script>
  </body>
</html>
"#;

    let vite_config = r#"import { defineConfig } from 'vite'
import vue from '@vitejs/plugin-vue'

export default defineConfig({
  base: './',
  plugins: [vue()],
})
"#;

    let main_ts = r#"import { createApp } from 'vue'
import App from './App.vue'

createApp(App).mount('#app')
"#;

    let app_vue = format!(
        r#"<template>
  <main class="wrapper">
    <h1>Generated Vue Project</h1>
    <p>Model output (truncated):</p>
    <pre>{}</pre>
  </main>
</template>

<style scoped>
.wrapper {{
  max-width: 960px;
  margin: 40px auto;
  padding: 0 16px;
  font-family: ui-sans-serif, system-ui, -apple-system, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
}}
pre {{
  white-space: pre-wrap;
  border: 1px solid #ddd;
  border-radius: 8px;
  padding: 12px;
  background: #fafafa;
}}
</style>
"#,
        shown
    );

    vec![
        GeneratedFile::new("package.json", package_json),
        GeneratedFile::new("index.html", index_html),
        GeneratedFile::new("vite.config.ts", vite_config),
        GeneratedFile::new("src/main.ts", main_ts),
        GeneratedFile::new("src/App.vue", app_vue),
    ]
}

/// Guarantee `dist/index.html`: copy a top-level `index.html`, else a placeholder
fn ensure_vue_preview_entry(mut files: Vec<GeneratedFile>) -> Vec<GeneratedFile> {
    if files.iter().any(|f| f.path == VUE_PREVIEW_ENTRY) {
        return files;
    }

    let content = files
        .iter()
        .find(|f| f.path == "index.html")
        .map(|f| f.content.clone())
        .unwrap_or_else(|| {
            r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Generated Project Preview</title>
  </head>
  <body>
    <h1>Generated project ready</h1>
    <p>dist/index.html was generated as a preview fallback.</p>
  </body>
</html>
"#
            .to_string()
        });

    files.push(GeneratedFile::new(VUE_PREVIEW_ENTRY, content));
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(files: &[GeneratedFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_sanitize_rejections() {
        assert_eq!(sanitize_relative_path(""), None);
        assert_eq!(sanitize_relative_path("   "), None);
        assert_eq!(sanitize_relative_path("./"), None);
        assert_eq!(sanitize_relative_path("/etc/passwd"), None);
        assert_eq!(sanitize_relative_path("\\windows\\system.ini"), None);
        assert_eq!(sanitize_relative_path("src/../../secret"), None);
        assert_eq!(sanitize_relative_path(".."), None);
        assert_eq!(sanitize_relative_path("C:/Windows/win.ini"), None);
        assert_eq!(sanitize_relative_path("c:evil"), None);
    }

    #[test]
    fn test_sanitize_normalizes() {
        assert_eq!(sanitize_relative_path("./src/App.vue").as_deref(), Some("src/App.vue"));
        assert_eq!(sanitize_relative_path("src\\main.ts").as_deref(), Some("src/main.ts"));
        assert_eq!(sanitize_relative_path("a//b/./c.txt").as_deref(), Some("a/b/c.txt"));
        assert_eq!(sanitize_relative_path(".env").as_deref(), Some(".env"));
        assert_eq!(sanitize_relative_path("src/a:b.txt").as_deref(), Some("src/a:b.txt"));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in ["./a/b", "x\\y\\z.js", "deep/./nested//file.css", ".hidden/x"] {
            let once = sanitize_relative_path(input).unwrap();
            assert!(!once.starts_with('/'));
            assert_eq!(sanitize_relative_path(&once).as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn test_html_prefers_html_fence() {
        let raw = "```html\n<html><body><h1>Hi</h1></body></html>\n```";
        assert_eq!(parse_html(raw).unwrap(), "<html><body><h1>Hi</h1></body></html>");

        let mixed = "```css\nbody{}\n```\ntext\n```HTML\n<p>x</p>\n```";
        assert_eq!(parse_html(mixed).unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_html_falls_back_to_any_fence_then_raw() {
        assert_eq!(parse_html("see\n```\n<div>a</div>\n```").unwrap(), "<div>a</div>");
        assert_eq!(parse_html("  <p>raw</p>  ").unwrap(), "<p>raw</p>");
    }

    #[test]
    fn test_html_empty_is_system_error() {
        let err = parse_html("```html\n   \n```").unwrap_err();
        assert!(matches!(err, GenforgeError::System(_)));
        assert!(parse_html("   ").is_err());
    }

    #[test]
    fn test_file_tags_are_case_insensitive_and_multiline() {
        let raw = "<FILE path=\"index.html\">\n<h1>a</h1>\n<p>b</p>\n</File>\n<file path='css/site.css'>body{}</file>";
        let files = extract_generated_files(raw);
        assert_eq!(paths(&files), vec!["index.html", "css/site.css"]);
        assert_eq!(files[0].content, "<h1>a</h1>\n<p>b</p>");
    }

    #[test]
    fn test_fence_header_variants() {
        let raw = concat!(
            "```file:a.txt\nA\n```\n",
            "```filename=\"b/b.txt\"\nB\n```\n",
            "```PATH: 'c.txt'\nC\n```\n",
            "```js src/d.js\nD\n```\n",
            "```e/e.css\nE\n```\n"
        );
        let files = extract_generated_files(raw);
        assert_eq!(paths(&files), vec!["a.txt", "b/b.txt", "c.txt", "src/d.js", "e/e.css"]);
        assert_eq!(files[3].content, "D");
    }

    #[test]
    fn test_language_header_is_never_a_path() {
        let raw = "```json\n{\"a\": 1}\n```\n```vue\n<template/>\n```";
        assert!(extract_generated_files(raw).is_empty());
    }

    #[test]
    fn test_first_line_comment_hints() {
        let raw = concat!(
            "```js\n// path: src/app.js\nconsole.log(1)\n```\n",
            "```python\n# file: tools/run.py\nprint(1)\n```\n",
            "```ini\n; filename: conf/app.ini\nk=v\n```\n"
        );
        let files = extract_generated_files(raw);
        assert_eq!(paths(&files), vec!["src/app.js", "tools/run.py", "conf/app.ini"]);
        assert_eq!(files[0].content, "console.log(1)");
    }

    #[test]
    fn test_later_block_wins_on_collision() {
        let raw = "```file:index.html\nold\n```\n```file:./index.html\nnew\n```";
        let files = extract_generated_files(raw);
        assert_eq!(files, vec![GeneratedFile::new("index.html", "new")]);
    }

    #[test]
    fn test_unsafe_paths_drop_only_that_entry() {
        let raw = "<file path=\"../escape.txt\">x</file><file path=\"/abs.txt\">y</file><file path=\"ok.txt\">z</file>";
        let files = extract_generated_files(raw);
        assert_eq!(files, vec![GeneratedFile::new("ok.txt", "z")]);
    }

    #[test]
    fn test_multi_file_falls_back_to_readme() {
        let parsed = parse(CodeGenType::MultiFile, "  just prose  ").unwrap();
        assert_eq!(
            parsed,
            ParsedCode::Files(vec![GeneratedFile::new("README.md", "just prose")])
        );
    }

    #[test]
    fn test_vue_project_with_tag_and_fence() {
        let raw = "<file path=\"src/App.vue\"><template><div/></template></file>\n\
                   ```file:package.json\n{\"name\": \"x\"}\n```";
        let ParsedCode::Files(files) = parse(CodeGenType::VueProject, raw).unwrap() else {
            panic!("expected files");
        };
        assert_eq!(paths(&files), vec!["src/App.vue", "package.json", VUE_PREVIEW_ENTRY]);
        assert!(files[2].content.contains("preview fallback"));
    }

    #[test]
    fn test_vue_preview_copies_top_level_index() {
        let raw = "<file path=\"index.html\"><div id=app></div></file>";
        let ParsedCode::Files(files) = parse(CodeGenType::VueProject, raw).unwrap() else {
            panic!("expected files");
        };
        let preview = files.iter().find(|f| f.path == VUE_PREVIEW_ENTRY).unwrap();
        assert_eq!(preview.content, "<div id=app></div>");
    }

    #[test]
    fn test_vue_project_default_scaffold_escapes_raw_text() {
        let ParsedCode::Files(files) = parse(CodeGenType::VueProject, "<script>alert(1)</script>").unwrap() else {
            panic!("expected files");
        };
        assert_eq!(
            paths(&files),
            vec![
                "package.json",
                "index.html",
                "vite.config.ts",
                "src/main.ts",
                "src/App.vue",
                VUE_PREVIEW_ENTRY
            ]
        );
        let app = &files[4].content;
        assert!(app.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!app.contains("<script>alert"));
        let preview = &files[5].content;
        assert_eq!(preview, &files[1].content);
    }

    #[test]
    fn test_scaffold_excerpt_is_truncated() {
        let raw = "x".repeat(FALLBACK_EXCERPT_CHARS + 500);
        let ParsedCode::Files(files) = parse(CodeGenType::VueProject, &raw).unwrap() else {
            panic!("expected files");
        };
        let app = files.iter().find(|f| f.path == "src/App.vue").unwrap();
        assert!(app.content.contains(&"x".repeat(FALLBACK_EXCERPT_CHARS)));
        assert!(!app.content.contains(&"x".repeat(FALLBACK_EXCERPT_CHARS + 1)));
    }
}
