//! Sandboxed materialization of parsed code into app directories

use crate::error::{GenforgeError, Result};
use crate::parser::{sanitize_relative_path, ParsedCode};
use genforge_types::{CodeGenType, EditMode};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Version history subtree inside an app directory
pub const VERSIONS_DIR: &str = ".versions";

/// Screenshot history subtree, owned by another collaborator
pub const SCREENSHOTS_DIR: &str = ".screenshots";

/// Subtrees that survive full-mode cleanup and rollback
pub const RESERVED_DIRS: &[&str] = &[VERSIONS_DIR, SCREENSHOTS_DIR];

/// File an `html` generation is written to
pub const HTML_ENTRY: &str = "index.html";

/// Writes parsed code under `<root>/<codeGenType>_<appId>/`
#[derive(Debug, Clone)]
pub struct FileMaterializer {
    root: PathBuf,
}

impl FileMaterializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one app's artifact
    pub fn app_dir(&self, code_gen_type: CodeGenType, app_id: u64) -> PathBuf {
        self.root.join(format!("{}_{}", code_gen_type.as_str(), app_id))
    }

    /// Save parsed code and return the output directory
    pub fn save(
        &self,
        code_gen_type: CodeGenType,
        app_id: u64,
        parsed: &ParsedCode,
        edit_mode: EditMode,
    ) -> Result<PathBuf> {
        self.save_with(code_gen_type, app_id, parsed, edit_mode, &mut |_| {})
    }

    /// Save parsed code, reporting each relative path right after it is written
    ///
    /// Paths inside the reserved subtrees are refused before anything is
    /// written. A sandbox violation aborts the remaining writes; files written
    /// before it stay on disk.
    pub fn save_with(
        &self,
        code_gen_type: CodeGenType,
        app_id: u64,
        parsed: &ParsedCode,
        edit_mode: EditMode,
        on_written: &mut dyn FnMut(&str),
    ) -> Result<PathBuf> {
        let output_dir = self.app_dir(code_gen_type, app_id);
        fs::create_dir_all(&output_dir)?;

        match parsed {
            ParsedCode::Single(html) => {
                write_sandboxed(&output_dir, HTML_ENTRY, html.as_bytes())?;
                on_written(HTML_ENTRY);
            }
            ParsedCode::Files(files) => {
                if code_gen_type == CodeGenType::Html {
                    return Err(GenforgeError::params(
                        "html generation expects a single document",
                    ));
                }
                if let Some(file) = files.iter().find(|f| is_reserved_path(&f.path)) {
                    warn!("Rejected generated file in reserved directory: {}", file.path);
                    return Err(GenforgeError::params(format!(
                        "invalid file path: {}",
                        file.path
                    )));
                }
                if edit_mode == EditMode::Full {
                    clear_generated_content(&output_dir)?;
                }
                for file in files {
                    write_sandboxed(&output_dir, &file.path, file.content.as_bytes())?;
                    on_written(&file.path);
                }
            }
        }

        info!(
            "Materialized {} file(s) into {} ({})",
            parsed.file_count(),
            output_dir.display(),
            edit_mode
        );
        Ok(output_dir)
    }
}

fn is_reserved(name: &std::ffi::OsStr) -> bool {
    RESERVED_DIRS.iter().any(|r| name == std::ffi::OsStr::new(r))
}

/// Whether a relative path lands inside one of the reserved subtrees
pub fn is_reserved_path(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .find(|c| !matches!(c, Component::CurDir))
        .is_some_and(|c| is_reserved(c.as_os_str()))
}

/// Remove everything in `dir` except the reserved subtrees
///
/// Files are deleted first, then directories bottom-up; directory removal
/// failures are logged and skipped.
pub fn clear_generated_content(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_type().is_dir() && is_reserved(e.file_name())));

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| GenforgeError::system(format!("cleanup walk failed: {}", e)))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        } else {
            fs::remove_file(entry.path())?;
        }
    }

    for dir in dirs {
        if let Err(e) = fs::remove_dir(&dir) {
            debug!("Skipping directory {}: {}", dir.display(), e);
        }
    }
    Ok(())
}

/// Write one file, refusing any target outside `output_dir`
pub fn write_sandboxed(output_dir: &Path, relative: &str, content: &[u8]) -> Result<PathBuf> {
    let target = resolve_in_sandbox(output_dir, relative)?;
    fs::write(&target, content)?;
    debug!("Wrote {}", target.display());
    Ok(target)
}

/// Resolve `relative` under `output_dir`, creating parent directories
///
/// Nothing is created until the deepest existing ancestor is known to sit
/// inside the sandbox. Symlinks anywhere below `output_dir` are refused,
/// including a dangling one at the target itself.
pub fn resolve_in_sandbox(output_dir: &Path, relative: &str) -> Result<PathBuf> {
    let invalid = || GenforgeError::params(format!("invalid file path: {}", relative));
    let escape = || {
        warn!("Rejected write outside sandbox: {}", relative);
        invalid()
    };

    let rel = Path::new(relative);
    if relative.is_empty()
        || rel.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        })
    {
        return Err(invalid());
    }

    let base = output_dir.canonicalize()?;
    let target = output_dir.join(rel);
    let file_name = target.file_name().ok_or_else(invalid)?;
    let parent = target.parent().ok_or_else(invalid)?;

    let mut current = output_dir.to_path_buf();
    let mut deepest = base.clone();
    for component in rel.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        current.push(part);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return Err(escape()),
            Ok(_) => deepest = current.canonicalize()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }
    }
    if !deepest.starts_with(&base) {
        return Err(escape());
    }

    fs::create_dir_all(parent)?;
    let resolved = parent.canonicalize()?.join(file_name);
    if resolved == base || !resolved.starts_with(&base) {
        return Err(escape());
    }
    Ok(resolved)
}

/// Sanitize then sandbox-check an untrusted path without writing
pub fn validate_untrusted_path(output_dir: &Path, raw: &str) -> Result<String> {
    let invalid = || GenforgeError::params(format!("invalid file path: {}", raw));
    let clean = sanitize_relative_path(raw).ok_or_else(invalid)?;
    let base = output_dir.canonicalize()?;
    if !base.join(&clean).starts_with(&base) {
        return Err(invalid());
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GeneratedFile;
    use tempfile::TempDir;

    fn files(entries: &[(&str, &str)]) -> ParsedCode {
        ParsedCode::Files(
            entries
                .iter()
                .map(|(p, c)| GeneratedFile::new(*p, *c))
                .collect(),
        )
    }

    #[test]
    fn test_html_overwrites_index() {
        let temp_dir = TempDir::new().unwrap();
        let saver = FileMaterializer::new(temp_dir.path());

        let dir = saver
            .save(CodeGenType::Html, 7, &ParsedCode::Single("<p>1</p>".into()), EditMode::Incremental)
            .unwrap();
        assert!(dir.ends_with("html_7"));
        saver
            .save(CodeGenType::Html, 7, &ParsedCode::Single("<p>2</p>".into()), EditMode::Incremental)
            .unwrap();
        assert_eq!(fs::read_to_string(dir.join("index.html")).unwrap(), "<p>2</p>");
    }

    #[test]
    fn test_full_mode_wipes_but_keeps_reserved() {
        let temp_dir = TempDir::new().unwrap();
        let saver = FileMaterializer::new(temp_dir.path());
        let dir = saver.app_dir(CodeGenType::MultiFile, 1);
        fs::create_dir_all(dir.join(".versions")).unwrap();
        fs::create_dir_all(dir.join(".screenshots")).unwrap();
        fs::create_dir_all(dir.join("old/nested")).unwrap();
        fs::write(dir.join(".versions/index.json"), "[]").unwrap();
        fs::write(dir.join(".screenshots/shot.png"), "png").unwrap();
        fs::write(dir.join("old/nested/stale.js"), "x").unwrap();
        fs::write(dir.join("stale.css"), "x").unwrap();

        saver
            .save(CodeGenType::MultiFile, 1, &files(&[("index.html", "new")]), EditMode::Full)
            .unwrap();

        assert!(!dir.join("stale.css").exists());
        assert!(!dir.join("old").exists());
        assert!(dir.join(".versions/index.json").exists());
        assert!(dir.join(".screenshots/shot.png").exists());
        assert_eq!(fs::read_to_string(dir.join("index.html")).unwrap(), "new");
    }

    #[test]
    fn test_incremental_mode_merges() {
        let temp_dir = TempDir::new().unwrap();
        let saver = FileMaterializer::new(temp_dir.path());
        saver
            .save(CodeGenType::VueProject, 2, &files(&[("a.txt", "a"), ("b.txt", "b")]), EditMode::Full)
            .unwrap();
        let dir = saver
            .save(CodeGenType::VueProject, 2, &files(&[("b.txt", "B"), ("c/d.txt", "d")]), EditMode::Incremental)
            .unwrap();

        assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dir.join("b.txt")).unwrap(), "B");
        assert_eq!(fs::read_to_string(dir.join("c/d.txt")).unwrap(), "d");
    }

    #[test]
    fn test_reports_written_paths_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let saver = FileMaterializer::new(temp_dir.path());
        let mut seen = Vec::new();
        saver
            .save_with(
                CodeGenType::MultiFile,
                3,
                &files(&[("z.txt", "z"), ("a/b.txt", "b")]),
                EditMode::Full,
                &mut |p| seen.push(p.to_string()),
            )
            .unwrap();
        assert_eq!(seen, vec!["z.txt", "a/b.txt"]);
    }

    #[test]
    fn test_traversal_aborts_remaining_writes() {
        let temp_dir = TempDir::new().unwrap();
        let saver = FileMaterializer::new(temp_dir.path().join("root"));
        let mut seen = Vec::new();
        let err = saver
            .save_with(
                CodeGenType::MultiFile,
                4,
                &files(&[("ok.txt", "1"), ("../escape.txt", "2"), ("never.txt", "3")]),
                EditMode::Full,
                &mut |p| seen.push(p.to_string()),
            )
            .unwrap_err();

        assert!(matches!(err, GenforgeError::Params(_)));
        assert!(err.to_string().contains("../escape.txt"));
        assert_eq!(seen, vec!["ok.txt"]);
        let dir = saver.app_dir(CodeGenType::MultiFile, 4);
        assert!(!dir.join("never.txt").exists());
        assert!(!temp_dir.path().join("root/escape.txt").exists());
    }

    #[test]
    fn test_absolute_path_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = write_sandboxed(temp_dir.path(), "/tmp/x.txt", b"x").unwrap_err();
        assert!(matches!(err, GenforgeError::Params(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_parent_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.join("link")).unwrap();

        let err = write_sandboxed(&dir, "link/evil.txt", b"x").unwrap_err();
        assert!(matches!(err, GenforgeError::Params(_)));
        assert!(!outside.path().join("evil.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_parent_creates_nothing_outside() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.join("link")).unwrap();

        let err = write_sandboxed(&dir, "link/newdir/evil.txt", b"x").unwrap_err();
        assert!(matches!(err, GenforgeError::Params(_)));
        assert!(!outside.path().join("newdir").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_target_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(outside.path().join("dangle.txt"), dir.join("d.txt")).unwrap();

        let err = write_sandboxed(&dir, "d.txt", b"x").unwrap_err();
        assert!(matches!(err, GenforgeError::Params(_)));
        assert!(!outside.path().join("dangle.txt").exists());
    }

    #[test]
    fn test_reserved_paths_refused_before_any_write() {
        let temp_dir = TempDir::new().unwrap();
        let saver = FileMaterializer::new(temp_dir.path());
        let dir = saver.app_dir(CodeGenType::MultiFile, 1);
        fs::create_dir_all(dir.join(".versions")).unwrap();
        fs::write(dir.join(".versions/index.json"), "[]").unwrap();
        fs::write(dir.join("keep.txt"), "old").unwrap();

        for path in [".versions/index.json", "./.screenshots/shot.png"] {
            let err = saver
                .save(
                    CodeGenType::MultiFile,
                    1,
                    &files(&[("a.txt", "a"), (path, "garbage")]),
                    EditMode::Full,
                )
                .unwrap_err();
            assert!(matches!(err, GenforgeError::Params(_)));
        }

        assert_eq!(fs::read_to_string(dir.join(".versions/index.json")).unwrap(), "[]");
        assert_eq!(fs::read_to_string(dir.join("keep.txt")).unwrap(), "old");
        assert!(!dir.join("a.txt").exists());
        assert!(!dir.join(".screenshots").exists());
    }

    #[test]
    fn test_reserved_path_detection() {
        assert!(is_reserved_path(".versions/v0001_full.zip"));
        assert!(is_reserved_path(".screenshots"));
        assert!(!is_reserved_path("src/.versions/x"));
        assert!(!is_reserved_path(".versionsx/a"));
    }

    #[test]
    fn test_clear_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        assert!(clear_generated_content(&temp_dir.path().join("absent")).is_ok());
    }
}
