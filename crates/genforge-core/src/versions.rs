//! Zip-backed version history of app artifacts
//!
//! Each app keeps `.versions/index.json` (an ordered array of
//! [`VersionEntry`]) next to one immutable `v{NNNN}_{mode}.zip` per
//! version. Archives and the index are written to a temporary name and
//! renamed into place; the index is always rewritten whole.

use crate::error::{GenforgeError, Result};
use crate::materializer::{
    clear_generated_content, validate_untrusted_path, write_sandboxed, FileMaterializer,
    SCREENSHOTS_DIR, VERSIONS_DIR,
};
use chrono::{DateTime, Utc};
use genforge_types::{CodeGenType, EditMode, VersionEntry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const INDEX_FILE: &str = "index.json";

/// Manifest entry appended to every export archive
pub const EXPORT_MANIFEST: &str = "genforge-manifest.json";

/// Contents of [`EXPORT_MANIFEST`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub code_gen_type: CodeGenType,
    pub app_id: u64,
    pub exported_time: DateTime<Utc>,
    pub files: Vec<String>,
}

/// Identifies an app's artifact directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactTarget {
    pub code_gen_type: CodeGenType,
    pub app_id: u64,
}

impl ArtifactTarget {
    pub fn new(code_gen_type: CodeGenType, app_id: u64) -> Self {
        Self {
            code_gen_type,
            app_id,
        }
    }
}

/// Outcome of a successful rollback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub version: u32,
    pub restored_files: usize,
}

#[derive(Debug, Clone)]
pub struct VersionStore {
    materializer: FileMaterializer,
}

impl VersionStore {
    pub fn new(materializer: FileMaterializer) -> Self {
        Self { materializer }
    }

    pub fn app_dir(&self, target: ArtifactTarget) -> PathBuf {
        self.materializer.app_dir(target.code_gen_type, target.app_id)
    }

    fn existing_app_dir(&self, target: ArtifactTarget) -> Result<PathBuf> {
        let dir = self.app_dir(target);
        if !dir.is_dir() {
            return Err(GenforgeError::not_found(format!(
                "app directory not found: {}_{}",
                target.code_gen_type, target.app_id
            )));
        }
        Ok(dir)
    }

    /// Capture the working tree as the next version
    pub fn create_snapshot(
        &self,
        target: ArtifactTarget,
        message: Option<&str>,
        edit_mode: EditMode,
    ) -> Result<VersionEntry> {
        let dir = self.existing_app_dir(target)?;
        let versions_dir = dir.join(VERSIONS_DIR);
        fs::create_dir_all(&versions_dir)?;

        let mut entries = load_index(&versions_dir);
        let version = next_version(&entries, &versions_dir);
        let file_name = VersionEntry::archive_name(version, edit_mode);

        let tmp_zip = versions_dir.join(format!(".{}.tmp", file_name));
        let published = fs::File::create(&tmp_zip)
            .map_err(GenforgeError::from)
            .and_then(|file| {
                let mut zip = ZipWriter::new(file);
                archive_tree(&mut zip, &dir, &[VERSIONS_DIR])?;
                zip.finish()?;
                Ok(())
            })
            .and_then(|()| Ok(fs::rename(&tmp_zip, versions_dir.join(&file_name))?));
        if let Err(e) = published {
            if let Err(cleanup) = fs::remove_file(&tmp_zip) {
                debug!("Could not remove {}: {}", tmp_zip.display(), cleanup);
            }
            return Err(e);
        }

        let entry = VersionEntry {
            version,
            file_name,
            message: message.map(str::to_string),
            edit_mode,
            created_time: Utc::now(),
        };
        entries.push(entry.clone());
        save_index(&versions_dir, &entries)?;

        info!(
            "Created snapshot v{} for {}_{}",
            version, target.code_gen_type, target.app_id
        );
        Ok(entry)
    }

    /// Recorded versions, most recent first
    pub fn list_snapshots(&self, target: ArtifactTarget) -> Vec<VersionEntry> {
        let mut entries = load_index(&self.app_dir(target).join(VERSIONS_DIR));
        entries.reverse();
        entries
    }

    /// Replace the working tree with the contents of one version
    ///
    /// Every archive entry is validated before the tree is cleared, so an
    /// archive carrying a traversal entry leaves the tree untouched.
    pub fn rollback(&self, target: ArtifactTarget, version: u32) -> Result<RollbackReport> {
        let versions_dir = self.app_dir(target).join(VERSIONS_DIR);
        let entry = load_index(&versions_dir)
            .into_iter()
            .find(|e| e.version == version)
            .ok_or_else(|| GenforgeError::not_found(format!("version not found: {}", version)))?;

        let archive_path = versions_dir.join(&entry.file_name);
        if !archive_path.is_file() {
            return Err(GenforgeError::not_found(format!(
                "snapshot archive missing: {}",
                entry.file_name
            )));
        }
        let dir = self.existing_app_dir(target)?;

        let mut archive = ZipArchive::new(fs::File::open(&archive_path)?)?;
        let mut restore = Vec::new();
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let clean = validate_untrusted_path(&dir, file.name())?;
            if clean == VERSIONS_DIR || clean.starts_with(&format!("{}/", VERSIONS_DIR)) {
                warn!("Skipping archived history entry {}", clean);
                continue;
            }
            restore.push((i, clean));
        }

        clear_generated_content(&dir)?;

        for (i, path) in &restore {
            let mut file = archive.by_index(*i)?;
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            write_sandboxed(&dir, path, &content)?;
        }

        info!(
            "Rolled back {}_{} to v{} ({} files)",
            target.code_gen_type,
            target.app_id,
            version,
            restore.len()
        );
        Ok(RollbackReport {
            version,
            restored_files: restore.len(),
        })
    }

    /// Zip the working tree without either reserved subtree
    ///
    /// A [`EXPORT_MANIFEST`] entry describing the export is appended after
    /// the tree.
    pub fn export_archive(&self, target: ArtifactTarget) -> Result<Vec<u8>> {
        let dir = self.existing_app_dir(target)?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let files = archive_tree(&mut zip, &dir, &[VERSIONS_DIR, SCREENSHOTS_DIR])?;

        let manifest = ExportManifest {
            code_gen_type: target.code_gen_type,
            app_id: target.app_id,
            exported_time: Utc::now(),
            files,
        };
        zip.start_file(EXPORT_MANIFEST, archive_options())?;
        zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
        Ok(zip.finish()?.into_inner())
    }
}

/// Read the index; a missing or unreadable index is an empty history
fn load_index(versions_dir: &Path) -> Vec<VersionEntry> {
    let path = versions_dir.join(INDEX_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str::<Vec<VersionEntry>>(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring corrupt version index {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn save_index(versions_dir: &Path, entries: &[VersionEntry]) -> Result<()> {
    let tmp = versions_dir.join(format!(".{}.tmp", INDEX_FILE));
    fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
    fs::rename(&tmp, versions_dir.join(INDEX_FILE))?;
    Ok(())
}

/// Number of a `v{NNNN}_{mode}.zip` file name or its `.v{NNNN}_{mode}.zip.tmp` staging name
fn archive_number(file_name: &str) -> Option<u32> {
    let name = match file_name.strip_prefix('.') {
        Some(staged) => staged.strip_suffix(".tmp")?,
        None => file_name,
    };
    let rest = name.strip_prefix('v')?.strip_suffix(".zip")?;
    let (digits, _mode) = rest.split_once('_')?;
    digits.parse().ok()
}

/// One past the highest version seen in the index or on disk
fn next_version(entries: &[VersionEntry], versions_dir: &Path) -> u32 {
    let indexed = entries.iter().map(|e| e.version).max().unwrap_or(0);
    let on_disk = fs::read_dir(versions_dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .filter_map(|e| archive_number(&e.file_name().to_string_lossy()))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    indexed.max(on_disk) + 1
}

fn archive_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Add every file under `dir` to `zip`, skipping top-level `excluded` dirs
///
/// Returns the archived names in walk order.
fn archive_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    dir: &Path,
    excluded: &[&str],
) -> Result<Vec<String>> {
    let options = archive_options();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() == 1
                && e.file_type().is_dir()
                && excluded.iter().any(|x| e.file_name() == std::ffi::OsStr::new(x)))
        });

    let mut names = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| GenforgeError::system(format!("archive walk failed: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| GenforgeError::system(e.to_string()))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name.as_str(), options)?;
        zip.write_all(&fs::read(entry.path())?)?;
        names.push(name);
    }

    debug!("Archived {} file(s) from {}", names.len(), dir.display());
    Ok(names)
}
