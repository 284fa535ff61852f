//! Work-log file discovery.
//!
//! Walks a folder for supported documents and optionally keeps only files
//! whose name contains a `YYMMDD` date stamp. Matching is a plain substring
//! test on the file name; no date parsing happens. An empty result is a valid
//! (empty) selection.

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::DocumentFormat;

/// Formats `date` as the `YYMMDD` stamp used in work-log and output filenames.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Today's local date as `YYMMDD`.
pub fn today_stamp() -> String {
    date_stamp(Local::now().date_naive())
}

/// Whether the path has a work-log extension (`.pdf`, `.docx`, `.doc`).
pub fn is_supported_file(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_supported()
}

/// All supported documents under `dir` (recursive), sorted by path.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_supported_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Supported documents under `dir` whose file name contains `stamp`.
pub fn find_by_date(dir: &Path, stamp: &str) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = list_documents(dir)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains(stamp))
                .unwrap_or(false)
        })
        .collect();

    tracing::info!(
        dir = %dir.display(),
        stamp,
        found = files.len(),
        "date filter applied"
    );
    Ok(files)
}

/// Chooses between [`find_by_date`] and [`list_documents`].
pub fn select(dir: &Path, auto_detect_today: bool, stamp: &str) -> Result<Vec<PathBuf>> {
    if auto_detect_today {
        find_by_date(dir, stamp)
    } else {
        list_documents(dir)
    }
}

/// Keeps explicitly chosen paths that exist, are files, and are supported.
pub fn validate_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut valid = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            tracing::warn!(file = %path.display(), "file does not exist");
            continue;
        }
        if !path.is_file() {
            tracing::warn!(file = %path.display(), "not a file");
            continue;
        }
        if !is_supported_file(path) {
            tracing::warn!(file = %path.display(), "unsupported file type");
            continue;
        }
        valid.push(path.clone());
    }
    valid
}
