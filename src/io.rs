use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::warn;
use memmap2::Mmap;

use crate::graph::Document;

/// Threshold in bytes above which we attempt to use mmap for reading.
/// Callers can override via API; this is a reasonable default.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Extension an entry must carry to be treated as an export file.
pub const EXPORT_EXTENSION: &str = ".json";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

fn read_err(path: &Path) -> impl FnOnce(io::Error) -> DocumentError + '_ {
    move |source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_err(path: &Path) -> impl FnOnce(serde_json::Error) -> DocumentError + '_ {
    move |source| DocumentError::Parse {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse a document through a buffered reader (non-mmap).
pub fn load_document_bufread<P: AsRef<Path>>(path: P) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(read_err(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(parse_err(path))
}

/// Parse a document straight out of a memory mapping.
pub fn load_document_mmap<P: AsRef<Path>>(path: P) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(read_err(path))?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(read_err(path))?;
    Document::from_slice(&mmap).map_err(parse_err(path))
}

/// Choose mmap or bufread by file size.
pub fn load_document_auto<P: AsRef<Path>>(
    path: P,
    threshold_bytes: u64,
) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(read_err(path))?;
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        load_document_mmap(path)
    } else {
        load_document_bufread(path)
    }
}

/// Regular files directly under `dir` whose name ends in `.json`, sorted by
/// file name. Subdirectories are skipped, never descended into.
pub fn list_export_files<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path()));
    Ok(select_export_files(entries))
}

/// Keep export files out of a directory listing. An entry that cannot be read
/// is logged and skipped.
pub fn select_export_files<I>(entries: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut files = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if is_export_name(&path) && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

fn is_export_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(EXPORT_EXTENSION.as_bytes()))
}
