//! Engine: walks an export directory one file at a time, runs the three
//! extractors on each document and folds the results into running totals.
//!
//! The privileged-account set used for session matching is recomputed after
//! each document's high-value accounts are merged, so it only ever grows. A
//! session seen in an earlier file is never re-checked against accounts found
//! in a later one; file order therefore matters and is fixed by sorting.
//!
//! Typical usage:
//!
//! ```no_run
//! use quickmapper::engine::Engine;
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = Engine::new();
//! engine.load_from_directory("/path/to/bloodhound")?;
//! println!("{}", quickmapper::report::render_summary(&engine));
//! # Ok(())
//! # }
//! ```
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::accounts::{Category, HighValueAccounts, extract_high_value_accounts};
use crate::delegation::extract_unconstrained_delegation;
use crate::graph::Document;
use crate::io::{
    DEFAULT_MMAP_THRESHOLD_BYTES, EXPORT_EXTENSION, list_export_files, load_document_auto,
};
use crate::sessions::{PrivilegedAccountSet, SessionMap, extract_sessions, merge_sessions};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid directory: {}", .0.display())]
    InvalidDirectory(PathBuf),
    #[error("cannot list {}: {source}", path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file that was skipped because it could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// Running totals for one run.
#[derive(Debug, Default)]
pub struct Engine {
    pub high_value: HighValueAccounts,
    pub sessions: SessionMap,
    pub delegation: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub files_processed: usize,
}

impl Engine {
    /// Create an engine with empty totals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of the "High Value" and "Domain Admins / Enterprise Admins"
    /// names merged so far.
    pub fn privileged_accounts(&self) -> PrivilegedAccountSet {
        self.high_value
            .iter()
            .filter(|(c, _)| c.is_privileged())
            .flat_map(|(_, names)| names.iter().cloned())
            .collect()
    }

    /// Fold one document into the totals. Accounts are merged first so the
    /// document's own privileged accounts already match its sessions.
    pub fn ingest(&mut self, doc: &Document) {
        let accounts = extract_high_value_accounts(doc);
        let found = accounts.total();
        self.high_value.merge(accounts);
        // Both privileged categories are always listed once a file was read.
        self.high_value.ensure(Category::DomainAdmins);
        self.high_value.ensure(Category::HighValue);

        let privileged = self.privileged_accounts();
        let sessions = extract_sessions(doc, &privileged);
        let hosts = sessions.len();
        merge_sessions(&mut self.sessions, sessions);

        let delegation = extract_unconstrained_delegation(doc);
        let delegated = delegation.len();
        self.delegation.extend(delegation);

        self.files_processed += 1;
        debug!(
            "ingested {} nodes: {} account flags, {} hosts with privileged sessions, {} delegation principals",
            doc.nodes.len(),
            found,
            hosts,
            delegated
        );
    }

    /// Load documents already in memory. Intended for tests and small
    /// programmatic integrations; unparsable inputs are recorded as
    /// `<input N>` failures.
    pub fn load_from_strings(&mut self, docs: &[&str]) {
        for (i, raw) in docs.iter().enumerate() {
            match raw.parse::<Document>() {
                Ok(doc) => self.ingest(&doc),
                Err(e) => self.record_failure(format!("<input {}>", i), e.to_string()),
            }
        }
    }

    /// Process every export file in `dir` in file-name order. Files that fail
    /// to load are recorded and skipped; only an unusable `dir` is an error.
    pub fn load_from_directory_with_threshold<P: AsRef<Path>>(
        &mut self,
        dir: P,
        mmap_threshold_bytes: u64,
    ) -> Result<(), EngineError> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            return Err(EngineError::InvalidDirectory(dir.to_path_buf()));
        }
        let files = list_export_files(dir).map_err(|source| EngineError::ListDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        if files.is_empty() {
            warn!("no {} files found in {}", EXPORT_EXTENSION, dir.display());
        }
        for path in files {
            info!("processing {}", path.display());
            match load_document_auto(&path, mmap_threshold_bytes) {
                Ok(doc) => self.ingest(&doc),
                Err(e) => {
                    let file = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    warn!("error processing {}: {}", file, e);
                    self.record_failure(file, e.to_string());
                }
            }
        }
        info!(
            "processed {} files, skipped {}",
            self.files_processed,
            self.failures.len()
        );
        Ok(())
    }

    /// Convenience wrapper that uses the default mmap threshold.
    pub fn load_from_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<(), EngineError> {
        self.load_from_directory_with_threshold(dir, DEFAULT_MMAP_THRESHOLD_BYTES)
    }

    fn record_failure(&mut self, file: String, message: String) {
        self.failures.push(FileFailure { file, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const EXAMPLE: &str = r#"{"nodes":[
        {"properties":{"name":"A","highvalue":true}},
        {"properties":{"name":"B","admincount":1,"unconstraineddelegation":true},
         "sessions":[{"user":{"name":"A"}}]}
    ]}"#;

    #[test]
    fn single_document_example() {
        let mut e = Engine::new();
        e.load_from_strings(&[EXAMPLE]);
        assert_eq!(e.high_value.get(Category::HighValue), ["A"]);
        assert_eq!(e.high_value.get(Category::DomainAdmins), ["B"]);
        assert_eq!(e.high_value.get(Category::UnconstrainedDelegation), ["B"]);
        assert_eq!(e.sessions.len(), 1);
        assert!(e.sessions["B"].contains("A"));
        assert_eq!(e.delegation, vec!["B"]);
        assert_eq!(e.files_processed, 1);
        assert!(e.failures.is_empty());
    }

    #[test]
    fn privilege_discovered_later_does_not_apply_retroactively() {
        let sessions_first = r#"{"nodes":[
            {"properties":{"name":"WS01"},"sessions":[{"user":{"name":"LATE_DA"}}]}
        ]}"#;
        let admins_second = r#"{"nodes":[
            {"properties":{"name":"LATE_DA","admincount":1}}
        ]}"#;
        let mut e = Engine::new();
        e.load_from_strings(&[sessions_first, admins_second]);
        assert!(e.privileged_accounts().contains("LATE_DA"));
        assert!(e.sessions.is_empty());

        // Opposite order: the account is already privileged when sessions arrive.
        let mut e = Engine::new();
        e.load_from_strings(&[admins_second, sessions_first]);
        assert!(e.sessions["WS01"].contains("LATE_DA"));
    }

    #[test]
    fn privileged_set_ignores_other_categories() {
        let doc = r#"{"nodes":[
            {"properties":{"name":"SVC","hasspn":true,"allowedtodelegate":true}},
            {"properties":{"name":"HOST","unconstraineddelegation":true},
             "sessions":[{"user":{"name":"SVC"}}]}
        ]}"#;
        let mut e = Engine::new();
        e.load_from_strings(&[doc]);
        assert!(e.privileged_accounts().is_empty());
        assert!(e.sessions.is_empty());
    }

    #[test]
    fn privileged_categories_are_listed_even_when_empty() {
        let mut e = Engine::new();
        e.load_from_strings(&[r#"{"nodes":[{"properties":{"name":"S","hasspn":true}}]}"#]);
        let order: Vec<Category> = e.high_value.iter().map(|(c, _)| c).collect();
        assert_eq!(
            order,
            vec![
                Category::Kerberoastable,
                Category::DomainAdmins,
                Category::HighValue
            ]
        );
        assert!(e.high_value.contains_category(Category::HighValue));
        assert!(e.high_value.get(Category::HighValue).is_empty());
    }

    #[test]
    fn malformed_records_do_not_drop_the_file() {
        let wrong_sessions = r#"{"nodes":[
            {"properties":{"name":"A","highvalue":true}},
            {"properties":{"name":"H"},"sessions":{}}
        ]}"#;
        let wrong_user = r#"{"nodes":[
            {"properties":{"name":"H2"},"sessions":[{"user":"A"}, {"user":{"name":"A"}}]}
        ]}"#;
        let repeated_key = r#"{"nodes":[
            {"properties":{"name":"B","admincount":1,"admincount":1},"properties":{"name":"C"}}
        ]}"#;
        let mut e = Engine::new();
        e.load_from_strings(&[wrong_sessions, wrong_user, repeated_key]);
        assert!(e.failures.is_empty());
        assert_eq!(e.files_processed, 3);
        assert_eq!(e.high_value.get(Category::HighValue), ["A"]);
        assert!(e.sessions["H2"].contains("A"));
        assert!(!e.sessions.contains_key("H"));
        // the later "properties" object wins, and it carries no flags
        assert!(e.high_value.get(Category::DomainAdmins).is_empty());
    }

    #[test]
    fn bad_input_is_recorded_and_skipped() {
        let mut e = Engine::new();
        e.load_from_strings(&["{ nope", EXAMPLE]);
        assert_eq!(e.failures.len(), 1);
        assert_eq!(e.failures[0].file, "<input 0>");
        assert_eq!(e.files_processed, 1);
        assert_eq!(e.delegation, vec!["B"]);
    }

    #[test]
    fn directory_with_corrupt_file_still_loads_valid_ones() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a_corrupt.json"), "{\"nodes\": [").unwrap();
        fs::write(dir.path().join("b_valid.json"), EXAMPLE).unwrap();
        fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let mut e = Engine::new();
        e.load_from_directory(dir.path()).unwrap();
        assert_eq!(e.files_processed, 1);
        assert_eq!(e.failures.len(), 1);
        assert_eq!(e.failures[0].file, "a_corrupt.json");
        assert!(e.failures[0].message.contains("invalid JSON"));
        assert_eq!(e.high_value.get(Category::HighValue), ["A"]);
    }

    #[test]
    fn duplicates_across_files_are_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.json"), EXAMPLE).unwrap();
        fs::write(dir.path().join("2.json"), EXAMPLE).unwrap();
        let mut e = Engine::new();
        e.load_from_directory_with_threshold(dir.path(), 1).unwrap();
        assert_eq!(e.high_value.get(Category::HighValue), ["A", "A"]);
        assert_eq!(e.delegation, vec!["B", "B"]);
        assert_eq!(e.sessions["B"].len(), 1);
    }

    #[test]
    fn invalid_directory_is_fatal() {
        let dir = tempdir().unwrap();
        let mut e = Engine::new();
        let missing = dir.path().join("nope");
        assert!(matches!(
            e.load_from_directory(&missing),
            Err(EngineError::InvalidDirectory(_))
        ));
        assert!(matches!(
            e.load_from_directory(""),
            Err(EngineError::InvalidDirectory(_))
        ));
        let file = dir.path().join("file.json");
        fs::write(&file, EXAMPLE).unwrap();
        assert!(matches!(
            e.load_from_directory(&file),
            Err(EngineError::InvalidDirectory(_))
        ));
        assert_eq!(e.files_processed, 0);
    }
}
