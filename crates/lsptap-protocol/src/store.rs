//! Canned message files for synthetic injection.
//!
//! A message file holds one JSON-RPC envelope as plain JSON. The store scans
//! a directory once and serves envelopes by file name; the admin console
//! lists the names and sends the chosen one.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::envelope::AnyMap;

/// Errors reading or parsing message files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read message directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("read message {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("unmarshal message {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load the file at `path` and parse it as a JSON-RPC envelope.
pub async fn load_message(path: &Path) -> Result<AnyMap, StoreError> {
    let content = tokio::fs::read(path).await.map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A directory of injectable message files.
#[derive(Debug, Clone)]
pub struct MessageStore {
    dir: PathBuf,
    names: Vec<String>,
}

impl MessageStore {
    /// Scan the directory, recording every non-directory entry.
    pub async fn scan(dir: &Path) -> Result<Self, StoreError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|source| StoreError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|ft| ft.is_dir())
                .unwrap_or(false);
            if !is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    /// An empty store with no backing directory.
    pub fn empty() -> Self {
        Self {
            dir: PathBuf::new(),
            names: Vec::new(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Load a listed message by file name.
    pub async fn load(&self, name: &str) -> Result<AnyMap, StoreError> {
        load_message(&self.dir.join(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_lists_files_not_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hover.json"), r#"{"method":"x"}"#).unwrap();
        std::fs::write(dir.path().join("init.json"), r#"{"method":"y"}"#).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let store = MessageStore::scan(dir.path()).await.unwrap();
        assert_eq!(store.names(), ["hover.json", "init.json"]);
    }

    #[tokio::test]
    async fn load_parses_envelope() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("req.json"),
            r#"{"method":"textDocument/hover","params":{"uri":"file:///a"}}"#,
        )
        .unwrap();

        let store = MessageStore::scan(dir.path()).await.unwrap();
        let envelope = store.load("req.json").await.unwrap();
        assert_eq!(envelope["method"], serde_json::json!("textDocument/hover"));
    }

    #[tokio::test]
    async fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::scan(dir.path()).await.unwrap();
        assert!(matches!(
            store.load("absent.json").await.unwrap_err(),
            StoreError::Read { .. }
        ));
    }

    #[tokio::test]
    async fn load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();

        let err = load_message(&dir.path().join("bad.json")).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
