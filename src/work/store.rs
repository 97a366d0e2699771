//! Work document persistence

use std::path::{Path, PathBuf};
use tracing::debug;

use super::WorkDocument;
use crate::error::{validate_key, TrackerResult};
use crate::storage::{list_json_files, paths, read_json, write_json_atomic};

/// Stores one JSON file per document at `<data>/<slug>/work/<finding-id>.json`.
#[derive(Debug, Clone)]
pub struct WorkStore {
    data_dir: PathBuf,
}

impl WorkStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load one document, `None` if it was never created.
    pub fn load(&self, repo: &str, id: &str) -> TrackerResult<Option<WorkDocument>> {
        validate_key("repository slug", repo)?;
        validate_key("finding id", id)?;
        read_json(&paths::work_document_path(&self.data_dir, repo, id))
    }

    /// Every document of `repo`, ordered by finding id.
    ///
    /// A corrupt document is an error: the document set is the one piece of
    /// shared state and silently dropping a member would hide findings.
    pub fn load_all(&self, repo: &str) -> TrackerResult<Vec<WorkDocument>> {
        validate_key("repository slug", repo)?;
        let mut docs = Vec::new();
        for path in list_json_files(&paths::work_dir(&self.data_dir, repo))? {
            if let Some(doc) = read_json::<WorkDocument>(&path)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    pub fn save(&self, repo: &str, doc: &WorkDocument) -> TrackerResult<PathBuf> {
        validate_key("repository slug", repo)?;
        validate_key("finding id", &doc.id)?;
        let path = paths::work_document_path(&self.data_dir, repo, &doc.id);
        write_json_atomic(&path, doc)?;
        debug!(repo = repo, id = %doc.id, "Saved work document");
        Ok(path)
    }

    /// Delete a document. Deleting one that does not exist is not an error.
    pub fn remove(&self, repo: &str, id: &str) -> TrackerResult<()> {
        validate_key("repository slug", repo)?;
        validate_key("finding id", id)?;
        match std::fs::remove_file(paths::work_document_path(&self.data_dir, repo, id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
