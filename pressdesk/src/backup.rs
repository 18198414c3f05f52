//! Manual backup export/import, independent of the cloud path. The export is
//! human-inspectable JSON holding the entity slices only (no UI state); the
//! import accepts the same shape and is applied through the engine's import
//! path, so the usual guard rules hold.

use crate::document::{Document, DocumentPatch};

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup could not be serialized: {0}")]
    Serialize(serde_json::Error),
    #[error("backup file could not be parsed: {0}")]
    Parse(serde_json::Error),
}

/// Full entity snapshot, logo intact, pretty-printed for inspection.
pub fn export_json(document: &Document) -> Result<String, BackupError> {
    serde_json::to_string_pretty(&DocumentPatch::full(document)).map_err(BackupError::Serialize)
}

pub fn parse_backup(json: &str) -> Result<DocumentPatch, BackupError> {
    serde_json::from_str(json).map_err(BackupError::Parse)
}
