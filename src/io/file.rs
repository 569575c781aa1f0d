use std::path::{Path, PathBuf};

use crate::engine::SnapshotSink;
use crate::error::PersistError;
use crate::model::Snapshot;

/// Save a snapshot to a JSON file, creating parent directories.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(snapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, PersistError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Keeps the latest snapshot in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonSnapshotFile {
    path: PathBuf,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored snapshot, or `None` when there is none or it is unreadable.
    pub fn load(&self) -> Option<Snapshot> {
        if !self.path.exists() {
            return None;
        }
        match load_snapshot(&self.path) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable snapshot: {}", e);
                None
            }
        }
    }
}

impl SnapshotSink for JsonSnapshotFile {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<(), PersistError> {
        save_snapshot(snapshot, &self.path)?;
        tracing::debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::tests::table;
    use crate::model::{ColumnMap, RecordStore};

    fn snapshot() -> Snapshot {
        let mut store = RecordStore::new(ColumnMap::default());
        store
            .load(&table(&[("CA", 1, 3, 0, 60), ("CA", 2, 4, 10, 70)]))
            .unwrap();
        store.snapshot()
    }

    #[test]
    fn test_sink_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonSnapshotFile::new(dir.path().join("cache").join("snapshot.json"));
        assert!(sink.load().is_none());

        let snap = snapshot();
        sink.persist(&snap).unwrap();
        assert_eq!(sink.load(), Some(snap));

        sink.clear().unwrap();
        assert!(sink.load().is_none());
        sink.clear().unwrap();
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["dataModified"][0]["status"], "modified");
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();
        let sink = JsonSnapshotFile::new(&path);
        assert!(sink.load().is_none());
        assert!(matches!(load_snapshot(&path), Err(PersistError::Json(_))));
    }
}
