//! Recording store implementation

use crate::StoreError;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions served from the recordings directory
const SERVED_EXTENSIONS: [&str; 3] = ["h264", "txt", "jpg"];

/// Timestamp-derived base name for a new recording, e.g. `left_20260825_143000`
pub fn video_base_name(role_label: &str) -> String {
    format!("{}_{}", role_label, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Timestamp-derived file name for a new still, e.g. `left_photo_20260825_143000.jpg`
pub fn photo_file_name(role_label: &str) -> String {
    format!("{}_photo_{}.jpg", role_label, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Handle to the node's recordings directory
#[derive(Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    /// Open the store, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Recording store ready");
        Ok(Self { dir })
    }

    /// Directory this store serves
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Video elementary stream path for a recording base name
    pub fn video_path(&self, base_name: &str) -> PathBuf {
        self.dir.join(format!("{base_name}.h264"))
    }

    /// Per-frame timestamp sidecar path for a recording base name
    pub fn timestamps_path(&self, base_name: &str) -> PathBuf {
        self.dir.join(format!("{base_name}.txt"))
    }

    /// Write a captured still into the store
    pub fn write_photo(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        validate_name(file_name)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, data)?;
        debug!(file = file_name, bytes = data.len(), "Still written");
        Ok(path)
    }

    /// List served recordings, newest first.
    ///
    /// Timestamp-encoded names make lexicographic descending order equal
    /// chronological descending order per role.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let served = Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SERVED_EXTENSIONS.contains(&e));
            if served {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Resolve a recording name to its path for download
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Delete a recording file
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        std::fs::remove_file(path)?;
        info!(file = name, "Recording deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> RecordingStore {
        let dir = std::env::temp_dir().join(format!(
            "recording-store-test-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        RecordingStore::new(dir).unwrap()
    }

    #[test]
    fn test_naming_encodes_role_and_type() {
        let base = video_base_name("left");
        assert!(base.starts_with("left_"));

        let photo = photo_file_name("right");
        assert!(photo.starts_with("right_photo_"));
        assert!(photo.ends_with(".jpg"));
    }

    #[test]
    fn test_list_filters_and_sorts_descending() {
        let store = temp_store("list");
        std::fs::write(store.video_path("left_20260101_000000"), b"v").unwrap();
        std::fs::write(store.timestamps_path("left_20260101_000000"), b"t").unwrap();
        std::fs::write(store.dir().join("left_20260202_000000.h264"), b"v").unwrap();
        std::fs::write(store.dir().join("notes.pdf"), b"x").unwrap();

        let names = store.list().unwrap();
        assert_eq!(
            names,
            vec![
                "left_20260202_000000.h264",
                "left_20260101_000000.txt",
                "left_20260101_000000.h264",
            ]
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = temp_store("traversal");
        assert!(matches!(
            store.resolve("../etc/passwd"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(store.resolve(".."), Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let store = temp_store("missing");
        assert!(matches!(
            store.resolve("left_19700101_000000.h264"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_file() {
        let store = temp_store("delete");
        let path = store.write_photo("left_photo_x.jpg", b"\xFF\xD8\xFF\xD9").unwrap();
        assert!(path.is_file());

        store.delete("left_photo_x.jpg").unwrap();
        assert!(!path.exists());
        assert!(matches!(
            store.delete("left_photo_x.jpg"),
            Err(StoreError::NotFound(_))
        ));
    }
}
