//! Modification-time based change detection for one kernel file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

/// Watches a single file path.
///
/// A file counts as changed when its modification time is newer than the
/// one seen by the last [`read_all`](Self::read_all), or when it has never
/// been read.
#[derive(Debug, Clone)]
pub struct SourceWatcher {
    path: PathBuf,
    read_time: Option<SystemTime>,
}

impl SourceWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_time: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the path names an existing regular file.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    pub fn has_changed(&self) -> bool {
        match (self.modified(), self.read_time) {
            (Some(modified), Some(read)) => modified > read,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Read the whole file and remember its modification time.
    pub fn read_all(&mut self) -> Result<String> {
        let modified = self.modified();
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        self.read_time = modified;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    fn touch(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn unread_file_counts_as_changed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "void imageMain(inout vec4 c, vec2 p) {{}}").unwrap();
        let watcher = SourceWatcher::new(file.path());
        assert!(watcher.exists());
        assert!(watcher.has_changed());
    }

    #[test]
    fn read_clears_change_until_next_modification() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "first").unwrap();
        let start = SystemTime::now() - Duration::from_secs(60);
        touch(file.path(), start);

        let mut watcher = SourceWatcher::new(file.path());
        assert_eq!(watcher.read_all().unwrap(), "first");
        assert!(!watcher.has_changed());

        fs::write(file.path(), "second").unwrap();
        touch(file.path(), start + Duration::from_secs(5));
        assert!(watcher.has_changed());
        assert_eq!(watcher.read_all().unwrap(), "second");
        assert!(!watcher.has_changed());
    }

    #[test]
    fn missing_file_never_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = SourceWatcher::new(dir.path().join("missing.glsl"));
        assert!(!watcher.exists());
        assert!(!watcher.has_changed());
        assert!(watcher.read_all().is_err());
    }

    #[test]
    fn directory_is_not_a_kernel() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!SourceWatcher::new(dir.path()).exists());
    }
}
