//! File-based resume blob store — one artifact per user.
//! Blobs saved as plain files under a root directory; zero overhead,
//! no schema.

use std::path::{Path, PathBuf};

use coldreach_core::error::{OutreachError, Result};

/// Resume blob store.
pub struct ResumeStore {
    root: PathBuf,
}

impl ResumeStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            root: dir.to_path_buf(),
        }
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        // User ids come from the API surface; keep them out of path tricks.
        if user_id.is_empty() || user_id.contains(['/', '\\']) || user_id.contains("..") {
            return Err(OutreachError::Validation(format!(
                "invalid user id: {user_id:?}"
            )));
        }
        Ok(self.root.join(user_id).join("resume.pdf"))
    }

    /// Store (or replace) a user's resume.
    pub fn save(&self, user_id: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(user_id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!("💾 Saved resume for {user_id} ({} bytes)", bytes.len());
        Ok(())
    }

    /// Fetch a user's resume bytes.
    pub fn fetch(&self, user_id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(user_id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OutreachError::NotFound(
                format!("no resume on file for {user_id}"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a resume is on file.
    pub fn exists(&self, user_id: &str) -> bool {
        self.path_for(user_id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Size in bytes, if a resume is on file.
    pub fn size(&self, user_id: &str) -> Option<u64> {
        self.path_for(user_id)
            .ok()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> (ResumeStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("coldreach-resumes-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        (ResumeStore::new(&dir), dir)
    }

    #[test]
    fn test_save_and_fetch() {
        let (store, dir) = temp_store("roundtrip");
        assert!(!store.exists("u1"));
        store.save("u1", b"%PDF-1.4 fake").unwrap();
        assert!(store.exists("u1"));
        assert_eq!(store.fetch("u1").unwrap(), b"%PDF-1.4 fake");
        assert_eq!(store.size("u1"), Some(13));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_resume_is_not_found() {
        let (store, dir) = temp_store("missing");
        match store.fetch("u1") {
            Err(OutreachError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (store, dir) = temp_store("traversal");
        assert!(store.save("../evil", b"x").is_err());
        assert!(!store.exists("a/b"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
