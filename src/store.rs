//! File-backed cache of captured text responses and sample images for
//! offline runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::DesignError;

/// Key shared by every request when the store is in global test mode.
pub const SHARED_TEST_KEY: &str = "test_response";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct TestResponseStore {
    dir: PathBuf,
    global_test_mode: bool,
}

impl TestResponseStore {
    pub fn new(dir: impl Into<PathBuf>, global_test_mode: bool) -> Self {
        Self { dir: dir.into(), global_test_mode }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a request. Readable slug plus a digest of the exact
    /// fields, so requests differing in any field never share a key.
    pub fn fingerprint(&self, room_type: &str, design_style: &str, color_palette: &str) -> String {
        if self.global_test_mode {
            return SHARED_TEST_KEY.to_string();
        }
        let raw = format!("{room_type}_{design_style}_{color_palette}");
        let slug: String = raw
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .take(80)
            .collect();
        let digest = Sha256::digest(format!("{room_type}\u{1f}{design_style}\u{1f}{color_palette}").as_bytes());
        format!("{}_{}", slug, &hex::encode(digest)[..12])
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn load(&self, key: &str) -> Result<Option<String>, DesignError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let stored: StoredResponse = serde_json::from_str(&raw)?;
        info!("📦 Loaded cached response for key: {}", key);
        Ok(Some(stored.response))
    }

    pub fn save(&self, key: &str, response: &str) -> Result<(), DesignError> {
        std::fs::create_dir_all(&self.dir)?;
        let body = serde_json::to_string(&StoredResponse { response: response.to_string() })?;
        std::fs::write(self.path_for(key), body)?;
        info!("💾 Saved response for key: {}", key);
        Ok(())
    }

    /// First sample image in the store, by file name.
    pub fn sample_image(&self) -> Option<PathBuf> {
        let mut images: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        images.sort();
        images.into_iter().next()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn global_mode_shares_one_key() {
        let store = TestResponseStore::new("unused", true);
        assert_eq!(store.fingerprint("Kitchen", "Modern", "Blue"), SHARED_TEST_KEY);
        assert_eq!(store.fingerprint("Study", "Rustic", "Red"), SHARED_TEST_KEY);
    }

    #[test]
    fn per_request_keys_differ_by_any_field() {
        let store = TestResponseStore::new("unused", false);
        let base = store.fingerprint("Kitchen", "Modern", "Neutral with blue accents");
        assert_eq!(base, store.fingerprint("Kitchen", "Modern", "Neutral with blue accents"));
        assert!(base.starts_with("kitchen_modern_neutral_with_blue_accents_"));
        assert_ne!(base, store.fingerprint("Study", "Modern", "Neutral with blue accents"));
        assert_ne!(base, store.fingerprint("Kitchen", "Rustic", "Neutral with blue accents"));
        assert_ne!(base, store.fingerprint("Kitchen", "Modern", "Neutral/blue accents"));
        assert!(!store.fingerprint("Entryway / Foyer", "Modern", "x").contains('/'));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TestResponseStore::new(dir.path().join("responses"), false);
        assert_eq!(store.load("missing").unwrap(), None);
        store.save("k", "## Title\nbody").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("## Title\nbody"));
        let raw = std::fs::read_to_string(dir.path().join("responses/k.json")).unwrap();
        assert_eq!(raw, r###"{"response":"## Title\nbody"}"###);
    }

    #[test]
    fn sample_image_picks_first_image_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.png"), [0u8]).unwrap();
        std::fs::write(dir.path().join("a.JPG"), [0u8]).unwrap();
        let store = TestResponseStore::new(dir.path(), true);
        assert_eq!(store.sample_image(), Some(dir.path().join("a.JPG")));
    }

    #[test]
    fn sample_image_absent_when_dir_missing() {
        let store = TestResponseStore::new("/nonexistent/genie/store", true);
        assert_eq!(store.sample_image(), None);
    }
}
