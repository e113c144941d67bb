//! Project script sources.
//!
//! A project is a map from relative path to script text. Paths use `/` as
//! the separator regardless of platform, so fingerprints and block ids are
//! the same everywhere.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::error::AnalysisResult;

/// Extension of script files picked up by [`ProjectSources::load_dir`].
pub const SCRIPT_EXTENSION: &str = "rpy";

/// Script texts keyed by path, iterated in path order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectSources {
    files: BTreeMap<String, String>,
}

impl ProjectSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one file.
    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(path, text)| (path.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Loads every `.rpy` file under `root`. Paths are relative to `root`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn load_dir(root: &Path) -> AnalysisResult<Self> {
        let mut sources = Self::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            let key = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            sources.insert(key, std::fs::read_to_string(path)?);
        }
        debug!(files = sources.len(), "script sources loaded");
        Ok(sources)
    }

    /// SHA-256 over every (path, text) pair, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, text) in &self.files {
            hasher.update((path.len() as u64).to_le_bytes());
            hasher.update(path.as_bytes());
            hasher.update((text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        let digest = hasher.finalize();
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl<P, T> FromIterator<(P, T)> for ProjectSources
where
    P: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        let mut sources = Self::new();
        for (path, text) in iter {
            sources.insert(path, text);
        }
        sources
    }
}
