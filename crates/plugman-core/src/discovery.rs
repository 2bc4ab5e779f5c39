//! # Plugman Plugin Discovery
//!
//! Scans the configured search paths for plugin directories. Discovery is
//! shallow: each immediate subdirectory of a search path is a candidate,
//! and the first manifest file found in it (probing the names in
//! [`MANIFEST_FILE_NAMES`] in order) is reported. Directories without a
//! manifest are ignored. Subdirectories are visited in sorted order, so
//! repeated scans of an unchanged tree return the same list.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::MANIFEST_FILE_NAMES;
use crate::error::{Error, Result};

/// Finds plugin manifest files under the configured search paths.
#[derive(Debug, Clone)]
pub struct PluginDiscovery {
    search_paths: Vec<PathBuf>,
}

impl PluginDiscovery {
    /// Creates a discovery over the given search paths.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        PluginDiscovery { search_paths }
    }

    /// Adds another search path.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// The configured search paths.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Scans every search path and returns the manifest paths found.
    /// Search paths that do not exist are skipped with a warning.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut manifests = Vec::new();
        for search_path in &self.search_paths {
            if !search_path.is_dir() {
                log::warn!(
                    "Plugin search path '{}' does not exist, skipping",
                    search_path.display()
                );
                continue;
            }
            self.scan_search_path(search_path, &mut manifests)?;
        }
        log::debug!("Discovery found {} plugin manifest(s)", manifests.len());
        Ok(manifests)
    }

    /// The manifest file a plugin directory would be loaded from, if any.
    pub fn manifest_in(dir: &Path) -> Option<PathBuf> {
        MANIFEST_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    fn scan_search_path(&self, search_path: &Path, manifests: &mut Vec<PathBuf>) -> Result<()> {
        let entries = fs::read_dir(search_path)
            .map_err(|e| Error::io(e, "read_dir", search_path.to_path_buf()))?;

        let mut subdirs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(e, "read_dir", search_path.to_path_buf()))?;
            let path = entry.path();
            if path.is_dir() {
                subdirs.push(path);
            }
        }
        subdirs.sort();

        for dir in subdirs {
            if let Some(manifest) = Self::manifest_in(&dir) {
                log::debug!("Found plugin manifest '{}'", manifest.display());
                manifests.push(manifest);
            }
        }
        Ok(())
    }
}
