use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;
use crate::resolver::UrlResolver;

/// Resource categories double as cache subdirectory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Css,
    Js,
    Images,
    Fonts,
}

impl Category {
    pub fn dir(self) -> &'static str {
        match self {
            Category::Css => "css",
            Category::Js => "js",
            Category::Images => "images",
            Category::Fonts => "fonts",
        }
    }
}

/// Per-page on-disk cache for one archiver run.
///
/// The in-memory map is the single source of truth for what has been
/// downloaded during this run; it is never rebuilt from a directory scan.
pub struct ResourceStore {
    cache_root: PathBuf,
    entries: HashMap<String, String>,
}

impl ResourceStore {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            entries: HashMap::new(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Local path previously reserved for `url`, if any. No I/O.
    pub fn lookup(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Reserves a collision-free local path for `url` under the category
    /// directory and records the mapping. Idempotent per URL within a run.
    pub fn reserve(&mut self, url: &str, category: Category) -> Result<String, ArchiveError> {
        if let Some(existing) = self.entries.get(url) {
            return Ok(existing.clone());
        }

        let dir = self.cache_root.join(category.dir());
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;

        let filename = UrlResolver::filename_for(url);
        let mut candidate = filename.clone();
        let mut counter = 1;
        while dir.join(&candidate).exists() {
            candidate = match filename.rfind('.') {
                Some(dot) => format!("{}_{}{}", &filename[..dot], counter, &filename[dot..]),
                None => format!("{}_{}", filename, counter),
            };
            counter += 1;
        }

        let local_path = format!("{}/{}", category.dir(), candidate);
        self.entries.insert(url.to_string(), local_path.clone());
        Ok(local_path)
    }

    /// Persists bytes at a reserved path, creating parent directories.
    /// Collision resolution hands out fresh paths, so an overwrite is not
    /// expected; if one happens anyway, last write wins.
    pub fn write(&self, local_path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let path = self.cache_root.join(local_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        fs::write(&path, bytes).map_err(|e| ArchiveError::io(&path, e))
    }
}
