// src/folder_chain.rs - Sibling folder discovery for chained classification

use std::fs;
use std::path::{Path, PathBuf};
use rayon::prelude::*;

use crate::errors::{ClassifyError, Result};
use crate::image_io::dir_has_photos;

/// True when `name` contains a zero-padded two-digit code in `low..=high`
pub fn has_category_code(name: &str, low: u32, high: u32) -> bool {
    (low..=high).any(|code| name.contains(&format!("{:02}", code)))
}

/// List sibling folders of `source` that carry a category code and hold photos.
///
/// `source` itself is never included. The result is sorted by name.
pub fn discover_sibling_folders(
    source: &Path,
    code_range: [u32; 2],
    use_parallel: bool,
) -> Result<Vec<PathBuf>> {
    let parent = source
        .parent()
        .ok_or_else(|| ClassifyError::InvalidPath(source.to_path_buf()))?;

    let mut candidates = Vec::new();
    for entry in fs::read_dir(parent)? {
        let path = entry?.path();
        if !path.is_dir() || same_folder(&path, source) {
            continue;
        }
        let matches_code = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|name| has_category_code(name, code_range[0], code_range[1]))
            .unwrap_or(false);
        if matches_code {
            candidates.push(path);
        }
    }

    let mut siblings: Vec<PathBuf> = if use_parallel {
        candidates
            .into_par_iter()
            .filter(|path| dir_has_photos(path))
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|path| dir_has_photos(path))
            .collect()
    };
    siblings.sort();

    log::debug!(
        "Found {} sibling folders next to {}",
        siblings.len(),
        source.display()
    );
    Ok(siblings)
}

fn same_folder(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// The sibling set discovered when a folder is first opened, plus the folders
/// already worked through this session
#[derive(Debug, Clone, Default)]
pub struct FolderChain {
    siblings: Vec<PathBuf>,
    visited: Vec<PathBuf>,
}

impl FolderChain {
    pub fn new(siblings: Vec<PathBuf>) -> Self {
        Self {
            siblings,
            visited: Vec::new(),
        }
    }

    pub fn mark_visited(&mut self, folder: &Path) {
        if !self.visited.iter().any(|v| v == folder) {
            self.visited.push(folder.to_path_buf());
        }
    }

    pub fn is_visited(&self, folder: &Path) -> bool {
        self.visited.iter().any(|v| v == folder)
    }

    /// Siblings not yet visited, in discovery order
    pub fn remaining(&self) -> Vec<PathBuf> {
        self.siblings
            .iter()
            .filter(|s| !self.is_visited(s))
            .cloned()
            .collect()
    }

    pub fn siblings(&self) -> &[PathBuf] {
        &self.siblings
    }
}
