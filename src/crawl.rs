// src/crawl.rs - Background sampling copy of photos out of a lot tree

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;
use walkdir::WalkDir;

use crate::errors::{ClassifyError, Result};
use crate::image_io::is_photo;

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    pub max_images: usize,
    /// Photos whose file name appears anywhere under this tree are left out
    pub filter_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlProgress {
    pub copied: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub copied: usize,
    pub requested: usize,
    pub filtered: usize,
}

impl CrawlSummary {
    /// Fewer photos were found than requested
    pub fn is_short(&self) -> bool {
        self.copied < self.requested
    }
}

/// A crawl running on its own thread
pub struct CrawlHandle {
    pub progress: mpsc::Receiver<CrawlProgress>,
    handle: thread::JoinHandle<Result<CrawlSummary>>,
}

impl CrawlHandle {
    /// Block until the crawl thread finishes
    pub fn wait(self) -> Result<CrawlSummary> {
        self.handle
            .join()
            .map_err(|_| ClassifyError::Crawl("crawl thread panicked".to_string()))?
    }
}

/// Start `run_crawl` on a worker thread, streaming progress over a channel
pub fn spawn(options: CrawlOptions) -> CrawlHandle {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        run_crawl(&options, |progress| {
            // Receiver may already be gone; the copy still finishes
            let _ = tx.send(progress);
        })
    });

    CrawlHandle { progress: rx, handle }
}

/// Copy up to `max_images` photos from `source` (recursively) into `output`.
///
/// File names already present in `output` are not overwritten and do not
/// count toward the total.
pub fn run_crawl<F>(options: &CrawlOptions, mut on_progress: F) -> Result<CrawlSummary>
where
    F: FnMut(CrawlProgress),
{
    if options.max_images == 0 {
        return Err(ClassifyError::Crawl("max images must be at least 1".to_string()));
    }
    if !options.source.is_dir() {
        return Err(ClassifyError::InvalidPath(options.source.clone()));
    }
    fs::create_dir_all(&options.output)?;

    let excluded = match &options.filter_dir {
        Some(dir) => collect_file_names(dir)?,
        None => HashSet::new(),
    };

    let mut copied = 0;
    let mut filtered = 0;

    for entry in WalkDir::new(&options.source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if copied >= options.max_images {
            break;
        }

        let path = entry.path();
        if !entry.file_type().is_file() || !is_photo(path) {
            continue;
        }
        // Never walk into our own output
        if path.starts_with(&options.output) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if excluded.contains(&file_name) {
            filtered += 1;
            continue;
        }

        let target = options.output.join(&file_name);
        if target.exists() {
            log::warn!("Skipping {}: {} already exists", path.display(), target.display());
            continue;
        }

        fs::copy(path, &target)?;
        copied += 1;

        let percent = (copied * 100 / options.max_images).min(100) as u8;
        on_progress(CrawlProgress { copied, percent });
    }

    let summary = CrawlSummary {
        copied,
        requested: options.max_images,
        filtered,
    };

    if summary.is_short() {
        log::warn!(
            "Copied {} of {} requested photos; the source does not hold enough samples",
            summary.copied,
            summary.requested
        );
    } else {
        log::info!("Copied {} photos to {}", summary.copied, options.output.display());
    }

    Ok(summary)
}

fn collect_file_names(dir: &Path) -> Result<HashSet<String>> {
    if !dir.is_dir() {
        return Err(ClassifyError::InvalidPath(dir.to_path_buf()));
    }

    Ok(WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect())
}
