use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Photos of the open folder still waiting for a label.
///
/// Classification pops from the front; undo pushes back onto the front.
/// A path is held at most once.
#[derive(Debug, Default, Clone)]
pub struct PhotoQueue {
    items: VecDeque<PathBuf>,
}

impl PhotoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole queue, dropping repeated paths
    pub fn replace(&mut self, photos: Vec<PathBuf>) {
        self.items.clear();
        for photo in photos {
            if !self.contains(&photo) {
                self.items.push_back(photo);
            }
        }
    }

    pub fn front(&self) -> Option<&PathBuf> {
        self.items.front()
    }

    pub fn pop_front(&mut self) -> Option<PathBuf> {
        self.items.pop_front()
    }

    /// Returns false (and leaves the queue untouched) if the path is already queued
    pub fn push_front(&mut self, photo: PathBuf) -> bool {
        if self.contains(&photo) {
            return false;
        }
        self.items.push_front(photo);
        true
    }

    pub fn contains(&self, photo: &Path) -> bool {
        self.items.iter().any(|queued| queued == photo)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
