// src/session.rs - Classification workflow state machine
//
// Idle -> FolderLoaded -> Classifying <-> (classify / undo) -> FolderExhausted
//      -> FolderLoaded (advance) | AllComplete (terminal)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::errors::{ClassifyError, Result};
use crate::folder_chain::{discover_sibling_folders, FolderChain};
use crate::image_io::list_photos_in_dir;
use crate::labels::LabelMap;
use crate::queue::PhotoQueue;
use crate::router::{move_back, move_photo, MoveOutcome};
use crate::undo::{UndoEntry, UndoStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No folder chosen yet
    Idle,
    FolderLoaded,
    Classifying,
    /// Queue drained; waiting for the next sibling folder or for the user to stop
    FolderExhausted,
    /// Terminal
    AllComplete,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::FolderLoaded => "folder loaded",
            SessionState::Classifying => "classifying",
            SessionState::FolderExhausted => "folder exhausted",
            SessionState::AllComplete => "all complete",
        };
        f.write_str(name)
    }
}

/// Result of a single classify request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    Moved(UndoEntry),
    /// Destination already had a file with this name. The photo left the queue
    /// but stayed at its original path; no undo entry was recorded.
    Skipped { photo: PathBuf, existing: PathBuf },
    /// Nothing to classify
    QueueEmpty,
    /// Arrived inside the cooldown window after the previous accepted request
    Debounced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Moved,
    Skipped,
    Undone,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Moved => "moved",
            RecordKind::Skipped => "skipped",
            RecordKind::Undone => "undone",
        }
    }
}

/// One line of session history, written out by the CSV report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub photo: PathBuf,
    pub label: String,
    pub destination: PathBuf,
    pub kind: RecordKind,
}

pub struct ClassificationSession {
    config: Config,
    state: SessionState,
    original_source: Option<PathBuf>,
    source: Option<PathBuf>,
    queue: PhotoQueue,
    undo: UndoStack,
    labels: Option<LabelMap>,
    chain: FolderChain,
    save_root: Option<PathBuf>,
    cooldown: Duration,
    last_accepted: Option<Instant>,
    records: Vec<SessionRecord>,
    skipped: Vec<PathBuf>,
}

impl ClassificationSession {
    pub fn new(config: Config) -> Self {
        let undo = UndoStack::new(config.undo_capacity);
        let cooldown = Duration::from_millis(config.classification_cooldown_ms);
        Self {
            config,
            state: SessionState::Idle,
            original_source: None,
            source: None,
            queue: PhotoQueue::new(),
            undo,
            labels: None,
            chain: FolderChain::default(),
            save_root: None,
            cooldown,
            last_accepted: None,
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Open the first folder of a session: load its photos, root the label
    /// table there and discover sibling folders once.
    ///
    /// Returns the number of queued photos. An empty folder is not an error;
    /// the session moves straight to `FolderExhausted` (or `AllComplete`).
    pub fn open_folder<P: AsRef<Path>>(&mut self, folder: P) -> Result<usize> {
        if self.state == SessionState::AllComplete {
            return Err(self.invalid("open a folder"));
        }

        let folder = folder.as_ref().to_path_buf();
        let photos = list_photos_in_dir(&folder)?;
        let siblings = discover_sibling_folders(
            &folder,
            self.config.sibling_code_range,
            self.config.use_parallel,
        )?;

        log::info!(
            "Opened {} with {} photos and {} sibling folders",
            folder.display(),
            photos.len(),
            siblings.len()
        );

        self.labels = Some(LabelMap::new(&self.config.labels, &folder));
        self.chain = FolderChain::new(siblings);
        self.original_source = Some(folder.clone());
        self.load_folder(folder, photos);

        Ok(self.queue.len())
    }

    fn load_folder(&mut self, folder: PathBuf, photos: Vec<PathBuf>) {
        self.queue.replace(photos);
        self.undo.clear();
        self.source = Some(folder);
        self.state = SessionState::FolderLoaded;
        if self.queue.is_empty() {
            self.enter_exhausted();
        }
    }

    fn enter_exhausted(&mut self) {
        if let Some(source) = self.source.clone() {
            self.chain.mark_visited(&source);
        }
        if self.chain.remaining().is_empty() {
            log::info!("All folders complete");
            self.state = SessionState::AllComplete;
        } else {
            self.state = SessionState::FolderExhausted;
        }
    }

    /// Send photos to `<root>/<label leaf>` instead of the source folder.
    /// Only honoured while still on the first opened folder.
    pub fn set_save_root(&mut self, root: Option<PathBuf>) {
        self.save_root = root;
    }

    fn effective_save_root(&self) -> Option<&Path> {
        match (&self.save_root, &self.source, &self.original_source) {
            (Some(root), Some(source), Some(original)) if source == original => Some(root),
            _ => None,
        }
    }

    /// Classify the photo at the front of the queue
    pub fn classify(&mut self, label: &str) -> Result<ClassifyOutcome> {
        if !matches!(self.state, SessionState::FolderLoaded | SessionState::Classifying)
            || self.queue.is_empty()
        {
            return Ok(ClassifyOutcome::QueueEmpty);
        }

        let destination = match &self.labels {
            Some(labels) => labels.resolve(label, self.effective_save_root())?,
            None => return Err(self.invalid("classify")),
        };

        let photo = match self.queue.pop_front() {
            Some(photo) => photo,
            None => return Ok(ClassifyOutcome::QueueEmpty),
        };

        let outcome = match move_photo(&photo, &destination) {
            Ok(MoveOutcome::Moved { from, to }) => {
                let entry = UndoEntry { original: from, destination: to };
                self.record(&entry.original, label, &entry.destination, RecordKind::Moved);
                if let Some(evicted) = self.undo.push(entry.clone()) {
                    log::debug!("Undo history full, dropped {}", evicted.original.display());
                }
                ClassifyOutcome::Moved(entry)
            }
            Ok(MoveOutcome::Skipped { photo, existing }) => {
                self.record(&photo, label, &existing, RecordKind::Skipped);
                self.skipped.push(photo.clone());
                ClassifyOutcome::Skipped { photo, existing }
            }
            Err(e) => {
                log::warn!("Could not classify {}: {}", photo.display(), e);
                self.queue.push_front(photo);
                return Err(e);
            }
        };

        if self.queue.is_empty() {
            self.enter_exhausted();
        } else {
            self.state = SessionState::Classifying;
        }

        Ok(outcome)
    }

    /// Classify by shortcut key
    pub fn classify_key(&mut self, key: char) -> Result<ClassifyOutcome> {
        let label = self
            .labels
            .as_ref()
            .and_then(|labels| labels.label_for_key(key))
            .map(|route| route.name.clone())
            .ok_or_else(|| ClassifyError::UnknownLabel(key.to_string()))?;
        self.classify(&label)
    }

    /// `classify`, ignoring requests that arrive inside the cooldown window.
    /// Only a move or a skip starts the window.
    pub fn classify_at(&mut self, label: &str, now: Instant) -> Result<ClassifyOutcome> {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.cooldown {
                return Ok(ClassifyOutcome::Debounced);
            }
        }
        let outcome = self.classify(label)?;
        if matches!(outcome, ClassifyOutcome::Moved(_) | ClassifyOutcome::Skipped { .. }) {
            self.last_accepted = Some(now);
        }
        Ok(outcome)
    }

    /// Reverse the most recent move and put the photo back at the queue front.
    ///
    /// Returns `Ok(None)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<UndoEntry>> {
        if matches!(self.state, SessionState::Idle | SessionState::AllComplete) {
            return Ok(None);
        }

        let entry = match self.undo.pop() {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if let Err(e) = move_back(&entry.destination, &entry.original) {
            log::warn!("Undo failed for {}: {}", entry.original.display(), e);
            self.undo.push(entry);
            return Err(e);
        }

        let label = self
            .records
            .iter()
            .rev()
            .find(|r| r.kind == RecordKind::Moved && r.destination == entry.destination)
            .map(|r| r.label.clone())
            .unwrap_or_default();
        self.record(&entry.original, &label, &entry.destination, RecordKind::Undone);

        self.queue.push_front(entry.original.clone());
        self.state = SessionState::Classifying;
        Ok(Some(entry))
    }

    /// Sibling folders still on offer once the current one is exhausted
    pub fn remaining_folders(&self) -> Vec<PathBuf> {
        self.chain.remaining()
    }

    /// Continue with a sibling folder: reload the queue, re-root the labels
    /// there and forget the undo history.
    pub fn advance_to_next_folder<P: AsRef<Path>>(&mut self, folder: P) -> Result<usize> {
        if self.state != SessionState::FolderExhausted {
            return Err(self.invalid("advance to the next folder"));
        }

        let folder = folder.as_ref();
        let remaining = self.chain.remaining();
        let chosen = remaining
            .iter()
            .find(|candidate| candidate.as_path() == folder)
            .cloned()
            .ok_or_else(|| ClassifyError::NotASibling(folder.to_path_buf()))?;

        let photos = list_photos_in_dir(&chosen)?;
        if let Some(labels) = &mut self.labels {
            labels.remap(&chosen);
        }
        log::info!("Advancing to {} ({} photos)", chosen.display(), photos.len());
        self.load_folder(chosen, photos);

        Ok(self.queue.len())
    }

    /// Decline further folders and end the session
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            SessionState::FolderExhausted | SessionState::AllComplete => {
                self.state = SessionState::AllComplete;
                Ok(())
            }
            _ => Err(self.invalid("finish")),
        }
    }

    fn record(&mut self, photo: &Path, label: &str, destination: &Path, kind: RecordKind) {
        self.records.push(SessionRecord {
            photo: photo.to_path_buf(),
            label: label.to_string(),
            destination: destination.to_path_buf(),
            kind,
        });
    }

    fn invalid(&self, action: &'static str) -> ClassifyError {
        ClassifyError::InvalidTransition {
            state: self.state.to_string(),
            action,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_photo(&self) -> Option<&PathBuf> {
        self.queue.front()
    }

    pub fn queue(&self) -> &PhotoQueue {
        &self.queue
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn source_folder(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn labels(&self) -> Option<&LabelMap> {
        self.labels.as_ref()
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Photos dropped from the queue because of a destination name collision
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn folder_with(dir: &Path, name: &str, photos: &[&str]) -> PathBuf {
        let folder = dir.join(name);
        fs::create_dir_all(&folder).unwrap();
        for photo in photos {
            fs::write(folder.join(photo), photo.as_bytes()).unwrap();
        }
        folder
    }

    #[test]
    fn classify_before_open_is_a_no_op() {
        let mut session = ClassificationSession::new(Config::default());
        assert_eq!(session.classify("Particle").unwrap(), ClassifyOutcome::QueueEmpty);
        assert_eq!(session.undo().unwrap(), None);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn unknown_label_keeps_the_photo_queued() {
        let root = tempfile::tempdir().unwrap();
        let folder = folder_with(root.path(), "lot", &["a.jpg"]);
        let mut session = ClassificationSession::new(Config::default());
        session.open_folder(&folder).unwrap();

        assert!(matches!(
            session.classify("nonsense"),
            Err(ClassifyError::UnknownLabel(_))
        ));
        assert_eq!(session.queue().len(), 1);
        assert_eq!(session.state(), SessionState::FolderLoaded);
    }

    #[test]
    fn cooldown_debounces_rapid_requests() {
        let root = tempfile::tempdir().unwrap();
        let folder = folder_with(root.path(), "lot", &["a.jpg", "b.jpg"]);
        let mut session = ClassificationSession::new(Config::default());
        session.open_folder(&folder).unwrap();

        let t0 = Instant::now();
        assert!(matches!(session.classify_at("Other", t0).unwrap(), ClassifyOutcome::Moved(_)));
        assert_eq!(
            session.classify_at("Other", t0 + Duration::from_millis(50)).unwrap(),
            ClassifyOutcome::Debounced
        );
        assert!(matches!(
            session.classify_at("Other", t0 + Duration::from_millis(150)).unwrap(),
            ClassifyOutcome::Moved(_)
        ));
    }

    #[test]
    fn rejected_request_does_not_start_cooldown() {
        let root = tempfile::tempdir().unwrap();
        let folder = folder_with(root.path(), "lot", &["a.jpg"]);
        let mut session = ClassificationSession::new(Config::default());
        session.open_folder(&folder).unwrap();

        let t0 = Instant::now();
        assert!(session.classify_at("nonsense", t0).is_err());
        assert!(matches!(
            session.classify_at("Other", t0 + Duration::from_millis(10)).unwrap(),
            ClassifyOutcome::Moved(_)
        ));
    }

    #[test]
    fn classify_by_key() {
        let root = tempfile::tempdir().unwrap();
        let folder = folder_with(root.path(), "lot", &["a.jpg", "b.jpg"]);
        let mut session = ClassificationSession::new(Config::default());
        session.open_folder(&folder).unwrap();

        let outcome = session.classify_key('y').unwrap();
        match outcome {
            ClassifyOutcome::Moved(entry) => {
                assert_eq!(entry.destination.parent().unwrap(), folder.join("000_Over_kill(15)"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(session.classify_key('#').is_err());
    }

    #[test]
    fn finish_only_after_exhaustion() {
        let root = tempfile::tempdir().unwrap();
        let folder = folder_with(root.path(), "lot", &["a.jpg"]);
        let mut session = ClassificationSession::new(Config::default());
        session.open_folder(&folder).unwrap();
        assert!(matches!(
            session.finish(),
            Err(ClassifyError::InvalidTransition { .. })
        ));
    }
}
