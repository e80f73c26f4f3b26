//! Integration tests for the classification workflow.
//!
//! Each test builds a throwaway lot directory, drives a
//! [`ClassificationSession`] through it and checks the filesystem afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use defect_classify_lib::{
    ClassificationSession, ClassifyError, ClassifyOutcome, Config, RecordKind, SessionState,
};
use tempfile::TempDir;

fn make_folder(root: &Path, name: &str, photos: &[&str]) -> PathBuf {
    let folder = root.join(name);
    fs::create_dir_all(&folder).unwrap();
    for photo in photos {
        fs::write(folder.join(photo), photo.as_bytes()).unwrap();
    }
    folder
}

fn session() -> ClassificationSession {
    let mut config = Config::default();
    config.use_parallel = false;
    ClassificationSession::new(config)
}

// ---------------------------------------------------------------------------
// Test: draining a queue
// ---------------------------------------------------------------------------

/// Classifying every photo empties the queue, moves every file and keeps
/// only the newest 20 undo entries.
#[test]
fn classifying_every_photo_drains_queue_and_caps_undo() {
    let root = TempDir::new().unwrap();
    let names: Vec<String> = (0..25).map(|i| format!("photo_{:02}.jpg", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let folder = make_folder(root.path(), "lot", &name_refs);

    let mut session = session();
    assert_eq!(session.open_folder(&folder).unwrap(), 25);
    assert_eq!(session.state(), SessionState::FolderLoaded);

    let mut moved = 0;
    while session.current_photo().is_some() {
        match session.classify("Other").unwrap() {
            ClassifyOutcome::Moved(_) => moved += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(moved, 25);
    assert!(session.queue().is_empty());
    assert_eq!(session.undo_depth(), 20);
    assert_eq!(session.state(), SessionState::AllComplete);

    let other = folder.join("186_Other(BA)");
    assert_eq!(fs::read_dir(&other).unwrap().count(), 25);
    for name in &names {
        assert!(!folder.join(name).exists());
    }
}

// ---------------------------------------------------------------------------
// Test: undo
// ---------------------------------------------------------------------------

/// Undo right after a classify puts the file back and restores the queue
/// to exactly its previous order.
#[test]
fn undo_is_the_inverse_of_classify() {
    let root = TempDir::new().unwrap();
    let folder = make_folder(root.path(), "lot", &["a.jpg", "b.jpg", "c.jpg"]);

    let mut session = session();
    session.open_folder(&folder).unwrap();
    let before: Vec<PathBuf> = session.queue().iter().cloned().collect();

    let entry = match session.classify("Probe mark shift").unwrap() {
        ClassifyOutcome::Moved(entry) => entry,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(!entry.original.exists());
    assert!(entry.destination.exists());
    assert_eq!(
        entry.destination.parent().unwrap(),
        folder.join("200_Probe_Mark_Shift(10)")
    );

    let restored = session.undo().unwrap().expect("an entry to undo");
    assert_eq!(restored, entry);
    assert!(entry.original.exists());
    assert!(!entry.destination.exists());

    let after: Vec<PathBuf> = session.queue().iter().cloned().collect();
    assert_eq!(after, before);
    assert_eq!(session.undo_depth(), 0);
    assert_eq!(session.state(), SessionState::Classifying);

    let kinds: Vec<RecordKind> = session.records().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![RecordKind::Moved, RecordKind::Undone]);
    assert_eq!(session.records()[1].label, "Probe mark shift");
}

/// Undo with an empty history is a no-op.
#[test]
fn undo_with_nothing_to_undo() {
    let root = TempDir::new().unwrap();
    let folder = make_folder(root.path(), "lot", &["a.jpg"]);

    let mut session = session();
    session.open_folder(&folder).unwrap();
    assert_eq!(session.undo().unwrap(), None);
    assert_eq!(session.queue().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: name collisions
// ---------------------------------------------------------------------------

/// A photo whose name already exists in the destination is consumed from the
/// queue but neither file is touched, and no undo entry is created.
#[test]
fn collision_skips_without_overwriting() {
    let root = TempDir::new().unwrap();
    let folder = make_folder(root.path(), "lot", &["defect_01.jpg"]);
    let destination = folder.join("186_Other(BA)");
    fs::create_dir_all(&destination).unwrap();
    fs::write(destination.join("defect_01.jpg"), b"already classified").unwrap();

    let mut session = session();
    session.open_folder(&folder).unwrap();

    let outcome = session.classify("Other").unwrap();
    assert_eq!(
        outcome,
        ClassifyOutcome::Skipped {
            photo: folder.join("defect_01.jpg"),
            existing: destination.join("defect_01.jpg"),
        }
    );

    assert!(session.queue().is_empty());
    assert_eq!(fs::read(folder.join("defect_01.jpg")).unwrap(), b"defect_01.jpg");
    assert_eq!(
        fs::read(destination.join("defect_01.jpg")).unwrap(),
        b"already classified"
    );
    assert_eq!(fs::read_dir(&destination).unwrap().count(), 1);
    assert_eq!(session.undo_depth(), 0);
    assert_eq!(session.skipped(), &[folder.join("defect_01.jpg")]);
}

// ---------------------------------------------------------------------------
// Test: folder chaining
// ---------------------------------------------------------------------------

/// With no sibling folders the session ends as soon as the queue drains.
#[test]
fn exhaustion_without_siblings_is_all_complete() {
    let root = TempDir::new().unwrap();
    let folder = make_folder(root.path(), "lot", &["a.jpg"]);
    // Has a code but no photos, so it is not offered
    make_folder(root.path(), "lot_05", &[]);

    let mut session = session();
    session.open_folder(&folder).unwrap();
    assert!(session.remaining_folders().is_empty());

    session.classify("Particle").unwrap();
    assert_eq!(session.state(), SessionState::AllComplete);
    assert_eq!(session.classify("Particle").unwrap(), ClassifyOutcome::QueueEmpty);
    assert!(session.open_folder(&folder).is_err());
}

/// Advancing to a sibling re-roots the labels there and starts with an
/// empty undo history.
#[test]
fn advancing_remaps_labels_and_clears_undo() {
    let root = TempDir::new().unwrap();
    let first = make_folder(root.path(), "wafer_03", &["a.jpg"]);
    let second = make_folder(root.path(), "wafer_04", &["b.jpg", "c.jpg"]);
    make_folder(root.path(), "wafer_40", &["ignored.jpg"]);

    let mut session = session();
    session.open_folder(&first).unwrap();
    assert_eq!(session.remaining_folders(), vec![second.clone()]);

    assert!(matches!(
        session.advance_to_next_folder(&second),
        Err(ClassifyError::InvalidTransition { .. })
    ));

    session.classify("Particle").unwrap();
    assert_eq!(session.state(), SessionState::FolderExhausted);
    assert_eq!(session.undo_depth(), 1);

    assert!(matches!(
        session.advance_to_next_folder(root.path().join("wafer_40")),
        Err(ClassifyError::NotASibling(_))
    ));

    assert_eq!(session.advance_to_next_folder(&second).unwrap(), 2);
    assert_eq!(session.state(), SessionState::FolderLoaded);
    assert_eq!(session.undo_depth(), 0);
    assert_eq!(session.undo().unwrap(), None);
    assert_eq!(session.source_folder(), Some(second.as_path()));

    let route = session.labels().unwrap().get("Particle").unwrap();
    assert_eq!(route.destination, second.join("000_Particle(16)"));

    session.classify("Particle").unwrap();
    session.classify("Particle").unwrap();
    assert_eq!(fs::read_dir(second.join("000_Particle(16)")).unwrap().count(), 2);
    assert_eq!(session.state(), SessionState::AllComplete);
}

/// Declining the offered siblings ends the session.
#[test]
fn finishing_declines_remaining_siblings() {
    let root = TempDir::new().unwrap();
    let first = make_folder(root.path(), "wafer_03", &["a.jpg"]);
    make_folder(root.path(), "wafer_04", &["b.jpg"]);

    let mut session = session();
    session.open_folder(&first).unwrap();
    session.classify("Other").unwrap();
    assert_eq!(session.state(), SessionState::FolderExhausted);

    session.finish().unwrap();
    assert_eq!(session.state(), SessionState::AllComplete);
}

// ---------------------------------------------------------------------------
// Test: alternate save root
// ---------------------------------------------------------------------------

/// The save root only applies to the first folder of the session.
#[test]
fn save_root_applies_to_first_folder_only() {
    let root = TempDir::new().unwrap();
    let first = make_folder(root.path(), "wafer_03", &["a.jpg"]);
    let second = make_folder(root.path(), "wafer_04", &["b.jpg"]);
    let elsewhere = root.path().join("sorted");

    let mut session = session();
    session.set_save_root(Some(elsewhere.clone()));
    session.open_folder(&first).unwrap();

    session.classify("Bump scratch").unwrap();
    assert!(elsewhere.join("501_Bump scratch(24)").join("a.jpg").exists());
    assert!(!first.join("501_Bump scratch(24)").exists());

    session.advance_to_next_folder(&second).unwrap();
    session.classify("Bump scratch").unwrap();
    assert!(second.join("501_Bump scratch(24)").join("b.jpg").exists());
}

// ---------------------------------------------------------------------------
// Test: failed moves
// ---------------------------------------------------------------------------

/// A photo that cannot be moved stays at the front of the queue, with no
/// undo entry, no record and no state change.
#[test]
fn failed_move_requeues_photo_at_front() {
    let root = TempDir::new().unwrap();
    let folder = make_folder(root.path(), "lot", &["a.jpg", "b.jpg"]);

    let mut session = session();
    session.open_folder(&folder).unwrap();
    let head = session.current_photo().cloned().unwrap();
    let state = session.state();

    // Gone from disk after the queue was built
    fs::remove_file(&head).unwrap();

    assert!(matches!(
        session.classify("Other"),
        Err(ClassifyError::MoveFailed { .. })
    ));
    assert_eq!(session.current_photo(), Some(&head));
    assert_eq!(session.queue().len(), 2);
    assert_eq!(session.undo_depth(), 0);
    assert!(session.records().is_empty());
    assert_eq!(session.state(), state);
}

/// When the original path is occupied again, undo fails and the entry stays
/// on the stack for a later retry.
#[test]
fn failed_undo_keeps_the_entry() {
    let root = TempDir::new().unwrap();
    let folder = make_folder(root.path(), "lot", &["a.jpg", "b.jpg"]);

    let mut session = session();
    session.open_folder(&folder).unwrap();
    let entry = match session.classify("Other").unwrap() {
        ClassifyOutcome::Moved(entry) => entry,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(session.undo_depth(), 1);

    fs::write(&entry.original, b"someone else").unwrap();

    assert!(matches!(session.undo(), Err(ClassifyError::MoveFailed { .. })));
    assert_eq!(session.undo_depth(), 1);
    assert_eq!(session.queue().len(), 1);
    assert!(entry.destination.exists());
    assert_eq!(fs::read(&entry.original).unwrap(), b"someone else");

    fs::remove_file(&entry.original).unwrap();
    assert_eq!(session.undo().unwrap(), Some(entry));
    assert_eq!(session.queue().len(), 2);
}
