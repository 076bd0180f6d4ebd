use std::sync::Arc;
use std::thread;
use std::time::Duration;

use qpack_core::changes::{write_changes, ChangeTracker};

#[test]
fn tracker_keeps_sorted_set_and_last_insertion() {
    let td = tempfile::tempdir().unwrap();
    let project = td.path().join("proj").to_string_lossy().into_owned();
    let sidecar = td.path().join("proj.qgc");

    let tracker = ChangeTracker::new();
    let expected = [("x", "x\n"), ("y", "x\ny\n"), ("x", "x\ny\n")];

    for (path, contents) in expected {
        tracker.insert(path.to_string());
        let (files, last) = tracker.snapshot();
        assert_eq!(last, path);

        write_changes(&project, &files).unwrap();
        assert_eq!(std::fs::read_to_string(&sidecar).unwrap(), contents);
    }
    assert_eq!(tracker.len(), 2);
}

#[test]
fn tracker_seed_sets_last_to_final_entry() {
    let tracker = ChangeTracker::new();
    tracker.insert_all(&["a".to_string(), "b".to_string()]);
    let (files, last) = tracker.snapshot();
    assert_eq!(files, vec!["a", "b"]);
    assert_eq!(last, "b");

    let empty = ChangeTracker::new();
    empty.insert_all(&[]);
    assert!(empty.is_empty());
}

#[test]
fn quiet_timeout_clears_the_set() {
    let tracker = ChangeTracker::new();
    for i in 0..3 {
        tracker.insert(format!("file{i}"));
    }

    let update = tracker.wait_or_clear(Duration::from_millis(50));
    assert!(update.is_none());
    assert!(tracker.is_empty());
}

#[test]
fn insertion_interrupts_the_bounded_wait() {
    let tracker = Arc::new(ChangeTracker::new());
    tracker.insert("seed".to_string());

    // Keep signaling so a wakeup cannot be lost to scheduling.
    let producer = Arc::clone(&tracker);
    let handle = thread::spawn(move || {
        for _ in 0..40 {
            thread::sleep(Duration::from_millis(25));
            producer.insert("late".to_string());
        }
    });

    let update = tracker.wait_or_clear(Duration::from_secs(10));
    handle.join().unwrap();

    let (files, last) = update.expect("wakeup should beat the timeout");
    assert_eq!(files, vec!["late", "seed"]);
    assert_eq!(last, "late");
}

#[test]
fn unbounded_wait_returns_once_the_size_changes() {
    let tracker = Arc::new(ChangeTracker::new());

    let producer = Arc::clone(&tracker);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        producer.insert("fresh".to_string());
    });

    let (files, last) = tracker.wait_changed(0);
    handle.join().unwrap();
    assert_eq!(files, vec!["fresh"]);
    assert_eq!(last, "fresh");
}
