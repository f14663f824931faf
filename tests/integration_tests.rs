use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use dirview::core::{
    EventQueue, FileEvent, FileEventKind, FileFilter, FileWatcher, WatchOptions,
};
use tempfile::TempDir;

/// Drains `queue` until `pred` matches an event or the timeout expires.
fn wait_for<F>(queue: &EventQueue, timeout: Duration, mut pred: F) -> Vec<FileEvent>
where
    F: FnMut(&FileEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        seen.extend(queue.drain_all());
        if seen.iter().any(&mut pred) {
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }
    seen
}

fn same_name(event: &FileEvent, name: &str) -> bool {
    event.path().file_name().and_then(|n| n.to_str()) == Some(name)
}

#[test]
fn test_file_creation_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let queue = EventQueue::unbounded();
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), WatchOptions::default())
        .expect("Failed to start watcher");

    fs::write(temp_dir.path().join("a.md"), "# hello").expect("Failed to write test file");

    let events = wait_for(&queue, Duration::from_secs(5), |e| {
        e.kind() == FileEventKind::Created && same_name(e, "a.md")
    });
    assert!(
        events.iter().any(|e| e.kind() == FileEventKind::Created && same_name(e, "a.md")),
        "expected a created event, got {:?}",
        events
    );

    watcher.stop().expect("Failed to stop watcher");
}

#[test]
fn test_modification_and_deletion_are_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file = temp_dir.path().join("data.txt");
    fs::write(&file, "v1").expect("Failed to write test file");

    let queue = EventQueue::unbounded();
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), WatchOptions::default())
        .expect("Failed to start watcher");

    fs::write(&file, "v2 with more content").expect("Failed to modify test file");
    let events = wait_for(&queue, Duration::from_secs(5), |e| {
        e.kind() == FileEventKind::Modified && same_name(e, "data.txt")
    });
    assert!(events.iter().any(|e| e.kind() == FileEventKind::Modified));

    fs::remove_file(&file).expect("Failed to delete test file");
    let events = wait_for(&queue, Duration::from_secs(5), |e| {
        e.kind() == FileEventKind::Deleted && same_name(e, "data.txt")
    });
    assert!(events.iter().any(|e| e.kind() == FileEventKind::Deleted));

    watcher.stop().expect("Failed to stop watcher");
}

#[test]
fn test_ignored_filenames_never_produce_events() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let queue = EventQueue::unbounded();
    let options = WatchOptions {
        filter: FileFilter::new([".DS_Store", "*.swp"]).unwrap(),
        ..WatchOptions::default()
    };
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), options)
        .expect("Failed to start watcher");

    fs::write(temp_dir.path().join(".DS_Store"), "junk").unwrap();
    fs::write(temp_dir.path().join(".draft.swp"), "junk").unwrap();
    // A visible file acts as a marker that the watcher has caught up.
    fs::write(temp_dir.path().join("marker.txt"), "done").unwrap();

    let events = wait_for(&queue, Duration::from_secs(5), |e| same_name(e, "marker.txt"));
    watcher.stop().expect("Failed to stop watcher");
    let mut events = events;
    events.extend(queue.drain_all());

    assert!(events.iter().any(|e| same_name(e, "marker.txt")));
    assert!(
        events
            .iter()
            .all(|e| !same_name(e, ".DS_Store") && !same_name(e, ".draft.swp")),
        "ignored names leaked: {:?}",
        events
    );
}

#[test]
fn test_directories_are_not_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let queue = EventQueue::unbounded();
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), WatchOptions::default())
        .expect("Failed to start watcher");

    fs::create_dir(temp_dir.path().join("subdir")).unwrap();
    fs::write(temp_dir.path().join("marker.txt"), "done").unwrap();

    let events = wait_for(&queue, Duration::from_secs(5), |e| same_name(e, "marker.txt"));
    watcher.stop().expect("Failed to stop watcher");

    assert!(events.iter().all(|e| !same_name(e, "subdir")), "got {:?}", events);
}

#[test]
fn test_no_events_after_stop() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let queue = EventQueue::unbounded();
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), WatchOptions::default())
        .expect("Failed to start watcher");

    for i in 0..20 {
        fs::write(temp_dir.path().join(format!("burst-{i}.txt")), "x").unwrap();
    }
    watcher.stop().expect("Failed to stop watcher");

    // Whatever was produced before stop returned is already in the queue.
    queue.drain_all();

    for i in 0..20 {
        fs::write(temp_dir.path().join(format!("late-{i}.txt")), "x").unwrap();
    }
    thread::sleep(Duration::from_millis(500));

    assert!(queue.drain_all().is_empty());
}

#[test]
fn test_dropping_watcher_stops_it() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let queue = EventQueue::unbounded();
    {
        let _watcher =
            FileWatcher::start(temp_dir.path(), queue.producer(), WatchOptions::default())
                .expect("Failed to start watcher");
    }
    queue.drain_all();

    fs::write(temp_dir.path().join("after-drop.txt"), "x").unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(queue.drain_all().is_empty());
}

#[test]
fn test_recursive_option_reports_nested_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let nested = temp_dir.path().join("nested");
    fs::create_dir(&nested).unwrap();

    let queue = EventQueue::unbounded();
    let options = WatchOptions {
        recursive: true,
        ..WatchOptions::default()
    };
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), options)
        .expect("Failed to start watcher");

    fs::write(nested.join("deep.txt"), "x").unwrap();
    let events = wait_for(&queue, Duration::from_secs(5), |e| same_name(e, "deep.txt"));
    watcher.stop().expect("Failed to stop watcher");

    assert!(events.iter().any(|e| same_name(e, "deep.txt")));
    assert!(events
        .iter()
        .filter(|e| same_name(e, "deep.txt"))
        .all(|e| {
            e.path().starts_with(&nested) || e.path().ends_with(Path::new("nested/deep.txt"))
        }));
}

#[cfg(target_os = "linux")]
#[test]
fn test_rename_is_reported_once_as_moved() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let old = temp_dir.path().join("old.txt");
    let new = temp_dir.path().join("new.txt");
    fs::write(&old, "content").unwrap();

    let queue = EventQueue::unbounded();
    let watcher = FileWatcher::start(temp_dir.path(), queue.producer(), WatchOptions::default())
        .expect("Failed to start watcher");

    fs::rename(&old, &new).unwrap();
    let mut events = wait_for(&queue, Duration::from_secs(5), |e| e.kind() == FileEventKind::Moved);
    // Give any stray halves time to surface before counting.
    thread::sleep(Duration::from_millis(1_000));
    events.extend(queue.drain_all());
    watcher.stop().expect("Failed to stop watcher");
    events.extend(queue.drain_all());

    assert_eq!(events.len(), 1, "expected a single event, got {events:?}");
    assert_eq!(events[0].kind(), FileEventKind::Moved);
    assert!(same_name(&events[0], "old.txt"));
    assert!(events[0].destination().is_some_and(|to| to.ends_with("new.txt")));
}
