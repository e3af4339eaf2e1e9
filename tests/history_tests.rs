use oicb::history::HistoryWriter;

use jiff::civil::date;
use jiff::tz::TimeZone;
use jiff::Zoned;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn noon() -> Zoned {
    date(2025, 6, 1)
        .at(12, 0, 0, 0)
        .to_zoned(TimeZone::UTC)
        .unwrap()
}

fn read_log(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

#[test]
fn test_room_line_format_names_original_author() {
    let tmp = TempDir::new().unwrap();
    let mut history = HistoryWriter::new(tmp.path().to_path_buf(), "hugs", true);

    history.append_at(b'b', b"alice", b"hello room", &noon());
    history.drain_at(100);

    let content = read_log(tmp.path(), "room-hugs.log");
    assert_eq!(content, "2025-06-01 12:00:00 alice: hello room\n");
}

#[test]
fn test_private_messages_get_their_own_file() {
    let tmp = TempDir::new().unwrap();
    let mut history = HistoryWriter::new(tmp.path().to_path_buf(), "hugs", true);

    history.append_at(b'c', b"bob", b"psst", &noon());
    history.append_at(b'c', b"me", b"bob hi", &noon());
    history.append_at(b'd', b"server", b"Status change", &noon());
    history.drain_all();

    assert!(read_log(tmp.path(), "private-bob.log").contains("bob: psst"));
    assert!(read_log(tmp.path(), "private-me.log").contains("me: bob hi"));
    assert!(read_log(tmp.path(), "room-hugs.log").contains("server: Status change"));
}

#[test]
fn test_lines_appear_in_enqueue_order() {
    let tmp = TempDir::new().unwrap();
    let mut history = HistoryWriter::new(tmp.path().to_path_buf(), "hugs", true);

    for i in 0..20 {
        let text = format!("message number {}", i);
        history.append_at(b'b', b"alice", text.as_bytes(), &noon());
    }
    history.drain_all();

    let content = read_log(tmp.path(), "room-hugs.log");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 20);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.ends_with(&format!("message number {}", i)));
    }
}

#[test]
fn test_appends_survive_across_drains() {
    let tmp = TempDir::new().unwrap();
    let mut history = HistoryWriter::new(tmp.path().to_path_buf(), "hugs", true);

    history.append_at(b'b', b"alice", b"one", &noon());
    history.drain_at(50);
    history.append_at(b'b', b"alice", b"two", &noon());
    history.drain_at(50);

    let content = read_log(tmp.path(), "room-hugs.log");
    assert!(content.contains("one\n"));
    assert!(content.contains("two\n"));
}

#[test]
fn test_disabled_history_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("never");
    let mut history = HistoryWriter::new(root.clone(), "hugs", false);

    history.append_at(b'b', b"alice", b"hello", &noon());
    history.drain_all();

    assert!(!root.exists());
    assert_eq!(history.open_entries(), 0);
}

#[test]
fn test_directories_are_created_recursively() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("deep").join("server.example.net");
    let mut history = HistoryWriter::new(root.clone(), "hugs", true);

    history.append_at(b'b', b"alice", b"hello", &noon());
    history.drain_all();

    assert!(root.join("room-hugs.log").is_file());
}

#[test]
fn test_unopenable_file_latches_and_drops() {
    let tmp = TempDir::new().unwrap();
    // A directory squatting on the log file name makes the open fail.
    fs::create_dir(tmp.path().join("room-hugs.log")).unwrap();
    let mut history = HistoryWriter::new(tmp.path().to_path_buf(), "hugs", true);

    history.append_at(b'b', b"alice", b"doomed", &noon());
    history.drain_all();

    assert_eq!(history.open_entries(), 0);
    assert_eq!(history.pending_tasks(), 0);

    // Later appends for the same path are silently ignored, not retried.
    history.append_at(b'b', b"alice", b"still doomed", &noon());
    assert_eq!(history.pending_tasks(), 0);
    history.drain_all();
    assert_eq!(history.pending_tasks(), 0);
}

#[test]
fn test_idle_entries_are_pruned() {
    let tmp = TempDir::new().unwrap();
    let mut history = HistoryWriter::new(tmp.path().to_path_buf(), "hugs", true);

    history.append_at(b'b', b"alice", b"hello", &noon());
    history.drain_at(100);
    assert_eq!(history.open_entries(), 1);

    // Still within the same wall-clock second: kept.
    history.drain_at(100);
    assert_eq!(history.open_entries(), 1);

    // A second later the drained entry goes away; the file stays on disk.
    history.drain_at(101);
    assert_eq!(history.open_entries(), 0);
    assert!(tmp.path().join("room-hugs.log").is_file());

    // A fresh append recreates the entry.
    history.append_at(b'b', b"alice", b"again", &noon());
    history.drain_at(102);
    assert!(read_log(tmp.path(), "room-hugs.log").contains("again"));
}
