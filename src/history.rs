use crate::output::OutputQueue;

use jiff::{Timestamp, Zoned};
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

/// One open (or pending) history log file.
///
/// Entries are created lazily on the first append for a room or peer and
/// pruned again once their queue has drained and they have sat idle for a
/// wall-clock second. A failed open or write latches `permanent_error`:
/// the queue is dropped and later appends for the same path are silently
/// ignored, so one unwritable file cannot stall the chat.
struct HistoryFile {
    path: PathBuf,
    file: Option<File>,
    queue: OutputQueue,
    last_activity: i64,
    permanent_error: bool,
}

/// Append-only transcript writer.
///
/// Lines land under the per-server root as `room-<room>.log` for anything
/// said in the group and `private-<peer>.log` for personal messages. Every
/// line is `YYYY-MM-DD HH:MM:SS <who>: <text>` in local time, where `who`
/// is the original author even when the line lands in the room file.
pub struct HistoryWriter {
    root: PathBuf,
    room: String,
    enabled: bool,
    files: Vec<HistoryFile>,
}

impl HistoryWriter {
    pub fn new(root: PathBuf, room: &str, enabled: bool) -> Self {
        Self {
            root,
            room: room.to_string(),
            enabled,
            files: Vec::new(),
        }
    }

    /// Queue one transcript line. A no-op when history is disabled.
    pub fn append(&mut self, kind: u8, who: &[u8], text: &[u8]) {
        self.append_at(kind, who, text, &Zoned::now());
    }

    pub fn append_at(&mut self, kind: u8, who: &[u8], text: &[u8], time: &Zoned) {
        if !self.enabled {
            return;
        }

        let (prefix, name) = if kind == b'c' {
            ("private-", String::from_utf8_lossy(who).into_owned())
        } else {
            ("room-", self.room.clone())
        };
        let path = self.root.join(format!("{}{}.log", prefix, name));

        let index = match self.files.iter().position(|hf| hf.path == path) {
            Some(index) => index,
            None => {
                if let Some(parent) = path.parent() {
                    if let Err(err) = fs::create_dir_all(parent) {
                        eprintln!("oicb: can't create {}: {}", parent.display(), err);
                        return;
                    }
                }
                self.files.push(HistoryFile {
                    path,
                    file: None,
                    queue: OutputQueue::new(),
                    last_activity: Timestamp::now().as_second(),
                    permanent_error: false,
                });
                self.files.len() - 1
            }
        };

        let hf = &mut self.files[index];
        if hf.permanent_error {
            return;
        }

        let mut line = format!("{} ", time.strftime("%Y-%m-%d %H:%M:%S")).into_bytes();
        line.extend_from_slice(who);
        line.extend_from_slice(b": ");
        line.extend_from_slice(text);
        line.push(b'\n');
        hf.queue.push(line);
    }

    /// Drain every entry's queue and prune the idle ones.
    pub fn drain_all(&mut self) {
        self.drain_at(Timestamp::now().as_second());
    }

    /// One drain pass against the given wall-clock second.
    pub fn drain_at(&mut self, now: i64) {
        self.files.retain_mut(|hf| {
            if hf.permanent_error {
                return true;
            }

            if !hf.queue.is_empty() {
                if hf.file.is_none() {
                    match OpenOptions::new().create(true).append(true).open(&hf.path) {
                        Ok(file) => hf.file = Some(file),
                        Err(_) => {
                            eprintln!("oicb: can't open {}", hf.path.display());
                            hf.queue.clear();
                            hf.permanent_error = true;
                            return true;
                        }
                    }
                }
                if let Some(file) = hf.file.as_mut() {
                    if let Err(err) = hf.queue.drain(file) {
                        eprintln!(
                            "oicb: can't write history to {}: {}",
                            hf.path.display(),
                            err
                        );
                        hf.queue.clear();
                        hf.file = None;
                        hf.permanent_error = true;
                        return true;
                    }
                }
                hf.last_activity = now;
            }

            !(hf.queue.is_empty() && hf.last_activity < now)
        });
    }

    /// Number of live (non-latched) entries, pruned or not yet created
    /// ones excluded.
    pub fn open_entries(&self) -> usize {
        self.files.iter().filter(|hf| !hf.permanent_error).count()
    }

    /// Tasks still waiting across all entries.
    pub fn pending_tasks(&self) -> usize {
        self.files.iter().map(|hf| hf.queue.len()).sum()
    }
}
