use std::collections::VecDeque;
use std::io::{self, ErrorKind, Write};

/// One pending write: a byte buffer, how much of it already went out, and
/// an optional callback to run once the whole buffer has been written.
pub struct OutputTask {
    data: Vec<u8>,
    done: usize,
    callback: Option<Box<dyn FnOnce()>>,
}

/// FIFO of pending writes for one output stream.
///
/// Only the head task may be partially written; tasks complete strictly in
/// enqueue order and a task's bytes are never interleaved with another's.
#[derive(Default)]
pub struct OutputQueue {
    tasks: VecDeque<OutputTask>,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.tasks.push_back(OutputTask {
            data,
            done: 0,
            callback: None,
        });
    }

    pub fn push_with_callback(&mut self, data: Vec<u8>, callback: impl FnOnce() + 'static) {
        self.tasks.push_back(OutputTask {
            data,
            done: 0,
            callback: Some(Box::new(callback)),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Drop all pending tasks without running their callbacks.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Write as much queued data as the stream accepts right now.
    ///
    /// A write that would block stops the drain without error; the next
    /// call resumes from the unwritten suffix of the head task. Hard
    /// failures are returned to the caller, which decides whether they are
    /// fatal (stdout, socket) or latch the stream as broken (history
    /// files).
    pub fn drain(&mut self, w: &mut impl Write) -> io::Result<()> {
        while let Some(task) = self.tasks.front_mut() {
            while task.done < task.data.len() {
                match w.write(&task.data[task.done..]) {
                    Ok(0) => return Ok(()),
                    Ok(n) => task.done += n,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            if let Some(task) = self.tasks.pop_front() {
                if let Some(callback) = task.callback {
                    callback();
                }
            }
        }
        Ok(())
    }
}
