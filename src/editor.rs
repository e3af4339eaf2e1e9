use crate::errors::{ClientError, ClientResult};

use crossterm::{
    cursor,
    event::{KeyCode, KeyEvent, KeyModifiers},
    style::Print,
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use std::io::Write;

/// What a key press amounted to.
#[derive(Debug, PartialEq, Eq)]
pub enum EditorAction {
    /// Nothing observable outside the editor.
    None,
    /// The user finished a line.
    Submit(String),
    /// Ctrl-C, or Ctrl-D on an empty line.
    Exit,
    /// Ctrl-T, the status summary request.
    Info,
}

struct Snapshot {
    buffer: String,
    point: usize,
    mark: usize,
}

/// A small single-line editor.
///
/// Keys go in one at a time, completed lines come out. Around every
/// asynchronous screen write the event loop calls [`prepare_screen`] /
/// [`restore_screen`], which stash the visible line away and bring it back
/// so chat output never interleaves with what the user is typing. At most
/// one snapshot can be outstanding.
///
/// [`prepare_screen`]: LineEditor::prepare_screen
/// [`restore_screen`]: LineEditor::restore_screen
#[derive(Default)]
pub struct LineEditor {
    buffer: String,
    /// Cursor position, in characters.
    point: usize,
    mark: usize,
    saved: Option<Snapshot>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return EditorAction::Exit,
            KeyCode::Char('d') if ctrl => {
                if self.buffer.is_empty() {
                    return EditorAction::Exit;
                }
                self.delete_at_point();
            }
            KeyCode::Char('t') if ctrl => return EditorAction::Info,
            KeyCode::Char('a') if ctrl => self.point = 0,
            KeyCode::Char('e') if ctrl => self.point = self.char_len(),
            KeyCode::Char('u') if ctrl => {
                let at = self.byte_at(self.point);
                self.buffer.drain(..at);
                self.point = 0;
                self.mark = 0;
            }
            KeyCode::Char('k') if ctrl => {
                let at = self.byte_at(self.point);
                self.buffer.truncate(at);
            }
            KeyCode::Char('w') if ctrl => self.kill_word_back(),
            KeyCode::Char(c) if !ctrl => {
                let at = self.byte_at(self.point);
                self.buffer.insert(at, c);
                self.point += 1;
            }
            KeyCode::Backspace => {
                if self.point > 0 {
                    self.point -= 1;
                    self.delete_at_point();
                }
            }
            KeyCode::Delete => self.delete_at_point(),
            KeyCode::Left => self.point = self.point.saturating_sub(1),
            KeyCode::Right => self.point = (self.point + 1).min(self.char_len()),
            KeyCode::Home => self.point = 0,
            KeyCode::End => self.point = self.char_len(),
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.buffer);
                self.point = 0;
                self.mark = 0;
                return EditorAction::Submit(line);
            }
            _ => {}
        }
        EditorAction::None
    }

    /// Redraw the visible line and place the cursor.
    pub fn redraw(&self, out: &mut impl Write) -> std::io::Result<()> {
        out.queue(cursor::MoveToColumn(0))?;
        out.queue(Clear(ClearType::CurrentLine))?;
        out.queue(Print(&self.buffer))?;
        out.queue(cursor::MoveToColumn(self.point as u16))?;
        out.flush()
    }

    /// Stash the visible line and blank it ahead of chat output.
    pub fn prepare_screen(&mut self, out: &mut impl Write) -> ClientResult<()> {
        if self.saved.is_some() {
            return Err(ClientError::Internal("prepare_screen called twice"));
        }
        self.saved = Some(Snapshot {
            buffer: std::mem::take(&mut self.buffer),
            point: self.point,
            mark: self.mark,
        });
        self.point = 0;
        self.mark = 0;
        self.redraw(out).map_err(ClientError::Terminal)
    }

    /// Bring the stashed line back after chat output went out.
    pub fn restore_screen(&mut self, out: &mut impl Write) -> ClientResult<()> {
        let saved = self
            .saved
            .take()
            .ok_or(ClientError::Internal("restore_screen without snapshot"))?;
        self.buffer = saved.buffer;
        self.point = saved.point;
        self.mark = saved.mark;
        self.redraw(out).map_err(ClientError::Terminal)
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Byte offset of the given character position.
    fn byte_at(&self, point: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(point)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }

    fn delete_at_point(&mut self) {
        let at = self.byte_at(self.point);
        if at < self.buffer.len() {
            self.buffer.remove(at);
        }
    }

    fn kill_word_back(&mut self) {
        let chars: Vec<char> = self.buffer.chars().collect();
        let mut start = self.point;
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        let from = self.byte_at(start);
        let to = self.byte_at(self.point);
        self.buffer.drain(from..to);
        self.point = start;
    }
}
