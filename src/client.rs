use crate::editor::{EditorAction, LineEditor};
use crate::errors::{ClientError, ClientResult};
use crate::session::Session;

use crossterm::event::{self, Event, KeyEventKind};
use icb_protocol::MessageReassembler;
use jiff::Timestamp;
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// How long one loop iteration waits for a key before looking after the
/// socket and the queues again.
const POLL_TICK: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 4096;

/// The event loop context: the session, the socket, the editor, and the
/// inbound reassembly state, all owned by one single-threaded loop.
///
/// Each iteration, in order: honor the status-request flag, flush pending
/// socket output, run the keep-alive check, take one key for the editor,
/// read and dispatch every complete inbound message, bridge the editor
/// around the screen drain, and give the history files a chance to write.
pub struct ChatClient {
    session: Session,
    socket: TcpStream,
    editor: LineEditor,
    reassembler: MessageReassembler,
}

impl ChatClient {
    pub fn new(session: Session, socket: TcpStream) -> Self {
        Self {
            session,
            socket,
            editor: LineEditor::new(),
            reassembler: MessageReassembler::new(),
        }
    }

    pub fn run(&mut self) -> ClientResult<()> {
        let mut stdout = io::stdout();

        while !self.session.want_exit {
            if self.session.want_info {
                self.session.push_status();
            }

            self.session
                .net
                .drain(&mut self.socket)
                .map_err(|e| ClientError::stream("network", e))?;

            let now = Timestamp::now().as_second();
            self.session.keepalive(now);

            if event::poll(POLL_TICK).map_err(|e| ClientError::stream("stdin", e))? {
                let ev = event::read().map_err(|e| ClientError::stream("stdin", e))?;
                if let Event::Key(key) = ev {
                    if key.kind != KeyEventKind::Release {
                        match self.editor.handle_key(key) {
                            EditorAction::Submit(line) => {
                                self.session.handle_input_line(&line)
                            }
                            EditorAction::Exit => self.session.want_exit = true,
                            EditorAction::Info => self.session.want_info = true,
                            EditorAction::None => {}
                        }
                        self.editor
                            .redraw(&mut stdout)
                            .map_err(|e| ClientError::stream("stdout", e))?;
                    }
                }
            }

            let heard_from_server = self.read_network()?;
            if !heard_from_server {
                self.session.check_timeout(now);
            }

            if !self.session.screen.is_empty() {
                self.editor.prepare_screen(&mut stdout)?;
                let drained = self.session.screen.drain(&mut stdout);
                let _ = stdout.flush();
                self.editor.restore_screen(&mut stdout)?;
                drained.map_err(|e| ClientError::stream("stdout", e))?;
            }

            self.session.history.drain_all();
        }
        Ok(())
    }

    /// Read everything the socket has, then dispatch every complete
    /// message. Returns whether any bytes arrived.
    fn read_network(&mut self) -> ClientResult<bool> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut any = false;

        loop {
            match self.socket.read(&mut chunk) {
                Ok(0) => {
                    let notice = format!(
                        "Server {} closed connection, exiting...\n",
                        self.session.config.hostname
                    );
                    self.session.push_screen(&notice);
                    self.session.want_exit = true;
                    // EOF still counts as hearing from the server; the
                    // timeout exit must not fire on the same tick.
                    any = true;
                    break;
                }
                Ok(n) => {
                    any = true;
                    self.reassembler.feed(&chunk[..n])?;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ClientError::stream("network", e)),
            }
        }

        if any {
            self.session.note_inbound(Timestamp::now().as_second());
            while !self.session.want_exit {
                match self.reassembler.next_message()? {
                    Some(msg) => self.session.handle_message(msg)?,
                    None => break,
                }
            }
        }
        Ok(any)
    }
}
