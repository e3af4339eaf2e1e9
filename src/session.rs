use crate::config::ClientConfig;
use crate::errors::{ClientError, ClientResult};
use crate::format::chat_line;
use crate::history::HistoryWriter;
use crate::output::OutputQueue;
use crate::replies;

use icb_protocol::{encode_message, Message, PacketType, FIELD_SEP, PROTOCOL_VERSION};
use jiff::Zoned;

/// Keep-alives sent without an answer before the connection is declared
/// dead.
const MAX_PINGS: i64 = 3;

/// Where the connection stands in the protocol exchange.
///
/// Each phase admits a fixed set of inbound message types; anything else
/// is a protocol violation and tears the client down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Connected,
    LoginSent,
    Chat,
    CommandSent,
}

/// Optional capabilities the server has (or turned out not to have).
#[derive(Debug, Clone, Copy)]
pub struct ServerFeatures {
    /// Server answers `l` pings. Assumed until it complains.
    pub ping: bool,
    /// Server accepts the extended multi-packet scheme.
    pub extended_packets: bool,
}

impl Default for ServerFeatures {
    fn default() -> Self {
        Self {
            ping: true,
            extended_packets: false,
        }
    }
}

/// All connection state plus the queues feeding the screen, the socket,
/// and the history files.
///
/// The session owns every mutable piece the event loop works on, so the
/// dispatch logic is testable without a terminal or a socket: inbound
/// messages go in through [`handle_message`], completed input lines
/// through [`handle_input_line`], and everything observable comes out of
/// the queues.
///
/// [`handle_message`]: Session::handle_message
/// [`handle_input_line`]: Session::handle_input_line
pub struct Session {
    pub config: ClientConfig,
    pub phase: Phase,
    pub features: ServerFeatures,
    pub screen: OutputQueue,
    pub net: OutputQueue,
    pub history: HistoryWriter,
    pub want_exit: bool,
    pub want_info: bool,
    pings_sent: i64,
    last_net_input: i64,
    /// Whether the last `co` row already ended in a newline. Shared across
    /// commands, which is sound because the phase machine allows only one
    /// command in flight at a time.
    last_cmd_has_nl: bool,
}

impl Session {
    pub fn new(config: ClientConfig, history: HistoryWriter) -> Self {
        Self {
            config,
            phase: Phase::Connecting,
            features: ServerFeatures::default(),
            screen: OutputQueue::new(),
            net: OutputQueue::new(),
            history,
            want_exit: false,
            want_info: false,
            pings_sent: 0,
            last_net_input: 0,
            last_cmd_has_nl: false,
        }
    }

    /// The dial succeeded; the server will greet us with a protocol
    /// message next.
    pub fn mark_connected(&mut self, now: i64) {
        self.phase = Phase::Connected;
        self.last_net_input = now;
        let banner = format!("Connected to {}\n", self.config.hostname);
        self.push_screen(&banner);
    }

    /// Queue text for the terminal. The terminal runs raw, so a bare LF
    /// would not return the carriage; translate on the way in.
    pub fn push_screen(&mut self, text: &str) {
        self.push_screen_bytes(text.as_bytes());
    }

    pub fn push_screen_bytes(&mut self, bytes: &[u8]) {
        let mut out = Vec::with_capacity(bytes.len() + 8);
        for &b in bytes {
            if b == b'\n' {
                out.push(b'\r');
            }
            out.push(b);
        }
        self.screen.push(out);
    }

    /// Fragment one logical message and queue the packets for the server.
    pub fn send_message(&mut self, msg_type: u8, payload: &[u8]) {
        if self.config.debug >= 2 {
            eprintln!(
                "oicb: queueing message of type '{}' with size {}: {}",
                msg_type as char,
                payload.len(),
                String::from_utf8_lossy(payload)
            );
        }
        let packets = encode_message(
            msg_type,
            payload,
            &self.config.nick,
            self.features.extended_packets,
        );
        for packet in packets {
            self.net.push(packet);
        }
    }

    /// Note that the server sent us something.
    pub fn note_inbound(&mut self, now: i64) {
        self.last_net_input = now;
        self.pings_sent = 0;
    }

    /// Send a keep-alive when the server has been quiet for too long.
    ///
    /// Servers that support ping get an `l` per silent period; others get
    /// a no-op, which provokes no reply, so the inbound clock is refreshed
    /// right away.
    pub fn keepalive(&mut self, now: i64) {
        let timeout = self.config.net_timeout as i64;
        if timeout == 0 {
            return;
        }
        if self.last_net_input + timeout * (self.pings_sent + 1) < now {
            if self.features.ping {
                self.send_message(b'l', b"");
                self.pings_sent += 1;
            } else {
                self.send_message(b'n', b"");
                self.last_net_input = now;
            }
        }
    }

    /// Declare the connection dead after too many unanswered probes.
    pub fn check_timeout(&mut self, now: i64) {
        let timeout = self.config.net_timeout as i64;
        if timeout == 0 {
            return;
        }
        if self.last_net_input + timeout * MAX_PINGS < now {
            self.push_screen("Server timed out, exiting\n");
            self.want_exit = true;
        }
    }

    /// One-line status summary, printed on Ctrl-T.
    pub fn push_status(&mut self) {
        let mut line = format!(
            "sitting in room {} at {}",
            self.config.room, self.config.hostname
        );
        if self.config.port_explicit {
            line.push_str(&format!(":{}", self.config.port));
        }
        line.push_str(&format!(" as {}\n", self.config.nick));
        self.push_screen(&line);
        self.want_info = false;
    }

    /// Handle a completed line from the editor.
    ///
    /// Lines starting with `/` become server commands; everything else is
    /// said in the open. Both get a local transcript line for author `me`.
    pub fn handle_input_line(&mut self, line: &str) {
        if line.trim_start().is_empty() {
            return;
        }
        if let Some(command) = line.strip_prefix('/') {
            if !command.is_empty() {
                let mut payload = command.as_bytes().to_vec();
                let sep = payload.iter().position(|&b| b == b' ' || b == b'\t');
                if let Some(i) = sep {
                    payload[i] = FIELD_SEP;
                }
                if sep == Some(1) && payload[0] == b'm' {
                    self.history
                        .append(b'c', b"me", &command.as_bytes()[2..]);
                }
                self.send_message(b'h', &payload);
                self.phase = Phase::CommandSent;
                return;
            }
        }
        self.history.append(b'b', b"me", line.as_bytes());
        self.send_message(b'b', line.as_bytes());
    }

    /// Dispatch one reassembled inbound message.
    pub fn handle_message(&mut self, msg: Message) -> ClientResult<()> {
        let type_byte = msg.packet_type;
        let payload = msg.payload;
        if self.config.debug >= 1 {
            eprintln!(
                "oicb: got message of type '{}' with size {}: {}",
                type_byte as char,
                payload.len(),
                String::from_utf8_lossy(&payload)
            );
        }

        match PacketType::from_byte(type_byte) {
            Some(PacketType::Login) => {
                if self.phase != Phase::LoginSent {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
                let banner = format!(
                    "Logged in to room {} as {}\n",
                    self.config.room, self.config.nick
                );
                self.push_screen(&banner);
                self.phase = Phase::Chat;
            }

            Some(
                PacketType::Open
                | PacketType::Personal
                | PacketType::Status
                | PacketType::Important,
            ) => {
                if self.phase == Phase::CommandSent {
                    self.phase = Phase::Chat;
                } else if self.phase != Phase::Chat {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
                let data = cstr(&payload);
                let sep = data.iter().position(|&b| b == FIELD_SEP).ok_or(
                    ClientError::InvalidMessage {
                        msg_type: type_byte as char,
                        reason: "missing text",
                    },
                )?;
                let (author, text) = (&data[..sep], &data[sep + 1..]);
                self.chat_message(type_byte, author, text);
            }

            Some(PacketType::Error) => {
                if self.phase != Phase::Chat && self.phase != Phase::CommandSent {
                    self.want_exit = true;
                }
                let data = cstr(&payload).to_vec();
                if data == b"Undefined message type 108" {
                    // Server can't ping-pong; keep-alives fall back to
                    // no-op messages from here on.
                    self.features.ping = false;
                    if self.config.debug >= 1 {
                        eprintln!(
                            "oicb: server doesn't support ping-pong, \
                             switching to no-op messages"
                        );
                    }
                } else {
                    let host = self.config.hostname.clone();
                    self.chat_message(b'e', host.as_bytes(), &data);
                }
            }

            Some(PacketType::Exit) => {
                if self.phase != Phase::Chat {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
                self.push_screen("ICB: server said bye-bye\n");
                self.want_exit = true;
            }

            Some(PacketType::CommandResult) => {
                if self.phase != Phase::CommandSent {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
                self.command_result(&payload)?;
            }

            Some(PacketType::Protocol) => {
                if self.phase != Phase::Connected {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
                let data = cstr(&payload);
                let version = data
                    .split(|&b| b == FIELD_SEP)
                    .next()
                    .unwrap_or(b"");
                if version != PROTOCOL_VERSION.as_bytes() {
                    return Err(ClientError::UnsupportedProtocolVersion(
                        String::from_utf8_lossy(version).into_owned(),
                    ));
                }
                let login = format!(
                    "{nick}\x01{nick}\x01{room}\x01login\x01",
                    nick = self.config.nick,
                    room = self.config.room
                );
                self.send_message(b'a', login.as_bytes());
                self.phase = Phase::LoginSent;
            }

            Some(PacketType::Beep) => {
                if self.phase != Phase::Chat {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
                self.chat_message(b'k', b"SERVER", b"BEEP!");
            }

            Some(PacketType::Ping) => {
                self.send_message(b'm', &payload);
            }

            Some(PacketType::Pong) => {
                // Pings exist only to make the server say something, so
                // pongs carry no ids worth checking.
            }

            Some(PacketType::NoOp) => {
                if self.phase != Phase::Chat {
                    return Err(ClientError::UnexpectedMessage(type_byte as char));
                }
            }

            Some(PacketType::Command) | None => {
                let notice = format!(
                    "unsupported message of type '{}', ignored\n",
                    type_byte as char
                );
                self.push_screen(&notice);
            }
        }
        Ok(())
    }

    /// Log and display one chat-like message.
    fn chat_message(&mut self, msg_type: u8, author: &[u8], text: &[u8]) {
        self.history.append(msg_type, author, text);
        let line = chat_line(msg_type, author, text, &Zoned::now());
        self.push_screen(&line);
    }

    /// Route an `i` command-result message to its renderer.
    fn command_result(&mut self, payload: &[u8]) -> ClientResult<()> {
        let head = cstr(payload);
        let sep = head.iter().position(|&b| b == FIELD_SEP).ok_or(
            ClientError::InvalidMessage {
                msg_type: 'i',
                reason: "missing output type",
            },
        )?;
        let out_type = &payload[..sep];
        let body = &payload[sep + 1..];

        match out_type {
            b"co" => {
                self.last_cmd_has_nl = body.last() == Some(&b'\n');
                let text = crate::format::visible_encode(body, false);
                self.push_screen(&text);
            }
            b"ec" => {
                if self.last_cmd_has_nl {
                    self.last_cmd_has_nl = false;
                } else {
                    self.push_screen("\n");
                }
                self.phase = Phase::Chat;
            }
            b"wl" => match replies::render_user_list_row(cstr(body)) {
                Some(row) => self.push_screen_bytes(&row),
                None => eprintln!("oicb: invalid user info line received, ignoring"),
            },
            b"wg" => {
                let room = self.config.room.clone();
                match replies::render_group_list_row(cstr(body), &room) {
                    Some(row) => self.push_screen_bytes(&row),
                    None => eprintln!("oicb: invalid group info line received, ignoring"),
                }
            }
            // Header rows and command-help output carry nothing we render.
            b"wh" | b"gh" | b"ch" | b"c" => {}
            _ => {
                return Err(ClientError::InvalidMessage {
                    msg_type: 'i',
                    reason: "unsupported output type",
                });
            }
        }
        Ok(())
    }
}

/// The prefix of a payload up to its first NUL. Structured fields are
/// parsed as NUL-terminated strings; servers differ on whether they
/// terminate what they send.
fn cstr(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}
