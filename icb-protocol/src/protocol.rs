//! # ICB Protocol Constants and Types
//!
//! This module defines the core framing constants and packet types of the
//! ICB (Internet CB) chat protocol.
//!
//! ## Wire format
//!
//! Every packet on the socket is `[length][type][data...]`:
//!
//! - **length** (1 byte): number of bytes following the length byte, i.e.
//!   the type byte plus the data. A length of `0` marks a *continuation*
//!   packet of the extended scheme: the packet occupies a full 256 bytes
//!   (length, type, 254 data bytes) and the logical message continues in
//!   the next packet.
//! - **type** (1 byte): a single ASCII letter, see [`PacketType`].
//! - **data**: payload bytes. Fields inside the payload are separated by
//!   [`FIELD_SEP`] (`0x01`). The final fragment of a logical message ends
//!   with a NUL terminator.
//!
//! A *logical message* is the `(type, payload)` pair obtained after
//! defragmenting zero or more continuation packets plus one terminating
//! packet with a nonzero length byte.

/// Field separator inside ICB payloads.
pub const FIELD_SEP: u8 = 0x01;

/// Largest number of data bytes a single wire packet can carry.
///
/// The length byte covers the type byte too, so with `length <= 255` at
/// most 254 bytes of data fit in one packet.
pub const PACKET_MAX_DATA: usize = 254;

/// Total size of a continuation packet in the extended scheme: one length
/// byte (zero), one type byte, and a full data run.
pub const CONTINUATION_SIZE: usize = PACKET_MAX_DATA + 2;

/// Upper bound on the nickname length accepted by clients and servers.
pub const NICKNAME_MAX: usize = 64;

/// Initial size of the inbound reassembly buffer.
pub const INITIAL_BUFFER_SIZE: usize = 1024;

/// Hard ceiling for the inbound reassembly buffer. A logical message that
/// does not complete within this many bytes is an error.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// The only protocol version this implementation speaks.
pub const PROTOCOL_VERSION: &str = "1";

/// Default ICB server port.
pub const DEFAULT_PORT: u16 = 7326;

/// ICB packet types.
///
/// Each logical message carries exactly one of these as its type byte.
/// The set below covers everything a client sends (`Login`, `Open`,
/// `Command`, `Ping`, `Pong`, `NoOp`) and everything a server is known to
/// send back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Login handshake; sent by the client, echoed by the server on success.
    Login = b'a',
    /// Open (public) message to the current group.
    Open = b'b',
    /// Personal (private) message.
    Personal = b'c',
    /// Status message from the server.
    Status = b'd',
    /// Error message from the server.
    Error = b'e',
    /// Important message from the server.
    Important = b'f',
    /// Server asked us to disconnect.
    Exit = b'g',
    /// Client-to-server command.
    Command = b'h',
    /// Command result rows and terminators.
    CommandResult = b'i',
    /// Protocol greeting, first message after connecting.
    Protocol = b'j',
    /// Beep request from another user.
    Beep = b'k',
    /// Ping.
    Ping = b'l',
    /// Pong.
    Pong = b'm',
    /// No-op, used as a keep-alive by clients.
    NoOp = b'n',
}

impl PacketType {
    /// Convert a wire byte into a packet type, if it is a known one.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'a' => Some(PacketType::Login),
            b'b' => Some(PacketType::Open),
            b'c' => Some(PacketType::Personal),
            b'd' => Some(PacketType::Status),
            b'e' => Some(PacketType::Error),
            b'f' => Some(PacketType::Important),
            b'g' => Some(PacketType::Exit),
            b'h' => Some(PacketType::Command),
            b'i' => Some(PacketType::CommandResult),
            b'j' => Some(PacketType::Protocol),
            b'k' => Some(PacketType::Beep),
            b'l' => Some(PacketType::Ping),
            b'm' => Some(PacketType::Pong),
            b'n' => Some(PacketType::NoOp),
            _ => None,
        }
    }

    /// The wire byte for this packet type.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_known_types() {
        for byte in b'a'..=b'n' {
            let ptype = PacketType::from_byte(byte).unwrap();
            assert_eq!(ptype.to_byte(), byte);
        }
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(PacketType::from_byte(b'z'), None);
        assert_eq!(PacketType::from_byte(0), None);
    }
}
