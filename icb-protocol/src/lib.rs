//! # ICB Protocol Library
//!
//! Framing layer for the ICB (Internet CB) chat protocol: packet constants,
//! outbound fragmentation, and inbound reassembly.
//!
//! The library is transport-agnostic and allocation-bounded:
//! - `protocol`: wire constants and the packet type alphabet
//! - `encoder`: logical message -> wire packets (legacy and extended)
//! - `parser`: byte stream -> logical messages, with defragmentation
//!
//! It performs no I/O. Callers feed whatever their socket produced into
//! [`MessageReassembler`] and hand the packet buffers produced by
//! [`encode_message`] to their own writer.

pub mod encoder;
pub mod parser;
pub mod protocol;

pub use encoder::{encode_extended, encode_legacy, encode_message};
pub use parser::{CodecError, Message, MessageReassembler};
pub use protocol::{PacketType, DEFAULT_PORT, FIELD_SEP, NICKNAME_MAX, PROTOCOL_VERSION};
