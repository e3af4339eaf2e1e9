//! # ICB Message Reassembly
//!
//! This module turns the raw inbound byte stream into complete logical
//! messages, defragmenting the extended multi-packet scheme along the way.
//!
//! ## Reassembly rules
//!
//! Fragments are walked in 256-byte strides: a zero length byte means the
//! fragment is a continuation occupying a full 256 bytes, and the first
//! nonzero length byte marks the terminating fragment, which requires
//! `length` further bytes to be complete. Until the terminator has fully
//! arrived, [`MessageReassembler::next_message`] reports "no message yet".
//!
//! Every fragment of one logical message must carry the same type byte.
//! When fragments are collapsed into one payload, each interior
//! `[length][type]` header is dropped, and so is a NUL that immediately
//! precedes an interior header (some senders terminate every fragment,
//! which would otherwise leave stray NULs in the middle of the payload).
//! A single trailing NUL, when present, is not part of the payload.
//!
//! The rolling buffer starts small and grows on demand; a logical message
//! that fails to complete within [`MAX_BUFFER_SIZE`] bytes is an error, as
//! is a fragment-type mismatch. Both are unrecoverable for the connection.

use crate::protocol::{CONTINUATION_SIZE, INITIAL_BUFFER_SIZE, MAX_BUFFER_SIZE};
use std::fmt;

/// Errors the codec can hit while reassembling the inbound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A single logical message exceeded the buffer ceiling.
    MessageTooLong,
    /// Fragments of one logical message disagreed on the type byte.
    FragmentTypeMismatch,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MessageTooLong => write!(f, "too long message"),
            CodecError::FragmentTypeMismatch => {
                write!(f, "message types messed up in a single message")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// A reassembled logical ICB message.
///
/// `payload` carries the data bytes without the trailing NUL terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub packet_type: u8,
    pub payload: Vec<u8>,
}

/// Incremental defragmenter for the inbound ICB byte stream.
///
/// Feed it whatever the socket yields, in chunks of any size, then pull
/// complete messages out of it. State is kept between calls, so a message
/// may arrive one byte at a time and still decode identically.
#[derive(Debug, Default)]
pub struct MessageReassembler {
    buf: Vec<u8>,
}

impl MessageReassembler {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    /// Append raw bytes read from the socket.
    ///
    /// Fails when the rolling buffer would exceed [`MAX_BUFFER_SIZE`],
    /// which can only happen when the peer sends a single logical message
    /// larger than the ceiling.
    pub fn feed(&mut self, input: &[u8]) -> Result<(), CodecError> {
        if self.buf.len() + input.len() > MAX_BUFFER_SIZE {
            return Err(CodecError::MessageTooLong);
        }
        self.buf.extend_from_slice(input);
        Ok(())
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete logical message, if one has arrived.
    ///
    /// Returns `Ok(None)` while the terminating fragment is still missing
    /// or incomplete. Consumed bytes are removed from the buffer, so the
    /// call can be repeated until it reports `None`.
    pub fn next_message(&mut self) -> Result<Option<Message>, CodecError> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        // Locate the terminating fragment. A zero length byte means the
        // fragment fills 256 bytes and the message continues after it.
        let mut term = 0usize;
        while self.buf[term] == 0 {
            if self.buf.len() <= term + CONTINUATION_SIZE {
                // The continuation run is not over, or the length byte of
                // the next fragment has not arrived yet.
                return Ok(None);
            }
            term += CONTINUATION_SIZE;
        }
        let term_len = self.buf[term] as usize;
        let end = term + 1 + term_len;
        if self.buf.len() < end {
            return Ok(None);
        }

        let packet_type = self.buf[term + 1];
        let mut payload = Vec::with_capacity(end);

        let mut frag = 0usize;
        loop {
            if self.buf[frag + 1] != packet_type {
                return Err(CodecError::FragmentTypeMismatch);
            }
            if frag > 0 && payload.last() == Some(&0) {
                // Drop the spurious per-fragment terminator some senders
                // put at the end of every fragment.
                payload.pop();
            }
            let run_end = if frag == term { end } else { frag + CONTINUATION_SIZE };
            payload.extend_from_slice(&self.buf[frag + 2..run_end]);
            if frag == term {
                break;
            }
            frag += CONTINUATION_SIZE;
        }

        if payload.last() == Some(&0) {
            payload.pop();
        }

        self.buf.drain(..end);
        Ok(Some(Message {
            packet_type,
            payload,
        }))
    }
}
