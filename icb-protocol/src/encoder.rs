//! # ICB Message Fragmentation
//!
//! Outbound logical messages are split into wire packets here. Two schemes
//! exist:
//!
//! - **Legacy**: every chunk becomes an independent packet with a nonzero
//!   length byte and its own NUL terminator. The server prepends the sender
//!   nickname when relaying, so headroom for `nick + 1` bytes is reserved
//!   in every packet. Chat and private-message bodies prefer to break on
//!   whitespace or punctuation instead of mid-word.
//! - **Extended**: one logical message spans several packets; all but the
//!   last have a zero length byte and a full 254-byte data run, and the
//!   last carries the remainder plus the NUL terminator. Servers advertise
//!   support for this scheme; it is not assumed.
//!
//! Private-message commands (`h` payloads starting `m\x01`) carry the
//! addressee up front. That prefix is replayed at the start of every legacy
//! chunk so each packet remains a valid command on its own.

use crate::protocol::{CONTINUATION_SIZE, FIELD_SEP, NICKNAME_MAX, PACKET_MAX_DATA};

/// Encode one logical message into wire packets.
///
/// `nick` is the local nickname, used only for the legacy headroom
/// calculation; it must be shorter than [`NICKNAME_MAX`].
pub fn encode_message(ptype: u8, payload: &[u8], nick: &str, extended: bool) -> Vec<Vec<u8>> {
    if extended {
        encode_extended(ptype, payload)
    } else {
        encode_legacy(ptype, payload, nick)
    }
}

/// Legacy whitespace-splitting fragmentation.
///
/// Packet layout: `[n + common + 2][type][common prefix][chunk][NUL]`, the
/// length byte covering type, data and NUL.
pub fn encode_legacy(ptype: u8, payload: &[u8], nick: &str) -> Vec<Vec<u8>> {
    debug_assert!(nick.len() < NICKNAME_MAX);

    let mut common_len = 0usize;
    let private = ptype == b'h' && payload.starts_with(&[b'm', FIELD_SEP]);
    if private {
        // The addressee runs through the first blank; replay it in every
        // chunk. The bound keeps a blank inside the message body from
        // being mistaken for the addressee terminator.
        if let Some(sp) = payload.iter().position(|&b| b == b' ') {
            if sp < NICKNAME_MAX + 3 {
                common_len = sp + 1;
            }
        }
    }
    let (common, mut src) = payload.split_at(common_len);

    // Give the server a chance to prepend the nickname field without
    // breaking the 255-byte packet limit.
    let max_chunk = 253 - (nick.len() + 1) - common_len;

    let mut packets = Vec::new();
    loop {
        let chunk_len = if src.len() > max_chunk {
            let mut n = max_chunk;
            if ptype == b'b' || private {
                for i in (1..max_chunk).rev() {
                    if src[i] == b' ' || src[i] == b'\t' || src[i].is_ascii_punctuation() {
                        n = i + 1;
                        break;
                    }
                }
            }
            n
        } else {
            src.len()
        };

        let mut pkt = Vec::with_capacity(common_len + chunk_len + 3);
        pkt.push((common_len + chunk_len + 2) as u8);
        pkt.push(ptype);
        pkt.extend_from_slice(common);
        pkt.extend_from_slice(&src[..chunk_len]);
        pkt.push(0);
        packets.push(pkt);

        src = &src[chunk_len..];
        if src.is_empty() {
            break;
        }
    }
    packets
}

/// Extended multi-packet fragmentation.
///
/// With `len` the payload length plus the mandatory NUL: `len / 254`
/// continuation packets carry 254 bytes each, then one terminating packet
/// carries the remaining `len % 254` bytes with a length byte of
/// `len % 254 + 1`. When `len` is an exact multiple of 254 the terminator
/// degenerates to `[1][type]` with no data at all; receivers deduplicate
/// the NUL that then ends the last continuation run.
pub fn encode_extended(ptype: u8, payload: &[u8]) -> Vec<Vec<u8>> {
    let len = payload.len() + 1;
    let full = len / PACKET_MAX_DATA;
    let rem = len % PACKET_MAX_DATA;

    let mut packets = Vec::with_capacity(full + 1);
    let mut off = 0usize;
    for _ in 0..full {
        let mut pkt = Vec::with_capacity(CONTINUATION_SIZE);
        pkt.push(0);
        pkt.push(ptype);
        let take = PACKET_MAX_DATA.min(payload.len() - off);
        pkt.extend_from_slice(&payload[off..off + take]);
        off += take;
        if take < PACKET_MAX_DATA {
            // The trailing NUL fills out the final continuation run.
            pkt.push(0);
        }
        packets.push(pkt);
    }

    let mut pkt = Vec::with_capacity(rem + 2);
    pkt.push((rem + 1) as u8);
    pkt.push(ptype);
    pkt.extend_from_slice(&payload[off..]);
    if rem > 0 {
        pkt.push(0);
    }
    packets.push(pkt);
    packets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MessageReassembler;

    fn decode_all(packets: &[Vec<u8>]) -> Vec<(u8, Vec<u8>)> {
        let mut r = MessageReassembler::new();
        for pkt in packets {
            r.feed(pkt).unwrap();
        }
        let mut out = Vec::new();
        while let Some(msg) = r.next_message().unwrap() {
            out.push((msg.packet_type, msg.payload));
        }
        out
    }

    #[test]
    fn test_hello_packet_bytes() {
        let packets = encode_legacy(b'b', b"hello", "alice");
        assert_eq!(packets.len(), 1);
        assert_eq!(
            packets[0],
            vec![0x07, b'b', b'h', b'e', b'l', b'l', b'o', 0x00]
        );
    }

    #[test]
    fn test_empty_payload_packet() {
        let packets = encode_legacy(b'l', b"", "alice");
        assert_eq!(packets, vec![vec![0x02, b'l', 0x00]]);
    }

    #[test]
    fn test_legacy_round_trip_short() {
        let packets = encode_legacy(b'b', b"just a short line", "bob");
        let msgs = decode_all(&packets);
        assert_eq!(msgs, vec![(b'b', b"just a short line".to_vec())]);
    }

    #[test]
    fn test_legacy_round_trip_long_concatenates() {
        let payload: Vec<u8> = (0..10_000).map(|i| b'a' + (i % 26) as u8).collect();
        let packets = encode_legacy(b'h', &payload, "somenick");
        assert!(packets.len() > 1);

        let msgs = decode_all(&packets);
        let mut collected = Vec::new();
        for (ptype, chunk) in msgs {
            assert_eq!(ptype, b'h');
            collected.extend(chunk);
        }
        assert_eq!(collected, payload);
    }

    #[test]
    fn test_legacy_packets_respect_nick_headroom() {
        for nick_len in 1..=32 {
            let nick = "n".repeat(nick_len);
            let payload = vec![b'z'; 4000];
            for pkt in encode_legacy(b'b', &payload, &nick) {
                // Length byte plus the nickname the server may prepend
                // must stay within a 255-byte packet.
                assert!(pkt[0] as usize + nick.len() + 1 <= 255);
                assert_eq!(pkt.len(), pkt[0] as usize + 1);
                assert_eq!(*pkt.last().unwrap(), 0);
            }
        }
    }

    #[test]
    fn test_chunk_break_prefers_word_boundary() {
        // Words of nine letters and a space; every forced cut lands just
        // after a blank rather than mid-word.
        let word = b"abcdefghi ";
        let payload: Vec<u8> = word.iter().cycle().take(2000).cloned().collect();
        let packets = encode_legacy(b'b', &payload, "nick");
        assert!(packets.len() > 1);
        for pkt in &packets[..packets.len() - 1] {
            let data = &pkt[2..pkt.len() - 1];
            let last = *data.last().unwrap();
            assert!(
                last == b' ' || last.is_ascii_punctuation(),
                "chunk ended mid-word: {:?}",
                last as char
            );
        }
    }

    #[test]
    fn test_private_command_replays_addressee() {
        let mut payload = b"m\x01bob ".to_vec();
        payload.extend(std::iter::repeat(b'x').take(1000));
        let packets = encode_legacy(b'h', &payload, "alice");
        assert!(packets.len() > 1);
        for pkt in &packets {
            assert_eq!(&pkt[2..8], b"m\x01bob ");
        }
    }

    #[test]
    fn test_private_short_message_single_packet() {
        let packets = encode_legacy(b'h', b"m\x01bob hi", "alice");
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][2..], b"m\x01bob hi\x00");
    }

    #[test]
    fn test_extended_packet_counts() {
        for n in [0usize, 1, 10, 253, 254, 255, 507, 508, 1000, 10_000] {
            let payload = vec![b'q'; n];
            let packets = encode_extended(b'b', &payload);
            let len = n + 1;
            // One packet per full 254-byte run plus the terminator. This
            // equals ceil(len / 254) except when len is an exact multiple
            // of 254, where the terminator degenerates to an empty packet.
            assert_eq!(packets.len(), len / PACKET_MAX_DATA + 1, "payload length {}", n);
            for pkt in &packets[..packets.len() - 1] {
                assert_eq!(pkt[0], 0);
                assert_eq!(pkt.len(), CONTINUATION_SIZE);
            }
            assert_ne!(packets.last().unwrap()[0], 0);
        }
    }

    #[test]
    fn test_extended_round_trip() {
        for n in [0usize, 1, 200, 253, 254, 255, 506, 507, 508, 5000, 10_000] {
            let payload: Vec<u8> = (0..n).map(|i| 1 + (i % 250) as u8).collect();
            let packets = encode_extended(b'f', &payload);
            let msgs = decode_all(&packets);
            assert_eq!(msgs.len(), 1, "payload length {}", n);
            assert_eq!(msgs[0].0, b'f');
            assert_eq!(msgs[0].1, payload, "payload length {}", n);
        }
    }

    #[test]
    fn test_extended_degenerate_final_packet() {
        // Payload plus NUL an exact multiple of 254: the terminator is
        // `[1][type]` with no data bytes.
        let payload = vec![b'w'; PACKET_MAX_DATA - 1];
        let packets = encode_extended(b'b', &payload);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1], vec![0x01, b'b']);
        assert_eq!(*packets[0].last().unwrap(), 0);
    }
}
