use jiff::Zoned;

/// Escape bytes that could make the terminal misbehave.
///
/// Printable ASCII, space, tab, and the backslash pass through untouched.
/// Newlines pass unless `encode_newline` is set (list renderers ask for
/// that so a hostile group name cannot fake extra rows). Remaining control
/// bytes come out in caret notation (`^A`, DEL as `^?`), bytes with the
/// high bit set as `M-` followed by the encoding of the low seven bits.
/// Worst case the output is four characters per input byte.
pub fn visible_encode(input: &[u8], encode_newline: bool) -> String {
    let mut out = String::with_capacity(input.len() * 4);
    for &byte in input {
        if byte == b'\n' && !encode_newline {
            out.push('\n');
        } else {
            push_visible(&mut out, byte);
        }
    }
    out
}

fn push_visible(out: &mut String, byte: u8) {
    if byte & 0x80 != 0 {
        out.push_str("M-");
        push_visible(out, byte & 0x7f);
        return;
    }
    match byte {
        b'\t' => out.push('\t'),
        0x7f => out.push_str("^?"),
        0..=0x1f => {
            out.push('^');
            out.push((byte + 0x40) as char);
        }
        _ => out.push(byte as char),
    }
}

/// Author delimiters for each chat-like message type.
fn delimiters(msg_type: u8) -> (&'static str, &'static str) {
    match msg_type {
        b'c' => (" *", "* "),
        b'd' => (" [=", "=] "),
        b'e' | b'k' => (" !", "! "),
        b'f' => (" {", "} "),
        _ => (" <", "> "),
    }
}

/// Render an incoming chat-like message as one timestamped terminal line.
pub fn chat_line(msg_type: u8, author: &[u8], text: &[u8], time: &Zoned) -> String {
    let (pre, post) = delimiters(msg_type);
    let mut line = format!("[{}]", time.strftime("%H:%M:%S"));
    line.push_str(pre);
    line.push_str(&visible_encode(author, false));
    line.push_str(post);
    line.push_str(&visible_encode(text, false));
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use jiff::tz::TimeZone;

    fn noon() -> Zoned {
        date(2025, 6, 1)
            .at(12, 34, 56, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap()
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(visible_encode(b"hello world \\ ok", false), "hello world \\ ok");
    }

    #[test]
    fn test_control_bytes_use_caret_notation() {
        assert_eq!(visible_encode(&[0x01, 0x1b, 0x7f], false), "^A^[^?");
    }

    #[test]
    fn test_meta_bytes_use_m_prefix() {
        assert_eq!(visible_encode(&[0xc1], false), "M-A");
        assert_eq!(visible_encode(&[0x81], false), "M-^A");
    }

    #[test]
    fn test_newline_encoding_is_optional() {
        assert_eq!(visible_encode(b"a\nb", false), "a\nb");
        assert_eq!(visible_encode(b"a\nb", true), "a^Jb");
    }

    #[test]
    fn test_open_message_line() {
        let line = chat_line(b'b', b"alice", b"hi there", &noon());
        assert_eq!(line, "[12:34:56] <alice> hi there\n");
    }

    #[test]
    fn test_delimiters_per_type() {
        let time = noon();
        assert!(chat_line(b'c', b"bob", b"x", &time).contains(" *bob* "));
        assert!(chat_line(b'd', b"Status", b"x", &time).contains(" [=Status=] "));
        assert!(chat_line(b'e', b"host", b"x", &time).contains(" !host! "));
        assert!(chat_line(b'k', b"SERVER", b"x", &time).contains(" !SERVER! "));
        assert!(chat_line(b'f', b"mod", b"x", &time).contains(" {mod} "));
    }

    #[test]
    fn test_hostile_author_is_escaped() {
        let line = chat_line(b'b', b"al\x1bce", b"ok", &noon());
        assert!(line.contains("<al^[ce>"));
    }
}
