use crate::format::visible_encode;

use icb_protocol::FIELD_SEP;
use jiff::tz::TimeZone;
use jiff::Timestamp;

/// Group names shorter than this get padded so topics line up.
const MIN_NAME_LEN: usize = 30;

/// Render one `wl` user-list row.
///
/// Fields: moderator flag, nick, idle seconds, a reserved zero, signon
/// epoch, ident, source address. Missing trailing fields are tolerated;
/// a row without any field separator at all is rejected so the caller can
/// warn and skip it.
pub fn render_user_list_row(row: &[u8]) -> Option<Vec<u8>> {
    if !row.contains(&FIELD_SEP) {
        return None;
    }
    let mut fields = row.split(|&b| b == FIELD_SEP);

    let mut out: Vec<u8> = Vec::new();
    out.push(if fields.next() == Some(&b"m"[..]) {
        b'*'
    } else {
        b' '
    });

    'row: {
        let Some(nick) = fields.next() else { break 'row };
        out.extend_from_slice(nick);

        let Some(idle) = fields.next() else { break 'row };
        let digits = idle
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        out.extend_from_slice(&idle[..digits]);
        out.push(b's');

        // Reserved field, always zero.
        if fields.next().is_none() {
            break 'row;
        }

        let Some(signon) = fields.next() else { break 'row };
        let Some(epoch) = std::str::from_utf8(signon)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
        else {
            break 'row;
        };
        out.extend_from_slice(signon_time(epoch).as_bytes());

        let Some(ident) = fields.next() else { break 'row };
        out.extend_from_slice(ident);

        let Some(srcaddr) = fields.next() else { break 'row };
        out.extend_from_slice(srcaddr);
    }

    out.push(b'\n');
    Some(out)
}

/// Render one `wg` group-list row.
///
/// Fields: group name, topic, and an optional message id that is ignored.
/// The current room gets a `*` marker.
pub fn render_group_list_row(row: &[u8], current_room: &str) -> Option<Vec<u8>> {
    let sep = row.iter().position(|&b| b == FIELD_SEP)?;
    let name = &row[..sep];
    let rest = &row[sep + 1..];
    let topic = match rest.iter().position(|&b| b == FIELD_SEP) {
        Some(end) => &rest[..end],
        None => rest,
    };

    let mut out = String::new();
    out.push(if name == current_room.as_bytes() {
        '*'
    } else {
        ' '
    });
    out.push_str(&visible_encode(name, true));
    while out.len() <= MIN_NAME_LEN {
        out.push(' ');
    }
    out.push_str(&visible_encode(topic, true));
    out.push('\n');
    Some(out.into_bytes())
}

/// ctime(3)-style rendering of a signon timestamp, trailing newline
/// included.
fn signon_time(epoch: i64) -> String {
    match Timestamp::from_second(epoch) {
        Ok(ts) => format!(
            "{}\n",
            ts.to_zoned(TimeZone::system())
                .strftime("%a %b %e %H:%M:%S %Y")
        ),
        Err(_) => "?\n".to_string(),
    }
}
