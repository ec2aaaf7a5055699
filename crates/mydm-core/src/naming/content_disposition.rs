//! `Content-Disposition` filename extraction.

/// Pulls a filename out of a raw `Content-Disposition` value.
///
/// Handles `filename="quoted"` and bare `filename=token` parameters; an
/// RFC 5987 `filename*=UTF-8''percent-encoded` parameter takes precedence
/// when it decodes cleanly.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in value.split(';') {
        let Some((name, v)) = param.trim().split_once('=') else {
            continue;
        };
        let v = v.trim();

        if name.trim().eq_ignore_ascii_case("filename*") {
            if let Some(rest) = v
                .strip_prefix("UTF-8''")
                .or_else(|| v.strip_prefix("utf-8''"))
            {
                let decoded = percent_decode(rest);
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if name.trim().eq_ignore_ascii_case("filename") {
            let unquoted = v.trim_matches(|c| c == '"' || c == '\'');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_string());
            }
        }
    }

    plain
}

/// Percent-decoding for the `filename*` value; malformed escapes pass
/// through literally.
fn percent_decode(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let hi = bytes.next();
            let lo = bytes.next();
            match (hi.and_then(hex_val), lo.and_then(hex_val)) {
                (Some(h), Some(l)) => out.push((h << 4) | l),
                _ => {
                    out.push(b'%');
                    out.extend(hi);
                    out.extend(lo);
                }
            }
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
