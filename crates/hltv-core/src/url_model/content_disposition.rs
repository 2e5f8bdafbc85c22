//! Content-Disposition: disposition type and the announced filename.

/// The disposition type (`attachment`, `inline`, ...) of a raw header value:
/// everything before the first `;`, trimmed.
pub fn disposition_type(header_value: &str) -> &str {
    header_value
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or("")
}

/// Lowercased parameter names with their raw (trimmed) values.
fn params(header_value: &str) -> impl Iterator<Item = (String, &str)> {
    header_value.split(';').filter_map(|param| {
        let (name, value) = param.split_once('=')?;
        Some((name.trim().to_ascii_lowercase(), value.trim()))
    })
}

/// Filename of a raw Content-Disposition value.
///
/// `filename*=UTF-8''<pct-encoded>` wins over `filename=`, which may be a
/// token or a quoted string with backslash escapes.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain = None;
    for (name, value) in params(header_value) {
        match name.as_str() {
            "filename*" => {
                if let Some(decoded) = ext_value(value) {
                    return Some(decoded);
                }
            }
            "filename" => {
                let name = unquote(value);
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

/// `<charset>'<lang>'<pct-encoded>`; only UTF-8 is understood.
fn ext_value(value: &str) -> Option<String> {
    let (charset, rest) = value.split_once('\'')?;
    let (_lang, encoded) = rest.split_once('\'')?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    let decoded = percent_decode(encoded.trim_matches('"'));
    (!decoded.is_empty()).then_some(decoded)
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if c == '\\' && !escaped {
            escaped = true;
        } else {
            out.push(c);
            escaped = false;
        }
    }
    out
}

/// Malformed escapes stay literal; invalid UTF-8 is replaced lossily.
fn percent_decode(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len());
    let mut rest = input.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        let escaped = tail
            .get(..2)
            .filter(|hex| b == b'%' && hex.iter().all(u8::is_ascii_hexdigit))
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(decoded) => {
                out.push(decoded);
                rest = &tail[2..];
            }
            None => {
                out.push(b);
                rest = tail;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
