//! Linux-safe filename sanitization.

/// Linux NAME_MAX in bytes.
const NAME_MAX: usize = 255;

/// Sanitizes a candidate filename for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores
/// - Limits length to 255 bytes on a char boundary
pub fn sanitize_filename_for_linux(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = c == '\0' || c == '/' || c == '\\' || c == ' ' || c.is_control();
        if unsafe_char || c == '_' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

/// Makes a server-announced name safe to join onto the download directory
/// while keeping it otherwise verbatim (spaces and underscores included).
///
/// Only the last `/` or `\` separated component survives, NUL and control
/// characters are dropped, and the result is cut to 255 bytes. `.` and `..`
/// come back unchanged; callers reject them.
pub fn strip_path_and_controls(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let mut take = cleaned.len().min(NAME_MAX);
    while !cleaned.is_char_boundary(take) {
        take -= 1;
    }
    cleaned[..take].to_string()
}
