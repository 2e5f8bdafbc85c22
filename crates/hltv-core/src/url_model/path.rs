//! Filename extraction from URL path.

/// Last non-empty path segment of `url`, still percent-encoded.
///
/// Query and fragment are ignored. Returns `None` if the URL does not parse,
/// the path is root, or the segment is `.`/`..`.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
