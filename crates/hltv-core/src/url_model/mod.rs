//! URL modeling and filename derivation.
//!
//! Derives safe local filenames from a URL path, or from a server's
//! `Content-Disposition: attachment` header after a transfer.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::{disposition_type, parse_content_disposition_filename};
pub use path::filename_from_url_path;
pub use sanitize::{sanitize_filename_for_linux, strip_path_and_controls};

/// Default filename when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Local filename for `url` when the caller gave none: the last path
/// segment, sanitized for Linux, or `download.bin`.
///
/// - `filename_for_url("https://example.com/a/archive.zip?x=1")` → `"archive.zip"`
/// - `filename_for_url("https://example.com/")` → `"download.bin"`
pub fn filename_for_url(url: &str) -> String {
    filename_from_url_path(url)
        .map(|raw| sanitize_filename_for_linux(&raw))
        .filter(|s| is_usable(s))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Filename announced by `Content-Disposition: attachment; filename=...`.
///
/// Only the `attachment` disposition type renames a download; `inline` and
/// headers without a filename yield `None`. The announced name is kept as
/// is apart from directory components and control characters, so a hostile
/// header can never point outside the download directory.
pub fn attachment_filename(content_disposition: &str) -> Option<String> {
    if !disposition_type(content_disposition).eq_ignore_ascii_case("attachment") {
        return None;
    }
    parse_content_disposition_filename(content_disposition)
        .map(|raw| strip_path_and_controls(&raw))
        .filter(|s| is_usable(s))
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
