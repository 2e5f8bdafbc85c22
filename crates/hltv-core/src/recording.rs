//! OnlineTVRecorder recording names and their thumbnail set.
//!
//! Recordings arrive as `.../<digits>_<name>_TVOON_DE.<format>`. The part
//! without the numeric queue prefix is the canonical filename; `<name>` up to
//! and including `_TVOON_DE` keys the twelve preview images on the thumbnail
//! host.

/// Default host serving recording thumbnails.
pub const DEFAULT_THUMBNAIL_PREFIX: &str = "http://thumbs.onlinetvrecorder.com/";

/// Marker every OTR recording name ends with.
const RECORDING_MARKER: &str = "_TVOON_DE";

/// Fixed thumbnail table: key and the suffix appended to the recording name.
pub const THUMBNAIL_SUFFIXES: [(char, &str); 12] = [
    ('A', "____A.jpg"),
    ('B', "____B.jpg"),
    ('0', "____0.jpg"),
    ('1', "____1.jpg"),
    ('2', "____2.jpg"),
    ('3', "____3.jpg"),
    ('4', "____4.jpg"),
    ('5', "____5.jpg"),
    ('6', "____6.jpg"),
    ('7', "____7.jpg"),
    ('8', "____8.jpg"),
    ('9', "____9.jpg"),
];

/// A recognised recording URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// `<name>.<format>`: last URL segment without the numeric prefix.
    pub filename: String,
    /// `<name>` including the `_TVOON_DE` marker.
    pub name: String,
    /// Everything after the marker's dot (e.g. `mpg.HQ.avi`).
    pub format: String,
}

/// One thumbnail to fetch for a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub key: char,
    pub url: String,
    pub filename: String,
}

impl Recording {
    /// Parses the last segment of `url`; `None` if it is not an OTR recording.
    pub fn from_url(url: &str) -> Option<Self> {
        let without_query = url.split(['?', '#']).next().unwrap_or(url);
        let segment = without_query.rsplit('/').next()?;
        let rest = segment.trim_start_matches(|c: char| c.is_ascii_digit());
        Self::from_name(rest.strip_prefix('_').unwrap_or(rest))
    }

    /// Parses `<name>_TVOON_DE.<format>` with the queue prefix already
    /// removed, as in `Link::derived_name`.
    pub fn from_name(rest: &str) -> Option<Self> {
        let marker_dot = format!("{}.", RECORDING_MARKER);
        let at = rest.rfind(&marker_dot)?;
        if at == 0 {
            return None;
        }
        let name_end = at + RECORDING_MARKER.len();
        Some(Recording {
            filename: rest.to_string(),
            name: rest[..name_end].to_string(),
            format: rest[name_end + 1..].to_string(),
        })
    }

    /// The full thumbnail set, in table order. Each image is saved as the
    /// recording filename plus the suffix so it sorts next to the video.
    pub fn thumbnails(&self, prefix: &str) -> Vec<Thumbnail> {
        THUMBNAIL_SUFFIXES
            .iter()
            .map(|(key, suffix)| Thumbnail {
                key: *key,
                url: format!("{}{}{}", prefix, self.name, suffix),
                filename: format!("{}{}", self.filename, suffix),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str =
        "http://dl12.homeloadtv.com/files/4711_Tatort_14.01.05_20-15_ard_90_TVOON_DE.mpg.HQ.avi";

    #[test]
    fn parses_recording_url() {
        let r = Recording::from_url(URL).unwrap();
        assert_eq!(r.filename, "Tatort_14.01.05_20-15_ard_90_TVOON_DE.mpg.HQ.avi");
        assert_eq!(r.name, "Tatort_14.01.05_20-15_ard_90_TVOON_DE");
        assert_eq!(r.format, "mpg.HQ.avi");
    }

    #[test]
    fn prefix_without_underscore_or_digits() {
        let r = Recording::from_url("http://x/Show_TVOON_DE.mpg.avi").unwrap();
        assert_eq!(r.filename, "Show_TVOON_DE.mpg.avi");
        let r = Recording::from_url("http://x/12Show_TVOON_DE.mp4?sig=1").unwrap();
        assert_eq!(r.filename, "Show_TVOON_DE.mp4");
        assert_eq!(r.format, "mp4");
    }

    #[test]
    fn from_name_keeps_leading_digits() {
        let r = Recording::from_name("24_Stunden_TVOON_DE.mpg.avi").unwrap();
        assert_eq!(r.filename, "24_Stunden_TVOON_DE.mpg.avi");
        assert_eq!(r.name, "24_Stunden_TVOON_DE");
        assert_eq!(Recording::from_name("notes.txt"), None);
    }

    #[test]
    fn non_recordings_are_rejected() {
        assert_eq!(Recording::from_url("http://example.com/file.zip"), None);
        assert_eq!(Recording::from_url("http://example.com/_TVOON_DE.avi"), None);
        assert_eq!(Recording::from_url("http://example.com/Show_TVOON_DE"), None);
    }

    #[test]
    fn thumbnail_set_is_fixed() {
        let r = Recording::from_url(URL).unwrap();
        let thumbs = r.thumbnails(DEFAULT_THUMBNAIL_PREFIX);
        assert_eq!(thumbs.len(), 12);
        let keys: String = thumbs.iter().map(|t| t.key).collect();
        assert_eq!(keys, "AB0123456789");
        assert_eq!(
            thumbs[0].url,
            "http://thumbs.onlinetvrecorder.com/Tatort_14.01.05_20-15_ard_90_TVOON_DE____A.jpg"
        );
        assert_eq!(
            thumbs[11].filename,
            "Tatort_14.01.05_20-15_ard_90_TVOON_DE.mpg.HQ.avi____9.jpg"
        );
    }
}
