use crate::downloader::{DownloadTarget, Fetcher};
use crate::link_source::{Link, LinkSource};
use crate::recording::Recording;

use super::{FailureKind, LinkFailure, Pipeline};

impl<'a, S: LinkSource, F: Fetcher> Pipeline<'a, S, F> {
    /// Fetches the full thumbnail set for `rec`. Failures are returned, never fatal.
    pub(super) fn fetch_thumbnails(&self, link: &Link, rec: &Recording) -> Vec<LinkFailure> {
        let settings = &self.settings;
        let mut failures = Vec::new();
        for thumb in rec.thumbnails(&settings.thumbnail_prefix) {
            let target = DownloadTarget::new(&thumb.url, &settings.directory)
                .with_filename(&thumb.filename)
                .with_mode(settings.thumbnail_mode);
            let (message, transfer) = match self.fetcher.fetch(&target) {
                Ok(r) if r.is_success() => continue,
                Ok(r) => (super::transfer_message(&r), Some(r)),
                Err(e) => (e.to_string(), None),
            };
            tracing::warn!(id = link.id, url = %thumb.url, "thumbnail failed: {}", message);
            failures.push(LinkFailure {
                link_id: link.id,
                url: thumb.url,
                kind: FailureKind::Thumbnail(thumb.key),
                message,
                transfer,
            });
        }
        failures
    }
}
