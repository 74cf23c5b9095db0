// Extractor trait - the seam between the workflow and the media tooling

use async_trait::async_trait;
use std::path::Path;

use super::errors::Result;
use super::models::{ProgressEvent, Selection, StreamVariant};

/// Callback receiving progress while a download runs
pub type ProgressSink<'a> = &'a mut (dyn FnMut(ProgressEvent) + Send);

/// Lists the streams behind a URL and downloads a chosen pair of them.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Fetch the stream variants for `url`, in the order the site reports them.
    async fn probe(&self, url: &str) -> Result<Vec<StreamVariant>>;

    /// Download the selected streams and merge them into `output_path`
    /// (a yt-dlp output template).
    async fn download_and_merge(
        &self,
        url: &str,
        selection: &Selection,
        output_path: &Path,
        progress: ProgressSink<'_>,
    ) -> Result<()>;
}
