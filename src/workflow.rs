//! The interactive pipeline: URL prompt, probe, table, stream selection,
//! confirmation and download.
//!
//! Input and output are generic so the whole conversation can be scripted
//! in tests.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::Config;
use crate::downloader::{
    Error, Extractor, ProgressEvent, Result, Selection, SelectionError, Slot, StreamKind,
    StreamVariant,
};
use crate::table;

/// How a run ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// yt-dlp finished; `path` is the last file it reported writing
    Downloaded { path: Option<PathBuf> },
    /// The user answered no at the confirmation prompt
    Declined,
}

pub struct Workflow<'a, R, W> {
    config: &'a Config,
    extractor: &'a dyn Extractor,
    input: R,
    output: W,
}

impl<'a, R, W> Workflow<'a, R, W>
where
    R: BufRead,
    W: Write + Send,
{
    pub fn new(config: &'a Config, extractor: &'a dyn Extractor, input: R, output: W) -> Self {
        Self {
            config,
            extractor,
            input,
            output,
        }
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        let url = self.prompt_url()?;

        writeln!(self.output, "Fetching available streams...")?;
        let variants = self.extractor.probe(&url).await?;
        let shown = filter_heights(variants, &self.config.heights);
        tracing::info!(url = %url, shown = shown.len(), "rendering stream table");

        let rendered = table::render(&shown);
        writeln!(self.output)?;
        write!(self.output, "{}", rendered)?;
        writeln!(self.output)?;

        if let Some(report) = &self.config.report_path {
            write_report(report, &url, &rendered)?;
            writeln!(self.output, "Stream table saved to {}", report.display())?;
        }

        let selection = Selection {
            video_id: self.prompt_id(Slot::Video, &shown)?,
            audio_id: self.prompt_id(Slot::Audio, &shown)?,
        };
        let Some(format) = selection.format_expression() else {
            return Err(SelectionError::NothingSelected.into());
        };

        writeln!(self.output, "Selected format: {}", format)?;
        if !self.confirm("Start download? [y/N] ")? {
            writeln!(self.output, "Download cancelled.")?;
            return Ok(Outcome::Declined);
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let output_path = self.config.output_path();
        let path = self.download(&url, &selection, &output_path).await?;

        match &path {
            Some(p) => writeln!(self.output, "Saved to {}", p.display())?,
            None => writeln!(self.output, "Download complete.")?,
        }
        Ok(Outcome::Downloaded { path })
    }

    /// Run the download, printing progress; Ctrl-C drops (and kills) the child.
    async fn download(
        &mut self,
        url: &str,
        selection: &Selection,
        output_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let extractor = self.extractor;
        let output = &mut self.output;
        let mut final_path = None;

        let mut on_progress = |event: ProgressEvent| {
            if let Some(p) = event.path() {
                final_path = Some(p.clone());
            }
            // A closed stdout must not abort the download itself.
            let _ = writeln!(output, "{}", event);
        };

        tracing::debug!(extractor = extractor.name(), "starting download");
        tokio::select! {
            res = extractor.download_and_merge(url, selection, output_path, &mut on_progress) => {
                res?
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, stopping yt-dlp");
                return Err(Error::Interrupted);
            }
        }

        Ok(final_path)
    }

    /// Print `message` and read one trimmed line; `None` at end of input.
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_url(&mut self) -> Result<String> {
        loop {
            let Some(answer) = self.prompt("Video URL: ")? else {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "no URL entered",
                )));
            };
            if answer.is_empty() {
                continue;
            }
            match validate_url(&answer) {
                Ok(()) => return Ok(answer),
                Err(reason) => writeln!(self.output, "Invalid URL: {}", reason)?,
            }
        }
    }

    /// Read a stream id for `slot`. Blank means none; an invalid id is
    /// reported and asked again until `max_attempts` is used up.
    fn prompt_id(&mut self, slot: Slot, variants: &[StreamVariant]) -> Result<Option<String>> {
        let message = match slot {
            Slot::Video => "Video stream ID (blank to skip): ",
            Slot::Audio => "Audio stream ID (blank to skip): ",
        };

        let mut last_error = None;
        for _ in 0..self.config.max_attempts {
            let Some(answer) = self.prompt(message)? else {
                break;
            };
            if answer.is_empty() {
                return Ok(None);
            }

            match check_id(&answer, slot, variants) {
                Ok(()) => return Ok(Some(answer)),
                Err(e) => {
                    writeln!(self.output, "{}", Error::from(e.clone()))?;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(SelectionError::NothingSelected).into())
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        Ok(self
            .prompt(message)?
            .is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes")))
    }
}

/// Accept only absolute http(s) URLs with a host.
fn validate_url(input: &str) -> std::result::Result<(), String> {
    let url = Url::parse(input).map_err(|e| e.to_string())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme \"{}\"", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}

fn check_id(
    id: &str,
    slot: Slot,
    variants: &[StreamVariant],
) -> std::result::Result<(), SelectionError> {
    let variant = variants
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| SelectionError::UnknownId {
            id: id.to_string(),
            slot,
        })?;

    let accepted = match slot {
        Slot::Video => matches!(variant.kind, StreamKind::Video | StreamKind::Combined),
        Slot::Audio => variant.kind == StreamKind::Audio,
    };
    if accepted {
        Ok(())
    } else {
        Err(SelectionError::WrongKind {
            id: id.to_string(),
            slot,
            actual: variant.kind,
        })
    }
}

/// Hide variants carrying video whose height is not listed; audio always stays.
fn filter_heights(variants: Vec<StreamVariant>, heights: &[u32]) -> Vec<StreamVariant> {
    if heights.is_empty() {
        return variants;
    }
    variants
        .into_iter()
        .filter(|v| {
            v.kind == StreamKind::Audio || v.quality.height().is_some_and(|h| heights.contains(&h))
        })
        .collect()
}

fn write_report(path: &Path, url: &str, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n\n{}", url, rendered))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{BlockingReason, FileSize, ProgressSink, Quality};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const URL: &str = "https://www.youtube.com/watch?v=abc123";

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        url: String,
        selection: Selection,
        output_path: PathBuf,
    }

    /// Returns canned variants and records every download request.
    #[derive(Default)]
    struct RecordingExtractor {
        variants: Vec<StreamVariant>,
        probe_error: Option<String>,
        download_error: Option<String>,
        probes: Mutex<Vec<String>>,
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingExtractor {
        fn with_variants(variants: Vec<StreamVariant>) -> Self {
            Self {
                variants,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Extractor for RecordingExtractor {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn probe(&self, url: &str) -> Result<Vec<StreamVariant>> {
            self.probes.lock().unwrap().push(url.to_string());
            match &self.probe_error {
                Some(stderr) => Err(Error::extraction(url, stderr)),
                None => Ok(self.variants.clone()),
            }
        }

        async fn download_and_merge(
            &self,
            url: &str,
            selection: &Selection,
            output_path: &Path,
            progress: ProgressSink<'_>,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(Call {
                url: url.to_string(),
                selection: selection.clone(),
                output_path: output_path.to_path_buf(),
            });
            if let Some(stderr) = &self.download_error {
                return Err(Error::download(stderr, Some(1)));
            }
            progress(ProgressEvent::Merging {
                path: PathBuf::from("videos/Sample.mp4"),
            });
            progress(ProgressEvent::Finished);
            Ok(())
        }
    }

    fn variant(id: &str, kind: StreamKind, height: Option<u32>) -> StreamVariant {
        StreamVariant {
            id: id.to_string(),
            kind,
            extension: if kind == StreamKind::Audio { "m4a" } else { "mp4" }.to_string(),
            quality: match height {
                Some(height) => Quality::Resolution {
                    width: None,
                    height,
                    fps: None,
                },
                None => Quality::Bitrate { kbps: 128.0 },
            },
            codec: "codec".to_string(),
            size: Some(FileSize::Exact(1_048_576)),
            note: None,
        }
    }

    fn sample_variants() -> Vec<StreamVariant> {
        vec![
            variant("137", StreamKind::Video, Some(1080)),
            variant("136", StreamKind::Video, Some(720)),
            variant("140", StreamKind::Audio, None),
            variant("18", StreamKind::Combined, Some(360)),
        ]
    }

    fn test_config(dir: &Path) -> Config {
        Config {
            output_dir: dir.join("videos"),
            ..Config::default()
        }
    }

    async fn run_script(
        config: &Config,
        extractor: &RecordingExtractor,
        input: &str,
    ) -> (Result<Outcome>, String) {
        let mut output = Vec::new();
        let result = Workflow::new(config, extractor, input.as_bytes(), &mut output)
            .run()
            .await;
        (result, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_video_and_audio_download() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n140\nyes\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert_eq!(
            result.unwrap(),
            Outcome::Downloaded {
                path: Some(PathBuf::from("videos/Sample.mp4"))
            }
        );
        assert_eq!(
            extractor.calls(),
            vec![Call {
                url: URL.to_string(),
                selection: Selection {
                    video_id: Some("137".to_string()),
                    audio_id: Some("140".to_string()),
                },
                output_path: config.output_path(),
            }]
        );
        assert!(config.output_dir.is_dir());
        assert!(output.contains("Selected format: 137+140"));
        assert!(output.contains("Saved to videos/Sample.mp4"));
    }

    #[tokio::test]
    async fn test_blank_audio_downloads_video_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n\nY\n", URL);
        let (result, _) = run_script(&config, &extractor, &input).await;

        assert!(matches!(result, Ok(Outcome::Downloaded { .. })));
        let calls = extractor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].selection.video_id.as_deref(), Some("137"));
        assert_eq!(calls[0].selection.audio_id, None);
    }

    #[tokio::test]
    async fn test_unknown_id_aborts_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            max_attempts: 1,
            ..test_config(dir.path())
        };
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n999\n140\nyes\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert!(matches!(
            result,
            Err(Error::InvalidSelection(SelectionError::UnknownId {
                ref id,
                slot: Slot::Video
            })) if id == "999"
        ));
        assert!(output.contains("no stream with id \"999\""));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_id_is_asked_again() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n999\n137\n137\n140\nyes\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert!(result.is_ok());
        assert!(output.contains("no stream with id \"999\" was listed for video"));
        assert!(output.contains("stream \"137\" is video, not usable as audio"));
        assert_eq!(
            extractor.calls()[0].selection,
            Selection {
                video_id: Some("137".to_string()),
                audio_id: Some("140".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            max_attempts: 2,
            ..test_config(dir.path())
        };
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n18\n137\n140\nyes\n", URL);
        let (result, _) = run_script(&config, &extractor, &input).await;

        assert!(matches!(
            result,
            Err(Error::InvalidSelection(SelectionError::WrongKind {
                slot: Slot::Audio,
                actual: StreamKind::Video,
                ..
            }))
        ));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_probe_error_skips_selection() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor {
            probe_error: Some("ERROR: [youtube] abc123: Video unavailable".to_string()),
            ..Default::default()
        };

        let input = format!("{}\n137\n140\nyes\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert!(matches!(result, Err(Error::Extraction { .. })));
        assert!(!output.contains("stream ID"));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_download_error_reaches_caller() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor {
            variants: sample_variants(),
            download_error: Some(
                "ERROR: [youtube] abc123: Requested format is not available".to_string(),
            ),
            ..Default::default()
        };

        let input = format!("{}\n137\n140\nyes\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            Error::Download {
                status: Some(1),
                reason: Some(BlockingReason::FormatUnavailable),
                ..
            }
        ));
        assert_eq!(extractor.calls().len(), 1);
        assert!(!output.contains("Saved to"));
    }

    #[tokio::test]
    async fn test_declined_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n140\nno\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert_eq!(result.unwrap(), Outcome::Declined);
        assert!(output.contains("Download cancelled."));
        assert!(extractor.calls().is_empty());
        assert!(!config.output_dir.exists());
    }

    #[tokio::test]
    async fn test_end_of_input_at_confirmation_declines() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n140\n", URL);
        let (result, _) = run_script(&config, &extractor, &input).await;

        assert_eq!(result.unwrap(), Outcome::Declined);
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_variants_still_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(Vec::new());

        let input = format!("{}\n\n\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert!(output.contains("(none)"));
        assert!(output.contains("Video stream ID"));
        assert!(output.contains("Audio stream ID"));
        assert!(matches!(
            result,
            Err(Error::InvalidSelection(SelectionError::NothingSelected))
        ));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_urls_are_asked_again() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("\nnot a url\nftp://example.com/v\n{}\n137\n\nyes\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert!(result.is_ok());
        assert_eq!(output.matches("Invalid URL").count(), 2);
        assert_eq!(*extractor.probes.lock().unwrap(), vec![URL.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_url_is_eof_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let extractor = RecordingExtractor::default();

        let (result, _) = run_script(&config, &extractor, "").await;

        assert!(matches!(
            result,
            Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof
        ));
    }

    #[tokio::test]
    async fn test_height_filter_hides_unlisted_video() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            heights: vec![720],
            max_attempts: 1,
            ..test_config(dir.path())
        };
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n", URL);
        let (result, output) = run_script(&config, &extractor, &input).await;

        assert!(output.contains("136"));
        assert!(output.contains("140"));
        assert!(matches!(
            result,
            Err(Error::InvalidSelection(SelectionError::UnknownId { .. }))
        ));
    }

    #[tokio::test]
    async fn test_report_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("reports/formats.txt");
        let config = Config {
            report_path: Some(report.clone()),
            ..test_config(dir.path())
        };
        let extractor = RecordingExtractor::with_variants(sample_variants());

        let input = format!("{}\n137\n140\nn\n", URL);
        let (result, _) = run_script(&config, &extractor, &input).await;

        assert_eq!(result.unwrap(), Outcome::Declined);
        let contents = std::fs::read_to_string(&report).unwrap();
        assert!(contents.starts_with(URL));
        assert!(contents.contains("VIDEO"));
        assert!(contents.contains("137"));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://youtu.be/abc123").is_ok());
        assert!(validate_url("http://example.com/video").is_ok());
        assert!(validate_url("youtu.be/abc123").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_combined_accepted_for_video_only() {
        let variants = sample_variants();
        assert!(check_id("18", Slot::Video, &variants).is_ok());
        assert_eq!(
            check_id("18", Slot::Audio, &variants),
            Err(SelectionError::WrongKind {
                id: "18".to_string(),
                slot: Slot::Audio,
                actual: StreamKind::Combined,
            })
        );
    }
}
