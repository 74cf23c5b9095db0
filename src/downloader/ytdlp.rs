// yt-dlp extractor - probes formats as JSON and runs the fetch/merge
//
// Format resolution and muxing stay inside yt-dlp and ffmpeg; this module
// only builds command lines, validates the JSON and forwards progress.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::errors::{Error, Result, SelectionError};
use super::models::{FileSize, ProgressEvent, Quality, Selection, StreamKind, StreamVariant};
use super::progress::parse_progress_line;
use super::tools::Toolchain;
use super::traits::{Extractor, ProgressSink};
use super::utils::{run_output, run_streaming, RunError};
use crate::config::Config;

/// Top-level `--dump-single-json` document; only `formats` is used.
#[derive(Debug, Deserialize)]
struct RawInfo {
    formats: Option<Vec<RawFormat>>,
}

/// One entry of the yt-dlp `formats` array, before validation
#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    abr: Option<f64>,
    tbr: Option<f64>,
    format_note: Option<String>,
}

impl RawFormat {
    /// `Ok(None)` for entries that carry no media (storyboards, mhtml).
    fn into_variant(self, url: &str, index: usize) -> Result<Option<StreamVariant>> {
        let id = match self.format_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => {
                return Err(Error::Extraction {
                    url: url.to_string(),
                    message: format!("format #{} has no format_id", index),
                    reason: None,
                })
            }
        };

        let vcodec = self.vcodec.as_deref();
        let acodec = self.acodec.as_deref();
        let Some(kind) = StreamKind::from_codecs(vcodec, acodec) else {
            tracing::trace!(format_id = %id, "skipping format without codecs");
            return Ok(None);
        };

        let codec = match kind {
            StreamKind::Video => vcodec.unwrap_or_default().to_string(),
            StreamKind::Audio => acodec.unwrap_or_default().to_string(),
            StreamKind::Combined => format!(
                "{}+{}",
                vcodec.unwrap_or_default(),
                acodec.unwrap_or_default()
            ),
        };

        let quality = match (self.height, kind) {
            (Some(height), StreamKind::Video | StreamKind::Combined) => Quality::Resolution {
                width: self.width,
                height,
                fps: self.fps.map(|f| f as f32),
            },
            (_, StreamKind::Audio) => match self.abr.or(self.tbr) {
                Some(kbps) if kbps > 0.0 => Quality::Bitrate { kbps: kbps as f32 },
                _ => Quality::Unknown,
            },
            _ => Quality::Unknown,
        };

        let size = match (self.filesize, self.filesize_approx) {
            (Some(exact), _) if exact > 0.0 => Some(FileSize::Exact(exact as u64)),
            (_, Some(approx)) if approx > 0.0 => Some(FileSize::Approx(approx as u64)),
            _ => None,
        };

        Ok(Some(StreamVariant {
            id,
            kind,
            extension: self.ext.unwrap_or_else(|| "?".to_string()),
            quality,
            codec,
            size,
            note: self.format_note.filter(|n| !n.is_empty()),
        }))
    }
}

/// Parse a `--dump-single-json` response into stream variants, keeping
/// yt-dlp's order.
pub fn parse_formats(url: &str, json: &[u8]) -> Result<Vec<StreamVariant>> {
    let info: RawInfo = serde_json::from_slice(json).map_err(|e| Error::Extraction {
        url: url.to_string(),
        message: format!("invalid JSON from yt-dlp: {}", e),
        reason: None,
    })?;

    let formats = info.formats.ok_or_else(|| Error::Extraction {
        url: url.to_string(),
        message: "yt-dlp response has no formats array".to_string(),
        reason: None,
    })?;

    let mut variants = Vec::with_capacity(formats.len());
    for (index, raw) in formats.into_iter().enumerate() {
        if let Some(variant) = raw.into_variant(url, index)? {
            variants.push(variant);
        }
    }

    Ok(variants)
}

/// Extractor backed by the `yt-dlp` binary
pub struct YtDlp {
    ytdlp: PathBuf,
    ffmpeg: PathBuf,
    /// `--js-runtimes` value, `name:path`
    js_runtime: Option<String>,
    format_sort: Vec<String>,
    socket_timeout: Option<u32>,
    concurrent_fragments: u32,
    merge_format: Option<String>,
}

impl YtDlp {
    pub fn new(toolchain: Toolchain, config: &Config) -> Self {
        Self {
            ytdlp: toolchain.ytdlp,
            ffmpeg: toolchain.ffmpeg,
            js_runtime: toolchain
                .js_runtime
                .map(|(name, path)| format!("{}:{}", name, path.display())),
            format_sort: config.format_sort.clone(),
            socket_timeout: config.socket_timeout,
            concurrent_fragments: config.concurrent_fragments,
            merge_format: config.merge_format.clone(),
        }
    }

    fn run_error_message(&self, err: &RunError) -> String {
        match err {
            RunError::Spawn(e) => format!("failed to start {}: {}", self.ytdlp.display(), e),
            RunError::Io(e) => format!("lost contact with {}: {}", self.ytdlp.display(), e),
        }
    }

    fn build_probe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];

        if !self.format_sort.is_empty() {
            args.push("--format-sort-force".to_string());
            args.push("-S".to_string());
            args.push(self.format_sort.join(","));
        }

        if let Some(runtime) = &self.js_runtime {
            args.push("--js-runtimes".to_string());
            args.push(runtime.clone());
        }

        if let Some(secs) = self.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(secs.to_string());
        }

        args.push(url.to_string());
        args
    }

    fn build_download_args(&self, url: &str, format: &str, output_path: &Path) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(runtime) = &self.js_runtime {
            args.push("--js-runtimes".to_string());
            args.push(runtime.clone());
        }

        args.extend([
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--concurrent-fragments".to_string(),
            self.concurrent_fragments.to_string(),
            "--ffmpeg-location".to_string(),
            self.ffmpeg.to_string_lossy().into_owned(),
        ]);

        if let Some(secs) = self.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(secs.to_string());
        }

        if let Some(merge) = &self.merge_format {
            args.push("--merge-output-format".to_string());
            args.push(merge.clone());
        }

        args.extend([
            "-f".to_string(),
            format.to_string(),
            "-o".to_string(),
            output_path.to_string_lossy().into_owned(),
            url.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Extractor for YtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<Vec<StreamVariant>> {
        let args = self.build_probe_args(url);
        tracing::debug!(program = %self.ytdlp.display(), ?args, "probing formats");

        let output = run_output(&self.ytdlp, &args)
            .await
            .map_err(|e| Error::Extraction {
                url: url.to_string(),
                message: self.run_error_message(&e),
                reason: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = ?output.status.code(), "yt-dlp probe failed");
            tracing::debug!(%stderr, "yt-dlp probe stderr");
            return Err(Error::extraction(url, &stderr));
        }

        let variants = parse_formats(url, &output.stdout)?;
        tracing::info!(count = variants.len(), "probed stream variants");
        Ok(variants)
    }

    async fn download_and_merge(
        &self,
        url: &str,
        selection: &Selection,
        output_path: &Path,
        progress: ProgressSink<'_>,
    ) -> Result<()> {
        let format = selection
            .format_expression()
            .ok_or(SelectionError::NothingSelected)?;
        let args = self.build_download_args(url, &format, output_path);
        tracing::debug!(program = %self.ytdlp.display(), ?args, "starting download");

        let (status, stderr) = run_streaming(&self.ytdlp, &args, |line| {
            if line.starts_with("[download]") || line.starts_with("[Merger]") {
                tracing::debug!(target: "ytmux::yt_dlp", "{}", line);
            }
            if let Some(event) = parse_progress_line(line) {
                progress(event);
            }
        })
        .await
        .map_err(|e| Error::Download {
            message: self.run_error_message(&e),
            reason: None,
            status: None,
        })?;

        if !status.success() {
            tracing::warn!(status = ?status.code(), format = %format, "yt-dlp download failed");
            return Err(Error::download(&stderr, status.code()));
        }

        progress(ProgressEvent::Finished);
        Ok(())
    }
}
