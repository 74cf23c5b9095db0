//! Runtime configuration, read from `YTMUX_*` environment variables.
//!
//! There is no config file. Every field has a default that matches running
//! `ytmux` from a shell with yt-dlp, ffmpeg and node on `PATH`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::downloader::{Error, Result};

const VIDEO_SORT_FIELDS: &[&str] = &[
    "+res",
    "+vbr",
    "+tbr",
    "vext:webm",
    "vext:mp4",
    "vcodec:av01",
    "vcodec:vp9",
    "vcodec:avc1",
];

const AUDIO_SORT_FIELDS: &[&str] = &[
    "+abr",
    "+asr",
    "aext:webm",
    "aext:m4a",
    "acodec:opus",
    "acodec:aac",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// yt-dlp executable name or path
    pub ytdlp: String,
    /// ffmpeg executable, also handed to yt-dlp as `--ffmpeg-location`
    pub ffmpeg: String,
    /// JavaScript runtime for yt-dlp's site logic; `None` skips it
    pub js_runtime: Option<String>,
    pub output_dir: PathBuf,
    /// yt-dlp output template, relative to `output_dir`
    pub output_template: String,
    pub concurrent_fragments: u32,
    /// `-S` fields used when probing
    pub format_sort: Vec<String>,
    /// Only show video variants with these heights (empty = all)
    pub heights: Vec<u32>,
    pub socket_timeout: Option<u32>,
    pub merge_format: Option<String>,
    /// Also write the format table to this file
    pub report_path: Option<PathBuf>,
    /// Invalid ids accepted per prompt before giving up
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            js_runtime: Some("node".to_string()),
            output_dir: PathBuf::from("videos"),
            output_template: "%(title)s.%(ext)s".to_string(),
            concurrent_fragments: 4,
            format_sort: VIDEO_SORT_FIELDS
                .iter()
                .chain(AUDIO_SORT_FIELDS)
                .map(|s| s.to_string())
                .collect(),
            heights: Vec::new(),
            socket_timeout: None,
            merge_format: None,
            report_path: None,
            max_attempts: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = get("YTMUX_YT_DLP") {
            config.ytdlp = v;
        }
        if let Some(v) = get("YTMUX_FFMPEG") {
            config.ffmpeg = v;
        }
        if let Some(v) = get("YTMUX_JS_RUNTIME") {
            config.js_runtime = (!v.eq_ignore_ascii_case("none")).then_some(v);
        }
        if let Some(v) = get("YTMUX_OUTPUT_DIR") {
            config.output_dir = expand_home(&v);
        }
        if let Some(v) = get("YTMUX_OUTPUT_TEMPLATE") {
            config.output_template = v;
        }
        if let Some(v) = get("YTMUX_CONCURRENT_FRAGMENTS") {
            config.concurrent_fragments = parse_positive("YTMUX_CONCURRENT_FRAGMENTS", &v)?;
        }
        if let Some(v) = get("YTMUX_FORMAT_SORT") {
            config.format_sort = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("YTMUX_HEIGHTS") {
            config.heights = v
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| parse_positive("YTMUX_HEIGHTS", s.trim_end_matches('p')))
                .collect::<Result<_>>()?;
        }
        if let Some(v) = get("YTMUX_SOCKET_TIMEOUT") {
            config.socket_timeout = Some(parse_positive("YTMUX_SOCKET_TIMEOUT", &v)?);
        }
        if let Some(v) = get("YTMUX_MERGE_FORMAT") {
            config.merge_format = Some(v);
        }
        if let Some(v) = get("YTMUX_REPORT") {
            config.report_path = Some(expand_home(&v));
        }
        if let Some(v) = get("YTMUX_MAX_ATTEMPTS") {
            config.max_attempts = parse_positive("YTMUX_MAX_ATTEMPTS", &v)?;
        }

        Ok(config)
    }

    /// Full `-o` value handed to yt-dlp.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_template)
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(Error::Config(format!(
            "{} must be a positive integer, got {:?}",
            key, value
        ))),
    }
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| Path::new(value).to_path_buf()),
        None => PathBuf::from(value),
    }
}
