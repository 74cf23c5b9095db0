// Error types for the extraction adapter and the interactive workflow

use std::fmt;

use super::diagnostics::{diagnose_error, BlockingReason};
use super::models::StreamKind;

/// Which prompt an identifier was entered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Video,
    Audio,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Why a user-entered stream id was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The id is not in the probed list at all
    #[error("no stream with id \"{id}\" was listed for {slot}")]
    UnknownId { id: String, slot: Slot },

    /// The id exists but is the wrong kind for this prompt
    #[error("stream \"{id}\" is {actual}, not usable as {slot}")]
    WrongKind {
        id: String,
        slot: Slot,
        actual: StreamKind,
    },

    /// Both prompts were left blank
    #[error("no video or audio stream selected")]
    NothingSelected,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// yt-dlp could not resolve the URL into a format list
    #[error("could not list streams for {url}: {message}")]
    Extraction {
        url: String,
        message: String,
        reason: Option<BlockingReason>,
    },

    /// The user picked an id that does not match the probed list
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    /// Required executables are not on PATH
    #[error("missing dependencies: {}", tools.join(", "))]
    MissingDependency { tools: Vec<String> },

    /// The fetch/merge subprocess failed
    #[error("download failed: {message}")]
    Download {
        message: String,
        reason: Option<BlockingReason>,
        status: Option<i32>,
    },

    /// Environment configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ctrl-C while a subprocess was running
    #[error("interrupted by user")]
    Interrupted,
}

impl Error {
    /// Build an extraction error from yt-dlp stderr, keeping the useful lines.
    pub fn extraction(url: &str, stderr: &str) -> Self {
        Self::Extraction {
            url: url.to_string(),
            message: summarize_stderr(stderr),
            reason: diagnose_error(stderr),
        }
    }

    /// Build a download error from yt-dlp stderr and its exit status.
    pub fn download(stderr: &str, status: Option<i32>) -> Self {
        let mut message = summarize_stderr(stderr);
        if let Some(code) = status {
            message = format!("yt-dlp exited with status {}: {}", code, message);
        }

        Self::Download {
            message,
            reason: diagnose_error(stderr),
            status,
        }
    }

    /// Diagnosed blocking reason, if the error came from yt-dlp output.
    pub fn reason(&self) -> Option<BlockingReason> {
        match self {
            Self::Extraction { reason, .. } | Self::Download { reason, .. } => *reason,
            _ => None,
        }
    }

    /// One-line suggestion shown under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingDependency { .. } => {
                Some("Install the missing tools and make sure they are on PATH.")
            }
            _ => self.reason().map(|r| r.hint()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Keep `ERROR:` lines when present, otherwise the last non-empty line.
fn summarize_stderr(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(|l| l.trim())
        .filter(|l| l.starts_with("ERROR:"))
        .take(3)
        .collect();

    if !important.is_empty() {
        return important.join(" | ");
    }

    stderr
        .lines()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
        .to_string()
}
