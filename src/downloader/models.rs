// Common data models for the extraction adapter

use std::fmt;
use std::path::PathBuf;

/// Media kind of a stream variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Video track without audio
    Video,
    /// Audio track without video
    Audio,
    /// Already-muxed video + audio
    Combined,
}

impl StreamKind {
    /// Classify from yt-dlp codec fields, where `"none"` means absent.
    /// Returns `None` for entries carrying neither (storyboards, thumbnails).
    pub fn from_codecs(vcodec: Option<&str>, acodec: Option<&str>) -> Option<Self> {
        let has = |c: Option<&str>| c.is_some_and(|c| c != "none" && !c.is_empty());

        match (has(vcodec), has(acodec)) {
            (true, true) => Some(Self::Combined),
            (true, false) => Some(Self::Video),
            (false, true) => Some(Self::Audio),
            (false, false) => None,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Combined => write!(f, "video+audio"),
        }
    }
}

/// Resolution-or-bitrate descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum Quality {
    Resolution {
        width: Option<u32>,
        height: u32,
        fps: Option<f32>,
    },
    /// Audio bitrate in kbps
    Bitrate { kbps: f32 },
    Unknown,
}

impl Quality {
    pub fn height(&self) -> Option<u32> {
        match self {
            Self::Resolution { height, .. } => Some(*height),
            _ => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { width, height, fps } => {
                match width {
                    Some(w) => write!(f, "{}x{}", w, height)?,
                    None => write!(f, "{}p", height)?,
                }
                if let Some(fps) = fps {
                    write!(f, " {}fps", fps.round() as u32)?;
                }
                Ok(())
            }
            Self::Bitrate { kbps } => write!(f, "{}k", kbps.round() as u32),
            Self::Unknown => write!(f, "-"),
        }
    }
}

/// File size as reported by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSize {
    Exact(u64),
    /// Estimated from bitrate and duration
    Approx(u64),
}

impl FileSize {
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Exact(b) | Self::Approx(b) => *b,
        }
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Self::Approx(_) = self {
            write!(f, "~")?;
        }
        let mb = self.bytes() as f64 / 1_048_576.0;
        if mb >= 1024.0 {
            write!(f, "{:.1} GB", mb / 1024.0)
        } else {
            write!(f, "{:.0} MB", mb)
        }
    }
}

/// One downloadable track from a probe response
#[derive(Debug, Clone, PartialEq)]
pub struct StreamVariant {
    /// yt-dlp format_id, unique within one probe
    pub id: String,
    pub kind: StreamKind,
    pub extension: String,
    pub quality: Quality,
    /// Codec label, `vcodec+acodec` for combined variants
    pub codec: String,
    pub size: Option<FileSize>,
    /// yt-dlp format_note (e.g. "1080p", "medium")
    pub note: Option<String>,
}

/// Stream ids chosen by the user for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub video_id: Option<String>,
    pub audio_id: Option<String>,
}

impl Selection {
    /// yt-dlp `-f` expression: `V+A`, `V` or `A`.
    pub fn format_expression(&self) -> Option<String> {
        match (&self.video_id, &self.audio_id) {
            (Some(v), Some(a)) => Some(format!("{}+{}", v, a)),
            (Some(v), None) => Some(v.clone()),
            (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        }
    }
}

/// Structured progress parsed from yt-dlp `--newline` output
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A stream started downloading into this file
    Destination { path: PathBuf },
    Downloading {
        percent: f32,
        total: String,
        speed: Option<String>,
        eta: Option<String>,
        /// (current, total) fragments for HLS/DASH
        fragment: Option<(u32, u32)>,
    },
    /// ffmpeg is muxing the streams into the final file
    Merging { path: PathBuf },
    AlreadyDownloaded { path: PathBuf },
    /// yt-dlp exited successfully
    Finished,
}

impl ProgressEvent {
    /// File this event refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Destination { path }
            | Self::Merging { path }
            | Self::AlreadyDownloaded { path } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destination { path } => write!(f, "Downloading {}", path.display()),
            Self::Downloading {
                percent,
                total,
                speed,
                eta,
                fragment,
            } => {
                write!(f, "{:5.1}% of {}", percent, total)?;
                if let Some(speed) = speed {
                    write!(f, " at {}", speed)?;
                }
                if let Some(eta) = eta {
                    write!(f, " ETA {}", eta)?;
                }
                if let Some((current, count)) = fragment {
                    write!(f, " (frag {}/{})", current, count)?;
                }
                Ok(())
            }
            Self::Merging { path } => write!(f, "Merging video and audio into {}", path.display()),
            Self::AlreadyDownloaded { path } => {
                write!(f, "{} has already been downloaded", path.display())
            }
            Self::Finished => write!(f, "Download finished"),
        }
    }
}
