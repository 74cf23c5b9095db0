// yt-dlp `--newline` output parsing

use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;

use super::models::ProgressEvent;

lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    // [download] 100% of   10.00MiB in 00:00:03 at 3.01MiB/s
    static ref PROGRESS_RE: Regex = Regex::new(concat!(
        r"^\[download\]\s+(\d+(?:\.\d+)?)%\s+of\s+~?\s*(\S+)",
        r"(?:\s+in\s+\S+)?",
        r"(?:\s+at\s+(\S+))?",
        r"(?:\s+ETA\s+(\S+))?",
        r"(?:\s+\(frag\s+(\d+)/(\d+)\))?",
    ))
    .unwrap();
    static ref DEST_RE: Regex = Regex::new(r"^\[download\]\s+Destination:\s+(.+)$").unwrap();
    static ref MERGE_RE: Regex =
        Regex::new(r#"^\[Merger\]\s+Merging formats into\s+"(.+)"$"#).unwrap();
    static ref ALREADY_RE: Regex =
        Regex::new(r"^\[download\]\s+(.+?) has already been downloaded").unwrap();
}

/// Parse one line of yt-dlp stdout into a progress event.
///
/// Lines that carry no progress information (extractor chatter, `[info]`)
/// return `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim_end();

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let total = caps.get(2)?.as_str().to_string();
        let known = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str())
                .filter(|s| !s.starts_with("Unknown"))
                .map(str::to_string)
        };
        let fragment = match (caps.get(5), caps.get(6)) {
            (Some(c), Some(t)) => c.as_str().parse().ok().zip(t.as_str().parse().ok()),
            _ => None,
        };

        return Some(ProgressEvent::Downloading {
            percent,
            total,
            speed: known(3),
            eta: known(4),
            fragment,
        });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        return Some(ProgressEvent::Destination {
            path: PathBuf::from(caps.get(1)?.as_str()),
        });
    }

    if let Some(caps) = MERGE_RE.captures(line) {
        return Some(ProgressEvent::Merging {
            path: PathBuf::from(caps.get(1)?.as_str()),
        });
    }

    if let Some(caps) = ALREADY_RE.captures(line) {
        return Some(ProgressEvent::AlreadyDownloaded {
            path: PathBuf::from(caps.get(1)?.as_str()),
        });
    }

    None
}
