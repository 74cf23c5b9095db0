// Failure diagnostics - maps yt-dlp stderr text to a reason and a hint

/// Why yt-dlp refused a probe or download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingReason {
    /// Server answered 403
    Http403Forbidden,
    /// Needs a signed-in, age-verified account
    AgeRestricted,
    GeoBlocked,
    /// Timeout, refused connection or DNS failure
    NetworkTimeout,
    /// HTTP 429 or an explicit rate-limit message
    RateLimited,
    /// "Confirm you're not a bot" / captcha pages
    BotDetection,
    PrivateVideo,
    /// Removed by the uploader or the site
    VideoUnavailable,
    DrmProtected,
    /// No yt-dlp extractor matches the URL
    UnsupportedUrl,
    /// A selected format id no longer resolves
    FormatUnavailable,
    Unknown,
}

impl BlockingReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Forbidden (HTTP 403)",
            Self::AgeRestricted => "Age-restricted video",
            Self::GeoBlocked => "Blocked in this region",
            Self::NetworkTimeout => "Network error",
            Self::RateLimited => "Too many requests",
            Self::BotDetection => "Bot check triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected media",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::FormatUnavailable => "Requested format not available",
            Self::Unknown => "Unrecognised yt-dlp failure",
        }
    }

    /// One-line suggestion for the terminal
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Update yt-dlp, or retry later from a different network.",
            Self::AgeRestricted => {
                "The video needs a signed-in account; yt-dlp cookies are required."
            }
            Self::GeoBlocked => "The video is not available in your region.",
            Self::NetworkTimeout => "Check your internet connection and try again.",
            Self::RateLimited => "Wait a few minutes before trying again.",
            Self::BotDetection => "The site is asking for verification; try again later.",
            Self::PrivateVideo => "Only accounts granted access by the uploader can fetch it.",
            Self::VideoUnavailable => "The video was removed or made private.",
            Self::DrmProtected => "DRM-protected media cannot be downloaded.",
            Self::UnsupportedUrl => "Check the URL; yt-dlp has no extractor for it.",
            Self::FormatUnavailable => {
                "The stream list changed; run again and pick from the new list."
            }
            Self::Unknown => "Run with RUST_LOG=ytmux=debug for the full yt-dlp output.",
        }
    }
}

// Checked top to bottom, first match wins. Specific messages come before the
// bare status codes because yt-dlp often prints both.
const PATTERNS: &[(BlockingReason, &[&str])] = &[
    (BlockingReason::UnsupportedUrl, &["unsupported url", "is not a valid url"]),
    (BlockingReason::FormatUnavailable, &["requested format is not available"]),
    (
        BlockingReason::DrmProtected,
        &["drm", "widevine", "playready", "fairplay", "encrypted media"],
    ),
    (
        BlockingReason::AgeRestricted,
        &["age-restricted", "sign in to confirm your age", "age_verification"],
    ),
    (
        BlockingReason::PrivateVideo,
        &["private video", "video is private", "sign in if you've been granted access"],
    ),
    (
        BlockingReason::VideoUnavailable,
        &[
            "video unavailable",
            "video is unavailable",
            "video has been removed",
            "no longer available",
        ],
    ),
    (
        BlockingReason::GeoBlocked,
        &[
            "not available in your country",
            "blocked in your country",
            "geo-restrict",
            "geo restrict",
        ],
    ),
    (BlockingReason::RateLimited, &["429", "rate limit", "too many requests"]),
    (BlockingReason::BotDetection, &["not a bot", "captcha", "unusual traffic"]),
    (BlockingReason::Http403Forbidden, &["403", "forbidden"]),
    (
        BlockingReason::NetworkTimeout,
        &[
            "timed out",
            "timeout",
            "connection refused",
            "network unreachable",
            "name or service not known",
            "failed to resolve",
        ],
    ),
];

/// Classify yt-dlp stderr. Non-empty output that matches nothing is
/// `Unknown`; empty output gives `None`.
pub fn diagnose_error(stderr: &str) -> Option<BlockingReason> {
    if stderr.trim().is_empty() {
        return None;
    }

    let lower = stderr.to_lowercase();
    let reason = PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(reason, _)| *reason)
        .unwrap_or(BlockingReason::Unknown);

    Some(reason)
}
