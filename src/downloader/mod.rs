// Downloader module - yt-dlp adapter, tool detection and error types

pub mod diagnostics;
pub mod errors;
pub mod models;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod ytdlp;

pub use diagnostics::{diagnose_error, BlockingReason};
pub use errors::{Error, Result, SelectionError, Slot};
pub use models::{FileSize, ProgressEvent, Quality, Selection, StreamKind, StreamVariant};
pub use tools::{ToolManager, ToolType, Toolchain};
pub use traits::{Extractor, ProgressSink};
pub use ytdlp::YtDlp;
