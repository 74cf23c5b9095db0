use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;

use super::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
    /// Script runtime yt-dlp uses for site-specific JavaScript
    JsRuntime,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
            ToolType::JsRuntime => "js-runtime",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::Ffmpeg => "-version", // ffmpeg has no --version
            _ => "--version",
        }
    }
}

/// Resolved executables for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    /// Runtime name (`node`, `deno`, ...) and where it was found.
    /// yt-dlp gets both as `--js-runtimes name:path`.
    pub js_runtime: Option<(String, PathBuf)>,
}

pub struct ToolManager {
    tools: Vec<(ToolType, String)>,
}

impl ToolManager {
    pub fn new(config: &Config) -> Self {
        let mut tools = vec![
            (ToolType::YtDlp, config.ytdlp.clone()),
            (ToolType::Ffmpeg, config.ffmpeg.clone()),
        ];
        if let Some(runtime) = &config.js_runtime {
            tools.push((ToolType::JsRuntime, runtime.clone()));
        }
        Self { tools }
    }

    /// Resolve every configured tool, reporting all missing ones together.
    pub fn require_all(&self) -> Result<Toolchain> {
        let mut missing = Vec::new();
        let mut ytdlp = None;
        let mut ffmpeg = None;
        let mut js_runtime = None;

        for (tool_type, name) in &self.tools {
            let Some(path) = Self::detect_tool(name) else {
                tracing::warn!(tool = tool_type.as_str(), name = %name, "not found on PATH");
                missing.push(name.clone());
                continue;
            };

            if tracing::enabled!(tracing::Level::DEBUG) {
                let version = Self::version(&path, *tool_type);
                tracing::debug!(
                    tool = tool_type.as_str(),
                    path = %path.display(),
                    version = version.as_deref().unwrap_or("unknown"),
                    "resolved tool"
                );
            }

            match tool_type {
                ToolType::YtDlp => ytdlp = Some(path),
                ToolType::Ffmpeg => ffmpeg = Some(path),
                ToolType::JsRuntime => js_runtime = Some((runtime_name(name), path)),
            }
        }

        match (ytdlp, ffmpeg) {
            (Some(ytdlp), Some(ffmpeg)) if missing.is_empty() => Ok(Toolchain {
                ytdlp,
                ffmpeg,
                js_runtime,
            }),
            _ => Err(Error::MissingDependency { tools: missing }),
        }
    }

    /// Look the binary up on PATH; names containing a separator are checked as paths.
    fn detect_tool(name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    /// First line of the tool's version output.
    pub fn version(path: &Path, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string()),
            _ => None,
        }
    }
}

/// `/opt/node/bin/node` and `node.exe` both name the `node` runtime.
fn runtime_name(configured: &str) -> String {
    Path::new(configured)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| configured.to_string())
}
