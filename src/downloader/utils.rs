// Subprocess helpers shared by the yt-dlp extractor

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};

/// Why a subprocess run did not produce an exit status
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The binary could not be executed at all
    #[error("failed to start: {0}")]
    Spawn(#[source] std::io::Error),

    /// The child started but its pipes or exit status could not be read
    #[error("lost contact with the process: {0}")]
    Io(#[source] std::io::Error),
}

fn spawn_piped<I, S>(program: &Path, args: I) -> Result<Child, RunError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunError::Spawn)
}

/// Run a command to completion, capturing stdout and stderr.
///
/// Both pipes are drained concurrently so a chatty stderr cannot block
/// the child while stdout is still being read. The child is killed if the
/// returned future is dropped.
pub async fn run_output<I, S>(program: &Path, args: I) -> Result<Output, RunError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = spawn_piped(program, args)?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let (out_res, err_res, status) = tokio::join!(
        stdout_pipe.read_to_end(&mut stdout),
        stderr_pipe.read_to_end(&mut stderr),
        child.wait(),
    );
    out_res.map_err(RunError::Io)?;
    err_res.map_err(RunError::Io)?;

    Ok(Output {
        status: status.map_err(RunError::Io)?,
        stdout,
        stderr,
    })
}

/// Run a command, handing each stdout line to `on_line` as it arrives.
///
/// Lines are decoded lossily, so a title in a non-UTF-8 code page shows up
/// with replacement characters instead of ending the read. Stderr is
/// collected and returned alongside the exit status.
pub async fn run_streaming<I, S, F>(
    program: &Path,
    args: I,
    mut on_line: F,
) -> Result<(ExitStatus, String), RunError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    F: FnMut(&str),
{
    let mut child = spawn_piped(program, args)?;

    let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

    let stderr_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        let mut collected = Vec::new();
        while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut buf).await {
            tracing::debug!(target: "ytmux::yt_dlp", "{}", line);
            collected.push(line);
        }
        collected.join("\n")
    });

    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    while let Some(line) = read_line_lossy(&mut reader, &mut buf)
        .await
        .map_err(RunError::Io)?
    {
        on_line(&line);
    }

    let status = child.wait().await.map_err(RunError::Io)?;
    let stderr_output = stderr_task.await.unwrap_or_default();

    Ok((status, stderr_output))
}

/// Next `\n`-terminated line without its line ending; `None` at EOF.
async fn read_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

fn missing_pipe(name: &str) -> RunError {
    RunError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("failed to capture {}", name),
    ))
}
