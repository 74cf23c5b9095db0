pub mod config;
pub mod downloader;
pub mod table;
pub mod workflow;

use std::io::BufReader;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use config::Config;
use downloader::{Error, ToolManager, YtDlp};
use workflow::{Outcome, Workflow};

const DEFAULT_LOG_FILTER: &str = "ytmux=warn";

/// Entry point for the `ytmux` binary. Errors are printed here and turned
/// into the exit status.
pub async fn run() -> ExitCode {
    init_tracing();

    match try_run().await {
        Ok(Outcome::Downloaded { .. }) | Ok(Outcome::Declined) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn try_run() -> downloader::Result<Outcome> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let toolchain = ToolManager::new(&config).require_all()?;
    let extractor = YtDlp::new(toolchain, &config);

    let mut workflow = Workflow::new(
        &config,
        &extractor,
        BufReader::new(std::io::stdin()),
        std::io::stdout(),
    );
    workflow.run().await
}

fn init_tracing() {
    // Logs go to stderr; stdout carries the prompts and the table.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: &Error) {
    eprintln!("error: {}", err);
    match (err.reason(), err.hint()) {
        (Some(reason), Some(hint)) => eprintln!("hint: {} - {}", reason.description(), hint),
        (None, Some(hint)) => eprintln!("hint: {}", hint),
        _ => {}
    }
}
