use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "chat_input_tui=info,chat_input_cli=info";
const LOG_FILE_NAME: &str = "chat-input.log";

/// Sends `tracing` output to `<log_dir>/chat-input.log`. The terminal belongs
/// to the UI, so nothing is logged to stdout or stderr.
///
/// Keep the returned guard alive until exit; dropping it flushes the writer.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }
    let log_path = log_dir.join(LOG_FILE_NAME);
    let log_file = log_file_opts
        .open(&log_path)
        .with_context(|| format!("open {}", log_path.display()))?;

    let (writer, guard) = non_blocking(log_file);

    // RUST_LOG wins over the default filter.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(guard)
}
