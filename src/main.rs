use tablegate::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    // Flushes buffered log lines on exit.
    let _log_guard = init_logging(&LogConfig::from_env())?;
    tablegate::cli::run_cli()
}
