use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;

/// Routes `log` output to `path`. The terminal belongs to the visualizer, so
/// without a file nothing is installed and every record is dropped.
pub fn init(path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("install logger")?;
    log::info!("hexwave {} logging to {}", env!("CARGO_PKG_VERSION"), path.display());
    Ok(())
}
