use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = hexwave::config::Config::parse();
    if cfg.list_devices {
        hexwave::audio::list_input_devices()?;
        return Ok(());
    }

    hexwave::logging::init(cfg.log_file.as_deref())?;
    hexwave::app::run(cfg)
}
