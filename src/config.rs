use crate::clock::Cadences;
use crate::visual::SceneConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "hexwave", version, about = "Audio-reactive hexagon grid, starfield and glow for the terminal")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = AudioSource::Mic)]
    pub source: AudioSource,

    /// Substring of the input device name (case-insensitive).
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    #[arg(long, default_value_t = 50.0, value_parser = parse_rate_hz)]
    pub rotate_hz: f32,

    #[arg(long, default_value_t = 10.0, value_parser = parse_rate_hz)]
    pub background_hz: f32,

    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..=32))]
    pub rings: u32,

    #[arg(long, default_value_t = 500.0)]
    pub star_margin: f32,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Treat the signal as silent when no update arrived for this long.
    #[arg(long, default_value_t = 500)]
    pub stall_ms: u64,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub status: bool,

    /// Write logs here (filtered by RUST_LOG, default info). Without it nothing is logged.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

const MIN_RATE_HZ: f32 = 0.01;
const MAX_RATE_HZ: f32 = 1000.0;

fn parse_rate_hz(s: &str) -> Result<f32, String> {
    let hz = s
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("invalid rate '{s}': {e}"))?;
    if !(MIN_RATE_HZ..=MAX_RATE_HZ).contains(&hz) {
        return Err(format!("rate must be within {MIN_RATE_HZ}..={MAX_RATE_HZ} Hz (got {s})"));
    }
    Ok(hz)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioSource {
    #[value(alias = "microphone", alias = "input")]
    Mic,
    #[value(alias = "synth")]
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
}

impl RendererMode {
    /// Pixels per terminal cell, horizontally and vertically.
    pub fn cell_pixels(self) -> (usize, usize) {
        match self {
            Self::Ascii => (1, 1),
            Self::HalfBlock => (1, 2),
            Self::Braille => (2, 4),
        }
    }
}

impl Config {
    pub fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            rings: self.rings,
            star_margin: self.star_margin.max(0.0),
            seed: self.seed,
            ..SceneConfig::default()
        }
    }

    pub fn cadences(&self) -> Cadences {
        Cadences {
            redraw_hz: self.fps as f32,
            rotate_hz: self.rotate_hz,
            background_hz: self.background_hz,
        }
    }
}
