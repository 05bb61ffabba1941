use clap::Parser;
use hexwave::config::{AudioSource, Config, RendererMode};
use std::path::PathBuf;

fn parse(args: &[&str]) -> Result<Config, clap::Error> {
    Config::try_parse_from(std::iter::once("hexwave").chain(args.iter().copied()))
}

#[test]
fn defaults() {
    let cfg = parse(&[]).unwrap();
    assert_eq!(cfg.source, AudioSource::Mic);
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.fps, 60);
    assert_eq!(cfg.rings, 6);
    assert_eq!(cfg.stall_ms, 500);
    assert!(cfg.sync_updates);
    assert!(cfg.status);
    assert!(cfg.log_file.is_none());
    assert!(cfg.seed.is_none());

    let scene = cfg.scene_config();
    assert_eq!(scene.rings, 6);
    assert_eq!(scene.star_margin, 500.0);
    let cadences = cfg.cadences();
    assert_eq!(cadences.redraw_hz, 60.0);
    assert_eq!(cadences.rotate_hz, 50.0);
    assert_eq!(cadences.background_hz, 10.0);
}

#[test]
fn overrides_flow_into_scene_and_cadences() {
    let cfg = parse(&[
        "--source",
        "demo",
        "--renderer",
        "braille",
        "--rings",
        "3",
        "--seed",
        "9",
        "--fps",
        "30",
        "--rotate-hz",
        "25",
        "--star-margin=-40",
        "--status",
        "false",
        "--log-file",
        "/tmp/hexwave.log",
    ])
    .unwrap();
    assert_eq!(cfg.source, AudioSource::Demo);
    assert_eq!(cfg.renderer, RendererMode::Braille);
    assert!(!cfg.status);
    assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/hexwave.log")));

    let scene = cfg.scene_config();
    assert_eq!(scene.rings, 3);
    assert_eq!(scene.seed, Some(9));
    assert_eq!(scene.star_margin, 0.0);
    assert_eq!(cfg.cadences().redraw_hz, 30.0);
    assert_eq!(cfg.cadences().rotate_hz, 25.0);
}

#[test]
fn renderer_aliases() {
    for (name, mode) in [
        ("hb", RendererMode::HalfBlock),
        ("half-block", RendererMode::HalfBlock),
        ("ansi", RendererMode::Ascii),
        ("dots", RendererMode::Braille),
    ] {
        assert_eq!(parse(&["--renderer", name]).unwrap().renderer, mode);
    }
    assert_eq!(parse(&["--source", "synth"]).unwrap().source, AudioSource::Demo);
}

#[test]
fn out_of_range_values_are_rejected() {
    assert!(parse(&["--rings", "0"]).is_err());
    assert!(parse(&["--rings", "33"]).is_err());
    assert!(parse(&["--fps", "0"]).is_err());
    assert!(parse(&["--renderer", "kitty"]).is_err());
}

#[test]
fn update_rates_must_be_usable() {
    assert!(parse(&["--rotate-hz", "1e-30"]).is_err());
    assert!(parse(&["--rotate-hz", "0"]).is_err());
    assert!(parse(&["--background-hz=-2"]).is_err());
    assert!(parse(&["--background-hz", "NaN"]).is_err());
    assert!(parse(&["--rotate-hz", "5000"]).is_err());
    let cfg = parse(&["--rotate-hz", "0.5", "--background-hz", "0.01"]).unwrap();
    assert_eq!(cfg.cadences().rotate_hz, 0.5);
    assert_eq!(cfg.cadences().background_hz, 0.01);
}

#[test]
fn cell_pixels_per_renderer() {
    assert_eq!(RendererMode::Ascii.cell_pixels(), (1, 1));
    assert_eq!(RendererMode::HalfBlock.cell_pixels(), (1, 2));
    assert_eq!(RendererMode::Braille.cell_pixels(), (2, 4));
}
