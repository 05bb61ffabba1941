use std::time::{Duration, Instant};

use anyhow::Result;
use hexwave::audio::{DemoSynth, DEMO_SAMPLE_RATE_HZ};
use hexwave::clock::{Cadences, Clock, ManualClock, Scheduler};
use hexwave::signal::{SignalFrame, SpectrumAnalyser};
use hexwave::visual::{FrameStats, Scene, SceneConfig};

struct Args {
    frames: usize,
    w: usize,
    h: usize,
    rings: u32,
    seed: u64,
    ci_smoke: bool,
    max_ms: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 600,
        w: 320,
        h: 180,
        rings: 6,
        seed: 7,
        ci_smoke: false,
        max_ms: 16.0,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--rings", Some(x)) => {
                if let Ok(n) = x.parse::<u32>() {
                    args.rings = n.max(1);
                }
                i += 2;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--ci-smoke", Some(x)) if !x.starts_with("--") => {
                args.ci_smoke = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = v.max(0.1);
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    args
}

fn parse_bool(s: &str) -> Option<bool> {
    let v = s.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = SceneConfig {
        rings: args.rings,
        seed: Some(args.seed),
        ..SceneConfig::default()
    };
    let mut scene = Scene::new(config, args.w, args.h)?;
    let mut pixels = vec![0u8; scene.viewport().pixel_len()];

    let mut synth = DemoSynth::new(DEMO_SAMPLE_RATE_HZ, args.seed);
    let mut analyser = SpectrumAnalyser::new(DEMO_SAMPLE_RATE_HZ);
    let mut samples = vec![0.0f32; (DEMO_SAMPLE_RATE_HZ / 240) as usize];
    let mut signal = SignalFrame::silence();

    let clock = ManualClock::new();
    let mut scheduler = Scheduler::new(Cadences::default(), clock.now());
    let step = Duration::from_secs_f64(1.0 / 240.0);

    println!(
        "Scene benchmark: frames={} size={}x{} rings={} tiles={} stars={} seed={}",
        args.frames,
        args.w,
        args.h,
        args.rings,
        scene.tiles().len(),
        scene.stars().len(),
        args.seed
    );

    let mut busy = Duration::ZERO;
    let mut worst = Duration::ZERO;
    let mut frames = 0usize;
    let mut peak_volume = 0.0f32;
    let mut totals = FrameStats::default();

    while frames < args.frames {
        clock.advance(step);
        synth.fill(&mut samples);
        for &s in &samples {
            if let Some(frame) = analyser.push(s) {
                signal = frame;
            }
        }
        peak_volume = peak_volume.max(signal.volume);

        let ticks = scheduler.poll(clock.now());
        if ticks.is_idle() {
            continue;
        }
        let start = Instant::now();
        for _ in 0..ticks.rotations {
            scene.rotate(signal.volume);
        }
        if ticks.background {
            scene.paint_background(signal.volume);
        }
        if ticks.redraw {
            let stats = scene.redraw(&signal);
            scene.composite(&mut pixels);
            totals.visible_tiles += stats.visible_tiles;
            totals.highlighted_tiles += stats.highlighted_tiles;
            totals.cubed_tiles += stats.cubed_tiles;
            frames += 1;
        }
        let elapsed = start.elapsed();
        busy += elapsed;
        worst = worst.max(elapsed);
    }

    let avg_ms = busy.as_secs_f64() * 1000.0 / frames.max(1) as f64;
    let fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };
    let n = frames.max(1) as f64;
    println!(
        "avg {:>8.3} ms/frame  worst {:>8.3} ms  {:>8.1} FPS",
        avg_ms,
        worst.as_secs_f64() * 1000.0,
        fps
    );
    println!(
        "per frame: visible {:.1}  highlighted {:.1}  cubed {:.2}  peak volume {:.0}",
        totals.visible_tiles as f64 / n,
        totals.highlighted_tiles as f64 / n,
        totals.cubed_tiles as f64 / n,
        peak_volume
    );

    if args.ci_smoke {
        if totals.visible_tiles == 0 {
            anyhow::bail!("ci smoke failed: no tile was ever visible");
        }
        if avg_ms > args.max_ms {
            anyhow::bail!("ci smoke failed: {:.3} ms/frame > {:.3}", avg_ms, args.max_ms);
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }

    Ok(())
}
