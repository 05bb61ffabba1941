use crate::audio::AudioSystem;
use crate::clock::{Clock, Scheduler, SystemClock};
use crate::config::Config;
use crate::render::{make_renderer, Frame};
use crate::signal::SignalFrame;
use crate::terminal::TerminalGuard;
use crate::visual::{FrameStats, GeometryError, Scene};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant};

const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = make_renderer(cfg.renderer);
    let cell = cfg.renderer.cell_pixels();

    let audio = AudioSystem::new(cfg.source, cfg.device.as_deref())
        .with_context(|| format!("start audio (source={:?})", cfg.source))?;
    let signal = audio.signal();

    let mut show_status = cfg.status;
    let mut size = TerminalGuard::size()?;
    let mut last_polled = size;
    let mut layout = Layout::new(size, cell, show_status);
    let mut failed_layout: Option<Layout> = None;
    let mut scene = Scene::new(cfg.scene_config(), layout.pixel_width, layout.pixel_height)
        .context("build scene")?;
    let mut pixels = vec![0u8; scene.viewport().pixel_len()];
    log::info!(
        "scene {}x{} px, {} tiles, {} stars, renderer {}",
        layout.pixel_width,
        layout.pixel_height,
        scene.tiles().len(),
        scene.stars().len(),
        renderer.name()
    );

    let clock = SystemClock::new();
    let mut scheduler = Scheduler::new(cfg.cadences(), clock.now());
    let mut fps = FpsCounter::new();
    let mut stats = FrameStats::default();
    let mut stalled = false;
    let mut last_stats_log = Instant::now();
    let source_label = format!("{:?}", cfg.source).to_lowercase();

    loop {
        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    match handle_key(k.code, k.modifiers) {
                        KeyAction::Quit => {
                            log::info!("quit requested");
                            return Ok(());
                        }
                        KeyAction::ToggleStatus => show_status = !show_status,
                        KeyAction::None => {}
                    }
                }
                Event::Resize(c, r) => size = (c, r),
                _ => {}
            }
        }

        // Size check once per frame (resize events can be missed in some terminals).
        let polled = crossterm::terminal::size()?;
        if polled != last_polled {
            last_polled = polled;
            size = polled;
        }

        // A layout that failed to apply stays pending and is retried every frame.
        if !layout.matches(size, show_status) {
            let next = Layout::new(size, cell, show_status);
            match apply_layout(&mut scene, &mut layout, next) {
                Ok(()) => {
                    pixels.resize(scene.viewport().pixel_len(), 0);
                    failed_layout = None;
                    log::info!(
                        "resized to {}x{} cells, {}x{} px",
                        layout.cols,
                        layout.rows,
                        layout.pixel_width,
                        layout.pixel_height
                    );
                }
                Err(err) => {
                    if failed_layout != Some(next) {
                        log::warn!("keeping previous layout: {err}");
                        failed_layout = Some(next);
                    }
                }
            }
        }

        let current = signal.load_fresh(cfg.stall_ms);
        let is_stalled = signal.age_ms().is_none_or(|age| age > cfg.stall_ms);
        if is_stalled != stalled {
            stalled = is_stalled;
            if stalled {
                log::warn!("no audio analysis for {} ms, drawing silence", cfg.stall_ms);
            } else {
                log::info!("audio analysis resumed");
            }
        }

        let ticks = scheduler.poll(clock.now());
        for _ in 0..ticks.rotations {
            scene.rotate(current.volume);
        }
        if ticks.background {
            scene.paint_background(current.volume);
        }
        if ticks.redraw {
            stats = scene.redraw(&current);
            scene.composite(&mut pixels);

            let status = if layout.status_rows > 0 {
                status_line(
                    &source_label,
                    renderer.name(),
                    &current,
                    &stats,
                    scene.tiles().len(),
                    fps.fps(),
                )
            } else {
                String::new()
            };
            let frame = Frame {
                term_cols: layout.cols,
                term_rows: layout.rows,
                visual_rows: layout.visual_rows,
                pixel_width: layout.pixel_width,
                pixel_height: layout.pixel_height,
                pixels_rgba: &pixels,
                status: &status,
                status_rows: layout.status_rows,
                sync_updates: cfg.sync_updates,
            };
            renderer.render(&frame, &mut out)?;
            fps.tick();
        }

        if last_stats_log.elapsed() >= STATS_LOG_INTERVAL {
            last_stats_log = Instant::now();
            log::debug!(
                "fps {:.1}, volume {:.0}, visible {}, highlighted {}, cubed {}",
                fps.fps(),
                current.volume,
                stats.visible_tiles,
                stats.highlighted_tiles,
                stats.cubed_tiles
            );
        }

        // Pace to the earliest cadence; input is drained at least every 20 ms.
        let now = clock.now();
        let next = scheduler.next_deadline();
        if next > now {
            std::thread::sleep((next - now).min(Duration::from_millis(20)));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    cols: u16,
    rows: u16,
    visual_rows: u16,
    status_rows: u16,
    show_status: bool,
    pixel_width: usize,
    pixel_height: usize,
}

impl Layout {
    fn new(size: (u16, u16), cell: (usize, usize), show_status: bool) -> Self {
        let (cols, rows) = size;
        let status_rows = u16::from(show_status && rows >= 2);
        let visual_rows = rows.saturating_sub(status_rows).max(1);
        Self {
            cols,
            rows,
            visual_rows,
            status_rows,
            show_status,
            pixel_width: (cols as usize).saturating_mul(cell.0),
            pixel_height: (visual_rows as usize).saturating_mul(cell.1),
        }
    }

    fn matches(&self, size: (u16, u16), show_status: bool) -> bool {
        (self.cols, self.rows) == size && self.show_status == show_status
    }
}

/// Rebuilds the scene for `next`. `layout` only advances on success.
fn apply_layout(scene: &mut Scene, layout: &mut Layout, next: Layout) -> Result<(), GeometryError> {
    scene.resize(next.pixel_width, next.pixel_height)?;
    *layout = next;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    None,
    Quit,
    ToggleStatus,
}

fn handle_key(code: KeyCode, mods: KeyModifiers) -> KeyAction {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return KeyAction::Quit;
    }
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Char('s') | KeyCode::Char('S') => KeyAction::ToggleStatus,
        _ => KeyAction::None,
    }
}

fn status_line(
    source: &str,
    renderer: &str,
    signal: &SignalFrame,
    stats: &FrameStats,
    tile_count: usize,
    fps: f32,
) -> String {
    format!(
        "{source} | {renderer} | vol {:>5.0} | tiles {}/{} lit {} cubed {} | {:>3.0} fps | s status  q quit",
        signal.volume,
        stats.visible_tiles,
        tile_count,
        stats.highlighted_tiles,
        stats.cubed_tiles,
        fps
    )
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::SceneConfig;

    #[test]
    fn quit_keys() {
        assert_eq!(handle_key(KeyCode::Char('q'), KeyModifiers::NONE), KeyAction::Quit);
        assert_eq!(handle_key(KeyCode::Esc, KeyModifiers::NONE), KeyAction::Quit);
        assert_eq!(
            handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            KeyAction::Quit
        );
        assert_eq!(handle_key(KeyCode::Char('c'), KeyModifiers::NONE), KeyAction::None);
    }

    #[test]
    fn s_toggles_status() {
        assert_eq!(
            handle_key(KeyCode::Char('s'), KeyModifiers::NONE),
            KeyAction::ToggleStatus
        );
    }

    #[test]
    fn layout_reserves_one_status_row() {
        let l = Layout::new((80, 24), (1, 2), true);
        assert_eq!(l.visual_rows, 23);
        assert_eq!(l.status_rows, 1);
        assert_eq!((l.pixel_width, l.pixel_height), (80, 46));

        let l = Layout::new((80, 24), (2, 4), false);
        assert_eq!(l.visual_rows, 24);
        assert_eq!((l.pixel_width, l.pixel_height), (160, 96));
    }

    #[test]
    fn failed_resize_stays_pending_until_it_applies() {
        let config = SceneConfig {
            seed: Some(3),
            ..SceneConfig::default()
        };
        let mut layout = Layout::new((80, 24), (1, 2), true);
        let mut scene = Scene::new(config, layout.pixel_width, layout.pixel_height).unwrap();

        let zero_wide = Layout::new((0, 24), (1, 2), true);
        assert!(apply_layout(&mut scene, &mut layout, zero_wide).is_err());
        assert!(!layout.matches((0, 24), true));
        assert!(layout.matches((80, 24), true));
        assert_eq!(scene.viewport().width, 80);

        let wider = Layout::new((100, 24), (1, 2), true);
        apply_layout(&mut scene, &mut layout, wider).unwrap();
        assert!(layout.matches((100, 24), true));
        assert!(!layout.matches((100, 24), false));
        assert_eq!(scene.viewport().width, 100);
    }

    #[test]
    fn layout_keeps_a_visual_row_on_tiny_terminals() {
        let l = Layout::new((10, 1), (1, 1), true);
        assert_eq!(l.status_rows, 0);
        assert_eq!(l.visual_rows, 1);
    }
}
