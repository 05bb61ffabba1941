//! Full-viewport radial glow behind everything, tinted and tightened by volume.

use crate::visual::canvas::{Canvas, Rgba};
use crate::visual::{round_half_up, Viewport};
use std::f32::consts::PI;

pub const OUTER_STOP: f32 = 0.8;
pub const OUTER_ALPHA: f32 = 0.4;
const MIN_OUTER_GAP: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundStops {
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub outer: Rgba,
    /// `sin(v + 3π/2) + 1`; computed alongside the colour but not painted.
    pub pulse: f32,
}

pub fn background_stops(volume: f32, viewport: Viewport) -> BackgroundStops {
    let val = volume / 1000.0;
    let r = 200.0 + (val.sin() + 1.0) * 28.0;
    let g = val * 2.0;
    let b = val * 8.0;
    let pulse = (val + 3.0 * PI / 2.0).sin() + 1.0;

    let w = viewport.w();
    let shrink = val.max(0.0).powf(2.7).min(w - MIN_OUTER_GAP);
    BackgroundStops {
        inner_radius: val,
        outer_radius: w - shrink,
        outer: Rgba::new(byte(r), byte(g), byte(b), OUTER_ALPHA),
        pulse,
    }
}

fn byte(v: f32) -> u8 {
    round_half_up(v).clamp(0.0, 255.0) as u8
}

pub fn paint_background(canvas: &mut Canvas, stops: &BackgroundStops) {
    canvas.clear();
    canvas.fill_radial_gradient(
        (0.0, 0.0),
        stops.inner_radius,
        stops.outer_radius,
        &[(0.0, Rgba::TRANSPARENT), (OUTER_STOP, stops.outer)],
    );
}
