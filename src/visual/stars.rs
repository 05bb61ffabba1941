//! Starfield: streaks flying out from the centre, faster when the track is loud.

use crate::visual::canvas::{Canvas, Rgba};
use crate::visual::{round_half_up, Viewport};

const STAR_DECAY_FLOOR: f32 = 0.0001;
const BASE_BRIGHTNESS: f32 = 200.0;
const MAX_BRIGHTNESS_BOOST: f32 = 55.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    /// Angle of travel from the x axis into the star's quadrant, in `0..=π/2`.
    pub angle: f32,
    pub size: f32,
    /// Speed memory.
    pub high: f32,
}

impl Star {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            x,
            y,
            angle: star_angle(x, y),
            size,
            high: 0.0,
        }
    }

    pub fn distance(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// `atan(|y| / |x|)`, defined as 0 at the exact centre.
pub fn star_angle(x: f32, y: f32) -> f32 {
    y.abs().atan2(x.abs())
}

pub fn population(viewport: Viewport, divisor: f32) -> usize {
    (viewport.w() / divisor.max(1.0)).ceil() as usize
}

pub fn build_stars(viewport: Viewport, divisor: f32, rng: &mut fastrand::Rng) -> Vec<Star> {
    let (w, h) = (viewport.w(), viewport.h());
    (0..population(viewport, divisor))
        .map(|_| {
            let x = (rng.f32() - 0.5) * w;
            let y = (rng.f32() - 0.5) * h;
            let size = (rng.f32() + 0.1) * 3.0;
            Star::new(x, y, size)
        })
        .collect()
}

/// Streak length. Bounded by the distance to the centre so a streak never
/// reaches back past the origin.
pub fn length_factor(distance: f32, volume: f32) -> f32 {
    1.0 + (distance.powi(2) / 30_000.0 * volume.powi(2) / 6_000_000.0).min(distance)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarStreak {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub width: f32,
    pub brightness: u8,
}

impl StarStreak {
    pub fn color(&self) -> Rgba {
        Rgba::new(self.brightness, self.brightness, self.brightness, 1.0)
    }
}

pub fn out_of_bounds(star: &Star, viewport: Viewport, margin: f32) -> bool {
    let limit_x = viewport.w() / 2.0 + margin;
    let limit_y = viewport.h() / 2.0 + margin;
    star.x.abs() > limit_x || star.y.abs() > limit_y
}

/// Puts the star back somewhere in the central third of the viewport.
pub fn respawn(star: &mut Star, viewport: Viewport, rng: &mut fastrand::Rng) {
    star.x = (rng.f32() - 0.5) * viewport.w() / 3.0;
    star.y = (rng.f32() - 0.5) * viewport.h() / 3.0;
    star.angle = star_angle(star.x, star.y);
}

/// Advances one star by a frame and returns the streak to draw for the
/// position it had before moving.
pub fn step_star(
    star: &mut Star,
    volume: f32,
    viewport: Viewport,
    margin: f32,
    rng: &mut fastrand::Rng,
) -> StarStreak {
    let distance = star.distance();
    let brightness = BASE_BRIGHTNESS + round_half_up(star.high * 5.0).min(MAX_BRIGHTNESS_BOOST);
    let width = 0.5 + distance / 2000.0 * (star.size / 2.0).max(1.0);
    let length = length_factor(distance, volume);

    let (cos_a, sin_a) = (star.angle.cos(), star.angle.sin());
    let to_x = -cos_a * length * if star.x > 0.0 { 1.0 } else { -1.0 };
    let to_y = -sin_a * length * if star.y > 0.0 { 1.0 } else { -1.0 };
    let streak = StarStreak {
        from: (star.x, star.y),
        to: (star.x + to_x, star.y + to_y),
        width,
        brightness: brightness.clamp(0.0, 255.0) as u8,
    };

    let speed = length / 20.0 * star.size;
    star.high -= (star.high - STAR_DECAY_FLOOR).max(0.0);
    if speed > star.high {
        star.high = speed;
    }
    let dx = cos_a * star.high;
    let dy = sin_a * star.high;
    star.x += if star.x > 0.0 { dx } else { -dx };
    star.y += if star.y > 0.0 { dy } else { -dy };

    if out_of_bounds(star, viewport, margin) {
        respawn(star, viewport, rng);
    }
    streak
}

pub fn paint_streak(canvas: &mut Canvas, streak: &StarStreak) {
    canvas.stroke_line(streak.from, streak.to, streak.color(), streak.width);
}
