//! Hexagonal tile grid: layout, rotation, amplitude envelope, colour and the
//! volume-driven radial distortion.

use crate::visual::canvas::{Canvas, Rgba};
use crate::visual::round_half_up;
use std::f32::consts::PI;
use std::fmt;

pub const TILE_SIDES: usize = 6;
/// Tiles with a higher index sit in the outer rings: boosted and faster to fade.
pub const OUTER_TIER_INDEX: usize = 42;
pub const BASE_ROTATION: f32 = 0.001;

const INNER_DECAY: f32 = 2.0;
const OUTER_DECAY: f32 = 1.5;
const OUTER_BOOST: f32 = 1.1;
const WILD_VOLUME: f32 = 10_000.0;
const CUBE_THRESHOLD: f32 = 210.0;
const HIGHLIGHT_THRESHOLD: f32 = 120.0;
const HIGHLIGHT_FULL: f32 = 100.0;
const HIGHLIGHT_FADE: f32 = 0.5;
const OUTLINE_THRESHOLD: f32 = 20.0;
const E_APPROX: f32 = 2.7182;

const OUTLINE: Rgba = Rgba::new(20, 20, 20, 0.5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    InvalidRingCount(u32),
    InvalidTileSize(f32),
    InvalidViewport { width: usize, height: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRingCount(n) => write!(f, "ring count must be at least 1 (got {n})"),
            Self::InvalidTileSize(s) => write!(f, "tile size must be positive (got {s})"),
            Self::InvalidViewport { width, height } => {
                write!(f, "viewport must be non-empty (got {width}x{height})")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Position in generation order; selects the frequency band and decay tier.
    pub num: usize,
    /// Axial coordinates on the 60-degree grid.
    pub axial: (i32, i32),
    pub center: (f32, f32),
    /// Rotated in place on every rotation tick.
    pub vertices: [(f32, f32); TILE_SIDES],
    /// Envelope value: jumps up on a louder band, decays by `decay` otherwise.
    pub high: f32,
    pub decay: f32,
    /// Afterglow strength, 0..=100.
    pub highlight: f32,
    /// Last envelope value that crossed the cube threshold.
    pub cubed: f32,
}

impl Tile {
    pub fn new(num: usize, axial: (i32, i32), tile_size: f32) -> Self {
        let (ax, ay) = axial;
        let step = round_half_up((PI / 6.0).cos() * tile_size * 2.0);
        let cy = round_half_up(step * (PI / 3.0).sin() * -(ay as f32));
        let cx = round_half_up(ax as f32 * step + ay as f32 * step / 2.0);

        let vertices = std::array::from_fn(|i| {
            let a = (i + 1) as f32 * 2.0 * PI / TILE_SIDES as f32 + PI / 6.0;
            (cx + tile_size * a.cos(), cy + tile_size * a.sin())
        });

        Self {
            num,
            axial,
            center: (cx, cy),
            vertices,
            high: 0.0,
            decay: if num > OUTER_TIER_INDEX { OUTER_DECAY } else { INNER_DECAY },
            highlight: 0.0,
            cubed: 0.0,
        }
    }

    pub fn is_outer(&self) -> bool {
        self.num > OUTER_TIER_INDEX
    }
}

/// Number of tiles in a grid with `rings` rings around the centre tile.
pub fn tile_count(rings: u32) -> usize {
    let n = rings as usize;
    1 + 3 * n * (n + 1)
}

/// Axial coordinates in generation order: centre first, then ring by ring.
pub fn axial_layout(rings: u32) -> Result<Vec<(i32, i32)>, GeometryError> {
    if rings < 1 {
        return Err(GeometryError::InvalidRingCount(rings));
    }

    let mut out = Vec::with_capacity(tile_count(rings));
    out.push((0, 0));
    for layer in 1..=rings as i32 {
        out.push((0, layer));
        out.push((0, -layer));
        for x in 1..layer {
            out.push((x, -layer));
            out.push((-x, layer));
            out.push((x, layer - x));
            out.push((-x, -layer + x));
        }
        for y in -layer..=0 {
            out.push((layer, y));
            out.push((-layer, -y));
        }
    }
    Ok(out)
}

pub fn build_grid(rings: u32, tile_size: f32) -> Result<Vec<Tile>, GeometryError> {
    if !(tile_size.is_finite() && tile_size > 0.0) {
        return Err(GeometryError::InvalidTileSize(tile_size));
    }
    let layout = axial_layout(rings)?;
    Ok(layout
        .into_iter()
        .enumerate()
        .map(|(num, axial)| Tile::new(num, axial, tile_size))
        .collect())
}

/// Rotation applied on one tick. Past the wild threshold, loud input swings it backwards.
pub fn rotation_angle(volume: f32) -> f32 {
    let mut rotation = BASE_ROTATION;
    if volume > WILD_VOLUME {
        rotation -= (volume / 800_000.0).sin();
    }
    rotation
}

/// First-order rotation where `y` is updated from the already-updated `x`.
/// The coupling gives the grid its wobble; it is not a rotation matrix.
pub fn rotate_vertex(v: (f32, f32), sin_r: f32) -> (f32, f32) {
    let x = v.0 - v.1 * sin_r;
    let y = v.1 + x * sin_r;
    (x, y)
}

pub fn rotate_tiles(tiles: &mut [Tile], volume: f32) {
    let sin_r = rotation_angle(volume).sin();
    for tile in tiles.iter_mut() {
        for v in tile.vertices.iter_mut() {
            *v = rotate_vertex(*v, sin_r);
        }
    }
}

/// Spectrum bin read by tile `num`; clamped to the spectrum so any length works.
pub fn band_index(num: usize, tile_count: usize, spectrum_len: usize) -> Option<usize> {
    if spectrum_len == 0 || tile_count == 0 {
        return None;
    }
    let bucket = (spectrum_len as f32 / tile_count as f32 * num as f32).ceil() as usize;
    Some(bucket.min(spectrum_len - 1))
}

/// Squared response curve on a 0..=255 band, boosted for the outer tier.
pub fn band_value(band: u8, num: usize) -> f32 {
    let v = (band as f32 / 255.0).powi(2) * 255.0;
    if num > OUTER_TIER_INDEX {
        v * OUTER_BOOST
    } else {
        v
    }
}

/// Attack/release: a louder value is adopted at once, otherwise `high` fades by
/// the tile's decay (never below zero) and the faded value is used.
pub fn apply_envelope(tile: &mut Tile, val: f32) -> f32 {
    if val > tile.high {
        tile.high = val;
        val
    } else {
        tile.high = (tile.high - tile.decay).max(0.0);
        tile.high
    }
}

pub fn tile_color(val: f32) -> [u8; 3] {
    let phase = 2.0 * val / 128.0 * PI / 2.0;
    let g = ((phase - 4.0 * PI / 3.0).cos() + 1.0) * 128.0;
    let (r, b) = if val > 128.0 {
        ((val - 128.0) * 2.0, (val - 105.0) * 3.0)
    } else {
        (
            (phase.cos() + 1.0) * 128.0,
            ((2.4 * val / 128.0 * PI / 2.0 - 2.0 * PI / 3.0).cos() + 1.0) * 128.0,
        )
    };
    [channel(r), channel(g), channel(b)]
}

fn channel(v: f32) -> u8 {
    round_half_up(v).clamp(0.0, 255.0) as u8
}

/// Two stacked logistic curves: quiet tiles vanish, loud tiles go near-opaque.
pub fn tile_alpha(val: f32) -> f32 {
    0.5 / (1.0 + 40.0 * E_APPROX.powf(-val / 8.0)) + 0.5 / (1.0 + 40.0 * E_APPROX.powf(-val / 20.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileShade {
    pub val: f32,
    pub fill: Rgba,
    pub outline: bool,
    pub cubed: bool,
}

/// Runs the tile's envelope against its band and returns how to paint it, or
/// `None` when the tile is dark this frame.
pub fn shade_tile(tile: &mut Tile, spectrum: &[u8], tile_count: usize) -> Option<TileShade> {
    let band = band_index(tile.num, tile_count, spectrum.len())
        .map(|i| spectrum[i])
        .unwrap_or(0);
    let val = apply_envelope(tile, band_value(band, tile.num));
    if val <= 0.0 {
        return None;
    }

    let cubed = val > CUBE_THRESHOLD;
    if cubed {
        tile.cubed = val;
    }
    if val > HIGHLIGHT_THRESHOLD {
        tile.highlight = HIGHLIGHT_FULL;
    }

    let [r, g, b] = tile_color(val);
    Some(TileShade {
        val,
        fill: Rgba::new(r, g, b, tile_alpha(val)),
        outline: val > OUTLINE_THRESHOLD,
        cubed,
    })
}

/// Bounded multiplier behind the high-volume distortion. Tangent makes it
/// surge near its asymptotes; the clamp keeps spikes from running away.
pub fn chaos_factor(volume: f32) -> f32 {
    if !volume.is_finite() {
        return 0.0;
    }
    ((volume / 6000.0).tan() * 0.5).clamp(-20.0, 2.0)
}

/// Radial offset for one vertex. Transient: computed at paint time, never stored.
pub fn distort_offset(vertex: (f32, f32), high: f32, volume: f32) -> (f32, f32) {
    let (x, y) = vertex;
    if x == 0.0 && y == 0.0 {
        return (0.0, 0.0);
    }
    let angle = (y / x).atan();
    let distance = (x * x + y * y).sqrt();
    let factor = (distance / 3.0).powi(2)
        * (volume / 2_000_000.0)
        * (high.max(0.0).powf(1.3) / 300.0)
        * chaos_factor(volume);

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    (angle.cos() * factor * sign, angle.sin() * factor * sign)
}

pub fn distorted_outline(tile: &Tile, volume: f32) -> [(f32, f32); TILE_SIDES] {
    tile.vertices.map(|v| {
        let (dx, dy) = distort_offset(v, tile.high, volume);
        (v.0 + dx, v.1 + dy)
    })
}

pub fn paint_tile(canvas: &mut Canvas, tile: &Tile, shade: &TileShade, volume: f32) {
    let outline = distorted_outline(tile, volume);
    canvas.fill_polygon(&outline, shade.fill);
    if shade.outline {
        canvas.stroke_polygon(&outline, OUTLINE, 1.0);
    }
}

/// Afterglow stroke; fades the highlight by one step per call.
pub fn paint_highlight(canvas: &mut Canvas, tile: &mut Tile, volume: f32) {
    if tile.highlight <= 0.0 {
        return;
    }
    let outline = distorted_outline(tile, volume);
    let alpha = (tile.highlight / HIGHLIGHT_FULL).min(1.0);
    canvas.stroke_polygon(&outline, Rgba::new(255, 255, 255, alpha), 1.0);
    tile.highlight -= HIGHLIGHT_FADE;
}
