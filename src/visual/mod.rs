mod background;
mod canvas;
mod grid;
mod stars;

use crate::signal::SignalFrame;

pub use background::{background_stops, paint_background, BackgroundStops, OUTER_ALPHA, OUTER_STOP};
pub use canvas::{composite, Canvas, Rgba};
pub use grid::{
    apply_envelope, axial_layout, band_index, band_value, build_grid, chaos_factor,
    distort_offset, distorted_outline, paint_highlight, paint_tile, rotate_tiles, rotate_vertex,
    rotation_angle, shade_tile, tile_alpha, tile_color, tile_count, GeometryError, Tile, TileShade,
    BASE_ROTATION, OUTER_TIER_INDEX, TILE_SIDES,
};
pub use stars::{
    build_stars, length_factor, out_of_bounds, paint_streak, population, respawn, star_angle,
    step_star, Star, StarStreak,
};

/// Rounds halves toward positive infinity, the way browser canvas code rounds.
pub(crate) fn round_half_up(v: f32) -> f32 {
    (v + 0.5).floor()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn w(&self) -> f32 {
        self.width as f32
    }

    pub fn h(&self) -> f32 {
        self.height as f32
    }

    pub fn pixel_len(&self) -> usize {
        self.width.saturating_mul(self.height).saturating_mul(4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub rings: u32,
    /// Tile radius is the larger viewport side divided by this.
    pub tile_divisor: f32,
    /// One star per this many pixels of viewport width.
    pub star_divisor: f32,
    /// How far past the viewport edge a star may fly before respawning.
    pub star_margin: f32,
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            rings: 6,
            tile_divisor: 25.0,
            star_divisor: 15.0,
            star_margin: 500.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub visible_tiles: usize,
    pub highlighted_tiles: usize,
    pub cubed_tiles: usize,
}

struct Layers {
    background: Canvas,
    starfield: Canvas,
    foreground: Canvas,
}

impl Layers {
    fn new(viewport: Viewport) -> Self {
        Self {
            background: Canvas::new(viewport.width, viewport.height),
            starfield: Canvas::new(viewport.width, viewport.height),
            foreground: Canvas::new(viewport.width, viewport.height),
        }
    }
}

/// Simulation context for the three layers. Owns every piece of mutable state;
/// the update functions in `grid`, `stars` and `background` operate on it.
pub struct Scene {
    config: SceneConfig,
    viewport: Viewport,
    tile_size: f32,
    tiles: Vec<Tile>,
    stars: Vec<Star>,
    background: BackgroundStops,
    layers: Layers,
    rng: fastrand::Rng,
    volume: f32,
}

impl Scene {
    pub fn new(config: SceneConfig, width: usize, height: usize) -> Result<Self, GeometryError> {
        let mut rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let viewport = Viewport::new(width, height);
        let (tile_size, tiles, stars) = build_state(&config, viewport, &mut rng)?;
        let mut layers = Layers::new(viewport);
        let background = background_stops(0.0, viewport);
        paint_background(&mut layers.background, &background);

        Ok(Self {
            config,
            viewport,
            tile_size,
            tiles,
            stars,
            background,
            layers,
            rng,
            volume: 0.0,
        })
    }

    /// Rebuilds grid, stars and layers for a new viewport. On error nothing changes.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), GeometryError> {
        let viewport = Viewport::new(width, height);
        let (tile_size, tiles, stars) = build_state(&self.config, viewport, &mut self.rng)?;

        self.viewport = viewport;
        self.tile_size = tile_size;
        self.tiles = tiles;
        self.stars = stars;
        self.layers = Layers::new(viewport);
        self.paint_background(self.volume);
        Ok(())
    }

    /// One rotation tick for the whole grid.
    pub fn rotate(&mut self, volume: f32) {
        rotate_tiles(&mut self.tiles, volume);
    }

    pub fn paint_background(&mut self, volume: f32) {
        self.volume = volume;
        self.background = background_stops(volume, self.viewport);
        paint_background(&mut self.layers.background, &self.background);
    }

    /// Advances stars and tile envelopes by one frame and repaints the starfield
    /// and foreground layers.
    pub fn redraw(&mut self, signal: &SignalFrame) -> FrameStats {
        let volume = signal.volume;
        self.volume = volume;
        let Self {
            config,
            viewport,
            tiles,
            stars,
            layers,
            rng,
            ..
        } = self;

        layers.starfield.clear();
        layers.foreground.clear();

        for star in stars.iter_mut() {
            let streak = step_star(star, volume, *viewport, config.star_margin, rng);
            paint_streak(&mut layers.starfield, &streak);
        }

        let mut stats = FrameStats::default();
        let count = tiles.len();
        for tile in tiles.iter_mut() {
            if let Some(shade) = shade_tile(tile, &signal.spectrum, count) {
                stats.visible_tiles += 1;
                if shade.cubed {
                    stats.cubed_tiles += 1;
                }
                paint_tile(&mut layers.foreground, tile, &shade, volume);
            }
        }
        for tile in tiles.iter_mut().filter(|t| t.highlight > 0.0) {
            stats.highlighted_tiles += 1;
            paint_highlight(&mut layers.foreground, tile, volume);
        }
        stats
    }

    /// Writes background, starfield and foreground, in that order, into RGBA8.
    pub fn composite(&self, out: &mut [u8]) {
        composite(
            &[
                &self.layers.background,
                &self.layers.starfield,
                &self.layers.foreground,
            ],
            out,
        );
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn stars_mut(&mut self) -> &mut [Star] {
        &mut self.stars
    }

    pub fn background(&self) -> &BackgroundStops {
        &self.background
    }

    pub fn background_layer(&self) -> &Canvas {
        &self.layers.background
    }

    pub fn starfield_layer(&self) -> &Canvas {
        &self.layers.starfield
    }

    pub fn foreground_layer(&self) -> &Canvas {
        &self.layers.foreground
    }
}

fn build_state(
    config: &SceneConfig,
    viewport: Viewport,
    rng: &mut fastrand::Rng,
) -> Result<(f32, Vec<Tile>, Vec<Star>), GeometryError> {
    if viewport.width == 0 || viewport.height == 0 {
        return Err(GeometryError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    let tile_size = viewport.width.max(viewport.height) as f32 / config.tile_divisor;
    let tiles = build_grid(config.rings, tile_size)?;
    let stars = build_stars(viewport, config.star_divisor, rng);
    Ok((tile_size, tiles, stars))
}
