//! CPU drawing surface. Pixels are premultiplied RGBA floats; coordinates are
//! relative to a movable origin (the viewport centre for every layer here).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn premultiplied(self) -> [f32; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [
            self.r as f32 / 255.0 * a,
            self.g as f32 / 255.0 * a,
            self.b as f32 / 255.0 * a,
            a,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    origin: (f32, f32),
    px: Vec<[f32; 4]>,
}

impl Canvas {
    /// A cleared surface with its origin at the centre.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            origin: (width as f32 / 2.0, height as f32 / 2.0),
            px: vec![[0.0; 4]; width.saturating_mul(height)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> (f32, f32) {
        self.origin
    }

    pub fn clear(&mut self) {
        self.px.fill([0.0; 4]);
    }

    pub fn is_clear(&self) -> bool {
        self.px.iter().all(|p| p[3] <= 0.0)
    }

    /// Premultiplied RGBA at a pixel index (top-left based).
    pub fn pixel(&self, x: usize, y: usize) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.px[y * self.width + x])
    }

    fn to_pixel_space(&self, p: (f32, f32)) -> (f32, f32) {
        (p.0 + self.origin.0, p.1 + self.origin.1)
    }

    #[inline]
    fn blend(&mut self, x: usize, y: usize, src: [f32; 4], coverage: f32) {
        let k = coverage.clamp(0.0, 1.0);
        if k <= 0.0 {
            return;
        }
        let dst = &mut self.px[y * self.width + x];
        let inv = 1.0 - src[3] * k;
        for c in 0..4 {
            dst[c] = src[c] * k + dst[c] * inv;
        }
    }

    /// Even-odd scanline fill sampled at pixel centres.
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgba) {
        if points.len() < 3 || self.width == 0 || self.height == 0 {
            return;
        }
        let pts = points
            .iter()
            .map(|&p| self.to_pixel_space(p))
            .collect::<Vec<_>>();
        if pts.iter().any(|p| !(p.0.is_finite() && p.1.is_finite())) {
            return;
        }

        let min_y = pts.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = pts.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        let y0 = (min_y - 0.5).ceil().max(0.0) as usize;
        let y1 = ((max_y - 0.5).floor().min(self.height as f32 - 1.0)).max(-1.0);
        if y1 < 0.0 {
            return;
        }
        let y1 = y1 as usize;

        let src = color.premultiplied();
        let mut xs: Vec<f32> = Vec::with_capacity(pts.len());
        for py in y0..=y1 {
            let sy = py as f32 + 0.5;
            xs.clear();
            for i in 0..pts.len() {
                let a = pts[i];
                let b = pts[(i + 1) % pts.len()];
                let (lo, hi) = if a.1 <= b.1 { (a, b) } else { (b, a) };
                if sy >= lo.1 && sy < hi.1 {
                    let t = (sy - lo.1) / (hi.1 - lo.1);
                    xs.push(lo.0 + t * (hi.0 - lo.0));
                }
            }
            xs.sort_by(|a, b| a.total_cmp(b));
            for span in xs.chunks_exact(2) {
                let x0 = (span[0] - 0.5).ceil().max(0.0);
                let x1 = (span[1] - 0.5).ceil().min(self.width as f32);
                if x1 <= x0 {
                    continue;
                }
                for px in x0 as usize..x1 as usize {
                    self.blend(px, py, src, 1.0);
                }
            }
        }
    }

    /// Straight segment with soft edges; `width` in pixels.
    pub fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, width: f32) {
        if self.width == 0 || self.height == 0 || !(width > 0.0) {
            return;
        }
        let a = self.to_pixel_space(from);
        let b = self.to_pixel_space(to);
        if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite()) {
            return;
        }

        let half = width / 2.0;
        let pad = half + 1.0;
        let x0 = (a.0.min(b.0) - pad).floor().max(0.0);
        let y0 = (a.1.min(b.1) - pad).floor().max(0.0);
        let x1 = (a.0.max(b.0) + pad).ceil().min(self.width as f32);
        let y1 = (a.1.max(b.1) + pad).ceil().min(self.height as f32);
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        let src = color.premultiplied();
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len2 = dx * dx + dy * dy;
        for py in y0 as usize..y1 as usize {
            for px in x0 as usize..x1 as usize {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                let t = if len2 > 0.0 {
                    (((cx - a.0) * dx + (cy - a.1) * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (qx, qy) = (a.0 + t * dx - cx, a.1 + t * dy - cy);
                let d = (qx * qx + qy * qy).sqrt();
                self.blend(px, py, src, half + 0.5 - d);
            }
        }
    }

    pub fn stroke_polygon(&mut self, points: &[(f32, f32)], color: Rgba, width: f32) {
        for i in 0..points.len() {
            self.stroke_line(points[i], points[(i + 1) % points.len()], color, width);
        }
    }

    /// Concentric radial gradient between radii `r0` and `r1` around `center`.
    /// Stops are `(offset, colour)` sorted by offset; colours interpolate
    /// premultiplied and pad past both ends.
    pub fn fill_radial_gradient(
        &mut self,
        center: (f32, f32),
        r0: f32,
        r1: f32,
        stops: &[(f32, Rgba)],
    ) {
        if stops.is_empty() || r0 == r1 || !(r0.is_finite() && r1.is_finite()) {
            return;
        }
        let c = self.to_pixel_space(center);
        let stops = stops
            .iter()
            .map(|&(t, col)| (t, col.premultiplied()))
            .collect::<Vec<_>>();

        for py in 0..self.height {
            for px in 0..self.width {
                let (dx, dy) = (px as f32 + 0.5 - c.0, py as f32 + 0.5 - c.1);
                let t = ((dx * dx + dy * dy).sqrt() - r0) / (r1 - r0);
                let src = sample_stops(&stops, t);
                self.blend(px, py, src, 1.0);
            }
        }
    }
}

fn sample_stops(stops: &[(f32, [f32; 4])], t: f32) -> [f32; 4] {
    let first = stops[0];
    let last = stops[stops.len() - 1];
    if t <= first.0 {
        return first.1;
    }
    if t >= last.0 {
        return last.1;
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t >= t0 && t <= t1 {
            let k = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            return std::array::from_fn(|i| c0[i] + (c1[i] - c0[i]) * k);
        }
    }
    last.1
}

/// Source-over composite of `layers` (bottom first) onto opaque black, into RGBA8.
pub fn composite(layers: &[&Canvas], out: &mut [u8]) {
    let Some(base) = layers.first() else {
        return;
    };
    let n = base.width.saturating_mul(base.height);
    for (i, dst) in out.chunks_exact_mut(4).take(n).enumerate() {
        let mut acc = [0.0f32; 3];
        for layer in layers {
            let Some(p) = layer.px.get(i) else {
                continue;
            };
            let inv = 1.0 - p[3];
            for c in 0..3 {
                acc[c] = p[c] + acc[c] * inv;
            }
        }
        for c in 0..3 {
            dst[c] = (acc[c].clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        dst[3] = 255;
    }
}
