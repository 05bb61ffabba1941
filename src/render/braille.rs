use crate::render::{frame_begin, frame_end, luma_u8, rgb_at, write_bg_rgb, write_fg_rgb, Frame, Renderer};
use std::io::Write;

/// 2x4 pixels per cell. Dots light up where a pixel is brighter than the
/// cell's mid luma; lit and unlit pixels are averaged into fg and bg.
pub struct BrailleRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl BrailleRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Default for BrailleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// Dot bit for (dy * 2 + dx).
const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];

#[derive(Default)]
struct Mean {
    sum: [u32; 3],
    n: u32,
}

impl Mean {
    fn add(&mut self, c: (u8, u8, u8)) {
        self.sum[0] += c.0 as u32;
        self.sum[1] += c.1 as u32;
        self.sum[2] += c.2 as u32;
        self.n += 1;
    }

    fn get(&self) -> Option<(u8, u8, u8)> {
        (self.n > 0).then(|| {
            (
                (self.sum[0] / self.n) as u8,
                (self.sum[1] / self.n) as u8,
                (self.sum[2] / self.n) as u8,
            )
        })
    }
}

impl Renderer for BrailleRenderer {
    fn name(&self) -> &'static str {
        "braille"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows)) = frame_begin(frame, 2, 4, out)? else {
            return Ok(());
        };
        self.last_fg = None;
        self.last_bg = None;
        let w = frame.pixel_width;

        for row in 0..visual_rows {
            for col in 0..cols {
                let mut rgb = [(0u8, 0u8, 0u8); 8];
                let mut lum = [0u8; 8];
                for (i, (c, l)) in rgb.iter_mut().zip(lum.iter_mut()).enumerate() {
                    *c = rgb_at(frame.pixels_rgba, w, col * 2 + i % 2, row * 4 + i / 2);
                    *l = luma_u8(c.0, c.1, c.2);
                }
                let lo = lum.iter().copied().min().unwrap_or(0) as u16;
                let hi = lum.iter().copied().max().unwrap_or(0) as u16;
                let thr = ((lo + hi) / 2) as u8;

                let mut bits = 0u8;
                let mut on = Mean::default();
                let mut off = Mean::default();
                for i in 0..8 {
                    if lum[i] > thr {
                        bits |= DOT_BITS[i];
                        on.add(rgb[i]);
                    } else {
                        off.add(rgb[i]);
                    }
                }

                let bg = off.get().unwrap_or((0, 0, 0));
                let (fg, ch) = match on.get() {
                    Some(fg) => (fg, char::from_u32(0x2800 + bits as u32).unwrap_or(' ')),
                    None => (bg, ' '),
                };

                if self.last_fg != Some(fg) {
                    write_fg_rgb(out, fg.0, fg.1, fg.2)?;
                    self.last_fg = Some(fg);
                }
                if self.last_bg != Some(bg) {
                    write_bg_rgb(out, bg.0, bg.1, bg.2)?;
                    self.last_bg = Some(bg);
                }
                write!(out, "{ch}")?;
            }
            // No break after the bottom row or the screen scrolls.
            if row + 1 < visual_rows {
                out.write_all(b"\r\n")?;
            }
        }

        frame_end(frame, cols, visual_rows, out)
    }
}
