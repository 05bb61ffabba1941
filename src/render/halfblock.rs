use crate::render::{frame_begin, frame_end, rgb_at, write_bg_rgb, write_fg_rgb, Frame, Renderer};
use std::io::Write;

/// Two pixels per cell: upper half block with the top pixel as foreground
/// and the bottom pixel as background.
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows)) = frame_begin(frame, 1, 2, out)? else {
            return Ok(());
        };
        self.last_fg = None;
        self.last_bg = None;

        const HALF_BLOCK: &str = "\u{2580}";
        let w = frame.pixel_width;
        let px = frame.pixels_rgba;

        for row in 0..visual_rows {
            for x in 0..cols {
                let top = rgb_at(px, w, x, row * 2);
                let bot = rgb_at(px, w, x, row * 2 + 1);
                if self.last_fg != Some(top) {
                    write_fg_rgb(out, top.0, top.1, top.2)?;
                    self.last_fg = Some(top);
                }
                if self.last_bg != Some(bot) {
                    write_bg_rgb(out, bot.0, bot.1, bot.2)?;
                    self.last_bg = Some(bot);
                }
                out.write_all(HALF_BLOCK.as_bytes())?;
            }
            // No break after the bottom row or the screen scrolls.
            if row + 1 < visual_rows {
                out.write_all(b"\r\n")?;
            }
        }

        frame_end(frame, cols, visual_rows, out)
    }
}
