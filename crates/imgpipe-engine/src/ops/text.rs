//! Text masks.
//!
//! Renders a string to a one-band coverage mask (0..255). Rendering goes
//! through cosmic-text when the `text` feature is on; without it, or when no
//! glyphs come out (empty string, no usable fonts), the mask is a single
//! zero pixel.

use imgpipe_core::Interpretation;

use crate::error::{OpResult, Status};
use crate::image::{Meta, VImage};
use crate::operation::call_uncached;

/// Point size used when the font description carries none.
const DEFAULT_POINTS: f32 = 12.0;

/// Splits a font description such as `"sans bold 10"` into family and point size.
pub(crate) fn parse_font(font: &str) -> (String, f32) {
    let font = font.trim();
    match font.rsplit_once(' ') {
        Some((family, size)) => match size.parse::<f32>() {
            Ok(points) if points > 0.0 => (family.trim().to_string(), points),
            _ => (font.to_string(), DEFAULT_POINTS),
        },
        None => match font.parse::<f32>() {
            Ok(points) if points > 0.0 => (String::new(), points),
            _ => (font.to_string(), DEFAULT_POINTS),
        },
    }
}

fn empty_mask() -> OpResult<VImage> {
    VImage::from_samples(1, 1, 1, Interpretation::Bw, vec![0.0], Meta::default())
}

/// Renders `text` with the given font description, wrapped at `width` pixels
/// (no wrapping when `width <= 0`), at `dpi` dots per inch.
pub fn text(text: &str, font: &str, width: i32, dpi: i32) -> Status<VImage> {
    call_uncached("text", || text_mask(text, font, width, dpi))
}

pub(crate) fn text_mask(text: &str, font: &str, width: i32, dpi: i32) -> OpResult<VImage> {
    if text.is_empty() {
        return empty_mask();
    }
    render(text, font, width, dpi)
}

#[cfg(feature = "text")]
mod render_impl {
    use std::sync::Mutex;

    use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache};
    use imgpipe_core::Interpretation;
    use tracing::debug;

    use super::{empty_mask, parse_font};
    use crate::error::OpResult;
    use crate::image::{check_size, Meta, VImage};

    // Font discovery is slow; share one system across calls
    lazy_static::lazy_static! {
        static ref FONT_SYSTEM: Mutex<FontSystem> = Mutex::new(FontSystem::new());
        static ref SWASH_CACHE: Mutex<SwashCache> = Mutex::new(SwashCache::new());
    }

    pub fn render(text: &str, font: &str, width: i32, dpi: i32) -> OpResult<VImage> {
        let (family_name, points) = parse_font(font);
        let dpi = if dpi > 0 { dpi as f32 } else { 72.0 };
        let font_size = points * dpi / 72.0;

        let mut font_system = FONT_SYSTEM.lock().unwrap_or_else(|e| e.into_inner());
        let mut swash_cache = SWASH_CACHE.lock().unwrap_or_else(|e| e.into_inner());

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(&mut font_system, Metrics::new(font_size, line_height));
        let layout_width = if width > 0 { Some(width as f32) } else { None };
        buffer.set_size(&mut font_system, layout_width, None);

        let family = match family_name.to_lowercase().as_str() {
            "" | "sans" | "sans-serif" => Family::SansSerif,
            "serif" => Family::Serif,
            "monospace" | "mono" => Family::Monospace,
            "cursive" => Family::Cursive,
            "fantasy" => Family::Fantasy,
            _ => Family::Name(&family_name),
        };
        let attrs = Attrs::new().family(family);
        buffer.set_text(&mut font_system, text, &attrs, Shaping::Advanced);
        buffer.shape_until_scroll(&mut font_system, false);

        let (text_width, text_height) = {
            let mut max_x = 0.0f32;
            let mut max_y = 0.0f32;
            for run in buffer.layout_runs() {
                for glyph in run.glyphs.iter() {
                    max_x = max_x.max(glyph.x + glyph.w);
                }
                max_y = max_y.max(run.line_y + line_height);
            }
            (max_x.ceil() as i64, max_y.ceil() as i64)
        };
        if text_width <= 0 || text_height <= 0 {
            debug!(text, font, "no glyphs rendered");
            return empty_mask();
        }

        let (w, h) = (text_width as u32, text_height as u32);
        check_size("text", w, h, 1)?;
        let mut mask = vec![0.0f32; w as usize * h as usize];
        buffer.draw(
            &mut font_system,
            &mut swash_cache,
            Color::rgba(255, 255, 255, 255),
            |x, y, gw, gh, color| {
                let coverage = color.a() as f32;
                for dy in 0..gh as i32 {
                    for dx in 0..gw as i32 {
                        let (px, py) = (x + dx, y + dy);
                        if px < 0 || py < 0 || px >= w as i32 || py >= h as i32 {
                            continue;
                        }
                        let i = py as usize * w as usize + px as usize;
                        mask[i] = mask[i].max(coverage);
                    }
                }
            },
        );
        VImage::from_samples(w, h, 1, Interpretation::Bw, mask, Meta::default())
    }
}

#[cfg(feature = "text")]
use render_impl::render;

#[cfg(not(feature = "text"))]
fn render(text: &str, font: &str, _width: i32, _dpi: i32) -> OpResult<VImage> {
    tracing::debug!(text, font, "text rendering not compiled in");
    empty_mask()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testutil::engine;

    #[test]
    fn font_descriptions() {
        assert_eq!(parse_font("sans 10"), ("sans".to_string(), 10.0));
        assert_eq!(parse_font("DejaVu Sans Bold 14"), ("DejaVu Sans Bold".to_string(), 14.0));
        assert_eq!(parse_font("serif"), ("serif".to_string(), DEFAULT_POINTS));
        assert_eq!(parse_font(""), (String::new(), DEFAULT_POINTS));
    }

    #[test]
    fn empty_text_gives_blank_mask() {
        engine();
        let mask = text("", "sans 10", 100, 72).unwrap();
        assert_eq!((mask.width(), mask.height(), mask.bands()), (1, 1, 1));
        assert_eq!(mask.pixels(), &[0.0]);
    }

    #[test]
    fn mask_is_single_band() {
        engine();
        let mask = text("imgpipe", "sans 12", 0, 72).unwrap();
        assert_eq!(mask.bands(), 1);
        assert_eq!(mask.interpretation(), Interpretation::Bw);
        assert!(mask.pixels().iter().all(|v| (0.0..=255.0).contains(v)));
    }
}
