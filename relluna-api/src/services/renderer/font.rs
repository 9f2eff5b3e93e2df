//! Caption fonts
//!
//! A TrueType font is preferred; when it cannot be read the built-in 8×8
//! bitmap font is used instead, so rendering never fails for lack of a font.

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::{info, warn};

/// Pixel size of one bitmap-font dot
pub const BITMAP_SCALE: u32 = 2;

const BITMAP_CELL: u32 = 8;

pub enum CaptionFont {
    TrueType { font: FontVec, scale: PxScale },
    Bitmap { scale: u32 },
}

impl CaptionFont {
    /// Load a TrueType font, falling back to the built-in bitmap font
    pub fn load(path: &Path, size_px: f32) -> Self {
        let loaded = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|e| e.to_string()));

        match loaded {
            Ok(font) => {
                info!(font = %path.display(), size_px, "Caption font loaded");
                CaptionFont::TrueType {
                    font,
                    scale: PxScale::from(size_px),
                }
            }
            Err(e) => {
                warn!(
                    font = %path.display(),
                    error = %e,
                    "Caption font unavailable, using built-in bitmap font"
                );
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        CaptionFont::Bitmap {
            scale: BITMAP_SCALE,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, CaptionFont::Bitmap { .. })
    }

    pub fn line_height(&self) -> u32 {
        match self {
            CaptionFont::TrueType { font, scale } => {
                let scaled = font.as_scaled(*scale);
                (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32
            }
            CaptionFont::Bitmap { scale } => BITMAP_CELL * scale,
        }
    }

    pub fn text_width(&self, text: &str) -> u32 {
        match self {
            CaptionFont::TrueType { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let mut width = 0.0f32;
                let mut previous: Option<GlyphId> = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                width.ceil().max(0.0) as u32
            }
            CaptionFont::Bitmap { scale } => text.chars().count() as u32 * BITMAP_CELL * scale,
        }
    }

    /// Draw one line with its top-left corner at (`x`, `y`); clipped to the canvas
    pub fn draw_line(&self, canvas: &mut RgbaImage, x: i64, y: i64, text: &str, color: Rgba<u8>) {
        match self {
            CaptionFont::TrueType { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut previous: Option<GlyphId> = None;

                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(*scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    previous = Some(id);

                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, coverage| {
                            let px = bounds.min.x as i64 + gx as i64;
                            let py = bounds.min.y as i64 + gy as i64;
                            blend_pixel(canvas, px, py, color, coverage);
                        });
                    }
                }
            }
            CaptionFont::Bitmap { scale } => {
                let advance = (BITMAP_CELL * scale) as i64;
                for (index, c) in text.chars().enumerate() {
                    let rows = BASIC_FONTS
                        .get(c)
                        .or_else(|| LATIN_FONTS.get(c))
                        .or_else(|| BASIC_FONTS.get('?'))
                        .unwrap_or([0; 8]);
                    let origin_x = x + index as i64 * advance;

                    for (row, bits) in rows.iter().enumerate() {
                        for col in 0..BITMAP_CELL {
                            // Bit 0 is the leftmost dot
                            if bits & (1 << col) == 0 {
                                continue;
                            }
                            let dot_x = origin_x + (col * scale) as i64;
                            let dot_y = y + (row as u32 * scale) as i64;
                            for dy in 0..*scale as i64 {
                                for dx in 0..*scale as i64 {
                                    blend_pixel(canvas, dot_x + dx, dot_y + dy, color, 1.0);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Alpha-composite `color` at `coverage` over one canvas pixel (out-of-bounds ignored)
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }

    let src_alpha = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if src_alpha <= 0.0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    for channel in 0..3 {
        let blended = (color[channel] as f32 * src_alpha
            + dst[channel] as f32 * dst_alpha * (1.0 - src_alpha))
            / out_alpha;
        dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round() as u8;
}
