//! Caption text preparation and the overlay layer

use image::{Rgba, RgbaImage};

use super::font::CaptionFont;

/// Caption used when a memory has no narrative text
pub const DEFAULT_CAPTION: &str = "Um momento especial.";

/// Longest caption, in characters, including the ellipsis
pub const MAX_CAPTION_CHARS: usize = 260;

const ELLIPSIS: &str = "...";

/// Wrap width in characters
pub const WRAP_WIDTH: usize = 40;

/// Vertical padding above the first and below the last line
pub const CAPTION_PADDING: u32 = 20;

/// Gap between lines
pub const LINE_SPACING: u32 = 8;

/// Horizontal space left around the caption layer (split evenly)
pub const CAPTION_SIDE_MARGIN: u32 = 200;

/// Distance from the caption's top edge to the bottom of the frame
pub const CAPTION_BOTTOM_OFFSET: u32 = 400;

const BACKING_COLOR: Rgba<u8> = Rgba([0, 0, 0, 150]);
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Trim, truncate to [`MAX_CAPTION_CHARS`] and substitute the default when empty
pub fn prepare_caption_text(narrative: &str) -> String {
    let text = narrative.trim();
    if text.is_empty() {
        return DEFAULT_CAPTION.to_string();
    }

    if text.chars().count() > MAX_CAPTION_CHARS {
        let keep = MAX_CAPTION_CHARS - ELLIPSIS.len();
        let mut truncated: String = text.chars().take(keep).collect();
        truncated.push_str(ELLIPSIS);
        return truncated;
    }

    text.to_string()
}

/// Greedy word wrap; words longer than `width` are split across lines
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut rest: Vec<char> = word.chars().collect();

        while !rest.is_empty() {
            let needed = if current_len == 0 {
                rest.len()
            } else {
                current_len + 1 + rest.len()
            };

            if needed <= width {
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(rest.iter());
                current_len += rest.len();
                break;
            }

            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }

            // Word alone is wider than a line
            let tail = rest.split_off(width);
            lines.push(rest.into_iter().collect());
            rest = tail;
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Render wrapped lines onto a semi-transparent dark layer `width` pixels wide
///
/// Height is the sum of line heights plus padding and inter-line spacing; each
/// line is centered horizontally.
pub fn render_caption_layer(font: &CaptionFont, lines: &[String], width: u32) -> RgbaImage {
    let line_height = font.line_height();
    let count = lines.len() as u32;
    let height = line_height * count
        + CAPTION_PADDING * 2
        + LINE_SPACING * count.saturating_sub(1);

    let mut layer = RgbaImage::from_pixel(width, height, BACKING_COLOR);

    let mut y = CAPTION_PADDING as i64;
    for line in lines {
        let line_width = font.text_width(line) as i64;
        let x = (width as i64 - line_width) / 2;
        font.draw_line(&mut layer, x, y, line, TEXT_COLOR);
        y += (line_height + LINE_SPACING) as i64;
    }

    layer
}
