//! Frame composition: cover-fit base image, slow zoom, caption overlay

use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::RenderError;
use crate::config::VideoParams;

/// Total zoom gained over the clip
pub const ZOOM_GROWTH: f64 = 0.08;

/// Zoom at `t` seconds into a clip of `duration` seconds: 1.0 at start, 1.08 at end
pub fn zoom_factor(t: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    1.0 + ZOOM_GROWTH * (t / duration).clamp(0.0, 1.0)
}

/// Scale to fill `width`×`height` (height first) and center-crop the overflow
pub fn cover_fit(source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, RenderError> {
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(RenderError::Decode("source image has no pixels".to_string()));
    }

    let mut scale = height as f64 / src_h as f64;
    if (src_w as f64 * scale) < width as f64 {
        scale = width as f64 / src_w as f64;
    }

    let scaled_w = ((src_w as f64 * scale).round() as u32).max(width);
    let scaled_h = ((src_h as f64 * scale).round() as u32).max(height);
    let resized = imageops::resize(source, scaled_w, scaled_h, FilterType::Lanczos3);

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    Ok(imageops::crop_imm(&resized, x, y, width, height).to_image())
}

/// Lazily composed frames of one clip
///
/// Each frame is produced on demand so the whole clip is never held in memory.
pub struct FrameSequence<'a> {
    base: &'a RgbaImage,
    caption: &'a RgbaImage,
    caption_origin: (i64, i64),
    params: VideoParams,
    next: u32,
}

impl<'a> FrameSequence<'a> {
    pub fn new(
        base: &'a RgbaImage,
        caption: &'a RgbaImage,
        caption_origin: (i64, i64),
        params: VideoParams,
    ) -> Self {
        Self {
            base,
            caption,
            caption_origin,
            params,
            next: 0,
        }
    }

    pub fn params(&self) -> VideoParams {
        self.params
    }

    pub fn frame_count(&self) -> u32 {
        self.params.frame_count()
    }

    /// Timestamp of frame `index` in seconds
    pub fn time_at(&self, index: u32) -> f64 {
        index as f64 / self.params.fps.max(1) as f64
    }

    pub fn render_frame(&self, index: u32) -> RgbaImage {
        let VideoParams { width, height, .. } = self.params;
        let zoom = zoom_factor(self.time_at(index), self.params.duration_secs as f64);

        // Zoom is anchored at the frame center, so all four edges crop in evenly
        let crop_w = ((width as f64 / zoom).round() as u32).clamp(1, width);
        let crop_h = ((height as f64 / zoom).round() as u32).clamp(1, height);
        let x = (width - crop_w) / 2;
        let y = (height - crop_h) / 2;

        let cropped = imageops::crop_imm(self.base, x, y, crop_w, crop_h).to_image();
        let mut frame = if crop_w == width && crop_h == height {
            cropped
        } else {
            imageops::resize(&cropped, width, height, FilterType::Triangle)
        };

        imageops::overlay(&mut frame, self.caption, self.caption_origin.0, self.caption_origin.1);
        frame
    }
}

impl Iterator for FrameSequence<'_> {
    type Item = RgbaImage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.frame_count() {
            return None;
        }
        let frame = self.render_frame(self.next);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.frame_count().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameSequence<'_> {}
