//! Relumination renderer
//!
//! Turns one still image and a narrative into a short vertical video: the
//! image is cover-fitted to the frame, zooms in slowly over the clip, and a
//! wrapped caption sits on a dark band near the bottom.

pub mod caption;
pub mod encoder;
pub mod font;
pub mod frames;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::ImageReader;
use thiserror::Error;
use tracing::info;

use crate::config::RenderConfig;
use caption::{
    prepare_caption_text, render_caption_layer, wrap_text, CAPTION_BOTTOM_OFFSET,
    CAPTION_SIDE_MARGIN, WRAP_WIDTH,
};
pub use encoder::{EncodeMetadata, FfmpegEncoder, VideoEncoder};
pub use font::CaptionFont;
use frames::{cover_fit, FrameSequence};

/// Renderer errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Source image unreadable or not an image
    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Video encoding failed: {0}")]
    Encode(String),
}

/// Visual treatment applied to a relumination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReluminationStyle {
    /// Slow zoom with bottom caption
    #[default]
    Style1,
}

impl ReluminationStyle {
    pub fn id(self) -> i64 {
        match self {
            ReluminationStyle::Style1 => 1,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(ReluminationStyle::Style1),
            _ => None,
        }
    }

    /// `<token>_style<N>.mp4`
    pub fn output_file_name(self, token: &str) -> String {
        format!("{}_style{}.mp4", token, self.id())
    }
}

pub struct Renderer {
    config: RenderConfig,
    font: CaptionFont,
    encoder: Arc<dyn VideoEncoder>,
}

impl Renderer {
    /// Build a renderer, loading the configured caption font once
    pub fn new(config: RenderConfig, encoder: Arc<dyn VideoEncoder>) -> Self {
        let font = CaptionFont::load(&config.font_path, config.font_size);
        Self::with_font(config, font, encoder)
    }

    pub fn with_font(config: RenderConfig, font: CaptionFont, encoder: Arc<dyn VideoEncoder>) -> Self {
        Self {
            config,
            font,
            encoder,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `image_path` with `narrative` as caption; returns the new video's path
    ///
    /// Blocking and CPU-heavy. A partially written output is removed on failure.
    pub fn render(
        &self,
        image_path: &Path,
        narrative: &str,
        title: &str,
        style: ReluminationStyle,
    ) -> Result<PathBuf, RenderError> {
        let started = Instant::now();
        let video = self.config.video;

        let source = ImageReader::open(image_path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| RenderError::Decode(format!("{}: {}", image_path.display(), e)))?;
        let base = cover_fit(&source.to_rgba8(), video.width, video.height)?;

        let text = prepare_caption_text(narrative);
        let lines = wrap_text(&text, WRAP_WIDTH);
        let caption_width = video.width.saturating_sub(CAPTION_SIDE_MARGIN).max(1);
        let caption = render_caption_layer(&self.font, &lines, caption_width);
        let caption_origin = (
            (video.width as i64 - caption.width() as i64) / 2,
            video.height as i64 - CAPTION_BOTTOM_OFFSET as i64,
        );

        std::fs::create_dir_all(&self.config.output_dir)?;
        let output = self
            .config
            .output_dir
            .join(style.output_file_name(&relluna_common::uuid_utils::hex_token()));

        let frames = FrameSequence::new(&base, &caption, caption_origin, video);
        let metadata = EncodeMetadata {
            title: title.to_string(),
        };

        if let Err(e) = self.encoder.encode(frames, &output, &metadata) {
            let _ = std::fs::remove_file(&output);
            return Err(e);
        }

        info!(
            output = %output.display(),
            style = style.id(),
            caption_lines = lines.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Relumination rendered"
        );
        Ok(output)
    }
}
