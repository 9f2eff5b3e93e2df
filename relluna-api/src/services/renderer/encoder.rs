//! Video encoding
//!
//! `FfmpegEncoder` pipes raw RGBA frames into an external `ffmpeg` process and
//! lets it produce H.264/MP4.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::frames::FrameSequence;
use super::RenderError;

/// Container metadata written alongside the frames
#[derive(Debug, Clone, Default)]
pub struct EncodeMetadata {
    pub title: String,
}

/// Turns a frame sequence into a finished video file at `output`
///
/// Called from a blocking thread; implementations may block.
pub trait VideoEncoder: Send + Sync {
    fn encode(
        &self,
        frames: FrameSequence<'_>,
        output: &Path,
        metadata: &EncodeMetadata,
    ) -> Result<(), RenderError>;
}

/// Encoder backed by the `ffmpeg` command-line tool
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether the binary can be started at all
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(
        &self,
        frames: FrameSequence<'_>,
        output: &Path,
        metadata: &EncodeMetadata,
    ) -> Result<(), RenderError> {
        let params = frames.params();

        let mut child = Command::new(&self.binary)
            .args(["-y", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .arg("-s")
            .arg(format!("{}x{}", params.width, params.height))
            .arg("-r")
            .arg(params.fps.to_string())
            .args(["-i", "-", "-an"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .arg("-metadata")
            .arg(format!("title={}", metadata.title))
            .args(["-movflags", "+faststart"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::Encode(format!("encoder binary '{}' not found", self.binary))
                } else {
                    RenderError::Encode(format!("failed to start '{}': {}", self.binary, e))
                }
            })?;

        debug!(
            binary = %self.binary,
            output = %output.display(),
            frames = params.frame_count(),
            "Encoder started"
        );

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Encode("encoder stdin unavailable".to_string()))?;

        let mut write_result = Ok(());
        for frame in frames {
            if let Err(e) = stdin.write_all(frame.as_raw()) {
                write_result = Err(e);
                break;
            }
        }
        // Closing stdin signals end of stream
        drop(stdin);

        let finished = child.wait_with_output()?;
        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(RenderError::Encode(format!(
                "encoder exited with {}: {}",
                finished.status,
                stderr.trim()
            )));
        }

        write_result
            .map_err(|e| RenderError::Encode(format!("writing frames to encoder failed: {}", e)))
    }
}
