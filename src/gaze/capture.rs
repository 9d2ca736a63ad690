use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, RgbImage};

use crate::settings::CaptureSettings;

pub const SNAPSHOT_EXTENSION: &str = "jpg";
const SNAPSHOT_MIME: &str = "image/jpeg";

/// Live video the proctor can sample frames from (the webcam feed).
pub trait FrameSource: Send {
    /// Size of the current frame, `None` while no video is playing.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Draw the current frame scaled to `width` × `height`.
    fn draw_scaled(&mut self, width: u32, height: u32) -> Result<RgbImage>;
}

/// An encoded snapshot ready to be attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub data_url: String,
    pub extension: &'static str,
}

/// Capture collaborator invoked for every off-screen sample.
/// `Ok(None)` means there was nothing to capture, which is not a failure.
pub trait SnapshotCapture: Send {
    fn capture(&mut self) -> Result<Option<CapturedFrame>>;
}

/// Capture that never produces a frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl SnapshotCapture for NoCapture {
    fn capture(&mut self) -> Result<Option<CapturedFrame>> {
        Ok(None)
    }
}

/// Downscales the current video frame and encodes it as a JPEG data URL.
pub struct JpegSnapshotCapture {
    source: Option<Box<dyn FrameSource>>,
    settings: CaptureSettings,
}

impl JpegSnapshotCapture {
    pub fn new(source: Option<Box<dyn FrameSource>>, settings: CaptureSettings) -> Self {
        Self { source, settings }
    }

    pub fn set_source(&mut self, source: Option<Box<dyn FrameSource>>) {
        self.source = source;
    }
}

impl SnapshotCapture for JpegSnapshotCapture {
    fn capture(&mut self) -> Result<Option<CapturedFrame>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let Some((width, height)) = source.dimensions() else {
            return Ok(None);
        };
        let Some((width, height)) =
            downscaled_dimensions(width, height, self.settings.downscale_factor)
        else {
            return Ok(None);
        };

        let frame = source
            .draw_scaled(width, height)
            .context("failed to draw video frame")?;
        let jpeg = encode_jpeg(&frame, self.settings.jpeg_quality)?;

        Ok(Some(CapturedFrame {
            data_url: to_data_url(SNAPSHOT_MIME, &jpeg),
            extension: SNAPSHOT_EXTENSION,
        }))
    }
}

/// Integer division of both sides by `factor`; `None` if either side collapses to zero.
pub fn downscaled_dimensions(width: u32, height: u32, factor: u32) -> Option<(u32, u32)> {
    let factor = factor.max(1);
    let scaled = (width / factor, height / factor);
    (scaled.0 > 0 && scaled.1 > 0).then_some(scaled)
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(frame)
        .context("jpeg encoding failed")?;
    Ok(bytes)
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// A fixed image standing in for a camera, e.g. when replaying recorded gaze.
pub struct StillFrameSource {
    frame: RgbImage,
}

impl StillFrameSource {
    pub fn new(frame: RgbImage) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillFrameSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.frame.dimensions())
    }

    fn draw_scaled(&mut self, width: u32, height: u32) -> Result<RgbImage> {
        Ok(image::imageops::resize(
            &self.frame,
            width,
            height,
            FilterType::Triangle,
        ))
    }
}
