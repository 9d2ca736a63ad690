use std::time::Duration;

use anyhow::{bail, Result};
use image::{Rgba, RgbaImage};

use crate::settings::HeatmapSettings;

use super::aggregate::HeatmapData;

/// Largest canvas the raster renderer will allocate (pixels).
const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Colour stops of the intensity gradient, low to high.
const GRADIENT: [(f32, [u8; 3]); 4] = [
    (0.25, [0, 0, 255]),
    (0.55, [0, 255, 0]),
    (0.85, [255, 255, 0]),
    (1.0, [255, 0, 0]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    pub radius: u32,
    pub min_opacity: f32,
    pub max_opacity: f32,
    pub blur: f32,
}

impl From<&HeatmapSettings> for RendererConfig {
    fn from(settings: &HeatmapSettings) -> Self {
        Self {
            radius: settings.radius,
            min_opacity: settings.min_opacity,
            max_opacity: settings.max_opacity,
            blur: settings.blur,
        }
    }
}

/// How a caller learns that a renderer has finished drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSync {
    /// `set_data` returns after drawing.
    Immediate,
    /// No completion signal; the caller waits a fixed settle time.
    Settle,
}

/// Turns a weighted point list into a raster layer.
pub trait HeatmapRenderer: Send {
    fn set_data(&mut self, data: &HeatmapData) -> Result<()>;

    fn sync(&self) -> RenderSync;

    /// Read back the backing canvas.
    fn canvas(&self) -> Result<RgbaImage>;
}

pub trait RendererFactory: Send + Sync {
    fn create(&self, width: u32, height: u32, config: RendererConfig)
        -> Result<Box<dyn HeatmapRenderer>>;
}

/// Suspension point between drawing and canvas readback. `settle` only
/// applies to renderers that cannot signal completion.
pub async fn await_render_completion(sync: RenderSync, settle: Duration) {
    match sync {
        RenderSync::Immediate => tokio::task::yield_now().await,
        RenderSync::Settle => tokio::time::sleep(settle).await,
    }
}

/// In-process renderer: radial falloff splats summed into an intensity field,
/// then coloured through `GRADIENT` with alpha between the opacity bounds.
pub struct RasterHeatmapRenderer {
    width: u32,
    height: u32,
    config: RendererConfig,
    layer: RgbaImage,
}

impl RasterHeatmapRenderer {
    pub fn new(width: u32, height: u32, config: RendererConfig) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("heatmap canvas must be non-empty, got {width}x{height}");
        }
        if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
            bail!("heatmap canvas {width}x{height} exceeds the pixel limit");
        }
        Ok(Self {
            width,
            height,
            config,
            layer: RgbaImage::new(width, height),
        })
    }

    fn intensity_field(&self, data: &HeatmapData) -> Vec<f32> {
        let (w, h) = (self.width as i64, self.height as i64);
        let mut field = vec![0f32; (w * h) as usize];
        let radius = self.config.radius.max(1) as f32;
        let inner = radius * (1.0 - self.config.blur.clamp(0.0, 1.0));
        let reach = radius.ceil() as i64;

        for point in &data.points {
            let (px, py) = (i64::from(point.x), i64::from(point.y));
            let value = point.value as f32;
            for y in (py - reach).max(0)..(py + reach + 1).min(h) {
                for x in (px - reach).max(0)..(px + reach + 1).min(w) {
                    let distance = (((x - px).pow(2) + (y - py).pow(2)) as f32).sqrt();
                    if distance > radius {
                        continue;
                    }
                    let falloff = if distance <= inner || radius <= inner {
                        1.0
                    } else {
                        1.0 - (distance - inner) / (radius - inner)
                    };
                    field[(y * w + x) as usize] += value * falloff;
                }
            }
        }

        field
    }

    fn colorize(&self, intensity: f32, max: f32) -> Rgba<u8> {
        if intensity <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let level = (intensity / max).min(1.0);
        let [r, g, b] = gradient_color(level);
        let (lo, hi) = (self.config.min_opacity, self.config.max_opacity);
        let alpha = (lo + (hi - lo) * level).clamp(0.0, 1.0);
        Rgba([r, g, b, (alpha * 255.0).round() as u8])
    }
}

impl HeatmapRenderer for RasterHeatmapRenderer {
    fn set_data(&mut self, data: &HeatmapData) -> Result<()> {
        if data.max == 0 {
            bail!("heatmap max intensity must be positive");
        }
        let field = self.intensity_field(data);
        let max = data.max as f32;
        let width = self.width;

        for (index, intensity) in field.into_iter().enumerate() {
            let index = index as u32;
            let pixel = self.colorize(intensity, max);
            self.layer.put_pixel(index % width, index / width, pixel);
        }
        Ok(())
    }

    fn sync(&self) -> RenderSync {
        RenderSync::Immediate
    }

    fn canvas(&self) -> Result<RgbaImage> {
        Ok(self.layer.clone())
    }
}

pub struct RasterRendererFactory;

impl RendererFactory for RasterRendererFactory {
    fn create(
        &self,
        width: u32,
        height: u32,
        config: RendererConfig,
    ) -> Result<Box<dyn HeatmapRenderer>> {
        Ok(Box::new(RasterHeatmapRenderer::new(width, height, config)?))
    }
}

fn gradient_color(level: f32) -> [u8; 3] {
    let (first_stop, first_color) = GRADIENT[0];
    if level <= first_stop {
        return first_color;
    }
    for pair in GRADIENT.windows(2) {
        let (lo_stop, lo) = pair[0];
        let (hi_stop, hi) = pair[1];
        if level <= hi_stop {
            let t = (level - lo_stop) / (hi_stop - lo_stop);
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            return [mix(lo[0], hi[0]), mix(lo[1], hi[1]), mix(lo[2], hi[2])];
        }
    }
    GRADIENT[GRADIENT.len() - 1].1
}
