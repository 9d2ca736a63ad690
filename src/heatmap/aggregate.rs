use serde::{Deserialize, Serialize};

use crate::models::{ClassifiedEvent, Viewport};
use crate::settings::HeatmapSettings;

pub const SCREEN_OUTLINE_LABEL: &str = "SCREEN AREA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: i32,
    pub y: i32,
    pub value: u32,
}

/// Weighted point list plus the intensity ceiling, as handed to a renderer.
/// Coinciding points are left separate; summing them is the renderer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub max: u32,
    pub points: Vec<HeatmapPoint>,
}

/// Dashed rectangle marking the real screen on the extended report canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportOutline {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportView {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub data: HeatmapData,
    pub outline: ViewportOutline,
}

/// On-screen gaze only, in viewport coordinates.
pub fn build_live_view(events: &[ClassifiedEvent], settings: &HeatmapSettings) -> HeatmapData {
    let points = events
        .iter()
        .filter(|event| !event.off_screen)
        .map(|event| HeatmapPoint {
            x: event.x,
            y: event.y,
            value: settings.point_weight,
        })
        .collect();

    HeatmapData {
        max: settings.max_intensity,
        points,
    }
}

/// Every event, shifted by the margin so excursions past the screen edge
/// land on a canvas `margin` wider on each side.
pub fn build_report_view(
    events: &[ClassifiedEvent],
    viewport: Viewport,
    settings: &HeatmapSettings,
) -> ReportView {
    let margin = settings.report_margin;
    let offset = i32::try_from(margin).unwrap_or(i32::MAX);

    let points = events
        .iter()
        .map(|event| HeatmapPoint {
            x: event.x.saturating_add(offset),
            y: event.y.saturating_add(offset),
            value: settings.point_weight,
        })
        .collect();

    ReportView {
        canvas_width: viewport.width.saturating_add(margin.saturating_mul(2)),
        canvas_height: viewport.height.saturating_add(margin.saturating_mul(2)),
        data: HeatmapData {
            max: settings.max_intensity,
            points,
        },
        outline: ViewportOutline {
            x: margin,
            y: margin,
            width: viewport.width,
            height: viewport.height,
            label: SCREEN_OUTLINE_LABEL.to_string(),
        },
    }
}
