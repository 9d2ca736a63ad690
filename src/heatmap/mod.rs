pub mod aggregate;
pub mod overlay;
pub mod render;

pub use aggregate::{
    build_live_view, build_report_view, HeatmapData, HeatmapPoint, ReportView, ViewportOutline,
};
pub use overlay::{compose_report_image, encode_png};
pub use render::{
    await_render_completion, HeatmapRenderer, RasterHeatmapRenderer, RasterRendererFactory,
    RenderSync, RendererConfig, RendererFactory,
};
