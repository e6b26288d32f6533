pub mod canvas_surface;
pub mod chart_renderer;
pub mod dom_renderer;
pub mod frame;
pub mod surface;

pub use canvas_surface::CanvasSurface;
pub use chart_renderer::ChartRenderer;
pub use dom_renderer::{DomRenderer, ImbalanceBar, imbalance_bar_geometry};
pub use frame::RenderFrame;
pub use surface::{DrawCommand, DrawSurface, Layer, RecordingSurface, TextAlign, TextStyle};

use crate::domain::logging::LogComponent;
use crate::log_warn;

/// Draw text, logging and skipping failures so one bad label never aborts a frame.
pub(crate) fn text(surface: &mut dyn DrawSurface, label: &str, x: f64, y: f64, style: &TextStyle) {
    if let Err(e) = surface.text(label, x, y, style) {
        log_warn!(LogComponent::Infrastructure("Renderer"), "text '{}' skipped: {}", label, e);
    }
}
