use super::surface::{DrawSurface, Layer, TextStyle};
use crate::domain::chart::{Color, Rect};
use crate::domain::errors::{AppError, RenderingResult};
use crate::domain::logging::LogComponent;
use crate::log_debug;
use js_sys::Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

fn js_err(op: &str, e: JsValue) -> AppError {
    AppError::RenderingError(format!("{} failed: {:?}", op, e))
}

/// [`DrawSurface`] over a browser 2D canvas. The device-pixel-ratio transform
/// is set once per resize, so every caller works in CSS pixels.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    dpr: f64,
    clip_active: bool,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> RenderingResult<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|e| js_err("getContext", e))?
            .ok_or_else(|| AppError::RenderingError("2D context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| AppError::RenderingError("context is not CanvasRenderingContext2d".to_string()))?;
        Ok(Self { canvas, context, dpr: 1.0, clip_active: false })
    }

    pub fn device_pixel_ratio() -> f64 {
        web_sys::window().map(|w| w.device_pixel_ratio()).filter(|r| *r > 0.0).unwrap_or(1.0)
    }

    /// Size the backing store to `css * dpr` and scale the context once.
    pub fn resize(&mut self, css_width: f64, css_height: f64, dpr: f64) -> RenderingResult<()> {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        self.canvas.set_width((css_width.max(0.0) * dpr).round() as u32);
        self.canvas.set_height((css_height.max(0.0) * dpr).round() as u32);
        // resizing resets context state, including any clip
        self.clip_active = false;
        self.context.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).map_err(|e| js_err("setTransform", e))?;
        self.dpr = dpr;
        log_debug!(
            LogComponent::Infrastructure("Canvas"),
            "canvas {}x{} css at dpr {}",
            css_width,
            css_height,
            dpr
        );
        Ok(())
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn stroke_path(&self, points: &[(f64, f64)], color: Color, width: f64) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let ctx = &self.context;
        ctx.set_stroke_style_str(&color.to_css());
        ctx.set_line_width(width);
        ctx.begin_path();
        ctx.move_to(first.0, first.1);
        for p in rest {
            ctx.line_to(p.0, p.1);
        }
        ctx.stroke();
    }
}

impl DrawSurface for CanvasSurface {
    fn begin_layer(&mut self, _layer: Layer) {}

    fn clear(&mut self, width: f64, height: f64, color: Color) {
        self.context.clear_rect(0.0, 0.0, width, height);
        self.context.set_fill_style_str(&color.to_css());
        self.context.fill_rect(0.0, 0.0, width, height);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.context.set_fill_style_str(&color.to_css());
        self.context.fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.context.set_stroke_style_str(&color.to_css());
        self.context.set_line_width(width);
        self.context.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64) {
        self.stroke_path(&[from, to], color, width);
    }

    fn dashed_line(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        width: f64,
        dash: &[f64],
    ) -> RenderingResult<()> {
        let pattern: Array = dash.iter().map(|d| JsValue::from_f64(*d)).collect();
        self.context.set_line_dash(&pattern).map_err(|e| js_err("setLineDash", e))?;
        self.stroke_path(&[from, to], color, width);
        self.context.set_line_dash(&Array::new()).map_err(|e| js_err("setLineDash", e))
    }

    fn polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        self.stroke_path(points, color, width);
    }

    fn text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) -> RenderingResult<()> {
        let ctx = &self.context;
        ctx.set_font(&style.font());
        ctx.set_text_align(style.align.as_css());
        ctx.set_text_baseline("middle");
        ctx.set_fill_style_str(&style.color.to_css());
        ctx.fill_text(text, x, y).map_err(|e| js_err("fillText", e))
    }

    fn measure_text(&self, text: &str, size_px: f64) -> f64 {
        self.context.set_font(&TextStyle::new(Color::BLACK, size_px).font());
        self.context
            .measure_text(text)
            .map(|m| m.width())
            .unwrap_or(text.chars().count() as f64 * size_px * 0.6)
    }

    fn radial_disc(&mut self, center: (f64, f64), radius: f64, inner: Color, outer: Color) -> RenderingResult<()> {
        let ctx = &self.context;
        let gradient = ctx
            .create_radial_gradient(center.0, center.1, 0.0, center.0, center.1, radius)
            .map_err(|e| js_err("createRadialGradient", e))?;
        gradient.add_color_stop(0.0, &inner.to_css()).map_err(|e| js_err("addColorStop", e))?;
        gradient.add_color_stop(1.0, &outer.to_css()).map_err(|e| js_err("addColorStop", e))?;
        ctx.set_fill_style_canvas_gradient(&gradient);
        ctx.begin_path();
        ctx.arc(center.0, center.1, radius, 0.0, std::f64::consts::TAU).map_err(|e| js_err("arc", e))?;
        ctx.fill();
        Ok(())
    }

    fn set_clip(&mut self, rect: Option<Rect>) {
        if self.clip_active {
            self.context.restore();
            self.clip_active = false;
        }
        if let Some(rect) = rect {
            self.context.save();
            self.context.begin_path();
            self.context.rect(rect.x, rect.y, rect.width, rect.height);
            self.context.clip();
            self.clip_active = true;
        }
    }
}
