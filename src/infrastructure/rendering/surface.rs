//! Immediate-mode 2D drawing seam. The chart and DOM renderers only talk to
//! [`DrawSurface`]; the browser canvas and the headless recorder implement it.
//! All coordinates are device-independent pixels.

use crate::domain::chart::{Color, Rect};
use crate::domain::errors::RenderingResult;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter};

/// Compositing layers in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, StrumDisplay, EnumIter, AsRefStr)]
pub enum Layer {
    Background,
    Grid,
    Candles,
    Volume,
    Indicators,
    OiBubbles,
    Drawings,
    PriceAxis,
    TimeAxis,
    DomPanel,
    Watermark,
    Crosshair,
    Tooltip,
    /// Replaces everything above `Background` while active.
    DomFullscreen,
    /// Empty-series placeholder.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size_px: f64,
    pub align: TextAlign,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(color: Color, size_px: f64) -> Self {
        Self { color, size_px, align: TextAlign::Left, bold: false }
    }

    pub fn align(self, align: TextAlign) -> Self {
        Self { align, ..self }
    }

    pub fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    /// CSS font shorthand for a 2D context.
    pub fn font(&self) -> String {
        let weight = if self.bold { "bold " } else { "" };
        format!("{}{}px -apple-system, BlinkMacSystemFont, 'Segoe UI', monospace", weight, self.size_px)
    }
}

/// Backend-neutral drawing target. Text is drawn with a middle baseline.
pub trait DrawSurface {
    /// Marks the start of a compositing layer. Backends may ignore it.
    fn begin_layer(&mut self, layer: Layer);

    fn clear(&mut self, width: f64, height: f64, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64);

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64);

    fn dashed_line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64, dash: &[f64])
    -> RenderingResult<()>;

    fn polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64);

    fn text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) -> RenderingResult<()>;

    /// Approximate advance width of `text` at `size_px`.
    fn measure_text(&self, text: &str, size_px: f64) -> f64;

    /// Disc filled with a radial gradient from `inner` at the center to
    /// `outer` at the rim.
    fn radial_disc(&mut self, center: (f64, f64), radius: f64, inner: Color, outer: Color) -> RenderingResult<()>;

    fn set_clip(&mut self, rect: Option<Rect>);
}

/// Recorded call, in order, for headless assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Layer(Layer),
    Clear { width: f64, height: f64, color: Color },
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color },
    Line { from: (f64, f64), to: (f64, f64), color: Color, dashed: bool },
    Polyline { points: Vec<(f64, f64)>, color: Color },
    Text { text: String, x: f64, y: f64, color: Color },
    Disc { center: (f64, f64), radius: f64, color: Color },
    Clip(Option<Rect>),
}

/// Surface that records every call instead of painting.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers in the order they were opened.
    pub fn layers(&self) -> Vec<Layer> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Layer(layer) => Some(*layer),
                _ => None,
            })
            .collect()
    }

    /// Commands issued while `layer` was the current layer.
    pub fn commands_in(&self, layer: Layer) -> Vec<&DrawCommand> {
        let mut current = None;
        let mut out = Vec::new();
        for command in &self.commands {
            match command {
                DrawCommand::Layer(l) => current = Some(*l),
                other if current == Some(layer) => out.push(other),
                _ => {}
            }
        }
        out
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_layer(&mut self, layer: Layer) {
        self.commands.push(DrawCommand::Layer(layer));
    }

    fn clear(&mut self, width: f64, height: f64, color: Color) {
        self.commands.push(DrawCommand::Clear { width, height, color });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, _width: f64) {
        self.commands.push(DrawCommand::StrokeRect { rect, color });
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, _width: f64) {
        self.commands.push(DrawCommand::Line { from, to, color, dashed: false });
    }

    fn dashed_line(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        _width: f64,
        _dash: &[f64],
    ) -> RenderingResult<()> {
        self.commands.push(DrawCommand::Line { from, to, color, dashed: true });
        Ok(())
    }

    fn polyline(&mut self, points: &[(f64, f64)], color: Color, _width: f64) {
        self.commands.push(DrawCommand::Polyline { points: points.to_vec(), color });
    }

    fn text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) -> RenderingResult<()> {
        self.commands.push(DrawCommand::Text { text: text.to_string(), x, y, color: style.color });
        Ok(())
    }

    fn measure_text(&self, text: &str, size_px: f64) -> f64 {
        text.chars().count() as f64 * size_px * 0.6
    }

    fn radial_disc(&mut self, center: (f64, f64), radius: f64, inner: Color, _outer: Color) -> RenderingResult<()> {
        self.commands.push(DrawCommand::Disc { center, radius, color: inner });
        Ok(())
    }

    fn set_clip(&mut self, rect: Option<Rect>) {
        self.commands.push(DrawCommand::Clip(rect));
    }
}
