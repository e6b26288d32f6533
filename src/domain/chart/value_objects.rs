use crate::domain::errors::AppError;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

/// Value Object - interaction mode
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    StrumDisplay,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Normal,
    Drawing,
    Measuring,
}

/// Value Object - user drawing tool
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DrawingType {
    Trendline,
    Horizontal,
    Vertical,
    Fibonacci,
    Rectangle,
}

impl DrawingType {
    /// Anchors needed before the drawing is complete.
    pub fn required_points(&self) -> usize {
        match self {
            DrawingType::Horizontal | DrawingType::Vertical => 1,
            DrawingType::Trendline | DrawingType::Fibonacci | DrawingType::Rectangle => 2,
        }
    }
}

/// Value Object - Viewport
///
/// The index window is inclusive: `end_index - start_index + 1` candle cells
/// are laid out across the plot. Indices may be fractional while zooming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub start_index: f64,
    pub end_index: f64,
    pub price_min: f64,
    pub price_max: f64,
    /// Right-edge blank space, in candles.
    pub offset_x: f64,
    /// Pixels per candle at the last layout.
    pub scale_x: f64,
    /// Pixels per price unit at the last layout.
    pub scale_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            start_index: 0.0,
            end_index: 0.0,
            price_min: 0.0,
            price_max: 100.0,
            offset_x: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(start_index: f64, end_index: f64, price_min: f64, price_max: f64) -> Self {
        Self { start_index, end_index, price_min, price_max, ..Default::default() }
    }

    /// Window showing the last `visible` candles of a series of `len`.
    pub fn tail(len: usize, visible: usize) -> Self {
        let end = len.saturating_sub(1) as f64;
        let start = (end - visible.saturating_sub(1) as f64).max(0.0);
        Self::new(start, end, 0.0, 0.0)
    }

    pub fn index_span(&self) -> f64 {
        self.end_index - self.start_index
    }

    /// Number of candle cells across the plot.
    pub fn visible_candles(&self) -> f64 {
        self.index_span() + 1.0
    }

    pub fn price_range(&self) -> f64 {
        self.price_max - self.price_min
    }

    /// Integer indices touched by the window, clamped to a series of `len`.
    pub fn visible_indices(&self, len: usize) -> Option<(usize, usize)> {
        if len == 0 {
            return None;
        }
        let last = (len - 1) as f64;
        let start = self.start_index.floor().clamp(0.0, last) as usize;
        let end = self.end_index.ceil().clamp(0.0, last) as usize;
        (start <= end).then_some((start, end))
    }

    /// Whether the right edge sits on (or past) the latest candle.
    pub fn is_at_latest(&self, len: usize) -> bool {
        len > 0 && self.end_index + 0.5 >= (len - 1) as f64
    }

    /// Shift both edges together, keeping the window inside `[0, len]`.
    pub fn pan(&mut self, delta_candles: f64, len: usize) {
        self.start_index += delta_candles;
        self.end_index += delta_candles;
        self.clamp_to(len);
    }

    /// Scale the window by `factor` around `anchor` (a fractional index),
    /// keeping the anchor at the same relative position. The visible count is
    /// clamped to `[min_visible, len]`.
    pub fn zoom_at(&mut self, anchor: f64, factor: f64, min_visible: usize, len: usize) {
        if len == 0 || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let max_visible = len.max(min_visible) as f64;
        let min_visible = min_visible.max(1) as f64;
        let old_span = self.index_span();
        let new_span = ((old_span + 1.0) * factor).clamp(min_visible, max_visible) - 1.0;

        let ratio = if old_span > 0.0 { ((anchor - self.start_index) / old_span).clamp(0.0, 1.0) } else { 0.5 };
        self.start_index = anchor - ratio * new_span;
        self.end_index = self.start_index + new_span;
        self.clamp_to(len);
    }

    /// Slide the window back inside `[0, len]` without changing its span
    /// unless the span itself exceeds the range.
    pub fn clamp_to(&mut self, len: usize) {
        let upper = len as f64;
        let span = self.index_span().min(upper).max(0.0);
        if self.start_index < 0.0 {
            self.start_index = 0.0;
        }
        self.end_index = self.start_index + span;
        if self.end_index > upper {
            self.end_index = upper;
            self.start_index = (upper - span).max(0.0);
        }
    }

    /// Fit the price axis to `range` with `padding` as a fraction of the range
    /// on each side. A flat range stays flat so renderers center it.
    pub fn fit_prices(&mut self, range: Option<(f64, f64)>, padding: f64) {
        if let Some((low, high)) = range {
            let pad = (high - low) * padding;
            self.price_min = low - pad;
            self.price_max = high + pad;
        }
    }
}

/// Value Object - axis-aligned rectangle in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width: width.max(0.0), height: height.max(0.0) }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// Value Object - canvas layout, recomputed on resize
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    /// Plot area left of the price axis and above the time axis.
    pub chart_area: Rect,
    pub price_axis_width: f64,
    pub time_axis_height: f64,
    /// Band at the bottom of `chart_area` reserved for volume bars.
    pub volume_height: f64,
}

impl Dimensions {
    pub fn compute(
        width: f64,
        height: f64,
        price_axis_width: f64,
        time_axis_height: f64,
        volume_ratio: f64,
    ) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let chart_area = Rect::new(0.0, 0.0, width - price_axis_width, height - time_axis_height);
        Self {
            width,
            height,
            chart_area,
            price_axis_width,
            time_axis_height,
            volume_height: chart_area.height * volume_ratio.clamp(0.0, 1.0),
        }
    }

    /// Candle pane: the chart area minus the volume band when one is shown.
    pub fn price_pane(&self, with_volume: bool) -> Rect {
        let reserved = if with_volume { self.volume_height } else { 0.0 };
        Rect::new(self.chart_area.x, self.chart_area.y, self.chart_area.width, self.chart_area.height - reserved)
    }

    pub fn volume_pane(&self) -> Rect {
        Rect::new(
            self.chart_area.x,
            self.chart_area.bottom() - self.volume_height,
            self.chart_area.width,
            self.volume_height,
        )
    }

    pub fn price_axis(&self) -> Rect {
        Rect::new(self.chart_area.right(), 0.0, self.price_axis_width, self.chart_area.height)
    }

    pub fn time_axis(&self) -> Rect {
        Rect::new(0.0, self.chart_area.bottom(), self.chart_area.width, self.time_axis_height)
    }

    pub fn full(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Value Object - Color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn to_hex(&self) -> u32 {
        let r = (self.r * 255.0).round() as u32;
        let g = (self.g * 255.0).round() as u32;
        let b = (self.b * 255.0).round() as u32;
        (r << 16) | (g << 8) | b
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self { a: alpha, ..*self }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let digits = text.trim().trim_start_matches('#');
        let bad = || AppError::ValidationError(format!("invalid color '{}'", text));
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(bad());
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| bad())?;
        Ok(if digits.len() == 8 {
            Self::from_hex(value >> 8).with_alpha((value & 0xFF) as f32 / 255.0)
        } else {
            Self::from_hex(value)
        })
    }

    /// CSS color string for a 2D context.
    pub fn to_css(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
        } else {
            format!("rgba({},{},{},{:.3})", c(self.r), c(self.g), c(self.b), self.a.clamp(0.0, 1.0))
        }
    }

    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

impl TryFrom<String> for Color {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        let alpha = (color.a.clamp(0.0, 1.0) * 255.0).round() as u32;
        if alpha == 255 {
            format!("#{:06x}", color.to_hex())
        } else {
            format!("#{:06x}{:02x}", color.to_hex(), alpha)
        }
    }
}

/// Theme palette supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartColors {
    pub background: Color,
    pub grid: Color,
    pub text: Color,
    pub axis_background: Color,
    pub bullish: Color,
    pub bearish: Color,
    pub volume_bullish: Color,
    pub volume_bearish: Color,
    pub crosshair: Color,
    pub tooltip_background: Color,
    pub drawing: Color,
    pub measure: Color,
    pub last_price: Color,
    pub watermark: Color,
    pub bid: Color,
    pub ask: Color,
    pub dom_background: Color,
    pub spread_row: Color,
    pub value_area: Color,
    pub poc: Color,
    pub oi_increase: Color,
    pub oi_decrease: Color,
}

impl Default for ChartColors {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x131722),
            grid: Color::from_hex(0x2a2e39),
            text: Color::from_hex(0xd1d4dc),
            axis_background: Color::from_hex(0x131722),
            bullish: Color::from_hex(0x26a69a),
            bearish: Color::from_hex(0xef5350),
            volume_bullish: Color::from_hex(0x26a69a).with_alpha(0.5),
            volume_bearish: Color::from_hex(0xef5350).with_alpha(0.5),
            crosshair: Color::from_hex(0x9598a1),
            tooltip_background: Color::from_hex(0x1e222d).with_alpha(0.92),
            drawing: Color::from_hex(0x2962ff),
            measure: Color::from_hex(0x2962ff).with_alpha(0.2),
            last_price: Color::from_hex(0xf0b90b),
            watermark: Color::WHITE.with_alpha(0.06),
            bid: Color::from_hex(0x26a69a),
            ask: Color::from_hex(0xef5350),
            dom_background: Color::from_hex(0x1e222d).with_alpha(0.95),
            spread_row: Color::from_hex(0x363a45),
            value_area: Color::from_hex(0x2962ff).with_alpha(0.12),
            poc: Color::from_hex(0xf0b90b).with_alpha(0.3),
            oi_increase: Color::from_hex(0x00e676),
            oi_decrease: Color::from_hex(0xff1744),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_hex_with_alpha() {
        let c = Color::parse("#ff000080").unwrap();
        assert_eq!(c.to_hex(), 0xff0000);
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
        assert!(Color::parse("#12345").is_err());
        assert_eq!(Color::from_hex(0x26a69a).to_css(), "#26a69a");
    }

    #[test]
    fn colors_deserialize_partially() {
        let colors: ChartColors = serde_json::from_str(r##"{"bullish":"#00ff00"}"##).unwrap();
        assert_eq!(colors.bullish.to_hex(), 0x00ff00);
        assert_eq!(colors.bearish, ChartColors::default().bearish);
    }

    #[test]
    fn pan_clamps_to_series() {
        let mut vp = Viewport::new(10.0, 29.0, 0.0, 1.0);
        vp.pan(-50.0, 100);
        assert_eq!((vp.start_index, vp.end_index), (0.0, 19.0));
        vp.pan(500.0, 100);
        assert_eq!((vp.start_index, vp.end_index), (81.0, 100.0));
    }

    #[test]
    fn zoom_respects_visible_bounds() {
        let mut vp = Viewport::new(0.0, 49.0, 0.0, 1.0);
        vp.zoom_at(25.0, 0.01, 10, 100);
        assert!((vp.visible_candles() - 10.0).abs() < 1e-9);
        vp.zoom_at(25.0, 100.0, 10, 100);
        assert!((vp.visible_candles() - 100.0).abs() < 1e-9);
        assert!(vp.start_index >= 0.0 && vp.end_index <= 100.0);
    }

    #[test]
    fn flat_range_fits_without_padding() {
        let mut vp = Viewport::default();
        vp.fit_prices(Some((5.0, 5.0)), 0.05);
        assert_eq!((vp.price_min, vp.price_max), (5.0, 5.0));
    }

    #[test]
    fn drawing_point_counts() {
        assert_eq!(DrawingType::Horizontal.required_points(), 1);
        assert_eq!(DrawingType::Trendline.required_points(), 2);
    }
}
