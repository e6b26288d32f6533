use super::value_objects::{Color, DrawingType};
use crate::domain::market_data::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use strum::{Display as StrumDisplay, EnumString};

static NEXT_DRAWING_ID: AtomicU64 = AtomicU64::new(1);

/// Fresh drawing id, unique for the lifetime of the module.
pub fn next_drawing_id() -> String {
    format!("drawing-{}", NEXT_DRAWING_ID.fetch_add(1, Ordering::Relaxed))
}

/// A drawing anchor: where the user clicked, resolved into data space.
/// Rendering goes through `index`/`price` so anchors follow pan and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    /// Pixel x at the moment of the click.
    pub x: f64,
    pub index: f64,
    pub price: f64,
    pub time: Option<Timestamp>,
}

impl AnchorPoint {
    pub fn new(x: f64, index: f64, price: f64, time: Option<Timestamp>) -> Self {
        Self { x, index, price, time }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DrawingType,
    pub anchors: Vec<AnchorPoint>,
    pub color: Color,
    pub width: f64,
    pub is_complete: bool,
}

impl DrawingObject {
    pub fn new(kind: DrawingType, color: Color, width: f64) -> Self {
        Self { id: next_drawing_id(), kind, anchors: Vec::new(), color, width, is_complete: false }
    }

    /// Add an anchor; marks the drawing complete once the tool's count is
    /// reached. Anchors past that count are ignored.
    pub fn push_anchor(&mut self, anchor: AnchorPoint) -> bool {
        if !self.is_complete {
            self.anchors.push(anchor);
            self.is_complete = self.anchors.len() >= self.kind.required_points();
        }
        self.is_complete
    }
}

/// Fibonacci retracement ratios drawn between the two anchors.
pub const FIB_LEVELS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Crosshair under the pointer, rebuilt on every move.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrosshairState {
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub price: f64,
    pub time: Option<Timestamp>,
    pub candle_index: Option<usize>,
}

impl CrosshairState {
    pub fn hidden() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, StrumDisplay, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// Drawn on the price pane.
    #[default]
    Overlay,
    /// Belongs to a separate sub-pane owned by the host.
    Oscillator,
}

/// Precomputed indicator line aligned 1:1 with the candle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: IndicatorKind,
    /// `None` (or NaN) marks a gap.
    pub values: Vec<Option<f64>>,
    pub color: Color,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl IndicatorData {
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten().filter(|v| v.is_finite())
    }
}

/// Readout of the measuring tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureReadout {
    pub from: AnchorPoint,
    pub to: AnchorPoint,
    pub price_delta: f64,
    pub percent_change: f64,
    pub bars: i64,
}

impl MeasureReadout {
    pub fn between(from: AnchorPoint, to: AnchorPoint) -> Self {
        let price_delta = to.price - from.price;
        let percent_change = if from.price != 0.0 { price_delta / from.price * 100.0 } else { 0.0 };
        Self { from, to, price_delta, percent_change, bars: (to.index.round() - from.index.round()) as i64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_completes_at_required_points() {
        let mut line = DrawingObject::new(DrawingType::Trendline, Color::WHITE, 1.0);
        let a = AnchorPoint::new(0.0, 1.0, 10.0, None);
        assert!(!line.push_anchor(a));
        assert!(line.push_anchor(a));
        assert!(line.push_anchor(a));
        assert_eq!(line.anchors.len(), 2);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(next_drawing_id(), next_drawing_id());
    }

    #[test]
    fn indicator_gaps_accept_null_and_nan() {
        let ind: IndicatorData = serde_json::from_str(
            r##"{"id":"ema","name":"EMA 20","values":[1.0,null,3.0],"color":"#ffaa00"}"##,
        )
        .unwrap();
        assert!(ind.visible);
        assert_eq!(ind.value_at(1), None);
        assert_eq!(ind.value_at(2), Some(3.0));

        let nan = IndicatorData { values: vec![Some(f64::NAN)], ..ind };
        assert_eq!(nan.value_at(0), None);
    }

    #[test]
    fn measure_readout_reports_change() {
        let r = MeasureReadout::between(
            AnchorPoint::new(0.0, 10.0, 100.0, None),
            AnchorPoint::new(0.0, 15.0, 110.0, None),
        );
        assert_eq!(r.bars, 5);
        assert!((r.percent_change - 10.0).abs() < 1e-9);
    }
}
