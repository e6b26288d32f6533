//! Open-interest anomaly detection.
//!
//! Successive OI deltas are standardized against the population of deltas in
//! the fetched window. Anything at or beyond `threshold` standard deviations
//! becomes a bubble, bucketed by how far past the threshold it lands.

use super::entities::{CandleSeries, OpenInterestPoint};
use super::value_objects::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter};

/// Relative spread below which a delta series is treated as constant.
const FLAT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OiBubbleConfig {
    /// Minimum |z| for a delta to count as anomalous.
    pub threshold: f64,
    /// |z| at or above `threshold * extreme_multiplier` is `Huge`.
    pub extreme_multiplier: f64,
    pub max_bubbles: usize,
    /// Max distance to the candle a bubble is pinned to.
    pub match_tolerance_ms: u64,
}

impl Default for OiBubbleConfig {
    fn default() -> Self {
        Self { threshold: 1.5, extreme_multiplier: 3.0, max_bubbles: 20, match_tolerance_ms: 60_000 }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, StrumDisplay, EnumIter, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BubbleSize {
    Tiny,
    Small,
    Normal,
    Large,
    Huge,
}

impl BubbleSize {
    /// Radius in device-independent pixels.
    pub fn radius(&self) -> f64 {
        match self {
            BubbleSize::Tiny => 6.0,
            BubbleSize::Small => 10.0,
            BubbleSize::Normal => 16.0,
            BubbleSize::Large => 24.0,
            BubbleSize::Huge => 36.0,
        }
    }

    pub fn shows_label(&self) -> bool {
        matches!(self, BubbleSize::Large | BubbleSize::Huge)
    }

    fn classify(abs_z: f64, config: &OiBubbleConfig) -> Self {
        let t = config.threshold;
        if abs_z >= t * config.extreme_multiplier {
            BubbleSize::Huge
        } else if abs_z >= t * 2.0 {
            BubbleSize::Large
        } else if abs_z >= t * 1.5 {
            BubbleSize::Normal
        } else if abs_z >= t * 1.2 {
            BubbleSize::Small
        } else {
            BubbleSize::Tiny
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OiDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OiBubble {
    pub timestamp: Timestamp,
    /// Close of the candle the bubble is pinned to, once resolved.
    pub price: Option<f64>,
    pub oi_delta: f64,
    pub z_score: f64,
    pub direction: OiDirection,
    pub size: BubbleSize,
}

#[derive(Debug, Clone, Default)]
pub struct OiAnomalyDetector {
    config: OiBubbleConfig,
}

impl OiAnomalyDetector {
    pub fn new(config: OiBubbleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OiBubbleConfig {
        &self.config
    }

    /// Bubbles for a time-ordered OI series, most recent `max_bubbles` only.
    pub fn detect(&self, points: &[OpenInterestPoint]) -> Vec<OiBubble> {
        let deltas: Vec<(Timestamp, f64)> = points
            .windows(2)
            .filter(|w| w[0].oi.is_finite() && w[1].oi.is_finite())
            .map(|w| (w[1].timestamp, w[1].oi - w[0].oi))
            .collect();
        if deltas.is_empty() {
            return Vec::new();
        }

        let n = deltas.len() as f64;
        let mean = deltas.iter().map(|(_, d)| d).sum::<f64>() / n;
        let variance = deltas.iter().map(|(_, d)| (d - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        // deltas equal up to rounding count as flat
        let scale = deltas.iter().map(|(_, d)| d.abs()).fold(mean.abs(), f64::max);
        if !std.is_finite() || std <= FLAT_TOLERANCE * scale.max(f64::MIN_POSITIVE) {
            return Vec::new();
        }

        let mut bubbles: Vec<OiBubble> = deltas
            .into_iter()
            .filter_map(|(timestamp, delta)| {
                let z = (delta - mean) / std;
                (z.abs() >= self.config.threshold).then(|| OiBubble {
                    timestamp,
                    price: None,
                    oi_delta: delta,
                    z_score: z,
                    direction: if delta >= 0.0 { OiDirection::Increase } else { OiDirection::Decrease },
                    size: BubbleSize::classify(z.abs(), &self.config),
                })
            })
            .collect();

        let overflow = bubbles.len().saturating_sub(self.config.max_bubbles);
        bubbles.drain(..overflow);
        bubbles
    }

    /// Pin each bubble to the close of the nearest candle within tolerance.
    /// Bubbles with no candle nearby keep `price: None` and are not drawn.
    pub fn resolve_prices(&self, bubbles: &mut [OiBubble], series: &CandleSeries) {
        for bubble in bubbles.iter_mut() {
            bubble.price = series
                .nearest_index(bubble.timestamp, self.config.match_tolerance_ms)
                .and_then(|i| series.get(i))
                .map(|c| c.ohlcv.close.value());
        }
    }
}
