use crate::domain::errors::AppError;
use crate::domain::market_data::{OiBubbleConfig, TimeInterval};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, IntoEnumIterator};

/// Column of the fullscreen depth ladder, left to right in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, StrumDisplay, EnumIter, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum DomColumn {
    #[strum(serialize = "Profile")]
    Profile,
    #[strum(serialize = "Bid Depth")]
    BidDepth,
    #[strum(serialize = "Bid")]
    BidSize,
    #[strum(serialize = "Price")]
    Price,
    #[strum(serialize = "Ask")]
    AskSize,
    #[strum(serialize = "Ask Depth")]
    AskDepth,
    #[strum(serialize = "Volume")]
    Volume,
    #[strum(serialize = "Buy %")]
    BuyPercent,
    #[strum(serialize = "Delta")]
    Delta,
    #[strum(serialize = "Level")]
    Tag,
}

impl DomColumn {
    /// Relative width weight in the fullscreen ladder.
    pub fn weight(&self) -> f64 {
        match self {
            DomColumn::Profile => 2.0,
            DomColumn::Tag => 0.8,
            _ => 1.0,
        }
    }
}

/// Engine configuration. Every field has a default so hosts can send a
/// partial JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub interval: TimeInterval,
    pub max_candles: usize,
    pub show_grid: bool,
    pub show_volume: bool,
    pub show_dom: bool,
    pub dom_panel_width: f64,
    pub dom_rows_per_side: usize,
    pub dom_columns: Vec<DomColumn>,
    pub value_area_fraction: f64,
    pub min_visible_candles: usize,
    pub initial_visible_candles: usize,
    pub price_axis_width: f64,
    pub time_axis_height: f64,
    pub volume_height_ratio: f64,
    pub target_price_ticks: usize,
    pub min_time_label_px: f64,
    /// Defaults to the symbol when unset.
    pub watermark: Option<String>,
    pub oi_overlay: bool,
    pub oi: OiBubbleConfig,
    pub oi_poll_interval_ms: u32,
    pub auto_scroll: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            interval: TimeInterval::OneMinute,
            max_candles: 5000,
            show_grid: true,
            show_volume: true,
            show_dom: true,
            dom_panel_width: 260.0,
            dom_rows_per_side: 10,
            dom_columns: DomColumn::iter().collect(),
            value_area_fraction: 0.7,
            min_visible_candles: 10,
            initial_visible_candles: 100,
            price_axis_width: 72.0,
            time_axis_height: 26.0,
            volume_height_ratio: 0.2,
            target_price_ticks: 8,
            min_time_label_px: 80.0,
            watermark: None,
            oi_overlay: true,
            oi: OiBubbleConfig::default(),
            oi_poll_interval_ms: 30_000,
            auto_scroll: true,
        }
    }
}

impl ChartConfig {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AppError::ConfigurationError(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let fail = |msg: &str| Err(AppError::ConfigurationError(msg.to_string()));

        if self.max_candles == 0 {
            return fail("max_candles must be positive");
        }
        if self.min_visible_candles == 0 || self.initial_visible_candles == 0 {
            return fail("visible candle counts must be positive");
        }
        if !(self.dom_panel_width > 0.0) || self.dom_rows_per_side == 0 {
            return fail("DOM panel size must be positive");
        }
        if !(self.price_axis_width > 0.0) || !(self.time_axis_height > 0.0) {
            return fail("axis sizes must be positive");
        }
        if !(self.value_area_fraction > 0.0 && self.value_area_fraction <= 1.0) {
            return fail("value_area_fraction must be in (0, 1]");
        }
        if !(self.volume_height_ratio > 0.0 && self.volume_height_ratio <= 1.0) {
            return fail("volume_height_ratio must be in (0, 1]");
        }
        if self.target_price_ticks == 0 || !(self.min_time_label_px > 0.0) {
            return fail("tick spacing must be positive");
        }
        if !(self.oi.threshold > 0.0) || !(self.oi.extreme_multiplier >= 2.0) || self.oi.max_bubbles == 0 {
            return fail("OI bubble thresholds must be positive with extreme_multiplier >= 2");
        }
        if self.oi_poll_interval_ms == 0 {
            return fail("oi_poll_interval_ms must be positive");
        }
        Ok(())
    }
}
