use crate::application::chart_engine::DerivedState;
use crate::domain::chart::{
    ChartColors, ChartConfig, CrosshairState, Dimensions, DrawingObject, IndicatorData, MeasureReadout, Rect,
    Viewport,
};
use crate::domain::market_data::{CandleSeries, ConnectionStatus, OrderBookSnapshot, Symbol};

/// Read-only view of engine state for one frame. Renderers never mutate it.
#[derive(Clone, Copy)]
pub struct RenderFrame<'a> {
    pub series: &'a CandleSeries,
    pub viewport: &'a Viewport,
    pub dimensions: &'a Dimensions,
    pub config: &'a ChartConfig,
    pub colors: &'a ChartColors,
    pub derived: &'a DerivedState,
    pub indicators: &'a [IndicatorData],
    pub drawings: &'a [DrawingObject],
    pub pending_drawing: Option<&'a DrawingObject>,
    pub crosshair: &'a CrosshairState,
    pub measure: Option<MeasureReadout>,
    pub order_book: Option<&'a OrderBookSnapshot>,
    pub dom_fullscreen: bool,
    pub watermark: &'a str,
    pub symbol: &'a Symbol,
    pub connection_status: ConnectionStatus,
}

impl RenderFrame<'_> {
    pub fn price_pane(&self) -> Rect {
        self.dimensions.price_pane(self.config.show_volume)
    }

    pub fn volume_pane(&self) -> Rect {
        self.dimensions.volume_pane()
    }
}
