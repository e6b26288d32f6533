//! Application service owning every piece of chart state.
//!
//! Producers swap whole snapshots in (`Rc` replacement), input goes through
//! the [`InteractionController`], and derived values are recomputed eagerly
//! so a frame only reads.

use crate::application::ingestion::LiveUpdateUseCase;
use crate::application::interaction::{InteractionContext, InteractionController};
use crate::domain::chart::coordinates::{candle_body_width, candle_spacing, price_ticks, time_label_stride};
use crate::domain::chart::{
    ChartColors, ChartConfig, ChartMode, CrosshairState, Dimensions, DrawingObject, DrawingType, IndicatorData,
    MeasureReadout, Viewport,
};
use crate::domain::errors::{AppError, ValidationResult};
use crate::domain::events::{ChartEvent, EventDispatcher, InMemoryEventDispatcher};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{
    Candle, CandleSeries, ConnectionStatus, LiveUpdate, MergeOutcome, OiAnomalyDetector, OiBubble,
    OpenInterestPoint, OrderBookSnapshot, Symbol, ValueArea,
};
use crate::infrastructure::rendering::{ChartRenderer, DrawSurface, RenderFrame};
use crate::{log_debug, log_info};
use std::rc::Rc;

/// Values the renderer needs that depend only on state, computed whenever
/// the viewport, series, layout, config or order book changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedState {
    /// Inclusive integer index range touched by the viewport.
    pub visible: Option<(usize, usize)>,
    pub candle_spacing: f64,
    pub body_width: f64,
    pub price_ticks: Vec<f64>,
    pub max_volume: f64,
    pub time_label_stride: usize,
    pub value_area: Option<ValueArea>,
    pub bubbles: Vec<OiBubble>,
}

pub struct ChartEngine {
    config: ChartConfig,
    colors: ChartColors,
    symbol: Symbol,
    series: Rc<CandleSeries>,
    order_book: Option<Rc<OrderBookSnapshot>>,
    open_interest: Rc<Vec<OpenInterestPoint>>,
    indicators: Rc<Vec<IndicatorData>>,
    controller: InteractionController,
    dimensions: Dimensions,
    derived: DerivedState,
    dispatcher: InMemoryEventDispatcher,
    connection_status: ConnectionStatus,
    detector: OiAnomalyDetector,
}

impl ChartEngine {
    pub fn new(symbol: Symbol, config: ChartConfig) -> Result<Self, AppError> {
        config.validate()?;
        let mut engine = Self {
            series: Rc::new(CandleSeries::new(config.max_candles)),
            detector: OiAnomalyDetector::new(config.oi),
            config,
            colors: ChartColors::default(),
            symbol,
            order_book: None,
            open_interest: Rc::new(Vec::new()),
            indicators: Rc::new(Vec::new()),
            controller: InteractionController::new(),
            dimensions: Dimensions::default(),
            derived: DerivedState::default(),
            dispatcher: InMemoryEventDispatcher::new(),
            connection_status: ConnectionStatus::Disconnected,
        };
        engine.controller.set_drawing_style(engine.colors.drawing, 1.5);
        log_info!(LogComponent::Application("ChartEngine"), "engine created for {}", engine.symbol);
        Ok(engine)
    }

    pub fn on_event<F>(&mut self, handler: F)
    where
        F: Fn(&ChartEvent) + 'static,
    {
        self.dispatcher.subscribe(handler);
    }

    // --- producers -------------------------------------------------------

    /// Replace the whole series and show its tail.
    pub fn set_candles(&mut self, candles: Vec<Candle>) {
        self.series = Rc::new(CandleSeries::from_candles(candles, self.config.max_candles));
        let events = self.controller.reset_viewport(&self.series, self.config.initial_visible_candles);
        log_debug!(LogComponent::Application("ChartEngine"), "loaded {} candles", self.series.len());
        self.recompute_oi();
        self.recompute_view();
        self.after_interaction(events);
    }

    /// Merge one live update. Stale ticks come back as `ValidationError`
    /// after being logged; state is untouched in that case.
    pub fn apply_update(&mut self, update: LiveUpdate) -> ValidationResult<MergeOutcome> {
        let use_case = LiveUpdateUseCase::new(self.config.interval, self.config.auto_scroll);
        let series = Rc::make_mut(&mut self.series);
        let (outcome, events) = use_case.execute(series, &mut self.controller, update)?;
        // the open bar's close moves on every merge, and bubbles sit on closes
        self.resolve_bubble_prices();
        self.recompute_view();
        self.after_interaction(events);
        Ok(outcome)
    }

    pub fn set_order_book(&mut self, book: Option<OrderBookSnapshot>) {
        self.order_book = book.map(Rc::new);
        self.recompute_book();
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        if self.connection_status != status {
            log_info!(LogComponent::Application("ChartEngine"), "order book link {}", status);
        }
        self.connection_status = status;
    }

    pub fn set_open_interest(&mut self, points: Vec<OpenInterestPoint>) {
        self.open_interest = Rc::new(points);
        self.recompute_oi();
    }

    pub fn set_indicators(&mut self, indicators: Vec<IndicatorData>) {
        self.indicators = Rc::new(indicators);
    }

    pub fn set_colors(&mut self, colors: ChartColors) {
        self.colors = colors;
        self.controller.set_drawing_style(colors.drawing, 1.5);
    }

    pub fn set_symbol(&mut self, symbol: Symbol) {
        self.symbol = symbol;
    }

    pub fn set_config(&mut self, config: ChartConfig) -> Result<(), AppError> {
        config.validate()?;
        let rebuild = config.max_candles != self.config.max_candles;
        self.detector = OiAnomalyDetector::new(config.oi);
        self.config = config;
        if rebuild {
            let candles = self.series.candles().to_vec();
            self.series = Rc::new(CandleSeries::from_candles(candles, self.config.max_candles));
            let events = self.controller.reset_viewport(&self.series, self.config.initial_visible_candles);
            self.after_interaction(events);
        }
        self.resize(self.dimensions.width, self.dimensions.height);
        self.recompute_book();
        self.recompute_oi();
        Ok(())
    }

    /// New canvas size in CSS pixels. Drawings survive.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.dimensions = Dimensions::compute(
            width,
            height,
            self.config.price_axis_width,
            self.config.time_axis_height,
            self.config.volume_height_ratio,
        );
        self.recompute_view();
    }

    // --- input -----------------------------------------------------------

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.controller.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.interact(|c, ctx| c.pointer_move(x, y, ctx));
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) {
        self.interact(|c, ctx| c.pointer_up(x, y, ctx));
    }

    pub fn pointer_leave(&mut self) {
        self.interact(|c, _| c.pointer_leave());
    }

    pub fn wheel(&mut self, x: f64, delta_y: f64) {
        self.interact(|c, ctx| c.wheel(x, delta_y, ctx));
    }

    pub fn click(&mut self, x: f64, y: f64) {
        self.interact(|c, ctx| c.click(x, y, ctx));
    }

    pub fn key_down(&mut self, key: &str) {
        self.interact(|c, _| c.key_down(key));
    }

    pub fn select_tool(&mut self, tool: Option<DrawingType>, sticky: bool) {
        self.interact(|c, _| c.select_tool(tool, sticky));
    }

    pub fn start_measuring(&mut self) {
        self.interact(|c, _| c.start_measuring());
    }

    pub fn clear_drawings(&mut self) {
        self.interact(|c, _| c.clear_drawings());
    }

    pub fn set_fullscreen_override(&mut self, value: Option<bool>) {
        self.interact(|c, _| c.set_fullscreen_override(value));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.interact(|c, ctx| {
            let mut viewport = viewport;
            viewport.clamp_to(ctx.series.len());
            c.set_viewport(viewport)
        });
    }

    fn interact<F>(&mut self, f: F)
    where
        F: FnOnce(&mut InteractionController, &InteractionContext) -> Vec<ChartEvent>,
    {
        let ctx = InteractionContext {
            series: &self.series,
            pane: self.dimensions.price_pane(self.config.show_volume),
            chart_area: self.dimensions.chart_area,
            min_visible: self.config.min_visible_candles,
            dom_available: self.config.show_dom && self.order_book.is_some(),
        };
        let events = f(&mut self.controller, &ctx);
        self.after_interaction(events);
    }

    fn after_interaction(&mut self, events: Vec<ChartEvent>) {
        let layout_changed = events
            .iter()
            .any(|e| matches!(e, ChartEvent::ViewportChanged(_) | ChartEvent::DomFullscreenChanged(_)));
        if layout_changed {
            self.recompute_view();
        }
        for event in events {
            let event = match event {
                ChartEvent::ViewportChanged(_) => ChartEvent::ViewportChanged(*self.controller.viewport()),
                other => other,
            };
            self.dispatcher.publish(&event);
        }
    }

    // --- derived state ---------------------------------------------------

    fn recompute_view(&mut self) {
        let pane = self.dimensions.price_pane(self.config.show_volume);
        self.controller.update_scales(&pane);
        let viewport = *self.controller.viewport();
        let d = &mut self.derived;

        d.visible = viewport.visible_indices(self.series.len());
        d.candle_spacing = candle_spacing(&viewport, &pane);
        d.body_width = candle_body_width(&viewport, &pane);
        d.price_ticks = price_ticks(viewport.price_min, viewport.price_max, self.config.target_price_ticks);
        d.max_volume = d.visible.map(|(s, e)| self.series.max_volume(s, e)).unwrap_or(0.0);
        d.time_label_stride = time_label_stride(d.candle_spacing, self.config.min_time_label_px);
    }

    fn recompute_book(&mut self) {
        self.derived.value_area = self
            .order_book
            .as_ref()
            .and_then(|book| ValueArea::compute(&book.merged_levels(), self.config.value_area_fraction));
    }

    fn recompute_oi(&mut self) {
        if !self.config.oi_overlay {
            self.derived.bubbles.clear();
            return;
        }
        self.derived.bubbles = self.detector.detect(&self.open_interest);
        self.resolve_bubble_prices();
    }

    fn resolve_bubble_prices(&mut self) {
        self.detector.resolve_prices(&mut self.derived.bubbles, &self.series);
    }

    // --- read side -------------------------------------------------------

    pub fn frame(&self) -> RenderFrame<'_> {
        RenderFrame {
            series: &self.series,
            viewport: self.controller.viewport(),
            dimensions: &self.dimensions,
            config: &self.config,
            colors: &self.colors,
            derived: &self.derived,
            indicators: &self.indicators,
            drawings: self.controller.drawings(),
            pending_drawing: self.controller.pending_drawing(),
            crosshair: self.controller.crosshair(),
            measure: self.controller.measure_readout(),
            order_book: self.order_book.as_deref(),
            dom_fullscreen: self.controller.dom_fullscreen(),
            watermark: self.config.watermark.as_deref().unwrap_or(self.symbol.value()),
            symbol: &self.symbol,
            connection_status: self.connection_status,
        }
    }

    pub fn render(&self, surface: &mut dyn DrawSurface) {
        ChartRenderer::render(&self.frame(), surface);
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn colors(&self) -> &ChartColors {
        &self.colors
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    /// Shared handle to the current series snapshot.
    pub fn series_snapshot(&self) -> Rc<CandleSeries> {
        Rc::clone(&self.series)
    }

    pub fn order_book(&self) -> Option<&OrderBookSnapshot> {
        self.order_book.as_deref()
    }

    pub fn viewport(&self) -> &Viewport {
        self.controller.viewport()
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn derived(&self) -> &DerivedState {
        &self.derived
    }

    pub fn mode(&self) -> ChartMode {
        self.controller.mode()
    }

    pub fn drawings(&self) -> &[DrawingObject] {
        self.controller.drawings()
    }

    pub fn crosshair(&self) -> &CrosshairState {
        self.controller.crosshair()
    }

    pub fn measure_readout(&self) -> Option<MeasureReadout> {
        self.controller.measure_readout()
    }

    pub fn dom_fullscreen(&self) -> bool {
        self.controller.dom_fullscreen()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{OHLCV, OpenInterestPoint, OrderBookLevel, Price, Timestamp, Trade, Volume};
    use std::cell::RefCell;

    fn candles(n: u64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let p = 100.0 + (i % 7) as f64;
                Candle::new(
                    Timestamp::from_millis(i * 60_000),
                    OHLCV::new(
                        Price::from(p),
                        Price::from(p + 2.0),
                        Price::from(p - 2.0),
                        Price::from(p + 1.0),
                        Volume::from(10.0 + i as f64),
                    ),
                )
            })
            .collect()
    }

    fn engine() -> ChartEngine {
        let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap();
        engine.resize(972.0, 526.0);
        engine.set_candles(candles(300));
        engine
    }

    #[test]
    fn derived_state_tracks_viewport() {
        let engine = engine();
        let d = engine.derived();
        assert_eq!(d.visible, Some((200, 299)));
        assert!((d.candle_spacing - 9.0).abs() < 1e-9);
        assert_eq!(d.max_volume, 309.0);
        assert!(!d.price_ticks.is_empty());
    }

    #[test]
    fn events_reach_subscribers() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.on_event(move |e| sink.borrow_mut().push(e.clone()));
        engine.select_tool(Some(DrawingType::Horizontal), false);
        engine.click(100.0, 100.0);
        let seen = seen.borrow();
        assert!(seen.contains(&ChartEvent::ModeChanged(ChartMode::Drawing)));
        assert!(seen.iter().any(|e| matches!(e, ChartEvent::DrawingsUpdated(d) if d.len() == 1)));
    }

    #[test]
    fn order_book_feeds_value_area() {
        let mut engine = engine();
        let book = OrderBookSnapshot::from_levels(
            Symbol::from("BTCUSDT"),
            vec![OrderBookLevel::new(99.0, 20.0), OrderBookLevel::new(98.0, 10.0)],
            vec![OrderBookLevel::new(100.0, 50.0), OrderBookLevel::new(101.0, 15.0), OrderBookLevel::new(102.0, 5.0)],
            Timestamp::from_millis(0),
        );
        engine.set_order_book(Some(book));
        let va = engine.derived().value_area.unwrap();
        assert_eq!((va.val, va.poc, va.vah), (99.0, 100.0, 100.0));
    }

    #[test]
    fn wheel_zoom_recomputes_spacing() {
        let mut engine = engine();
        let before = engine.derived().candle_spacing;
        engine.wheel(450.0, -1.0);
        assert!(engine.derived().candle_spacing > before);
    }

    fn oi_spike_on_last_candle() -> Vec<OpenInterestPoint> {
        (0..40u64)
            .map(|i| OpenInterestPoint { oi: 1000.0 + i as f64, timestamp: Timestamp::from_millis(i * 60_000) })
            .chain(std::iter::once(OpenInterestPoint { oi: 2000.0, timestamp: Timestamp::from_millis(40 * 60_000) }))
            .collect()
    }

    #[test]
    fn bubble_follows_the_open_bar_close() {
        let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap();
        engine.resize(972.0, 526.0);
        engine.set_candles(candles(41));
        engine.set_open_interest(oi_spike_on_last_candle());
        assert_eq!(engine.derived().bubbles.len(), 1);
        assert_eq!(engine.derived().bubbles[0].price, Some(106.0));

        let trade = Trade { timestamp: Timestamp::from_millis(40 * 60_000 + 5_000), price: 130.0, quantity: 1.0 };
        let outcome = engine.apply_update(LiveUpdate::Trade(trade)).unwrap();
        assert_eq!(outcome, MergeOutcome::Replaced);
        assert_eq!(engine.derived().bubbles[0].price, Some(130.0));
    }

    #[test]
    fn overlay_switch_controls_bubbles() {
        let config = ChartConfig { oi_overlay: false, ..Default::default() };
        let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), config.clone()).unwrap();
        engine.set_candles(candles(41));
        engine.set_open_interest(oi_spike_on_last_candle());
        assert!(engine.derived().bubbles.is_empty());

        engine.set_config(ChartConfig { oi_overlay: true, ..config }).unwrap();
        assert_eq!(engine.derived().bubbles.len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ChartConfig { max_candles: 0, ..Default::default() };
        assert!(ChartEngine::new(Symbol::from("X"), config).is_err());
    }
}
