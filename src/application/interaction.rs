//! Pointer, wheel and keyboard handling plus the chart mode state machine.
//!
//! The controller owns the viewport, crosshair and drawings. Every entry
//! point returns the events it caused; the engine fans them out.

use crate::domain::chart::coordinates::{candle_spacing, x_to_index, y_to_price};
use crate::domain::chart::{
    AnchorPoint, ChartMode, Color, CrosshairState, DrawingObject, DrawingType, MeasureReadout, Rect, Viewport,
};
use crate::domain::events::ChartEvent;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::CandleSeries;
use crate::log_debug;

/// Pointer travel below which a press-release still counts as a click.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;
/// Zoom step per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;
/// Price padding applied above and below the visible candles.
pub const PRICE_PADDING: f64 = 0.05;

/// What the controller needs to know about the rest of the engine for one
/// input event.
#[derive(Clone, Copy)]
pub struct InteractionContext<'a> {
    pub series: &'a CandleSeries,
    /// Candle pane; x and price mapping both go through it.
    pub pane: Rect,
    /// Hit area for the crosshair (pane plus volume band).
    pub chart_area: Rect,
    pub min_visible: usize,
    /// DOM enabled and an order book is present.
    pub dom_available: bool,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    origin_x: f64,
    origin_y: f64,
    last_x: f64,
    panning: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct MeasureState {
    origin: Option<AnchorPoint>,
    readout: Option<MeasureReadout>,
}

pub struct InteractionController {
    viewport: Viewport,
    mode: ChartMode,
    active_tool: Option<DrawingType>,
    sticky_tool: bool,
    pending: Option<DrawingObject>,
    drawings: Vec<DrawingObject>,
    drag: Option<DragState>,
    measure: MeasureState,
    crosshair: CrosshairState,
    dom_fullscreen: bool,
    fullscreen_override: Option<bool>,
    drawing_color: Color,
    drawing_width: f64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::default(),
            mode: ChartMode::Normal,
            active_tool: None,
            sticky_tool: false,
            pending: None,
            drawings: Vec::new(),
            drag: None,
            measure: MeasureState::default(),
            crosshair: CrosshairState::hidden(),
            dom_fullscreen: false,
            fullscreen_override: None,
            drawing_color: Color::from_hex(0x2962ff),
            drawing_width: 1.5,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn mode(&self) -> ChartMode {
        self.mode
    }

    pub fn active_tool(&self) -> Option<DrawingType> {
        self.active_tool
    }

    pub fn drawings(&self) -> &[DrawingObject] {
        &self.drawings
    }

    /// Drawing being placed, if any anchor has been set.
    pub fn pending_drawing(&self) -> Option<&DrawingObject> {
        self.pending.as_ref()
    }

    pub fn crosshair(&self) -> &CrosshairState {
        &self.crosshair
    }

    pub fn measure_readout(&self) -> Option<MeasureReadout> {
        self.measure.readout
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some_and(|d| d.panning)
    }

    /// Effective fullscreen-DOM state: host override first.
    pub fn dom_fullscreen(&self) -> bool {
        self.fullscreen_override.unwrap_or(self.dom_fullscreen)
    }

    pub fn set_drawing_style(&mut self, color: Color, width: f64) {
        self.drawing_color = color;
        self.drawing_width = width.max(0.5);
    }

    /// Replace the viewport wholesale (series reset, host restore).
    pub fn set_viewport(&mut self, viewport: Viewport) -> Vec<ChartEvent> {
        self.viewport = viewport;
        vec![ChartEvent::ViewportChanged(self.viewport)]
    }

    /// Show the last `visible` candles and fit prices to them.
    pub fn reset_viewport(&mut self, series: &CandleSeries, visible: usize) -> Vec<ChartEvent> {
        let kept = (self.viewport.offset_x, self.viewport.scale_x, self.viewport.scale_y);
        self.viewport = Viewport::tail(series.len(), visible);
        (self.viewport.offset_x, self.viewport.scale_x, self.viewport.scale_y) = kept;
        self.refit_prices(series);
        vec![ChartEvent::ViewportChanged(self.viewport)]
    }

    /// Shift the window right by one candle after an append.
    pub fn follow_latest(&mut self, series: &CandleSeries) -> Vec<ChartEvent> {
        self.viewport.pan(1.0, series.len());
        self.refit_prices(series);
        vec![ChartEvent::ViewportChanged(self.viewport)]
    }

    /// Re-index after the oldest candles were evicted. Drawings always move
    /// with their candles; the window only when `move_window` is set, so the
    /// same candles stay on screen.
    pub fn shift_indices(&mut self, delta: f64, move_window: bool) {
        if move_window {
            self.viewport.start_index = (self.viewport.start_index + delta).max(0.0);
            self.viewport.end_index = (self.viewport.end_index + delta).max(self.viewport.start_index);
        }
        for drawing in self.drawings.iter_mut().chain(self.pending.iter_mut()) {
            for anchor in drawing.anchors.iter_mut() {
                anchor.index += delta;
            }
        }
        if let Some(origin) = self.measure.origin.as_mut() {
            origin.index += delta;
        }
    }

    /// Fit the price axis to the candles in the current window.
    pub fn refit_prices(&mut self, series: &CandleSeries) {
        let range = self
            .viewport
            .visible_indices(series.len())
            .and_then(|(start, end)| series.price_range(start, end));
        self.viewport.fit_prices(range, PRICE_PADDING);
    }

    /// Record pixel scales for the current layout.
    pub fn update_scales(&mut self, pane: &Rect) {
        self.viewport.scale_x = candle_spacing(&self.viewport, pane);
        let range = self.viewport.price_range();
        self.viewport.scale_y = if range > 0.0 { pane.height / range } else { 0.0 };
    }

    pub fn select_tool(&mut self, tool: Option<DrawingType>, sticky: bool) -> Vec<ChartEvent> {
        self.pending = None;
        self.measure = MeasureState::default();
        self.active_tool = tool;
        self.sticky_tool = sticky && tool.is_some();
        let mode = if tool.is_some() { ChartMode::Drawing } else { ChartMode::Normal };
        self.set_mode(mode)
    }

    pub fn start_measuring(&mut self) -> Vec<ChartEvent> {
        self.pending = None;
        self.active_tool = None;
        self.measure = MeasureState::default();
        self.set_mode(ChartMode::Measuring)
    }

    pub fn clear_drawings(&mut self) -> Vec<ChartEvent> {
        self.drawings.clear();
        self.pending = None;
        vec![ChartEvent::DrawingsUpdated(Vec::new())]
    }

    /// `Some` forces the fullscreen-DOM state, `None` hands control back.
    pub fn set_fullscreen_override(&mut self, value: Option<bool>) -> Vec<ChartEvent> {
        let before = self.dom_fullscreen();
        self.fullscreen_override = value;
        self.fullscreen_events(before)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = Some(DragState { origin_x: x, origin_y: y, last_x: x, panning: false });
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, ctx: &InteractionContext) -> Vec<ChartEvent> {
        let mut events = Vec::new();

        if let Some(mut drag) = self.drag {
            let travelled = (x - drag.origin_x).hypot(y - drag.origin_y);
            if !drag.panning && travelled >= DRAG_THRESHOLD_PX && self.mode == ChartMode::Normal {
                drag.panning = true;
            }
            if drag.panning {
                let spacing = candle_spacing(&self.viewport, &ctx.pane);
                if spacing > 0.0 {
                    self.viewport.pan(-(x - drag.last_x) / spacing, ctx.series.len());
                    self.refit_prices(ctx.series);
                    events.push(ChartEvent::ViewportChanged(self.viewport));
                }
                drag.last_x = x;
            }
            self.drag = Some(drag);
        }

        self.crosshair = self.crosshair_at(x, y, ctx);
        events.push(ChartEvent::CrosshairMoved {
            price: self.crosshair.price,
            time: self.crosshair.time,
            visible: self.crosshair.visible,
        });

        if self.mode == ChartMode::Measuring {
            if let Some(origin) = self.measure.origin {
                self.measure.readout = Some(MeasureReadout::between(origin, self.anchor_at(x, y, ctx)));
            }
        }
        events
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, ctx: &InteractionContext) -> Vec<ChartEvent> {
        match self.drag.take() {
            Some(drag) if drag.panning => Vec::new(),
            Some(_) => self.click(x, y, ctx),
            None => Vec::new(),
        }
    }

    pub fn pointer_leave(&mut self) -> Vec<ChartEvent> {
        self.drag = None;
        self.crosshair = CrosshairState::hidden();
        vec![ChartEvent::CrosshairMoved { price: 0.0, time: None, visible: false }]
    }

    /// Zoom around the pointer. Positive `delta_y` (wheel down) zooms out.
    pub fn wheel(&mut self, x: f64, delta_y: f64, ctx: &InteractionContext) -> Vec<ChartEvent> {
        if delta_y == 0.0 || !delta_y.is_finite() || ctx.series.is_empty() {
            return Vec::new();
        }
        let factor = if delta_y > 0.0 { WHEEL_ZOOM_FACTOR } else { 1.0 / WHEEL_ZOOM_FACTOR };
        let anchor = x_to_index(x, &self.viewport, &ctx.pane);
        let before = self.viewport;
        self.viewport.zoom_at(anchor, factor, ctx.min_visible, ctx.series.len());
        self.refit_prices(ctx.series);
        if self.viewport == before {
            return Vec::new();
        }
        vec![ChartEvent::ViewportChanged(self.viewport)]
    }

    pub fn click(&mut self, x: f64, y: f64, ctx: &InteractionContext) -> Vec<ChartEvent> {
        match self.mode {
            ChartMode::Normal => {
                let before = self.dom_fullscreen();
                if self.fullscreen_override.is_some() {
                    return Vec::new();
                }
                if self.dom_fullscreen {
                    self.dom_fullscreen = false;
                } else if ctx.dom_available {
                    self.dom_fullscreen = true;
                }
                self.fullscreen_events(before)
            }
            ChartMode::Drawing => self.place_anchor(x, y, ctx),
            ChartMode::Measuring => {
                let anchor = self.anchor_at(x, y, ctx);
                match self.measure.origin {
                    None => {
                        self.measure.origin = Some(anchor);
                        self.measure.readout = Some(MeasureReadout::between(anchor, anchor));
                        Vec::new()
                    }
                    Some(_) => {
                        self.measure = MeasureState::default();
                        self.set_mode(ChartMode::Normal)
                    }
                }
            }
        }
    }

    pub fn key_down(&mut self, key: &str) -> Vec<ChartEvent> {
        if key != "Escape" {
            return Vec::new();
        }
        match self.mode {
            ChartMode::Drawing => {
                self.pending = None;
                self.active_tool = None;
                self.sticky_tool = false;
                self.set_mode(ChartMode::Normal)
            }
            ChartMode::Measuring => {
                self.measure = MeasureState::default();
                self.set_mode(ChartMode::Normal)
            }
            ChartMode::Normal => {
                let before = self.dom_fullscreen();
                self.dom_fullscreen = false;
                self.fullscreen_events(before)
            }
        }
    }

    fn place_anchor(&mut self, x: f64, y: f64, ctx: &InteractionContext) -> Vec<ChartEvent> {
        let Some(tool) = self.active_tool else {
            return Vec::new();
        };
        let anchor = self.anchor_at(x, y, ctx);
        let (color, width) = (self.drawing_color, self.drawing_width);
        let drawing = self.pending.get_or_insert_with(|| DrawingObject::new(tool, color, width));
        if !drawing.push_anchor(anchor) {
            return Vec::new();
        }

        let Some(done) = self.pending.take() else {
            return Vec::new();
        };
        log_debug!(LogComponent::Application("Interaction"), "completed {} {}", done.kind, done.id);
        self.drawings.push(done);
        let mut events = vec![ChartEvent::DrawingsUpdated(self.drawings.clone())];
        if !self.sticky_tool {
            self.active_tool = None;
            events.extend(self.set_mode(ChartMode::Normal));
        }
        events
    }

    fn anchor_at(&self, x: f64, y: f64, ctx: &InteractionContext) -> AnchorPoint {
        let index = x_to_index(x, &self.viewport, &ctx.pane);
        let price = y_to_price(y, &self.viewport, &ctx.pane);
        let time = Self::nearest_candle(index, ctx.series).and_then(|i| ctx.series.get(i)).map(|c| c.timestamp);
        AnchorPoint::new(x, index, price, time)
    }

    fn crosshair_at(&self, x: f64, y: f64, ctx: &InteractionContext) -> CrosshairState {
        if !ctx.chart_area.contains(x, y) {
            return CrosshairState::hidden();
        }
        let index = x_to_index(x, &self.viewport, &ctx.pane);
        let candle_index = Self::nearest_candle(index, ctx.series);
        CrosshairState {
            visible: true,
            x,
            y,
            price: y_to_price(y, &self.viewport, &ctx.pane),
            time: candle_index.and_then(|i| ctx.series.get(i)).map(|c| c.timestamp),
            candle_index,
        }
    }

    fn nearest_candle(index: f64, series: &CandleSeries) -> Option<usize> {
        if series.is_empty() || !index.is_finite() {
            return None;
        }
        Some(index.round().clamp(0.0, (series.len() - 1) as f64) as usize)
    }

    fn set_mode(&mut self, mode: ChartMode) -> Vec<ChartEvent> {
        if self.mode == mode {
            return Vec::new();
        }
        log_debug!(LogComponent::Application("Interaction"), "mode {} -> {}", self.mode, mode);
        self.mode = mode;
        vec![ChartEvent::ModeChanged(mode)]
    }

    fn fullscreen_events(&self, before: bool) -> Vec<ChartEvent> {
        let now = self.dom_fullscreen();
        if now == before { Vec::new() } else { vec![ChartEvent::DomFullscreenChanged(now)] }
    }
}
