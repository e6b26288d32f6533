//! JavaScript bridge. Owns the engine, its canvas surface, the frame loop and
//! the background producers for one mounted chart. Errors become `JsValue`
//! only here.

use crate::application::{ChartEngine, OpenInterestPoller, OrderBookSubscription};
use crate::domain::chart::{ChartColors, ChartConfig, DrawingType, IndicatorData, Viewport};
use crate::domain::errors::{AppError, NetworkResult};
use crate::domain::events::ChartEvent;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{
    Candle, ConnectionStatus, LiveUpdate, OpenInterestPoint, OpenInterestProvider, OrderBookLevel,
    OrderBookProvider, OrderBookSnapshot, Symbol, Timestamp,
};
use crate::infrastructure::rendering::CanvasSurface;
use crate::{log_debug, log_info, log_warn};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gloo::render::{AnimationFrame, request_animation_frame};
use js_sys::{Function, Promise};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

impl From<AppError> for JsValue {
    fn from(error: AppError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

fn parse<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, AppError> {
    serde_json::from_str(json).map_err(|e| AppError::ValidationError(format!("malformed {}: {}", what, e)))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(AppError::from)?;
    js_sys::JSON::parse(&json)
}

/// Depth snapshot as hosts usually have it: `[price, quantity]` pairs.
#[derive(Debug, Deserialize)]
struct DepthMessage {
    #[serde(default)]
    symbol: Option<String>,
    bids: Vec<(f64, f64)>,
    asks: Vec<(f64, f64)>,
    #[serde(default)]
    timestamp: u64,
}

impl DepthMessage {
    fn into_snapshot(self, fallback: &Symbol) -> OrderBookSnapshot {
        let symbol = self.symbol.map(|s| Symbol::from(s.as_str())).unwrap_or_else(|| fallback.clone());
        let levels = |side: Vec<(f64, f64)>| side.into_iter().map(|(p, q)| OrderBookLevel::new(p, q)).collect();
        OrderBookSnapshot::from_levels(symbol, levels(self.bids), levels(self.asks), Timestamp::from_millis(self.timestamp))
    }
}

/// Host callbacks, one per outbound event.
#[derive(Default)]
struct Callbacks {
    crosshair: Option<Function>,
    viewport: Option<Function>,
    drawings: Option<Function>,
    mode: Option<Function>,
    fullscreen: Option<Function>,
}

impl Callbacks {
    fn for_event(&self, event: &ChartEvent) -> Option<Function> {
        let callback = match event {
            ChartEvent::CrosshairMoved { .. } => &self.crosshair,
            ChartEvent::ViewportChanged(_) => &self.viewport,
            ChartEvent::DrawingsUpdated(_) => &self.drawings,
            ChartEvent::ModeChanged(_) => &self.mode,
            ChartEvent::DomFullscreenChanged(_) => &self.fullscreen,
        };
        callback.clone()
    }
}

/// Call a host callback with the event's payload as a plain JS value.
fn deliver(callback: &Function, event: &ChartEvent) {
    let payload = serde_json::to_value(event)
        .ok()
        .and_then(|v| v.get("payload").cloned())
        .map(|payload| js_sys::JSON::parse(&payload.to_string()));
    match payload {
        Some(Ok(value)) => {
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                log_warn!(LogComponent::Presentation("ChartHandle"), "callback threw: {:?}", e);
            }
        }
        _ => log_warn!(LogComponent::Presentation("ChartHandle"), "could not encode {:?}", event),
    }
}

/// State shared between the handle, the frame loop and producer callbacks.
/// Those callbacks hold `Weak` references so dropping the handle tears
/// everything down.
struct Shared {
    engine: RefCell<ChartEngine>,
    surface: RefCell<CanvasSurface>,
    callbacks: RefCell<Callbacks>,
    pending: Rc<RefCell<Vec<ChartEvent>>>,
    dirty: Cell<bool>,
    frame: RefCell<Option<AnimationFrame>>,
    order_book: RefCell<Option<OrderBookSubscription>>,
    oi_provider: RefCell<Option<Rc<dyn OpenInterestProvider>>>,
    oi_poller: RefCell<Option<OpenInterestPoller>>,
}

impl Shared {
    /// Run `f` against the engine, then deliver the events it queued. No
    /// borrow is held while a host callback runs, so callbacks may call
    /// back into the handle.
    fn with_engine<R>(&self, f: impl FnOnce(&mut ChartEngine) -> R) -> R {
        let result = f(&mut self.engine.borrow_mut());
        self.dirty.set(true);
        let events: Vec<ChartEvent> = self.pending.borrow_mut().drain(..).collect();
        for event in &events {
            let callback = self.callbacks.borrow().for_event(event);
            if let Some(callback) = callback {
                deliver(&callback, event);
            }
        }
        result
    }

    /// Run the open-interest poller only while the overlay is on and a
    /// provider is attached. A running poller is restarted so symbol and
    /// period changes take effect.
    fn sync_open_interest(self: &Rc<Self>) {
        // drop the old poller first so its in-flight fetch is aborted
        self.oi_poller.borrow_mut().take();
        let (enabled, symbol, period) = {
            let engine = self.engine.borrow();
            (engine.config().oi_overlay, engine.symbol().clone(), engine.config().oi_poll_interval_ms)
        };
        let provider = self.oi_provider.borrow().clone();
        let Some(provider) = provider.filter(|_| enabled) else {
            return;
        };
        let weak = Rc::downgrade(self);
        let poller = OpenInterestPoller::start(provider, symbol, period, move |points| {
            if let Some(shared) = weak.upgrade() {
                shared.with_engine(|e| e.set_open_interest(points));
            }
        });
        *self.oi_poller.borrow_mut() = Some(poller);
    }

    fn paint(&self) {
        if !self.dirty.replace(false) {
            return;
        }
        let engine = self.engine.borrow();
        engine.render(&mut *self.surface.borrow_mut());
    }

    fn schedule(weak: Weak<Shared>) {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let next = weak.clone();
        let handle = request_animation_frame(move |_| {
            if let Some(shared) = next.upgrade() {
                shared.paint();
                Shared::schedule(next);
            }
        });
        *shared.frame.borrow_mut() = Some(handle);
    }
}

#[wasm_bindgen]
pub struct ChartHandle {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl ChartHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, symbol: String, config_json: Option<String>) -> Result<ChartHandle, JsValue> {
        let config = match config_json {
            Some(json) => ChartConfig::from_json(&json)?,
            None => ChartConfig::default(),
        };
        let symbol = Symbol::new(symbol).map_err(AppError::ValidationError)?;
        Ok(Self::mount(canvas, symbol, config)?)
    }

    /// Start the animation-frame loop. Idempotent.
    pub fn start(&self) {
        if self.shared.frame.borrow().is_none() {
            Shared::schedule(Rc::downgrade(&self.shared));
        }
    }

    /// Stop the frame loop and every producer.
    pub fn destroy(&self) {
        self.shared.frame.borrow_mut().take();
        self.shared.order_book.borrow_mut().take();
        self.shared.oi_poller.borrow_mut().take();
        log_debug!(LogComponent::Presentation("ChartHandle"), "chart destroyed");
    }

    /// Paint synchronously, bypassing the frame loop.
    #[wasm_bindgen(js_name = renderNow)]
    pub fn render_now(&self) {
        self.shared.dirty.set(true);
        self.shared.paint();
    }

    pub fn resize(&self, css_width: f64, css_height: f64, dpr: Option<f64>) -> Result<(), JsValue> {
        let dpr = dpr.unwrap_or_else(CanvasSurface::device_pixel_ratio);
        self.shared.surface.borrow_mut().resize(css_width, css_height, dpr)?;
        self.shared.with_engine(|e| e.resize(css_width, css_height));
        Ok(())
    }

    // --- data ------------------------------------------------------------

    #[wasm_bindgen(js_name = setCandles)]
    pub fn set_candles(&self, json: &str) -> Result<(), JsValue> {
        let candles: Vec<Candle> = parse(json, "candles")?;
        self.shared.with_engine(|e| e.set_candles(candles));
        Ok(())
    }

    /// `{"kind":"candle",...}` or `{"kind":"trade",...}`. Stale ticks reject.
    #[wasm_bindgen(js_name = applyUpdate)]
    pub fn apply_update(&self, json: &str) -> Result<(), JsValue> {
        let update: LiveUpdate = parse(json, "update")?;
        self.shared.with_engine(|e| e.apply_update(update))?;
        Ok(())
    }

    /// `null` clears the book.
    #[wasm_bindgen(js_name = setOrderBook)]
    pub fn set_order_book(&self, json: Option<String>) -> Result<(), JsValue> {
        let book = match json {
            Some(json) => {
                let message: DepthMessage = parse(&json, "order book")?;
                let symbol = self.shared.engine.borrow().symbol().clone();
                Some(message.into_snapshot(&symbol))
            }
            None => None,
        };
        self.shared.with_engine(|e| e.set_order_book(book));
        Ok(())
    }

    #[wasm_bindgen(js_name = setConnectionStatus)]
    pub fn set_connection_status(&self, status: &str) -> Result<(), JsValue> {
        let status: ConnectionStatus = serde_json::from_value(serde_json::Value::String(status.to_string()))
            .map_err(|e| AppError::ValidationError(format!("unknown connection status: {}", e)))?;
        self.shared.with_engine(|e| e.set_connection_status(status));
        Ok(())
    }

    #[wasm_bindgen(js_name = setOpenInterest)]
    pub fn set_open_interest(&self, json: &str) -> Result<(), JsValue> {
        let points: Vec<OpenInterestPoint> = parse(json, "open interest")?;
        self.shared.with_engine(|e| e.set_open_interest(points));
        Ok(())
    }

    #[wasm_bindgen(js_name = setIndicators)]
    pub fn set_indicators(&self, json: &str) -> Result<(), JsValue> {
        let indicators: Vec<IndicatorData> = parse(json, "indicators")?;
        self.shared.with_engine(|e| e.set_indicators(indicators));
        Ok(())
    }

    #[wasm_bindgen(js_name = setColors)]
    pub fn set_colors(&self, json: &str) -> Result<(), JsValue> {
        let colors: ChartColors = parse(json, "colors")?;
        self.shared.with_engine(|e| e.set_colors(colors));
        Ok(())
    }

    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&self, json: &str) -> Result<(), JsValue> {
        let config = ChartConfig::from_json(json)?;
        self.apply_config(config)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setSymbol)]
    pub fn set_symbol(&self, symbol: String) -> Result<(), JsValue> {
        let symbol = Symbol::new(symbol).map_err(AppError::ValidationError)?;
        self.shared.with_engine(|e| e.set_symbol(symbol));
        self.shared.sync_open_interest();
        Ok(())
    }

    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&self, json: &str) -> Result<(), JsValue> {
        let viewport: Viewport = parse(json, "viewport")?;
        self.shared.with_engine(|e| e.set_viewport(viewport));
        Ok(())
    }

    #[wasm_bindgen(js_name = getViewport)]
    pub fn viewport(&self) -> Result<JsValue, JsValue> {
        to_js(self.shared.engine.borrow().viewport())
    }

    #[wasm_bindgen(js_name = getDrawings)]
    pub fn drawings(&self) -> Result<JsValue, JsValue> {
        to_js(&self.shared.engine.borrow().drawings())
    }

    #[wasm_bindgen(js_name = getMode)]
    pub fn mode(&self) -> String {
        self.shared.engine.borrow().mode().to_string()
    }

    // --- input -----------------------------------------------------------

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f64, y: f64) {
        self.shared.with_engine(|e| e.pointer_down(x, y));
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64) {
        self.shared.with_engine(|e| e.pointer_move(x, y));
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self, x: f64, y: f64) {
        self.shared.with_engine(|e| e.pointer_up(x, y));
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&self) {
        self.shared.with_engine(|e| e.pointer_leave());
    }

    pub fn wheel(&self, x: f64, delta_y: f64) {
        self.shared.with_engine(|e| e.wheel(x, delta_y));
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&self, key: &str) {
        self.shared.with_engine(|e| e.key_down(key));
    }

    /// `tool` is one of `trendline`, `horizontal`, `vertical`, `fibonacci`,
    /// `rectangle`; `None` disarms.
    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&self, tool: Option<String>, sticky: bool) -> Result<(), JsValue> {
        let tool = tool
            .map(|t| DrawingType::from_str(&t).map_err(|_| AppError::ValidationError(format!("unknown tool {}", t))))
            .transpose()?;
        self.shared.with_engine(|e| e.select_tool(tool, sticky));
        Ok(())
    }

    #[wasm_bindgen(js_name = startMeasuring)]
    pub fn start_measuring(&self) {
        self.shared.with_engine(|e| e.start_measuring());
    }

    #[wasm_bindgen(js_name = clearDrawings)]
    pub fn clear_drawings(&self) {
        self.shared.with_engine(|e| e.clear_drawings());
    }

    /// `Some` forces the fullscreen DOM on or off; `None` hands control back
    /// to clicks and Escape.
    #[wasm_bindgen(js_name = setFullscreenOverride)]
    pub fn set_fullscreen_override(&self, value: Option<bool>) {
        self.shared.with_engine(|e| e.set_fullscreen_override(value));
    }

    // --- callbacks -------------------------------------------------------

    #[wasm_bindgen(js_name = onCrosshairMove)]
    pub fn on_crosshair_move(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().crosshair = Some(callback);
    }

    #[wasm_bindgen(js_name = onViewportChange)]
    pub fn on_viewport_change(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().viewport = Some(callback);
    }

    #[wasm_bindgen(js_name = onDrawingUpdate)]
    pub fn on_drawing_update(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().drawings = Some(callback);
    }

    #[wasm_bindgen(js_name = onModeChange)]
    pub fn on_mode_change(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().mode = Some(callback);
    }

    #[wasm_bindgen(js_name = onDomFullscreenChange)]
    pub fn on_dom_fullscreen_change(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().fullscreen = Some(callback);
    }

    // --- producers -------------------------------------------------------

    /// Poll `fetch(symbol) -> Promise<{oi, timestamp}[]>` on the configured
    /// period until [`destroy`](Self::destroy) or the next call.
    #[wasm_bindgen(js_name = pollOpenInterest)]
    pub fn poll_open_interest(&self, fetch: Function) {
        self.attach_open_interest(Rc::new(JsOpenInterestProvider { fetch }));
    }

    #[wasm_bindgen(js_name = stopOpenInterest)]
    pub fn stop_open_interest(&self) {
        self.shared.oi_provider.borrow_mut().take();
        self.shared.oi_poller.borrow_mut().take();
    }
}

impl ChartHandle {
    /// Bind an engine to `canvas`, sized from its current CSS box.
    pub fn mount(canvas: HtmlCanvasElement, symbol: Symbol, config: ChartConfig) -> Result<Self, AppError> {
        let width = canvas.client_width().max(0) as f64;
        let height = canvas.client_height().max(0) as f64;

        let mut surface = CanvasSurface::new(canvas)?;
        surface.resize(width, height, CanvasSurface::device_pixel_ratio())?;
        let mut engine = ChartEngine::new(symbol, config)?;
        engine.resize(width, height);

        let pending: Rc<RefCell<Vec<ChartEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = pending.clone();
        engine.on_event(move |event| sink.borrow_mut().push(event.clone()));

        let shared = Rc::new(Shared {
            engine: RefCell::new(engine),
            surface: RefCell::new(surface),
            callbacks: RefCell::new(Callbacks::default()),
            pending,
            dirty: Cell::new(true),
            frame: RefCell::new(None),
            order_book: RefCell::new(None),
            oi_provider: RefCell::new(None),
            oi_poller: RefCell::new(None),
        });
        log_info!(LogComponent::Presentation("ChartHandle"), "chart mounted at {}x{}", width, height);
        Ok(ChartHandle { shared })
    }

    /// Mutate the engine from Rust; host callbacks fire afterwards.
    pub fn update<R>(&self, f: impl FnOnce(&mut ChartEngine) -> R) -> R {
        self.shared.with_engine(f)
    }

    /// Rust-side producer hookup; replaces any previous subscription.
    pub fn attach_order_book(&self, provider: Rc<dyn OrderBookProvider>) {
        let weak = Rc::downgrade(&self.shared);
        let symbol = self.shared.engine.borrow().symbol().clone();
        self.shared.with_engine(|e| e.set_connection_status(ConnectionStatus::Connecting));
        let subscription = OrderBookSubscription::start(provider, &symbol, move |snapshot, status| {
            if let Some(shared) = weak.upgrade() {
                shared.with_engine(|e| {
                    e.set_connection_status(status);
                    if snapshot.is_some() {
                        e.set_order_book(snapshot);
                    }
                });
            }
        });
        *self.shared.order_book.borrow_mut() = Some(subscription);
    }

    /// Replaces any previous provider. Polling only runs while
    /// `oi_overlay` is enabled; toggling it through the config starts or
    /// stops the poller.
    pub fn attach_open_interest(&self, provider: Rc<dyn OpenInterestProvider>) {
        *self.shared.oi_provider.borrow_mut() = Some(provider);
        self.shared.sync_open_interest();
    }

    /// Apply a config from Rust, keeping the open-interest poller in step.
    pub fn apply_config(&self, config: ChartConfig) -> Result<(), AppError> {
        self.shared.with_engine(|e| e.set_config(config))?;
        self.shared.sync_open_interest();
        Ok(())
    }

    /// Whether an open-interest poller is currently running.
    pub fn is_polling_open_interest(&self) -> bool {
        self.shared.oi_poller.borrow().is_some()
    }
}

impl Drop for ChartHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Open-interest source backed by a host function returning a promise of
/// `{oi, timestamp}` records.
struct JsOpenInterestProvider {
    fetch: Function,
}

impl OpenInterestProvider for JsOpenInterestProvider {
    fn fetch(&self, symbol: &Symbol) -> LocalBoxFuture<'static, NetworkResult<Vec<OpenInterestPoint>>> {
        let call = self.fetch.call1(&JsValue::NULL, &JsValue::from_str(symbol.value()));
        async move {
            let network = |e: JsValue| AppError::NetworkError(format!("{:?}", e));
            let promise = Promise::resolve(&call.map_err(network)?);
            let value = JsFuture::from(promise).await.map_err(network)?;
            let json: String = js_sys::JSON::stringify(&value).map_err(network)?.into();
            serde_json::from_str(&json).map_err(|e| AppError::NetworkError(format!("bad open interest payload: {}", e)))
        }
        .boxed_local()
    }
}
