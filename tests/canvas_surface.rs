#![cfg(target_arch = "wasm32")]

use price_chart_engine::application::ChartEngine;
use price_chart_engine::domain::chart::ChartConfig;
use price_chart_engine::domain::market_data::{Candle, OHLCV, Symbol, Timestamp};
use price_chart_engine::infrastructure::rendering::CanvasSurface;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn canvas() -> web_sys::HtmlCanvasElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let canvas = document.create_element("canvas").unwrap();
    document.body().unwrap().append_child(&canvas).unwrap();
    canvas.dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn backing_store_scales_with_device_pixel_ratio() {
    let mut surface = CanvasSurface::new(canvas()).unwrap();
    surface.resize(400.0, 300.0, 2.0).unwrap();
    assert_eq!(surface.canvas().width(), 800);
    assert_eq!(surface.canvas().height(), 600);
    assert_eq!(surface.dpr(), 2.0);
}

#[wasm_bindgen_test]
fn engine_paints_onto_canvas() {
    let mut surface = CanvasSurface::new(canvas()).unwrap();
    surface.resize(972.0, 526.0, 1.0).unwrap();

    let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap();
    engine.resize(972.0, 526.0);
    engine.set_candles(
        (0..30u64)
            .map(|i| Candle::new(Timestamp::from_millis(i * 60_000), OHLCV::flat(10.0 + i as f64, 2.0)))
            .collect(),
    );
    engine.pointer_move(300.0, 200.0);
    engine.render(&mut surface);
}
