#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use js_sys::Function;
use price_chart_engine::ChartHandle;
use price_chart_engine::domain::chart::{ChartConfig, DrawingType};
use price_chart_engine::domain::market_data::Symbol;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn canvas() -> web_sys::HtmlCanvasElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let canvas = document.create_element("canvas").unwrap();
    document.body().unwrap().append_child(&canvas).unwrap();
    canvas.dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn callback_may_call_back_into_the_handle() {
    let handle = Rc::new(ChartHandle::mount(canvas(), Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap());
    let calls = Rc::new(Cell::new(0));

    let inner = handle.clone();
    let counter = calls.clone();
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |_mode: JsValue| {
        counter.set(counter.get() + 1);
        inner.on_viewport_change(Function::new_no_args(""));
        inner.on_mode_change(Function::new_no_args(""));
    });
    handle.on_mode_change(callback.as_ref().unchecked_ref::<Function>().clone());
    callback.forget();

    handle.update(|e| e.select_tool(Some(DrawingType::Horizontal), false));
    assert_eq!(calls.get(), 1);

    // the callback replaced itself
    handle.update(|e| e.select_tool(None, false));
    assert_eq!(calls.get(), 1);
}
