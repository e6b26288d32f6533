use gloo::events::EventListener;
use leptos::html::Canvas;
use leptos::*;
use std::rc::Rc;
use wasm_bindgen::JsCast;

use crate::domain::chart::ChartConfig;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, OrderBookSnapshot, Symbol};
use crate::presentation::ChartHandle;
use crate::{log_error, log_info};

/// Canvas-backed chart. The engine lives as long as the component: created
/// once the canvas is mounted, destroyed in `on_cleanup`.
#[component]
pub fn ChartCanvas(
    #[prop(into)] symbol: String,
    #[prop(optional)] config: Option<ChartConfig>,
    #[prop(optional, into)] candles: Option<Signal<Vec<Candle>>>,
    #[prop(optional, into)] order_book: Option<Signal<Option<OrderBookSnapshot>>>,
) -> impl IntoView {
    let canvas_ref = create_node_ref::<Canvas>();
    let handle = store_value::<Option<Rc<ChartHandle>>>(None);
    let listeners = store_value::<Vec<EventListener>>(Vec::new());

    let with_handle = move |f: &dyn Fn(&ChartHandle)| {
        handle.with_value(|h| {
            if let Some(h) = h {
                f(h);
            }
        })
    };

    create_effect(move |_| {
        let Some(canvas) = canvas_ref.get() else {
            return;
        };
        if handle.with_value(Option::is_some) {
            return;
        }
        let element: web_sys::HtmlCanvasElement = (*canvas).clone();
        let mounted = ChartHandle::mount(element.clone(), Symbol::from(symbol.as_str()), config.clone().unwrap_or_default());
        let chart = match mounted {
            Ok(chart) => Rc::new(chart),
            Err(e) => {
                log_error!(LogComponent::Presentation("ChartCanvas"), "mount failed: {}", e);
                return;
            }
        };
        if let Some(candles) = candles {
            chart.update(|e| e.set_candles(candles.get_untracked()));
        }
        if let Some(order_book) = order_book {
            chart.update(|e| e.set_order_book(order_book.get_untracked()));
        }
        chart.start();

        let Some(window) = web_sys::window() else {
            return;
        };
        let on_key = {
            let chart = chart.clone();
            EventListener::new(&window, "keydown", move |event| {
                if let Some(event) = event.dyn_ref::<web_sys::KeyboardEvent>() {
                    chart.key_down(&event.key());
                }
            })
        };
        let on_resize = {
            let chart = chart.clone();
            EventListener::new(&window, "resize", move |_| {
                let (w, h) = (element.client_width() as f64, element.client_height() as f64);
                if let Err(e) = chart.resize(w, h, None) {
                    log_error!(LogComponent::Presentation("ChartCanvas"), "resize failed: {:?}", e);
                }
            })
        };
        listeners.set_value(vec![on_key, on_resize]);
        handle.set_value(Some(chart));
        log_info!(LogComponent::Presentation("ChartCanvas"), "chart component mounted");
    });

    if let Some(candles) = candles {
        create_effect(move |_| {
            let candles = candles.get();
            with_handle(&|h| h.update(|e| e.set_candles(candles.clone())));
        });
    }

    if let Some(order_book) = order_book {
        create_effect(move |_| {
            let book = order_book.get();
            with_handle(&|h| h.update(|e| e.set_order_book(book.clone())));
        });
    }

    on_cleanup(move || {
        listeners.set_value(Vec::new());
        if let Some(chart) = handle.with_value(Clone::clone) {
            chart.destroy();
        }
        handle.set_value(None);
    });

    let on_mouse_down = move |ev: web_sys::MouseEvent| {
        with_handle(&|h| h.pointer_down(ev.offset_x() as f64, ev.offset_y() as f64));
    };
    let on_mouse_move = move |ev: web_sys::MouseEvent| {
        with_handle(&|h| h.pointer_move(ev.offset_x() as f64, ev.offset_y() as f64));
    };
    let on_mouse_up = move |ev: web_sys::MouseEvent| {
        with_handle(&|h| h.pointer_up(ev.offset_x() as f64, ev.offset_y() as f64));
    };
    let on_mouse_leave = move |_: web_sys::MouseEvent| {
        with_handle(&|h| h.pointer_leave());
    };
    let on_wheel = move |ev: web_sys::WheelEvent| {
        ev.prevent_default();
        with_handle(&|h| h.wheel(ev.offset_x() as f64, ev.delta_y()));
    };

    view! {
        <canvas
            class="price-chart"
            node_ref=canvas_ref
            style="width: 100%; height: 100%; display: block; cursor: crosshair;"
            on:mousedown=on_mouse_down
            on:mousemove=on_mouse_move
            on:mouseup=on_mouse_up
            on:mouseleave=on_mouse_leave
            on:wheel=on_wheel
        />
    }
}
