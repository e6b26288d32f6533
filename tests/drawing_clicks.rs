use std::cell::RefCell;
use std::rc::Rc;

use price_chart_engine::application::ChartEngine;
use price_chart_engine::domain::chart::{ChartConfig, ChartMode, DrawingType};
use price_chart_engine::domain::events::ChartEvent;
use price_chart_engine::domain::market_data::{Candle, OHLCV, Symbol, Timestamp};

fn engine() -> (ChartEngine, Rc<RefCell<Vec<ChartEvent>>>) {
    let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap();
    engine.resize(972.0, 526.0);
    let candles = (0..60u64)
        .map(|i| Candle::new(Timestamp::from_millis(i * 60_000), OHLCV::flat(100.0 + i as f64, 1.0)))
        .collect();
    engine.set_candles(candles);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    engine.on_event(move |e| sink.borrow_mut().push(e.clone()));
    (engine, events)
}

fn drawings_updates(events: &[ChartEvent]) -> usize {
    events.iter().filter(|e| matches!(e, ChartEvent::DrawingsUpdated(_))).count()
}

#[test]
fn horizontal_line_completes_on_first_click() {
    let (mut engine, events) = engine();
    engine.select_tool(Some(DrawingType::Horizontal), false);
    assert_eq!(engine.mode(), ChartMode::Drawing);

    engine.click(300.0, 150.0);

    assert_eq!(engine.drawings().len(), 1);
    assert_eq!(engine.drawings()[0].anchors.len(), 1);
    assert_eq!(engine.mode(), ChartMode::Normal);
    assert_eq!(drawings_updates(&events.borrow()), 1);
}

#[test]
fn trendline_waits_for_second_click() {
    let (mut engine, events) = engine();
    engine.select_tool(Some(DrawingType::Trendline), false);

    engine.click(200.0, 300.0);
    assert!(engine.drawings().is_empty());
    assert_eq!(engine.mode(), ChartMode::Drawing);
    assert_eq!(drawings_updates(&events.borrow()), 0);

    engine.click(600.0, 100.0);
    assert_eq!(engine.drawings().len(), 1);
    let line = &engine.drawings()[0];
    assert_eq!(line.kind, DrawingType::Trendline);
    assert!(line.anchors[0].price < line.anchors[1].price);
    assert_eq!(engine.mode(), ChartMode::Normal);
    assert_eq!(drawings_updates(&events.borrow()), 1);
}
