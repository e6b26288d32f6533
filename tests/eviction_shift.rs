use price_chart_engine::application::ChartEngine;
use price_chart_engine::domain::chart::{ChartConfig, DrawingType, Viewport};
use price_chart_engine::domain::market_data::{Candle, LiveUpdate, MergeOutcome, OHLCV, Symbol, Timestamp};

const CAPACITY: usize = 40;

fn candle(i: u64) -> Candle {
    Candle::new(Timestamp::from_millis(i * 60_000), OHLCV::flat(100.0 + (i % 5) as f64, 1.0))
}

fn full_engine() -> ChartEngine {
    let config = ChartConfig { max_candles: CAPACITY, initial_visible_candles: 20, ..Default::default() };
    let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), config).unwrap();
    engine.resize(972.0, 526.0);
    engine.set_candles((0..CAPACITY as u64).map(candle).collect());
    engine
}

fn first_anchor_index(engine: &ChartEngine) -> f64 {
    engine.drawings()[0].anchors[0].index
}

#[test]
fn following_window_stays_on_latest_and_drawings_move_with_their_candles() {
    let mut engine = full_engine();
    engine.select_tool(Some(DrawingType::Vertical), false);
    engine.click(300.0, 200.0);
    let anchor_before = first_anchor_index(&engine);
    assert_eq!((engine.viewport().start_index, engine.viewport().end_index), (20.0, 39.0));

    let outcome = engine.apply_update(LiveUpdate::Candle(candle(CAPACITY as u64))).unwrap();

    assert_eq!(outcome, MergeOutcome::Appended { evicted: true });
    assert_eq!(engine.series().len(), CAPACITY);
    assert_eq!((engine.viewport().start_index, engine.viewport().end_index), (20.0, 39.0));
    assert_eq!(engine.series().latest().unwrap().timestamp.value(), CAPACITY as u64 * 60_000);
    assert!((first_anchor_index(&engine) - (anchor_before - 1.0)).abs() < 1e-9);
}

#[test]
fn scrolled_back_window_keeps_showing_the_same_candles() {
    let mut engine = full_engine();
    engine.set_viewport(Viewport::new(5.0, 24.0, 90.0, 110.0));
    let first_visible = engine.series().get(5).unwrap().timestamp;

    engine.apply_update(LiveUpdate::Candle(candle(CAPACITY as u64))).unwrap();

    assert_eq!((engine.viewport().start_index, engine.viewport().end_index), (4.0, 23.0));
    assert_eq!(engine.series().get(4).unwrap().timestamp, first_visible);
}
