use price_chart_engine::application::ChartEngine;
use price_chart_engine::domain::chart::ChartConfig;
use price_chart_engine::domain::market_data::{Candle, OHLCV, Price, Symbol, Timestamp, Volume};
use price_chart_engine::infrastructure::rendering::{Layer, RecordingSurface};

fn engine() -> ChartEngine {
    let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap();
    engine.resize(972.0, 526.0);
    let candles = (0..150u64)
        .map(|i| {
            let base = 100.0 + (i as f64 * 0.3).sin() * 5.0;
            Candle::new(
                Timestamp::from_millis(i * 60_000),
                OHLCV::new(
                    Price::from(base),
                    Price::from(base + 2.0),
                    Price::from(base - 2.0),
                    Price::from(base + 1.0),
                    Volume::from(10.0 + i as f64),
                ),
            )
        })
        .collect();
    engine.set_candles(candles);
    engine
}

fn record(engine: &ChartEngine) -> RecordingSurface {
    let mut surface = RecordingSurface::new();
    engine.render(&mut surface);
    surface
}

#[test]
fn layers_paint_in_stacking_order() {
    let engine = engine();
    let layers = record(&engine).layers();

    assert_eq!(layers.first(), Some(&Layer::Background));
    assert!(layers.windows(2).all(|w| w[0] < w[1]), "out of order: {:?}", layers);
    for expected in [Layer::Grid, Layer::Candles, Layer::Volume, Layer::PriceAxis, Layer::TimeAxis, Layer::Watermark] {
        assert!(layers.contains(&expected), "missing {}", expected);
    }
    assert!(!layers.contains(&Layer::Crosshair));
    assert!(!layers.contains(&Layer::NoData));
}

#[test]
fn crosshair_is_painted_last_once_pointer_is_inside() {
    let mut engine = engine();
    engine.pointer_move(400.0, 200.0);
    let layers = record(&engine).layers();

    assert!(layers.windows(2).all(|w| w[0] < w[1]));
    let crosshair = layers.iter().position(|l| *l == Layer::Crosshair).expect("crosshair layer");
    let watermark = layers.iter().position(|l| *l == Layer::Watermark).expect("watermark layer");
    assert!(crosshair > watermark);

    engine.pointer_leave();
    assert!(!record(&engine).layers().contains(&Layer::Crosshair));
}
