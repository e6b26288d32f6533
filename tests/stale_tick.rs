use price_chart_engine::application::ChartEngine;
use price_chart_engine::domain::chart::ChartConfig;
use price_chart_engine::domain::errors::AppError;
use price_chart_engine::domain::market_data::{
    Candle, LiveUpdate, OHLCV, Price, Symbol, Timestamp, Trade, Volume,
};

#[test]
fn tick_older_than_last_bucket_is_rejected() {
    let mut engine = ChartEngine::new(Symbol::from("ETHUSDT"), ChartConfig::default()).unwrap();
    engine.resize(972.0, 526.0);
    let candles = (0..5u64)
        .map(|i| {
            Candle::new(
                Timestamp::from_millis(i * 60_000),
                OHLCV::new(Price::from(10.0), Price::from(11.0), Price::from(9.0), Price::from(10.5), Volume::from(1.0)),
            )
        })
        .collect();
    engine.set_candles(candles);
    let viewport = *engine.viewport();

    let stale = LiveUpdate::Trade(Trade { timestamp: Timestamp::from_millis(60_000), price: 50.0, quantity: 1.0 });
    let result = engine.apply_update(stale);

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert_eq!(engine.series().len(), 5);
    assert_eq!(engine.series().get(1).unwrap().ohlcv.close.value(), 10.5);
    assert_eq!(*engine.viewport(), viewport);
}
