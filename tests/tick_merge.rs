use price_chart_engine::domain::market_data::{
    Candle, CandleSeries, LiveUpdate, MergeOutcome, OHLCV, Price, TimeInterval, Timestamp, Trade, Volume,
};

fn trade(ts: u64, price: f64) -> LiveUpdate {
    LiveUpdate::Trade(Trade { timestamp: Timestamp::from_millis(ts), price, quantity: 1.0 })
}

#[test]
fn in_bucket_ticks_update_and_next_bucket_appends() {
    let open = Candle::new(
        Timestamp::from_millis(120_000),
        OHLCV::new(Price::from(100.0), Price::from(101.0), Price::from(99.0), Price::from(100.5), Volume::from(5.0)),
    );
    let mut series = CandleSeries::from_candles(vec![open], 100);
    let before = series.len();

    assert_eq!(series.apply(trade(125_000, 103.0), TimeInterval::OneMinute).unwrap(), MergeOutcome::Replaced);
    assert_eq!(series.apply(trade(170_000, 98.0), TimeInterval::OneMinute).unwrap(), MergeOutcome::Replaced);
    assert_eq!(
        series.apply(trade(185_000, 99.5), TimeInterval::OneMinute).unwrap(),
        MergeOutcome::Appended { evicted: false }
    );

    assert_eq!(series.len(), before + 1);
    let bar = &series.get(0).unwrap().ohlcv;
    assert_eq!((bar.high.value(), bar.low.value(), bar.close.value()), (103.0, 98.0, 98.0));
    assert_eq!(bar.volume.value(), 7.0);
    assert_eq!(series.latest().unwrap().timestamp.value(), 180_000);
    assert!(series.candles().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn tick_into_an_earlier_retained_bucket_is_rejected() {
    let candles = (0..5u64).map(|i| Candle::new(Timestamp::from_millis(i * 60_000), OHLCV::flat(10.0, 1.0))).collect();
    let mut series = CandleSeries::from_candles(candles, 100);
    let before = series.candles().to_vec();

    assert!(series.apply(trade(2 * 60_000 + 30_000, 99.0), TimeInterval::OneMinute).is_err());
    assert_eq!(series.candles(), before.as_slice());
}

#[test]
fn unaligned_tail_accepts_ticks_from_its_own_bucket() {
    let candles = vec![
        Candle::new(Timestamp::from_millis(60_000), OHLCV::flat(100.0, 1.0)),
        Candle::new(Timestamp::from_millis(120_500), OHLCV::flat(100.0, 1.0)),
    ];
    let mut series = CandleSeries::from_candles(candles, 100);

    assert_eq!(series.apply(trade(121_000, 104.0), TimeInterval::OneMinute).unwrap(), MergeOutcome::Replaced);
    assert_eq!(series.len(), 2);
    assert_eq!(series.latest().unwrap().ohlcv.high.value(), 104.0);

    assert_eq!(
        series.apply(trade(180_000, 104.5), TimeInterval::OneMinute).unwrap(),
        MergeOutcome::Appended { evicted: false }
    );
    assert!(series.candles().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}
