use super::services::DataValidationService;
use super::value_objects::{OHLCV, Price, TimeInterval, Timestamp, Volume};
use crate::domain::errors::{AppError, ValidationResult};
use crate::domain::logging::LogComponent;
use crate::log_warn;
use serde::{Deserialize, Serialize};

/// Domain entity - Candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub ohlcv: OHLCV,
}

impl Candle {
    pub fn new(timestamp: Timestamp, ohlcv: OHLCV) -> Self {
        Self { timestamp, ohlcv }
    }

    /// Ties render bullish.
    pub fn is_bullish(&self) -> bool {
        self.ohlcv.close >= self.ohlcv.open
    }

    pub fn change_percent(&self) -> f64 {
        let open = self.ohlcv.open.value();
        if open == 0.0 {
            return 0.0;
        }
        (self.ohlcv.close.value() - open) / open * 100.0
    }
}

/// A single trade print folded into the current bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: Timestamp,
    pub price: f64,
    pub quantity: f64,
}

/// One live update from the OHLCV provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LiveUpdate {
    /// Full candle for its bucket (kline-style push)
    Candle(Candle),
    Trade(Trade),
}

/// What a merge did to the tail of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The open bucket was rewritten in place.
    Replaced,
    /// A new bucket was opened. `evicted` is set when the oldest candle was
    /// dropped to respect capacity, shifting every index down by one.
    Appended { evicted: bool },
}

/// Domain entity - time-ascending candle series with a capacity cap
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    max_size: usize,
}

impl CandleSeries {
    pub fn new(max_size: usize) -> Self {
        Self { candles: Vec::new(), max_size: max_size.max(1) }
    }

    /// Build from a provider snapshot: sorts, drops invalid bars, keeps the
    /// last occurrence of any duplicated timestamp and trims to capacity.
    pub fn from_candles(mut candles: Vec<Candle>, max_size: usize) -> Self {
        let validator = DataValidationService::new();
        let before = candles.len();
        candles.retain(|c| validator.validate_candle(c).is_ok());
        if candles.len() != before {
            log_warn!(
                LogComponent::Domain("CandleSeries"),
                "dropped {} invalid candles from snapshot",
                before - candles.len()
            );
        }

        candles.sort_by_key(|c| c.timestamp);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }

        let mut series = Self::new(max_size);
        let overflow = deduped.len().saturating_sub(series.max_size);
        series.candles = deduped.split_off(overflow);
        series
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Merge a full candle. Same bucket as the tail replaces it, a later bucket
    /// appends, an earlier bucket is rejected.
    pub fn merge_candle(
        &mut self,
        candle: Candle,
        interval: TimeInterval,
    ) -> ValidationResult<MergeOutcome> {
        DataValidationService::new()
            .validate_candle(&candle)
            .map_err(AppError::ValidationError)?;

        let bucket = interval.bucket_start(candle.timestamp);
        let candle = Candle { timestamp: bucket, ..candle };

        match self.candles.last_mut() {
            // history candles may sit off the bucket start; the tail keeps its own timestamp
            Some(last) if interval.bucket_start(last.timestamp) == bucket => {
                *last = Candle { timestamp: last.timestamp, ..candle };
                Ok(MergeOutcome::Replaced)
            }
            Some(last) if bucket < interval.bucket_start(last.timestamp) => Err(Self::stale(bucket, last.timestamp)),
            _ => Ok(self.push(candle)),
        }
    }

    /// Fold a trade into its bucket.
    pub fn apply_trade(
        &mut self,
        trade: &Trade,
        interval: TimeInterval,
    ) -> ValidationResult<MergeOutcome> {
        if !trade.price.is_finite() || trade.price <= 0.0 {
            return Err(AppError::ValidationError(format!("trade price {} is not positive", trade.price)));
        }
        if !trade.quantity.is_finite() || trade.quantity < 0.0 {
            return Err(AppError::ValidationError(format!(
                "trade quantity {} is negative",
                trade.quantity
            )));
        }

        let bucket = interval.bucket_start(trade.timestamp);
        match self.candles.last_mut() {
            Some(last) if interval.bucket_start(last.timestamp) == bucket => {
                let bar = &mut last.ohlcv;
                bar.high = Price::from(bar.high.value().max(trade.price));
                bar.low = Price::from(bar.low.value().min(trade.price));
                bar.close = Price::from(trade.price);
                bar.volume = Volume::from(bar.volume.value() + trade.quantity);
                Ok(MergeOutcome::Replaced)
            }
            Some(last) if bucket < interval.bucket_start(last.timestamp) => Err(Self::stale(bucket, last.timestamp)),
            _ => Ok(self.push(Candle::new(bucket, OHLCV::flat(trade.price, trade.quantity)))),
        }
    }

    pub fn apply(&mut self, update: LiveUpdate, interval: TimeInterval) -> ValidationResult<MergeOutcome> {
        match update {
            LiveUpdate::Candle(candle) => self.merge_candle(candle, interval),
            LiveUpdate::Trade(trade) => self.apply_trade(&trade, interval),
        }
    }

    fn push(&mut self, candle: Candle) -> MergeOutcome {
        self.candles.push(candle);
        let evicted = self.candles.len() > self.max_size;
        if evicted {
            self.candles.remove(0);
        }
        MergeOutcome::Appended { evicted }
    }

    fn stale(bucket: Timestamp, last: Timestamp) -> AppError {
        AppError::ValidationError(format!(
            "tick bucket {} is older than open bucket {}",
            bucket.value(),
            last.value()
        ))
    }

    /// Low/high over `[start, end]` (inclusive, clamped to the series).
    pub fn price_range(&self, start: usize, end: usize) -> Option<(f64, f64)> {
        self.window(start, end).iter().fold(None, |acc, c| {
            let (lo, hi) = (c.ohlcv.low.value(), c.ohlcv.high.value());
            Some(match acc {
                None => (lo, hi),
                Some((min, max)) => (f64::min(min, lo), f64::max(max, hi)),
            })
        })
    }

    /// Largest volume in `[start, end]`, 0 when the window is empty.
    pub fn max_volume(&self, start: usize, end: usize) -> f64 {
        self.window(start, end).iter().map(|c| c.ohlcv.volume.value()).fold(0.0, f64::max)
    }

    fn window(&self, start: usize, end: usize) -> &[Candle] {
        if self.candles.is_empty() || start > end || start >= self.candles.len() {
            return &[];
        }
        let end = end.min(self.candles.len() - 1);
        &self.candles[start..=end]
    }

    /// Index of the candle closest in time to `ts`, if within `tolerance_ms`.
    pub fn nearest_index(&self, ts: Timestamp, tolerance_ms: u64) -> Option<usize> {
        if self.candles.is_empty() {
            return None;
        }
        let pos = self.candles.partition_point(|c| c.timestamp < ts);
        let candidates = [pos.checked_sub(1), Some(pos).filter(|&p| p < self.candles.len())];
        candidates
            .into_iter()
            .flatten()
            .map(|i| (i, self.candles[i].timestamp.value().abs_diff(ts.value())))
            .min_by_key(|&(_, diff)| diff)
            .filter(|&(_, diff)| diff <= tolerance_ms)
            .map(|(i, _)| i)
    }
}

/// One open-interest sample from the OI provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenInterestPoint {
    pub oi: f64,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: u64, close: f64) -> Candle {
        Candle::new(
            Timestamp::from_millis(ts),
            OHLCV::new(
                Price::from(close),
                Price::from(close + 1.0),
                Price::from(close - 1.0),
                Price::from(close),
                Volume::from(10.0),
            ),
        )
    }

    #[test]
    fn from_candles_sorts_and_dedupes() {
        let series = CandleSeries::from_candles(
            vec![candle(120_000, 3.0), candle(0, 1.0), candle(60_000, 2.0), candle(60_000, 2.5)],
            10,
        );
        let ts: Vec<u64> = series.candles().iter().map(|c| c.timestamp.value()).collect();
        assert_eq!(ts, vec![0, 60_000, 120_000]);
        assert_eq!(series.get(1).unwrap().ohlcv.close.value(), 2.5);
    }

    #[test]
    fn trade_in_open_bucket_extends_bar() {
        let mut series = CandleSeries::from_candles(vec![candle(60_000, 100.0)], 10);
        let trade = Trade { timestamp: Timestamp::from_millis(90_000), price: 105.0, quantity: 2.0 };
        assert_eq!(series.apply_trade(&trade, TimeInterval::OneMinute), Ok(MergeOutcome::Replaced));

        let last = series.latest().unwrap();
        assert_eq!(last.ohlcv.high.value(), 105.0);
        assert_eq!(last.ohlcv.close.value(), 105.0);
        assert_eq!(last.ohlcv.open.value(), 100.0);
        assert_eq!(last.ohlcv.volume.value(), 12.0);
    }

    #[test]
    fn unaligned_history_tail_still_takes_in_bucket_trades() {
        let mut series = CandleSeries::from_candles(vec![candle(60_000, 100.0), candle(120_500, 101.0)], 10);
        let trade = Trade { timestamp: Timestamp::from_millis(121_000), price: 103.0, quantity: 1.0 };
        assert_eq!(series.apply_trade(&trade, TimeInterval::OneMinute), Ok(MergeOutcome::Replaced));
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().unwrap().timestamp.value(), 120_500);
        assert_eq!(series.latest().unwrap().ohlcv.close.value(), 103.0);
    }

    #[test]
    fn stale_tick_is_rejected_without_reordering() {
        let mut series = CandleSeries::from_candles(vec![candle(0, 1.0), candle(60_000, 2.0)], 10);
        let result = series.merge_candle(candle(5_000, 9.0), TimeInterval::OneMinute);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(0).unwrap().ohlcv.close.value(), 1.0);
    }

    #[test]
    fn append_beyond_capacity_evicts_oldest() {
        let mut series = CandleSeries::from_candles(vec![candle(0, 1.0), candle(60_000, 2.0)], 2);
        let outcome = series.merge_candle(candle(120_000, 3.0), TimeInterval::OneMinute);
        assert_eq!(outcome, Ok(MergeOutcome::Appended { evicted: true }));
        assert_eq!(series.len(), 2);
        assert_eq!(series.candles()[0].timestamp.value(), 60_000);
    }

    #[test]
    fn nearest_index_honours_tolerance() {
        let series = CandleSeries::from_candles(vec![candle(0, 1.0), candle(60_000, 2.0)], 10);
        assert_eq!(series.nearest_index(Timestamp::from_millis(50_000), 60_000), Some(1));
        assert_eq!(series.nearest_index(Timestamp::from_millis(200_000), 60_000), None);
    }

    #[test]
    fn window_stats_clamp_to_series() {
        let series = CandleSeries::from_candles(vec![candle(0, 10.0), candle(60_000, 20.0)], 10);
        assert_eq!(series.price_range(0, 99), Some((9.0, 21.0)));
        assert_eq!(series.max_volume(5, 9), 0.0);
    }

    #[test]
    fn live_update_parses_tagged_json() {
        let trade: LiveUpdate =
            serde_json::from_str(r#"{"kind":"trade","timestamp":60000,"price":101.5,"quantity":2.0}"#).unwrap();
        assert!(matches!(trade, LiveUpdate::Trade(t) if t.price == 101.5));

        let json = r#"{"kind":"candle","timestamp":0,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#;
        let LiveUpdate::Candle(candle) = serde_json::from_str(json).unwrap() else {
            panic!("expected a candle");
        };
        assert_eq!(candle.ohlcv.close.value(), 1.5);
    }
}
