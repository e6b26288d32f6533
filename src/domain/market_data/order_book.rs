//! Order-book snapshot as delivered by the depth provider.
//!
//! Snapshots are replaced wholesale; nothing here patches a level in place.
//! Wire fields that providers sometimes omit are optional or defaulted so a
//! partial payload still deserializes and the renderer can skip what's missing.

use super::value_objects::{Symbol, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub quantity: f64,
    /// Cumulative quantity from the top of the book to this level.
    #[serde(default)]
    pub total: f64,
}

impl OrderBookLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity, total: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    /// Best bid first (descending price).
    pub bids: Vec<OrderBookLevel>,
    /// Best ask first (ascending price).
    pub asks: Vec<OrderBookLevel>,
    pub total_bid_volume: f64,
    pub total_ask_volume: f64,
    pub mid_price: Option<f64>,
    pub spread: Option<f64>,
    pub spread_percent: Option<f64>,
    /// -100 (all asks) .. 100 (all bids)
    pub imbalance: f64,
    pub timestamp: Timestamp,
}

impl OrderBookSnapshot {
    /// Derive every aggregate field from raw levels. Levels are re-sorted
    /// best-first and cumulative totals are rebuilt.
    pub fn from_levels(
        symbol: Symbol,
        mut bids: Vec<OrderBookLevel>,
        mut asks: Vec<OrderBookLevel>,
        timestamp: Timestamp,
    ) -> Self {
        bids.retain(|l| l.price.is_finite() && l.quantity.is_finite() && l.quantity > 0.0);
        asks.retain(|l| l.price.is_finite() && l.quantity.is_finite() && l.quantity > 0.0);
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));

        let total_bid_volume = accumulate(&mut bids);
        let total_ask_volume = accumulate(&mut asks);

        let (mid_price, spread, spread_percent) = match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => {
                let mid = (bid.price + ask.price) / 2.0;
                let spread = ask.price - bid.price;
                let pct = if mid > 0.0 { spread / mid * 100.0 } else { 0.0 };
                (Some(mid), Some(spread), Some(pct))
            }
            _ => (None, None, None),
        };

        Self {
            symbol,
            bids,
            asks,
            total_bid_volume,
            total_ask_volume,
            mid_price,
            spread,
            spread_percent,
            imbalance: imbalance(total_bid_volume, total_ask_volume),
            timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Mid price, falling back to the best level on whichever side exists.
    pub fn reference_price(&self) -> Option<f64> {
        self.mid_price
            .or_else(|| self.bids.first().map(|l| l.price))
            .or_else(|| self.asks.first().map(|l| l.price))
    }

    /// Bids and asks merged into ascending price order, summing quantities
    /// quoted on both sides at the same price.
    pub fn merged_levels(&self) -> Vec<(f64, f64)> {
        let mut levels: Vec<(f64, f64)> =
            self.bids.iter().chain(self.asks.iter()).map(|l| (l.price, l.quantity)).collect();
        levels.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(levels.len());
        for (price, qty) in levels {
            match merged.last_mut() {
                Some(last) if last.0 == price => last.1 += qty,
                _ => merged.push((price, qty)),
            }
        }
        merged
    }
}

fn accumulate(levels: &mut [OrderBookLevel]) -> f64 {
    let mut running = 0.0;
    for level in levels.iter_mut() {
        running += level.quantity;
        level.total = running;
    }
    running
}

/// Normalized bid/ask imbalance in -100..=100; 0 for an empty book.
pub fn imbalance(bid_volume: f64, ask_volume: f64) -> f64 {
    let total = bid_volume + ask_volume;
    if total <= 0.0 {
        return 0.0;
    }
    ((bid_volume - ask_volume) / total * 100.0).clamp(-100.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot::from_levels(
            Symbol::from("btcusdt"),
            vec![OrderBookLevel::new(99.0, 2.0), OrderBookLevel::new(100.0, 5.0)],
            vec![OrderBookLevel::new(102.0, 1.0), OrderBookLevel::new(101.0, 2.0)],
            Timestamp::from_millis(1),
        )
    }

    #[test]
    fn derives_aggregates_from_levels() {
        let book = book();
        assert_eq!(book.bids[0].price, 100.0);
        assert_eq!(book.bids[1].total, 7.0);
        assert_eq!(book.asks[0].price, 101.0);
        assert_eq!(book.total_ask_volume, 3.0);
        assert_eq!(book.mid_price, Some(100.5));
        assert_eq!(book.spread, Some(1.0));
        assert!((book.imbalance - 40.0).abs() < 1e-9);
    }

    #[test]
    fn partial_payload_deserializes() {
        let json = r#"{"symbol":"ETHUSDT","bids":[{"price":10.0,"quantity":1.0}]}"#;
        let book: OrderBookSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(book.mid_price, None);
        assert!(book.asks.is_empty());
        assert_eq!(book.reference_price(), Some(10.0));
    }

    #[test]
    fn merged_levels_sum_crossed_prices() {
        let book = OrderBookSnapshot {
            bids: vec![OrderBookLevel::new(10.0, 1.0)],
            asks: vec![OrderBookLevel::new(10.0, 2.0), OrderBookLevel::new(11.0, 3.0)],
            ..Default::default()
        };
        assert_eq!(book.merged_levels(), vec![(10.0, 3.0), (11.0, 3.0)]);
    }

    #[test]
    fn empty_book_has_zero_imbalance() {
        assert_eq!(imbalance(0.0, 0.0), 0.0);
    }
}
