use crate::domain::market_data::Candle;

/// Domain service for validating provider data before it reaches the series
#[derive(Clone, Default)]
pub struct DataValidationService;

impl DataValidationService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a candle with a descriptive reason
    pub fn validate_candle(&self, candle: &Candle) -> Result<(), String> {
        let o = &candle.ohlcv;
        let values = [o.open.value(), o.high.value(), o.low.value(), o.close.value(), o.volume.value()];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("OHLCV contains a non-finite value".to_string());
        }

        if o.high.value() < o.low.value() {
            return Err("High price cannot be lower than low price".to_string());
        }
        if o.high.value() < o.open.value().max(o.close.value()) {
            return Err("High price cannot be lower than open/close".to_string());
        }
        if o.low.value() > o.open.value().min(o.close.value()) {
            return Err("Low price cannot be higher than open/close".to_string());
        }

        if o.low.value() <= 0.0 {
            return Err("Prices must be positive".to_string());
        }
        if o.volume.value() < 0.0 {
            return Err("Volume cannot be negative".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{OHLCV, Price, Timestamp, Volume};

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(
            Timestamp::from_millis(0),
            OHLCV::new(Price::from(o), Price::from(h), Price::from(l), Price::from(c), Volume::from(1.0)),
        )
    }

    #[test]
    fn rejects_inverted_bar() {
        let svc = DataValidationService::new();
        assert!(svc.validate_candle(&bar(10.0, 9.0, 11.0, 10.0)).is_err());
        assert!(svc.validate_candle(&bar(10.0, 12.0, 9.0, 11.0)).is_ok());
    }

    #[test]
    fn accepts_sub_cent_assets() {
        let svc = DataValidationService::new();
        assert!(svc.validate_candle(&bar(0.00001, 0.00002, 0.000009, 0.000015)).is_ok());
    }

    #[test]
    fn rejects_non_finite() {
        let svc = DataValidationService::new();
        assert!(svc.validate_candle(&bar(f64::NAN, 12.0, 9.0, 11.0)).is_err());
    }
}
