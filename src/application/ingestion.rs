use crate::application::interaction::InteractionController;
use crate::domain::errors::ValidationResult;
use crate::domain::events::ChartEvent;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{CandleSeries, LiveUpdate, MergeOutcome, TimeInterval};
use crate::{log_trace, log_warn};

/// Use case - fold a live update into the series and keep the viewport on
/// the latest candle when the user left it there.
#[derive(Debug, Clone, Copy)]
pub struct LiveUpdateUseCase {
    pub interval: TimeInterval,
    pub auto_scroll: bool,
}

impl LiveUpdateUseCase {
    pub fn new(interval: TimeInterval, auto_scroll: bool) -> Self {
        Self { interval, auto_scroll }
    }

    /// Stale or invalid updates are logged and dropped; the series and the
    /// viewport are left untouched.
    pub fn execute(
        &self,
        series: &mut CandleSeries,
        controller: &mut InteractionController,
        update: LiveUpdate,
    ) -> ValidationResult<(MergeOutcome, Vec<ChartEvent>)> {
        let was_at_latest = controller.viewport().is_at_latest(series.len());

        let outcome = series.apply(update, self.interval).inspect_err(|e| {
            log_warn!(LogComponent::Application("LiveUpdate"), "dropped update: {}", e);
        })?;

        let mut events = Vec::new();
        match outcome {
            MergeOutcome::Replaced => {
                let before = *controller.viewport();
                controller.refit_prices(series);
                if *controller.viewport() != before {
                    events.push(ChartEvent::ViewportChanged(*controller.viewport()));
                }
            }
            MergeOutcome::Appended { evicted } => {
                // Interaction wins: a drag in progress keeps its window.
                let follow = self.auto_scroll && was_at_latest && !controller.is_dragging();
                if evicted {
                    controller.shift_indices(-1.0, !follow);
                }
                if follow && !evicted {
                    events.extend(controller.follow_latest(series));
                } else {
                    controller.refit_prices(series);
                    events.push(ChartEvent::ViewportChanged(*controller.viewport()));
                }
                log_trace!(
                    LogComponent::Application("LiveUpdate"),
                    "appended candle #{} (follow={}, evicted={})",
                    series.len(),
                    follow,
                    evicted
                );
            }
        }
        Ok((outcome, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{Candle, OHLCV, Price, Timestamp, Trade, Volume};

    fn candle(ts: u64, p: f64) -> Candle {
        Candle::new(
            Timestamp::from_millis(ts),
            OHLCV::new(Price::from(p), Price::from(p + 1.0), Price::from(p - 1.0), Price::from(p), Volume::from(1.0)),
        )
    }

    fn setup(len: usize, capacity: usize) -> (CandleSeries, InteractionController) {
        let series = CandleSeries::from_candles((0..len as u64).map(|i| candle(i * 60_000, 100.0)).collect(), capacity);
        let mut controller = InteractionController::new();
        controller.reset_viewport(&series, 20);
        (series, controller)
    }

    #[test]
    fn append_scrolls_when_at_latest() {
        let (mut series, mut controller) = setup(50, 100);
        let use_case = LiveUpdateUseCase::new(TimeInterval::OneMinute, true);
        use_case.execute(&mut series, &mut controller, LiveUpdate::Candle(candle(50 * 60_000, 101.0))).unwrap();
        assert_eq!(controller.viewport().end_index, 50.0);
        assert_eq!(controller.viewport().start_index, 31.0);
    }

    #[test]
    fn append_leaves_scrolled_back_window() {
        let (mut series, mut controller) = setup(50, 100);
        controller.set_viewport(crate::domain::chart::Viewport::new(0.0, 19.0, 0.0, 1.0));
        let use_case = LiveUpdateUseCase::new(TimeInterval::OneMinute, true);
        use_case.execute(&mut series, &mut controller, LiveUpdate::Candle(candle(50 * 60_000, 101.0))).unwrap();
        assert_eq!(controller.viewport().end_index, 19.0);
    }

    #[test]
    fn eviction_keeps_latest_in_view() {
        let (mut series, mut controller) = setup(50, 50);
        let use_case = LiveUpdateUseCase::new(TimeInterval::OneMinute, true);
        let (outcome, _) = use_case
            .execute(&mut series, &mut controller, LiveUpdate::Candle(candle(50 * 60_000, 101.0)))
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Appended { evicted: true });
        assert_eq!(controller.viewport().end_index, 49.0);
        assert_eq!(series.len(), 50);
    }

    #[test]
    fn stale_trade_is_dropped() {
        let (mut series, mut controller) = setup(5, 100);
        let before = *controller.viewport();
        let use_case = LiveUpdateUseCase::new(TimeInterval::OneMinute, true);
        let trade = Trade { timestamp: Timestamp::from_millis(0), price: 1.0, quantity: 1.0 };
        assert!(use_case.execute(&mut series, &mut controller, LiveUpdate::Trade(trade)).is_err());
        assert_eq!(*controller.viewport(), before);
        assert_eq!(series.len(), 5);
    }
}
