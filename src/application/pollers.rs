//! Background producers feeding the engine: the open-interest poller and the
//! order-book subscription. Both stop when their handle is dropped.

use crate::domain::logging::LogComponent;
use crate::domain::market_data::{
    ConnectionStatus, OpenInterestPoint, OpenInterestProvider, OrderBookProvider, OrderBookSnapshot, Symbol,
};
use crate::{log_debug, log_warn};
use futures::future::{AbortHandle, Abortable};
use futures::{Future, StreamExt};
use gloo_timers::callback::Interval;
use std::cell::RefCell;
use std::rc::Rc;

/// Polls an [`OpenInterestProvider`] on a fixed period. A fetch still in
/// flight when the next tick fires (or when the poller drops) is aborted.
pub struct OpenInterestPoller {
    _interval: Interval,
    in_flight: Rc<RefCell<Option<AbortHandle>>>,
}

impl OpenInterestPoller {
    pub fn start<F>(provider: Rc<dyn OpenInterestProvider>, symbol: Symbol, period_ms: u32, on_data: F) -> Self
    where
        F: Fn(Vec<OpenInterestPoint>) + 'static,
    {
        let in_flight: Rc<RefCell<Option<AbortHandle>>> = Rc::new(RefCell::new(None));
        let on_data: Rc<dyn Fn(Vec<OpenInterestPoint>)> = Rc::new(on_data);

        let tick = {
            let in_flight = in_flight.clone();
            move || {
                let fut = Self::fetch_once(provider.clone(), symbol.clone(), on_data.clone());
                let (handle, registration) = AbortHandle::new_pair();
                if let Some(previous) = in_flight.borrow_mut().replace(handle) {
                    previous.abort();
                }
                wasm_bindgen_futures::spawn_local(async move {
                    let _ = Abortable::new(fut, registration).await;
                });
            }
        };

        tick();
        let interval = Interval::new(period_ms.max(1), tick);
        log_debug!(LogComponent::Application("OiPoller"), "polling every {} ms", period_ms);
        Self { _interval: interval, in_flight }
    }

    fn fetch_once(
        provider: Rc<dyn OpenInterestProvider>,
        symbol: Symbol,
        on_data: Rc<dyn Fn(Vec<OpenInterestPoint>)>,
    ) -> impl Future<Output = ()> {
        let request = provider.fetch(&symbol);
        async move {
            match request.await {
                Ok(points) => on_data(points),
                Err(e) => log_warn!(LogComponent::Application("OiPoller"), "fetch failed: {}", e),
            }
        }
    }
}

impl Drop for OpenInterestPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.borrow_mut().take() {
            handle.abort();
        }
    }
}

/// Drives an [`OrderBookProvider`] stream until the upstream ends or the
/// handle drops.
pub struct OrderBookSubscription {
    abort: AbortHandle,
}

impl OrderBookSubscription {
    /// Build the subscription without spawning it. The returned future
    /// delivers every snapshot and resolves when the stream ends or is aborted.
    /// When the stream ends on its own, `on_snapshot` gets one last call with
    /// no snapshot and `Disconnected`.
    pub fn new<F>(provider: Rc<dyn OrderBookProvider>, symbol: &Symbol, on_snapshot: F) -> (Self, impl Future<Output = ()> + use<F>)
    where
        F: Fn(Option<OrderBookSnapshot>, ConnectionStatus) + 'static,
    {
        let mut stream = provider.subscribe(symbol);
        let (abort, registration) = AbortHandle::new_pair();
        let pump = async move {
            while let Some(snapshot) = stream.next().await {
                on_snapshot(Some(snapshot), provider.connection_status());
            }
            log_debug!(LogComponent::Application("OrderBook"), "order book stream ended");
            on_snapshot(None, ConnectionStatus::Disconnected);
        };
        let task = async move {
            let _ = Abortable::new(pump, registration).await;
        };
        (Self { abort }, task)
    }

    /// Build and spawn on the browser event loop.
    pub fn start<F>(provider: Rc<dyn OrderBookProvider>, symbol: &Symbol, on_snapshot: F) -> Self
    where
        F: Fn(Option<OrderBookSnapshot>, ConnectionStatus) + 'static,
    {
        let (subscription, task) = Self::new(provider, symbol, on_snapshot);
        wasm_bindgen_futures::spawn_local(task);
        subscription
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }
}

impl Drop for OrderBookSubscription {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::OrderBookLevel;
    use futures::executor::block_on;
    use futures::stream::{self, LocalBoxStream};

    struct FixedBook(Vec<OrderBookSnapshot>);

    impl OrderBookProvider for FixedBook {
        fn subscribe(&self, _symbol: &Symbol) -> LocalBoxStream<'static, OrderBookSnapshot> {
            stream::iter(self.0.clone()).boxed_local()
        }

        fn connection_status(&self) -> ConnectionStatus {
            ConnectionStatus::Connected
        }
    }

    fn book(bid: f64) -> OrderBookSnapshot {
        OrderBookSnapshot::from_levels(
            Symbol::from("BTCUSDT"),
            vec![OrderBookLevel::new(bid, 1.0)],
            vec![OrderBookLevel::new(bid + 1.0, 1.0)],
            Default::default(),
        )
    }

    #[test]
    fn delivers_every_snapshot_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let provider: Rc<dyn OrderBookProvider> = Rc::new(FixedBook(vec![book(1.0), book(2.0)]));
        let (_sub, task) = OrderBookSubscription::new(provider, &Symbol::from("BTCUSDT"), move |b, status| {
            if let Some(b) = b {
                assert_eq!(status, ConnectionStatus::Connected);
                sink.borrow_mut().push(b.bids[0].price);
            }
        });
        block_on(task);
        assert_eq!(*seen.borrow(), vec![1.0, 2.0]);
    }

    #[test]
    fn stream_end_reports_disconnected() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let provider: Rc<dyn OrderBookProvider> = Rc::new(FixedBook(vec![book(1.0)]));
        let (_sub, task) = OrderBookSubscription::new(provider, &Symbol::from("BTCUSDT"), move |b, status| {
            sink.borrow_mut().push((b.is_some(), status));
        });
        block_on(task);
        assert_eq!(
            *seen.borrow(),
            vec![(true, ConnectionStatus::Connected), (false, ConnectionStatus::Disconnected)]
        );
    }

    #[test]
    fn dropping_the_handle_aborts() {
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        let provider: Rc<dyn OrderBookProvider> = Rc::new(FixedBook(vec![book(1.0)]));
        let (sub, task) = OrderBookSubscription::new(provider, &Symbol::from("BTCUSDT"), move |_, _| {
            *sink.borrow_mut() += 1;
        });
        drop(sub);
        block_on(task);
        assert_eq!(*seen.borrow(), 0);
    }
}
