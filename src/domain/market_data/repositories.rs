use super::entities::OpenInterestPoint;
use super::order_book::OrderBookSnapshot;
use super::value_objects::Symbol;
use crate::domain::errors::NetworkResult;
use futures::future::LocalBoxFuture;
use futures::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use strum::Display as StrumDisplay;

/// Upstream link state surfaced to the host so a stale ladder can be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, StrumDisplay, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
}

/// Push source of order-book snapshots.
pub trait OrderBookProvider {
    /// Each item replaces the previous snapshot wholesale. The stream ends
    /// when the upstream closes.
    fn subscribe(&self, symbol: &Symbol) -> LocalBoxStream<'static, OrderBookSnapshot>;

    fn connection_status(&self) -> ConnectionStatus;
}

/// Pull source of the open-interest history, polled on an interval.
pub trait OpenInterestProvider {
    fn fetch(&self, symbol: &Symbol) -> LocalBoxFuture<'static, NetworkResult<Vec<OpenInterestPoint>>>;
}
