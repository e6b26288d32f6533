pub mod chart_engine;
pub mod ingestion;
pub mod interaction;
pub mod pollers;

pub use chart_engine::{ChartEngine, DerivedState};
pub use ingestion::LiveUpdateUseCase;
pub use interaction::{InteractionContext, InteractionController};
pub use pollers::{OpenInterestPoller, OrderBookSubscription};
