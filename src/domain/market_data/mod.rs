//! Market data aggregate: candles, depth, open interest and the analysis
//! that runs over them.

pub mod entities;
pub mod oi_anomaly;
pub mod order_book;
pub mod repositories;
pub mod services;
pub mod value_area;
pub mod value_objects;

pub use entities::*;
pub use oi_anomaly::*;
pub use order_book::*;
pub use repositories::*;
pub use value_area::*;
pub use value_objects::*;
