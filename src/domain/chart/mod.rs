//! Chart aggregate: viewport and layout, configuration, user drawings and
//! the pure coordinate mapping the renderer and controller share.

pub mod config;
pub mod coordinates;
pub mod entities;
pub mod formatting;
pub mod value_objects;

pub use config::*;
pub use entities::*;
pub use value_objects::*;
