//! Market data aggregate: candles, value objects and the windowed store.

pub mod entities;
pub mod store;
pub mod value_objects;

pub use entities::*;
pub use store::{DEFAULT_CAPACITY, UpsertKind, UpsertOutcome, WindowedStore};
pub use value_objects::*;
