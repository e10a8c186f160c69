//! Persistence for resolutions and users.
//!
//! The core only talks to [`LocationStore`] and [`UserStore`]. Production
//! uses [`PgStore`]; tests and local runs use [`MemoryStore`].

pub mod error;
mod memory;
mod postgres;
mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{InsertOutcome, LocationStore, UserStore};
