//! upwatch-state — persisted side store for manual endpoint tests.
//!
//! Backed by [redb](https://docs.rs/redb). Each record is the JSON-encoded
//! [`ManualTestRecord`](upwatch_core::ManualTestRecord) keyed by endpoint id,
//! so a test run in one process is still visible to the next one.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
