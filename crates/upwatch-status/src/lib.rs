//! upwatch-status — resolves one availability status per endpoint.
//!
//! Several signals describe an endpoint's health, and they disagree and go
//! stale independently. This crate reconciles them into a single
//! [`StatusRecord`](upwatch_core::StatusRecord) per endpoint and serves the
//! result from an in-memory cache.
//!
//! # Architecture
//!
//! ```text
//! StatusEngine
//!   ├── refresh()  (single-flight: overlapping callers share one pass)
//!   │   ├── StatusSource::fetch_config()
//!   │   ├── StatusSource::fetch_health_checks()
//!   │   ├── StatusSource::fetch_recent_requests()  (per endpoint, concurrent)
//!   │   ├── StateStore::get_manual_test()          (per endpoint)
//!   │   ├── rules::resolve()  → StatusRecord
//!   │   └── StatusCache::replace_all()
//!   ├── get_status() / get_all_statuses()  (cache reads, no I/O)
//!   └── record_manual_test()  (side store + single cache entry)
//! ```
//!
//! # Priority
//!
//! Evidence is ranked: disabled configuration, then recent live traffic,
//! then a fresh health check, then a fresh manual test, then the configured
//! state. The first tier with sufficient fresh evidence decides; see
//! [`rules`].

pub mod cache;
pub mod engine;
pub mod error;
pub mod rules;
pub mod source;
pub mod upstream;

pub use cache::{StatusCache, StatusSnapshot};
pub use engine::{Clock, RefreshReport, StatusEngine};
pub use error::{RefreshError, SourceError, SourceResult};
pub use rules::{Evidence, Policy};
pub use source::StatusSource;
pub use upstream::HttpSource;
