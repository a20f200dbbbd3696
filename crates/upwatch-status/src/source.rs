//! The data-provider contract the status engine consumes.
//!
//! Anything that can answer the three questions below can feed the engine:
//! the [`HttpSource`](crate::HttpSource) adapter, or an in-process fake in
//! tests. The engine imposes no timeouts of its own; a source that hangs
//! stalls the refresh pass that called it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use upwatch_core::{ConfigSnapshot, EndpointId, HealthCheckRecord, RecentRequestSample};

use crate::error::SourceResult;

/// Boxed, sendable future returned by [`StatusSource`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to endpoint configuration, health checks, and request history.
pub trait StatusSource: Send + Sync {
    /// Current endpoint list and the background health-check cadence.
    fn fetch_config(&self) -> BoxFuture<'_, SourceResult<ConfigSnapshot>>;

    /// Latest health-check record per endpoint id.
    fn fetch_health_checks(
        &self,
    ) -> BoxFuture<'_, SourceResult<HashMap<EndpointId, HealthCheckRecord>>>;

    /// Up to `limit` most recent request outcomes, most recent first.
    ///
    /// Failing here only degrades the one endpoint being asked about.
    fn fetch_recent_requests<'a>(
        &'a self,
        endpoint_id: &'a str,
        client_type: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, SourceResult<Vec<RecentRequestSample>>>;
}
