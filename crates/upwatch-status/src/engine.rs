//! Status engine — owns the cache and coordinates refresh passes.
//!
//! A refresh pass fetches configuration and health checks, then every
//! endpoint's recent request history, resolves each endpoint through
//! [`rules::resolve`](crate::rules::resolve), and swaps the result into the
//! [`StatusCache`] in one step.
//!
//! Passes are single-flight. The first caller spawns the pass as a tokio
//! task and parks a shared handle to its result; callers arriving while the
//! pass runs await that same handle instead of starting another fetch. The
//! pass clears the handle itself once it finishes, so the next call after
//! completion always fetches fresh data. Dropping a waiting caller does not
//! cancel the pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::future::{join_all, Shared};
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use upwatch_core::config::StatusConfig;
use upwatch_core::{
    epoch_millis, EndpointConfig, EndpointId, EvidenceSource, ManualTestRecord,
    RecentRequestSample, Status, StatusRecord,
};
use upwatch_state::{StateResult, StateStore};

use crate::cache::{StatusCache, StatusSnapshot};
use crate::error::RefreshError;
use crate::rules::{resolve, Evidence, Policy};
use crate::source::{BoxFuture, StatusSource};

/// Wall-clock source in epoch millis. Injected so tests can pin time.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshReport>>;

/// Outcome of [`StatusEngine::refresh`].
///
/// `statuses` is always a complete snapshot: the freshly installed one on
/// success, or the untouched previous one when the pass failed.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub statuses: StatusSnapshot,
    pub error: Option<Arc<RefreshError>>,
}

impl RefreshReport {
    /// Whether this pass replaced the cache.
    pub fn is_updated(&self) -> bool {
        self.error.is_none()
    }
}

struct EngineInner {
    source: Arc<dyn StatusSource>,
    store: StateStore,
    cache: StatusCache,
    settings: StatusConfig,
    clock: Clock,
    /// Pass number and shared result of the refresh currently running.
    in_flight: Mutex<Option<(u64, SharedRefresh)>>,
    passes: AtomicU64,
    /// Manual results written to the cache, stamped with the latest pass
    /// started at the time. A pass re-applies entries stamped with its own
    /// number, since it may have read the store before they were written.
    recorded: Mutex<HashMap<EndpointId, (u64, StatusRecord)>>,
}

/// Resolves and serves one status per endpoint.
///
/// Cheap to clone; clones share the cache and the in-flight refresh.
#[derive(Clone)]
pub struct StatusEngine {
    inner: Arc<EngineInner>,
}

impl StatusEngine {
    /// Create an engine with an empty cache, reading time from the system clock.
    pub fn new(source: Arc<dyn StatusSource>, store: StateStore, settings: StatusConfig) -> Self {
        Self::with_clock(source, store, settings, Arc::new(epoch_millis))
    }

    /// Create an engine with an explicit clock.
    pub fn with_clock(
        source: Arc<dyn StatusSource>,
        store: StateStore,
        settings: StatusConfig,
        clock: Clock,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                source,
                store,
                cache: StatusCache::new(),
                settings,
                clock,
                in_flight: Mutex::new(None),
                passes: AtomicU64::new(0),
                recorded: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Fetch, resolve, and install a fresh status for every endpoint.
    ///
    /// Joins the running pass if there is one. Never fails outright: a
    /// failed pass leaves the cache untouched and says why in the report.
    pub async fn refresh(&self) -> RefreshReport {
        self.join_or_start().await
    }

    fn join_or_start(&self) -> SharedRefresh {
        let mut slot = self.inner.in_flight.lock().expect("in-flight lock");
        if let Some((pass, pending)) = slot.as_ref() {
            debug!(pass, "joining in-flight refresh");
            return pending.clone();
        }

        let pass = self.inner.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let report = inner.run_pass(pass).await;
            inner.finish(pass);
            report
        });

        let inner = Arc::clone(&self.inner);
        let pending = async move {
            match task.await {
                Ok(report) => report,
                Err(e) => {
                    error!(pass, error = %e, "refresh task aborted");
                    inner.finish(pass);
                    RefreshReport {
                        statuses: inner.cache.get_all(),
                        error: Some(Arc::new(RefreshError::Aborted(e.to_string()))),
                    }
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some((pass, pending.clone()));
        debug!(pass, "refresh started");
        pending
    }

    /// The cached status for one endpoint, if it has ever been resolved.
    pub fn get_status(&self, endpoint_id: &str) -> Option<StatusRecord> {
        self.inner.cache.get(endpoint_id)
    }

    /// Snapshot of every cached status.
    pub fn get_all_statuses(&self) -> StatusSnapshot {
        self.inner.cache.get_all()
    }

    /// Record the outcome of a user-triggered test.
    ///
    /// The result is persisted to the side store and written straight into
    /// the cache entry for `endpoint_id`, so it shows up without a refresh.
    /// An endpoint currently resolved as disabled by configuration keeps
    /// that status. The cache is updated even if persisting fails; the
    /// persistence error is still returned.
    pub fn record_manual_test(
        &self,
        endpoint_id: &str,
        success: bool,
        latency_ms: Option<u64>,
        error_message: Option<String>,
    ) -> StateResult<StatusRecord> {
        let tested_at_ms = (self.inner.clock)();
        let persisted = self
            .inner
            .store
            .record_manual_test(endpoint_id, success, tested_at_ms);
        if let Err(e) = &persisted {
            warn!(%endpoint_id, error = %e, "failed to persist manual test");
        }

        // Held across the cache write so a finishing pass cannot slip in between.
        let mut recorded = self.inner.recorded.lock().expect("recorded manual tests lock");
        let record = match self.inner.cache.get(endpoint_id) {
            Some(current) if is_config_disabled(&current) => {
                debug!(%endpoint_id, "endpoint disabled, manual test not shown");
                current
            }
            _ => {
                let record = StatusRecord {
                    status: Status::from_success(success),
                    source: EvidenceSource::ManualTest,
                    observed_at_ms: Some(tested_at_ms),
                    latency_ms,
                    error_message,
                };
                self.inner.cache.set(endpoint_id, record.clone());
                let pass = self.inner.passes.load(Ordering::SeqCst);
                recorded.insert(endpoint_id.to_string(), (pass, record.clone()));
                record
            }
        };
        drop(recorded);

        info!(%endpoint_id, success, ?latency_ms, "manual test recorded");
        persisted.map(|()| record)
    }

    /// Number of refresh passes started so far.
    pub fn refresh_passes(&self) -> u64 {
        self.inner.passes.load(Ordering::SeqCst)
    }

    /// Whether a refresh pass is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().expect("in-flight lock").is_some()
    }

    /// Refresh on a fixed interval until the shutdown signal fires.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = interval.as_millis() as u64,
            "status refresh loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let report = self.refresh().await;
                    if let Some(e) = &report.error {
                        warn!(error = %e, "scheduled refresh kept previous statuses");
                    }
                }
                _ = shutdown.changed() => {
                    info!("status refresh loop shutting down");
                    break;
                }
            }
        }
    }
}

fn is_config_disabled(record: &StatusRecord) -> bool {
    record.status == Status::Disabled && record.source == EvidenceSource::Config
}

impl EngineInner {
    async fn run_pass(&self, pass: u64) -> RefreshReport {
        let started = Instant::now();
        match self.resolve_all().await {
            Ok(records) => {
                let statuses = self.install(pass, records);
                info!(
                    pass,
                    endpoints = statuses.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "status refresh complete"
                );
                RefreshReport {
                    statuses,
                    error: None,
                }
            }
            Err(e) => {
                error!(pass, error = %e, "status refresh failed, keeping previous statuses");
                RefreshReport {
                    statuses: self.cache.get_all(),
                    error: Some(Arc::new(e)),
                }
            }
        }
    }

    /// Swap in a pass's records, keeping manual results recorded while it ran.
    fn install(&self, pass: u64, mut records: HashMap<EndpointId, StatusRecord>) -> StatusSnapshot {
        let mut recorded = self.recorded.lock().expect("recorded manual tests lock");
        for (endpoint_id, (stamp, manual)) in recorded.drain() {
            if stamp < pass {
                continue;
            }
            if let Some(current) = records.get_mut(&endpoint_id) {
                if !is_config_disabled(current) {
                    debug!(pass, %endpoint_id, "keeping manual test recorded during refresh");
                    *current = manual;
                }
            }
        }
        self.cache.replace_all(records)
    }

    /// Clear the in-flight slot if it still belongs to `pass`.
    fn finish(&self, pass: u64) {
        let mut slot = self.in_flight.lock().expect("in-flight lock");
        if matches!(slot.as_ref(), Some((current, _)) if *current == pass) {
            *slot = None;
        }
    }

    async fn resolve_all(&self) -> Result<HashMap<EndpointId, StatusRecord>, RefreshError> {
        let (config, health_checks) = tokio::join!(
            self.source.fetch_config(),
            self.source.fetch_health_checks()
        );
        let config = config.map_err(RefreshError::Config)?;
        let health_checks = health_checks.map_err(RefreshError::HealthChecks)?;

        let interval_secs = config
            .health_check_interval_secs
            .filter(|&secs| secs > 0)
            .unwrap_or(self.settings.default_health_check_interval_secs);
        let policy = Policy::new(
            interval_secs,
            self.settings.manual_test_window_secs,
            self.settings.recent_request_limit,
        );

        // Read before the history fetch; results recorded after this point
        // are picked up again in `install`.
        let manual_tests: Vec<Option<ManualTestRecord>> = config
            .endpoints
            .iter()
            .map(|endpoint| self.manual_test(&endpoint.id))
            .collect();

        let histories = join_all(
            config
                .endpoints
                .iter()
                .map(|endpoint| self.recent_requests(endpoint, policy.recent_sample_size)),
        )
        .await;

        let now_ms = (self.clock)();
        let mut records = HashMap::with_capacity(config.endpoints.len());
        for ((endpoint, recent), manual) in config.endpoints.iter().zip(histories).zip(manual_tests) {
            let evidence = Evidence {
                endpoint,
                recent: &recent,
                health: health_checks.get(&endpoint.id),
                manual: manual.as_ref(),
            };
            let record = resolve(&evidence, &policy, now_ms);
            debug!(
                endpoint_id = %endpoint.id,
                status = %record.status,
                source = %record.source,
                "endpoint resolved"
            );
            records.insert(endpoint.id.clone(), record);
        }
        Ok(records)
    }

    /// Recent request history, or nothing if the lookup failed.
    async fn recent_requests(
        &self,
        endpoint: &EndpointConfig,
        limit: usize,
    ) -> Vec<RecentRequestSample> {
        // Disabled endpoints resolve without traffic evidence.
        if endpoint.is_disabled() || limit == 0 {
            return Vec::new();
        }
        match self
            .source
            .fetch_recent_requests(&endpoint.id, &endpoint.client_type, limit)
            .await
        {
            Ok(mut samples) => {
                samples.truncate(limit);
                samples
            }
            Err(e) => {
                warn!(endpoint_id = %endpoint.id, error = %e, "recent request lookup failed, skipping traffic evidence");
                Vec::new()
            }
        }
    }

    fn manual_test(&self, endpoint_id: &str) -> Option<ManualTestRecord> {
        match self.store.get_manual_test(endpoint_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(%endpoint_id, error = %e, "manual test lookup failed");
                None
            }
        }
    }
}
