//! Periodic eviction of expired ticket trees.
//!
//! Expiry is evaluated lazily on every read, so expired tickets linger in
//! the registry until something removes them. The [`RegistryCleaner`] is
//! that something: a sweep that re-evaluates every ticket's policy and
//! cascade-deletes the expired ones, including the service and
//! proxy-granting tickets recorded under an expired TGT (fan-out logout).
//!
//! A sweep is safe to run concurrently with request traffic: a caller whose
//! ticket is evicted between its `get_ticket` and its next registry
//! operation sees an ordinary not-found failure, never a crash. Sweeps are
//! idempotent — a second pass with no new traffic removes nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, RegistryResult};
use crate::registry::TicketRegistry;

/// Default sweep interval.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);

/// Default delay before the first sweep.
const DEFAULT_START_DELAY: Duration = Duration::from_secs(20);

/// Minimum allowed sweep interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the background cleaner.
///
/// # Validation
///
/// - `interval` must be >= 1 second
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use gatekey_registry::CleanerConfig;
///
/// let config = CleanerConfig::builder()
///     .interval(Duration::from_secs(60))
///     .start_delay(Duration::ZERO)
///     .build()
///     .expect("valid config");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanerConfig {
    /// Time between sweeps.
    #[serde(with = "humantime_serde", default = "default_interval")]
    interval: Duration,

    /// Delay before the first sweep after spawn.
    #[serde(with = "humantime_serde", default = "default_start_delay")]
    start_delay: Duration,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_start_delay() -> Duration {
    DEFAULT_START_DELAY
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_INTERVAL, start_delay: DEFAULT_START_DELAY }
    }
}

impl CleanerConfig {
    /// Creates a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> CleanerConfigBuilder {
        CleanerConfigBuilder { interval: DEFAULT_INTERVAL, start_delay: DEFAULT_START_DELAY }
    }

    /// Time between sweeps.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Delay before the first sweep.
    #[must_use]
    pub fn start_delay(&self) -> Duration {
        self.start_delay
    }
}

/// Builder for [`CleanerConfig`].
#[derive(Debug)]
pub struct CleanerConfigBuilder {
    interval: Duration,
    start_delay: Duration,
}

impl CleanerConfigBuilder {
    /// Sets the time between sweeps.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the delay before the first sweep.
    #[must_use]
    pub fn start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    /// Builds the [`CleanerConfig`], validating all fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `interval` is less than 1 second.
    pub fn build(self) -> Result<CleanerConfig, ConfigError> {
        if self.interval < MIN_INTERVAL {
            return Err(ConfigError::BelowMinimum {
                field: "interval",
                value: format!("{}ms", self.interval.as_millis()),
                min: "1s".to_owned(),
            });
        }
        Ok(CleanerConfig { interval: self.interval, start_delay: self.start_delay })
    }
}

/// Counters from one cleaner pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanSweep {
    /// Tickets inspected in this pass.
    pub examined: usize,
    /// Tickets actually removed (cascade targets included).
    pub removed: usize,
}

/// Sweeps expired tickets out of a registry.
#[derive(Debug, Clone)]
pub struct RegistryCleaner<R> {
    registry: R,
}

impl<R: TicketRegistry> RegistryCleaner<R> {
    /// Creates a cleaner over the given registry.
    #[must_use]
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Runs a single sweep.
    ///
    /// Every ticket in the registry snapshot whose policy now evaluates to
    /// expired is removed via the cascading
    /// [`delete_ticket`](TicketRegistry::delete_ticket). A failure to
    /// delete one ticket is logged and the sweep continues — one bad entry
    /// never halts the pass.
    ///
    /// # Errors
    ///
    /// Only a failure to obtain the snapshot itself aborts the sweep.
    pub async fn clean(&self) -> RegistryResult<CleanSweep> {
        let snapshot = self.registry.tickets().await?;
        let mut sweep = CleanSweep { examined: snapshot.len(), removed: 0 };

        for ticket in snapshot {
            if !ticket.is_expired() {
                continue;
            }
            debug!(ticket = %ticket.id(), "cleaning up expired ticket");
            match self.registry.delete_ticket(ticket.id()).await {
                Ok(true) => sweep.removed += 1,
                // Already gone: removed by a cascade earlier in this pass,
                // by a concurrent request, or by another node's cleaner.
                Ok(false) => {}
                Err(err) => {
                    warn!(ticket = %ticket.id(), error = %err, "failed to clean up ticket, continuing");
                }
            }
        }

        debug!(examined = sweep.examined, removed = sweep.removed, "cleaner pass finished");
        Ok(sweep)
    }

    /// Starts a background task sweeping every `config.interval`, after an
    /// initial `config.start_delay`.
    ///
    /// The task stops when the returned [`CleanerHandle`] is shut down or
    /// dropped. Snapshot failures are logged and the task keeps its
    /// schedule.
    pub fn spawn(self, config: CleanerConfig) -> CleanerHandle
    where
        R: 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        info!(
            interval_secs = config.interval().as_secs(),
            "starting ticket registry cleaner"
        );

        tokio::spawn(async move {
            tokio::select! {
                () = sleep(config.start_delay()) => {}
                _ = shutdown_rx.changed() => return,
            }
            loop {
                if let Err(err) = self.clean().await {
                    warn!(error = %err, "cleaner pass failed");
                }
                tokio::select! {
                    () = sleep(config.interval()) => {}
                    _ = shutdown_rx.changed() => return,
                }
            }
        });

        CleanerHandle { shutdown_tx }
    }
}

/// Handle to a running background cleaner.
///
/// Dropping the handle closes the shutdown channel, which stops the task;
/// [`shutdown`](Self::shutdown) does the same explicitly for deterministic
/// test teardown.
#[derive(Debug)]
pub struct CleanerHandle {
    shutdown_tx: watch::Sender<()>,
}

impl CleanerHandle {
    /// Signals the background task to stop. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Utc;
    use gatekey_ticket::{
        Authentication, ExpirationPolicy, Principal, TicketGrantingTicket, TicketIdGenerator,
        TicketKind,
    };

    use super::*;
    use crate::memory::InMemoryTicketRegistry;

    fn tgt_with(generator: &TicketIdGenerator, policy: ExpirationPolicy) -> TicketGrantingTicket {
        TicketGrantingTicket::new(
            generator.new_id(TicketKind::TicketGranting),
            Authentication::new(Principal::new("alice"), Utc::now()),
            policy,
            Utc::now(),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = CleanerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(120));
        assert_eq!(config.start_delay(), Duration::from_secs(20));
    }

    #[test]
    fn test_config_rejects_subsecond_interval() {
        let result = CleanerConfig::builder().interval(Duration::from_millis(500)).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_zero_start_delay_is_valid() {
        let config = CleanerConfig::builder()
            .interval(Duration::from_secs(1))
            .start_delay(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(config.start_delay(), Duration::ZERO);
    }

    #[test]
    fn test_config_deserializes_humantime() {
        let config: CleanerConfig =
            serde_json::from_str(r#"{"interval": "2m", "start_delay": "5s"}"#).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(120));
        assert_eq!(config.start_delay(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_clean_removes_only_expired() {
        let registry = InMemoryTicketRegistry::new();
        let generator = TicketIdGenerator::new();

        let live = tgt_with(&generator, ExpirationPolicy::Never);
        let live_id = live.id().clone();
        let dead = tgt_with(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO });
        let dead_id = dead.id().clone();

        registry.add_ticket(live.into()).await.unwrap();
        registry.add_ticket(dead.into()).await.unwrap();

        let cleaner = RegistryCleaner::new(registry.clone());
        let sweep = cleaner.clean().await.unwrap();

        assert_eq!(sweep.examined, 2);
        assert_eq!(sweep.removed, 1);
        assert!(registry.get_ticket(&live_id).await.unwrap().is_some());
        assert!(registry.get_ticket(&dead_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clean_is_idempotent() {
        let registry = InMemoryTicketRegistry::new();
        let generator = TicketIdGenerator::new();
        registry
            .add_ticket(tgt_with(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO }).into())
            .await
            .unwrap();

        let cleaner = RegistryCleaner::new(registry.clone());
        let first = cleaner.clean().await.unwrap();
        let second = cleaner.clean().await.unwrap();

        assert_eq!(first.removed, 1);
        assert_eq!(second.removed, 0, "second pass with no new traffic removes nothing");
        assert_eq!(second.examined, 0);
    }

    #[tokio::test]
    async fn test_clean_cascades_through_expired_session() {
        let registry = InMemoryTicketRegistry::new();
        let generator = TicketIdGenerator::new();

        // A TGT that expires immediately, with a long-lived ST under it.
        let mut tgt = tgt_with(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO });
        let st = tgt
            .grant_service_ticket(
                generator.new_id(TicketKind::Service),
                gatekey_ticket::Service::new("https://app.example.org/"),
                ExpirationPolicy::Never,
                false,
                Utc::now(),
            )
            .unwrap();
        let st_id = st.id().clone();

        registry.add_ticket(tgt.into()).await.unwrap();
        registry.add_ticket(st.into()).await.unwrap();

        let sweep = RegistryCleaner::new(registry.clone()).clean().await.unwrap();
        assert_eq!(sweep.removed, 1, "one root removal, cascade included");
        assert!(
            registry.get_ticket(&st_id).await.unwrap().is_none(),
            "child must go with its expired session root"
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_cleaner_sweeps_in_background() {
        let registry = InMemoryTicketRegistry::new();
        let generator = TicketIdGenerator::new();
        registry
            .add_ticket(tgt_with(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO }).into())
            .await
            .unwrap();

        let config = CleanerConfig::builder()
            .interval(Duration::from_secs(1))
            .start_delay(Duration::ZERO)
            .build()
            .unwrap();
        let handle = RegistryCleaner::new(registry.clone()).spawn(config);

        // First sweep fires right after the zero start delay.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(registry.is_empty(), "background sweep should have evicted the ticket");

        handle.shutdown();

        // After shutdown, new expired tickets are left alone.
        registry
            .add_ticket(tgt_with(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO }).into())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(registry.len(), 1, "no sweeps may run after shutdown");
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_cleaner() {
        let registry = InMemoryTicketRegistry::new();
        let config = CleanerConfig::builder()
            .interval(Duration::from_secs(1))
            .start_delay(Duration::ZERO)
            .build()
            .unwrap();
        let handle = RegistryCleaner::new(registry.clone()).spawn(config);
        drop(handle);

        let generator = TicketIdGenerator::new();
        registry
            .add_ticket(
                tgt_with(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO }).into(),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(registry.len(), 1, "task must exit when the handle is dropped");
    }

    #[tokio::test]
    async fn test_sweep_counter_equality() {
        let sweep = CleanSweep { examined: 3, removed: 2 };
        assert_eq!(sweep, CleanSweep { examined: 3, removed: 2 });
        assert_eq!(CleanSweep::default(), CleanSweep { examined: 0, removed: 0 });
    }
}
