//! Publisher - periodic reading/evaluation cycle
//!
//! Each tick pulls a batch from the reading source, runs it through the
//! alarm tracker, then persists readings, closed alarms and new alarms.
//! Persistence failures are logged per record and never abort the cycle.

use crate::simulator::ReadingSource;
use crate::store::insert_readings;
use alarm_core::{classify, AlarmStore, AlarmTracker};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Tracker handle shared between the publisher and the API
pub type SharedTracker = Arc<Mutex<AlarmTracker>>;

/// Counters exposed on the status endpoint
#[derive(Debug, Default)]
pub struct PublisherStats {
    cycles: AtomicU64,
    readings: AtomicU64,
    alarms_persisted: AtomicU64,
    persist_failures: AtomicU64,
    last_cycle_ms: AtomicI64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherStatsSnapshot {
    pub cycles: u64,
    pub readings: u64,
    pub alarms_persisted: u64,
    pub persist_failures: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

impl PublisherStats {
    pub fn snapshot(&self) -> PublisherStatsSnapshot {
        let last = self.last_cycle_ms.load(Ordering::Relaxed);
        PublisherStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            readings: self.readings.load(Ordering::Relaxed),
            alarms_persisted: self.alarms_persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            last_cycle_at: (last > 0)
                .then(|| DateTime::from_timestamp_millis(last))
                .flatten(),
        }
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub readings: usize,
    pub triggered: usize,
    pub closed: usize,
    pub failures: usize,
}

pub struct Publisher {
    pool: SqlitePool,
    store: Arc<dyn AlarmStore>,
    tracker: SharedTracker,
    source: Mutex<Box<dyn ReadingSource>>,
    interval: Duration,
    stats: Arc<PublisherStats>,
    shutdown: Notify,
    running: AtomicBool,
}

impl Publisher {
    pub fn new(
        pool: SqlitePool,
        store: Arc<dyn AlarmStore>,
        tracker: SharedTracker,
        source: Box<dyn ReadingSource>,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            store,
            tracker,
            source: Mutex::new(source),
            interval,
            stats: Arc::new(PublisherStats::default()),
            shutdown: Notify::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn stats(&self) -> Arc<PublisherStats> {
        Arc::clone(&self.stats)
    }

    /// Run cycles until [`Publisher::stop`] is called
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            warn!("Publisher already running");
            return;
        }

        info!("Starting publisher with {:?} interval", self.interval);
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
                _ = self.shutdown.notified() => {
                    info!("Publisher received shutdown signal");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        info!("Publisher stopped");
    }

    pub fn stop(&self) {
        info!("Stopping publisher...");
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// One full cycle at timestamp `at`
    pub async fn run_cycle(&self, at: DateTime<Utc>) -> CycleReport {
        let batch = self.source.lock().await.next_batch(at);

        let (classified, triggered, closed, stats) = {
            let mut tracker = self.tracker.lock().await;
            let classified: Vec<_> = batch
                .iter()
                .map(|r| {
                    let status = classify(tracker.catalog(), &r.tag_id, r.value, r.kind);
                    (r.clone(), status)
                })
                .collect();
            let triggered = tracker.evaluate_cycle(&batch, at);
            let closed = tracker.drain_closed();
            (classified, triggered, closed, tracker.statistics())
        };

        let mut report = CycleReport {
            readings: batch.len(),
            triggered: triggered.len(),
            closed: closed.len(),
            failures: 0,
        };

        if let Err(e) = insert_readings(&self.pool, &classified).await {
            error!("Failed to persist {} readings: {}", classified.len(), e);
            report.failures += 1;
        }

        // Closures first: a superseded alarm predates its replacement
        for alarm in &closed {
            match self.store.close_alarm(alarm).await {
                Ok(()) => debug!("Closed alarm {} persisted", alarm.id),
                Err(e) => {
                    error!("Failed to persist closure of alarm {}: {}", alarm.id, e);
                    report.failures += 1;
                },
            }
        }

        let mut persisted = 0u64;
        for alarm in &triggered {
            // Duplicate readings in one batch can trigger and close the same alarm
            if closed.iter().any(|c| c.id == alarm.id) {
                continue;
            }
            match self.store.insert_alarm(alarm).await {
                Ok(()) => persisted += 1,
                Err(e) => {
                    error!("Failed to persist alarm {} ({}): {}", alarm.id, alarm.tag_id, e);
                    report.failures += 1;
                },
            }
        }

        self.stats.cycles.fetch_add(1, Ordering::Relaxed);
        self.stats
            .readings
            .fetch_add(report.readings as u64, Ordering::Relaxed);
        self.stats
            .alarms_persisted
            .fetch_add(persisted, Ordering::Relaxed);
        self.stats
            .persist_failures
            .fetch_add(report.failures as u64, Ordering::Relaxed);
        self.stats
            .last_cycle_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);

        info!(
            "Cycle done: {} readings, {} new alarms, {} closed, {} active ({} critical, {} moderate), {} total / {} resolved",
            report.readings,
            report.triggered,
            report.closed,
            stats.active_alarm_count,
            stats.critical_count,
            stats.warning_count,
            stats.total_alarms,
            stats.total_resolved
        );
        report
    }
}
