//! Alarm Lifecycle Tracker
//!
//! Holds at most one active alarm per tag id and advances it on every
//! evaluation cycle:
//!
//! ```text
//! Absent --(MODERATE|CRITICAL)--> Active(p)
//! Active(p) --(same p)--> Active(p)        refresh value/time only
//! Active(p) --(other p)--> Active(p')      new alarm, old one superseded
//! Active(p) --(HEALTHY | clear)--> Absent  resolved, moved to history
//! ```
//!
//! The tracker performs no I/O. Callers persist the alarms returned by
//! [`AlarmTracker::evaluate_cycle`] and the closures handed out by
//! [`AlarmTracker::drain_closed`]. It takes `&mut self` everywhere it
//! mutates, so cycles are serialized by whatever lock owns it.

use crate::catalog::ThresholdCatalog;
use crate::classifier::classify;
use crate::description::describe;
use crate::types::{
    format_value, generate_alarm_id, Alarm, AlarmPriority, AlarmStatistics, AlarmStatus, Reading,
};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolved alarms kept in memory
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct AlarmTracker {
    catalog: Arc<ThresholdCatalog>,
    /// Keyed by tag id, not alarm id
    active: FxHashMap<String, Alarm>,
    history: VecDeque<Alarm>,
    history_capacity: usize,
    /// Alarms that left the active map by evaluation, awaiting persistence
    closed: Vec<Alarm>,
    total_alarms: u64,
    total_resolved: u64,
}

impl AlarmTracker {
    pub fn new(catalog: Arc<ThresholdCatalog>) -> Self {
        Self::with_history_capacity(catalog, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(catalog: Arc<ThresholdCatalog>, history_capacity: usize) -> Self {
        Self {
            catalog,
            active: FxHashMap::default(),
            history: VecDeque::new(),
            history_capacity,
            closed: Vec::new(),
            total_alarms: 0,
            total_resolved: 0,
        }
    }

    pub fn catalog(&self) -> &Arc<ThresholdCatalog> {
        &self.catalog
    }

    /// Swap the catalog. Active alarms are kept and re-evaluated on the
    /// next reading of their tag.
    pub fn set_catalog(&mut self, catalog: Arc<ThresholdCatalog>) {
        info!("Alarm tracker catalog replaced ({} tags)", catalog.len());
        self.catalog = catalog;
    }

    /// Evaluate one batch of readings taken at `at`.
    ///
    /// Returns the newly triggered alarms in input order.
    pub fn evaluate_cycle(&mut self, readings: &[Reading], at: DateTime<Utc>) -> Vec<Alarm> {
        let triggered: Vec<Alarm> = readings
            .iter()
            .filter_map(|reading| self.evaluate_tag(reading, at))
            .collect();

        debug!(
            "Evaluated {} readings: {} triggered, {} active",
            readings.len(),
            triggered.len(),
            self.active.len()
        );
        triggered
    }

    /// Evaluate a single reading. Returns the alarm if one was triggered.
    pub fn evaluate_tag(&mut self, reading: &Reading, at: DateTime<Utc>) -> Option<Alarm> {
        let severity = classify(&self.catalog, &reading.tag_id, reading.value, reading.kind);

        let Ok(priority) = AlarmPriority::try_from(severity) else {
            self.resolve_healthy(&reading.tag_id, at);
            return None;
        };

        let triggered_value = self.triggered_value(reading);
        if let Some(existing) = self.active.get_mut(&reading.tag_id) {
            if existing.priority == priority {
                existing.triggered_value = triggered_value;
                existing.triggered_at = at;
                return None;
            }
        }

        let tag = self.catalog.get(&reading.tag_id);
        let alarm = Alarm {
            id: generate_alarm_id(),
            tag_id: reading.tag_id.clone(),
            tag_type: reading.kind,
            priority,
            description: describe(&reading.tag_id, reading.value, severity, reading.kind, tag),
            triggered_value,
            triggered_at: at,
            acknowledged_at: None,
            resolved_at: None,
            status: AlarmStatus::Active,
            superseded_by: None,
        };

        if let Some(mut previous) = self.active.insert(reading.tag_id.clone(), alarm.clone()) {
            debug!(
                "Alarm {} on {} superseded by {} ({} -> {})",
                previous.id, previous.tag_id, alarm.id, previous.priority, alarm.priority
            );
            previous.status = AlarmStatus::Resolved;
            previous.resolved_at = Some(at);
            previous.superseded_by = Some(alarm.id.clone());
            self.closed.push(previous);
        }

        self.total_alarms += 1;
        info!(
            "Alarm {} triggered: {} {} at {}",
            alarm.id, alarm.tag_id, alarm.priority, alarm.triggered_value
        );
        Some(alarm)
    }

    fn triggered_value(&self, reading: &Reading) -> String {
        let unit = self
            .catalog
            .get(&reading.tag_id)
            .map(|t| {
                t.threshold
                    .as_ref()
                    .map(|th| th.unit.as_str())
                    .unwrap_or(t.unit.as_str())
            })
            .unwrap_or("");
        format_value(reading.value, reading.kind, unit)
    }

    fn resolve_healthy(&mut self, tag_id: &str, at: DateTime<Utc>) {
        if let Some(alarm) = self.take_resolved(tag_id, at) {
            info!("Alarm {} on {} resolved", alarm.id, alarm.tag_id);
            self.closed.push(alarm);
        }
    }

    fn take_resolved(&mut self, tag_id: &str, at: DateTime<Utc>) -> Option<Alarm> {
        let mut alarm = self.active.remove(tag_id)?;
        alarm.status = AlarmStatus::Resolved;
        alarm.resolved_at = Some(at);
        self.total_resolved += 1;

        self.history.push_back(alarm.clone());
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
        Some(alarm)
    }

    /// Resolve the tag's active alarm from outside the evaluation loop.
    ///
    /// The returned record is not queued in [`Self::drain_closed`]; the
    /// caller already owns its persistence.
    pub fn clear(&mut self, tag_id: &str, at: DateTime<Utc>) -> Option<Alarm> {
        let alarm = self.take_resolved(tag_id, at)?;
        info!("Alarm {} on {} cleared", alarm.id, alarm.tag_id);
        Some(alarm)
    }

    /// [`Self::clear`] by alarm id. None if the alarm is no longer active.
    pub fn resolve_alarm(&mut self, alarm_id: &str, at: DateTime<Utc>) -> Option<Alarm> {
        let tag_id = self
            .active
            .values()
            .find(|a| a.id == alarm_id)
            .map(|a| a.tag_id.clone())?;
        self.clear(&tag_id, at)
    }

    /// Record an acknowledgement on an active alarm. The first
    /// acknowledgement time is kept. Returns false if the alarm is not active.
    pub fn acknowledge(&mut self, alarm_id: &str, at: DateTime<Utc>) -> bool {
        match self.active.values_mut().find(|a| a.id == alarm_id) {
            Some(alarm) => {
                alarm.acknowledged_at.get_or_insert(at);
                true
            },
            None => false,
        }
    }

    pub fn active_alarm(&self, tag_id: &str) -> Option<&Alarm> {
        self.active.get(tag_id)
    }

    /// Active alarm by alarm id
    pub fn find_active(&self, alarm_id: &str) -> Option<&Alarm> {
        self.active.values().find(|a| a.id == alarm_id)
    }

    /// Snapshot of active alarms, unordered
    pub fn active_alarms(&self) -> Vec<Alarm> {
        self.active.values().cloned().collect()
    }

    /// Resolved alarms, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Alarm> {
        self.history.iter()
    }

    pub fn statistics(&self) -> AlarmStatistics {
        let critical_count = self
            .active
            .values()
            .filter(|a| a.priority == AlarmPriority::Critical)
            .count();
        let warning_count = self
            .active
            .values()
            .filter(|a| a.priority == AlarmPriority::Moderate)
            .count();

        AlarmStatistics {
            total_alarms: self.total_alarms,
            total_resolved: self.total_resolved,
            active_alarm_count: self.active.len(),
            critical_count,
            warning_count,
        }
    }

    /// Take the alarms resolved or superseded by evaluation since the last
    /// call, in the order they closed.
    pub fn drain_closed(&mut self) -> Vec<Alarm> {
        std::mem::take(&mut self.closed)
    }
}
