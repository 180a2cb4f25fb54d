//! Core alarm data types

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of monitored point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagKind {
    DigitalInput,
    DigitalOutput,
    AnalogInput,
    AnalogOutput,
}

impl TagKind {
    /// All kinds in catalog iteration order
    pub const ALL: [TagKind; 4] = [
        TagKind::DigitalInput,
        TagKind::DigitalOutput,
        TagKind::AnalogInput,
        TagKind::AnalogOutput,
    ];

    pub fn is_digital(self) -> bool {
        matches!(self, TagKind::DigitalInput | TagKind::DigitalOutput)
    }

    /// Human-readable label used in alarm messages
    pub fn label(self) -> &'static str {
        match self {
            TagKind::DigitalInput => "Digital Input",
            TagKind::DigitalOutput => "Digital Output",
            TagKind::AnalogInput => "Analog Input",
            TagKind::AnalogOutput => "Analog Output",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::DigitalInput => "DIGITAL_INPUT",
            TagKind::DigitalOutput => "DIGITAL_OUTPUT",
            TagKind::AnalogInput => "ANALOG_INPUT",
            TagKind::AnalogOutput => "ANALOG_OUTPUT",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIGITAL_INPUT" => Ok(TagKind::DigitalInput),
            "DIGITAL_OUTPUT" => Ok(TagKind::DigitalOutput),
            "ANALOG_INPUT" => Ok(TagKind::AnalogInput),
            "ANALOG_OUTPUT" => Ok(TagKind::AnalogOutput),
            other => Err(format!("unknown tag kind: {}", other)),
        }
    }
}

/// Severity level produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Healthy,
    Moderate,
    Critical,
}

impl Severity {
    /// Display rank, most severe first
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::Moderate => 2,
            Severity::Healthy => 3,
        }
    }

    /// Dashboard color
    pub fn color(self) -> &'static str {
        match self {
            Severity::Critical => "RED",
            Severity::Moderate => "YELLOW",
            Severity::Healthy => "GREEN",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Healthy => "HEALTHY",
            Severity::Moderate => "MODERATE",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HEALTHY" => Ok(Severity::Healthy),
            "MODERATE" => Ok(Severity::Moderate),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Priority of a persisted alarm. HEALTHY is never an alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmPriority {
    Critical,
    Moderate,
}

impl AlarmPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            AlarmPriority::Critical => "CRITICAL",
            AlarmPriority::Moderate => "MODERATE",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            AlarmPriority::Critical => Severity::Critical,
            AlarmPriority::Moderate => Severity::Moderate,
        }
    }
}

impl TryFrom<Severity> for AlarmPriority {
    type Error = Severity;

    fn try_from(severity: Severity) -> Result<Self, Self::Error> {
        match severity {
            Severity::Critical => Ok(AlarmPriority::Critical),
            Severity::Moderate => Ok(AlarmPriority::Moderate),
            Severity::Healthy => Err(severity),
        }
    }
}

impl fmt::Display for AlarmPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(AlarmPriority::Critical),
            "MODERATE" => Ok(AlarmPriority::Moderate),
            other => Err(format!("unknown alarm priority: {}", other)),
        }
    }
}

/// Alarm status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmStatus {
    Active,
    Resolved,
}

impl AlarmStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AlarmStatus::Active => "ACTIVE",
            AlarmStatus::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AlarmStatus::Active),
            "RESOLVED" => Ok(AlarmStatus::Resolved),
            other => Err(format!("unknown alarm status: {}", other)),
        }
    }
}

/// Point-in-time observation of a tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub tag_id: String,
    pub kind: TagKind,
    /// 0/1 for digital tags
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(
        tag_id: impl Into<String>,
        kind: TagKind,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            tag_id: tag_id.into(),
            kind,
            value,
            timestamp,
        }
    }

    pub fn digital(
        tag_id: impl Into<String>,
        kind: TagKind,
        on: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(tag_id, kind, if on { 1.0 } else { 0.0 }, timestamp)
    }

    /// Digital ON state
    pub fn is_on(&self) -> bool {
        is_on(self.value)
    }
}

pub(crate) fn is_on(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Alarm lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub tag_id: String,
    pub tag_type: TagKind,
    pub priority: AlarmPriority,
    pub description: String,
    /// Value with unit, e.g. "82 °C"
    pub triggered_value: String,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub status: AlarmStatus,
    /// Id of the alarm that replaced this one on a severity change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
}

impl Alarm {
    pub fn is_active(&self) -> bool {
        self.status == AlarmStatus::Active
    }
}

/// Tracker counters and active-alarm breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmStatistics {
    pub total_alarms: u64,
    pub total_resolved: u64,
    pub active_alarm_count: usize,
    pub critical_count: usize,
    pub warning_count: usize,
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Generate an alarm id: `ALM-<unix millis>-<9 base36 chars>`
pub fn generate_alarm_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("ALM-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Render a reading value for messages and `triggered_value`
pub fn format_value(value: f64, kind: TagKind, unit: &str) -> String {
    if kind.is_digital() {
        return if is_on(value) { "ON" } else { "OFF" }.to_string();
    }
    format_with_unit(value, unit)
}

pub(crate) fn format_with_unit(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{} {}", value, unit)
    }
}
