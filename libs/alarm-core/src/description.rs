//! Alarm Description Builder
//!
//! Renders operator-facing alarm messages. Analog messages are phrased per
//! description category; digital messages report the ON/OFF state.

use crate::catalog::{DescriptionCategory, TagInfo, Threshold};
use crate::types::{format_value, format_with_unit, Severity, TagKind};

/// Build the message for a tag at the given severity. Never fails: missing
/// metadata or thresholds fall back to the DEFAULT phrasing.
pub fn describe(
    tag_id: &str,
    value: f64,
    severity: Severity,
    kind: TagKind,
    tag: Option<&TagInfo>,
) -> String {
    let name = tag
        .map(|t| t.description.as_str())
        .filter(|d| !d.is_empty())
        .unwrap_or(tag_id);

    if kind.is_digital() {
        return format!(
            "{} alarm triggered on {}. Current state: {}. Immediate attention required.",
            kind.label(),
            name,
            format_value(value, kind, "")
        );
    }

    let threshold = tag.and_then(|t| t.threshold.as_ref());
    let unit = threshold
        .map(|t| t.unit.as_str())
        .or_else(|| tag.map(|t| t.unit.as_str()))
        .unwrap_or("");
    let reading = format_with_unit(value, unit);
    let category = tag
        .map(TagInfo::category)
        .unwrap_or(DescriptionCategory::Default);

    match (category, threshold) {
        (DescriptionCategory::Temperature, Some(t)) => temperature(name, &reading, severity, t),
        (DescriptionCategory::Pressure, Some(t)) => pressure(name, &reading, severity, t),
        _ => default(name, &reading, severity),
    }
}

fn temperature(name: &str, reading: &str, severity: Severity, t: &Threshold) -> String {
    match severity {
        Severity::Critical => format!(
            "{} temperature is critically high at {}. Maximum limit is {}. Immediate action required.",
            name, reading, t.critical
        ),
        Severity::Moderate => format!(
            "{} temperature is above normal at {}. Warning limit is {}. Monitor closely.",
            name, reading, t.moderate
        ),
        Severity::Healthy => format!("{} temperature is normal at {}.", name, reading),
    }
}

fn pressure(name: &str, reading: &str, severity: Severity, t: &Threshold) -> String {
    match severity {
        Severity::Critical => format!(
            "{} pressure has exceeded the critical limit at {}. Safe limit is {}. Immediate intervention required.",
            name, reading, t.critical
        ),
        Severity::Moderate => format!(
            "{} pressure is approaching unsafe levels at {}. Warning limit is {}.",
            name, reading, t.moderate
        ),
        Severity::Healthy => format!(
            "{} pressure is within safe operating range at {}.",
            name, reading
        ),
    }
}

fn default(name: &str, reading: &str, severity: Severity) -> String {
    match severity {
        Severity::Critical => format!(
            "{} value is critically abnormal at {}. Immediate attention required.",
            name, reading
        ),
        Severity::Moderate => format!("{} value is outside normal range at {}.", name, reading),
        Severity::Healthy => format!("{} value is normal at {}.", name, reading),
    }
}
