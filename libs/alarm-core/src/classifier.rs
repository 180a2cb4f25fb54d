//! Level Classifier

use crate::catalog::ThresholdCatalog;
use crate::types::{is_on, Severity, TagKind};

/// Classify a reading against the catalog.
///
/// Unknown tags (or analog tags without thresholds) are HEALTHY. Digital
/// tags are binary: ON is CRITICAL, OFF is HEALTHY. Analog boundaries are
/// inclusive and the critical boundary is checked first.
pub fn classify(catalog: &ThresholdCatalog, tag_id: &str, value: f64, kind: TagKind) -> Severity {
    let Some(threshold) = catalog.threshold(tag_id) else {
        return Severity::Healthy;
    };

    if kind.is_digital() {
        return if is_on(value) {
            Severity::Critical
        } else {
            Severity::Healthy
        };
    }

    if value >= threshold.critical {
        Severity::Critical
    } else if value >= threshold.moderate {
        Severity::Moderate
    } else {
        Severity::Healthy
    }
}
