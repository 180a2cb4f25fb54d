//! Threshold Catalog
//!
//! Static reference data for every monitored tag: kind, description, unit,
//! alarm thresholds, description category and (for analog tags) the
//! simulation profile. Lookups by tag id are O(1); iteration follows kind
//! order (DI, DO, AI, AO) and declaration order within a kind.

use crate::error::{CatalogError, Result};
use crate::types::TagKind;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-tag severity boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub moderate: f64,
    pub critical: f64,
    #[serde(default)]
    pub unit: String,
}

impl Threshold {
    /// Digital tags alarm on any ON state
    pub fn digital() -> Self {
        Self {
            moderate: 1.0,
            critical: 1.0,
            unit: String::new(),
        }
    }
}

/// Phrasing family for analog alarm messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DescriptionCategory {
    Temperature,
    Pressure,
    Default,
}

impl DescriptionCategory {
    /// Legacy inference from free-text description
    pub fn infer(description: &str) -> Self {
        let text = description.to_lowercase();
        if text.contains("temp") {
            DescriptionCategory::Temperature
        } else if text.contains("pressure") {
            DescriptionCategory::Pressure
        } else {
            DescriptionCategory::Default
        }
    }
}

/// Random-walk parameters for simulated analog readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    pub base_value: f64,
    pub volatility: f64,
    pub min_value: f64,
    pub max_value: f64,
}

/// Tag metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub tag_id: String,
    pub kind: TagKind,
    pub description: String,
    #[serde(default)]
    pub unit: String,
    /// Declared message category; inferred from the description when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<DescriptionCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationProfile>,
}

impl TagInfo {
    pub fn category(&self) -> DescriptionCategory {
        self.category
            .unwrap_or_else(|| DescriptionCategory::infer(&self.description))
    }
}

/// Catalog file layout
#[derive(Debug, Deserialize)]
struct CatalogFile {
    tags: Vec<TagInfo>,
}

/// Tag id -> metadata and thresholds
#[derive(Debug, Clone, Default)]
pub struct ThresholdCatalog {
    tags: Vec<TagInfo>,
    index: FxHashMap<String, usize>,
}

impl ThresholdCatalog {
    /// Build a catalog, validating ids and thresholds
    pub fn new(tags: Vec<TagInfo>) -> Result<Self> {
        let mut tags = tags;
        tags.sort_by_key(|t| kind_order(t.kind));

        let mut index = FxHashMap::default();
        for (pos, tag) in tags.iter_mut().enumerate() {
            if index.insert(tag.tag_id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateTag(tag.tag_id.clone()));
            }

            if tag.kind.is_digital() {
                tag.threshold = Some(Threshold::digital());
                tag.simulation = None;
                continue;
            }

            if let Some(threshold) = tag.threshold.as_mut() {
                // NaN boundaries fail this check too
                let ordered = threshold.critical >= threshold.moderate;
                if !ordered {
                    return Err(CatalogError::InvalidThreshold {
                        tag_id: tag.tag_id.clone(),
                        moderate: threshold.moderate,
                        critical: threshold.critical,
                    });
                }
                if threshold.unit.is_empty() {
                    threshold.unit = tag.unit.clone();
                }
            }
        }

        Ok(Self { tags, index })
    }

    /// Parse a YAML catalog (`tags: [...]`)
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.tags)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, tag_id: &str) -> Option<&TagInfo> {
        self.index.get(tag_id).map(|&pos| &self.tags[pos])
    }

    pub fn threshold(&self, tag_id: &str) -> Option<&Threshold> {
        self.get(tag_id).and_then(|t| t.threshold.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagInfo> {
        self.tags.iter()
    }

    pub fn by_kind(&self, kind: TagKind) -> impl Iterator<Item = &TagInfo> {
        self.tags.iter().filter(move |t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Built-in plant: mixer/pump skid with CIP/SIP valves
    pub fn builtin() -> Self {
        let mut tags = Vec::with_capacity(BUILTIN_DIGITAL.len() + BUILTIN_ANALOG.len());

        for &(tag_id, kind, description) in BUILTIN_DIGITAL {
            tags.push(TagInfo {
                tag_id: tag_id.to_string(),
                kind,
                description: description.to_string(),
                unit: String::new(),
                category: None,
                threshold: Some(Threshold::digital()),
                simulation: None,
            });
        }

        for seed in BUILTIN_ANALOG {
            tags.push(TagInfo {
                tag_id: seed.tag_id.to_string(),
                kind: seed.kind,
                description: seed.description.to_string(),
                unit: seed.unit.to_string(),
                category: seed.category,
                threshold: Some(Threshold {
                    moderate: seed.moderate,
                    critical: seed.critical,
                    unit: seed.unit.to_string(),
                }),
                simulation: Some(SimulationProfile {
                    base_value: seed.base,
                    volatility: seed.volatility,
                    min_value: seed.min,
                    max_value: seed.max,
                }),
            });
        }

        let index = tags
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.tag_id.clone(), pos))
            .collect();
        Self { tags, index }
    }
}

fn kind_order(kind: TagKind) -> usize {
    TagKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(TagKind::ALL.len())
}

const BUILTIN_DIGITAL: &[(&str, TagKind, &str)] = &[
    ("DI-001", TagKind::DigitalInput, "Voltage Protection"),
    ("DI-002", TagKind::DigitalInput, "Emergency Stop"),
    ("DI-003", TagKind::DigitalInput, "Buzzer Reset PB"),
    ("DI-004", TagKind::DigitalInput, "Mixer VFD Trip"),
    ("DI-005", TagKind::DigitalInput, "Mixer VFD Running"),
    ("DI-006", TagKind::DigitalInput, "Mixer VFD Healthy"),
    ("DI-007", TagKind::DigitalInput, "Circulation Pump Trip"),
    ("DI-008", TagKind::DigitalInput, "Circulation Pump Running"),
    ("DO-001", TagKind::DigitalOutput, "Buzzer"),
    ("DO-002", TagKind::DigitalOutput, "Emergency"),
    ("DO-003", TagKind::DigitalOutput, "CIP Valve-1"),
    ("DO-004", TagKind::DigitalOutput, "SIP Valve-1"),
];

struct AnalogSeed {
    tag_id: &'static str,
    kind: TagKind,
    description: &'static str,
    unit: &'static str,
    category: Option<DescriptionCategory>,
    moderate: f64,
    critical: f64,
    base: f64,
    volatility: f64,
    min: f64,
    max: f64,
}

const BUILTIN_ANALOG: &[AnalogSeed] = &[
    AnalogSeed {
        tag_id: "AI-001",
        kind: TagKind::AnalogInput,
        description: "Line 1 - Pressure",
        unit: "bar",
        category: Some(DescriptionCategory::Pressure),
        moderate: 5.0,
        critical: 8.0,
        base: 5.0,
        volatility: 4.0,
        min: 0.0,
        max: 10.0,
    },
    AnalogSeed {
        tag_id: "AI-002",
        kind: TagKind::AnalogInput,
        description: "Line 1 - Temperature",
        unit: "°C",
        category: Some(DescriptionCategory::Temperature),
        moderate: 50.0,
        critical: 75.0,
        base: 50.0,
        volatility: 30.0,
        min: 0.0,
        max: 100.0,
    },
    AnalogSeed {
        tag_id: "AI-003",
        kind: TagKind::AnalogInput,
        description: "Line 2 - Temperature",
        unit: "°C",
        category: Some(DescriptionCategory::Temperature),
        moderate: 50.0,
        critical: 75.0,
        base: 48.0,
        volatility: 20.0,
        min: 0.0,
        max: 100.0,
    },
    AnalogSeed {
        tag_id: "AI-004",
        kind: TagKind::AnalogInput,
        description: "DO Transmitter",
        unit: "%",
        category: None,
        moderate: 30.0,
        critical: 50.0,
        base: 45.0,
        volatility: 12.0,
        min: 0.0,
        max: 100.0,
    },
    AnalogSeed {
        tag_id: "AI-005",
        kind: TagKind::AnalogInput,
        description: "Load Cell",
        unit: "kg",
        category: None,
        moderate: 25.0,
        critical: 40.0,
        base: 25.0,
        volatility: 3.0,
        min: 0.0,
        max: 50.0,
    },
    AnalogSeed {
        tag_id: "AI-006",
        kind: TagKind::AnalogInput,
        description: "Cond PH Sensor",
        unit: "pH",
        category: None,
        moderate: 7.0,
        critical: 9.0,
        base: 7.0,
        volatility: 0.8,
        min: 0.0,
        max: 14.0,
    },
    AnalogSeed {
        tag_id: "AI-007",
        kind: TagKind::AnalogInput,
        description: "Magnetic Mixer",
        unit: "RPM",
        category: None,
        moderate: 750.0,
        critical: 1200.0,
        base: 1100.0,
        volatility: 80.0,
        min: 0.0,
        max: 1500.0,
    },
    AnalogSeed {
        tag_id: "AO-001",
        kind: TagKind::AnalogOutput,
        description: "Control Valve",
        unit: "%",
        category: None,
        moderate: 70.0,
        critical: 90.0,
        base: 50.0,
        volatility: 15.0,
        min: 0.0,
        max: 100.0,
    },
];
