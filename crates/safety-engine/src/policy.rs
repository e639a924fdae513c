//! Severity Policy Tables
//!
//! Thresholds that turn raw numbers into severities and labels. They are
//! plain data so they can be loaded from configuration and tested on their
//! own.
//!
//! # Labels
//! Interaction and dosage severities share one ordinal scale (1-5).
//! [`LevelPolicy`] maps that scale onto [`SeverityLevel`]:
//! - `>= 4` High
//! - `>= 3` Medium
//! - otherwise Low
//!
//! # Dosage
//! [`DosagePolicy`] buckets `effective / max` ratios:
//! - `>= 2.0` severity 4
//! - `>= 1.5` severity 3
//! - any other overage: severity 2
//!
//! These dosage buckets are product defaults, not clinical guidance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounds of the shared severity scale
pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 5;

fn check_severity(table: &'static str, severity: u8) -> Result<(), PolicyError> {
    if (MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
        Ok(())
    } else {
        Err(PolicyError::SeverityOutOfRange { table, severity })
    }
}

/// Coarse label shown next to a warning
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("invalid policy json: {0}")]
    Parse(String),
    #[error("{table} bands must be strictly descending (band {index})")]
    Unordered { table: &'static str, index: usize },
    #[error("{table} band {index} has an invalid threshold")]
    InvalidThreshold { table: &'static str, index: usize },
    #[error("{table} severity {severity} is outside 1-5")]
    SeverityOutOfRange { table: &'static str, severity: u8 },
}

// ============================================================================
// Labels
// ============================================================================

/// One row of the label table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelBand {
    pub min_severity: u8,
    pub level: SeverityLevel,
}

/// Severity → label table, checked highest band first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelPolicy {
    pub bands: Vec<LevelBand>,
    /// Label for severities below every band
    pub fallback: SeverityLevel,
}

impl Default for LevelPolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                LevelBand { min_severity: 4, level: SeverityLevel::High },
                LevelBand { min_severity: 3, level: SeverityLevel::Medium },
            ],
            fallback: SeverityLevel::Low,
        }
    }
}

impl LevelPolicy {
    pub fn level_for(&self, severity: u8) -> SeverityLevel {
        self.bands
            .iter()
            .find(|band| severity >= band.min_severity)
            .map(|band| band.level)
            .unwrap_or(self.fallback)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        for band in &self.bands {
            check_severity("level", band.min_severity)?;
        }
        for (index, pair) in self.bands.windows(2).enumerate() {
            if pair[0].min_severity <= pair[1].min_severity {
                return Err(PolicyError::Unordered { table: "level", index: index + 1 });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Dosage
// ============================================================================

/// One row of the dosage table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DosageBand {
    /// Minimum `effective / max` ratio for this band
    pub min_ratio: f64,
    pub severity: u8,
}

/// Overage ratio → severity table, checked highest band first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DosagePolicy {
    pub bands: Vec<DosageBand>,
    /// Severity for any overage below every band
    pub base_severity: u8,
}

impl Default for DosagePolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                DosageBand { min_ratio: 2.0, severity: 4 },
                DosageBand { min_ratio: 1.5, severity: 3 },
            ],
            base_severity: 2,
        }
    }
}

impl DosagePolicy {
    /// Severity for a dosage already known to exceed `max`.
    pub fn severity_for(&self, current: f64, max: f64) -> u8 {
        let ratio = if max > 0.0 { current / max } else { f64::INFINITY };
        self.bands
            .iter()
            .find(|band| ratio >= band.min_ratio)
            .map(|band| band.severity)
            .unwrap_or(self.base_severity)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        for (index, band) in self.bands.iter().enumerate() {
            if !band.min_ratio.is_finite() || band.min_ratio <= 0.0 {
                return Err(PolicyError::InvalidThreshold { table: "dosage", index });
            }
            check_severity("dosage", band.severity)?;
        }
        check_severity("dosage", self.base_severity)?;
        for (index, pair) in self.bands.windows(2).enumerate() {
            if pair[0].min_ratio <= pair[1].min_ratio {
                return Err(PolicyError::Unordered { table: "dosage", index: index + 1 });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Combined configuration
// ============================================================================

/// All tunable thresholds of the safety engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    #[serde(default)]
    pub levels: LevelPolicy,
    #[serde(default)]
    pub dosage: DosagePolicy,
}

impl SafetyPolicy {
    /// Parse and validate a policy; missing tables fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: SafetyPolicy =
            serde_json::from_str(json).map_err(|e| PolicyError::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        self.levels.validate()?;
        self.dosage.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_thresholds() {
        let policy = LevelPolicy::default();
        assert_eq!(policy.level_for(5), SeverityLevel::High);
        assert_eq!(policy.level_for(4), SeverityLevel::High);
        assert_eq!(policy.level_for(3), SeverityLevel::Medium);
        assert_eq!(policy.level_for(2), SeverityLevel::Low);
        assert_eq!(policy.level_for(0), SeverityLevel::Low);
    }

    #[test]
    fn test_default_dosage_buckets() {
        let policy = DosagePolicy::default();
        assert_eq!(policy.severity_for(800.0, 400.0), 4);
        assert_eq!(policy.severity_for(600.0, 400.0), 3);
        assert_eq!(policy.severity_for(500.0, 400.0), 2);
    }

    #[test]
    fn test_zero_max_is_worst_bucket() {
        assert_eq!(DosagePolicy::default().severity_for(1.0, 0.0), 4);
    }

    #[test]
    fn test_tuned_thresholds() {
        let policy = LevelPolicy {
            bands: vec![LevelBand { min_severity: 5, level: SeverityLevel::High }],
            fallback: SeverityLevel::Medium,
        };
        assert_eq!(policy.level_for(4), SeverityLevel::Medium);
        assert_eq!(policy.level_for(5), SeverityLevel::High);
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let policy = SafetyPolicy::from_json(
            r#"{"dosage":{"bands":[{"min_ratio":3.0,"severity":5}],"base_severity":1}}"#,
        )
        .unwrap();
        assert_eq!(policy.levels, LevelPolicy::default());
        assert_eq!(policy.dosage.severity_for(1300.0, 400.0), 5);
        assert_eq!(policy.dosage.severity_for(500.0, 400.0), 1);
    }

    #[test]
    fn test_from_json_rejects_unordered_bands() {
        let err = SafetyPolicy::from_json(
            r#"{"levels":{"bands":[{"min_severity":3,"level":"Medium"},{"min_severity":4,"level":"High"}],"fallback":"Low"}}"#,
        )
        .unwrap_err();
        assert_eq!(err, PolicyError::Unordered { table: "level", index: 1 });
    }

    #[test]
    fn test_from_json_rejects_bad_ratio() {
        let err = SafetyPolicy::from_json(
            r#"{"dosage":{"bands":[{"min_ratio":-1.0,"severity":5}],"base_severity":2}}"#,
        )
        .unwrap_err();
        assert_eq!(err, PolicyError::InvalidThreshold { table: "dosage", index: 0 });
    }

    #[test]
    fn test_from_json_rejects_severity_off_scale() {
        let err = SafetyPolicy::from_json(
            r#"{"dosage":{"bands":[{"min_ratio":2.0,"severity":200}],"base_severity":2}}"#,
        )
        .unwrap_err();
        assert_eq!(err, PolicyError::SeverityOutOfRange { table: "dosage", severity: 200 });

        let err = SafetyPolicy::from_json(
            r#"{"dosage":{"bands":[{"min_ratio":2.0,"severity":4}],"base_severity":0}}"#,
        )
        .unwrap_err();
        assert_eq!(err, PolicyError::SeverityOutOfRange { table: "dosage", severity: 0 });

        let err = SafetyPolicy::from_json(
            r#"{"levels":{"bands":[{"min_severity":9,"level":"High"}],"fallback":"Low"}}"#,
        )
        .unwrap_err();
        assert_eq!(err, PolicyError::SeverityOutOfRange { table: "level", severity: 9 });
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert_eq!(SafetyPolicy::default().validate(), Ok(()));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(SafetyPolicy::from_json("not json"), Err(PolicyError::Parse(_))));
    }
}
