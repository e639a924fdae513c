//! Combined result of a stack safety check, in display order.

use serde::{Deserialize, Serialize};

use crate::policy::{LevelPolicy, SeverityLevel};
use crate::types::{DosageWarning, InteractionWarning};

/// A single warning as the UI lists it
#[derive(Clone, Debug, PartialEq)]
pub enum SafetyWarning<'a> {
    Dosage(&'a DosageWarning),
    Interaction(&'a InteractionWarning),
}

impl SafetyWarning<'_> {
    pub fn severity(&self) -> u8 {
        match self {
            SafetyWarning::Dosage(w) => w.severity,
            SafetyWarning::Interaction(w) => w.severity,
        }
    }

    pub fn level(&self, policy: &LevelPolicy) -> SeverityLevel {
        policy.level_for(self.severity())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub dosage_warnings: Vec<DosageWarning>,
    pub interaction_warnings: Vec<InteractionWarning>,
}

impl SafetyReport {
    pub fn new(dosage_warnings: Vec<DosageWarning>, interaction_warnings: Vec<InteractionWarning>) -> Self {
        Self { dosage_warnings, interaction_warnings }
    }

    /// Dosage warnings first, then interactions; checker order within each.
    pub fn warnings(&self) -> impl Iterator<Item = SafetyWarning<'_>> {
        self.dosage_warnings
            .iter()
            .map(SafetyWarning::Dosage)
            .chain(self.interaction_warnings.iter().map(SafetyWarning::Interaction))
    }

    pub fn len(&self) -> usize {
        self.dosage_warnings.len() + self.interaction_warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No warnings of any kind.
    pub fn is_clear(&self) -> bool {
        self.is_empty()
    }

    pub fn highest_level(&self, policy: &LevelPolicy) -> Option<SeverityLevel> {
        self.warnings().map(|w| w.level(policy)).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SupplementId;

    fn dosage(id: u64, severity: u8) -> DosageWarning {
        DosageWarning {
            supplement_id: SupplementId(id),
            current_dosage: 2.0,
            max_safe_dosage: 1.0,
            unit: None,
            severity,
            description: String::new(),
        }
    }

    fn interaction(a: u64, b: u64, severity: u8) -> InteractionWarning {
        InteractionWarning {
            supplement_a: SupplementId(a),
            supplement_a_name: "A".to_string(),
            supplement_b: SupplementId(b),
            supplement_b_name: "B".to_string(),
            severity,
            mechanism: None,
            description: None,
            evidence_level: None,
        }
    }

    #[test]
    fn test_dosage_before_interactions() {
        let report = SafetyReport::new(
            vec![dosage(1, 2), dosage(2, 4)],
            vec![interaction(1, 2, 5), interaction(3, 4, 1)],
        );

        let order: Vec<u8> = report.warnings().map(|w| w.severity()).collect();
        assert_eq!(order, vec![2, 4, 5, 1]);
        assert!(matches!(report.warnings().next(), Some(SafetyWarning::Dosage(_))));
    }

    #[test]
    fn test_highest_level() {
        let policy = LevelPolicy::default();
        let report = SafetyReport::new(vec![dosage(1, 2)], vec![interaction(1, 2, 3)]);
        assert_eq!(report.highest_level(&policy), Some(SeverityLevel::Medium));
    }

    #[test]
    fn test_empty_report() {
        let report = SafetyReport::default();
        assert!(report.is_clear());
        assert_eq!(report.highest_level(&LevelPolicy::default()), None);
    }
}
