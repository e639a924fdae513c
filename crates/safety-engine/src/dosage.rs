//! Dosage Checker
//!
//! Flags stack items whose effective dosage (custom override, else catalog
//! base) is strictly above the supplement's maximum recommended dosage. A
//! dosage equal to the maximum is safe.

use serde::{Deserialize, Serialize};

use crate::policy::DosagePolicy;
use crate::types::{DosageWarning, SupplementId};

/// Stack snapshot row handed to the dosage checker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DosageCheckItem {
    pub supplement_id: SupplementId,
    pub custom_dosage: Option<f64>,
    pub base_dosage: Option<f64>,
    pub unit: Option<String>,
    pub max_safe_dosage: Option<f64>,
}

impl DosageCheckItem {
    pub fn effective_dosage(&self) -> Option<f64> {
        self.custom_dosage.or(self.base_dosage)
    }
}

/// One warning per item over its limit, in input order.
pub fn check_dosages(items: &[DosageCheckItem], policy: &DosagePolicy) -> Vec<DosageWarning> {
    items.iter().filter_map(|item| check_item(item, policy)).collect()
}

fn check_item(item: &DosageCheckItem, policy: &DosagePolicy) -> Option<DosageWarning> {
    let max = item.max_safe_dosage.filter(|m| m.is_finite())?;
    let current = item.effective_dosage().filter(|d| d.is_finite())?;

    if current <= max {
        return None;
    }

    let unit = item.unit.as_deref().unwrap_or("");
    Some(DosageWarning {
        supplement_id: item.supplement_id,
        current_dosage: current,
        max_safe_dosage: max,
        unit: item.unit.clone(),
        severity: policy.severity_for(current, max),
        description: format!(
            "Current dosage of {}{} exceeds the maximum recommended {}{}",
            current, unit, max, unit
        ),
    })
}
