//! Stack Integrity Zome
//!
//! Entry types and validation for supplement stacks:
//! - Supplement catalog with recommended dosage ranges
//! - Substances and the supplement → substance mapping
//! - Substance-substance interactions with severity and evidence level
//! - User stack items (soft-deleted, never erased)
//! - Daily intake logs backing the timeline checklist

use hdi::prelude::*;
use whatdose_safety::{ScheduleSlot, SubstanceId, SupplementId};

/// Interaction severities are ordinal 1 (mild) to 5 (dangerous)
pub use whatdose_safety::{MAX_SEVERITY, MIN_SEVERITY};

// ============================================================================
// Catalog Types
// ============================================================================

/// Supplement catalog entry (read-only reference data)
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Supplement {
    pub supplement_id: SupplementId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Default dosage when a stack item has no override
    pub base_dosage: Option<f64>,
    /// Maximum recommended dosage
    pub max_dosage: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// Active compound
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Substance {
    pub substance_id: SubstanceId,
    pub name: String,
    pub description: Option<String>,
}

/// A supplement contains a substance
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct SupplementSubstance {
    pub supplement_id: SupplementId,
    pub substance_id: SubstanceId,
    pub amount: Option<f64>,
    pub unit: Option<String>,
}

/// Documented interaction between two substances
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct SubstanceInteraction {
    pub interaction_id: String,
    pub substance_a: SubstanceId,
    pub substance_b: SubstanceId,
    /// 1-5, higher is more dangerous
    pub severity: u8,
    pub mechanism: Option<String>,
    pub description: Option<String>,
    /// e.g. "Strong", "Moderate", "Limited", "Theoretical"
    pub evidence_level: Option<String>,
}

// ============================================================================
// Stack Types
// ============================================================================

/// A supplement in a user's stack
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct StackItem {
    pub owner: AgentPubKey,
    pub supplement_id: SupplementId,
    pub schedule: ScheduleSlot,
    /// Overrides the catalog base dosage
    pub custom_dosage: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    /// Cleared on removal; items are never deleted
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stack item was taken on a given day
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct IntakeLog {
    /// Original action hash of the stack item
    pub stack_item_hash: ActionHash,
    pub supplement_id: SupplementId,
    /// Local calendar day, YYYY-MM-DD
    pub date: String,
    pub taken_at: Timestamp,
}

// ============================================================================
// Entry Types and Link Types
// ============================================================================

#[hdk_entry_types]
#[unit_enum(UnitEntryTypes)]
pub enum EntryTypes {
    Supplement(Supplement),
    Substance(Substance),
    SupplementSubstance(SupplementSubstance),
    SubstanceInteraction(SubstanceInteraction),
    StackItem(StackItem),
    IntakeLog(IntakeLog),
}

#[hdk_link_types]
pub enum LinkTypes {
    /// Catalog index of all supplements
    AllSupplements,
    /// Supplement id anchor to its catalog entry
    SupplementIdToSupplement,
    /// Supplement id anchor to its substance mappings
    SupplementToSubstances,
    /// Substance id anchor to its catalog entry
    SubstanceIdToSubstance,
    /// Substance id anchor to interactions on either side
    SubstanceToInteractions,
    /// Agent to their stack items
    AgentToStackItems,
    /// Original stack item to its updates
    StackItemUpdates,
    /// Agent-day anchor to intake logs
    DailyIntakeLogs,
}

// ============================================================================
// Validation
// ============================================================================

#[hdk_extern]
pub fn validate(op: Op) -> ExternResult<ValidateCallbackResult> {
    match op.flattened::<EntryTypes, LinkTypes>()? {
        FlatOp::StoreEntry(store_entry) => match store_entry {
            OpEntry::CreateEntry { app_entry, .. } => validate_create_entry(app_entry),
            OpEntry::UpdateEntry { app_entry, .. } => validate_create_entry(app_entry),
            _ => Ok(ValidateCallbackResult::Valid),
        },
        _ => Ok(ValidateCallbackResult::Valid),
    }
}

fn validate_create_entry(entry: EntryTypes) -> ExternResult<ValidateCallbackResult> {
    match entry {
        EntryTypes::Supplement(s) => validate_supplement(&s),
        EntryTypes::Substance(s) => validate_substance(&s),
        EntryTypes::SupplementSubstance(m) => validate_mapping(&m),
        EntryTypes::SubstanceInteraction(i) => validate_interaction(&i),
        EntryTypes::StackItem(item) => validate_stack_item(&item),
        EntryTypes::IntakeLog(log) => validate_intake_log(&log),
    }
}

fn invalid(reason: &str) -> ExternResult<ValidateCallbackResult> {
    Ok(ValidateCallbackResult::Invalid(reason.to_string()))
}

fn is_valid_dosage(value: Option<f64>) -> bool {
    value.map_or(true, |v| v.is_finite() && v >= 0.0)
}

pub fn validate_supplement(s: &Supplement) -> ExternResult<ValidateCallbackResult> {
    if s.name.trim().is_empty() {
        return invalid("Supplement name is required");
    }
    if !is_valid_dosage(s.base_dosage) || !is_valid_dosage(s.max_dosage) {
        return invalid("Dosages must be finite and non-negative");
    }
    if let (Some(base), Some(max)) = (s.base_dosage, s.max_dosage) {
        if max < base {
            return invalid("Maximum dosage cannot be below the base dosage");
        }
    }
    Ok(ValidateCallbackResult::Valid)
}

pub fn validate_substance(s: &Substance) -> ExternResult<ValidateCallbackResult> {
    if s.name.trim().is_empty() {
        return invalid("Substance name is required");
    }
    Ok(ValidateCallbackResult::Valid)
}

pub fn validate_mapping(m: &SupplementSubstance) -> ExternResult<ValidateCallbackResult> {
    if !is_valid_dosage(m.amount) {
        return invalid("Substance amount must be finite and non-negative");
    }
    Ok(ValidateCallbackResult::Valid)
}

pub fn validate_interaction(i: &SubstanceInteraction) -> ExternResult<ValidateCallbackResult> {
    if i.interaction_id.is_empty() {
        return invalid("Interaction ID is required");
    }
    if i.substance_a == i.substance_b {
        return invalid("A substance cannot interact with itself");
    }
    if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&i.severity) {
        return Ok(ValidateCallbackResult::Invalid(format!(
            "Severity must be between {} and {}, got {}",
            MIN_SEVERITY, MAX_SEVERITY, i.severity
        )));
    }
    Ok(ValidateCallbackResult::Valid)
}

pub fn validate_stack_item(item: &StackItem) -> ExternResult<ValidateCallbackResult> {
    if !is_valid_dosage(item.custom_dosage) {
        return invalid("Custom dosage must be finite and non-negative");
    }
    if item.updated_at < item.created_at {
        return invalid("Stack item cannot be updated before it was created");
    }
    Ok(ValidateCallbackResult::Valid)
}

pub fn validate_intake_log(log: &IntakeLog) -> ExternResult<ValidateCallbackResult> {
    if !is_valid_date(&log.date) {
        return invalid("Intake date must be formatted YYYY-MM-DD");
    }
    Ok(ValidateCallbackResult::Valid)
}

/// Shape check for `YYYY-MM-DD`, with month 01-12 and day 01-31
pub fn is_valid_date(date: &str) -> bool {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() != 3 || parts[0].len() != 4 || parts[1].len() != 2 || parts[2].len() != 2 {
        return false;
    }
    if !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return false;
    }
    let month: u32 = parts[1].parse().unwrap_or(0);
    let day: u32 = parts[2].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplement(base: Option<f64>, max: Option<f64>) -> Supplement {
        Supplement {
            supplement_id: SupplementId(1),
            name: "Magnesium Glycinate".to_string(),
            brand: None,
            category: Some("Minerals".to_string()),
            base_dosage: base,
            max_dosage: max,
            unit: Some("mg".to_string()),
            description: None,
        }
    }

    fn interaction(a: u64, b: u64, severity: u8) -> SubstanceInteraction {
        SubstanceInteraction {
            interaction_id: "INT-001".to_string(),
            substance_a: SubstanceId(a),
            substance_b: SubstanceId(b),
            severity,
            mechanism: None,
            description: None,
            evidence_level: Some("Moderate".to_string()),
        }
    }

    #[test]
    fn test_supplement_dosage_range() {
        assert!(matches!(
            validate_supplement(&supplement(Some(200.0), Some(400.0))).unwrap(),
            ValidateCallbackResult::Valid
        ));
        assert!(matches!(
            validate_supplement(&supplement(Some(500.0), Some(400.0))).unwrap(),
            ValidateCallbackResult::Invalid(_)
        ));
        assert!(matches!(
            validate_supplement(&supplement(Some(f64::NAN), None)).unwrap(),
            ValidateCallbackResult::Invalid(_)
        ));
    }

    #[test]
    fn test_interaction_rules() {
        assert!(matches!(
            validate_interaction(&interaction(1, 2, 3)).unwrap(),
            ValidateCallbackResult::Valid
        ));
        assert!(matches!(
            validate_interaction(&interaction(1, 1, 3)).unwrap(),
            ValidateCallbackResult::Invalid(_)
        ));
        assert!(matches!(
            validate_interaction(&interaction(1, 2, 0)).unwrap(),
            ValidateCallbackResult::Invalid(_)
        ));
        assert!(matches!(
            validate_interaction(&interaction(1, 2, 6)).unwrap(),
            ValidateCallbackResult::Invalid(_)
        ));
    }

    #[test]
    fn test_date_shape() {
        assert!(is_valid_date("2026-03-01"));
        assert!(!is_valid_date("2026-3-1"));
        assert!(!is_valid_date("2026-13-01"));
        assert!(!is_valid_date("2026-03-00"));
        assert!(!is_valid_date("yesterday"));
    }
}
