//! Catalog, stack and warning types shared by the checkers and the stack zome.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Catalog identifier of a supplement
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplementId(pub u64);

/// Catalog identifier of an active substance
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstanceId(pub u64);

impl fmt::Display for SupplementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SubstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unordered pair of distinct supplements, stored as `(min, max)`.
///
/// Two warnings for the same pair compare equal no matter which side of the
/// interaction each supplement came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SupplementPair(SupplementId, SupplementId);

impl SupplementPair {
    /// Returns `None` for a self-pair.
    pub fn new(a: SupplementId, b: SupplementId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self(a, b)),
            std::cmp::Ordering::Greater => Some(Self(b, a)),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> SupplementId {
        self.0
    }

    pub fn high(&self) -> SupplementId {
        self.1
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only supplement catalog entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplement {
    pub id: SupplementId,
    pub name: String,
    /// Default dosage used when the stack item has no override
    pub base_dosage: Option<f64>,
    /// Maximum recommended dosage
    pub max_dosage: Option<f64>,
    pub unit: Option<String>,
}

/// Active compound contained in one or more supplements
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substance {
    pub id: SubstanceId,
    pub name: String,
}

/// One row of the supplement → substance mapping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementSubstance {
    pub supplement_id: SupplementId,
    pub substance_id: SubstanceId,
    pub substance_name: String,
}

/// Documented risk between two substances
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub substance_a: SubstanceId,
    pub substance_b: SubstanceId,
    /// Ordinal risk, conventionally 1-5, higher is more dangerous
    pub severity: u8,
    pub mechanism: Option<String>,
    pub description: Option<String>,
    pub evidence_level: Option<String>,
}

// ============================================================================
// Stack
// ============================================================================

/// Time-of-day bucket a stack item is scheduled into.
///
/// Declaration order is the order slots appear in a day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScheduleSlot {
    Morning,
    PreWorkout,
    Midday,
    Afternoon,
    PostWorkout,
    Evening,
    Bedtime,
    AsNeeded,
}

impl ScheduleSlot {
    pub const ALL: [ScheduleSlot; 8] = [
        ScheduleSlot::Morning,
        ScheduleSlot::PreWorkout,
        ScheduleSlot::Midday,
        ScheduleSlot::Afternoon,
        ScheduleSlot::PostWorkout,
        ScheduleSlot::Evening,
        ScheduleSlot::Bedtime,
        ScheduleSlot::AsNeeded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScheduleSlot::Morning => "Morning",
            ScheduleSlot::PreWorkout => "Pre-Workout",
            ScheduleSlot::Midday => "Midday",
            ScheduleSlot::Afternoon => "Afternoon",
            ScheduleSlot::PostWorkout => "Post-Workout",
            ScheduleSlot::Evening => "Evening",
            ScheduleSlot::Bedtime => "Bedtime",
            ScheduleSlot::AsNeeded => "As Needed",
        }
    }
}

impl fmt::Display for ScheduleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user's binding of a supplement to a schedule slot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackItem {
    pub supplement_id: SupplementId,
    pub schedule: ScheduleSlot,
    /// Overrides the catalog base dosage when set
    pub custom_dosage: Option<f64>,
    pub unit: Option<String>,
    /// Removed items stay stored with `active = false`
    pub active: bool,
}

impl StackItem {
    /// Custom override if present, else the catalog base dosage.
    pub fn effective_dosage(&self, base_dosage: Option<f64>) -> Option<f64> {
        self.custom_dosage.or(base_dosage)
    }
}

// ============================================================================
// Derived warnings
// ============================================================================

/// Interaction between two supplements in the stack
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionWarning {
    pub supplement_a: SupplementId,
    pub supplement_a_name: String,
    pub supplement_b: SupplementId,
    pub supplement_b_name: String,
    pub severity: u8,
    pub mechanism: Option<String>,
    pub description: Option<String>,
    pub evidence_level: Option<String>,
}

impl InteractionWarning {
    pub fn pair(&self) -> Option<SupplementPair> {
        SupplementPair::new(self.supplement_a, self.supplement_b)
    }
}

/// Stack item whose effective dosage exceeds the recommended maximum
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DosageWarning {
    pub supplement_id: SupplementId,
    pub current_dosage: f64,
    pub max_safe_dosage: f64,
    pub unit: Option<String>,
    pub severity: u8,
    pub description: String,
}
