//! Daily timeline: stack items grouped into time-of-day slots for a checklist.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{ScheduleSlot, SupplementId};

/// One stack item to place on the timeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Caller-chosen stable key of the stack item
    pub key: String,
    pub supplement_id: SupplementId,
    pub supplement_name: String,
    pub schedule: ScheduleSlot,
    pub dosage: Option<f64>,
    pub unit: Option<String>,
    #[serde(default)]
    pub taken: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineSlot {
    pub slot: ScheduleSlot,
    pub entries: Vec<TimelineEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTimeline {
    pub slots: Vec<TimelineSlot>,
}

impl DailyTimeline {
    pub fn total(&self) -> usize {
        self.slots.iter().map(|s| s.entries.len()).sum()
    }

    pub fn completed(&self) -> usize {
        self.slots
            .iter()
            .flat_map(|s| s.entries.iter())
            .filter(|e| e.taken)
            .count()
    }

    /// Fraction of entries taken; 0.0 for an empty day.
    pub fn progress(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed() as f64 / total as f64,
        }
    }

    pub fn slot(&self, slot: ScheduleSlot) -> Option<&TimelineSlot> {
        self.slots.iter().find(|s| s.slot == slot)
    }
}

/// Group entries by slot in day order, omitting empty slots.
///
/// Entries inside a slot are ordered by name, case-insensitively; ties keep
/// input order. An entry is taken when its key is in `taken`.
pub fn build_timeline(entries: Vec<TimelineEntry>, taken: &HashSet<String>) -> DailyTimeline {
    let mut by_slot: BTreeMap<ScheduleSlot, Vec<TimelineEntry>> = BTreeMap::new();

    for mut entry in entries {
        entry.taken = taken.contains(&entry.key);
        by_slot.entry(entry.schedule).or_default().push(entry);
    }

    let slots = by_slot
        .into_iter()
        .map(|(slot, mut entries)| {
            entries.sort_by_key(|e| e.supplement_name.to_lowercase());
            TimelineSlot { slot, entries }
        })
        .collect();

    DailyTimeline { slots }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, name: &str, slot: ScheduleSlot) -> TimelineEntry {
        TimelineEntry {
            key: key.to_string(),
            supplement_id: SupplementId(1),
            supplement_name: name.to_string(),
            schedule: slot,
            dosage: None,
            unit: None,
            taken: false,
        }
    }

    #[test]
    fn test_slots_follow_day_order() {
        let timeline = build_timeline(
            vec![
                entry("a", "Melatonin", ScheduleSlot::Bedtime),
                entry("b", "Caffeine", ScheduleSlot::PreWorkout),
                entry("c", "Vitamin D", ScheduleSlot::Morning),
            ],
            &HashSet::new(),
        );

        let order: Vec<ScheduleSlot> = timeline.slots.iter().map(|s| s.slot).collect();
        assert_eq!(
            order,
            vec![ScheduleSlot::Morning, ScheduleSlot::PreWorkout, ScheduleSlot::Bedtime]
        );
        assert!(timeline.slot(ScheduleSlot::Evening).is_none());
    }

    #[test]
    fn test_entries_sorted_by_name() {
        let timeline = build_timeline(
            vec![
                entry("a", "zinc", ScheduleSlot::Morning),
                entry("b", "Omega-3", ScheduleSlot::Morning),
                entry("c", "magnesium", ScheduleSlot::Morning),
            ],
            &HashSet::new(),
        );

        let names: Vec<&str> = timeline.slots[0]
            .entries
            .iter()
            .map(|e| e.supplement_name.as_str())
            .collect();
        assert_eq!(names, vec!["magnesium", "Omega-3", "zinc"]);
    }

    #[test]
    fn test_progress() {
        let taken: HashSet<String> = ["a".to_string()].into_iter().collect();
        let timeline = build_timeline(
            vec![
                entry("a", "Creatine", ScheduleSlot::Morning),
                entry("b", "Zinc", ScheduleSlot::Evening),
            ],
            &taken,
        );

        assert_eq!(timeline.total(), 2);
        assert_eq!(timeline.completed(), 1);
        assert!((timeline.progress() - 0.5).abs() < f64::EPSILON);
        assert!(timeline.slots[0].entries[0].taken);
    }

    #[test]
    fn test_empty_day() {
        let timeline = build_timeline(Vec::new(), &HashSet::new());
        assert_eq!(timeline.total(), 0);
        assert_eq!(timeline.progress(), 0.0);
    }
}
