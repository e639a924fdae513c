//! Interaction Checker
//!
//! Cross-references the substances behind a set of supplements against the
//! substance interaction table:
//! 1. Resolve supplements to substances
//! 2. Stop early when fewer than two substances are active
//! 3. Fetch interactions touching those substances
//! 4. Emit at most one warning per unordered supplement pair
//!
//! Failures are fail-open: a lookup error is logged and the check reports no
//! warnings, so an unavailable catalog never blocks editing a stack.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use futures::future::join_all;
use tracing::{debug, error, warn};

use crate::store::{LookupError, SafetyStore};
use crate::types::{InteractionRecord, InteractionWarning, SubstanceId, SupplementId, SupplementPair};

/// Placeholder used when a supplement name cannot be resolved
pub const UNKNOWN_NAME: &str = "Unknown";

/// Interaction warnings for the given supplements; never fails.
///
/// Duplicate ids are ignored. The result is deduplicated by unordered
/// supplement pair and never contains a self-pair.
pub async fn check_interactions<S>(store: &S, supplement_ids: &[SupplementId]) -> Vec<InteractionWarning>
where
    S: SafetyStore + ?Sized,
{
    match try_check_interactions(store, supplement_ids).await {
        Ok(warnings) => warnings,
        Err(e) => {
            error!(error = %e, supplements = supplement_ids.len(), "interaction check failed, reporting no warnings");
            Vec::new()
        }
    }
}

async fn try_check_interactions<S>(
    store: &S,
    supplement_ids: &[SupplementId],
) -> Result<Vec<InteractionWarning>, LookupError>
where
    S: SafetyStore + ?Sized,
{
    let active: BTreeSet<SupplementId> = supplement_ids.iter().copied().collect();
    if active.len() < 2 {
        return Ok(Vec::new());
    }

    let ids: Vec<SupplementId> = active.iter().copied().collect();
    let rows = store.substances_for(&ids).await?;

    // substance -> supplements containing it, in first-seen order
    let mut holders: BTreeMap<SubstanceId, Vec<SupplementId>> = BTreeMap::new();
    for row in rows {
        if !active.contains(&row.supplement_id) {
            continue;
        }
        let supplements = holders.entry(row.substance_id).or_default();
        if !supplements.contains(&row.supplement_id) {
            supplements.push(row.supplement_id);
        }
    }

    if holders.len() < 2 {
        debug!(substances = holders.len(), "too few active substances for an interaction");
        return Ok(Vec::new());
    }

    let substance_ids: Vec<SubstanceId> = holders.keys().copied().collect();
    let records = store.interactions_among(&substance_ids).await?;

    let matches = match_pairs(&holders, &records);
    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let names = resolve_names(store, &matches).await;
    let name_of = |id: &SupplementId| {
        names.get(id).cloned().unwrap_or_else(|| UNKNOWN_NAME.to_string())
    };

    Ok(matches
        .into_iter()
        .map(|(a, b, record)| InteractionWarning {
            supplement_a: a,
            supplement_a_name: name_of(&a),
            supplement_b: b,
            supplement_b_name: name_of(&b),
            severity: record.severity,
            mechanism: record.mechanism.clone(),
            description: record.description.clone(),
            evidence_level: record.evidence_level.clone(),
        })
        .collect())
}

/// First interaction record wins for each supplement pair.
fn match_pairs<'r>(
    holders: &BTreeMap<SubstanceId, Vec<SupplementId>>,
    records: &'r [InteractionRecord],
) -> Vec<(SupplementId, SupplementId, &'r InteractionRecord)> {
    let mut seen: HashSet<SupplementPair> = HashSet::new();
    let mut matches = Vec::new();

    for record in records {
        let (Some(side_a), Some(side_b)) =
            (holders.get(&record.substance_a), holders.get(&record.substance_b))
        else {
            continue;
        };

        for &a in side_a {
            for &b in side_b {
                let Some(pair) = SupplementPair::new(a, b) else {
                    continue;
                };
                if seen.insert(pair) {
                    matches.push((a, b, record));
                }
            }
        }
    }

    matches
}

/// Resolve display names concurrently; failures degrade to [`UNKNOWN_NAME`].
async fn resolve_names<S>(
    store: &S,
    matches: &[(SupplementId, SupplementId, &InteractionRecord)],
) -> BTreeMap<SupplementId, String>
where
    S: SafetyStore + ?Sized,
{
    let ids: BTreeSet<SupplementId> = matches.iter().flat_map(|(a, b, _)| [*a, *b]).collect();

    let lookups = ids.into_iter().map(|id| async move {
        let name = match store.supplement_name(id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_NAME.to_string(),
            Err(e) => {
                warn!(supplement = %id, error = %e, "name lookup failed");
                UNKNOWN_NAME.to_string()
            }
        };
        (id, name)
    });

    join_all(lookups).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailingLookup, MemorySafetyStore};
    use futures::executor::block_on;

    fn ids(raw: &[u64]) -> Vec<SupplementId> {
        raw.iter().map(|id| SupplementId(*id)).collect()
    }

    #[test]
    fn test_shared_substance_pair() {
        let store = MemorySafetyStore::new()
            .with_supplement(1, "Creatine")
            .with_supplement(2, "Caffeine")
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_interaction(10, 20, 3);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert_eq!(warnings.len(), 1);
        let w = &warnings[0];
        assert_eq!(w.supplement_a, SupplementId(1));
        assert_eq!(w.supplement_a_name, "Creatine");
        assert_eq!(w.supplement_b, SupplementId(2));
        assert_eq!(w.supplement_b_name, "Caffeine");
        assert_eq!(w.severity, 3);
    }

    #[test]
    fn test_single_supplement_issues_no_queries() {
        let store = MemorySafetyStore::new().with_contains(1, 10).with_contains(1, 20);

        let warnings = block_on(check_interactions(&store, &ids(&[1])));

        assert!(warnings.is_empty());
        assert_eq!(store.total_queries(), 0);
    }

    #[test]
    fn test_duplicate_ids_are_a_set() {
        let store = MemorySafetyStore::new().with_contains(1, 10).with_interaction(10, 10, 5);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 1, 1])));

        assert!(warnings.is_empty());
        assert_eq!(store.total_queries(), 0);
    }

    #[test]
    fn test_one_substance_skips_interaction_query() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(2, 10)
            .with_interaction(10, 10, 4);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert!(warnings.is_empty());
        assert_eq!(store.substance_queries(), 1);
        assert_eq!(store.interaction_queries(), 0);
    }

    #[test]
    fn test_self_pair_excluded() {
        // Supplement 1 contains both interacting substances
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(1, 20)
            .with_contains(2, 30)
            .with_interaction(10, 20, 5);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert!(warnings.is_empty());
    }

    #[test]
    fn test_first_record_wins_per_pair() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(1, 11)
            .with_contains(2, 20)
            .with_interaction(10, 20, 2)
            .with_interaction(20, 11, 5);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, 2);
    }

    #[test]
    fn test_reversed_record_orientation() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_interaction(20, 10, 4);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].supplement_a, SupplementId(2));
        assert_eq!(warnings[0].supplement_b, SupplementId(1));
    }

    #[test]
    fn test_missing_name_degrades_to_unknown() {
        let store = MemorySafetyStore::new()
            .with_supplement(1, "Magnesium")
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_interaction(10, 20, 3);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert_eq!(warnings[0].supplement_a_name, "Magnesium");
        assert_eq!(warnings[0].supplement_b_name, UNKNOWN_NAME);
    }

    #[test]
    fn test_name_failure_keeps_warnings() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_interaction(10, 20, 3)
            .failing(FailingLookup::Names);

        let warnings = block_on(check_interactions(&store, &ids(&[1, 2])));

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].supplement_a_name, UNKNOWN_NAME);
    }

    #[test]
    fn test_substance_failure_is_fail_open() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_interaction(10, 20, 3)
            .failing(FailingLookup::Substances);

        assert!(block_on(check_interactions(&store, &ids(&[1, 2]))).is_empty());
    }

    #[test]
    fn test_interaction_failure_is_fail_open() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_interaction(10, 20, 3)
            .failing(FailingLookup::Interactions);

        assert!(block_on(check_interactions(&store, &ids(&[1, 2]))).is_empty());
    }

    #[test]
    fn test_unrelated_supplements_produce_nothing() {
        let store = MemorySafetyStore::new()
            .with_contains(1, 10)
            .with_contains(2, 20)
            .with_contains(3, 30)
            .with_interaction(10, 40, 5);

        assert!(block_on(check_interactions(&store, &ids(&[1, 2, 3]))).is_empty());
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::memory::MemorySafetyStore;
    use futures::executor::block_on;
    use proptest::prelude::*;

    fn arb_store() -> impl Strategy<Value = (MemorySafetyStore, Vec<u64>)> {
        (
            proptest::collection::vec((0u64..8, 0u64..6), 0..20),
            proptest::collection::vec((0u64..6, 0u64..6, 1u8..=5), 0..15),
            proptest::collection::vec(0u64..8, 0..10),
        )
            .prop_map(|(mapping, interactions, stack)| {
                let mut store = MemorySafetyStore::new();
                for (supplement, substance) in mapping {
                    store = store.with_contains(supplement, substance);
                }
                for (a, b, severity) in interactions {
                    store = store.with_interaction(a, b, severity);
                }
                (store, stack)
            })
    }

    proptest! {
        /// No warning may pair a supplement with itself
        #[test]
        fn no_self_pairs((store, stack) in arb_store()) {
            let stack: Vec<SupplementId> = stack.into_iter().map(SupplementId).collect();
            let warnings = block_on(check_interactions(&store, &stack));
            for w in &warnings {
                prop_assert_ne!(w.supplement_a, w.supplement_b);
            }
        }

        /// Each unordered pair is reported at most once
        #[test]
        fn pairs_are_unique((store, stack) in arb_store()) {
            let stack: Vec<SupplementId> = stack.into_iter().map(SupplementId).collect();
            let warnings = block_on(check_interactions(&store, &stack));
            let mut pairs = HashSet::new();
            for w in &warnings {
                prop_assert!(pairs.insert(w.pair().unwrap()), "duplicate pair {:?}", w.pair());
            }
        }

        /// Same input and same data give the same warnings
        #[test]
        fn idempotent((store, stack) in arb_store()) {
            let stack: Vec<SupplementId> = stack.into_iter().map(SupplementId).collect();
            let first = block_on(check_interactions(&store, &stack));
            let second = block_on(check_interactions(&store, &stack));
            prop_assert_eq!(first, second);
        }

        /// Every warning only names supplements from the stack
        #[test]
        fn warnings_stay_within_stack((store, stack) in arb_store()) {
            let stack: Vec<SupplementId> = stack.into_iter().map(SupplementId).collect();
            let warnings = block_on(check_interactions(&store, &stack));
            for w in &warnings {
                prop_assert!(stack.contains(&w.supplement_a));
                prop_assert!(stack.contains(&w.supplement_b));
            }
        }
    }
}
