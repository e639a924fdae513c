//! In-memory [`SafetyStore`] with query counters and injectable failures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::store::{LookupError, SafetyStore};
use crate::types::{InteractionRecord, Substance, SubstanceId, Supplement, SupplementId, SupplementSubstance};

/// Which lookup should fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailingLookup {
    Substances,
    Interactions,
    Names,
}

#[derive(Debug, Default)]
pub struct MemorySafetyStore {
    supplements: BTreeMap<SupplementId, Supplement>,
    substances: BTreeMap<SubstanceId, Substance>,
    mapping: Vec<(SupplementId, SubstanceId)>,
    interactions: Vec<InteractionRecord>,
    failing: Option<FailingLookup>,
    substance_queries: AtomicUsize,
    interaction_queries: AtomicUsize,
    name_queries: AtomicUsize,
}

impl MemorySafetyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supplement(mut self, id: u64, name: &str) -> Self {
        self.supplements.insert(
            SupplementId(id),
            Supplement {
                id: SupplementId(id),
                name: name.to_string(),
                base_dosage: None,
                max_dosage: None,
                unit: None,
            },
        );
        self
    }

    pub fn with_substance(mut self, id: u64, name: &str) -> Self {
        self.substances.insert(
            SubstanceId(id),
            Substance { id: SubstanceId(id), name: name.to_string() },
        );
        self
    }

    /// Map a supplement to one of its substances.
    pub fn with_contains(mut self, supplement: u64, substance: u64) -> Self {
        self.mapping.push((SupplementId(supplement), SubstanceId(substance)));
        self
    }

    pub fn with_interaction(mut self, substance_a: u64, substance_b: u64, severity: u8) -> Self {
        self.interactions.push(InteractionRecord {
            substance_a: SubstanceId(substance_a),
            substance_b: SubstanceId(substance_b),
            severity,
            mechanism: None,
            description: None,
            evidence_level: None,
        });
        self
    }

    pub fn with_interaction_record(mut self, record: InteractionRecord) -> Self {
        self.interactions.push(record);
        self
    }

    pub fn failing(mut self, lookup: FailingLookup) -> Self {
        self.failing = Some(lookup);
        self
    }

    pub fn substance_queries(&self) -> usize {
        self.substance_queries.load(Ordering::SeqCst)
    }

    pub fn interaction_queries(&self) -> usize {
        self.interaction_queries.load(Ordering::SeqCst)
    }

    pub fn name_queries(&self) -> usize {
        self.name_queries.load(Ordering::SeqCst)
    }

    pub fn total_queries(&self) -> usize {
        self.substance_queries() + self.interaction_queries() + self.name_queries()
    }

    fn check_failure(&self, lookup: FailingLookup) -> Result<(), LookupError> {
        if self.failing == Some(lookup) {
            return Err(LookupError::Backend(format!("{:?} lookup unavailable", lookup)));
        }
        Ok(())
    }
}

#[async_trait]
impl SafetyStore for MemorySafetyStore {
    async fn substances_for(
        &self,
        supplement_ids: &[SupplementId],
    ) -> Result<Vec<SupplementSubstance>, LookupError> {
        self.substance_queries.fetch_add(1, Ordering::SeqCst);
        self.check_failure(FailingLookup::Substances)?;

        Ok(self
            .mapping
            .iter()
            .filter(|(supplement, _)| supplement_ids.contains(supplement))
            .map(|(supplement, substance)| SupplementSubstance {
                supplement_id: *supplement,
                substance_id: *substance,
                substance_name: self
                    .substances
                    .get(substance)
                    .map(|s| s.name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn interactions_among(
        &self,
        substance_ids: &[SubstanceId],
    ) -> Result<Vec<InteractionRecord>, LookupError> {
        self.interaction_queries.fetch_add(1, Ordering::SeqCst);
        self.check_failure(FailingLookup::Interactions)?;

        Ok(self
            .interactions
            .iter()
            .filter(|i| substance_ids.contains(&i.substance_a) || substance_ids.contains(&i.substance_b))
            .cloned()
            .collect())
    }

    async fn supplement_name(&self, id: SupplementId) -> Result<Option<String>, LookupError> {
        self.name_queries.fetch_add(1, Ordering::SeqCst);
        self.check_failure(FailingLookup::Names)?;

        Ok(self.supplements.get(&id).map(|s| s.name.clone()))
    }
}
