//! Catalog lookups for the safety engine, read from the DHT.

use std::collections::HashSet;

use async_trait::async_trait;
use hdk::prelude::*;
use stack_integrity::{LinkTypes, SubstanceInteraction, SupplementSubstance};
use whatdose_safety as safety;
use whatdose_safety::{InteractionRecord, LookupError, SafetyStore, SubstanceId, SupplementId};

use crate::{find_substance, find_supplement, lookup_error, records_from_links, substance_anchor, supplement_anchor};

/// Reads the shared catalog through anchor links
pub struct DhtSafetyStore;

fn substance_rows(supplement_ids: &[SupplementId]) -> ExternResult<Vec<safety::SupplementSubstance>> {
    let mut rows = Vec::new();
    for id in supplement_ids {
        let mappings = records_from_links(supplement_anchor(*id)?, LinkTypes::SupplementToSubstances)?;
        for record in mappings {
            let Some(mapping) = record.entry().to_app_option::<SupplementSubstance>().ok().flatten() else {
                continue;
            };
            let substance_name = find_substance(mapping.substance_id)?
                .map(|s| s.name)
                .unwrap_or_default();
            rows.push(safety::SupplementSubstance {
                supplement_id: mapping.supplement_id,
                substance_id: mapping.substance_id,
                substance_name,
            });
        }
    }
    Ok(rows)
}

/// One row per interaction record, however many substance anchors reached it
fn unique_interactions(
    found: impl IntoIterator<Item = (ActionHash, SubstanceInteraction)>,
) -> Vec<InteractionRecord> {
    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(hash, _)| seen.insert(hash.clone()))
        .map(|(_, interaction)| InteractionRecord {
            substance_a: interaction.substance_a,
            substance_b: interaction.substance_b,
            severity: interaction.severity,
            mechanism: interaction.mechanism,
            description: interaction.description,
            evidence_level: interaction.evidence_level,
        })
        .collect()
}

fn interaction_rows(substance_ids: &[SubstanceId]) -> ExternResult<Vec<InteractionRecord>> {
    let mut found = Vec::new();
    for id in substance_ids {
        let records = records_from_links(substance_anchor(*id)?, LinkTypes::SubstanceToInteractions)?;
        for record in records {
            if let Some(interaction) = record.entry().to_app_option::<SubstanceInteraction>().ok().flatten() {
                found.push((record.action_address().clone(), interaction));
            }
        }
    }
    Ok(unique_interactions(found))
}

#[async_trait]
impl SafetyStore for DhtSafetyStore {
    async fn substances_for(
        &self,
        supplement_ids: &[SupplementId],
    ) -> Result<Vec<safety::SupplementSubstance>, LookupError> {
        substance_rows(supplement_ids).map_err(lookup_error)
    }

    async fn interactions_among(
        &self,
        substance_ids: &[SubstanceId],
    ) -> Result<Vec<InteractionRecord>, LookupError> {
        interaction_rows(substance_ids).map_err(lookup_error)
    }

    async fn supplement_name(&self, id: SupplementId) -> Result<Option<String>, LookupError> {
        find_supplement(id)
            .map(|found| found.map(|(_, supplement)| supplement.name))
            .map_err(lookup_error)
    }
}
