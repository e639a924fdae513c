//! Safety engine bound to a catalog store and a policy.

use tracing::debug;

use crate::dosage::{check_dosages, DosageCheckItem};
use crate::interactions::check_interactions;
use crate::policy::SafetyPolicy;
use crate::report::SafetyReport;
use crate::store::SafetyStore;
use crate::types::{DosageWarning, InteractionWarning, SupplementId};

pub struct SafetyEngine<S> {
    store: S,
    policy: SafetyPolicy,
}

impl<S: SafetyStore> SafetyEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, SafetyPolicy::default())
    }

    pub fn with_policy(store: S, policy: SafetyPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    pub async fn check_interactions(&self, supplement_ids: &[SupplementId]) -> Vec<InteractionWarning> {
        check_interactions(&self.store, supplement_ids).await
    }

    pub fn check_dosages(&self, items: &[DosageCheckItem]) -> Vec<DosageWarning> {
        check_dosages(items, &self.policy.dosage)
    }

    /// Run both checkers over one stack snapshot.
    ///
    /// Always recomputes from scratch; callers rerun it whenever the stack's
    /// members or any dosage change.
    pub async fn check_stack(&self, items: &[DosageCheckItem]) -> SafetyReport {
        let ids: Vec<SupplementId> = items.iter().map(|item| item.supplement_id).collect();

        let dosage_warnings = self.check_dosages(items);
        let interaction_warnings = self.check_interactions(&ids).await;

        debug!(
            dosage = dosage_warnings.len(),
            interactions = interaction_warnings.len(),
            "stack safety check complete"
        );

        SafetyReport::new(dosage_warnings, interaction_warnings)
    }
}
