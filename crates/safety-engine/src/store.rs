//! Read-only lookups the checkers depend on.
//!
//! The engine never owns catalog data. Callers inject a [`SafetyStore`]
//! backed by whatever holds the catalog (the stack zome's DHT, an in-memory
//! table, a remote database).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{InteractionRecord, SubstanceId, SupplementId, SupplementSubstance};

/// A backing store call failed or timed out
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SafetyStore: Send + Sync {
    /// Substances contained in each of the given supplements.
    async fn substances_for(
        &self,
        supplement_ids: &[SupplementId],
    ) -> Result<Vec<SupplementSubstance>, LookupError>;

    /// Interaction records where either side is one of the given substances.
    async fn interactions_among(
        &self,
        substance_ids: &[SubstanceId],
    ) -> Result<Vec<InteractionRecord>, LookupError>;

    /// Catalog display name; `None` when the supplement is unknown.
    async fn supplement_name(&self, id: SupplementId) -> Result<Option<String>, LookupError>;
}
