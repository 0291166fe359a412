//! Effective rights of a caller on a subject.

use std::collections::BTreeSet;

use entity_registry_sdk::{CallerId, Subject};
use tracing::{debug, warn};

use super::error::DomainError;
use super::ports::RightsStorage;
use super::snapshot::RegistrySnapshot;

/// Computes effective rights from persisted grants.
///
/// Every failure collapses to an empty set, which the voter reads as a denial.
pub struct RightsAggregator<'a> {
    storage: &'a dyn RightsStorage,
}

impl<'a> RightsAggregator<'a> {
    #[must_use]
    pub fn new(storage: &'a dyn RightsStorage) -> Self {
        Self { storage }
    }

    /// Identifiers a rights check on `subject` must consider.
    ///
    /// A mapped superclass expands to itself plus every concrete descendant.
    /// An unregistered abstract type expands to its descendants only.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the subject resolves to nothing.
    pub fn expand_subject(
        snapshot: &RegistrySnapshot<'_>,
        subject: &Subject,
    ) -> Result<Vec<String>, DomainError> {
        if let Some(id) = snapshot.registered_subject(subject) {
            let record = snapshot.entity_record(&id)?;
            let mut expanded = vec![id];
            if record.is_mapped_superclass {
                for child in snapshot.children_of(&record.type_name)? {
                    if !expanded.contains(&child) {
                        expanded.push(child);
                    }
                }
            }
            return Ok(expanded);
        }

        let children = snapshot.children_of(subject.as_str())?;
        if children.is_empty() {
            return Err(DomainError::unknown_identifier(subject.as_str()));
        }
        Ok(children)
    }

    fn try_effective_rights(
        &self,
        snapshot: &RegistrySnapshot<'_>,
        subject: &Subject,
        caller: CallerId,
    ) -> Result<BTreeSet<String>, DomainError> {
        let subjects = Self::expand_subject(snapshot, subject)?;
        let rows = self.storage.find_grants(caller, &subjects)?;
        let reduced = self.storage.reduce_effective_rights(&rows);
        Ok(reduced.into_values().flatten().collect())
    }

    /// Union of the reduced rights over the expanded subject.
    #[must_use]
    pub fn effective_rights(
        &self,
        snapshot: &RegistrySnapshot<'_>,
        subject: &Subject,
        caller: CallerId,
    ) -> BTreeSet<String> {
        match self.try_effective_rights(snapshot, subject, caller) {
            Ok(rights) => rights,
            Err(DomainError::UnknownIdentifier(id)) => {
                debug!(subject = %id, %caller, "no rights for unresolvable subject");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(subject = subject.as_str(), %caller, error = %e, "rights resolution failed");
                BTreeSet::new()
            }
        }
    }
}
