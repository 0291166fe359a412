//! In-memory rights storage.

use std::collections::{BTreeMap, BTreeSet};

use entity_registry_sdk::CallerId;
use parking_lot::RwLock;

use crate::domain::error::RightsStorageError;
use crate::domain::ports::{GrantEffect, GrantRow, RightsStorage};

/// Rights storage keeping grant rows in memory.
///
/// Reduction: a verb is effective for a subject when at least one row allows
/// it and no row denies it.
#[derive(Debug, Default)]
pub struct InMemoryRightsStorage {
    rows: RwLock<Vec<GrantRow>>,
}

impl InMemoryRightsStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, caller: CallerId, subject: &str, verbs: &[&str], effect: GrantEffect) {
        let mut rows = self.rows.write();
        rows.extend(verbs.iter().map(|verb| GrantRow {
            caller,
            subject: subject.to_owned(),
            verb: (*verb).to_owned(),
            effect,
        }));
    }

    /// Allows `verbs` on `subject` for `caller`.
    pub fn grant(&self, caller: CallerId, subject: &str, verbs: &[&str]) {
        self.push(caller, subject, verbs, GrantEffect::Allow);
    }

    /// Denies `verbs` on `subject` for `caller`, overriding any allow row.
    pub fn deny(&self, caller: CallerId, subject: &str, verbs: &[&str]) {
        self.push(caller, subject, verbs, GrantEffect::Deny);
    }

    /// Removes every row of `caller`.
    pub fn revoke_all(&self, caller: CallerId) {
        self.rows.write().retain(|row| row.caller != caller);
    }
}

impl RightsStorage for InMemoryRightsStorage {
    fn find_grants(
        &self,
        caller: CallerId,
        subjects: &[String],
    ) -> Result<Vec<GrantRow>, RightsStorageError> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|row| row.caller == caller && subjects.contains(&row.subject))
            .cloned()
            .collect())
    }

    fn reduce_effective_rights(&self, rows: &[GrantRow]) -> BTreeMap<String, BTreeSet<String>> {
        let denied: BTreeSet<(&str, &str)> = rows
            .iter()
            .filter(|row| row.effect == GrantEffect::Deny)
            .map(|row| (row.subject.as_str(), row.verb.as_str()))
            .collect();

        let mut effective: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows.iter().filter(|row| row.effect == GrantEffect::Allow) {
            if denied.contains(&(row.subject.as_str(), row.verb.as_str())) {
                continue;
            }
            effective
                .entry(row.subject.clone())
                .or_default()
                .insert(row.verb.clone());
        }
        effective
    }
}
