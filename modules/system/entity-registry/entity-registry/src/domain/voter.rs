//! Two-phase access decision over registry entities.

use entity_registry_sdk::{Action, CallerId, Subject, Vote};
use tracing::debug;

use super::rights::RightsAggregator;
use super::snapshot::RegistrySnapshot;

/// Access voter.
///
/// Abstains unless the verb is recognized and the subject is a registered
/// entity. Denies whenever the effective rights are empty.
pub struct AccessVoter<'a> {
    aggregator: RightsAggregator<'a>,
}

impl<'a> AccessVoter<'a> {
    #[must_use]
    pub fn new(aggregator: RightsAggregator<'a>) -> Self {
        Self { aggregator }
    }

    /// Returns `true` if the voter takes part in the decision.
    #[must_use]
    pub fn supports(snapshot: &RegistrySnapshot<'_>, verb: &str, subject: &Subject) -> bool {
        Action::parse(verb).is_some() && snapshot.registered_subject(subject).is_some()
    }

    #[must_use]
    pub fn vote(
        &self,
        snapshot: &RegistrySnapshot<'_>,
        verb: &str,
        subject: &Subject,
        caller: CallerId,
    ) -> Vote {
        let (Some(action), Some(identifier)) =
            (Action::parse(verb), snapshot.registered_subject(subject))
        else {
            return Vote::Abstain;
        };

        let holder = snapshot.rights_holder(&identifier);
        let rights = self
            .aggregator
            .effective_rights(snapshot, &Subject::identifier(holder.as_str()), caller);

        let vote = if rights.contains(action.as_str()) {
            Vote::Granted
        } else {
            Vote::Denied
        };
        debug!(
            subject = %identifier,
            impersonated = %holder,
            action = %action,
            %caller,
            ?vote,
            "access vote"
        );
        vote
    }
}
