//! Pre-write checks run by services before handing a record to persistence.
//!
//! | Operation | Checks (in order)            |
//! |-----------|------------------------------|
//! | create    | validation                   |
//! | update    | validation, authorization    |
//! | delete    | authorization                |
//!
//! Creates are validated but not authorization-checked.

use crate::domain::Actor;
use crate::error::DomainError;
use crate::model::validation::Validator;
use crate::model::{Model, Record};

/// Role that may mutate records it does not own.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// Write operation about to be performed on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Run every check that guards `operation`.
pub fn guard<M: Model>(
    operation: Operation,
    record: &Record<M>,
    actor: &Actor,
) -> Result<(), DomainError> {
    match operation {
        Operation::Create => before_save(record),
        Operation::Update => {
            before_save(record)?;
            before_update(record, actor)
        }
        Operation::Delete => before_delete(record, actor),
    }
}

/// Runs before every create or update.
pub fn before_save<M: Model>(record: &Record<M>) -> Result<(), DomainError> {
    check_validation(record)
}

/// Runs before an update is written.
pub fn before_update<M: Model>(record: &Record<M>, actor: &Actor) -> Result<(), DomainError> {
    check_authorization(record.model(), actor)
}

/// Runs before a delete (soft or hard).
pub fn before_delete<M: Model>(record: &Record<M>, actor: &Actor) -> Result<(), DomainError> {
    check_authorization(record.model(), actor)
}

/// Validate the changed attributes against the rule set for the record's state.
pub fn check_validation<M: Model>(record: &Record<M>) -> Result<(), DomainError> {
    let model = record.model();
    let rules = model.rules(record.state());
    let messages = model.messages();
    let names = model.attribute_names();

    Validator::new(&rules)
        .with_messages(&messages)
        .with_attribute_names(&names)
        .validate(&record.dirty())
        .map_err(|errors| {
            tracing::debug!(
                entity = M::ENTITY,
                failures = errors.errors().len(),
                "Validation rejected write"
            );
            DomainError::from(errors)
        })
}

/// Owners pass, then authenticated administrators; everyone else is rejected.
pub fn check_authorization<M: Model>(model: &M, actor: &Actor) -> Result<(), DomainError> {
    if model.authorize(actor) {
        return Ok(());
    }

    if actor.is_authenticated() && actor.has_role(ADMINISTRATOR_ROLE) {
        tracing::debug!(entity = M::ENTITY, actor_id = ?actor.id, "Administrator override");
        return Ok(());
    }

    tracing::warn!(entity = M::ENTITY, actor_id = ?actor.id, "Authorization rejected write");
    Err(DomainError::NotAuthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{Note, payload};
    use serde_json::json;
    use uuid::Uuid;

    fn owned_note(owner: Uuid) -> Record<Note> {
        Record::loaded(Note {
            owner: Some(owner),
            text: "original".to_string(),
        })
    }

    #[test]
    fn test_create_validates_without_authorization() {
        let mut record = Record::new(Note::default());
        record.fill(&payload(json!({"text": "ok"})));

        assert!(guard(Operation::Create, &record, &Actor::guest()).is_ok());

        let empty = Record::new(Note::default());
        let err = guard(Operation::Create, &empty, &Actor::guest()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref msg) if msg == "The text field is required."));
    }

    #[test]
    fn test_update_validates_before_authorizing() {
        let mut record = owned_note(Uuid::new_v4());
        record.fill(&payload(json!({"text": "x"})));

        let stranger = Actor::user(Uuid::new_v4(), vec![]);
        let err = guard(Operation::Update, &record, &stranger).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_owner_may_update_and_delete() {
        let owner = Uuid::new_v4();
        let mut record = owned_note(owner);
        record.fill(&payload(json!({"text": "edited"})));
        let actor = Actor::user(owner, vec![]);

        assert!(guard(Operation::Update, &record, &actor).is_ok());
        assert!(guard(Operation::Delete, &record, &actor).is_ok());
    }

    #[test]
    fn test_stranger_is_rejected() {
        let record = owned_note(Uuid::new_v4());
        let stranger = Actor::user(Uuid::new_v4(), vec!["user".to_string()]);

        let err = guard(Operation::Delete, &record, &stranger).unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized));
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.to_string(), "Not authorized!");
    }

    #[test]
    fn test_administrator_overrides_ownership() {
        let record = owned_note(Uuid::new_v4());
        let admin = Actor::user(Uuid::new_v4(), vec![ADMINISTRATOR_ROLE.to_string()]);

        assert!(guard(Operation::Delete, &record, &admin).is_ok());
    }

    #[test]
    fn test_guest_with_admin_role_is_not_trusted() {
        let record = owned_note(Uuid::new_v4());
        let guest = Actor {
            id: None,
            roles: vec![ADMINISTRATOR_ROLE.to_string()],
        };

        assert!(matches!(
            check_authorization(record.model(), &guest),
            Err(DomainError::NotAuthorized)
        ));
    }
}
