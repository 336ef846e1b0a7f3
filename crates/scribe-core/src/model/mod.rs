//! Base record contract shared by every guarded entity.
//!
//! A concrete entity implements [`Model`] to supply its rule sets and ownership
//! predicate. [`Record`] wraps the entity, remembers what it looked like when it was
//! loaded and stages incoming changes, so the lifecycle checks in [`lifecycle`] only
//! ever see the attributes that actually changed.

pub mod lifecycle;
pub mod validation;

use serde_json::Value;

use crate::domain::Actor;
use crate::error::DomainError;
use validation::{AttributeNames, Messages, RuleSet};

/// Loosely typed attribute map, as received from a request or read off a model.
pub type Attributes = serde_json::Map<String, Value>;

/// Whether a record already has a stored identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Not yet inserted; the create rule set applies.
    New,
    /// Loaded from storage; the update rule set applies.
    Persisted,
}

/// Contract every guarded entity fulfils.
pub trait Model: Send + Sync {
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Attributes a caller may mass-assign through [`Record::fill`].
    const FILLABLE: &'static [&'static str];

    /// Rules applied to the changed attributes before a save.
    fn rules(&self, state: RecordState) -> RuleSet;

    /// Whether `actor` owns the record and may mutate it.
    fn authorize(&self, actor: &Actor) -> bool;

    /// Custom validation messages keyed `"field.constraint"`.
    fn messages(&self) -> Messages {
        Messages::new()
    }

    /// Custom display names for fields.
    fn attribute_names(&self) -> AttributeNames {
        AttributeNames::new()
    }

    /// Current values of the mass-assignable attributes.
    fn attributes(&self) -> Attributes;

    /// Write already validated attributes onto the typed model.
    fn fill(&mut self, attributes: &Attributes) -> Result<(), DomainError>;
}

/// A model plus its persistence state and staged changes.
#[derive(Debug, Clone)]
pub struct Record<M> {
    model: M,
    state: RecordState,
    original: Attributes,
    pending: Attributes,
}

impl<M: Model> Record<M> {
    /// Wrap a model that has never been stored.
    pub fn new(model: M) -> Self {
        Self {
            model,
            state: RecordState::New,
            original: Attributes::new(),
            pending: Attributes::new(),
        }
    }

    /// Wrap a model just read from storage.
    pub fn loaded(model: M) -> Self {
        let original = model.attributes();
        Self {
            model,
            state: RecordState::Persisted,
            original,
            pending: Attributes::new(),
        }
    }

    /// Stage every fillable key of `payload`. Other keys are dropped.
    pub fn fill(&mut self, payload: &Attributes) -> &mut Self {
        for (key, value) in payload {
            if M::FILLABLE.contains(&key.as_str()) {
                self.pending.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(entity = M::ENTITY, field = %key, "Ignoring non-fillable attribute");
            }
        }
        self
    }

    /// Staged attributes that differ from the loaded values.
    pub fn dirty(&self) -> Attributes {
        self.pending
            .iter()
            .filter(|(key, value)| self.changed(key, value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.pending.iter().any(|(key, value)| self.changed(key, value))
    }

    fn changed(&self, key: &str, value: &Value) -> bool {
        match self.original.get(key) {
            Some(original) => !equivalent(original, value),
            None => true,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn exists(&self) -> bool {
        self.state == RecordState::Persisted
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access for fields outside the fillable set (ownership, timestamps).
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Write the dirty attributes onto the model and clear the stage.
    pub fn apply_changes(&mut self) -> Result<&M, DomainError> {
        let dirty = self.dirty();
        self.model.fill(&dirty)?;
        self.pending.clear();
        Ok(&self.model)
    }

    /// Record that the current model state has been written.
    pub fn mark_persisted(&mut self) {
        self.original = self.model.attributes();
        self.pending.clear();
        self.state = RecordState::Persisted;
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

/// Equal values, or two readings of the same integer such as `3` and `"3"`.
fn equivalent(original: &Value, value: &Value) -> bool {
    if original == value {
        return true;
    }
    match (validation::as_integer(original), validation::as_integer(value)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
