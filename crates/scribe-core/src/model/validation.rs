//! Declarative field constraints and the validator that evaluates them.
//!
//! A [`RuleSet`] maps field names to a [`Rule`]. Fields are checked in declaration
//! order and each field reports at most one failure, so the first message of a
//! [`ValidationErrors`] is always the earliest failing field.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use validator::{ValidateLength, ValidateRange, ValidateRequired};

use crate::error::DomainError;
use crate::model::Attributes;

/// Whether a field has to be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-empty.
    Required,
    /// Checked only when the key is present.
    Sometimes,
    /// Checked when present; an absent key passes.
    Optional,
}

/// Type constraint on a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Any,
    String,
    /// A JSON integer or a string of digits with an optional sign.
    Integer,
}

/// Constraints applied to a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub presence: Presence,
    pub kind: Kind,
    pub nullable: bool,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Rule {
    fn with_presence(presence: Presence) -> Self {
        Self {
            presence,
            kind: Kind::Any,
            nullable: false,
            min: None,
            max: None,
        }
    }

    pub fn required() -> Self {
        Self::with_presence(Presence::Required)
    }

    pub fn sometimes() -> Self {
        Self::with_presence(Presence::Sometimes)
    }

    pub fn optional() -> Self {
        Self::with_presence(Presence::Optional)
    }

    pub fn string(mut self) -> Self {
        self.kind = Kind::String;
        self
    }

    pub fn integer(mut self) -> Self {
        self.kind = Kind::Integer;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Inclusive lower bound: characters for strings, value for integers.
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Inclusive upper bound: characters for strings, value for integers.
    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }
}

/// Ordered mapping of field name to [`Rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<(&'static str, Rule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the rule for a field, keeping declaration order.
    pub fn field(mut self, name: &'static str, rule: Rule) -> Self {
        match self.rules.iter_mut().find(|(field, _)| *field == name) {
            Some(slot) => slot.1 = rule,
            None => self.rules.push((name, rule)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Rule)> {
        self.rules.iter().map(|(field, rule)| (*field, rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The individual check a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Required,
    String,
    Integer,
    Min,
    Max,
}

impl Constraint {
    /// Key used for custom messages (`"title.min"`).
    pub fn name(self) -> &'static str {
        match self {
            Constraint::Required => "required",
            Constraint::String => "string",
            Constraint::Integer => "integer",
            Constraint::Min => "min",
            Constraint::Max => "max",
        }
    }
}

/// Custom error messages keyed `"field.constraint"`.
///
/// Messages may use the `:attribute`, `:min` and `:max` placeholders.
pub type Messages = HashMap<String, String>;

/// Display names for fields, used in place of the derived `field name` label.
pub type AttributeNames = HashMap<String, String>;

/// One failed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub constraint: Constraint,
    pub message: String,
}

/// Ordered failures produced by [`Validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Message of the earliest failing field.
    pub fn first(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first().unwrap_or("The given data was invalid."))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(errors.to_string())
    }
}

/// What a size bound is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    Characters,
    Numeric,
    Items,
}

/// Evaluates attribute maps against a [`RuleSet`].
pub struct Validator<'a> {
    rules: &'a RuleSet,
    messages: Option<&'a Messages>,
    attribute_names: Option<&'a AttributeNames>,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            messages: None,
            attribute_names: None,
        }
    }

    pub fn with_messages(mut self, messages: &'a Messages) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_attribute_names(mut self, names: &'a AttributeNames) -> Self {
        self.attribute_names = Some(names);
        self
    }

    /// Check `data` against every rule. Keys without a rule are ignored.
    pub fn validate(&self, data: &Attributes) -> Result<(), ValidationErrors> {
        let errors: Vec<FieldError> = self
            .rules
            .iter()
            .filter_map(|(field, rule)| {
                check(rule, data.get(field)).err().map(|(constraint, measure)| FieldError {
                    field: field.to_string(),
                    constraint,
                    message: self.message(field, rule, constraint, measure),
                })
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors })
        }
    }

    fn attribute(&self, field: &str) -> String {
        self.attribute_names
            .and_then(|names| names.get(field))
            .cloned()
            .unwrap_or_else(|| field.replace('_', " "))
    }

    fn message(&self, field: &str, rule: &Rule, constraint: Constraint, measure: Measure) -> String {
        let template = self
            .messages
            .and_then(|m| m.get(&format!("{}.{}", field, constraint.name())))
            .map(String::as_str)
            .unwrap_or_else(|| default_message(constraint, measure));

        let min = rule.min.map(|v| v.to_string()).unwrap_or_default();
        let max = rule.max.map(|v| v.to_string()).unwrap_or_default();

        template
            .replace(":attribute", &self.attribute(field))
            .replace(":min", &min)
            .replace(":max", &max)
    }
}

fn default_message(constraint: Constraint, measure: Measure) -> &'static str {
    match (constraint, measure) {
        (Constraint::Required, _) => "The :attribute field is required.",
        (Constraint::String, _) => "The :attribute must be a string.",
        (Constraint::Integer, _) => "The :attribute must be an integer.",
        (Constraint::Min, Measure::Characters) => "The :attribute must be at least :min characters.",
        (Constraint::Min, Measure::Numeric) => "The :attribute must be at least :min.",
        (Constraint::Min, Measure::Items) => "The :attribute must have at least :min items.",
        (Constraint::Max, Measure::Characters) => {
            "The :attribute may not be greater than :max characters."
        }
        (Constraint::Max, Measure::Numeric) => "The :attribute may not be greater than :max.",
        (Constraint::Max, Measure::Items) => "The :attribute may not have more than :max items.",
    }
}

/// Run one rule against one (possibly absent) value.
fn check(rule: &Rule, value: Option<&Value>) -> Result<(), (Constraint, Measure)> {
    let supplied = value.filter(|value| !is_blank(value));
    if rule.presence == Presence::Required && !supplied.validate_required() {
        return Err((Constraint::Required, Measure::Characters));
    }

    let Some(value) = value else {
        return Ok(());
    };

    if value.is_null() && rule.nullable {
        return Ok(());
    }

    match rule.kind {
        Kind::String if !value.is_string() => return Err((Constraint::String, Measure::Characters)),
        Kind::Integer if as_integer(value).is_none() => {
            return Err((Constraint::Integer, Measure::Numeric));
        }
        _ => {}
    }

    if rule.min.is_none() && rule.max.is_none() {
        return Ok(());
    }

    let (fits_min, fits_max, measure) = match (rule.kind, value) {
        (Kind::Integer, _) | (_, Value::Number(_)) => {
            let Some(n) = as_integer(value) else {
                return Ok(());
            };
            (
                n.validate_range(rule.min, None, None, None),
                n.validate_range(None, rule.max, None, None),
                Measure::Numeric,
            )
        }
        (_, Value::String(s)) => {
            let (fits_min, fits_max) = length_within(s, rule);
            (fits_min, fits_max, Measure::Characters)
        }
        (_, Value::Array(items)) => {
            let (fits_min, fits_max) = length_within(items, rule);
            (fits_min, fits_max, Measure::Items)
        }
        _ => return Ok(()),
    };

    if !fits_min {
        return Err((Constraint::Min, measure));
    }
    if !fits_max {
        return Err((Constraint::Max, measure));
    }

    Ok(())
}

/// Length bounds of a string (in characters) or a list (in items).
fn length_within<L: ValidateLength<u64>>(subject: &L, rule: &Rule) -> (bool, bool) {
    let fits_min = subject.validate_length(
        rule.min.map(|min| u64::try_from(min).unwrap_or(0)),
        None,
        None,
    );
    // A negative maximum admits nothing.
    let fits_max = match rule.max {
        Some(max) => u64::try_from(max)
            .is_ok_and(|max| subject.validate_length(None, Some(max), None)),
        None => true,
    };
    (fits_min, fits_max)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Integer reading of a value: JSON integers and signed digit strings.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()
        }
        _ => None,
    }
}
