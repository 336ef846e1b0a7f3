use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::Actor;
use crate::error::DomainError;
use crate::model::validation::{Rule, RuleSet, as_integer};
use crate::model::{Attributes, Model, RecordState};

/// Post entity - a blog post owned by its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub category_id: i64,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Create an empty post owned by `author_id`, to be filled before insert.
    pub fn draft(author_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            category_id: 0,
            title: String::new(),
            body: String::new(),
            image: None,
            url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Column writes for the given changed attributes, taken from the current values.
    pub fn patch<'a>(&self, changed: impl IntoIterator<Item = &'a str>) -> PostPatch {
        let mut patch = PostPatch::new(self.updated_at);
        for field in changed {
            match field {
                "title" => patch.title = Some(self.title.clone()),
                "body" => patch.body = Some(self.body.clone()),
                "category_id" => patch.category_id = Some(self.category_id),
                "image" => patch.image = Some(self.image.clone()),
                "url" => patch.url = Some(self.url.clone()),
                _ => {}
            }
        }
        patch
    }
}

/// Partial update of a live post. `None` leaves the column as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_id: Option<i64>,
    pub image: Option<Option<String>>,
    pub url: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl PostPatch {
    pub fn new(updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            body: None,
            category_id: None,
            image: None,
            url: None,
            updated_at,
        }
    }

    /// Write the patched columns onto `post`.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(category_id) = self.category_id {
            post.category_id = category_id;
        }
        if let Some(image) = &self.image {
            post.image = image.clone();
        }
        if let Some(url) = &self.url {
            post.url = url.clone();
        }
        post.updated_at = self.updated_at;
    }
}

impl Model for Post {
    const ENTITY: &'static str = "post";
    const FILLABLE: &'static [&'static str] = &["title", "body", "category_id", "image", "url"];

    fn rules(&self, state: RecordState) -> RuleSet {
        match state {
            RecordState::New => RuleSet::new()
                .field("title", Rule::required().string().min(3).max(200))
                .field("body", Rule::required().string().min(3).max(10_000))
                .field("category_id", Rule::required())
                .field("image", Rule::sometimes().string().nullable()),
            RecordState::Persisted => RuleSet::new()
                .field("title", Rule::sometimes().string().min(3).max(200))
                .field("body", Rule::sometimes().string().min(3).max(10_000))
                .field("category_id", Rule::sometimes().integer())
                .field("image", Rule::sometimes().string().nullable()),
        }
    }

    fn authorize(&self, actor: &Actor) -> bool {
        actor.id == Some(self.author_id)
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("title".to_string(), json!(self.title));
        attributes.insert("body".to_string(), json!(self.body));
        attributes.insert("category_id".to_string(), json!(self.category_id));
        attributes.insert("image".to_string(), json!(self.image));
        attributes.insert("url".to_string(), json!(self.url));
        attributes
    }

    fn fill(&mut self, attributes: &Attributes) -> Result<(), DomainError> {
        for (key, value) in attributes {
            match key.as_str() {
                "title" => self.title = text(key, value)?,
                "body" => self.body = text(key, value)?,
                // The create rule only demands presence; the column is an integer.
                "category_id" => {
                    self.category_id = as_integer(value).ok_or_else(|| {
                        DomainError::Validation("The category id must be an integer.".to_string())
                    })?
                }
                "image" => self.image = optional_text(value),
                "url" => self.url = optional_text(value),
                _ => {}
            }
        }
        Ok(())
    }
}

fn text(key: &str, value: &Value) -> Result<String, DomainError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DomainError::Validation(format!("The {} must be a string.", key)))
}

fn optional_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
