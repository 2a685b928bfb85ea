//! Shared domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved game project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Opaque unique identifier assigned at creation.
    pub id: String,
    /// User supplied display name.
    pub name: String,
    /// Description the code was generated from.
    pub prompt: String,
    /// Generated source text.
    pub code: String,
    /// Timestamp of the original save.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last in-place update, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GameRecord {
    /// Copy the editable fields back out as a draft.
    pub fn to_draft(&self) -> Draft {
        Draft {
            name: self.name.clone(),
            prompt: self.prompt.clone(),
            code: self.code.clone(),
        }
    }

    /// True when name, prompt and code match the given draft.
    pub fn same_content(&self, draft: &Draft) -> bool {
        self.name == draft.name && self.prompt == draft.prompt && self.code == draft.code
    }
}

/// Unsaved working copy held by the lifecycle controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Working display name.
    pub name: String,
    /// Free-text game description.
    pub prompt: String,
    /// Most recently generated code, empty until generation succeeds.
    pub code: String,
}

impl Draft {
    /// Build a draft from its three parts.
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            code: code.into(),
        }
    }

    /// True when generation has produced code for this draft.
    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty()
    }
}
