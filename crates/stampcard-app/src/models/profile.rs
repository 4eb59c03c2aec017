//! User profile documents.

use super::{nullable, ANONYMOUS};
use crate::store::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stampcard_core::UnlockCondition;

/// A user's profile, `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "nullable")]
    pub uid: String,

    /// Display name, `None` if never set
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub goal: String,

    /// Uploaded avatar, overrides the built-in icon
    #[serde(default)]
    pub custom_image_uri: Option<String>,

    /// Index into the built-in icon set
    #[serde(default, deserialize_with = "nullable")]
    pub selected_icon_index: u32,

    #[serde(default, deserialize_with = "nullable")]
    pub stamp_conditions: Vec<UnlockCondition>,
}

impl UserProfile {
    /// Fresh profile for a new user.
    pub fn new(uid: impl Into<String>, name: Option<String>, conditions: Vec<UnlockCondition>) -> Self {
        Self {
            uid: uid.into(),
            name,
            goal: String::new(),
            custom_image_uri: None,
            selected_icon_index: 0,
            stamp_conditions: conditions,
        }
    }

    /// Name to show, falling back to "Anonymous".
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        }
    }
}

/// Partial profile edit. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub custom_image_uri: Option<String>,
    pub selected_icon_index: Option<u32>,
}

impl ProfileUpdate {
    /// Fields to merge into the stored profile.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(name) = &self.name {
            fields.insert("name".into(), Value::from(name.trim()));
        }
        if let Some(goal) = &self.goal {
            fields.insert("goal".into(), Value::from(goal.as_str()));
        }
        if let Some(uri) = &self.custom_image_uri {
            fields.insert("customImageUri".into(), Value::from(uri.as_str()));
        }
        if let Some(index) = self.selected_icon_index {
            fields.insert("selectedIconIndex".into(), Value::from(index));
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.to_fields().is_empty()
    }
}

/// A user listed on the "stamp someone" screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StampTarget {
    pub user_id: String,
    pub name: String,
    pub icon_uri: Option<String>,
    /// Unlocked slots without a stamp yet
    pub unstamped: u64,
}
