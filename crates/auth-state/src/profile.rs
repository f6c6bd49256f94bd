//! User profile normalization.
//!
//! The "who am I" endpoint has answered with the profile itself and with the
//! profile wrapped under one of a few envelope keys. Both are accepted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ENVELOPE_KEYS: &[&str] = &["data", "user", "content", "result"];
const ID_KEYS: &[&str] = &["id", "userId"];

/// Normalized identity record. `id` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    /// Every other field of the source object.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            nickname: None,
            picture: None,
            profile_image: None,
            extra: Map::new(),
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.picture
            .as_deref()
            .or(self.profile_image.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Nickname, then name, then email.
    pub fn display_name(&self) -> Option<&str> {
        [&self.nickname, &self.name, &self.email]
            .into_iter()
            .find_map(|field| field.as_deref().filter(|s| !s.is_empty()))
    }

    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let id = ID_KEYS.iter().find_map(|key| obj.get(*key).and_then(coerce_id))?;

        let mut extra = obj.clone();
        for key in ID_KEYS {
            extra.remove(*key);
        }
        let mut take = |key: &str| match extra.remove(key) {
            Some(Value::String(s)) => Some(s),
            Some(other) if !other.is_null() => {
                extra.insert(key.to_string(), other);
                None
            }
            _ => None,
        };

        Some(Self {
            id,
            email: take("email"),
            name: take("name"),
            nickname: take("nickname"),
            picture: take("picture"),
            profile_image: take("profileImage"),
            extra,
        })
    }
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Find a profile in `body`, directly or under an envelope key.
///
/// Returns `None` when no object carries a usable `id`/`userId`, which the
/// caller treats as "not authenticated".
pub fn normalize_profile(body: &Value) -> Option<UserProfile> {
    let obj = body.as_object()?;
    if let Some(profile) = UserProfile::from_object(obj) {
        return Some(profile);
    }
    ENVELOPE_KEYS
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_object))
        .find_map(UserProfile::from_object)
}
