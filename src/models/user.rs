//! User record as read from the `users` collection.

use serde::{Deserialize, Deserializer, Serialize};

/// User profile stored in Firestore, keyed by Firebase uid.
///
/// Account management owns these documents; this service only reads the
/// admin flag. Other profile fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// True only when the stored value is the boolean `true`
    #[serde(default, deserialize_with = "deserialize_strict_true")]
    pub is_admin: bool,
}

/// Accept any stored value; only a literal boolean `true` grants admin.
fn deserialize_strict_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(matches!(value, serde_json::Value::Bool(true)))
}
