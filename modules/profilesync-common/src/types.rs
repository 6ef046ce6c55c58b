use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProfileSyncError;

// --- Networks ---

/// A tracked social platform. Adding a platform means adding a variant here
/// and a cascade for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Twitter,
    Instagram,
}

impl Network {
    /// Every tracked network, in processing order.
    pub const ALL: [Network; 2] = [Network::Twitter, Network::Instagram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Twitter => "twitter",
            Network::Instagram => "instagram",
        }
    }

    /// File name a downloaded profile image is stored under.
    pub fn image_file_name(&self) -> &'static str {
        match self {
            Network::Twitter => "twitter_profile.jpg",
            Network::Instagram => "insta_profile.jpg",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Network::Twitter),
            "instagram" => Ok(Network::Instagram),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

// --- Profile snapshot ---

/// Normalized profile data for one network at one point in time.
///
/// Reading is lenient: missing or null strings become empty, counts that are
/// missing, null, negative or not numbers become 0. Keys written by older
/// versions are accepted through aliases, and anything unrecognized is kept
/// in `extra` so it survives a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,

    #[serde(rename = "name", default, deserialize_with = "lenient_string")]
    pub display_name: String,

    #[serde(
        default,
        alias = "description",
        alias = "biography",
        deserialize_with = "lenient_string"
    )]
    pub bio: String,

    #[serde(rename = "followers", default, deserialize_with = "lenient_count")]
    pub follower_count: u64,

    #[serde(rename = "following", default, deserialize_with = "lenient_count")]
    pub following_count: u64,

    /// Tweets on Twitter, media items on Instagram.
    #[serde(
        rename = "posts",
        alias = "tweets",
        alias = "media_count",
        default,
        deserialize_with = "lenient_count"
    )]
    pub post_count: u64,

    /// Remote URL or local path of the profile image.
    #[serde(
        rename = "image",
        alias = "profile_image_path",
        default,
        deserialize_with = "lenient_optional_string"
    )]
    pub image_reference: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let s = lenient_string(deserializer)?;
    Ok(if s.trim().is_empty() { None } else { Some(s) })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(count_from_value(&Value::deserialize(deserializer)?))
}

/// Coerce an arbitrary JSON value into a non-negative count.
pub fn count_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Clamp a signed upstream count to the non-negative range.
pub fn clamp_count(count: Option<i64>) -> u64 {
    count.map(|c| c.max(0) as u64).unwrap_or(0)
}

// --- Persisted snapshot ---

/// The on-disk document: one entry per network plus `last_updated`.
///
/// Top-level keys that are neither a tracked network nor `last_updated` are
/// kept in `extra` and written back unchanged. Entries read from disk are
/// also written back exactly as read (apart from invalid counts, which are
/// repaired in place) until [`PersistedSnapshot::set_profile`] replaces them.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSnapshot {
    pub last_updated: Option<DateTime<Utc>>,
    pub profiles: BTreeMap<Network, ProfileSnapshot>,
    pub extra: Map<String, Value>,
    stored: BTreeMap<Network, Map<String, Value>>,
}

const LAST_UPDATED_KEY: &str = "last_updated";

/// Count keys of current and older layouts.
const COUNT_KEYS: [&str; 5] = ["followers", "following", "posts", "tweets", "media_count"];

impl Default for PersistedSnapshot {
    fn default() -> Self {
        Self::scaffold()
    }
}

impl PersistedSnapshot {
    /// Every tracked network present with zero-valued data.
    pub fn scaffold() -> Self {
        Self {
            last_updated: None,
            profiles: Network::ALL
                .iter()
                .map(|n| (*n, ProfileSnapshot::default()))
                .collect(),
            extra: Map::new(),
            stored: BTreeMap::new(),
        }
    }

    pub fn profile(&self, network: Network) -> Option<&ProfileSnapshot> {
        self.profiles.get(&network)
    }

    /// Replace a network's entry with freshly fetched data. The entry is
    /// written in the current layout from then on.
    pub fn set_profile(&mut self, network: Network, profile: ProfileSnapshot) {
        self.stored.remove(&network);
        self.profiles.insert(network, profile);
    }

    /// Whether the network's entry will be written back as it was read.
    pub fn is_stored_verbatim(&self, network: Network) -> bool {
        self.stored.contains_key(&network)
    }

    /// Build from a parsed JSON document. Tracked networks missing from the
    /// document get zero-valued entries; a tracked entry that is not a
    /// profile object makes the whole document corrupt.
    pub fn from_json(value: Value) -> Result<Self, ProfileSyncError> {
        let Value::Object(mut root) = value else {
            return Err(ProfileSyncError::PersistenceCorrupt(
                "root is not a JSON object".to_string(),
            ));
        };

        let last_updated = root
            .remove(LAST_UPDATED_KEY)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let mut profiles = BTreeMap::new();
        let mut stored = BTreeMap::new();
        for network in Network::ALL {
            let profile = match root.remove(network.as_str()) {
                Some(Value::Object(mut entry)) => {
                    repair_counts(&mut entry);
                    let profile = ProfileSnapshot::deserialize(Value::Object(entry.clone()))
                        .map_err(|e| {
                            ProfileSyncError::PersistenceCorrupt(format!("{network} entry: {e}"))
                        })?;
                    stored.insert(network, entry);
                    profile
                }
                Some(other) => {
                    return Err(ProfileSyncError::PersistenceCorrupt(format!(
                        "{network} entry is not an object: {other}"
                    )))
                }
                None => ProfileSnapshot::default(),
            };
            profiles.insert(network, profile);
        }

        Ok(Self {
            last_updated,
            profiles,
            extra: root,
            stored,
        })
    }

    pub fn to_json(&self) -> Result<Value, ProfileSyncError> {
        let mut root = self.extra.clone();
        for (network, profile) in &self.profiles {
            let entry = match self.stored.get(network) {
                Some(entry) => Value::Object(entry.clone()),
                None => serde_json::to_value(profile)?,
            };
            root.insert(network.as_str().to_string(), entry);
        }
        if let Some(ts) = self.last_updated {
            root.insert(
                LAST_UPDATED_KEY.to_string(),
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
        Ok(Value::Object(root))
    }
}

/// Rewrite count values that are negative, null or not numbers as the
/// non-negative integer they read as. Valid counts and every other key are
/// left untouched.
fn repair_counts(entry: &mut Map<String, Value>) {
    for key in COUNT_KEYS {
        if let Some(value) = entry.get_mut(key) {
            if value.as_u64().is_none() {
                *value = Value::from(count_from_value(value));
            }
        }
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp (read as UTC) from older files.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_empty_and_zero() {
        let profile: ProfileSnapshot = serde_json::from_value(json!({"followers": 12})).unwrap();
        assert_eq!(profile.follower_count, 12);
        assert_eq!(profile.following_count, 0);
        assert_eq!(profile.username, "");
        assert!(profile.image_reference.is_none());
    }

    #[test]
    fn bad_counts_read_as_zero() {
        let profile: ProfileSnapshot = serde_json::from_value(json!({
            "followers": -5,
            "following": null,
            "posts": "lots",
        }))
        .unwrap();
        assert_eq!(profile.follower_count, 0);
        assert_eq!(profile.following_count, 0);
        assert_eq!(profile.post_count, 0);
    }

    #[test]
    fn older_key_names_are_accepted() {
        let profile: ProfileSnapshot = serde_json::from_value(json!({
            "username": "devacct",
            "description": "hello",
            "tweets": 40,
            "profile_image_path": "img/twitter_profile.jpg",
        }))
        .unwrap();
        assert_eq!(profile.bio, "hello");
        assert_eq!(profile.post_count, 40);
        assert_eq!(
            profile.image_reference.as_deref(),
            Some("img/twitter_profile.jpg")
        );
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let profile: ProfileSnapshot = serde_json::from_value(json!({
            "username": "photos",
            "account_type": "BUSINESS",
        }))
        .unwrap();
        assert_eq!(profile.extra["account_type"], "BUSINESS");

        let written = serde_json::to_value(&profile).unwrap();
        assert_eq!(written["account_type"], "BUSINESS");
        assert_eq!(written["followers"], 0);
        assert_eq!(written["image"], Value::Null);
    }

    #[test]
    fn clamp_count_never_goes_negative() {
        assert_eq!(clamp_count(Some(-1)), 0);
        assert_eq!(clamp_count(None), 0);
        assert_eq!(clamp_count(Some(77)), 77);
    }

    #[test]
    fn document_missing_a_network_gets_a_zero_entry() {
        let doc = PersistedSnapshot::from_json(json!({
            "twitter": {"followers": 100},
            "last_updated": "2025-03-01T12:30:00.123456",
            "theme": "dark",
        }))
        .unwrap();

        assert_eq!(doc.profile(Network::Twitter).unwrap().follower_count, 100);
        assert_eq!(doc.profile(Network::Instagram).unwrap().follower_count, 0);
        assert_eq!(doc.extra["theme"], "dark");
        assert!(doc.last_updated.is_some());
    }

    #[test]
    fn non_object_entry_is_corrupt() {
        let err = PersistedSnapshot::from_json(json!({"twitter": [1, 2, 3]})).unwrap_err();
        assert!(matches!(err, ProfileSyncError::PersistenceCorrupt(_)));

        let err = PersistedSnapshot::from_json(json!("just a string")).unwrap_err();
        assert!(matches!(err, ProfileSyncError::PersistenceCorrupt(_)));
    }

    #[test]
    fn to_json_writes_every_network_and_extras() {
        let mut doc = PersistedSnapshot::scaffold();
        doc.extra.insert("theme".into(), json!("dark"));
        doc.last_updated = DateTime::parse_from_rfc3339("2025-03-01T12:30:00Z")
            .ok()
            .map(|t| t.with_timezone(&Utc));

        let value = doc.to_json().unwrap();
        assert_eq!(value["twitter"]["followers"], 0);
        assert_eq!(value["instagram"]["followers"], 0);
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["last_updated"], "2025-03-01T12:30:00Z");

        let reread = PersistedSnapshot::from_json(value).unwrap();
        assert_eq!(reread.profiles, doc.profiles);
        assert_eq!(reread.extra, doc.extra);
        assert_eq!(reread.last_updated, doc.last_updated);
    }

    #[test]
    fn entries_read_from_disk_are_written_back_as_read() {
        let legacy = json!({
            "username": "devacct",
            "description": "hi",
            "tweets": 42,
            "profile_image_path": "img/twitter_profile.jpg",
            "profile_image_url": "https://pbs.twimg.com/a_400x400.jpg",
        });
        let doc = PersistedSnapshot::from_json(json!({
            "twitter": legacy.clone(),
            "instagram": {"followers": 0},
        }))
        .unwrap();

        assert!(doc.is_stored_verbatim(Network::Twitter));
        assert_eq!(doc.profile(Network::Twitter).unwrap().post_count, 42);

        let value = doc.to_json().unwrap();
        assert_eq!(value["twitter"], legacy);
        assert_eq!(value["instagram"], json!({"followers": 0}));
    }

    #[test]
    fn invalid_counts_are_repaired_in_place() {
        let doc = PersistedSnapshot::from_json(json!({
            "twitter": {"description": "hi", "followers": -20, "following": null, "tweets": "7"},
        }))
        .unwrap();

        let value = doc.to_json().unwrap();
        assert_eq!(
            value["twitter"],
            json!({"description": "hi", "followers": 0, "following": 0, "tweets": 7})
        );
    }

    #[test]
    fn set_profile_switches_the_entry_to_the_current_layout() {
        let mut doc = PersistedSnapshot::from_json(json!({
            "twitter": {"description": "old", "tweets": 1},
        }))
        .unwrap();

        doc.set_profile(
            Network::Twitter,
            ProfileSnapshot {
                username: "devacct".into(),
                bio: "new".into(),
                post_count: 2,
                ..Default::default()
            },
        );

        assert!(!doc.is_stored_verbatim(Network::Twitter));
        let value = doc.to_json().unwrap();
        assert_eq!(value["twitter"]["bio"], "new");
        assert_eq!(value["twitter"]["posts"], 2);
        assert!(value["twitter"].get("description").is_none());
    }

    #[test]
    fn network_parses_from_names() {
        assert_eq!("Twitter".parse::<Network>().unwrap(), Network::Twitter);
        assert_eq!("x".parse::<Network>().unwrap(), Network::Twitter);
        assert!("myspace".parse::<Network>().is_err());
    }
}
