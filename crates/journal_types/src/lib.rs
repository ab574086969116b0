use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

pub type AccountId = Uuid;
pub type FieldId = String;

pub type Snapshot = IndexMap<FieldId, FieldValue>;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar day in fixed-width `YYYY-MM-DD` form.
///
/// Ordering is plain string ordering, which matches chronological order only
/// because the format is fixed width. Deserialization accepts any string so a
/// foreign or hand-edited collection still loads; use [`EntryDate::parse`] for
/// user input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryDate(String);

impl EntryDate {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let bytes = value.as_bytes();
        if bytes.len() != 10 {
            return None;
        }
        let shape_ok = bytes.iter().enumerate().all(|(ix, b)| match ix {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
        if !shape_ok {
            return None;
        }
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .ok()
            .map(|_| Self(value.to_string()))
    }

    pub fn today() -> Self {
        Self::from_naive(Local::now().date_naive())
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format(DATE_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short human form, e.g. `Mar 1, 2024`. Falls back to the raw string.
    pub fn human(&self) -> String {
        match NaiveDate::parse_from_str(&self.0, DATE_FORMAT) {
            Ok(date) => date.format("%b %-d, %Y").to_string(),
            Err(_) => self.0.clone(),
        }
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First `date` parameter of a URL query string, if well formed.
pub fn date_from_query(query: &str) -> Option<EntryDate> {
    let query = query.trim().trim_start_matches('?');
    let raw = query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == "date")
        .map(|(_, value)| value)?;
    EntryDate::parse(raw)
}

/// A single captured form value.
///
/// Capture only ever produces `Flag`, `Text` and `Files`. The other variants
/// let snapshots written by other clients decode and be written back as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Files {
        #[serde(rename = "fileCount")]
        file_count: u32,
    },
    Number(Number),
    Null,
    Other(Value),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(value) => value.clone(),
            FieldValue::Number(value) => value.to_string(),
            _ => String::new(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Flag(value) => *value,
            FieldValue::Text(value) => !value.is_empty(),
            FieldValue::Number(value) => value.as_f64().is_some_and(|n| n != 0.0),
            FieldValue::Files { .. } | FieldValue::Other(_) => true,
            FieldValue::Null => false,
        }
    }
}

/// One journaling record for a single calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub date: EntryDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub day: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mood: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub era: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationship_status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Snapshot,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Entry {
    pub fn from_snapshot(date: EntryDate, data: Snapshot, updated_at: i64) -> Self {
        let field = |id: &str| data.get(id).map(FieldValue::to_text).unwrap_or_default();
        Self {
            title: field("title").trim().to_string(),
            day: field("day"),
            mood: field("mood"),
            era: field("era"),
            relationship_status: field("relationshipStatus"),
            date,
            updated_at,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub email: String,
}

#[async_trait]
pub trait RemoteMirror: Send + Sync {
    async fn upsert(&self, account: &Account, entry: &Entry) -> Result<()>;

    async fn get_by_date(&self, account: &Account, date: &EntryDate) -> Result<Option<Snapshot>>;
}

#[async_trait]
pub trait SessionGate: Send + Sync {
    async fn current_account(&self) -> Result<Option<Account>>;
    async fn request_code(&self, email: &str) -> Result<()>;
    async fn verify_code(&self, email: &str, code: &str) -> Result<Account>;
    async fn sign_out(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_only_fixed_width_dates() {
        assert!(EntryDate::parse("2024-03-01").is_some());
        assert!(EntryDate::parse(" 2024-03-01 ").is_some());
        assert!(EntryDate::parse("2024-3-1").is_none());
        assert!(EntryDate::parse("2024-02-30").is_none());
        assert!(EntryDate::parse("20240301").is_none());
        assert!(EntryDate::parse("").is_none());
    }

    #[test]
    fn reads_date_from_query() {
        let date = date_from_query("?view=full&date=2024-03-01").expect("date");
        assert_eq!(date.as_str(), "2024-03-01");
        assert_eq!(date_from_query("date=garbage"), None);
        assert_eq!(date_from_query("?view=full"), None);
        assert_eq!(date_from_query(""), None);
    }

    #[test]
    fn formats_human_date() {
        let date = EntryDate::parse("2024-03-01").expect("date");
        assert_eq!(date.human(), "Mar 1, 2024");
    }

    #[test]
    fn decodes_mixed_field_values() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "mood": "Still Standing",
            "gymDay": true,
            "photos": {"fileCount": 2},
            "weight": 180,
            "legacy": null
        }))
        .expect("snapshot");

        assert_eq!(snapshot["mood"], FieldValue::text("Still Standing"));
        assert_eq!(snapshot["gymDay"], FieldValue::Flag(true));
        assert_eq!(snapshot["photos"], FieldValue::Files { file_count: 2 });
        assert_eq!(snapshot["weight"].to_text(), "180");
        assert_eq!(snapshot["legacy"], FieldValue::Null);
        assert_eq!(
            serde_json::to_value(&snapshot["photos"]).expect("encode"),
            json!({"fileCount": 2})
        );
    }

    #[test]
    fn foreign_entry_with_nulls_and_nested_values_decodes() {
        let entry: Entry = serde_json::from_value(json!({
            "date": "2024-01-01",
            "title": null,
            "updatedAt": null,
            "data": {"tags": ["a", "b"], "extra": {"k": 1}}
        }))
        .expect("entry");

        assert_eq!(entry.title, "");
        assert_eq!(entry.updated_at, 0);
        assert_eq!(entry.data["tags"], FieldValue::Other(json!(["a", "b"])));
        assert_eq!(entry.data["tags"].to_text(), "");
        assert!(entry.data["extra"].is_truthy());
        assert_eq!(
            serde_json::to_value(&entry.data).expect("encode")["tags"],
            json!(["a", "b"])
        );
    }

    #[test]
    fn entry_lifts_named_fields_from_snapshot() {
        let mut data = Snapshot::new();
        data.insert("title".into(), FieldValue::text("  Leg day  "));
        data.insert("mood".into(), FieldValue::text("Still Standing"));
        data.insert("relationshipStatus".into(), FieldValue::text("Choosing Myself"));
        let date = EntryDate::parse("2024-03-01").expect("date");

        let entry = Entry::from_snapshot(date, data, 7);
        assert_eq!(entry.title, "Leg day");
        assert_eq!(entry.mood, "Still Standing");
        assert_eq!(entry.relationship_status, "Choosing Myself");
        assert_eq!(entry.era, "");

        let encoded = serde_json::to_value(&entry).expect("encode");
        assert_eq!(encoded["relationshipStatus"], "Choosing Myself");
        assert_eq!(encoded["updatedAt"], 7);
    }
}
