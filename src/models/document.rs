use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Where a document currently lives in Reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    New,
    Later,
    Shortlist,
    Archive,
    Feed,
    Other(String),
}

impl Location {
    pub fn as_str(&self) -> &str {
        match self {
            Location::New => "new",
            Location::Later => "later",
            Location::Shortlist => "shortlist",
            Location::Archive => "archive",
            Location::Feed => "feed",
            Location::Other(s) => s,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::Other(String::new())
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new" => Location::New,
            "later" => Location::Later,
            "shortlist" => Location::Shortlist,
            "archive" => Location::Archive,
            "feed" => Location::Feed,
            _ => Location::Other(s),
        }
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.as_str().to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as returned by the Reader list endpoint.
///
/// Only `location`, `saved_at` and `last_moved_at` drive the stats. The
/// rest is carried through storage untouched, including fields this struct
/// does not know about (kept in `extra`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Missing or null reads as an empty `Other`, which no stat counts.
    #[serde(default, deserialize_with = "nullable_location")]
    pub location: Location,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub reading_progress: Option<f64>,
    /// Reader sends either epoch millis or a date string here.
    #[serde(default)]
    pub published_date: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub first_opened_at: Option<String>,
    #[serde(default)]
    pub last_opened_at: Option<String>,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub last_moved_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// When the document entered "later".
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at.as_deref().and_then(parse_timestamp)
    }

    /// When the document was moved to its current location.
    pub fn last_moved_at(&self) -> Option<DateTime<Utc>> {
        self.last_moved_at.as_deref().and_then(parse_timestamp)
    }

    pub fn is_archived(&self) -> bool {
        self.location == Location::Archive
    }
}

fn nullable_location<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Location, D::Error> {
    let location = Option::<String>::deserialize(deserializer)?;
    Ok(location.map(Location::from).unwrap_or_default())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    // Reader uses RFC3339 (e.g., "2024-09-30T17:04:12.345678+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Bare date-times are treated as UTC
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}
