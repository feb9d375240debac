use crate::error::{Result, ScraperError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Nested content mapping of a note as returned by the OpenReview APIs.
/// API v2 wraps each field as `{"value": ...}`; v1 stores values directly.
pub type PaperContent = serde_json::Map<String, Value>;

/// Flattened output record produced by field extraction.
pub type FlatPaper = serde_json::Map<String, Value>;

/// A paper ("note") retrieved from one of the OpenReview APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    #[serde(default)]
    pub id: String,
    pub forum: String,
    #[serde(default)]
    pub content: PaperContent,
}

/// Unwraps an API v2 `{"value": ...}` field wrapper; v1 values pass through.
pub fn unwrap_value(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("value").unwrap_or(value),
        _ => value,
    }
}

impl Paper {
    /// Returns a searchable text rendering of a content field, unwrapping
    /// v2 value wrappers and joining string arrays.
    pub fn field_text(&self, field: &str) -> Option<String> {
        let value = unwrap_value(self.content.get(field)?);
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Inferred category of a venue id. Derived purely from substring presence;
/// the source guarantees no schema, so this is best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Track {
    Conference,
    Workshop,
    Other,
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Track::Conference => "Conference",
            Track::Workshop => "Workshop",
            Track::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// A venue id annotated with everything the matcher inferred about it,
/// including which substring drove the inference (for debugging false
/// classifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedVenue {
    pub id: String,
    pub conference: String,
    pub year: String,
    pub track: Track,
    pub matched_on: Option<String>,
}

/// Per-conference venue candidates, split by inferred track. Built fresh
/// each run and consumed by the priority selector; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ConferenceVenueSet {
    pub conference: Vec<ClassifiedVenue>,
    pub workshop: Vec<ClassifiedVenue>,
    pub other: Vec<ClassifiedVenue>,
}

impl ConferenceVenueSet {
    pub fn push(&mut self, venue: ClassifiedVenue) {
        match venue.track {
            Track::Conference => self.conference.push(venue),
            Track::Workshop => self.workshop.push(venue),
            Track::Other => self.other.push(venue),
        }
    }

    /// (conference, workshop, other) candidate counts, for audit logging.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.conference.len(), self.workshop.len(), self.other.len())
    }

    pub fn is_empty(&self) -> bool {
        self.conference.is_empty() && self.workshop.is_empty() && self.other.is_empty()
    }
}

/// Why a paper passed the filter pipeline: exactly one (filter, keyword)
/// pair, the first hit in predicate-major evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProvenance {
    pub filter: String,
    pub keyword: String,
}

impl MatchProvenance {
    /// Renders the provenance as the `match` content field written onto
    /// passing papers: `{"<filter>": "<keyword>"}`.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(self.filter.clone(), Value::String(self.keyword.clone()));
        Value::Object(map)
    }
}

/// The positional segments of a well-formed venue id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueParts {
    pub name: String,
    pub year: String,
    pub track: String,
}

/// Splits a venue id on `/` into its three positional segments.
///
/// The `<venue>/<year>/<track>` shape is a contract of the id format, not a
/// heuristic; an id with any other segment count is a data-integrity error.
pub fn split_venue_id(venue_id: &str) -> Result<VenueParts> {
    let segments: Vec<&str> = venue_id.split('/').collect();
    if segments.len() != 3 {
        return Err(ScraperError::MalformedVenueId(venue_id.to_string()));
    }
    Ok(VenueParts {
        name: segments[0].to_string(),
        year: segments[1].to_string(),
        track: segments[2].to_string(),
    })
}
