use serde::{Deserialize, Serialize};

/// Marker written in place of an absent value in a delivered row.
pub const NOT_AVAILABLE: &str = "N/A";

/// One business extracted from a listing page and its own website.
///
/// Built once per listing and never mutated after it is handed to the
/// session observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: Option<String>,
    /// Display phone with everything except digits, `+`, spaces,
    /// parentheses, and hyphens removed.
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    /// Contact emails in discovery order, without duplicates.
    pub emails: Vec<String>,
    /// At most one link per social platform, capped.
    pub socials: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f32>,
    /// Final URL of the listing page after navigation.
    pub source_url: String,
}

impl PlaceRecord {
    /// Returns `true` if the record carries a coordinate pair.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Flattens the record into the string row handed to exporters.
    #[must_use]
    pub fn to_row(&self) -> PlaceRow {
        PlaceRow::from(self)
    }
}

/// String-only view of a [`PlaceRecord`] with explicit `N/A` markers and
/// comma-joined lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRow {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub emails: String,
    pub socials: String,
    pub latitude: String,
    pub longitude: String,
    pub rating: String,
    pub url: String,
}

impl From<&PlaceRecord> for PlaceRow {
    fn from(record: &PlaceRecord) -> Self {
        Self {
            name: or_marker(record.name.as_deref()),
            phone: or_marker(record.phone.as_deref()),
            address: or_marker(record.address.as_deref()),
            website: or_marker(record.website.as_deref()),
            emails: join_or_marker(&record.emails),
            socials: join_or_marker(&record.socials),
            latitude: record
                .latitude
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string()),
            longitude: record
                .longitude
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string()),
            rating: record
                .rating
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}")),
            url: record.source_url.clone(),
        }
    }
}

fn or_marker(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| NOT_AVAILABLE.to_string(), str::to_string)
}

fn join_or_marker(values: &[String]) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(", ")
    }
}
