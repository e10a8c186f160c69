use serde::{Deserialize, Serialize};

/// Wrapper for list responses from the feed API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub results: T,
}

/// One geolocated entry from the bulk areas listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedArea {
    pub entry_id: i64,
    /// `[latitude, longitude]`
    pub loc: [f64; 2],
    pub epoch: i64,
}

/// The expensive per-entry payload: the full scraped message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: i64,
    #[serde(default)]
    pub full_text: String,
}
