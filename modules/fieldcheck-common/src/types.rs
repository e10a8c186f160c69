use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier the upstream feed assigns to an entry.
pub type EntryId = i64;

/// Reason moderators submit when the scraped location needed no correction.
pub const NO_ERROR_REASON: &str = "Hata Yok";

// --- Locations ---

/// A geolocated entry offered for review.
///
/// `original_message` and `original_location` are only filled in on the
/// candidate handed back by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub entry_id: EntryId,
    /// `[latitude, longitude]`
    pub loc: [f64; 2],
    pub epoch: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_location: Option<String>,
}

impl LocationCandidate {
    pub fn new(entry_id: EntryId, lat: f64, lng: f64, epoch: i64) -> Self {
        Self {
            entry_id,
            loc: [lat, lng],
            epoch,
            original_message: None,
            original_location: None,
        }
    }

    pub fn lat(&self) -> f64 {
        self.loc[0]
    }

    pub fn lng(&self) -> f64 {
        self.loc[1]
    }
}

/// The expensive-to-fetch payload behind a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDetail {
    pub entry_id: EntryId,
    pub full_text: String,
}

/// Answer to a location request. `location` is `None` when nothing is eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub count: usize,
    pub location: Option<LocationCandidate>,
}

impl Selection {
    pub fn empty() -> Self {
        Self {
            count: 0,
            location: None,
        }
    }
}

// --- Users ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermLevel {
    User,
    Moderator,
    Admin,
}

impl PermLevel {
    pub fn as_i16(self) -> i16 {
        match self {
            PermLevel::User => 0,
            PermLevel::Moderator => 1,
            PermLevel::Admin => 2,
        }
    }

    /// Unknown levels collapse to the least privileged one.
    pub fn from_i16(level: i16) -> Self {
        match level {
            2 => PermLevel::Admin,
            1 => PermLevel::Moderator,
            _ => PermLevel::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub auth_key: String,
    pub perm_level: PermLevel,
}

/// The part of a user that gets stored alongside a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for Sender {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

// --- Resolutions ---

/// A moderator's decision about one entry. At most one exists per `entry_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub id: Uuid,
    pub entry_id: EntryId,
    #[serde(rename = "type")]
    pub location_type: i32,
    pub location: Option<[f64; 2]>,
    pub corrected: bool,
    pub original_address: String,
    pub corrected_address: String,
    pub reason: String,
    pub sender: Option<Sender>,
    pub open_address: String,
    pub apartment: String,
    pub tweet_contents: String,
    pub created_at: DateTime<Utc>,
}

/// Partial edit of a stored resolution. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    #[serde(rename = "type")]
    pub location_type: Option<i32>,
    pub new_address: Option<String>,
    pub open_address: Option<String>,
    pub apartment: Option<String>,
    pub reason: Option<String>,
    pub tweet_contents: Option<String>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == EntryUpdate::default()
    }

    pub fn apply(&self, record: &mut ResolutionRecord) {
        if let Some(t) = self.location_type {
            record.location_type = t;
        }
        if let Some(addr) = &self.new_address {
            record.corrected_address = addr.clone();
        }
        if let Some(addr) = &self.open_address {
            record.open_address = addr.clone();
        }
        if let Some(apartment) = &self.apartment {
            record.apartment = apartment.clone();
        }
        if let Some(reason) = &self.reason {
            record.reason = reason.clone();
            record.corrected = reason == NO_ERROR_REASON;
        }
        if let Some(text) = &self.tweet_contents {
            record.tweet_contents = text.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ResolutionRecord {
        ResolutionRecord {
            id: Uuid::new_v4(),
            entry_id: 4,
            location_type: 1,
            location: Some([36.1, 36.2]),
            corrected: false,
            original_address: String::new(),
            corrected_address: "old".into(),
            reason: "Yanlis konum".into(),
            sender: None,
            open_address: String::new(),
            apartment: String::new(),
            tweet_contents: "help".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn candidate_omits_transient_fields_until_filled() {
        let c = LocationCandidate::new(1, 36.0, 35.5, 100);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json, serde_json::json!({"entry_id": 1, "loc": [36.0, 35.5], "epoch": 100}));
    }

    #[test]
    fn empty_selection_serializes_null_location() {
        let json = serde_json::to_value(Selection::empty()).unwrap();
        assert_eq!(json, serde_json::json!({"count": 0, "location": null}));
    }

    #[test]
    fn auth_key_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "mod".into(),
            auth_key: "secret".into(),
            perm_level: PermLevel::Moderator,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn perm_levels_are_ordered() {
        assert!(PermLevel::Admin > PermLevel::Moderator);
        assert!(PermLevel::Moderator > PermLevel::User);
        assert_eq!(PermLevel::from_i16(PermLevel::Admin.as_i16()), PermLevel::Admin);
        assert_eq!(PermLevel::from_i16(42), PermLevel::User);
    }

    #[test]
    fn update_touches_only_given_fields() {
        let mut r = record();
        EntryUpdate {
            apartment: Some("B blok".into()),
            ..Default::default()
        }
        .apply(&mut r);
        assert_eq!(r.apartment, "B blok");
        assert_eq!(r.corrected_address, "old");
        assert_eq!(r.tweet_contents, "help");
    }

    #[test]
    fn update_reason_recomputes_corrected() {
        let mut r = record();
        EntryUpdate {
            reason: Some(NO_ERROR_REASON.into()),
            ..Default::default()
        }
        .apply(&mut r);
        assert!(r.corrected);
        assert!(EntryUpdate::default().is_empty());
    }
}
