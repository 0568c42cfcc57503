use anyhow::{Result, bail};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Attraction,
    Restaurant,
    Accommodation,
    Transportation,
    Other,
}

impl ActivityType {
    pub const ALL: [ActivityType; 5] = [
        ActivityType::Attraction,
        ActivityType::Restaurant,
        ActivityType::Accommodation,
        ActivityType::Transportation,
        ActivityType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Attraction => "attraction",
            ActivityType::Restaurant => "restaurant",
            ActivityType::Accommodation => "accommodation",
            ActivityType::Transportation => "transportation",
            ActivityType::Other => "other",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        match ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
        {
            Some(kind) => Ok(kind),
            None => bail!(
                "Unknown activity type: {raw}. Expected one of attraction|restaurant|accommodation|transportation|other"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub trip_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub notes: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cost: f64,
    pub currency: String,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i64,
    pub name: String,
    pub destination: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
    pub user_id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Trip {
    /// Inclusive calendar-day range of the trip as seen from `tz`.
    pub fn day_range<Tz: TimeZone>(&self, tz: &Tz) -> (NaiveDate, NaiveDate) {
        (
            self.start_date.with_timezone(tz).date_naive(),
            self.end_date.with_timezone(tz).date_naive(),
        )
    }

    /// Calendar date of the 1-based `day` within the trip, if it exists.
    pub fn date_of_day<Tz: TimeZone>(&self, day: usize, tz: &Tz) -> Option<NaiveDate> {
        let (start, end) = self.day_range(tz);
        day.checked_sub(1)
            .and_then(|offset| u64::try_from(offset).ok())
            .and_then(|offset| start.checked_add_days(Days::new(offset)))
            .filter(|date| *date <= end)
    }
}

/// Payload for `POST /trips`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub name: String,
    pub destination: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Payload for `POST /activities`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub trip_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub notes: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cost: f64,
    pub currency: String,
    pub is_completed: bool,
}
