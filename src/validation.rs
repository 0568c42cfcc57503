use crate::trip::{ActivityType, NewActivity, NewTrip};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const TRIP_NAME_MAX_CHARS: usize = 100;

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("time-of-day pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field error found in one form submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{rendered}")
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Default)]
pub struct TripForm {
    pub name: String,
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TripForm {
    /// Trip dates are sent as local midnight of the chosen calendar day.
    pub fn validate<Tz: TimeZone>(&self, tz: &Tz) -> Result<NewTrip, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("name", "Trip name is required");
        } else if name.chars().count() > TRIP_NAME_MAX_CHARS {
            errors.push("name", "Trip name is too long");
        }

        let destination = self.destination.trim();
        if destination.is_empty() {
            errors.push("destination", "Destination is required");
        }

        let start = trip_date(
            self.start_date,
            tz,
            &mut errors,
            "startDate",
            "Start date is required",
            "Start date does not exist in the local time zone",
        );
        let end = trip_date(
            self.end_date,
            tz,
            &mut errors,
            "endDate",
            "End date is required",
            "End date does not exist in the local time zone",
        );

        if let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) {
            if end_date < start_date {
                errors.push("endDate", "End date must not be before start date");
            }
        }

        match (start, end) {
            (Some(start_date), Some(end_date)) => errors.into_result(|| NewTrip {
                name: name.to_string(),
                destination: destination.to_string(),
                start_date,
                end_date,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityForm {
    pub trip_id: i64,
    pub name: String,
    pub location: String,
    pub activity_type: String,
    pub start_time: String,
    pub end_time: String,
    pub cost: f64,
    pub currency: String,
    pub notes: String,
    pub is_completed: bool,
}

impl Default for ActivityForm {
    fn default() -> Self {
        Self {
            trip_id: 0,
            name: String::new(),
            location: String::new(),
            activity_type: ActivityType::Attraction.to_string(),
            start_time: String::new(),
            end_time: String::new(),
            cost: 0.0,
            currency: "IDR".to_string(),
            notes: String::new(),
            is_completed: false,
        }
    }
}

impl ActivityForm {
    /// Validates the form for an activity on calendar `day`.
    ///
    /// Times are either `HH:mm` (resolved on `day` in `tz`) or full RFC 3339
    /// timestamps.
    pub fn validate<Tz: TimeZone>(
        &self,
        day: NaiveDate,
        tz: &Tz,
    ) -> Result<NewActivity, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("name", "Name is required");
        }

        let location = self.location.trim();
        if location.is_empty() {
            errors.push("location", "Location is required");
        }

        let activity_type = self.activity_type.parse::<ActivityType>().ok();
        if activity_type.is_none() {
            errors.push("type", "Invalid activity type");
        }

        let start = resolve_time(&self.start_time, day, tz).map_err(|problem| {
            errors.push("startTime", problem.message("Start time"));
        });
        let end = resolve_time(&self.end_time, day, tz).map_err(|problem| {
            errors.push("endTime", problem.message("End time"));
        });

        if let (Ok(start_time), Ok(end_time)) = (start, end) {
            if end_time <= start_time {
                errors.push("endTime", "End time must be after start time");
            }
        }

        if self.cost.is_nan() || self.cost < 0.0 {
            errors.push("cost", "Cost must be positive");
        }

        let currency = self.currency.trim();
        if currency.is_empty() {
            errors.push("currency", "Currency is required");
        }

        match (activity_type, start, end) {
            (Some(activity_type), Ok(start_time), Ok(end_time)) => {
                errors.into_result(|| NewActivity {
                    trip_id: self.trip_id,
                    name: name.to_string(),
                    activity_type,
                    notes: self.notes.clone(),
                    location: location.to_string(),
                    start_time,
                    end_time,
                    cost: self.cost,
                    currency: currency.to_uppercase(),
                    is_completed: self.is_completed,
                })
            }
            _ => Err(errors),
        }
    }
}

enum TimeProblem {
    Missing,
    Invalid,
}

impl TimeProblem {
    fn message(&self, label: &str) -> String {
        match self {
            TimeProblem::Missing => format!("{label} is required"),
            TimeProblem::Invalid => format!("Invalid {}", label.to_lowercase()),
        }
    }
}

pub fn is_time_of_day(value: &str) -> bool {
    TIME_OF_DAY.is_match(value)
}

fn resolve_time<Tz: TimeZone>(
    raw: &str,
    day: NaiveDate,
    tz: &Tz,
) -> Result<DateTime<Utc>, TimeProblem> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TimeProblem::Missing);
    }

    if is_time_of_day(raw) {
        let time = NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| TimeProblem::Invalid)?;
        return tz
            .from_local_datetime(&day.and_time(time))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or(TimeProblem::Invalid);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| TimeProblem::Invalid)
}

fn trip_date<Tz: TimeZone>(
    date: Option<NaiveDate>,
    tz: &Tz,
    errors: &mut ValidationErrors,
    field: &'static str,
    missing: &str,
    nonexistent: &str,
) -> Option<DateTime<Utc>> {
    let Some(date) = date else {
        errors.push(field, missing);
        return None;
    };
    let midnight = local_midnight(date, tz);
    if midnight.is_none() {
        errors.push(field, nonexistent);
    }
    midnight
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{ActivityForm, TripForm, is_time_of_day};
    use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, 22).unwrap()
    }

    fn valid_activity() -> ActivityForm {
        ActivityForm {
            trip_id: 7,
            name: "Senso-ji".to_string(),
            location: "Asakusa".to_string(),
            activity_type: "attraction".to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:30".to_string(),
            cost: 2000.0,
            currency: "jpy".to_string(),
            ..ActivityForm::default()
        }
    }

    #[test]
    fn empty_trip_name_is_required() {
        let form = TripForm {
            name: String::new(),
            destination: "Tokyo".to_string(),
            start_date: Some(day()),
            end_date: Some(day()),
        };

        let errors = form.validate(&Utc).unwrap_err();
        assert_eq!(errors.message_for("name"), Some("Trip name is required"));
        assert_eq!(errors.errors().len(), 1);
    }

    #[test]
    fn trip_form_reports_every_missing_field() {
        let errors = TripForm::default().validate(&Utc).unwrap_err();

        assert_eq!(errors.message_for("destination"), Some("Destination is required"));
        assert_eq!(errors.message_for("startDate"), Some("Start date is required"));
        assert_eq!(errors.message_for("endDate"), Some("End date is required"));
    }

    #[test]
    fn trip_name_over_limit_is_too_long() {
        let form = TripForm {
            name: "x".repeat(101),
            destination: "Tokyo".to_string(),
            start_date: Some(day()),
            end_date: Some(day()),
        };

        let errors = form.validate(&Utc).unwrap_err();
        assert_eq!(errors.message_for("name"), Some("Trip name is too long"));
    }

    /// UTC everywhere except that midnight of 2027-03-14 is skipped.
    #[derive(Debug, Clone, Copy)]
    struct MidnightGap;

    fn gap_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 3, 14).unwrap()
    }

    fn zero() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(zero())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local == gap_day().and_time(NaiveTime::MIN) {
                LocalResult::None
            } else {
                LocalResult::Single(zero())
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            zero()
        }

        fn offset_from_utc_datetime(&self, _: &NaiveDateTime) -> FixedOffset {
            zero()
        }
    }

    #[test]
    fn skipped_local_midnight_is_reported_on_its_own_field() {
        let form = TripForm {
            name: "Spring Break".to_string(),
            destination: "Chicago".to_string(),
            start_date: NaiveDate::from_ymd_opt(2027, 3, 10),
            end_date: Some(gap_day()),
        };

        let errors = form.validate(&MidnightGap).unwrap_err();

        assert_eq!(errors.message_for("startDate"), None);
        assert_eq!(
            errors.message_for("endDate"),
            Some("End date does not exist in the local time zone")
        );
    }

    #[test]
    fn trip_dates_become_local_midnight() {
        let jakarta = FixedOffset::east_opt(7 * 3600).unwrap();
        let form = TripForm {
            name: "Lembang Adventure".to_string(),
            destination: "Bandung".to_string(),
            start_date: Some(day()),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 24),
        };

        let trip = form.validate(&jakarta).unwrap();
        assert_eq!(
            trip.start_date,
            Utc.with_ymd_and_hms(2026, 12, 21, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn trip_end_before_start_is_rejected() {
        let form = TripForm {
            name: "Backwards".to_string(),
            destination: "Nowhere".to_string(),
            start_date: Some(day()),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 21),
        };

        assert!(form.validate(&Utc).unwrap_err().message_for("endDate").is_some());
    }

    #[test]
    fn activity_times_resolve_on_the_selected_day() {
        let activity = valid_activity().validate(day(), &Utc).unwrap();

        assert_eq!(
            activity.start_time,
            Utc.with_ymd_and_hms(2026, 12, 22, 9, 0, 0).unwrap()
        );
        assert_eq!(activity.currency, "JPY");
    }

    #[test]
    fn activity_end_must_follow_start() {
        let form = ActivityForm {
            start_time: "14:00".to_string(),
            end_time: "09:30".to_string(),
            ..valid_activity()
        };

        let errors = form.validate(day(), &Utc).unwrap_err();
        assert_eq!(
            errors.message_for("endTime"),
            Some("End time must be after start time")
        );
    }

    #[test]
    fn single_digit_hours_compare_as_times() {
        let form = ActivityForm {
            start_time: "9:00".to_string(),
            end_time: "10:00".to_string(),
            ..valid_activity()
        };

        assert!(form.validate(day(), &Utc).is_ok());
    }

    #[test]
    fn activity_accepts_rfc3339_timestamps() {
        let form = ActivityForm {
            start_time: "2026-12-22T09:00:00+09:00".to_string(),
            end_time: "2026-12-22T11:00:00+09:00".to_string(),
            ..valid_activity()
        };

        let activity = form.validate(day(), &Utc).unwrap();
        assert_eq!(
            activity.end_time,
            Utc.with_ymd_and_hms(2026, 12, 22, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn activity_field_errors_are_collected() {
        let form = ActivityForm {
            name: String::new(),
            activity_type: "museum".to_string(),
            start_time: String::new(),
            end_time: "25:00".to_string(),
            cost: -1.0,
            currency: " ".to_string(),
            ..valid_activity()
        };

        let errors = form.validate(day(), &Utc).unwrap_err();
        assert_eq!(errors.message_for("name"), Some("Name is required"));
        assert_eq!(errors.message_for("type"), Some("Invalid activity type"));
        assert_eq!(errors.message_for("startTime"), Some("Start time is required"));
        assert_eq!(errors.message_for("endTime"), Some("Invalid end time"));
        assert_eq!(errors.message_for("cost"), Some("Cost must be positive"));
        assert_eq!(errors.message_for("currency"), Some("Currency is required"));
    }

    #[test]
    fn time_of_day_pattern() {
        assert!(is_time_of_day("00:00"));
        assert!(is_time_of_day("7:05"));
        assert!(is_time_of_day("23:59"));
        assert!(!is_time_of_day("24:00"));
        assert!(!is_time_of_day("12:60"));
    }
}
