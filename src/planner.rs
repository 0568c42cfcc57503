use crate::api::{ApiClient, ApiError, Transport};
use crate::trip::{Activity, Trip};
use crate::validation::{ActivityForm, TripForm, ValidationErrors};
use chrono::TimeZone;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
    #[error("Day {day} is outside the trip ({days} day(s))")]
    DayOutOfRange { day: usize, days: usize },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Validates `form` and creates the trip. Nothing is sent when validation fails.
pub async fn submit_trip<T: Transport, Tz: TimeZone>(
    client: &ApiClient<T>,
    form: &TripForm,
    tz: &Tz,
) -> Result<Trip, SubmitError> {
    let new_trip = form.validate(tz)?;
    let trip = client.create_trip(&new_trip).await?;
    info!(trip_id = trip.id, name = %trip.name, "trip created");
    Ok(trip)
}

/// Validates `form` for the 1-based `day` of `trip` and creates the activity.
pub async fn submit_activity<T: Transport, Tz: TimeZone>(
    client: &ApiClient<T>,
    trip: &Trip,
    day: usize,
    form: &ActivityForm,
    tz: &Tz,
) -> Result<Activity, SubmitError> {
    let date = trip.date_of_day(day, tz).ok_or_else(|| {
        let (start, end) = trip.day_range(tz);
        SubmitError::DayOutOfRange {
            day,
            days: usize::try_from((end - start).num_days() + 1).unwrap_or(0),
        }
    })?;

    let new_activity = ActivityForm {
        trip_id: trip.id,
        ..form.clone()
    }
    .validate(date, tz)?;

    let activity = client.create_activity(&new_activity).await?;
    info!(
        activity_id = activity.id,
        trip_id = trip.id,
        day,
        "activity created"
    );
    Ok(activity)
}
