pub mod format;
pub mod route;

use crate::trip::{Activity, Trip};
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

/// Activities of one trip day.
#[derive(Debug, Clone, Serialize)]
pub struct DayBucket<'a> {
    pub day: usize,
    pub date: NaiveDate,
    pub activities: Vec<&'a Activity>,
}

impl DayBucket<'_> {
    pub fn label(&self) -> String {
        format::format_day_label(self.date)
    }

    pub fn place_count(&self) -> usize {
        self.activities.len()
    }
}

/// Partitions `activities` into one bucket per calendar day in `[start, end]`.
///
/// An activity lands in the bucket whose date equals its start timestamp's
/// calendar date in `tz`. Input order is kept within a bucket. Activities
/// starting outside the range are dropped.
pub fn bucket_by_day<'a, Tz: TimeZone>(
    start: NaiveDate,
    end: NaiveDate,
    activities: &'a [Activity],
    tz: &Tz,
) -> Vec<DayBucket<'a>> {
    let activity_dates = activities
        .iter()
        .map(|activity| (activity.start_time.with_timezone(tz).date_naive(), activity))
        .collect::<Vec<_>>();

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .enumerate()
        .map(|(index, date)| DayBucket {
            day: index + 1,
            date,
            activities: activity_dates
                .iter()
                .filter(|(activity_date, _)| *activity_date == date)
                .map(|(_, activity)| *activity)
                .collect(),
        })
        .collect()
}

pub fn trip_buckets<'a, Tz: TimeZone>(trip: &'a Trip, tz: &Tz) -> Vec<DayBucket<'a>> {
    let (start, end) = trip.day_range(tz);
    bucket_by_day(start, end, &trip.activities, tz)
}
