//! Pin placement along the decorative route drawn on the itinerary map.
//!
//! The route is the path `M100 200 Q 256 100 400 200 T 700 150` on an
//! 800x400 canvas. Positions are spaced by index, not by distance or time.

use crate::trip::{Activity, ActivityType};
use serde::Serialize;

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 400.0;

const ROUTE_START: Point = Point::new(100.0, 200.0);
const ROUTE_CONTROL: Point = Point::new(256.0, 100.0);
const ROUTE_JOIN: Point = Point::new(400.0, 200.0);
const ROUTE_END: Point = Point::new(700.0, 150.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Mirror of `other` through `self`.
    fn reflect(self, other: Point) -> Point {
        Point::new(2.0 * self.x - other.x, 2.0 * self.y - other.y)
    }

    pub fn to_percent(self) -> PercentPosition {
        PercentPosition {
            left: self.x / CANVAS_WIDTH * 100.0,
            top: self.y / CANVAS_HEIGHT * 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentPosition {
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy)]
struct QuadraticSegment {
    from: Point,
    control: Point,
    to: Point,
}

impl QuadraticSegment {
    fn at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        Point::new(
            u * u * self.from.x + 2.0 * u * t * self.control.x + t * t * self.to.x,
            u * u * self.from.y + 2.0 * u * t * self.control.y + t * t * self.to.y,
        )
    }
}

fn segments() -> (QuadraticSegment, QuadraticSegment) {
    let first = QuadraticSegment {
        from: ROUTE_START,
        control: ROUTE_CONTROL,
        to: ROUTE_JOIN,
    };
    let second = QuadraticSegment {
        from: ROUTE_JOIN,
        control: ROUTE_JOIN.reflect(ROUTE_CONTROL),
        to: ROUTE_END,
    };
    (first, second)
}

/// Point on the route at `t`, clamped to `[0, 1]`.
pub fn path_point(t: f64) -> Point {
    let t = t.clamp(0.0, 1.0);
    let (first, second) = segments();

    if t <= 0.5 {
        first.at(t * 2.0)
    } else {
        second.at((t - 0.5) * 2.0)
    }
}

/// Route parameters for `count` evenly spaced pins.
pub fn pin_parameters(count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.5],
        _ => (0..count)
            .map(|index| index as f64 / (count - 1) as f64)
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pin {
    pub activity_id: i64,
    pub name: String,
    pub activity_type: ActivityType,
    pub t: f64,
    pub position: PercentPosition,
}

pub fn place_pins<'a, I>(activities: I) -> Vec<Pin>
where
    I: IntoIterator<Item = &'a Activity>,
    I::IntoIter: ExactSizeIterator,
{
    let activities = activities.into_iter();
    let parameters = pin_parameters(activities.len());

    activities
        .zip(parameters)
        .map(|(activity, t)| Pin {
            activity_id: activity.id,
            name: activity.name.clone(),
            activity_type: activity.activity_type,
            t,
            position: path_point(t).to_percent(),
        })
        .collect()
}
