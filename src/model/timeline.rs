use chrono::{Duration, NaiveDateTime};

/// Controls the tick spacing of the timeline header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineScale {
    QuarterHours,
    Hours,
    Days,
}

impl TimelineScale {
    pub fn step(self) -> Duration {
        match self {
            TimelineScale::QuarterHours => Duration::minutes(15),
            TimelineScale::Hours => Duration::hours(1),
            TimelineScale::Days => Duration::days(1),
        }
    }
}

/// Manages the visible viewport of the timeline.
#[derive(Debug, Clone)]
pub struct TimelineViewport {
    /// The leftmost visible instant.
    pub start: NaiveDateTime,
    /// The rightmost visible instant.
    pub end: NaiveDateTime,
    /// Current display scale.
    pub scale: TimelineScale,
    /// Pixels per minute (controls zoom level).
    pub pixels_per_minute: f32,
}

impl TimelineViewport {
    pub const MIN_PIXELS_PER_MINUTE: f32 = 0.05;
    pub const MAX_PIXELS_PER_MINUTE: f32 = 12.0;

    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            scale: TimelineScale::Hours,
            pixels_per_minute: 1.5,
        }
    }

    fn minutes_from_start(&self, at: NaiveDateTime) -> f32 {
        (at - self.start).num_seconds() as f32 / 60.0
    }

    /// Convert an instant to an x-pixel offset from the viewport start.
    pub fn time_to_x(&self, at: NaiveDateTime) -> f32 {
        self.minutes_from_start(at) * self.pixels_per_minute
    }

    /// Convert an x-pixel offset back to an instant, rounded to the minute.
    pub fn x_to_time(&self, x: f32) -> NaiveDateTime {
        let minutes = (x / self.pixels_per_minute).round() as i64;
        self.start + Duration::minutes(minutes)
    }

    /// Whole minutes covered by a horizontal pixel delta.
    pub fn delta_minutes(&self, delta_x: f32) -> i64 {
        (delta_x / self.pixels_per_minute).round() as i64
    }

    /// Total width in pixels for the visible range.
    pub fn total_width(&self) -> f32 {
        self.time_to_x(self.end)
    }

    /// Zoom in (increase pixels per minute).
    pub fn zoom_in(&mut self) {
        self.pixels_per_minute = (self.pixels_per_minute * 1.2).min(Self::MAX_PIXELS_PER_MINUTE);
        self.fit_scale();
    }

    /// Zoom out (decrease pixels per minute).
    pub fn zoom_out(&mut self) {
        self.pixels_per_minute = (self.pixels_per_minute / 1.2).max(Self::MIN_PIXELS_PER_MINUTE);
        self.fit_scale();
    }

    /// Pick a header scale whose ticks stay readable at the current zoom.
    fn fit_scale(&mut self) {
        self.scale = if self.pixels_per_minute >= 4.0 {
            TimelineScale::QuarterHours
        } else if self.pixels_per_minute >= 0.2 {
            TimelineScale::Hours
        } else {
            TimelineScale::Days
        };
    }

    /// Shift the viewport by a number of minutes.
    pub fn scroll_minutes(&mut self, minutes: i64) {
        self.start += Duration::minutes(minutes);
        self.end += Duration::minutes(minutes);
    }
}
