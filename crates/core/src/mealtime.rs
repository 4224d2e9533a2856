//! Meal-window policy.
//!
//! Pure time math: mapping a timestamp to a meal slot, computing the
//! calendar date key used for day-rollover comparison, and computing how
//! long a per-day cache entry may live. No I/O, fully deterministic given a
//! timestamp and the configured offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three daily meal slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }

    /// Whether this is the final slot of the day. A scan in the final slot
    /// archives the day immediately instead of waiting for rollover.
    pub fn is_last(&self) -> bool {
        matches!(self, MealSlot::Dinner)
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meal-window hour boundaries in local wall-clock hours.
///
/// Windows are contiguous half-open ranges:
/// `[breakfast_start, lunch_start)` is breakfast,
/// `[lunch_start, dinner_start)` is lunch,
/// `[dinner_start, dinner_end)` is dinner. Everything else is no meal.
/// Deployment policy, not a hard-coded literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealHours {
    #[serde(default = "default_breakfast_start")]
    pub breakfast_start: u32,
    #[serde(default = "default_lunch_start")]
    pub lunch_start: u32,
    #[serde(default = "default_dinner_start")]
    pub dinner_start: u32,
    #[serde(default = "default_dinner_end")]
    pub dinner_end: u32,
}

fn default_breakfast_start() -> u32 {
    7
}

fn default_lunch_start() -> u32 {
    12
}

fn default_dinner_start() -> u32 {
    16
}

fn default_dinner_end() -> u32 {
    24
}

impl Default for MealHours {
    fn default() -> Self {
        Self {
            breakfast_start: default_breakfast_start(),
            lunch_start: default_lunch_start(),
            dinner_start: default_dinner_start(),
            dinner_end: default_dinner_end(),
        }
    }
}

/// Resolves timestamps against a single configured timezone offset.
///
/// All date and hour comparisons in the system go through one of these, so
/// meal windows and day boundaries cannot drift with the server's own
/// timezone.
#[derive(Debug, Clone, Copy)]
pub struct MealClock {
    offset: FixedOffset,
    hours: MealHours,
}

impl MealClock {
    /// Build a clock from an offset in minutes east of UTC.
    ///
    /// Offsets outside the valid chrono range fall back to UTC; config
    /// validation rejects them before a clock is ever built in production.
    pub fn new(utc_offset_minutes: i32, hours: MealHours) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self { offset, hours }
    }

    /// Map a timestamp to the meal slot its local hour falls in, if any.
    pub fn resolve_slot(&self, now: DateTime<Utc>) -> Option<MealSlot> {
        let hour = now.with_timezone(&self.offset).hour();
        if hour >= self.hours.breakfast_start && hour < self.hours.lunch_start {
            Some(MealSlot::Breakfast)
        } else if hour >= self.hours.lunch_start && hour < self.hours.dinner_start {
            Some(MealSlot::Lunch)
        } else if hour >= self.hours.dinner_start && hour < self.hours.dinner_end {
            Some(MealSlot::Dinner)
        } else {
            None
        }
    }

    /// Local calendar date key (YYYY-MM-DD) used for rollover comparison.
    pub fn date_key(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.offset).format("%Y-%m-%d").to_string()
    }

    /// Seconds until the next local midnight, clamped to at least 1.
    ///
    /// Used as the TTL for per-day cache entries so they cannot outlive the
    /// day they describe.
    pub fn seconds_until_midnight(&self, now: DateTime<Utc>) -> i64 {
        let local: NaiveDateTime = now.with_timezone(&self.offset).naive_local();
        let midnight = local
            .date()
            .succ_opt()
            .map(|next| next.and_hms_opt(0, 0, 0).expect("midnight is a valid time"));

        match midnight {
            Some(midnight) => (midnight - local).num_seconds().max(1),
            // NaiveDate::MAX overflow, unreachable for real timestamps.
            None => 1,
        }
    }
}
