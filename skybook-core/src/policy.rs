use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::{Booking, Flight};

/// Tunable business rules, loaded from the `business_rules` config section.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// Bookings become immutable this many hours before departure
    #[serde(default = "default_window_hours")]
    pub modification_window_hours: i64,
    #[serde(default = "default_passport_min")]
    pub passport_min_len: usize,
    #[serde(default = "default_passport_max")]
    pub passport_max_len: usize,
    #[serde(default = "default_prefix")]
    pub booking_number_prefix: String,
}

fn default_window_hours() -> i64 { 24 }
fn default_passport_min() -> usize { 6 }
fn default_passport_max() -> usize { 9 }
fn default_prefix() -> String { "SB".to_string() }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            modification_window_hours: default_window_hours(),
            passport_min_len: default_passport_min(),
            passport_max_len: default_passport_max(),
            booking_number_prefix: default_prefix(),
        }
    }
}

impl BookingRules {
    pub fn modification_window(&self) -> Duration {
        Duration::hours(self.modification_window_hours)
    }

    /// A booking may be changed or cancelled while it is not terminal and its
    /// flight leaves strictly more than the window from `now`. At exactly the
    /// window boundary the answer is already `false`.
    pub fn can_modify(&self, booking: &Booking, flight: &Flight, now: DateTime<Utc>) -> bool {
        !booking.status.is_terminal() && flight.departure_time - now > self.modification_window()
    }
}
