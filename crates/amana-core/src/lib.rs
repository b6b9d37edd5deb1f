//! Shared primitives for the Amana assistant core: clock helpers and
//! currency formatting used by every other crate in the workspace.
mod currency;
mod time_utils;

pub use currency::format_naira;
pub use time_utils::{
    current_unix_timestamp_ms, hour_of_day_utc, whole_days_between_ms, MS_PER_DAY, MS_PER_HOUR,
};
