pub const MS_PER_HOUR: u64 = 3_600_000;
pub const MS_PER_DAY: u64 = 86_400_000;

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the number of whole days elapsed from `earlier_ms` to `later_ms`,
/// or zero when `later_ms` is not in the future of `earlier_ms`.
pub fn whole_days_between_ms(earlier_ms: u64, later_ms: u64) -> u64 {
    later_ms.saturating_sub(earlier_ms) / MS_PER_DAY
}

/// Returns the UTC hour of day (0..=23) for an epoch-millisecond timestamp.
pub fn hour_of_day_utc(timestamp_ms: u64) -> u8 {
    ((timestamp_ms / MS_PER_HOUR) % 24) as u8
}
