use amana_core::hour_of_day_utc;

use crate::context_types::{ActivityRecord, UserPatterns};

const PATTERN_TOP_N: usize = 3;

/// Derives usage patterns from recent activity. Pure function: counts intent
/// occurrences and activity hours, keeps the top 3 of each ordered by
/// descending frequency, ties broken by first appearance in the input.
pub fn derive_user_patterns(activity: &[ActivityRecord]) -> UserPatterns {
    UserPatterns {
        most_used_features: top_n_by_frequency(
            activity.iter().map(|record| record.intent.clone()),
        ),
        peak_hours: top_n_by_frequency(
            activity
                .iter()
                .map(|record| hour_of_day_utc(record.timestamp_unix_ms)),
        ),
    }
}

fn top_n_by_frequency<T: PartialEq>(values: impl Iterator<Item = T>) -> Vec<T> {
    // Insertion-ordered counting so the stable sort preserves first-seen
    // order among equal frequencies.
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(value, _)| value)
        .take(PATTERN_TOP_N)
        .collect()
}
