pub const COMMON_ENTITY_CAP: usize = 5;
/// Below this many distinct values the list is topped up from the database.
pub const ENTITY_TOPUP_FLOOR: usize = 3;

/// De-duplicates names case-insensitively while preserving most-recent-first
/// order, capped at `COMMON_ENTITY_CAP`.
pub fn dedupe_entity_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut deduped: Vec<String> = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !deduped
            .iter()
            .any(|seen| seen.eq_ignore_ascii_case(trimmed))
        {
            deduped.push(trimmed.to_string());
        }
        if deduped.len() == COMMON_ENTITY_CAP {
            break;
        }
    }
    deduped
}

/// Merges database-backfill values behind the activity-derived ones,
/// re-deduplicating and re-capping the combined list.
pub fn top_up_entity_names(derived: Vec<String>, backfill: Vec<String>) -> Vec<String> {
    dedupe_entity_names(derived.into_iter().chain(backfill))
}
