use crate::types::Entry;
use chrono::{DateTime, Duration, Utc};

/// Fallback gap when there is not enough valid history to average over.
pub const FALLBACK_GAP_SECS: i64 = 60;

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Predict when the next entry should arrive, given a newest-first page.
///
/// The estimate is the mean gap between consecutive entries, counting only
/// pairs where both timestamps parse, added to the newest valid timestamp
/// (or `now` when the newest is malformed). With no valid pair at all the
/// prediction is `now + 60s`.
pub fn predict_next_arrival(entries: &[Entry], now: DateTime<Utc>) -> DateTime<Utc> {
    let mut total_ms: i64 = 0;
    let mut valid_pairs: i64 = 0;

    for pair in entries.windows(2) {
        if let (Some(newer), Some(older)) = (parse_ts(&pair[0].timestamp), parse_ts(&pair[1].timestamp)) {
            total_ms += (newer - older).num_milliseconds();
            valid_pairs += 1;
        }
    }

    if valid_pairs == 0 {
        return now + Duration::seconds(FALLBACK_GAP_SECS);
    }

    let mean_gap = Duration::milliseconds(total_ms / valid_pairs);
    let base = entries
        .first()
        .and_then(|e| parse_ts(&e.timestamp))
        .unwrap_or(now);
    base + mean_gap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(height: u64, ts: &str) -> Entry {
        Entry {
            height,
            hash: format!("hash{height}"),
            timestamp: ts.to_string(),
            tx_count: None,
            utxo_created: None,
            utxo_spent: None,
            processing_time_ms: None,
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn regular_gaps_predict_newest_plus_mean() {
        let entries = vec![
            entry(3, "2024-05-01T12:02:00Z"),
            entry(2, "2024-05-01T12:01:00Z"),
            entry(1, "2024-05-01T12:00:00Z"),
        ];
        let predicted = predict_next_arrival(&entries, at("2024-05-01T12:02:30Z"));
        assert_eq!(predicted, at("2024-05-01T12:03:00Z"));
    }

    #[test]
    fn single_entry_uses_fallback_gap() {
        let now = at("2024-05-01T12:00:00Z");
        let entries = vec![entry(1, "2024-05-01T11:59:00Z")];
        assert_eq!(predict_next_arrival(&entries, now), now + Duration::seconds(60));
    }

    #[test]
    fn empty_page_uses_fallback_gap() {
        let now = at("2024-05-01T12:00:00Z");
        assert_eq!(predict_next_arrival(&[], now), now + Duration::seconds(60));
    }

    #[test]
    fn malformed_timestamp_excludes_both_adjacent_pairs() {
        // Gaps around the bad row are dropped; only the 60s pair remains.
        let entries = vec![
            entry(4, "2024-05-01T12:03:00Z"),
            entry(3, "not-a-timestamp"),
            entry(2, "2024-05-01T12:01:00Z"),
            entry(1, "2024-05-01T12:00:00Z"),
        ];
        let predicted = predict_next_arrival(&entries, at("2024-05-01T12:03:10Z"));
        assert_eq!(predicted, at("2024-05-01T12:04:00Z"));
    }

    #[test]
    fn malformed_newest_falls_back_to_now_as_base() {
        let now = at("2024-05-01T12:05:00Z");
        let entries = vec![
            entry(3, "garbage"),
            entry(2, "2024-05-01T12:01:00Z"),
            entry(1, "2024-05-01T12:00:00Z"),
        ];
        assert_eq!(predict_next_arrival(&entries, now), now + Duration::seconds(60));
    }
}
