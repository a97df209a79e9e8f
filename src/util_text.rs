use chrono::{DateTime, Local};

/// Shorten a hash for list rows: "abcd1234…ef56".
///
/// Counts characters, not bytes: the hash is remote payload data and is not
/// guaranteed to be ASCII.
pub fn short_hash(hash: &str, keep: usize) -> String {
    if hash.is_empty() {
        return "N/A".to_string();
    }
    let len = hash.chars().count();
    if len <= keep * 2 + 1 {
        return hash.to_string();
    }
    let head: String = hash.chars().take(keep).collect();
    let tail: String = hash.chars().skip(len - keep).collect();
    format!("{head}…{tail}")
}

/// Thousands separators for heights: 5234567 -> "5,234,567".
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Local wall-clock HH:MM:SS for an RFC 3339 timestamp, "N/A" when it does
/// not parse.
pub fn format_time_hms(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => "N/A".to_string(),
    }
}

pub fn format_opt(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "N/A".to_string())
}

/// DOGE amounts with trailing zeros trimmed.
pub fn format_amount(v: f64) -> String {
    let s = format!("{v:.8}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("{s} DOGE")
}

/// Next-arrival countdown for the status line. `None` means no active
/// prediction (stale or no data yet).
pub fn format_countdown(secs: Option<i64>) -> String {
    match secs {
        Some(s) if s >= 0 => format!("{s}s"),
        Some(s) => format!("overdue {}s", -s),
        None => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(5234567), "5,234,567");
    }

    #[test]
    fn short_hash_keeps_ends() {
        assert_eq!(short_hash("", 4), "N/A");
        assert_eq!(short_hash("abcdef", 4), "abcdef");
        assert_eq!(short_hash("0123456789abcdef", 4), "0123…cdef");
    }

    #[test]
    fn short_hash_handles_multibyte_input() {
        // Payload data is not guaranteed ASCII; shortening must not split a
        // character mid-sequence.
        let odd = format!("a{}", "é".repeat(9));
        assert_eq!(short_hash(&odd, 6), odd);
        let long = format!("a{}", "é".repeat(20));
        assert_eq!(short_hash(&long, 4), "aééé…éééé");
    }

    #[test]
    fn malformed_timestamp_renders_na() {
        assert_eq!(format_time_hms("not a time"), "N/A");
    }

    #[test]
    fn amounts_trim_trailing_zeros() {
        assert_eq!(format_amount(12.5), "12.5 DOGE");
        assert_eq!(format_amount(3.0), "3 DOGE");
    }

    #[test]
    fn countdown_states() {
        assert_eq!(format_countdown(Some(42)), "42s");
        assert_eq!(format_countdown(Some(-5)), "overdue 5s");
        assert_eq!(format_countdown(None), "—");
    }
}
