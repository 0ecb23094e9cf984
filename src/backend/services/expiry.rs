// src/backend/services/expiry.rs

/// True when `expiry_date` lies strictly before `today`.
///
/// Both dates are `YYYY-MM-DD`; the format is fixed-width and zero-padded, so
/// string order is date order. A missing expiry never expires.
pub fn is_expired(expiry_date: Option<&str>, today: &str) -> bool {
    match expiry_date {
        Some(date) => date < today,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn absent_expiry_never_expires() {
        assert!(!is_expired(None, "2026-10-17"));
    }

    #[test]
    fn expires_the_day_after() {
        assert!(!is_expired(Some("2026-10-17"), "2026-10-17"));
        assert!(is_expired(Some("2026-10-16"), "2026-10-17"));
        assert!(!is_expired(Some("2026-10-18"), "2026-10-17"));
        assert!(is_expired(Some("2025-12-31"), "2026-01-01"));
    }

    fn date() -> impl Strategy<Value = String> {
        (1970u32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}"))
    }

    proptest! {
        #[test]
        fn matches_calendar_order(a in date(), b in date()) {
            let parse = |s: &str| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
            prop_assert_eq!(is_expired(Some(&a), &b), parse(&a) < parse(&b));
        }
    }
}
