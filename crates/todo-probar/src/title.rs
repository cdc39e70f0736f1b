//! Collision-safe titles for fixtures created against a shared service.
//!
//! The remote service is never reset between runs, so every title carries a
//! timestamp, a per-process sequence number and a random suffix.

use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate `"{base} {unix_millis}-{sequence}-{random}"`.
///
/// Two calls in the same process never return the same string; calls from
/// different processes differ in the random suffix.
#[must_use]
pub fn unique_title(base: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{base} {millis}-{seq}-{}", &random[..6])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_title_keeps_base_prefix() {
        let title = unique_title("Song is fun but i want to dance");
        assert!(title.starts_with("Song is fun but i want to dance "));
    }

    #[test]
    fn test_title_suffix_fields_are_separated() {
        let title = unique_title("Base");
        let suffix = title.strip_prefix("Base ").unwrap();
        let fields: Vec<&str> = suffix.split('-').collect();
        assert_eq!(fields.len(), 3, "{title}");
        assert!(fields[0].parse::<i64>().is_ok());
        assert!(fields[1].parse::<u64>().is_ok());
        assert_eq!(fields[2].len(), 6);
        assert!(fields[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_titles_unique_in_tight_loop() {
        let titles: HashSet<String> = (0..10_000).map(|_| unique_title("t")).collect();
        assert_eq!(titles.len(), 10_000);
    }

    #[test]
    fn test_titles_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| unique_title("x")).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for title in handle.join().unwrap() {
                assert!(all.insert(title));
            }
        }
        assert_eq!(all.len(), 4000);
    }

    proptest! {
        #[test]
        fn prop_distinct_calls_distinct_titles(base in "[A-Za-z ]{0,24}") {
            let a = unique_title(&base);
            let b = unique_title(&base);
            prop_assert_ne!(a.clone(), b);
            prop_assert!(a.starts_with(&base));
        }
    }
}
