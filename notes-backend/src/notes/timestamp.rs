//! Human-readable natural keys for notes.
//!
//! Keys look like `2026/02/01 21:59:40` in a fixed offset. A second key issued
//! within the same wall-clock second gets `.{epoch-millis}` appended.

use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Source of "now". Injected so same-second collisions are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format `now` in `offset`, suffixing it when it equals `last_issued`.
///
/// Returns `(timestamp, new_last_issued)`. The new state is always the
/// unsuffixed value so every further call in the same second also collides.
pub fn generate(now: DateTime<Utc>, offset: FixedOffset, last_issued: &str) -> (String, String) {
    let formatted = now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string();
    claim_candidate(formatted, now, last_issued)
}

fn claim_candidate(candidate: String, now: DateTime<Utc>, last_issued: &str) -> (String, String) {
    if candidate == last_issued {
        (format!("{}.{}", candidate, now.timestamp_millis()), candidate)
    } else {
        (candidate.clone(), candidate)
    }
}

/// `YYYY/MM/DD` portion of a timestamp (everything before the first space)
pub fn date_part(timestamp: &str) -> &str {
    timestamp.split(' ').next().unwrap_or(timestamp)
}

/// Owns the "last issued" state. All issuing goes through one mutex, so two
/// concurrent creates in the same second still receive distinct keys.
pub struct TimestampGenerator {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    last_issued: Mutex<String>,
}

impl TimestampGenerator {
    pub fn new(offset: FixedOffset) -> Self {
        Self::with_clock(offset, Arc::new(SystemClock))
    }

    pub fn with_clock(offset: FixedOffset, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            offset,
            last_issued: Mutex::new(String::new()),
        }
    }

    /// Issue a fresh timestamp for a new note
    pub fn next(&self) -> String {
        let mut last = self.last_issued.lock();
        let (timestamp, new_last) = generate(self.clock.now(), self.offset, &last);
        *last = new_last;
        timestamp
    }

    /// Run a caller-supplied timestamp (bulk import) through the same
    /// collision rule as generated ones
    pub fn claim(&self, candidate: &str) -> String {
        let mut last = self.last_issued.lock();
        let (timestamp, new_last) = claim_candidate(candidate.to_string(), self.clock.now(), &last);
        *last = new_last;
        timestamp
    }

    /// `claim` when a candidate is given, `next` otherwise
    pub fn issue(&self, candidate: Option<&str>) -> String {
        match candidate.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => self.claim(c),
            None => self.next(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Clock frozen at a settable instant
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.0.lock() = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    pub fn shanghai() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    /// 2026/02/01 21:59:40 in +08:00
    pub fn reference_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 13, 59, 40).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_generate_formats_in_offset() {
        let (ts, last) = generate(reference_instant(), shanghai(), "");
        assert_eq!(ts, "2026/02/01 21:59:40");
        assert_eq!(last, "2026/02/01 21:59:40");
    }

    #[test]
    fn test_generate_suffixes_collision_with_epoch_millis() {
        let now = reference_instant();
        let (ts, last) = generate(now, shanghai(), "2026/02/01 21:59:40");
        assert_eq!(ts, format!("2026/02/01 21:59:40.{}", now.timestamp_millis()));
        assert_eq!(last, "2026/02/01 21:59:40");
    }

    #[test]
    fn test_third_call_in_same_second_also_suffixed() {
        let clock = FixedClock::at(reference_instant());
        let generator = TimestampGenerator::with_clock(shanghai(), clock.clone());

        let first = generator.next();
        clock.set(reference_instant() + Duration::milliseconds(120));
        let second = generator.next();
        clock.set(reference_instant() + Duration::milliseconds(480));
        let third = generator.next();

        assert_eq!(first, "2026/02/01 21:59:40");
        assert!(second.starts_with("2026/02/01 21:59:40."));
        assert!(third.starts_with("2026/02/01 21:59:40."));
        assert_ne!(second, third);
    }

    #[test]
    fn test_next_second_is_unsuffixed() {
        let clock = FixedClock::at(reference_instant());
        let generator = TimestampGenerator::with_clock(shanghai(), clock.clone());

        generator.next();
        clock.set(reference_instant() + Duration::seconds(1));
        assert_eq!(generator.next(), "2026/02/01 21:59:41");
    }

    #[test]
    fn test_claim_uses_same_collision_rule() {
        let clock = FixedClock::at(reference_instant());
        let generator = TimestampGenerator::with_clock(shanghai(), clock);

        assert_eq!(generator.claim("2025/12/31 08:00:00"), "2025/12/31 08:00:00");
        let again = generator.claim("2025/12/31 08:00:00");
        assert!(again.starts_with("2025/12/31 08:00:00."));

        // A blank candidate falls back to a generated value
        assert_eq!(generator.issue(Some("  ")), "2026/02/01 21:59:40");
    }

    #[test]
    fn test_date_part() {
        assert_eq!(date_part("2026/02/01 21:59:40"), "2026/02/01");
        assert_eq!(date_part("2026/02/01 21:59:40.1769954380000"), "2026/02/01");
        assert_eq!(date_part(""), "");
    }

    #[test]
    fn test_concurrent_issue_is_unique() {
        let clock = FixedClock::at(reference_instant());
        let generator = Arc::new(TimestampGenerator::with_clock(shanghai(), clock.clone()));

        // Fixed clock: every call lands in the same second with the same millis,
        // so only the first is unsuffixed and the rest share one suffixed value.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || generator.next())
            })
            .collect();
        let issued: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let unsuffixed = issued.iter().filter(|t| !t.contains('.')).count();
        assert_eq!(unsuffixed, 1);
    }
}
