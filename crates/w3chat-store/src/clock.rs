//! Time source for ledger timestamps.

use chrono::{DateTime, SubsecRound, Utc};

/// Source of wall-clock time. Swappable so tests can pin or rewind time.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wraps a [`Clock`] so the timestamps it hands out never decrease, at the
/// precision they are stored with (microseconds).
pub(crate) struct MonotonicClock {
    source: Box<dyn Clock>,
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    pub(crate) fn new(source: Box<dyn Clock>, floor: Option<DateTime<Utc>>) -> Self {
        Self {
            source,
            last: floor,
        }
    }

    pub(crate) fn stamp(&mut self) -> DateTime<Utc> {
        let now = self.source.now().trunc_subsecs(6);
        let ts = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(ts);
        ts
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, TimeZone};

    use super::*;

    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn never_goes_backwards() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let shared = Arc::new(Mutex::new(start));
        let mut clock = MonotonicClock::new(Box::new(ManualClock(shared.clone())), None);

        assert_eq!(clock.stamp(), start);

        *shared.lock().unwrap() = start - Duration::seconds(30);
        assert_eq!(clock.stamp(), start);

        *shared.lock().unwrap() = start + Duration::seconds(5);
        assert_eq!(clock.stamp(), start + Duration::seconds(5));
    }

    #[test]
    fn respects_floor_from_storage() {
        let floor = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        let mut clock = MonotonicClock::new(Box::new(SystemClock), Some(floor));
        assert_eq!(clock.stamp(), floor);
    }
}
