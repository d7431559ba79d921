use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Wall clock that never hands out the same instant twice.
///
/// Notification feeds are ordered by `created_at`, so two notifications
/// created in the same microsecond would otherwise have no defined order.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_micros: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self.last_micros.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let secs = next.div_euclid(1_000_000);
                    let nanos = (next.rem_euclid(1_000_000) * 1_000) as u32;
                    return Utc.timestamp_opt(secs, nanos).single().unwrap_or_else(Utc::now);
                }
                Err(actual) => prev = actual,
            }
        }
    }
}

/// True when `start` lies within the next `window` from `now`.
pub fn starts_within(start: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let until = start - now;
    until > Duration::zero() && until <= window
}
