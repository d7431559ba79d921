use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(1);

/// Admits at most `per_second` requests in each one-second window, with
/// windows counted from the limiter's creation. The window number and the
/// number of requests it has admitted share one atomic word, high and low
/// halves respectively.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    per_second: u32,
    origin: Instant,
    slot: Arc<AtomicU64>,
}

fn pack(window: u32, admitted: u32) -> u64 {
    (u64::from(window) << 32) | u64::from(admitted)
}

fn unpack(slot: u64) -> (u32, u32) {
    ((slot >> 32) as u32, slot as u32)
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            per_second: per_second.max(1),
            origin: Instant::now(),
            slot: Arc::new(AtomicU64::new(0)),
        }
    }

    /// `Err` carries the time left until the next window opens.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.origin);
        let window = (elapsed.as_secs() & u64::from(u32::MAX)) as u32;

        let mut current = self.slot.load(Ordering::Acquire);
        loop {
            let (seen, admitted) = unpack(current);
            // a late caller with an older clock reading counts against the newer window
            let (window, admitted) = if seen >= window {
                (seen, admitted)
            } else {
                (window, 0)
            };
            if admitted >= self.per_second {
                let reopens = WINDOW * window.saturating_add(1);
                return Err(reopens.saturating_sub(elapsed));
            }
            match self.slot.compare_exchange_weak(
                current,
                pack(window, admitted + 1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(wait) = limiter.try_acquire() {
        tracing::debug!(
            path = %req.uri().path(),
            wait_ms = wait.as_millis() as u64,
            "Rate limit exceeded"
        );
        let retry_after = wait.as_secs().max(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
    }
    next.run(req).await
}
