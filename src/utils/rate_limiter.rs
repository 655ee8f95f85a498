use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const MAX_CALLS: u32 = 5;
pub const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started_at: Instant,
    calls: u32,
}

/// Fixed-window counter: at most `max_calls` per `window` per key. The
/// window starts on the first call and resets once it has fully elapsed.
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MAX_CALLS, WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records a call for `key` and reports whether it is within the limit.
    pub fn allow(&self, key: &str) -> bool {
        let mut windows = self.windows.lock().expect("Rate limiter lock poisoned");
        let now = Instant::now();

        let window = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            calls: 0,
        });

        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.calls = 0;
        }

        window.calls += 1;
        window.calls <= self.max_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_sixth_call_in_window() {
        let limiter = RateLimiter::default();

        for _ in 0..5 {
            assert!(limiter.allow("signup:a@example.com"));
        }
        assert!(!limiter.allow("signup:a@example.com"));
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::default();

        for _ in 0..5 {
            assert!(limiter.allow("signup:a@example.com"));
        }
        assert!(limiter.allow("signup:b@example.com"));
    }

    #[tokio::test]
    async fn window_resets_after_elapsing() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));

        assert!(limiter.allow("verify:x"));
        assert!(!limiter.allow("verify:x"));

        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(limiter.allow("verify:x"));
    }
}
