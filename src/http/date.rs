//! Cached `Date` header value.

use std::time::{Duration, Instant, SystemTime};

/// Formats the imf-fixdate `Date` header at most once per second;
/// every response within the same second reuses the cached string.
#[derive(Debug)]
pub struct DateCache {
    value: String,
    at: Instant,
}

impl DateCache {
    pub fn new() -> Self {
        Self {
            value: httpdate::fmt_http_date(SystemTime::now()),
            at: Instant::now(),
        }
    }

    pub fn get(&mut self) -> &str {
        if self.at.elapsed() >= Duration::from_secs(1) {
            self.value = httpdate::fmt_http_date(SystemTime::now());
            self.at = Instant::now();
        }
        &self.value
    }
}

impl Default for DateCache {
    fn default() -> Self {
        Self::new()
    }
}
