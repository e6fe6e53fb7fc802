//! The value of the `Date` response header.
//!
//! Formatting a date on every response is wasted work at any real request
//! rate: the formatted value is cached and only rebuilt once it is older than
//! the refresh interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

pub const DATE: &str = "Date";

static DATE_SERVICE: Lazy<DateService> = Lazy::new(|| DateService::with_refresh_interval(Duration::from_millis(800)));

struct Stamp {
    taken: Instant,
    value: String,
}

pub struct DateService {
    current: ArcSwap<Stamp>,
    refresh_interval: Duration,
}

impl DateService {
    /// The process-wide instance.
    pub fn global() -> &'static DateService {
        &DATE_SERVICE
    }

    fn with_refresh_interval(refresh_interval: Duration) -> Self {
        Self { current: ArcSwap::from_pointee(Stamp::now()), refresh_interval }
    }

    /// The current date in IMF-fixdate form, at most one refresh interval old.
    pub fn http_date(&self) -> String {
        let stamp = self.current.load();
        if stamp.taken.elapsed() < self.refresh_interval {
            return stamp.value.clone();
        }

        let fresh = Arc::new(Stamp::now());
        let value = fresh.value.clone();
        self.current.store(fresh);
        value
    }
}

impl Stamp {
    fn now() -> Self {
        let mut buf = faf_http_date::get_date_buff_no_key();
        faf_http_date::get_date_no_key(&mut buf);
        Self { taken: Instant::now(), value: String::from_utf8_lossy(&buf[..]).into_owned() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imf_fixdate_shape() {
        let date = DateService::global().http_date();

        // Sun, 06 Nov 1994 08:49:37 GMT
        assert_eq!(date.len(), 29);
        assert!(date.ends_with(" GMT"));
        assert_eq!(&date[3..5], ", ");
    }

    #[test]
    fn refreshes_after_interval() {
        let service = DateService::with_refresh_interval(Duration::ZERO);
        let before = service.current.load().taken;

        service.http_date();
        assert!(service.current.load().taken >= before);
    }
}
