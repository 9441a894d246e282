//! Per-region timing for the batch progress bar (`progress` feature).
//!
//! * [`IterTimer`] – time between consecutive region starts, smoothed with an exponential
//!   moving average `ema ← α·dt + (1 − α)·ema` (`α ∈ (0, 1]`, the first sample seeds it).
//! * [`fmt_dur`] – compact rendering such as `"850ms"`, `"42.3s"` or `"3m07s"`.
//!
//! Catalog queries take from a second to several minutes, so the formatter works at the
//! millisecond-to-minute scale.
use std::time::{Duration, Instant};

pub(crate) struct IterTimer {
    last: Instant,
    ema_secs: f64,
    alpha: f64,
    samples: u64,
}

impl IterTimer {
    pub(crate) fn new(alpha: f64) -> Self {
        Self {
            last: Instant::now(),
            ema_secs: 0.0,
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            samples: 0,
        }
    }

    /// Close the current interval and return its duration.
    pub(crate) fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.record(dt);
        dt
    }

    fn record(&mut self, dt: Duration) {
        self.samples += 1;
        let secs = dt.as_secs_f64();
        self.ema_secs = if self.samples == 1 {
            secs
        } else {
            self.alpha * secs + (1.0 - self.alpha) * self.ema_secs
        };
    }

    pub(crate) fn avg(&self) -> Duration {
        Duration::from_secs_f64(self.ema_secs)
    }
}

pub(crate) fn fmt_dur(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }
    let whole = d.as_secs();
    format!("{}m{:02}s", whole / 60, whole % 60)
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_fmt_dur() {
        assert_eq!(fmt_dur(Duration::from_millis(850)), "850ms");
        assert_eq!(fmt_dur(Duration::from_millis(42_300)), "42.3s");
        assert_eq!(fmt_dur(Duration::from_secs(187)), "3m07s");
    }

    #[test]
    fn test_ema() {
        let mut timer = IterTimer::new(0.5);
        assert_eq!(timer.avg(), Duration::ZERO);
        timer.record(Duration::from_secs(4));
        assert_eq!(timer.avg(), Duration::from_secs(4));
        timer.record(Duration::from_secs(2));
        assert_eq!(timer.avg(), Duration::from_secs(3));
    }
}
