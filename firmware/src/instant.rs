#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Monotonic instant used by the console decoder on the MCU.

use core::ops::Add;

use embassy_time::{Duration, Instant};

/// Embassy instant that accepts `core::time::Duration` offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    /// Time since the timer driver started counting.
    pub fn since_boot(self) -> core::time::Duration {
        core::time::Duration::from_micros(self.0.as_micros())
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<core::time::Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: core::time::Duration) -> Self {
        Self(self.0 + core_duration_to_embassy(rhs))
    }
}

pub fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_core_durations() {
        let start = FirmwareInstant::from(Instant::from_millis(100));
        let later = start + core::time::Duration::from_secs(30);
        assert_eq!(later.into_embassy(), Instant::from_millis(30_100));
        assert!(later > start);
    }

    #[test]
    fn reports_time_since_boot() {
        let instant = FirmwareInstant::from(Instant::from_micros(1_500));
        assert_eq!(instant.since_boot(), core::time::Duration::from_micros(1_500));
    }
}
