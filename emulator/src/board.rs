//! Simulated collaborators for the host emulator.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use bms_core::clock::{RtcDate, RtcTime, TimeDate};
use bms_core::devices::{ContactorDriver, ContactorState, Diagnostics, Rtc};

const SECONDS_PER_DAY: u64 = 86_400;

/// RTC that keeps running from the last value written to it.
pub struct SimRtc {
    base: TimeDate,
    set_at: Instant,
}

impl SimRtc {
    pub fn new(base: TimeDate) -> Self {
        Self {
            base,
            set_at: Instant::now(),
        }
    }

    /// Current reading of the simulated clock.
    pub fn now(&self) -> TimeDate {
        advance(self.base, self.set_at.elapsed())
    }
}

impl Rtc for SimRtc {
    fn time(&mut self) -> RtcTime {
        self.now().time
    }

    fn date(&mut self) -> RtcDate {
        self.now().date
    }

    fn set_time(&mut self, time: &RtcTime) {
        self.base = TimeDate::new(self.now().date, *time);
        self.set_at = Instant::now();
    }

    fn set_date(&mut self, date: &RtcDate) {
        self.base = TimeDate::new(*date, self.now().time);
        self.set_at = Instant::now();
    }
}

fn days_in_month(year: u8, month: u8) -> u8 {
    match month {
        2 if year % 4 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn advance(start: TimeDate, elapsed: Duration) -> TimeDate {
    let time = start.time;
    let seconds_of_day = u64::from(time.hours) * 3_600
        + u64::from(time.minutes) * 60
        + u64::from(time.seconds)
        + elapsed.as_secs();

    let mut date = start.date;
    for _ in 0..seconds_of_day / SECONDS_PER_DAY {
        date.day += 1;
        if date.day > days_in_month(date.year, date.month) {
            date.day = 1;
            date.month += 1;
            if date.month > 12 {
                date.month = 1;
                date.year = (date.year + 1) % 100;
            }
        }
    }

    let remainder = seconds_of_day % SECONDS_PER_DAY;
    let time = RtcTime {
        hours: u8::try_from(remainder / 3_600).unwrap_or(23),
        minutes: u8::try_from((remainder / 60) % 60).unwrap_or(59),
        seconds: u8::try_from(remainder % 60).unwrap_or(59),
    };
    TimeDate::new(date, time)
}

/// Per-contactor position and switching counters.
#[derive(Clone, Copy, Debug)]
pub struct ContactorRecord {
    pub state: ContactorState,
    pub closings: u32,
    pub openings: u32,
}

/// Switching history shared between the contactor driver and diagnostics.
pub type ContactorLog = Rc<RefCell<Vec<ContactorRecord>>>;

pub fn contactor_log(count: u8) -> ContactorLog {
    let record = ContactorRecord {
        state: ContactorState::Open,
        closings: 0,
        openings: 0,
    };
    Rc::new(RefCell::new(vec![record; usize::from(count) + 1]))
}

pub struct SimContactors {
    log: ContactorLog,
}

impl SimContactors {
    pub fn new(log: ContactorLog) -> Self {
        Self { log }
    }
}

impl ContactorDriver for SimContactors {
    fn set_state(&mut self, index: u8, state: ContactorState) {
        let mut log = self.log.borrow_mut();
        let Some(record) = log.get_mut(usize::from(index)) else {
            return;
        };
        match state {
            ContactorState::Closed => record.closings += 1,
            ContactorState::Open => record.openings += 1,
        }
        record.state = state;
    }
}

pub struct SimDiagnostics {
    log: ContactorLog,
    errors: Vec<String>,
}

impl SimDiagnostics {
    pub fn new(log: ContactorLog) -> Self {
        Self {
            log,
            errors: Vec::new(),
        }
    }

    /// Adds an entry to the diagnostic error list.
    pub fn record_error(&mut self, description: impl Into<String>) {
        self.errors.push(description.into());
    }
}

impl Diagnostics for SimDiagnostics {
    fn print_contactor_info(&mut self, out: &mut dyn fmt::Write) -> fmt::Result {
        for (index, record) in self.log.borrow().iter().enumerate() {
            let state = match record.state {
                ContactorState::Closed => "closed",
                ContactorState::Open => "open",
            };
            write!(
                out,
                "Contactor {index}: {state}, closings: {}, openings: {}\r\n",
                record.closings, record.openings
            )?;
        }
        Ok(())
    }

    fn print_errors(&mut self, out: &mut dyn fmt::Write) -> fmt::Result {
        if self.errors.is_empty() {
            return out.write_str("No diagnostic errors recorded\r\n");
        }
        for (index, description) in self.errors.iter().enumerate() {
            write!(out, "Error {index}: {description}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: u8, month: u8, day: u8, hours: u8, minutes: u8, seconds: u8) -> TimeDate {
        TimeDate::new(
            RtcDate { year, month, day },
            RtcTime {
                hours,
                minutes,
                seconds,
            },
        )
    }

    #[test]
    fn advance_rolls_over_midnight_and_month_end() {
        let start = at(24, 2, 28, 23, 59, 30);
        assert_eq!(
            advance(start, Duration::from_secs(45)),
            at(24, 2, 29, 0, 0, 15)
        );
        assert_eq!(
            advance(at(23, 12, 31, 23, 59, 59), Duration::from_secs(1)),
            at(24, 1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn contactor_counters_follow_actuation() {
        let log = contactor_log(2);
        let mut driver = SimContactors::new(Rc::clone(&log));
        driver.set_state(1, ContactorState::Closed);
        driver.set_state(1, ContactorState::Open);
        driver.set_state(1, ContactorState::Closed);

        let record = log.borrow()[1];
        assert_eq!(record.state, ContactorState::Closed);
        assert_eq!(record.closings, 2);
        assert_eq!(record.openings, 1);
    }

    #[test]
    fn diagnostics_print_counters() {
        let log = contactor_log(0);
        let mut diagnostics = SimDiagnostics::new(log);
        let mut out = String::new();
        diagnostics.print_contactor_info(&mut out).unwrap();
        assert_eq!(out, "Contactor 0: open, closings: 0, openings: 0\r\n");

        out.clear();
        diagnostics.record_error("cell voltage plausibility");
        diagnostics.print_errors(&mut out).unwrap();
        assert_eq!(out, "Error 0: cell voltage plausibility\r\n");
    }
}
