#![allow(dead_code)]

use core::fmt;
use core::ops::Add;
use core::time::Duration;

use bms_core::clock::{RtcDate, RtcTime, TimeDate};
use bms_core::devices::{ContactorDriver, ContactorState, Devices, Diagnostics, Rtc};
use bms_core::rx::{ReceiveBuffer, TERMINATOR};
use bms_core::{CommandDecoder, DecoderConfig, TickReport};
use heapless::{String, Vec};

pub const TIMEOUT: Duration = Duration::from_secs(30);

pub fn timeout_ms() -> u64 {
    u64::try_from(TIMEOUT.as_millis()).unwrap()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(u64);

impl MockInstant {
    pub fn millis(value: u64) -> Self {
        Self(value * 1_000)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_micros()).unwrap())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtcCall {
    SetTime(RtcTime),
    SetDate(RtcDate),
}

pub struct MockRtc {
    pub now: TimeDate,
    pub writes: Vec<RtcCall, 8>,
}

impl Rtc for MockRtc {
    fn time(&mut self) -> RtcTime {
        self.now.time
    }

    fn date(&mut self) -> RtcDate {
        self.now.date
    }

    fn set_time(&mut self, time: &RtcTime) {
        self.writes.push(RtcCall::SetTime(*time)).unwrap();
        self.now.time = *time;
    }

    fn set_date(&mut self, date: &RtcDate) {
        self.writes.push(RtcCall::SetDate(*date)).unwrap();
        self.now.date = *date;
    }
}

#[derive(Default)]
pub struct MockContactors {
    pub calls: Vec<(u8, ContactorState), 8>,
}

impl ContactorDriver for MockContactors {
    fn set_state(&mut self, index: u8, state: ContactorState) {
        self.calls.push((index, state)).unwrap();
    }
}

#[derive(Default)]
pub struct MockDiagnostics {
    pub contactor_reports: usize,
    pub error_reports: usize,
}

impl Diagnostics for MockDiagnostics {
    fn print_contactor_info(&mut self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.contactor_reports += 1;
        out.write_str("contactor 0: 4 closings\r\n")
    }

    fn print_errors(&mut self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.error_reports += 1;
        out.write_str("no errors\r\n")
    }
}

pub fn rtc_at(year: u8, month: u8, day: u8, hours: u8, minutes: u8, seconds: u8) -> TimeDate {
    TimeDate::new(
        RtcDate { year, month, day },
        RtcTime {
            hours,
            minutes,
            seconds,
        },
    )
}

/// Decoder plus simulated board, fed one line per tick.
pub struct Harness {
    pub decoder: CommandDecoder<MockInstant>,
    pub devices: Devices<MockRtc, MockContactors, MockDiagnostics>,
    pub rx: ReceiveBuffer,
    pub output: String<512>,
}

impl Harness {
    pub fn new(contactor_count: u8) -> Self {
        let config = DecoderConfig {
            test_mode_timeout: TIMEOUT,
            contactor_count,
        };
        Self {
            decoder: CommandDecoder::new(config),
            devices: Devices::new(
                MockRtc {
                    now: rtc_at(24, 3, 17, 8, 15, 0),
                    writes: Vec::new(),
                },
                MockContactors::default(),
                MockDiagnostics::default(),
            ),
            rx: ReceiveBuffer::new(),
            output: String::new(),
        }
    }

    /// Queues `line` plus terminator and runs one tick at `at_ms`.
    pub fn send(&mut self, line: &str, at_ms: u64) -> TickReport {
        self.rx.extend(line.as_bytes()).unwrap();
        self.rx.push(TERMINATOR).unwrap();
        self.tick(at_ms)
    }

    pub fn tick(&mut self, at_ms: u64) -> TickReport {
        self.output.clear();
        self.decoder.tick(
            &mut self.rx,
            MockInstant::millis(at_ms),
            &mut self.devices,
            &mut self.output,
        )
    }

    pub fn enable_test_mode(&mut self, at_ms: u64) {
        self.send("teston", at_ms);
        assert!(self.decoder.session().is_active());
    }
}
