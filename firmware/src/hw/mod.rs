//! Board adapters behind the `bms-core` device traits.

#![cfg(target_os = "none")]

use core::ptr;

use bms_core::clock::{RtcDate, RtcTime};
use bms_core::devices::{ContactorDriver, ContactorState, Rtc};
use embassy_stm32::gpio::Output;
use embassy_stm32::rtc::{DateTime, DayOfWeek, Rtc as HalRtc};

use crate::diagnostics::{CONTACTOR_SLOTS, ContactorCounters, DiagnosticError, ErrorLog};

/// RCC control/status register (reset flags live in bits 24..=31).
const RCC_CSR_ADDR: *mut u32 = 0x4002_1060 as *mut u32;
/// Writing this bit clears every latched reset flag.
const RCC_CSR_RMVF: u32 = 1 << 23;

/// Reads the latched reset flags, then clears them for the next boot.
pub fn take_reset_cause() -> u32 {
    unsafe {
        let csr = ptr::read_volatile(RCC_CSR_ADDR);
        ptr::write_volatile(RCC_CSR_ADDR, csr | RCC_CSR_RMVF);
        csr
    }
}

/// Calendar RTC with a two-digit year offset from 2000.
pub struct BoardRtc {
    rtc: HalRtc,
    errors: &'static ErrorLog,
}

impl BoardRtc {
    pub fn new(rtc: HalRtc, errors: &'static ErrorLog) -> Self {
        Self { rtc, errors }
    }

    fn read(&mut self) -> Option<DateTime> {
        match self.rtc.now() {
            Ok(now) => Some(now),
            Err(_) => {
                defmt::warn!("rtc: read failed");
                self.errors.raise(DiagnosticError::RtcAccess);
                None
            }
        }
    }

    fn write(&mut self, date: RtcDate, time: RtcTime) {
        let year = 2000 + u16::from(date.year);
        let written = DateTime::from(
            year,
            date.month,
            date.day,
            day_of_week(year, date.month, date.day),
            time.hours,
            time.minutes,
            time.seconds,
            0,
        )
        .ok()
        .map(|datetime| self.rtc.set_datetime(datetime));

        if !matches!(written, Some(Ok(()))) {
            defmt::warn!(
                "rtc: write rejected year={=u8} month={=u8} day={=u8}",
                date.year,
                date.month,
                date.day
            );
            self.errors.raise(DiagnosticError::RtcAccess);
        }
    }
}

impl Rtc for BoardRtc {
    fn time(&mut self) -> RtcTime {
        self.read().map_or_else(RtcTime::default, |now| RtcTime {
            hours: now.hour(),
            minutes: now.minute(),
            seconds: now.second(),
        })
    }

    fn date(&mut self) -> RtcDate {
        self.read().map_or_else(RtcDate::default, |now| RtcDate {
            year: u8::try_from(now.year().saturating_sub(2000) % 100).unwrap_or(0),
            month: now.month(),
            day: now.day(),
        })
    }

    fn set_time(&mut self, time: &RtcTime) {
        let date = self.date();
        self.write(date, *time);
    }

    fn set_date(&mut self, date: &RtcDate) {
        let time = self.time();
        self.write(*date, time);
    }
}

fn day_of_week(year: u16, month: u8, day: u8) -> DayOfWeek {
    const OFFSETS: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
    let year = if month < 3 { year - 1 } else { year };
    let month_offset = OFFSETS[usize::from(month.clamp(1, 12) - 1)];
    let index = (year + year / 4 - year / 100 + year / 400 + month_offset + u16::from(day)) % 7;
    match index {
        0 => DayOfWeek::Sunday,
        1 => DayOfWeek::Monday,
        2 => DayOfWeek::Tuesday,
        3 => DayOfWeek::Wednesday,
        4 => DayOfWeek::Thursday,
        5 => DayOfWeek::Friday,
        _ => DayOfWeek::Saturday,
    }
}

/// Push-pull contactor coil drivers; high closes the contactor.
pub struct ContactorOutputs {
    coils: [Output<'static>; CONTACTOR_SLOTS],
    counters: &'static ContactorCounters,
}

impl ContactorOutputs {
    pub fn new(coils: [Output<'static>; CONTACTOR_SLOTS], counters: &'static ContactorCounters) -> Self {
        Self { coils, counters }
    }
}

impl ContactorDriver for ContactorOutputs {
    fn set_state(&mut self, index: u8, state: ContactorState) {
        let slot = usize::from(index);
        let Some(coil) = self.coils.get_mut(slot) else {
            defmt::warn!("contactor: no output for index {=u8}", index);
            return;
        };
        match state {
            ContactorState::Closed => coil.set_high(),
            ContactorState::Open => coil.set_low(),
        }
        self.counters.record(slot, state);
        defmt::info!("contactor {=u8} -> {}", index, state);
    }
}
