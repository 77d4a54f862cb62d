//! Narrow interfaces to the collaborators the console drives.
//!
//! Firmware binds these to the RTC peripheral, contactor outputs and the
//! diagnostics store; the emulator and tests provide simulated versions.

use core::fmt;

use crate::clock::{RtcDate, RtcTime};

/// Real-time clock driver.
pub trait Rtc {
    fn time(&mut self) -> RtcTime;
    fn date(&mut self) -> RtcDate;
    fn set_time(&mut self, time: &RtcTime);
    fn set_date(&mut self, date: &RtcDate);
}

/// Requested contactor position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContactorState {
    /// Contactor closed (switched on).
    Closed,
    /// Contactor opened (switched off).
    Open,
}

/// Contactor actuation driver.
pub trait ContactorDriver {
    fn set_state(&mut self, index: u8, state: ContactorState);
}

/// Diagnostics/printing subsystem.
///
/// Reports are rendered onto the same console the command arrived on.
pub trait Diagnostics {
    /// Prints the contactor switching event counters.
    fn print_contactor_info(&mut self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Prints the list of recorded diagnostic errors.
    fn print_errors(&mut self, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Bundle of collaborators handed to the decoder every tick.
pub struct Devices<R, C, D> {
    pub rtc: R,
    pub contactors: C,
    pub diagnostics: D,
}

impl<R, C, D> Devices<R, C, D> {
    pub const fn new(rtc: R, contactors: C, diagnostics: D) -> Self {
        Self {
            rtc,
            contactors,
            diagnostics,
        }
    }
}
