#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Contactor switching counters and the diagnostic error list.
//!
//! Both are plain atomics so the hardware adapters can record events from
//! any task while the console decoder prints them.

use core::fmt;

use bms_core::console::decoder::DEFAULT_CONTACTOR_COUNT;
use bms_core::devices::{ContactorState, Diagnostics};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Contactor outputs on the board; index `DEFAULT_CONTACTOR_COUNT` is addressable.
pub const CONTACTOR_SLOTS: usize = DEFAULT_CONTACTOR_COUNT as usize + 1;

pub struct ContactorCounters {
    closed: [AtomicBool; CONTACTOR_SLOTS],
    closings: [AtomicU32; CONTACTOR_SLOTS],
    openings: [AtomicU32; CONTACTOR_SLOTS],
}

impl ContactorCounters {
    pub const fn new() -> Self {
        Self {
            closed: [const { AtomicBool::new(false) }; CONTACTOR_SLOTS],
            closings: [const { AtomicU32::new(0) }; CONTACTOR_SLOTS],
            openings: [const { AtomicU32::new(0) }; CONTACTOR_SLOTS],
        }
    }

    pub fn record(&self, index: usize, state: ContactorState) {
        let Some(closed) = self.closed.get(index) else {
            return;
        };
        match state {
            ContactorState::Closed => {
                closed.store(true, Ordering::Relaxed);
                self.closings[index].fetch_add(1, Ordering::Relaxed);
            }
            ContactorState::Open => {
                closed.store(false, Ordering::Relaxed);
                self.openings[index].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn write_to(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for index in 0..CONTACTOR_SLOTS {
            let state = if self.closed[index].load(Ordering::Relaxed) {
                "closed"
            } else {
                "open"
            };
            write!(
                out,
                "Contactor {index}: {state}, closings: {}, openings: {}\r\n",
                self.closings[index].load(Ordering::Relaxed),
                self.openings[index].load(Ordering::Relaxed)
            )?;
        }
        Ok(())
    }
}

impl Default for ContactorCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Faults the console path itself can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum DiagnosticError {
    RxOverflow,
    TxTruncated,
    RtcAccess,
}

impl DiagnosticError {
    const ALL: [DiagnosticError; 3] = [
        DiagnosticError::RxOverflow,
        DiagnosticError::TxTruncated,
        DiagnosticError::RtcAccess,
    ];

    const fn bit(self) -> u32 {
        1 << self as u32
    }

    pub const fn description(self) -> &'static str {
        match self {
            DiagnosticError::RxOverflow => "serial receive buffer overflow",
            DiagnosticError::TxTruncated => "console output truncated",
            DiagnosticError::RtcAccess => "RTC access failed",
        }
    }
}

/// Latched error flags plus an occurrence count per flag.
pub struct ErrorLog {
    flags: AtomicU32,
    counts: [AtomicU32; DiagnosticError::ALL.len()],
}

impl ErrorLog {
    pub const fn new() -> Self {
        Self {
            flags: AtomicU32::new(0),
            counts: [const { AtomicU32::new(0) }; DiagnosticError::ALL.len()],
        }
    }

    pub fn raise(&self, error: DiagnosticError) {
        self.flags.fetch_or(error.bit(), Ordering::Relaxed);
        self.counts[error as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_raised(&self, error: DiagnosticError) -> bool {
        self.flags.load(Ordering::Relaxed) & error.bit() != 0
    }

    fn write_to(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut raised = DiagnosticError::ALL
            .iter()
            .filter(|error| self.is_raised(**error))
            .peekable();
        if raised.peek().is_none() {
            return out.write_str("No diagnostic errors recorded\r\n");
        }
        for (position, error) in raised.enumerate() {
            write!(
                out,
                "Error {position}: {} (x{})\r\n",
                error.description(),
                self.counts[*error as usize].load(Ordering::Relaxed)
            )?;
        }
        Ok(())
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Diagnostics`] view over the shared counters.
#[derive(Clone, Copy)]
pub struct FirmwareDiagnostics {
    contactors: &'static ContactorCounters,
    errors: &'static ErrorLog,
}

impl FirmwareDiagnostics {
    pub const fn new(contactors: &'static ContactorCounters, errors: &'static ErrorLog) -> Self {
        Self { contactors, errors }
    }
}

impl Diagnostics for FirmwareDiagnostics {
    fn print_contactor_info(&mut self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.contactors.write_to(out)
    }

    fn print_errors(&mut self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.errors.write_to(out)
    }
}
