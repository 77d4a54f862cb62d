//! Console text for decoder results.
//!
//! All lines are CRLF terminated, except the `WDG` marker which is the last
//! thing printed before the system stops servicing the watchdog.

use core::fmt;
use core::time::Duration;

use crate::clock::TimeDate;
use crate::devices::ContactorState;

use super::decoder::{CommandError, CommandOutcome};

pub const CRLF: &str = "\r\n";

/// Console sink that keeps going after a failed write and remembers it.
///
/// The transmit side is a bounded buffer; dropping output must not abort
/// the command that produced it.
pub struct Console<'a, W> {
    out: &'a mut W,
    truncated: bool,
}

impl<'a, W: fmt::Write> Console<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self {
            out,
            truncated: false,
        }
    }

    /// Returns `true` if any write was dropped.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }
}

impl<W: fmt::Write> fmt::Write for Console<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.out.write_str(s).is_err() {
            self.truncated = true;
        }
        Ok(())
    }
}

/// Writes the notice emitted when the session times out.
pub fn write_timeout_notice<W: fmt::Write + ?Sized>(out: &mut W) -> fmt::Result {
    write!(out, "Testmode disabled on timeout!{CRLF}")
}

/// Writes the `gettime` line.
pub fn write_time_and_date<W: fmt::Write + ?Sized>(out: &mut W, now: &TimeDate) -> fmt::Result {
    write!(out, "Date and Time: {now} {CRLF}")
}

/// Writes the console response for a dispatched line.
pub fn write_response<W: fmt::Write + ?Sized>(
    out: &mut W,
    line: &[u8],
    result: &Result<CommandOutcome, CommandError>,
) -> fmt::Result {
    match result {
        Ok(outcome) => write_outcome(out, outcome),
        Err(error) => write_error(out, line, error),
    }
}

fn write_outcome<W: fmt::Write + ?Sized>(out: &mut W, outcome: &CommandOutcome) -> fmt::Result {
    match outcome {
        CommandOutcome::TestModeEnabled => write!(out, "Testmode enabled!{CRLF}"),
        CommandOutcome::TestModeAlreadyEnabled => write!(out, "Testmode already enabled!{CRLF}"),
        CommandOutcome::TestModeDisabled => write!(out, "Testmode disabled on request!{CRLF}"),
        CommandOutcome::ContactorInfoPrinted | CommandOutcome::DiagnosticsPrinted => Ok(()),
        CommandOutcome::TimeReported(now) => write_time_and_date(out, now),
        CommandOutcome::TimeSet(_) => write!(out, "Time and date set!{CRLF}"),
        CommandOutcome::Contactor(command) => {
            let verb = match command.state {
                ContactorState::Closed => "enabled",
                ContactorState::Open => "disabled",
            };
            write!(out, "Contactor {} {verb}{CRLF}", command.index)
        }
        CommandOutcome::Reset => write!(out, "Software reset!{CRLF}"),
        CommandOutcome::WatchdogHalt => out.write_str("WDG"),
    }
}

fn write_error<W: fmt::Write + ?Sized>(
    out: &mut W,
    line: &[u8],
    error: &CommandError,
) -> fmt::Result {
    let heading = match error {
        CommandError::InvalidCommand => "Invalid command!",
        CommandError::InvalidParameterLength { .. } => "Invalid parameter length!",
        CommandError::InvalidParameterValue { .. } => "Invalid parameter!",
        CommandError::InvalidContactorIndex { count } => {
            return write!(
                out,
                "Invalid contactor number! Only {count} contactors are connected! {CRLF}"
            );
        }
        CommandError::InvalidContactorAction => return write!(out, "Invalid command!{CRLF}"),
    };
    write!(out, "{heading}{CRLF}{}{CRLF}", line.escape_ascii())
}

/// Boot-time summary printed once the RTC and UART are up.
pub fn write_startup_banner<W: fmt::Write + ?Sized>(
    out: &mut W,
    reset_cause: u32,
    now: &TimeDate,
    uptime: Duration,
) -> fmt::Result {
    write!(out, "System starting...{CRLF}")?;
    write!(out, "RCC Core Reset Register: 0x{reset_cause:08X}{CRLF}")?;
    write_time_and_date(out, now)?;

    let seconds = uptime.as_secs();
    write!(
        out,
        "Runtime: {:02}h {:02}m {:02}s{CRLF}",
        seconds / 3_600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
