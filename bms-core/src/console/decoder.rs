//! Command decoder invoked once per scheduler tick.
//!
//! Each tick first lets the test-mode session expire, then, if the receive
//! buffer holds a terminated line, resolves it against the command table,
//! applies the session gate, runs the action against the collaborators and
//! writes the console response. A handled line is always cleared from the
//! buffer, whatever the outcome.

use core::fmt;
use core::ops::Add;
use core::time::Duration;

use crate::clock::{self, FieldMask, SetTimeError, TimeDate};
use crate::devices::{ContactorDriver, Devices, Diagnostics, Rtc};
use crate::rx::ReceiveBuffer;
use crate::session::{ArmOutcome, DEFAULT_TEST_MODE_TIMEOUT, TestModeSession};

use super::catalog::{self, Access, CommandTag};
use super::contactor::{self, ContactorCommand, ContactorError};
use super::report::{self, Console};

/// Scheduler period the decoder is designed for.
pub const TICK_PERIOD: Duration = Duration::from_millis(10);

/// Number of contactors wired on the reference board.
pub const DEFAULT_CONTACTOR_COUNT: u8 = 3;

/// Decoder tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Privileged commands stay available this long after the last command.
    pub test_mode_timeout: Duration,
    /// Highest contactor index accepted by `c<e|d><n>`.
    pub contactor_count: u8,
}

impl DecoderConfig {
    pub const DEFAULT: DecoderConfig = DecoderConfig {
        test_mode_timeout: DEFAULT_TEST_MODE_TIMEOUT,
        contactor_count: DEFAULT_CONTACTOR_COUNT,
    };
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Successful command results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandOutcome {
    TestModeEnabled,
    TestModeAlreadyEnabled,
    TestModeDisabled,
    ContactorInfoPrinted,
    DiagnosticsPrinted,
    TimeReported(TimeDate),
    TimeSet(TimeDate),
    Contactor(ContactorCommand),
    /// The caller must restart the system immediately.
    Reset,
    /// The caller must mask interrupts and stop servicing the watchdog.
    WatchdogHalt,
}

/// Command rejections. None of them change session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Unknown text, or a privileged command while the session is inactive.
    InvalidCommand,
    InvalidParameterLength { received: usize },
    InvalidParameterValue { rejected: FieldMask },
    InvalidContactorIndex { count: u8 },
    /// `c` command whose action letter is neither `e` nor `d`.
    InvalidContactorAction,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::InvalidCommand => f.write_str("invalid command"),
            CommandError::InvalidParameterLength { received } => fmt::Display::fmt(
                &SetTimeError::Length {
                    received: *received,
                },
                f,
            ),
            CommandError::InvalidParameterValue { rejected } => fmt::Display::fmt(
                &SetTimeError::Value {
                    rejected: *rejected,
                },
                f,
            ),
            CommandError::InvalidContactorIndex { count } => {
                fmt::Display::fmt(&ContactorError::InvalidIndex { count: *count }, f)
            }
            CommandError::InvalidContactorAction => {
                fmt::Display::fmt(&ContactorError::InvalidAction, f)
            }
        }
    }
}

impl From<SetTimeError> for CommandError {
    fn from(error: SetTimeError) -> Self {
        match error {
            SetTimeError::Length { received } => Self::InvalidParameterLength { received },
            SetTimeError::Value { rejected } => Self::InvalidParameterValue { rejected },
        }
    }
}

impl From<ContactorError> for CommandError {
    fn from(error: ContactorError) -> Self {
        match error {
            ContactorError::InvalidIndex { count } => Self::InvalidContactorIndex { count },
            ContactorError::InvalidAction => Self::InvalidContactorAction,
        }
    }
}

/// What the scheduler has to do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemAction {
    Continue,
    /// Restart the system now.
    Reset,
    /// Halted, awaiting an external watchdog reset.
    AwaitWatchdog,
}

/// Summary of a single decoder tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// The session timed out during this tick.
    pub expired: bool,
    /// Result of the dispatched line, if one was ready.
    pub response: Option<Result<CommandOutcome, CommandError>>,
    /// Some console output did not fit the transmit buffer.
    pub truncated: bool,
}

impl TickReport {
    #[must_use]
    pub fn dispatched(&self) -> bool {
        self.response.is_some()
    }

    #[must_use]
    pub fn system_action(&self) -> SystemAction {
        match self.response {
            Some(Ok(CommandOutcome::Reset)) => SystemAction::Reset,
            Some(Ok(CommandOutcome::WatchdogHalt)) => SystemAction::AwaitWatchdog,
            _ => SystemAction::Continue,
        }
    }
}

/// Serial command decoder state: session plus the shared time/date record.
pub struct CommandDecoder<Instant> {
    config: DecoderConfig,
    session: TestModeSession<Instant>,
    clock: TimeDate,
}

impl<Instant> CommandDecoder<Instant>
where
    Instant: Copy + Ord + Add<Duration, Output = Instant>,
{
    #[must_use]
    pub const fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            session: TestModeSession::new(config.test_mode_timeout),
            clock: TimeDate::new(
                clock::RtcDate {
                    year: 0,
                    month: 1,
                    day: 1,
                },
                clock::RtcTime {
                    hours: 0,
                    minutes: 0,
                    seconds: 0,
                },
            ),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &TestModeSession<Instant> {
        &self.session
    }

    /// Shared time/date record last read from or staged for the RTC.
    #[must_use]
    pub fn clock(&self) -> &TimeDate {
        &self.clock
    }

    /// Runs one scheduler tick.
    pub fn tick<R, C, D, W>(
        &mut self,
        rx: &mut ReceiveBuffer,
        now: Instant,
        devices: &mut Devices<R, C, D>,
        out: &mut W,
    ) -> TickReport
    where
        R: Rtc,
        C: ContactorDriver,
        D: Diagnostics,
        W: fmt::Write,
    {
        let mut console = Console::new(out);

        let expired = self.session.check_expired(now);
        if expired {
            let _ = report::write_timeout_notice(&mut console);
        }

        let response = rx.line().map(|line| {
            let result = self.dispatch(line, now, devices, &mut console);
            let _ = report::write_response(&mut console, line, &result);
            result
        });
        if response.is_some() {
            rx.clear();
        }

        TickReport {
            expired,
            response,
            truncated: console.truncated(),
        }
    }

    fn dispatch<R, C, D, W>(
        &mut self,
        line: &[u8],
        now: Instant,
        devices: &mut Devices<R, C, D>,
        console: &mut Console<'_, W>,
    ) -> Result<CommandOutcome, CommandError>
    where
        R: Rtc,
        C: ContactorDriver,
        D: Diagnostics,
        W: fmt::Write,
    {
        let spec = catalog::lookup(line);
        let permitted = spec.filter(|spec| {
            spec.access == Access::Global || self.session.is_active()
        });

        let Some(spec) = permitted else {
            if self.session.is_active() {
                self.session.rearm(now);
            }
            return Err(CommandError::InvalidCommand);
        };

        let result = self.execute(spec.tag, line, now, devices, console);
        if spec.tag.rearms_session() {
            self.session.rearm(now);
        }
        result
    }

    fn execute<R, C, D, W>(
        &mut self,
        tag: CommandTag,
        line: &[u8],
        now: Instant,
        devices: &mut Devices<R, C, D>,
        console: &mut Console<'_, W>,
    ) -> Result<CommandOutcome, CommandError>
    where
        R: Rtc,
        C: ContactorDriver,
        D: Diagnostics,
        W: fmt::Write,
    {
        match tag {
            CommandTag::TestOn => Ok(match self.session.arm(now) {
                ArmOutcome::Enabled => CommandOutcome::TestModeEnabled,
                ArmOutcome::AlreadyEnabled => CommandOutcome::TestModeAlreadyEnabled,
            }),
            CommandTag::PrintContactorInfo => {
                if devices.diagnostics.print_contactor_info(console).is_err() {
                    console.mark_truncated();
                }
                Ok(CommandOutcome::ContactorInfoPrinted)
            }
            CommandTag::PrintDiagInfo => {
                if devices.diagnostics.print_errors(console).is_err() {
                    console.mark_truncated();
                }
                Ok(CommandOutcome::DiagnosticsPrinted)
            }
            CommandTag::GetTime => {
                let time = devices.rtc.time();
                let date = devices.rtc.date();
                self.clock = TimeDate::new(date, time);
                Ok(CommandOutcome::TimeReported(self.clock))
            }
            CommandTag::TestOff => {
                self.session.disarm();
                Ok(CommandOutcome::TestModeDisabled)
            }
            CommandTag::SetTime => {
                // Valid fields stay in `self.clock` even when another field
                // is rejected; only the RTC commit is skipped.
                clock::apply_settime(line, &mut self.clock)?;
                devices.rtc.set_time(&self.clock.time);
                devices.rtc.set_date(&self.clock.date);
                Ok(CommandOutcome::TimeSet(self.clock))
            }
            CommandTag::Reset => Ok(CommandOutcome::Reset),
            CommandTag::WatchdogTest => Ok(CommandOutcome::WatchdogHalt),
            CommandTag::Contactor => {
                contactor::execute(line, self.config.contactor_count, &mut devices.contactors)
                    .map(CommandOutcome::Contactor)
                    .map_err(CommandError::from)
            }
        }
    }
}
