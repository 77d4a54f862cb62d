use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bms_core::clock::{RtcDate, RtcTime, TimeDate};
use bms_core::console::catalog;
use bms_core::console::report;
use bms_core::devices::Devices;
use bms_core::rx::{ReceiveBuffer, TERMINATOR};
use bms_core::{CommandDecoder, DecoderConfig, SystemAction};

use crate::board::{self, SimContactors, SimDiagnostics, SimRtc};

/// Delay before the simulated independent watchdog fires.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_millis(500);

/// Reset-cause value reported after a software reset (SFTRSTF).
const RESET_CAUSE_SOFTWARE: u32 = 0x1000_0000;
/// Reset-cause value reported after a watchdog reset (IWDGRSTF).
const RESET_CAUSE_WATCHDOG: u32 = 0x2000_0000;
/// Reset-cause value reported at power-on (PWRRSTF).
const RESET_CAUSE_POWER_ON: u32 = 0x0800_0000;

type SimDevices = Devices<SimRtc, SimContactors, SimDiagnostics>;

/// Emulator settings parsed from the command line.
#[derive(Clone, Debug)]
pub struct EmulatorConfig {
    pub decoder: DecoderConfig,
    pub transcript: Option<PathBuf>,
    pub diag_errors: Vec<String>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::DEFAULT,
            transcript: None,
            diag_errors: Vec::new(),
        }
    }
}

enum Power {
    Running,
    /// Interrupts masked; the watchdog resets the board at the deadline.
    Halted { reset_at: Instant },
}

/// One emulated controller: decoder, receive buffer and simulated board.
pub struct Session {
    config: DecoderConfig,
    decoder: CommandDecoder<Instant>,
    devices: SimDevices,
    rx: ReceiveBuffer,
    power: Power,
    booted_at: Instant,
    started_at: Instant,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(config: &EmulatorConfig) -> io::Result<Self> {
        let transcript = config
            .transcript
            .as_deref()
            .map(TranscriptLogger::new)
            .transpose()?;

        let log = board::contactor_log(config.decoder.contactor_count);
        let mut diagnostics = SimDiagnostics::new(Rc::clone(&log));
        for error in &config.diag_errors {
            diagnostics.record_error(error.clone());
        }
        let rtc = SimRtc::new(TimeDate::new(
            RtcDate {
                year: 24,
                month: 1,
                day: 1,
            },
            RtcTime::default(),
        ));

        let now = Instant::now();
        Ok(Self {
            config: config.decoder,
            decoder: CommandDecoder::new(config.decoder),
            devices: Devices::new(rtc, SimContactors::new(log), diagnostics),
            rx: ReceiveBuffer::new(),
            power: Power::Running,
            booted_at: now,
            started_at: now,
            transcript,
        })
    }

    /// Startup banner for a power-on boot.
    pub fn power_on(&mut self) -> io::Result<String> {
        self.boot(RESET_CAUSE_POWER_ON)
    }

    /// Feeds a host line into the receive buffer, terminator appended.
    pub fn receive_line(&mut self, line: &str) -> io::Result<Option<String>> {
        self.log(TranscriptRole::Host, line)?;

        if matches!(self.power, Power::Halted { .. }) {
            return Ok(Some("[emulator] interrupts masked, input dropped".to_string()));
        }

        let pushed = self
            .rx
            .extend(line.as_bytes())
            .and_then(|()| self.rx.push(TERMINATOR));
        match pushed {
            Ok(()) => Ok(None),
            Err(error) => Ok(Some(format!("[emulator] {error}, line discarded"))),
        }
    }

    /// Runs one scheduler tick and returns any console output.
    pub fn tick(&mut self, now: Instant) -> io::Result<String> {
        if let Power::Halted { reset_at } = self.power {
            if now < reset_at {
                return Ok(String::new());
            }
            let mut output = String::from("\r\n[emulator] watchdog reset\r\n");
            output.push_str(&self.boot(RESET_CAUSE_WATCHDOG)?);
            return Ok(output);
        }

        let mut output = String::new();
        let report = self
            .decoder
            .tick(&mut self.rx, now, &mut self.devices, &mut output);
        if !output.is_empty() {
            self.log(TranscriptRole::Console, output.trim_end())?;
        }

        match report.system_action() {
            SystemAction::Continue => {}
            SystemAction::Reset => {
                output.push_str("[emulator] software reset\r\n");
                output.push_str(&self.boot(RESET_CAUSE_SOFTWARE)?);
            }
            SystemAction::AwaitWatchdog => {
                output.push_str("\r\n[emulator] interrupts masked, waiting for watchdog\r\n");
                self.power = Power::Halted {
                    reset_at: now + WATCHDOG_TIMEOUT,
                };
            }
        }

        Ok(output)
    }

    #[cfg(test)]
    fn test_mode_active(&self) -> bool {
        self.decoder.session().is_active()
    }

    fn boot(&mut self, reset_cause: u32) -> io::Result<String> {
        self.decoder = CommandDecoder::new(self.config);
        self.rx.clear();
        self.power = Power::Running;

        let uptime = self.booted_at.elapsed();
        let mut banner = String::new();
        // Writing into a `String` cannot fail.
        let now = self.devices.rtc.now();
        let _ = report::write_startup_banner(&mut banner, reset_cause, &now, uptime);
        self.booted_at = Instant::now();

        self.log(TranscriptRole::Console, banner.trim_end())?;
        Ok(banner)
    }

    fn log(&mut self, role: TranscriptRole, text: &str) -> io::Result<()> {
        let elapsed = self.started_at.elapsed();
        match self.transcript.as_mut() {
            Some(transcript) => {
                for line in text.lines() {
                    transcript.append_line(elapsed, role, line.trim_end_matches('\r'))?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Usage lines for the emulator `help` command.
pub fn help_text() -> String {
    let mut buffer = String::from("Commands (terminated by CR):\n");
    for spec in catalog::commands() {
        buffer.push_str("  ");
        buffer.push_str(spec.usage);
        if spec.access == catalog::Access::Privileged {
            buffer.push_str(" [test mode]");
        }
        buffer.push('\n');
    }
    buffer.push_str("  help | exit | quit          - emulator controls");
    buffer
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# BMS service console emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Console,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Console => "BMS <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&EmulatorConfig::default()).expect("session without transcript")
    }

    #[test]
    fn line_is_handled_on_next_tick() {
        let mut session = session();
        assert_eq!(session.receive_line("teston").unwrap(), None);
        let output = session.tick(Instant::now()).unwrap();
        assert_eq!(output, "Testmode enabled!\r\n");
        assert!(session.test_mode_active());
    }

    #[test]
    fn reset_reboots_with_inactive_session() {
        let mut session = session();
        session.receive_line("teston").unwrap();
        session.tick(Instant::now()).unwrap();

        session.receive_line("reset").unwrap();
        let output = session.tick(Instant::now()).unwrap();

        assert!(output.starts_with("Software reset!\r\n[emulator] software reset\r\n"));
        assert!(output.contains("RCC Core Reset Register: 0x10000000"));
        assert!(!session.test_mode_active());
    }

    #[test]
    fn watchdog_test_halts_until_deadline() {
        let mut session = session();
        let start = Instant::now();
        session.receive_line("teston").unwrap();
        session.tick(start).unwrap();

        session.receive_line("watchdogtest").unwrap();
        let output = session.tick(start).unwrap();
        assert!(output.starts_with("WDG"));

        assert!(session.receive_line("gettime").unwrap().is_some());
        assert_eq!(session.tick(start + WATCHDOG_TIMEOUT / 2).unwrap(), "");

        let output = session.tick(start + WATCHDOG_TIMEOUT).unwrap();
        assert!(output.contains("watchdog reset"));
        assert!(output.contains("RCC Core Reset Register: 0x20000000"));
        assert!(!session.test_mode_active());
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for spec in catalog::commands() {
            assert!(help.contains(spec.usage), "missing {}", spec.name);
        }
    }
}
