use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[allow(dead_code)]
#[path = "../board.rs"]
mod board;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use bms_core::DecoderConfig;
use session::{EmulatorConfig, Session};

/// Short timeout so the expiry scenario completes quickly.
const CAPTURE_TIMEOUT: Duration = Duration::from_millis(200);

fn main() -> io::Result<()> {
    record("logs/service_session.log", record_service_session)?;
    record("logs/test_mode_timeout.log", record_timeout)?;
    record("logs/watchdog.log", record_watchdog)?;
    Ok(())
}

fn record(path: &str, script: fn(&mut Script) -> io::Result<()>) -> io::Result<()> {
    let config = EmulatorConfig {
        decoder: DecoderConfig {
            test_mode_timeout: CAPTURE_TIMEOUT,
            ..DecoderConfig::DEFAULT
        },
        transcript: Some(PathBuf::from(path)),
        diag_errors: vec!["cell 7 undervoltage".to_string()],
    };
    let mut session = Session::new(&config)?;
    session.power_on()?;
    script(&mut Script {
        session,
        now: Instant::now(),
    })
}

struct Script {
    session: Session,
    now: Instant,
}

impl Script {
    fn send(&mut self, line: &str) -> io::Result<()> {
        self.session.receive_line(line)?;
        self.advance(bms_core::console::decoder::TICK_PERIOD)
    }

    fn advance(&mut self, by: Duration) -> io::Result<()> {
        self.now += by;
        self.session.tick(self.now)?;
        Ok(())
    }
}

fn record_service_session(script: &mut Script) -> io::Result<()> {
    script.send("gettime")?;
    script.send("ce1")?;
    script.send("teston")?;
    script.send("settime 25.06.30 12:00:00")?;
    script.send("settime 25.13.30 12:00:00")?;
    script.send("gettime")?;
    script.send("ce1")?;
    script.send("cd1")?;
    script.send("ce7")?;
    script.send("printcontactorinfo")?;
    script.send("printdiaginfo")?;
    script.send("testoff")?;
    script.send("reset")
}

fn record_timeout(script: &mut Script) -> io::Result<()> {
    script.send("teston")?;
    script.advance(CAPTURE_TIMEOUT / 2)?;
    script.send("ce0")?;
    script.advance(CAPTURE_TIMEOUT)?;
    script.send("cd0")
}

fn record_watchdog(script: &mut Script) -> io::Result<()> {
    script.send("teston")?;
    script.send("watchdogtest")?;
    script.send("gettime")?;
    script.advance(session::WATCHDOG_TIMEOUT)?;
    script.send("gettime")
}
