mod board;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use bms_core::console::decoder::TICK_PERIOD;

use session::{EmulatorConfig, Session};

const USAGE: &str = "Usage: bms-emulator [--timeout-ms <ms>] [--contactors <n>] \
                     [--transcript <path>] [--diag-error <text>]...";

fn main() -> io::Result<()> {
    let config = parse_args(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(&config)?;

    writeln!(
        writer,
        "BMS Console Emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    write_console(&mut writer, &session.power_on()?)?;

    let (lines, input) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines.send(line).is_err() {
                break;
            }
        }
    });

    let mut next_tick = Instant::now();
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match input.recv_timeout(wait) {
            Ok(line) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if should_terminate(trimmed) {
                    writeln!(writer, "Session closed.")?;
                    break;
                }
                if trimmed.trim() == "help" {
                    writeln!(writer, "{}", session::help_text())?;
                    continue;
                }
                if let Some(notice) = session.receive_line(trimmed)? {
                    writeln!(writer, "{notice}")?;
                }
                // Service the line before the next one can land behind it.
                let now = Instant::now();
                write_console(&mut writer, &session.tick(now)?)?;
                next_tick = now + TICK_PERIOD;
            }
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                write_console(&mut writer, &session.tick(now)?)?;
                next_tick = now + TICK_PERIOD;
            }
            Err(RecvTimeoutError::Disconnected) => {
                writeln!(writer)?;
                break;
            }
        }
    }

    Ok(())
}

fn write_console(writer: &mut impl Write, output: &str) -> io::Result<()> {
    if output.is_empty() {
        return Ok(());
    }
    writer.write_all(output.as_bytes())?;
    writer.flush()
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<EmulatorConfig, String> {
    let mut config = EmulatorConfig::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--timeout-ms" => {
                let raw = value()?;
                let millis = raw
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --timeout-ms value `{raw}`"))?;
                config.decoder.test_mode_timeout = Duration::from_millis(millis);
            }
            "--contactors" => {
                let raw = value()?;
                config.decoder.contactor_count = raw
                    .parse::<u8>()
                    .ok()
                    .filter(|count| *count <= 9)
                    .ok_or_else(|| format!("Invalid --contactors value `{raw}` (0-9)"))?;
            }
            "--transcript" => config.transcript = Some(PathBuf::from(value()?)),
            "--diag-error" => config.diag_errors.push(value()?),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(config)
}
