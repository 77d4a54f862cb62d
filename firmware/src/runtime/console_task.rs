use bms_core::clock::TimeDate;
use bms_core::console::decoder::TICK_PERIOD;
use bms_core::console::report;
use bms_core::devices::Rtc;
use bms_core::rx::ReceiveBuffer;
use bms_core::{CommandDecoder, DecoderConfig, SystemAction, TickReport};
use cortex_m::peripheral::SCB;
use embassy_stm32::peripherals::IWDG;
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_time::{Duration, Ticker, Timer};

use super::BoardDevices;
use crate::diagnostics::{DiagnosticError, ErrorLog};
use crate::instant::{FirmwareInstant, core_duration_to_embassy};
use crate::serial::{RxSlot, TxFrame, TxQueue};

/// Time for the UART to drain the last frame before the core stops.
const DRAIN_DELAY: Duration = Duration::from_millis(50);

#[embassy_executor::task]
pub async fn run(
    rx_slot: &'static RxSlot,
    tx_queue: &'static TxQueue,
    errors: &'static ErrorLog,
    mut devices: BoardDevices,
    mut watchdog: IndependentWatchdog<'static, IWDG>,
    reset_cause: u32,
) -> ! {
    let outgoing = tx_queue.sender();

    let mut banner = TxFrame::new();
    let now = TimeDate::new(devices.rtc.date(), devices.rtc.time());
    let uptime = FirmwareInstant::now().since_boot();
    if report::write_startup_banner(&mut banner, reset_cause, &now, uptime).is_err() {
        errors.raise(DiagnosticError::TxTruncated);
    }
    outgoing.send(banner).await;

    let mut decoder = CommandDecoder::<FirmwareInstant>::new(DecoderConfig::DEFAULT);
    let mut ticker = Ticker::every(core_duration_to_embassy(TICK_PERIOD));

    loop {
        ticker.next().await;
        watchdog.pet();

        let mut line = rx_slot.take_line().unwrap_or_else(ReceiveBuffer::new);
        let mut frame = TxFrame::new();
        let report = decoder.tick(&mut line, FirmwareInstant::now(), &mut devices, &mut frame);
        log_report(&report);

        if report.truncated {
            errors.raise(DiagnosticError::TxTruncated);
        }
        if !frame.is_empty() {
            outgoing.send(frame).await;
        }

        match report.system_action() {
            SystemAction::Continue => {}
            SystemAction::Reset => {
                Timer::after(DRAIN_DELAY).await;
                SCB::sys_reset();
            }
            SystemAction::AwaitWatchdog => {
                Timer::after(DRAIN_DELAY).await;
                cortex_m::interrupt::disable();
                loop {
                    cortex_m::asm::nop();
                }
            }
        }
    }
}

fn log_report(report: &TickReport) {
    if report.expired {
        defmt::info!("console: test mode timed out");
    }
    match &report.response {
        Some(Ok(outcome)) => defmt::info!("console: {}", outcome),
        Some(Err(error)) => defmt::warn!("console: rejected ({})", error),
        None => {}
    }
}
