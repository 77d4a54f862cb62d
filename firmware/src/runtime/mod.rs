use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::rtc::{Rtc as HalRtc, RtcConfig};
use embassy_stm32::wdg::IndependentWatchdog;

use bms_core::devices::Devices;

use crate::diagnostics::{ContactorCounters, ErrorLog, FirmwareDiagnostics};
use crate::hw::{self, BoardRtc, ContactorOutputs};
use crate::serial::{RxSlot, TxQueue};

mod console_task;
mod uart_task;

/// IWDG period; must outlast the UART drain before a reset.
const WATCHDOG_TIMEOUT_US: u32 = 500_000;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static RX_SLOT: RxSlot = RxSlot::new();
pub(super) static TX_QUEUE: TxQueue = TxQueue::new();
pub(super) static CONTACTORS: ContactorCounters = ContactorCounters::new();
pub(super) static ERRORS: ErrorLog = ErrorLog::new();

pub(super) type BoardDevices = Devices<BoardRtc, ContactorOutputs, FirmwareDiagnostics>;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let reset_cause = hw::take_reset_cause();
    defmt::info!("boot: reset cause 0x{=u32:08x}", reset_cause);

    let config = hal::Config::default();
    let hal::Peripherals {
        PA4,
        PA5,
        PA6,
        PA7,
        PB0,
        PB1,
        RTC,
        IWDG,
        USART5,
        ..
    } = hal::init(config);

    let coils = [
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
        Output::new(PA7, Level::Low, Speed::Low),
    ];
    let devices = Devices::new(
        BoardRtc::new(HalRtc::new(RTC, RtcConfig::default()), &ERRORS),
        ContactorOutputs::new(coils, &CONTACTORS),
        FirmwareDiagnostics::new(&CONTACTORS, &ERRORS),
    );

    let mut watchdog = IndependentWatchdog::new(IWDG, WATCHDOG_TIMEOUT_US);
    watchdog.unleash();

    spawner
        .spawn(uart_task::run(&RX_SLOT, &TX_QUEUE, &ERRORS, USART5, PB0, PB1))
        .expect("failed to spawn UART task");

    spawner
        .spawn(console_task::run(
            &RX_SLOT,
            &TX_QUEUE,
            &ERRORS,
            devices,
            watchdog,
            reset_cause,
        ))
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
