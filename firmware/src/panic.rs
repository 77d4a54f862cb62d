use core::panic::PanicInfo;

use cortex_m::peripheral::SCB;
use defmt::error;

/// Logs the panic and resets; contactor outputs come back up open.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("PANIC: {}", defmt::Display2Format(info));
    SCB::sys_reset();
}
