use embassy_futures::join::join;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use static_cell::StaticCell;

use crate::diagnostics::{DiagnosticError, ErrorLog};
use crate::serial::{RxSlot, TX_FRAME_CAPACITY, TxQueue};

const CONSOLE_UART_BAUD: u32 = 115_200;
const UART_BUFFER_SIZE: usize = TX_FRAME_CAPACITY;
const UART_RETRY_DELAY: Duration = Duration::from_millis(5);

static UART_TX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    rx_slot: &'static RxSlot,
    tx_queue: &'static TxQueue,
    errors: &'static ErrorLog,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = CONSOLE_UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize console UART");

    let (mut uart_tx, mut uart_rx) = uart.split();
    let outgoing = tx_queue.receiver();

    let transmit = async move {
        loop {
            let frame = outgoing.receive().await;
            if uart_tx.write_all(frame.as_bytes()).await.is_err() {
                defmt::warn!("console: UART write error");
                Timer::after(UART_RETRY_DELAY).await;
                continue;
            }
            if uart_tx.flush().await.is_err() {
                defmt::warn!("console: UART flush error");
            }
        }
    };

    let receive = async move {
        let mut ingress = [0u8; 32];
        loop {
            match uart_rx.read(&mut ingress).await {
                Ok(count) if count > 0 => {
                    let overflows = rx_slot.receive(&ingress[..count]);
                    if overflows > 0 {
                        defmt::warn!("console: receive buffer overflow, line dropped");
                        errors.raise(DiagnosticError::RxOverflow);
                    }
                }
                Ok(_) => {}
                Err(_) => {
                    defmt::warn!("console: UART read error");
                    Timer::after(UART_RETRY_DELAY).await;
                }
            }
        }
    };

    join(transmit, receive).await;
    loop {
        core::future::pending::<()>().await;
    }
}
