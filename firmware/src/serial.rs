#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Hand-off between the UART tasks and the console decoder.
//!
//! Received bytes land in a single [`ReceiveBuffer`] guarded by a blocking
//! mutex. The decoder only ever sees a snapshot of a completed line; the
//! live buffer is cleared in the same critical section.

use core::cell::RefCell;

use bms_core::rx::{ReceiveBuffer, RxError};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::String;

/// Largest chunk of console text queued for transmission at once.
pub const TX_FRAME_CAPACITY: usize = 256;

/// Number of frames the transmit side can hold.
pub const TX_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
type SerialMutex = CriticalSectionRawMutex;
#[cfg(not(target_os = "none"))]
type SerialMutex = NoopRawMutex;

/// Text produced by one decoder tick.
pub type TxFrame = String<TX_FRAME_CAPACITY>;

pub type TxQueue = Channel<SerialMutex, TxFrame, TX_QUEUE_DEPTH>;
pub type TxSender<'a> = Sender<'a, SerialMutex, TxFrame, TX_QUEUE_DEPTH>;
pub type TxReceiver<'a> = Receiver<'a, SerialMutex, TxFrame, TX_QUEUE_DEPTH>;

/// Receive buffer shared between the UART reader and the decoder.
pub struct RxSlot {
    buffer: Mutex<SerialMutex, RefCell<ReceiveBuffer>>,
}

impl RxSlot {
    pub const fn new() -> Self {
        Self {
            buffer: Mutex::new(RefCell::new(ReceiveBuffer::new())),
        }
    }

    /// Appends received bytes. Returns how many overflows occurred.
    pub fn receive(&self, bytes: &[u8]) -> usize {
        self.buffer.lock(|buffer| {
            let mut buffer = buffer.borrow_mut();
            bytes
                .iter()
                .filter(|byte| matches!(buffer.push(**byte), Err(RxError::Overflow)))
                .count()
        })
    }

    /// Moves a completed line out, leaving the live buffer empty.
    pub fn take_line(&self) -> Option<ReceiveBuffer> {
        self.buffer.lock(|buffer| buffer.borrow_mut().take_ready())
    }
}

impl Default for RxSlot {
    fn default() -> Self {
        Self::new()
    }
}
