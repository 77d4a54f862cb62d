//! Receive buffer shared between the transport producer and the decoder.
//!
//! The transport appends one byte at a time as data arrives; the decoder
//! only looks at the buffer once the last byte is the line terminator and
//! always clears it after handling the line. Firmware wraps the buffer in a
//! critical-section mutex and hands a snapshot to the decoder so that a byte
//! written concurrently with the clear is never lost or duplicated.

use core::fmt;

use heapless::Vec;

/// Capacity of the receive buffer in bytes.
pub const RX_CAPACITY: usize = 256;

/// Byte that marks the end of a command line.
pub const TERMINATOR: u8 = b'\r';

/// Errors reported to the producer side of the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// The buffer was full; the partial line has been discarded.
    Overflow,
}

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RxError::Overflow => f.write_str("receive buffer overflow"),
        }
    }
}

/// Fixed-capacity byte buffer filled by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiveBuffer {
    bytes: Vec<u8, RX_CAPACITY>,
}

impl ReceiveBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Appends a received byte.
    ///
    /// When the buffer is already full the partial line is dropped so the
    /// producer can resynchronise on the next terminator.
    pub fn push(&mut self, byte: u8) -> Result<(), RxError> {
        if self.bytes.push(byte).is_err() {
            self.bytes.clear();
            return Err(RxError::Overflow);
        }
        Ok(())
    }

    /// Appends a run of bytes, stopping at the first overflow.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), RxError> {
        for byte in bytes {
            self.push(*byte)?;
        }
        Ok(())
    }

    /// Current contents, terminator included.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Current fill length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `true` once the last written byte is the line terminator.
    #[must_use]
    pub fn is_line_ready(&self) -> bool {
        self.bytes.last() == Some(&TERMINATOR)
    }

    /// Returns the completed command without its terminator, if any.
    #[must_use]
    pub fn line(&self) -> Option<&[u8]> {
        if self.is_line_ready() {
            Some(&self.bytes[..self.bytes.len() - 1])
        } else {
            None
        }
    }

    /// Drops all contents and resets the fill index to zero.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Moves a completed line out of `self`, leaving it empty.
    ///
    /// Partial lines stay in place. This is the hand-off used by the
    /// firmware while interrupts are masked.
    pub fn take_ready(&mut self) -> Option<ReceiveBuffer> {
        if !self.is_line_ready() {
            return None;
        }
        let taken = self.clone();
        self.clear();
        Some(taken)
    }
}
