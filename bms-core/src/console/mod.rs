//! Serial service console: command table, decoder and console text.
//!
//! [`decoder::CommandDecoder`] is the entry point. It is driven once per
//! scheduler tick with the shared [`crate::rx::ReceiveBuffer`] and the
//! platform [`crate::devices::Devices`].

pub mod catalog;
pub mod contactor;
pub mod decoder;
pub mod report;
