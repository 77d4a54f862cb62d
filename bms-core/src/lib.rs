#![no_std]

// Service console logic for the battery-management controller.
//
// The crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library; hardware access goes through the traits in `devices`.

pub mod clock;
pub mod console;
pub mod devices;
pub mod rx;
pub mod session;

pub use console::decoder::{
    CommandDecoder, CommandError, CommandOutcome, DecoderConfig, SystemAction, TickReport,
};
