//! SniffNet library: portable duty-cycled WiFi capture engine.
//!
//! A sensor node alternates between a SNIFF phase, where the radio listens
//! promiscuously while sweeping channels 1..=13 and logs one record per
//! received frame, and a TRANSMIT phase, where it joins an uplink network
//! and ships the log to a fixed collector before clearing it.
//!
//! Everything here is `no_std`, allocation-free and testable on any host
//! with `cargo test`. Platform binaries are thin consumers that implement
//! the [`radio`] and [`comm`] capability traits and feed raw frames into
//! [`scanner::FrameCapture`].
//!
//! - `record`, `buffer`: the observation type and the bounded capture log
//! - `scanner`: frame-callback front end and capture gate
//! - `sweep`: channel sweeping with confirmed cancellation
//! - `protocol`: binary and JSON delivery framing
//! - `comm`: transport client to the collector
//! - `duty`: the SNIFF / TRANSMIT state machine
//! - `config`, `defaults`: build-time constants and runtime configuration

#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod comm;
pub mod config;
pub mod defaults;
pub mod duty;
pub mod protocol;
pub mod radio;
pub mod record;
pub mod scanner;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use duty::{CycleReport, DutyCycle, Phase};
pub use record::Observation;
