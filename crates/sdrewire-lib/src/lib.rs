//! SDReWire — control library for FTDI-based SD-card multiplexers.

pub mod config;
pub mod device;
pub mod error;
pub mod mux;
pub mod protocol;
pub mod tty;

pub use error::SdrewireError;
