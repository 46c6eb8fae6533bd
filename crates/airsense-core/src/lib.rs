//! # AirSense Core Library
//!
//! Core functionality for reading air-quality sensors on a single-board computer.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - SDS021 particulate sensor frame decoding with a typed fault taxonomy
//! - A blocking serial poll session (flush, settle, read, decode)
//! - Host-facing endpoints with the `(status, (a, b))` reply contract
//! - An async poll loop with retry and read deadlines
//! - A simulated sensor link for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use airsense_core::protocol::{SerialPollSession, SessionConfig};
//!
//! let mut session = SerialPollSession::open("/dev/ttyUSB0", SessionConfig::default())?;
//!
//! match session.read() {
//!     Ok(reading) => println!("{}", reading),
//!     Err(fault) => eprintln!("no reading: {}", fault),
//! }
//! ```

pub mod config;
pub mod demo;
pub mod host;
pub mod poll;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::demo::{DemoLink, FaultRates};
    pub use crate::host::{GasEndpoint, GasSensor, HostReply, ParticulateEndpoint};
    pub use crate::poll::{PollConfig, Poller, Sample};
    pub use crate::protocol::{
        decode, DecodeFault, Reading, SerialPollSession, SessionConfig, SessionFault, SyncMode,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
