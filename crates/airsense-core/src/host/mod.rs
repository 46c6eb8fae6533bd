//! Host Bridge
//!
//! The request/response surface a host process drives each sensor through:
//! `register` once, then `read` on whatever cadence it likes.
//!
//! Replies follow the host's two-value contract: a status plus a pair of
//! numbers, with `(0, 0)` standing in for the values on any failure. The
//! reason for a failure is not part of the reply; it is logged here and
//! counted in the session stats.

mod gas;
mod particulate;

pub use gas::{GasEndpoint, GasSensor};
pub use particulate::ParticulateEndpoint;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reply status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// Values are a fresh reading
    Ok,
    /// Values are the `(0, 0)` placeholder
    Error,
}

/// Reply to a host `read` request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostReply {
    /// Whether `values` holds a reading
    pub status: ReplyStatus,
    /// Reading pair, in the sensor's units
    pub values: (f64, f64),
}

impl HostReply {
    /// Successful reading
    pub fn ok(first: f64, second: f64) -> Self {
        Self {
            status: ReplyStatus::Ok,
            values: (first, second),
        }
    }

    /// Failure with the placeholder payload
    pub fn error() -> Self {
        Self {
            status: ReplyStatus::Error,
            values: (0.0, 0.0),
        }
    }

    /// Whether this reply carries a reading
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }

    /// Serialize for the message channel
    pub fn to_json(&self) -> String {
        // A status enum and two floats always serialize
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","values":[0.0,0.0]}"#.to_string()
        })
    }
}

/// Opaque token identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(Uuid);

impl Handle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
