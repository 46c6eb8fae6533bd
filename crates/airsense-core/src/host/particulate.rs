use tracing::{debug, info, warn};

use super::{Handle, HostReply};
use crate::protocol::{
    LinkUnavailable, SensorLink, SerialPollSession, SessionConfig, SessionFault, SessionStats,
};

/// Host-facing endpoint for the SDS021 particulate sensor
pub struct ParticulateEndpoint {
    session: SerialPollSession,
    handle: Option<Handle>,
    /// Device path of the current registration, if it came from `register`
    port: Option<String>,
}

impl ParticulateEndpoint {
    /// Create an endpoint with no device registered yet
    pub fn new(config: SessionConfig) -> Self {
        Self {
            session: SerialPollSession::unregistered(config),
            handle: None,
            port: None,
        }
    }

    /// Open the device at `link_identifier`
    ///
    /// On failure the previous registration, if any, stays in place. The
    /// exception is re-registering the device that is already open: serial
    /// ports open exclusively, so that session is closed first and a failed
    /// reopen leaves the endpoint unregistered.
    pub fn register(&mut self, link_identifier: &str) -> Result<Handle, LinkUnavailable> {
        self.register_with(link_identifier, SerialPollSession::open)
    }

    fn register_with(
        &mut self,
        link_identifier: &str,
        open: impl FnOnce(&str, SessionConfig) -> Result<SerialPollSession, LinkUnavailable>,
    ) -> Result<Handle, LinkUnavailable> {
        if self.port.as_deref() == Some(link_identifier) {
            debug!(port = link_identifier, "Releasing device before reopening it");
            self.close();
        }

        let config = self.session.config().clone();
        let session = open(link_identifier, config).map_err(|e| {
            warn!(port = link_identifier, error = %e, "Particulate sensor registration failed");
            e
        })?;

        let handle = self.install(session);
        self.port = Some(link_identifier.to_string());
        info!(port = link_identifier, %handle, "Particulate sensor registered");
        Ok(handle)
    }

    /// Register an already-open link (demo mode, tests)
    pub fn register_link(&mut self, link: impl SensorLink + 'static) -> Handle {
        let config = self.session.config().clone();
        let handle = self.install(SerialPollSession::with_link(link, config));
        info!(%handle, "Particulate sensor registered on supplied link");
        handle
    }

    fn install(&mut self, session: SerialPollSession) -> Handle {
        self.session = session;
        self.port = None;
        let handle = Handle::new();
        self.handle = Some(handle);
        handle
    }

    /// Current registration
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    /// Take one reading as `(pm25, pm10)` in µg/m³
    pub fn read(&mut self) -> HostReply {
        match self.session.read() {
            Ok(reading) => {
                debug!(pm25 = reading.pm25(), pm10 = reading.pm10(), "Particulate reading");
                HostReply::ok(reading.pm25(), reading.pm10())
            }
            Err(SessionFault::NotRegistered) => {
                warn!("Particulate read before registration");
                HostReply::error()
            }
            Err(fault) => {
                debug!(error = %fault, "Particulate read failed");
                HostReply::error()
            }
        }
    }

    /// Outcome counters of the current registration
    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Drop the registration and release the device
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!(%handle, "Particulate sensor closed");
        }
        self.port = None;
        self.session.close();
    }

    /// Hand the session over to a poller
    pub fn into_session(self) -> SerialPollSession {
        self.session
    }
}
