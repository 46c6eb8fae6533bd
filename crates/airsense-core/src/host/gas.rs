use tracing::{debug, info, warn};

use super::{Handle, HostReply};

/// CCS811-style gas sensor driver
///
/// Implemented over whatever I2C driver the board provides. The endpoint only
/// calls through; it adds no protocol of its own.
pub trait GasSensor: Send {
    /// Driver error type
    type Error: std::error::Error;

    /// Whether a new measurement is ready
    fn available(&mut self) -> bool;

    /// Latch the latest measurement into the driver
    fn read_data(&mut self) -> Result<(), Self::Error>;

    /// Equivalent CO2 in ppm from the last `read_data`
    fn eco2(&self) -> u16;

    /// Total VOC in ppb from the last `read_data`
    fn tvoc(&self) -> u16;
}

/// Host-facing endpoint for the gas sensor
pub struct GasEndpoint<S: GasSensor> {
    sensor: Option<S>,
    handle: Option<Handle>,
}

impl<S: GasSensor> Default for GasEndpoint<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GasSensor> GasEndpoint<S> {
    /// Create an endpoint with no sensor registered yet
    pub fn new() -> Self {
        Self {
            sensor: None,
            handle: None,
        }
    }

    /// Attach a sensor driver, replacing any previous one
    pub fn register(&mut self, sensor: S) -> Handle {
        let handle = Handle::new();
        self.sensor = Some(sensor);
        self.handle = Some(handle);
        info!(%handle, "Gas sensor registered");
        handle
    }

    /// Current registration
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    /// Take one reading as `(eco2, tvoc)`
    ///
    /// Fails with the placeholder reply when nothing is registered, when the
    /// sensor has no new measurement, or when the driver reports an error.
    pub fn read(&mut self) -> HostReply {
        let Some(sensor) = self.sensor.as_mut() else {
            warn!("Gas read before registration");
            return HostReply::error();
        };

        if !sensor.available() {
            debug!("Gas sensor has no new measurement");
            return HostReply::error();
        }

        match sensor.read_data() {
            Ok(()) => {
                let (eco2, tvoc) = (sensor.eco2(), sensor.tvoc());
                debug!(eco2, tvoc, "Gas reading");
                HostReply::ok(f64::from(eco2), f64::from(tvoc))
            }
            Err(e) => {
                debug!(error = %e, "Gas sensor read failed");
                HostReply::error()
            }
        }
    }

    /// Drop the registration
    pub fn close(&mut self) {
        self.sensor = None;
        self.handle = None;
    }
}
