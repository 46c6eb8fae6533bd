//! Decoded particulate readings

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// Particulate mass concentrations in µg/m³, resolved to 0.1 µg/m³
///
/// The sensor reports tenths as raw 16-bit counts, so the raw values are kept
/// and scaled on access. That keeps the one-decimal resolution exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reading {
    pm25_tenths: u16,
    pm10_tenths: u16,
}

impl Reading {
    /// Only a validated frame may build a reading
    pub(crate) fn from_raw(pm25_tenths: u16, pm10_tenths: u16) -> Self {
        Self {
            pm25_tenths,
            pm10_tenths,
        }
    }

    /// PM2.5 concentration in µg/m³
    pub fn pm25(&self) -> f64 {
        f64::from(self.pm25_tenths) / 10.0
    }

    /// PM10 concentration in µg/m³
    pub fn pm10(&self) -> f64 {
        f64::from(self.pm10_tenths) / 10.0
    }

    /// Raw PM2.5 count as sent by the sensor (tenths of µg/m³)
    pub fn pm25_raw(&self) -> u16 {
        self.pm25_tenths
    }

    /// Raw PM10 count as sent by the sensor (tenths of µg/m³)
    pub fn pm10_raw(&self) -> u16 {
        self.pm10_tenths
    }

    /// `(pm25, pm10)` pair in µg/m³
    pub fn as_pair(&self) -> (f64, f64) {
        (self.pm25(), self.pm10())
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PM2.5 {:.1} µg/m³, PM10 {:.1} µg/m³", self.pm25(), self.pm10())
    }
}

// Serialized in µg/m³ so consumers never see the raw tenths.
// No Deserialize: a reading only ever comes out of a validated frame.
impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Reading", 2)?;
        state.serialize_field("pm25", &self.pm25())?;
        state.serialize_field("pm10", &self.pm10())?;
        state.end()
    }
}
