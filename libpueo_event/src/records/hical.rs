use serde::{Deserialize, Serialize};

use super::Record;
use crate::constants::FEET_TO_METERS;

/// One interpolated GPS fix of a HiCal balloon
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HiCalFix {
    pub unix_time: i32,
    pub longitude: f64,
    pub latitude: f64,
    /// Feet, as recorded
    pub altitude: f64,
}

impl HiCalFix {
    pub fn altitude_m(&self) -> f64 {
        self.altitude * FEET_TO_METERS
    }
}

impl Record for HiCalFix {
    fn field(&self, name: &str) -> Option<f64> {
        match name {
            "unixTime" => Some(self.unix_time as f64),
            "longitude" => Some(self.longitude),
            "latitude" => Some(self.latitude),
            "altitude" => Some(self.altitude),
            _ => None,
        }
    }
}
