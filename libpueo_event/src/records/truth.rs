use serde::{Deserialize, Serialize};

use super::Record;

/// Monte Carlo truth for a simulated event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthEvent {
    pub run: i32,
    pub event_number: u64,
    pub weight: f64,
    /// eV
    pub nu_energy: f64,
    /// Earth-centred cartesian, metres
    pub interaction_position: [f64; 3],
    /// Unit vector of the RF direction at the payload
    pub rf_direction: [f64; 3],
}

impl Record for TruthEvent {
    fn field(&self, name: &str) -> Option<f64> {
        match name {
            "run" => Some(self.run as f64),
            "eventNumber" => Some(self.event_number as f64),
            "weight" => Some(self.weight),
            "nuEnergy" => Some(self.nu_energy),
            _ => None,
        }
    }
}
