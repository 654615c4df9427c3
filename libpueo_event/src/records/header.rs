use serde::{Deserialize, Serialize};

use super::Record;
use crate::constants::{NUM_POLS, NUM_SURF_SLOTS};
use crate::conventions::Pol;

/// The event header as written by the DAQ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHeader {
    /// Run number, assigned on the ground
    pub run: i32,
    /// From the DAQ, may or may not be correct
    pub trigger_time: u32,
    pub trigger_time_ns: u32,
    /// Unix time of readout
    pub readout_time: u32,
    pub readout_time_ns: u32,
    /// Software event number
    pub event_number: u64,
    pub l2_mask: u32,
    /// 24-bit phi mask per polarization
    pub phi_trig_mask: [u32; NUM_POLS],
    pub flags: u32,
    /// See [trigger](crate::conventions::trigger)
    pub trig_type: u32,
    /// Trigger time in TURF clock ticks
    pub trig_time: u32,
    /// TURF clock ticks between the last two GPS PPS
    pub last_pps: u32,
    pub last_last_pps: u32,
    pub dead_time: u16,
    pub dead_time_last_pps: u16,
    pub dead_time_last_last_pps: u16,
    pub l1_octants: [u8; NUM_SURF_SLOTS],
}

impl RawHeader {
    /// Check if a phi sector is masked off for a polarization
    pub fn is_in_phi_mask(&self, phi: usize, pol: Pol) -> bool {
        phi < 32 && self.phi_trig_mask[pol.index()] & (1 << phi) != 0
    }

    /// Trigger time in seconds, including the sub-second part
    pub fn trigger_time_f64(&self) -> f64 {
        self.trigger_time as f64 + self.trigger_time_ns as f64 * 1e-9
    }
}

impl Record for RawHeader {
    fn field(&self, name: &str) -> Option<f64> {
        let value = match name {
            "run" => self.run as f64,
            "triggerTime" => self.trigger_time as f64,
            "triggerTimeNs" => self.trigger_time_ns as f64,
            "readoutTime" => self.readout_time as f64,
            "readoutTimeNs" => self.readout_time_ns as f64,
            "eventNumber" => self.event_number as f64,
            "L2Mask" => self.l2_mask as f64,
            "flags" => self.flags as f64,
            "trigType" => self.trig_type as f64,
            "trigTime" => self.trig_time as f64,
            "lastPPS" => self.last_pps as f64,
            "lastLastPPS" => self.last_last_pps as f64,
            "deadTime" => self.dead_time as f64,
            "deadTimeLastPPS" => self.dead_time_last_pps as f64,
            "deadTimeLastLastPPS" => self.dead_time_last_last_pps as f64,
            _ => return None,
        };
        Some(value)
    }
}
