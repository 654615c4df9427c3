use serde::{Deserialize, Serialize};

use super::Record;

/// Position and attitude of the payload from the navigation system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    /// Which unit produced the fix
    pub source: char,
    /// Time from the GPS unit
    pub real_time: u64,
    pub real_time_nsecs: u32,
    pub n_sats: u16,
    pub readout_time: u64,
    pub readout_time_nsecs: u32,
    /// Degrees
    pub latitude: f32,
    /// Degrees
    pub longitude: f32,
    /// Metres, WGS84
    pub altitude: f32,
    /// Degrees
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
    pub heading_sigma: f32,
    pub pitch_sigma: f32,
    pub roll_sigma: f32,
    pub vdop: f32,
    pub hdop: f32,
    pub flag: i32,
    pub antenna_currents: [u16; 3],
    pub temperature: i16,
}

impl Default for Attitude {
    fn default() -> Self {
        Self {
            source: ' ',
            real_time: 0,
            real_time_nsecs: 0,
            n_sats: 0,
            readout_time: 0,
            readout_time_nsecs: 0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            // Unknown until the unit reports one
            heading_sigma: -1.0,
            pitch_sigma: -1.0,
            roll_sigma: -1.0,
            vdop: 0.0,
            hdop: 0.0,
            flag: 0,
            antenna_currents: [0; 3],
            temperature: 0,
        }
    }
}

impl Record for Attitude {
    fn field(&self, name: &str) -> Option<f64> {
        let value = match name {
            "realTime" => self.real_time as f64,
            "realTimeNsecs" => self.real_time_nsecs as f64,
            "readoutTime" => self.readout_time as f64,
            "readoutTimeNsecs" => self.readout_time_nsecs as f64,
            "latitude" => self.latitude as f64,
            "longitude" => self.longitude as f64,
            "altitude" => self.altitude as f64,
            "heading" => self.heading as f64,
            "pitch" => self.pitch as f64,
            "roll" => self.roll as f64,
            "headingSigma" => self.heading_sigma as f64,
            "pitchSigma" => self.pitch_sigma as f64,
            "rollSigma" => self.roll_sigma as f64,
            "vdop" => self.vdop as f64,
            "hdop" => self.hdop as f64,
            "flag" => self.flag as f64,
            "nSats" => self.n_sats as f64,
            "temperature" => self.temperature as f64,
            _ => return None,
        };
        Some(value)
    }
}
