// Instrument dimensions
pub const NANTS_MI: usize = 96;
pub const NANTS_NADIR: usize = 0;
pub const NANTS_LF: usize = 8;
pub const NUM_HORNS: usize = NANTS_MI + NANTS_NADIR;
pub const NUM_ANTS: usize = NANTS_MI + NANTS_NADIR + NANTS_LF;
pub const NUM_POLS: usize = 2;
pub const NUM_PUEO: i32 = 1;
pub const NUM_PHI: usize = 24;
pub const NUM_CHANS_PER_SURF: usize = 8;
pub const NUM_SURF_SLOTS: usize = 28;
pub const NUM_DIGITIZED_CHANNELS: usize = NUM_SURF_SLOTS * NUM_CHANS_PER_SURF;
pub const NUM_RF_CHANNELS: usize = NUM_POLS * NUM_ANTS;
pub const MAX_NUMBER_SAMPLES: usize = 1024; // always 1024 for PUEO now
pub const NUM_BEAMS: usize = 48;

// Geometry tables
pub const GEOMETRY_COLUMNS: usize = 11; // surf,chan,ring,phi,pol,ant,global,x,y,z,phase_phi
pub const DEFAULT_GEOMETRY: &str = "dec23";
pub const FLIGHT_GEOMETRY: &str = "flight";
/// Azimuth of phi sector 0 relative to the payload aft-fore axis, in degrees
pub const AFT_FORE_OFFSET_DEG: f64 = 45.0;

// Calibrated waveform conversion
pub const ADC_TO_MV: f64 = 500.0 / 2048.0; // TODO: replace with per-channel calibration once available
pub const SAMPLE_DT_NS: f64 = 1.0 / 3.0;

// Earth model (WGS84)
pub const R_EARTH: f64 = 6.378137E6;
pub const FLATTENING_FACTOR: f64 = 1.0 / 298.257223563;
pub const LATITUDE_TOLERANCE_RAD: f64 = 1e-4;

pub const FEET_TO_METERS: f64 = 0.3048;

// Environment variables
pub const ROOT_DATA_ENV: &str = "PUEO_ROOT_DATA";
pub const MC_DATA_ENV: &str = "PUEO_MC_DATA";
pub const CALIB_DIR_ENV: &str = "PUEO_CALIB_DIR";
pub const UTIL_INSTALL_DIR_ENV: &str = "PUEO_UTIL_INSTALL_DIR";

/// Name of the per-hardware-version data directory variable, e.g. `PUEO1_ROOT_DATA`
pub fn versioned_root_data_env(version: i32) -> String {
    format!("PUEO{version}_ROOT_DATA")
}
