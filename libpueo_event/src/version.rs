use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use super::constants::NUM_PUEO;

static GLOBAL_VERSION: Lazy<Arc<HardwareVersion>> = Lazy::new(|| Arc::new(HardwareVersion::default()));

/// The hardware version (flight) the library is currently configured for.
///
/// It selects the default geometry table and the versioned data directory. The dataset
/// updates it from each header it reads.
#[derive(Debug)]
pub struct HardwareVersion {
    current: AtomicI32,
}

impl Default for HardwareVersion {
    fn default() -> Self {
        Self::new(NUM_PUEO)
    }
}

impl HardwareVersion {
    pub fn new(version: i32) -> Self {
        Self {
            current: AtomicI32::new(version),
        }
    }

    /// The process-wide version
    pub fn global() -> Arc<Self> {
        GLOBAL_VERSION.clone()
    }

    pub fn get(&self) -> i32 {
        self.current.load(Ordering::Relaxed)
    }

    /// Versions outside 1..=NUM_PUEO are ignored
    pub fn set(&self, version: i32) {
        if (1..=NUM_PUEO).contains(&version) {
            self.current.store(version, Ordering::Relaxed);
        } else {
            log::warn!("Ignoring request to set unknown hardware version {version}");
        }
    }

    pub fn set_from_unix_time(&self, unix_time: f64) {
        self.set(Self::version_from_unix_time(unix_time));
    }

    /// There has only been one flight, so every time maps to version 1
    pub fn version_from_unix_time(_unix_time: f64) -> i32 {
        1
    }
}

/// Which data directory a dataset should be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataDirectory {
    /// `PUEO_ROOT_DATA`, falling back to the directory of the current hardware version
    #[default]
    Default,
    /// `PUEO_MC_DATA`
    MonteCarlo,
    /// `PUEO<v>_ROOT_DATA`
    Version(i32),
}

impl DataDirectory {
    /// The -1 / 0 / v encoding used in file names and cache keys
    pub fn code(&self) -> i32 {
        match self {
            DataDirectory::Default => -1,
            DataDirectory::MonteCarlo => 0,
            DataDirectory::Version(v) => *v,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            c if c < 0 => DataDirectory::Default,
            0 => DataDirectory::MonteCarlo,
            v => DataDirectory::Version(v),
        }
    }
}
