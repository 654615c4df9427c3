use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::constants::*;
use super::error::ConfigError;
use super::version::DataDirectory;

/// What the min-bias iterators do when they run off either end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunBoundaryPolicy {
    /// Load the adjacent run and keep scanning
    #[default]
    CrossRuns,
    /// Report the end of the run and leave the cursor alone
    Stop,
}

/// Structure representing the library configuration. Contains pathing information for data,
/// calibration and geometry files.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml, and can also
/// be built from the standard PUEO environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root_data: Option<PathBuf>,
    pub mc_data: Option<PathBuf>,
    pub versioned_root_data: BTreeMap<i32, PathBuf>,
    pub calib_dir: Option<PathBuf>,
    pub util_install_dir: Option<PathBuf>,
    pub local_calib_dir: PathBuf,
    pub geometry_dir: Option<PathBuf>,
    pub run_boundary: RunBoundaryPolicy,
}

impl Default for Config {
    /// Generate a new Config object. No directories are known
    fn default() -> Self {
        Self {
            root_data: None,
            mc_data: None,
            versioned_root_data: BTreeMap::new(),
            calib_dir: None,
            util_install_dir: None,
            local_calib_dir: PathBuf::from("./calib"),
            geometry_dir: None,
            run_boundary: RunBoundaryPolicy::default(),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Config {
    /// Build a config from PUEO_ROOT_DATA, PUEO_MC_DATA, PUEO<v>_ROOT_DATA, PUEO_CALIB_DIR
    /// and PUEO_UTIL_INSTALL_DIR
    pub fn from_env() -> Self {
        let mut config = Self {
            root_data: env_path(ROOT_DATA_ENV),
            mc_data: env_path(MC_DATA_ENV),
            calib_dir: env_path(CALIB_DIR_ENV),
            util_install_dir: env_path(UTIL_INSTALL_DIR_ENV),
            ..Default::default()
        };
        for version in 1..=NUM_PUEO {
            if let Some(path) = env_path(&versioned_root_data_env(version)) {
                config.versioned_root_data.insert(version, path);
            }
        }
        config
    }

    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Resolve the data directory to read runs from.
    ///
    /// An explicitly requested hardware version uses its own directory if defined, Monte Carlo
    /// uses PUEO_MC_DATA if defined, and otherwise PUEO_ROOT_DATA is preferred with the
    /// directory of `current_version` as the last resort. Returns None (and logs) if nothing
    /// is defined.
    pub fn data_dir(&self, kind: DataDirectory, current_version: i32) -> Option<PathBuf> {
        match kind {
            DataDirectory::Version(v) if v > 0 => match self.versioned_root_data.get(&v) {
                Some(path) => return Some(path.clone()),
                None => log::warn!(
                    "{}, not defined, will try {}",
                    versioned_root_data_env(v),
                    ROOT_DATA_ENV
                ),
            },
            DataDirectory::MonteCarlo => match &self.mc_data {
                Some(path) => return Some(path.clone()),
                None => log::warn!("{}, not defined, will try {}", MC_DATA_ENV, ROOT_DATA_ENV),
            },
            _ => (),
        }

        if let Some(path) = &self.root_data {
            return Some(path.clone());
        }
        if let Some(path) = self.versioned_root_data.get(&current_version) {
            return Some(path.clone());
        }
        log::error!("{}, not defined, please define it!", ROOT_DATA_ENV);
        None
    }

    /// Get the path to a run directory within a data directory
    pub fn run_directory(&self, data_dir: &Path, run_number: i32) -> PathBuf {
        data_dir.join(Self::run_str(run_number))
    }

    /// Construct the run string using the PUEO directory format
    pub fn run_str(run_number: i32) -> String {
        format!("run{run_number}")
    }

    /// The calibration file search path for a file name, in order of preference
    pub fn calib_candidates(&self, file_name: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = &self.calib_dir {
            candidates.push(dir.join(file_name));
        }
        if let Some(dir) = &self.util_install_dir {
            candidates.push(dir.join("share").join("pueoCalib").join(file_name));
        }
        candidates.push(self.local_calib_dir.join(file_name));
        candidates
    }
}
