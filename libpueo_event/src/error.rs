use std::path::PathBuf;
use thiserror::Error;

use super::constants::*;

#[derive(Debug, Clone, Error)]
pub enum ConventionError {
    #[error("Invalid ring {0}; expected an index 1-8 or a ring name")]
    BadRing(String),
    #[error("Invalid polarization {0}; expected H or V")]
    BadPol(String),
}

#[derive(Debug, Error)]
pub enum ChannelMapError {
    #[error("ChannelMap failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ChannelMap failed to parse an integer: {0}")]
    ParsingError(#[from] std::num::ParseIntError),
    #[error("ChannelMap failed to parse a float: {0}")]
    FloatParsingError(#[from] std::num::ParseFloatError),
    #[error("ChannelMap failed to parse a ring or polarization: {0}")]
    BadConvention(#[from] ConventionError),
    #[error("ChannelMap was given a line with {0} columns; expected {cols}", cols=GEOMETRY_COLUMNS)]
    BadFileFormat(usize),
    #[error("ChannelMap found surf {0}, channel {1} outside of the digitizer range")]
    BadSurfChannel(i32, i32),
    #[error("ChannelMap found a duplicate {0} key on line {1}")]
    DuplicateKey(&'static str, usize),
}

#[derive(Debug, Error)]
pub enum GeomError {
    #[error("Could not find geometry source {source_name:?} for hardware version {version}")]
    SourceNotFound { version: i32, source_name: String },
    #[error("Geometry source {0:?} failed to load: {1}")]
    BadTable(String, ChannelMapError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store could not open {0:?} because it does not exist")]
    BadFilePath(PathBuf),
    #[error("Record store found no tree named any of {1:?} in {0:?}")]
    MissingTree(PathBuf, Vec<String>),
    #[error("Tree {0} has no entry {1}")]
    BadEntry(String, i64),
    #[error("Tree {0} has no field named {1}")]
    MissingField(String, String),
    #[error("Record store failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[cfg(feature = "hdf5")]
    #[error("Record store failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Record store found malformed data in {0}: {1}")]
    BadData(String, String),
}

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Could not read playlist {0:?}: {1}")]
    IOError(PathBuf, std::io::Error),
}

#[derive(Debug, Error)]
pub enum RunTimeMapError {
    #[error("Run time map failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Run time map line {0} is malformed: {1:?}")]
    BadLine(usize, String),
    #[error("Run time map has no data directory for hardware version {0}")]
    NoDataDirectory(i32),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("No run is loaded")]
    RunNotLoaded,
    #[error("No data directory could be resolved; define PUEO_ROOT_DATA")]
    NoDataDirectory,
    #[error("Could not find head file for run {0}")]
    MissingHeadFile(i32),
    #[error("Could not find decimated head file for run {0}")]
    MissingDecimatedHeadFile(i32),
    #[error("Requested entry {0} too big or small (have {1} entries)")]
    EntryOutOfRange(i64, i64),
    #[error("Event {0} not found in header tree")]
    EventNotFound(u64),
    #[error("Rank {0} is outside of the {1} available")]
    RankOutOfRange(usize, usize),
    #[error("No cut has been applied")]
    NoCut,
    #[error("No playlist has been loaded")]
    NoPlaylist,
    #[error("Ran off the end of run {0} without finding a matching entry")]
    EndOfRun(i32),
    #[error("Dataset failed due to record store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Dataset failed due to geometry error: {0}")]
    GeomError(#[from] GeomError),
    #[error("Dataset failed due to playlist error: {0}")]
    PlaylistError(#[from] PlaylistError),
    #[error("Dataset failed due to run time map error: {0}")]
    RunTimeMapError(#[from] RunTimeMapError),
}
