//! # libpueo_event
//!
//! libpueo_event is the data access library for PUEO, written in Rust. It resolves the
//! channel maps of the instrument (which digitizer channel belongs to which antenna) and
//! navigates the per-run data files written by the PUEO data acquisition: event headers,
//! digitized waveforms, navigation fixes and, for simulated runs, Monte Carlo truth.
//!
//! ## Installation
//!
//! Currently the only method of install is from source. Add the repository as a git
//! dependency or build it in place with `cargo build --release`.
//!
//! ### HDF5
//!
//! Run files are read from HDF5 when the `hdf5` feature is enabled. HDF5 must be installed,
//! typically with a package manager (homebrew, apt, etc). If the install lives in a custom
//! location, write the following snippet into `.cargo/config.toml`:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! Without the feature the library is still fully usable with the in-memory record store,
//! which is what the tests use.
//!
//! ## Configuration
//!
//! Data locations follow the standard PUEO environment variables:
//!
//! - `PUEO_ROOT_DATA`: directory containing the `run<N>` directories
//! - `PUEO<v>_ROOT_DATA`: the same for a specific hardware version (flight)
//! - `PUEO_MC_DATA`: simulated runs
//! - `PUEO_CALIB_DIR`, `PUEO_UTIL_INSTALL_DIR`: calibration files (run time maps, HiCal tracks,
//!   extra geometry tables)
//!
//! The same information can be given as a YAML file:
//!
//! ```yml
//! root_data: /data/pueo
//! mc_data: null
//! versioned_root_data:
//!   1: /data/pueo1
//! calib_dir: null
//! util_install_dir: /opt/pueo
//! local_calib_dir: ./calib
//! geometry_dir: null
//! run_boundary: CrossRuns
//! ```
//!
//! ### Geometry Table Format
//!
//! A geometry table is a CSV file with one header line and one row per RF channel:
//!
//! ```csv
//! surf,chan,ring,phi,pol,ant,global,x,y,z,phase_phi
//! ```
//!
//! Two tables are bundled: `dec23` (the default) and `flight` (the wiring the data was read
//! out with). Others are looked up by name in the configured geometry directory, then in
//! `<PUEO_CALIB_DIR>/geom/`, then as a literal path.
//!
//! ## Run Files
//!
//! A run directory `run<N>` holds the files below, each with a `.root` suffix. The first
//! existing file of each kind wins:
//!
//! ```text
//! run<N>
//! |---- eventHeadFile<N> | timedHeadFile<N> | headFile<N> | SimulatedHeadFile<N> | SimulatedPueoHeadFile<N>
//! |---- decimatedHeadFile<N>                                 (decimated mode only)
//! |---- gpsEvent<N> | SimulatedGpsFile<N> | SimulatedPueoGpsFile<N>, else gpsFile<N>
//! |---- usefulEventFile<N> | SimulatedEventFile<N> | SimulatedPueoEventFile<N>, else eventFile<N>
//! |---- SimulatedTruthFile<N> | SimulatedPueoTruthFile<N>   (simulated runs only)
//! ```
pub mod blinding;
pub mod channel_map;
pub mod config;
pub mod constants;
pub mod context;
pub mod conventions;
pub mod dataset;
pub mod error;
pub mod geodesy;
pub mod geom_registry;
pub mod geom_tool;
pub mod hardware_id;
pub mod hical;
pub mod playlist;
pub mod records;
pub mod run_time_map;
pub mod store;
pub mod version;
