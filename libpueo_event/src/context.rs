use std::sync::Arc;

use super::config::Config;
use super::geom_registry::GeomRegistry;
use super::hical::HiCalTracks;
use super::run_time_map::RunTimeRegistry;
use super::store::RecordStore;
use super::version::HardwareVersion;

/// Everything a dataset shares with the rest of the process: the record store, configuration,
/// and the caches of geometries, run times and HiCal tracks.
#[derive(Debug, Clone)]
pub struct Context {
    pub store: Arc<dyn RecordStore>,
    pub config: Config,
    pub geometry: Arc<GeomRegistry>,
    pub run_times: Arc<RunTimeRegistry>,
    pub version: Arc<HardwareVersion>,
    pub hical: Arc<HiCalTracks>,
}

impl Context {
    /// Fresh caches around a store and config
    pub fn new(store: Arc<dyn RecordStore>, config: Config, version: Arc<HardwareVersion>) -> Self {
        Self {
            geometry: Arc::new(GeomRegistry::new(&config, version.clone())),
            run_times: Arc::new(RunTimeRegistry::new(&config, store.clone())),
            hical: Arc::new(HiCalTracks::new(&config, store.clone())),
            store,
            config,
            version,
        }
    }

    /// Production wiring: HDF5 files, configuration from the environment, and the process-wide
    /// geometry registry and hardware version
    #[cfg(feature = "hdf5")]
    pub fn from_env() -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(super::store::Hdf5Store::new());
        let config = Config::from_env();
        Self {
            geometry: GeomRegistry::global(),
            run_times: Arc::new(RunTimeRegistry::new(&config, store.clone())),
            hical: Arc::new(HiCalTracks::new(&config, store.clone())),
            version: HardwareVersion::global(),
            store,
            config,
        }
    }
}
