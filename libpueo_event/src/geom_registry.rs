use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::channel_map::{load_bundled_table, ChannelMap};
use super::config::Config;
use super::constants::*;
use super::error::GeomError;
use super::geom_tool::GeomTool;
use super::version::HardwareVersion;

static GLOBAL_REGISTRY: Lazy<Arc<GeomRegistry>> = Lazy::new(|| {
    Arc::new(GeomRegistry::new(
        &Config::from_env(),
        HardwareVersion::global(),
    ))
});

/// Cache of loaded geometries keyed by (hardware version, source name).
///
/// A geometry is built the first time it is requested and then shared for the lifetime of the
/// registry. Concurrent requests for the same key construct it at most once.
#[derive(Debug)]
pub struct GeomRegistry {
    version: Arc<HardwareVersion>,
    geometry_dir: Option<PathBuf>,
    calib_dir: Option<PathBuf>,
    instances: RwLock<FxHashMap<(i32, String), Arc<GeomTool>>>,
    default_sources: RwLock<Vec<String>>,
    constructed: AtomicUsize,
}

impl GeomRegistry {
    pub fn new(config: &Config, version: Arc<HardwareVersion>) -> Self {
        Self {
            version,
            geometry_dir: config.geometry_dir.clone(),
            calib_dir: config.calib_dir.clone(),
            instances: RwLock::new(FxHashMap::default()),
            default_sources: RwLock::new(vec![DEFAULT_GEOMETRY.to_string(); NUM_PUEO as usize]),
            constructed: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry, configured from the environment
    pub fn global() -> Arc<Self> {
        GLOBAL_REGISTRY.clone()
    }

    /// Version 0 or anything out of range means the current hardware version
    fn resolve_version(&self, version: i32) -> i32 {
        if (1..=NUM_PUEO).contains(&version) {
            version
        } else {
            self.version.get()
        }
    }

    /// Set the geometry source used when none is requested explicitly
    pub fn set_default_geometry(&self, version: i32, source: &str) {
        let version = self.resolve_version(version);
        let mut defaults = self.default_sources.write();
        if let Some(slot) = defaults.get_mut((version - 1) as usize) {
            *slot = source.to_string();
        }
    }

    pub fn default_geometry(&self, version: i32) -> String {
        let version = self.resolve_version(version);
        self.default_sources
            .read()
            .get((version - 1) as usize)
            .cloned()
            .unwrap_or_default()
    }

    /// Get the geometry for a hardware version and source. An empty source means the default
    /// source for that version.
    pub fn get(&self, version: i32, source: &str) -> Result<Arc<GeomTool>, GeomError> {
        let version = self.resolve_version(version);
        let source = if source.is_empty() {
            self.default_geometry(version)
        } else {
            source.to_string()
        };
        let key = (version, source);

        if let Some(tool) = self.instances.read().get(&key) {
            return Ok(tool.clone());
        }

        let mut instances = self.instances.write();
        // Someone else may have built it while we waited for the lock
        if let Some(tool) = instances.get(&key) {
            return Ok(tool.clone());
        }
        log::info!("Generating geometry with v={} source={}", key.0, key.1);
        let map = self.load_source(key.0, &key.1)?;
        let tool = Arc::new(GeomTool::new(key.0, &key.1, map));
        self.constructed.fetch_add(1, Ordering::Relaxed);
        instances.insert(key, tool.clone());
        Ok(tool)
    }

    /// Number of geometries this registry has built
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }

    /// Resolve a source name to a table. Bundled tables win, then the configured geometry
    /// directory, then the calibration directory, then the name as a literal path.
    fn load_source(&self, version: i32, name: &str) -> Result<ChannelMap, GeomError> {
        let bad_table = |e| GeomError::BadTable(name.to_string(), e);
        if let Some(table) = load_bundled_table(name) {
            return ChannelMap::from_csv(name, table).map_err(bad_table);
        }

        let file_name = format!("{name}.csv");
        let mut candidates = Vec::new();
        if let Some(dir) = &self.geometry_dir {
            candidates.push(dir.join(&file_name));
        }
        if let Some(dir) = &self.calib_dir {
            candidates.push(dir.join("geom").join(&file_name));
        }
        candidates.push(PathBuf::from(name));

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => {
                log::info!("Loading geometry table {path:?}");
                ChannelMap::from_file(Path::new(path)).map_err(bad_table)
            }
            None => {
                log::error!("Could not find geometry source {name} for version {version}");
                Err(GeomError::SourceNotFound {
                    version,
                    source_name: name.to_string(),
                })
            }
        }
    }
}
