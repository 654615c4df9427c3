use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::Config;
use super::records::HiCalFix;
use super::store::{RecordStore, Tree, TreeIndex};

pub const HICAL_GPS_FILE: &str = "H1b_GPS_time_interp.root";

/// Where a HiCal payload was. Altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiCalPosition {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl From<&HiCalFix> for HiCalPosition {
    fn from(fix: &HiCalFix) -> Self {
        Self {
            longitude: fix.longitude,
            latitude: fix.latitude,
            altitude: fix.altitude_m(),
        }
    }
}

struct HiCalTrack {
    tree: Box<dyn Tree<HiCalFix>>,
    index: TreeIndex,
}

/// The interpolated GPS tracks of the HiCal payloads, opened on first use and kept open
pub struct HiCalTracks {
    path: Option<PathBuf>,
    store: Arc<dyn RecordStore>,
    tracks: Mutex<FxHashMap<char, HiCalTrack>>,
}

impl std::fmt::Debug for HiCalTracks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiCalTracks").field("path", &self.path).finish()
    }
}

impl HiCalTracks {
    /// Tracks from the installed calibration share, if PUEO_UTIL_INSTALL_DIR is known
    pub fn new(config: &Config, store: Arc<dyn RecordStore>) -> Self {
        let path = config
            .util_install_dir
            .as_ref()
            .map(|dir| dir.join("share").join("pueoCalib").join(HICAL_GPS_FILE));
        Self {
            path,
            store,
            tracks: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn with_path(path: &Path, store: Arc<dyn RecordStore>) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            store,
            tracks: Mutex::new(FxHashMap::default()),
        }
    }

    /// Position of payload `which` ('A' or 'B') at a unix time. Only exact second matches are
    /// returned.
    pub fn position(&self, which: char, unix_time: u32) -> Option<HiCalPosition> {
        if !matches!(which, 'A' | 'B') {
            log::warn!("There is no HiCal {which}");
            return None;
        }
        let mut tracks = self.tracks.lock();
        if !tracks.contains_key(&which) {
            let track = self.open()?;
            tracks.insert(which, track);
        }
        let track = tracks.get_mut(&which)?;
        let entry = track.index.entry_with_index(unix_time as f64)?;
        match track.tree.get_entry(entry) {
            Ok(fix) => Some(HiCalPosition::from(&fix)),
            Err(e) => {
                log::error!("Failed to read HiCal {which} entry {entry}: {e}");
                None
            }
        }
    }

    fn open(&self) -> Option<HiCalTrack> {
        let Some(path) = &self.path else {
            log::error!("PUEO_UTIL_INSTALL_DIR is not defined, cannot locate {HICAL_GPS_FILE}");
            return None;
        };
        let opened = self.store.open_hical(path).and_then(|mut tree| {
            let index = tree.build_index("unixTime")?;
            Ok(HiCalTrack { tree, index })
        });
        match opened {
            Ok(track) => Some(track),
            Err(e) => {
                log::error!("Could not open HiCal GPS track {path:?}: {e}");
                None
            }
        }
    }
}
