use fxhash::FxHashMap;
use hdf5::{File, Group};
use ndarray::{Array1, Array2};
use std::path::Path;

use super::{RecordStore, Tree, TreeIndex, EVENT_TREE, GPS_TREE, HEADER_TREE, HEAD_TREE, HICAL_TREE, TRUTH_TREE};
use crate::constants::{NUM_POLS, NUM_RF_CHANNELS, NUM_SURF_SLOTS, SAMPLE_DT_NS};
use crate::error::StoreError;
use crate::records::{Attitude, HiCalFix, RawEvent, RawHeader, Record, TruthEvent, UsefulEvent};

// Structure
// <tree> (group, one per tree name)
// |---- <field>(dset) - 1-D, one value per entry, for every scalar field
// |---- <field>(dset) - 2-D (entries, n) for fixed size array fields
// |---- event_#(dset) - 2-D i16 digitizer samples, eventTree only
// |---- volts_#(dset) - 2-D f64 calibrated samples, eventTree of useful files only

/// The scalar and fixed-width columns of one tree, read in full when the tree is opened
#[derive(Debug, Default)]
struct Columns {
    entries: usize,
    scalars: FxHashMap<String, Array1<f64>>,
    arrays: FxHashMap<String, Array2<f64>>,
}

impl Columns {
    fn read(group: &Group) -> Result<Self, StoreError> {
        let mut columns = Columns::default();
        for name in group.member_names()? {
            if name.starts_with("event_") || name.starts_with("volts_") {
                continue;
            }
            let Ok(dataset) = group.dataset(&name) else {
                continue;
            };
            match dataset.ndim() {
                1 => {
                    let values = dataset.read_1d::<f64>()?;
                    columns.entries = columns.entries.max(values.len());
                    columns.scalars.insert(name, values);
                }
                2 => {
                    let values = dataset.read_2d::<f64>()?;
                    columns.entries = columns.entries.max(values.nrows());
                    columns.arrays.insert(name, values);
                }
                _ => log::warn!("Skipping column {name} with unexpected rank"),
            }
        }
        Ok(columns)
    }

    /// Missing branches read as zero
    fn get(&self, name: &str, entry: usize) -> f64 {
        self.scalars
            .get(name)
            .and_then(|c| c.get(entry))
            .copied()
            .unwrap_or(0.0)
    }

    fn get_array<const N: usize>(&self, name: &str, entry: usize) -> [f64; N] {
        let mut out = [0.0; N];
        if let Some(array) = self.arrays.get(name) {
            if entry < array.nrows() {
                for (o, v) in out.iter_mut().zip(array.row(entry).iter()) {
                    *o = *v;
                }
            }
        }
        out
    }
}

type Builder<R> = fn(&Group, &Columns, usize) -> Result<R, StoreError>;

/// A tree inside an HDF5 run file
pub struct Hdf5Tree<R> {
    _file: File,
    name: String,
    group: Group,
    columns: Columns,
    build: Builder<R>,
}

impl<R: Record> Tree<R> for Hdf5Tree<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> usize {
        self.columns.entries
    }

    fn get_entry(&mut self, entry: usize) -> Result<R, StoreError> {
        if entry >= self.columns.entries {
            return Err(StoreError::BadEntry(self.name.clone(), entry as i64));
        }
        (self.build)(&self.group, &self.columns, entry)
    }

    fn build_index(&mut self, key: &str) -> Result<TreeIndex, StoreError> {
        let column = self
            .columns
            .scalars
            .get(key)
            .ok_or_else(|| StoreError::MissingField(self.name.clone(), key.to_string()))?;
        Ok(TreeIndex::new(
            key,
            column.iter().enumerate().map(|(e, v)| (*v, e)).collect(),
        ))
    }
}

fn build_header(_: &Group, c: &Columns, e: usize) -> Result<RawHeader, StoreError> {
    let phi_trig_mask = c.get_array::<NUM_POLS>("phiTrigMask", e);
    let l1_octants = c.get_array::<NUM_SURF_SLOTS>("L1Octants", e);
    Ok(RawHeader {
        run: c.get("run", e) as i32,
        trigger_time: c.get("triggerTime", e) as u32,
        trigger_time_ns: c.get("triggerTimeNs", e) as u32,
        readout_time: c.get("readoutTime", e) as u32,
        readout_time_ns: c.get("readoutTimeNs", e) as u32,
        event_number: c.get("eventNumber", e) as u64,
        l2_mask: c.get("L2Mask", e) as u32,
        phi_trig_mask: phi_trig_mask.map(|v| v as u32),
        flags: c.get("flags", e) as u32,
        trig_type: c.get("trigType", e) as u32,
        trig_time: c.get("trigTime", e) as u32,
        last_pps: c.get("lastPPS", e) as u32,
        last_last_pps: c.get("lastLastPPS", e) as u32,
        dead_time: c.get("deadTime", e) as u16,
        dead_time_last_pps: c.get("deadTimeLastPPS", e) as u16,
        dead_time_last_last_pps: c.get("deadTimeLastLastPPS", e) as u16,
        l1_octants: l1_octants.map(|v| v as u8),
    })
}

fn build_raw_event(group: &Group, c: &Columns, e: usize) -> Result<RawEvent, StoreError> {
    Ok(RawEvent {
        event_number: c.get("eventNumber", e) as u64,
        run_number: c.get("runNumber", e) as i32,
        data: group.dataset(&format!("event_{e}"))?.read_2d::<i16>()?,
    })
}

fn build_useful_event(group: &Group, c: &Columns, e: usize) -> Result<UsefulEvent, StoreError> {
    let raw = build_raw_event(group, c, e)?;
    let volts = group.dataset(&format!("volts_{e}"))?.read_2d::<f64>()?;
    if volts.nrows() != NUM_RF_CHANNELS {
        return Err(StoreError::BadData(
            format!("volts_{e}"),
            format!("expected {NUM_RF_CHANNELS} channels, found {}", volts.nrows()),
        ));
    }
    Ok(UsefulEvent {
        raw,
        volts,
        t0: Array1::zeros(NUM_RF_CHANNELS),
        dt: Array1::from_elem(NUM_RF_CHANNELS, SAMPLE_DT_NS),
    })
}

fn build_attitude(_: &Group, c: &Columns, e: usize) -> Result<Attitude, StoreError> {
    let source = char::from_u32(c.get("source", e) as u32).unwrap_or(' ');
    Ok(Attitude {
        source,
        real_time: c.get("realTime", e) as u64,
        real_time_nsecs: c.get("realTimeNsecs", e) as u32,
        n_sats: c.get("nSats", e) as u16,
        readout_time: c.get("readoutTime", e) as u64,
        readout_time_nsecs: c.get("readoutTimeNsecs", e) as u32,
        latitude: c.get("latitude", e) as f32,
        longitude: c.get("longitude", e) as f32,
        altitude: c.get("altitude", e) as f32,
        heading: c.get("heading", e) as f32,
        pitch: c.get("pitch", e) as f32,
        roll: c.get("roll", e) as f32,
        heading_sigma: c.get("headingSigma", e) as f32,
        pitch_sigma: c.get("pitchSigma", e) as f32,
        roll_sigma: c.get("rollSigma", e) as f32,
        vdop: c.get("vdop", e) as f32,
        hdop: c.get("hdop", e) as f32,
        flag: c.get("flag", e) as i32,
        antenna_currents: c.get_array::<3>("antennaCurrents", e).map(|v| v as u16),
        temperature: c.get("temperature", e) as i16,
    })
}

fn build_truth(_: &Group, c: &Columns, e: usize) -> Result<TruthEvent, StoreError> {
    Ok(TruthEvent {
        run: c.get("run", e) as i32,
        event_number: c.get("eventNumber", e) as u64,
        weight: c.get("weight", e),
        nu_energy: c.get("nuEnergy", e),
        interaction_position: c.get_array::<3>("interactionPosition", e),
        rf_direction: c.get_array::<3>("rfDirection", e),
    })
}

fn build_hical(_: &Group, c: &Columns, e: usize) -> Result<HiCalFix, StoreError> {
    Ok(HiCalFix {
        unix_time: c.get("unixTime", e) as i32,
        longitude: c.get("longitude", e),
        latitude: c.get("latitude", e),
        altitude: c.get("altitude", e),
    })
}

/// Reads run files stored as HDF5
#[derive(Debug, Default)]
pub struct Hdf5Store;

impl Hdf5Store {
    pub fn new() -> Self {
        Self
    }

    fn open_tree<R: Record>(
        &self,
        path: &Path,
        names: &[&str],
        build: Builder<R>,
    ) -> Result<Box<dyn Tree<R>>, StoreError> {
        if !path.exists() {
            return Err(StoreError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        for name in names {
            if let Ok(group) = file.group(name) {
                let columns = Columns::read(&group)?;
                log::debug!("Opened {name} in {path:?} with {} entries", columns.entries);
                return Ok(Box::new(Hdf5Tree {
                    _file: file,
                    name: name.to_string(),
                    group,
                    columns,
                    build,
                }));
            }
        }
        Err(StoreError::MissingTree(
            path.to_path_buf(),
            names.iter().map(|n| n.to_string()).collect(),
        ))
    }
}

impl RecordStore for Hdf5Store {
    fn open_headers(&self, path: &Path) -> Result<Box<dyn Tree<RawHeader>>, StoreError> {
        self.open_tree(path, &[HEAD_TREE, HEADER_TREE], build_header)
    }

    fn open_raw_events(&self, path: &Path) -> Result<Box<dyn Tree<RawEvent>>, StoreError> {
        self.open_tree(path, &[EVENT_TREE], build_raw_event)
    }

    fn open_useful_events(&self, path: &Path) -> Result<Box<dyn Tree<UsefulEvent>>, StoreError> {
        self.open_tree(path, &[EVENT_TREE], build_useful_event)
    }

    fn open_attitudes(&self, path: &Path) -> Result<Box<dyn Tree<Attitude>>, StoreError> {
        self.open_tree(path, &[GPS_TREE], build_attitude)
    }

    fn open_truth(&self, path: &Path) -> Result<Box<dyn Tree<TruthEvent>>, StoreError> {
        self.open_tree(path, &[TRUTH_TREE], build_truth)
    }

    fn open_hical(&self, path: &Path) -> Result<Box<dyn Tree<HiCalFix>>, StoreError> {
        self.open_tree(path, &[HICAL_TREE], build_hical)
    }
}
