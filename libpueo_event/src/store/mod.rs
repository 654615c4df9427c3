//! Access to the per-run record files.
//!
//! Each run file holds one or more named trees of records. The dataset only ever talks to the
//! [RecordStore] and [Tree] traits, so the on-disk format is pluggable: [MemoryStore] keeps
//! everything in memory and [Hdf5Store] (feature `hdf5`) reads HDF5 files.
#[cfg(feature = "hdf5")]
pub mod hdf5_store;
pub mod index;
pub mod memory;

#[cfg(feature = "hdf5")]
pub use hdf5_store::Hdf5Store;
pub use index::TreeIndex;
pub use memory::MemoryStore;

use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::records::{Attitude, HiCalFix, RawEvent, RawHeader, Record, TruthEvent, UsefulEvent};

pub const HEAD_TREE: &str = "headTree";
/// Older header files used this name
pub const HEADER_TREE: &str = "headerTree";
pub const GPS_TREE: &str = "gpsTree";
pub const EVENT_TREE: &str = "eventTree";
pub const TRUTH_TREE: &str = "truthPueoTree";
pub const HICAL_TREE: &str = "Tpos";

/// One named stream of records inside a run file
pub trait Tree<R: Record>: Send {
    fn name(&self) -> &str;

    fn entries(&self) -> usize;

    fn get_entry(&mut self, entry: usize) -> Result<R, StoreError>;

    /// Build a sorted index over a scalar field
    fn build_index(&mut self, key: &str) -> Result<TreeIndex, StoreError> {
        let mut pairs = Vec::with_capacity(self.entries());
        for entry in 0..self.entries() {
            let value = self.get_entry(entry)?.field(key).ok_or_else(|| {
                StoreError::MissingField(self.name().to_string(), key.to_string())
            })?;
            pairs.push((value, entry));
        }
        Ok(TreeIndex::new(key, pairs))
    }

    /// All entries passing a predicate, in entry order
    fn select(&mut self, predicate: &mut dyn FnMut(&R) -> bool) -> Result<Vec<usize>, StoreError> {
        let mut selected = Vec::new();
        for entry in 0..self.entries() {
            if predicate(&self.get_entry(entry)?) {
                selected.push(entry);
            }
        }
        Ok(selected)
    }

    /// Smallest value of a field over the tree, None for an empty tree
    fn minimum(&mut self, field: &str) -> Result<Option<f64>, StoreError> {
        Ok(self.build_index(field)?.min_key())
    }

    /// Largest value of a field over the tree, None for an empty tree
    fn maximum(&mut self, field: &str) -> Result<Option<f64>, StoreError> {
        Ok(self.build_index(field)?.max_key())
    }
}

/// The files of all runs. Opening a tree hands back an owned handle; dropping it closes it.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Size of a file in bytes, if known
    fn file_size(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path).ok().map(|m| m.len())
    }

    /// Names of the entries in a directory
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    /// Open the header tree, trying `headTree` and then `headerTree`
    fn open_headers(&self, path: &Path) -> Result<Box<dyn Tree<RawHeader>>, StoreError>;

    fn open_raw_events(&self, path: &Path) -> Result<Box<dyn Tree<RawEvent>>, StoreError>;

    fn open_useful_events(&self, path: &Path) -> Result<Box<dyn Tree<UsefulEvent>>, StoreError>;

    fn open_attitudes(&self, path: &Path) -> Result<Box<dyn Tree<Attitude>>, StoreError>;

    fn open_truth(&self, path: &Path) -> Result<Box<dyn Tree<TruthEvent>>, StoreError>;

    fn open_hical(&self, path: &Path) -> Result<Box<dyn Tree<HiCalFix>>, StoreError>;
}

/// The first candidate path the store knows about
pub fn first_existing(store: &dyn RecordStore, candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| store.exists(p)).cloned()
}
