use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{RecordStore, Tree, EVENT_TREE, GPS_TREE, HEADER_TREE, HEAD_TREE, HICAL_TREE, TRUTH_TREE};
use crate::error::StoreError;
use crate::records::{Attitude, HiCalFix, RawEvent, RawHeader, Record, TruthEvent, UsefulEvent};

#[derive(Debug, Clone)]
enum MemoryTreeData {
    Headers(Arc<Vec<RawHeader>>),
    RawEvents(Arc<Vec<RawEvent>>),
    UsefulEvents(Arc<Vec<UsefulEvent>>),
    Attitudes(Arc<Vec<Attitude>>),
    Truth(Arc<Vec<TruthEvent>>),
    HiCal(Arc<Vec<HiCalFix>>),
}

/// A tree backed by a shared vector of records
#[derive(Debug, Clone)]
pub struct MemoryTree<R> {
    name: String,
    records: Arc<Vec<R>>,
}

impl<R: Record + Sync> Tree<R> for MemoryTree<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> usize {
        self.records.len()
    }

    fn get_entry(&mut self, entry: usize) -> Result<R, StoreError> {
        self.records
            .get(entry)
            .cloned()
            .ok_or_else(|| StoreError::BadEntry(self.name.clone(), entry as i64))
    }
}

/// An in-memory record store. Files are keyed by path and hold named trees.
///
/// Used to build datasets in tests and for simulation output that never touches the disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<FxHashMap<PathBuf, FxHashMap<String, MemoryTreeData>>>,
    opened: RwLock<FxHashMap<PathBuf, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, path: &Path, tree: &str, data: MemoryTreeData) {
        self.files
            .write()
            .entry(path.to_path_buf())
            .or_default()
            .insert(tree.to_string(), data);
    }

    /// Add a header tree. `tree` is normally [HEAD_TREE]
    pub fn add_headers(&self, path: &Path, tree: &str, headers: Vec<RawHeader>) {
        self.insert(path, tree, MemoryTreeData::Headers(Arc::new(headers)));
    }

    pub fn add_raw_events(&self, path: &Path, events: Vec<RawEvent>) {
        self.insert(path, EVENT_TREE, MemoryTreeData::RawEvents(Arc::new(events)));
    }

    pub fn add_useful_events(&self, path: &Path, events: Vec<UsefulEvent>) {
        self.insert(path, EVENT_TREE, MemoryTreeData::UsefulEvents(Arc::new(events)));
    }

    pub fn add_attitudes(&self, path: &Path, attitudes: Vec<Attitude>) {
        self.insert(path, GPS_TREE, MemoryTreeData::Attitudes(Arc::new(attitudes)));
    }

    pub fn add_truth(&self, path: &Path, truth: Vec<TruthEvent>) {
        self.insert(path, TRUTH_TREE, MemoryTreeData::Truth(Arc::new(truth)));
    }

    pub fn add_hical(&self, path: &Path, fixes: Vec<HiCalFix>) {
        self.insert(path, HICAL_TREE, MemoryTreeData::HiCal(Arc::new(fixes)));
    }

    /// How many times trees of a file have been opened
    pub fn times_opened(&self, path: &Path) -> usize {
        self.opened.read().get(path).copied().unwrap_or(0)
    }

    fn lookup(&self, path: &Path, names: &[&str]) -> Result<(String, MemoryTreeData), StoreError> {
        let files = self.files.read();
        let trees = files
            .get(path)
            .ok_or_else(|| StoreError::BadFilePath(path.to_path_buf()))?;
        let found = names
            .iter()
            .find_map(|name| trees.get(*name).map(|data| (name.to_string(), data.clone())));
        match found {
            Some(found) => {
                *self.opened.write().entry(path.to_path_buf()).or_default() += 1;
                Ok(found)
            }
            None => Err(StoreError::MissingTree(
                path.to_path_buf(),
                names.iter().map(|n| n.to_string()).collect(),
            )),
        }
    }
}

fn wrong_type(path: &Path, name: &str) -> StoreError {
    StoreError::BadData(
        format!("{path:?}"),
        format!("tree {name} does not hold the requested record type"),
    )
}

macro_rules! open_memory_tree {
    ($self:ident, $path:ident, $names:expr, $variant:ident) => {{
        let (name, data) = $self.lookup($path, $names)?;
        match data {
            MemoryTreeData::$variant(records) => {
                Ok(Box::new(MemoryTree { name, records }) as Box<dyn Tree<_>>)
            }
            _ => Err(wrong_type($path, &name)),
        }
    }};
}

impl RecordStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn file_size(&self, _path: &Path) -> Option<u64> {
        None
    }

    /// Immediate children of `path` among the stored file paths
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .files
            .read()
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter_map(|rest| match rest.components().next() {
                Some(Component::Normal(name)) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if names.is_empty() {
            return Err(StoreError::BadFilePath(path.to_path_buf()));
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn open_headers(&self, path: &Path) -> Result<Box<dyn Tree<RawHeader>>, StoreError> {
        open_memory_tree!(self, path, &[HEAD_TREE, HEADER_TREE], Headers)
    }

    fn open_raw_events(&self, path: &Path) -> Result<Box<dyn Tree<RawEvent>>, StoreError> {
        open_memory_tree!(self, path, &[EVENT_TREE], RawEvents)
    }

    fn open_useful_events(&self, path: &Path) -> Result<Box<dyn Tree<UsefulEvent>>, StoreError> {
        open_memory_tree!(self, path, &[EVENT_TREE], UsefulEvents)
    }

    fn open_attitudes(&self, path: &Path) -> Result<Box<dyn Tree<Attitude>>, StoreError> {
        open_memory_tree!(self, path, &[GPS_TREE], Attitudes)
    }

    fn open_truth(&self, path: &Path) -> Result<Box<dyn Tree<TruthEvent>>, StoreError> {
        open_memory_tree!(self, path, &[TRUTH_TREE], Truth)
    }

    fn open_hical(&self, path: &Path) -> Result<Box<dyn Tree<HiCalFix>>, StoreError> {
        open_memory_tree!(self, path, &[HICAL_TREE], HiCal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(n: u64) -> Vec<RawHeader> {
        (0..n)
            .map(|i| RawHeader {
                event_number: 100 - i,
                trigger_time: 1000 + i as u32,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_header_tree_fallback() {
        let store = MemoryStore::new();
        let path = Path::new("/data/run1/headFile1.root");
        store.add_headers(path, HEADER_TREE, headers(3));
        let tree = store.open_headers(path).unwrap();
        assert_eq!(tree.name(), HEADER_TREE);
        assert_eq!(tree.entries(), 3);
        assert_eq!(store.times_opened(path), 1);
        assert!(matches!(
            store.open_attitudes(path),
            Err(StoreError::MissingTree(_, _))
        ));
        assert!(store.open_headers(Path::new("/nope")).is_err());
    }

    #[test]
    fn test_tree_queries() {
        let store = MemoryStore::new();
        let path = Path::new("/data/run1/headFile1.root");
        store.add_headers(path, HEAD_TREE, headers(5));
        let mut tree = store.open_headers(path).unwrap();

        let index = tree.build_index("eventNumber").unwrap();
        assert_eq!(index.sorted_entries().collect::<Vec<_>>(), vec![4, 3, 2, 1, 0]);
        assert_eq!(tree.minimum("triggerTime").unwrap(), Some(1000.0));
        assert_eq!(tree.maximum("triggerTime").unwrap(), Some(1004.0));
        let odd = tree.select(&mut |h: &RawHeader| h.event_number % 2 == 1).unwrap();
        assert_eq!(odd, vec![1, 3]);
        assert!(tree.build_index("bogus").is_err());
        assert!(tree.get_entry(5).is_err());
    }

    #[test]
    fn test_list_dir() {
        let store = MemoryStore::new();
        store.add_headers(Path::new("/data/run2/headFile2.root"), HEAD_TREE, headers(1));
        store.add_headers(Path::new("/data/run10/headFile10.root"), HEAD_TREE, headers(1));
        store.add_raw_events(Path::new("/data/run2/eventFile2.root"), vec![]);
        assert_eq!(store.list_dir(Path::new("/data")).unwrap(), vec!["run10", "run2"]);
        assert!(store.list_dir(Path::new("/elsewhere")).is_err());
    }
}
