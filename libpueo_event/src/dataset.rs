//! Navigation of the data of one run.
//!
//! A [Dataset] opens the header, event, navigation and truth files of a run and keeps a
//! cursor over its entries. The cursor can be moved directly by entry, by event number, in
//! event-number order, through the entries passing a cut, through a playlist of (run, event)
//! pairs spanning several runs, or between minimum-bias triggers. Records are read lazily at
//! the cursor and cached until it moves.
use std::path::{Path, PathBuf};

use super::blinding::{
    maybe_invert_polarity, overwrite_event, overwrite_header, BlindSource, BlindingStrategy,
    NoBlindSource,
};
use super::config::RunBoundaryPolicy;
use super::constants::FLIGHT_GEOMETRY;
use super::context::Context;
use super::conventions::{trigger, Pol};
use super::error::{DatasetError, StoreError};
use super::hical::HiCalPosition;
use super::playlist::{read_playlist, PlaylistEntry};
use super::records::{Attitude, RawEvent, RawHeader, TruthEvent, UsefulEvent};
use super::store::{first_existing, RecordStore, Tree, TreeIndex};
use super::version::DataDirectory;

const HEAD_FILES: [&str; 5] = [
    "eventHeadFile",
    "timedHeadFile",
    "headFile",
    "SimulatedHeadFile",
    "SimulatedPueoHeadFile",
];
const DECIMATED_HEAD_FILE: &str = "decimatedHeadFile";
const GPS_EVENT_FILES: [&str; 3] = ["gpsEvent", "SimulatedGpsFile", "SimulatedPueoGpsFile"];
const GPS_FILE: &str = "gpsFile";
const USEFUL_EVENT_FILES: [&str; 3] = [
    "usefulEventFile",
    "SimulatedEventFile",
    "SimulatedPueoEventFile",
];
const RAW_EVENT_FILE: &str = "eventFile";
const TRUTH_FILES: [&str; 2] = ["SimulatedTruthFile", "SimulatedPueoTruthFile"];

/// Position of the cursor within an ordering (event order, cut list)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rank {
    /// Must be recomputed from the current entry
    Unknown,
    /// The current entry is at this rank
    At(usize),
    /// The current entry is not in the ordering and sorts just before this rank
    Between(usize),
}

impl Rank {
    fn from_search(found: Result<usize, usize>) -> Self {
        match found {
            Ok(rank) => Rank::At(rank),
            Err(rank) => Rank::Between(rank),
        }
    }

    fn next(&self, len: usize) -> usize {
        match self {
            Rank::At(rank) => (*rank + 1).min(len.saturating_sub(1)),
            Rank::Between(rank) => (*rank).min(len.saturating_sub(1)),
            Rank::Unknown => 0,
        }
    }

    fn previous(&self) -> usize {
        match self {
            Rank::At(rank) | Rank::Between(rank) => rank.saturating_sub(1),
            Rank::Unknown => 0,
        }
    }
}

struct HeaderStream {
    path: PathBuf,
    tree: Box<dyn Tree<RawHeader>>,
    /// eventNumber
    index: TreeIndex,
}

/// Event numbers below this are exact as f64 index keys
const EXACT_EVENT_KEY: u64 = 1 << f64::MANTISSA_DIGITS;

impl HeaderStream {
    /// The first entry holding `event_number`. Larger event numbers can share an index key,
    /// so those candidates are checked against the header itself.
    fn entry_of_event(&mut self, event_number: u64) -> Result<Option<usize>, StoreError> {
        let key = event_number as f64;
        if event_number < EXACT_EVENT_KEY {
            return Ok(self.index.entry_with_index(key));
        }
        for entry in self.index.entries_with_index(key) {
            if self.tree.get_entry(entry)?.event_number == event_number {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

enum EventStream {
    Useful(Box<dyn Tree<UsefulEvent>>),
    Raw(Box<dyn Tree<RawEvent>>),
}

enum GpsStream {
    /// One fix per event entry
    PerEvent(Box<dyn Tree<Attitude>>),
    /// Fixes at their own cadence, matched to events by time
    ByTime {
        tree: Box<dyn Tree<Attitude>>,
        index: TreeIndex,
    },
}

/// The open streams of a run. Dropping it closes them.
struct LoadedRun {
    headers: HeaderStream,
    decimated: Option<HeaderStream>,
    events: Option<EventStream>,
    gps: Option<GpsStream>,
    truth: Option<Box<dyn Tree<TruthEvent>>>,
    simulated: bool,
}

impl LoadedRun {
    /// The header stream the cursor moves over
    fn cursor(&self) -> &HeaderStream {
        self.decimated.as_ref().unwrap_or(&self.headers)
    }

    fn cursor_mut(&mut self) -> &mut HeaderStream {
        self.decimated.as_mut().unwrap_or(&mut self.headers)
    }
}

/// Open one of `candidates`, logging and dropping the stream if it cannot be read
fn open_optional<T>(
    store: &dyn RecordStore,
    path: &Path,
    open: impl FnOnce(&dyn RecordStore, &Path) -> Result<T, StoreError>,
) -> Option<T> {
    match open(store, path) {
        Ok(stream) => Some(stream),
        Err(e) => {
            log::warn!("Could not open {path:?}: {e}");
            None
        }
    }
}

/// A cursor over the data of a run
pub struct Dataset {
    ctx: Context,
    strategy: BlindingStrategy,
    blind_source: Box<dyn BlindSource>,

    run: Option<LoadedRun>,
    current_run: i32,
    dir_kind: DataDirectory,
    decimated: bool,

    /// Entry in the full rate header stream
    wanted_entry: usize,
    /// Entry in the decimated header stream
    decimated_entry: usize,
    event_rank: Rank,
    cut: Option<Vec<usize>>,
    cut_rank: Rank,
    playlist: Vec<PlaylistEntry>,
    playlist_rank: Option<usize>,

    header: Option<(usize, RawHeader)>,
    raw: Option<(usize, RawEvent)>,
    useful: Option<UsefulEvent>,
    useful_entry: Option<usize>,
    useful_dirty: bool,
    useful_builds: usize,
    gps: Option<(usize, Attitude)>,
    gps_dirty: bool,
    truth: Option<(usize, TruthEvent)>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("run", &self.current_run)
            .field("loaded", &self.is_loaded())
            .field("decimated", &self.decimated)
            .field("entry", &self.current())
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl Dataset {
    /// Create a dataset and load a run. A run that fails to load is logged and leaves the
    /// dataset unloaded; see [Dataset::open] to get the error instead.
    pub fn new(
        ctx: Context,
        run: i32,
        dir: DataDirectory,
        decimated: bool,
        strategy: BlindingStrategy,
    ) -> Self {
        let mut dataset = Self::unloaded(ctx, strategy);
        if let Err(e) = dataset.load_run(run, dir, decimated) {
            log::error!("Failed to load run {run}: {e}");
        }
        dataset
    }

    /// Create a dataset and load a run, failing if the run cannot be loaded
    pub fn open(
        ctx: Context,
        run: i32,
        dir: DataDirectory,
        decimated: bool,
        strategy: BlindingStrategy,
    ) -> Result<Self, DatasetError> {
        let mut dataset = Self::unloaded(ctx, strategy);
        dataset.load_run(run, dir, decimated)?;
        Ok(dataset)
    }

    /// A dataset with no run loaded
    pub fn unloaded(ctx: Context, strategy: BlindingStrategy) -> Self {
        if strategy.contains(BlindingStrategy::INSERTED_VPOL_EVENTS)
            || strategy.contains(BlindingStrategy::INSERTED_HPOL_EVENTS)
        {
            log::warn!("No blinding source is loaded yet, inserted events need one to be set");
        }
        Self {
            ctx,
            strategy,
            blind_source: Box::new(NoBlindSource),
            run: None,
            current_run: 0,
            dir_kind: DataDirectory::Default,
            decimated: false,
            wanted_entry: 0,
            decimated_entry: 0,
            event_rank: Rank::Unknown,
            cut: None,
            cut_rank: Rank::Unknown,
            playlist: Vec::new(),
            playlist_rank: None,
            header: None,
            raw: None,
            useful: None,
            useful_entry: None,
            useful_dirty: false,
            useful_builds: 0,
            gps: None,
            gps_dirty: false,
            truth: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The data directory for a kind of data, given the current hardware version
    pub fn data_dir(&self, kind: DataDirectory) -> Option<PathBuf> {
        self.ctx.config.data_dir(kind, self.ctx.version.get())
    }

    /// The run last requested, whether or not it loaded
    pub fn current_run(&self) -> i32 {
        self.current_run
    }

    pub fn is_loaded(&self) -> bool {
        self.run.is_some()
    }

    pub fn is_decimated(&self) -> bool {
        self.decimated
    }

    /// Whether the header file of the run is simulated data
    pub fn is_simulated(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.simulated)
    }

    /// Whether events come from a calibrated file rather than being built from raw ones
    pub fn has_useful_file(&self) -> bool {
        matches!(
            self.run.as_ref().and_then(|r| r.events.as_ref()),
            Some(EventStream::Useful(_))
        )
    }

    /// Whether navigation comes with one fix per event
    pub fn has_gps_per_event(&self) -> bool {
        matches!(
            self.run.as_ref().and_then(|r| r.gps.as_ref()),
            Some(GpsStream::PerEvent(_))
        )
    }

    /// Path of the header file in use
    pub fn head_file(&self) -> Option<&Path> {
        self.run.as_ref().map(|r| r.headers.path.as_path())
    }

    pub fn strategy(&self) -> BlindingStrategy {
        self.strategy
    }

    /// Change the blinding strategy. Cached records are re-read so the new strategy applies.
    pub fn set_strategy(&mut self, strategy: BlindingStrategy) -> BlindingStrategy {
        self.strategy = strategy;
        self.invalidate_records();
        self.strategy
    }

    pub fn set_blind_source(&mut self, source: Box<dyn BlindSource>) {
        self.blind_source = source;
        self.invalidate_records();
    }

    fn invalidate_records(&mut self) {
        self.header = None;
        self.raw = None;
        self.useful_entry = None;
        self.gps = None;
        self.truth = None;
        self.useful_dirty = !self.has_useful_file();
        self.gps_dirty = !self.has_gps_per_event();
    }

    /// Close every file of the current run
    pub fn unload_run(&mut self) {
        self.run = None;
        self.cut = None;
        self.cut_rank = Rank::Unknown;
        self.event_rank = Rank::Unknown;
        self.header = None;
        self.raw = None;
        self.useful_entry = None;
        self.gps = None;
        self.truth = None;
        self.useful_dirty = false;
        self.gps_dirty = false;
    }

    /// Load a run, replacing the current one, and move to its first entry.
    ///
    /// Only the header file is required. Missing navigation, event or truth files leave those
    /// streams unavailable. In decimated mode the decimated header file is required as well.
    pub fn load_run(
        &mut self,
        run: i32,
        dir: DataDirectory,
        decimated: bool,
    ) -> Result<(), DatasetError> {
        self.unload_run();
        self.current_run = run;
        self.dir_kind = dir;
        self.decimated = decimated;
        self.wanted_entry = 0;
        self.decimated_entry = 0;

        let data_dir = self.data_dir(dir).ok_or(DatasetError::NoDataDirectory)?;
        if let DataDirectory::Version(v) = dir {
            if v > 0 {
                self.ctx.version.set(v);
            }
        }

        let store = self.ctx.store.clone();
        let run_dir = self.ctx.config.run_directory(&data_dir, run);
        let file = |prefix: &str| run_dir.join(format!("{prefix}{run}.root"));
        let files = |prefixes: &[&str]| prefixes.iter().map(|p| file(p)).collect::<Vec<_>>();

        let decimated_headers = if decimated {
            let path = file(DECIMATED_HEAD_FILE);
            if !store.exists(&path) {
                log::error!("Could not find decimated head file for run {run}, giving up!");
                return Err(DatasetError::MissingDecimatedHeadFile(run));
            }
            let mut tree = store.open_headers(&path)?;
            let index = tree.build_index("eventNumber")?;
            Some(HeaderStream { path, tree, index })
        } else {
            None
        };

        let Some(head_path) = first_existing(store.as_ref(), &files(&HEAD_FILES)) else {
            log::error!("Could not find head file for run {run}, giving up!");
            return Err(DatasetError::MissingHeadFile(run));
        };
        let simulated = head_path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().to_lowercase().contains("simulated"));
        match store.file_size(&head_path) {
            Some(size) => log::info!(
                "Using head file: {head_path:?} ({})",
                human_bytes::human_bytes(size as f64)
            ),
            None => log::info!("Using head file: {head_path:?}"),
        }
        let mut tree = store.open_headers(&head_path)?;
        let index = tree.build_index("eventNumber")?;
        let headers = HeaderStream {
            path: head_path,
            tree,
            index,
        };

        let gps = if let Some(path) = first_existing(store.as_ref(), &files(&GPS_EVENT_FILES)) {
            open_optional(store.as_ref(), &path, |s, p| s.open_attitudes(p)).map(GpsStream::PerEvent)
        } else if store.exists(&file(GPS_FILE)) {
            open_optional(store.as_ref(), &file(GPS_FILE), |s, p| {
                let mut tree = s.open_attitudes(p)?;
                let index = tree.build_index("realTime")?;
                Ok(GpsStream::ByTime { tree, index })
            })
        } else {
            log::warn!("Could not find gps file for run {run}");
            None
        };

        let events = if let Some(path) = first_existing(store.as_ref(), &files(&USEFUL_EVENT_FILES)) {
            open_optional(store.as_ref(), &path, |s, p| s.open_useful_events(p)).map(EventStream::Useful)
        } else if store.exists(&file(RAW_EVENT_FILE)) {
            open_optional(store.as_ref(), &file(RAW_EVENT_FILE), |s, p| s.open_raw_events(p))
                .map(EventStream::Raw)
        } else {
            None
        };
        if events.is_none() {
            log::warn!("Did not load an event tree for run {run} in {data_dir:?}");
        }

        let truth = if simulated {
            first_existing(store.as_ref(), &files(&TRUTH_FILES))
                .and_then(|path| open_optional(store.as_ref(), &path, |s, p| s.open_truth(p)))
        } else {
            None
        };

        self.run = Some(LoadedRun {
            headers,
            decimated: decimated_headers,
            events,
            gps,
            truth,
            simulated,
        });

        if self.n() > 0 {
            if let Err(e) = self.get_entry(0) {
                self.unload_run();
                return Err(e);
            }
        } else {
            log::warn!("Run {run} has no entries");
        }
        Ok(())
    }

    // Cursor

    /// Number of entries the cursor moves over; zero if no run is loaded
    pub fn n(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.cursor().tree.entries())
    }

    /// The current entry (of the decimated stream in decimated mode)
    pub fn current(&self) -> Option<usize> {
        self.run.as_ref()?;
        Some(if self.decimated {
            self.decimated_entry
        } else {
            self.wanted_entry
        })
    }

    /// The current entry of the full rate stream
    pub fn full_entry(&self) -> Option<usize> {
        self.run.as_ref().map(|_| self.wanted_entry)
    }

    /// Move to an entry. Out of range entries are an error and leave the cursor where it was.
    pub fn get_entry(&mut self, entry: i64) -> Result<usize, DatasetError> {
        let n = self.n() as i64;
        let run = self.run.as_mut().ok_or(DatasetError::RunNotLoaded)?;
        if entry < 0 || entry >= n {
            log::warn!("Requested entry {entry} too big or small!");
            return Err(DatasetError::EntryOutOfRange(entry, n));
        }
        let entry = entry as usize;

        // Read before moving anything so a failed read leaves the cursor where it was
        let header = run.cursor_mut().tree.get_entry(entry)?;
        let decimated = run.decimated.is_some();
        let wanted = if decimated {
            run.headers
                .entry_of_event(header.event_number)?
                .ok_or(DatasetError::EventNotFound(header.event_number))?
        } else {
            entry
        };

        if decimated {
            self.decimated_entry = entry;
        }
        self.wanted_entry = wanted;
        self.event_rank = Rank::Unknown;
        self.cut_rank = Rank::Unknown;
        if !self.has_useful_file() {
            self.useful_dirty = true;
        }
        if !self.has_gps_per_event() {
            self.gps_dirty = true;
        }

        // The header sets the hardware version. Blinding keeps the trigger time.
        self.ctx
            .version
            .set_from_unix_time(header.trigger_time as f64);
        Ok(entry)
    }

    /// Move to an event number
    pub fn get_event(&mut self, event_number: u64) -> Result<usize, DatasetError> {
        self.find_event(event_number, false)
    }

    /// [Dataset::get_event] without the warnings
    pub fn get_event_quiet(&mut self, event_number: u64) -> Result<usize, DatasetError> {
        self.find_event(event_number, true)
    }

    fn find_event(&mut self, event_number: u64, quiet: bool) -> Result<usize, DatasetError> {
        let run = self.run.as_mut().ok_or(DatasetError::RunNotLoaded)?;
        match run.cursor_mut().entry_of_event(event_number)? {
            Some(entry) => self.get_entry(entry as i64),
            None => {
                if !quiet {
                    let index = &run.headers.index;
                    let in_range = index
                        .min_key()
                        .zip(index.max_key())
                        .is_some_and(|(min, max)| (min..=max).contains(&(event_number as f64)));
                    if in_range {
                        log::warn!("Event {event_number} is missing from the header tree");
                    } else {
                        log::warn!("Event {event_number} not found in header tree");
                    }
                    if self.decimated {
                        log::warn!("We are using decimated tree, so maybe that's why?");
                    }
                }
                Err(DatasetError::EventNotFound(event_number))
            }
        }
    }

    pub fn next(&mut self) -> Result<usize, DatasetError> {
        let current = self.current().ok_or(DatasetError::RunNotLoaded)?;
        self.get_entry(current as i64 + 1)
    }

    pub fn previous(&mut self) -> Result<usize, DatasetError> {
        let current = self.current().ok_or(DatasetError::RunNotLoaded)?;
        self.get_entry(current as i64 - 1)
    }

    pub fn first(&mut self) -> Result<usize, DatasetError> {
        self.get_entry(0)
    }

    pub fn last(&mut self) -> Result<usize, DatasetError> {
        self.get_entry(self.n() as i64 - 1)
    }

    // Event number order

    fn resolve_event_rank(&mut self) -> Result<Rank, DatasetError> {
        if self.event_rank == Rank::Unknown {
            let current = self.current().ok_or(DatasetError::RunNotLoaded)?;
            let Some(event_number) = self.header(false)?.map(|h| h.event_number) else {
                return Ok(Rank::Unknown);
            };
            let run = self.run.as_ref().ok_or(DatasetError::RunNotLoaded)?;
            self.event_rank =
                Rank::from_search(run.cursor().index.rank_of(event_number as f64, current));
        }
        Ok(self.event_rank)
    }

    /// Move to the event of rank `rank` in event number order
    pub fn nth_event(&mut self, rank: usize) -> Result<usize, DatasetError> {
        let run = self.run.as_ref().ok_or(DatasetError::RunNotLoaded)?;
        let index = &run.cursor().index;
        let entry = index
            .entry_at_rank(rank)
            .ok_or(DatasetError::RankOutOfRange(rank, index.len()))?;
        let ret = self.get_entry(entry as i64)?;
        self.event_rank = Rank::At(rank);
        Ok(ret)
    }

    pub fn first_event(&mut self) -> Result<usize, DatasetError> {
        self.nth_event(0)
    }

    pub fn last_event(&mut self) -> Result<usize, DatasetError> {
        self.nth_event(self.n().saturating_sub(1))
    }

    /// The next event in event number order, staying on the last one
    pub fn next_event(&mut self) -> Result<usize, DatasetError> {
        let rank = self.resolve_event_rank()?.next(self.n());
        self.nth_event(rank)
    }

    /// The previous event in event number order, staying on the first one
    pub fn previous_event(&mut self) -> Result<usize, DatasetError> {
        let rank = self.resolve_event_rank()?.previous();
        self.nth_event(rank)
    }

    // Cuts

    /// Select the entries whose header passes `predicate`, replacing any previous cut.
    /// Returns the number selected.
    pub fn set_cut<F>(&mut self, mut predicate: F) -> Result<usize, DatasetError>
    where
        F: FnMut(&RawHeader) -> bool,
    {
        let run = self.run.as_mut().ok_or(DatasetError::RunNotLoaded)?;
        let selected = run.cursor_mut().tree.select(&mut predicate)?;
        let n = selected.len();
        self.cut = Some(selected);
        self.cut_rank = Rank::Unknown;
        Ok(n)
    }

    pub fn clear_cut(&mut self) {
        self.cut = None;
        self.cut_rank = Rank::Unknown;
    }

    /// Number of entries passing the cut, None without one
    pub fn n_in_cut(&self) -> Option<usize> {
        self.cut.as_ref().map(|c| c.len())
    }

    /// The entries passing the cut, in entry order
    pub fn cut_entries(&self) -> Option<&[usize]> {
        self.cut.as_deref()
    }

    pub fn nth_in_cut(&mut self, rank: usize) -> Result<usize, DatasetError> {
        let cut = self.cut.as_ref().ok_or(DatasetError::NoCut)?;
        let entry = *cut
            .get(rank)
            .ok_or(DatasetError::RankOutOfRange(rank, cut.len()))?;
        let ret = self.get_entry(entry as i64)?;
        self.cut_rank = Rank::At(rank);
        Ok(ret)
    }

    fn resolve_cut_rank(&mut self) -> Result<Rank, DatasetError> {
        let cut = self.cut.as_ref().ok_or(DatasetError::NoCut)?;
        if self.cut_rank == Rank::Unknown {
            let current = self.current().ok_or(DatasetError::RunNotLoaded)?;
            self.cut_rank = Rank::from_search(cut.binary_search(&current));
        }
        Ok(self.cut_rank)
    }

    pub fn first_in_cut(&mut self) -> Result<usize, DatasetError> {
        self.nth_in_cut(0)
    }

    pub fn last_in_cut(&mut self) -> Result<usize, DatasetError> {
        let n = self.n_in_cut().ok_or(DatasetError::NoCut)?;
        self.nth_in_cut(n.saturating_sub(1))
    }

    pub fn next_in_cut(&mut self) -> Result<usize, DatasetError> {
        let n = self.n_in_cut().ok_or(DatasetError::NoCut)?;
        let rank = self.resolve_cut_rank()?.next(n);
        self.nth_in_cut(rank)
    }

    pub fn previous_in_cut(&mut self) -> Result<usize, DatasetError> {
        let rank = self.resolve_cut_rank()?.previous();
        self.nth_in_cut(rank)
    }

    // Playlists

    /// Load a playlist file, replacing the current playlist. Returns its length.
    pub fn set_playlist(&mut self, path: &Path) -> Result<usize, DatasetError> {
        let entries = read_playlist(path)?;
        Ok(self.set_playlist_entries(entries))
    }

    pub fn set_playlist_entries(&mut self, entries: Vec<PlaylistEntry>) -> usize {
        self.playlist = entries;
        self.playlist_rank = None;
        self.playlist.len()
    }

    /// Length of the playlist, None if there is none
    pub fn n_in_playlist(&self) -> Option<usize> {
        (!self.playlist.is_empty()).then_some(self.playlist.len())
    }

    /// Move to playlist stop `rank`, loading its run if it is not the current one
    pub fn nth_in_playlist(&mut self, rank: usize) -> Result<usize, DatasetError> {
        if self.playlist.is_empty() {
            return Err(DatasetError::NoPlaylist);
        }
        let target = *self
            .playlist
            .get(rank)
            .ok_or(DatasetError::RankOutOfRange(rank, self.playlist.len()))?;
        self.playlist_rank = Some(rank);
        if !self.is_loaded() || self.current_run != target.run {
            self.load_run(target.run, self.dir_kind, self.decimated)?;
        }
        self.get_event(target.event_number)
    }

    pub fn first_in_playlist(&mut self) -> Result<usize, DatasetError> {
        self.nth_in_playlist(0)
    }

    pub fn last_in_playlist(&mut self) -> Result<usize, DatasetError> {
        self.nth_in_playlist(self.playlist.len().saturating_sub(1))
    }

    pub fn next_in_playlist(&mut self) -> Result<usize, DatasetError> {
        let n = self.n_in_playlist().ok_or(DatasetError::NoPlaylist)?;
        let rank = self.playlist_rank.unwrap_or(0);
        self.nth_in_playlist((rank + 1).min(n - 1))
    }

    pub fn previous_in_playlist(&mut self) -> Result<usize, DatasetError> {
        self.n_in_playlist().ok_or(DatasetError::NoPlaylist)?;
        let rank = self.playlist_rank.unwrap_or(0);
        self.nth_in_playlist(rank.saturating_sub(1))
    }

    // Minimum bias

    /// Move to the next entry that was not an RF trigger
    pub fn next_min_bias_event(&mut self) -> Result<usize, DatasetError> {
        self.scan_min_bias(true)
    }

    /// Move to the previous entry that was not an RF trigger
    pub fn previous_min_bias_event(&mut self) -> Result<usize, DatasetError> {
        self.scan_min_bias(false)
    }

    fn scan_min_bias(&mut self, forward: bool) -> Result<usize, DatasetError> {
        let start_run = self.current_run;
        let start_entry = self.current().ok_or(DatasetError::RunNotLoaded)?;
        let mut candidate = if forward {
            Some(start_entry + 1)
        } else {
            start_entry.checked_sub(1)
        };

        loop {
            while let Some(entry) = candidate.filter(|e| *e < self.n()) {
                let run = self.run.as_mut().ok_or(DatasetError::RunNotLoaded)?;
                let header = run.cursor_mut().tree.get_entry(entry)?;
                if trigger::is_min_bias(header.trig_type) {
                    return self.get_entry(entry as i64);
                }
                candidate = if forward { Some(entry + 1) } else { entry.checked_sub(1) };
            }

            if self.ctx.config.run_boundary == RunBoundaryPolicy::Stop {
                return Err(DatasetError::EndOfRun(self.current_run));
            }
            let next_run = if forward {
                self.current_run + 1
            } else {
                self.current_run - 1
            };
            log::info!("Reached the end of run {}, moving on to run {next_run}", self.current_run);
            if let Err(e) = self.load_run(next_run, self.dir_kind, self.decimated) {
                log::warn!("Could not continue into run {next_run}, returning to run {start_run}");
                self.restore(start_run, start_entry);
                return Err(e);
            }
            candidate = if forward {
                Some(0)
            } else {
                self.n().checked_sub(1)
            };
        }
    }

    fn restore(&mut self, run: i32, entry: usize) {
        let restored = self
            .load_run(run, self.dir_kind, self.decimated)
            .and_then(|_| self.get_entry(entry as i64));
        if let Err(e) = restored {
            log::error!("Could not return to run {run} entry {entry}: {e}");
        }
    }

    // Records at the cursor

    /// The header at the cursor
    pub fn header(&mut self, force: bool) -> Result<Option<&RawHeader>, DatasetError> {
        let Some(entry) = self.current() else {
            return Ok(None);
        };
        if force || self.header.as_ref().map(|(e, _)| *e) != Some(entry) {
            let Some(run) = self.run.as_mut() else {
                return Ok(None);
            };
            let tree = &mut run.cursor_mut().tree;
            if entry >= tree.entries() {
                return Ok(None);
            }
            let mut header = tree.get_entry(entry)?;
            for pol in Pol::ALL {
                if !self.strategy.contains(BlindingStrategy::inserted(pol)) {
                    continue;
                }
                if let Some(fake) = self
                    .blind_source
                    .replacement(pol, header.event_number)
                    .and_then(|fake_entry| self.blind_source.fake_header(pol, fake_entry))
                {
                    overwrite_header(&mut header, fake);
                }
            }
            self.header = Some((entry, header));
        }
        Ok(self.header.as_ref().map(|(_, h)| h))
    }

    /// The raw event at the cursor. With a calibrated event file this is the raw part of the
    /// calibrated event.
    pub fn raw(&mut self, force: bool) -> Result<Option<&RawEvent>, DatasetError> {
        if self.has_useful_file() {
            return Ok(self.useful(force)?.map(|u| &u.raw));
        }
        let entry = self.wanted_entry;
        let Some(EventStream::Raw(tree)) = self.run.as_mut().and_then(|r| r.events.as_mut()) else {
            return Ok(None);
        };
        if force || self.raw.as_ref().map(|(e, _)| *e) != Some(entry) {
            self.raw = Some((entry, tree.get_entry(entry)?));
            self.useful_dirty = true;
        }
        Ok(self.raw.as_ref().map(|(_, r)| r))
    }

    /// The calibrated event at the cursor, read from a calibrated file or built from the raw
    /// event. A built view is only rebuilt when the raw event changes.
    pub fn useful(&mut self, force: bool) -> Result<Option<&UsefulEvent>, DatasetError> {
        let entry = self.wanted_entry;
        let mut fresh = false;
        match self.run.as_mut().and_then(|r| r.events.as_mut()) {
            None => return Ok(None),
            Some(EventStream::Useful(tree)) => {
                if force || self.useful_entry != Some(entry) {
                    self.useful = Some(tree.get_entry(entry)?);
                    self.useful_entry = Some(entry);
                    self.useful_dirty = false;
                    fresh = true;
                }
            }
            Some(EventStream::Raw(tree)) => {
                if force || self.raw.as_ref().map(|(e, _)| *e) != Some(entry) {
                    self.raw = Some((entry, tree.get_entry(entry)?));
                    self.useful_dirty = true;
                }
                if self.useful_dirty || self.useful_entry != Some(entry) {
                    let Some((_, raw)) = self.raw.as_ref() else {
                        return Ok(None);
                    };
                    let geom = self.ctx.geometry.get(0, "")?;
                    let flight = self.ctx.geometry.get(0, FLIGHT_GEOMETRY)?;
                    self.useful = Some(UsefulEvent::new(raw.clone(), &geom, &flight));
                    self.useful_entry = Some(entry);
                    self.useful_dirty = false;
                    self.useful_builds += 1;
                    fresh = true;
                }
            }
        }

        if fresh {
            self.blind_useful();
        }
        Ok(self.useful.as_ref())
    }

    /// Blinding of a freshly read or built calibrated event
    fn blind_useful(&mut self) {
        let Some(useful) = self.useful.as_mut() else {
            return;
        };
        for pol in Pol::ALL {
            if !self.strategy.contains(BlindingStrategy::inserted(pol)) {
                continue;
            }
            if let Some(fake) = self
                .blind_source
                .replacement(pol, useful.event_number())
                .and_then(|fake_entry| self.blind_source.fake_event(pol, fake_entry))
            {
                overwrite_event(useful, fake);
            }
        }
        if maybe_invert_polarity(self.strategy, useful.event_number()) {
            log::debug!("Inverting event {}", useful.event_number());
            useful.invert();
        }
    }

    /// Whether the next call to [Dataset::useful] rebuilds the calibrated view
    pub fn useful_needs_rebuild(&self) -> bool {
        self.useful_dirty
    }

    /// Number of calibrated views built from raw events so far
    pub fn useful_builds(&self) -> usize {
        self.useful_builds
    }

    /// The navigation fix for the cursor. Without per-event fixes the fix nearest in time to
    /// the header trigger time is used.
    pub fn gps(&mut self, force: bool) -> Result<Option<&Attitude>, DatasetError> {
        let entry = self.wanted_entry;
        if self.has_gps_per_event() {
            let Some(GpsStream::PerEvent(tree)) = self.run.as_mut().and_then(|r| r.gps.as_mut())
            else {
                return Ok(None);
            };
            if force || self.gps.as_ref().map(|(e, _)| *e) != Some(entry) {
                self.gps = Some((entry, tree.get_entry(entry)?));
            }
        } else if force || self.gps_dirty || self.gps.is_none() {
            let time = match self.header(false)? {
                Some(h) => (h.trigger_time as f64 + h.trigger_time_ns as f64 / 1e9).round(),
                None => return Ok(None),
            };
            let Some(GpsStream::ByTime { tree, index }) =
                self.run.as_mut().and_then(|r| r.gps.as_mut())
            else {
                return Ok(None);
            };
            let Some(gps_entry) = index.entry_with_best_index(time) else {
                return Ok(None);
            };
            self.gps = Some((gps_entry, tree.get_entry(gps_entry)?));
            self.gps_dirty = false;
        }
        Ok(self.gps.as_ref().map(|(_, g)| g))
    }

    /// Monte Carlo truth at the cursor, for simulated runs
    pub fn truth(&mut self, force: bool) -> Result<Option<&TruthEvent>, DatasetError> {
        let entry = self.wanted_entry;
        let Some(tree) = self.run.as_mut().and_then(|r| r.truth.as_mut()) else {
            return Ok(None);
        };
        if force || self.truth.as_ref().map(|(e, _)| *e) != Some(entry) {
            self.truth = Some((entry, tree.get_entry(entry)?));
        }
        Ok(self.truth.as_ref().map(|(_, t)| t))
    }

    // Lookups

    /// The run taking data at unix time `t`
    pub fn run_at_time(&self, t: f64) -> Option<i32> {
        self.ctx.run_times.run_at_time(t)
    }

    /// Position of HiCal payload `which` ('A' or 'B') at a unix time
    pub fn hical(&self, which: char, unix_time: u32) -> Option<HiCalPosition> {
        self.ctx.hical.position(which, unix_time)
    }

    /// Position of HiCal payload `which` at the trigger time of the current header
    pub fn hical_now(&mut self, which: char) -> Option<HiCalPosition> {
        let unix_time = match self.header(false) {
            Ok(Some(header)) => header.trigger_time,
            Ok(None) => return None,
            Err(e) => {
                log::error!("Could not read the current header for HiCal {which}: {e}");
                return None;
            }
        };
        self.hical(which, unix_time)
    }
}
