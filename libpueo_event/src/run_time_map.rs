use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::config::Config;
use super::error::RunTimeMapError;
use super::store::{first_existing, RecordStore};
use super::version::{DataDirectory, HardwareVersion};

/// The span of trigger times covered by one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTimeSpan {
    pub run: i32,
    pub start_time: f64,
    pub stop_time: f64,
}

/// Name of the cache file for a hardware version
pub fn cache_file_name(version: i32) -> String {
    format!("timerunmap_{version}.txt")
}

/// Parse the contents of a cache file, one `<run> <start> <stop>` line per run
pub fn parse_cache(contents: &str) -> Result<Vec<RunTimeSpan>, RunTimeMapError> {
    let mut spans = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let bad_line = || RunTimeMapError::BadLine(line_number + 1, line.to_string());
        let mut fields = line.split_whitespace();
        let (Some(run), Some(start), Some(stop), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(bad_line());
        };
        spans.push(RunTimeSpan {
            run: run.parse().map_err(|_| bad_line())?,
            start_time: start.parse().map_err(|_| bad_line())?,
            stop_time: stop.parse().map_err(|_| bad_line())?,
        });
    }
    Ok(spans)
}

/// Render spans in the cache file format
pub fn format_cache(spans: &[RunTimeSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{} {:.9} {:.9}", span.run, span.start_time, span.stop_time);
    }
    out
}

/// Find the run covering time `t` in spans sorted by stop time.
///
/// Picks the first span that stops at or after `t`. Times in the gap between two runs resolve
/// to the later run; times before the first run or after the last one resolve to nothing.
pub fn lookup(spans: &[RunTimeSpan], t: f64) -> Option<i32> {
    let idx = spans.partition_point(|span| span.stop_time < t);
    let span = spans.get(idx)?;
    if idx == 0 && span.start_time > t {
        return None;
    }
    Some(span.run)
}

fn sort_by_stop(spans: &mut [RunTimeSpan]) {
    spans.sort_by(|a, b| a.stop_time.total_cmp(&b.stop_time));
}

/// The run number encoded in a `run<N>` directory name
fn run_from_dir_name(name: &str) -> Option<i32> {
    name.strip_prefix("run")?.parse().ok()
}

/// Per hardware version tables of run time spans.
///
/// A table is loaded from a cache file when one exists, otherwise rebuilt by scanning the
/// header file of every run and written back to the local calibration directory. Each table is
/// built at most once per registry, even under concurrent lookups.
pub struct RunTimeRegistry {
    config: Config,
    store: Arc<dyn RecordStore>,
    tables: RwLock<FxHashMap<i32, Arc<[RunTimeSpan]>>>,
    builds: AtomicUsize,
}

impl std::fmt::Debug for RunTimeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunTimeRegistry")
            .field("versions", &self.tables.read().keys().collect::<Vec<_>>())
            .field("builds", &self.builds())
            .finish()
    }
}

impl RunTimeRegistry {
    pub fn new(config: &Config, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config: config.clone(),
            store,
            tables: RwLock::new(FxHashMap::default()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Number of tables this registry has built
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// The run taking data at unix time `t`, if any
    pub fn run_at_time(&self, t: f64) -> Option<i32> {
        let version = HardwareVersion::version_from_unix_time(t);
        match self.spans(version) {
            Ok(spans) => lookup(&spans, t),
            Err(e) => {
                log::error!("Could not build the run time map for version {version}: {e}");
                None
            }
        }
    }

    /// The table for a hardware version, sorted by stop time
    pub fn spans(&self, version: i32) -> Result<Arc<[RunTimeSpan]>, RunTimeMapError> {
        if let Some(spans) = self.tables.read().get(&version) {
            return Ok(spans.clone());
        }

        let mut tables = self.tables.write();
        if let Some(spans) = tables.get(&version) {
            return Ok(spans.clone());
        }
        let spans: Arc<[RunTimeSpan]> = self.build(version)?.into();
        self.builds.fetch_add(1, Ordering::Relaxed);
        tables.insert(version, spans.clone());
        Ok(spans)
    }

    fn build(&self, version: i32) -> Result<Vec<RunTimeSpan>, RunTimeMapError> {
        let file_name = cache_file_name(version);
        let candidates = self.config.calib_candidates(&file_name);
        if let Some(path) = candidates.iter().find(|p| p.is_file()) {
            match Self::read_cache(path) {
                Ok(spans) => {
                    log::info!("Loaded {} run time spans from {path:?}", spans.len());
                    return Ok(spans);
                }
                Err(e) => log::warn!("Ignoring unreadable run time map {path:?}: {e}"),
            }
        }

        let data_dir = self
            .config
            .data_dir(DataDirectory::Version(version), version)
            .ok_or(RunTimeMapError::NoDataDirectory(version))?;
        let write_path = self.config.local_calib_dir.join(&file_name);
        log::warn!(
            "Couldn't find run file map. Regenerating {write_path:?} from header files in {data_dir:?}"
        );
        let spans = self.rescan(&data_dir)?;
        if let Err(e) = Self::write_cache(&write_path, &spans) {
            log::warn!("Could not write run time map {write_path:?}: {e}");
        }
        Ok(spans)
    }

    fn read_cache(path: &Path) -> Result<Vec<RunTimeSpan>, RunTimeMapError> {
        let mut spans = parse_cache(&std::fs::read_to_string(path)?)?;
        sort_by_stop(&mut spans);
        Ok(spans)
    }

    fn write_cache(path: &Path, spans: &[RunTimeSpan]) -> Result<(), RunTimeMapError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, format_cache(spans))?;
        Ok(())
    }

    /// Open the header file of every run directory and take the trigger time range
    fn rescan(&self, data_dir: &Path) -> Result<Vec<RunTimeSpan>, RunTimeMapError> {
        let names = match self.store.list_dir(data_dir) {
            Ok(names) => names,
            Err(e) => {
                log::error!("Could not list {data_dir:?}: {e}");
                return Ok(Vec::new());
            }
        };

        let mut spans = Vec::new();
        for run in names.iter().filter_map(|name| run_from_dir_name(name)) {
            let run_dir = self.config.run_directory(data_dir, run);
            let candidates: Vec<PathBuf> = ["timedHeadFile", "headFile"]
                .iter()
                .map(|prefix| run_dir.join(format!("{prefix}{run}.root")))
                .collect();
            let Some(path) = first_existing(self.store.as_ref(), &candidates) else {
                continue;
            };
            let span = self.store.open_headers(&path).and_then(|mut tree| {
                Ok((tree.minimum("triggerTime")?, tree.maximum("triggerTime")?))
            });
            match span {
                Ok((Some(start_time), Some(stop_time))) => spans.push(RunTimeSpan {
                    run,
                    start_time,
                    stop_time: stop_time + 1.0,
                }),
                Ok(_) => log::debug!("Header file {path:?} is empty"),
                Err(e) => log::debug!("Skipping {path:?}: {e}"),
            }
        }
        sort_by_stop(&mut spans);
        Ok(spans)
    }
}
