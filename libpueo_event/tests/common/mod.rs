#![allow(dead_code)]
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libpueo_event::blinding::BlindingStrategy;
use libpueo_event::config::Config;
use libpueo_event::context::Context;
use libpueo_event::dataset::Dataset;
use libpueo_event::records::{Attitude, RawEvent, RawHeader};
use libpueo_event::store::{MemoryStore, HEAD_TREE};
use libpueo_event::version::{DataDirectory, HardwareVersion};

pub const DATA_DIR: &str = "/data/pueo";
pub const START_TIME: u32 = 1_700_000_000;
pub const SAMPLES: usize = 8;

pub fn run_file(run: i32, prefix: &str) -> PathBuf {
    Path::new(DATA_DIR).join(format!("run{run}/{prefix}{run}.root"))
}

/// Headers one second apart with the given event numbers and trigger types
pub fn headers(run: i32, event_numbers: &[u64], trig_types: &[u32]) -> Vec<RawHeader> {
    event_numbers
        .iter()
        .zip(trig_types.iter())
        .enumerate()
        .map(|(i, (ev, trig))| RawHeader {
            run,
            event_number: *ev,
            trig_type: *trig,
            trigger_time: START_TIME + run as u32 * 1000 + i as u32,
            ..Default::default()
        })
        .collect()
}

/// Raw events whose samples all equal the event number
pub fn raw_events(headers: &[RawHeader]) -> Vec<RawEvent> {
    headers
        .iter()
        .map(|h| {
            let mut event = RawEvent::new(h.run, h.event_number, SAMPLES);
            event.data.fill(h.event_number as i16);
            event
        })
        .collect()
}

/// Add a run with a header file and a raw event file
pub fn add_run(store: &MemoryStore, run: i32, event_numbers: &[u64], trig_types: &[u32]) {
    let headers = headers(run, event_numbers, trig_types);
    store.add_raw_events(&run_file(run, "eventFile"), raw_events(&headers));
    store.add_headers(&run_file(run, "headFile"), HEAD_TREE, headers);
}

pub fn fix(real_time: u64, latitude: f32) -> Attitude {
    Attitude {
        source: 'A',
        real_time,
        latitude,
        ..Default::default()
    }
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.root_data = Some(PathBuf::from(DATA_DIR));
    config
}

pub fn context(store: Arc<MemoryStore>, config: Config) -> Context {
    Context::new(store, config, Arc::new(HardwareVersion::new(1)))
}

pub fn open(ctx: Context, run: i32) -> Dataset {
    Dataset::open(ctx, run, DataDirectory::Default, false, BlindingStrategy::NONE).unwrap()
}
