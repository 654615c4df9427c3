mod common;

use approx::assert_relative_eq;
use std::sync::Arc;

use common::*;
use libpueo_event::blinding::{maybe_invert_polarity, BlindSource, BlindingStrategy};
use libpueo_event::config::RunBoundaryPolicy;
use libpueo_event::constants::{ADC_TO_MV, FLIGHT_GEOMETRY};
use libpueo_event::conventions::Pol;
use libpueo_event::dataset::Dataset;
use libpueo_event::error::DatasetError;
use libpueo_event::playlist::PlaylistEntry;
use libpueo_event::records::{HiCalFix, RawHeader, TruthEvent, UsefulEvent};
use libpueo_event::store::{MemoryStore, HEAD_TREE};
use libpueo_event::version::DataDirectory;

fn single_run(event_numbers: &[u64], trig_types: &[u32]) -> Dataset {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, event_numbers, trig_types);
    open(context(store, config()), 10)
}

#[test]
fn test_get_entry_bounds() {
    let mut ds = single_run(&[1, 2, 3, 4, 5], &[1; 5]);
    assert_eq!(ds.current(), Some(0));
    assert_eq!(ds.n(), 5);

    assert_eq!(ds.get_entry(3).unwrap(), 3);
    assert_eq!(ds.current(), Some(3));
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 4);

    assert!(matches!(
        ds.get_entry(5),
        Err(DatasetError::EntryOutOfRange(5, 5))
    ));
    assert!(ds.get_entry(-1).is_err());
    assert_eq!(ds.current(), Some(3));
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 4);

    assert_eq!(ds.last().unwrap(), 4);
    assert!(ds.next().is_err());
    assert_eq!(ds.current(), Some(4));
    assert_eq!(ds.first().unwrap(), 0);
    assert!(ds.previous().is_err());
    assert_eq!(ds.next().unwrap(), 1);
}

#[test]
fn test_event_order() {
    // entry:            0   1   2   3   4
    let mut ds = single_run(&[30, 10, 20, 50, 40], &[1; 5]);

    let mut visited = vec![ds.first_event().unwrap()];
    for _ in 0..4 {
        visited.push(ds.next_event().unwrap());
    }
    assert_eq!(visited, vec![1, 2, 0, 4, 3]);

    // Clamped at both ends
    for _ in 0..3 {
        assert_eq!(ds.next_event().unwrap(), 3);
    }
    ds.first_event().unwrap();
    for _ in 0..3 {
        assert_eq!(ds.previous_event().unwrap(), 1);
    }

    // The rank is found from the current entry after moving by entry
    ds.get_entry(0).unwrap();
    assert_eq!(ds.next_event().unwrap(), 4);
    ds.get_entry(0).unwrap();
    assert_eq!(ds.previous_event().unwrap(), 2);

    assert_eq!(ds.nth_event(3).unwrap(), 4);
    assert!(matches!(
        ds.nth_event(5),
        Err(DatasetError::RankOutOfRange(5, 5))
    ));
    assert_eq!(ds.current(), Some(4));
}

#[test]
fn test_cut() {
    let trig_types = [1, 0, 1, 0, 0, 1];
    let mut ds = single_run(&[1, 2, 3, 4, 5, 6], &trig_types);
    assert!(matches!(ds.next_in_cut(), Err(DatasetError::NoCut)));
    assert_eq!(ds.n_in_cut(), None);

    let k = ds.set_cut(|h: &RawHeader| h.trig_type == 0).unwrap();
    assert_eq!(k, 3);
    assert_eq!(ds.n_in_cut(), Some(3));

    let mut visited = vec![ds.first_in_cut().unwrap()];
    while visited.len() < 5 {
        visited.push(ds.next_in_cut().unwrap());
    }
    assert_eq!(visited, vec![1, 3, 4, 4, 4]);
    assert_eq!(ds.last_in_cut().unwrap(), 4);
    assert_eq!(ds.previous_in_cut().unwrap(), 3);

    // From an entry outside of the cut, step to its neighbours in the cut
    ds.get_entry(2).unwrap();
    assert_eq!(ds.next_in_cut().unwrap(), 3);
    ds.get_entry(2).unwrap();
    assert_eq!(ds.previous_in_cut().unwrap(), 1);
    ds.get_entry(0).unwrap();
    assert_eq!(ds.previous_in_cut().unwrap(), 1);

    assert!(matches!(
        ds.nth_in_cut(3),
        Err(DatasetError::RankOutOfRange(3, 3))
    ));
    assert_eq!(ds.current(), Some(1));

    assert_eq!(ds.set_cut(|h: &RawHeader| h.event_number > 100).unwrap(), 0);
    assert!(ds.first_in_cut().is_err());
    ds.clear_cut();
    assert!(matches!(ds.last_in_cut(), Err(DatasetError::NoCut)));
}

#[test]
fn test_useful_built_from_raw() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[7, 8], &[1, 1]);
    let ctx = context(store, config());
    let mut ds = open(ctx.clone(), 10);
    assert!(!ds.has_useful_file());

    let raw = ds.raw(false).unwrap().unwrap();
    assert_eq!(raw.event_number, 7);
    assert_eq!(raw.data[[0, 0]], 7);

    assert!(ds.useful_needs_rebuild());
    let geom = ctx.geometry.get(0, "").unwrap();
    let chan = geom.chan_index_from_ant_pol(30, Pol::Vertical).unwrap();
    let useful = ds.useful(false).unwrap().unwrap();
    assert_eq!(useful.event_number(), 7);
    assert_relative_eq!(useful.volts[[chan, 0]], 7.0 * ADC_TO_MV);
    assert_eq!(ds.useful_builds(), 1);
    assert!(!ds.useful_needs_rebuild());

    // Same entry, nothing to rebuild
    ds.useful(false).unwrap().unwrap();
    assert_eq!(ds.useful_builds(), 1);

    ds.next().unwrap();
    assert!(ds.useful_needs_rebuild());
    assert_eq!(ds.useful(false).unwrap().unwrap().event_number(), 8);
    assert_eq!(ds.useful_builds(), 2);

    // A forced read rebuilds
    ds.useful(true).unwrap();
    assert_eq!(ds.useful_builds(), 3);
}

#[test]
fn test_useful_file_preferred() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[7, 8], &[1, 1]);
    let mut useful = UsefulEvent::default();
    useful.raw.event_number = 7;
    useful.volts[[0, 0]] = 12.5;
    let mut second = useful.clone();
    second.raw.event_number = 8;
    store.add_useful_events(&run_file(10, "usefulEventFile"), vec![useful, second]);

    let mut ds = open(context(store, config()), 10);
    assert!(ds.has_useful_file());
    assert_relative_eq!(ds.useful(false).unwrap().unwrap().volts[[0, 0]], 12.5);
    assert_eq!(ds.raw(false).unwrap().unwrap().event_number, 7);
    assert!(!ds.useful_needs_rebuild());
    ds.next().unwrap();
    assert!(!ds.useful_needs_rebuild());
    assert_eq!(ds.raw(false).unwrap().unwrap().event_number, 8);
    assert_eq!(ds.useful_builds(), 0);
}

#[test]
fn test_missing_streams_are_absent() {
    let store = Arc::new(MemoryStore::new());
    store.add_headers(&run_file(10, "headFile"), HEAD_TREE, headers(10, &[1, 2], &[1, 1]));
    let mut ds = open(context(store, config()), 10);
    assert!(ds.is_loaded());
    assert!(ds.raw(false).unwrap().is_none());
    assert!(ds.useful(false).unwrap().is_none());
    assert!(ds.gps(false).unwrap().is_none());
    assert!(ds.truth(false).unwrap().is_none());
    assert!(ds.header(false).unwrap().is_some());
}

#[test]
fn test_get_event() {
    let mut ds = single_run(&[10, 20, 30, 40], &[1; 4]);
    ds.get_entry(2).unwrap();
    assert!(matches!(
        ds.get_event(999),
        Err(DatasetError::EventNotFound(999))
    ));
    assert_eq!(ds.current(), Some(2));
    // In range but absent
    assert!(ds.get_event_quiet(25).is_err());
    assert_eq!(ds.current(), Some(2));

    assert_eq!(ds.get_event(20).unwrap(), 1);
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 20);
}

fn two_runs(config: libpueo_event::config::Config) -> Dataset {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[100, 101, 102, 103], &[1, 0, 1, 1]);
    add_run(&store, 11, &[200, 201, 202], &[1, 0, 1]);
    open(context(store, config), 10)
}

#[test]
fn test_min_bias_crosses_runs() {
    let mut ds = two_runs(config());
    ds.get_entry(1).unwrap();

    assert_eq!(ds.next_min_bias_event().unwrap(), 1);
    assert_eq!(ds.current_run(), 11);
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 201);

    assert_eq!(ds.previous_min_bias_event().unwrap(), 1);
    assert_eq!(ds.current_run(), 10);
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 101);
}

#[test]
fn test_min_bias_missing_next_run() {
    let mut ds = two_runs(config());
    ds.load_run(11, DataDirectory::Default, false).unwrap();
    ds.get_entry(1).unwrap();

    assert!(matches!(
        ds.next_min_bias_event(),
        Err(DatasetError::MissingHeadFile(12))
    ));
    assert_eq!(ds.current_run(), 11);
    assert_eq!(ds.current(), Some(1));
    assert!(ds.is_loaded());
}

#[test]
fn test_min_bias_stop_policy() {
    let mut config = config();
    config.run_boundary = RunBoundaryPolicy::Stop;
    let mut ds = two_runs(config);
    ds.get_entry(1).unwrap();

    assert!(matches!(
        ds.next_min_bias_event(),
        Err(DatasetError::EndOfRun(10))
    ));
    assert_eq!(ds.current_run(), 10);
    assert_eq!(ds.current(), Some(1));

    ds.get_entry(3).unwrap();
    assert_eq!(ds.previous_min_bias_event().unwrap(), 1);
}

#[test]
fn test_playlist_switches_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("playlist.txt");
    std::fs::write(&path, "10 101\n11 202\n10 103\n").unwrap();

    let mut ds = two_runs(config());
    assert!(matches!(ds.next_in_playlist(), Err(DatasetError::NoPlaylist)));
    assert_eq!(ds.n_in_playlist(), None);
    assert_eq!(ds.set_playlist(&path).unwrap(), 3);
    assert_eq!(ds.n_in_playlist(), Some(3));

    assert_eq!(ds.first_in_playlist().unwrap(), 1);
    assert_eq!(ds.current_run(), 10);

    assert_eq!(ds.next_in_playlist().unwrap(), 2);
    assert_eq!(ds.current_run(), 11);
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 202);

    assert_eq!(ds.next_in_playlist().unwrap(), 3);
    assert_eq!(ds.current_run(), 10);
    // Stays on the last stop
    assert_eq!(ds.next_in_playlist().unwrap(), 3);

    assert_eq!(ds.previous_in_playlist().unwrap(), 2);
    assert_eq!(ds.current_run(), 11);

    ds.set_playlist_entries(vec![PlaylistEntry {
        run: 10,
        event_number: 999,
    }]);
    assert!(matches!(
        ds.first_in_playlist(),
        Err(DatasetError::EventNotFound(999))
    ));
}

#[test]
fn test_decimated() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[1, 2, 3, 4, 5, 6], &[1; 6]);
    store.add_headers(
        &run_file(10, "decimatedHeadFile"),
        HEAD_TREE,
        headers(10, &[2, 5], &[1, 1]),
    );
    let ctx = context(store, config());
    let mut ds =
        Dataset::open(ctx, 10, DataDirectory::Default, true, BlindingStrategy::NONE).unwrap();
    assert!(ds.is_decimated());
    assert_eq!(ds.n(), 2);
    assert_eq!(ds.current(), Some(0));
    assert_eq!(ds.full_entry(), Some(1));

    assert_eq!(ds.get_entry(1).unwrap(), 1);
    assert_eq!(ds.full_entry(), Some(4));
    assert_eq!(ds.header(false).unwrap().unwrap().event_number, 5);
    assert_eq!(ds.raw(false).unwrap().unwrap().event_number, 5);

    assert!(ds.get_event_quiet(3).is_err());
    assert_eq!(ds.get_event(2).unwrap(), 0);
    assert_eq!(ds.full_entry(), Some(1));
}

#[test]
fn test_gps_by_time() {
    let store = Arc::new(MemoryStore::new());
    let mut hdrs = headers(10, &[1, 2, 3], &[1; 3]);
    hdrs[0].trigger_time = 1004;
    hdrs[1].trigger_time = 1012;
    hdrs[1].trigger_time_ns = 600_000_000;
    hdrs[2].trigger_time = 1025;
    store.add_headers(&run_file(10, "headFile"), HEAD_TREE, hdrs);
    store.add_attitudes(
        &run_file(10, "gpsFile"),
        vec![fix(1020, 3.0), fix(1000, 1.0), fix(1010, 2.0)],
    );

    let mut ds = open(context(store, config()), 10);
    assert!(!ds.has_gps_per_event());
    assert_eq!(ds.gps(false).unwrap().unwrap().real_time, 1000);
    ds.next().unwrap();
    assert_eq!(ds.gps(false).unwrap().unwrap().real_time, 1010);
    ds.next().unwrap();
    assert_eq!(ds.gps(false).unwrap().unwrap().real_time, 1020);
    assert_relative_eq!(ds.gps(true).unwrap().unwrap().latitude, 3.0);
}

#[test]
fn test_gps_per_event_preferred() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[1, 2], &[1, 1]);
    store.add_attitudes(&run_file(10, "gpsFile"), vec![fix(0, 0.0)]);
    store.add_attitudes(&run_file(10, "gpsEvent"), vec![fix(5, 1.0), fix(6, 2.0)]);

    let mut ds = open(context(store, config()), 10);
    assert!(ds.has_gps_per_event());
    assert_eq!(ds.gps(false).unwrap().unwrap().real_time, 5);
    ds.next().unwrap();
    assert_eq!(ds.gps(false).unwrap().unwrap().real_time, 6);
}

#[test]
fn test_simulated_truth() {
    let store = Arc::new(MemoryStore::new());
    let hdrs = headers(3, &[1, 2], &[1, 1]);
    store.add_headers(&run_file(3, "SimulatedPueoHeadFile"), HEAD_TREE, hdrs);
    store.add_truth(
        &run_file(3, "SimulatedTruthFile"),
        vec![
            TruthEvent {
                run: 3,
                event_number: 1,
                weight: 0.5,
                ..Default::default()
            },
            TruthEvent {
                run: 3,
                event_number: 2,
                weight: 0.25,
                ..Default::default()
            },
        ],
    );
    let mut ds = open(context(store, config()), 3);
    assert!(ds.is_simulated());
    assert_relative_eq!(ds.truth(false).unwrap().unwrap().weight, 0.5);
    ds.next().unwrap();
    assert_eq!(ds.truth(false).unwrap().unwrap().event_number, 2);
}

#[test]
fn test_truth_ignored_for_real_data() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[1], &[1]);
    store.add_truth(&run_file(10, "SimulatedTruthFile"), vec![TruthEvent::default()]);
    let mut ds = open(context(store, config()), 10);
    assert!(!ds.is_simulated());
    assert!(ds.truth(false).unwrap().is_none());
}

#[test]
fn test_failed_load_is_unloaded() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[1, 2], &[1, 1]);
    let ctx = context(store, config());
    let mut ds = Dataset::new(ctx.clone(), 42, DataDirectory::Default, false, BlindingStrategy::NONE);
    assert!(!ds.is_loaded());
    assert_eq!(ds.current(), None);
    assert!(ds.header(false).unwrap().is_none());
    assert!(ds.get_entry(0).is_err());

    let mut no_data = ctx.clone();
    no_data.config.root_data = None;
    assert!(matches!(
        Dataset::open(no_data, 10, DataDirectory::Default, false, BlindingStrategy::NONE),
        Err(DatasetError::NoDataDirectory)
    ));

    ds.load_run(10, DataDirectory::Default, false).unwrap();
    assert_eq!(ds.current(), Some(0));
    ds.unload_run();
    assert!(!ds.is_loaded());
    assert!(ds.raw(false).unwrap().is_none());
}

#[test]
fn test_randomized_polarity() {
    let store = Arc::new(MemoryStore::new());
    let events: Vec<u64> = (1..=20).collect();
    add_run(&store, 10, &events, &[1; 20]);
    let ctx = context(store, config());
    let mut ds = Dataset::open(
        ctx,
        10,
        DataDirectory::Default,
        false,
        BlindingStrategy::RANDOMIZE_POLARITY,
    )
    .unwrap();

    for ev in events {
        ds.get_event(ev).unwrap();
        let expected = if maybe_invert_polarity(ds.strategy(), ev) {
            -(ev as i16)
        } else {
            ev as i16
        };
        assert_eq!(ds.useful(false).unwrap().unwrap().raw.data[[0, 0]], expected);
        // Reading again does not flip it back
        assert_eq!(ds.useful(false).unwrap().unwrap().raw.data[[0, 0]], expected);
    }
}

/// Swaps event 2 for a fake VPol event
struct OneFake;

impl BlindSource for OneFake {
    fn replacement(&self, pol: Pol, event_number: u64) -> Option<usize> {
        (pol == Pol::Vertical && event_number == 2).then_some(0)
    }

    fn fake_header(&mut self, _pol: Pol, _entry: usize) -> Option<RawHeader> {
        Some(RawHeader {
            trig_type: 64,
            event_number: 12345,
            ..Default::default()
        })
    }

    fn fake_event(&mut self, _pol: Pol, _entry: usize) -> Option<UsefulEvent> {
        let mut event = UsefulEvent::default();
        event.volts.fill(1.0);
        Some(event)
    }
}

#[test]
fn test_inserted_events() {
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[1, 2, 3], &[1; 3]);
    let ctx = context(store, config());
    let mut ds = open(ctx, 10);
    ds.set_blind_source(Box::new(OneFake));
    ds.get_event(2).unwrap();
    // Not part of the strategy yet
    assert_eq!(ds.header(false).unwrap().unwrap().trig_type, 1);

    ds.set_strategy(BlindingStrategy::INSERTED_VPOL_EVENTS);
    let header = ds.header(false).unwrap().unwrap();
    assert_eq!(header.trig_type, 64);
    assert_eq!(header.event_number, 2);
    assert_eq!(header.run, 10);
    let useful = ds.useful(false).unwrap().unwrap();
    assert_eq!(useful.event_number(), 2);
    assert_relative_eq!(useful.volts[[5, 0]], 1.0);

    ds.get_event(3).unwrap();
    assert_eq!(ds.header(false).unwrap().unwrap().trig_type, 1);

    ds.set_strategy(BlindingStrategy::INSERTED_HPOL_EVENTS);
    ds.get_event(2).unwrap();
    assert_eq!(ds.header(false).unwrap().unwrap().trig_type, 1);
}

#[test]
fn test_run_at_time_and_hical() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    add_run(&store, 10, &[1, 2, 3], &[1; 3]);
    add_run(&store, 11, &[4, 5], &[1; 2]);
    store.add_hical(
        &dir.path()
            .join("share/pueoCalib/H1b_GPS_time_interp.root"),
        vec![HiCalFix {
            unix_time: (START_TIME + 10_001) as i32,
            longitude: 150.0,
            latitude: -80.0,
            altitude: 10_000.0,
        }],
    );
    let mut config = config();
    config.local_calib_dir = dir.path().join("calib");
    config.util_install_dir = Some(dir.path().to_path_buf());
    let mut ds = open(context(store, config), 10);

    let t = START_TIME as f64;
    assert_eq!(ds.run_at_time(t + 10_001.0), Some(10));
    assert_eq!(ds.run_at_time(t + 10_500.0), Some(11));
    assert_eq!(ds.run_at_time(t + 11_001.5), Some(11));
    assert_eq!(ds.run_at_time(t), None);
    assert_eq!(ds.run_at_time(t + 20_000.0), None);
    assert_eq!(ds.context().run_times.builds(), 1);
    assert!(dir.path().join("calib/timerunmap_1.txt").is_file());

    assert!(ds.hical_now('A').is_none());
    ds.next().unwrap();
    let position = ds.hical_now('A').unwrap();
    assert_relative_eq!(position.altitude, 3048.0, epsilon = 1e-9);
    assert_eq!(ds.hical('B', START_TIME + 10_001), Some(position));
    assert!(ds.hical('A', START_TIME).is_none());

    let geom = ds.context().geometry.get(0, FLIGHT_GEOMETRY).unwrap();
    assert_eq!(geom.source(), FLIGHT_GEOMETRY);
}
