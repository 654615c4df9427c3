//! Open a run, move to an entry and summarize the top ring phi 10 VPol waveform.
//!
//! Assumes PUEO_ROOT_DATA points at a directory of run<N> directories.
//!
//! `cargo run --features hdf5 --example dataset_example -- <run> <entry>`
use libpueo_event::blinding::BlindingStrategy;
use libpueo_event::context::Context;
use libpueo_event::conventions::{Pol, Ring};
use libpueo_event::dataset::Dataset;
use libpueo_event::version::DataDirectory;

fn main() {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("Could not create logging!");

    let mut args = std::env::args().skip(1);
    let run: i32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(813);
    let entry: i64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(10);

    let ctx = Context::from_env();
    let mut dataset = match Dataset::open(
        ctx.clone(),
        run,
        DataDirectory::Default,
        false,
        BlindingStrategy::NONE,
    ) {
        Ok(d) => d,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Err(e) = dataset.get_entry(entry) {
        log::error!("{e}");
        return;
    }

    let geom = match ctx.geometry.get(0, "") {
        Ok(g) => g,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    let Some(chan) = geom.chan_index_from_ring_phi_pol(Ring::Top, 10, Pol::Vertical) else {
        log::error!("No channel for the top ring, phi 10, VPol");
        return;
    };

    match dataset.useful(false) {
        Ok(Some(event)) => match event.waveform(chan, &geom) {
            Some(wf) => {
                let peak = wf.v.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
                log::info!(
                    "Run {run}, Entry {entry}, event {}: {} has {} samples over {:.1} ns, peak {:.2} mV",
                    event.event_number(),
                    wf.title,
                    wf.v.len(),
                    wf.t.last().copied().unwrap_or(0.0),
                    peak
                );
            }
            None => log::error!("Channel {chan} has no waveform"),
        },
        Ok(None) => log::error!("Run {run} has no event file"),
        Err(e) => log::error!("{e}"),
    }
}
