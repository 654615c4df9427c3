use ndarray::{s, Array1, Array2, ArrayView1};

use super::Record;
use crate::constants::*;
use crate::conventions::{Pol, Ring};
use crate::geom_tool::GeomTool;

/// The raw digitizer samples for every digitized channel, indexed by flight wiring global index
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub event_number: u64,
    pub run_number: i32,
    /// (NUM_DIGITIZED_CHANNELS, samples)
    pub data: Array2<i16>,
}

impl Default for RawEvent {
    fn default() -> Self {
        Self::new(0, 0, MAX_NUMBER_SAMPLES)
    }
}

impl RawEvent {
    /// An empty event with all samples zeroed
    pub fn new(run_number: i32, event_number: u64, samples: usize) -> Self {
        Self {
            event_number,
            run_number,
            data: Array2::zeros((NUM_DIGITIZED_CHANNELS, samples)),
        }
    }

    pub fn samples(&self) -> usize {
        self.data.ncols()
    }

    /// Flip the sign of every sample
    pub fn invert(&mut self) {
        self.data.mapv_inplace(|v| v.saturating_neg());
    }
}

impl Record for RawEvent {
    fn field(&self, name: &str) -> Option<f64> {
        match name {
            "eventNumber" => Some(self.event_number as f64),
            "runNumber" | "run" => Some(self.run_number as f64),
            _ => None,
        }
    }
}

/// A calibrated waveform of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// ant<N><P>, e.g. `ant12V`
    pub name: String,
    pub title: String,
    /// ns
    pub t: Array1<f64>,
    /// mV
    pub v: Array1<f64>,
}

/// The calibrated view of a RawEvent. Channels are re-ordered into the default geometry's
/// numbering and converted to mV.
#[derive(Debug, Clone, PartialEq)]
pub struct UsefulEvent {
    pub raw: RawEvent,
    /// (NUM_RF_CHANNELS, samples), mV
    pub volts: Array2<f64>,
    /// ns
    pub t0: Array1<f64>,
    /// ns
    pub dt: Array1<f64>,
}

impl Default for UsefulEvent {
    fn default() -> Self {
        Self::from_raw_unmapped(RawEvent::default())
    }
}

impl UsefulEvent {
    /// Calibrate a raw event. `geom` defines the channel numbering of the calibrated view and
    /// `flight_geom` is the wiring the raw event was read out with.
    pub fn new(raw: RawEvent, geom: &GeomTool, flight_geom: &GeomTool) -> Self {
        let samples = raw.samples();
        let mut volts = Array2::<f64>::zeros((NUM_RF_CHANNELS, samples));
        for ichan in 0..NUM_RF_CHANNELS {
            let flight_chan = geom
                .ant_pol_from_chan_index(ichan)
                .and_then(|(ant, pol)| flight_geom.chan_index_from_ant_pol(ant, pol));
            match flight_chan {
                Some(fc) if fc < raw.data.nrows() => {
                    let adc = raw.data.row(fc);
                    volts
                        .row_mut(ichan)
                        .iter_mut()
                        .zip(adc.iter())
                        .for_each(|(v, a)| *v = *a as f64 * ADC_TO_MV);
                }
                _ => log::debug!("Channel {ichan} has no flight wiring, leaving it empty"),
            }
        }
        Self {
            raw,
            volts,
            t0: Array1::zeros(NUM_RF_CHANNELS),
            dt: Array1::from_elem(NUM_RF_CHANNELS, SAMPLE_DT_NS),
        }
    }

    /// Straight copy of the first NUM_RF_CHANNELS digitizer rows, used when no geometry is at hand
    fn from_raw_unmapped(raw: RawEvent) -> Self {
        let rows = raw.data.nrows().min(NUM_RF_CHANNELS);
        let mut volts = Array2::<f64>::zeros((NUM_RF_CHANNELS, raw.samples()));
        volts
            .slice_mut(s![..rows, ..])
            .assign(&raw.data.slice(s![..rows, ..]).mapv(|a| a as f64 * ADC_TO_MV));
        Self {
            raw,
            volts,
            t0: Array1::zeros(NUM_RF_CHANNELS),
            dt: Array1::from_elem(NUM_RF_CHANNELS, SAMPLE_DT_NS),
        }
    }

    pub fn event_number(&self) -> u64 {
        self.raw.event_number
    }

    pub fn samples(&self) -> usize {
        self.volts.ncols()
    }

    /// Time of sample i of a channel, ns
    pub fn t(&self, chan: usize, i: usize) -> f64 {
        self.t0[chan] + i as f64 * self.dt[chan]
    }

    pub fn channel(&self, chan: usize) -> Option<ArrayView1<'_, f64>> {
        (chan < self.volts.nrows()).then(|| self.volts.row(chan))
    }

    /// Flip the sign of the calibrated and raw samples
    pub fn invert(&mut self) {
        self.volts.mapv_inplace(|v| -v);
        self.raw.invert();
    }

    /// The waveform of a channel, named after the antenna it belongs to in `geom`
    pub fn waveform(&self, chan: usize, geom: &GeomTool) -> Option<Waveform> {
        let v = self.channel(chan)?.to_owned();
        let t = Array1::from_iter((0..v.len()).map(|i| self.t(chan, i)));
        let (ant, pol) = geom.ant_pol_from_chan_index(chan)?;
        Some(Waveform {
            name: format!("ant{}{}", ant, pol.as_char()),
            title: format!("Antenna {}{}", ant, pol.as_char()),
            t,
            v,
        })
    }

    pub fn waveform_by_ant_pol(&self, ant: usize, pol: Pol, geom: &GeomTool) -> Option<Waveform> {
        self.waveform(geom.chan_index_from_ant_pol(ant, pol)?, geom)
    }

    pub fn waveform_by_ring_phi_pol(
        &self,
        ring: Ring,
        phi: usize,
        pol: Pol,
        geom: &GeomTool,
    ) -> Option<Waveform> {
        self.waveform(geom.chan_index_from_ring_phi_pol(ring, phi, pol)?, geom)
    }

    pub fn waveform_by_surf_chan(&self, surf: usize, chan: usize, geom: &GeomTool) -> Option<Waveform> {
        self.waveform(geom.chan_index(surf, chan)?, geom)
    }
}

impl Record for UsefulEvent {
    fn field(&self, name: &str) -> Option<f64> {
        self.raw.field(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::{load_bundled_table, ChannelMap};
    use approx::assert_relative_eq;

    fn tool(name: &str) -> GeomTool {
        let map = ChannelMap::from_csv(name, load_bundled_table(name).unwrap()).unwrap();
        GeomTool::new(1, name, map)
    }

    #[test]
    fn test_calibration_uses_flight_wiring() {
        let geom = tool(DEFAULT_GEOMETRY);
        let flight = tool(FLIGHT_GEOMETRY);

        let mut raw = RawEvent::new(1, 7, 16);
        // Antenna 30 V sits on surf 6 chan 3 in the flight wiring
        let flight_chan = flight.chan_index_from_ant_pol(30, Pol::Vertical).unwrap();
        raw.data.row_mut(flight_chan).fill(2048);

        let useful = UsefulEvent::new(raw, &geom, &flight);
        let chan = geom.chan_index_from_ant_pol(30, Pol::Vertical).unwrap();
        assert_relative_eq!(useful.volts[[chan, 3]], 500.0);
        assert_relative_eq!(useful.volts.sum(), 500.0 * 16.0);
        assert_relative_eq!(useful.t(chan, 3), 1.0, epsilon = 1e-12);

        let wf = useful.waveform_by_ant_pol(30, Pol::Vertical, &geom).unwrap();
        assert_eq!(wf.name, "ant30V");
        assert_eq!(wf.v.len(), 16);
        assert_relative_eq!(wf.t[15], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invert() {
        let geom = tool(DEFAULT_GEOMETRY);
        let mut raw = RawEvent::new(1, 7, 4);
        raw.data[[0, 0]] = 100;
        let mut useful = UsefulEvent::new(raw, &geom, &geom);
        useful.invert();
        assert_eq!(useful.raw.data[[0, 0]], -100);
        assert_relative_eq!(useful.volts[[0, 0]], -100.0 * ADC_TO_MV);
    }

    #[test]
    fn test_missing_channels() {
        let geom = tool(DEFAULT_GEOMETRY);
        let useful = UsefulEvent::new(RawEvent::new(1, 7, 4), &geom, &geom);
        assert!(useful.waveform(NUM_RF_CHANNELS, &geom).is_none());
        assert!(useful
            .waveform_by_surf_chan(NUM_SURF_SLOTS - 1, 0, &geom)
            .is_none());
    }
}
