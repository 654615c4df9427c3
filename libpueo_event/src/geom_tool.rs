use std::f64::consts::{PI, TAU};

use super::channel_map::ChannelMap;
use super::constants::*;
use super::conventions::{Pol, Ring};
use super::hardware_id::ChannelEntry;

/// Signed difference between two azimuths in radians, folded into (-pi, pi]
pub fn phi_diff(first_phi: f64, second_phi: f64) -> f64 {
    let mut diff = first_phi - second_phi;
    if diff.abs() > (diff + TAU).abs() {
        diff += TAU;
    }
    if diff.abs() > (diff - TAU).abs() {
        diff -= TAU;
    }
    diff
}

/// GeomTool answers geometry questions about the payload for one loaded channel map.
///
/// Every accessor is a lookup into the map followed by a projection, so anything that is not
/// in the map comes back as None. Instances are shared read-only through the GeomRegistry.
#[derive(Debug)]
pub struct GeomTool {
    version: i32,
    source: String,
    map: ChannelMap,
    aft_fore_offset: f64,
}

impl GeomTool {
    pub fn new(version: i32, source: &str, map: ChannelMap) -> Self {
        Self {
            version,
            source: source.to_string(),
            map,
            aft_fore_offset: AFT_FORE_OFFSET_DEG.to_radians(),
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.map
    }

    pub fn lookup_by_surf_channel(&self, surf: usize, chan: usize) -> Option<&ChannelEntry> {
        self.map.lookup_by_surf_channel(surf, chan)
    }

    pub fn lookup_by_ring_phi_pol(&self, ring: Ring, phi: usize, pol: Pol) -> Option<&ChannelEntry> {
        self.map.lookup_by_ring_phi_pol(ring, phi, pol)
    }

    pub fn lookup_by_antenna_pol(&self, ant: usize, pol: Pol) -> Option<&ChannelEntry> {
        self.map.lookup_by_antenna_pol(ant, pol)
    }

    pub fn lookup_by_global_index(&self, index: usize) -> Option<&ChannelEntry> {
        self.map.lookup_by_global_index(index)
    }

    // Channel index accessors

    pub fn chan_index(&self, surf: usize, chan: usize) -> Option<usize> {
        self.lookup_by_surf_channel(surf, chan).map(|ch| ch.global_channel)
    }

    pub fn chan_index_from_ring_phi_pol(&self, ring: Ring, phi: usize, pol: Pol) -> Option<usize> {
        self.lookup_by_ring_phi_pol(ring, phi, pol)
            .map(|ch| ch.global_channel)
    }

    pub fn chan_index_from_ant_pol(&self, ant: usize, pol: Pol) -> Option<usize> {
        self.lookup_by_antenna_pol(ant, pol).map(|ch| ch.global_channel)
    }

    // Digitizer address accessors

    /// Returns (phi, ring, pol)
    pub fn phi_ring_pol_from_surf_chan(&self, surf: usize, chan: usize) -> Option<(usize, Ring, Pol)> {
        self.lookup_by_surf_channel(surf, chan)
            .map(|ch| (ch.phi_sector, ch.ring, ch.pol))
    }

    /// Returns (ring, ant, pol, phi)
    pub fn ring_ant_pol_phi_from_surf_chan(
        &self,
        surf: usize,
        chan: usize,
    ) -> Option<(Ring, usize, Pol, usize)> {
        self.lookup_by_surf_channel(surf, chan)
            .map(|ch| (ch.ring, ch.antenna, ch.pol, ch.phi_sector))
    }

    /// Returns (surf, chan, ant)
    pub fn surf_chan_ant_from_ring_phi_pol(
        &self,
        ring: Ring,
        phi: usize,
        pol: Pol,
    ) -> Option<(usize, usize, usize)> {
        self.lookup_by_ring_phi_pol(ring, phi, pol)
            .map(|ch| (ch.surf, ch.surf_channel, ch.antenna))
    }

    pub fn surf_chan_from_ant_pol(&self, ant: usize, pol: Pol) -> Option<(usize, usize)> {
        self.lookup_by_antenna_pol(ant, pol)
            .map(|ch| (ch.surf, ch.surf_channel))
    }

    pub fn surf_from_ant_pol(&self, ant: usize, pol: Pol) -> Option<usize> {
        self.surf_chan_from_ant_pol(ant, pol).map(|(surf, _)| surf)
    }

    pub fn surf_chan_from_chan_index(&self, index: usize) -> Option<(usize, usize)> {
        self.lookup_by_global_index(index)
            .map(|ch| (ch.surf, ch.surf_channel))
    }

    // Antenna accessors

    pub fn ant_pol_from_chan_index(&self, index: usize) -> Option<(usize, Pol)> {
        self.lookup_by_global_index(index).map(|ch| (ch.antenna, ch.pol))
    }

    pub fn ant_pol_from_surf_chan(&self, surf: usize, chan: usize) -> Option<(usize, Pol)> {
        self.lookup_by_surf_channel(surf, chan)
            .map(|ch| (ch.antenna, ch.pol))
    }

    pub fn phi_sector(&self, index: usize) -> Option<usize> {
        self.lookup_by_global_index(index).map(|ch| ch.phi_sector)
    }

    pub fn ring_from_ant(&self, ant: usize) -> Option<Ring> {
        self.lookup_by_antenna_pol(ant, Pol::Horizontal).map(|ch| ch.ring)
    }

    pub fn ring_from_chan_index(&self, index: usize) -> Option<Ring> {
        self.ant_pol_from_chan_index(index)
            .and_then(|(ant, _)| self.ring_from_ant(ant))
    }

    pub fn phi_from_ant(&self, ant: usize) -> Option<usize> {
        self.lookup_by_antenna_pol(ant, Pol::Horizontal)
            .map(|ch| ch.phi_sector)
    }

    pub fn ant_from_phi_ring(&self, phi: usize, ring: Ring) -> Option<usize> {
        self.lookup_by_ring_phi_pol(ring, phi, Pol::Horizontal)
            .map(|ch| ch.antenna)
    }

    // Antenna positions

    pub fn ant_xyz(&self, ant: usize, pol: Pol) -> Option<[f64; 3]> {
        self.lookup_by_antenna_pol(ant, pol)
            .map(|ch| ch.geometry.face_center)
    }

    pub fn ant_z(&self, ant: usize, pol: Pol) -> Option<f64> {
        self.ant_xyz(ant, pol).map(|p| p[2])
    }

    pub fn ant_r(&self, ant: usize, pol: Pol) -> Option<f64> {
        self.lookup_by_antenna_pol(ant, pol).map(|ch| ch.geometry.r())
    }

    /// Azimuth of the antenna phase centre in payload coordinates, radians
    pub fn ant_phi_position(&self, ant: usize, pol: Pol) -> Option<f64> {
        self.lookup_by_antenna_pol(ant, pol)
            .map(|ch| ch.geometry.phase_phi)
    }

    /// Azimuth of the antenna phase centre measured from the aft-fore axis, in [0, 2pi]
    pub fn ant_phi_position_rel_to_aft_fore(&self, ant: usize, pol: Pol) -> Option<f64> {
        let mut phi = self.ant_phi_position(ant, pol)? - self.aft_fore_offset;
        while phi < 0.0 {
            phi += TAU;
        }
        while phi > TAU {
            phi -= TAU;
        }
        Some(phi)
    }

    /// The top ring antenna whose phase centre is closest to the azimuth of an incoming wave.
    /// `phi_wave` is measured from the aft-fore axis, in radians.
    pub fn top_ant_nearest_phi_wave(&self, phi_wave: f64, pol: Pol) -> Option<usize> {
        let mut phi_wave = phi_wave;
        if phi_wave < 0.0 {
            phi_wave += TAU;
        }
        if phi_wave > TAU {
            phi_wave -= TAU;
        }

        let mut best: Option<(usize, f64)> = None;
        for phi in 0..NUM_PHI {
            let Some(ant) = self.ant_from_phi_ring(phi, Ring::Top) else {
                continue;
            };
            let Some(ant_phi) = self.ant_phi_position_rel_to_aft_fore(ant, pol) else {
                continue;
            };
            // Consider the wrapped images too so 359 degrees is next to 1 degree
            let diff = [ant_phi, ant_phi - TAU, ant_phi + TAU]
                .iter()
                .map(|p| (p - phi_wave).abs())
                .fold(f64::INFINITY, f64::min);
            if best.map_or(true, |(_, min)| diff < min) {
                best = Some((ant, diff));
            }
        }
        best.map(|(ant, _)| ant)
    }

    /// Compass direction (degrees, clockwise from north) that a phi sector points in for a
    /// given payload heading. Returns None for a phi sector outside the payload.
    pub fn direction_wrt_north(&self, phi_sector: i32, heading: f64) -> Option<f64> {
        if phi_sector < 0 || phi_sector as usize >= NUM_PHI {
            return None;
        }
        // Heading increases clockwise but phi sectors increase anticlockwise
        let direction = heading + self.aft_fore_offset.to_degrees()
            - (phi_sector as f64) * 360.0 / (NUM_PHI as f64);
        // rem_euclid rounds a tiny negative input up to exactly 360
        let direction = direction.rem_euclid(360.0);
        Some(if direction >= 360.0 { 0.0 } else { direction })
    }

    /// See [phi_diff]
    pub fn phi_diff(&self, first_phi: f64, second_phi: f64) -> f64 {
        phi_diff(first_phi, second_phi)
    }

    /// Width of one phi sector, radians
    pub fn phi_sector_width() -> f64 {
        2.0 * PI / NUM_PHI as f64
    }
}
