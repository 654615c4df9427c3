use super::conventions::{Pol, Ring};

/// Position of an antenna on the payload, in payload coordinates (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AntennaGeometry {
    pub face_center: [f64; 3],
    /// Azimuth of the phase centre, in radians
    pub phase_phi: f64,
}

impl AntennaGeometry {
    pub fn r(&self) -> f64 {
        self.face_center[0].hypot(self.face_center[1])
    }
}

/// ChannelEntry is the full address of one digitized channel in every numbering scheme we use.
///
/// Digitizer: (surf, surf_channel). Geometric: (ring, phi_sector, pol). Logical: (antenna, pol).
/// Linear: global_channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    pub surf: usize,
    pub surf_channel: usize,
    pub ring: Ring,
    pub phi_sector: usize,
    pub pol: Pol,
    pub antenna: usize,
    pub global_channel: usize,
    pub geometry: AntennaGeometry,
}

/// Generate a unique id for a digitizer address
pub fn surf_key(surf: usize, chan: usize) -> u64 {
    (chan as u64) + (surf as u64) * 100
}

/// Generate a unique id for a geometric address
pub fn ring_phi_pol_key(ring: Ring, phi: usize, pol: Pol) -> u64 {
    (pol.index() as u64) + (phi as u64) * 10 + (ring.index() as u64) * 10_000
}

/// Generate a unique id for a logical address
pub fn antenna_pol_key(antenna: usize, pol: Pol) -> u64 {
    (pol.index() as u64) + (antenna as u64) * 10
}
