// The channel map is one table with four equivalent ways in. Every row is a ChannelEntry,
// and each addressing scheme gets its own hash index pointing back into the row list:
// (surf, chan)       -> row
// (ring, phi, pol)   -> row
// (antenna, pol)     -> row
// global channel     -> row
// A table that would make any of these ambiguous is rejected at load time, so the four
// schemes stay in 1:1 correspondence.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use fxhash::FxHashMap;

use super::constants::*;
use super::conventions::{Pol, Ring};
use super::error::ChannelMapError;
use super::hardware_id::{antenna_pol_key, ring_phi_pol_key, surf_key, AntennaGeometry, ChannelEntry};

/// Load a geometry table that is bundled with the library, by name
#[cfg(target_family = "windows")]
pub fn load_bundled_table(name: &str) -> Option<&'static str> {
    match name {
        DEFAULT_GEOMETRY => Some(include_str!("data\\geometry_dec23.csv")),
        FLIGHT_GEOMETRY => Some(include_str!("data\\geometry_flight.csv")),
        _ => None,
    }
}

/// Load a geometry table that is bundled with the library, by name
#[cfg(target_family = "unix")]
pub fn load_bundled_table(name: &str) -> Option<&'static str> {
    match name {
        DEFAULT_GEOMETRY => Some(include_str!("data/geometry_dec23.csv")),
        FLIGHT_GEOMETRY => Some(include_str!("data/geometry_flight.csv")),
        _ => None,
    }
}

/// ChannelMap contains the mapping between the digitizer addressing (surf, channel), the
/// geometric addressing (ring, phi sector, polarization), the logical addressing (antenna,
/// polarization) and the global channel index.
///
/// The wiring changes between hardware configurations, so ChannelMap reads a CSV file where each
/// row contains 11 elements: `surf,chan,ring,phi,pol,ant,global,x,y,z,phase_phi`. The first line
/// is a header and is skipped.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    name: String,
    entries: Vec<ChannelEntry>,
    by_surf: FxHashMap<u64, usize>,
    by_ring_phi_pol: FxHashMap<u64, usize>,
    by_antenna_pol: FxHashMap<u64, usize>,
    by_global: FxHashMap<usize, usize>,
}

impl ChannelMap {
    /// Create a new ChannelMap from a CSV file on disk
    pub fn from_file(path: &Path) -> Result<Self, ChannelMapError> {
        let mut contents = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
        Self::from_csv(&path.to_string_lossy(), &contents)
    }

    /// Create a new ChannelMap from CSV text
    pub fn from_csv(name: &str, contents: &str) -> Result<Self, ChannelMapError> {
        let mut map = ChannelMap {
            name: name.to_string(),
            ..Default::default()
        };

        let mut lines = contents.lines().enumerate();
        lines.next(); // Skip the header
        for (line_number, line) in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entries: Vec<&str> = line.split_terminator(',').map(str::trim).collect();
            if entries.len() != GEOMETRY_COLUMNS {
                return Err(ChannelMapError::BadFileFormat(entries.len()));
            }

            let surf: usize = entries[0].parse()?;
            let surf_channel: usize = entries[1].parse()?;
            if surf >= NUM_SURF_SLOTS || surf_channel >= NUM_CHANS_PER_SURF {
                return Err(ChannelMapError::BadSurfChannel(surf as i32, surf_channel as i32));
            }
            let entry = ChannelEntry {
                surf,
                surf_channel,
                ring: entries[2].parse::<Ring>()?,
                phi_sector: entries[3].parse()?,
                pol: entries[4].parse::<Pol>()?,
                antenna: entries[5].parse()?,
                global_channel: entries[6].parse()?,
                geometry: AntennaGeometry {
                    face_center: [entries[7].parse()?, entries[8].parse()?, entries[9].parse()?],
                    phase_phi: entries[10].parse()?,
                },
            };
            map.insert(entry, line_number + 1)?;
        }

        log::debug!("Loaded channel map {} with {} channels", map.name, map.len());
        Ok(map)
    }

    fn insert(&mut self, entry: ChannelEntry, line_number: usize) -> Result<(), ChannelMapError> {
        let row = self.entries.len();
        if self
            .by_surf
            .insert(surf_key(entry.surf, entry.surf_channel), row)
            .is_some()
        {
            return Err(ChannelMapError::DuplicateKey("surf/channel", line_number));
        }
        if self
            .by_ring_phi_pol
            .insert(ring_phi_pol_key(entry.ring, entry.phi_sector, entry.pol), row)
            .is_some()
        {
            return Err(ChannelMapError::DuplicateKey("ring/phi/pol", line_number));
        }
        if self
            .by_antenna_pol
            .insert(antenna_pol_key(entry.antenna, entry.pol), row)
            .is_some()
        {
            return Err(ChannelMapError::DuplicateKey("antenna/pol", line_number));
        }
        if self.by_global.insert(entry.global_channel, row).is_some() {
            return Err(ChannelMapError::DuplicateKey("global channel", line_number));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    /// Get the ChannelEntry for a digitizer address.
    ///
    /// If returns None the address does not exist in the map
    pub fn lookup_by_surf_channel(&self, surf: usize, chan: usize) -> Option<&ChannelEntry> {
        if surf >= NUM_SURF_SLOTS || chan >= NUM_CHANS_PER_SURF {
            return None;
        }
        self.by_surf
            .get(&surf_key(surf, chan))
            .map(|row| &self.entries[*row])
    }

    /// Get the ChannelEntry for a geometric address.
    ///
    /// If returns None the address does not exist in the map
    pub fn lookup_by_ring_phi_pol(&self, ring: Ring, phi: usize, pol: Pol) -> Option<&ChannelEntry> {
        if phi >= NUM_PHI {
            return None;
        }
        self.by_ring_phi_pol
            .get(&ring_phi_pol_key(ring, phi, pol))
            .map(|row| &self.entries[*row])
    }

    /// Get the ChannelEntry for a logical address.
    ///
    /// If returns None the address does not exist in the map
    pub fn lookup_by_antenna_pol(&self, antenna: usize, pol: Pol) -> Option<&ChannelEntry> {
        self.by_antenna_pol
            .get(&antenna_pol_key(antenna, pol))
            .map(|row| &self.entries[*row])
    }

    /// Get the ChannelEntry for a global channel index.
    ///
    /// If returns None the index does not exist in the map
    pub fn lookup_by_global_index(&self, index: usize) -> Option<&ChannelEntry> {
        self.by_global.get(&index).map(|row| &self.entries[*row])
    }
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    fn default_map() -> ChannelMap {
        let table = match load_bundled_table(DEFAULT_GEOMETRY) {
            Some(t) => t,
            None => panic!(),
        };
        match ChannelMap::from_csv(DEFAULT_GEOMETRY, table) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn test_default_map() {
        let map = default_map();
        assert_eq!(map.len(), NUM_RF_CHANNELS);
        let entry = match map.lookup_by_ring_phi_pol(Ring::Top, 10, Pol::Vertical) {
            Some(e) => e,
            None => panic!(),
        };
        assert_eq!(entry.antenna, 10);
        assert_eq!(entry.global_channel, 21);
        assert_eq!((entry.surf, entry.surf_channel), (2, 5));
    }

    #[test]
    fn test_addressing_round_trips() {
        let map = default_map();
        for surf in 0..NUM_SURF_SLOTS {
            for chan in 0..NUM_CHANS_PER_SURF {
                if let Some(entry) = map.lookup_by_surf_channel(surf, chan) {
                    let by_geom = map
                        .lookup_by_ring_phi_pol(entry.ring, entry.phi_sector, entry.pol)
                        .unwrap();
                    assert_eq!(by_geom, entry);
                    let by_ant = map.lookup_by_antenna_pol(entry.antenna, entry.pol).unwrap();
                    assert_eq!(by_ant, entry);
                }
            }
        }
        for ring in Ring::ALL {
            for phi in 0..NUM_PHI {
                for pol in Pol::ALL {
                    if let Some(entry) = map.lookup_by_ring_phi_pol(ring, phi, pol) {
                        assert_eq!(map.lookup_by_global_index(entry.global_channel), Some(entry));
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_addresses() {
        let map = default_map();
        // Surfs 26 and 27 are not populated in the default wiring
        assert!(map.lookup_by_surf_channel(27, 0).is_none());
        assert!(map.lookup_by_surf_channel(0, NUM_CHANS_PER_SURF).is_none());
        assert!(map.lookup_by_ring_phi_pol(Ring::Top, NUM_PHI, Pol::Horizontal).is_none());
        assert!(map.lookup_by_ring_phi_pol(Ring::LFTop, 1, Pol::Horizontal).is_none());
        assert!(map.lookup_by_antenna_pol(NUM_ANTS, Pol::Vertical).is_none());
        assert!(map.lookup_by_global_index(NUM_DIGITIZED_CHANNELS).is_none());
    }

    #[test]
    fn test_rejects_bad_tables() {
        let header = "surf,chan,ring,phi,pol,ant,global,x,y,z,phase_phi\n";
        let short = format!("{header}0,0,1,0,H,0,0\n");
        assert!(matches!(
            ChannelMap::from_csv("short", &short),
            Err(ChannelMapError::BadFileFormat(7))
        ));

        let duplicate = format!(
            "{header}0,0,1,0,H,0,0,1,0,0,0.1\n0,1,1,0,H,1,1,1,0,0,0.1\n"
        );
        assert!(matches!(
            ChannelMap::from_csv("duplicate", &duplicate),
            Err(ChannelMapError::DuplicateKey("ring/phi/pol", 3))
        ));

        let bad_pol = format!("{header}0,0,1,0,X,0,0,1,0,0,0.1\n");
        assert!(matches!(
            ChannelMap::from_csv("bad_pol", &bad_pol),
            Err(ChannelMapError::BadConvention(_))
        ));
    }
}
