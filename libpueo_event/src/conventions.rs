//! Naming conventions shared by the geometry tables and the data records: antenna rings,
//! polarizations, trigger type bits, and a handful of well known ground locations.
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::error::ConventionError;

/// Antenna rings, numbered as in the geometry tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ring {
    Unknown = 0,
    Top = 1,
    UpperMiddle = 2,
    LowerMiddle = 3,
    Bottom = 4,
    LFTop = 5,
    LFUpperMiddle = 6,
    LFLowerMiddle = 7,
    LFBottom = 8,
}

impl Ring {
    pub const ALL: [Ring; 8] = [
        Ring::Top,
        Ring::UpperMiddle,
        Ring::LowerMiddle,
        Ring::Bottom,
        Ring::LFTop,
        Ring::LFUpperMiddle,
        Ring::LFLowerMiddle,
        Ring::LFBottom,
    ];

    /// Anything outside of 1-8 is `Unknown`
    pub fn from_index(idx: i32) -> Self {
        match idx {
            1 => Ring::Top,
            2 => Ring::UpperMiddle,
            3 => Ring::LowerMiddle,
            4 => Ring::Bottom,
            5 => Ring::LFTop,
            6 => Ring::LFUpperMiddle,
            7 => Ring::LFLowerMiddle,
            8 => Ring::LFBottom,
            _ => Ring::Unknown,
        }
    }

    pub fn index(&self) -> i32 {
        *self as i32
    }

    pub fn is_lf(&self) -> bool {
        matches!(
            self,
            Ring::LFTop | Ring::LFUpperMiddle | Ring::LFLowerMiddle | Ring::LFBottom
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ring::Top => "Top",
            Ring::UpperMiddle => "Upper Middle",
            Ring::LowerMiddle => "Lower Middle",
            Ring::Bottom => "Bottom",
            Ring::LFTop => "LF Top",
            Ring::LFUpperMiddle => "LF Upper Middle",
            Ring::LFLowerMiddle => "LF Lower Middle",
            Ring::LFBottom => "LF Bottom",
            Ring::Unknown => "Unknown",
        }
    }
}

impl Display for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Ring {
    type Err = ConventionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(idx) = s.parse::<i32>() {
            let ring = Ring::from_index(idx);
            if ring == Ring::Unknown {
                return Err(ConventionError::BadRing(s.to_string()));
            }
            return Ok(ring);
        }
        Ring::ALL
            .iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ConventionError::BadRing(s.to_string()))
    }
}

/// The two antenna polarizations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pol {
    Horizontal = 0,
    Vertical = 1,
}

impl Pol {
    pub const ALL: [Pol; 2] = [Pol::Horizontal, Pol::Vertical];

    pub fn as_char(&self) -> char {
        match self {
            Pol::Horizontal => 'H',
            Pol::Vertical => 'V',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'H' | 'h' => Some(Pol::Horizontal),
            'V' | 'v' => Some(Pol::Vertical),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for Pol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Pol {
    type Err = ConventionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Pol::from_char(c).ok_or_else(|| ConventionError::BadPol(s.to_string())),
            _ => Err(ConventionError::BadPol(s.to_string())),
        }
    }
}

/// Trigger type bits as stored in `RawHeader::trig_type`
pub mod trigger {
    pub const UNKNOWN: u32 = 0;
    pub const RF_MI: u32 = 1;
    pub const EXT: u32 = 2;
    pub const RF_LF: u32 = 4;
    pub const PPS0: u32 = 8;
    pub const PPS1: u32 = 16;
    pub const SOFT: u32 = 32;
    pub const VPOL: u32 = 64;
    pub const HPOL: u32 = 128;

    pub fn is_rf_trigger(trig_type: u32) -> bool {
        trig_type & (RF_MI | RF_LF) != 0
    }

    /// Anything that was not an MI RF trigger counts as minimum bias
    pub fn is_min_bias(trig_type: u32) -> bool {
        trig_type & 1 == 0
    }
}

/// Well known ground sites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Wais,
    Ldb,
    TaylorDome,
    SouthPlus200,
}

impl Location {
    /// (latitude [deg], longitude [deg], altitude [m])
    fn coordinates(&self) -> (f64, f64, f64) {
        match self {
            Location::Wais => (-79.468116, -112.059258, 1779.80),
            Location::Ldb => (-(77.0 + (51.23017 / 60.0)), 167.0 + (12.16908 / 60.0), 0.0),
            Location::TaylorDome => (-77.78695, 158.66555, 2395.0),
            Location::SouthPlus200 => (-81.9457, 178.392, 0.0),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates().0
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates().1
    }

    pub fn altitude(&self) -> f64 {
        self.coordinates().2
    }
}
