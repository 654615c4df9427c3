//! Blinding of the data stream.
//!
//! A blinding strategy can swap the headers and waveforms of selected events for inserted
//! (fake) ones and randomly flip the polarity of events. The inserted events come from a
//! [BlindSource]; no on-disk format for those exists yet, so the only source provided is
//! [NoBlindSource] which never replaces anything.
use std::fmt::Display;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use super::conventions::Pol;
use super::records::{RawHeader, UsefulEvent};

/// Set of blinding operations applied when reading events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlindingStrategy(u32);

impl BlindingStrategy {
    pub const NONE: Self = Self(0);
    pub const INSERTED_VPOL_EVENTS: Self = Self(1);
    pub const INSERTED_HPOL_EVENTS: Self = Self(2);
    pub const RANDOMIZE_POLARITY: Self = Self(4);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits & 0b111)
    }

    pub fn contains(&self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The inserted-event flag for a polarization
    pub fn inserted(pol: Pol) -> Self {
        match pol {
            Pol::Vertical => Self::INSERTED_VPOL_EVENTS,
            Pol::Horizontal => Self::INSERTED_HPOL_EVENTS,
        }
    }

    /// Human readable summary of the strategy
    pub fn describe(&self) -> String {
        let mut description = if self.is_none() {
            String::from("No blinding. ")
        } else {
            String::from("Current strategy: ")
        };
        if self.contains(Self::INSERTED_VPOL_EVENTS) {
            description += "VPol events inserted. ";
        }
        if self.contains(Self::INSERTED_HPOL_EVENTS) {
            description += "HPol events inserted. ";
        }
        if self.contains(Self::RANDOMIZE_POLARITY) {
            description += "Polarity randomized. ";
        }
        description
    }
}

impl BitOr for BlindingStrategy {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BlindingStrategy {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for BlindingStrategy {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Display for BlindingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Backing store of the events inserted by blinding
pub trait BlindSource: Send {
    /// The entry in the fake trees replacing an event, if it is to be replaced
    fn replacement(&self, pol: Pol, event_number: u64) -> Option<usize>;

    fn fake_header(&mut self, pol: Pol, entry: usize) -> Option<RawHeader>;

    fn fake_event(&mut self, pol: Pol, entry: usize) -> Option<UsefulEvent>;
}

/// Replaces nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlindSource;

impl BlindSource for NoBlindSource {
    fn replacement(&self, _pol: Pol, _event_number: u64) -> Option<usize> {
        None
    }

    fn fake_header(&mut self, _pol: Pol, _entry: usize) -> Option<RawHeader> {
        None
    }

    fn fake_event(&mut self, _pol: Pol, _entry: usize) -> Option<UsefulEvent> {
        None
    }
}

/// Replace a header by a fake one, keeping the timing and identity of the real event
pub fn overwrite_header(header: &mut RawHeader, fake: RawHeader) {
    let RawHeader {
        trigger_time,
        trigger_time_ns,
        event_number,
        run,
        ..
    } = *header;
    *header = RawHeader {
        trigger_time,
        trigger_time_ns,
        event_number,
        run,
        ..fake
    };
}

/// Replace an event by a fake one, keeping the real event number
pub fn overwrite_event(event: &mut UsefulEvent, fake: UsefulEvent) {
    let event_number = event.raw.event_number;
    *event = fake;
    event.raw.event_number = event_number;
}

/// Whether polarity randomization flips an event. Depends only on the event number so the
/// answer does not change with the order events are read in.
pub fn maybe_invert_polarity(strategy: BlindingStrategy, event_number: u64) -> bool {
    strategy.contains(BlindingStrategy::RANDOMIZE_POLARITY)
        && fxhash::hash64(&event_number) >> 63 == 1
}
