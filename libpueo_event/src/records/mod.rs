//! Record types stored in the run trees. They are plain values: the dataset reads them from a
//! [RecordStore](crate::store::RecordStore) and hands out references.
pub mod event;
pub mod header;
pub mod hical;
pub mod nav;
pub mod truth;

pub use event::{RawEvent, UsefulEvent, Waveform};
pub use header::RawHeader;
pub use hical::HiCalFix;
pub use nav::Attitude;
pub use truth::TruthEvent;

/// A record that can live in a tree.
///
/// `field` exposes the scalar branches by their on-disk names so trees can be indexed and
/// scanned without knowing the concrete type.
pub trait Record: Clone + Send + 'static {
    fn field(&self, name: &str) -> Option<f64>;
}
