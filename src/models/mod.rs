pub mod events;
pub mod place;
pub mod structured;

pub use events::{EventLink, EventRecord, PersonEvents, UnmatchedPlace};
pub use place::{GazetteerRecord, MergeSource, MergedPlace, PlaceLevel, UserPlace};
pub use structured::{PlaceFields, PlaceKind, StructuredPlace};

/// Normalization applied before any field comparison or key construction.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
