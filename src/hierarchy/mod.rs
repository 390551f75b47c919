//! Administrative hierarchy derivation from flat parent/child exports.

pub mod builder;
pub mod county;
pub mod forest;

pub use builder::{BuildReport, ClassifierConfig, DerivedPlace, HierarchyBuilder};
pub use county::{CountyResolution, CountyTable};
pub use forest::{AncestorChain, PlaceForest, RawPlaceNode};
