//! Ortnamn - a gazetteer and place-matching engine for Swedish genealogical records.
//!
//! This library provides shared types and modules for the ingest and query binaries.

pub mod codes;
pub mod error;
pub mod hierarchy;
pub mod matcher;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod store;

pub use error::{Error, Result};
pub use models::{GazetteerRecord, PlaceKind, StructuredPlace, UserPlace};
