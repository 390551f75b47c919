//! Parser for free-text place strings from genealogical records.
//!
//! Strings are comma-separated, most specific first: for Swedish records the
//! canonical order is farm, village, parish, county, country. The country is
//! judged from the trailing segment only; everything else is positional from
//! the end, so shortened strings lose the most specific levels first.

use crate::models::{PlaceKind, StructuredPlace};

const SWEDEN_KEYWORDS: &[&str] = &["sverige", "sweden", "swe"];
const USA_KEYWORDS: &[&str] = &["usa", "united states", "amerika", "america"];
const COUNTY_SUFFIX: &str = "län";

/// A two-letter uppercase token, the US state abbreviation shape.
fn is_state_abbreviation(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|b| b.is_ascii_uppercase())
}

/// Parse a place string into structured fields. Unparseable input yields
/// `PlaceKind::Unknown` with every field empty; this never fails.
pub fn parse(text: &str) -> StructuredPlace {
    let parts: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let Some(last) = parts.last() else {
        return StructuredPlace::default();
    };

    let trailing = last.to_lowercase();
    let kind = if SWEDEN_KEYWORDS.contains(&trailing.as_str()) || trailing.ends_with(COUNTY_SUFFIX)
    {
        PlaceKind::Sweden
    } else if USA_KEYWORDS.contains(&trailing.as_str()) || is_state_abbreviation(last) {
        PlaceKind::Usa
    } else {
        PlaceKind::Unknown
    };

    let from_end = |n: usize| -> String {
        parts
            .len()
            .checked_sub(n)
            .map(|i| parts[i].to_string())
            .unwrap_or_default()
    };

    match kind {
        // Farm/croft, village, parish, county, country.
        PlaceKind::Sweden => StructuredPlace {
            kind,
            country: from_end(1),
            region: from_end(2),
            parish: from_end(3),
            village: from_end(4),
            specific: from_end(5),
            ..Default::default()
        },
        // Address, city, county, state, country. American chains put a
        // municipality where Swedish ones put a parish.
        PlaceKind::Usa => StructuredPlace {
            kind,
            country: from_end(1),
            region: from_end(2),
            municipality: from_end(3),
            village: from_end(4),
            specific: from_end(5),
            ..Default::default()
        },
        PlaceKind::Unknown => StructuredPlace::default(),
    }
}
