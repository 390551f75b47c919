//! Two-pass matching of user places against gazetteer candidates.
//!
//! Pass 1 requires every non-empty incoming field to agree with the
//! candidate; pass 2 falls back to name similarity gated on a compatible
//! region. The design prefers a false negative (no match, persisted as
//! unmatched) over a false positive, and ties go to the first candidate in
//! list order.

use serde::Serialize;
use strsim::normalized_levenshtein;

use crate::models::{normalize, GazetteerRecord, UserPlace};

/// Similarity a candidate's locality name must strictly exceed in the fuzzy
/// pass. Tolerates a spelling slip in a typical place name, nothing more.
pub const FUZZY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchReason {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub place_id: u64,
    pub reason: MatchReason,
}

/// Find at most one gazetteer record for an incoming place. `candidates`
/// come from the store's substring prefilter, in id order.
pub fn match_place(incoming: &UserPlace, candidates: &[GazetteerRecord]) -> Option<MatchOutcome> {
    let wanted = incoming.fields();

    for candidate in candidates {
        if candidate.fields().satisfies(&wanted) {
            return Some(MatchOutcome {
                place_id: candidate.id,
                reason: MatchReason::Exact,
            });
        }
    }

    for candidate in candidates {
        if fuzzy_match(candidate, incoming) {
            return Some(MatchOutcome {
                place_id: candidate.id,
                reason: MatchReason::Fuzzy,
            });
        }
    }

    None
}

/// Locality-name similarity with a region compatibility gate. The incoming
/// name is the village, falling back to the parish, then the raw name.
fn fuzzy_match(candidate: &GazetteerRecord, incoming: &UserPlace) -> bool {
    let locality = normalize(&candidate.locality_name);
    let name = [&incoming.village, &incoming.parish, &incoming.name]
        .into_iter()
        .map(|f| normalize(f))
        .find(|f| !f.is_empty())
        .unwrap_or_default();
    if locality.is_empty() || name.is_empty() {
        return false;
    }

    let name_close =
        locality == name || normalized_levenshtein(&locality, &name) > FUZZY_THRESHOLD;

    let candidate_region = normalize(&candidate.county_name);
    let incoming_region = normalize(&incoming.region);
    let region_compatible = candidate_region.is_empty()
        || incoming_region.is_empty()
        || candidate_region == incoming_region;

    name_close && region_compatible
}
