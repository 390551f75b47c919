//! Event references supplied by the person/event collaborator.
//!
//! The core never fetches these itself; the caller hands them in so unmatched
//! places can be annotated with the events that still point at them.

use serde::{Deserialize, Serialize};

use super::UserPlace;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonEvents {
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub person_name: String,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event_id: String,
    /// Event type: birth, death, marriage, residence, ...
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub place_id: Option<u64>,
}

/// An event still referencing an unmatched place, flattened for triage lists.
#[derive(Debug, Clone, Serialize)]
pub struct EventLink {
    pub person_id: String,
    pub person_name: String,
    pub event_id: String,
    pub kind: String,
    pub date: String,
}

/// A user place without a gazetteer match, annotated for operator triage.
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedPlace {
    #[serde(flatten)]
    pub place: UserPlace,
    pub links: Vec<EventLink>,
    pub link_count: usize,
}
