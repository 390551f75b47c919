//! Arena-style forest of raw hierarchy nodes.
//!
//! Survey hierarchy exports are flat: every node names its parent by id.
//! The forest indexes nodes by id and offers a bounded upward walk, so
//! deriving enclosing units can never loop even on corrupt parent chains.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

/// One flat record from a hierarchy export partition.
///
/// Ids and codes arrive unprefixed; the partition merger prefixes them with
/// the partition's county letter before the node enters a combined forest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlaceNode {
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub short_name: String,
    /// Kind tag from the export: "Kommun", "Socken", or a bare county
    /// letter for county nodes.
    #[serde(default)]
    pub kind_tag: String,
    /// Administrative code; parishes take the `L-12345` shape once prefixed.
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Partition file the node came from, stamped by the merger.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

/// Result of walking a node's parent chain, nearest ancestor first.
pub struct AncestorChain<'a> {
    pub nodes: Vec<&'a RawPlaceNode>,
    /// True when the walk stopped because it revisited a node.
    pub cycle: bool,
}

/// Nodes indexed by place id.
#[derive(Default)]
pub struct PlaceForest {
    nodes: HashMap<String, RawPlaceNode>,
}

impl PlaceForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = RawPlaceNode>) -> Self {
        let mut forest = Self::new();
        for node in nodes {
            forest.insert(node);
        }
        forest
    }

    /// Insert a node, replacing any earlier node with the same id.
    pub fn insert(&mut self, node: RawPlaceNode) -> Option<RawPlaceNode> {
        self.nodes.insert(node.place_id.clone(), node)
    }

    pub fn contains(&self, place_id: &str) -> bool {
        self.nodes.contains_key(place_id)
    }

    pub fn get(&self, place_id: &str) -> Option<&RawPlaceNode> {
        self.nodes.get(place_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawPlaceNode> {
        self.nodes.values()
    }

    /// Walk the parent chain upward from `place_id`, nearest first. A missing
    /// parent ends the chain; a revisited node ends it with `cycle` set. The
    /// starting node itself is not part of the chain.
    pub fn ancestors(&self, place_id: &str) -> AncestorChain<'_> {
        let mut chain = AncestorChain {
            nodes: Vec::new(),
            cycle: false,
        };
        let Some(start) = self.nodes.get(place_id) else {
            return chain;
        };

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(place_id);

        let mut current = start.parent_id.as_str();
        while !current.is_empty() {
            if !visited.insert(current) {
                chain.cycle = true;
                break;
            }
            match self.nodes.get(current) {
                Some(parent) => {
                    chain.nodes.push(parent);
                    current = parent.parent_id.as_str();
                }
                None => break,
            }
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parent: &str, name: &str) -> RawPlaceNode {
        RawPlaceNode {
            place_id: id.to_string(),
            parent_id: parent.to_string(),
            short_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn ancestors_come_nearest_first() {
        let forest = PlaceForest::from_nodes([
            node("L-1", "", "Kristianstads län"),
            node("L-2", "L-1", "Tomelilla kommun"),
            node("L-3", "L-2", "Smedstorp"),
        ]);

        let chain = forest.ancestors("L-3");
        assert!(!chain.cycle);
        let names: Vec<&str> = chain.nodes.iter().map(|n| n.short_name.as_str()).collect();
        assert_eq!(names, vec!["Tomelilla kommun", "Kristianstads län"]);
    }

    #[test]
    fn missing_parent_ends_chain_quietly() {
        let forest = PlaceForest::from_nodes([node("L-3", "L-99", "Smedstorp")]);
        let chain = forest.ancestors("L-3");
        assert!(chain.nodes.is_empty());
        assert!(!chain.cycle);
    }

    #[test]
    fn cycle_terminates_and_is_flagged() {
        let forest = PlaceForest::from_nodes([
            node("a", "b", "A"),
            node("b", "c", "B"),
            node("c", "a", "C"),
        ]);

        let chain = forest.ancestors("a");
        assert!(chain.cycle);
        assert_eq!(chain.nodes.len(), 2);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let forest = PlaceForest::from_nodes([node("a", "a", "A")]);
        let chain = forest.ancestors("a");
        assert!(chain.cycle);
        assert!(chain.nodes.is_empty());
    }

    #[test]
    fn unknown_start_yields_empty_chain() {
        let forest = PlaceForest::new();
        assert!(forest.ancestors("nope").nodes.is_empty());
    }
}
