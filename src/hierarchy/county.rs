//! Source-partition to county-letter mapping.
//!
//! Each hierarchy partition is one county's export, named after the county.
//! The letters are the classic Swedish county letters (Kristianstads län = L,
//! Stockholms län = AB, ...) used to prefix ids and codes so they stay unique
//! when partitions are combined.

use hashbrown::HashMap;
use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountyResolution {
    pub code: String,
    /// True when the label was not recognized and the code is a best-effort
    /// guess from the label's leading characters.
    pub ambiguous: bool,
}

pub struct CountyTable {
    labels: HashMap<String, String>,
    trailing_code: Regex,
}

impl Default for CountyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CountyTable {
    /// The pre-1997 county list the hierarchy exports are organized by.
    pub fn builtin() -> Self {
        let labels = [
            ("blekinge", "K"),
            ("gotlands", "I"),
            ("gävleborgs", "X"),
            ("göteborg och bohus", "O"),
            ("hallands", "N"),
            ("jämtlands", "Z"),
            ("jönköpings", "F"),
            ("kalmar", "H"),
            ("kopparbergs", "W"),
            ("kristianstads", "L"),
            ("kronobergs", "G"),
            ("malmöhus", "M"),
            ("norrbottens", "BD"),
            ("skaraborgs", "R"),
            ("stockholms", "AB"),
            ("södermanlands", "D"),
            ("uppsala", "C"),
            ("värmlands", "S"),
            ("västerbottens", "AC"),
            ("västernorrlands", "Y"),
            ("västmanlands", "U"),
            ("älvsborgs", "P"),
            ("örebro", "T"),
            ("östergötlands", "E"),
        ]
        .into_iter()
        .map(|(label, code)| (label.to_string(), code.to_string()))
        .collect();

        Self {
            labels,
            trailing_code: Regex::new(r"[_-]([A-Za-z]{1,2})$").expect("valid regex"),
        }
    }

    /// Register an additional label, e.g. for renamed export files.
    pub fn insert(&mut self, label: &str, code: &str) {
        self.labels
            .insert(label.trim().to_lowercase(), code.to_string());
    }

    /// Resolve a partition label ("blekinge", "kristianstads.json") to its
    /// county letter. Unknown labels fall back to a trailing `_L`-style code,
    /// then to the label's first two characters, flagged ambiguous.
    pub fn resolve(&self, source_label: &str) -> CountyResolution {
        let stem = source_label
            .split('.')
            .next()
            .unwrap_or(source_label)
            .trim()
            .to_lowercase();

        if let Some(code) = self.labels.get(&stem) {
            return CountyResolution {
                code: code.clone(),
                ambiguous: false,
            };
        }

        if let Some(captures) = self.trailing_code.captures(&stem) {
            return CountyResolution {
                code: captures[1].to_uppercase(),
                ambiguous: false,
            };
        }

        let guess: String = stem.chars().take(2).collect::<String>().to_uppercase();
        warn!(
            "no county letter for source label '{}', guessing '{}'",
            source_label, guess
        );
        CountyResolution {
            code: guess,
            ambiguous: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_resolve_with_and_without_extension() {
        let table = CountyTable::builtin();
        assert_eq!(
            table.resolve("kristianstads"),
            CountyResolution {
                code: "L".into(),
                ambiguous: false
            }
        );
        assert_eq!(table.resolve("norrbottens.json").code, "BD");
        assert_eq!(table.resolve("Göteborg och Bohus.json").code, "O");
    }

    #[test]
    fn trailing_code_fallback() {
        let table = CountyTable::builtin();
        let resolved = table.resolve("platser_ab.json");
        assert_eq!(resolved.code, "AB");
        assert!(!resolved.ambiguous);
    }

    #[test]
    fn unknown_label_guesses_and_flags_ambiguous() {
        let table = CountyTable::builtin();
        let resolved = table.resolve("mystery");
        assert_eq!(resolved.code, "MY");
        assert!(resolved.ambiguous);
    }

    #[test]
    fn registered_label_wins_over_guessing() {
        let mut table = CountyTable::builtin();
        table.insert("Skåne", "M");
        assert!(!table.resolve("skåne.json").ambiguous);
    }
}
