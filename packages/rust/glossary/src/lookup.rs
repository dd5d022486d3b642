//! Case-insensitive lookup from term or acronym to term ID, and the
//! word-bounded matcher built from it.

use std::collections::{BTreeMap, BTreeSet};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use roadmap_shared::{Result, RoadmapError};

use crate::index::GlossaryTerm;

/// Lowercase term-or-acronym → term ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupTable(BTreeMap<String, String>);

impl LookupTable {
    /// Build the table from prepared terms.
    ///
    /// A key claimed by two different terms goes to the later term unless
    /// `strict` is set, in which case the collision is an error.
    pub fn build(terms: &[GlossaryTerm], strict: bool) -> Result<Self> {
        let mut table = BTreeMap::new();
        let mut owner: BTreeMap<String, &str> = BTreeMap::new();

        for term in terms {
            let keys = std::iter::once(&term.term).chain(term.acronyms.iter());
            for raw in keys {
                let key = raw.to_lowercase();
                if key.trim().is_empty() {
                    warn!(term = %term.term, "skipping empty lookup key");
                    continue;
                }

                if let Some(previous) = owner.get(&key).copied() {
                    if table.get(&key) != Some(&term.id) {
                        if strict {
                            return Err(RoadmapError::AmbiguousLookupKey {
                                key,
                                first: previous.to_string(),
                                second: term.term.clone(),
                            });
                        }
                        warn!(
                            key = %key,
                            previous = %previous,
                            winner = %term.term,
                            "lookup key claimed by two terms, later term wins"
                        );
                    }
                }

                owner.insert(key.clone(), term.term.as_str());
                table.insert(key, term.id.clone());
            }
        }

        Ok(Self(table))
    }

    /// Term ID for a key, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Entries sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Regex for one key, anchored on word boundaries, case-insensitive.
pub(crate) fn bounded_pattern(alternatives: &str) -> Result<Regex> {
    RegexBuilder::new(&format!(r"\b(?:{alternatives})\b"))
        .case_insensitive(true)
        .build()
        .map_err(|e| RoadmapError::validation(format!("cannot compile glossary pattern: {e}")))
}

/// Finds which terms occur in a piece of text.
///
/// One compiled pattern per lookup key, built once per indexing run.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    patterns: Vec<(Regex, String)>,
}

impl TermMatcher {
    pub fn new(lookup: &LookupTable) -> Result<Self> {
        let patterns = lookup
            .iter()
            .map(|(key, id)| Ok((bounded_pattern(&regex::escape(key))?, id.to_string())))
            .collect::<Result<Vec<_>>>()?;

        debug!(patterns = patterns.len(), "term matcher compiled");
        Ok(Self { patterns })
    }

    /// IDs of every term whose term or acronym appears as a whole word.
    pub fn find_terms(&self, text: &str) -> BTreeSet<&str> {
        if text.is_empty() {
            return BTreeSet::new();
        }

        self.patterns
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, id)| id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: &str, name: &str, acronyms: &[&str]) -> GlossaryTerm {
        GlossaryTerm {
            id: id.into(),
            term: name.into(),
            acronyms: acronyms.iter().map(|a| (*a).to_string()).collect(),
            categories: vec!["general".into()],
            definition: String::new(),
            see_also: vec![],
            appears_in: vec![],
        }
    }

    #[test]
    fn lookup_contains_terms_and_acronyms() {
        let terms = vec![term("amplitude-modulation", "Amplitude Modulation", &["AM"])];
        let lookup = LookupTable::build(&terms, false).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("am"), Some("amplitude-modulation"));
        assert_eq!(lookup.get("AMPLITUDE modulation"), Some("amplitude-modulation"));
    }

    #[test]
    fn later_term_wins_key_collision() {
        let terms = vec![
            term("alternating-current", "Alternating Current", &["AC"]),
            term("access-control", "Access Control", &["ac"]),
        ];
        let lookup = LookupTable::build(&terms, false).unwrap();
        assert_eq!(lookup.get("ac"), Some("access-control"));
    }

    #[test]
    fn strict_mode_rejects_key_collision() {
        let terms = vec![
            term("alternating-current", "Alternating Current", &["AC"]),
            term("access-control", "Access Control", &["AC"]),
        ];
        let err = LookupTable::build(&terms, true).unwrap_err();
        assert!(matches!(err, RoadmapError::AmbiguousLookupKey { ref key, .. } if key == "ac"));
    }

    #[test]
    fn same_term_repeating_its_own_key_is_not_a_collision() {
        let terms = vec![term("mosfet", "MOSFET", &["mosfet"])];
        assert!(LookupTable::build(&terms, true).is_ok());
    }

    #[test]
    fn empty_acronyms_are_skipped() {
        let terms = vec![term("phasor", "Phasor", &["", "  "])];
        let lookup = LookupTable::build(&terms, false).unwrap();
        assert_eq!(lookup.len(), 1);
    }

    #[test]
    fn acronym_does_not_match_inside_words() {
        let terms = vec![term("amplitude-modulation", "Amplitude Modulation", &["AM"])];
        let matcher = TermMatcher::new(&LookupTable::build(&terms, false).unwrap()).unwrap();

        assert!(matcher.find_terms("Run the program").is_empty());
        assert_eq!(
            matcher.find_terms("Apply AM modulation").into_iter().collect::<Vec<_>>(),
            vec!["amplitude-modulation"]
        );
    }

    #[test]
    fn synonyms_collapse_to_one_id() {
        let terms = vec![term("kirchhoffs-voltage-law", "Kirchhoff's Voltage Law", &["KVL"])];
        let matcher = TermMatcher::new(&LookupTable::build(&terms, false).unwrap()).unwrap();
        let found = matcher.find_terms("KVL, also called Kirchhoff's voltage law");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let terms = vec![term("c", "C++", &[]), term("i-o", "I/O", &[])];
        let matcher = TermMatcher::new(&LookupTable::build(&terms, false).unwrap()).unwrap();
        assert!(matcher.find_terms("Handle I/O carefully").contains("i-o"));
        assert!(matcher.find_terms("IxO").is_empty());
    }
}
