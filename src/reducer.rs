//! Collapses suggestion sets so no term appears alongside its direct parent.
//!
//! A child term already implies its parent, so when both are suggested the
//! parent is dropped. Only the direct parent recorded for each term is
//! checked: a grandparent suggested together with a grandchild, but without
//! the intermediate term, is kept.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::vocabulary::HierarchyMap;

/// Unordered, duplicate-free collection of terms.
pub type SuggestionSet = BTreeSet<String>;

/// Child to parent lookup derived from a [`HierarchyMap`].
///
/// Each child keeps a single parent. When a term is listed under several
/// parents the last one scanned wins, scanning parents in first-seen order and
/// children in line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InverseIndex {
    parents: HashMap<String, String>,
}

impl InverseIndex {
    /// Returns the parent recorded for `term`.
    pub fn parent_of(&self, term: &str) -> Option<&str> {
        self.parents.get(term).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Removes from `suggested` every term that is the recorded parent of
    /// another suggested term.
    ///
    /// This is a single pass over the suggestions, so cyclic or
    /// self-referential hierarchies terminate like any other.
    pub fn reduce(&self, suggested: &SuggestionSet) -> SuggestionSet {
        let redundant: BTreeSet<&str> = suggested
            .iter()
            .filter_map(|term| self.parent_of(term))
            .filter(|parent| suggested.contains(*parent))
            .collect();

        if !redundant.is_empty() {
            debug!(removed = ?redundant, "dropping parents implied by suggested children");
        }

        suggested
            .iter()
            .filter(|term| !redundant.contains(term.as_str()))
            .cloned()
            .collect()
    }
}

impl From<&HierarchyMap> for InverseIndex {
    fn from(hierarchy: &HierarchyMap) -> Self {
        let mut parents = HashMap::new();
        for (parent, children) in hierarchy.iter() {
            for child in children {
                parents.insert(child.clone(), parent.to_string());
            }
        }
        Self { parents }
    }
}

/// Reduces `suggested` against `hierarchy`, dropping implied parents.
///
/// Builds the [`InverseIndex`] on every call; callers reducing many sets
/// against the same hierarchy should build the index once and call
/// [`InverseIndex::reduce`] instead.
///
/// # Examples
///
/// ```
/// use taxo::reducer::{SuggestionSet, reduce};
/// use taxo::vocabulary::HierarchyMap;
///
/// let hierarchy: HierarchyMap = [("Saúde", "Doença"), ("Doença", "Diabetes")]
///     .into_iter()
///     .collect();
///
/// let suggested: SuggestionSet = ["Doença", "Diabetes"].map(String::from).into();
/// assert_eq!(
///     reduce(&suggested, &hierarchy),
///     SuggestionSet::from(["Diabetes".to_string()])
/// );
///
/// // Not a direct pair: nothing is removed.
/// let suggested: SuggestionSet = ["Saúde", "Diabetes"].map(String::from).into();
/// assert_eq!(reduce(&suggested, &hierarchy), suggested);
/// ```
pub fn reduce(suggested: &SuggestionSet, hierarchy: &HierarchyMap) -> SuggestionSet {
    InverseIndex::from(hierarchy).reduce(suggested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(terms: &[&str]) -> SuggestionSet {
        terms.iter().map(|t| t.to_string()).collect()
    }

    fn health() -> HierarchyMap {
        [("Saúde", "Doença"), ("Doença", "Diabetes")]
            .into_iter()
            .collect()
    }

    #[test]
    fn direct_parent_is_removed() {
        let result = reduce(&set(&["Doença", "Diabetes"]), &health());
        assert_eq!(result, set(&["Diabetes"]));
    }

    #[test]
    fn grandparent_without_intermediate_is_kept() {
        let suggested = set(&["Saúde", "Diabetes"]);
        assert_eq!(reduce(&suggested, &health()), suggested);
    }

    #[test]
    fn full_chain_collapses_to_leaf() {
        let result = reduce(&set(&["Saúde", "Doença", "Diabetes"]), &health());
        assert_eq!(result, set(&["Diabetes"]));
    }

    #[test]
    fn unknown_term_passes_through() {
        let suggested = set(&["Política Pública"]);
        assert_eq!(reduce(&suggested, &health()), suggested);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(reduce(&SuggestionSet::new(), &health()).is_empty());
    }

    #[test]
    fn empty_hierarchy_leaves_input_untouched() {
        let suggested = set(&["Saúde", "Doença"]);
        assert_eq!(reduce(&suggested, &HierarchyMap::new()), suggested);
    }

    #[test]
    fn parent_removed_once_for_several_children() {
        let hierarchy: HierarchyMap = [
            ("Educação", "Ensino Superior"),
            ("Educação", "Ensino Médio"),
        ]
        .into_iter()
        .collect();
        let result = reduce(
            &set(&["Educação", "Ensino Superior", "Ensino Médio"]),
            &hierarchy,
        );
        assert_eq!(result, set(&["Ensino Médio", "Ensino Superior"]));
    }

    #[test]
    fn child_with_multiple_parents_keeps_last_seen() {
        let hierarchy: HierarchyMap = [("Saúde", "Doença"), ("Política", "Doença")]
            .into_iter()
            .collect();
        let index = InverseIndex::from(&hierarchy);
        assert_eq!(index.parent_of("Doença"), Some("Política"));

        // The overwritten parent is no longer considered implied.
        let suggested = set(&["Saúde", "Doença"]);
        assert_eq!(reduce(&suggested, &hierarchy), suggested);

        let result = reduce(&set(&["Política", "Doença"]), &hierarchy);
        assert_eq!(result, set(&["Doença"]));
    }

    #[test]
    fn last_write_follows_parent_first_seen_order() {
        // "B" is first seen before "C", so C's edge is scanned last even
        // though B gains a second child afterwards.
        let hierarchy: HierarchyMap = [("B", "x"), ("C", "x"), ("B", "y")].into_iter().collect();
        assert_eq!(InverseIndex::from(&hierarchy).parent_of("x"), Some("C"));
    }

    #[test]
    fn term_that_is_both_leaf_and_parent_is_removed() {
        let hierarchy: HierarchyMap = [("A", "B"), ("B", "C")].into_iter().collect();
        let result = reduce(&set(&["B", "C"]), &hierarchy);
        assert_eq!(result, set(&["C"]));
    }

    #[test]
    fn two_cycle_terminates_and_removes_both() {
        let hierarchy: HierarchyMap = [("A", "B"), ("B", "A")].into_iter().collect();
        assert!(reduce(&set(&["A", "B"]), &hierarchy).is_empty());
        assert_eq!(reduce(&set(&["A"]), &hierarchy), set(&["A"]));
    }

    #[test]
    fn self_reference_terminates() {
        let hierarchy: HierarchyMap = [("A", "A")].into_iter().collect();
        assert!(reduce(&set(&["A"]), &hierarchy).is_empty());
        assert_eq!(reduce(&set(&["B"]), &hierarchy), set(&["B"]));
    }

    #[test]
    fn reduction_is_idempotent() {
        let hierarchy: HierarchyMap = [
            ("Saúde", "Doença"),
            ("Doença", "Diabetes"),
            ("A", "B"),
            ("B", "A"),
            ("Educação", "Ensino Superior"),
        ]
        .into_iter()
        .collect();

        let inputs = [
            set(&["Saúde", "Doença", "Diabetes"]),
            set(&["Saúde", "Diabetes"]),
            set(&["A", "B", "Educação"]),
            set(&["Educação", "Ensino Superior", "Recursos Hídricos"]),
            set(&[]),
        ];

        for input in inputs {
            let once = reduce(&input, &hierarchy);
            let twice = reduce(&once, &hierarchy);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn prebuilt_index_matches_free_function() {
        let hierarchy = health();
        let index = InverseIndex::from(&hierarchy);
        assert_eq!(index.len(), 2);

        let suggested = set(&["Saúde", "Doença", "Recursos Hídricos"]);
        assert_eq!(index.reduce(&suggested), reduce(&suggested, &hierarchy));
    }
}
