use serde::Serialize;

use crate::data_types::locus::{Located, Locus};

/// How a query locus must relate to a reference locus to count as a match
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize,
    clap::ValueEnum, strum_macros::Display, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MatchRule {
    /// Both start and end are equal
    #[default]
    #[strum(serialize = "exact")]
    #[clap(name = "exact")]
    Exact,
    /// The reference locus contains the query locus
    #[strum(serialize = "contains")]
    #[clap(name = "contains")]
    Contains
}

impl MatchRule {
    /// Tests a single reference/query pair.
    /// # Arguments
    /// * `reference` - the reference entity locus
    /// * `query` - the detected record locus
    /// * `fuzzy` - tolerance in bp applied to each boundary; 0 is strict
    pub fn matches(&self, reference: &Locus, query: &Locus, fuzzy: u64) -> bool {
        match self {
            MatchRule::Exact => {
                reference.start().abs_diff(query.start()) <= fuzzy &&
                    reference.end().abs_diff(query.end()) <= fuzzy
            },
            MatchRule::Contains => {
                reference.start() <= query.start().saturating_add(fuzzy) &&
                    reference.end().saturating_add(fuzzy) >= query.end()
            }
        }
    }
}

/// A collection sorted by (start, end) that answers locus queries with a binary search.
/// Entries keep their input ordinal so ties can fall back to input order.
#[derive(Clone, Debug)]
pub struct SortedIndex<T> {
    /// (input ordinal, entry), sorted by locus
    entries: Vec<(usize, T)>,
    /// Longest entry, bounds how far left a containing entry can start
    max_span: u64
}

impl<T> Default for SortedIndex<T> {
    fn default() -> Self {
        Self {
            entries: vec![],
            max_span: 0
        }
    }
}

impl<T: Located> SortedIndex<T> {
    /// Builds the index; input order is remembered for tie-breaks.
    pub fn new(entries: Vec<T>) -> Self {
        let mut entries: Vec<(usize, T)> = entries.into_iter().enumerate().collect();
        entries.sort_by_key(|(ordinal, e)| (e.locus(), *ordinal));
        let max_span = entries.iter()
            .map(|(_o, e)| e.locus().length())
            .max()
            .unwrap_or(0);
        Self { entries, max_span }
    }

    /// Finds the entry that best matches `query`.
    /// If several entries satisfy the rule, the smallest span wins, then input order.
    /// # Arguments
    /// * `query` - the detected locus
    /// * `rule` - exact or containment matching
    /// * `fuzzy` - boundary tolerance in bp
    pub fn find(&self, query: &Locus, rule: MatchRule, fuzzy: u64) -> Option<&T> {
        self.find_where(query, rule, fuzzy, |_| true)
    }

    /// Same as `find`, but only entries passing `filter` are considered.
    pub fn find_where<F>(&self, query: &Locus, rule: MatchRule, fuzzy: u64, filter: F) -> Option<&T>
    where
        F: Fn(&T) -> bool
    {
        self.candidates(query, fuzzy)
            .iter()
            .filter(|(_o, e)| rule.matches(&e.locus(), query, fuzzy) && filter(e))
            .min_by_key(|(ordinal, e)| (e.locus().length(), *ordinal))
            .map(|(_o, e)| e)
    }

    /// All entries that overlap `query`, in sorted order
    pub fn overlapping(&self, query: &Locus) -> impl Iterator<Item = &T> {
        let query = *query;
        self.candidates(&query, 0)
            .iter()
            .filter(move |(_o, e)| e.locus().overlap(&query) > 0)
            .map(|(_o, e)| e)
    }

    /// The window of entries that could possibly match; anything starting after `query.start + fuzzy`
    /// or ending before `query.end - fuzzy` is excluded by the binary searches.
    fn candidates(&self, query: &Locus, fuzzy: u64) -> &[(usize, T)] {
        // an entry starting at s ends no later than s + max_span - 1
        let reach = self.max_span.saturating_add(fuzzy);
        let lower = self.entries.partition_point(|(_o, e)| {
            e.locus().start().saturating_add(reach) <= query.start()
        });
        let upper = self.entries.partition_point(|(_o, e)| {
            e.locus().start() <= query.end().saturating_add(fuzzy)
        });
        if lower < upper {
            &self.entries[lower..upper]
        } else {
            &[]
        }
    }

    /// Entries in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_o, e)| e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that the entries are strictly ordered by (start, end, input ordinal).
    /// Equal loci are allowed, such as one exon shared by two genes; they must then follow input order.
    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|pair| {
            (pair[0].1.locus(), pair[0].0) < (pair[1].1.locus(), pair[1].0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locus(start: u64, end: u64) -> Locus {
        Locus::new(start, end).unwrap()
    }

    #[test]
    fn test_exact_vs_contains() {
        let reference = locus(90, 110);
        assert!(MatchRule::Contains.matches(&reference, &locus(100, 100), 0));
        assert!(!MatchRule::Exact.matches(&reference, &locus(100, 100), 0));
        assert!(MatchRule::Contains.matches(&reference, &locus(90, 110), 0));
        assert!(MatchRule::Exact.matches(&reference, &locus(90, 110), 0));

        let index = SortedIndex::new(vec![reference]);
        assert_eq!(index.find(&locus(100, 100), MatchRule::Contains, 0), Some(&reference));
        assert_eq!(index.find(&locus(100, 100), MatchRule::Exact, 0), None);
        assert_eq!(index.find(&locus(90, 110), MatchRule::Exact, 0), Some(&reference));
        assert_eq!(index.find(&locus(90, 110), MatchRule::Contains, 0), Some(&reference));
        assert_eq!(index.find(&locus(85, 100), MatchRule::Contains, 0), None);
    }

    #[test]
    fn test_fuzzy() {
        let reference = locus(100, 200);
        assert!(!MatchRule::Exact.matches(&reference, &locus(102, 199), 1));
        assert!(MatchRule::Exact.matches(&reference, &locus(102, 199), 2));
        assert!(!MatchRule::Contains.matches(&reference, &locus(95, 150), 4));
        assert!(MatchRule::Contains.matches(&reference, &locus(95, 150), 5));

        let index = SortedIndex::new(vec![reference]);
        assert_eq!(index.find(&locus(95, 205), MatchRule::Contains, 5), Some(&reference));
        assert_eq!(index.find(&locus(95, 205), MatchRule::Contains, 4), None);
        assert_eq!(index.find(&locus(203, 203), MatchRule::Contains, 3), Some(&reference));
    }

    #[test]
    fn test_smallest_span_wins() {
        let index = SortedIndex::new(vec![locus(1, 1000), locus(400, 600), locus(450, 550), locus(10, 20)]);
        assert!(index.is_sorted());
        assert_eq!(index.find(&locus(500, 500), MatchRule::Contains, 0), Some(&locus(450, 550)));
        assert_eq!(index.find(&locus(420, 430), MatchRule::Contains, 0), Some(&locus(400, 600)));
        assert_eq!(index.find(&locus(700, 700), MatchRule::Contains, 0), Some(&locus(1, 1000)));
        assert_eq!(index.find(&locus(15, 15), MatchRule::Contains, 0), Some(&locus(10, 20)));
        assert_eq!(index.find(&locus(1001, 1001), MatchRule::Contains, 0), None);
    }

    #[derive(Debug, PartialEq)]
    struct Named(&'static str, Locus);

    impl Located for Named {
        fn locus(&self) -> Locus {
            self.1
        }
    }

    #[test]
    fn test_input_order_tie_break() {
        // same span, different start: first in input wins regardless of position
        let index = SortedIndex::new(vec![
            Named("late", locus(50, 150)),
            Named("early", locus(40, 140)),
            Named("dup_a", locus(60, 160)),
        ]);
        assert_eq!(index.find(&locus(100, 100), MatchRule::Contains, 0).unwrap().0, "late");

        // identical loci keep input order
        let index = SortedIndex::new(vec![Named("b", locus(10, 20)), Named("a", locus(10, 20))]);
        assert_eq!(index.find(&locus(10, 20), MatchRule::Exact, 0).unwrap().0, "b");
        assert_eq!(index.find_where(&locus(10, 20), MatchRule::Exact, 0, |n| n.0 == "a").unwrap().0, "a");
    }

    #[test]
    fn test_overlapping() {
        let index = SortedIndex::new(vec![locus(1, 10), locus(5, 15), locus(20, 30)]);
        let found: Vec<&Locus> = index.overlapping(&locus(8, 21)).collect();
        assert_eq!(found, vec![&locus(1, 10), &locus(5, 15), &locus(20, 30)]);
        let found: Vec<&Locus> = index.overlapping(&locus(16, 19)).collect();
        assert!(found.is_empty());

        let empty: SortedIndex<Locus> = SortedIndex::default();
        assert!(empty.is_empty());
        assert_eq!(empty.find(&locus(1, 1), MatchRule::Contains, 0), None);
    }

    #[test]
    fn test_is_sorted_with_shared_loci() {
        let shared = locus(100, 200);
        let index = SortedIndex::new(vec![locus(300, 400), shared, shared, locus(100, 150)]);
        assert!(index.is_sorted());
        assert_eq!(index.iter().copied().collect::<Vec<_>>(), vec![locus(100, 150), shared, shared, locus(300, 400)]);

        // a tie out of input order is rejected
        let mut swapped = index.clone();
        swapped.entries.swap(1, 2);
        assert!(!swapped.is_sorted());

        let mut unsorted = index;
        unsorted.entries.swap(0, 3);
        assert!(!unsorted.is_sorted());
    }
}
