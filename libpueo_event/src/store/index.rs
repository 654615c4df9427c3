use std::cmp::Ordering;

/// A sorted secondary index over one scalar field of a tree.
///
/// Holds (key, entry) pairs ordered by key and then by entry, so rank r of the index is the
/// r-th entry in key order. Keys are f64, so integers past 2^53 can share a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeIndex {
    key: String,
    pairs: Vec<(f64, usize)>,
}

fn compare(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

impl TreeIndex {
    /// Build from unsorted (key, entry) pairs
    pub fn new(key: &str, mut pairs: Vec<(f64, usize)>) -> Self {
        pairs.sort_by(compare);
        Self {
            key: key.to_string(),
            pairs,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Entries in key order
    pub fn sorted_entries(&self) -> impl Iterator<Item = usize> + '_ {
        self.pairs.iter().map(|(_, entry)| *entry)
    }

    /// The entry at a rank in key order
    pub fn entry_at_rank(&self, rank: usize) -> Option<usize> {
        self.pairs.get(rank).map(|(_, entry)| *entry)
    }

    /// The first entry whose key is exactly `key`
    pub fn entry_with_index(&self, key: f64) -> Option<usize> {
        let first = self.pairs.partition_point(|(k, _)| *k < key);
        self.pairs
            .get(first)
            .filter(|(k, _)| *k == key)
            .map(|(_, entry)| *entry)
    }

    /// All entries whose key is exactly `key`, in entry order
    pub fn entries_with_index(&self, key: f64) -> impl Iterator<Item = usize> + '_ {
        let first = self.pairs.partition_point(|(k, _)| *k < key);
        self.pairs[first..]
            .iter()
            .take_while(move |(k, _)| *k == key)
            .map(|(_, entry)| *entry)
    }

    /// The entry with the greatest key not above `key`. A key before the start of the index
    /// resolves to the first entry.
    pub fn entry_with_best_index(&self, key: f64) -> Option<usize> {
        let after = self.pairs.partition_point(|(k, _)| *k <= key);
        let rank = after.saturating_sub(1);
        // Among equal keys prefer the first one
        let best_key = self.pairs.get(rank)?.0;
        let first = self.pairs.partition_point(|(k, _)| *k < best_key);
        self.entry_at_rank(first)
    }

    /// Where (key, entry) sits in the index: Ok(rank) if present, Err(insertion rank) if not
    pub fn rank_of(&self, key: f64, entry: usize) -> Result<usize, usize> {
        self.pairs.binary_search_by(|p| compare(p, &(key, entry)))
    }

    pub fn min_key(&self) -> Option<f64> {
        self.pairs.first().map(|(k, _)| *k)
    }

    pub fn max_key(&self) -> Option<f64> {
        self.pairs.last().map(|(k, _)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> TreeIndex {
        // entry -> key: 0->30, 1->10, 2->20, 3->20, 4->50
        TreeIndex::new(
            "eventNumber",
            vec![(30.0, 0), (10.0, 1), (20.0, 2), (20.0, 3), (50.0, 4)],
        )
    }

    #[test]
    fn test_sorted() {
        let idx = index();
        assert_eq!(idx.sorted_entries().collect::<Vec<_>>(), vec![1, 2, 3, 0, 4]);
        assert_eq!(idx.min_key(), Some(10.0));
        assert_eq!(idx.max_key(), Some(50.0));
        assert_eq!(idx.entry_at_rank(3), Some(0));
        assert_eq!(idx.entry_at_rank(5), None);
    }

    #[test]
    fn test_exact_lookup() {
        let idx = index();
        assert_eq!(idx.entry_with_index(20.0), Some(2));
        assert_eq!(idx.entry_with_index(50.0), Some(4));
        assert_eq!(idx.entry_with_index(25.0), None);
        assert_eq!(idx.entry_with_index(60.0), None);
        assert_eq!(idx.entries_with_index(20.0).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(idx.entries_with_index(25.0).count(), 0);
    }

    #[test]
    fn test_best_lookup() {
        let idx = index();
        assert_eq!(idx.entry_with_best_index(25.0), Some(2));
        assert_eq!(idx.entry_with_best_index(30.0), Some(0));
        assert_eq!(idx.entry_with_best_index(5.0), Some(1));
        assert_eq!(idx.entry_with_best_index(1e9), Some(4));
        assert_eq!(TreeIndex::default().entry_with_best_index(1.0), None);
    }

    #[test]
    fn test_rank_of() {
        let idx = index();
        assert_eq!(idx.rank_of(20.0, 3), Ok(2));
        assert_eq!(idx.rank_of(30.0, 0), Ok(3));
        assert_eq!(idx.rank_of(40.0, 9), Err(4));
        assert_eq!(idx.rank_of(1.0, 9), Err(0));
    }
}
