//! Score-ordered candidate list.
//!
//! Lower scores are better. Items with equal scores keep insertion order, so
//! the first-inserted item wins a tie. Capacity is only enforced by
//! [`BoundedPriorityList::take`]; a burst of `push` calls may grow the list
//! past it until the next truncation.

#[derive(Debug, Clone, PartialEq)]
pub struct BoundedPriorityList<T> {
    capacity: usize,
    items: Vec<(f64, T)>,
}

impl<T> BoundedPriorityList<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    /// Nominal working size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert after every item scored `<= score`.
    pub fn push(&mut self, item: T, score: f64) {
        let at = self.items.partition_point(|(s, _)| s.total_cmp(&score).is_le());
        self.items.insert(at, (score, item));
    }

    /// Keep the `k` lowest-scored items.
    pub fn take(&mut self, k: usize) {
        self.items.truncate(k);
    }

    /// Truncate to the nominal capacity.
    pub fn shrink_to_capacity(&mut self) {
        self.take(self.capacity);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn best(&self) -> Option<(&T, f64)> {
        self.items.first().map(|(s, item)| (item, *s))
    }

    /// `(score, item)` pairs in ascending score order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &T)> + '_ {
        self.items.iter().map(|(s, item)| (*s, item))
    }

    /// Absorb `other`. On ties, items already held stay ahead of `other`'s,
    /// and `other`'s keep their relative order.
    pub fn merge(&mut self, other: BoundedPriorityList<T>) {
        for (score, item) in other.items {
            self.push(item, score);
        }
    }

    /// Drop items equal to an earlier (better or tied) item.
    pub fn dedup(&mut self)
    where
        T: PartialEq,
    {
        let mut kept: Vec<(f64, T)> = Vec::with_capacity(self.items.len());
        for (score, item) in self.items.drain(..) {
            if !kept.iter().any(|(_, k)| *k == item) {
                kept.push((score, item));
            }
        }
        self.items = kept;
    }

    pub fn into_best(self) -> Option<(T, f64)> {
        self.items.into_iter().next().map(|(s, item)| (item, s))
    }
}

impl<T> IntoIterator for BoundedPriorityList<T> {
    type Item = (f64, T);
    type IntoIter = std::vec::IntoIter<(f64, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
