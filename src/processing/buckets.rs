//! Keyed bucket store used by `group`, `distinct` and `merge`.
//!
//! Items are indexed by a computed [`Key`]. Buckets keep insertion order, and buckets
//! themselves enumerate in the order their key was first seen.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::types::Key;

/// Indexes items by a computed key, preserving first-seen key order and per-key insertion
/// order.
///
/// In `distinct` mode a bucket only ever keeps the first item inserted under its key; later
/// items with the same key are dropped. That turns the store into a "seen keys" tracker that
/// still remembers the representative item.
pub struct KeyedBucketStore<T, F> {
    key_fn: F,
    distinct: bool,
    buckets: IndexMap<Key, Vec<T>>,
}

impl<T, F> KeyedBucketStore<T, F>
where
    F: Fn(&T) -> Key,
{
    /// Create an empty store.
    pub fn new(key_fn: F, distinct: bool) -> Self {
        Self {
            key_fn,
            distinct,
            buckets: IndexMap::new(),
        }
    }

    /// Create a store and insert `items` in order.
    pub fn from_items<I>(key_fn: F, distinct: bool, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut store = Self::new(key_fn, distinct);
        store.add_items(items);
        store
    }

    /// Whether this store only keeps the first item per key.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Insert one item. Returns `true` if its key had not been seen before.
    pub fn add_item(&mut self, item: T) -> bool {
        let key = (self.key_fn)(&item);
        match self.buckets.entry(key) {
            Entry::Occupied(mut bucket) => {
                if !self.distinct {
                    bucket.get_mut().push(item);
                }
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(vec![item]);
                true
            }
        }
    }

    /// Insert every item in iteration order.
    pub fn add_items<I>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            self.add_item(item);
        }
        self
    }

    /// Look up the bucket matching `probe` under the probe's own key function.
    pub fn get_bucket<P, K>(&self, probe: &P, probe_key: K) -> Option<&[T]>
    where
        K: Fn(&P) -> Key,
    {
        self.buckets.get(&probe_key(probe)).map(Vec::as_slice)
    }

    /// Position of the bucket matching `probe`, in first-seen order.
    pub fn bucket_index<P, K>(&self, probe: &P, probe_key: K) -> Option<usize>
    where
        K: Fn(&P) -> Key,
    {
        self.buckets.get_index_of(&probe_key(probe))
    }

    /// Bucket at `index` in first-seen order.
    pub fn bucket_at(&self, index: usize) -> Option<&[T]> {
        self.buckets.get_index(index).map(|(_, items)| items.as_slice())
    }

    /// `true` if a bucket exists for `key`.
    pub fn contains_key(&self, key: &Key) -> bool {
        self.buckets.contains_key(key)
    }

    /// Number of buckets (distinct keys).
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// `true` if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of stored items across buckets.
    pub fn item_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Borrow buckets with their position, in first-seen key order.
    pub fn iter_buckets(&self) -> impl Iterator<Item = (usize, &[T])> {
        self.buckets.values().map(Vec::as_slice).enumerate()
    }

    /// Consume the store, yielding buckets in first-seen key order.
    pub fn buckets(self) -> impl Iterator<Item = Vec<T>> {
        self.buckets.into_values()
    }

    /// Pair `probe` with every item of its matching bucket.
    ///
    /// Yields `combine(Some(stored), probe)` for each stored item in bucket order, or exactly
    /// one `combine(None, probe)` when no bucket matches.
    pub fn cross_map_row<'a, P, K, C, R>(
        &'a self,
        probe: &'a P,
        probe_key: K,
        combine: C,
    ) -> CrossMapRow<'a, T, P, C>
    where
        K: Fn(&P) -> Key,
        C: FnMut(Option<&T>, &P) -> R,
    {
        let bucket = self.get_bucket(probe, probe_key);
        CrossMapRow {
            probe,
            unmatched: bucket.is_none(),
            bucket: bucket.map(|items| items.iter()),
            combine,
        }
    }
}

/// Iterator returned by [`KeyedBucketStore::cross_map_row`].
pub struct CrossMapRow<'a, T, P, C> {
    probe: &'a P,
    bucket: Option<std::slice::Iter<'a, T>>,
    unmatched: bool,
    combine: C,
}

impl<'a, T, P, C, R> Iterator for CrossMapRow<'a, T, P, C>
where
    C: FnMut(Option<&T>, &P) -> R,
{
    type Item = R;

    fn next(&mut self) -> Option<R> {
        let Self {
            probe,
            bucket,
            unmatched,
            combine,
        } = self;
        match bucket {
            Some(items) => items.next().map(|stored| combine(Some(stored), *probe)),
            None if *unmatched => {
                *unmatched = false;
                Some(combine(None, *probe))
            }
            None => None,
        }
    }
}
