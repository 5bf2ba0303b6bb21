use crate::{common::*, stream::Stream};

/// A key-value pair taken out of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for Entry<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self { key, value }
    }
}

/// The entries of a map, in the iteration order of the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<K, V>(Vec<Entry<K, V>>);

/// Collects the entries of `map`.
///
/// The order is the iteration order of `map`. Pass a `BTreeMap` to get entries sorted by key.
///
/// ```rust
/// use page_stream::entry_set;
/// use std::collections::BTreeMap;
///
/// let map: BTreeMap<_, _> = [("b", 2), ("a", 1)].into_iter().collect();
/// let entries = entry_set(map);
///
/// assert_eq!(entries.keys(), vec!["a", "b"]);
/// assert_eq!(entries.value_stream().map(|value| value * 10).to_list(), vec![10, 20]);
/// ```
pub fn entry_set<K, V, M>(map: M) -> Entries<K, V>
where
    M: IntoIterator<Item = (K, V)>,
{
    Entries(map.into_iter().map(Entry::from).collect())
}

impl<K, V> Entries<K, V> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Entry<K, V>> {
        self.0
    }
}

impl<K, V> Entries<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn keys(&self) -> Vec<K> {
        self.0.iter().map(|entry| entry.key.clone()).collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.0.iter().map(|entry| entry.value.clone()).collect()
    }

    pub fn key_stream(&self) -> Stream<K> {
        Stream::new(self.keys())
    }

    pub fn value_stream(&self) -> Stream<V> {
        Stream::new(self.values())
    }

    pub fn to_stream(&self) -> Stream<Entry<K, V>> {
        Stream::of(&self.0)
    }

    pub fn to_parallel_stream(&self) -> Stream<Entry<K, V>> {
        self.to_stream().parallel()
    }
}

impl<K, V> Deref for Entries<K, V> {
    type Target = [Entry<K, V>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> IntoIterator for Entries<K, V> {
    type Item = Entry<K, V>;
    type IntoIter = std::vec::IntoIter<Entry<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K, V> Stream<Entry<K, V>>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Rebuilds a map from a stream of entries. Later entries replace earlier ones.
    pub fn to_hash_map(&self) -> HashMap<K, V> {
        self.to_map(|_, entry| entry.key.clone(), |_, entry| entry.value.clone())
    }
}
