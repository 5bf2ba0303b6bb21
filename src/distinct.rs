use crate::{common::*, order, runner::TaskRunner, stream::Stream};
use dashmap::DashSet;
use log::debug;

/// Inputs longer than this are deduplicated with a hash set instead of a sort.
pub const DISTINCT_HASH_THRESHOLD: usize = 100_000;

/// Algorithm used to detect duplicate keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistinctStrategy {
    /// [SortCollapse](DistinctStrategy::SortCollapse) up to [DISTINCT_HASH_THRESHOLD]
    /// elements, [HashSet](DistinctStrategy::HashSet) above.
    #[default]
    Auto,
    /// Stable sort by key, then drop every element whose key equals its predecessor's.
    SortCollapse,
    /// Single pass over a set of seen keys.
    HashSet,
}

impl DistinctStrategy {
    /// Picks the concrete algorithm for `len` elements.
    pub fn resolve(self, len: usize) -> Self {
        match self {
            Self::Auto if len > DISTINCT_HASH_THRESHOLD => Self::HashSet,
            Self::Auto => Self::SortCollapse,
            strategy => strategy,
        }
    }
}

/// Indexes of the first occurrence of every key, in ascending order.
fn first_occurrences<K>(
    keys: Vec<K>,
    strategy: DistinctStrategy,
    runner: &TaskRunner,
    page_size: usize,
) -> Vec<usize>
where
    K: Ord + Hash + Send,
{
    match strategy.resolve(keys.len()) {
        DistinctStrategy::HashSet => {
            let mut seen = HashSet::with_capacity(keys.len());
            keys.into_iter()
                .enumerate()
                .filter_map(|(index, key)| seen.insert(key).then(|| index))
                .collect()
        }
        _ => {
            let keyed: Vec<(K, usize)> = keys
                .into_iter()
                .enumerate()
                .map(|(index, key)| (key, index))
                .collect();
            let by_key = |lhs: &(K, usize), rhs: &(K, usize)| lhs.0.cmp(&rhs.0);
            let sorted = order::sort_by(keyed, runner, page_size, &by_key);

            // the stable sort puts the first occurrence at the head of each run
            let mut kept: Vec<usize> = vec![];
            let mut prev: Option<K> = None;
            for (key, index) in sorted {
                if prev.as_ref() != Some(&key) {
                    kept.push(index);
                    prev = Some(key);
                }
            }
            kept.sort_unstable();
            kept
        }
    }
}

/// A set of keys answering membership queries, built with the same size rule as
/// [DistinctStrategy::Auto].
#[derive(Debug)]
pub(crate) enum KeySet<K>
where
    K: Eq + Hash,
{
    Sorted(Vec<K>),
    Hashed(HashSet<K>),
    Shared(DashSet<K>),
}

impl<K> KeySet<K>
where
    K: Ord + Hash + Send + Sync,
{
    pub(crate) fn build<T, F>(
        items: &[T],
        key_fn: &F,
        runner: &TaskRunner,
        page_size: usize,
    ) -> Self
    where
        T: Sync,
        F: Fn(&T) -> K + Sync,
    {
        if items.len() <= DISTINCT_HASH_THRESHOLD {
            let mut keys: Vec<K> = items.iter().map(key_fn).collect();
            keys.sort_unstable();
            keys.dedup();
            Self::Sorted(keys)
        } else if runner.is_parallel() {
            let set = DashSet::with_capacity(items.len());
            let pages = crate::partition(items, page_size).into_vec();
            runner.map_pages(pages, |_, page| {
                page.iter().for_each(|item| {
                    set.insert(key_fn(item));
                })
            });
            Self::Shared(set)
        } else {
            Self::Hashed(items.iter().map(key_fn).collect())
        }
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        match self {
            Self::Sorted(keys) => keys.binary_search(key).is_ok(),
            Self::Hashed(set) => set.contains(key),
            Self::Shared(set) => set.contains(key),
        }
    }
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync,
{
    /// Removes repeated elements, keeping the first occurrence of each in original order.
    pub fn distinct(&self) -> Self
    where
        T: Ord + Hash,
    {
        self.distinct_by(T::clone)
    }

    /// Removes elements whose key was already produced by an earlier element.
    ///
    /// The output keeps the first occurrence of each key, in original order, whichever
    /// algorithm [DistinctStrategy::Auto] selects.
    ///
    /// ```rust
    /// use page_stream::Stream;
    ///
    /// let unique = Stream::new(vec![3, 1, 2, 3, 3, 1]).distinct_by(|value| *value);
    /// assert_eq!(unique.to_list(), vec![3, 1, 2]);
    /// ```
    pub fn distinct_by<K, F>(&self, key_fn: F) -> Self
    where
        K: Ord + Hash + Send,
        F: Fn(&T) -> K + Sync,
    {
        self.distinct_by_with(DistinctStrategy::Auto, key_fn)
    }

    /// Like [distinct_by()](Stream::distinct_by) with an explicit algorithm.
    pub fn distinct_by_with<K, F>(&self, strategy: DistinctStrategy, key_fn: F) -> Self
    where
        K: Ord + Hash + Send,
        F: Fn(&T) -> K + Sync,
    {
        let keys: Vec<K> = self
            .map_pages(|_, page| {
                page.iter()
                    .map(|element| key_fn(element))
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();

        debug!(
            "distinct over {} elements using {:?}",
            keys.len(),
            strategy.resolve(keys.len())
        );

        let kept = first_occurrences(keys, strategy, &self.runner(), self.page_size());
        self.pick(kept)
    }

    /// Collects the keys of `other`, paging it by its own length.
    fn key_set<K, F>(&self, other: &[T], key_fn: &F) -> KeySet<K>
    where
        K: Ord + Hash + Send + Sync,
        F: Fn(&T) -> K + Sync,
    {
        let page_size = self.config.params(other.len()).page_size;
        KeySet::build(other, key_fn, &self.runner(), page_size)
    }

    /// Keeps the elements whose key is produced by some element of `other`.
    pub fn intersect_by<K, F>(&self, other: impl AsRef<[T]>, key_fn: F) -> Self
    where
        K: Ord + Hash + Send + Sync,
        F: Fn(&T) -> K + Sync,
    {
        let keys = self.key_set(other.as_ref(), &key_fn);
        self.filter(|item| keys.contains(&key_fn(item)))
    }

    /// Keeps the elements whose key is produced by no element of `other`.
    pub fn difference_by<K, F>(&self, other: impl AsRef<[T]>, key_fn: F) -> Self
    where
        K: Ord + Hash + Send + Sync,
        F: Fn(&T) -> K + Sync,
    {
        let keys = self.key_set(other.as_ref(), &key_fn);
        self.filter(|item| !keys.contains(&key_fn(item)))
    }
}
