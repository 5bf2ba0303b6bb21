use crate::{common::*, stream::Stream};

impl<T> Stream<T>
where
    T: Clone + Send + Sync,
{
    /// Folds the elements into one value.
    ///
    /// Sequential streams fold every element into `seed` with `combine`. Parallel streams
    /// fold each page starting from a clone of `seed`, then merge the partial results
    /// with `pairwise` in page order. The results agree only when `pairwise` is
    /// associative, `seed` is its identity and `combine` is compatible with it.
    /// An empty stream returns `seed`.
    ///
    /// ```rust
    /// use page_stream::Stream;
    ///
    /// let stream = Stream::new(vec![1, 2, 3, 4]);
    /// let add = |acc: i32, value: &i32| acc + value;
    ///
    /// assert_eq!(stream.reduce(0, add, |a, b| a + b), 10);
    /// assert_eq!(stream.parallel_with_setting(1, 4).reduce(0, add, |a, b| a + b), 10);
    /// ```
    pub fn reduce<A, C, P>(&self, seed: A, combine: C, pairwise: P) -> A
    where
        A: Clone + Send + Sync,
        C: Fn(A, &T) -> A + Sync,
        P: Fn(A, A) -> A + Sync,
    {
        if !self.parallel {
            return self
                .elements
                .iter()
                .fold(seed, |acc, element| combine(acc, element));
        }

        let partials = self.map_pages(|_, page| {
            page.iter()
                .fold(seed.clone(), |acc, element| combine(acc, element))
        });
        self.runner()
            .reduce_pairwise(partials, pairwise)
            .unwrap_or(seed)
    }

    /// Groups the backing values by key. Each bucket keeps the input order.
    ///
    /// Parallel streams group every page into its own map and merge the maps in page order.
    pub fn group_by<K, F>(&self, key_fn: F) -> HashMap<K, Vec<T>>
    where
        K: Eq + Hash + Send,
        F: Fn(&T) -> K + Sync,
    {
        let shards = self.map_pages(|offset, page| {
            let mut shard: HashMap<K, Vec<T>> = HashMap::new();
            for (index, element) in page.iter().enumerate() {
                shard
                    .entry(key_fn(element))
                    .or_default()
                    .push(self.source[offset + index].clone());
            }
            shard
        });

        let mut groups: HashMap<K, Vec<T>> = HashMap::new();
        for shard in shards {
            for (key, mut bucket) in shard {
                groups.entry(key).or_default().append(&mut bucket);
            }
        }
        groups
    }

    /// Builds a map from `key_fn(index, element)` to `value_fn(index, element)`.
    ///
    /// When several elements produce the same key, the last one wins in both modes.
    pub fn to_map<K, V, KF, VF>(&self, key_fn: KF, value_fn: VF) -> HashMap<K, V>
    where
        K: Eq + Hash + Send,
        V: Send,
        KF: Fn(usize, &T) -> K + Sync,
        VF: Fn(usize, &T) -> V + Sync,
    {
        let shards = self.map_pages(|offset, page| {
            page.iter()
                .enumerate()
                .map(|(index, element)| {
                    let index = offset + index;
                    (key_fn(index, element), value_fn(index, element))
                })
                .collect::<Vec<_>>()
        });

        shards.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn reduce_sum_for_every_page_size() {
        let stream = Stream::new(vec![1, 2, 3, 4]);
        let add = |acc: i64, value: &i64| acc + value;

        assert_eq!(stream.reduce(0, add, |a, b| a + b), 10);
        for page_size in 1..=5 {
            let parallel = stream.clone().parallel_with_setting(page_size, 2);
            assert_eq!(parallel.reduce(0, add, |a, b| a + b), 10);
        }
    }

    #[test]
    fn reduce_empty_returns_seed() {
        let stream = Stream::<u8>::default();
        assert_eq!(stream.reduce(7u32, |acc, _| acc + 1, |a, b| a + b), 7);
        assert_eq!(
            stream.parallel().reduce(7u32, |acc, _| acc + 1, |a, b| a + b),
            7
        );
    }

    #[test]
    fn reduce_keeps_page_order() {
        let stream = Stream::new("abcdefghij".chars().collect::<Vec<char>>());
        let concat = |acc: String, ch: &char| acc + &ch.to_string();

        for page_size in [1, 3, 4, 10] {
            let joined = stream
                .clone()
                .parallel_with_setting(page_size, 3)
                .reduce(String::new(), concat, |a, b| a + &b);
            assert_eq!(joined, "abcdefghij");
        }
    }

    #[test]
    fn group_by_buckets_in_input_order() {
        let words = vec!["apple", "bean", "avocado", "beet", "corn", "apricot"];

        for stream in [
            Stream::of(&words),
            Stream::of(&words).parallel_with_setting(2, 3),
        ] {
            let groups = stream.group_by(|word| word.chars().next());
            assert_eq!(groups.len(), 3);
            assert_eq!(groups[&Some('a')], vec!["apple", "avocado", "apricot"]);
            assert_eq!(groups[&Some('b')], vec!["bean", "beet"]);
            assert_eq!(groups[&Some('c')], vec!["corn"]);
        }
    }

    #[test]
    fn to_map_last_write_wins() {
        let values = vec![10, 21, 30, 41, 50];

        for stream in [
            Stream::of(&values),
            Stream::of(&values).parallel_with_setting(1, 4),
        ] {
            let map = stream.to_map(|_, value| value % 2, |index, value| (index, *value));
            assert_eq!(map.len(), 2);
            assert_eq!(map[&0], (4, 50));
            assert_eq!(map[&1], (3, 41));
        }
    }

    quickcheck! {
        fn parallel_sum_matches_sequential(values: Vec<i32>, page_size: usize) -> bool {
            let add = |acc: i64, value: &i32| acc + i64::from(*value);
            let stream = Stream::new(values);
            let sequential = stream.reduce(0, add, |a, b| a + b);
            let parallel = stream
                .parallel_with_setting(page_size % 16, 4)
                .reduce(0, add, |a, b| a + b);
            sequential == parallel
        }
    }
}
