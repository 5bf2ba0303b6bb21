use crate::{common::*, runner::TaskRunner, stream::Stream, utils};

/// Stable sort of `items` by `compare` on the runner.
///
/// Parallel runners sort pages of `page_size` items on separate tasks, then merge
/// adjacent sorted pages pairwise until one is left. Ties keep input order, so the
/// output matches a sequential stable sort element for element.
pub(crate) fn sort_by<T, F>(
    mut items: Vec<T>,
    runner: &TaskRunner,
    page_size: usize,
    compare: &F,
) -> Vec<T>
where
    T: Send,
    F: Fn(&T, &T) -> Ordering + Sync,
{
    let page_size = cmp::max(page_size, 1);

    if !runner.is_parallel() || items.len() <= page_size {
        items.sort_by(compare);
        return items;
    }

    let sorted = runner.map_pages(split_owned(items, page_size), |_, mut page| {
        page.sort_by(compare);
        page
    });
    runner
        .reduce_pairwise(sorted, |lhs, rhs| merge_sorted(lhs, rhs, compare))
        .unwrap_or_default()
}

/// Splits `items` into owned pages of `page_size` items, keeping order.
fn split_owned<T>(items: Vec<T>, page_size: usize) -> Vec<Vec<T>> {
    let mut pages = Vec::with_capacity((items.len() + page_size - 1) / page_size);
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        pages.push(iter.by_ref().take(page_size).collect());
    }
    pages
}

/// Merges two sorted runs. On ties the item from `lhs` goes first.
pub(crate) fn merge_sorted<T, F>(lhs: Vec<T>, rhs: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
    let mut lhs = lhs.into_iter().peekable();
    let mut rhs = rhs.into_iter().peekable();

    loop {
        let take_rhs = match (lhs.peek(), rhs.peek()) {
            (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };

        if take_rhs {
            merged.extend(rhs.next());
        } else {
            merged.extend(lhs.next());
        }
    }

    merged
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync,
{
    /// Stable sort by a comparator.
    ///
    /// The parallel result is identical to the sequential one.
    pub fn sort_by<F>(&self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Sync,
    {
        let sorted = sort_by(self.to_list(), &self.runner(), self.page_size(), &compare);
        self.derive(sorted)
    }

    /// Stable sort by a "less than" predicate.
    pub fn sort<F>(&self, less: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Sync,
    {
        self.sort_by(|lhs, rhs| utils::less_to_ordering(&less, lhs, rhs))
    }

    /// Stable sort by the natural order of the elements.
    pub fn sorted(&self) -> Self
    where
        T: Ord,
    {
        self.sort_by(T::cmp)
    }

    /// Stable sort by the key computed once per element, descending if `desc` is set.
    ///
    /// ```rust
    /// use page_stream::Stream;
    ///
    /// let words = Stream::new(vec!["pear", "fig", "apple", "kiwi"]);
    /// let by_len = words.order_by(true, |word| word.len());
    /// assert_eq!(by_len.to_list(), vec!["apple", "pear", "kiwi", "fig"]);
    /// ```
    pub fn order_by<K, F>(&self, desc: bool, key_fn: F) -> Self
    where
        K: Ord + Send,
        F: Fn(&T) -> K + Sync,
    {
        let keyed: Vec<(K, T)> = self
            .map_pages(|_, page| {
                page.iter()
                    .map(|element| (key_fn(element), element.get().clone()))
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();

        let compare = |lhs: &(K, T), rhs: &(K, T)| {
            let ordering = lhs.0.cmp(&rhs.0);
            if desc {
                ordering.reverse()
            } else {
                ordering
            }
        };
        let sorted = sort_by(keyed, &self.runner(), self.page_size(), &compare);
        self.derive(sorted.into_iter().map(|(_, item)| item).collect())
    }

    /// Stable sort by an integer id, descending if `desc` is set.
    pub fn order_by_id<F>(&self, desc: bool, id_fn: F) -> Self
    where
        F: Fn(&T) -> i64 + Sync,
    {
        self.order_by(desc, id_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    fn random_users(len: usize) -> Vec<User> {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|index| User {
                id: rng.gen_range(0..50),
                name: format!("user-{}", index),
            })
            .collect()
    }

    #[test]
    fn merge_prefers_left_on_ties() {
        let lhs = vec![(1, 'a'), (2, 'b'), (2, 'c')];
        let rhs = vec![(0, 'x'), (2, 'y'), (3, 'z')];
        let merged = merge_sorted(lhs, rhs, &|l: &(i32, char), r: &(i32, char)| l.0.cmp(&r.0));
        assert_eq!(
            merged,
            vec![(0, 'x'), (1, 'a'), (2, 'b'), (2, 'c'), (2, 'y'), (3, 'z')]
        );
    }

    #[test]
    fn split_owned_keeps_order() {
        let pages = split_owned((0..7).collect(), 3);
        assert_eq!(pages, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
    }

    #[test]
    fn parallel_sort_equals_sequential() {
        let users = random_users(20_000);

        let sequential = Stream::of(&users).sort(|a, b| a.id < b.id).to_list();
        for page_size in [1, 7, 256, 5_000, 50_000] {
            let parallel = Stream::of(&users)
                .parallel_with_setting(page_size, 4)
                .sort(|a, b| a.id < b.id)
                .to_list();
            assert_eq!(parallel, sequential);
        }

        let mut expect = users.clone();
        expect.sort_by_key(|user| user.id);
        assert_eq!(sequential, expect);
    }

    #[test]
    fn sort_over_many_single_element_pages() {
        let values: Vec<u32> = (0..100_000).rev().collect();
        let sorted = Stream::new(values).parallel_with_setting(1, 4).sorted();
        itertools::assert_equal(sorted, 0..100_000);
    }

    #[test]
    fn order_by_is_stable_in_both_directions() {
        let users = random_users(3_000);

        for desc in [false, true] {
            let mut expect = users.clone();
            if desc {
                expect.sort_by(|a, b| b.id.cmp(&a.id));
            } else {
                expect.sort_by(|a, b| a.id.cmp(&b.id));
            }

            let sequential = Stream::of(&users).order_by_id(desc, |user| user.id);
            let parallel = Stream::of(&users)
                .parallel_with_setting(100, 3)
                .order_by(desc, |user| user.id);

            assert_eq!(sequential.to_list(), expect);
            assert_eq!(parallel.to_list(), expect);
        }
    }

    #[test]
    fn sorted_empty_and_single() {
        assert!(Stream::<u8>::default().parallel().sorted().is_empty());
        assert_eq!(Stream::new(vec![4]).parallel().sorted().to_list(), vec![4]);
        assert_eq!(
            Stream::new(vec![3, 1, 2]).parallel_with_setting(1, 2).sorted().to_list(),
            vec![1, 2, 3]
        );
    }
}
