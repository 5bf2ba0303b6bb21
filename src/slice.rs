use crate::{common::*, error::JoinedError, limiter::Limiter, runner, stream::Stream};

/// Splits `items` into contiguous pages of `page_size` elements. The last page may be shorter.
///
/// A zero `page_size` is treated as 1.
///
/// ```rust
/// let items: Vec<_> = (1..=10).collect();
/// let pages = page_stream::partition(&items, 3);
/// assert_eq!(pages.len(), 4);
/// assert_eq!(pages[3], &[10]);
/// ```
pub fn partition<T>(items: &[T], page_size: usize) -> Pages<'_, T> {
    let page_size = cmp::max(page_size, 1);
    Pages {
        page_size,
        pages: items.chunks(page_size).collect(),
    }
}

/// Splits `items` into at most `num_pages` pages of near-equal length.
///
/// If `num_pages` is `None`, it defaults to the number of system processors.
pub fn partition_by_division<T>(items: &[T], num_pages: impl Into<Option<usize>>) -> Pages<'_, T> {
    let num_pages = cmp::max(num_pages.into().unwrap_or_else(num_cpus::get), 1);
    let page_size = (items.len() + num_pages - 1) / num_pages;
    partition(items, page_size)
}

pub trait SliceExt<T> {
    /// Returns the pages of `page_size` elements of the slice. See [partition].
    fn pages(&self, page_size: usize) -> Pages<'_, T>;

    /// Returns at most `num_pages` pages of the slice. See [partition_by_division].
    fn pages_by_division(&self, num_pages: impl Into<Option<usize>>) -> Pages<'_, T>;
}

impl<T> SliceExt<T> for [T] {
    fn pages(&self, page_size: usize) -> Pages<'_, T> {
        partition(self, page_size)
    }

    fn pages_by_division(&self, num_pages: impl Into<Option<usize>>) -> Pages<'_, T> {
        partition_by_division(self, num_pages)
    }
}

/// An ordered partition of a slice. Concatenating the pages reproduces the slice.
#[derive(Debug, Clone)]
pub struct Pages<'a, T> {
    page_size: usize,
    pages: Vec<&'a [T]>,
}

impl<'a, T> Pages<'a, T> {
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, &'a [T]> {
        self.pages.iter()
    }

    pub fn into_vec(self) -> Vec<&'a [T]> {
        self.pages
    }

    /// Runs `f` over every page and joins the errors of all failed pages.
    ///
    /// Pages run one after another on the calling thread unless `parallel` is set,
    /// in which case each page gets its own task once `limiter` grants a permit.
    /// A failing page never stops the others.
    pub fn try_for_each<E, F>(
        &self,
        parallel: bool,
        limiter: &Limiter,
        f: F,
    ) -> Result<(), JoinedError<E>>
    where
        T: Sync,
        E: Send,
        F: Fn(usize, &'a [T]) -> Result<(), E> + Sync,
    {
        runner::run_over_pages(self.pages.clone(), parallel, limiter, f)
    }
}

impl<'a, T> Pages<'a, T>
where
    T: Clone + Send + Sync,
{
    /// Turns every page into an owned element of a new stream.
    pub fn into_stream(self) -> Stream<Vec<T>> {
        self.pages.into_iter().map(<[T]>::to_vec).collect()
    }
}

impl<'a, T> Deref for Pages<'a, T> {
    type Target = [&'a [T]];

    fn deref(&self) -> &Self::Target {
        &self.pages
    }
}

impl<'a, T> IntoIterator for Pages<'a, T> {
    type Item = &'a [T];
    type IntoIter = std::vec::IntoIter<&'a [T]>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn partition_ten_by_three() {
        let items: Vec<_> = (1..=10).collect();
        let pages = partition(&items, 3);
        assert_eq!(
            pages.into_vec(),
            vec![&[1, 2, 3][..], &[4, 5, 6], &[7, 8, 9], &[10]]
        );
    }

    #[test]
    fn partition_concat_is_identity() {
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let len = rng.gen_range(0..200);
            let page_size = rng.gen_range(0..40);
            let items: Vec<u32> = (0..len).map(|_| rng.gen()).collect();

            let pages = items.pages(page_size);
            let expect_pages = (len + pages.page_size() - 1) / pages.page_size();
            assert_eq!(pages.len(), expect_pages);
            itertools::assert_equal(pages.iter().flat_map(|page| page.iter()), &items);
        }
    }

    #[test]
    fn division_covers_slice() {
        let items: Vec<_> = (0..103).collect();
        let pages = items.pages_by_division(4);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages.page_size(), 26);
        assert_eq!(pages.concat(), items);

        let empty: Vec<u8> = vec![];
        assert!(empty.pages_by_division(None).is_empty());
    }

    #[test]
    fn pages_into_stream() {
        let items: Vec<_> = (0..5).collect();
        let stream = partition(&items, 2).into_stream();
        assert_eq!(stream.to_list(), vec![vec![0, 1], vec![2, 3], vec![4]]);
    }
}
