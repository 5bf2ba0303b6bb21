use crate::{
    common::*,
    config::{Count, PageSize, ParConfig, ParParams},
    element::{Element, Elements},
    error::JoinedError,
    runner::TaskRunner,
    slice::partition,
};

/// A chainable pipeline over an in-memory ordered sequence.
///
/// Each transformation returns a new stream and leaves the original untouched.
/// Execution is sequential until [parallel()](Stream::parallel) is called, after which
/// stages split the elements into pages and process each page on its own task.
///
/// ```rust
/// use page_stream::Stream;
///
/// let doubled_odds = Stream::new((0..1000).collect())
///     .parallel()
///     .filter(|value| value % 2 == 1)
///     .map(|value| value * 2);
///
/// assert_eq!(doubled_odds.count(), 500);
/// assert_eq!(doubled_odds.to_list()[..3], [2, 6, 10]);
/// ```
#[derive(Derivative)]
#[derivative(Debug(bound = "T: Debug"), Clone(bound = "T: Clone"))]
pub struct Stream<T> {
    pub(crate) elements: Vec<Element<T>>,
    /// Backing values, index-aligned with `elements`.
    pub(crate) source: Arc<[T]>,
    pub(crate) parallel: bool,
    pub(crate) config: ParConfig,
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync,
{
    /// Wraps a sequence into a sequential stream.
    pub fn new(source: Vec<T>) -> Self {
        let elements = source.iter().cloned().map(Element::new).collect();
        Self {
            elements,
            source: source.into(),
            parallel: false,
            config: ParConfig::default(),
        }
    }

    /// Wraps a copy of `source` into a sequential stream.
    pub fn of(source: &[T]) -> Self {
        Self::new(source.to_vec())
    }

    /// Wraps a sequence into a stream with parallel execution enabled.
    pub fn parallel_from(source: Vec<T>) -> Self {
        Self::new(source).parallel()
    }

    /// Creates a stream over `items` that inherits this stream's execution settings.
    pub(crate) fn derive<R>(&self, items: Vec<R>) -> Stream<R>
    where
        R: Clone + Send + Sync,
    {
        Stream {
            parallel: self.parallel,
            config: self.config.clone(),
            ..Stream::new(items)
        }
    }

    /// Creates a stream from backing values at `indices`.
    pub(crate) fn pick(&self, indices: impl IntoIterator<Item = usize>) -> Self {
        let items = indices
            .into_iter()
            .map(|index| self.source[index].clone())
            .collect();
        self.derive(items)
    }

    // configuration

    /// Enables parallel execution of the following stages.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Disables parallel execution of the following stages.
    pub fn un_parallel(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enables parallel execution with the given page size policy and task limit.
    pub fn parallel_with_setting(
        self,
        page_size: impl Into<PageSize>,
        max_tasks: impl Into<Count>,
    ) -> Self {
        self.with_page_size(page_size)
            .with_max_tasks(max_tasks)
            .parallel()
    }

    pub fn with_page_size(mut self, page_size: impl Into<PageSize>) -> Self {
        self.config.page_size = page_size.into();
        self
    }

    pub fn with_max_tasks(mut self, max_tasks: impl Into<Count>) -> Self {
        self.config.max_tasks = max_tasks.into();
        self
    }

    pub fn with_config(mut self, config: impl Into<ParConfig>) -> Self {
        self.config = config.into();
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn config(&self) -> &ParConfig {
        &self.config
    }

    // execution helpers

    pub(crate) fn params(&self) -> ParParams {
        self.config.params(self.elements.len())
    }

    pub(crate) fn runner(&self) -> TaskRunner {
        TaskRunner::new(self.parallel, self.params().max_tasks)
    }

    /// Page size of the current stage. Sequential stages use a single page.
    pub(crate) fn page_size(&self) -> usize {
        if self.parallel {
            self.params().page_size
        } else {
            self.elements.len()
        }
    }

    /// Pages of the current elements, each paired with the index of its first element.
    pub(crate) fn pages(&self) -> Vec<(usize, &[Element<T>])> {
        let page_size = self.page_size();
        partition(&self.elements, page_size)
            .into_iter()
            .enumerate()
            .map(|(index, page)| (index * cmp::max(page_size, 1), page))
            .collect()
    }

    /// Runs `f(offset, page)` over every page and returns the outputs in page order.
    pub(crate) fn map_pages<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize, &[Element<T>]) -> R + Sync,
    {
        self.runner()
            .map_pages(self.pages(), |_, (offset, page)| f(offset, page))
    }

    // transformations

    /// Maps every element with `f`. The output keeps the input order in both modes.
    pub fn map<R, F>(&self, f: F) -> Stream<R>
    where
        R: Clone + Send + Sync,
        F: Fn(&T) -> R + Sync,
    {
        let mapped = self.map_pages(|_, page| {
            page.iter()
                .map(|element| f(element))
                .collect::<Vec<_>>()
        });
        self.derive(mapped.into_iter().flatten().collect())
    }

    /// Maps every element with the fallible `f`.
    ///
    /// A page stops at its first error, but every page runs. The errors of all
    /// failed pages are joined.
    pub fn try_map<R, E, F>(&self, f: F) -> Result<Stream<R>, JoinedError<E>>
    where
        R: Clone + Send + Sync,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync,
    {
        let mapped = self
            .runner()
            .try_map_pages(self.pages(), |_, (_, page)| {
                page.iter()
                    .map(|element| f(element))
                    .collect::<Result<Vec<_>, _>>()
            })
            .into_result()?;
        Ok(self.derive(mapped.into_iter().flatten().collect()))
    }

    /// Maps every element to a stream and concatenates the streams in element order.
    pub fn flat_map<R, F>(&self, f: F) -> Stream<R>
    where
        R: Clone + Send + Sync,
        F: Fn(&T) -> Stream<R> + Sync,
    {
        let mapped = self.map_pages(|_, page| {
            page.iter()
                .flat_map(|element| f(element).into_list())
                .collect::<Vec<_>>()
        });
        self.derive(mapped.into_iter().flatten().collect())
    }

    /// Keeps the elements for which `f` returns true, in their original order.
    ///
    /// Surviving elements are taken from the backing sequence.
    pub fn filter<F>(&self, f: F) -> Self
    where
        F: Fn(&T) -> bool + Sync,
    {
        let kept = self.map_pages(|offset, page| {
            page.iter()
                .enumerate()
                .filter(|(_, element)| f(element))
                .map(|(index, _)| offset + index)
                .collect::<Vec<_>>()
        });
        self.pick(kept.into_iter().flatten())
    }

    /// Keeps the elements for which the fallible `f` returns `Ok(true)`.
    pub fn try_filter<E, F>(&self, f: F) -> Result<Self, JoinedError<E>>
    where
        E: Send,
        F: Fn(&T) -> Result<bool, E> + Sync,
    {
        let kept = self
            .runner()
            .try_map_pages(self.pages(), |_, (offset, page)| {
                let mut kept = vec![];
                for (index, element) in page.iter().enumerate() {
                    if f(element)? {
                        kept.push(offset + index);
                    }
                }
                Ok(kept)
            })
            .into_result()?;
        Ok(self.pick(kept.into_iter().flatten()))
    }

    // slicing and set operations

    /// Returns the elements in `begin..end`.
    ///
    /// Negative indexes count from the end. Out-of-range bounds are clamped.
    pub fn sub(&self, begin: isize, end: isize) -> Self {
        let len = self.source.len() as isize;
        let resolve = |index: isize| {
            let index = if index < 0 { len + index } else { index };
            index.clamp(0, len) as usize
        };
        let end = resolve(end);
        let begin = cmp::min(resolve(begin), end);
        self.pick(begin..end)
    }

    /// Skips the first `n` elements.
    pub fn skip(&self, n: usize) -> Self {
        let begin = cmp::min(n, self.source.len());
        self.pick(begin..self.source.len())
    }

    /// Appends `other` after the elements of this stream.
    pub fn join<I>(&self, other: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let items = self.source.iter().cloned().chain(other).collect();
        self.derive(items)
    }

    /// Appends the elements of another stream or slice.
    pub fn merge(&self, other: impl AsRef<[T]>) -> Self {
        self.join(other.as_ref().iter().cloned())
    }

    /// Keeps the elements equal to some element of `other`.
    pub fn intersect(&self, other: impl AsRef<[T]>) -> Self
    where
        T: PartialEq,
    {
        self.intersect_with(other, |lhs, rhs| lhs == rhs)
    }

    /// Keeps the elements for which `eq` matches some element of `other`.
    pub fn intersect_with<F>(&self, other: impl AsRef<[T]>, eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Sync,
    {
        let other = other.as_ref();
        self.filter(|item| other.iter().any(|rhs| eq(item, rhs)))
    }

    /// Keeps the elements not equal to any element of `other`.
    pub fn difference(&self, other: impl AsRef<[T]>) -> Self
    where
        T: PartialEq,
    {
        self.difference_with(other, |lhs, rhs| lhs == rhs)
    }

    /// Keeps the elements for which `eq` matches no element of `other`.
    pub fn difference_with<F>(&self, other: impl AsRef<[T]>, eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Sync,
    {
        let other = other.as_ref();
        self.filter(|item| !other.iter().any(|rhs| eq(item, rhs)))
    }

    // terminal operations

    /// Calls `f` on every element.
    ///
    /// In parallel mode only the order within a page is fixed.
    pub fn for_each<F>(&self, f: F)
    where
        F: Fn(&T) + Sync,
    {
        self.map_pages(|_, page| page.iter().for_each(|element| f(element)));
    }

    /// Calls the fallible `f` on every element.
    ///
    /// A page stops at its first error, but every page runs to completion and
    /// the errors of all failed pages are joined.
    pub fn try_for_each<E, F>(&self, f: F) -> Result<(), JoinedError<E>>
    where
        E: Send,
        F: Fn(&T) -> Result<(), E> + Sync,
    {
        self.runner().run(self.pages(), |_, (_, page)| {
            page.iter().try_for_each(|element| f(element))
        })
    }

    pub fn count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn to_list(&self) -> Vec<T> {
        self.elements
            .iter()
            .map(|element| element.get().clone())
            .collect()
    }

    pub fn into_list(self) -> Vec<T> {
        self.elements.into_iter().map(Element::into_inner).collect()
    }

    pub fn to_option_list(&self) -> Elements<T> {
        self.elements.clone().into()
    }

    /// Hands the element slots and the backing values to `f`.
    pub fn collect<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[Element<T>], &[T]) -> R,
    {
        f(&self.elements, &self.source)
    }
}

impl<T> Default for Stream<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new(vec![])
    }
}

impl<T> From<Vec<T>> for Stream<T>
where
    T: Clone + Send + Sync,
{
    fn from(source: Vec<T>) -> Self {
        Self::new(source)
    }
}

impl<T> FromIterator<T> for Stream<T>
where
    T: Clone + Send + Sync,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for Stream<T> {
    type Item = T;
    type IntoIter = iter::Map<std::vec::IntoIter<Element<T>>, fn(Element<T>) -> T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements
            .into_iter()
            .map(Element::into_inner as fn(Element<T>) -> T)
    }
}

impl<T> AsRef<[T]> for Stream<T> {
    fn as_ref(&self) -> &[T] {
        &self.source
    }
}
