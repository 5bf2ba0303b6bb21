use crate::{common::*, stream::Stream};

/// A slot holding one element of a [Stream].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Element<T>(T);

impl<T> Element<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Element<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for Element<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The element slots of a stream, as returned by [Stream::to_option_list].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Elements<T>(Vec<Element<T>>);

impl<T> Elements<T> {
    /// Calls `f` on every element in order. The elements cannot be modified.
    pub fn for_each<F>(&self, mut f: F) -> &Self
    where
        F: FnMut(&T),
    {
        self.0.iter().for_each(|element| f(element.get()));
        self
    }

    pub fn into_vec(self) -> Vec<Element<T>> {
        self.0
    }

    /// Unwraps the slots into plain values.
    pub fn into_values(self) -> Vec<T> {
        self.0.into_iter().map(Element::into_inner).collect()
    }
}

impl<T> Elements<T>
where
    T: Clone + Send + Sync,
{
    pub fn into_stream(self) -> Stream<T> {
        Stream::new(self.into_values())
    }
}

impl<T> From<Vec<Element<T>>> for Elements<T> {
    fn from(elements: Vec<Element<T>>) -> Self {
        Self(elements)
    }
}

impl<T> Deref for Elements<T> {
    type Target = [Element<T>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> IntoIterator for Elements<T> {
    type Item = Element<T>;
    type IntoIter = std::vec::IntoIter<Element<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
