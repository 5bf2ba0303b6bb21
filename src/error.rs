use crate::common::*;
use thiserror::Error;

/// The failure of a single page task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError<E> {
    #[error("page {page} failed: {error}")]
    Failed { page: usize, error: E },
    #[error("page {page} was cancelled before it started")]
    Cancelled { page: usize },
}

impl<E> PageError<E> {
    pub fn page(&self) -> usize {
        match *self {
            Self::Failed { page, .. } => page,
            Self::Cancelled { page } => page,
        }
    }

    /// Returns the callback error, or `None` for a cancelled page.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// All page failures of one terminal call, sorted by page index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedError<E> {
    errors: Vec<PageError<E>>,
}

impl<E> JoinedError<E> {
    /// Joins `errors` into one value, or returns `None` if there is nothing to join.
    pub fn join(mut errors: Vec<PageError<E>>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        errors.sort_by_key(|error| error.page());
        Some(Self { errors })
    }

    pub fn errors(&self) -> &[PageError<E>] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<PageError<E>> {
        self.errors
    }

    /// Indexes of the pages that failed or were skipped.
    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.errors.iter().map(PageError::page)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<E> IntoIterator for JoinedError<E> {
    type Item = PageError<E>;
    type IntoIter = std::vec::IntoIter<PageError<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<E: Display> Display for JoinedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} page(s) failed: ", self.errors.len())?;
        for (idx, error) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl<E: Debug + Display> std::error::Error for JoinedError<E> {}

/// Converts per-page outcomes into the joined error, keeping no successful value.
pub(crate) fn join_results<E>(
    outcomes: impl IntoIterator<Item = Result<(), PageError<E>>>,
) -> Result<(), JoinedError<E>> {
    let errors: Vec<_> = outcomes.into_iter().filter_map(Result::err).collect();
    match JoinedError::join(errors) {
        Some(joined) => Err(joined),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_error_lists_pages_in_order() {
        let joined = JoinedError::join(vec![
            PageError::Failed {
                page: 3,
                error: "disk full",
            },
            PageError::Cancelled { page: 5 },
            PageError::Failed {
                page: 1,
                error: "bad row",
            },
        ])
        .unwrap();

        itertools::assert_equal(joined.pages(), [1, 3, 5]);
        assert_eq!(
            joined.to_string(),
            "3 page(s) failed: page 1 failed: bad row; page 3 failed: disk full; \
             page 5 was cancelled before it started"
        );
        assert!(joined.errors()[2].is_cancelled());
        assert_eq!(joined.errors()[0].error(), Some(&"bad row"));
    }

    #[test]
    fn nothing_to_join() {
        assert!(JoinedError::<String>::join(vec![]).is_none());
        assert!(join_results::<String>(vec![Ok(()), Ok(())]).is_ok());
    }
}
