//! Page-parallel streams over in-memory sequences.
//!
//! # Streams
//!
//! A [`Stream`] wraps an ordered sequence and offers chainable transformations.
//! Every stage returns a new stream, leaving its input untouched. Streams run
//! sequentially until [`stream.parallel()`](Stream::parallel) is called. Parallel stages
//! split the elements into pages and process each page on its own task, while the
//! output keeps the order of a sequential run.
//!
//! ```rust
//! use page_stream::Stream;
//!
//! let words = Stream::new(vec!["pear", "fig", "apple", "fig", "kiwi"]).parallel();
//!
//! let lengths = words.distinct().order_by(false, |word| word.len()).map(|word| word.len());
//! assert_eq!(lengths.to_list(), vec![3, 4, 4, 5]);
//! ```
//!
//! ## Transformations
//!
//! - [`map()`](Stream::map), [`flat_map()`](Stream::flat_map), [`filter()`](Stream::filter)
//!   and the fallible [`try_map()`](Stream::try_map), [`try_filter()`](Stream::try_filter).
//! - [`sort()`](Stream::sort), [`sort_by()`](Stream::sort_by), [`order_by()`](Stream::order_by)
//!   are stable in both modes.
//! - [`distinct()`](Stream::distinct) and [`distinct_by()`](Stream::distinct_by) keep the first
//!   occurrence of each key in original order.
//! - [`sub()`](Stream::sub), [`skip()`](Stream::skip), [`join()`](Stream::join),
//!   [`merge()`](Stream::merge), [`intersect()`](Stream::intersect) and
//!   [`difference()`](Stream::difference).
//!
//! ## Terminal Operations
//!
//! - [`reduce()`](Stream::reduce) folds pages and merges the partial results pairwise.
//! - [`group_by()`](Stream::group_by) and [`to_map()`](Stream::to_map) build hash maps.
//! - [`for_each()`](Stream::for_each), [`try_for_each()`](Stream::try_for_each),
//!   [`count()`](Stream::count), [`to_list()`](Stream::to_list) and [`collect()`](Stream::collect).
//!
//! # Pages
//!
//! [`partition()`] and [`partition_by_division()`] split a slice into pages. The
//! [`TaskRunner`] runs a function over the pages with at most a fixed number of tasks
//! alive, and joins the errors of every failed page instead of stopping at the first.
//!
//! ```rust
//! use page_stream::{partition, TaskRunner};
//!
//! let rows: Vec<u32> = (0..10).collect();
//! let result = TaskRunner::parallel(2).run(partition(&rows, 3).into_vec(), |index, page| {
//!     if page.contains(&4) {
//!         Err(format!("bad row in page {}", index))
//!     } else {
//!         Ok(())
//!     }
//! });
//!
//! let joined = result.unwrap_err();
//! assert_eq!(joined.pages().collect::<Vec<_>>(), vec![1]);
//! ```
//!
//! [`run_over_pages_async()`] does the same for async page functions on tokio.
//!
//! # Configure Parallelism
//!
//! The page size accepts a [`PageSize`]:
//!
//! - `PageSize::Quarter`, the default: a quarter of the input length.
//! - `100` or any integer: fixed pages of 100 elements.
//! - `PageSize::from_fn(f)`: computed from the input length.
//!
//! The task limit accepts a [`Count`]:
//!
//! - `None` or `0`: the number of system processors.
//! - `10` or non-zero integers: 10 tasks.
//! - `2.5` or non-zero floating points: 2.5 times the system processors.

/// Commonly used items.
pub mod prelude {
    pub use super::{entry::entry_set, slice::SliceExt, stream::Stream};
}

mod aggregate;
mod common;
mod config;
mod distinct;
mod element;
mod entry;
mod error;
mod limiter;
mod order;
mod runner;
mod slice;
mod stream;
mod utils;

pub use config::*;
pub use distinct::{DistinctStrategy, DISTINCT_HASH_THRESHOLD};
pub use element::*;
pub use entry::*;
pub use error::*;
pub use limiter::*;
pub use runner::*;
pub use slice::*;
pub use stream::*;
