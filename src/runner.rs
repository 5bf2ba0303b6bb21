//! Page task dispatch.
//!
//! Every page is handed to exactly one task. In parallel mode a pool of at most
//! [Limiter::max_permits] scoped workers pulls pages from a channel, so the number of
//! threads never depends on the number of pages. All workers are joined before the call
//! returns.
//! Failures never short-circuit: every page runs and all errors are joined.

use crate::{
    common::*,
    config::Count,
    error::{join_results, JoinedError, PageError},
    limiter::{CancelToken, Limiter},
    utils,
};
use futures::future::{self, Future};
use log::{debug, warn};
use std::{any::Any, panic};

/// Runs `f` over every page and joins the errors of the failed pages.
///
/// See [TaskRunner::run] for the execution rules.
pub fn run_over_pages<P, E, F>(
    pages: Vec<P>,
    parallel: bool,
    limiter: &Limiter,
    f: F,
) -> Result<(), JoinedError<E>>
where
    P: Send,
    E: Send,
    F: Fn(usize, P) -> Result<(), E> + Sync,
{
    let outcomes = dispatch(pages, parallel, limiter, None, |index, page| {
        f(index, page).map_err(|error| PageError::Failed { page: index, error })
    });
    let result = join_results(outcomes.into_iter().flatten());

    if let Err(joined) = &result {
        warn!("{} page task(s) failed", joined.len());
    }
    result
}

/// Dispatches page tasks sequentially or in parallel under a [Limiter].
#[derive(Debug)]
pub struct TaskRunner {
    parallel: bool,
    limiter: Limiter,
    cancel: Option<CancelToken>,
}

impl TaskRunner {
    pub fn new(parallel: bool, max_tasks: impl Into<Count>) -> Self {
        Self {
            parallel,
            limiter: Limiter::new(max_tasks.into().to_absolute()),
            cancel: None,
        }
    }

    /// A runner processing pages one after another on the calling thread.
    pub fn sequential() -> Self {
        Self::new(false, 1)
    }

    /// A runner with at most `max_tasks` concurrent page tasks.
    pub fn parallel(max_tasks: impl Into<Count>) -> Self {
        Self::new(true, max_tasks)
    }

    /// Attaches a token that stops the dispatch of further pages once cancelled.
    ///
    /// It only affects [run()](TaskRunner::run) and [try_map_pages()](TaskRunner::try_map_pages).
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Runs `f(page_index, page)` over every page.
    ///
    /// Sequential runners process pages strictly in order. Parallel runners start at most
    /// `max_tasks` workers. Each worker takes the next page as soon as it is free and
    /// holds a permit while the page runs.
    /// A failing page never stops the others. Pages skipped because the cancel token tripped
    /// are reported as [PageError::Cancelled].
    ///
    /// ```rust
    /// use page_stream::{partition, TaskRunner};
    ///
    /// let items: Vec<u32> = (0..100).collect();
    /// let runner = TaskRunner::parallel(4);
    ///
    /// let result = runner.run(partition(&items, 25).into_vec(), |index, page| {
    ///     if index == 2 {
    ///         return Err(format!("bad page of {} rows", page.len()));
    ///     }
    ///     Ok(())
    /// });
    /// let joined = result.unwrap_err();
    /// assert_eq!(joined.pages().collect::<Vec<_>>(), vec![2]);
    /// ```
    pub fn run<P, E, F>(&self, pages: Vec<P>, f: F) -> Result<(), JoinedError<E>>
    where
        P: Send,
        E: Send,
        F: Fn(usize, P) -> Result<(), E> + Sync,
    {
        let outcome = self.try_map_pages(pages, f);
        outcome.into_result().map(|_| ())
    }

    /// Runs `f` over every page and keeps the outputs of the successful pages in page order.
    pub fn try_map_pages<P, R, E, F>(&self, pages: Vec<P>, f: F) -> PageOutcome<R, E>
    where
        P: Send,
        R: Send,
        E: Send,
        F: Fn(usize, P) -> Result<R, E> + Sync,
    {
        let slots = dispatch(
            pages,
            self.parallel,
            &self.limiter,
            self.cancel.as_ref(),
            |index, page| f(index, page),
        );

        let mut outputs = Vec::with_capacity(slots.len());
        let mut errors = vec![];

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(output)) => outputs.push(Some(output)),
                Some(Err(error)) => {
                    outputs.push(None);
                    errors.push(PageError::Failed { page: index, error });
                }
                None => {
                    outputs.push(None);
                    errors.push(PageError::Cancelled { page: index });
                }
            }
        }

        let error = JoinedError::join(errors);
        if let Some(joined) = &error {
            warn!("{} of {} page task(s) did not succeed", joined.len(), outputs.len());
        }

        PageOutcome { outputs, error }
    }

    /// Runs `f` over every page and returns the outputs in page order.
    ///
    /// The cancel token is not consulted.
    pub fn map_pages<P, R, F>(&self, pages: Vec<P>, f: F) -> Vec<R>
    where
        P: Send,
        R: Send,
        F: Fn(usize, P) -> R + Sync,
    {
        dispatch(pages, self.parallel, &self.limiter, None, f)
            .into_iter()
            .flatten()
            .collect()
    }

    /// Combines adjacent items pairwise, round after round, until one is left.
    ///
    /// The pairs of one round run as separate tasks. Item order is kept, so the
    /// result equals a left fold whenever `f` is associative.
    pub fn reduce_pairwise<A, F>(&self, mut items: Vec<A>, f: F) -> Option<A>
    where
        A: Send,
        F: Fn(A, A) -> A + Sync,
    {
        while items.len() > 1 {
            let mut iter = items.into_iter();
            let mut pairs = vec![];
            while let Some(lhs) = iter.next() {
                pairs.push((lhs, iter.next()));
            }

            items = self.map_pages(pairs, |_, (lhs, rhs)| match rhs {
                Some(rhs) => f(lhs, rhs),
                None => lhs,
            });
        }
        items.pop()
    }
}

/// Outputs of a fallible page run together with the joined error of the failed pages.
#[derive(Debug)]
pub struct PageOutcome<R, E> {
    /// One slot per page in page order. Failed and cancelled pages have `None`.
    pub outputs: Vec<Option<R>>,
    pub error: Option<JoinedError<E>>,
}

impl<R, E> PageOutcome<R, E> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returns all outputs in page order, or the joined error if any page failed.
    pub fn into_result(self) -> Result<Vec<R>, JoinedError<E>> {
        match self.error {
            Some(joined) => Err(joined),
            None => Ok(self.outputs.into_iter().flatten().collect()),
        }
    }
}

fn dispatch<P, R, F>(
    pages: Vec<P>,
    parallel: bool,
    limiter: &Limiter,
    cancel: Option<&CancelToken>,
    f: F,
) -> Vec<Option<R>>
where
    P: Send,
    R: Send,
    F: Fn(usize, P) -> R + Sync,
{
    let is_cancelled = || cancel.map_or(false, CancelToken::is_cancelled);
    let num_pages = pages.len();

    if !parallel || num_pages <= 1 {
        return pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| (!is_cancelled()).then(|| f(index, page)))
            .collect();
    }

    let num_workers = cmp::min(limiter.max_permits(), num_pages);
    debug!("dispatching {} pages on {} workers", num_pages, num_workers);

    let (page_tx, page_rx) = utils::channel(None);
    let (output_tx, output_rx) = utils::channel(None);
    pages.into_iter().enumerate().for_each(|item| {
        // the receiver is held below, so the send cannot fail
        let _ = page_tx.send(item);
    });
    drop(page_tx);

    let f = &f;
    let is_cancelled = &is_cancelled;

    let joined = crossbeam::scope(|scope| {
        (0..num_workers).for_each(|_| {
            let page_rx = page_rx.clone();
            let output_tx = output_tx.clone();

            scope.spawn(move |_| {
                while let Ok((index, page)) = page_rx.recv() {
                    let permit = limiter.acquire();
                    if is_cancelled() {
                        continue;
                    }
                    let output = f(index, page);
                    drop(permit);
                    let _ = output_tx.send((index, output));
                }
            });
        });
    });
    drop(output_tx);

    if let Err(payload) = joined {
        // crossbeam collects the payloads of all panicked tasks
        let payload: Box<dyn Any + Send> = match payload.downcast::<Vec<Box<dyn Any + Send>>>() {
            Ok(mut panics) if !panics.is_empty() => panics.swap_remove(0),
            Ok(panics) => panics,
            Err(payload) => payload,
        };
        panic::resume_unwind(payload);
    }

    let slots = utils::reorder_enumerated(num_pages, output_rx.try_iter());
    let skipped = slots.iter().filter(|slot| slot.is_none()).count();
    if skipped > 0 {
        warn!("cancelled, skipped {} of {} pages", skipped, num_pages);
    }
    slots
}

/// Runs the asynchronous `f(page_index, page)` over every page on the tokio runtime.
///
/// At most `max_tasks` pages run at the same time. Like [run_over_pages], every page
/// runs to completion and all failures are joined. It must be called within a tokio runtime.
pub async fn run_over_pages_async<P, E, F, Fut>(
    pages: Vec<P>,
    max_tasks: impl Into<Count>,
    f: F,
) -> Result<(), JoinedError<E>>
where
    P: 'static + Send,
    E: 'static + Send,
    F: 'static + Fn(usize, P) -> Fut + Send + Sync,
    Fut: 'static + Future<Output = Result<(), E>> + Send,
{
    let max_tasks = max_tasks.into().to_absolute();
    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_tasks));
    let f = Arc::new(f);

    debug!(
        "dispatching {} async pages on at most {} tasks",
        pages.len(),
        max_tasks
    );

    let mut handles = Vec::with_capacity(pages.len());
    for (index, page) in pages.into_iter().enumerate() {
        // the semaphore is never closed, so acquiring cannot fail
        let permit = semaphore.clone().acquire_owned().await;
        let f = f.clone();

        handles.push(tokio::spawn(async move {
            let result = f(index, page).await;
            drop(permit);
            result.map_err(|error| PageError::Failed { page: index, error })
        }));
    }

    let outcomes = future::join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(_) => Err(PageError::Cancelled { page: index }),
        });

    let result = join_results(outcomes);
    if let Err(joined) = &result {
        warn!("{} async page task(s) failed", joined.len());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashSet;
    use rand::prelude::*;
    use std::{sync::atomic::AtomicUsize, thread, time::Duration};

    #[test]
    fn failing_page_does_not_stop_others() {
        let items: Vec<_> = (0..16).collect();
        let visited = AtomicUsize::new(0);

        for parallel in [false, true] {
            visited.store(0, SeqCst);
            let limiter = Limiter::new(2);
            let pages = crate::partition(&items, 4).into_vec();

            let joined = run_over_pages(pages, parallel, &limiter, |index, page| {
                visited.fetch_add(1, SeqCst);
                if index == 1 {
                    Err(format!("page starting at {} failed", page[0]))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();

            assert_eq!(visited.load(SeqCst), 4);
            assert_eq!(joined.len(), 1);
            assert_eq!(
                joined.errors()[0],
                PageError::Failed {
                    page: 1,
                    error: "page starting at 4 failed".to_string()
                }
            );
        }
    }

    #[test]
    fn map_pages_keeps_page_order() {
        let mut rng = rand::thread_rng();
        let delays: Vec<u64> = (0..32).map(|_| rng.gen_range(0..5)).collect();
        let runner = TaskRunner::parallel(8);

        let outputs = runner.map_pages(delays.clone(), |index, delay| {
            thread::sleep(Duration::from_millis(delay));
            index
        });
        itertools::assert_equal(outputs, 0..32);
    }

    #[test]
    fn limiter_bounds_running_pages() {
        let runner = TaskRunner::parallel(3);
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        runner.map_pages((0..24).collect(), |_, _: usize| {
            let now = running.fetch_add(1, SeqCst) + 1;
            peak.fetch_max(now, SeqCst);
            thread::sleep(Duration::from_millis(2));
            running.fetch_sub(1, SeqCst);
        });

        assert!(peak.load(SeqCst) <= 3);
        assert_eq!(runner.limiter().available(), 3);
    }

    #[test]
    fn many_pages_share_bounded_workers() {
        let runner = TaskRunner::parallel(4);
        let threads = DashSet::new();

        let outputs = runner.map_pages((0..150_000).collect(), |index, page: usize| {
            threads.insert(thread::current().id());
            index + page
        });

        assert!(threads.len() <= 4);
        itertools::assert_equal(outputs, (0..150_000).map(|n| n * 2));
    }

    #[test]
    fn parallel_cancel_skips_remaining_pages() {
        let token = CancelToken::new();
        let runner = TaskRunner::parallel(2).with_cancel_token(token.clone());

        let outcome = runner.try_map_pages((0..1_000).collect(), |index, page: u32| {
            if index == 3 {
                token.cancel();
            } else if index > 3 {
                thread::sleep(Duration::from_millis(1));
            }
            Ok::<_, String>(page)
        });

        assert_eq!(outcome.outputs[3], Some(3));
        assert_eq!(outcome.outputs[999], None);

        let joined = outcome.error.unwrap();
        assert!(joined.errors().iter().all(PageError::is_cancelled));
        assert_eq!(
            outcome.outputs.iter().flatten().count() + joined.len(),
            1_000
        );
    }

    #[test]
    fn cancelled_pages_are_reported() {
        let token = CancelToken::new();
        let runner = TaskRunner::sequential().with_cancel_token(token.clone());

        let outcome = runner.try_map_pages((0..5).collect(), |index, page: i32| {
            if index == 1 {
                token.cancel();
            }
            Ok::<_, String>(page * 10)
        });

        assert_eq!(
            outcome.outputs,
            vec![Some(0), Some(10), None, None, None]
        );
        let joined = outcome.error.unwrap();
        itertools::assert_equal(joined.pages(), [2, 3, 4]);
        assert!(joined.errors().iter().all(PageError::is_cancelled));
    }

    #[test]
    fn partial_outputs_survive_failures() {
        let runner = TaskRunner::parallel(4);
        let outcome = runner.try_map_pages(vec![1, 2, 3, 4], |_, value: i32| {
            if value % 2 == 0 {
                Err(value)
            } else {
                Ok(value * 100)
            }
        });

        assert!(!outcome.is_ok());
        assert_eq!(outcome.outputs, vec![Some(100), None, Some(300), None]);
        assert!(outcome.into_result().is_err());
    }

    #[test]
    fn reduce_pairwise_keeps_order() {
        for parallel in [false, true] {
            let runner = TaskRunner::new(parallel, 4);
            let words: Vec<String> = (0..11).map(|n| n.to_string()).collect();
            let joined = runner.reduce_pairwise(words, |lhs, rhs| lhs + &rhs);
            assert_eq!(joined.as_deref(), Some("012345678910"));
        }
        assert_eq!(
            TaskRunner::sequential().reduce_pairwise(Vec::<u8>::new(), |a, b| a + b),
            None
        );
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panics_propagate_after_join() {
        TaskRunner::parallel(2).map_pages(vec![0, 1, 2, 3], |index, _: i32| {
            if index == 2 {
                panic!("boom");
            }
        });
    }

    #[tokio::test]
    async fn async_pages_join_every_error() {
        let visited = Arc::new(AtomicUsize::new(0));
        let pages: Vec<Vec<u32>> = (0..4).map(|n| vec![n; 3]).collect();

        let joined = {
            let visited = visited.clone();
            run_over_pages_async(pages, 2, move |index, page| {
                let visited = visited.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(u64::from(page[0]))).await;
                    visited.fetch_add(1, SeqCst);
                    if index == 3 {
                        Err("write rejected")
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap_err()
        };

        assert_eq!(visited.load(SeqCst), 4);
        itertools::assert_equal(joined.pages(), [3]);
    }
}
