//! Bounded worker pool driven by a token queue.
//!
//! The calling thread is the coordinator: it admits work by pushing
//! [`Token::Continue`] into a queue whose capacity equals the number of
//! workers, and stops the pool by pushing one [`Token::Stop`] per live
//! worker. Workers pop a token, run at most one trial per `Continue`, and
//! exit on `Stop` or after a fatal error.

use core::time::Duration;
use std::collections::VecDeque;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result, panic_message};
use crate::objective::{Catch, Objective};
use crate::storage::Storage;

use super::Study;
use super::optimize::OptimizeOptions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    /// Run one more trial.
    Continue,
    /// Exit the worker loop.
    Stop,
}

struct QueueState {
    tokens: VecDeque<Token>,
    live_workers: usize,
}

/// A bounded FIFO of tokens shared by the coordinator and the workers.
pub(crate) struct TokenQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    not_empty: Condvar,
    /// Signalled when a slot frees up or a worker exits.
    changed: Condvar,
}

impl TokenQueue {
    /// A full queue of `Continue` tokens, one per worker.
    pub(crate) fn seeded(workers: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                tokens: core::iter::repeat_n(Token::Continue, workers).collect(),
                live_workers: workers,
            }),
            capacity: workers,
            not_empty: Condvar::new(),
            changed: Condvar::new(),
        }
    }

    /// Queue `token`, waiting at most `wait` for a free slot.
    ///
    /// Returns `false` if the queue was still full. The wait ends early when
    /// a worker pops a token or exits.
    pub(crate) fn push_timeout(&self, token: Token, wait: Duration) -> bool {
        let mut state = self.state.lock();
        if state.tokens.len() >= self.capacity {
            let _ = self.changed.wait_for(&mut state, wait);
            if state.tokens.len() >= self.capacity {
                return false;
            }
        }
        state.tokens.push_back(token);
        self.not_empty.notify_one();
        true
    }

    /// Queue a `Stop` token, waiting as long as some worker can still make
    /// room. Returns `false` once no worker is left to receive it.
    pub(crate) fn push_stop(&self) -> bool {
        let mut state = self.state.lock();
        while state.tokens.len() >= self.capacity {
            if state.live_workers == 0 {
                return false;
            }
            self.changed.wait(&mut state);
        }
        if state.live_workers == 0 {
            return false;
        }
        state.tokens.push_back(Token::Stop);
        self.not_empty.notify_one();
        true
    }

    /// Take the next token, blocking while the queue is empty.
    pub(crate) fn pop(&self) -> Token {
        let mut state = self.state.lock();
        loop {
            if let Some(token) = state.tokens.pop_front() {
                self.changed.notify_all();
                return token;
            }
            self.not_empty.wait(&mut state);
        }
    }

    pub(crate) fn live_workers(&self) -> usize {
        self.state.lock().live_workers
    }

    fn worker_exited(&self) {
        let mut state = self.state.lock();
        state.live_workers = state.live_workers.saturating_sub(1);
        self.changed.notify_all();
    }
}

/// Holds a storage session for the lifetime of one worker.
pub(crate) struct SessionGuard<'a> {
    storage: &'a dyn Storage,
}

impl<'a> SessionGuard<'a> {
    pub(crate) fn acquire(storage: &'a dyn Storage) -> Self {
        storage.acquire_session();
        Self { storage }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.storage.release_session();
    }
}

/// Marks a worker as gone when its thread ends, normally or by unwinding.
struct LiveGuard<'a>(&'a TokenQueue);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.worker_exited();
    }
}

/// State shared between the coordinator and its workers.
struct Pool {
    queue: TokenQueue,
    first_error: Mutex<Option<Error>>,
}

impl Pool {
    fn has_failed(&self) -> bool {
        self.first_error.lock().is_some()
    }

    fn record_failure(&self, error: Error) {
        self.first_error.lock().get_or_insert(error);
    }

    /// Admit work until a stop condition holds. Returns the number of
    /// `Continue` tokens handed out, seed included.
    fn coordinate<E>(&self, seeded: usize, options: &OptimizeOptions<E>) -> usize {
        let started = Instant::now();
        let mut admitted = seeded;
        loop {
            if options.timeout.is_some_and(|t| started.elapsed() > t) {
                trace_debug!(admitted, "timeout reached");
                break;
            }
            if options.n_trials.is_some_and(|n| admitted >= n) {
                break;
            }
            if self.has_failed() || self.queue.live_workers() == 0 {
                break;
            }
            if self
                .queue
                .push_timeout(Token::Continue, options.poll_interval)
            {
                admitted += 1;
            }
        }
        admitted
    }
}

impl Study {
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub(super) fn optimize_parallel<O>(
        &self,
        objective: &O,
        workers: usize,
        options: &OptimizeOptions<O::Error>,
    ) -> Result<()>
    where
        O: Objective + Sync,
    {
        let workers = clamp_workers(workers, options.n_trials);
        if workers == 0 {
            return Ok(());
        }

        let pool = Pool {
            queue: TokenQueue::seeded(workers),
            first_error: Mutex::new(None),
        };
        let catch = &options.catch;

        let worker_panic = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let pool = &pool;
                    scope.spawn(move || self.work(worker, pool, objective, catch))
                })
                .collect();

            let admitted = pool.coordinate(workers, options);
            trace_debug!(admitted, "stopping workers");

            for _ in 0..workers {
                if !pool.queue.push_stop() {
                    break;
                }
            }

            let mut worker_panic = None;
            for (worker, handle) in handles.into_iter().enumerate() {
                if let Err(payload) = handle.join() {
                    let reason = panic_message(&*payload);
                    trace_error!(worker, %reason, "worker panicked");
                    worker_panic.get_or_insert(Error::WorkerPanicked { worker, reason });
                }
            }
            worker_panic
        });

        match pool.first_error.into_inner().or(worker_panic) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn work<O>(&self, worker: usize, pool: &Pool, objective: &O, catch: &Catch<O::Error>)
    where
        O: Objective + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("worker", worker).entered();

        let _live = LiveGuard(&pool.queue);
        let _session = SessionGuard::acquire(self.storage());

        loop {
            match pool.queue.pop() {
                Token::Stop => break,
                Token::Continue if pool.has_failed() => break,
                Token::Continue => {
                    if let Err(e) = self.run_trial(objective, catch) {
                        trace_error!(worker, error = %e, "worker aborting");
                        pool.record_failure(e);
                        break;
                    }
                }
            }
        }
        trace_debug!(worker, "worker exiting");
    }
}

/// Never start more workers than there are trials to run.
pub(crate) fn clamp_workers(workers: usize, n_trials: Option<usize>) -> usize {
    n_trials.map_or(workers, |n| workers.min(n))
}
