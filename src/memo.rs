//! Coalescing memo cell backing every cached handle attribute.
//!
//! The first caller of an unresolved cell starts the computation. Callers that
//! arrive while it is in flight await the same shared future. A success is kept
//! for the life of the cell; a failure resets the cell so the next access
//! recomputes. The cell only holds a weak reference to the in-flight future, so
//! once every waiter has gone away the computation is dropped and the next
//! caller starts over.

use crate::error::Result;
use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::future::Future;
use std::sync::{Mutex, PoisonError};

type SharedResolution<T> = Shared<BoxFuture<'static, Result<T>>>;

enum State<T: Clone> {
    Unresolved,
    InFlight {
        generation: u64,
        future: WeakShared<BoxFuture<'static, Result<T>>>,
    },
    Resolved(T),
}

struct Inner<T: Clone> {
    state: State<T>,
    generation: u64,
}

pub struct Memo<T: Clone> {
    inner: Mutex<Inner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Unresolved,
                generation: 0,
            }),
        }
    }

    /// The resolved value, without triggering a computation.
    pub fn peek(&self) -> Option<T> {
        match &self.lock().state {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.lock().state, State::Resolved(_))
    }

    /// Return the cached value or join/start the computation produced by `init`.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (generation, shared) = {
            let mut inner = self.lock();
            let joined = match &inner.state {
                State::Resolved(value) => return Ok(value.clone()),
                State::InFlight { generation, future } => {
                    future.upgrade().map(|shared| (*generation, shared))
                }
                State::Unresolved => None,
            };
            match joined {
                Some(joined) => joined,
                None => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let shared: SharedResolution<T> = init().boxed().shared();
                    inner.state = match shared.downgrade() {
                        Some(future) => State::InFlight { generation, future },
                        None => State::Unresolved,
                    };
                    (generation, shared)
                }
            }
        };

        let result = shared.await;

        let mut inner = self.lock();
        if matches!(&inner.state, State::InFlight { generation: g, .. } if *g == generation) {
            inner.state = match &result {
                Ok(value) => State::Resolved(value.clone()),
                Err(_) => State::Unresolved,
            };
        }
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match &inner.state {
            State::Unresolved => f.write_str("Memo(unresolved)"),
            State::InFlight { .. } => f.write_str("Memo(in flight)"),
            State::Resolved(value) => write!(f, "Memo({value:?})"),
        }
    }
}
