//! Bounded, order-preserving execution of async tasks.
//!
//! [`run_bounded`] is used twice per run: across documents (ceiling
//! `document_concurrency`) and, nested inside every document task, across
//! pages (ceiling `page_concurrency`).
//!
//! ## Why not `buffer_unordered` + sort?
//!
//! `buffer_unordered` yields in completion order, so the caller must carry an
//! index through every result and sort afterwards. Here each task's index is
//! fixed when a worker pulls it from the shared cursor, and its output is
//! written into a pre-sized slot at that index. Completion order never
//! reaches the caller.
//!
//! ## Failure policy: fail-fast with drain
//!
//! After the first task error no worker starts another task. Tasks that are
//! already running are allowed to finish, so external processes and file
//! writes are never abandoned halfway. The first error (in time) is returned
//! and every successful result is discarded.
//!
//! The workers are plain futures joined on the caller's task, so scheduling
//! itself never spawns. The tasks may still hand CPU-bound work to
//! `spawn_blocking`.

use futures::future::join_all;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Run `tasks` with at most `limit` in flight and return their outputs in
/// task order.
///
/// `limit == 0` is treated as 1. An empty task list returns immediately
/// without creating any worker.
///
/// # Errors
/// The first error produced by any task. See the module docs for what happens
/// to the other tasks.
pub async fn run_bounded<T, E, F, Fut>(tasks: Vec<F>, limit: usize) -> Result<Vec<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = tasks.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let workers = limit.max(1).min(total);
    debug!("Scheduling {} tasks on {} workers", total, workers);

    let cursor = Mutex::new(tasks.into_iter().enumerate());
    let slots: Mutex<Vec<Option<T>>> = Mutex::new((0..total).map(|_| None).collect());
    let failure: Mutex<Option<E>> = Mutex::new(None);

    let (cursor, slots, failure) = (&cursor, &slots, &failure);
    join_all((0..workers).map(move |_| async move {
        loop {
            if lock(failure).is_some() {
                break;
            }
            let next = lock(cursor).next();
            let Some((index, task)) = next else {
                break;
            };
            match task().await {
                Ok(value) => lock(slots)[index] = Some(value),
                Err(err) => {
                    lock(failure).get_or_insert(err);
                }
            }
        }
    }))
    .await;

    if let Some(err) = lock(failure).take() {
        return Err(err);
    }

    // Every task ran and succeeded, so every slot is filled.
    let filled: Vec<T> = std::mem::take(&mut *lock(slots))
        .into_iter()
        .flatten()
        .collect();
    debug_assert_eq!(filled.len(), total);
    Ok(filled)
}

/// Lock a mutex whose data stays consistent even if a holder panicked: every
/// critical section here is a single push, pop or slot write.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
