//! Ambient correlation context.
//!
//! Producers of audit events usually do not thread a correlation id through
//! every call. Instead the id is bound once for the current thread (with
//! [`set`] or [`enter`]) or for the current async task (with [`scope`]) and
//! read back with [`current`].
//!
//! Bindings never leak between threads or tasks. Inside a [`scope`] the task
//! owns the binding: [`set`], [`clear`] and [`enter`] rebind the task rather
//! than the executing worker thread, and the thread binding is neither read
//! nor written until the scoped future completes.
//!
//! ```
//! use pipeaudit_core::{correlation, CorrelationId};
//!
//! let outer = CorrelationId::parse("outer").unwrap();
//! let inner = CorrelationId::parse("inner").unwrap();
//!
//! let _outer = correlation::enter(outer.clone());
//! {
//!     let _inner = correlation::enter(inner.clone());
//!     assert_eq!(correlation::current(), Some(inner));
//! }
//! assert_eq!(correlation::current(), Some(outer));
//! ```

use crate::ids::CorrelationId;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use tokio::task::futures::TaskLocalFuture;

type Slot = RefCell<Option<CorrelationId>>;

thread_local! {
    static THREAD_CORRELATION: Slot = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_CORRELATION: Slot;
}

/// Future returned by [`scope`].
pub type Scoped<F> = TaskLocalFuture<Slot, F>;

/// Returns a fresh correlation id. Does not bind it.
#[must_use]
pub fn generate() -> CorrelationId {
    CorrelationId::generate()
}

/// Binds `id` to the enclosing [`scope`], or to the calling thread outside
/// of one. Replaces any previous binding.
pub fn set(id: CorrelationId) {
    replace(Some(id));
}

/// Returns the id bound to the current task, falling back to the calling
/// thread's binding outside of a [`scope`].
#[must_use]
pub fn current() -> Option<CorrelationId> {
    TASK_CORRELATION
        .try_with(|slot| slot.borrow().clone())
        .unwrap_or_else(|_| THREAD_CORRELATION.with(|slot| slot.borrow().clone()))
}

/// Removes the current binding. Inside a [`scope`] this unbinds the task
/// only; the thread binding is restored when the scope ends.
pub fn clear() {
    replace(None);
}

/// Binds `id` until the returned guard is dropped, then restores whatever
/// was bound before. The guard restores into the slot it replaced.
#[must_use = "the binding is removed as soon as the guard is dropped"]
pub fn enter(id: CorrelationId) -> CorrelationGuard {
    let (target, previous) = replace(Some(id));
    CorrelationGuard {
        target,
        previous,
        _not_send: PhantomData,
    }
}

/// Runs `future` with `id` bound as the current task's correlation id.
pub fn scope<F>(id: CorrelationId, future: F) -> Scoped<F>
where
    F: Future,
{
    TASK_CORRELATION.scope(RefCell::new(Some(id)), future)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Task,
    Thread,
}

fn replace(id: Option<CorrelationId>) -> (Target, Option<CorrelationId>) {
    let mut pending = Some(id);
    if let Ok(previous) = TASK_CORRELATION.try_with(|slot| slot.replace(pending.take().flatten())) {
        return (Target::Task, previous);
    }
    let previous = replace_in(Target::Thread, pending.flatten());
    (Target::Thread, previous)
}

fn replace_in(target: Target, id: Option<CorrelationId>) -> Option<CorrelationId> {
    match target {
        Target::Task => TASK_CORRELATION
            .try_with(|slot| slot.replace(id))
            .ok()
            .flatten(),
        Target::Thread => THREAD_CORRELATION.with(|slot| slot.replace(id)),
    }
}

/// Restores the previous binding on drop.
///
/// Not `Send`: the binding belongs to the thread or task that created the
/// guard.
#[derive(Debug)]
pub struct CorrelationGuard {
    target: Target,
    previous: Option<CorrelationId>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        replace_in(self.target, self.previous.take());
    }
}
