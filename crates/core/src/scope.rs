//! # Scope Conditions
//!
//! A scope declares that every leaf built inside it implicitly depends on a
//! condition entity. Scopes nest; each leaf snapshots the whole stack when it
//! is built, so later pushes and pops never change existing leaves.
//!
//! ```
//! use lineage_core::{scope, Entity};
//!
//! let ready = Entity::leaf("ready", true).unwrap();
//! let steady = Entity::leaf("steady", true).unwrap();
//!
//! let go = {
//!     let _outer = scope::enter(&ready);
//!     let _inner = scope::enter(&steady);
//!     Entity::leaf("Go", 1).unwrap()
//! };
//!
//! assert_eq!(go.dependency_expression(), "Go (when ready & steady)");
//! assert_eq!(scope::depth(), 0);
//! ```
//!
//! ## Threads
//!
//! The stack is thread-local. A [`ScopeGuard`] is `!Send`, so it is always
//! released on the thread that pushed it, and one thread's scopes are never
//! visible to another.
//!
//! The stack is per thread, not per async task. Tasks that interleave on one
//! thread (`spawn_local`, a current-thread runtime) see each other's scopes
//! across `.await` points. Async code should attach conditions explicitly
//! with [`LeafBuilder::condition`](crate::LeafBuilder::condition).

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::capability::Operand;
use crate::entity::{Entity, EntityRef};

thread_local! {
    static CONDITIONS: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
    static NEXT_GENERATION: Cell<u64> = const { Cell::new(0) };
}

/// One pushed condition, tagged so a guard only ever pops its own entry.
struct Scope {
    generation: u64,
    condition: EntityRef,
}

/// Push `condition` onto this thread's scope stack until the guard is released.
///
/// The stack belongs to the calling thread. Do not hold the guard across an
/// `.await`: other tasks polled on the same thread would capture the
/// condition. Use [`LeafBuilder::condition`](crate::LeafBuilder::condition)
/// from async code instead.
pub fn enter<U: Operand>(condition: &Entity<U>) -> ScopeGuard {
    let generation = NEXT_GENERATION.with(|next| {
        let generation = next.get();
        next.set(generation.wrapping_add(1));
        generation
    });
    let depth = CONDITIONS.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(Scope {
            generation,
            condition: condition.erased(),
        });
        stack.len()
    });
    trace!(condition = condition.name(), depth, generation, "scope entered");
    ScopeGuard {
        depth,
        generation,
        released: false,
        _not_send: PhantomData,
    }
}

/// Run `f` with `condition` pushed, popping it afterwards.
pub fn with_condition<U: Operand, R>(condition: &Entity<U>, f: impl FnOnce() -> R) -> R {
    let _guard = enter(condition);
    f()
}

/// Number of active scopes on this thread.
pub fn depth() -> usize {
    CONDITIONS.with(|stack| stack.borrow().len())
}

/// The active conditions, outermost first.
pub fn current() -> Vec<EntityRef> {
    CONDITIONS.with(|stack| {
        stack
            .borrow()
            .iter()
            .map(|scope| scope.condition.clone())
            .collect()
    })
}

/// Handle for one pushed scope. Dropping it releases the scope.
#[must_use = "the scope is released as soon as the guard is dropped"]
pub struct ScopeGuard {
    depth: usize,
    generation: u64,
    released: bool,
    _not_send: PhantomData<Rc<()>>,
}

impl ScopeGuard {
    /// Pop this scope. Releasing twice is a no-op.
    ///
    /// Scopes must be released innermost first. Releasing an outer guard
    /// early also discards every scope pushed after it. A guard whose scope
    /// was already discarded that way leaves the stack untouched.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        // The stack is gone if this runs during thread teardown.
        let _ = CONDITIONS.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            let owned = self
                .depth
                .checked_sub(1)
                .and_then(|index| stack.get(index))
                .is_some_and(|scope| scope.generation == self.generation);
            if !owned {
                warn!(
                    depth = self.depth,
                    generation = self.generation,
                    "scope already discarded by an outer release"
                );
                return;
            }
            if stack.len() != self.depth {
                warn!(
                    expected = self.depth,
                    actual = stack.len(),
                    "scope released out of order"
                );
            }
            stack.truncate(self.depth - 1);
        });
        trace!(depth = self.depth, "scope released");
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stack depth this guard was pushed at (1 for the outermost scope).
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("depth", &self.depth)
            .field("generation", &self.generation)
            .field("released", &self.released)
            .finish()
    }
}
