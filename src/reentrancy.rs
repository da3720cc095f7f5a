//! Thread-scoped reentrancy flags for the timing wrapper
//!
//! While a traced operation runs on a thread, nested traced calls on the same
//! thread must pass straight through to their originals instead of being
//! timed again. The flag is keyed by a tracer-private token so that distinct
//! recorders never suppress each other's timing.

use fnv::FnvHashSet;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE: RefCell<FnvHashSet<u64>> = RefCell::new(FnvHashSet::default());
}

/// Process-unique key identifying one tracer's reentrancy flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReentrancyToken(u64);

impl ReentrancyToken {
    /// Allocate a fresh token, distinct from every other token in the process
    pub fn allocate() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// RAII guard holding a token's flag set on the current thread
///
/// Dropping the guard clears the flag, including during unwinding, so a
/// failing traced body can never leave the flag stuck.
pub struct ReentrancyGuard {
    token: u64,
    // Must drop on the thread that created it
    _not_send: PhantomData<*const ()>,
}

impl ReentrancyGuard {
    /// Set the flag for `token` on this thread
    ///
    /// Returns `None` when the flag is already set, meaning the caller is a
    /// nested traced call and must pass through untimed.
    pub fn enter(token: ReentrancyToken) -> Option<Self> {
        let newly_set = ACTIVE.with(|active| active.borrow_mut().insert(token.0));
        newly_set.then_some(Self {
            token: token.0,
            _not_send: PhantomData,
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().remove(&self.token);
        });
    }
}

/// Whether `token`'s flag is currently set on this thread
pub fn is_active(token: ReentrancyToken) -> bool {
    ACTIVE.with(|active| active.borrow().contains(&token.0))
}
