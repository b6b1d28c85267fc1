use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockUpgradableReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

enum State<T> {
    Shared(ArcRwLockUpgradableReadGuard<RawRwLock, T>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, T>),
    // Only observable if an upgrade panics.
    Poisoned,
}

// Intent-to-write lock.
// Writers descend holding upgradable read locks, which exclude other writers but still admit
// plain readers. The guard only becomes exclusive on the first call to `get_mut`, so readers
// are shut out of a node just for the span in which it actually changes.
pub struct IntentGuard<T> {
    state: State<T>,
}

impl<T> IntentGuard<T> {
    pub fn acquire(lock: &Arc<RwLock<T>>) -> Self {
        Self {
            state: State::Shared(lock.upgradable_read_arc()),
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self.state, State::Exclusive(_))
    }

    /// Mutable access, upgrading to an exclusive lock on first use.
    pub fn get_mut(&mut self) -> &mut T {
        if let State::Shared(_) = self.state {
            let State::Shared(shared) = std::mem::replace(&mut self.state, State::Poisoned) else {
                unreachable!()
            };
            self.state = State::Exclusive(ArcRwLockUpgradableReadGuard::upgrade(shared));
        }
        match &mut self.state {
            State::Exclusive(g) => g,
            _ => unreachable!("intent guard poisoned by a failed upgrade"),
        }
    }
}

impl<T> Deref for IntentGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.state {
            State::Shared(g) => g,
            State::Exclusive(g) => g,
            State::Poisoned => unreachable!("intent guard poisoned by a failed upgrade"),
        }
    }
}

impl<T: Debug> Debug for IntentGuard<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentGuard")
            .field("exclusive", &self.is_exclusive())
            .field("value", &**self)
            .finish()
    }
}
