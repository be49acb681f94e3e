//! Lock modes: the safe/unsafe switch shared by every container.
//!
//! A container is generic over a [`Mode`]. The mode picks the cell that
//! owns the container's storage:
//! - [`Safe`] stores it in a `parking_lot::RwLock`: many readers or one
//!   writer, and the container is `Sync` when its contents are.
//! - [`Unsync`] stores it in a `RefCell`: no operation ever blocks, and the
//!   container is `!Sync`, so it cannot be shared between threads at all.
//!
//! The mode is part of the type, so it is fixed at construction and every
//! method body is the same for both modes. Guards are RAII values; a lock is
//! released on every exit path, including early returns and panics.
//!
//! Reentrancy: callbacks run while a guard is held must not touch the same
//! container. Under `Safe` that deadlocks; under `Unsync` it panics with a
//! `RefCell` borrow error.

use core::cell::{Ref, RefCell, RefMut};
use core::ops::{Deref, DerefMut};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Reader/writer cell used as container storage.
pub trait RwCell<T> {
    /// Shared guard.
    type ReadGuard<'a>: Deref<Target = T>
    where
        Self: 'a;
    /// Exclusive guard.
    type WriteGuard<'a>: DerefMut<Target = T>
    where
        Self: 'a;

    fn new(value: T) -> Self;
    fn read(&self) -> Self::ReadGuard<'_>;
    fn write(&self) -> Self::WriteGuard<'_>;
    fn get_mut(&mut self) -> &mut T;
    fn into_inner(self) -> T;
}

impl<T> RwCell<T> for RwLock<T> {
    type ReadGuard<'a>
        = RwLockReadGuard<'a, T>
    where
        Self: 'a;
    type WriteGuard<'a>
        = RwLockWriteGuard<'a, T>
    where
        Self: 'a;

    #[inline]
    fn new(value: T) -> Self {
        RwLock::new(value)
    }
    #[inline]
    fn read(&self) -> Self::ReadGuard<'_> {
        RwLock::read(self)
    }
    #[inline]
    fn write(&self) -> Self::WriteGuard<'_> {
        RwLock::write(self)
    }
    #[inline]
    fn get_mut(&mut self) -> &mut T {
        RwLock::get_mut(self)
    }
    #[inline]
    fn into_inner(self) -> T {
        RwLock::into_inner(self)
    }
}

impl<T> RwCell<T> for RefCell<T> {
    type ReadGuard<'a>
        = Ref<'a, T>
    where
        Self: 'a;
    type WriteGuard<'a>
        = RefMut<'a, T>
    where
        Self: 'a;

    #[inline]
    fn new(value: T) -> Self {
        RefCell::new(value)
    }
    #[inline]
    fn read(&self) -> Self::ReadGuard<'_> {
        self.borrow()
    }
    #[inline]
    fn write(&self) -> Self::WriteGuard<'_> {
        self.borrow_mut()
    }
    #[inline]
    fn get_mut(&mut self) -> &mut T {
        RefCell::get_mut(self)
    }
    #[inline]
    fn into_inner(self) -> T {
        RefCell::into_inner(self)
    }
}

/// Selects the storage cell of a container. Implemented by [`Safe`] and
/// [`Unsync`] only.
pub trait Mode: 'static {
    /// Whether operations are synchronized.
    const SAFE: bool;
    /// The cell owning the storage.
    type Lock<T>: RwCell<T>;
}

/// Reader/writer locked storage; containers may be shared across threads.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Safe;

/// Unsynchronized storage for single-threaded use.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Unsync;

impl Mode for Safe {
    const SAFE: bool = true;
    type Lock<T> = RwLock<T>;
}

impl Mode for Unsync {
    const SAFE: bool = false;
    type Lock<T> = RefCell<T>;
}
