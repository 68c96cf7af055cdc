use std::{cell::RefCell, fmt, rc::Rc};

use crate::animation::value::Vector;

/// Shared, mutable animation parameter.
///
/// Cloning a `Param` clones the handle, not the value: every clone observes and writes the same
/// slot. Handles are `!Send`: only the sequencing thread touches parameters, and values reach
/// worker threads as text snapshots.
pub struct Param<T> {
    slot: Rc<RefCell<T>>,
}

/// Scalar parameter, e.g. a sphere radius.
pub type ScalarParam = Param<f64>;

/// Vector parameter, e.g. a rotation `< x, y, z >`.
pub type VectorParam = Param<Vector>;

impl<T: Clone> Param<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(value)),
        }
    }

    /// Current value.
    pub fn read(&self) -> T {
        self.slot.borrow().clone()
    }

    pub fn write(&self, value: T) {
        *self.slot.borrow_mut() = value;
    }

    /// Independent copy of the current value; later writes do not affect it.
    pub fn snapshot(&self) -> T {
        self.read()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.borrow())
    }

    /// `true` when both handles refer to the same parameter.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot.borrow().fmt(f)
    }
}

impl<T: fmt::Debug> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Param").field(&self.slot.borrow()).finish()
    }
}
