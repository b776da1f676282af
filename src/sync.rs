#[cfg(feature = "loom")]
pub(crate) use loom::cell::Cell;
#[cfg(not(feature = "loom"))]
pub(crate) use std::cell::Cell;

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering, fence};
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering, fence};
