//! Allocation-failure tests
//!
//! A wrapper around the system allocator fails the next allocation of a given
//! size once armed. Every scenario lives in one test so no other test thread
//! can consume the armed failure.

#![cfg(not(feature = "loom"))]

use shared_ptr::{SharedPtr, SyncSharedPtr};
use std::alloc::{GlobalAlloc, Layout, System};
use std::mem::size_of;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FailingAlloc;

/// Size of the next allocation to fail, `0` when disarmed.
static FAIL_SIZE: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for FailingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = layout.size();
        if size != 0
            && FAIL_SIZE
                .compare_exchange(size, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return std::ptr::null_mut();
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: FailingAlloc = FailingAlloc;

/// Counter, value pointer and destructor pointer.
const CONTROL_BLOCK_SIZE: usize = 3 * size_of::<usize>();

fn fail_next_control_block() {
    FAIL_SIZE.store(CONTROL_BLOCK_SIZE, Ordering::SeqCst);
}

struct Probe(Arc<AtomicUsize>);

impl Drop for Probe {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn failed_control_block_allocation_never_leaks() {
    assert_ne!(size_of::<Probe>(), CONTROL_BLOCK_SIZE);
    let drops = Arc::new(AtomicUsize::new(0));

    // from_box: the box is dropped before the error comes back
    let boxed = Box::new(Probe(Arc::clone(&drops)));
    fail_next_control_block();
    let err = SharedPtr::from_box(boxed).unwrap_err();
    assert_eq!(err.layout().size(), CONTROL_BLOCK_SIZE);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    // try_new: the value is boxed first, then the control block fails
    let probe = Probe(Arc::clone(&drops));
    fail_next_control_block();
    assert!(SharedPtr::try_new(probe).is_err());
    assert_eq!(drops.load(Ordering::SeqCst), 2);

    // from_raw: the pointer is still reclaimed
    let raw = Box::into_raw(Box::new(Probe(Arc::clone(&drops))));
    fail_next_control_block();
    assert!(unsafe { SharedPtr::from_raw(raw) }.is_err());
    assert_eq!(drops.load(Ordering::SeqCst), 3);

    // try_reset: the handle keeps its old value, the new one is dropped
    let mut ptr = SharedPtr::new(Probe(Arc::clone(&drops)));
    let copy = ptr.clone();
    let replacement = Probe(Arc::clone(&drops));
    fail_next_control_block();
    assert!(ptr.try_reset(replacement).is_err());
    assert_eq!(drops.load(Ordering::SeqCst), 4);
    assert_eq!(ptr.use_count(), 2);
    assert!(ptr == copy);
    drop(copy);
    drop(ptr);
    assert_eq!(drops.load(Ordering::SeqCst), 5);

    // atomic counter: same control block size, same guarantee
    let probe = Probe(Arc::clone(&drops));
    fail_next_control_block();
    assert!(SyncSharedPtr::try_new(probe).is_err());
    assert_eq!(drops.load(Ordering::SeqCst), 6);

    // once disarmed, allocation succeeds again
    let ptr = SharedPtr::try_new(Probe(Arc::clone(&drops))).unwrap();
    assert!(ptr.unique());
    drop(ptr);
    assert_eq!(drops.load(Ordering::SeqCst), 7);
}
