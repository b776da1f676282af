mod basic_tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 记录 drop 次数的探针值
pub(crate) struct Tracked {
    pub(crate) id: u32,
    drops: Arc<AtomicUsize>,
}

impl Tracked {
    pub(crate) fn new(id: u32, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            id,
            drops: Arc::clone(drops),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn drop_counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub(crate) fn drops(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
