use std::alloc::Layout;

/// The control block for a new owner could not be allocated.
///
/// By the time this error is returned, the value that was handed over has
/// already been dropped: nothing leaks on the failure path.
///
/// 无法为新的所有者分配控制块。
/// 返回此错误时，传入的值已经被 drop，失败路径上不会有泄漏。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("failed to allocate control block ({} bytes, align {})", .layout.size(), .layout.align())]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    pub(crate) fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Layout of the allocation that failed.
    pub fn layout(&self) -> Layout {
        self.layout
    }
}
