use crate::count::RefCount;
use crate::error::AllocError;
use log::{debug, trace};
use std::alloc::{Layout, alloc, dealloc};
use std::boxed::Box;
use std::ptr::NonNull;

/// Heap part of a control block: the counter plus a type-erased owner of the
/// value. The destructor is the one for the type the value was allocated as,
/// not the type any handle happens to view it through.
///
/// 控制块的堆部分：计数器加上类型擦除的值所有者。
/// 析构函数对应值被分配时的类型，而不是句柄当前观察它所用的类型。
struct Inner<C> {
    count: C,
    /// The owned value, leaked from its `Box`.
    value: *mut (),
    /// Function pointer to the type-specific destructor.
    /// 类型特定析构函数的函数指针。
    dtor: unsafe fn(*mut ()),
}

/// Generic destructor for owned values.
/// Converts the raw pointer back to `Box<O>` and drops it.
///
/// 所拥有值的通用析构函数。
/// 将原始指针转换回 `Box<O>` 并将其 drop。
#[inline(always)]
unsafe fn drop_value<O>(ptr: *mut ()) {
    let ptr = ptr as *mut O;
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

/// Shared bookkeeping for one owned value.
///
/// A `ControlBlock` is either unallocated (no counter, `use_count() == 0`) or
/// points at a heap [`Inner`] that every handle owning the value shares.
/// Cloning the block shares that allocation and bumps the count; it never
/// copies the count's value into a new allocation. Two blocks are therefore
/// only ever joined by cloning one from the other.
///
/// 一个被拥有值的共享簿记。
/// `ControlBlock` 要么未分配（没有计数器，`use_count() == 0`），
/// 要么指向所有拥有该值的句柄共享的堆上 [`Inner`]。
/// 克隆控制块会共享该分配并增加计数，而不会把计数值复制到新分配中。
pub(crate) struct ControlBlock<C: RefCount> {
    inner: Option<NonNull<Inner<C>>>,
}

impl<C: RefCount> ControlBlock<C> {
    /// An unallocated block.
    #[inline]
    pub(crate) const fn empty() -> Self {
        Self { inner: None }
    }

    /// Acquire `value` as its first owner.
    ///
    /// Allocates a counter set to 1 and returns it together with the address
    /// of the now-owned value. If that allocation fails, `value` is dropped
    /// before the error is returned.
    ///
    /// 作为第一个所有者获取 `value`。
    /// 分配一个初始为 1 的计数器，并与现在被拥有的值的地址一起返回。
    /// 如果分配失败，`value` 会在返回错误之前被 drop。
    pub(crate) fn allocate<O: 'static>(value: Box<O>) -> Result<(Self, NonNull<O>), AllocError> {
        let layout = Layout::new::<Inner<C>>();

        // SAFETY: `Inner<C>` always contains a function pointer, so the layout
        // has a non-zero size.
        let raw = unsafe { alloc(layout) } as *mut Inner<C>;

        let Some(inner) = NonNull::new(raw) else {
            drop(value);
            debug!(
                "control block allocation of {} bytes failed; owned value dropped",
                layout.size()
            );
            return Err(AllocError::new(layout));
        };

        let value = NonNull::from(Box::leak(value));
        // SAFETY: `inner` is freshly allocated with the layout of `Inner<C>`.
        unsafe {
            inner.as_ptr().write(Inner {
                count: C::one(),
                value: value.as_ptr() as *mut (),
                dtor: drop_value::<O>,
            });
        }
        trace!("control block {:p} allocated for value {:p}", inner, value);

        Ok((Self { inner: Some(inner) }, value))
    }

    /// Number of owners, `0` when unallocated.
    #[inline]
    pub(crate) fn use_count(&self) -> usize {
        match self.inner {
            // SAFETY: an allocated block is kept alive by this owner.
            Some(inner) => unsafe { inner.as_ref() }.count.get(),
            None => 0,
        }
    }

    #[inline]
    pub(crate) fn is_allocated(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether both blocks share the same counter.
    #[inline]
    pub(crate) fn same_block(&self, other: &Self) -> bool {
        self.inner == other.inner
    }

    #[inline]
    pub(crate) fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.inner, &mut other.inner);
    }

    /// Give up this block's share of ownership.
    ///
    /// When the count reaches zero the counter is freed and the value is
    /// destroyed with the destructor recorded at allocation. The block is
    /// unallocated afterwards either way. Releasing an unallocated block is a
    /// no-op.
    ///
    /// 放弃此控制块的所有权份额。
    /// 当计数归零时释放计数器，并使用分配时记录的析构函数销毁值。
    /// 无论如何，之后该控制块都处于未分配状态。释放未分配的控制块是空操作。
    pub(crate) fn release(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        // SAFETY: we still hold one share, so `inner` is alive.
        let remaining = unsafe { inner.as_ref() }.count.decrement();
        if remaining != 0 {
            return;
        }

        // SAFETY: we were the last owner; nobody else can reach `inner`.
        // The cell is freed before the destructor runs.
        unsafe {
            let Inner { value, dtor, .. } = inner.as_ptr().read();
            dealloc(inner.as_ptr() as *mut u8, Layout::new::<Inner<C>>());
            trace!("control block {:p} released, destroying value {:p}", inner, value);
            (dtor)(value);
        }
    }
}

impl<C: RefCount> Clone for ControlBlock<C> {
    /// Share the counter: the new block is one more owner of the same value.
    /// 共享计数器：新的控制块是同一值的又一个所有者。
    #[inline]
    fn clone(&self) -> Self {
        if let Some(inner) = self.inner {
            // SAFETY: an allocated block is kept alive by this owner.
            unsafe { inner.as_ref() }.count.increment();
        }
        Self { inner: self.inner }
    }
}

impl<C: RefCount> Drop for ControlBlock<C> {
    #[inline]
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: RefCount> std::fmt::Debug for ControlBlock<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlBlock")
            .field("inner", &self.inner)
            .field("use_count", &self.use_count())
            .finish()
    }
}
