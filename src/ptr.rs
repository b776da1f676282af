use crate::block::ControlBlock;
use crate::count::{AtomicCount, LocalCount, Ownable, RefCount};
use crate::error::AllocError;
use std::boxed::Box;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

/// A shared-ownership pointer, generic over its counter.
///
/// Use it through [`SharedPtr`] (single-threaded) or [`SyncSharedPtr`]
/// (atomic counter). A `Handle<T, C>` keeps two things apart:
/// - the **view**: a reference to a `T` that dereferencing yields, and
/// - the **control block**: the counter every owner of the underlying value
///   shares, together with the destructor for that value.
///
/// Cloning a handle adds an owner to the same block. When the last owner
/// is dropped (or reset), the value is destroyed exactly once. Casts
/// ([`map`](Handle::map), [`try_map`](Handle::try_map),
/// [`downcast`](Handle::downcast)) produce a handle with a different view
/// that shares the source's block, so the value lives as long as any of them.
///
/// **Thread Safety**: with [`LocalCount`] the counter is a plain
/// `Cell`, the handle is `!Send` and `!Sync`, and all handles sharing a block
/// must stay on one thread. Use [`SyncSharedPtr`] (counting with
/// [`AtomicCount`]) to share ownership across threads.
///
/// **Typical Usage**:
/// ```
/// use shared_ptr::SharedPtr;
///
/// let first = SharedPtr::new(String::from("hello"));
/// let second = first.clone();
/// assert_eq!(first.use_count(), 2);
///
/// drop(first);
/// assert!(second.unique());
/// assert_eq!(*second, "hello");
/// ```
///
/// 共享所有权指针，对计数器泛型。
/// 通过 [`SharedPtr`]（单线程）或 [`SyncSharedPtr`]（原子计数器）使用。`Handle<T, C>` 将两件事分开：
/// - **视图**：解引用时得到的 `T` 的引用；
/// - **控制块**：底层值的所有所有者共享的计数器，以及该值的析构函数。
/// 克隆句柄会向同一控制块添加一个所有者。当最后一个所有者被 drop（或 reset）时，
/// 值恰好被销毁一次。类型转换会产生一个视图不同但共享源控制块的句柄。
/// **线程安全性**：使用 [`LocalCount`] 时计数器是普通的 `Cell`，句柄是 `!Send` 和 `!Sync` 的，
/// 共享同一控制块的所有句柄必须停留在一个线程上。跨线程共享所有权请使用 [`SyncSharedPtr`]。
pub struct Handle<T: ?Sized, C: RefCount> {
    ptr: Option<NonNull<T>>,
    block: ControlBlock<C>,
    _marker: PhantomData<T>,
}

/// Single-threaded shared pointer, counting with [`LocalCount`].
/// 单线程共享指针，使用 [`LocalCount`] 计数。
pub type SharedPtr<T> = Handle<T, LocalCount>;

/// A [`Handle`] whose control block counts atomically.
/// 控制块使用原子计数的 [`Handle`]。
pub type SyncSharedPtr<T> = Handle<T, AtomicCount>;

// SAFETY: only a `Sync` counter (`AtomicCount`) makes the handle `Send`/`Sync`;
// `LocalCount` holds a `Cell` and keeps handles on one thread. Owned values of
// an atomic block are `Send + Sync` through `Ownable<AtomicCount>`. The view is
// handed out as `&T` on whichever thread holds a handle, and the last handle
// may drop it anywhere.
unsafe impl<T: ?Sized + Send + Sync, C: RefCount + Send + Sync> Send for Handle<T, C> {}
unsafe impl<T: ?Sized + Send + Sync, C: RefCount + Send + Sync> Sync for Handle<T, C> {}

impl<T: ?Sized, C: RefCount> Handle<T, C> {
    /// An empty handle: no value, `use_count() == 0`.
    /// 空句柄：没有值，`use_count() == 0`。
    #[inline]
    pub const fn null() -> Self {
        Self {
            ptr: None,
            block: ControlBlock::empty(),
            _marker: PhantomData,
        }
    }

    /// Share `source`'s ownership while viewing `ptr`.
    ///
    /// The returned handle counts as one more owner of whatever `source` owns.
    /// If `source` is empty there is nothing to share and an empty handle is
    /// returned; `ptr` is not adopted.
    ///
    /// # Safety
    /// `ptr` must stay valid for as long as the value owned by `source` does,
    /// e.g. it points into that value, and it must be valid for shared reads.
    ///
    /// 共享 `source` 的所有权，同时观察 `ptr`。
    /// 返回的句柄是 `source` 所拥有值的又一个所有者。如果 `source` 为空，则返回空句柄，
    /// `ptr` 不会被接管。
    /// # Safety
    /// `ptr` 必须在 `source` 所拥有的值存活期间一直有效（例如指向该值内部），并且可以安全地共享读取。
    #[inline]
    pub unsafe fn alias<U: ?Sized>(source: &Handle<U, C>, ptr: NonNull<T>) -> Self {
        if !source.block.is_allocated() {
            return Self::null();
        }
        Self {
            ptr: Some(ptr),
            block: source.block.clone(),
            _marker: PhantomData,
        }
    }

    /// The viewed value, or `None` for an empty handle.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: a non-null view is kept alive by our share of the block.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Raw address of the viewed value. Never fails; `None` when empty.
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// Number of handles sharing this handle's control block.
    #[inline]
    pub fn use_count(&self) -> usize {
        self.block.use_count()
    }

    /// `true` if this is the only owner.
    #[inline]
    pub fn unique(&self) -> bool {
        self.use_count() == 1
    }

    /// `true` if this handle owns nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.use_count() == 0
    }

    /// Whether `self` and `other` share one control block, whatever they view.
    #[inline]
    pub fn shares_owner<U: ?Sized>(&self, other: &Handle<U, C>) -> bool {
        self.block.is_allocated() && self.block.same_block(&other.block)
    }

    /// Whether both handles view the same address.
    #[inline]
    pub fn ptr_eq<U: ?Sized>(this: &Self, other: &Handle<U, C>) -> bool {
        this.addr() == other.addr()
    }

    /// Exchange view and ownership with `other`. Never fails.
    /// 与 `other` 交换视图和所有权。不会失败。
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.ptr, &mut other.ptr);
        self.block.swap(&mut other.block);
    }

    /// Release ownership and become empty.
    #[inline]
    pub fn clear(&mut self) {
        let mut old = Self::null();
        self.swap(&mut old);
    }

    #[inline]
    fn addr(&self) -> usize {
        self.ptr.map_or(0, |ptr| ptr.as_ptr().cast::<()>() as usize)
    }
}

impl<T: Ownable<C> + 'static, C: RefCount> Handle<T, C> {
    /// Move `value` to the heap and become its first owner.
    ///
    /// Aborts through [`std::alloc::handle_alloc_error`] if the control block
    /// cannot be allocated; use [`try_new`](Self::try_new) to observe that
    /// failure instead.
    ///
    /// 将 `value` 移到堆上并成为其第一个所有者。
    #[inline]
    pub fn new(value: T) -> Self {
        Self::adopt(Box::new(value))
    }

    /// Fallible [`new`](Self::new). On error `value` has already been dropped.
    #[inline]
    pub fn try_new(value: T) -> Result<Self, AllocError> {
        Self::try_adopt(Box::new(value))
    }

    /// Take ownership of a boxed value.
    ///
    /// If the control block cannot be allocated the box is dropped before
    /// [`AllocError`] is returned.
    ///
    /// 接管一个装箱值的所有权。
    /// 如果无法分配控制块，box 会在返回 [`AllocError`] 之前被 drop。
    #[inline]
    pub fn from_box(value: Box<T>) -> Result<Self, AllocError> {
        Self::try_adopt(value)
    }

    /// Take ownership of a raw pointer. A null pointer yields an empty handle.
    ///
    /// # Safety
    /// `ptr` must be null or come from [`Box::into_raw`], and no other owner
    /// may exist for it. Building two independent handles from one pointer
    /// makes both destroy it: that is undefined behaviour. To share, clone an
    /// existing handle instead.
    ///
    /// 接管一个原始指针的所有权。空指针产生空句柄。
    /// # Safety
    /// `ptr` 必须为空或来自 [`Box::into_raw`]，并且不能存在其他所有者。
    /// 从同一个指针构造两个独立的句柄会导致两者都销毁它：这是未定义行为。
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Result<Self, AllocError> {
        // SAFETY: guaranteed by the caller.
        unsafe { Self::try_adopt_raw(ptr) }
    }

    fn adopt(value: Box<T>) -> Self {
        match Self::try_adopt(value) {
            Ok(ptr) => ptr,
            Err(err) => std::alloc::handle_alloc_error(err.layout()),
        }
    }

    fn try_adopt(value: Box<T>) -> Result<Self, AllocError> {
        let (block, ptr) = ControlBlock::allocate(value)?;
        Ok(Self {
            ptr: Some(ptr),
            block,
            _marker: PhantomData,
        })
    }

    unsafe fn try_adopt_raw(ptr: *mut T) -> Result<Self, AllocError> {
        if ptr.is_null() {
            return Ok(Self::null());
        }
        // SAFETY: `ptr` came from `Box::into_raw` and has no other owner.
        Self::try_adopt(unsafe { Box::from_raw(ptr) })
    }

    /// Replace the owned value with a new one.
    ///
    /// The new control block is built before the old ownership is released.
    /// Panics via [`std::alloc::handle_alloc_error`] on allocation failure.
    #[inline]
    pub fn reset(&mut self, value: T) {
        let mut fresh = Self::adopt(Box::new(value));
        self.swap(&mut fresh);
    }

    /// Fallible [`reset`](Self::reset). On error `self` is left unchanged and
    /// `value` has been dropped.
    #[inline]
    pub fn try_reset(&mut self, value: T) -> Result<(), AllocError> {
        self.reset_box(Box::new(value))
    }

    /// Replace the owned value with a boxed one. On error `self` is left
    /// unchanged and the box has been dropped.
    pub fn reset_box(&mut self, value: Box<T>) -> Result<(), AllocError> {
        let mut fresh = Self::try_adopt(value)?;
        self.swap(&mut fresh);
        Ok(())
    }

    /// Replace the owned value with a raw pointer. A null pointer empties the
    /// handle.
    ///
    /// # Panics
    /// Panics if `ptr` is the pointer this handle already views. Re-acquiring
    /// it would give the value a second, independent owner. Zero-sized `T` is
    /// exempt: every box of it shares one dangling address.
    ///
    /// # Safety
    /// Same contract as [`from_raw`](Self::from_raw).
    ///
    /// 用原始指针替换所拥有的值。空指针会清空句柄。
    /// # Panics
    /// 如果 `ptr` 就是此句柄当前观察的指针则 panic（零大小类型除外）。
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) -> Result<(), AllocError> {
        assert!(
            ptr.is_null()
                || std::mem::size_of::<T>() == 0
                || self.ptr.map(NonNull::as_ptr) != Some(ptr),
            "Handle::reset_raw: resetting to the pointer already owned is not allowed"
        );
        // SAFETY: guaranteed by the caller.
        let mut fresh = unsafe { Self::try_adopt_raw(ptr)? };
        self.swap(&mut fresh);
        Ok(())
    }
}

impl<T: ?Sized, C: RefCount> Clone for Handle<T, C> {
    /// Add an owner. Both handles then view the same value and report the same
    /// `use_count()`.
    /// 添加一个所有者。之后两个句柄观察同一个值并报告相同的 `use_count()`。
    #[inline]
    fn clone(&self) -> Self {
        debug_assert!(self.ptr.is_none() || self.block.use_count() != 0);
        Self {
            ptr: self.ptr,
            block: self.block.clone(),
            _marker: PhantomData,
        }
    }

    /// Copy-assign: the copy is fully built, then swapped in. The previous
    /// ownership is released last, so self-assignment is harmless.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        let mut copy = source.clone();
        self.swap(&mut copy);
    }
}

impl<T: ?Sized, C: RefCount> Default for Handle<T, C> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized, C: RefCount> Deref for Handle<T, C> {
    type Target = T;

    /// # Panics
    /// Panics if the handle is empty.
    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("Handle: dereferenced an empty handle"),
        }
    }
}

impl<T: ?Sized, C: RefCount> AsRef<T> for Handle<T, C> {
    #[inline]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: Ownable<C> + 'static, C: RefCount> From<T> for Handle<T, C> {
    #[inline]
    fn from(value: T) -> Self {
        Self::adopt(Box::new(value))
    }
}

impl<T: ?Sized, C: RefCount> From<&Handle<T, C>> for bool {
    /// `true` iff the handle owns a value.
    #[inline]
    fn from(ptr: &Handle<T, C>) -> bool {
        !ptr.is_empty()
    }
}

// Comparisons look at the viewed address only, never at the values.

/// Equal when both handles view the same address.
///
/// Distinct zero-sized values may share an address, so two unrelated
/// `SharedPtr<()>` compare equal and hash alike. Use
/// [`shares_owner`](Handle::shares_owner) to ask whether two handles own the
/// same value.
///
/// 两个句柄观察同一地址时相等。不同的零大小值可能共享地址，
/// 判断是否拥有同一值请使用 [`shares_owner`](Handle::shares_owner)。
impl<T: ?Sized, U: ?Sized, C: RefCount> PartialEq<Handle<U, C>> for Handle<T, C> {
    #[inline]
    fn eq(&self, other: &Handle<U, C>) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized, C: RefCount> Eq for Handle<T, C> {}

impl<T: ?Sized, U: ?Sized, C: RefCount> PartialOrd<Handle<U, C>> for Handle<T, C> {
    #[inline]
    fn partial_cmp(&self, other: &Handle<U, C>) -> Option<Ordering> {
        Some(self.addr().cmp(&other.addr()))
    }
}

impl<T: ?Sized, C: RefCount> Ord for Handle<T, C> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

/// Hashes the viewed address, consistent with [`PartialEq`].
impl<T: ?Sized, C: RefCount> Hash for Handle<T, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T: ?Sized, C: RefCount> fmt::Debug for Handle<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("ptr", &(self.addr() as *const ()))
            .field("use_count", &self.use_count())
            .finish()
    }
}

impl<T: ?Sized, C: RefCount> fmt::Pointer for Handle<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&(self.addr() as *const ()), f)
    }
}
