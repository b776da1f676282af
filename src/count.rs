use crate::sync::{AtomicUsize, Cell, Ordering, fence};

/// Counts beyond this are treated as a leak of handles and abort the process.
/// 超过此值的计数被视为句柄泄漏，直接中止进程。
const MAX_REFCOUNT: usize = isize::MAX as usize;

mod sealed {
    pub trait Sealed {}

    pub trait SealedOwnable<C> {}
}

/// The strong-reference counter stored inside a control block.
///
/// Two implementations exist:
/// - [`LocalCount`]: a plain `Cell<usize>`. Handles using it are neither `Send`
///   nor `Sync`; sharing them across threads is rejected by the compiler.
/// - [`AtomicCount`]: an `AtomicUsize`. Use it when handles are sent to or
///   shared between threads.
///
/// This trait is sealed.
///
/// 存储在控制块中的强引用计数器。
/// - [`LocalCount`]：普通的 `Cell<usize>`，使用它的句柄既不是 `Send` 也不是 `Sync`。
/// - [`AtomicCount`]：`AtomicUsize`，在线程间传递或共享句柄时使用。
pub trait RefCount: sealed::Sealed {
    /// A counter for a freshly acquired value (count = 1).
    fn one() -> Self;

    /// Current count.
    fn get(&self) -> usize;

    /// Add one owner.
    fn increment(&self);

    /// Remove one owner and return the remaining count.
    ///
    /// When this returns `0` the caller is the last owner and every write made
    /// by previous owners is visible to it.
    ///
    /// 移除一个所有者并返回剩余计数。
    /// 返回 `0` 时调用者是最后一个所有者，之前所有者的写入对其可见。
    fn decrement(&self) -> usize;
}

/// Single-threaded counter. The default for [`SharedPtr`](crate::SharedPtr).
///
/// Concurrent `increment`/`decrement` on the same counter is undefined
/// behaviour; the `!Sync` `Cell` keeps handles built on it on one thread.
///
/// 单线程计数器，是 [`SharedPtr`](crate::SharedPtr) 的默认计数器。
/// 对同一计数器并发地 `increment`/`decrement` 是未定义行为；
/// `!Sync` 的 `Cell` 使基于它的句柄只能停留在一个线程上。
pub struct LocalCount(Cell<usize>);

impl sealed::Sealed for LocalCount {}

impl std::fmt::Debug for LocalCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LocalCount").field(&self.get()).finish()
    }
}

impl RefCount for LocalCount {
    #[inline]
    fn one() -> Self {
        LocalCount(Cell::new(1))
    }

    #[inline]
    fn get(&self) -> usize {
        self.0.get()
    }

    #[inline]
    fn increment(&self) {
        let count = self.0.get();
        if count >= MAX_REFCOUNT {
            std::process::abort();
        }
        self.0.set(count + 1);
    }

    #[inline]
    fn decrement(&self) -> usize {
        let count = self.0.get();
        assert!(
            count > 0,
            "BUG: Releasing a control block whose count is already 0. \
             This indicates a double release."
        );
        self.0.set(count - 1);
        count - 1
    }
}

/// Thread-safe counter for [`SyncSharedPtr`](crate::SyncSharedPtr).
///
/// Increments are `Relaxed`: a new owner can only be made from an existing one,
/// which already keeps the value alive. Decrements are `Release`, and the
/// thread that brings the count to zero issues an `Acquire` fence before the
/// value is destroyed, so no owner's accesses can be reordered past the drop.
///
/// 用于 [`SyncSharedPtr`](crate::SyncSharedPtr) 的线程安全计数器。
/// 递增使用 `Relaxed`：新所有者只能从已有所有者产生，而已有所有者已保证值存活。
/// 递减使用 `Release`，把计数降为零的线程在销毁值之前执行 `Acquire` 屏障，
/// 因此任何所有者的访问都不会被重排到 drop 之后。
pub struct AtomicCount(AtomicUsize);

impl sealed::Sealed for AtomicCount {}

impl std::fmt::Debug for AtomicCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicCount").field(&self.get()).finish()
    }
}

impl RefCount for AtomicCount {
    #[inline]
    fn one() -> Self {
        AtomicCount(AtomicUsize::new(1))
    }

    #[inline]
    fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    fn increment(&self) {
        let old = self.0.fetch_add(1, Ordering::Relaxed);
        if old >= MAX_REFCOUNT {
            std::process::abort();
        }
    }

    #[inline]
    fn decrement(&self) -> usize {
        let old = self.0.fetch_sub(1, Ordering::Release);
        assert!(
            old > 0,
            "BUG: Releasing a control block whose count is already 0. \
             This indicates a double release."
        );
        if old == 1 {
            fence(Ordering::Acquire);
        }
        old - 1
    }
}

/// Types that may be owned by a control block counting with `C`.
///
/// Any `'static` type can be owned through [`LocalCount`]. Only `Send + Sync`
/// types can be owned through [`AtomicCount`]: the last owner may drop the
/// value on any thread, and casts may later expose a different view of it.
///
/// 可以被使用 `C` 计数的控制块拥有的类型。
/// 任何类型都可以通过 [`LocalCount`] 被拥有；只有 `Send + Sync` 的类型才能通过
/// [`AtomicCount`] 被拥有：最后一个所有者可能在任意线程上 drop 该值。
pub trait Ownable<C: RefCount>: sealed::SealedOwnable<C> {}

impl<T: ?Sized> sealed::SealedOwnable<LocalCount> for T {}
impl<T: ?Sized> Ownable<LocalCount> for T {}

impl<T: ?Sized + Send + Sync> sealed::SealedOwnable<AtomicCount> for T {}
impl<T: ?Sized + Send + Sync> Ownable<AtomicCount> for T {}
