use crate::count::RefCount;
use crate::ptr::Handle;
use std::any::Any;
use std::ptr::NonNull;

impl<U: ?Sized, C: RefCount> Handle<U, C> {
    /// Static cast: view the owned value as a `T` derived from the current view.
    ///
    /// The result shares this handle's control block, so `use_count()` grows
    /// by one and the value is still destroyed exactly once, with its original
    /// type. `f` covers every conversion Rust checks at compile time:
    /// unsizing to a trait object, projecting to a field, or the identity.
    /// An empty handle maps to an empty handle without calling `f`.
    ///
    /// ```
    /// use shared_ptr::SharedPtr;
    /// use std::fmt::Display;
    ///
    /// let number = SharedPtr::new(7u32);
    /// let shown: SharedPtr<dyn Display> = number.map(|n| n as &dyn Display);
    /// assert_eq!(shown.to_string(), "7");
    /// assert_eq!(number.use_count(), 2);
    /// ```
    ///
    /// 静态转换：以从当前视图派生出的 `T` 来观察所拥有的值。
    /// 结果共享此句柄的控制块，因此 `use_count()` 加一，值仍然只会以其原始类型被销毁一次。
    /// 空句柄映射为空句柄，不会调用 `f`。
    pub fn map<T: ?Sized, F>(&self, f: F) -> Handle<T, C>
    where
        F: FnOnce(&U) -> &T,
    {
        match self.get() {
            Some(value) => {
                let view = NonNull::from(f(value));
                // SAFETY: `view` is borrowed from the value this handle owns,
                // so it lives exactly as long as the shared block keeps it.
                unsafe { Handle::alias(self, view) }
            }
            None => Handle::null(),
        }
    }

    /// Dynamic cast: view the owned value as a `T` if `f` can find one.
    ///
    /// When `f` returns `Some`, the result shares this handle's control block.
    /// When it returns `None` (or this handle is empty), the result is a fresh
    /// empty handle and this handle's `use_count()` is left untouched.
    ///
    /// 动态转换：如果 `f` 能找到 `T`，则以 `T` 观察所拥有的值。
    /// `f` 返回 `Some` 时结果共享此句柄的控制块；返回 `None`（或此句柄为空）时，
    /// 结果是一个全新的空句柄，此句柄的 `use_count()` 不受影响。
    pub fn try_map<T: ?Sized, F>(&self, f: F) -> Handle<T, C>
    where
        F: FnOnce(&U) -> Option<&T>,
    {
        match self.get().and_then(f) {
            Some(view) => {
                let view = NonNull::from(view);
                // SAFETY: as in `map`.
                unsafe { Handle::alias(self, view) }
            }
            None => Handle::null(),
        }
    }
}

impl<C: RefCount> Handle<dyn Any, C> {
    /// Runtime-checked downcast to the concrete type `T`.
    ///
    /// ```
    /// use shared_ptr::SharedPtr;
    /// use std::any::Any;
    ///
    /// let any: SharedPtr<dyn Any> = SharedPtr::new(5i32).map(|v| v as &dyn Any);
    /// assert_eq!(*any.downcast::<i32>(), 5);
    /// assert!(any.downcast::<String>().is_empty());
    /// ```
    #[inline]
    pub fn downcast<T: Any>(&self) -> Handle<T, C> {
        self.try_map(|value| value.downcast_ref::<T>())
    }
}

impl<C: RefCount> Handle<dyn Any + Send + Sync, C> {
    /// Runtime-checked downcast to the concrete type `T`.
    #[inline]
    pub fn downcast<T: Any>(&self) -> Handle<T, C> {
        self.try_map(|value| value.downcast_ref::<T>())
    }
}

/// Free-function form of [`Handle::map`].
#[inline]
pub fn static_pointer_cast<T, U, C, F>(ptr: &Handle<U, C>, f: F) -> Handle<T, C>
where
    T: ?Sized,
    U: ?Sized,
    C: RefCount,
    F: FnOnce(&U) -> &T,
{
    ptr.map(f)
}

/// Free-function form of [`Handle::try_map`].
#[inline]
pub fn dynamic_pointer_cast<T, U, C, F>(ptr: &Handle<U, C>, f: F) -> Handle<T, C>
where
    T: ?Sized,
    U: ?Sized,
    C: RefCount,
    F: FnOnce(&U) -> Option<&T>,
{
    ptr.try_map(f)
}
