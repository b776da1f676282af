//! Shared-ownership pointers with a separate control block.
//!
//! A [`Handle`] pairs a typed *view* of a heap value with a *control block*
//! that counts the handles owning that value. The value is destroyed exactly
//! once, when the last owner goes away, using the destructor of the type it was
//! allocated as.
//!
//! - [`SharedPtr<T>`] counts with a plain `Cell` ([`LocalCount`]). It is
//!   `!Send` and `!Sync`: concurrent use of one counter without external
//!   synchronization would be undefined behaviour, so the compiler rejects it.
//! - [`SyncSharedPtr<T>`] counts with an `AtomicUsize` ([`AtomicCount`]) and can
//!   be shared across threads when `T: Send + Sync`.
//!
//! Casts never copy the value. [`Handle::map`] (static cast) and
//! [`Handle::try_map`] / [`Handle::downcast`] (dynamic cast) return a handle
//! with a new view that shares the source's control block; a failed dynamic
//! cast returns an empty handle.
//!
//! ```
//! use shared_ptr::SharedPtr;
//! use std::any::Any;
//!
//! let h1 = SharedPtr::new(vec![1, 2, 3]);
//! let h2 = h1.clone();
//! assert_eq!(h2.use_count(), 2);
//!
//! let any: SharedPtr<dyn Any> = h1.map(|v| v as &dyn Any);
//! let back = any.downcast::<Vec<i32>>();
//! assert_eq!(back.len(), 3);
//! assert_eq!(h1.use_count(), 4);
//! assert!(back == h2);
//! ```
//!
//! 带有独立控制块的共享所有权指针。
//! [`Handle`] 将堆上值的类型化*视图*与统计拥有该值的句柄数量的*控制块*配对。
//! 当最后一个所有者消失时，值会以其被分配时的类型恰好销毁一次。

mod block;
mod cast;
mod count;
mod error;
mod ptr;
mod sync;

pub use cast::{dynamic_pointer_cast, static_pointer_cast};
pub use count::{AtomicCount, LocalCount, Ownable, RefCount};
pub use error::AllocError;
pub use ptr::{Handle, SharedPtr, SyncSharedPtr};

#[cfg(all(test, not(feature = "loom")))]
mod tests;
