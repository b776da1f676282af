/// 基础测试模块
/// 测试构造、复制、交换和计数查询的正确性
use super::{Tracked, drop_counter, drops};
use crate::SharedPtr;

/// 测试1: 空句柄
#[test]
fn test_null_handle_is_empty() {
    let ptr: SharedPtr<i32> = SharedPtr::null();

    assert_eq!(ptr.use_count(), 0);
    assert!(ptr.is_empty());
    assert!(!ptr.unique());
    assert!(!bool::from(&ptr));
    assert!(ptr.get().is_none());
    assert!(ptr.as_ptr().is_none());
}

/// 测试2: Default 等价于 null
#[test]
fn test_default_is_null() {
    let ptr: SharedPtr<String> = SharedPtr::default();
    assert_eq!(ptr.use_count(), 0);
    assert!(ptr == SharedPtr::<String>::null());
}

/// 测试3: 从值构造，成为第一个所有者
#[test]
fn test_new_is_first_owner() {
    let ptr = SharedPtr::new(42i32);

    assert_eq!(ptr.use_count(), 1);
    assert!(ptr.unique());
    assert!(bool::from(&ptr));
    assert_eq!(*ptr, 42);
    assert_eq!(ptr.get(), Some(&42));
}

/// 测试4: 复制增加计数，两个句柄观察同一个值
#[test]
fn test_clone_shares_value() {
    let first = SharedPtr::new(String::from("shared"));
    let second = first.clone();

    assert_eq!(first.use_count(), 2);
    assert_eq!(second.use_count(), 2);
    assert!(!first.unique());
    assert_eq!(first.as_ptr(), second.as_ptr());
    assert!(first.shares_owner(&second));
    assert_eq!(*second, "shared");
}

/// 测试5: 完整的共享场景
#[test]
fn test_two_owner_scenario() {
    let counter = drop_counter();

    let h1 = SharedPtr::new(Tracked::new(1, &counter));
    assert_eq!(h1.use_count(), 1);

    let h2 = h1.clone();
    assert_eq!(h1.use_count(), 2);
    assert_eq!(h2.use_count(), 2);

    drop(h1);
    assert_eq!(h2.use_count(), 1);
    assert_eq!(drops(&counter), 0);
    assert_eq!(h2.id, 1);

    drop(h2);
    assert_eq!(drops(&counter), 1);
}

/// 测试6: 交换两个句柄
#[test]
fn test_swap_exchanges_ownership() {
    let mut a = SharedPtr::new(1i32);
    let mut b = SharedPtr::new(2i32);
    let b_copy = b.clone();

    a.swap(&mut b);

    assert_eq!(*a, 2);
    assert_eq!(*b, 1);
    assert_eq!(a.use_count(), 2);
    assert_eq!(b.use_count(), 1);
    assert!(a.shares_owner(&b_copy));
}

/// 测试7: 从 Box 构造
#[test]
fn test_from_box() {
    let ptr = SharedPtr::from_box(Box::new(vec![1, 2, 3])).unwrap();
    assert_eq!(ptr.len(), 3);
    assert!(ptr.unique());
}

/// 测试8: 从空原始指针构造得到空句柄
#[test]
fn test_from_raw_null_is_empty() {
    let ptr = unsafe { SharedPtr::<u64>::from_raw(std::ptr::null_mut()) }.unwrap();
    assert!(ptr.is_empty());
    assert_eq!(ptr.use_count(), 0);
}

/// 测试9: 从原始指针接管所有权
#[test]
fn test_from_raw_takes_ownership() {
    let counter = drop_counter();
    let raw = Box::into_raw(Box::new(Tracked::new(9, &counter)));

    let ptr = unsafe { SharedPtr::from_raw(raw) }.unwrap();
    assert_eq!(ptr.as_ptr().map(|p| p.as_ptr()), Some(raw));
    assert_eq!(ptr.id, 9);

    drop(ptr);
    assert_eq!(drops(&counter), 1);
}

/// 测试10: From<T>
#[test]
fn test_from_value() {
    let ptr: SharedPtr<&str> = SharedPtr::from("value");
    assert_eq!(*ptr, "value");
    assert!(ptr.unique());
}

/// 测试11: clear 释放所有权
#[test]
fn test_clear_releases() {
    let counter = drop_counter();
    let mut ptr = SharedPtr::new(Tracked::new(0, &counter));

    ptr.clear();

    assert!(ptr.is_empty());
    assert_eq!(drops(&counter), 1);
}

/// 测试12: Debug 输出包含计数
#[test]
fn test_debug_output() {
    let ptr = SharedPtr::new(5u8);
    let _other = ptr.clone();
    let text = format!("{:?}", ptr);

    assert!(text.starts_with("Handle"));
    assert!(text.contains("use_count: 2"));
}
