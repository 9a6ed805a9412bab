/// Unit tests for the per-frame transient arena

use crate::gpu::arena::FrameArena;

#[test]
fn test_alloc_and_resolve() {
    let mut arena: FrameArena<u32> = FrameArena::with_limit(8);
    let a = arena.alloc(&[1, 2, 3]).unwrap();
    let b = arena.alloc(&[4, 5]).unwrap();

    assert_eq!(arena.get(a), &[1, 2, 3]);
    assert_eq!(arena.get(b), &[4, 5]);
    assert_eq!(arena.len(), 5);
}

#[test]
fn test_alloc_fails_past_the_budget() {
    let mut arena: FrameArena<u8> = FrameArena::with_limit(4);
    assert!(arena.alloc(&[0; 3]).is_some());
    assert!(arena.alloc(&[0; 2]).is_none());
    // The failed allocation leaves the arena untouched
    assert_eq!(arena.len(), 3);
    assert_eq!(arena.remaining(), 1);
    assert!(arena.alloc(&[0; 1]).is_some());
}

#[test]
fn test_push_fails_past_the_budget() {
    let mut arena: FrameArena<u64> = FrameArena::with_limit(2);
    assert!(arena.push(10).is_some());
    assert!(arena.push(20).is_some());
    assert!(arena.push(30).is_none());
    assert_eq!(arena.at(0), 10);
    assert_eq!(arena.at(1), 20);
}

#[test]
fn test_reset_reclaims_everything() {
    let mut arena: FrameArena<u32> = FrameArena::with_limit(4);
    arena.alloc(&[1, 2, 3, 4]).unwrap();
    assert!(arena.alloc(&[5]).is_none());

    arena.reset();
    assert!(arena.is_empty());
    assert_eq!(arena.remaining(), 4);
    let span = arena.alloc(&[7, 8]).unwrap();
    assert_eq!(arena.get(span), &[7, 8]);
}

#[test]
fn test_empty_alloc_yields_empty_span() {
    let mut arena: FrameArena<u32> = FrameArena::with_limit(4);
    let span = arena.alloc(&[]).unwrap();
    assert!(span.is_empty());
    assert_eq!(arena.get(span), &[] as &[u32]);
}
