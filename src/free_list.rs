use crate::{
  block::{self, Block, Link},
  config::{NUM_FREE_LISTS, ORDER_MAX, ORDER_MIN},
  heap::HeapRegion,
};

#[derive(Debug, Clone, Copy)]
struct Sentinel {
  prev: Link,
  next: Link,
}

impl Sentinel {
  const EMPTY: Sentinel = Sentinel {
    prev: Link::Sentinel,
    next: Link::Sentinel,
  };
}

/// One circular doubly-linked list of free blocks per order.
///
/// Sentinels live here; every other node is the free block itself, with its
/// links stored in the bytes after its header.
pub struct FreeListTable {
  heads: [Sentinel; NUM_FREE_LISTS],
}

impl FreeListTable {
  pub fn new() -> Self {
    Self {
      heads: [Sentinel::EMPTY; NUM_FREE_LISTS],
    }
  }

  fn index(order: usize) -> usize {
    assert!(
      (ORDER_MIN..ORDER_MAX).contains(&order),
      "order {} has no free list",
      order
    );
    order - ORDER_MIN
  }

  pub fn is_empty(
    &self,
    order: usize,
  ) -> bool {
    let head = &self.heads[Self::index(order)];
    head.next == Link::Sentinel && head.prev == Link::Sentinel
  }

  /// Formats the block at `offset` as a free block of `order` and links it
  /// at the head of that order's list.
  pub fn push(
    &mut self,
    heap: &mut HeapRegion,
    order: usize,
    offset: usize,
  ) {
    let index = Self::index(order);
    let old_head = self.heads[index].next;

    Block::Free {
      order,
      prev: Link::Sentinel,
      next: old_head,
    }
    .write(heap, offset);

    self.set_prev(heap, index, old_head, Link::Block(offset));
    self.heads[index].next = Link::Block(offset);
  }

  /// Unlinks and returns the head of the list for `order`.
  pub fn pop(
    &mut self,
    heap: &mut HeapRegion,
    order: usize,
  ) -> Option<usize> {
    let index = Self::index(order);

    match self.heads[index].next {
      Link::Block(offset) => {
        self.unlink(heap, index, offset);
        Some(offset)
      }
      _ => None,
    }
  }

  /// Walks the list for `order` and unlinks the block at `offset`.
  ///
  /// Returns whether the block was found.
  pub fn remove(
    &mut self,
    heap: &mut HeapRegion,
    order: usize,
    offset: usize,
  ) -> bool {
    let index = Self::index(order);
    let found = self.iter(heap, order).any(|node| node == offset);

    if found {
      self.unlink(heap, index, offset);
    }

    found
  }

  /// Offsets of the blocks on the list for `order`, head first.
  pub fn iter<'a>(
    &self,
    heap: &'a HeapRegion,
    order: usize,
  ) -> FreeListIter<'a> {
    FreeListIter {
      heap,
      current: self.heads[Self::index(order)].next,
    }
  }

  fn unlink(
    &mut self,
    heap: &mut HeapRegion,
    index: usize,
    offset: usize,
  ) {
    let Block::Free { prev, next, .. } = Block::read(heap, offset) else {
      panic!("block at {:#x} is on a free list but marked allocated", offset);
    };

    self.set_next(heap, index, prev, next);
    self.set_prev(heap, index, next, prev);

    block::set_prev(heap, offset, Link::Unlinked);
    block::set_next(heap, offset, Link::Unlinked);
  }

  fn set_prev(
    &mut self,
    heap: &mut HeapRegion,
    index: usize,
    node: Link,
    link: Link,
  ) {
    match node {
      Link::Sentinel => self.heads[index].prev = link,
      Link::Block(offset) => block::set_prev(heap, offset, link),
      Link::Unlinked => panic!("free list {} has a dangling link", index),
    }
  }

  fn set_next(
    &mut self,
    heap: &mut HeapRegion,
    index: usize,
    node: Link,
    link: Link,
  ) {
    match node {
      Link::Sentinel => self.heads[index].next = link,
      Link::Block(offset) => block::set_next(heap, offset, link),
      Link::Unlinked => panic!("free list {} has a dangling link", index),
    }
  }
}

impl Default for FreeListTable {
  fn default() -> Self {
    Self::new()
  }
}

pub struct FreeListIter<'a> {
  heap: &'a HeapRegion,
  current: Link,
}

impl Iterator for FreeListIter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let Link::Block(offset) = self.current else {
      return None;
    };

    self.current = match Block::read(self.heap, offset) {
      Block::Free { next, .. } => next,
      Block::Allocated(_) => Link::Sentinel,
    };

    Some(offset)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::MAX_BLOCK_SIZE;

  fn heap() -> HeapRegion {
    let mut heap = HeapRegion::reserve(MAX_BLOCK_SIZE).unwrap();
    heap.grow().unwrap();
    heap
  }

  #[test]
  fn test_empty_table() {
    let mut heap = heap();
    let mut lists = FreeListTable::new();

    for order in ORDER_MIN..ORDER_MAX {
      assert!(lists.is_empty(order));
      assert_eq!(lists.pop(&mut heap, order), None);
    }
  }

  #[test]
  fn test_push_pop_is_lifo() {
    let mut heap = heap();
    let mut lists = FreeListTable::new();

    lists.push(&mut heap, 6, 0);
    lists.push(&mut heap, 6, 128);
    lists.push(&mut heap, 6, 256);

    assert!(!lists.is_empty(6));
    assert!(lists.is_empty(7));
    assert_eq!(lists.iter(&heap, 6).collect::<Vec<_>>(), vec![256, 128, 0]);

    assert_eq!(lists.pop(&mut heap, 6), Some(256));
    assert_eq!(lists.pop(&mut heap, 6), Some(128));
    assert_eq!(lists.pop(&mut heap, 6), Some(0));
    assert_eq!(lists.pop(&mut heap, 6), None);
    assert!(lists.is_empty(6));
  }

  #[test]
  fn test_single_node_points_at_sentinel() {
    let mut heap = heap();
    let mut lists = FreeListTable::new();

    lists.push(&mut heap, ORDER_MIN, 64);

    assert_eq!(
      Block::read(&heap, 64),
      Block::Free {
        order: ORDER_MIN,
        prev: Link::Sentinel,
        next: Link::Sentinel,
      }
    );
  }

  #[test]
  fn test_remove_from_middle_and_ends() {
    let mut heap = heap();
    let mut lists = FreeListTable::new();

    for offset in [0, 32, 64, 96] {
      lists.push(&mut heap, ORDER_MIN, offset);
    }

    assert!(lists.remove(&mut heap, ORDER_MIN, 32));
    assert_eq!(lists.iter(&heap, ORDER_MIN).collect::<Vec<_>>(), vec![96, 64, 0]);

    assert!(lists.remove(&mut heap, ORDER_MIN, 96));
    assert!(lists.remove(&mut heap, ORDER_MIN, 0));
    assert_eq!(lists.iter(&heap, ORDER_MIN).collect::<Vec<_>>(), vec![64]);

    assert!(!lists.remove(&mut heap, ORDER_MIN, 0));
    assert_eq!(
      Block::read(&heap, 0),
      Block::Free {
        order: ORDER_MIN,
        prev: Link::Unlinked,
        next: Link::Unlinked,
      }
    );

    assert!(lists.remove(&mut heap, ORDER_MIN, 64));
    assert!(lists.is_empty(ORDER_MIN));
  }

  #[test]
  fn test_lists_are_independent() {
    let mut heap = heap();
    let mut lists = FreeListTable::new();

    lists.push(&mut heap, ORDER_MIN, 0);
    lists.push(&mut heap, 8, 256);

    assert!(!lists.remove(&mut heap, 8, 0));
    assert_eq!(lists.pop(&mut heap, 8), Some(256));
    assert_eq!(lists.pop(&mut heap, ORDER_MIN), Some(0));
  }
}
