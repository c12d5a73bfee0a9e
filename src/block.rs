use crate::{
  config::HEADER_SIZE,
  header::Header,
  heap::HeapRegion,
};

const UNLINKED: u64 = u64::MAX;
const SENTINEL: u64 = u64::MAX - 1;

/// One end of a free-list edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
  /// Not on any free list.
  Unlinked,
  /// The sentinel of the list for the block's own order.
  Sentinel,
  /// Another free block, by heap offset.
  Block(usize),
}

impl Link {
  fn encode(self) -> u64 {
    match self {
      Link::Unlinked => UNLINKED,
      Link::Sentinel => SENTINEL,
      Link::Block(offset) => offset as u64,
    }
  }

  fn decode(word: u64) -> Self {
    match word {
      UNLINKED => Link::Unlinked,
      SENTINEL => Link::Sentinel,
      offset => Link::Block(offset as usize),
    }
  }
}

/// What the bytes at the start of a block mean, chosen by its allocated bit.
///
/// ```text
///   Free:       ┌────────┬────────┬────────┬──────────────────┐
///               │ header │  prev  │  next  │      unused      │
///               └────────┴────────┴────────┴──────────────────┘
///
///   Allocated:  ┌────────┬──────────────────────────┬─────────┐
///               │ header │     payload (rsize)      │ padding │
///               └────────┴──────────────────────────┴─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
  Free { order: usize, prev: Link, next: Link },
  Allocated(Header),
}

impl Block {
  pub fn read(
    heap: &HeapRegion,
    offset: usize,
  ) -> Self {
    let header = Header::decode(heap.read_word(offset));

    if header.allocated {
      return Block::Allocated(header);
    }

    Block::Free {
      order: header.order,
      prev: Link::decode(heap.read_word(offset + HEADER_SIZE)),
      next: Link::decode(heap.read_word(offset + HEADER_SIZE + 8)),
    }
  }

  pub fn write(
    self,
    heap: &mut HeapRegion,
    offset: usize,
  ) {
    match self {
      Block::Free { order, prev, next } => {
        heap.write_word(offset, Header::free(order).encode());
        heap.write_word(offset + HEADER_SIZE, prev.encode());
        heap.write_word(offset + HEADER_SIZE + 8, next.encode());
      }
      Block::Allocated(header) => heap.write_word(offset, header.encode()),
    }
  }

  pub fn order(&self) -> usize {
    match self {
      Block::Free { order, .. } => *order,
      Block::Allocated(header) => header.order,
    }
  }

  pub fn is_free(&self) -> bool {
    matches!(self, Block::Free { .. })
  }
}

pub fn set_prev(
  heap: &mut HeapRegion,
  offset: usize,
  link: Link,
) {
  heap.write_word(offset + HEADER_SIZE, link.encode());
}

pub fn set_next(
  heap: &mut HeapRegion,
  offset: usize,
  link: Link,
) {
  heap.write_word(offset + HEADER_SIZE + 8, link.encode());
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{MAX_BLOCK_SIZE, ORDER_MIN};

  fn heap() -> HeapRegion {
    let mut heap = HeapRegion::reserve(MAX_BLOCK_SIZE).unwrap();
    heap.grow().unwrap();
    heap
  }

  #[test]
  fn test_free_block_links() {
    let mut heap = heap();
    let block = Block::Free {
      order: 7,
      prev: Link::Sentinel,
      next: Link::Block(512),
    };

    block.write(&mut heap, 128);
    assert_eq!(Block::read(&heap, 128), block);

    set_prev(&mut heap, 128, Link::Block(0));
    set_next(&mut heap, 128, Link::Unlinked);

    assert_eq!(
      Block::read(&heap, 128),
      Block::Free {
        order: 7,
        prev: Link::Block(0),
        next: Link::Unlinked,
      }
    );
  }

  #[test]
  fn test_allocated_block_leaves_payload_alone() {
    let mut heap = heap();
    heap.write_word(8, 0x1122_3344);

    let block = Block::Allocated(Header::allocated(ORDER_MIN, 4));
    block.write(&mut heap, 0);

    assert_eq!(Block::read(&heap, 0), block);
    assert_eq!(block.order(), ORDER_MIN);
    assert!(!block.is_free());
    assert_eq!(heap.read_word(8), 0x1122_3344);
  }
}
