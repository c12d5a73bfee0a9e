use std::{cmp::Ordering, fmt, ptr::NonNull};

use log::{debug, error, trace, warn};

use crate::{
  block::{Block, Link},
  config::{Config, HEADER_SIZE, MAX_PAYLOAD, ORDER_MAX, ORDER_MIN, TOP_ORDER},
  error::{BuddyError, PointerError, Result},
  free_list::FreeListTable,
  header::{Header, block_size, required_order},
  heap::HeapRegion,
  validate,
};

/// A block found while walking the heap from start to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the block header from the heap start.
  pub offset: usize,
  pub order: usize,
  pub allocated: bool,
}

/// Binary buddy allocator over a heap that grows in `MAX_BLOCK_SIZE` chunks.
///
/// Each instance owns its own heap region and free lists; dropping it unmaps
/// the region. The allocator is single-threaded: wrap it in a lock to share it.
pub struct BuddyAllocator {
  heap: HeapRegion,
  free_lists: FreeListTable,
  config: Config,
}

impl BuddyAllocator {
  pub fn new() -> Result<Self> {
    Self::with_config(Config::default())
  }

  pub fn with_config(config: Config) -> Result<Self> {
    let heap = HeapRegion::reserve(config.max_heap_size())?;

    debug!(
      "reserved buddy heap at {:?}, ceiling {} bytes",
      heap.start(),
      heap.capacity()
    );

    Ok(Self {
      heap,
      free_lists: FreeListTable::new(),
      config,
    })
  }

  /// Allocates a block able to hold `size` bytes and returns a pointer to its
  /// payload.
  ///
  /// Fails with [`BuddyError::InvalidArgument`] for a zero or oversized
  /// request and with [`BuddyError::OutOfMemory`] once the heap is at its
  /// ceiling and nothing large enough is free. The heap is untouched on
  /// failure.
  pub fn acquire(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let rsize = Self::checked_size(size)?;
    let order = required_order(size);
    let offset = self.take_block(order)?;

    Block::Allocated(Header::allocated(order, rsize)).write(&mut self.heap, offset);
    trace!("acquire({}) -> order {} at {:#x}", size, order, offset);

    Ok(self.heap.ptr_at(offset + HEADER_SIZE))
  }

  /// Returns the block behind `ptr` to the free lists, merging it with free
  /// buddies.
  ///
  /// Aborts the process if `ptr` fails validation.
  ///
  /// # Safety
  ///
  /// `ptr` must not be used after this call.
  pub unsafe fn release(
    &mut self,
    ptr: NonNull<u8>,
  ) {
    let (offset, header) = self.validated(ptr);

    trace!(
      "release({:?}) order {} at {:#x}",
      ptr, header.order, offset
    );
    self.coalesce(offset, header.order);
  }

  /// Changes the size of the allocation behind `ptr`, keeping its first
  /// `min(old, new)` bytes.
  ///
  /// A `None` pointer behaves like [`acquire`](Self::acquire). A zero size
  /// releases the block and yields `Ok(None)`. Shrinking across an order
  /// boundary splits the block in place; growing past its order moves the
  /// data to a new block.
  ///
  /// Aborts the process if `ptr` fails validation.
  ///
  /// # Safety
  ///
  /// If the returned pointer differs from `ptr`, `ptr` must not be used
  /// again. The same holds after a zero-size call.
  pub unsafe fn resize(
    &mut self,
    ptr: Option<NonNull<u8>>,
    size: usize,
  ) -> Result<Option<NonNull<u8>>> {
    let Some(ptr) = ptr else {
      return self.acquire(size).map(Some);
    };

    if size == 0 {
      unsafe { self.release(ptr) };
      return Ok(None);
    }

    let rsize = Self::checked_size(size)?;
    let (offset, header) = self.validated(ptr);
    let order = required_order(size);

    match order.cmp(&header.order) {
      Ordering::Equal => {
        Block::Allocated(Header::allocated(order, rsize)).write(&mut self.heap, offset);
        trace!("resize({:?}, {}) in place", ptr, size);
        Ok(Some(ptr))
      }
      Ordering::Greater => {
        let moved = self.acquire(size)?;
        let to = moved.as_ptr() as usize - self.heap.start() as usize;

        self.heap.copy(offset + HEADER_SIZE, to, header.rsize as usize);
        self.coalesce(offset, header.order);

        trace!("resize({:?}, {}) moved to {:?}", ptr, size, moved);
        Ok(Some(moved))
      }
      Ordering::Less => {
        self.split(offset, header.order, order);
        Block::Allocated(Header::allocated(order, rsize)).write(&mut self.heap, offset);

        trace!(
          "resize({:?}, {}) shrunk from order {} to {}",
          ptr, size, header.order, order
        );
        Ok(Some(ptr))
      }
    }
  }

  /// Runs the pointer validator without aborting.
  pub fn check(
    &self,
    ptr: *const u8,
  ) -> std::result::Result<Header, PointerError> {
    validate::check(&self.heap, ptr).map(|(_, header)| header)
  }

  pub fn heap_start(&self) -> *const u8 {
    self.heap.start()
  }

  pub fn heap_end(&self) -> *const u8 {
    self.heap.end()
  }

  pub fn heap_size(&self) -> usize {
    self.heap.len()
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Offset of `ptr` from the heap start, if it points into the heap.
  pub fn offset_of(
    &self,
    ptr: *const u8,
  ) -> Option<usize> {
    self.heap.offset_of(ptr)
  }

  pub fn free_list_is_empty(
    &self,
    order: usize,
  ) -> bool {
    self.free_lists.is_empty(order)
  }

  /// Header offsets of the free blocks of `order`, most recently freed first.
  pub fn free_list(
    &self,
    order: usize,
  ) -> Vec<usize> {
    self.free_lists.iter(&self.heap, order).collect()
  }

  /// Every block of the heap in address order.
  pub fn blocks(&self) -> Vec<BlockInfo> {
    let mut blocks = Vec::new();
    let mut offset = 0;

    while offset < self.heap.len() {
      let block = Block::read(&self.heap, offset);
      let order = block.order();

      blocks.push(BlockInfo {
        offset,
        order,
        allocated: !block.is_free(),
      });

      offset += block_size(order.max(ORDER_MIN));
    }

    blocks
  }

  fn checked_size(size: usize) -> Result<u32> {
    if size == 0 || size > MAX_PAYLOAD {
      return Err(BuddyError::InvalidArgument {
        requested: size,
        max_payload: MAX_PAYLOAD,
      });
    }

    Ok(size as u32)
  }

  fn validated(
    &self,
    ptr: NonNull<u8>,
  ) -> (usize, Header) {
    match validate::check(&self.heap, ptr.as_ptr()) {
      Ok(found) => found,
      Err(reason) => {
        error!("invalid pointer {:?}: {}", ptr, reason);
        std::process::abort();
      }
    }
  }

  /// Finds a free block of exactly `order`, splitting a larger one or growing
  /// the heap when needed.
  fn take_block(
    &mut self,
    order: usize,
  ) -> Result<usize> {
    for _ in 0..=self.config.max_chunks() {
      if let Some(offset) = self.free_lists.pop(&mut self.heap, order) {
        return Ok(offset);
      }

      let larger = (order + 1..ORDER_MAX).find(|&larger| !self.free_lists.is_empty(larger));

      if let Some(larger) = larger {
        if let Some(offset) = self.free_lists.pop(&mut self.heap, larger) {
          self.split(offset, larger, order);
          return Ok(offset);
        }
      }

      if !self.grow() {
        break;
      }
    }

    warn!(
      "out of memory for order {} with a {} byte heap",
      order,
      self.heap.len()
    );

    Err(BuddyError::OutOfMemory {
      requested_order: order,
      heap_size: self.heap.len(),
    })
  }

  fn grow(&mut self) -> bool {
    match self.heap.grow() {
      Some(offset) => {
        self.free_lists.push(&mut self.heap, TOP_ORDER, offset);
        debug!("heap grew to {} bytes", self.heap.len());
        true
      }
      None => false,
    }
  }

  /// Halves the block at `offset` from order `from` down to `to`, freeing
  /// each upper half. The lower half keeps `offset`; its header is left for
  /// the caller to write.
  fn split(
    &mut self,
    offset: usize,
    from: usize,
    to: usize,
  ) {
    let mut order = from;

    while order > to {
      order -= 1;
      let upper = offset + block_size(order);

      self.free_lists.push(&mut self.heap, order, upper);
      trace!("split {:#x} -> free order {} at {:#x}", offset, order, upper);
    }
  }

  /// Merges the newly freed block at `offset` with free buddies of the same
  /// order, then links the result into its free list.
  fn coalesce(
    &mut self,
    offset: usize,
    order: usize,
  ) {
    let mut offset = offset;
    let mut order = order;

    while order < TOP_ORDER {
      let size = block_size(order);
      let buddy = offset ^ size;

      if buddy + size > self.heap.len() {
        break;
      }

      match Block::read(&self.heap, buddy) {
        Block::Free {
          order: buddy_order,
          prev,
          next,
        } if buddy_order == order && prev != Link::Unlinked && next != Link::Unlinked => {}
        _ => break,
      }

      if !self.free_lists.remove(&mut self.heap, order, buddy) {
        break;
      }

      offset = offset.min(buddy);
      order += 1;
      trace!("coalesced into order {} at {:#x}", order, offset);
    }

    self.free_lists.push(&mut self.heap, order, offset);
  }
}

impl fmt::Display for BuddyAllocator {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(
      f,
      "heap {:?}..{:?} ({} bytes)",
      self.heap.start(),
      self.heap.end(),
      self.heap.len()
    )?;

    for order in ORDER_MIN..ORDER_MAX {
      write!(f, "[{:2}] HEAD", order)?;

      if self.free_lists.is_empty(order) {
        writeln!(f, " -> NONE")?;
        continue;
      }

      for offset in self.free_lists.iter(&self.heap, order) {
        write!(f, " -> {:#x}", offset)?;
      }

      writeln!(f)?;
    }

    Ok(())
  }
}
