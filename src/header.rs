//! Block header codec.
//!
//! Every block starts with one packed 64-bit word:
//!
//! ```text
//!   63                32 31          6   5    4      1    0
//!   ┌──────────────────┬─────────────┬────────┬────────┬───────────┐
//!   │      rsize       │   unused    │ padded │ order  │ allocated │
//!   └──────────────────┴─────────────┴────────┴────────┴───────────┘
//! ```

use crate::config::{HEADER_SIZE, ORDER_MIN};

const ALLOCATED_BIT: u64 = 1;
const ORDER_SHIFT: u32 = 1;
const ORDER_MASK: u64 = 0xF;
const PADDED_BIT: u64 = 1 << 5;
const RSIZE_SHIFT: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub allocated: bool,
  pub order: usize,
  pub padded: bool,
  /// Bytes the caller asked for. Meaningless while the block is free.
  pub rsize: u32,
}

impl Header {
  /// Header of an allocated block of `order` holding a request of `rsize` bytes.
  pub fn allocated(
    order: usize,
    rsize: u32,
  ) -> Self {
    Self {
      allocated: true,
      order,
      padded: required_padding(order, rsize as usize) != 0,
      rsize,
    }
  }

  pub fn free(order: usize) -> Self {
    Self {
      allocated: false,
      order,
      padded: false,
      rsize: 0,
    }
  }

  pub fn encode(self) -> u64 {
    let mut word = ((self.order as u64) & ORDER_MASK) << ORDER_SHIFT;

    if self.allocated {
      word |= ALLOCATED_BIT;
    }

    if self.padded {
      word |= PADDED_BIT;
    }

    word | ((self.rsize as u64) << RSIZE_SHIFT)
  }

  pub fn decode(word: u64) -> Self {
    Self {
      allocated: word & ALLOCATED_BIT != 0,
      order: ((word >> ORDER_SHIFT) & ORDER_MASK) as usize,
      padded: word & PADDED_BIT != 0,
      rsize: (word >> RSIZE_SHIFT) as u32,
    }
  }
}

/// Size in bytes of a block of `order`, header included.
#[inline]
pub fn block_size(order: usize) -> usize {
  1 << order
}

/// Bytes a block of `order` can hand out after its header.
#[inline]
pub fn payload_capacity(order: usize) -> usize {
  block_size(order) - HEADER_SIZE
}

/// Smallest order whose block fits `rsize` bytes plus the header.
pub fn required_order(rsize: usize) -> usize {
  let needed = (rsize + HEADER_SIZE).next_power_of_two();
  (needed.trailing_zeros() as usize).max(ORDER_MIN)
}

/// Unused payload bytes when a block of `order` holds `rsize` bytes.
///
/// Saturates at zero for requests that do not fit the block at all.
pub fn required_padding(
  order: usize,
  rsize: usize,
) -> usize {
  payload_capacity(order).saturating_sub(rsize)
}
