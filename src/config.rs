use crate::error::{BuddyError, Result};

/// Smallest block order. A block of this order holds the header plus the two
/// free-list links.
pub const ORDER_MIN: usize = 5;

/// Exclusive upper bound on block orders.
pub const ORDER_MAX: usize = 15;

/// Order of the largest block, and of every chunk the heap grows by.
pub const TOP_ORDER: usize = ORDER_MAX - 1;

/// Number of per-order free lists.
pub const NUM_FREE_LISTS: usize = ORDER_MAX - ORDER_MIN;

/// Size of the packed block header.
pub const HEADER_SIZE: usize = 8;

pub const MIN_BLOCK_SIZE: usize = 1 << ORDER_MIN;
pub const MAX_BLOCK_SIZE: usize = 1 << TOP_ORDER;

/// Largest request the allocator can serve.
pub const MAX_PAYLOAD: usize = MAX_BLOCK_SIZE - HEADER_SIZE;

/// Default ceiling for the heap region.
pub const MAX_HEAP_SIZE: usize = 4 * MAX_BLOCK_SIZE;

/// Every block header sits on this boundary.
pub const MIN_ALIGNMENT: usize = 8;

// The header stores the order in four bits.
const _: () = assert!(ORDER_MAX <= 16);
const _: () = assert!(ORDER_MIN < ORDER_MAX);
// Header plus the prev/next links of a free block.
const _: () = assert!(MIN_BLOCK_SIZE >= HEADER_SIZE + 2 * 8);
const _: () = assert!(HEADER_SIZE % MIN_ALIGNMENT == 0);

/// Settings fixed when an allocator is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  max_heap_size: usize,
}

impl Config {
  /// Creates a configuration with the given heap ceiling, which must be a
  /// non-zero multiple of [`MAX_BLOCK_SIZE`].
  pub fn new(max_heap_size: usize) -> Result<Self> {
    if max_heap_size == 0 {
      return Err(BuddyError::InvalidConfig {
        reason: "max heap size must be greater than zero",
      });
    }

    if max_heap_size % MAX_BLOCK_SIZE != 0 {
      return Err(BuddyError::InvalidConfig {
        reason: "max heap size must be a multiple of the largest block size",
      });
    }

    Ok(Self { max_heap_size })
  }

  pub fn max_heap_size(&self) -> usize {
    self.max_heap_size
  }

  /// How many times the heap can grow before hitting the ceiling.
  pub fn max_chunks(&self) -> usize {
    self.max_heap_size / MAX_BLOCK_SIZE
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      max_heap_size: MAX_HEAP_SIZE,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.max_heap_size(), MAX_HEAP_SIZE);
    assert_eq!(config.max_chunks(), 4);
  }

  #[test]
  fn test_rejects_bad_heap_sizes() {
    assert!(matches!(
      Config::new(0),
      Err(BuddyError::InvalidConfig { .. })
    ));
    assert!(matches!(
      Config::new(MAX_BLOCK_SIZE + 1),
      Err(BuddyError::InvalidConfig { .. })
    ));
    assert!(matches!(
      Config::new(MAX_BLOCK_SIZE / 2),
      Err(BuddyError::InvalidConfig { .. })
    ));

    let config = Config::new(3 * MAX_BLOCK_SIZE).unwrap();
    assert_eq!(config.max_chunks(), 3);
  }
}
