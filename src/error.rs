use std::{fmt, io};

/// Recoverable failures reported by the allocator.
#[derive(Debug)]
pub enum BuddyError {
  /// Zero-sized request, or one larger than the biggest block can hold.
  InvalidArgument { requested: usize, max_payload: usize },
  /// The heap reached its ceiling and no free block is large enough.
  OutOfMemory {
    requested_order: usize,
    heap_size: usize,
  },
  /// Allocator settings that cannot describe a buddy heap.
  InvalidConfig { reason: &'static str },
  /// The address space for the heap could not be reserved.
  Reserve(io::Error),
}

impl BuddyError {
  /// The `errno` value a native allocator would report for this failure.
  pub fn errno(&self) -> libc::c_int {
    match self {
      Self::OutOfMemory { .. } | Self::Reserve(_) => libc::ENOMEM,
      Self::InvalidArgument { .. } | Self::InvalidConfig { .. } => libc::EINVAL,
    }
  }
}

impl fmt::Display for BuddyError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::InvalidArgument {
        requested,
        max_payload,
      } => write!(
        f,
        "Invalid request of {} bytes: size must be between 1 and {}",
        requested, max_payload
      ),
      Self::OutOfMemory {
        requested_order,
        heap_size,
      } => write!(
        f,
        "Out of memory: no block of order {} available in a {} byte heap",
        requested_order, heap_size
      ),
      Self::InvalidConfig { reason } => write!(f, "Invalid allocator configuration: {}", reason),
      Self::Reserve(err) => write!(f, "Could not reserve heap region: {}", err),
    }
  }
}

impl std::error::Error for BuddyError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Reserve(err) => Some(err),
      _ => None,
    }
  }
}

/// Why a caller-supplied pointer cannot have come from the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerError {
  /// Outside `[heap_start, heap_end)`, or too close to the start to carry a header.
  OutOfBounds,
  /// Header address is not on the minimum alignment boundary.
  Misaligned,
  /// Decoded order is outside `[ORDER_MIN, ORDER_MAX)`.
  BadOrder(usize),
  /// Header does not sit at the start of a block of its decoded order.
  NotBlockStart { order: usize },
  NotAllocated,
  /// `padded` bit disagrees with the recorded request size.
  PaddingMismatch,
  /// Recorded request size belongs to a different order.
  OrderMismatch { order: usize, expected: usize },
}

impl fmt::Display for PointerError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::OutOfBounds => write!(f, "pointer lies outside the heap"),
      Self::Misaligned => write!(f, "block header is misaligned"),
      Self::BadOrder(order) => write!(f, "header order {} is out of range", order),
      Self::NotBlockStart { order } => {
        write!(f, "header is not at the start of an order {} block", order)
      }
      Self::NotAllocated => write!(f, "block is not allocated"),
      Self::PaddingMismatch => write!(f, "padded bit disagrees with the requested size"),
      Self::OrderMismatch { order, expected } => write!(
        f,
        "block has order {} but its requested size needs order {}",
        order, expected
      ),
    }
  }
}

impl std::error::Error for PointerError {}

pub type Result<T> = std::result::Result<T, BuddyError>;
