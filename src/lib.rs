//! # rbuddy - A Binary Buddy Memory Allocator
//!
//! This crate provides a **binary buddy allocator** that serves variable-size
//! requests out of a heap grown in fixed power-of-two chunks, splitting and
//! coalescing blocks to keep fragmentation bounded.
//!
//! ## Overview
//!
//! Every block has a size of `2^order` bytes, header included. A request is
//! rounded up to the smallest order that fits it, and larger blocks are split
//! in halves ("buddies") until one of the right order exists:
//!
//! ```text
//!   Splitting a 16 KiB chunk for a 4 byte request (order 5, 32 bytes):
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          order 14 (16 KiB)                           │
//!   └──────────────────────────────────────────────────────────────────────┘
//!   ┌──────────────────────────────────┬───────────────────────────────────┐
//!   │            order 13              │        order 13 (free)            │
//!   └──────────────────────────────────┴───────────────────────────────────┘
//!                    ...                              ...
//!   ┌────┬────┬────────┬─────────────────┬───────────────────────────────────┐
//!   │ 5  │ 5  │   6    │   7 ... 12      │        order 13 (free)            │
//!   └────┴────┴────────┴─────────────────┴───────────────────────────────────┘
//!     ▲
//!     └── handed out; every upper half went to its order's free list
//! ```
//!
//! Releasing a block merges it with its buddy (address XOR block size) while
//! the buddy is free and of the same order, climbing back towards the top
//! order. Two top-order blocks are never merged.
//!
//! ## Crate Structure
//!
//! ```text
//!   rbuddy
//!   ├── align      - Alignment macros (align_to!, is_aligned!)
//!   ├── config     - Orders, header size, heap ceiling
//!   ├── heap       - Growable heap region (internal)
//!   ├── header     - Block header codec
//!   ├── block      - Free/allocated block layout (internal)
//!   ├── free_list  - Per-order circular free lists (internal)
//!   ├── validate   - Pointer validator (internal)
//!   └── allocator  - BuddyAllocator: acquire, release, resize
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rbuddy::BuddyAllocator;
//!
//! let mut allocator = BuddyAllocator::new().unwrap();
//!
//! let ptr = allocator.acquire(8).unwrap();
//!
//! unsafe {
//!     // Use the memory
//!     (ptr.as_ptr() as *mut u64).write_unaligned(42);
//!
//!     // Grow it; the first 8 bytes come along
//!     let ptr = allocator.resize(Some(ptr), 400).unwrap().unwrap();
//!     assert_eq!((ptr.as_ptr() as *const u64).read_unaligned(), 42);
//!
//!     // Free the memory
//!     allocator.release(ptr);
//! }
//! ```
//!
//! ## How It Works
//!
//! Each block starts with an 8 byte header. While the block is allocated the
//! payload follows it; while free, the next two words link the block into the
//! free list of its order:
//!
//! ```text
//!   Allocated block:
//!   ┌───────────────────────┬────────────────────────────────┬──────────┐
//!   │    Block Header       │         User Data              │ Padding  │
//!   │  ┌─────────────────┐  │                                │          │
//!   │  │ allocated: 1    │  │  ┌──────────────────────────┐  │          │
//!   │  │ order: k        │  │  │                          │  │          │
//!   │  │ padded: 0/1     │  │  │     rsize bytes usable   │  │          │
//!   │  │ rsize: N        │  │  │                          │  │          │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │          │
//!   │       8 bytes         │                                │          │
//!   └───────────────────────┴────────────────────────────────┴──────────┘
//!                           ▲
//!                           └── Pointer returned to user
//!
//!   Free lists (one per order, circular, with a sentinel):
//!
//!   [k] SENTINEL ⇄ block ⇄ block ⇄ ... ⇄ SENTINEL
//! ```
//!
//! The heap reserves its whole ceiling of address space once and commits one
//! top-order chunk at a time when no free block is large enough, much like
//! moving the program break with `sbrk`. Memory is never handed back until the
//! allocator is dropped.
//!
//! ## Errors
//!
//! - **Invalid argument**: zero or oversized requests, reported as
//!   [`BuddyError::InvalidArgument`].
//! - **Out of memory**: the heap is at its ceiling and nothing fits, reported
//!   as [`BuddyError::OutOfMemory`].
//! - **Invalid pointer**: releasing or resizing a pointer that fails
//!   validation logs the reason and aborts the process.
//!
//! [`BuddyError::errno`] maps the recoverable kinds to `EINVAL`/`ENOMEM`.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed growth**: The heap only grows in top-order chunks
//! - **Fixed alignment**: Payloads are 8-byte aligned
//! - **Unix-only**: Requires `libc` (`mmap`/`mprotect`)
//!
//! ## Safety
//!
//! Allocation is safe. Releasing and resizing take raw pointers and are
//! `unsafe`: the caller must not touch a pointer after giving it back.

pub mod align;
mod allocator;
mod block;
pub mod config;
mod error;
mod free_list;
pub mod header;
mod heap;
mod validate;

pub use allocator::{BlockInfo, BuddyAllocator};
pub use config::Config;
pub use error::{BuddyError, PointerError, Result};
pub use header::Header;
