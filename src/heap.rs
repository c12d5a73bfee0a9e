use std::{io, ptr::{self, NonNull}};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ, PROT_WRITE, c_void};

use crate::{
  align_to,
  config::MAX_BLOCK_SIZE,
  error::{BuddyError, Result},
};

fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
  if size <= 0 { 4096 } else { size as usize }
}

/// A contiguous byte range that only ever grows, one `MAX_BLOCK_SIZE` chunk at
/// a time, up to a fixed ceiling.
///
/// The whole ceiling is reserved as inaccessible address space up front, so
/// the region never moves and pointers into it stay valid. Growing commits the
/// next chunk read/write, much like moving the program break with `sbrk`.
///
/// Blocks inside the region are addressed by their offset from the start.
pub struct HeapRegion {
  base: NonNull<u8>,
  len: usize,
  capacity: usize,
  reserved: usize,
  page_size: usize,
}

impl HeapRegion {
  pub fn reserve(capacity: usize) -> Result<Self> {
    let page_size = page_size();
    let reserved = align_to!(capacity, page_size);

    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        reserved,
        PROT_NONE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(BuddyError::Reserve(io::Error::last_os_error()));
    }

    let base = NonNull::new(address as *mut u8)
      .ok_or_else(|| BuddyError::Reserve(io::Error::other("mmap returned a null mapping")))?;

    Ok(Self {
      base,
      len: 0,
      capacity,
      reserved,
      page_size,
    })
  }

  /// Makes one more chunk usable and returns its offset, or `None` when the
  /// ceiling is reached or the pages could not be committed.
  pub fn grow(&mut self) -> Option<usize> {
    let new_len = self.len + MAX_BLOCK_SIZE;
    if new_len > self.capacity {
      return None;
    }

    let commit_from = align_to!(self.len, self.page_size);
    let commit_to = align_to!(new_len, self.page_size);

    if commit_to > commit_from {
      let rc = unsafe {
        libc::mprotect(
          self.base.as_ptr().add(commit_from) as *mut c_void,
          commit_to - commit_from,
          PROT_READ | PROT_WRITE,
        )
      };

      if rc != 0 {
        log::debug!(
          "heap growth to {} bytes failed: {}",
          new_len,
          io::Error::last_os_error()
        );
        return None;
      }
    }

    let offset = self.len;
    self.len = new_len;

    Some(offset)
  }

  pub fn start(&self) -> *const u8 {
    self.base.as_ptr()
  }

  pub fn end(&self) -> *const u8 {
    self.base.as_ptr().wrapping_add(self.len)
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Offset of `address` from the start, if it lies inside the grown region.
  pub fn offset_of(
    &self,
    address: *const u8,
  ) -> Option<usize> {
    let address = address as usize;
    let start = self.start() as usize;

    if address < start || address >= start + self.len {
      return None;
    }

    Some(address - start)
  }

  pub fn ptr_at(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    assert!(offset < self.len, "offset {:#x} outside heap", offset);
    unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
  }

  pub fn read_word(
    &self,
    offset: usize,
  ) -> u64 {
    self.check_range(offset, 8);
    unsafe { ptr::read_unaligned(self.base.as_ptr().add(offset) as *const u64) }
  }

  pub fn write_word(
    &mut self,
    offset: usize,
    value: u64,
  ) {
    self.check_range(offset, 8);
    unsafe { ptr::write_unaligned(self.base.as_ptr().add(offset) as *mut u64, value) }
  }

  /// Copies `count` bytes between two non-overlapping ranges of the region.
  pub fn copy(
    &mut self,
    from: usize,
    to: usize,
    count: usize,
  ) {
    self.check_range(from, count);
    self.check_range(to, count);
    assert!(from + count <= to || to + count <= from, "overlapping copy");

    unsafe {
      ptr::copy_nonoverlapping(
        self.base.as_ptr().add(from),
        self.base.as_ptr().add(to),
        count,
      );
    }
  }

  fn check_range(
    &self,
    offset: usize,
    count: usize,
  ) {
    assert!(
      offset.checked_add(count).is_some_and(|end| end <= self.len),
      "range {:#x}+{} outside heap of {} bytes",
      offset,
      count,
      self.len
    );
  }
}

impl Drop for HeapRegion {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base.as_ptr() as *mut c_void, self.reserved);
    }
  }
}
