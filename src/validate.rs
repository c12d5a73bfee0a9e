use crate::{
  config::{HEADER_SIZE, MIN_ALIGNMENT, ORDER_MAX, ORDER_MIN},
  error::PointerError,
  header::{Header, block_size, required_order, required_padding},
  heap::HeapRegion,
  is_aligned,
};

/// Checks that `ptr` could have been returned by `acquire` on this heap and
/// not released since.
///
/// On success returns the offset of the block and its decoded header.
pub fn check(
  heap: &HeapRegion,
  ptr: *const u8,
) -> Result<(usize, Header), PointerError> {
  let payload = heap.offset_of(ptr).ok_or(PointerError::OutOfBounds)?;
  let offset = payload
    .checked_sub(HEADER_SIZE)
    .ok_or(PointerError::OutOfBounds)?;

  if !is_aligned!(heap.start() as usize + offset, MIN_ALIGNMENT) {
    return Err(PointerError::Misaligned);
  }

  let header = Header::decode(heap.read_word(offset));

  if !(ORDER_MIN..ORDER_MAX).contains(&header.order) {
    return Err(PointerError::BadOrder(header.order));
  }

  if !is_aligned!(offset, block_size(header.order)) {
    return Err(PointerError::NotBlockStart {
      order: header.order,
    });
  }

  if !header.allocated {
    return Err(PointerError::NotAllocated);
  }

  let rsize = header.rsize as usize;

  if header.padded != (required_padding(header.order, rsize) != 0) {
    return Err(PointerError::PaddingMismatch);
  }

  let expected = required_order(rsize);
  if header.order != expected {
    return Err(PointerError::OrderMismatch {
      order: header.order,
      expected,
    });
  }

  Ok((offset, header))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::MAX_BLOCK_SIZE;

  fn heap_with(
    offset: usize,
    header: Header,
  ) -> HeapRegion {
    let mut heap = HeapRegion::reserve(2 * MAX_BLOCK_SIZE).unwrap();
    heap.grow().unwrap();
    heap.write_word(offset, header.encode());
    heap
  }

  fn payload(
    heap: &HeapRegion,
    offset: usize,
  ) -> *const u8 {
    heap.start().wrapping_add(offset + HEADER_SIZE)
  }

  #[test]
  fn test_accepts_allocated_block() {
    let header = Header::allocated(9, 400);
    let heap = heap_with(512, header);

    assert_eq!(check(&heap, payload(&heap, 512)), Ok((512, header)));
  }

  #[test]
  fn test_rejects_out_of_bounds() {
    let heap = heap_with(0, Header::allocated(ORDER_MIN, 4));

    assert_eq!(check(&heap, heap.end()), Err(PointerError::OutOfBounds));
    assert_eq!(check(&heap, heap.start()), Err(PointerError::OutOfBounds));
    assert_eq!(
      check(&heap, heap.start().wrapping_sub(64)),
      Err(PointerError::OutOfBounds)
    );
  }

  #[test]
  fn test_rejects_misaligned_header() {
    let heap = heap_with(0, Header::allocated(ORDER_MIN, 4));

    assert_eq!(
      check(&heap, payload(&heap, 0).wrapping_add(3)),
      Err(PointerError::Misaligned)
    );
  }

  #[test]
  fn test_rejects_bad_order() {
    let mut header = Header::allocated(ORDER_MIN, 4);
    header.order = 2;
    let heap = heap_with(0, header);

    assert_eq!(check(&heap, payload(&heap, 0)), Err(PointerError::BadOrder(2)));
  }

  #[test]
  fn test_rejects_block_not_on_its_boundary() {
    let heap = heap_with(32, Header::allocated(6, 40));

    assert_eq!(
      check(&heap, payload(&heap, 32)),
      Err(PointerError::NotBlockStart { order: 6 })
    );
  }

  #[test]
  fn test_rejects_free_block() {
    let heap = heap_with(0, Header::free(ORDER_MIN));

    assert_eq!(check(&heap, payload(&heap, 0)), Err(PointerError::NotAllocated));
  }

  #[test]
  fn test_rejects_padding_mismatch() {
    let mut header = Header::allocated(ORDER_MIN, 4);
    header.padded = false;
    let heap = heap_with(0, header);

    assert_eq!(
      check(&heap, payload(&heap, 0)),
      Err(PointerError::PaddingMismatch)
    );

    let mut header = Header::allocated(ORDER_MIN, 24);
    header.padded = true;
    let heap = heap_with(0, header);

    assert_eq!(
      check(&heap, payload(&heap, 0)),
      Err(PointerError::PaddingMismatch)
    );
  }

  #[test]
  fn test_rejects_order_mismatch() {
    let mut header = Header::allocated(ORDER_MIN, 4);
    header.order = ORDER_MIN + 1;
    let heap = heap_with(0, header);

    assert_eq!(
      check(&heap, payload(&heap, 0)),
      Err(PointerError::OrderMismatch {
        order: ORDER_MIN + 1,
        expected: ORDER_MIN,
      })
    );
  }
}
