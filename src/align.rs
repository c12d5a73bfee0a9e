/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two.
///
/// # Examples
///
/// ```rust
/// use rbuddy::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(16, 8), 16);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Checks whether `value` is a multiple of `align`.
///
/// `align` must be a power of two.
///
/// # Examples
///
/// ```rust
/// use rbuddy::is_aligned;
///
/// assert!(is_aligned!(64, 8));
/// assert!(!is_aligned!(12, 8));
/// ```
#[macro_export]
macro_rules! is_aligned {
  ($value:expr, $align:expr) => {
    ($value & ($align - 1)) == 0
  };
}

#[cfg(test)]
mod tests {
  #[test]
  fn test_align_to() {
    for align in [8usize, 32, 4096] {
      let mut alignments = Vec::new();

      for i in 0..10 {
        let sizes = (align * i + 1)..=(align * (i + 1));
        alignments.push((sizes, align * (i + 1)));
      }

      for (sizes, expected) in alignments {
        for size in sizes {
          assert_eq!(expected, align_to!(size, align));
        }
      }
    }
  }

  #[test]
  fn test_is_aligned() {
    assert!(is_aligned!(0usize, 8));
    assert!(is_aligned!(8usize, 8));
    assert!(is_aligned!(16384usize, 16384));

    for offset in 1..8usize {
      assert!(!is_aligned!(offset, 8));
      assert!(!is_aligned!(32 + offset, 8));
    }
  }
}
