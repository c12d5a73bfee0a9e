use std::{io::Read, ptr};

use rbuddy::{BuddyAllocator, config::MAX_PAYLOAD};

/// Waits until the user presses ENTER.
/// Useful when you want to follow the free lists step by step, or inspect the
/// process with tools like `pmap` or `gdb`.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the heap bounds and every free list.
fn print_lists(
  label: &str,
  allocator: &BuddyAllocator,
) {
  println!("[{}] PID = {}\n{}", label, std::process::id(), allocator);
}

fn main() {
  // Run with RUST_LOG=trace to watch every split and merge.
  env_logger::init();

  let mut allocator = match BuddyAllocator::new() {
    Ok(allocator) => allocator,
    Err(err) => {
      eprintln!("failed to create allocator: {}", err);
      return;
    }
  };

  // Nothing is committed until the first request.
  print_lists("start", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Acquire 4 bytes. The first 16 KiB chunk is committed and split all
  //    the way down to a 32 byte block; each upper half lands on a list.
  // --------------------------------------------------------------------
  let first = allocator.acquire(4).expect("4 bytes always fit");
  println!("\n[1] Acquire 4 bytes -> {:?}", first);

  unsafe { (first.as_ptr() as *mut u32).write(0xDEADBEEF) };
  print_lists("1", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Acquire 8 bytes. The buddy of the first block is sitting on the
  //    order 5 list, so no split is needed.
  // --------------------------------------------------------------------
  let second = allocator.acquire(8).expect("8 bytes always fit");
  println!("\n[2] Acquire 8 bytes -> {:?}", second);
  print_lists("2", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Resize the first block to 400 bytes. It needs order 9, so the data
  //    moves to a new block and the old one is released.
  // --------------------------------------------------------------------
  let first = unsafe { allocator.resize(Some(first), 400) }
    .expect("a 400 byte block fits in the first chunk")
    .expect("non-zero resize returns a block");
  println!(
    "\n[3] Resize to 400 bytes -> {:?}, value kept = 0x{:X}",
    first,
    unsafe { (first.as_ptr() as *const u32).read() }
  );
  print_lists("3", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Release everything. Buddies merge back into a single 16 KiB block.
  // --------------------------------------------------------------------
  unsafe {
    allocator.release(second);
    allocator.release(first);
  }
  println!("\n[4] Released both blocks");
  print_lists("4", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Fill the heap with maximum-size blocks until it hits its ceiling.
  // --------------------------------------------------------------------
  let mut blocks = Vec::new();
  loop {
    match allocator.acquire(MAX_PAYLOAD) {
      Ok(block) => {
        unsafe { ptr::write_bytes(block.as_ptr(), 0xAB, MAX_PAYLOAD) };
        blocks.push(block);
      }
      Err(err) => {
        println!(
          "\n[5] Stopped after {} blocks: {} (errno {})",
          blocks.len(),
          err,
          err.errno()
        );
        break;
      }
    }
  }
  print_lists("5", &allocator);

  // --------------------------------------------------------------------
  // 6) End of demo. Dropping the allocator unmaps the whole heap.
  // --------------------------------------------------------------------
  println!("\n[6] End of example.");
}
