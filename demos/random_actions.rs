//! Installs this crate as the process allocator and runs a randomized
//! allocate/free/resize workload against it, printing the final live-chunk
//! count and the number of bytes still held by the break source.
//!
//! ```sh
//! cargo run --example random_actions
//! ```

use std::alloc::{GlobalAlloc, Layout};
use std::time::{Duration, Instant};

use hmm_alloc::HmmAlloc;

#[global_allocator]
static ALLOCATOR: HmmAlloc = HmmAlloc::new();

const MAX_ALLOC_SIZE: usize = 4096;
const TARGET_MIN_LIVE: usize = 64;
const DURATION: Duration = Duration::from_millis(500);

struct Live {
    ptr: *mut u8,
    layout: Layout,
}

fn main() {
    let rng = fastrand::Rng::new();
    let mut live: Vec<Live> = Vec::with_capacity(TARGET_MIN_LIVE * 4);

    let mut allocated = 0usize;
    let mut freed = 0usize;
    let mut resized = 0usize;
    let mut alloc_failures = 0usize;

    let start = Instant::now();
    while start.elapsed() < DURATION {
        for _ in 0..200 {
            // Bias away from sitting near zero live allocations, without
            // letting the live set grow unboundedly.
            let action = rng.usize(0..7);

            if action == 0 && !live.is_empty() {
                let index = rng.usize(0..live.len());
                let entry = &mut live[index];
                let new_size = 1 + rng.usize(0..MAX_ALLOC_SIZE);
                let new_layout = Layout::from_size_align(new_size, entry.layout.align()).unwrap();

                // SAFETY: `entry.ptr` was returned by a prior `alloc`/`realloc`
                // call against `entry.layout`, still live.
                let new_ptr = unsafe { ALLOCATOR.realloc(entry.ptr, entry.layout, new_size) };
                if !new_ptr.is_null() {
                    entry.ptr = new_ptr;
                    entry.layout = new_layout;
                    resized += 1;
                }
            } else if action <= 1 && live.len() >= TARGET_MIN_LIVE * 2 {
                let index = rng.usize(0..live.len());
                let entry = live.swap_remove(index);
                // SAFETY: `entry.ptr` was returned by a prior `alloc`/`realloc`
                // call against `entry.layout`, still live, and is only freed once.
                unsafe { ALLOCATOR.dealloc(entry.ptr, entry.layout) };
                freed += 1;
            } else {
                let size = 1 + rng.usize(0..MAX_ALLOC_SIZE);
                let layout = Layout::from_size_align(size, 8).unwrap();
                // SAFETY: `layout` has nonzero size.
                let ptr = unsafe { ALLOCATOR.alloc(layout) };
                if ptr.is_null() {
                    alloc_failures += 1;
                } else {
                    live.push(Live { ptr, layout });
                    allocated += 1;
                }
            }
        }
    }

    for entry in live.drain(..) {
        // SAFETY: every remaining entry is still live and owns its layout.
        unsafe { ALLOCATOR.dealloc(entry.ptr, entry.layout) };
        freed += 1;
    }

    println!("allocated: {allocated}, freed: {freed}, resized: {resized}, failures: {alloc_failures}");

    let mut chunk_count = 0usize;
    ALLOCATOR.lock().diagnostics(|_| chunk_count += 1);
    println!("live chunks after drain: {chunk_count}");
}
