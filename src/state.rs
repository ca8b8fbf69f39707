//! The allocator core: process-wide mutable state plus the policy layer
//! (split/coalesce/grow/shrink) implemented across `list.rs`, `freelist.rs`,
//! `coalesce.rs` and `policy.rs` as further `impl<B> Core<B>` blocks.

use core::ptr;

use crate::chunk::{Chunk, ALIGNMENT, ARENA_UNIT};
use crate::sys::BreakSource;

/// Number of buckets in the freelist index: one per size class reachable
/// within a single growth unit. A chunk whose bucket would fall outside this
/// range is simply never indexed; it remains reachable only via the
/// chunk-list scan in `get_free_chunk`.
pub const FREQ_SLOTS: usize = ARENA_UNIT / ALIGNMENT;

/// Process-wide allocator state: the chunk list (`head`/`tail`), the
/// freelist index (`freq`), the free-size accumulator, and the break
/// source `B` used to grow/shrink the managed region.
///
/// A single instance of `Core` is intended to exist per process, behind the
/// mutex in [`crate::lock::HmmLock`]. All of its mutating methods assume the
/// caller already holds that lock; `Core` itself performs no synchronization.
///
/// `freq` is a plain fixed-size array (not a `Vec`/`Box`) so that `Core` can
/// be constructed in a `const fn` and placed directly in static storage: no
/// allocation is needed to bring the allocator itself into existence.
pub struct Core<B: BreakSource> {
    pub(crate) head: *mut Chunk,
    pub(crate) tail: *mut Chunk,
    pub(crate) free_size: usize,
    pub(crate) freq: [*mut Chunk; FREQ_SLOTS],
    pub(crate) sys: B,
}

// The chunk list and freelist index are made of raw pointers into the
// process's own heap arena; they are not thread-confined, they are
// mutex-confined. `Core` is `Send` once behind that mutex.
unsafe impl<B: BreakSource + Send> Send for Core<B> {}

impl<B: BreakSource> Core<B> {
    /// Creates an empty core with no arena yet claimed. The first allocation
    /// will grow the break to establish one.
    pub const fn new(sys: B) -> Self {
        Self {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
            free_size: 0,
            freq: [ptr::null_mut(); FREQ_SLOTS],
            sys,
        }
    }

    /// Walks the chunk list in address order, invoking `visit` with
    /// `(index, address, is_free, size)` per chunk. Takes a callback rather
    /// than building a collection so that
    /// calling this while this crate is itself `#[global_allocator]` cannot
    /// recursively re-enter the allocator's own (non-reentrant) lock.
    pub fn diagnostics(&self, mut visit: impl FnMut(ChunkInfo)) {
        let mut cur = self.head;
        let mut index = 0usize;

        while !cur.is_null() {
            // SAFETY: `cur` is a live chunk-list member by the list invariants.
            unsafe {
                visit(ChunkInfo {
                    index,
                    address: cur as usize,
                    is_free: (*cur).is_free,
                    size: (*cur).size,
                });
                cur = (*cur).next;
            }

            index += 1;
        }
    }
}

/// One row of the diagnostic traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub index: usize,
    pub address: usize,
    pub is_free: bool,
    pub size: usize,
}
