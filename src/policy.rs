//! The allocator's policy layer: size normalization, split, grow, shrink, and
//! the four public operations.

use core::ptr::{self, NonNull};

use crate::chunk::{round_up, Chunk, ALIGNMENT, ARENA_UNIT, HEADER_SIZE};
use crate::state::Core;
use crate::sys::{grow_request_bytes, BreakSource};

impl<B: BreakSource> Core<B> {
    /// Finds or creates a free chunk of exactly `size` payload bytes,
    /// splitting a larger free chunk or growing the break as necessary.
    /// `size` must already be `ALIGNMENT`-rounded.
    pub(crate) fn get_free_chunk(&mut self, size: usize) -> *mut Chunk {
        // SAFETY: every chunk reachable from `self` is a live chunk-list
        // member by construction; `self` is exclusively borrowed here.
        unsafe {
            // 1. Exact bucket fast path.
            let exact = self.freelist_take_exact(size);
            if !exact.is_null() {
                return exact;
            }

            // 2. Address-descending scan from `tail`.
            let mut cur = self.tail;
            while !cur.is_null() {
                if (*cur).is_free && (*cur).size >= size {
                    self.freelist_remove(cur);
                    self.split_and_return(cur, size);
                    return cur;
                } else if (*cur).is_free {
                    // Too small; keep it indexed (no-op if already indexed).
                    self.freelist_add(cur);
                }

                cur = (*cur).prev;
            }

            // 3. Grow the break.
            let bytes = grow_request_bytes(size + HEADER_SIZE);

            let base = match self.sys.extend(bytes) {
                Ok(base) => base,
                Err(_) => return ptr::null_mut(),
            };

            // `tail` may already be indexed in the freelist from the scan
            // above; it must be detached before its size changes, since
            // `freelist_remove` locates a chunk by the bucket its *current*
            // size maps to.
            self.freelist_remove(self.tail);

            if !self.tail.is_null() && (*self.tail).is_free {
                (*self.tail).size += bytes;
                (*self.tail).next = ptr::null_mut();
            } else {
                let new_chunk = Chunk::write_new(base, bytes - HEADER_SIZE, true);
                self.append_tail(new_chunk);
            }

            self.get_free_chunk(size)
        }
    }

    /// If `c`'s payload strictly exceeds `size + HEADER_SIZE`, carves a new
    /// free chunk out of the high end and shrinks `c` to `size`; otherwise
    /// leaves `c` whole (internal fragmentation up to `HEADER_SIZE`).
    ///
    /// # Safety
    /// `c` must be a live, currently-unindexed chunk with `size <= c.size`.
    unsafe fn split_and_return(&mut self, c: *mut Chunk, size: usize) {
        if (*c).size > size + HEADER_SIZE {
            let new_base = Chunk::payload(c).add(size);
            let new_size = (*c).size - size - HEADER_SIZE;
            let new_chunk = Chunk::write_new(new_base, new_size, true);

            self.insert_after(c, new_chunk);
            (*c).size = size;
            self.freelist_add(new_chunk);
        }
    }

    /// Allocates `size` bytes. `size` need not be rounded.
    pub fn alloc(&mut self, size: usize) -> *mut u8 {
        let size = round_up(size);
        let c = self.get_free_chunk(size);

        if c.is_null() {
            return ptr::null_mut();
        }

        // SAFETY: `c` was just returned unindexed and free from `get_free_chunk`.
        unsafe {
            (*c).is_free = false;
            Chunk::payload(c)
        }
    }

    /// Frees a previously-allocated payload pointer. A null or already-free
    /// pointer is a silent no-op.
    pub fn free(&mut self, ptr: *mut u8) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        // SAFETY: caller-guaranteed: `ptr` was returned by `alloc`/`calloc`/`realloc`.
        unsafe {
            let c = Chunk::from_payload(ptr);

            if (*c).is_free {
                return;
            }

            (*c).is_free = true;

            let prev = (*c).prev;
            let next = (*c).next;

            if !prev.is_null() && (*prev).is_free {
                self.coalesce(prev);
                self.freelist_add(prev);
            } else if !next.is_null() && (*next).is_free {
                self.coalesce(c);
                self.freelist_add(c);
            } else {
                self.freelist_add(c);
            }

            self.shrink_if_surplus();
        }
    }

    /// Walks the tail-anchored run of free chunks and returns it to the OS
    /// once the free-size accumulator reaches `ARENA_UNIT` and the run
    /// itself totals at least that much.
    unsafe fn shrink_if_surplus(&mut self) {
        if self.free_size < ARENA_UNIT {
            return;
        }

        let mut total = 0usize;
        let mut cur = self.tail;
        let mut first_removed = ptr::null_mut();

        while !cur.is_null() && (*cur).is_free {
            total += (*cur).size + HEADER_SIZE;
            self.freelist_remove(cur);
            first_removed = cur;
            cur = (*cur).prev;
        }

        if total < ARENA_UNIT {
            return;
        }

        self.unlink_tail_run(first_removed);

        // On shrink failure, the detached chunks are intentionally not
        // restored: once unlinked from the chunk list they're unreachable
        // either way, so there's nothing meaningful to roll back to.
        let _ = self.sys.shrink(total);
    }

    /// Allocates `count * elem_size` bytes, zeroed, rejecting overflow.
    pub fn calloc(&mut self, count: usize, elem_size: usize) -> *mut u8 {
        let total = match count.checked_mul(elem_size) {
            Some(total) => total,
            None => return ptr::null_mut(),
        };

        let ptr = self.alloc(total);
        if ptr.is_null() {
            return ptr;
        }

        // SAFETY: `ptr` is a freshly allocated chunk's payload; its chunk
        // size may exceed `total` due to rounding/fragmentation, and the
        // full payload is zeroed.
        unsafe {
            let c = Chunk::from_payload(NonNull::new_unchecked(ptr));
            ptr::write_bytes(ptr, 0, (*c).size);
        }

        ptr
    }

    /// Resizes the allocation at `ptr` to `size` bytes.
    pub fn realloc(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        let Some(nn_ptr) = NonNull::new(ptr) else {
            return self.alloc(size);
        };

        // A request of 0 rounds to 0, not `ALIGNMENT` (unlike `alloc`'s own
        // normalization): free the input and hand back a fresh minimum-size
        // allocation.
        if size == 0 {
            self.free(ptr);
            return self.alloc(ALIGNMENT);
        }

        let size = round_up(size);

        // SAFETY: caller-guaranteed: `ptr` was returned by `alloc`/`calloc`/`realloc`.
        unsafe {
            let c = Chunk::from_payload(nn_ptr);

            if size == (*c).size {
                return ptr;
            }

            let new_ptr = self.alloc(size);
            if new_ptr.is_null() {
                return ptr::null_mut();
            }

            let copy_len = (*c).size.min(size);
            ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);

            self.free(ptr);
            new_ptr
        }
    }
}
