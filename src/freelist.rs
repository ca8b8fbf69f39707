//! The freelist index: an array-indexed mapping from exact payload size to a
//! singly-linked list of free chunks of that size.

use core::ptr;

use crate::chunk::{Chunk, ALIGNMENT};
use crate::state::{Core, FREQ_SLOTS};
use crate::sys::BreakSource;

impl<B: BreakSource> Core<B> {
    /// Adds `c` to its size-class bucket, unless it's already indexed or its
    /// bucket falls outside `FREQ_SLOTS`: such chunks are simply left
    /// unindexed, reachable only via the list scan.
    pub(crate) unsafe fn freelist_add(&mut self, c: *mut Chunk) {
        if c.is_null() {
            return;
        }

        debug_assert_eq!((*c).size % ALIGNMENT, 0);

        let bucket = Chunk::bucket_of((*c).size);
        if bucket >= FREQ_SLOTS {
            return;
        }

        if (*c).is_added {
            return;
        }

        (*c).next_free = self.freq[bucket];
        self.freq[bucket] = c;
        (*c).is_added = true;
        self.free_size += (*c).size;
    }

    /// Removes `c` from its bucket via a linear scan for identity, if present.
    pub(crate) unsafe fn freelist_remove(&mut self, c: *mut Chunk) {
        if c.is_null() {
            return;
        }

        let bucket = Chunk::bucket_of((*c).size);
        if bucket >= FREQ_SLOTS {
            return;
        }

        let mut cur = self.freq[bucket];
        let mut prev: *mut Chunk = ptr::null_mut();

        while !cur.is_null() {
            if cur == c {
                if prev.is_null() {
                    self.freq[bucket] = (*cur).next_free;
                } else {
                    (*prev).next_free = (*cur).next_free;
                }

                (*cur).is_added = false;
                self.free_size -= (*cur).size;
                return;
            }

            prev = cur;
            cur = (*cur).next_free;
        }
    }

    /// Pops an exact-size match for `size` off its bucket, if the bucket is
    /// non-empty, clearing `is_added` and updating the accumulator.
    pub(crate) unsafe fn freelist_take_exact(&mut self, size: usize) -> *mut Chunk {
        let bucket = Chunk::bucket_of(size);
        if bucket >= FREQ_SLOTS {
            return ptr::null_mut();
        }

        let c = self.freq[bucket];
        if c.is_null() {
            return ptr::null_mut();
        }

        self.freq[bucket] = (*c).next_free;
        (*c).is_added = false;
        self.free_size -= (*c).size;
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::HEADER_SIZE;
    use crate::sys::MockBreakSource;

    #[repr(align(8))]
    struct AlignedBuf([u8; 4 * (HEADER_SIZE + 256)]);

    unsafe fn chunk_at(buf: &mut AlignedBuf, slot: usize, size: usize) -> *mut Chunk {
        let offset = slot * (HEADER_SIZE + 256);
        Chunk::write_new(buf.0.as_mut_ptr().add(offset), size, true)
    }

    #[test]
    fn add_remove_round_trips_and_updates_accumulator() {
        let mut core = Core::new(MockBreakSource::with_capacity(0));
        let mut buf = AlignedBuf([0u8; 4 * (HEADER_SIZE + 256)]);

        unsafe {
            let a = chunk_at(&mut buf, 0, 128);

            core.freelist_add(a);
            assert!((*a).is_added);
            assert_eq!(core.free_size, 128);
            assert_eq!(core.freq[Chunk::bucket_of(128)], a);

            // Adding an already-added chunk is a no-op.
            core.freelist_add(a);
            assert_eq!(core.free_size, 128);

            core.freelist_remove(a);
            assert!(!(*a).is_added);
            assert_eq!(core.free_size, 0);
            assert!(core.freq[Chunk::bucket_of(128)].is_null());
        }
    }

    #[test]
    fn take_exact_pops_only_from_the_matching_bucket() {
        let mut core = Core::new(MockBreakSource::with_capacity(0));
        let mut buf = AlignedBuf([0u8; 4 * (HEADER_SIZE + 256)]);

        unsafe {
            let small = chunk_at(&mut buf, 0, 64);
            let big = chunk_at(&mut buf, 1, 128);
            core.freelist_add(small);
            core.freelist_add(big);

            assert!(core.freelist_take_exact(256).is_null());

            let taken = core.freelist_take_exact(128);
            assert_eq!(taken, big);
            assert!(!(*big).is_added);
            assert_eq!(core.free_size, 64);
        }
    }

    #[test]
    fn bucket_overflow_leaves_the_chunk_unindexed() {
        let mut core = Core::new(MockBreakSource::with_capacity(0));
        // A fabricated header whose bucket falls outside FREQ_SLOTS; the
        // freelist never touches its (nonexistent) payload bytes, only its
        // header fields, so a stack header is sufficient.
        let mut header = Chunk {
            is_added: false,
            is_free: true,
            size: crate::chunk::ARENA_UNIT + crate::chunk::ALIGNMENT,
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
            next_free: ptr::null_mut(),
        };
        let c: *mut Chunk = &mut header;

        unsafe {
            core.freelist_add(c);
            assert!(!(*c).is_added, "bucket index >= FREQ_SLOTS must not be indexed");
            assert_eq!(core.free_size, 0);

            // remove on an unindexed/out-of-range chunk is a harmless no-op.
            core.freelist_remove(c);
        }
    }

    #[test]
    fn freelist_add_rejects_null() {
        let mut core = Core::new(MockBreakSource::with_capacity(0));
        unsafe {
            core.freelist_add(ptr::null_mut());
        }
        assert_eq!(core.free_size, 0);
    }
}
