//! The address-ordered doubly-linked chunk list.

use core::ptr;

use crate::chunk::Chunk;
use crate::state::Core;
use crate::sys::BreakSource;

impl<B: BreakSource> Core<B> {
    /// Appends `c` after the current tail, making it the new tail. Used when
    /// a freshly-grown range becomes a new chunk.
    ///
    /// # Safety
    /// `c` must not already be linked into the chunk list.
    pub(crate) unsafe fn append_tail(&mut self, c: *mut Chunk) {
        (*c).prev = self.tail;
        (*c).next = ptr::null_mut();

        if self.tail.is_null() {
            self.head = c;
        } else {
            (*self.tail).next = c;
        }

        self.tail = c;
    }

    /// Splices `new` into the chunk list immediately after `c`, as happens
    /// during a split. Updates `tail` if `c` was the tail.
    ///
    /// # Safety
    /// `c` must be a live member of the chunk list; `new` must not already
    /// be linked into it.
    pub(crate) unsafe fn insert_after(&mut self, c: *mut Chunk, new: *mut Chunk) {
        let c_next = (*c).next;

        (*new).prev = c;
        (*new).next = c_next;
        (*c).next = new;

        if c_next.is_null() {
            self.tail = new;
        } else {
            (*c_next).prev = new;
        }
    }

    /// Detaches the tail-anchored run starting at `first_removed` from the
    /// chunk list, leaving the list ending at `first_removed.prev` (or empty
    /// if `first_removed` was the head). The detached chunks are no longer
    /// part of any chunk; their storage has been returned to the OS by the
    /// caller via `shrink`.
    ///
    /// # Safety
    /// `first_removed` must be on the path from `head` to `tail`, and every
    /// chunk from `first_removed` to `tail` must already be unindexed.
    pub(crate) unsafe fn unlink_tail_run(&mut self, first_removed: *mut Chunk) {
        let new_tail = (*first_removed).prev;

        if new_tail.is_null() {
            self.head = ptr::null_mut();
            self.tail = ptr::null_mut();
        } else {
            (*new_tail).next = ptr::null_mut();
            self.tail = new_tail;
        }
    }
}
