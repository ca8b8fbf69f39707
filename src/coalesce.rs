//! Merging a run of adjacent free chunks into one.

use crate::chunk::{Chunk, HEADER_SIZE};
use crate::state::Core;
use crate::sys::BreakSource;

impl<B: BreakSource> Core<B> {
    /// Walks `start, start.next, start.next.next, …` while each visited
    /// chunk is free, removing every visited chunk from the freelist index
    /// along the way. If more than `start` itself was absorbed, `start`'s
    /// size is grown to span the whole run (including the headers of the
    /// absorbed chunks) and its `next` is relinked past them.
    ///
    /// Does not re-add `start` to the freelist index; callers decide that.
    ///
    /// # Safety
    /// `start` must be a live chunk-list member.
    pub(crate) unsafe fn coalesce(&mut self, start: *mut Chunk) {
        let mut total_absorbed = 0usize;
        let mut cur = start;

        loop {
            if !(*cur).is_free {
                break;
            }

            self.freelist_remove(cur);

            if cur != start {
                total_absorbed += (*cur).size + HEADER_SIZE;
            }

            let next = (*cur).next;
            if next.is_null() {
                cur = next;
                break;
            }

            cur = next;
        }

        if total_absorbed > 0 {
            (*start).size += total_absorbed;
            (*start).next = cur;

            if cur.is_null() {
                self.tail = start;
            } else {
                (*cur).prev = start;
            }
        }
    }
}
