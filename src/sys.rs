//! The system-break adapter: the only surface the core asks of the operating
//! system, and the one seam the core is generic over (see `BreakSource`).

use crate::chunk::ARENA_UNIT;

/// Why a break adjustment failed. Kept as a typed result at this internal
/// boundary rather than a sentinel; every caller still collapses this to
/// null/no-op at the public allocator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakError {
    /// The operating system declined to extend or shrink the break.
    SyscallFailed,
}

/// Strategy for growing and shrinking the managed arena.
///
/// The allocator core (`Core<B>`) is generic over `B`, so the real
/// `sbrk`-backed strategy and a deterministic in-process mock (used by
/// tests) can share the same policy code in `Core`.
///
/// # Safety
/// Implementations must uphold `sbrk`-style semantics: `extend` returns the
/// base of a freshly-available, exclusively-owned byte range of exactly
/// `bytes` length, immediately following whatever was previously returned;
/// `shrink` releases exactly the top `bytes` of that range. The allocator
/// demands exclusive control of the break for the lifetime of the source.
pub unsafe trait BreakSource {
    /// Extends the managed region by `bytes` (already a multiple of `ARENA_UNIT`),
    /// returning the base address of the newly available range.
    fn extend(&mut self, bytes: usize) -> Result<*mut u8, BreakError>;

    /// Shrinks the managed region by `bytes` from its current top.
    fn shrink(&mut self, bytes: usize) -> Result<(), BreakError>;
}

/// Rounds a requested allocation (already including header overhead) up to
/// the next multiple of `ARENA_UNIT`:
/// `ceil((requested + header_size + ARENA_UNIT) / ARENA_UNIT) * ARENA_UNIT`.
#[inline]
pub fn grow_request_bytes(requested_plus_header: usize) -> usize {
    let total = requested_plus_header + ARENA_UNIT;
    (total / ARENA_UNIT) * ARENA_UNIT
}

/// The production break source: the process's real data-segment break,
/// adjusted via the platform's `sbrk`-equivalent primitive.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct LibcBreakSource {
    _private: (),
}

#[cfg(unix)]
impl LibcBreakSource {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(unix)]
// SAFETY: `libc::sbrk` gives the standard sbrk contract: monotonic extension
// of the break by the requested byte count, returning the prior break as the
// base of the newly available range.
unsafe impl BreakSource for LibcBreakSource {
    fn extend(&mut self, bytes: usize) -> Result<*mut u8, BreakError> {
        debug_assert_eq!(bytes % ARENA_UNIT, 0);

        // SAFETY: the allocator guarantees exclusive ownership of the break
        // for the process lifetime (a documented precondition).
        let prev = unsafe { libc::sbrk(bytes as isize) };

        if prev == usize::MAX as *mut libc::c_void {
            log::warn!("hmm-alloc: sbrk({bytes}) failed, out of memory");
            Err(BreakError::SyscallFailed)
        } else {
            Ok(prev.cast::<u8>())
        }
    }

    fn shrink(&mut self, bytes: usize) -> Result<(), BreakError> {
        // SAFETY: same precondition as `extend`.
        let result = unsafe { libc::sbrk(-(bytes as isize)) };

        if result == usize::MAX as *mut libc::c_void {
            log::warn!("hmm-alloc: sbrk(-{bytes}) failed, leaking the detached tail run");
            Err(BreakError::SyscallFailed)
        } else {
            Ok(())
        }
    }
}

/// A deterministic, in-process break source for tests: drives a fixed-size
/// leaked buffer instead of the real process break. `Core`'s own test suite
/// uses this rather than `LibcBreakSource` so growing/shrinking the arena
/// doesn't touch the test binary's own process break, which the allocator
/// otherwise demands exclusive control of.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct MockBreakSource {
    base: *mut u8,
    capacity: usize,
    used: usize,
}

#[cfg(test)]
impl MockBreakSource {
    /// Leaks a zeroed buffer of `capacity` bytes to serve as the simulated arena.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let buf = std::vec![0u8; capacity].into_boxed_slice();
        let base = Box::leak(buf).as_mut_ptr();
        Self { base, capacity, used: 0 }
    }

    /// Bytes currently handed out by `extend` and not yet returned via `shrink`.
    pub(crate) fn used(&self) -> usize {
        self.used
    }
}

#[cfg(test)]
unsafe impl BreakSource for MockBreakSource {
    fn extend(&mut self, bytes: usize) -> Result<*mut u8, BreakError> {
        if self.used + bytes > self.capacity {
            return Err(BreakError::SyscallFailed);
        }

        // SAFETY: `used + bytes <= capacity`, checked above.
        let ptr = unsafe { self.base.add(self.used) };
        self.used += bytes;
        Ok(ptr)
    }

    fn shrink(&mut self, bytes: usize) -> Result<(), BreakError> {
        if bytes > self.used {
            return Err(BreakError::SyscallFailed);
        }

        self.used -= bytes;
        Ok(())
    }
}
