//! Mutex-locked handle around [`Core`] — the crate's public entry point,
//! wrapping every operation in a single process-wide lock and exposing it
//! through Rust's `GlobalAlloc`/`Allocator` traits.
//!
//! The lock itself is a spinlock (`spin::Mutex`), not an OS futex-backed
//! mutex: the critical sections here never block except on the break
//! syscall, so a spinlock avoids a syscall on the allocator's own hot path.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use spin::Mutex;

use crate::chunk::ALIGNMENT;
use crate::state::Core;
use crate::sys::BreakSource;

#[cfg(unix)]
use crate::sys::LibcBreakSource;

/// Process-wide allocator handle: a spin-locked [`Core`].
///
/// Install as the global allocator:
///
/// ```
/// #[global_allocator]
/// static ALLOCATOR: hmm_alloc::HmmAlloc = hmm_alloc::HmmAlloc::new();
/// ```
///
/// `HmmLock` is generic over the [`BreakSource`] strategy so tests can drive
/// the core against a simulated arena instead of the real process break;
/// [`HmmAlloc`](crate::HmmAlloc) fixes that strategy to [`LibcBreakSource`]
/// for ordinary use.
pub struct HmmLock<B: BreakSource> {
    core: Mutex<Core<B>>,
}

impl<B: BreakSource> HmmLock<B> {
    /// Creates a lock around a fresh, empty [`Core`] driven by `sys`.
    pub const fn with_break_source(sys: B) -> Self {
        Self { core: Mutex::new(Core::new(sys)) }
    }

    /// Locks the mutex, granting exclusive access to the inner [`Core`].
    pub fn lock(&self) -> spin::MutexGuard<'_, Core<B>> {
        self.core.lock()
    }

    /// Runs the diagnostic traversal under the lock.
    pub fn diagnostics(&self, visit: impl FnMut(crate::state::ChunkInfo)) {
        self.core.lock().diagnostics(visit);
    }
}

#[cfg(unix)]
impl HmmLock<LibcBreakSource> {
    /// Creates a lock around a fresh, empty [`Core`] backed by the real
    /// process break.
    pub const fn new() -> Self {
        Self::with_break_source(LibcBreakSource::new())
    }
}

#[cfg(unix)]
impl Default for HmmLock<LibcBreakSource> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: every public operation takes the lock before touching `Core`'s
// raw-pointer state; there is no way to reach it without holding the mutex.
unsafe impl<B: BreakSource> GlobalAlloc for HmmLock<B> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            // Over-aligned requests aren't supported; the arena is 8-byte aligned throughout.
            return ptr::null_mut();
        }

        self.core.lock().alloc(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.core.lock().free(ptr);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }

        self.core.lock().calloc(1, layout.size())
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }

        self.core.lock().realloc(ptr, new_size)
    }
}

#[cfg(feature = "allocator_api")]
mod allocator_api_impl {
    use super::*;
    use core::alloc::{AllocError, Allocator};
    use core::ptr::NonNull;

    // SAFETY: same justification as the `GlobalAlloc` impl above.
    unsafe impl<B: BreakSource> Allocator for HmmLock<B> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            if layout.size() == 0 {
                return Ok(NonNull::slice_from_raw_parts(layout.dangling(), 0));
            }

            if layout.align() > ALIGNMENT {
                return Err(AllocError);
            }

            // SAFETY: `size != 0`, checked above.
            let raw = unsafe { self.core.lock().alloc(layout.size()) };
            let nn = NonNull::new(raw).ok_or(AllocError)?;
            Ok(NonNull::slice_from_raw_parts(nn, layout.size()))
        }

        fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            if layout.size() == 0 {
                return Ok(NonNull::slice_from_raw_parts(layout.dangling(), 0));
            }

            if layout.align() > ALIGNMENT {
                return Err(AllocError);
            }

            let raw = self.core.lock().calloc(1, layout.size());
            let nn = NonNull::new(raw).ok_or(AllocError)?;
            Ok(NonNull::slice_from_raw_parts(nn, layout.size()))
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            if layout.size() != 0 {
                self.core.lock().free(ptr.as_ptr());
            }
        }

        // `grow`/`shrink`/`grow_zeroed` fall back to the trait's default
        // allocate-copy-deallocate implementations: `Core::realloc` never
        // attempts an in-place resize, so there is no faster path to offer here.
    }
}
