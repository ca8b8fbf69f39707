//! `hmm-alloc`: a user-space general-purpose heap allocator that replaces
//! the standard C allocation interface (`malloc`/`free`/`calloc`/`realloc`)
//! for a single process.
//!
//! The allocator manages a contiguous arena grown via the process's
//! `sbrk`-style data-segment break, tiled into in-band metadata-tagged
//! [`Chunk`](chunk::Chunk)s. Requests are served by splitting free chunks
//! and coalescing adjacent free neighbors; a bounded freelist index
//! accelerates exact-size matches. The whole design is a single global
//! arena behind one process-wide lock — no arenas-per-thread, no
//! thread-local caches, and alignment is fixed at 8 bytes. See the project's
//! design notes for the full rationale.
//!
//! # Usage
//!
//! Install [`HmmAlloc`] as the process's global allocator:
//!
//! ```
//! #[global_allocator]
//! static ALLOCATOR: hmm_alloc::HmmAlloc = hmm_alloc::HmmAlloc::new();
//! ```
//!
//! Enable the `allocator_api` feature to additionally use it via the
//! (nightly) [`core::alloc::Allocator`] trait for arena-style collections,
//! or the `libc_symbols` feature to export `extern "C"` `malloc`/`free`/
//! `calloc`/`realloc` symbols with the platform's C ABI.

#![cfg_attr(not(test), no_std)]

mod chunk;
mod coalesce;
mod freelist;
mod list;
mod lock;
mod policy;
mod state;
mod sys;

#[cfg(all(feature = "libc_symbols", unix))]
mod capi;

pub use crate::chunk::{ALIGNMENT, ARENA_UNIT, HEADER_SIZE};
pub use crate::lock::HmmLock;
pub use crate::state::{ChunkInfo, Core};
pub use crate::sys::{BreakError, BreakSource};

#[cfg(unix)]
pub use crate::sys::LibcBreakSource;

/// The ordinary way to use this crate: a [`HmmLock`] backed by the real
/// process break, suitable for `#[global_allocator]`.
#[cfg(unix)]
pub type HmmAlloc = HmmLock<LibcBreakSource>;
