//! `extern "C"` symbols matching the platform's C memory API exactly
//! (argument types, null-on-failure, silent no-op on bad `free`), behind the
//! `libc_symbols` feature. These let this crate shadow libc's own allocator
//! process-wide via linking or `LD_PRELOAD`.
//!
//! The real work lives in [`crate::HmmAlloc`]; these symbols are thin,
//! non-generic adapters over a single process-wide instance of it.

use core::ffi::c_void;

use crate::HmmAlloc;

static ALLOC: HmmAlloc = HmmAlloc::new();

/// # Safety
/// Matches the C `malloc` contract: the returned pointer, if non-null, is
/// valid for `size` bytes until passed to `free`/`realloc`.
#[no_mangle]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    ALLOC.lock().alloc(size).cast()
}

/// # Safety
/// `ptr` must be null, or a pointer previously returned by this module's
/// `malloc`/`calloc`/`realloc` and not already freed.
#[no_mangle]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    ALLOC.lock().free(ptr.cast());
}

/// # Safety
/// Matches the C `calloc` contract: the returned pointer, if non-null, is
/// valid and zeroed for `nmemb * size` bytes.
#[no_mangle]
pub unsafe extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    ALLOC.lock().calloc(nmemb, size).cast()
}

/// # Safety
/// `ptr` must be null, or a pointer previously returned by this module's
/// `malloc`/`calloc`/`realloc` and not already freed.
#[no_mangle]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    ALLOC.lock().realloc(ptr.cast(), size).cast()
}
