//! End-to-end tests against the public API: the seven literal scenarios,
//! plus a randomized stress run checking tiling/alignment invariants after
//! every operation.

use std::ptr::NonNull;

use hmm_alloc::{BreakError, BreakSource, Core, ALIGNMENT, ARENA_UNIT, HEADER_SIZE};

/// A fixed-size in-process arena standing in for the real process break.
/// Lives only in this test binary, which compiles against `hmm-alloc`'s
/// public API and so can't see the library's own `#[cfg(test)]`-only break
/// source.
struct FixedArena {
    base: *mut u8,
    capacity: usize,
    used: usize,
}

impl FixedArena {
    fn new(capacity: usize) -> Self {
        let buf = vec![0u8; capacity].into_boxed_slice();
        let base = Box::leak(buf).as_mut_ptr();
        Self { base, capacity, used: 0 }
    }
}

// SAFETY: `base` is a leaked, exclusively-owned buffer for the lifetime of
// the test; `extend`/`shrink` only ever move `used` within `[0, capacity]`.
unsafe impl BreakSource for FixedArena {
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

fn arena(capacity_units: usize) -> Core<FixedArena> {
    Core::new(FixedArena::new(capacity_units * ARENA_UNIT))
}

/// Walks the diagnostic traversal and checks the tiling and alignment
/// invariants that hold after every public operation.
fn check_tiling_and_alignment(core: &Core<FixedArena>) {
    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));

    for w in rows.windows(2) {
        let (prev, next) = (w[0], w[1]);
        assert!(prev.address < next.address, "chunk list must be address-ordered");
        assert_eq!(
            next.address,
            prev.address + HEADER_SIZE + prev.size,
            "chunk list must tile the arena without gaps or overlap"
        );
    }

    for row in &rows {
        assert_eq!(row.address % ALIGNMENT, 0);
        assert_eq!(row.size % ALIGNMENT, 0);
    }
}

#[test]
fn single_allocate_free_cycle() {
    let mut core = arena(1);

    let p = core.alloc(40);
    assert!(!p.is_null());
    assert_eq!(p as usize % ALIGNMENT, 0);
    check_tiling_and_alignment(&core);

    core.free(p);
    check_tiling_and_alignment(&core);

    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));
    assert_eq!(rows.len(), 1, "a solitary freed allocation merges into one chunk");
    assert!(rows[0].is_free);
}

#[test]
fn split_semantics() {
    let mut core = arena(1);

    let p = core.alloc(64);
    assert!(!p.is_null());
    check_tiling_and_alignment(&core);

    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].size, 64);
    assert!(!rows[0].is_free);
    assert!(rows[1].is_free);
    assert_eq!(rows[1].size, ARENA_UNIT - HEADER_SIZE - 64 - HEADER_SIZE);
}

#[test]
fn coalesce_three_way() {
    let mut core = arena(1);

    let a = core.alloc(64);
    let b = core.alloc(64);
    let c = core.alloc(64);
    assert!(!a.is_null() && !b.is_null() && !c.is_null());

    core.free(a);
    core.free(c);
    core.free(b);
    check_tiling_and_alignment(&core);

    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));
    assert_eq!(rows[0].size, 3 * 64 + 2 * HEADER_SIZE);
    assert!(rows[0].is_free);
}

#[test]
fn exact_bucket_reuse() {
    let mut core = arena(1);

    let p = core.alloc(128);
    core.free(p);
    let q = core.alloc(128);

    assert_eq!(p, q);
    check_tiling_and_alignment(&core);
}

#[test]
fn grow_then_shrink() {
    let mut core = arena(4);

    const N: usize = 20_000;
    const BLOCK: usize = 512;

    let mut blocks = Vec::with_capacity(N);
    for _ in 0..N {
        let p = core.alloc(BLOCK);
        assert!(!p.is_null());
        blocks.push(p);
    }
    check_tiling_and_alignment(&core);

    let mut peak_rows = Vec::new();
    core.diagnostics(|row| peak_rows.push(row));
    let peak_bytes: usize = peak_rows.iter().map(|r| r.size + HEADER_SIZE).sum();
    assert!(peak_bytes > ARENA_UNIT, "this scenario needs more than one growth unit");

    for p in blocks {
        core.free(p);
    }

    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));
    assert!(rows.is_empty(), "freeing the whole arena returns every growth unit to the break source");
}

#[test]
fn resize_copy() {
    let mut core = arena(1);

    let p = core.alloc(32);
    assert!(!p.is_null());
    unsafe { std::ptr::write_bytes(p, 0xab, 32) };

    let q = core.realloc(p, 200);
    assert!(!q.is_null());
    unsafe {
        for i in 0..32 {
            assert_eq!(*q.add(i), 0xab);
        }
    }
    check_tiling_and_alignment(&core);
}

#[test]
fn overflow_rejection() {
    let mut core = arena(1);

    let p = core.calloc(usize::MAX, 2);
    assert!(p.is_null());

    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));
    assert!(rows.is_empty(), "a rejected calloc must not touch the heap");
}

#[test]
fn idempotent_double_free() {
    let mut core = arena(1);

    let p = core.alloc(64);
    core.free(p);
    let mut before = Vec::new();
    core.diagnostics(|row| before.push(row));

    core.free(p);
    let mut after = Vec::new();
    core.diagnostics(|row| after.push(row));

    assert_eq!(before, after);
}

#[test]
fn null_free_is_a_no_op() {
    let mut core = arena(1);
    core.free(std::ptr::null_mut());

    let mut rows = Vec::new();
    core.diagnostics(|row| rows.push(row));
    assert!(rows.is_empty());
}

#[test]
fn randomized_alloc_free_resize_preserves_tiling_and_alignment() {
    let rng = fastrand::Rng::with_seed(0x5a17);
    let mut core = arena(8);

    struct Live {
        ptr: *mut u8,
        size: usize,
    }

    let mut live: Vec<Live> = Vec::new();

    for _ in 0..20_000 {
        let action = rng.usize(0..7);

        if action == 0 && !live.is_empty() {
            let index = rng.usize(0..live.len());
            let new_size = 1 + rng.usize(0..4096);
            let new_ptr = core.realloc(live[index].ptr, new_size);
            if !new_ptr.is_null() {
                live[index].ptr = new_ptr;
                live[index].size = new_size;
            }
        } else if action <= 2 && live.len() > 32 {
            let index = rng.usize(0..live.len());
            let entry = live.swap_remove(index);
            core.free(entry.ptr);
        } else {
            let size = 1 + rng.usize(0..4096);
            let ptr = core.alloc(size);
            if !ptr.is_null() {
                // Round-trip: the returned address is 8-aligned and the
                // caller's write stays inside the requested bound.
                assert_eq!(ptr as usize % ALIGNMENT, 0);
                unsafe { std::ptr::write_bytes(ptr, 0x42, size) };
                live.push(Live { ptr, size });
            }
        }

        check_tiling_and_alignment(&core);
    }

    for entry in live {
        core.free(entry.ptr);
    }
    check_tiling_and_alignment(&core);
}

#[test]
fn null_to_alloc_and_zero_to_minimum_allocation_round_trip() {
    let mut core = arena(1);

    let p = core.realloc(std::ptr::null_mut(), 64);
    assert!(!p.is_null());

    let q = core.realloc(p, 0);
    assert!(!q.is_null());
    check_tiling_and_alignment(&core);
}

#[test]
fn calloc_returns_a_zeroed_region_at_least_the_requested_size() {
    let mut core = arena(1);

    let ptr = core.calloc(3, 10);
    assert!(!ptr.is_null());
    assert!(NonNull::new(ptr).is_some());
    unsafe {
        for i in 0..30 {
            assert_eq!(*ptr.add(i), 0);
        }
    }
    check_tiling_and_alignment(&core);
}
