//! The in-band record prepended to every byte range the allocator manages.

use core::ptr::{self, NonNull};

/// Alignment requirement for every chunk header and every payload size.
pub const ALIGNMENT: usize = 8;

/// Size in bytes requested from the break adapter per grow/shrink unit.
pub const ARENA_UNIT: usize = 8 * 1024 * 1024;

/// A chunk of managed memory: a header immediately followed by its payload.
///
/// `prev`/`next` thread the address-ordered chunk list; `next_free` threads
/// the freelist index bucket the chunk currently belongs to, if any.
#[repr(C)]
pub struct Chunk {
    pub is_added: bool,
    pub is_free: bool,
    pub size: usize,
    pub prev: *mut Chunk,
    pub next: *mut Chunk,
    pub next_free: *mut Chunk,
}

/// Byte size of a `Chunk` header, rounded up to `ALIGNMENT`.
///
/// `Chunk` is `repr(C)` with no trailing padding need beyond natural
/// alignment on any platform where `usize`/pointers are 8-aligned, but the
/// round-up keeps the invariant explicit rather than assumed.
pub const HEADER_SIZE: usize = round_up(core::mem::size_of::<Chunk>());

/// Rounds `size` up to the next multiple of `ALIGNMENT`, promoting zero to `ALIGNMENT`.
#[inline]
pub const fn round_up(size: usize) -> usize {
    let size = (size + (ALIGNMENT - 1)) & !(ALIGNMENT - 1);
    if size == 0 {
        ALIGNMENT
    } else {
        size
    }
}

impl Chunk {
    /// Writes a fresh chunk header at `base`, with the given `size` and freedom.
    ///
    /// # Safety
    /// `base` must be valid for writes of `HEADER_SIZE` bytes and aligned to `ALIGNMENT`.
    #[inline]
    pub unsafe fn write_new(base: *mut u8, size: usize, is_free: bool) -> *mut Chunk {
        debug_assert_eq!(base as usize % ALIGNMENT, 0);
        debug_assert_eq!(size % ALIGNMENT, 0);

        let chunk = base.cast::<Chunk>();
        chunk.write(Chunk {
            is_added: false,
            is_free,
            size,
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
            next_free: ptr::null_mut(),
        });
        chunk
    }

    /// The address immediately following this chunk's header: its payload.
    #[inline]
    pub unsafe fn payload(c: *mut Chunk) -> *mut u8 {
        c.cast::<u8>().add(HEADER_SIZE)
    }

    /// Recovers the chunk header address from a payload pointer previously
    /// returned by `payload`.
    ///
    /// # Safety
    /// `ptr` must have been produced by `Chunk::payload` on a live chunk.
    #[inline]
    pub unsafe fn from_payload(ptr: NonNull<u8>) -> *mut Chunk {
        ptr.as_ptr().sub(HEADER_SIZE).cast::<Chunk>()
    }

    /// The address one byte past this chunk's payload, i.e. where `next` lives
    /// if the chunk list tiles the arena without gaps.
    #[inline]
    pub unsafe fn end(c: *mut Chunk) -> *mut u8 {
        Chunk::payload(c).add((*c).size)
    }

    /// The size-class bucket a chunk of `size` bytes belongs to, per
    /// `(size / ALIGNMENT) - 1`. Only valid for `size >= ALIGNMENT`.
    #[inline]
    pub const fn bucket_of(size: usize) -> usize {
        (size / ALIGNMENT) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_promotes_zero_and_aligns() {
        assert_eq!(round_up(0), ALIGNMENT);
        assert_eq!(round_up(1), ALIGNMENT);
        assert_eq!(round_up(ALIGNMENT), ALIGNMENT);
        assert_eq!(round_up(ALIGNMENT + 1), 2 * ALIGNMENT);
        assert_eq!(round_up(40), 40);
        assert_eq!(round_up(41), 48);
    }

    #[test]
    fn bucket_of_matches_size_over_alignment_minus_one() {
        assert_eq!(Chunk::bucket_of(ALIGNMENT), 0);
        assert_eq!(Chunk::bucket_of(48), 5);
        assert_eq!(Chunk::bucket_of(128), 15);
    }

    #[repr(align(8))]
    struct AlignedBuf([u8; HEADER_SIZE + 64]);

    #[test]
    fn payload_round_trips_through_write_new() {
        let mut buf = AlignedBuf([0u8; HEADER_SIZE + 64]);

        unsafe {
            let c = Chunk::write_new(buf.0.as_mut_ptr(), 64, true);
            assert!((*c).is_free);
            assert!(!(*c).is_added);
            assert_eq!((*c).size, 64);

            let payload = Chunk::payload(c);
            assert_eq!(payload, buf.0.as_mut_ptr().add(HEADER_SIZE));

            let recovered = Chunk::from_payload(NonNull::new(payload).unwrap());
            assert_eq!(recovered, c);

            assert_eq!(Chunk::end(c), payload.add(64));
        }
    }
}
