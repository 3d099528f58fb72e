//! First-fit page allocators for physical frames and swap slots.
//!
//! Each allocator wraps a bitmap with one bit per unit of its backing
//! medium. A bit is set exactly while one live translation entry owns the
//! unit; both allocators exist as a single process-wide instance each,
//! owned by [`SystemMemory`](crate::SystemMemory) and shared by every
//! address space.
//!
//! The interior lock covers only the bitmap mutation. It is never held
//! across the file or swap-device I/O that fills the unit, so another
//! thread can allocate while a load is blocked reading an executable.

use spin::Mutex;

use crate::bitmap::Bitmap;
use crate::numbers::{FrameNumber, SwapSlot};

/// Errors from releasing a frame or swap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeError {
    /// The index is past the allocator's capacity.
    OutOfRange,
    /// The unit is not currently allocated. Freeing it anyway could clear
    /// a unit a later owner holds, so the call is rejected instead.
    NotAllocated,
}

/// Macro to define a bitmap-backed page allocator over one index kind.
///
/// Both allocators share the same contract and differ only in capacity and
/// backing medium, so the whole implementation is generated from one body.
macro_rules! define_page_allocator {
    ($name:ident, $index:ident, $doc:expr) => {
        #[doc = $doc]
        pub struct $name {
            bitmap: Mutex<Bitmap>,
        }

        impl $name {
            /// Creates an allocator managing `capacity` units, all free.
            pub fn new(capacity: usize) -> Self {
                Self {
                    bitmap: Mutex::new(Bitmap::new(capacity)),
                }
            }

            /// Returns the total number of units managed.
            pub fn capacity(&self) -> usize {
                self.bitmap.lock().capacity()
            }

            /// Returns the number of units currently allocated.
            pub fn allocated_count(&self) -> usize {
                self.bitmap.lock().count_set()
            }

            /// Returns true if the unit is currently allocated.
            pub fn is_allocated(&self, index: $index) -> bool {
                self.bitmap.lock().test(index.as_usize())
            }

            /// Allocates the lowest-numbered free unit.
            ///
            /// First-fit over the bitmap, so the order is deterministic.
            /// Returns `None` when the medium is exhausted.
            pub fn allocate(&self) -> Option<$index> {
                self.bitmap.lock().find_and_set().map($index::new)
            }

            /// Releases a unit back to the pool.
            ///
            /// Rejects an index past capacity and a unit that is not
            /// currently allocated; a double free must surface rather than
            /// silently clear a bit some other entry may own by then.
            pub fn free(&self, index: $index) -> Result<(), FreeError> {
                let mut bitmap = self.bitmap.lock();
                if index.as_usize() >= bitmap.capacity() {
                    return Err(FreeError::OutOfRange);
                }
                if !bitmap.clear(index.as_usize()) {
                    return Err(FreeError::NotAllocated);
                }
                Ok(())
            }
        }
    };
}

define_page_allocator!(
    PhysicalPageAllocator,
    FrameNumber,
    "Allocator for physical page frames.\n\n\
     One bit per frame of main memory. Exactly one instance exists per\n\
     system, created at kernel start; every address space allocates and\n\
     releases frames through it."
);

define_page_allocator!(
    SwapPageAllocator,
    SwapSlot,
    "Allocator for swap-device slots.\n\n\
     Same contract as [`PhysicalPageAllocator`] with the swap device as the\n\
     backing medium. A slot holds one page-sized sector."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_in_deterministic_order() {
        let frames = PhysicalPageAllocator::new(4);
        assert_eq!(frames.allocate(), Some(FrameNumber::new(0)));
        assert_eq!(frames.allocate(), Some(FrameNumber::new(1)));
        assert_eq!(frames.allocated_count(), 2);
    }

    #[test]
    fn exhaustion_returns_none() {
        let slots = SwapPageAllocator::new(2);
        assert!(slots.allocate().is_some());
        assert!(slots.allocate().is_some());
        assert_eq!(slots.allocate(), None);
    }

    #[test]
    fn freed_unit_is_reallocated_first() {
        let frames = PhysicalPageAllocator::new(4);
        for _ in 0..3 {
            frames.allocate();
        }
        frames.free(FrameNumber::new(1)).unwrap();
        assert_eq!(frames.allocate(), Some(FrameNumber::new(1)));
    }

    #[test]
    fn double_free_is_rejected() {
        let frames = PhysicalPageAllocator::new(4);
        let frame = frames.allocate().unwrap();
        assert_eq!(frames.free(frame), Ok(()));
        assert_eq!(frames.free(frame), Err(FreeError::NotAllocated));
    }

    #[test]
    fn rejected_double_free_cannot_clear_next_owner() {
        let frames = PhysicalPageAllocator::new(4);
        let frame = frames.allocate().unwrap();
        frames.free(frame).unwrap();
        assert_eq!(frames.free(frame), Err(FreeError::NotAllocated));

        // A later owner picks the same frame back up; the earlier failed
        // free must not have disturbed it.
        let reused = frames.allocate().unwrap();
        assert_eq!(reused, frame);
        assert!(frames.is_allocated(reused));
    }

    #[test]
    fn out_of_range_free_is_rejected() {
        let slots = SwapPageAllocator::new(2);
        assert_eq!(slots.free(SwapSlot::new(7)), Err(FreeError::OutOfRange));
    }
}
