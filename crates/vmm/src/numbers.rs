//! Index newtypes for the three resource kinds the subsystem juggles.
//!
//! Keeping virtual pages, physical frames, and swap slots as distinct types
//! means a swap slot can never be mistaken for a page number or a frame, no
//! matter how a translation entry is rewritten.

use core::fmt;
use core::ops::Add;

/// Macro to define a zero-indexed resource number.
///
/// Generates the newtype plus the small amount of arithmetic and formatting
/// shared by all three index kinds.
macro_rules! define_index_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Creates a new index.
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Returns the raw index.
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add<usize> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: usize) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                Self(index)
            }
        }
    };
}

define_index_type!(
    PageNumber,
    "A virtual page number.\n\n\
     Indexes a page within one process's virtual address space; doubles as\n\
     the position of the page's translation entry in the page table."
);

define_index_type!(
    FrameNumber,
    "A physical frame number.\n\n\
     Indexes a page-sized unit of main memory. Frame `n` occupies bytes\n\
     `n * page_size .. (n + 1) * page_size` of the machine's memory buffer."
);

define_index_type!(
    SwapSlot,
    "A swap slot number.\n\n\
     Indexes a page-sized sector on the swap device, used to hold a page\n\
     that could not be given a physical frame at load time."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        assert_eq!(PageNumber::new(7).as_usize(), 7);
        assert_eq!(FrameNumber::from(3).as_usize(), 3);
    }

    #[test]
    fn add_offset() {
        assert_eq!(PageNumber::new(4) + 2, PageNumber::new(6));
        assert_eq!(SwapSlot::new(0) + 5, SwapSlot::new(5));
    }

    #[test]
    fn formatting() {
        assert_eq!(format!("{}", FrameNumber::new(12)), "12");
        assert_eq!(format!("{:?}", SwapSlot::new(2)), "SwapSlot(2)");
    }

    #[test]
    fn distinct_types_compare_within_kind() {
        assert!(FrameNumber::new(1) < FrameNumber::new(2));
        assert_eq!(PageNumber::new(9), PageNumber::new(9));
    }
}
