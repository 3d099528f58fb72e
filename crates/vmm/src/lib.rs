#![cfg_attr(not(any(test, feature = "software-emulation")), no_std)]

//! # Meridian Virtual Memory Manager (VMM)
//!
//! The address-space subsystem of the Meridian teaching kernel. It turns a
//! NOFF executable image into a runnable virtual address space, manages
//! the mapping from virtual pages to physical frames (spilling to a swap
//! device when physical memory is exhausted), and provides the hooks that
//! let a context switch atomically change which address space the engine
//! is translating for.
//!
//! The instruction engine, file system, and swap device are collaborators
//! reached through traits ([`Machine`], [`FileSystem`], [`SwapDevice`]);
//! the `software-emulation` feature provides host-side implementations of
//! all three so the subsystem runs anywhere.

extern crate alloc;

mod address_space;
mod bitmap;
mod filesys;
mod machine;
mod noff;
mod numbers;
mod page_allocator;
mod page_table;
mod swap;
mod system;

#[cfg(any(test, feature = "software-emulation"))]
pub mod emulation;

pub use address_space::{AddressSpace, LoadError};
pub use bitmap::Bitmap;
pub use filesys::{FileSystem, OpenFile};
pub use machine::{
    BAD_VADDR_REG, Machine, NEXT_PC_REG, NUM_TOTAL_REGS, PC_REG, PREV_PC_REG, STACK_REG,
};
pub use noff::{HEADER_SIZE, HeaderError, NOFF_MAGIC, NoffHeader, Segment};
pub use numbers::{FrameNumber, PageNumber, SwapSlot};
pub use page_allocator::{FreeError, PhysicalPageAllocator, SwapPageAllocator};
pub use page_table::{PageBacking, PageTable, TranslationEntry};
pub use swap::{SwapArea, SwapDevice};
pub use system::{SystemMemory, VmConfig};
