//! Process-wide memory system.
//!
//! [`SystemMemory`] is the single owner of both page allocators and the
//! swap area. The kernel builds exactly one at start-up and hands an `Arc`
//! to every address space; no other path reaches the allocators, so two
//! bitmaps can never track the same frames.

use crate::page_allocator::PhysicalPageAllocator;
use crate::swap::SwapArea;

/// Machine geometry for the virtual-memory subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Size of a page, a frame, and a swap sector, in bytes.
    pub page_size: usize,
    /// Bytes of stack appended to every address space.
    pub user_stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            page_size: 128,
            user_stack_size: 1024,
        }
    }
}

/// The shared memory system: frame allocator, optional swap, geometry.
pub struct SystemMemory {
    config: VmConfig,
    frames: PhysicalPageAllocator,
    swap: Option<SwapArea>,
}

impl SystemMemory {
    /// Creates a memory system with `num_frames` physical frames and no
    /// swap device.
    pub fn new(num_frames: usize, config: VmConfig) -> Self {
        Self {
            config,
            frames: PhysicalPageAllocator::new(num_frames),
            swap: None,
        }
    }

    /// Creates a memory system with `num_frames` physical frames backed by
    /// a swap area.
    pub fn with_swap(num_frames: usize, config: VmConfig, swap: SwapArea) -> Self {
        Self {
            config,
            frames: PhysicalPageAllocator::new(num_frames),
            swap: Some(swap),
        }
    }

    /// Returns the configured geometry.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the physical frame allocator.
    pub fn frames(&self) -> &PhysicalPageAllocator {
        &self.frames
    }

    /// Returns the swap area, if one is configured.
    pub fn swap(&self) -> Option<&SwapArea> {
        self.swap.as_ref()
    }
}
