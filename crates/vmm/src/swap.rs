//! The swap device and its slot bookkeeping.
//!
//! [`SwapArea`] pairs the slot allocator with the block device the slots
//! live on. The device sits behind its own lock, independent of the
//! allocator's bitmap lock, so reserving a slot and writing its sector are
//! separate critical sections: the reservation is visible to other threads
//! before the filling I/O starts.

use alloc::boxed::Box;
use spin::Mutex;

use crate::numbers::SwapSlot;
use crate::page_allocator::SwapPageAllocator;

/// A block device holding spilled pages, one page-sized sector per slot.
pub trait SwapDevice {
    /// Reads the sector for `slot` into `buf`.
    fn read_sector(&mut self, slot: SwapSlot, buf: &mut [u8]);

    /// Writes `buf` as the sector for `slot`.
    fn write_sector(&mut self, slot: SwapSlot, buf: &[u8]);
}

/// The system's swap backing: slot allocator plus device.
pub struct SwapArea {
    slots: SwapPageAllocator,
    device: Mutex<Box<dyn SwapDevice + Send>>,
}

impl SwapArea {
    /// Creates a swap area with `num_slots` free slots on `device`.
    pub fn new<D: SwapDevice + Send + 'static>(num_slots: usize, device: D) -> Self {
        Self {
            slots: SwapPageAllocator::new(num_slots),
            device: Mutex::new(Box::new(device)),
        }
    }

    /// Returns the slot allocator.
    pub fn slots(&self) -> &SwapPageAllocator {
        &self.slots
    }

    /// Reads the sector for `slot` into `buf`.
    pub fn read_slot(&self, slot: SwapSlot, buf: &mut [u8]) {
        self.device.lock().read_sector(slot, buf);
    }

    /// Writes `buf` as the sector for `slot`.
    pub fn write_slot(&self, slot: SwapSlot, buf: &[u8]) {
        self.device.lock().write_sector(slot, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::EmulatedSwapDevice;

    #[test]
    fn round_trips_a_sector() {
        let area = SwapArea::new(4, EmulatedSwapDevice::new(4, 64));
        let slot = area.slots().allocate().unwrap();

        let written = [0xa5u8; 64];
        area.write_slot(slot, &written);

        let mut read = [0u8; 64];
        area.read_slot(slot, &mut read);
        assert_eq!(read, written);
    }

    #[test]
    fn slots_allocate_first_fit() {
        let area = SwapArea::new(2, EmulatedSwapDevice::new(2, 64));
        assert_eq!(area.slots().allocate(), Some(SwapSlot::new(0)));
        assert_eq!(area.slots().allocate(), Some(SwapSlot::new(1)));
        assert_eq!(area.slots().allocate(), None);
    }
}
