//! Per-process page tables.
//!
//! A page table is an ordered sequence of translation entries, one per
//! virtual page of one address space. Each entry records where the page's
//! contents live through a dedicated [`PageBacking`] field, so a swap slot
//! can never be confused with the virtual page number or a frame index.

use alloc::vec::Vec;

use crate::numbers::{FrameNumber, PageNumber, SwapSlot};

/// Where a virtual page's contents currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBacking {
    /// No backing yet. Uninitialized-data and stack pages stay in this
    /// state after a load; resolving them belongs to whatever owns
    /// zero-fill elsewhere in the system.
    Unmapped,
    /// Resident in a physical frame owned by this entry.
    Resident(FrameNumber),
    /// Written out to a swap slot owned by this entry; not resident.
    Swapped(SwapSlot),
}

/// One virtual-page-to-backing-location mapping record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationEntry {
    /// The virtual page this entry translates.
    pub virtual_page: PageNumber,
    /// Where the page's contents live.
    pub backing: PageBacking,
    /// Set by the engine when the page is written.
    pub dirty: bool,
    /// Set by the engine when the page is referenced.
    pub used: bool,
    /// The page should not be written by user instructions. Carried for the
    /// engine; not enforced here.
    pub read_only: bool,
}

impl TranslationEntry {
    /// Creates an entry for `virtual_page` with no backing and all flags
    /// clear.
    pub fn unmapped(virtual_page: PageNumber) -> Self {
        Self {
            virtual_page,
            backing: PageBacking::Unmapped,
            dirty: false,
            used: false,
            read_only: false,
        }
    }

    /// Returns true if the page is resident in a physical frame.
    pub fn valid(&self) -> bool {
        matches!(self.backing, PageBacking::Resident(_))
    }

    /// Returns the owning frame if the page is resident.
    pub fn frame(&self) -> Option<FrameNumber> {
        match self.backing {
            PageBacking::Resident(frame) => Some(frame),
            _ => None,
        }
    }

    /// Returns the owning swap slot if the page has been spilled.
    pub fn swap_slot(&self) -> Option<SwapSlot> {
        match self.backing {
            PageBacking::Swapped(slot) => Some(slot),
            _ => None,
        }
    }
}

/// An ordered sequence of translation entries for one address space.
pub struct PageTable {
    entries: Vec<TranslationEntry>,
}

impl PageTable {
    /// Creates a table of `num_pages` unmapped entries, entry `i`
    /// translating virtual page `i`.
    pub fn new(num_pages: usize) -> Self {
        Self {
            entries: (0..num_pages)
                .map(|i| TranslationEntry::unmapped(PageNumber::new(i)))
                .collect(),
        }
    }

    /// Creates an empty table (an address space with no pages).
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Wraps entries copied back from the engine's active translation
    /// context.
    pub fn from_entries(entries: Vec<TranslationEntry>) -> Self {
        Self { entries }
    }

    /// Returns the number of pages this table translates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table translates no pages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries as a slice, for installation into the engine.
    pub fn entries(&self) -> &[TranslationEntry] {
        &self.entries
    }

    /// Returns the entry for a virtual page.
    ///
    /// # Panics
    /// Panics if the page is outside the table.
    pub fn entry(&self, page: PageNumber) -> &TranslationEntry {
        &self.entries[page.as_usize()]
    }

    /// Returns the entry for a virtual page, mutably.
    ///
    /// # Panics
    /// Panics if the page is outside the table.
    pub fn entry_mut(&mut self, page: PageNumber) -> &mut TranslationEntry {
        &mut self.entries[page.as_usize()]
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &TranslationEntry> {
        self.entries.iter()
    }

    /// Iterates over the entries, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TranslationEntry> {
        self.entries.iter_mut()
    }

    /// Returns the number of resident pages.
    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|e| e.valid()).count()
    }

    /// Returns the number of pages held in swap.
    pub fn swapped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.swap_slot().is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_unmapped() {
        let table = PageTable::new(4);
        assert_eq!(table.len(), 4);
        for (i, entry) in table.iter().enumerate() {
            assert_eq!(entry.virtual_page, PageNumber::new(i));
            assert_eq!(entry.backing, PageBacking::Unmapped);
            assert!(!entry.valid());
            assert!(!entry.dirty && !entry.used && !entry.read_only);
        }
    }

    #[test]
    fn backing_accessors_follow_state() {
        let mut table = PageTable::new(2);
        table.entry_mut(PageNumber::new(0)).backing = PageBacking::Resident(FrameNumber::new(5));
        table.entry_mut(PageNumber::new(1)).backing = PageBacking::Swapped(SwapSlot::new(3));

        let resident = table.entry(PageNumber::new(0));
        assert!(resident.valid());
        assert_eq!(resident.frame(), Some(FrameNumber::new(5)));
        assert_eq!(resident.swap_slot(), None);

        let swapped = table.entry(PageNumber::new(1));
        assert!(!swapped.valid());
        assert_eq!(swapped.frame(), None);
        assert_eq!(swapped.swap_slot(), Some(SwapSlot::new(3)));
    }

    #[test]
    fn counts_by_backing_kind() {
        let mut table = PageTable::new(5);
        table.entry_mut(PageNumber::new(0)).backing = PageBacking::Resident(FrameNumber::new(0));
        table.entry_mut(PageNumber::new(2)).backing = PageBacking::Resident(FrameNumber::new(1));
        table.entry_mut(PageNumber::new(4)).backing = PageBacking::Swapped(SwapSlot::new(0));
        assert_eq!(table.resident_count(), 2);
        assert_eq!(table.swapped_count(), 1);
    }
}
