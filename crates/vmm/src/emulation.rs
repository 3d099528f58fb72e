//! Host-side doubles for every collaborator the subsystem consumes.
//!
//! Available under test and the `software-emulation` feature, so the whole
//! load/execute path can run on any host with no kernel underneath: a file
//! system of in-memory images, an execution engine that just records what
//! was installed, and a sector-array swap device.

use std::collections::BTreeMap;

use crate::filesys::{FileSystem, OpenFile};
use crate::machine::{Machine, NUM_TOTAL_REGS};
use crate::numbers::SwapSlot;
use crate::page_table::TranslationEntry;
use crate::swap::SwapDevice;

/// A file system of named in-memory images.
#[derive(Default)]
pub struct EmulatedFileSystem {
    files: BTreeMap<String, Vec<u8>>,
}

impl EmulatedFileSystem {
    /// Creates an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file.
    pub fn add_file(&mut self, name: &str, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }
}

impl FileSystem for EmulatedFileSystem {
    type File = EmulatedFile;

    fn open(&self, name: &str) -> Option<EmulatedFile> {
        self.files.get(name).map(|bytes| EmulatedFile {
            data: bytes.clone(),
        })
    }
}

/// An open handle onto an emulated file.
pub struct EmulatedFile {
    data: Vec<u8>,
}

impl OpenFile for EmulatedFile {
    fn read_at(&mut self, buf: &mut [u8], offset: usize) -> usize {
        let start = offset.min(self.data.len());
        let end = (offset + buf.len()).min(self.data.len());
        let count = end - start;
        buf[..count].copy_from_slice(&self.data[start..end]);
        count
    }
}

/// An execution engine that records registers, memory, and the installed
/// translation context without executing anything.
pub struct EmulatedMachine {
    registers: [u32; NUM_TOTAL_REGS],
    memory: Vec<u8>,
    page_table: Vec<TranslationEntry>,
    run_count: usize,
}

impl EmulatedMachine {
    /// Creates a machine with `memory_size` bytes of main memory.
    pub fn new(memory_size: usize) -> Self {
        Self {
            registers: [0; NUM_TOTAL_REGS],
            memory: vec![0; memory_size],
            page_table: Vec::new(),
            run_count: 0,
        }
    }

    /// Reads back one register.
    pub fn register(&self, reg: usize) -> u32 {
        self.registers[reg]
    }

    /// Returns main memory for inspection.
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Mutable access to the active translation context, standing in for
    /// the entry updates a real engine makes while a space runs.
    pub fn active_page_table_mut(&mut self) -> &mut [TranslationEntry] {
        &mut self.page_table
    }

    /// Returns how many times `run` was invoked.
    pub fn run_count(&self) -> usize {
        self.run_count
    }
}

impl Machine for EmulatedMachine {
    fn write_register(&mut self, reg: usize, value: u32) {
        self.registers[reg] = value;
    }

    fn main_memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn install_page_table(&mut self, entries: &[TranslationEntry]) {
        self.page_table = entries.to_vec();
    }

    fn active_page_table(&self) -> &[TranslationEntry] {
        &self.page_table
    }

    fn run(&mut self) {
        self.run_count += 1;
    }
}

/// A swap device over an in-memory sector array.
pub struct EmulatedSwapDevice {
    sectors: Vec<u8>,
    sector_size: usize,
}

impl EmulatedSwapDevice {
    /// Creates a device with `num_sectors` sectors of `sector_size` bytes.
    pub fn new(num_sectors: usize, sector_size: usize) -> Self {
        Self {
            sectors: vec![0; num_sectors * sector_size],
            sector_size,
        }
    }

    /// Returns the stored contents of one sector.
    pub fn sector(&self, slot: SwapSlot) -> &[u8] {
        let start = slot.as_usize() * self.sector_size;
        &self.sectors[start..start + self.sector_size]
    }
}

impl SwapDevice for EmulatedSwapDevice {
    fn read_sector(&mut self, slot: SwapSlot, buf: &mut [u8]) {
        assert_eq!(buf.len(), self.sector_size, "sector size mismatch");
        let start = slot.as_usize() * self.sector_size;
        buf.copy_from_slice(&self.sectors[start..start + self.sector_size]);
    }

    fn write_sector(&mut self, slot: SwapSlot, buf: &[u8]) {
        assert_eq!(buf.len(), self.sector_size, "sector size mismatch");
        let start = slot.as_usize() * self.sector_size;
        self.sectors[start..start + self.sector_size].copy_from_slice(buf);
    }
}
