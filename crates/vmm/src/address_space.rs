//! Address spaces for user programs.
//!
//! An [`AddressSpace`] turns a NOFF executable image into a runnable
//! virtual address space: it sizes a page table to the image, loads the
//! code and initialized-data segments page by page (allocating physical
//! frames and spilling to swap when the frame pool runs dry), sets up the
//! initial register file, and carries the save/restore hooks a context
//! switch uses to move the engine's active translation context between
//! processes.
//!
//! Pages that could not be given a frame are written to swap at load time.
//! That is the whole policy here: nothing in this module resolves a
//! translation miss at access time.

use alloc::sync::Arc;
use alloc::vec;

use crate::filesys::{FileSystem, OpenFile};
use crate::machine::{Machine, NEXT_PC_REG, NUM_TOTAL_REGS, PC_REG, STACK_REG};
use crate::noff::{self, NoffHeader, Segment};
use crate::numbers::PageNumber;
use crate::page_table::{PageBacking, PageTable};
use crate::system::SystemMemory;

/// Bytes backed off from the top of the address space, so the initial
/// stack pointer never references past the mapped region.
const STACK_FENCE: usize = 16;

/// Errors from loading or executing a user program.
///
/// All of these are recoverable: the requesting process does not start,
/// the shared allocators are left exactly as they were before the attempt,
/// and the caller decides what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The named executable does not exist.
    FileNotFound,
    /// The image is not a valid NOFF executable (bad magic in either byte
    /// order, or the file ends before bytes the header promises).
    InvalidFormat,
    /// The image needs more pages than physical memory holds and no swap
    /// device is configured.
    InsufficientMemory,
    /// Physical frames and swap slots both ran out mid-load.
    SwapExhausted,
}

/// A user program's virtual address space.
///
/// Owns exactly one page table. Frames and swap slots referenced by the
/// table are owned by its entries and released exactly once, either when a
/// new program replaces the table or when the space is dropped.
///
/// The shared [`SystemMemory`] comes in by handle at construction; the
/// file system and execution engine are passed into each operation, so
/// every collaborator can be substituted independently.
pub struct AddressSpace {
    memory: Arc<SystemMemory>,
    page_table: PageTable,
    num_pages: usize,
}

impl AddressSpace {
    /// Creates an empty address space with no pages mapped.
    pub fn new(memory: Arc<SystemMemory>) -> Self {
        Self {
            memory,
            page_table: PageTable::empty(),
            num_pages: 0,
        }
    }

    /// Creates an address space identity-mapping the whole frame pool,
    /// for running before any program has been loaded.
    ///
    /// Every frame is taken from the shared allocator, so these pages obey
    /// the same exclusive-ownership rule as demand-loaded ones and a later
    /// [`load`](Self::load) releases them through the ordinary path. On a
    /// fresh pool the first-fit order maps page `i` to frame `i`. Fails
    /// with [`LoadError::InsufficientMemory`] if any frame is already
    /// taken, releasing whatever it had claimed.
    pub fn with_identity_map(memory: Arc<SystemMemory>) -> Result<Self, LoadError> {
        let num_frames = memory.frames().capacity();
        let mut space = Self {
            memory,
            page_table: PageTable::new(num_frames),
            num_pages: num_frames,
        };
        for page in 0..num_frames {
            let Some(frame) = space.memory.frames().allocate() else {
                return Err(LoadError::InsufficientMemory);
            };
            space.page_table.entry_mut(PageNumber::new(page)).backing =
                PageBacking::Resident(frame);
        }
        Ok(space)
    }

    /// Returns the number of pages in this address space.
    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Returns the page table.
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// Loads the named user program into this address space.
    ///
    /// Parses the image header, sizes a fresh page table (releasing
    /// whatever table this space owned before), and loads the code and
    /// initialized-data segments. Uninitialized data and the stack region
    /// occupy pages but are not loaded from the file; their entries stay
    /// unmapped for whatever owns zero-fill to resolve.
    ///
    /// On any failure every frame and swap slot allocated during this
    /// attempt has been released by the time the error returns.
    pub fn load<F: FileSystem, M: Machine>(
        &mut self,
        fs: &F,
        machine: &mut M,
        name: &str,
    ) -> Result<(), LoadError> {
        let mut file = fs.open(name).ok_or_else(|| {
            log::error!("unable to open {}", name);
            LoadError::FileNotFound
        })?;

        let mut raw = [0u8; noff::HEADER_SIZE];
        let read = file.read_at(&mut raw, 0);
        let header = NoffHeader::parse(&raw[..read]).map_err(|err| {
            log::error!("{}: invalid executable header: {:?}", name, err);
            LoadError::InvalidFormat
        })?;

        let page_size = self.memory.page_size();
        let num_pages = header.required_pages(self.memory.config().user_stack_size, page_size);
        if num_pages > self.memory.frames().capacity() && self.memory.swap().is_none() {
            log::error!(
                "{}: needs {} pages, only {} frames exist and no swap is configured",
                name,
                num_pages,
                self.memory.frames().capacity()
            );
            return Err(LoadError::InsufficientMemory);
        }

        // Release the previous table's resources before replacing it.
        self.release_backing();
        self.page_table = PageTable::new(num_pages);
        self.num_pages = num_pages;
        log::debug!(
            "initializing address space for {}: {} pages, {} bytes",
            name,
            num_pages,
            num_pages * page_size
        );

        if let Err(err) = self.load_segments(&mut file, machine, &header) {
            self.release_backing();
            log::error!("{}: load failed: {:?}", name, err);
            return Err(err);
        }
        Ok(())
    }

    /// Loads and runs the named user program.
    ///
    /// On load failure the error is reported and returned with no side
    /// effects on the engine. On success the register file is initialized,
    /// this space's page table becomes the active translation context, and
    /// control transfers to the engine; `run` returns only when the
    /// process terminates.
    pub fn execute<F: FileSystem, M: Machine>(
        &mut self,
        fs: &F,
        machine: &mut M,
        name: &str,
    ) -> Result<(), LoadError> {
        self.load(fs, machine, name)?;
        self.init_registers(machine);
        self.restore_state(machine);
        machine.run();
        Ok(())
    }

    /// Sets the initial register values for a freshly loaded program.
    ///
    /// Every register is zeroed; the program counter starts at 0 with the
    /// next-PC one instruction ahead, matching the engine's branch-delay
    /// convention; the stack pointer starts [`STACK_FENCE`] bytes below
    /// the top of the address space.
    pub fn init_registers<M: Machine>(&self, machine: &mut M) {
        for reg in 0..NUM_TOTAL_REGS {
            machine.write_register(reg, 0);
        }
        machine.write_register(PC_REG, 0);
        machine.write_register(NEXT_PC_REG, 4);

        let stack_top = self.num_pages * self.memory.page_size() - STACK_FENCE;
        machine.write_register(STACK_REG, stack_top as u32);
        log::debug!("initial stack pointer: {:#x}", stack_top);
    }

    /// Context-switch hook: copies the engine's active translation context
    /// back into this space.
    ///
    /// Must be called when this space's execution is suspended, so entry
    /// mutations the engine made while running (dirty/use bits, entries
    /// updated by in-flight fault resolution) survive the switch.
    pub fn save_state<M: Machine>(&mut self, machine: &M) {
        self.page_table = PageTable::from_entries(machine.active_page_table().to_vec());
        self.num_pages = self.page_table.len();
    }

    /// Context-switch hook: installs this space's page table and size as
    /// the engine's active translation context.
    ///
    /// Must be called before any instruction of this space executes.
    pub fn restore_state<M: Machine>(&self, machine: &mut M) {
        machine.install_page_table(self.page_table.entries());
    }

    fn load_segments<M: Machine>(
        &mut self,
        file: &mut impl OpenFile,
        machine: &mut M,
        header: &NoffHeader,
    ) -> Result<(), LoadError> {
        if header.code.size > 0 {
            log::debug!(
                "loading code segment: {} bytes at {:#x}",
                header.code.size,
                header.code.virtual_addr
            );
            self.load_segment(file, machine, &header.code, true)?;
        }
        if header.init_data.size > 0 {
            log::debug!(
                "loading data segment: {} bytes at {:#x}",
                header.init_data.size,
                header.init_data.virtual_addr
            );
            self.load_segment(file, machine, &header.init_data, false)?;
        }
        Ok(())
    }

    /// Loads one segment in page-sized chunks.
    ///
    /// Each chunk gets a physical frame when one is free; otherwise the
    /// chunk is staged through a scratch buffer into a swap slot and the
    /// entry records the slot, not resident. The reservation of a frame or
    /// slot always completes before the I/O that fills it, and a failed
    /// fill releases the reservation.
    fn load_segment<M: Machine>(
        &mut self,
        file: &mut impl OpenFile,
        machine: &mut M,
        segment: &Segment,
        read_only: bool,
    ) -> Result<(), LoadError> {
        let page_size = self.memory.page_size();
        let segment_size = segment.size as usize;
        let in_file_addr = segment.in_file_addr as usize;
        let start_page = segment.virtual_addr as usize / page_size;
        let mut page_offset = segment.virtual_addr as usize % page_size;

        let mut chunk = 0;
        while chunk < segment_size {
            let vpn = PageNumber::new(start_page + chunk / page_size);
            if vpn.as_usize() >= self.page_table.len() {
                log::error!("segment reaches page {} outside the address space", vpn);
                return Err(LoadError::InvalidFormat);
            }
            let copy_size = (page_size - page_offset).min(segment_size - chunk);
            let file_offset = in_file_addr + chunk;

            let backing = self.page_table.entry(vpn).backing;
            match backing {
                // A page already backed by an earlier segment keeps its
                // frame or slot; overwriting the entry would leak it.
                PageBacking::Resident(frame) => {
                    let base = frame.as_usize() * page_size + page_offset;
                    let memory = machine.main_memory_mut();
                    read_exact(file, &mut memory[base..base + copy_size], file_offset)?;
                    let entry = self.page_table.entry_mut(vpn);
                    entry.read_only = entry.read_only && read_only;
                }
                PageBacking::Swapped(slot) => {
                    let swap = self
                        .memory
                        .swap()
                        .expect("swapped entry without a swap area");
                    let mut scratch = vec![0u8; page_size];
                    swap.read_slot(slot, &mut scratch);
                    read_exact(
                        file,
                        &mut scratch[page_offset..page_offset + copy_size],
                        file_offset,
                    )?;
                    swap.write_slot(slot, &scratch);
                    let entry = self.page_table.entry_mut(vpn);
                    entry.read_only = entry.read_only && read_only;
                }
                PageBacking::Unmapped => {
                    if let Some(frame) = self.memory.frames().allocate() {
                        let base = frame.as_usize() * page_size + page_offset;
                        let memory = machine.main_memory_mut();
                        if let Err(err) =
                            read_exact(file, &mut memory[base..base + copy_size], file_offset)
                        {
                            if let Err(free_err) = self.memory.frames().free(frame) {
                                log::error!("releasing frame {}: {:?}", frame, free_err);
                            }
                            return Err(err);
                        }
                        let entry = self.page_table.entry_mut(vpn);
                        entry.backing = PageBacking::Resident(frame);
                        entry.read_only = read_only;
                    } else {
                        let Some(swap) = self.memory.swap() else {
                            log::error!("frame pool exhausted and no swap is configured");
                            return Err(LoadError::SwapExhausted);
                        };
                        let mut scratch = vec![0u8; page_size];
                        read_exact(
                            file,
                            &mut scratch[page_offset..page_offset + copy_size],
                            file_offset,
                        )?;
                        let Some(slot) = swap.slots().allocate() else {
                            log::error!("frame pool and swap slots both exhausted");
                            return Err(LoadError::SwapExhausted);
                        };
                        swap.write_slot(slot, &scratch);
                        log::debug!(
                            "frame pool exhausted; page {} spilled to swap slot {}",
                            vpn,
                            slot
                        );
                        let entry = self.page_table.entry_mut(vpn);
                        entry.backing = PageBacking::Swapped(slot);
                        entry.read_only = read_only;
                    }
                }
            }

            page_offset = 0;
            chunk += page_size;
        }
        Ok(())
    }

    /// Releases every frame and swap slot the table owns, leaving all
    /// entries unmapped. Each unit is freed exactly once; an allocator
    /// rejection here is a bookkeeping bug and is logged, never ignored.
    fn release_backing(&mut self) {
        for entry in self.page_table.iter_mut() {
            match entry.backing {
                PageBacking::Resident(frame) => {
                    if let Err(err) = self.memory.frames().free(frame) {
                        log::error!("releasing frame {}: {:?}", frame, err);
                    }
                }
                PageBacking::Swapped(slot) => match self.memory.swap() {
                    Some(swap) => {
                        if let Err(err) = swap.slots().free(slot) {
                            log::error!("releasing swap slot {}: {:?}", slot, err);
                        }
                    }
                    None => log::error!("swapped entry for slot {} without a swap area", slot),
                },
                PageBacking::Unmapped => {}
            }
            entry.backing = PageBacking::Unmapped;
        }
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        self.release_backing();
    }
}

fn read_exact(file: &mut impl OpenFile, buf: &mut [u8], offset: usize) -> Result<(), LoadError> {
    if file.read_at(buf, offset) == buf.len() {
        Ok(())
    } else {
        Err(LoadError::InvalidFormat)
    }
}
