//! The execution-engine seam.
//!
//! The subsystem never interprets instructions; it prepares an address
//! space and hands the engine a page table through this trait. Register
//! indices follow the engine's fixed register file layout: 32 general
//! registers followed by the special registers below.

use crate::page_table::TranslationEntry;

/// Stack-pointer register.
pub const STACK_REG: usize = 29;
/// Program counter.
pub const PC_REG: usize = 34;
/// Next program counter, one instruction ahead of [`PC_REG`] to encode the
/// branch-delay slot.
pub const NEXT_PC_REG: usize = 35;
/// Previous program counter.
pub const PREV_PC_REG: usize = 36;
/// Holds the faulting address after a bad reference.
pub const BAD_VADDR_REG: usize = 39;
/// Total number of registers, general and special.
pub const NUM_TOTAL_REGS: usize = 40;

/// The instruction-execution engine an address space runs on.
///
/// Implementations own the register file, the active translation context,
/// and main memory as a single contiguous buffer addressable as
/// `frame * page_size + offset`.
pub trait Machine {
    /// Writes one register.
    fn write_register(&mut self, reg: usize, value: u32);

    /// Returns main memory for loading segment bytes into frames.
    fn main_memory_mut(&mut self) -> &mut [u8];

    /// Installs a page table (and, through its length, the table size) as
    /// the active translation context.
    fn install_page_table(&mut self, entries: &[TranslationEntry]);

    /// Returns the active translation context, including any entry
    /// mutations made while the current space was running.
    fn active_page_table(&self) -> &[TranslationEntry];

    /// Transfers control to user instructions. Returns only when the
    /// running process terminates.
    fn run(&mut self);
}
