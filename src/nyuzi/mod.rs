//! Nyuzi target components.
//!
//! Nyuzi encodes every instruction as one 32-bit little-endian word. This
//! module provides the fixup kind table and the assembler backend that patches
//! resolved values into those words.

pub mod asm_backend;
pub mod fixup_kinds;

pub use asm_backend::{NyuziAsmBackend, INSTRUCTION_BYTES, PC_FETCH_OFFSET};
pub use fixup_kinds::{
    fixup_kind_info, HI19, IMM_LO13, NUM_TARGET_FIXUP_KINDS, PCREL_BRANCH,
    PCREL_COMPUTE_LABEL_ADDRESS, PCREL_MEM_ACC_EXT,
};
