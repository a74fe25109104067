// This module implements fixup resolution for the Nyuzi instruction set. Adjusting a value
// depends on the kind: PC-relative kinds are range checked against their signed field width and
// then rebased by the 4-byte fetch offset, because the hardware measures them from the next
// instruction; HI19 is repacked through its field moves and is never range checked (it is
// treated as unsigned); every other kind passes through. An out-of-range value is reported to
// the diagnostic engine when one is supplied and then degrades to zero, so one run reports every
// bad fixup. Applying a fixup reads the 4-byte little-endian word (generic data kinds read only
// the bytes their field covers), ORs the shifted value in under the field mask, and writes the
// word back. The OR assumes the field is still zero and a warning is logged when it is not. The
// architecture has no variable-length encodings, so
// relaxation is never needed and asking for it is a contract violation.

//! Nyuzi assembler backend.

use super::fixup_kinds::{self, NUM_TARGET_FIXUP_KINDS};
use crate::core::error::{DiagnosticEngine, FixupError};
use crate::core::fixup::{AsmBackend, CodeBuffer, Fixup, FixupKind, FixupKindInfo};

/// Size of an instruction word in bytes.
pub const INSTRUCTION_BYTES: usize = 4;

/// PC-relative values are relative to PC + 4.
pub const PC_FETCH_OFFSET: i64 = 4;

/// Assembler backend for Nyuzi.
#[derive(Debug, Default, Clone, Copy)]
pub struct NyuziAsmBackend;

impl NyuziAsmBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AsmBackend for NyuziAsmBackend {
    fn num_fixup_kinds(&self) -> u32 {
        NUM_TARGET_FIXUP_KINDS
    }

    fn fixup_kind_info(&self, kind: FixupKind) -> &'static FixupKindInfo {
        fixup_kinds::fixup_kind_info(kind)
    }

    fn adjust_fixup_value(
        &self,
        fixup: &Fixup,
        value: i64,
        diags: Option<&mut DiagnosticEngine>,
    ) -> i64 {
        let info = self.fixup_kind_info(fixup.kind());

        if info.is_pc_rel {
            if !info.fits_signed(value) {
                if let Some(diags) = diags {
                    diags.report_error(
                        fixup.loc(),
                        FixupError::OutOfRange {
                            kind: info.name,
                            value,
                            bits: info.target_size,
                        },
                    );
                    return 0;
                }
            }
            return value.wrapping_sub(PC_FETCH_OFFSET);
        }

        if !info.split.is_empty() {
            return info.repack(value as u64) as i64;
        }

        value
    }

    fn apply_fixup(&self, fixup: &Fixup, data: &mut CodeBuffer, value: i64) {
        let info = self.fixup_kind_info(fixup.kind());
        let value = self.adjust_fixup_value(fixup, value, None);
        let offset = fixup.offset() as usize;
        let mask = info.mask();
        // Generic data kinds patch only as many bytes as their field covers.
        let num_bytes = if fixup.kind().is_target_specific() {
            INSTRUCTION_BYTES
        } else {
            (info.target_offset + info.target_size).div_ceil(8) as usize
        };

        let mut word = data.read_le(offset, num_bytes);
        if word & mask != 0 {
            log::warn!(
                "{} at offset {offset}: field already holds {:#x}, bits will be merged",
                info.name,
                (word & mask) >> info.target_offset
            );
        }
        word |= ((value as u64) << info.target_offset) & mask;
        data.write_le(offset, num_bytes, word);
    }

    fn may_need_relaxation(&self, _encoded: &[u8]) -> bool {
        false
    }

    fn fixup_needs_relaxation(&self, _fixup: &Fixup, _value: i64) -> bool {
        false
    }

    fn relax_instruction(&self, _encoded: &[u8]) -> Vec<u8> {
        panic!("relax_instruction: Nyuzi instructions have a fixed 4-byte encoding");
    }

    // Strings may be emitted in the text area, so padding is not always a
    // multiple of the instruction size. Zeroes are fine either way.
    fn write_nop_data(&self, count: usize, out: &mut CodeBuffer) {
        out.zero_fill(count);
    }
}
