// This module provides the target-neutral half of fixup resolution. A fixup is a deferred patch
// of an address or immediate into instruction bytes that were emitted before the value was
// known; it names a FixupKind, the byte offset of the instruction word in the CodeBuffer, the
// raw value, and the source location used for diagnostics. FixupKindInfo is the static shape of
// a kind: where its field starts in the instruction word, how wide it is, whether it is
// PC-relative, and, for immediates the encoding scatters over non-contiguous bits, a
// declarative list of field moves applied to the raw value. Kind indices below
// FIRST_TARGET_FIXUP_KIND are generic data kinds shared by every target. The AsmBackend trait is
// implemented per target; FixupEncoder drives it over a list of fixups, reporting range errors
// first and then patching each fixup exactly once.

//! Fixups, fixup kind metadata, code buffers and the backend hook.
//!
//! Fixup application is an OR into the instruction word: the target field
//! must still be zero when the fixup is applied. [`CodeBuffer::is_field_clear`]
//! checks that precondition and backends log a warning when it does not hold.

use super::error::DiagnosticEngine;
use std::fmt;

/// First kind index owned by a target; lower indices are generic.
pub const FIRST_TARGET_FIXUP_KIND: u32 = 128;

/// Fixup kind index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixupKind(u32);

impl FixupKind {
    pub const NONE: Self = Self(0);
    pub const DATA_1: Self = Self(1);
    pub const DATA_2: Self = Self(2);
    pub const DATA_4: Self = Self(3);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Kind `index` of the target-specific range.
    pub const fn target(index: u32) -> Self {
        Self(FIRST_TARGET_FIXUP_KIND + index)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_target_specific(self) -> bool {
        self.0 >= FIRST_TARGET_FIXUP_KIND
    }
}

/// A contiguous bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    pub lsb: u32,
    pub width: u32,
}

impl BitRange {
    pub const fn new(lsb: u32, width: u32) -> Self {
        Self { lsb, width }
    }

    pub const fn mask(self) -> u64 {
        low_bits(self.width) << self.lsb
    }

    /// Extract this range from `value`, right aligned.
    pub const fn extract(self, value: u64) -> u64 {
        (value >> self.lsb) & low_bits(self.width)
    }
}

/// Move one bit range of a raw value to `to_lsb` of the encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMove {
    pub from: BitRange,
    pub to_lsb: u32,
}

impl FieldMove {
    pub const fn new(from_lsb: u32, width: u32, to_lsb: u32) -> Self {
        Self {
            from: BitRange::new(from_lsb, width),
            to_lsb,
        }
    }
}

/// Static description of a fixup kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixupKindInfo {
    pub name: &'static str,
    /// Bit offset of the field within the instruction word.
    pub target_offset: u32,
    /// Width of the field in bits.
    pub target_size: u32,
    pub is_pc_rel: bool,
    /// Field moves repacking a scattered immediate. Empty for contiguous kinds.
    pub split: &'static [FieldMove],
}

impl FixupKindInfo {
    pub const fn new(name: &'static str, target_offset: u32, target_size: u32) -> Self {
        Self {
            name,
            target_offset,
            target_size,
            is_pc_rel: false,
            split: &[],
        }
    }

    pub const fn pc_rel(mut self) -> Self {
        self.is_pc_rel = true;
        self
    }

    pub const fn with_split(mut self, split: &'static [FieldMove]) -> Self {
        self.split = split;
        self
    }

    /// Mask of the field within the instruction word.
    pub const fn mask(&self) -> u64 {
        BitRange::new(self.target_offset, self.target_size).mask()
    }

    /// Apply the split moves to `value`. Bits not covered by a move are dropped.
    pub fn repack(&self, value: u64) -> u64 {
        self.split
            .iter()
            .fold(0, |acc, mv| acc | (mv.from.extract(value) << mv.to_lsb))
    }

    /// Whether `value` fits the field as a signed integer.
    pub fn fits_signed(&self, value: i64) -> bool {
        match self.target_size {
            0 => value == 0,
            64.. => true,
            bits => {
                let min = -(1i64 << (bits - 1));
                let max = (1i64 << (bits - 1)) - 1;
                (min..=max).contains(&value)
            }
        }
    }
}

static GENERIC_FIXUP_KIND_INFOS: [FixupKindInfo; 4] = [
    FixupKindInfo::new("FK_NONE", 0, 0),
    FixupKindInfo::new("FK_Data_1", 0, 8),
    FixupKindInfo::new("FK_Data_2", 0, 16),
    FixupKindInfo::new("FK_Data_4", 0, 32),
];

/// Metadata for a generic kind. Unknown generic kinds fall back to `FK_NONE`.
pub fn generic_fixup_kind_info(kind: FixupKind) -> &'static FixupKindInfo {
    assert!(
        !kind.is_target_specific(),
        "fixup kind {} is target specific",
        kind.raw()
    );
    GENERIC_FIXUP_KIND_INFOS
        .get(kind.raw() as usize)
        .unwrap_or(&GENERIC_FIXUP_KIND_INFOS[0])
}

/// Source position a fixup was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An unresolved patch into a code buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixup {
    kind: FixupKind,
    offset: u32,
    value: i64,
    loc: SourceLoc,
}

impl Fixup {
    pub fn new(kind: FixupKind, offset: u32, value: i64) -> Self {
        Self {
            kind,
            offset,
            value,
            loc: SourceLoc::default(),
        }
    }

    pub fn with_loc(mut self, loc: SourceLoc) -> Self {
        self.loc = loc;
        self
    }

    pub fn kind(&self) -> FixupKind {
        self.kind
    }

    /// Byte offset of the patched instruction word.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Raw, unadjusted value.
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn loc(&self) -> SourceLoc {
        self.loc
    }
}

/// Emitted instruction bytes awaiting fixups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append `count` zero bytes.
    pub fn zero_fill(&mut self, count: usize) {
        self.bytes.resize(self.bytes.len() + count, 0);
    }

    /// Append a little-endian 32-bit instruction word.
    pub fn emit_u32(&mut self, word: u32) {
        self.append(&word.to_le_bytes());
    }

    fn word_range(&self, offset: usize, num_bytes: usize) -> std::ops::Range<usize> {
        assert!(num_bytes <= 8, "words are at most 8 bytes, got {num_bytes}");
        let end = offset
            .checked_add(num_bytes)
            .filter(|&end| end <= self.bytes.len())
            .unwrap_or_else(|| {
                panic!(
                    "{num_bytes}-byte word at offset {offset} is outside the {}-byte buffer",
                    self.bytes.len()
                )
            });
        offset..end
    }

    /// Read `num_bytes` at `offset` as a little-endian word.
    pub fn read_le(&self, offset: usize, num_bytes: usize) -> u64 {
        self.bytes[self.word_range(offset, num_bytes)]
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &b)| acc | (u64::from(b) << (i * 8)))
    }

    /// Write the low `num_bytes` of `word` at `offset`, little-endian.
    pub fn write_le(&mut self, offset: usize, num_bytes: usize, word: u64) {
        let range = self.word_range(offset, num_bytes);
        for (i, byte) in self.bytes[range].iter_mut().enumerate() {
            *byte = (word >> (i * 8)) as u8;
        }
    }

    /// Whether every bit of `mask` is zero in the word at `offset`.
    pub fn is_field_clear(&self, offset: usize, num_bytes: usize, mask: u64) -> bool {
        self.read_le(offset, num_bytes) & mask == 0
    }
}

/// Target hook for resolving fixups into encoded instructions.
pub trait AsmBackend {
    fn num_fixup_kinds(&self) -> u32;

    /// Metadata for `kind`. Generic kinds delegate to [`generic_fixup_kind_info`].
    fn fixup_kind_info(&self, kind: FixupKind) -> &'static FixupKindInfo;

    /// Turn a raw value into the bits stored in the field.
    ///
    /// Range problems are reported into `diags` when one is given.
    fn adjust_fixup_value(
        &self,
        fixup: &Fixup,
        value: i64,
        diags: Option<&mut DiagnosticEngine>,
    ) -> i64;

    /// Patch `value` into `data`. The field must be zero beforehand.
    fn apply_fixup(&self, fixup: &Fixup, data: &mut CodeBuffer, value: i64);

    /// Report range errors for `fixup` without patching anything.
    fn process_fixup_value(&self, fixup: &Fixup, diags: &mut DiagnosticEngine) {
        self.adjust_fixup_value(fixup, fixup.value(), Some(diags));
    }

    fn may_need_relaxation(&self, encoded: &[u8]) -> bool;

    fn fixup_needs_relaxation(&self, fixup: &Fixup, value: i64) -> bool;

    /// Grow an encoded instruction so its fixup fits.
    fn relax_instruction(&self, encoded: &[u8]) -> Vec<u8>;

    /// Append `count` bytes of padding.
    fn write_nop_data(&self, count: usize, out: &mut CodeBuffer);
}

/// Applies a batch of fixups through a backend.
pub struct FixupEncoder<'b, B: AsmBackend> {
    backend: &'b B,
}

impl<'b, B: AsmBackend> FixupEncoder<'b, B> {
    pub fn new(backend: &'b B) -> Self {
        Self { backend }
    }

    /// Report and apply every fixup in order.
    ///
    /// Fixups are consumed; none is applied twice. Out-of-range values are
    /// reported into `diags` and still written so later fixups get checked.
    pub fn resolve(
        &self,
        data: &mut CodeBuffer,
        fixups: Vec<Fixup>,
        diags: &mut DiagnosticEngine,
    ) {
        for fixup in fixups {
            self.backend.process_fixup_value(&fixup, diags);
            log::debug!(
                "applying {} at offset {} (value {})",
                self.backend.fixup_kind_info(fixup.kind()).name,
                fixup.offset(),
                fixup.value()
            );
            self.backend.apply_fixup(&fixup, data, fixup.value());
        }
    }
}

/// `width` low bits set.
const fn low_bits(width: u32) -> u64 {
    if width == 0 {
        0
    } else if width >= 64 {
        u64::MAX
    } else {
        u64::MAX >> (64 - width)
    }
}
