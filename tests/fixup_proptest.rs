//! Property-based tests for Nyuzi fixup application.

use proptest::prelude::*;
use tpde_target::core::{AsmBackend, CodeBuffer, Fixup, FixupKind};
use tpde_target::nyuzi::{
    NyuziAsmBackend, HI19, PCREL_BRANCH, PCREL_COMPUTE_LABEL_ADDRESS, PCREL_MEM_ACC_EXT,
};

// ── Strategies ──────────────────────────────────────────────────────────

/// A PC-relative kind and a raw value that fits its signed field.
fn pc_rel_fixup() -> impl Strategy<Value = (FixupKind, i64)> {
    prop::sample::select(vec![
        PCREL_MEM_ACC_EXT,
        PCREL_BRANCH,
        PCREL_COMPUTE_LABEL_ADDRESS,
    ])
    .prop_flat_map(|kind| {
        let bits = NyuziAsmBackend::new().fixup_kind_info(kind).target_size;
        let half = 1i64 << (bits - 1);
        (Just(kind), -half..half)
    })
}

proptest! {
    /// Reading the field back yields the rebased value truncated to the field.
    #[test]
    fn pc_relative_round_trip((kind, raw) in pc_rel_fixup()) {
        let backend = NyuziAsmBackend::new();
        let info = backend.fixup_kind_info(kind);
        let mut buf = CodeBuffer::zeroed(4);
        backend.apply_fixup(&Fixup::new(kind, 0, raw), &mut buf, raw);

        let field = (buf.read_le(0, 4) & info.mask()) >> info.target_offset;
        let expected = ((raw - 4) as u64) & (info.mask() >> info.target_offset);
        prop_assert_eq!(field, expected);
    }

    /// Bits outside the field are never disturbed.
    #[test]
    fn apply_only_touches_the_field((kind, raw) in pc_rel_fixup(), background in any::<u32>()) {
        let backend = NyuziAsmBackend::new();
        let mask = backend.fixup_kind_info(kind).mask();
        let word = u64::from(background) & !mask;
        let mut buf = CodeBuffer::from_bytes((word as u32).to_le_bytes().to_vec());
        backend.apply_fixup(&Fixup::new(kind, 0, raw), &mut buf, raw);
        prop_assert_eq!(buf.read_le(0, 4) & !mask, word);
    }

    /// HI19 moves bits 13..=17 to 0..=4 and bits 18..=31 to 10..=23.
    #[test]
    fn hi19_repacks_both_fields(value in any::<u32>()) {
        let backend = NyuziAsmBackend::new();
        let value = i64::from(value);
        let adjusted = backend.adjust_fixup_value(&Fixup::new(HI19, 0, value), value, None);
        let expected = ((value >> 13) & 0x1f) | (((value >> 18) & 0x3fff) << 10);
        prop_assert_eq!(adjusted, expected);
    }
}
