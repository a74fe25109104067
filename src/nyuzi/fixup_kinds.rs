// This module defines the fixup kinds of the Nyuzi instruction set and their static metadata.
// Instructions are single 32-bit little-endian words. Three kinds are PC-relative (memory
// access offsets, branches and label address computation) and are measured from the address of
// the following instruction. HI19 carries the upper bits of a 32-bit constant scattered over two
// fields of the word, so its metadata lists the field moves that repack the raw value instead of
// a contiguous field. IMM_LO13 is the unsigned low 13 bits of such a constant. The table order
// follows the kind indices; anything below the target range is answered by the generic table.

//! Nyuzi fixup kinds.

use crate::core::fixup::{
    generic_fixup_kind_info, FieldMove, FixupKind, FixupKindInfo, FIRST_TARGET_FIXUP_KIND,
};

pub const PCREL_MEM_ACC_EXT: FixupKind = FixupKind::target(0);
pub const PCREL_BRANCH: FixupKind = FixupKind::target(1);
pub const PCREL_COMPUTE_LABEL_ADDRESS: FixupKind = FixupKind::target(2);
pub const HI19: FixupKind = FixupKind::target(3);
pub const IMM_LO13: FixupKind = FixupKind::target(4);

pub const NUM_TARGET_FIXUP_KINDS: u32 = 5;

/// Bits 13..=17 go to 0..=4, bits 18..=31 go to 10..=23.
static HI19_FIELDS: [FieldMove; 2] = [FieldMove::new(13, 5, 0), FieldMove::new(18, 14, 10)];

// Must stay in the same order as the kind indices above.
static FIXUP_KIND_INFOS: [FixupKindInfo; NUM_TARGET_FIXUP_KINDS as usize] = [
    FixupKindInfo::new("fixup_Nyuzi_PCRel_MemAccExt", 10, 15).pc_rel(),
    FixupKindInfo::new("fixup_Nyuzi_PCRel_Branch", 5, 20).pc_rel(),
    FixupKindInfo::new("fixup_Nyuzi_PCRel_ComputeLabelAddress", 10, 14).pc_rel(),
    FixupKindInfo::new("fixup_Nyuzi_HI19", 0, 32).with_split(&HI19_FIELDS),
    FixupKindInfo::new("fixup_Nyuzi_IMM_LO13", 10, 13),
];

/// Metadata for `kind`.
///
/// Panics on indices past the target range.
pub fn fixup_kind_info(kind: FixupKind) -> &'static FixupKindInfo {
    if !kind.is_target_specific() {
        return generic_fixup_kind_info(kind);
    }
    let index = kind.raw() - FIRST_TARGET_FIXUP_KIND;
    assert!(
        index < NUM_TARGET_FIXUP_KINDS,
        "invalid fixup kind {}",
        kind.raw()
    );
    &FIXUP_KIND_INFOS[index as usize]
}
