//! Per-opcode mapping rules.
//!
//! Opcodes without a rule get the fallback mapping from the bank info.

use crate::core::instruction::Opcode;

/// Pointer width assumed for memory addresses.
pub const POINTER_SIZE_IN_BITS: u32 = 64;

/// Static mapping rule for an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingRule {
    /// Materialized constant: the destination is scalar at its own width.
    ScalarDef,
    /// Address arithmetic: every register operand is scalar at its own width.
    ScalarRegOperands,
    /// Value and address are vector; the address is pointer sized.
    Store,
    /// Scalar or vector depending on address uniformity.
    Load,
}

impl MappingRule {
    /// Whether the rule has genuine alternatives for an optimizer to weigh.
    pub const fn has_alternatives(self) -> bool {
        matches!(self, MappingRule::Load)
    }
}

/// Rule for `opcode`, or `None` when it is not modelled.
pub const fn mapping_rule(opcode: Opcode) -> Option<MappingRule> {
    match opcode {
        Opcode::Constant => Some(MappingRule::ScalarDef),
        Opcode::Gep => Some(MappingRule::ScalarRegOperands),
        Opcode::Store => Some(MappingRule::Store),
        Opcode::Load => Some(MappingRule::Load),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_loads_have_alternatives() {
        assert_eq!(mapping_rule(Opcode::Load), Some(MappingRule::Load));
        assert!(MappingRule::Load.has_alternatives());
        assert!(!MappingRule::Store.has_alternatives());
        assert_eq!(mapping_rule(Opcode::Add), None);
        assert_eq!(mapping_rule(Opcode::Copy), None);
    }
}
