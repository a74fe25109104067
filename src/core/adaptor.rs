// This module defines the adaptor traits through which bank selection queries its environment,
// in the same spirit as the IR adaptor TPDE uses to stay independent of any particular IR.
// OperandWidthResolver answers the bit width of a virtual register, RegClassResolver reports an
// optional storage-class constraint, and UniformityOracle reports whether a memory instruction
// is reached with an identical address by every lane. Uniformity itself is computed by an
// external divergence analysis and only recorded on memory operands; MemOperandUniformity is
// the stock oracle that reads that record.

//! Environment queries used by register bank selection.
//!
//! The selector never owns the function it maps. Everything it needs to know
//! about registers and memory accesses comes through these traits, so the
//! textual test IR, a real machine function, or a hand-built fixture can all
//! drive it.

use super::instruction::{MachineInstr, VirtReg};
use super::register_bank::RegisterClass;

/// Resolves the bit width of a virtual register.
pub trait OperandWidthResolver {
    /// `None` when the register is unknown to the environment.
    fn size_in_bits(&self, reg: VirtReg) -> Option<u32>;
}

/// Reports the register class a virtual register is constrained to.
pub trait RegClassResolver {
    fn reg_class(&self, reg: VirtReg) -> Option<RegisterClass>;
}

/// Reports whether every lane accesses memory at the same address.
pub trait UniformityOracle {
    fn is_uniform(&self, mi: &MachineInstr) -> bool;
}

/// Oracle reading the uniformity flag recorded on the memory operand.
///
/// Only defined for instructions with exactly one memory operand; anything
/// else is treated as divergent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemOperandUniformity;

impl UniformityOracle for MemOperandUniformity {
    fn is_uniform(&self, mi: &MachineInstr) -> bool {
        match mi.mem_operands() {
            [mmo] => mmo.is_uniform(),
            _ => false,
        }
    }
}

/// Resolve the width of `reg` or abort.
///
/// A register operand without a width means the caller handed us an
/// instruction that does not belong to the environment.
pub(crate) fn resolve_width<E: OperandWidthResolver + ?Sized>(env: &E, reg: VirtReg) -> u32 {
    match env.size_in_bits(reg) {
        Some(size) => size,
        None => panic!("register {reg} has no resolvable width in this environment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instruction::{MemOperand, Opcode, Operand};

    fn load() -> MachineInstr {
        MachineInstr::new(
            Opcode::Load,
            vec![Operand::Reg(VirtReg(0)), Operand::Reg(VirtReg(1))],
        )
        .with_defs(1)
    }

    #[test]
    fn single_uniform_mem_operand() {
        assert!(MemOperandUniformity.is_uniform(&load().with_mem_operand(MemOperand::uniform())));
        assert!(!MemOperandUniformity.is_uniform(&load().with_mem_operand(MemOperand::divergent())));
    }

    #[test]
    fn missing_or_multiple_mem_operands_are_divergent() {
        assert!(!MemOperandUniformity.is_uniform(&load()));
        let two = load()
            .with_mem_operand(MemOperand::uniform())
            .with_mem_operand(MemOperand::uniform());
        assert!(!MemOperandUniformity.is_uniform(&two));
    }
}
