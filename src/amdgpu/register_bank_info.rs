// This module implements register bank selection for the scalar/vector GPU target. Every
// instruction gets a mapping: opcodes with a catalog rule use it, and anything else receives a
// fallback mapping that puts every operand on the scalar bank, sized by the most recent register
// operand seen left to right. Operands before the first register therefore get width 0; the
// fallback trades precision for total coverage and is kept that way. Loads are the one opcode
// with real alternatives. The default load mapping follows the uniformity oracle (scalar for a
// uniform address, vector otherwise), while the alternative enumeration always offers three
// candidates with increasing cost and leaves the choice to the optimizer. The two entry points
// are independent and may disagree; callers pick one through SelectMode. Stores always map to
// the vector bank because scalar stores are not modelled, with a 64-bit address regardless of
// the address register's declared width.

//! Register bank info for the SGPR/VGPR target.

use super::mapping_catalog::{mapping_rule, MappingRule, POINTER_SIZE_IN_BITS};
use crate::core::adaptor::{resolve_width, OperandWidthResolver, UniformityOracle};
use crate::core::instruction::MachineInstr;
use crate::core::mapping::{
    AlternativeMappings, InstructionMapping, OperandsMapping, RegisterBankInfo,
    DEFAULT_MAPPING_COST,
};
use crate::core::register_bank::{
    BankClassifier, BankCostModel, RegisterBank, RegisterBankDesc, RegisterClass, ValueMapping,
    REGISTER_BANKS,
};

/// Number of candidates a single-mapping query stands in for.
const NUM_ALTERNATIVES_HINT: u32 = 1;

/// Bank info for the scalar/vector target.
#[derive(Debug)]
pub struct AmdgpuRegisterBankInfo {
    _private: (),
}

impl AmdgpuRegisterBankInfo {
    pub fn new() -> Self {
        for (idx, desc) in REGISTER_BANKS.iter().enumerate() {
            assert_eq!(desc.id, idx, "register bank {} is out of order", desc.name);
        }
        Self { _private: () }
    }

    /// Descriptor of the bank with id `id`.
    pub fn reg_bank(&self, id: usize) -> &'static RegisterBankDesc {
        match RegisterBank::from_id(id) {
            Some(bank) => bank.desc(),
            None => panic!("invalid register bank id {id}"),
        }
    }

    fn mapping(opds: OperandsMapping, mi: &MachineInstr) -> InstructionMapping {
        InstructionMapping::new(
            DEFAULT_MAPPING_COST,
            NUM_ALTERNATIVES_HINT,
            opds,
            mi.num_operands(),
        )
    }

    fn load_mapping<E>(&self, mi: &MachineInstr, env: &E) -> InstructionMapping
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized,
    {
        let size = operand_size(mi, 0, env);
        let ptr_size = operand_size(mi, 1, env);

        // A uniform address can use a scalar memory load.
        let bank = if env.is_uniform(mi) {
            RegisterBank::Scalar
        } else {
            RegisterBank::Vector
        };
        log::trace!("{mi}: {bank} load");

        let mut opds = OperandsMapping::new(mi.num_operands());
        opds.set(0, ValueMapping::new(bank, size));
        opds.set(1, ValueMapping::new(bank, ptr_size));
        Self::mapping(opds, mi)
    }

    fn fallback_mapping<E>(&self, mi: &MachineInstr, env: &E) -> InstructionMapping
    where
        E: OperandWidthResolver + ?Sized,
    {
        let mut size = 0;
        let opds = mi
            .operands()
            .iter()
            .map(|op| {
                // Non-register operands take the size of the previous register.
                if let Some(reg) = op.reg() {
                    size = resolve_width(env, reg);
                }
                Some(ValueMapping::scalar(size))
            })
            .collect();
        Self::mapping(opds, mi)
    }
}

impl Default for AmdgpuRegisterBankInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl BankClassifier for AmdgpuRegisterBankInfo {
    fn reg_bank_from_class(&self, class: RegisterClass) -> RegisterBank {
        if class.is_sgpr_class() {
            RegisterBank::Scalar
        } else {
            RegisterBank::Vector
        }
    }
}

impl BankCostModel for AmdgpuRegisterBankInfo {}

impl RegisterBankInfo for AmdgpuRegisterBankInfo {
    fn instr_mapping<E>(&self, mi: &MachineInstr, env: &E) -> InstructionMapping
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized,
    {
        let Some(rule) = mapping_rule(mi.opcode()) else {
            log::trace!("{mi}: no mapping rule, using fallback");
            return self.fallback_mapping(mi, env);
        };

        let mut opds = OperandsMapping::new(mi.num_operands());
        match rule {
            MappingRule::ScalarDef => {
                opds.set(0, ValueMapping::scalar(operand_size(mi, 0, env)));
            }
            MappingRule::ScalarRegOperands => {
                for (idx, reg) in mi.reg_operands() {
                    opds.set(idx, ValueMapping::scalar(resolve_width(env, reg)));
                }
            }
            MappingRule::Store => {
                // TODO: map the address to SGPR once scalar stores are supported.
                opds.set(0, ValueMapping::vector(operand_size(mi, 0, env)));
                opds.set(1, ValueMapping::vector(POINTER_SIZE_IN_BITS));
            }
            MappingRule::Load => return self.load_mapping(mi, env),
        }
        Self::mapping(opds, mi)
    }

    fn instr_alternative_mappings<E>(&self, mi: &MachineInstr, env: &E) -> AlternativeMappings
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized,
    {
        if !mapping_rule(mi.opcode()).is_some_and(MappingRule::has_alternatives) {
            return AlternativeMappings::new();
        }

        let size = operand_size(mi, 0, env);
        [
            (1, RegisterBank::Scalar, RegisterBank::Scalar),
            (2, RegisterBank::Vector, RegisterBank::Vector),
            (3, RegisterBank::Vector, RegisterBank::Scalar),
        ]
        .into_iter()
        .map(|(cost, value_bank, ptr_bank)| {
            let mut opds = OperandsMapping::new(mi.num_operands());
            opds.set(0, ValueMapping::new(value_bank, size));
            opds.set(1, ValueMapping::new(ptr_bank, POINTER_SIZE_IN_BITS));
            InstructionMapping::new(cost, NUM_ALTERNATIVES_HINT, opds, mi.num_operands())
        })
        .collect()
    }
}

/// Width of operand `idx`, which must be a register.
fn operand_size<E: OperandWidthResolver + ?Sized>(mi: &MachineInstr, idx: usize, env: &E) -> u32 {
    match mi.operand(idx).reg() {
        Some(reg) => resolve_width(env, reg),
        None => panic!("operand {idx} of '{mi}' must be a register"),
    }
}
