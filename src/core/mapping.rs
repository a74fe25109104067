// This module defines instruction mappings, the output of register bank selection, and the
// RegisterBankInfo trait a target implements to produce them. An OperandsMapping holds one
// optional ValueMapping per instruction operand (absent for immediates and symbols) and always
// has exactly as many entries as the instruction has operands. An InstructionMapping is one
// fully specified, cost-annotated candidate. Mappings are synthesized per query and never
// cached here: asking twice for the same instruction in the same environment yields equal
// values. The trait's provided methods combine a target's default mapping and its alternative
// mappings into the two selection modes.

//! Instruction mappings and the target bank info trait.

use super::adaptor::{resolve_width, OperandWidthResolver, UniformityOracle};
use super::instruction::MachineInstr;
use super::reg_bank_select::SelectMode;
use super::register_bank::{BankClassifier, BankCostModel, ValueMapping};
use std::fmt;

/// Cost of a mapping that needs nothing beyond the instruction itself.
pub const DEFAULT_MAPPING_COST: u32 = 1;

/// Per-operand value mappings for one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandsMapping(Vec<Option<ValueMapping>>);

impl OperandsMapping {
    /// Mapping with `num_operands` absent entries.
    pub fn new(num_operands: usize) -> Self {
        Self(vec![None; num_operands])
    }

    pub fn set(&mut self, idx: usize, mapping: ValueMapping) {
        let len = self.0.len();
        assert!(idx < len, "operand {idx} is outside a {len}-operand mapping");
        self.0[idx] = Some(mapping);
    }

    pub fn get(&self, idx: usize) -> Option<ValueMapping> {
        self.0.get(idx).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<ValueMapping>> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Option<ValueMapping>> for OperandsMapping {
    fn from_iter<I: IntoIterator<Item = Option<ValueMapping>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One complete, cost-annotated bank assignment for an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionMapping {
    cost: u32,
    num_alternatives_hint: u32,
    operands: OperandsMapping,
    num_operands: usize,
}

impl InstructionMapping {
    pub fn new(
        cost: u32,
        num_alternatives_hint: u32,
        operands: OperandsMapping,
        num_operands: usize,
    ) -> Self {
        assert_eq!(
            operands.len(),
            num_operands,
            "operands mapping must cover every operand"
        );
        Self {
            cost,
            num_alternatives_hint,
            operands,
            num_operands,
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn num_alternatives_hint(&self) -> u32 {
        self.num_alternatives_hint
    }

    pub fn operands(&self) -> &OperandsMapping {
        &self.operands
    }

    pub fn operand_mapping(&self, idx: usize) -> Option<ValueMapping> {
        self.operands.get(idx)
    }

    pub fn num_operands(&self) -> usize {
        self.num_operands
    }

    /// Check this mapping against the instruction it was computed for.
    ///
    /// The operand count must match, and every mapped register operand must
    /// be mapped at its own width. Non-register operands may carry a mapping
    /// (the fallback heuristic gives them one) but are not width-checked.
    pub fn verify<E: OperandWidthResolver + ?Sized>(&self, mi: &MachineInstr, env: &E) -> bool {
        if self.operands.len() != mi.num_operands() || self.num_operands != mi.num_operands() {
            return false;
        }
        mi.reg_operands().all(|(idx, reg)| match self.operands.get(idx) {
            Some(vm) => vm.size_in_bits() == resolve_width(env, reg),
            None => true,
        })
    }
}

impl fmt::Display for InstructionMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cost: {} Mapping: ", self.cost)?;
        for (idx, vm) in self.operands.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            match vm {
                Some(vm) => write!(f, "{idx}:{vm}")?,
                None => write!(f, "{idx}:-")?,
            }
        }
        Ok(())
    }
}

/// Candidate mappings for an opcode with more than one legal assignment.
///
/// No entry is preferred; the caller weighs them by cost.
pub type AlternativeMappings = Vec<InstructionMapping>;

/// Result of [`RegisterBankInfo::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankAssignment {
    Single(InstructionMapping),
    Alternatives(AlternativeMappings),
}

impl BankAssignment {
    /// Every candidate carried by this result.
    pub fn candidates(&self) -> &[InstructionMapping] {
        match self {
            BankAssignment::Single(mapping) => std::slice::from_ref(mapping),
            BankAssignment::Alternatives(mappings) => mappings,
        }
    }
}

/// Target hook producing register bank mappings.
pub trait RegisterBankInfo: BankClassifier + BankCostModel {
    /// The single mapping this target would pick on its own.
    fn instr_mapping<E>(&self, mi: &MachineInstr, env: &E) -> InstructionMapping
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized;

    /// Additional mappings for opcodes with genuine hardware alternatives.
    fn instr_alternative_mappings<E>(&self, _mi: &MachineInstr, _env: &E) -> AlternativeMappings
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized,
    {
        AlternativeMappings::new()
    }

    /// The default mapping followed by every alternative.
    fn instr_possible_mappings<E>(&self, mi: &MachineInstr, env: &E) -> AlternativeMappings
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized,
    {
        let mut mappings = vec![self.instr_mapping(mi, env)];
        mappings.extend(self.instr_alternative_mappings(mi, env));
        mappings
    }

    /// Map `mi` according to `mode`.
    ///
    /// Fast mode always returns the default mapping. Greedy mode returns the
    /// alternatives when the opcode has any, and the default mapping otherwise.
    fn assign<E>(&self, mi: &MachineInstr, env: &E, mode: SelectMode) -> BankAssignment
    where
        E: OperandWidthResolver + UniformityOracle + ?Sized,
    {
        match mode {
            SelectMode::Fast => BankAssignment::Single(self.instr_mapping(mi, env)),
            SelectMode::Greedy => {
                let alternatives = self.instr_alternative_mappings(mi, env);
                if alternatives.is_empty() {
                    BankAssignment::Single(self.instr_mapping(mi, env))
                } else {
                    BankAssignment::Alternatives(alternatives)
                }
            }
        }
    }
}
