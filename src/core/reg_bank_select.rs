// This module implements the driver that applies register bank mappings to an instruction
// stream. For each instruction it asks the target's RegisterBankInfo for candidates (only the
// default mapping in Fast mode, the default followed by every alternative in Greedy mode), prices each
// candidate as its own cost plus the cost of the cross-bank copies it would force on operands
// whose bank is already fixed, and keeps the cheapest (the earliest on ties). Operand banks
// start from register class constraints, classified through BankClassifier, and otherwise are
// fixed by the first mapping that touches them. Copies are recorded as RepairCopy entries
// rather than inserted, so callers decide how to materialize them.

//! Register bank selection over an instruction stream.

use super::adaptor::{OperandWidthResolver, RegClassResolver, UniformityOracle};
use super::error::SelectModeError;
use super::instruction::{MachineInstr, VirtReg};
use super::mapping::{InstructionMapping, RegisterBankInfo};
use super::register_bank::RegisterBank;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Environment variable selecting the mode for [`SelectMode::from_env`].
pub const SELECT_MODE_ENV: &str = "TPDE_REGBANKSELECT_MODE";

/// Which mapping entry point bank selection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Take the target's default mapping for every instruction.
    #[default]
    Fast,
    /// Weigh the default mapping against every alternative.
    Greedy,
}

impl SelectMode {
    /// Mode from [`SELECT_MODE_ENV`], `Fast` when unset or invalid.
    pub fn from_env() -> Self {
        match std::env::var(SELECT_MODE_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err: SelectModeError| {
                log::warn!("{err}, using fast mode");
                SelectMode::Fast
            }),
            Err(_) => SelectMode::Fast,
        }
    }
}

impl FromStr for SelectMode {
    type Err = SelectModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(SelectMode::Fast),
            "greedy" => Ok(SelectMode::Greedy),
            _ => Err(SelectModeError(s.to_string())),
        }
    }
}

/// A copy needed to move an operand into the bank its mapping demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairCopy {
    pub instr_idx: usize,
    pub operand_idx: usize,
    pub reg: VirtReg,
    pub from: RegisterBank,
    pub to: RegisterBank,
    pub size_in_bits: u32,
    pub cost: u32,
}

/// The mapping chosen for one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMapping {
    pub instr_idx: usize,
    pub mapping: InstructionMapping,
    /// Mapping cost plus repair cost.
    pub total_cost: u32,
}

/// Result of a bank selection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankSelection {
    pub mappings: Vec<SelectedMapping>,
    pub repairs: Vec<RepairCopy>,
    pub reg_banks: BTreeMap<VirtReg, RegisterBank>,
}

impl BankSelection {
    pub fn bank_of(&self, reg: VirtReg) -> Option<RegisterBank> {
        self.reg_banks.get(&reg).copied()
    }

    pub fn total_cost(&self) -> u32 {
        self.mappings.iter().map(|m| m.total_cost).sum()
    }
}

/// Register bank selection driver.
pub struct RegBankSelect<'a, R: RegisterBankInfo> {
    rbi: &'a R,
    mode: SelectMode,
}

impl<'a, R: RegisterBankInfo> RegBankSelect<'a, R> {
    pub fn new(rbi: &'a R, mode: SelectMode) -> Self {
        Self { rbi, mode }
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    /// Select banks for `instrs` in order.
    pub fn run<E>(&self, instrs: &[MachineInstr], env: &E) -> BankSelection
    where
        E: OperandWidthResolver + UniformityOracle + RegClassResolver + ?Sized,
    {
        let mut selection = BankSelection::default();
        self.seed_constraints(instrs, env, &mut selection.reg_banks);

        for (instr_idx, mi) in instrs.iter().enumerate() {
            let price = |mapping: InstructionMapping| {
                let cost = mapping.cost() + self.repair_cost(mi, &mapping, &selection.reg_banks);
                (mapping, cost)
            };
            let alternatives = match self.mode {
                SelectMode::Fast => Vec::new(),
                SelectMode::Greedy => self.rbi.instr_alternative_mappings(mi, env),
            };

            // Strict comparison keeps the earlier candidate on ties.
            let (mapping, total_cost) = alternatives.into_iter().map(&price).fold(
                price(self.rbi.instr_mapping(mi, env)),
                |best, candidate| if candidate.1 < best.1 { candidate } else { best },
            );

            log::debug!("{mi}: {mapping} (total {total_cost})");
            self.apply_mapping(instr_idx, mi, &mapping, &mut selection);
            selection.mappings.push(SelectedMapping {
                instr_idx,
                mapping,
                total_cost,
            });
        }

        selection
    }

    fn seed_constraints<E>(
        &self,
        instrs: &[MachineInstr],
        env: &E,
        banks: &mut BTreeMap<VirtReg, RegisterBank>,
    ) where
        E: RegClassResolver + ?Sized,
    {
        for (_, reg) in instrs.iter().flat_map(|mi| mi.reg_operands()) {
            if let Some(class) = env.reg_class(reg) {
                let bank = self.rbi.reg_bank_from_class(class);
                log::trace!("{reg} constrained to {class} ({bank})");
                banks.insert(reg, bank);
            }
        }
    }

    fn repair_cost(
        &self,
        mi: &MachineInstr,
        mapping: &InstructionMapping,
        banks: &BTreeMap<VirtReg, RegisterBank>,
    ) -> u32 {
        mi.reg_operands()
            .filter_map(|(idx, reg)| {
                let vm = mapping.operand_mapping(idx)?;
                let current = *banks.get(&reg)?;
                Some(self.rbi.copy_cost(current, vm.bank(), vm.size_in_bits()))
            })
            .sum()
    }

    fn apply_mapping(
        &self,
        instr_idx: usize,
        mi: &MachineInstr,
        mapping: &InstructionMapping,
        selection: &mut BankSelection,
    ) {
        for (operand_idx, reg) in mi.reg_operands() {
            let Some(vm) = mapping.operand_mapping(operand_idx) else {
                continue;
            };
            match selection.reg_banks.get(&reg).copied() {
                Some(current) if current != vm.bank() => {
                    let copy = RepairCopy {
                        instr_idx,
                        operand_idx,
                        reg,
                        from: current,
                        to: vm.bank(),
                        size_in_bits: vm.size_in_bits(),
                        cost: self.rbi.copy_cost(current, vm.bank(), vm.size_in_bits()),
                    };
                    log::trace!("repair {reg}: {} -> {}", copy.from, copy.to);
                    selection.repairs.push(copy);
                }
                Some(_) => {}
                None => {
                    selection.reg_banks.insert(reg, vm.bank());
                }
            }
        }
    }
}
