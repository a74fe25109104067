// This module defines the machine instruction model consumed by register bank selection.
// A MachineInstr is a generic opcode plus an ordered operand list whose length is fixed per
// occurrence; operands are either virtual register references or non-register values
// (immediates and symbols), and the number of leading operands that are definitions is kept
// so the textual IR can print instructions back in `%d = OP %u` form. Memory-accessing
// instructions carry MemOperand descriptors recording whether an external divergence
// analysis proved the access address uniform across all lanes.

//! Machine instruction model.

use std::fmt;

/// Virtual register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtReg(pub u32);

impl VirtReg {
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VirtReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A single instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Virtual register reference. The only operand kind that gets a bank.
    Reg(VirtReg),
    /// Integer immediate.
    Imm(i64),
    /// Symbol reference such as a global or a basic block label.
    Symbol(String),
}

impl Operand {
    pub fn is_reg(&self) -> bool {
        matches!(self, Operand::Reg(_))
    }

    /// Register referenced by this operand, if any.
    pub fn reg(&self) -> Option<VirtReg> {
        match self {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(imm) => write!(f, "{imm}"),
            Operand::Symbol(name) => write!(f, "@{name}"),
        }
    }
}

/// Memory access descriptor attached to loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOperand {
    uniform: bool,
}

impl MemOperand {
    /// Access whose address is identical in every lane.
    pub const fn uniform() -> Self {
        Self { uniform: true }
    }

    /// Access whose address may differ between lanes.
    pub const fn divergent() -> Self {
        Self { uniform: false }
    }

    pub const fn is_uniform(&self) -> bool {
        self.uniform
    }
}

impl fmt::Display for MemOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.uniform { "uniform" } else { "divergent" })
    }
}

/// Generic opcodes understood by the textual IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Copy,
    ImplicitDef,
    Constant,
    FConstant,
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    ICmp,
    Select,
    Gep,
    Load,
    Store,
    Intrinsic,
}

impl Opcode {
    const ALL: [Opcode; 17] = [
        Opcode::Copy,
        Opcode::ImplicitDef,
        Opcode::Constant,
        Opcode::FConstant,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Shl,
        Opcode::ICmp,
        Opcode::Select,
        Opcode::Gep,
        Opcode::Load,
        Opcode::Store,
        Opcode::Intrinsic,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Copy => "COPY",
            Opcode::ImplicitDef => "G_IMPLICIT_DEF",
            Opcode::Constant => "G_CONSTANT",
            Opcode::FConstant => "G_FCONSTANT",
            Opcode::Add => "G_ADD",
            Opcode::Sub => "G_SUB",
            Opcode::Mul => "G_MUL",
            Opcode::And => "G_AND",
            Opcode::Or => "G_OR",
            Opcode::Xor => "G_XOR",
            Opcode::Shl => "G_SHL",
            Opcode::ICmp => "G_ICMP",
            Opcode::Select => "G_SELECT",
            Opcode::Gep => "G_GEP",
            Opcode::Load => "G_LOAD",
            Opcode::Store => "G_STORE",
            Opcode::Intrinsic => "G_INTRINSIC",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One machine instruction in generic form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInstr {
    opcode: Opcode,
    operands: Vec<Operand>,
    num_defs: usize,
    mem_operands: Vec<MemOperand>,
}

impl MachineInstr {
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self {
            opcode,
            operands,
            num_defs: 0,
            mem_operands: Vec::new(),
        }
    }

    /// Mark the first `num_defs` operands as definitions.
    pub fn with_defs(mut self, num_defs: usize) -> Self {
        assert!(
            num_defs <= self.operands.len(),
            "{} defs requested for an instruction with {} operands",
            num_defs,
            self.operands.len()
        );
        self.num_defs = num_defs;
        self
    }

    pub fn with_mem_operand(mut self, mmo: MemOperand) -> Self {
        self.mem_operands.push(mmo);
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operand(&self, idx: usize) -> &Operand {
        &self.operands[idx]
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn num_defs(&self) -> usize {
        self.num_defs
    }

    pub fn mem_operands(&self) -> &[MemOperand] {
        &self.mem_operands
    }

    pub fn has_one_mem_operand(&self) -> bool {
        self.mem_operands.len() == 1
    }

    /// Registers referenced by this instruction, with their operand index.
    pub fn reg_operands(&self) -> impl Iterator<Item = (usize, VirtReg)> + '_ {
        self.operands
            .iter()
            .enumerate()
            .filter_map(|(idx, op)| op.reg().map(|reg| (idx, reg)))
    }
}

impl fmt::Display for MachineInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (defs, uses) = self.operands.split_at(self.num_defs);
        for (i, def) in defs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{def}")?;
        }
        if !defs.is_empty() {
            f.write_str(" = ")?;
        }
        write!(f, "{}", self.opcode)?;
        for (i, op) in uses.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{op}")?;
        }
        for mmo in &self.mem_operands {
            write!(f, " :: {mmo}")?;
        }
        Ok(())
    }
}
