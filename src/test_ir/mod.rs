//! Test IR (TIR) for driving register bank selection in tests.
//!
//! TIR is a line-oriented text form of a machine instruction stream. It is
//! meant to be:
//! - Human-readable and writable
//! - Easy to parse
//! - Enough to describe every query bank selection makes
//!
//! # TIR Format
//!
//! ```text
//! ; Comments start with semicolon
//! %0:p64 = COPY %9:sreg_64          ; type on any occurrence of a register
//! %1:s32 = G_LOAD %0 :: uniform      ; memory operands follow '::'
//! G_STORE %1, %0 :: divergent
//! %2:s32 = G_CONSTANT 42
//! %3:p64 = G_GEP %0, @table
//! ```
//!
//! Register types are generic scalars (`s32`), pointers (`p64`) or register
//! classes (`sreg_64`, `vgpr_32`, ...). A register class both sizes the
//! register and constrains its bank.

use crate::core::adaptor::{
    MemOperandUniformity, OperandWidthResolver, RegClassResolver, UniformityOracle,
};
use crate::core::instruction::{MachineInstr, VirtReg};
use crate::core::register_bank::RegisterClass;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

pub mod parser;

pub use parser::parse_ir;

/// Malformed TIR text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct TirParseError {
    pub line: u32,
    pub message: String,
}

/// Declared type of a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegType {
    Scalar(u32),
    Pointer(u32),
    Class(RegisterClass),
}

impl RegType {
    pub fn parse(name: &str) -> Option<Self> {
        let sized = |prefix: char| {
            name.strip_prefix(prefix)
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse::<u32>().ok())
        };
        if let Some(bits) = sized('s') {
            return Some(RegType::Scalar(bits));
        }
        if let Some(bits) = sized('p') {
            return Some(RegType::Pointer(bits));
        }
        RegisterClass::by_name(name).map(RegType::Class)
    }

    pub fn size_in_bits(self) -> u32 {
        match self {
            RegType::Scalar(bits) | RegType::Pointer(bits) => bits,
            RegType::Class(class) => class.size_in_bits(),
        }
    }
}

impl fmt::Display for RegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegType::Scalar(bits) => write!(f, "s{bits}"),
            RegType::Pointer(bits) => write!(f, "p{bits}"),
            RegType::Class(class) => write!(f, "{class}"),
        }
    }
}

/// An instruction stream plus the register information it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFunction {
    instrs: Vec<MachineInstr>,
    reg_types: BTreeMap<VirtReg, RegType>,
}

impl TestFunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, TirParseError> {
        parser::parse_ir(text)
    }

    pub fn instrs(&self) -> &[MachineInstr] {
        &self.instrs
    }

    pub fn push(&mut self, mi: MachineInstr) {
        self.instrs.push(mi);
    }

    /// Declare the type of `reg`. Returns false on a conflicting redeclaration.
    pub fn declare(&mut self, reg: VirtReg, ty: RegType) -> bool {
        match self.reg_types.get(&reg) {
            Some(existing) => *existing == ty,
            None => {
                self.reg_types.insert(reg, ty);
                true
            }
        }
    }

    pub fn reg_type(&self, reg: VirtReg) -> Option<RegType> {
        self.reg_types.get(&reg).copied()
    }

    /// Render back to TIR, annotating each register at its first occurrence.
    pub fn print(&self) -> String {
        let mut seen = BTreeSet::new();
        let mut out = String::new();
        for mi in &self.instrs {
            let mut rendered = Vec::with_capacity(mi.num_operands());
            for op in mi.operands() {
                let mut text = op.to_string();
                if let Some(reg) = op.reg() {
                    if let Some(ty) = self.reg_type(reg).filter(|_| seen.insert(reg)) {
                        text = format!("{text}:{ty}");
                    }
                }
                rendered.push(text);
            }

            let (defs, uses) = rendered.split_at(mi.num_defs());
            if !defs.is_empty() {
                out.push_str(&defs.join(", "));
                out.push_str(" = ");
            }
            out.push_str(mi.opcode().name());
            if !uses.is_empty() {
                out.push(' ');
                out.push_str(&uses.join(", "));
            }
            for mmo in mi.mem_operands() {
                out.push_str(&format!(" :: {mmo}"));
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for TestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}

impl OperandWidthResolver for TestFunction {
    fn size_in_bits(&self, reg: VirtReg) -> Option<u32> {
        self.reg_type(reg).map(RegType::size_in_bits)
    }
}

impl RegClassResolver for TestFunction {
    fn reg_class(&self, reg: VirtReg) -> Option<RegisterClass> {
        match self.reg_type(reg)? {
            RegType::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl UniformityOracle for TestFunction {
    fn is_uniform(&self, mi: &MachineInstr) -> bool {
        MemOperandUniformity.is_uniform(mi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_type_names() {
        assert_eq!(RegType::parse("s32"), Some(RegType::Scalar(32)));
        assert_eq!(RegType::parse("p64"), Some(RegType::Pointer(64)));
        assert_eq!(
            RegType::parse("sreg_64"),
            Some(RegType::Class(RegisterClass::SREG_64))
        );
        assert_eq!(RegType::parse("s"), None);
        assert_eq!(RegType::parse("q32"), None);
        assert_eq!(RegType::Class(RegisterClass::VREG_96).size_in_bits(), 96);
    }

    #[test]
    fn conflicting_declarations_are_rejected() {
        let mut func = TestFunction::new();
        assert!(func.declare(VirtReg(0), RegType::Scalar(32)));
        assert!(func.declare(VirtReg(0), RegType::Scalar(32)));
        assert!(!func.declare(VirtReg(0), RegType::Pointer(32)));
    }

    #[test]
    fn resolvers_follow_declarations() {
        let mut func = TestFunction::new();
        func.declare(VirtReg(1), RegType::Class(RegisterClass::VGPR_32));
        func.declare(VirtReg(2), RegType::Pointer(64));
        assert_eq!(func.size_in_bits(VirtReg(1)), Some(32));
        assert_eq!(func.reg_class(VirtReg(1)), Some(RegisterClass::VGPR_32));
        assert_eq!(func.size_in_bits(VirtReg(2)), Some(64));
        assert_eq!(func.reg_class(VirtReg(2)), None);
        assert_eq!(func.size_in_bits(VirtReg(3)), None);
    }
}
