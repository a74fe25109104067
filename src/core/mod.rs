// This module collects the target-independent pieces of instruction lowering that the target
// modules build on. It holds the machine instruction model that bank selection inspects, the
// register bank and register class descriptors, and the mapping types (value, operand and
// instruction mappings) together with the RegisterBankInfo trait every target implements. It
// also provides the RegBankSelect driver that walks an instruction stream and inserts repair
// copies, the adaptor traits through which register widths, classes and uniformity are queried,
// and the fixup machinery (kind metadata, code buffer, AsmBackend trait and encoder) used after
// encoding. Errors and the diagnostic engine live in `error`.

//! Core target infrastructure
//!
//! Shared building blocks for register bank selection and fixup application.
//!
//! # Key Components
//!
//! ## Instructions (`instruction`)
//! - Virtual registers, operands and memory operands
//! - Generic opcodes such as `G_LOAD` and `G_STORE`
//!
//! ## Register Banks (`register_bank`, `mapping`)
//! - Static bank descriptor table and register classes
//! - Value, operand and instruction mappings
//! - The `RegisterBankInfo` trait implemented by targets
//!
//! ## Bank Selection (`reg_bank_select`)
//! - Per-instruction mapping choice in fast or greedy mode
//! - Repair copies where a register's bank disagrees with a mapping
//!
//! ## Fixups (`fixup`)
//! - Fixup kind metadata and declarative field moves
//! - The `AsmBackend` trait and the `FixupEncoder` that drives it

pub mod adaptor;
pub mod error;
pub mod fixup;
pub mod instruction;
pub mod mapping;
pub mod reg_bank_select;
pub mod register_bank;

pub use adaptor::{MemOperandUniformity, OperandWidthResolver, RegClassResolver, UniformityOracle};

pub use error::{Diagnostic, DiagnosticEngine, FixupError, SelectModeError};

pub use fixup::{
    generic_fixup_kind_info, AsmBackend, BitRange, CodeBuffer, FieldMove, Fixup, FixupEncoder,
    FixupKind, FixupKindInfo, SourceLoc, FIRST_TARGET_FIXUP_KIND,
};

pub use instruction::{MachineInstr, MemOperand, Opcode, Operand, VirtReg};

pub use mapping::{
    AlternativeMappings, BankAssignment, InstructionMapping, OperandsMapping, RegisterBankInfo,
    DEFAULT_MAPPING_COST,
};

pub use reg_bank_select::{
    BankSelection, RegBankSelect, RepairCopy, SelectMode, SelectedMapping, SELECT_MODE_ENV,
};

pub use register_bank::{
    BankClassifier, BankCostModel, RegisterBank, RegisterBankDesc, RegisterClass, ValueMapping,
    REGISTER_BANKS,
};
