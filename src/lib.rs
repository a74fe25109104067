//! TPDE target lowering: register bank selection and fixup application.
//!
//! The crate covers two target-specific steps of instruction lowering:
//!
//! - Assigning every register operand of a generic machine instruction to the
//!   scalar (SGPR) or vector (VGPR) bank of a GPU-style target, including the
//!   uniformity-driven choice for loads.
//! - Patching resolved symbol and label values into the 32-bit instruction
//!   words of the Nyuzi instruction set.
//!
//! # Primary Usage
//!
//! ```ignore
//! use tpde_target::amdgpu::AmdgpuRegisterBankInfo;
//! use tpde_target::core::{RegBankSelect, SelectMode};
//! use tpde_target::test_ir::TestFunction;
//!
//! let func = TestFunction::parse("%0:p64 = COPY %9:sreg_64\n%1:s32 = G_LOAD %0 :: uniform\n")?;
//! let rbi = AmdgpuRegisterBankInfo::new();
//! let selection = RegBankSelect::new(&rbi, SelectMode::from_env()).run(func.instrs(), &func);
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Instruction model, mapping types, bank selection driver, fixups
//! - [`amdgpu`] - Scalar/vector register bank information
//! - [`nyuzi`] - Nyuzi fixup kinds and assembler backend
//! - [`test_ir`] - Textual IR used to drive the code in tests

pub mod amdgpu;
pub mod core;
pub mod nyuzi;
pub mod test_ir;

pub use self::core::{
    // Instructions
    MachineInstr, MemOperand, Opcode, Operand, VirtReg,
    // Register banks
    InstructionMapping, OperandsMapping, RegisterBank, RegisterBankInfo, ValueMapping,
    // Bank selection
    BankSelection, RegBankSelect, SelectMode,
    // Fixups
    AsmBackend, CodeBuffer, DiagnosticEngine, Fixup, FixupEncoder, FixupKind,
};
pub use amdgpu::AmdgpuRegisterBankInfo;
pub use nyuzi::NyuziAsmBackend;
