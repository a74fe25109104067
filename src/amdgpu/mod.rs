//! Scalar/vector GPU target components.
//!
//! - [`mapping_catalog`] holds the per-opcode mapping rules
//! - [`register_bank_info`] computes instruction mappings from those rules

pub mod mapping_catalog;
pub mod register_bank_info;

pub use mapping_catalog::{mapping_rule, MappingRule, POINTER_SIZE_IN_BITS};
pub use register_bank_info::AmdgpuRegisterBankInfo;
