// This module defines the register bank vocabulary shared by bank selection and its consumers.
// The target has exactly two banks, scalar (SGPR) and vector (VGPR), described by a static
// descriptor table that needs no runtime initialization. RegisterClass models the storage
// classes a virtual register may be constrained to, each with a size in bits; a class's bank
// is a static property answered by the BankClassifier trait. ValueMapping is the immutable
// (bank, width) requirement for one register operand: two mappings with the same pair are the
// same mapping. BankCostModel prices a copy between banks; the default assumes copies within a
// bank are coalesced away and cross-bank copies cost one.

//! Register banks, register classes and value mappings.

use std::fmt;

/// The two register banks of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterBank {
    /// Scalar registers, one value shared by all lanes.
    Scalar = 0,
    /// Vector registers, one value per lane.
    Vector = 1,
}

impl RegisterBank {
    pub const ALL: [RegisterBank; 2] = [RegisterBank::Scalar, RegisterBank::Vector];

    pub const fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    pub fn desc(self) -> &'static RegisterBankDesc {
        &REGISTER_BANKS[self.id()]
    }

    pub fn name(self) -> &'static str {
        self.desc().name
    }
}

impl fmt::Display for RegisterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a register bank.
#[derive(Debug, PartialEq, Eq)]
pub struct RegisterBankDesc {
    pub id: usize,
    pub name: &'static str,
    /// Size of the widest register class covered by the bank.
    pub max_size_in_bits: u32,
}

/// Bank descriptors, indexed by [`RegisterBank::id`].
pub static REGISTER_BANKS: [RegisterBankDesc; 2] = [
    RegisterBankDesc {
        id: RegisterBank::Scalar as usize,
        name: "SGPR",
        max_size_in_bits: 512,
    },
    RegisterBankDesc {
        id: RegisterBank::Vector as usize,
        name: "VGPR",
        max_size_in_bits: 512,
    },
];

/// Storage class a virtual register can be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterClass {
    name: &'static str,
    size_in_bits: u32,
    scalar: bool,
}

impl RegisterClass {
    pub const SREG_32: Self = Self::sgpr("sreg_32", 32);
    pub const SREG_64: Self = Self::sgpr("sreg_64", 64);
    pub const SREG_128: Self = Self::sgpr("sreg_128", 128);
    pub const SREG_256: Self = Self::sgpr("sreg_256", 256);
    pub const SREG_512: Self = Self::sgpr("sreg_512", 512);
    pub const VGPR_32: Self = Self::vgpr("vgpr_32", 32);
    pub const VREG_64: Self = Self::vgpr("vreg_64", 64);
    pub const VREG_96: Self = Self::vgpr("vreg_96", 96);
    pub const VREG_128: Self = Self::vgpr("vreg_128", 128);
    pub const VREG_256: Self = Self::vgpr("vreg_256", 256);
    pub const VREG_512: Self = Self::vgpr("vreg_512", 512);

    const ALL: [RegisterClass; 11] = [
        Self::SREG_32,
        Self::SREG_64,
        Self::SREG_128,
        Self::SREG_256,
        Self::SREG_512,
        Self::VGPR_32,
        Self::VREG_64,
        Self::VREG_96,
        Self::VREG_128,
        Self::VREG_256,
        Self::VREG_512,
    ];

    const fn sgpr(name: &'static str, size_in_bits: u32) -> Self {
        Self {
            name,
            size_in_bits,
            scalar: true,
        }
    }

    const fn vgpr(name: &'static str, size_in_bits: u32) -> Self {
        Self {
            name,
            size_in_bits,
            scalar: false,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rc| rc.name == name)
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn size_in_bits(&self) -> u32 {
        self.size_in_bits
    }

    pub const fn is_sgpr_class(&self) -> bool {
        self.scalar
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Required bank and size for one register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueMapping {
    bank: RegisterBank,
    size_in_bits: u32,
}

impl ValueMapping {
    pub const fn new(bank: RegisterBank, size_in_bits: u32) -> Self {
        Self { bank, size_in_bits }
    }

    pub const fn scalar(size_in_bits: u32) -> Self {
        Self::new(RegisterBank::Scalar, size_in_bits)
    }

    pub const fn vector(size_in_bits: u32) -> Self {
        Self::new(RegisterBank::Vector, size_in_bits)
    }

    pub const fn bank(&self) -> RegisterBank {
        self.bank
    }

    pub const fn size_in_bits(&self) -> u32 {
        self.size_in_bits
    }
}

impl fmt::Display for ValueMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.bank, self.size_in_bits)
    }
}

/// Maps a register class to the bank that holds it.
pub trait BankClassifier {
    fn reg_bank_from_class(&self, class: RegisterClass) -> RegisterBank;
}

/// Cost of moving a value between banks.
pub trait BankCostModel {
    /// Copies within one bank are assumed to be coalesced.
    fn copy_cost(&self, from: RegisterBank, to: RegisterBank, _size_in_bits: u32) -> u32 {
        u32::from(from != to)
    }
}
