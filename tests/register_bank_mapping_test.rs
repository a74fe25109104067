//! Integration tests for register bank mapping on the scalar/vector target.
//!
//! Instruction streams are written in TIR so each test reads like the
//! machine code it exercises.

use tpde_target::amdgpu::AmdgpuRegisterBankInfo;
use tpde_target::core::{
    BankAssignment, InstructionMapping, MachineInstr, Operand, RegisterBank, RegisterBankInfo,
    SelectMode, ValueMapping, VirtReg, REGISTER_BANKS,
};
use tpde_target::test_ir::TestFunction;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse(text: &str) -> TestFunction {
    TestFunction::parse(text).unwrap_or_else(|e| panic!("failed to parse TIR: {e}\n{text}"))
}

fn mapped(mapping: &InstructionMapping) -> Vec<Option<ValueMapping>> {
    mapping.operands().iter().collect()
}

const MIXED_STREAM: &str = "\
%0:p64 = COPY %9:sreg_64
%1:s32 = G_LOAD %0 :: uniform
%2:s32 = G_LOAD %0 :: divergent
%3:s16 = G_CONSTANT 7
%4:p64 = G_GEP %0, %1, @table
G_STORE %2, %4 :: divergent
%5:s32 = G_ADD %1, %2
%6:s64 = G_INTRINSIC @llvm.amdgcn.readfirstlane, %5, 3
G_INTRINSIC 5, %1
";

#[test]
fn test_every_candidate_covers_every_operand() {
    init_logger();
    let func = parse(MIXED_STREAM);
    let rbi = AmdgpuRegisterBankInfo::new();

    for mi in func.instrs() {
        for mapping in rbi.instr_possible_mappings(mi, &func) {
            assert_eq!(mapping.operands().len(), mi.num_operands(), "{mi}: {mapping}");
            assert_eq!(mapping.num_operands(), mi.num_operands(), "{mi}: {mapping}");
        }
        for mode in [SelectMode::Fast, SelectMode::Greedy] {
            for mapping in rbi.assign(mi, &func, mode).candidates() {
                assert_eq!(mapping.operands().len(), mi.num_operands(), "{mi}: {mapping}");
            }
        }
    }
}

#[test]
fn test_default_mappings_verify() {
    let func = parse(MIXED_STREAM);
    let rbi = AmdgpuRegisterBankInfo::new();
    for mi in func.instrs() {
        let mapping = rbi.instr_mapping(mi, &func);
        assert!(mapping.verify(mi, &func), "{mi}: {mapping}");
    }
}

#[test]
fn test_load_bank_follows_uniformity() {
    let func = parse(
        "%1:s32 = G_LOAD %0:p64 :: uniform\n\
         %2:s32 = G_LOAD %0 :: divergent\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();

    let uniform = rbi.instr_mapping(&func.instrs()[0], &func);
    assert_eq!(
        mapped(&uniform),
        vec![Some(ValueMapping::scalar(32)), Some(ValueMapping::scalar(64))]
    );

    let divergent = rbi.instr_mapping(&func.instrs()[1], &func);
    assert_eq!(
        mapped(&divergent),
        vec![Some(ValueMapping::vector(32)), Some(ValueMapping::vector(64))]
    );
}

#[test]
fn test_load_without_single_uniform_mem_operand_is_divergent() {
    let func = parse(
        "%1:s32 = G_LOAD %0:p64\n\
         %2:s32 = G_LOAD %0 :: uniform :: uniform\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();
    for mi in func.instrs() {
        let mapping = rbi.instr_mapping(mi, &func);
        assert_eq!(mapping.operand_mapping(0).map(|vm| vm.bank()), Some(RegisterBank::Vector));
        assert_eq!(mapping.operand_mapping(1).map(|vm| vm.bank()), Some(RegisterBank::Vector));
    }
}

#[test]
fn test_load_alternatives_are_fixed() {
    let func = parse(
        "%1:s32 = G_LOAD %0:p64 :: uniform\n\
         %2:s32 = G_LOAD %0 :: divergent\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();

    for mi in func.instrs() {
        let alternatives = rbi.instr_alternative_mappings(mi, &func);
        let costs: Vec<_> = alternatives.iter().map(InstructionMapping::cost).collect();
        assert_eq!(costs, vec![1, 2, 3], "{mi}");

        let banks: Vec<_> = alternatives
            .iter()
            .map(|m| (m.operand_mapping(0), m.operand_mapping(1)))
            .collect();
        assert_eq!(
            banks,
            vec![
                (Some(ValueMapping::scalar(32)), Some(ValueMapping::scalar(64))),
                (Some(ValueMapping::vector(32)), Some(ValueMapping::vector(64))),
                (Some(ValueMapping::vector(32)), Some(ValueMapping::scalar(64))),
            ]
        );
    }
}

#[test]
fn test_assign_is_deterministic() {
    let func = parse(MIXED_STREAM);
    let rbi = AmdgpuRegisterBankInfo::new();
    for mi in func.instrs() {
        for mode in [SelectMode::Fast, SelectMode::Greedy] {
            assert_eq!(rbi.assign(mi, &func, mode), rbi.assign(mi, &func, mode), "{mi}");
        }
    }
}

#[test]
fn test_assign_modes() {
    let func = parse(
        "%1:s32 = G_LOAD %0:p64 :: divergent\n\
         %2:s32 = G_ADD %1, %1\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();
    let load = &func.instrs()[0];
    let add = &func.instrs()[1];

    match rbi.assign(load, &func, SelectMode::Fast) {
        BankAssignment::Single(mapping) => assert_eq!(mapping, rbi.instr_mapping(load, &func)),
        other => panic!("fast mode returned {other:?}"),
    }
    match rbi.assign(load, &func, SelectMode::Greedy) {
        BankAssignment::Alternatives(mappings) => assert_eq!(mappings.len(), 3),
        other => panic!("greedy mode returned {other:?}"),
    }
    // Without alternatives greedy mode falls back to the default mapping.
    assert_eq!(
        rbi.assign(add, &func, SelectMode::Greedy),
        BankAssignment::Single(rbi.instr_mapping(add, &func))
    );

    let possible = rbi.instr_possible_mappings(load, &func);
    assert_eq!(possible.len(), 4);
    assert_eq!(possible[0], rbi.instr_mapping(load, &func));
}

#[test]
fn test_store_address_is_always_vector_64() {
    let func = parse(
        "G_STORE %1:s32, %0:p32 :: uniform\n\
         G_STORE %2:s16, %3:p64 :: divergent\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();

    let narrow = rbi.instr_mapping(&func.instrs()[0], &func);
    assert_eq!(
        mapped(&narrow),
        vec![Some(ValueMapping::vector(32)), Some(ValueMapping::vector(64))]
    );

    let wide = rbi.instr_mapping(&func.instrs()[1], &func);
    assert_eq!(
        mapped(&wide),
        vec![Some(ValueMapping::vector(16)), Some(ValueMapping::vector(64))]
    );
}

#[test]
fn test_constant_and_gep_are_scalar() {
    let func = parse(
        "%3:s16 = G_CONSTANT 7\n\
         %4:p64 = G_GEP %0:p64, %1:s32, @table\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();

    let constant = rbi.instr_mapping(&func.instrs()[0], &func);
    assert_eq!(mapped(&constant), vec![Some(ValueMapping::scalar(16)), None]);

    let gep = rbi.instr_mapping(&func.instrs()[1], &func);
    assert_eq!(
        mapped(&gep),
        vec![
            Some(ValueMapping::scalar(64)),
            Some(ValueMapping::scalar(64)),
            Some(ValueMapping::scalar(32)),
            None,
        ]
    );
}

#[test]
fn test_fallback_sizes_by_previous_register() {
    let func = parse(
        "G_INTRINSIC 5, %1:s32\n\
         %6:s64 = G_INTRINSIC @llvm.amdgcn.readfirstlane, %5:s32, 3\n",
    );
    let rbi = AmdgpuRegisterBankInfo::new();

    let leading_imm = rbi.instr_mapping(&func.instrs()[0], &func);
    assert_eq!(
        mapped(&leading_imm),
        vec![Some(ValueMapping::scalar(0)), Some(ValueMapping::scalar(32))]
    );

    let mixed = rbi.instr_mapping(&func.instrs()[1], &func);
    assert_eq!(
        mapped(&mixed),
        vec![
            Some(ValueMapping::scalar(64)),
            Some(ValueMapping::scalar(64)),
            Some(ValueMapping::scalar(32)),
            Some(ValueMapping::scalar(32)),
        ]
    );
}

#[test]
fn test_bank_table_and_classes() {
    let rbi = AmdgpuRegisterBankInfo::new();
    assert_eq!(REGISTER_BANKS.len(), 2);
    assert_eq!(rbi.reg_bank(0).name, "SGPR");
    assert_eq!(rbi.reg_bank(1).name, "VGPR");

    let func = parse("%0:sreg_64 = COPY %1:vgpr_32\n");
    assert_eq!(
        rbi.instr_mapping(&func.instrs()[0], &func).operand_mapping(1),
        Some(ValueMapping::scalar(32))
    );
}

#[test]
#[should_panic(expected = "no resolvable width")]
fn test_unresolved_width_is_fatal() {
    let func = TestFunction::new();
    let mi = MachineInstr::new(
        tpde_target::core::Opcode::Load,
        vec![Operand::Reg(VirtReg(1)), Operand::Reg(VirtReg(0))],
    )
    .with_defs(1);
    AmdgpuRegisterBankInfo::new().instr_mapping(&mi, &func);
}
