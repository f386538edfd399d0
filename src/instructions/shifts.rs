//! Shifts and rotations. Shift amounts are taken modulo the operand width.
//! `_ALT` forms swap the roles: the immediate is shifted by the register.

use super::operands::sign_extend_32;
use crate::config::{
    OPCODE_ROT_L_32, OPCODE_ROT_L_64, OPCODE_ROT_R_32, OPCODE_ROT_R_32_IMM,
    OPCODE_ROT_R_32_IMM_ALT, OPCODE_ROT_R_64, OPCODE_ROT_R_64_IMM, OPCODE_ROT_R_64_IMM_ALT,
    OPCODE_SHAR_R_32, OPCODE_SHAR_R_64, OPCODE_SHAR_R_IMM_32, OPCODE_SHAR_R_IMM_64,
    OPCODE_SHAR_R_IMM_ALT_32, OPCODE_SHAR_R_IMM_ALT_64, OPCODE_SHLO_L_32, OPCODE_SHLO_L_64,
    OPCODE_SHLO_L_IMM_32, OPCODE_SHLO_L_IMM_64, OPCODE_SHLO_L_IMM_ALT_32,
    OPCODE_SHLO_L_IMM_ALT_64, OPCODE_SHLO_R_32, OPCODE_SHLO_R_64, OPCODE_SHLO_R_IMM_32,
    OPCODE_SHLO_R_IMM_64, OPCODE_SHLO_R_IMM_ALT_32, OPCODE_SHLO_R_IMM_ALT_64,
};

fn shl_32(value: u64, shift: u64) -> u64 {
    sign_extend_32(u64::from((value as u32) << (shift % 32)))
}

fn shr_32(value: u64, shift: u64) -> u64 {
    sign_extend_32(u64::from((value as u32) >> (shift % 32)))
}

fn sar_32(value: u64, shift: u64) -> u64 {
    i64::from((value as u32 as i32) >> (shift % 32)) as u64
}

fn shl_64(value: u64, shift: u64) -> u64 {
    value << (shift % 64)
}

fn shr_64(value: u64, shift: u64) -> u64 {
    value >> (shift % 64)
}

fn sar_64(value: u64, shift: u64) -> u64 {
    ((value as i64) >> (shift % 64)) as u64
}

fn rotr_32(value: u64, shift: u64) -> u64 {
    sign_extend_32(u64::from((value as u32).rotate_right((shift % 32) as u32)))
}

fn rotl_32(value: u64, shift: u64) -> u64 {
    sign_extend_32(u64::from((value as u32).rotate_left((shift % 32) as u32)))
}

fn rotr_64(value: u64, shift: u64) -> u64 {
    value.rotate_right((shift % 64) as u32)
}

fn rotl_64(value: u64, shift: u64) -> u64 {
    value.rotate_left((shift % 64) as u32)
}

three_reg!(ShloL32Instruction = OPCODE_SHLO_L_32, "SHLO_L_32", |a, b| shl_32(a, b));
three_reg!(ShloR32Instruction = OPCODE_SHLO_R_32, "SHLO_R_32", |a, b| shr_32(a, b));
three_reg!(SharR32Instruction = OPCODE_SHAR_R_32, "SHAR_R_32", |a, b| sar_32(a, b));
three_reg!(ShloL64Instruction = OPCODE_SHLO_L_64, "SHLO_L_64", |a, b| shl_64(a, b));
three_reg!(ShloR64Instruction = OPCODE_SHLO_R_64, "SHLO_R_64", |a, b| shr_64(a, b));
three_reg!(SharR64Instruction = OPCODE_SHAR_R_64, "SHAR_R_64", |a, b| sar_64(a, b));

three_reg!(RotL64Instruction = OPCODE_ROT_L_64, "ROT_L_64", |a, b| rotl_64(a, b));
three_reg!(RotL32Instruction = OPCODE_ROT_L_32, "ROT_L_32", |a, b| rotl_32(a, b));
three_reg!(RotR64Instruction = OPCODE_ROT_R_64, "ROT_R_64", |a, b| rotr_64(a, b));
three_reg!(RotR32Instruction = OPCODE_ROT_R_32, "ROT_R_32", |a, b| rotr_32(a, b));

two_reg_imm!(ShloLImm32Instruction = OPCODE_SHLO_L_IMM_32, "SHLO_L_IMM_32", |b, imm| shl_32(b, imm));
two_reg_imm!(ShloRImm32Instruction = OPCODE_SHLO_R_IMM_32, "SHLO_R_IMM_32", |b, imm| shr_32(b, imm));
two_reg_imm!(SharRImm32Instruction = OPCODE_SHAR_R_IMM_32, "SHAR_R_IMM_32", |b, imm| sar_32(b, imm));
two_reg_imm!(ShloLImmAlt32Instruction = OPCODE_SHLO_L_IMM_ALT_32, "SHLO_L_IMM_ALT_32", |b, imm| shl_32(imm, b));
two_reg_imm!(ShloRImmAlt32Instruction = OPCODE_SHLO_R_IMM_ALT_32, "SHLO_R_IMM_ALT_32", |b, imm| shr_32(imm, b));
two_reg_imm!(SharRImmAlt32Instruction = OPCODE_SHAR_R_IMM_ALT_32, "SHAR_R_IMM_ALT_32", |b, imm| sar_32(imm, b));

two_reg_imm!(ShloLImm64Instruction = OPCODE_SHLO_L_IMM_64, "SHLO_L_IMM_64", |b, imm| shl_64(b, imm));
two_reg_imm!(ShloRImm64Instruction = OPCODE_SHLO_R_IMM_64, "SHLO_R_IMM_64", |b, imm| shr_64(b, imm));
two_reg_imm!(SharRImm64Instruction = OPCODE_SHAR_R_IMM_64, "SHAR_R_IMM_64", |b, imm| sar_64(b, imm));
two_reg_imm!(ShloLImmAlt64Instruction = OPCODE_SHLO_L_IMM_ALT_64, "SHLO_L_IMM_ALT_64", |b, imm| shl_64(imm, b));
two_reg_imm!(ShloRImmAlt64Instruction = OPCODE_SHLO_R_IMM_ALT_64, "SHLO_R_IMM_ALT_64", |b, imm| shr_64(imm, b));
two_reg_imm!(SharRImmAlt64Instruction = OPCODE_SHAR_R_IMM_ALT_64, "SHAR_R_IMM_ALT_64", |b, imm| sar_64(imm, b));

two_reg_imm!(RotR64ImmInstruction = OPCODE_ROT_R_64_IMM, "ROT_R_64_IMM", |b, imm| rotr_64(b, imm));
two_reg_imm!(RotR64ImmAltInstruction = OPCODE_ROT_R_64_IMM_ALT, "ROT_R_64_IMM_ALT", |b, imm| rotr_64(imm, b));
two_reg_imm!(RotR32ImmInstruction = OPCODE_ROT_R_32_IMM, "ROT_R_32_IMM", |b, imm| rotr_32(b, imm));
two_reg_imm!(RotR32ImmAltInstruction = OPCODE_ROT_R_32_IMM_ALT, "ROT_R_32_IMM_ALT", |b, imm| rotr_32(imm, b));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_amounts_wrap() {
        assert_eq!(shl_64(1, 65), 2);
        assert_eq!(shl_32(1, 33), 2);
        assert_eq!(shl_32(1, 31), 0xffff_ffff_8000_0000);
        assert_eq!(shr_32(0xffff_ffff_ffff_ffff, 4), 0x0fff_ffff);
    }

    #[test]
    fn arithmetic_shifts_keep_sign() {
        assert_eq!(sar_32(0x8000_0000, 4), 0xffff_ffff_f800_0000);
        assert_eq!(sar_64(u64::MAX - 15, 4), u64::MAX);
    }

    #[test]
    fn rotations() {
        assert_eq!(rotr_64(1, 1), 1 << 63);
        assert_eq!(rotl_32(0x8000_0001, 1), 3);
        assert_eq!(rotr_32(1, 1), 0xffff_ffff_8000_0000);
    }

    #[test]
    fn alt_form_shifts_the_immediate() {
        use super::super::test_support::Harness;
        // r1 = 3 << r2
        let mut harness = Harness::single(OPCODE_SHLO_L_IMM_ALT_64, &[0x21, 0x03]);
        harness.registers[2] = 4;
        harness.exec().unwrap();
        assert_eq!(harness.registers[1], 48);
    }
}
