//! Integer arithmetic. 32-bit forms operate on the low halves and sign-extend the result.
//! Division by zero and signed overflow never trap: they produce fixed values instead.

use super::operands::sign_extend_32;
use crate::config::{
    OPCODE_ADD_32, OPCODE_ADD_64, OPCODE_ADD_IMM_32, OPCODE_ADD_IMM_64, OPCODE_DIV_S_32,
    OPCODE_DIV_S_64, OPCODE_DIV_U_32, OPCODE_DIV_U_64, OPCODE_MUL_32, OPCODE_MUL_64,
    OPCODE_MUL_IMM_32, OPCODE_MUL_IMM_64, OPCODE_MUL_UPPER_S_S, OPCODE_MUL_UPPER_S_U,
    OPCODE_MUL_UPPER_U_U, OPCODE_NEG_ADD_IMM_32, OPCODE_NEG_ADD_IMM_64, OPCODE_REM_S_32,
    OPCODE_REM_S_64, OPCODE_REM_U_32, OPCODE_REM_U_64, OPCODE_SUB_32, OPCODE_SUB_64,
};

fn div_u_32(a: u64, b: u64) -> u64 {
    let (a, b) = (a as u32, b as u32);
    if b == 0 {
        u64::MAX
    } else {
        sign_extend_32(u64::from(a / b))
    }
}

fn rem_u_32(a: u64, b: u64) -> u64 {
    let (a, b) = (a as u32, b as u32);
    if b == 0 {
        sign_extend_32(u64::from(a))
    } else {
        sign_extend_32(u64::from(a % b))
    }
}

fn div_s_32(a: u64, b: u64) -> u64 {
    let (a, b) = (a as u32 as i32, b as u32 as i32);
    if b == 0 {
        u64::MAX
    } else {
        // i32::MIN / -1 wraps back to the dividend.
        i64::from(a.wrapping_div(b)) as u64
    }
}

fn rem_s_32(a: u64, b: u64) -> u64 {
    let (a, b) = (a as u32 as i32, b as u32 as i32);
    if b == 0 {
        i64::from(a) as u64
    } else {
        i64::from(a.wrapping_rem(b)) as u64
    }
}

fn div_u_64(a: u64, b: u64) -> u64 {
    a.checked_div(b).unwrap_or(u64::MAX)
}

fn rem_u_64(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        a % b
    }
}

fn div_s_64(a: u64, b: u64) -> u64 {
    if b == 0 {
        u64::MAX
    } else {
        (a as i64).wrapping_div(b as i64) as u64
    }
}

fn rem_s_64(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        (a as i64).wrapping_rem(b as i64) as u64
    }
}

fn mul_upper_s_s(a: u64, b: u64) -> u64 {
    ((i128::from(a as i64) * i128::from(b as i64)) >> 64) as u64
}

fn mul_upper_u_u(a: u64, b: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) >> 64) as u64
}

fn mul_upper_s_u(a: u64, b: u64) -> u64 {
    ((i128::from(a as i64) * i128::from(b)) >> 64) as u64
}

three_reg!(Add32Instruction = OPCODE_ADD_32, "ADD_32", |a, b| sign_extend_32(a.wrapping_add(b)));
three_reg!(Sub32Instruction = OPCODE_SUB_32, "SUB_32", |a, b| sign_extend_32(a.wrapping_sub(b)));
three_reg!(Mul32Instruction = OPCODE_MUL_32, "MUL_32", |a, b| sign_extend_32(a.wrapping_mul(b)));
three_reg!(DivU32Instruction = OPCODE_DIV_U_32, "DIV_U_32", |a, b| div_u_32(a, b));
three_reg!(DivS32Instruction = OPCODE_DIV_S_32, "DIV_S_32", |a, b| div_s_32(a, b));
three_reg!(RemU32Instruction = OPCODE_REM_U_32, "REM_U_32", |a, b| rem_u_32(a, b));
three_reg!(RemS32Instruction = OPCODE_REM_S_32, "REM_S_32", |a, b| rem_s_32(a, b));

three_reg!(Add64Instruction = OPCODE_ADD_64, "ADD_64", |a, b| a.wrapping_add(b));
three_reg!(Sub64Instruction = OPCODE_SUB_64, "SUB_64", |a, b| a.wrapping_sub(b));
three_reg!(Mul64Instruction = OPCODE_MUL_64, "MUL_64", |a, b| a.wrapping_mul(b));
three_reg!(DivU64Instruction = OPCODE_DIV_U_64, "DIV_U_64", |a, b| div_u_64(a, b));
three_reg!(DivS64Instruction = OPCODE_DIV_S_64, "DIV_S_64", |a, b| div_s_64(a, b));
three_reg!(RemU64Instruction = OPCODE_REM_U_64, "REM_U_64", |a, b| rem_u_64(a, b));
three_reg!(RemS64Instruction = OPCODE_REM_S_64, "REM_S_64", |a, b| rem_s_64(a, b));

three_reg!(MulUpperSSInstruction = OPCODE_MUL_UPPER_S_S, "MUL_UPPER_S_S", |a, b| mul_upper_s_s(a, b));
three_reg!(MulUpperUUInstruction = OPCODE_MUL_UPPER_U_U, "MUL_UPPER_U_U", |a, b| mul_upper_u_u(a, b));
three_reg!(MulUpperSUInstruction = OPCODE_MUL_UPPER_S_U, "MUL_UPPER_S_U", |a, b| mul_upper_s_u(a, b));

two_reg_imm!(AddImm32Instruction = OPCODE_ADD_IMM_32, "ADD_IMM_32", |b, imm| sign_extend_32(b.wrapping_add(imm)));
two_reg_imm!(MulImm32Instruction = OPCODE_MUL_IMM_32, "MUL_IMM_32", |b, imm| sign_extend_32(b.wrapping_mul(imm)));
two_reg_imm!(NegAddImm32Instruction = OPCODE_NEG_ADD_IMM_32, "NEG_ADD_IMM_32", |b, imm| sign_extend_32(imm.wrapping_sub(b)));
two_reg_imm!(AddImm64Instruction = OPCODE_ADD_IMM_64, "ADD_IMM_64", |b, imm| b.wrapping_add(imm));
two_reg_imm!(MulImm64Instruction = OPCODE_MUL_IMM_64, "MUL_IMM_64", |b, imm| b.wrapping_mul(imm));
two_reg_imm!(NegAddImm64Instruction = OPCODE_NEG_ADD_IMM_64, "NEG_ADD_IMM_64", |b, imm| imm.wrapping_sub(b));

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;

    /// Run a three-register instruction with r1 = a, r2 = b, result in r3.
    fn three(opcode: u8, a: u64, b: u64) -> u64 {
        let mut harness = Harness::single(opcode, &[0x21, 0x03]);
        harness.registers[1] = a;
        harness.registers[2] = b;
        harness.exec().unwrap();
        harness.registers[3]
    }

    #[test]
    fn add_32_wraps_and_sign_extends() {
        assert_eq!(three(OPCODE_ADD_32, 0x7fff_ffff, 1), 0xffff_ffff_8000_0000);
        assert_eq!(three(OPCODE_ADD_32, 0x1_0000_0001, 1), 2);
    }

    #[test]
    fn division_by_zero_is_defined() {
        assert_eq!(three(OPCODE_DIV_U_64, 7, 0), u64::MAX);
        assert_eq!(three(OPCODE_REM_U_64, 7, 0), 7);
        assert_eq!(three(OPCODE_DIV_S_64, 7, 0), u64::MAX);
        assert_eq!(three(OPCODE_REM_S_64, 7, 0), 7);
        assert_eq!(three(OPCODE_DIV_U_32, 7, 0), u64::MAX);
        assert_eq!(three(OPCODE_REM_U_32, 0x8000_0000, 0), 0xffff_ffff_8000_0000);
    }

    #[test]
    fn signed_overflow_is_defined() {
        let min = i64::MIN as u64;
        assert_eq!(three(OPCODE_DIV_S_64, min, u64::MAX), min);
        assert_eq!(three(OPCODE_REM_S_64, min, u64::MAX), 0);
        assert_eq!(three(OPCODE_DIV_S_32, 0x8000_0000, 0xffff_ffff), 0xffff_ffff_8000_0000);
        assert_eq!(three(OPCODE_REM_S_32, 0x8000_0000, 0xffff_ffff), 0);
    }

    #[test]
    fn signed_remainder_follows_dividend() {
        assert_eq!(three(OPCODE_REM_S_64, (-7i64) as u64, 2), (-1i64) as u64);
        assert_eq!(three(OPCODE_DIV_S_64, (-7i64) as u64, 2), (-3i64) as u64);
    }

    #[test]
    fn upper_multiplication() {
        assert_eq!(three(OPCODE_MUL_UPPER_U_U, u64::MAX, u64::MAX), u64::MAX - 1);
        assert_eq!(three(OPCODE_MUL_UPPER_S_S, u64::MAX, u64::MAX), 0);
        assert_eq!(three(OPCODE_MUL_UPPER_S_U, u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn neg_add_immediate() {
        // r1 = 5 - r2
        let mut harness = Harness::single(OPCODE_NEG_ADD_IMM_64, &[0x21, 0x05]);
        harness.registers[2] = 7;
        harness.exec().unwrap();
        assert_eq!(harness.registers[1], (-2i64) as u64);
    }
}
