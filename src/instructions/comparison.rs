//! Comparisons, conditional moves and min/max.

use super::operands::{three_registers, two_registers_one_immediate};
use super::Flow;
use crate::config::{
    OPCODE_CMOV_IZ, OPCODE_CMOV_IZ_IMM, OPCODE_CMOV_NZ, OPCODE_CMOV_NZ_IMM, OPCODE_MAX,
    OPCODE_MAX_U, OPCODE_MIN, OPCODE_MIN_U, OPCODE_SET_GT_S_IMM, OPCODE_SET_GT_U_IMM,
    OPCODE_SET_LT_S, OPCODE_SET_LT_S_IMM, OPCODE_SET_LT_U, OPCODE_SET_LT_U_IMM,
};

three_reg!(SetLtUInstruction = OPCODE_SET_LT_U, "SET_LT_U", |a, b| u64::from(a < b));
three_reg!(SetLtSInstruction = OPCODE_SET_LT_S, "SET_LT_S", |a, b| u64::from((a as i64) < (b as i64)));

two_reg_imm!(SetLtUImmInstruction = OPCODE_SET_LT_U_IMM, "SET_LT_U_IMM", |b, imm| u64::from(b < imm));
two_reg_imm!(SetLtSImmInstruction = OPCODE_SET_LT_S_IMM, "SET_LT_S_IMM", |b, imm| u64::from((b as i64) < (imm as i64)));
two_reg_imm!(SetGtUImmInstruction = OPCODE_SET_GT_U_IMM, "SET_GT_U_IMM", |b, imm| u64::from(b > imm));
two_reg_imm!(SetGtSImmInstruction = OPCODE_SET_GT_S_IMM, "SET_GT_S_IMM", |b, imm| u64::from((b as i64) > (imm as i64)));

three_reg!(MaxInstruction = OPCODE_MAX, "MAX", |a, b| (a as i64).max(b as i64) as u64);
three_reg!(MaxUInstruction = OPCODE_MAX_U, "MAX_U", |a, b| a.max(b));
three_reg!(MinInstruction = OPCODE_MIN, "MIN", |a, b| (a as i64).min(b as i64) as u64);
three_reg!(MinUInstruction = OPCODE_MIN_U, "MIN_U", |a, b| a.min(b));

/// rD = rA when rB satisfies the condition, else unchanged.
macro_rules! cmov {
    ($name:ident = $opcode:expr, $mnemonic:literal, $when_zero:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, rd) = three_registers(ctx.operands);
            if (ctx.registers[rb] == 0) == $when_zero {
                ctx.registers[rd] = ctx.registers[ra];
            }
            Ok(Flow::Next)
        });
    };
}

/// rA = immX when rB satisfies the condition, else unchanged.
macro_rules! cmov_imm {
    ($name:ident = $opcode:expr, $mnemonic:literal, $when_zero:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, imm) = two_registers_one_immediate(ctx.operands, ctx.skip);
            if (ctx.registers[rb] == 0) == $when_zero {
                ctx.registers[ra] = imm;
            }
            Ok(Flow::Next)
        });
    };
}

cmov!(CmovIzInstruction = OPCODE_CMOV_IZ, "CMOV_IZ", true);
cmov!(CmovNzInstruction = OPCODE_CMOV_NZ, "CMOV_NZ", false);
cmov_imm!(CmovIzImmInstruction = OPCODE_CMOV_IZ_IMM, "CMOV_IZ_IMM", true);
cmov_imm!(CmovNzImmInstruction = OPCODE_CMOV_NZ_IMM, "CMOV_NZ_IMM", false);

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;

    fn three(opcode: u8, a: u64, b: u64, d: u64) -> u64 {
        let mut harness = Harness::single(opcode, &[0x21, 0x03]);
        harness.registers[1] = a;
        harness.registers[2] = b;
        harness.registers[3] = d;
        harness.exec().unwrap();
        harness.registers[3]
    }

    #[test]
    fn signed_and_unsigned_compare_differ() {
        assert_eq!(three(OPCODE_SET_LT_U, u64::MAX, 1, 9), 0);
        assert_eq!(three(OPCODE_SET_LT_S, u64::MAX, 1, 9), 1);
        assert_eq!(three(OPCODE_MIN, u64::MAX, 1, 9), u64::MAX);
        assert_eq!(three(OPCODE_MIN_U, u64::MAX, 1, 9), 1);
        assert_eq!(three(OPCODE_MAX, u64::MAX, 1, 9), 1);
    }

    #[test]
    fn conditional_moves() {
        assert_eq!(three(OPCODE_CMOV_IZ, 5, 0, 9), 5);
        assert_eq!(three(OPCODE_CMOV_IZ, 5, 1, 9), 9);
        assert_eq!(three(OPCODE_CMOV_NZ, 5, 1, 9), 5);
        assert_eq!(three(OPCODE_CMOV_NZ, 5, 0, 9), 9);
    }

    #[test]
    fn conditional_move_immediate() {
        let mut harness = Harness::single(OPCODE_CMOV_IZ_IMM, &[0x21, 0x2a]);
        harness.registers[1] = 7;
        harness.exec().unwrap();
        assert_eq!(harness.registers[1], 42);
    }

    #[test]
    fn set_gt_immediate() {
        let mut harness = Harness::single(OPCODE_SET_GT_S_IMM, &[0x21, 0xff]);
        harness.registers[2] = 0;
        harness.exec().unwrap();
        assert_eq!(harness.registers[1], 1);
    }
}
