//! Conditional branches, against an immediate or a second register.

use super::operands::{one_register_immediate_offset, two_registers_one_offset};
use crate::config::{
    OPCODE_BRANCH_EQ, OPCODE_BRANCH_EQ_IMM, OPCODE_BRANCH_GE_S, OPCODE_BRANCH_GE_S_IMM,
    OPCODE_BRANCH_GE_U, OPCODE_BRANCH_GE_U_IMM, OPCODE_BRANCH_GT_S_IMM, OPCODE_BRANCH_GT_U_IMM,
    OPCODE_BRANCH_LE_S_IMM, OPCODE_BRANCH_LE_U_IMM, OPCODE_BRANCH_LT_S, OPCODE_BRANCH_LT_S_IMM,
    OPCODE_BRANCH_LT_U, OPCODE_BRANCH_LT_U_IMM, OPCODE_BRANCH_NE, OPCODE_BRANCH_NE_IMM,
};

/// branch(pc + offset, cmp(rA, immX))
macro_rules! branch_imm {
    ($name:ident = $opcode:expr, $mnemonic:literal, |$a:ident, $imm:ident| $cond:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, $imm, target) = one_register_immediate_offset(ctx.operands, ctx.skip, ctx.pc);
            let $a = ctx.registers[ra];
            ctx.branch(target, $cond)
        });
    };
}

/// branch(pc + offset, cmp(rA, rB))
macro_rules! branch_reg {
    ($name:ident = $opcode:expr, $mnemonic:literal, |$a:ident, $b:ident| $cond:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, target) = two_registers_one_offset(ctx.operands, ctx.skip, ctx.pc);
            let ($a, $b) = (ctx.registers[ra], ctx.registers[rb]);
            ctx.branch(target, $cond)
        });
    };
}

branch_imm!(BranchEqImmInstruction = OPCODE_BRANCH_EQ_IMM, "BRANCH_EQ_IMM", |a, imm| a == imm);
branch_imm!(BranchNeImmInstruction = OPCODE_BRANCH_NE_IMM, "BRANCH_NE_IMM", |a, imm| a != imm);
branch_imm!(BranchLtUImmInstruction = OPCODE_BRANCH_LT_U_IMM, "BRANCH_LT_U_IMM", |a, imm| a < imm);
branch_imm!(BranchLeUImmInstruction = OPCODE_BRANCH_LE_U_IMM, "BRANCH_LE_U_IMM", |a, imm| a <= imm);
branch_imm!(BranchGeUImmInstruction = OPCODE_BRANCH_GE_U_IMM, "BRANCH_GE_U_IMM", |a, imm| a >= imm);
branch_imm!(BranchGtUImmInstruction = OPCODE_BRANCH_GT_U_IMM, "BRANCH_GT_U_IMM", |a, imm| a > imm);
branch_imm!(BranchLtSImmInstruction = OPCODE_BRANCH_LT_S_IMM, "BRANCH_LT_S_IMM", |a, imm| (a as i64) < (imm as i64));
branch_imm!(BranchLeSImmInstruction = OPCODE_BRANCH_LE_S_IMM, "BRANCH_LE_S_IMM", |a, imm| (a as i64) <= (imm as i64));
branch_imm!(BranchGeSImmInstruction = OPCODE_BRANCH_GE_S_IMM, "BRANCH_GE_S_IMM", |a, imm| (a as i64) >= (imm as i64));
branch_imm!(BranchGtSImmInstruction = OPCODE_BRANCH_GT_S_IMM, "BRANCH_GT_S_IMM", |a, imm| (a as i64) > (imm as i64));

branch_reg!(BranchEqInstruction = OPCODE_BRANCH_EQ, "BRANCH_EQ", |a, b| a == b);
branch_reg!(BranchNeInstruction = OPCODE_BRANCH_NE, "BRANCH_NE", |a, b| a != b);
branch_reg!(BranchLtUInstruction = OPCODE_BRANCH_LT_U, "BRANCH_LT_U", |a, b| a < b);
branch_reg!(BranchLtSInstruction = OPCODE_BRANCH_LT_S, "BRANCH_LT_S", |a, b| (a as i64) < (b as i64));
branch_reg!(BranchGeUInstruction = OPCODE_BRANCH_GE_U, "BRANCH_GE_U", |a, b| a >= b);
branch_reg!(BranchGeSInstruction = OPCODE_BRANCH_GE_S, "BRANCH_GE_S", |a, b| (a as i64) >= (b as i64));

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::Flow;
    use super::*;
    use crate::config::OPCODE_TRAP;
    use crate::error::PanicReason;

    /// 0: branch r1 vs r2 -> +4 | 3: trap | 4: trap
    fn reg_branch(opcode: u8, a: u64, b: u64) -> Result<Flow, PanicReason> {
        let mut harness = Harness::new(
            &[opcode, 0x21, 4, OPCODE_TRAP, OPCODE_TRAP],
            &[1, 0, 0, 1, 1],
            vec![],
        );
        harness.registers[1] = a;
        harness.registers[2] = b;
        harness.exec()
    }

    #[test]
    fn taken_and_not_taken() {
        assert_eq!(reg_branch(OPCODE_BRANCH_EQ, 3, 3), Ok(Flow::Jump(4)));
        assert_eq!(reg_branch(OPCODE_BRANCH_EQ, 3, 4), Ok(Flow::Next));
        assert_eq!(reg_branch(OPCODE_BRANCH_LT_S, u64::MAX, 0), Ok(Flow::Jump(4)));
        assert_eq!(reg_branch(OPCODE_BRANCH_LT_U, u64::MAX, 0), Ok(Flow::Next));
    }

    #[test]
    fn taken_branch_into_block_middle_panics() {
        // Offset 1 lands in the branch's own operands.
        let mut harness = Harness::new(
            &[OPCODE_BRANCH_NE_IMM, 0x01, 1, OPCODE_TRAP],
            &[1, 0, 0, 1],
            vec![],
        );
        harness.registers[1] = 5;
        assert_eq!(harness.exec(), Err(PanicReason::InvalidJumpTarget(1)));
    }

    #[test]
    fn immediate_compare_is_sign_aware() {
        // branch_lt_s_imm r1 < -1 -> +4
        let mut harness = Harness::new(
            &[OPCODE_BRANCH_LT_S_IMM, 0x11, 0xff, 4, OPCODE_TRAP],
            &[1, 0, 0, 0, 1],
            vec![],
        );
        harness.registers[1] = (-2i64) as u64;
        assert_eq!(harness.exec(), Ok(Flow::Jump(4)));
    }
}
