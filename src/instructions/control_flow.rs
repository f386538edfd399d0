//! Control flow: TRAP, FALLTHROUGH, ECALLI, JUMP, JUMP_IND, LOAD_IMM_JUMP, LOAD_IMM_JUMP_IND.

use super::operands::{
    one_immediate, one_offset, one_register_immediate_offset, one_register_one_immediate,
    two_registers_two_immediates,
};
use super::Flow;
use crate::config::{
    OPCODE_ECALLI, OPCODE_FALLTHROUGH, OPCODE_JUMP, OPCODE_JUMP_IND, OPCODE_LOAD_IMM_JUMP,
    OPCODE_LOAD_IMM_JUMP_IND, OPCODE_TRAP,
};
use crate::error::PanicReason;

instruction!(
    /// TRAP (0): unconditional panic.
    TrapInstruction = OPCODE_TRAP, "TRAP", |_ctx| {
        Err(PanicReason::Trap)
    }
);

instruction!(
    /// FALLTHROUGH (1): no-op that ends a basic block.
    FallthroughInstruction = OPCODE_FALLTHROUGH, "FALLTHROUGH", |_ctx| {
        Ok(Flow::Next)
    }
);

instruction!(
    /// ECALLI (10): trap to the host with call index immX.
    EcalliInstruction = OPCODE_ECALLI, "ECALLI", |ctx| {
        Ok(Flow::HostCall(one_immediate(ctx.operands, ctx.skip) as u32))
    }
);

instruction!(
    /// JUMP (40): branch(pc + offset, true).
    JumpInstruction = OPCODE_JUMP, "JUMP", |ctx| {
        let target = one_offset(ctx.operands, ctx.skip, ctx.pc);
        ctx.branch(target, true)
    }
);

instruction!(
    /// JUMP_IND (50): djump(rA + immX).
    JumpIndInstruction = OPCODE_JUMP_IND, "JUMP_IND", |ctx| {
        let (ra, imm) = one_register_one_immediate(ctx.operands, ctx.skip);
        ctx.dynamic_jump(ctx.registers[ra].wrapping_add(imm))
    }
);

instruction!(
    /// LOAD_IMM_JUMP (80): rA = immX, then branch(immY, true).
    LoadImmJumpInstruction = OPCODE_LOAD_IMM_JUMP, "LOAD_IMM_JUMP", |ctx| {
        let (ra, imm, target) = one_register_immediate_offset(ctx.operands, ctx.skip, ctx.pc);
        ctx.registers[ra] = imm;
        ctx.branch(target, true)
    }
);

instruction!(
    /// LOAD_IMM_JUMP_IND (180): djump(rB + immY) using rB as read before rA = immX.
    LoadImmJumpIndInstruction = OPCODE_LOAD_IMM_JUMP_IND, "LOAD_IMM_JUMP_IND", |ctx| {
        let (ra, rb, imm_x, imm_y) = two_registers_two_immediates(ctx.operands, ctx.skip);
        let address = ctx.registers[rb].wrapping_add(imm_y);
        ctx.registers[ra] = imm_x;
        ctx.dynamic_jump(address)
    }
);

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::config::HALT_ADDRESS;

    #[test]
    fn trap_panics_and_fallthrough_continues() {
        assert_eq!(Harness::single(OPCODE_TRAP, &[]).exec(), Err(PanicReason::Trap));
        assert_eq!(Harness::single(OPCODE_FALLTHROUGH, &[]).exec(), Ok(Flow::Next));
    }

    #[test]
    fn ecalli_reports_index() {
        assert_eq!(Harness::single(OPCODE_ECALLI, &[100]).exec(), Ok(Flow::HostCall(100)));
        assert_eq!(Harness::single(OPCODE_ECALLI, &[]).exec(), Ok(Flow::HostCall(0)));
    }

    #[test]
    fn jump_to_block_start_and_back() {
        // 0: fallthrough | 1: jump -1
        let mut harness = Harness::new(&[OPCODE_FALLTHROUGH, OPCODE_JUMP, 0xff], &[1, 1, 0], vec![]);
        assert_eq!(harness.exec_at(1), Ok(Flow::Jump(0)));
        // The instruction after a jump starts a block; its operand byte does not.
        let mut harness = Harness::new(&[OPCODE_JUMP, 2, OPCODE_TRAP], &[1, 0, 1], vec![]);
        assert_eq!(harness.exec(), Ok(Flow::Jump(2)));
        let mut harness = Harness::new(&[OPCODE_JUMP, 1, OPCODE_TRAP], &[1, 0, 1], vec![]);
        assert_eq!(harness.exec(), Err(PanicReason::InvalidJumpTarget(1)));
    }

    #[test]
    fn jump_ind_halts_on_halt_address() {
        let mut harness = Harness::single(OPCODE_JUMP_IND, &[0x01]);
        harness.registers[1] = u64::from(HALT_ADDRESS);
        assert_eq!(harness.exec(), Ok(Flow::Halt));
    }

    #[test]
    fn load_imm_jump_sets_register_before_jumping() {
        // 0: load_imm_jump r2, 7, +4 | 4: trap
        let mut harness = Harness::new(
            &[OPCODE_LOAD_IMM_JUMP, 0x12, 7, 4, OPCODE_TRAP],
            &[1, 0, 0, 0, 1],
            vec![],
        );
        assert_eq!(harness.exec(), Ok(Flow::Jump(4)));
        assert_eq!(harness.registers[2], 7);
    }

    #[test]
    fn load_imm_jump_ind_reads_base_first() {
        // rA = rB = r1; table slot 1 -> 0
        let code = [OPCODE_LOAD_IMM_JUMP_IND, 0x11, 0x01, 9, 0];
        let mut harness = Harness::new(&code, &[1, 0, 0, 0, 0], vec![0]);
        harness.registers[1] = 2;
        assert_eq!(harness.exec(), Ok(Flow::Jump(0)));
        assert_eq!(harness.registers[1], 9);
    }
}
