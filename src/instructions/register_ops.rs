//! Two-register instructions: MOVE_REG, SBRK, bit counting, extension and byte reversal.

use super::operands::{sign_extend, two_registers};
use super::Flow;
use crate::config::{
    OPCODE_COUNT_SET_BITS_32, OPCODE_COUNT_SET_BITS_64, OPCODE_LEADING_ZERO_BITS_32,
    OPCODE_LEADING_ZERO_BITS_64, OPCODE_MOVE_REG, OPCODE_REVERSE_BYTES, OPCODE_SBRK,
    OPCODE_SIGN_EXTEND_16, OPCODE_SIGN_EXTEND_8, OPCODE_TRAILING_ZERO_BITS_32,
    OPCODE_TRAILING_ZERO_BITS_64, OPCODE_ZERO_EXTEND_16,
};

two_reg!(MoveRegInstruction = OPCODE_MOVE_REG, "MOVE_REG", |a| a);

instruction!(
    /// SBRK (101): rD = previous heap break, then grow the heap by the low 32 bits of rA.
    /// Growing past the memory limit panics.
    SbrkInstruction = OPCODE_SBRK, "SBRK", |ctx| {
        let (rd, ra) = two_registers(ctx.operands);
        let previous = ctx.memory.sbrk(u64::from(ctx.registers[ra] as u32))?;
        ctx.registers[rd] = u64::from(previous);
        Ok(Flow::Next)
    }
);

two_reg!(CountSetBits64Instruction = OPCODE_COUNT_SET_BITS_64, "COUNT_SET_BITS_64", |a| u64::from(a.count_ones()));
two_reg!(CountSetBits32Instruction = OPCODE_COUNT_SET_BITS_32, "COUNT_SET_BITS_32", |a| u64::from((a as u32).count_ones()));
two_reg!(LeadingZeroBits64Instruction = OPCODE_LEADING_ZERO_BITS_64, "LEADING_ZERO_BITS_64", |a| u64::from(a.leading_zeros()));
two_reg!(LeadingZeroBits32Instruction = OPCODE_LEADING_ZERO_BITS_32, "LEADING_ZERO_BITS_32", |a| u64::from((a as u32).leading_zeros()));
two_reg!(TrailingZeroBits64Instruction = OPCODE_TRAILING_ZERO_BITS_64, "TRAILING_ZERO_BITS_64", |a| u64::from(a.trailing_zeros()));
two_reg!(TrailingZeroBits32Instruction = OPCODE_TRAILING_ZERO_BITS_32, "TRAILING_ZERO_BITS_32", |a| u64::from((a as u32).trailing_zeros()));
two_reg!(SignExtend8Instruction = OPCODE_SIGN_EXTEND_8, "SIGN_EXTEND_8", |a| sign_extend(a, 1));
two_reg!(SignExtend16Instruction = OPCODE_SIGN_EXTEND_16, "SIGN_EXTEND_16", |a| sign_extend(a, 2));
two_reg!(ZeroExtend16Instruction = OPCODE_ZERO_EXTEND_16, "ZERO_EXTEND_16", |a| a & 0xffff);
two_reg!(ReverseBytesInstruction = OPCODE_REVERSE_BYTES, "REVERSE_BYTES", |a| a.swap_bytes());

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::error::PanicReason;

    /// rD = r1 = f(r2)
    fn unary(opcode: u8, a: u64) -> u64 {
        let mut harness = Harness::single(opcode, &[0x21]);
        harness.registers[2] = a;
        harness.exec().unwrap();
        harness.registers[1]
    }

    #[test]
    fn bit_counts() {
        assert_eq!(unary(OPCODE_COUNT_SET_BITS_64, u64::MAX), 64);
        assert_eq!(unary(OPCODE_COUNT_SET_BITS_32, u64::MAX), 32);
        assert_eq!(unary(OPCODE_LEADING_ZERO_BITS_32, 1), 31);
        assert_eq!(unary(OPCODE_LEADING_ZERO_BITS_64, 0), 64);
        assert_eq!(unary(OPCODE_TRAILING_ZERO_BITS_32, 0), 32);
        assert_eq!(unary(OPCODE_TRAILING_ZERO_BITS_64, 8), 3);
    }

    #[test]
    fn extensions_and_reversal() {
        assert_eq!(unary(OPCODE_SIGN_EXTEND_8, 0x1ff), u64::MAX);
        assert_eq!(unary(OPCODE_SIGN_EXTEND_16, 0x7fff), 0x7fff);
        assert_eq!(unary(OPCODE_ZERO_EXTEND_16, u64::MAX), 0xffff);
        assert_eq!(unary(OPCODE_REVERSE_BYTES, 0x0102_0304_0506_0708), 0x0807_0605_0403_0201);
        assert_eq!(unary(OPCODE_MOVE_REG, 77), 77);
    }

    #[test]
    fn sbrk_returns_previous_break() {
        let mut harness = Harness::single(OPCODE_SBRK, &[0x21]);
        let start = harness.memory.heap_end();
        harness.registers[2] = 100;
        harness.exec().unwrap();
        assert_eq!(harness.registers[1], u64::from(start));
        assert_eq!(harness.memory.heap_end(), start + 100);
        assert!(harness.memory.is_writable(start, 100));
    }

    #[test]
    fn sbrk_ignores_high_half_of_increment() {
        let mut harness = Harness::single(OPCODE_SBRK, &[0x21]);
        let start = harness.memory.heap_end();
        harness.registers[2] = (1 << 32) + 16;
        harness.exec().unwrap();
        assert_eq!(harness.registers[1], u64::from(start));
        assert_eq!(harness.memory.heap_end(), start + 16);
    }

    #[test]
    fn sbrk_past_limit_panics() {
        let mut harness = Harness::single(OPCODE_SBRK, &[0x21]);
        harness.registers[2] = u64::MAX / 2;
        assert_eq!(harness.exec(), Err(PanicReason::MemoryLimitExceeded));
    }
}
