//! Operand decoding for the instruction formats of Gray Paper Appendix A.5.
//!
//! Every decoder takes the operand window that follows the opcode (always at least
//! `MAX_SKIP + 1` bytes, zero-padded past the end of code) and `skip`, the operand length ℓ.
//! Register nibbles above 12 clamp to 12; immediate lengths clamp to 0..=4.

use crate::codec::read_le;

/// r = min(12, nibble).
#[must_use]
pub fn register(byte: u8) -> usize {
    usize::from((byte & 0x0f).min(12))
}

/// Xn: sign-extend the low `octets` bytes of `value` to 64 bits.
#[must_use]
pub const fn sign_extend(value: u64, octets: usize) -> u64 {
    match octets {
        0 => 0,
        1..=7 => {
            let shift = 64 - 8 * octets as u32;
            (((value << shift) as i64) >> shift) as u64
        }
        _ => value,
    }
}

/// X4, the result form of every 32-bit operation.
#[must_use]
pub const fn sign_extend_32(value: u64) -> u64 {
    value as u32 as i32 as i64 as u64
}

/// Sign-extended little-endian immediate of `len` bytes at `start`.
#[must_use]
pub fn immediate(operands: &[u8], start: usize, len: usize) -> u64 {
    sign_extend(read_le(&operands[start..start + len]), len)
}

fn length(value: i64) -> usize {
    value.clamp(0, 4) as usize
}

fn offset_target(pc: u32, operands: &[u8], start: usize, len: usize) -> u32 {
    pc.wrapping_add(immediate(operands, start, len) as u32)
}

/// One immediate: lX = min(4, ℓ).
#[must_use]
pub fn one_immediate(operands: &[u8], skip: u32) -> u64 {
    immediate(operands, 0, length(i64::from(skip)))
}

/// One offset: pc + signed lX-byte offset.
#[must_use]
pub fn one_offset(operands: &[u8], skip: u32, pc: u32) -> u32 {
    offset_target(pc, operands, 0, length(i64::from(skip)))
}

/// One register and an extended-width (8 byte) immediate.
#[must_use]
pub fn one_register_wide_immediate(operands: &[u8]) -> (usize, u64) {
    (register(operands[0]), read_le(&operands[1..9]))
}

/// Two immediates: lX = min(4, op0 mod 8), lY = clamp(ℓ - lX - 1).
#[must_use]
pub fn two_immediates(operands: &[u8], skip: u32) -> (u64, u64) {
    let lx = usize::from(operands[0] & 0x07).min(4);
    let ly = length(i64::from(skip) - lx as i64 - 1);
    (immediate(operands, 1, lx), immediate(operands, 1 + lx, ly))
}

/// One register and one immediate: lX = clamp(ℓ - 1).
#[must_use]
pub fn one_register_one_immediate(operands: &[u8], skip: u32) -> (usize, u64) {
    let lx = length(i64::from(skip) - 1);
    (register(operands[0]), immediate(operands, 1, lx))
}

/// One register and two immediates: lX = min(4, (op0 >> 4) mod 8), lY = clamp(ℓ - lX - 1).
#[must_use]
pub fn one_register_two_immediates(operands: &[u8], skip: u32) -> (usize, u64, u64) {
    let lx = usize::from((operands[0] >> 4) & 0x07).min(4);
    let ly = length(i64::from(skip) - lx as i64 - 1);
    (
        register(operands[0]),
        immediate(operands, 1, lx),
        immediate(operands, 1 + lx, ly),
    )
}

/// One register, one immediate and one offset. Same lengths as [`one_register_two_immediates`].
#[must_use]
pub fn one_register_immediate_offset(operands: &[u8], skip: u32, pc: u32) -> (usize, u64, u32) {
    let lx = usize::from((operands[0] >> 4) & 0x07).min(4);
    let ly = length(i64::from(skip) - lx as i64 - 1);
    (
        register(operands[0]),
        immediate(operands, 1, lx),
        offset_target(pc, operands, 1 + lx, ly),
    )
}

/// Two registers: (rD, rA) = (low, high) nibbles of op0.
#[must_use]
pub fn two_registers(operands: &[u8]) -> (usize, usize) {
    (register(operands[0]), register(operands[0] >> 4))
}

/// Two registers and one immediate: (rA, rB, immX), lX = clamp(ℓ - 1).
#[must_use]
pub fn two_registers_one_immediate(operands: &[u8], skip: u32) -> (usize, usize, u64) {
    let lx = length(i64::from(skip) - 1);
    (
        register(operands[0]),
        register(operands[0] >> 4),
        immediate(operands, 1, lx),
    )
}

/// Two registers and one offset: (rA, rB, target).
#[must_use]
pub fn two_registers_one_offset(operands: &[u8], skip: u32, pc: u32) -> (usize, usize, u32) {
    let lx = length(i64::from(skip) - 1);
    (
        register(operands[0]),
        register(operands[0] >> 4),
        offset_target(pc, operands, 1, lx),
    )
}

/// Two registers and two immediates: lX = min(4, op1 mod 8) from operand 2, lY = clamp(ℓ - lX - 2).
#[must_use]
pub fn two_registers_two_immediates(operands: &[u8], skip: u32) -> (usize, usize, u64, u64) {
    let lx = usize::from(operands[1] & 0x07).min(4);
    let ly = length(i64::from(skip) - lx as i64 - 2);
    (
        register(operands[0]),
        register(operands[0] >> 4),
        immediate(operands, 2, lx),
        immediate(operands, 2 + lx, ly),
    )
}

/// Three registers: (rA, rB, rD) = (low op0, high op0, low op1).
#[must_use]
pub fn three_registers(operands: &[u8]) -> (usize, usize, usize) {
    (
        register(operands[0]),
        register(operands[0] >> 4),
        register(operands[1]),
    )
}
