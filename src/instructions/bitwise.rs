//! Bitwise logic over full 64-bit registers.

use crate::config::{
    OPCODE_AND, OPCODE_AND_IMM, OPCODE_AND_INV, OPCODE_OR, OPCODE_OR_IMM, OPCODE_OR_INV,
    OPCODE_XNOR, OPCODE_XOR, OPCODE_XOR_IMM,
};

three_reg!(AndInstruction = OPCODE_AND, "AND", |a, b| a & b);
three_reg!(XorInstruction = OPCODE_XOR, "XOR", |a, b| a ^ b);
three_reg!(OrInstruction = OPCODE_OR, "OR", |a, b| a | b);
three_reg!(AndInvInstruction = OPCODE_AND_INV, "AND_INV", |a, b| a & !b);
three_reg!(OrInvInstruction = OPCODE_OR_INV, "OR_INV", |a, b| a | !b);
three_reg!(XnorInstruction = OPCODE_XNOR, "XNOR", |a, b| !(a ^ b));

two_reg_imm!(AndImmInstruction = OPCODE_AND_IMM, "AND_IMM", |b, imm| b & imm);
two_reg_imm!(XorImmInstruction = OPCODE_XOR_IMM, "XOR_IMM", |b, imm| b ^ imm);
two_reg_imm!(OrImmInstruction = OPCODE_OR_IMM, "OR_IMM", |b, imm| b | imm);
