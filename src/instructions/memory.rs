//! Immediate loads and memory access: direct (immediate address) and indirect
//! (register base plus immediate). Signed loads sign-extend; stores keep the low bytes.

use super::operands::{
    one_register_one_immediate, one_register_two_immediates, one_register_wide_immediate,
    sign_extend, two_immediates, two_registers_one_immediate,
};
use super::Flow;
use crate::config::*;

instruction!(
    /// LOAD_IMM (51): rA = immX.
    LoadImmInstruction = OPCODE_LOAD_IMM, "LOAD_IMM", |ctx| {
        let (ra, imm) = one_register_one_immediate(ctx.operands, ctx.skip);
        ctx.registers[ra] = imm;
        Ok(Flow::Next)
    }
);

instruction!(
    /// LOAD_IMM_64 (20): rA = 8-byte immediate.
    LoadImm64Instruction = OPCODE_LOAD_IMM_64, "LOAD_IMM_64", |ctx| {
        let (ra, imm) = one_register_wide_immediate(ctx.operands);
        ctx.registers[ra] = imm;
        Ok(Flow::Next)
    }
);

/// mem[immX] = immY
macro_rules! store_imm {
    ($name:ident = $opcode:expr, $mnemonic:literal, $width:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (address, value) = two_immediates(ctx.operands, ctx.skip);
            ctx.store(address, value, $width)?;
            Ok(Flow::Next)
        });
    };
}

/// rA = mem[immX]
macro_rules! load_direct {
    ($name:ident = $opcode:expr, $mnemonic:literal, $width:expr, $signed:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, address) = one_register_one_immediate(ctx.operands, ctx.skip);
            let value = ctx.load(address, $width)?;
            ctx.registers[ra] = if $signed { sign_extend(value, $width) } else { value };
            Ok(Flow::Next)
        });
    };
}

/// mem[immX] = rA
macro_rules! store_direct {
    ($name:ident = $opcode:expr, $mnemonic:literal, $width:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, address) = one_register_one_immediate(ctx.operands, ctx.skip);
            let value = ctx.registers[ra];
            ctx.store(address, value, $width)?;
            Ok(Flow::Next)
        });
    };
}

/// mem[rA + immX] = immY
macro_rules! store_imm_indirect {
    ($name:ident = $opcode:expr, $mnemonic:literal, $width:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, offset, value) = one_register_two_immediates(ctx.operands, ctx.skip);
            let address = ctx.registers[ra].wrapping_add(offset);
            ctx.store(address, value, $width)?;
            Ok(Flow::Next)
        });
    };
}

/// mem[rB + immX] = rA
macro_rules! store_indirect {
    ($name:ident = $opcode:expr, $mnemonic:literal, $width:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, offset) = two_registers_one_immediate(ctx.operands, ctx.skip);
            let address = ctx.registers[rb].wrapping_add(offset);
            let value = ctx.registers[ra];
            ctx.store(address, value, $width)?;
            Ok(Flow::Next)
        });
    };
}

/// rA = mem[rB + immX]
macro_rules! load_indirect {
    ($name:ident = $opcode:expr, $mnemonic:literal, $width:expr, $signed:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, offset) = two_registers_one_immediate(ctx.operands, ctx.skip);
            let address = ctx.registers[rb].wrapping_add(offset);
            let value = ctx.load(address, $width)?;
            ctx.registers[ra] = if $signed { sign_extend(value, $width) } else { value };
            Ok(Flow::Next)
        });
    };
}

store_imm!(StoreImmU8Instruction = OPCODE_STORE_IMM_U8, "STORE_IMM_U8", 1);
store_imm!(StoreImmU16Instruction = OPCODE_STORE_IMM_U16, "STORE_IMM_U16", 2);
store_imm!(StoreImmU32Instruction = OPCODE_STORE_IMM_U32, "STORE_IMM_U32", 4);
store_imm!(StoreImmU64Instruction = OPCODE_STORE_IMM_U64, "STORE_IMM_U64", 8);

load_direct!(LoadU8Instruction = OPCODE_LOAD_U8, "LOAD_U8", 1, false);
load_direct!(LoadI8Instruction = OPCODE_LOAD_I8, "LOAD_I8", 1, true);
load_direct!(LoadU16Instruction = OPCODE_LOAD_U16, "LOAD_U16", 2, false);
load_direct!(LoadI16Instruction = OPCODE_LOAD_I16, "LOAD_I16", 2, true);
load_direct!(LoadU32Instruction = OPCODE_LOAD_U32, "LOAD_U32", 4, false);
load_direct!(LoadI32Instruction = OPCODE_LOAD_I32, "LOAD_I32", 4, true);
load_direct!(LoadU64Instruction = OPCODE_LOAD_U64, "LOAD_U64", 8, false);

store_direct!(StoreU8Instruction = OPCODE_STORE_U8, "STORE_U8", 1);
store_direct!(StoreU16Instruction = OPCODE_STORE_U16, "STORE_U16", 2);
store_direct!(StoreU32Instruction = OPCODE_STORE_U32, "STORE_U32", 4);
store_direct!(StoreU64Instruction = OPCODE_STORE_U64, "STORE_U64", 8);

store_imm_indirect!(StoreImmIndU8Instruction = OPCODE_STORE_IMM_IND_U8, "STORE_IMM_IND_U8", 1);
store_imm_indirect!(StoreImmIndU16Instruction = OPCODE_STORE_IMM_IND_U16, "STORE_IMM_IND_U16", 2);
store_imm_indirect!(StoreImmIndU32Instruction = OPCODE_STORE_IMM_IND_U32, "STORE_IMM_IND_U32", 4);
store_imm_indirect!(StoreImmIndU64Instruction = OPCODE_STORE_IMM_IND_U64, "STORE_IMM_IND_U64", 8);

store_indirect!(StoreIndU8Instruction = OPCODE_STORE_IND_U8, "STORE_IND_U8", 1);
store_indirect!(StoreIndU16Instruction = OPCODE_STORE_IND_U16, "STORE_IND_U16", 2);
store_indirect!(StoreIndU32Instruction = OPCODE_STORE_IND_U32, "STORE_IND_U32", 4);
store_indirect!(StoreIndU64Instruction = OPCODE_STORE_IND_U64, "STORE_IND_U64", 8);

load_indirect!(LoadIndU8Instruction = OPCODE_LOAD_IND_U8, "LOAD_IND_U8", 1, false);
load_indirect!(LoadIndI8Instruction = OPCODE_LOAD_IND_I8, "LOAD_IND_I8", 1, true);
load_indirect!(LoadIndU16Instruction = OPCODE_LOAD_IND_U16, "LOAD_IND_U16", 2, false);
load_indirect!(LoadIndI16Instruction = OPCODE_LOAD_IND_I16, "LOAD_IND_I16", 2, true);
load_indirect!(LoadIndU32Instruction = OPCODE_LOAD_IND_U32, "LOAD_IND_U32", 4, false);
load_indirect!(LoadIndI32Instruction = OPCODE_LOAD_IND_I32, "LOAD_IND_I32", 4, true);
load_indirect!(LoadIndU64Instruction = OPCODE_LOAD_IND_U64, "LOAD_IND_U64", 8, false);

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::error::{FaultKind, MemoryFault, PanicReason};
    use crate::memory::PageAccess;

    const BASE: u32 = 0x2_0000;

    fn with_page(opcode: u8, operands: &[u8], access: PageAccess) -> Harness {
        let mut harness = Harness::single(opcode, operands);
        harness.memory.map_page(BASE, access).unwrap();
        harness
    }

    #[test]
    fn load_imm_sign_extends() {
        let mut harness = Harness::single(OPCODE_LOAD_IMM, &[0x03, 0x80]);
        assert_eq!(harness.exec(), Ok(Flow::Next));
        assert_eq!(harness.registers[3], 0xffff_ffff_ffff_ff80);
    }

    #[test]
    fn load_imm_64_takes_full_width() {
        let mut harness = Harness::single(OPCODE_LOAD_IMM_64, &[0x02, 1, 2, 3, 4, 5, 6, 7, 0x88]);
        harness.exec().unwrap();
        assert_eq!(harness.registers[2], 0x8807_0605_0403_0201);
    }

    #[test]
    fn indirect_store_then_signed_load() {
        // store_ind_u16 r1 -> [r2 + 4]
        let mut harness = with_page(OPCODE_STORE_IND_U16, &[0x21, 0x04], PageAccess::ReadWrite);
        harness.registers[1] = 0x1_ff80;
        harness.registers[2] = u64::from(BASE);
        harness.exec().unwrap();
        assert_eq!(harness.memory.read(BASE + 4, 2).unwrap(), vec![0x80, 0xff]);

        let mut load = with_page(OPCODE_LOAD_IND_I16, &[0x23, 0x04], PageAccess::ReadWrite);
        load.memory = harness.memory.clone();
        load.registers[2] = u64::from(BASE);
        load.exec().unwrap();
        assert_eq!(load.registers[3], 0xffff_ffff_ffff_ff80);
    }

    #[test]
    fn store_imm_writes_low_bytes() {
        // store_imm_u32 [BASE] = -1 ; lX = 3 (0x02_00_00 little endian = BASE)
        let mut harness = with_page(
            OPCODE_STORE_IMM_U32,
            &[0x03, 0x00, 0x00, 0x02, 0xff],
            PageAccess::ReadWrite,
        );
        harness.exec().unwrap();
        assert_eq!(harness.memory.read(BASE, 5).unwrap(), vec![0xff, 0xff, 0xff, 0xff, 0]);
    }

    #[test]
    fn store_to_read_only_faults_without_effect() {
        let mut harness = with_page(OPCODE_STORE_IMM_IND_U8, &[0x01, 0x01], PageAccess::ReadOnly);
        harness.registers[1] = u64::from(BASE);
        assert_eq!(
            harness.exec(),
            Err(PanicReason::MemoryFault(MemoryFault {
                kind: FaultKind::PermissionDenied,
                address: BASE,
            }))
        );
        assert_eq!(harness.memory.read(BASE, 1).unwrap(), vec![0]);
    }

    #[test]
    fn load_from_unmapped_page_faults() {
        let mut harness = Harness::single(OPCODE_LOAD_IND_U64, &[0x10]);
        harness.registers[1] = u64::from(BASE);
        assert!(matches!(
            harness.exec(),
            Err(PanicReason::MemoryFault(MemoryFault { kind: FaultKind::OutOfBounds, .. }))
        ));
    }
}
