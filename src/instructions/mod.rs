//! Instruction set (Gray Paper Appendix A).
//!
//! Each instruction is a unit struct implementing [`InstructionHandler`]; the
//! [`registry`] maps opcodes to handlers. Handlers only see an [`InstructionContext`]:
//! the register file, memory, the program, and the decoded position. They report
//! control flow through [`Flow`] and faults through [`PanicReason`].

use crate::config::{DYNAMIC_ADDRESS_ALIGNMENT, HALT_ADDRESS, ZONE_SIZE};
use crate::error::PanicReason;
use crate::memory::Memory;
use crate::program::Program;
use crate::types::Registers;

/// Declare a unit-struct handler for one opcode.
macro_rules! instruction {
    ($(#[$meta:meta])* $name:ident = $opcode:expr, $mnemonic:literal, |$ctx:ident| $body:block) => {
        $(#[$meta])*
        pub struct $name;

        impl $crate::instructions::InstructionHandler for $name {
            fn opcode(&self) -> u8 {
                $opcode
            }

            fn name(&self) -> &'static str {
                $mnemonic
            }

            fn execute(
                &self,
                $ctx: &mut $crate::instructions::InstructionContext<'_>,
            ) -> $crate::instructions::InstructionResult $body
        }
    };
}

/// rD = f(rA, rB) over the three-register format.
macro_rules! three_reg {
    ($name:ident = $opcode:expr, $mnemonic:literal, |$a:ident, $b:ident| $value:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, rd) = $crate::instructions::operands::three_registers(ctx.operands);
            let ($a, $b) = (ctx.registers[ra], ctx.registers[rb]);
            ctx.registers[rd] = $value;
            Ok($crate::instructions::Flow::Next)
        });
    };
}

/// rA = f(rB, immX) over the two-registers-one-immediate format.
macro_rules! two_reg_imm {
    ($name:ident = $opcode:expr, $mnemonic:literal, |$b:ident, $imm:ident| $value:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (ra, rb, $imm) =
                $crate::instructions::operands::two_registers_one_immediate(ctx.operands, ctx.skip);
            let $b = ctx.registers[rb];
            ctx.registers[ra] = $value;
            Ok($crate::instructions::Flow::Next)
        });
    };
}

/// rD = f(rA) over the two-register format.
macro_rules! two_reg {
    ($name:ident = $opcode:expr, $mnemonic:literal, |$a:ident| $value:expr) => {
        instruction!($name = $opcode, $mnemonic, |ctx| {
            let (rd, ra) = $crate::instructions::operands::two_registers(ctx.operands);
            let $a = ctx.registers[ra];
            ctx.registers[rd] = $value;
            Ok($crate::instructions::Flow::Next)
        });
    };
}

pub mod arithmetic;
pub mod bitwise;
pub mod branching;
pub mod comparison;
pub mod control_flow;
pub mod memory;
pub mod operands;
pub mod register_ops;
pub mod registry;
pub mod shifts;

pub use registry::{registry, InstructionRegistry};

/// What the interpreter does after a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Advance past this instruction's operands.
    Next,
    /// Continue at an already validated block start.
    Jump(u32),
    Halt,
    /// `ecalli`: trap to the host with this call index.
    HostCall(u32),
}

pub type InstructionResult = Result<Flow, PanicReason>;

/// Everything a handler may read or mutate while executing one instruction.
pub struct InstructionContext<'a> {
    pub registers: &'a mut Registers,
    pub memory: &'a mut Memory,
    pub program: &'a Program,
    pub pc: u32,
    /// Zero-padded operand window following the opcode.
    pub operands: &'a [u8],
    /// Operand length ℓ.
    pub skip: u32,
}

impl InstructionContext<'_> {
    /// branch(target, condition): static jumps must land on a basic block start.
    pub fn branch(&self, target: u32, condition: bool) -> InstructionResult {
        if !condition {
            return Ok(Flow::Next);
        }
        if !self.program.is_block_start(target) {
            return Err(PanicReason::InvalidJumpTarget(target));
        }
        Ok(Flow::Jump(target))
    }

    /// djump(a) through the jump table. `a` is taken modulo 2^32.
    pub fn dynamic_jump(&self, address: u64) -> InstructionResult {
        let address = address as u32;
        if address == HALT_ADDRESS {
            return Ok(Flow::Halt);
        }
        let table = self.program.jump_table();
        let slot = (address / DYNAMIC_ADDRESS_ALIGNMENT) as usize;
        if address == 0 || address % DYNAMIC_ADDRESS_ALIGNMENT != 0 || slot > table.len() {
            return Err(PanicReason::InvalidJumpTarget(address));
        }
        Ok(Flow::Jump(table[slot - 1]))
    }

    /// Read `width` bytes at `address` (mod 2^32) as an unsigned little-endian value.
    pub fn load(&self, address: u64, width: usize) -> Result<u64, PanicReason> {
        let address = guest_address(address)?;
        let mut buf = [0u8; 8];
        self.memory.read_into(address, &mut buf[..width])?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Write the low `width` bytes of `value` at `address` (mod 2^32).
    pub fn store(&mut self, address: u64, value: u64, width: usize) -> Result<(), PanicReason> {
        let address = guest_address(address)?;
        self.memory.write(address, &value.to_le_bytes()[..width])?;
        Ok(())
    }
}

/// The first zone is never accessible to instructions. Touching it is a plain panic,
/// not a page fault.
fn guest_address(address: u64) -> Result<u32, PanicReason> {
    let address = address as u32;
    if address < ZONE_SIZE {
        return Err(PanicReason::ReservedAddress(address));
    }
    Ok(address)
}

/// Base trait for all instruction handlers.
pub trait InstructionHandler: Send + Sync {
    fn opcode(&self) -> u8;
    fn name(&self) -> &'static str;

    fn execute(&self, context: &mut InstructionContext<'_>) -> InstructionResult;

    fn disassemble(&self, operands: &[u8], skip: u32) -> String {
        let hex: String = operands
            .iter()
            .take(skip as usize)
            .map(|b| format!("{b:02x}"))
            .collect();
        format!("{} {}", self.name(), hex)
    }
}

/// Whether `opcode` is defined. Undefined opcodes end a basic block and panic when executed.
#[must_use]
pub fn is_known_opcode(opcode: u8) -> bool {
    registry().get(opcode).is_some()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Registers, memory and a program, stepped one handler at a time.
    pub struct Harness {
        pub registers: Registers,
        pub memory: Memory,
        pub program: Program,
    }

    impl Harness {
        pub fn new(code: &[u8], bitmask: &[u8], jump_table: Vec<u32>) -> Self {
            Self {
                registers: Registers::new(),
                memory: Memory::default(),
                program: Program::new(code, bitmask, jump_table).unwrap(),
            }
        }

        /// A program holding one instruction.
        pub fn single(opcode: u8, operands: &[u8]) -> Self {
            let mut code = vec![opcode];
            code.extend_from_slice(operands);
            let mut bitmask = vec![0u8; code.len()];
            bitmask[0] = 1;
            Self::new(&code, &bitmask, vec![])
        }

        pub fn exec_at(&mut self, pc: u32) -> InstructionResult {
            let opcode = self.program.opcode_at(pc).unwrap();
            let handler = registry().get(opcode).unwrap();
            let mut ctx = InstructionContext {
                registers: &mut self.registers,
                memory: &mut self.memory,
                program: &self.program,
                pc,
                operands: self.program.operands(pc),
                skip: self.program.skip(pc),
            };
            handler.execute(&mut ctx)
        }

        pub fn exec(&mut self) -> InstructionResult {
            self.exec_at(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use crate::config::{OPCODE_FALLTHROUGH, OPCODE_TRAP};
    use crate::memory::PageAccess;

    #[test]
    fn dynamic_jump_rules() {
        // trap | trap | trap, jump table -> [1, 2]
        let harness = Harness::new(
            &[OPCODE_TRAP, OPCODE_TRAP, OPCODE_TRAP],
            &[1, 1, 1],
            vec![1, 2],
        );
        let mut registers = Registers::new();
        let mut memory = Memory::default();
        let ctx = InstructionContext {
            registers: &mut registers,
            memory: &mut memory,
            program: &harness.program,
            pc: 0,
            operands: harness.program.operands(0),
            skip: 0,
        };
        assert_eq!(ctx.dynamic_jump(u64::from(HALT_ADDRESS)), Ok(Flow::Halt));
        assert_eq!(ctx.dynamic_jump(2), Ok(Flow::Jump(1)));
        assert_eq!(ctx.dynamic_jump(4), Ok(Flow::Jump(2)));
        assert_eq!(ctx.dynamic_jump(0), Err(PanicReason::InvalidJumpTarget(0)));
        assert_eq!(ctx.dynamic_jump(3), Err(PanicReason::InvalidJumpTarget(3)));
        assert_eq!(ctx.dynamic_jump(6), Err(PanicReason::InvalidJumpTarget(6)));
        // Upper bits are ignored.
        assert_eq!(ctx.dynamic_jump((1 << 32) | 2), Ok(Flow::Jump(1)));
    }

    #[test]
    fn branch_requires_block_start() {
        let harness = Harness::new(&[OPCODE_FALLTHROUGH, OPCODE_FALLTHROUGH, 0x33], &[1, 1, 1], vec![]);
        let mut registers = Registers::new();
        let mut memory = Memory::default();
        let ctx = InstructionContext {
            registers: &mut registers,
            memory: &mut memory,
            program: &harness.program,
            pc: 0,
            operands: harness.program.operands(0),
            skip: 0,
        };
        assert_eq!(ctx.branch(1, true), Ok(Flow::Jump(1)));
        assert_eq!(ctx.branch(7, false), Ok(Flow::Next));
        assert_eq!(ctx.branch(7, true), Err(PanicReason::InvalidJumpTarget(7)));
    }

    #[test]
    fn reserved_zone_panics() {
        let mut harness = Harness::single(OPCODE_FALLTHROUGH, &[]);
        harness.memory.map_page(0, PageAccess::ReadWrite).unwrap();
        let ctx = InstructionContext {
            registers: &mut harness.registers,
            memory: &mut harness.memory,
            program: &harness.program,
            pc: 0,
            operands: harness.program.operands(0),
            skip: 0,
        };
        assert_eq!(ctx.load(0x100, 4), Err(PanicReason::ReservedAddress(0x100)));
        assert_eq!(ctx.load(0xffff, 1), Err(PanicReason::ReservedAddress(0xffff)));
    }

    #[test]
    fn unknown_opcodes_are_not_registered() {
        assert!(is_known_opcode(OPCODE_TRAP));
        assert!(!is_known_opcode(2));
        assert!(!is_known_opcode(255));
    }
}
