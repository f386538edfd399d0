//! Instruction registry: opcode -> handler, built once and shared by every interpreter.

use super::arithmetic::*;
use super::bitwise::*;
use super::branching::*;
use super::comparison::*;
use super::control_flow::*;
use super::memory::*;
use super::register_ops::*;
use super::shifts::*;
use super::InstructionHandler;
use std::sync::OnceLock;

/// Central registry mapping opcodes to instruction handlers.
pub struct InstructionRegistry {
    handlers: Vec<Option<Box<dyn InstructionHandler>>>,
}

impl InstructionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: (0..=u8::MAX).map(|_| None).collect(),
        }
    }

    /// Registry holding the full instruction set.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        register_all_instructions(&mut registry);
        registry
    }

    /// Register a handler, replacing any previous handler for its opcode.
    pub fn register(&mut self, handler: Box<dyn InstructionHandler>) {
        let opcode = usize::from(handler.opcode());
        self.handlers[opcode] = Some(handler);
    }

    #[must_use]
    pub fn get(&self, opcode: u8) -> Option<&dyn InstructionHandler> {
        self.handlers[usize::from(opcode)].as_deref()
    }

    pub fn registered_opcodes(&self) -> impl Iterator<Item = u8> + '_ {
        self.handlers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_some())
            .map(|(opcode, _)| opcode as u8)
    }
}

impl Default for InstructionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide standard registry.
pub fn registry() -> &'static InstructionRegistry {
    static REGISTRY: OnceLock<InstructionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(InstructionRegistry::standard)
}

fn register_all_instructions(registry: &mut InstructionRegistry) {
    let handlers: Vec<Box<dyn InstructionHandler>> = vec![
        Box::new(TrapInstruction),
        Box::new(FallthroughInstruction),
        Box::new(EcalliInstruction),
        Box::new(JumpInstruction),
        Box::new(JumpIndInstruction),
        Box::new(LoadImmJumpInstruction),
        Box::new(LoadImmJumpIndInstruction),
        // memory
        Box::new(LoadImmInstruction),
        Box::new(LoadImm64Instruction),
        Box::new(StoreImmU8Instruction),
        Box::new(StoreImmU16Instruction),
        Box::new(StoreImmU32Instruction),
        Box::new(StoreImmU64Instruction),
        Box::new(LoadU8Instruction),
        Box::new(LoadI8Instruction),
        Box::new(LoadU16Instruction),
        Box::new(LoadI16Instruction),
        Box::new(LoadU32Instruction),
        Box::new(LoadI32Instruction),
        Box::new(LoadU64Instruction),
        Box::new(StoreU8Instruction),
        Box::new(StoreU16Instruction),
        Box::new(StoreU32Instruction),
        Box::new(StoreU64Instruction),
        Box::new(StoreImmIndU8Instruction),
        Box::new(StoreImmIndU16Instruction),
        Box::new(StoreImmIndU32Instruction),
        Box::new(StoreImmIndU64Instruction),
        Box::new(StoreIndU8Instruction),
        Box::new(StoreIndU16Instruction),
        Box::new(StoreIndU32Instruction),
        Box::new(StoreIndU64Instruction),
        Box::new(LoadIndU8Instruction),
        Box::new(LoadIndI8Instruction),
        Box::new(LoadIndU16Instruction),
        Box::new(LoadIndI16Instruction),
        Box::new(LoadIndU32Instruction),
        Box::new(LoadIndI32Instruction),
        Box::new(LoadIndU64Instruction),
        // branches
        Box::new(BranchEqImmInstruction),
        Box::new(BranchNeImmInstruction),
        Box::new(BranchLtUImmInstruction),
        Box::new(BranchLeUImmInstruction),
        Box::new(BranchGeUImmInstruction),
        Box::new(BranchGtUImmInstruction),
        Box::new(BranchLtSImmInstruction),
        Box::new(BranchLeSImmInstruction),
        Box::new(BranchGeSImmInstruction),
        Box::new(BranchGtSImmInstruction),
        Box::new(BranchEqInstruction),
        Box::new(BranchNeInstruction),
        Box::new(BranchLtUInstruction),
        Box::new(BranchLtSInstruction),
        Box::new(BranchGeUInstruction),
        Box::new(BranchGeSInstruction),
        // two registers
        Box::new(MoveRegInstruction),
        Box::new(SbrkInstruction),
        Box::new(CountSetBits64Instruction),
        Box::new(CountSetBits32Instruction),
        Box::new(LeadingZeroBits64Instruction),
        Box::new(LeadingZeroBits32Instruction),
        Box::new(TrailingZeroBits64Instruction),
        Box::new(TrailingZeroBits32Instruction),
        Box::new(SignExtend8Instruction),
        Box::new(SignExtend16Instruction),
        Box::new(ZeroExtend16Instruction),
        Box::new(ReverseBytesInstruction),
        // arithmetic
        Box::new(Add32Instruction),
        Box::new(Sub32Instruction),
        Box::new(Mul32Instruction),
        Box::new(DivU32Instruction),
        Box::new(DivS32Instruction),
        Box::new(RemU32Instruction),
        Box::new(RemS32Instruction),
        Box::new(Add64Instruction),
        Box::new(Sub64Instruction),
        Box::new(Mul64Instruction),
        Box::new(DivU64Instruction),
        Box::new(DivS64Instruction),
        Box::new(RemU64Instruction),
        Box::new(RemS64Instruction),
        Box::new(MulUpperSSInstruction),
        Box::new(MulUpperUUInstruction),
        Box::new(MulUpperSUInstruction),
        Box::new(AddImm32Instruction),
        Box::new(MulImm32Instruction),
        Box::new(NegAddImm32Instruction),
        Box::new(AddImm64Instruction),
        Box::new(MulImm64Instruction),
        Box::new(NegAddImm64Instruction),
        // bitwise
        Box::new(AndInstruction),
        Box::new(XorInstruction),
        Box::new(OrInstruction),
        Box::new(AndInvInstruction),
        Box::new(OrInvInstruction),
        Box::new(XnorInstruction),
        Box::new(AndImmInstruction),
        Box::new(XorImmInstruction),
        Box::new(OrImmInstruction),
        // comparison
        Box::new(SetLtUInstruction),
        Box::new(SetLtSInstruction),
        Box::new(SetLtUImmInstruction),
        Box::new(SetLtSImmInstruction),
        Box::new(SetGtUImmInstruction),
        Box::new(SetGtSImmInstruction),
        Box::new(CmovIzInstruction),
        Box::new(CmovNzInstruction),
        Box::new(CmovIzImmInstruction),
        Box::new(CmovNzImmInstruction),
        Box::new(MaxInstruction),
        Box::new(MaxUInstruction),
        Box::new(MinInstruction),
        Box::new(MinUInstruction),
        // shifts and rotations
        Box::new(ShloL32Instruction),
        Box::new(ShloR32Instruction),
        Box::new(SharR32Instruction),
        Box::new(ShloL64Instruction),
        Box::new(ShloR64Instruction),
        Box::new(SharR64Instruction),
        Box::new(ShloLImm32Instruction),
        Box::new(ShloRImm32Instruction),
        Box::new(SharRImm32Instruction),
        Box::new(ShloLImmAlt32Instruction),
        Box::new(ShloRImmAlt32Instruction),
        Box::new(SharRImmAlt32Instruction),
        Box::new(ShloLImm64Instruction),
        Box::new(ShloRImm64Instruction),
        Box::new(SharRImm64Instruction),
        Box::new(ShloLImmAlt64Instruction),
        Box::new(ShloRImmAlt64Instruction),
        Box::new(SharRImmAlt64Instruction),
        Box::new(RotR64ImmInstruction),
        Box::new(RotR64ImmAltInstruction),
        Box::new(RotR32ImmInstruction),
        Box::new(RotR32ImmAltInstruction),
        Box::new(RotL64Instruction),
        Box::new(RotL32Instruction),
        Box::new(RotR64Instruction),
        Box::new(RotR32Instruction),
    ];
    for handler in handlers {
        registry.register(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OPCODE_ECALLI, OPCODE_MIN_U, OPCODE_TRAP};

    #[test]
    fn standard_set_is_complete() {
        assert_eq!(registry().registered_opcodes().count(), 139);
        assert_eq!(registry().get(OPCODE_ECALLI).map(|h| h.name()), Some("ECALLI"));
        assert_eq!(registry().get(OPCODE_MIN_U).map(|h| h.opcode()), Some(OPCODE_MIN_U));
    }

    #[test]
    fn handlers_register_under_their_own_opcode() {
        for opcode in registry().registered_opcodes() {
            assert_eq!(registry().get(opcode).map(|h| h.opcode()), Some(opcode));
        }
    }

    #[test]
    fn disassembly_shows_operand_bytes() {
        let trap = registry().get(OPCODE_TRAP).unwrap();
        assert_eq!(trap.disassemble(&[0xab, 0xcd], 1), "TRAP ab");
    }
}
