//! Program decoding and validation (Gray Paper 7.1-7.3 and A.37).
//!
//! A [`Program`] is immutable once built and safe to share between concurrent invocations.
//! Construction validates the bitmask against the code and every jump table entry against the
//! basic-block set, so nothing malformed is discovered mid-execution.

use crate::codec::{encode_natural, Reader};
use crate::config::{
    align_to_page, align_to_zone, is_termination_instruction, ADDRESS_SPACE_SIZE, ARGS_SEGMENT_START,
    HALT_ADDRESS, INIT_INPUT_SIZE, PAGE_SIZE, STACK_SEGMENT_END, ZONE_SIZE,
};
use crate::crypto::{blake2b256, Hash};
use crate::error::ProgramError;
use crate::instructions;
use crate::memory::{Memory, PageAccess};
use crate::types::Registers;

/// Longest distance between instruction starts that the decoder considers.
pub const MAX_SKIP: u32 = 24;

const MAX_JUMP_TABLE_ENTRIES: u64 = 1 << 20;
const MAX_JUMP_ENTRY_SIZE: u64 = 8;
const MAX_CODE_LENGTH: u64 = 1 << 22;

/// Zero bytes appended to the code so operand windows never run off the end.
const OPERAND_WINDOW: usize = MAX_SKIP as usize + 1;

const INSTRUCTION_START: u8 = 0b01;
const BLOCK_START: u8 = 0b10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    /// Code followed by `OPERAND_WINDOW` zero bytes.
    code: Vec<u8>,
    code_len: usize,
    /// Per position: `INSTRUCTION_START` and/or `BLOCK_START`.
    flags: Vec<u8>,
    /// Fskip per position (only meaningful at instruction starts).
    skips: Vec<u8>,
    jump_table: Vec<u32>,
    code_hash: Hash,
}

impl Program {
    /// Build from code, a one-flag-per-byte bitmask (non-zero marks an instruction start) and
    /// the jump table.
    pub fn new(code: &[u8], bitmask: &[u8], jump_table: Vec<u32>) -> Result<Self, ProgramError> {
        if bitmask.len() != code.len() {
            return Err(ProgramError::BitmaskLengthMismatch {
                code: code.len(),
                bitmask: bitmask.len(),
            });
        }
        if bitmask.first().is_some_and(|&b| b == 0) {
            return Err(ProgramError::MissingInstructionStart);
        }

        let code_len = code.len();
        let mut flags: Vec<u8> = bitmask
            .iter()
            .map(|&b| if b != 0 { INSTRUCTION_START } else { 0 })
            .collect();

        // Fskip(i) = min(24, distance to the next set bit), with the bitmask extended by ones.
        let mut skips = vec![0u8; code_len];
        let mut next_start = code_len;
        for i in (0..code_len).rev() {
            skips[i] = (next_start - i - 1).min(MAX_SKIP as usize) as u8;
            if flags[i] & INSTRUCTION_START != 0 {
                next_start = i;
            }
        }

        if code_len > 0 {
            flags[0] |= BLOCK_START;
        }
        for i in 0..code_len {
            if flags[i] & INSTRUCTION_START == 0 {
                continue;
            }
            let opcode = code[i];
            if is_termination_instruction(opcode) || !instructions::is_known_opcode(opcode) {
                let next = i + 1 + usize::from(skips[i]);
                if next < code_len && flags[next] & INSTRUCTION_START != 0 {
                    flags[next] |= BLOCK_START;
                }
            }
        }

        for (index, &target) in jump_table.iter().enumerate() {
            let position = target as usize;
            if position >= code_len {
                return Err(ProgramError::JumpTargetOutOfBounds {
                    index,
                    target,
                    code_len,
                });
            }
            if flags[position] & BLOCK_START == 0 {
                return Err(ProgramError::JumpTargetNotBlockStart { index, target });
            }
        }

        let mut padded = Vec::with_capacity(code_len + OPERAND_WINDOW);
        padded.extend_from_slice(code);
        padded.resize(code_len + OPERAND_WINDOW, 0);

        Ok(Self {
            code: padded,
            code_len,
            flags,
            skips,
            jump_table,
            code_hash: blake2b256(code),
        })
    }

    /// Decode a program blob: `E(|j|) ++ E1(z) ++ E(|c|) ++ Ez(j) ++ c ++ k`, with `k` the
    /// packed bitmask of exactly ceil(|c| / 8) bytes.
    pub fn from_blob(blob: &[u8]) -> Result<Self, ProgramError> {
        let mut reader = Reader::new(blob);
        let truncated = ProgramError::MalformedBlob("truncated");

        let entries = reader.natural().ok_or(truncated.clone())?;
        check_limit("jump table length", entries, MAX_JUMP_TABLE_ENTRIES)?;
        let entry_size = reader.fixed(1).ok_or(truncated.clone())?;
        check_limit("jump table entry size", entry_size, MAX_JUMP_ENTRY_SIZE)?;
        let code_len = reader.natural().ok_or(truncated.clone())?;
        check_limit("code length", code_len, MAX_CODE_LENGTH)?;

        let mut jump_table = Vec::with_capacity(entries as usize);
        for _ in 0..entries {
            let target = reader.fixed(entry_size as usize).ok_or(truncated.clone())?;
            // Oversized targets are rejected by the bounds check below.
            jump_table.push(u32::try_from(target).unwrap_or(u32::MAX));
        }

        let code = reader.bytes(code_len as usize).ok_or(truncated.clone())?;
        let packed = reader
            .bytes((code_len as usize).div_ceil(8))
            .ok_or(truncated)?;
        if reader.remaining() != 0 {
            return Err(ProgramError::MalformedBlob("trailing bytes after bitmask"));
        }

        let bitmask: Vec<u8> = (0..code.len())
            .map(|i| (packed[i / 8] >> (i % 8)) & 1)
            .collect();
        Self::new(code, &bitmask, jump_table)
    }

    /// Inverse of [`Program::from_blob`], using 4-byte jump table entries.
    #[must_use]
    pub fn to_blob(&self) -> Vec<u8> {
        encode_blob(self.code(), &self.bitmask(), &self.jump_table)
    }

    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code[..self.code_len]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.code_len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.code_len == 0
    }

    /// One flag per code byte, 1 at instruction starts.
    #[must_use]
    pub fn bitmask(&self) -> Vec<u8> {
        self.flags.iter().map(|f| f & INSTRUCTION_START).collect()
    }

    #[must_use]
    pub fn jump_table(&self) -> &[u32] {
        &self.jump_table
    }

    #[must_use]
    pub const fn code_hash(&self) -> &Hash {
        &self.code_hash
    }

    #[must_use]
    pub fn is_instruction_start(&self, pc: u32) -> bool {
        self.flags
            .get(pc as usize)
            .is_some_and(|f| f & INSTRUCTION_START != 0)
    }

    #[must_use]
    pub fn is_block_start(&self, pc: u32) -> bool {
        self.flags.get(pc as usize).is_some_and(|f| f & BLOCK_START != 0)
    }

    /// Fskip(pc): operand length of the instruction at `pc`.
    #[must_use]
    pub fn skip(&self, pc: u32) -> u32 {
        self.skips
            .get(pc as usize)
            .map_or(MAX_SKIP, |&s| u32::from(s))
    }

    #[must_use]
    pub fn opcode_at(&self, pc: u32) -> Option<u8> {
        if (pc as usize) < self.code_len {
            Some(self.code[pc as usize])
        } else {
            None
        }
    }

    /// The bytes following the opcode at `pc`, zero-extended past the end of code.
    #[must_use]
    pub fn operands(&self, pc: u32) -> &[u8] {
        let start = (pc as usize + 1).min(self.code_len);
        &self.code[start..start + OPERAND_WINDOW]
    }
}

fn check_limit(what: &'static str, value: u64, limit: u64) -> Result<(), ProgramError> {
    if value > limit {
        return Err(ProgramError::LimitExceeded { what, value, limit });
    }
    Ok(())
}

/// Encode code, bitmask and jump table as a program blob.
#[must_use]
pub fn encode_blob(code: &[u8], bitmask: &[u8], jump_table: &[u32]) -> Vec<u8> {
    let mut out = encode_natural(jump_table.len() as u64);
    out.push(4);
    out.extend(encode_natural(code.len() as u64));
    for target in jump_table {
        out.extend_from_slice(&target.to_le_bytes());
    }
    out.extend_from_slice(code);
    let mut packed = vec![0u8; code.len().div_ceil(8)];
    for (i, _) in bitmask.iter().enumerate().filter(|(_, &b)| b != 0) {
        packed[i / 8] |= 1 << (i % 8);
    }
    out.extend(packed);
    out
}

// ============================================================================
// Standard program (Gray Paper A.37)
// ============================================================================

/// Service code layout: `E3(|o|) ++ E3(|w|) ++ E2(z) ++ E3(s) ++ o ++ w ++ E4(|c|) ++ c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardProgram {
    pub program: Program,
    pub ro_data: Vec<u8>,
    pub rw_data: Vec<u8>,
    /// Zero-initialised heap pages after the read-write data.
    pub heap_pages: u16,
    pub stack_size: u32,
}

impl StandardProgram {
    pub fn decode(blob: &[u8]) -> Result<Self, ProgramError> {
        let truncated = ProgramError::MalformedBlob("truncated standard program");
        let mut reader = Reader::new(blob);
        let ro_len = reader.fixed(3).ok_or(truncated.clone())?;
        let rw_len = reader.fixed(3).ok_or(truncated.clone())?;
        let heap_pages = reader.fixed(2).ok_or(truncated.clone())? as u16;
        let stack_size = reader.fixed(3).ok_or(truncated.clone())? as u32;
        let ro_data = reader.bytes(ro_len as usize).ok_or(truncated.clone())?.to_vec();
        let rw_data = reader.bytes(rw_len as usize).ok_or(truncated.clone())?.to_vec();
        let code_len = reader.fixed(4).ok_or(truncated.clone())?;
        let code = reader.bytes(code_len as usize).ok_or(truncated)?;
        if reader.remaining() != 0 {
            return Err(ProgramError::MalformedBlob("trailing bytes after code"));
        }
        let standard = Self {
            program: Program::from_blob(code)?,
            ro_data,
            rw_data,
            heap_pages,
            stack_size,
        };
        if standard.required_space() > ADDRESS_SPACE_SIZE {
            return Err(ProgramError::InvalidLayout);
        }
        Ok(standard)
    }

    /// Decode a preimage holding `E(|m|) ++ m ++ standard program`. Returns the metadata too.
    pub fn decode_with_metadata(preimage: &[u8]) -> Result<(Vec<u8>, Self), ProgramError> {
        let mut reader = Reader::new(preimage);
        let truncated = ProgramError::MalformedBlob("truncated metadata");
        let len = reader.natural().ok_or(truncated.clone())?;
        let metadata = reader.bytes(len as usize).ok_or(truncated)?.to_vec();
        let rest = reader.bytes(reader.remaining()).unwrap_or_default();
        Ok((metadata, Self::decode(rest)?))
    }

    fn heap_bytes(&self) -> u64 {
        u64::from(self.heap_pages) * u64::from(PAGE_SIZE)
    }

    /// 5Z + Z(|o|) + Z(|w| + zP) + Z(s) + Z_I.
    fn required_space(&self) -> u64 {
        5 * u64::from(ZONE_SIZE)
            + align_to_zone(self.ro_data.len() as u64)
            + align_to_zone(self.rw_data.len() as u64 + self.heap_bytes())
            + align_to_zone(u64::from(self.stack_size))
            + u64::from(INIT_INPUT_SIZE)
    }

    /// Initial registers and memory for running this program with `args`.
    pub fn initial_state(&self, args: &[u8], max_memory: u64) -> Result<(Registers, Memory), ProgramError> {
        if args.len() as u64 > u64::from(INIT_INPUT_SIZE) {
            return Err(ProgramError::InvalidLayout);
        }
        let layout = |_| ProgramError::InvalidLayout;
        let zone = u64::from(ZONE_SIZE);
        let mut memory = Memory::new(max_memory);

        let ro_start = zone;
        let ro_len = align_to_page(self.ro_data.len() as u64);
        memory
            .initialize(ro_start as u32, ro_len as u32, &self.ro_data, PageAccess::ReadOnly)
            .map_err(layout)?;

        let rw_start = 2 * zone + align_to_zone(self.ro_data.len() as u64);
        let rw_len = align_to_page(self.rw_data.len() as u64) + self.heap_bytes();
        memory
            .initialize(rw_start as u32, rw_len as u32, &self.rw_data, PageAccess::ReadWrite)
            .map_err(layout)?;
        let heap = (rw_start + rw_len) as u32;
        memory.set_heap(heap, heap);

        let stack_len = align_to_page(u64::from(self.stack_size));
        memory
            .initialize(
                STACK_SEGMENT_END - stack_len as u32,
                stack_len as u32,
                &[],
                PageAccess::ReadWrite,
            )
            .map_err(layout)?;

        memory
            .initialize(
                ARGS_SEGMENT_START,
                align_to_page(args.len() as u64) as u32,
                args,
                PageAccess::ReadOnly,
            )
            .map_err(layout)?;

        let mut registers = Registers::new();
        registers[0] = u64::from(HALT_ADDRESS);
        registers[1] = u64::from(STACK_SEGMENT_END);
        registers[7] = u64::from(ARGS_SEGMENT_START);
        registers[8] = args.len() as u64;
        Ok((registers, memory))
    }
}
