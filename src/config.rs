//! Engine configuration: protocol constants, opcode and host-call numbering, and
//! the immutable cost/limit objects bound to an [`Engine`](crate::Engine).
//! Numbering follows Gray Paper Appendix A (instructions) and B.7 (host calls).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Memory Configuration
// ============================================================================
/// Cpvmpagesize.
pub const PAGE_SIZE: u32 = 4096;
/// Cpvminitzonesize. Addresses below one zone are never accessible to instructions.
pub const ZONE_SIZE: u32 = 65_536;
/// Cpvminitinputsize.
pub const INIT_INPUT_SIZE: u32 = 16_777_216;
/// Cpvmdynaddralign.
pub const DYNAMIC_ADDRESS_ALIGNMENT: u32 = 2;
/// Full 32-bit address space.
pub const ADDRESS_SPACE_SIZE: u64 = 1 << 32;
/// Number of pages in the 32-bit address space.
pub const PAGE_COUNT: u32 = (ADDRESS_SPACE_SIZE / PAGE_SIZE as u64) as u32;

// ============================================================================
// Register Initialization Constants (Gray Paper equation 803-811)
// ============================================================================
/// r0: jumping here halts the machine. 2^32 - 2^16.
pub const HALT_ADDRESS: u32 = 0xFFFF_0000;
/// r1: stack segment end (exclusive). 2^32 - 2*Z_Z - Z_I.
pub const STACK_SEGMENT_END: u32 = 0xFEFE_0000;
/// r7: arguments segment start. 2^32 - Z_Z - Z_I.
pub const ARGS_SEGMENT_START: u32 = 0xFEFF_0000;

// ============================================================================
// Inner machine exit codes (written to r7 by INVOKE)
// ============================================================================
pub const RESULT_CODE_HALT: u64 = 0;
pub const RESULT_CODE_PANIC: u64 = 1;
pub const RESULT_CODE_FAULT: u64 = 2;
pub const RESULT_CODE_HOST: u64 = 3;
pub const RESULT_CODE_OOG: u64 = 4;

// ============================================================================
// Opcodes (Gray Paper Appendix A)
// ============================================================================
pub const OPCODE_TRAP: u8 = 0;
pub const OPCODE_FALLTHROUGH: u8 = 1;
pub const OPCODE_ECALLI: u8 = 10;
pub const OPCODE_LOAD_IMM_64: u8 = 20;
pub const OPCODE_STORE_IMM_U8: u8 = 30;
pub const OPCODE_STORE_IMM_U16: u8 = 31;
pub const OPCODE_STORE_IMM_U32: u8 = 32;
pub const OPCODE_STORE_IMM_U64: u8 = 33;
pub const OPCODE_JUMP: u8 = 40;
pub const OPCODE_JUMP_IND: u8 = 50;
pub const OPCODE_LOAD_IMM: u8 = 51;
pub const OPCODE_LOAD_U8: u8 = 52;
pub const OPCODE_LOAD_I8: u8 = 53;
pub const OPCODE_LOAD_U16: u8 = 54;
pub const OPCODE_LOAD_I16: u8 = 55;
pub const OPCODE_LOAD_U32: u8 = 56;
pub const OPCODE_LOAD_I32: u8 = 57;
pub const OPCODE_LOAD_U64: u8 = 58;
pub const OPCODE_STORE_U8: u8 = 59;
pub const OPCODE_STORE_U16: u8 = 60;
pub const OPCODE_STORE_U32: u8 = 61;
pub const OPCODE_STORE_U64: u8 = 62;
pub const OPCODE_STORE_IMM_IND_U8: u8 = 70;
pub const OPCODE_STORE_IMM_IND_U16: u8 = 71;
pub const OPCODE_STORE_IMM_IND_U32: u8 = 72;
pub const OPCODE_STORE_IMM_IND_U64: u8 = 73;
pub const OPCODE_LOAD_IMM_JUMP: u8 = 80;
pub const OPCODE_BRANCH_EQ_IMM: u8 = 81;
pub const OPCODE_BRANCH_NE_IMM: u8 = 82;
pub const OPCODE_BRANCH_LT_U_IMM: u8 = 83;
pub const OPCODE_BRANCH_LE_U_IMM: u8 = 84;
pub const OPCODE_BRANCH_GE_U_IMM: u8 = 85;
pub const OPCODE_BRANCH_GT_U_IMM: u8 = 86;
pub const OPCODE_BRANCH_LT_S_IMM: u8 = 87;
pub const OPCODE_BRANCH_LE_S_IMM: u8 = 88;
pub const OPCODE_BRANCH_GE_S_IMM: u8 = 89;
pub const OPCODE_BRANCH_GT_S_IMM: u8 = 90;
pub const OPCODE_MOVE_REG: u8 = 100;
pub const OPCODE_SBRK: u8 = 101;
pub const OPCODE_COUNT_SET_BITS_64: u8 = 102;
pub const OPCODE_COUNT_SET_BITS_32: u8 = 103;
pub const OPCODE_LEADING_ZERO_BITS_64: u8 = 104;
pub const OPCODE_LEADING_ZERO_BITS_32: u8 = 105;
pub const OPCODE_TRAILING_ZERO_BITS_64: u8 = 106;
pub const OPCODE_TRAILING_ZERO_BITS_32: u8 = 107;
pub const OPCODE_SIGN_EXTEND_8: u8 = 108;
pub const OPCODE_SIGN_EXTEND_16: u8 = 109;
pub const OPCODE_ZERO_EXTEND_16: u8 = 110;
pub const OPCODE_REVERSE_BYTES: u8 = 111;
pub const OPCODE_STORE_IND_U8: u8 = 120;
pub const OPCODE_STORE_IND_U16: u8 = 121;
pub const OPCODE_STORE_IND_U32: u8 = 122;
pub const OPCODE_STORE_IND_U64: u8 = 123;
pub const OPCODE_LOAD_IND_U8: u8 = 124;
pub const OPCODE_LOAD_IND_I8: u8 = 125;
pub const OPCODE_LOAD_IND_U16: u8 = 126;
pub const OPCODE_LOAD_IND_I16: u8 = 127;
pub const OPCODE_LOAD_IND_U32: u8 = 128;
pub const OPCODE_LOAD_IND_I32: u8 = 129;
pub const OPCODE_LOAD_IND_U64: u8 = 130;
pub const OPCODE_ADD_IMM_32: u8 = 131;
pub const OPCODE_AND_IMM: u8 = 132;
pub const OPCODE_XOR_IMM: u8 = 133;
pub const OPCODE_OR_IMM: u8 = 134;
pub const OPCODE_MUL_IMM_32: u8 = 135;
pub const OPCODE_SET_LT_U_IMM: u8 = 136;
pub const OPCODE_SET_LT_S_IMM: u8 = 137;
pub const OPCODE_SHLO_L_IMM_32: u8 = 138;
pub const OPCODE_SHLO_R_IMM_32: u8 = 139;
pub const OPCODE_SHAR_R_IMM_32: u8 = 140;
pub const OPCODE_NEG_ADD_IMM_32: u8 = 141;
pub const OPCODE_SET_GT_U_IMM: u8 = 142;
pub const OPCODE_SET_GT_S_IMM: u8 = 143;
pub const OPCODE_SHLO_L_IMM_ALT_32: u8 = 144;
pub const OPCODE_SHLO_R_IMM_ALT_32: u8 = 145;
pub const OPCODE_SHAR_R_IMM_ALT_32: u8 = 146;
pub const OPCODE_CMOV_IZ_IMM: u8 = 147;
pub const OPCODE_CMOV_NZ_IMM: u8 = 148;
pub const OPCODE_ADD_IMM_64: u8 = 149;
pub const OPCODE_MUL_IMM_64: u8 = 150;
pub const OPCODE_SHLO_L_IMM_64: u8 = 151;
pub const OPCODE_SHLO_R_IMM_64: u8 = 152;
pub const OPCODE_SHAR_R_IMM_64: u8 = 153;
pub const OPCODE_NEG_ADD_IMM_64: u8 = 154;
pub const OPCODE_SHLO_L_IMM_ALT_64: u8 = 155;
pub const OPCODE_SHLO_R_IMM_ALT_64: u8 = 156;
pub const OPCODE_SHAR_R_IMM_ALT_64: u8 = 157;
pub const OPCODE_ROT_R_64_IMM: u8 = 158;
pub const OPCODE_ROT_R_64_IMM_ALT: u8 = 159;
pub const OPCODE_ROT_R_32_IMM: u8 = 160;
pub const OPCODE_ROT_R_32_IMM_ALT: u8 = 161;
pub const OPCODE_BRANCH_EQ: u8 = 170;
pub const OPCODE_BRANCH_NE: u8 = 171;
pub const OPCODE_BRANCH_LT_U: u8 = 172;
pub const OPCODE_BRANCH_LT_S: u8 = 173;
pub const OPCODE_BRANCH_GE_U: u8 = 174;
pub const OPCODE_BRANCH_GE_S: u8 = 175;
pub const OPCODE_LOAD_IMM_JUMP_IND: u8 = 180;
pub const OPCODE_ADD_32: u8 = 190;
pub const OPCODE_SUB_32: u8 = 191;
pub const OPCODE_MUL_32: u8 = 192;
pub const OPCODE_DIV_U_32: u8 = 193;
pub const OPCODE_DIV_S_32: u8 = 194;
pub const OPCODE_REM_U_32: u8 = 195;
pub const OPCODE_REM_S_32: u8 = 196;
pub const OPCODE_SHLO_L_32: u8 = 197;
pub const OPCODE_SHLO_R_32: u8 = 198;
pub const OPCODE_SHAR_R_32: u8 = 199;
pub const OPCODE_ADD_64: u8 = 200;
pub const OPCODE_SUB_64: u8 = 201;
pub const OPCODE_MUL_64: u8 = 202;
pub const OPCODE_DIV_U_64: u8 = 203;
pub const OPCODE_DIV_S_64: u8 = 204;
pub const OPCODE_REM_U_64: u8 = 205;
pub const OPCODE_REM_S_64: u8 = 206;
pub const OPCODE_SHLO_L_64: u8 = 207;
pub const OPCODE_SHLO_R_64: u8 = 208;
pub const OPCODE_SHAR_R_64: u8 = 209;
pub const OPCODE_AND: u8 = 210;
pub const OPCODE_XOR: u8 = 211;
pub const OPCODE_OR: u8 = 212;
pub const OPCODE_MUL_UPPER_S_S: u8 = 213;
pub const OPCODE_MUL_UPPER_U_U: u8 = 214;
pub const OPCODE_MUL_UPPER_S_U: u8 = 215;
pub const OPCODE_SET_LT_U: u8 = 216;
pub const OPCODE_SET_LT_S: u8 = 217;
pub const OPCODE_CMOV_IZ: u8 = 218;
pub const OPCODE_CMOV_NZ: u8 = 219;
pub const OPCODE_ROT_L_64: u8 = 220;
pub const OPCODE_ROT_L_32: u8 = 221;
pub const OPCODE_ROT_R_64: u8 = 222;
pub const OPCODE_ROT_R_32: u8 = 223;
pub const OPCODE_AND_INV: u8 = 224;
pub const OPCODE_OR_INV: u8 = 225;
pub const OPCODE_XNOR: u8 = 226;
pub const OPCODE_MAX: u8 = 227;
pub const OPCODE_MAX_U: u8 = 228;
pub const OPCODE_MIN: u8 = 229;
pub const OPCODE_MIN_U: u8 = 230;

/// Opcodes that end a basic block. Unknown opcodes also end one (they trap).
#[must_use]
pub const fn is_termination_instruction(opcode: u8) -> bool {
    matches!(
        opcode,
        OPCODE_TRAP
            | OPCODE_FALLTHROUGH
            | OPCODE_JUMP
            | OPCODE_JUMP_IND
            | OPCODE_LOAD_IMM_JUMP
            | OPCODE_LOAD_IMM_JUMP_IND
            | OPCODE_BRANCH_EQ_IMM..=OPCODE_BRANCH_GT_S_IMM
            | OPCODE_BRANCH_EQ..=OPCODE_BRANCH_GE_S
    )
}

// ============================================================================
// Host Function Identifiers (Gray Paper Appendix B.7)
// ============================================================================
pub const FUNC_GAS: u32 = 0;
pub const FUNC_FETCH: u32 = 1;
pub const FUNC_LOOKUP: u32 = 2;
pub const FUNC_READ: u32 = 3;
pub const FUNC_WRITE: u32 = 4;
pub const FUNC_INFO: u32 = 5;
pub const FUNC_HISTORICAL_LOOKUP: u32 = 6;
pub const FUNC_EXPORT: u32 = 7;
pub const FUNC_MACHINE: u32 = 8;
pub const FUNC_PEEK: u32 = 9;
pub const FUNC_POKE: u32 = 10;
pub const FUNC_PAGES: u32 = 11;
pub const FUNC_INVOKE: u32 = 12;
pub const FUNC_EXPUNGE: u32 = 13;
pub const FUNC_BLESS: u32 = 14;
pub const FUNC_ASSIGN: u32 = 15;
pub const FUNC_DESIGNATE: u32 = 16;
pub const FUNC_CHECKPOINT: u32 = 17;
pub const FUNC_NEW: u32 = 18;
pub const FUNC_UPGRADE: u32 = 19;
pub const FUNC_TRANSFER: u32 = 20;
pub const FUNC_EJECT: u32 = 21;
pub const FUNC_QUERY: u32 = 22;
pub const FUNC_SOLICIT: u32 = 23;
pub const FUNC_FORGET: u32 = 24;
pub const FUNC_YIELD: u32 = 25;
pub const FUNC_PROVIDE: u32 = 26;
/// JIP-1 debug log.
pub const FUNC_LOG: u32 = 100;

// ============================================================================
// Host-call result codes (Gray Paper section 31.2), written to r7
// ============================================================================
pub const REG_NONE: u64 = u64::MAX; // 2^64 - 1
/// Unknown host call.
pub const REG_WHAT: u64 = u64::MAX - 1;
pub const REG_OOB: u64 = u64::MAX - 2;
pub const REG_WHO: u64 = u64::MAX - 3;
pub const REG_FULL: u64 = u64::MAX - 4;
pub const REG_CORE: u64 = u64::MAX - 5;
pub const REG_CASH: u64 = u64::MAX - 6;
pub const REG_LOW: u64 = u64::MAX - 7;
pub const REG_HUH: u64 = u64::MAX - 8;
pub const REG_OK: u64 = 0;

// ============================================================================
// Service constants
// ============================================================================
pub const MIN_PUBLIC_INDEX: u32 = 65_536;
/// Bytes of a transfer memo (W_T).
pub const MEMO_SIZE: u32 = 128;
/// Bytes of one validator key set in the staging set.
pub const VALIDATOR_KEY_SIZE: u32 = 336;
/// Size of the INFO host call payload.
pub const SERVICE_INFO_SIZE: usize = 96;

// ============================================================================
// Gas cost table
// ============================================================================

/// Table-driven gas costs. Pure function of instruction/call identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasCostTable {
    /// Base cost charged before every instruction.
    pub instruction: u64,
    /// Cost of a supported host call without an entry in `host_calls`.
    pub host_call_base: u64,
    /// Per-index overrides.
    pub host_calls: BTreeMap<u32, u64>,
    /// Cost charged when a context does not recognise the call index.
    pub unknown_host_call: u64,
}

impl GasCostTable {
    #[must_use]
    pub fn host_call_cost(&self, index: u32) -> u64 {
        self.host_calls.get(&index).copied().unwrap_or(self.host_call_base)
    }
}

impl Default for GasCostTable {
    fn default() -> Self {
        Self {
            instruction: 1,
            host_call_base: 10,
            host_calls: BTreeMap::new(),
            unknown_host_call: 10,
        }
    }
}

// ============================================================================
// Protocol constants (FETCH selector 0 and deposit rules)
// ============================================================================

/// Chain parameters visible to services. Field names follow the Gray Paper symbols.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConstants {
    /// B_I: additional minimum balance per storage item.
    pub item_deposit: u64,
    /// B_L: additional minimum balance per octet.
    pub byte_deposit: u64,
    /// B_S: basic minimum balance of every service.
    pub base_deposit: u64,
    /// C
    pub core_count: u16,
    /// D: preimage expunge period.
    pub expunge_period: u32,
    /// E
    pub epoch_length: u32,
    /// G_A
    pub report_accumulate_gas: u64,
    /// G_I
    pub is_authorized_gas: u64,
    /// G_R
    pub refine_gas: u64,
    /// G_T
    pub total_accumulate_gas: u64,
    /// H
    pub recent_history_length: u16,
    /// I
    pub max_work_items: u16,
    /// J
    pub max_report_dependencies: u16,
    /// K
    pub max_tickets_per_extrinsic: u16,
    /// L
    pub max_lookup_anchor_age: u32,
    /// N
    pub tickets_per_validator: u16,
    /// O
    pub auth_pool_size: u16,
    /// P
    pub slot_period: u16,
    /// Q
    pub auth_queue_size: u16,
    /// R
    pub rotation_period: u16,
    /// T
    pub max_extrinsics: u16,
    /// U
    pub assurance_timeout: u16,
    /// V
    pub validator_count: u16,
    /// W_A
    pub max_authorizer_code_size: u32,
    /// W_B
    pub max_bundle_size: u32,
    /// W_C
    pub max_service_code_size: u32,
    /// W_E
    pub erasure_piece_size: u32,
    /// W_M
    pub max_imports: u32,
    /// W_P
    pub pieces_per_segment: u32,
    /// W_R
    pub max_report_size: u32,
    /// W_T
    pub memo_size: u32,
    /// W_X
    pub max_exports: u32,
    /// Y
    pub contest_duration: u32,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        Self {
            item_deposit: 10,
            byte_deposit: 1,
            base_deposit: 100,
            core_count: 341,
            expunge_period: 19_200,
            epoch_length: 600,
            report_accumulate_gas: 10_000_000,
            is_authorized_gas: 50_000_000,
            refine_gas: 5_000_000_000,
            total_accumulate_gas: 3_500_000_000,
            recent_history_length: 8,
            max_work_items: 16,
            max_report_dependencies: 8,
            max_tickets_per_extrinsic: 16,
            max_lookup_anchor_age: 14_400,
            tickets_per_validator: 2,
            auth_pool_size: 8,
            slot_period: 6,
            auth_queue_size: 80,
            rotation_period: 10,
            max_extrinsics: 128,
            assurance_timeout: 5,
            validator_count: 1023,
            max_authorizer_code_size: 64_000,
            max_bundle_size: 13_791_360,
            max_service_code_size: 4_000_000,
            erasure_piece_size: 684,
            max_imports: 3072,
            pieces_per_segment: 6,
            max_report_size: 49_152,
            memo_size: MEMO_SIZE,
            max_exports: 3072,
            contest_duration: 500,
        }
    }
}

impl ProtocolConstants {
    /// W_G = W_E * W_P.
    #[must_use]
    pub const fn segment_size(&self) -> u32 {
        self.erasure_piece_size * self.pieces_per_segment
    }

    /// FETCH selector 0 payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(134);
        out.extend_from_slice(&self.item_deposit.to_le_bytes());
        out.extend_from_slice(&self.byte_deposit.to_le_bytes());
        out.extend_from_slice(&self.base_deposit.to_le_bytes());
        out.extend_from_slice(&self.core_count.to_le_bytes());
        out.extend_from_slice(&self.expunge_period.to_le_bytes());
        out.extend_from_slice(&self.epoch_length.to_le_bytes());
        out.extend_from_slice(&self.report_accumulate_gas.to_le_bytes());
        out.extend_from_slice(&self.is_authorized_gas.to_le_bytes());
        out.extend_from_slice(&self.refine_gas.to_le_bytes());
        out.extend_from_slice(&self.total_accumulate_gas.to_le_bytes());
        for v in [
            self.recent_history_length,
            self.max_work_items,
            self.max_report_dependencies,
            self.max_tickets_per_extrinsic,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.max_lookup_anchor_age.to_le_bytes());
        for v in [
            self.tickets_per_validator,
            self.auth_pool_size,
            self.slot_period,
            self.auth_queue_size,
            self.rotation_period,
            self.max_extrinsics,
            self.assurance_timeout,
            self.validator_count,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in [
            self.max_authorizer_code_size,
            self.max_bundle_size,
            self.max_service_code_size,
            self.erasure_piece_size,
            self.max_imports,
            self.pieces_per_segment,
            self.max_report_size,
            self.memo_size,
            self.max_exports,
            self.contest_duration,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Immutable configuration shared by every invocation an [`Engine`](crate::Engine) runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub gas: GasCostTable,
    /// Upper bound of the address space any memory created for an invocation may grow to.
    pub max_memory_bytes: u64,
    pub protocol: ProtocolConstants,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            gas: GasCostTable::default(),
            max_memory_bytes: ADDRESS_SPACE_SIZE,
            protocol: ProtocolConstants::default(),
        }
    }
}

impl VmConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Alignment helpers (Gray Paper equation 766)
// ============================================================================

/// P(x): round up to a page boundary.
#[must_use]
pub const fn align_to_page(size: u64) -> u64 {
    size.div_ceil(PAGE_SIZE as u64) * PAGE_SIZE as u64
}

/// Z(x): round up to a zone boundary.
#[must_use]
pub const fn align_to_zone(size: u64) -> u64 {
    size.div_ceil(ZONE_SIZE as u64) * ZONE_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_set_covers_branches_and_jumps() {
        assert!(is_termination_instruction(OPCODE_TRAP));
        assert!(is_termination_instruction(OPCODE_BRANCH_LT_S_IMM));
        assert!(is_termination_instruction(OPCODE_BRANCH_GE_S));
        assert!(is_termination_instruction(OPCODE_LOAD_IMM_JUMP_IND));
        assert!(!is_termination_instruction(OPCODE_ECALLI));
        assert!(!is_termination_instruction(OPCODE_ADD_64));
    }

    #[test]
    fn host_call_cost_prefers_override() {
        let mut table = GasCostTable::default();
        table.host_calls.insert(FUNC_TRANSFER, 25);
        assert_eq!(table.host_call_cost(FUNC_TRANSFER), 25);
        assert_eq!(table.host_call_cost(FUNC_GAS), 10);
    }

    #[test]
    fn config_from_partial_json() {
        let config = VmConfig::from_json(r#"{"gas":{"instruction":2},"max_memory_bytes":1048576}"#)
            .expect("valid json");
        assert_eq!(config.gas.instruction, 2);
        assert_eq!(config.gas.unknown_host_call, 10);
        assert_eq!(config.max_memory_bytes, 1 << 20);
        assert_eq!(config.protocol.core_count, 341);
    }

    #[test]
    fn constants_encoding_has_fixed_width() {
        let bytes = ProtocolConstants::default().encode();
        assert_eq!(bytes.len(), 8 * 3 + 2 + 4 + 4 + 8 * 4 + 2 * 4 + 4 + 2 * 8 + 4 * 10);
        assert_eq!(&bytes[0..8], &10u64.to_le_bytes());
        assert_eq!(ProtocolConstants::default().segment_size(), 4104);
    }

    #[test]
    fn alignment_rounds_up() {
        assert_eq!(align_to_page(0), 0);
        assert_eq!(align_to_page(1), 4096);
        assert_eq!(align_to_zone(65_537), 131_072);
    }
}
