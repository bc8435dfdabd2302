//! # Packet Length Table
//!
//! The stream carries no frame delimiter. A frame's size comes from its
//! opcode: either a fixed size, or a `u16` total length right after the
//! opcode. An opcode missing from the table cannot be framed, and nothing
//! after it can be either.
//!
//! The table is the classic `0x0000..0x0220` range both families share,
//! overlaid with the lengths of every handled opcode and the newer
//! per-dialect opcodes.

use athena_core::Dialect;
use std::collections::HashMap;

use crate::packets::{self, eathena, tmwa};

/// How long a frame with a given opcode is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLength {
    /// Total size in bytes, opcode included
    Fixed(usize),
    /// Total size is the `u16` at offset 2
    Variable,
}

use PacketLength::{Fixed, Variable};

/// Lengths of the classic opcode range `0x0000..0x0220`
///
/// Both families inherit this table. `0` marks an unused opcode and `-1` a
/// variable-length one. It covers messages no handler claims, so a server
/// sending them does not break framing.
#[rustfmt::skip]
const CLASSIC_LENGTHS: [i16; 0x220] = [
    // 0x0000
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
    // 0x0040
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,  50,   3,  -1,  55,  17,   3,  37,  46,  -1,  23,  -1,   3, 108,   3,   2,
      3,  28,  19,  11,   3,  -1,   9,   5,  54,  53,  58,  60,  41,   2,   6,   6,
    // 0x0080
      7,   3,   2,   2,   2,   5,  16,  12,  10,   7,  29,  23,  -1,  -1,  -1,   0,
      7,  22,  28,   2,   6,  30,  -1,  -1,   3,  -1,  -1,   5,   9,  17,  17,   6,
     23,   6,   6,  -1,  -1,  -1,  -1,   8,   7,   6,   7,   4,   7,   0,  -1,   6,
      8,   8,   3,   3,  -1,   6,   6,  -1,   7,   6,   2,   5,   6,  44,   5,   3,
    // 0x00c0
      7,   2,   6,   8,   6,   7,  -1,  -1,  -1,  -1,   3,   3,   6,   6,   2,  27,
      3,   4,   4,   2,  -1,  -1,   3,  -1,   6,  14,   3,  -1,  28,  29,  -1,  -1,
     30,  30,  26,   2,   6,  26,   3,   3,   8,  19,   5,   2,   3,   2,   2,   2,
      3,   2,   6,   8,  21,   8,   8,   2,   2,  26,   3,  -1,   6,  27,  30,  10,
    // 0x0100
      2,   6,   6,  30,  79,  31,  10,  10,  -1,  -1,   4,   6,   6,   2,  11,  -1,
     10,  39,   4,  10,  31,  35,  10,  18,   2,  13,  15,  20,  68,   2,   3,  16,
      6,  14,  -1,  -1,  21,   8,   8,   8,   8,   8,   2,   2,   3,   4,   2,  -1,
      6,  86,   6,  -1,  -1,   7,  -1,   6,   3,  16,   4,   4,   4,   6,  24,  26,
    // 0x0140
     22,  14,   6,  10,  23,  19,   6,  39,   8,   9,   6,  27,  -1,   2,   6,   6,
    110,   6,  -1,  -1,  -1,  -1,  -1,   6,  -1,  54,  66,  54,  90,  42,   6,  42,
     -1,  -1,  -1,  -1,  -1,  30,  -1,   3,  14,   3,  30,  10,  43,  14, 186, 182,
     14,  30,  10,   3,  -1,   6, 106,  -1,   4,   5,   4,  -1,   6,   7,  -1,  -1,
    // 0x0180
      6,   3, 106,  10,  10,  34,   0,   6,   8,   4,   4,   4,  29,  -1,  10,   6,
     90,  86,  24,   6,  30, 102,   9,   4,   8,   4,  14,  10,   4,   6,   2,   6,
      3,   3,  35,   5,  11,  26,  -1,   4,   4,   6,  10,  12,   6,  -1,   4,   4,
     11,   7,  -1,  67,  12,  18, 114,   6,   3,   6,  26,  26,  26,  26,   2,   3,
    // 0x01c0
      2,  14,  10,  -1,  22,  22,   4,   2,  13,  97,   0,   9,   9,  30,   6,  28,
      8,  14,  10,  35,   6,  -1,   4,  11,  54,  53,  60,   2,  -1,  47,  33,   6,
     30,   8,  34,  14,   2,   6,  26,   2,  28,  81,   6,  10,  26,   2,  -1,  -1,
     -1,  -1,  20,  10,  32,   9,  34,  14,   2,   6,  48,  56,  -1,   4,   5,  10,
    // 0x0200
     26,  -1,  26,  10,  18,  26,  11,  34,  14,  36,  10,   0,   0,  -1,  32,  10,
     22,   0,  26,  26,  42,   6,   6,   2,   2, 282, 282,  10,  10,  -1,  -1,  66,
];

/// Inbound lengths shared by both families
///
/// Every opcode a handler claims is listed here or in a dialect table, even
/// where the classic table already agrees.
const SHARED_LENGTHS: &[(u16, PacketLength)] = &[
    // login
    (packets::SMSG_UPDATE_HOST, Variable),
    (packets::SMSG_CHAR_PASSWORD_RESPONSE, Fixed(3)),
    (packets::SMSG_LOGIN_DATA, Variable),
    (packets::SMSG_LOGIN_ERROR, Fixed(23)),
    // char
    (packets::SMSG_CHAR_LOGIN, Variable),
    (packets::SMSG_CHAR_LOGIN_ERROR, Fixed(3)),
    (packets::SMSG_CHAR_CREATE_FAILED, Fixed(3)),
    (packets::SMSG_CHAR_DELETE_SUCCEEDED, Fixed(2)),
    (packets::SMSG_CHAR_DELETE_FAILED, Fixed(3)),
    (packets::SMSG_CHAR_MAP_INFO, Fixed(28)),
    (packets::SMSG_CHAR_PING, Fixed(6)),
    (packets::SMSG_CHANGE_MAP_SERVER, Fixed(28)),
    // game
    (packets::SMSG_MAP_AUTH_REFUSE, Fixed(3)),
    (packets::SMSG_SERVER_PING, Fixed(6)),
    (packets::SMSG_MAP_QUIT_RESPONSE, Fixed(4)),
    (packets::SMSG_CHAR_SWITCH_RESPONSE, Fixed(3)),
    (packets::SMSG_WHO_ANSWER, Fixed(6)),
    (packets::SMSG_PLAYER_WARP, Fixed(22)),
    // npc
    (packets::SMSG_NPC_MESSAGE, Variable),
    (packets::SMSG_NPC_NEXT, Fixed(6)),
    (packets::SMSG_NPC_CLOSE, Fixed(6)),
    (packets::SMSG_NPC_CHOICE, Variable),
    (packets::SMSG_NPC_INT_INPUT, Fixed(6)),
    (packets::SMSG_NPC_STR_INPUT, Fixed(6)),
    (packets::SMSG_NPC_BUY_SELL_CHOICE, Fixed(6)),
    (packets::SMSG_NPC_BUY, Variable),
    (packets::SMSG_NPC_SELL, Variable),
    (packets::SMSG_NPC_BUY_RESPONSE, Fixed(3)),
    (packets::SMSG_NPC_SELL_RESPONSE, Fixed(3)),
    // skills
    (packets::SMSG_PLAYER_SKILLS, Variable),
    (packets::SMSG_PLAYER_SKILL_UP, Fixed(11)),
    (packets::SMSG_SKILL_FAILED, Fixed(10)),
    // party
    (packets::SMSG_PARTY_CREATE, Fixed(3)),
    (packets::SMSG_PARTY_INFO, Variable),
    (packets::SMSG_PARTY_INVITE_RESPONSE, Fixed(27)),
    (packets::SMSG_PARTY_INVITED, Fixed(30)),
    (packets::SMSG_PARTY_LEAVE, Fixed(31)),
    (packets::SMSG_PARTY_MESSAGE, Variable),
    // inventory
    (packets::SMSG_PLAYER_INVENTORY_REMOVE, Fixed(6)),
    (packets::SMSG_PLAYER_INVENTORY_USE, Fixed(13)),
];

const TMWA_LENGTHS: &[(u16, PacketLength)] = &[
    (packets::SMSG_SERVER_VERSION_RESPONSE, Fixed(10)),
    (packets::SMSG_CHAR_CREATE_SUCCEEDED, Fixed(108)),
    (tmwa::SMSG_MAP_LOGIN_SUCCESS, Fixed(11)),
    (tmwa::SMSG_PLAYER_INVENTORY_ADD, Fixed(23)),
];

const EATHENA_LENGTHS: &[(u16, PacketLength)] = &[
    (packets::SMSG_SERVER_VERSION_RESPONSE, Variable),
    (packets::SMSG_CHAR_CREATE_SUCCEEDED, Fixed(147)),
    // login
    (eathena::SMSG_LOGIN_ERROR2, Fixed(26)),
    (eathena::SMSG_UPDATE_HOST2, Variable),
    (eathena::SMSG_LOGIN_CODING_KEY, Variable),
    // game
    (eathena::SMSG_MAP_LOGIN_SUCCESS, Fixed(14)),
    (eathena::SMSG_MAP_ACCOUNT_ID, Fixed(6)),
    (eathena::SMSG_PLAYER_INVENTORY_ADD, Fixed(31)),
    // npc
    (eathena::SMSG_NPC_CUTIN, Fixed(67)),
    (eathena::SMSG_NPC_VIEWPOINT, Fixed(23)),
    (eathena::SMSG_NPC_SHOW_PROGRESS_BAR, Fixed(10)),
    (eathena::SMSG_NPC_CLOSE_TIMEOUT, Fixed(6)),
    // skills
    (eathena::SMSG_SKILL_ADD, Fixed(39)),
    (eathena::SMSG_SKILL_COOLDOWN, Fixed(8)),
    (eathena::SMSG_SKILL_COOLDOWN_LIST, Variable),
    (eathena::SMSG_SKILL_DELETE, Fixed(4)),
    (eathena::SMSG_SKILL_UPDATE, Fixed(15)),
    (eathena::SMSG_SKILL_SNAP, Fixed(10)),
    (eathena::SMSG_SKILL_WARP_POINT, Fixed(68)),
    (eathena::SMSG_SKILL_MEMO_MESSAGE, Fixed(3)),
    (eathena::SMSG_SKILL_PRODUCE_MIX_LIST, Variable),
    (eathena::SMSG_SKILL_PRODUCE_EFFECT, Fixed(6)),
    (eathena::SMSG_SKILL_UNIT_UPDATE, Fixed(6)),
    (eathena::SMSG_SKILL_ARROW_CREATE_LIST, Variable),
    (eathena::SMSG_SKILL_AUTO_SPELLS, Fixed(30)),
    (eathena::SMSG_SKILL_DEVOTION_EFFECT, Fixed(28)),
    (eathena::SMSG_SKILL_ITEM_LIST_WINDOW, Fixed(6)),
    // elemental
    (eathena::SMSG_ELEMENTAL_INFO, Fixed(22)),
    (eathena::SMSG_ELEMENTAL_UPDATE_STATUS, Fixed(8)),
    // vending
    (eathena::SMSG_VENDING_OPEN_REQ, Fixed(4)),
    (eathena::SMSG_VENDING_SHOW_BOARD, Fixed(86)),
    (eathena::SMSG_VENDING_HIDE_BOARD, Fixed(6)),
    // newer unit, inventory and status messages, framed only
    (0x0856, Variable),
    (0x0857, Variable),
    (0x0858, Variable),
    (0x090f, Variable),
    (0x0914, Variable),
    (0x0915, Variable),
    (0x09fd, Variable),
    (0x09fe, Variable),
    (0x09ff, Variable),
    (0x0991, Variable),
    (0x0992, Variable),
    (0x0a0d, Variable),
    (0x02d0, Variable),
    (0x02e8, Variable),
    (0x07fb, Fixed(25)),
    (0x08c8, Fixed(34)),
    (0x0977, Fixed(14)),
    (0x0a30, Fixed(106)),
    (0x0acb, Fixed(12)),
    (0x0acc, Fixed(18)),
];

fn classic_entries() -> impl Iterator<Item = (u16, PacketLength)> {
    CLASSIC_LENGTHS
        .iter()
        .enumerate()
        .filter_map(|(opcode, &len)| {
            let length = match len {
                0 => return None,
                -1 => Variable,
                n => Fixed(n as usize),
            };
            Some((opcode as u16, length))
        })
}

/// Opcode to frame length lookup for one dialect
#[derive(Debug, Clone)]
pub struct PacketLengths {
    dialect: Dialect,
    table: HashMap<u16, PacketLength>,
}

impl PacketLengths {
    /// Build the table for a dialect
    pub fn for_dialect(dialect: Dialect) -> Self {
        let specific = match dialect {
            Dialect::TmwAthena => TMWA_LENGTHS,
            Dialect::EAthena => EATHENA_LENGTHS,
        };

        // Later entries win, so explicit lengths override the classic table
        let table = classic_entries()
            .chain(SHARED_LENGTHS.iter().copied())
            .chain(specific.iter().copied())
            .collect();

        Self { dialect, table }
    }

    #[inline]
    pub fn get(&self, opcode: u16) -> Option<PacketLength> {
        self.table.get(&opcode).copied()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_specific_lengths() {
        let old = PacketLengths::for_dialect(Dialect::TmwAthena);
        let new = PacketLengths::for_dialect(Dialect::EAthena);

        assert_eq!(old.get(tmwa::SMSG_MAP_LOGIN_SUCCESS), Some(Fixed(11)));
        assert_eq!(new.get(eathena::SMSG_MAP_LOGIN_SUCCESS), Some(Fixed(14)));
        assert_eq!(old.get(eathena::SMSG_MAP_LOGIN_SUCCESS), None);

        assert_eq!(old.get(packets::SMSG_SERVER_VERSION_RESPONSE), Some(Fixed(10)));
        assert_eq!(new.get(packets::SMSG_SERVER_VERSION_RESPONSE), Some(Variable));
    }

    #[test]
    fn test_shared_lengths_present_in_both() {
        for dialect in [Dialect::TmwAthena, Dialect::EAthena] {
            let lengths = PacketLengths::for_dialect(dialect);
            assert_eq!(lengths.get(packets::SMSG_LOGIN_DATA), Some(Variable));
            assert_eq!(lengths.get(packets::SMSG_CHAR_MAP_INFO), Some(Fixed(28)));
            assert_eq!(lengths.get(packets::SMSG_SERVER_PING), Some(Fixed(6)));
            assert_eq!(lengths.dialect(), dialect);
        }
    }

    #[test]
    fn test_map_login_burst_is_framed() {
        let old = PacketLengths::for_dialect(Dialect::TmwAthena);
        assert_eq!(old.get(packets::SMSG_PLAYER_ATTACK_RANGE), Some(Fixed(4)));
        assert_eq!(old.get(packets::SMSG_PLAYER_STAT_UPDATE_3), Some(Fixed(14)));
        assert_eq!(old.get(packets::SMSG_PLAYER_STAT_UPDATE_5), Some(Fixed(44)));
        assert_eq!(old.get(packets::SMSG_PLAYER_EQUIPMENT), Some(Variable));
        assert_eq!(old.get(packets::SMSG_PLAYER_INVENTORY), Some(Variable));
        assert_eq!(old.get(packets::SMSG_BEING_CHANGE_LOOKS2), Some(Fixed(11)));

        let new = PacketLengths::for_dialect(Dialect::EAthena);
        assert_eq!(new.get(eathena::SMSG_LOGIN_ERROR2), Some(Fixed(26)));
        assert_eq!(new.get(packets::SMSG_BEING_CHANGE_LOOKS2), Some(Fixed(11)));
        assert_eq!(old.get(eathena::SMSG_LOGIN_ERROR2), None);
    }

    #[test]
    fn test_whole_table_is_frameable() {
        for dialect in [Dialect::TmwAthena, Dialect::EAthena] {
            let lengths = PacketLengths::for_dialect(dialect);
            assert!(lengths.len() > 400);
            for opcode in 0..=u16::MAX {
                if let Some(Fixed(len)) = lengths.get(opcode) {
                    assert!(len >= 2, "0x{opcode:04x} shorter than its opcode");
                }
            }
        }
    }

    #[test]
    fn test_classic_table_agrees_with_handled_lengths() {
        let classic: HashMap<u16, PacketLength> = classic_entries().collect();
        for (opcode, length) in SHARED_LENGTHS {
            if let Some(inherited) = classic.get(opcode) {
                assert_eq!(inherited, length, "0x{opcode:04x}");
            }
        }
    }

    #[test]
    fn test_no_dialect_entry_overrides_a_shared_one() {
        for specific in [TMWA_LENGTHS, EATHENA_LENGTHS] {
            for (opcode, _) in specific {
                assert!(
                    SHARED_LENGTHS.iter().all(|(shared, _)| shared != opcode),
                    "0x{opcode:04x} listed twice"
                );
            }
        }
    }
}
