//! # Athena Opcode Catalogue
//!
//! Opcodes shared by both server families live at module level. Values that
//! differ between families, or only exist in one, live in [`tmwa`] and
//! [`eathena`].
//!
//! ## Naming Convention
//!
//! - `CMSG_*` = client to server
//! - `SMSG_*` = server to client
//!
//! Layouts below omit the leading `u16 opcode`; `{len}` marks a variable
//! message whose second word is the total length.

// === Login server ===

/// `{u32 version}{char[24] user}{char[24] pass}{u8 client type}`
pub const CMSG_LOGIN_REGISTER: u16 = 0x0064;
/// `{len}{u32 session1}{u32 account}{u32 session2}{u32 last ip}{char[24] last login}{u16}{u8 sex}{server[32]...}`
pub const SMSG_LOGIN_DATA: u16 = 0x0069;
/// `{u8 code}{char[20] unban date}`
pub const SMSG_LOGIN_ERROR: u16 = 0x006a;
/// `{len}{string host}`
pub const SMSG_UPDATE_HOST: u16 = 0x0063;
/// `{char[24] old}{char[24] new}`
pub const CMSG_CHAR_PASSWORD_CHANGE: u16 = 0x0061;
/// `{u8 status}`
pub const SMSG_CHAR_PASSWORD_RESPONSE: u16 = 0x0062;
pub const CMSG_SERVER_VERSION_REQUEST: u16 = 0x7530;
pub const SMSG_SERVER_VERSION_RESPONSE: u16 = 0x7531;

// === Char server ===

/// `{u32 account}{u32 session1}{u32 session2}{u16 protocol}{u8 sex}`
pub const CMSG_CHAR_SERVER_CONNECT: u16 = 0x0065;
/// `{len}{dialect header}{character...}`
pub const SMSG_CHAR_LOGIN: u16 = 0x006b;
/// `{u8 code}`
pub const SMSG_CHAR_LOGIN_ERROR: u16 = 0x006c;
/// `{u8 slot}`
pub const CMSG_CHAR_SELECT: u16 = 0x0066;
/// `{u32 char id}{char[16] map}{u32 ip}{u16 port}`
pub const SMSG_CHAR_MAP_INFO: u16 = 0x0071;
/// `{character}`
pub const SMSG_CHAR_CREATE_SUCCEEDED: u16 = 0x006d;
/// `{u8 code}`
pub const SMSG_CHAR_CREATE_FAILED: u16 = 0x006e;
/// `{u32 char id}{char[40] email}`
pub const CMSG_CHAR_DELETE: u16 = 0x0068;
pub const SMSG_CHAR_DELETE_SUCCEEDED: u16 = 0x006f;
/// `{u8 code}`
pub const SMSG_CHAR_DELETE_FAILED: u16 = 0x0070;
/// `{u32 account}`, sent and echoed by the char server as a keep-alive
pub const CMSG_CHAR_PING: u16 = 0x0187;
pub const SMSG_CHAR_PING: u16 = 0x0187;
/// `{char[16] map}{u16 x}{u16 y}{u32 ip}{u16 port}`
pub const SMSG_CHANGE_MAP_SERVER: u16 = 0x0092;

// === Map server: session ===

/// `{u32 account}{u32 char}{u32 session1}{u32 tick}{u8 sex}`
pub const CMSG_MAP_SERVER_CONNECT: u16 = 0x0072;
/// `{u8 code}`
pub const SMSG_MAP_AUTH_REFUSE: u16 = 0x0081;
pub const CMSG_MAP_LOADED: u16 = 0x007d;
/// `{u32 tick}`
pub const SMSG_SERVER_PING: u16 = 0x007f;
/// `{u16 unused}`
pub const CMSG_CLIENT_QUIT: u16 = 0x018a;
/// `{u16 result}`
pub const SMSG_MAP_QUIT_RESPONSE: u16 = 0x018b;
/// `{u8 type}`; type 1 returns to character select
pub const CMSG_PLAYER_RESTART: u16 = 0x00b2;
/// `{u8 ok}`
pub const SMSG_CHAR_SWITCH_RESPONSE: u16 = 0x00b3;
pub const CMSG_WHO_REQUEST: u16 = 0x00c1;
/// `{u32 online}`
pub const SMSG_WHO_ANSWER: u16 = 0x00c2;
/// `{char[16] map}{u16 x}{u16 y}`
pub const SMSG_PLAYER_WARP: u16 = 0x0091;

// === Map server: NPCs ===

/// `{u32 npc}{u8 unused}`
pub const CMSG_NPC_TALK: u16 = 0x0090;
/// `{len}{u32 npc}{string}`
pub const SMSG_NPC_MESSAGE: u16 = 0x00b4;
/// `{u32 npc}`
pub const SMSG_NPC_NEXT: u16 = 0x00b5;
/// `{u32 npc}`
pub const SMSG_NPC_CLOSE: u16 = 0x00b6;
/// `{len}{u32 npc}{string choices separated by ':'}`
pub const SMSG_NPC_CHOICE: u16 = 0x00b7;
/// `{u32 npc}{u8 choice}`
pub const CMSG_NPC_LIST_CHOICE: u16 = 0x00b8;
/// `{u32 npc}`
pub const CMSG_NPC_NEXT_REQUEST: u16 = 0x00b9;
/// `{u32 npc}`
pub const SMSG_NPC_INT_INPUT: u16 = 0x0142;
/// `{u32 npc}{i32 value}`
pub const CMSG_NPC_INT_RESPONSE: u16 = 0x0143;
/// `{u32 npc}`
pub const CMSG_NPC_CLOSE: u16 = 0x0146;
/// `{u32 npc}`
pub const SMSG_NPC_STR_INPUT: u16 = 0x01d4;
/// `{len}{u32 npc}{string}`
pub const CMSG_NPC_STR_RESPONSE: u16 = 0x01d5;
/// `{u32 npc}`
pub const SMSG_NPC_BUY_SELL_CHOICE: u16 = 0x00c4;
/// `{u32 npc}{u8 0 buy / 1 sell}`
pub const CMSG_NPC_BUY_SELL_REQUEST: u16 = 0x00c5;
/// `{len}{entry...}`; entry size depends on item colors
pub const SMSG_NPC_BUY: u16 = 0x00c6;
/// `{len}{u16 index}{i32 value}{i32 overcharge}...`
pub const SMSG_NPC_SELL: u16 = 0x00c7;
/// `{len}{u16 amount}{u16 item}[{u8 color}{u8 unused}]...`
pub const CMSG_NPC_BUY_REQUEST: u16 = 0x00c8;
/// `{len}{u16 index}{u16 amount}...`
pub const CMSG_NPC_SELL_REQUEST: u16 = 0x00c9;
/// `{u8 result}`
pub const SMSG_NPC_BUY_RESPONSE: u16 = 0x00ca;
/// `{u8 result}`
pub const SMSG_NPC_SELL_RESPONSE: u16 = 0x00cb;

// === Map server: skills ===

/// `{len}{entry[37]...}`
pub const SMSG_PLAYER_SKILLS: u16 = 0x010f;
/// `{u16 id}{u16 level}{u16 sp}{u16 range}{u8 up}`
pub const SMSG_PLAYER_SKILL_UP: u16 = 0x010e;
/// 8 bytes, layout differs per dialect
pub const SMSG_SKILL_FAILED: u16 = 0x0110;
/// `{u16 id}`
pub const CMSG_SKILL_LEVELUP_REQUEST: u16 = 0x0112;
/// `{u16 level}{u16 id}{u32 target}`
pub const CMSG_SKILL_USE_BEING: u16 = 0x0113;
/// `{u16 level}{u16 id}{u16 x}{u16 y}`
pub const CMSG_SKILL_USE_POSITION: u16 = 0x0116;
/// `{u16 id}{char[16] map}`
pub const CMSG_SKILL_USE_MAP: u16 = 0x011b;

// === Map server: party ===

/// `{char[24] name}`
pub const CMSG_PARTY_CREATE: u16 = 0x00f9;
/// `{u8 flag}`; 0 created
pub const SMSG_PARTY_CREATE: u16 = 0x00fa;
/// `{len}{char[24] name}{member[46]...}`
pub const SMSG_PARTY_INFO: u16 = 0x00fb;
/// `{u32 account}`
pub const CMSG_PARTY_INVITE: u16 = 0x00fc;
/// `{char[24] nick}{u8 status}`
pub const SMSG_PARTY_INVITE_RESPONSE: u16 = 0x00fd;
/// `{u32 inviter}{char[24] party}`
pub const SMSG_PARTY_INVITED: u16 = 0x00fe;
/// `{u32 inviter}{u32 accept}`
pub const CMSG_PARTY_INVITED: u16 = 0x00ff;
pub const CMSG_PARTY_LEAVE: u16 = 0x0100;
/// `{u32 account}{char[24] nick}{u8 flag}`
pub const SMSG_PARTY_LEAVE: u16 = 0x0105;
/// `{len}{string}`
pub const CMSG_PARTY_MESSAGE: u16 = 0x0108;
/// `{len}{u32 account}{string}`
pub const SMSG_PARTY_MESSAGE: u16 = 0x0109;

// === Map server: inventory ===

/// `{u16 index}{u16 amount}`
pub const SMSG_PLAYER_INVENTORY_REMOVE: u16 = 0x00af;
/// `{u16 index}{u16 item}{u32 being}{u16 amount}{u8 type}`
pub const SMSG_PLAYER_INVENTORY_USE: u16 = 0x01c8;
/// `{u16 index}{u32 target}`
pub const CMSG_PLAYER_INVENTORY_USE: u16 = 0x00a7;
/// `{u16 index}{u16 amount}`
pub const CMSG_PLAYER_INVENTORY_DROP: u16 = 0x00a2;

// === Map server: known but unhandled ===
// Framed through the classic length table; no handler claims them.

pub const SMSG_BEING_VISIBLE: u16 = 0x0078;
pub const SMSG_BEING_MOVE: u16 = 0x007b;
pub const SMSG_BEING_REMOVE: u16 = 0x0080;
pub const SMSG_WALK_RESPONSE: u16 = 0x0087;
pub const SMSG_BEING_MOVE2: u16 = 0x0088;
pub const SMSG_BEING_CHAT: u16 = 0x008d;
pub const SMSG_PLAYER_CHAT: u16 = 0x008e;
pub const SMSG_BEING_NAME_RESPONSE: u16 = 0x0095;
pub const SMSG_GM_CHAT: u16 = 0x009a;
pub const SMSG_PLAYER_STAT_UPDATE_1: u16 = 0x00b0;
pub const SMSG_PLAYER_STAT_UPDATE_2: u16 = 0x00b1;
pub const SMSG_BEING_CHANGE_LOOKS: u16 = 0x0119;
pub const SMSG_PLAYER_EQUIPMENT: u16 = 0x00a4;
pub const SMSG_PLAYER_STAT_UPDATE_5: u16 = 0x00bd;
pub const SMSG_PLAYER_ATTACK_RANGE: u16 = 0x013a;
pub const SMSG_PLAYER_STAT_UPDATE_3: u16 = 0x0141;
pub const SMSG_BEING_CHANGE_LOOKS2: u16 = 0x01d7;
pub const SMSG_PLAYER_INVENTORY: u16 = 0x01ee;

/// TmwAthena-specific opcodes
pub mod tmwa {
    /// `{u32 tick}{coords}{u8 x size}{u8 y size}`
    pub const SMSG_MAP_LOGIN_SUCCESS: u16 = 0x0073;
    /// `{u32 tick}`
    pub const CMSG_MAP_PING: u16 = 0x007e;
    /// `{char[24] name}{u8 stats[6]}{u8 slot}{u16 hair color}{u16 hair style}`
    pub const CMSG_CHAR_CREATE: u16 = 0x0067;
    /// `{u16 index}{u16 amount}{u16 item}{u8 identified}{u8 attribute}{u8 refine}{u16 cards[4]}{u16 equip}{u8 type}{u8 fail}`
    pub const SMSG_PLAYER_INVENTORY_ADD: u16 = 0x00a0;
}

/// eAthena-specific opcodes
pub mod eathena {
    /// `{u32 tick}{coords}{u8 x size}{u8 y size}{u16 font}{u8 sex}`
    pub const SMSG_MAP_LOGIN_SUCCESS: u16 = 0x0a18;
    /// `{u32 account}`
    pub const SMSG_MAP_ACCOUNT_ID: u16 = 0x0283;
    /// `{u32 tick}`
    pub const CMSG_MAP_PING: u16 = 0x0360;
    /// `{char[24] account name}`
    pub const CMSG_LOGIN_PING: u16 = 0x0200;
    /// `{u32 code}{char[20] unban date}`
    pub const SMSG_LOGIN_ERROR2: u16 = 0x083e;
    /// `{len}{char[128] host...}`
    pub const SMSG_UPDATE_HOST2: u16 = 0x0ac9;
    /// `{len}{u8 key...}`
    pub const SMSG_LOGIN_CODING_KEY: u16 = 0x01dc;
    /// `{u32 account}{u32 char}{char[24] new name}`
    pub const CMSG_CHAR_RENAME: u16 = 0x028d;
    /// `{u16 old slot}{u16 new slot}{u16 unused}`
    pub const CMSG_CHAR_CHANGE_SLOT: u16 = 0x08d4;
    /// `{char[24] name}{u8 slot}{u16 hair color}{u16 hair style}`
    pub const CMSG_CHAR_CREATE: u16 = 0x0970;
    /// 31 bytes, see inventory handler
    pub const SMSG_PLAYER_INVENTORY_ADD: u16 = 0x0990;

    /// `{char[64] image}{u8 type}`
    pub const SMSG_NPC_CUTIN: u16 = 0x01b3;
    /// `{u32 npc}{u32 type}{u32 x}{u32 y}{u8 id}{u32 color}`
    pub const SMSG_NPC_VIEWPOINT: u16 = 0x0144;
    /// `{u32 color}{u32 seconds}`
    pub const SMSG_NPC_SHOW_PROGRESS_BAR: u16 = 0x02f0;
    pub const CMSG_NPC_COMPLETE_PROGRESS_BAR: u16 = 0x02f1;
    /// `{u32 npc}`
    pub const SMSG_NPC_CLOSE_TIMEOUT: u16 = 0x08d6;
    /// `{u16 item}{u16 materials[3]}`
    pub const CMSG_NPC_PRODUCE_MIX: u16 = 0x018e;
    /// `{u16 type}{u16 item}`
    pub const CMSG_NPC_COOKING: u16 = 0x025b;
    /// `{u16 index}{u16 item}{u8 refine}{u16 cards[4]}`
    pub const CMSG_NPC_REPAIR: u16 = 0x01fd;
    /// `{u32 index}`
    pub const CMSG_NPC_REFINE: u16 = 0x0222;
    /// `{u16 index}`
    pub const CMSG_NPC_IDENTIFY: u16 = 0x0178;
    /// `{u16 item}`
    pub const CMSG_NPC_SELECT_ARROW: u16 = 0x01ae;
    /// `{u32 skill}`
    pub const CMSG_NPC_SELECT_AUTO_SPELL: u16 = 0x01ce;

    /// `{u16 id}{u32 inf}{u16 level}{u16 sp}{u16 range}{char[24] name}{u8 up}`
    pub const SMSG_SKILL_ADD: u16 = 0x0111;
    /// `{u16 id}{u32 duration ms}`
    pub const SMSG_SKILL_COOLDOWN: u16 = 0x043d;
    /// `{u16 id}`
    pub const SMSG_SKILL_DELETE: u16 = 0x0441;
    /// `{u16 id}{u32 inf}{u16 level}{u16 sp}{u16 range}{u8 up}`
    pub const SMSG_SKILL_UPDATE: u16 = 0x07e1;
    /// `{len}{u16 id}{u32 total ms}{u32 remaining ms}...`
    pub const SMSG_SKILL_COOLDOWN_LIST: u16 = 0x043e;
    /// `{u32 being}{u16 x}{u16 y}`
    pub const SMSG_SKILL_SNAP: u16 = 0x01ff;
    /// `{u16 skill}{char[16] destinations[4]}`
    pub const SMSG_SKILL_WARP_POINT: u16 = 0x011c;
    /// `{u8 type}`
    pub const SMSG_SKILL_MEMO_MESSAGE: u16 = 0x011e;
    /// `{len}{u16 item}{u16 materials[3]}...`
    pub const SMSG_SKILL_PRODUCE_MIX_LIST: u16 = 0x018d;
    /// `{u16 flag}{u16 item}`
    pub const SMSG_SKILL_PRODUCE_EFFECT: u16 = 0x018f;
    /// `{u32 being}`
    pub const SMSG_SKILL_UNIT_UPDATE: u16 = 0x01ac;
    /// `{len}{u16 item...}`
    pub const SMSG_SKILL_ARROW_CREATE_LIST: u16 = 0x01ad;
    /// `{u32 skills[7]}`
    pub const SMSG_SKILL_AUTO_SPELLS: u16 = 0x01cd;
    /// `{u32 source}{u32 targets[5]}{u16 range}`
    pub const SMSG_SKILL_DEVOTION_EFFECT: u16 = 0x01cf;
    /// `{u32 type}`
    pub const SMSG_SKILL_ITEM_LIST_WINDOW: u16 = 0x07e3;

    /// `{u32 id}{i32 hp}{i32 max hp}{i32 sp}{i32 max sp}`
    pub const SMSG_ELEMENTAL_INFO: u16 = 0x081d;
    /// `{u16 type}{i32 value}`
    pub const SMSG_ELEMENTAL_UPDATE_STATUS: u16 = 0x081e;

    /// `{u16 slots}`
    pub const SMSG_VENDING_OPEN_REQ: u16 = 0x012d;
    pub const CMSG_VENDING_CLOSE: u16 = 0x012e;
    /// `{u32 owner}{char[80] message}`
    pub const SMSG_VENDING_SHOW_BOARD: u16 = 0x0131;
    /// `{u32 owner}`
    pub const SMSG_VENDING_HIDE_BOARD: u16 = 0x0132;
}
