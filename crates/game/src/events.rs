//! Events decoded from server messages
//!
//! Handlers push these after updating [`GameState`](crate::GameState). The
//! session reacts to the ones that drive its state machine and forwards all
//! of them to subscribers.

use athena_core::{AccountId, CharId, Coordinates, ServerInfo, TilePosition};
use serde::Serialize;

use crate::state::{
    CharacterInfo, ElementalInfo, InventoryItem, PartyInfo, ServerVersion, SkillInfo,
};

/// Item offered by an NPC shop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopItem {
    pub item_id: u16,
    pub price: i32,
    pub kind: u8,
    pub color: Option<u8>,
}

/// Inventory item an NPC is willing to buy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellableItem {
    /// Client-side inventory index
    pub index: i32,
    pub price: i32,
    pub overcharge: i32,
}

/// Something the player can forge or brew, with its extra materials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProduceRecipe {
    pub item_id: u16,
    pub materials: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    // === Login ===
    ServerVersion { version: ServerVersion },
    UpdateHost { host: String },
    UpdateHosts { hosts: Vec<String> },
    LoginSucceeded { account_id: AccountId, char_servers: Vec<ServerInfo> },
    LoginFailed { code: u32, reason: String },
    PasswordChanged { ok: bool, code: u8 },

    // === Char server ===
    CharacterList { characters: Vec<CharacterInfo>, slots: Option<u8> },
    CharLoginFailed { code: u8, reason: String },
    CharacterCreated { character: CharacterInfo },
    CharacterCreateFailed { code: u8, reason: String },
    CharacterDeleted { char_id: Option<CharId> },
    CharacterDeleteFailed { code: u8 },
    MapServerAssigned { char_id: CharId, map: String, server: ServerInfo },
    MapServerChanged { map: String, position: TilePosition, server: ServerInfo },

    // === Map session ===
    MapLoginSucceeded { tick: u32, position: Coordinates },
    MapAuthRefused { code: u8, reason: String },
    QuitResponse { ok: bool },
    CharSwitchResponse { ok: bool },
    OnlineUsers { count: u32 },
    Warped { map: String, position: TilePosition },

    // === NPC ===
    NpcMessage { npc: u32, text: String },
    NpcNext { npc: u32 },
    NpcClose { npc: u32 },
    NpcChoice { npc: u32, choices: Vec<String> },
    NpcIntegerInput { npc: u32 },
    NpcStringInput { npc: u32 },
    NpcBuySellChoice { npc: u32 },
    NpcBuyList { items: Vec<ShopItem> },
    NpcSellList { items: Vec<SellableItem> },
    NpcBuyResult { ok: bool, code: u8 },
    NpcSellResult { ok: bool, code: u8 },
    NpcCutin { image: String, kind: u8 },
    NpcViewpoint { npc: u32, kind: u32, x: u32, y: u32, id: u8, color: u32 },
    NpcProgressBar { color: u32, seconds: u32 },
    NpcCloseTimeout { npc: u32 },

    // === Skills ===
    SkillList { skills: Vec<SkillInfo> },
    SkillUp { id: u16, level: u16 },
    SkillFailed { id: u16, reason: u8 },
    SkillAdded { skill: SkillInfo },
    SkillRemoved { id: u16 },
    SkillCooldown { id: u16, millis: u32 },
    SkillSnap { being: u32, x: u16, y: u16 },
    SkillWarpPoints { skill: u16, destinations: Vec<String> },
    SkillMemo { kind: u8 },
    SkillProduceList { recipes: Vec<ProduceRecipe> },
    SkillProduceResult { flag: u16, item_id: u16 },
    SkillUnitUpdate { being: u32 },
    SkillArrowList { items: Vec<u16> },
    SkillAutoSpells { skills: Vec<u32> },
    SkillDevotion { source: u32, targets: Vec<u32>, range: u16 },
    SkillItemListWindow { kind: u32 },

    // === Elemental ===
    ElementalInfo { elemental: ElementalInfo },
    ElementalStatus { kind: u16, value: i32 },

    // === Party ===
    PartyCreated { ok: bool },
    PartyInfo { party: PartyInfo },
    PartyInviteResponse { nick: String, status: u8 },
    PartyInvited { inviter: AccountId, party: String },
    PartyMemberLeft { account_id: AccountId, nick: String },
    PartyMessage { account_id: AccountId, text: String },

    // === Inventory ===
    ItemAdded { item: InventoryItem },
    ItemAddFailed { index: i32, item_id: u16, code: u8 },
    ItemRemoved { index: i32, amount: u16 },
    ItemUsed { index: i32, item_id: u16, remaining: u16 },

    // === Vending ===
    VendingOpenRequest { slots: u16 },
    VendingBoardShown { owner: u32, message: String },
    VendingBoardHidden { owner: u32 },
}
