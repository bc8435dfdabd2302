//! # Client Game State
//!
//! Everything the handlers learn from the servers. Only the session's logic
//! loop touches it, so there is no locking; handlers get `&mut GameState`
//! through their context and change it through the narrow mutators below.

use athena_core::{AccountId, CharId, Coordinates, Gender, ServerInfo, SessionToken, TilePosition};
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;

/// Server build information from the version handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ServerVersion {
    TmwAthena {
        major: u8,
        minor: u8,
        patch: u8,
        devel: u8,
        flags: u8,
        vendor: u16,
    },
    EAthena {
        server_type: i32,
        version: i32,
    },
}

/// One character slot from the char server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CharacterInfo {
    pub id: CharId,
    pub name: String,
    pub slot: u8,
    pub class: u16,
    pub base_level: u16,
    /// Stored as sent; no correction is applied
    pub job_level: u32,
    pub base_exp: u32,
    pub job_exp: u32,
    pub money: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub sp: u16,
    pub max_sp: u16,
    pub hair_style: u16,
    pub hair_color: u16,
    /// str, agi, vit, int, dex, luk
    pub stats: [u8; 6],
    /// Last map, eAthena only
    pub map: Option<String>,
    /// eAthena only
    pub sex: Option<Gender>,
}

/// One learned skill
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SkillInfo {
    pub id: u16,
    pub name: String,
    pub level: u16,
    pub sp: u16,
    pub range: u16,
    /// Target type flags
    pub inf: u32,
    pub upgradable: bool,
}

/// One inventory slot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InventoryItem {
    /// Client-side index (server index minus 2)
    pub index: i32,
    pub item_id: u16,
    pub amount: u16,
    pub identified: bool,
    pub refine: u8,
    pub cards: [u16; 4],
    pub equip_mask: u32,
    pub kind: u8,
    /// Dye color, 1 when the server does not send one
    pub color: u8,
}

/// What the open NPC dialog is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcPrompt {
    #[default]
    Reading,
    Next,
    Close,
    Choice,
    Integer,
    Text,
    BuySell,
    Shop,
}

/// Open NPC conversation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NpcDialog {
    pub npc: u32,
    pub lines: Vec<String>,
    pub choices: Vec<String>,
    pub prompt: NpcPrompt,
}

/// One party member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyMember {
    pub account_id: AccountId,
    pub nick: String,
    pub map: String,
    pub leader: bool,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PartyInfo {
    pub name: String,
    pub members: Vec<PartyMember>,
}

/// Summoned elemental (eAthena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ElementalInfo {
    pub id: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub sp: i32,
    pub max_sp: i32,
}

/// The playing character once a map server is involved
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlayerState {
    pub char_id: CharId,
    pub map: String,
    pub position: Coordinates,
    pub skills: BTreeMap<u16, SkillInfo>,
    pub inventory: BTreeMap<i32, InventoryItem>,
    pub online_users: u32,
    pub server_tick: u32,
}

/// Everything decoded so far
#[derive(Debug, Clone, Default)]
pub struct GameState {
    token: SessionToken,
    update_host: Option<String>,
    coding_key: Option<Bytes>,
    server_version: Option<ServerVersion>,
    char_servers: Vec<ServerInfo>,
    characters: Vec<CharacterInfo>,
    char_slots: Option<u8>,
    pending_delete: Option<CharId>,
    map_server: Option<ServerInfo>,
    player: PlayerState,
    npc: Option<NpcDialog>,
    party: Option<PartyInfo>,
    elemental: Option<ElementalInfo>,
    vending_boards: BTreeMap<u32, String>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    // === Login ===

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn set_token(&mut self, token: SessionToken) {
        self.token = token;
    }

    pub fn update_host(&self) -> Option<&str> {
        self.update_host.as_deref()
    }

    pub fn set_update_host(&mut self, host: String) {
        self.update_host = Some(host);
    }

    /// Key the eAthena login server offers for password hashing
    pub fn coding_key(&self) -> Option<&[u8]> {
        self.coding_key.as_deref()
    }

    pub fn set_coding_key(&mut self, key: Bytes) {
        self.coding_key = Some(key);
    }

    pub fn server_version(&self) -> Option<&ServerVersion> {
        self.server_version.as_ref()
    }

    pub fn set_server_version(&mut self, version: ServerVersion) {
        self.server_version = Some(version);
    }

    pub fn char_servers(&self) -> &[ServerInfo] {
        &self.char_servers
    }

    pub fn set_char_servers(&mut self, servers: Vec<ServerInfo>) {
        self.char_servers = servers;
    }

    // === Character select ===

    pub fn characters(&self) -> &[CharacterInfo] {
        &self.characters
    }

    pub fn character_in_slot(&self, slot: u8) -> Option<&CharacterInfo> {
        self.characters.iter().find(|c| c.slot == slot)
    }

    pub fn char_slots(&self) -> Option<u8> {
        self.char_slots
    }

    pub fn set_characters(&mut self, characters: Vec<CharacterInfo>, slots: Option<u8>) {
        self.characters = characters;
        self.char_slots = slots;
    }

    /// Add or replace the character in its slot
    pub fn add_character(&mut self, character: CharacterInfo) {
        self.characters.retain(|c| c.slot != character.slot);
        self.characters.push(character);
        self.characters.sort_by_key(|c| c.slot);
    }

    /// Remember which character a delete request was sent for
    pub fn set_pending_delete(&mut self, id: CharId) {
        self.pending_delete = Some(id);
    }

    /// Drop the character whose deletion the server confirmed
    pub fn confirm_pending_delete(&mut self) -> Option<CharId> {
        let id = self.pending_delete.take()?;
        self.characters.retain(|c| c.id != id);
        Some(id)
    }

    pub fn cancel_pending_delete(&mut self) -> Option<CharId> {
        self.pending_delete.take()
    }

    // === Map server ===

    pub fn map_server(&self) -> Option<&ServerInfo> {
        self.map_server.as_ref()
    }

    /// Record the assigned map server and the character that will play on it
    pub fn assign_map_server(&mut self, char_id: CharId, map: String, server: ServerInfo) {
        self.token.char_id = char_id;
        self.player.char_id = char_id;
        self.player.map = map;
        self.map_server = Some(server);
    }

    /// Move to a map hosted by another map server
    pub fn change_map_server(&mut self, map: String, position: TilePosition, server: ServerInfo) {
        self.set_map(map, position);
        self.map_server = Some(server);
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn set_position(&mut self, position: Coordinates) {
        self.player.position = position;
    }

    /// Change map, keeping the facing direction
    pub fn set_map(&mut self, map: String, position: TilePosition) {
        self.player.map = map;
        self.player.position = position.with_direction(self.player.position.direction);
    }

    pub fn set_online_users(&mut self, count: u32) {
        self.player.online_users = count;
    }

    pub fn set_server_tick(&mut self, tick: u32) {
        self.player.server_tick = tick;
    }

    // === Skills ===

    pub fn replace_skills(&mut self, skills: impl IntoIterator<Item = SkillInfo>) {
        self.player.skills = skills.into_iter().map(|s| (s.id, s)).collect();
    }

    pub fn upsert_skill(&mut self, skill: SkillInfo) {
        self.player.skills.insert(skill.id, skill);
    }

    /// Apply a level change; unknown skills are added without a name
    pub fn update_skill(&mut self, id: u16, level: u16, sp: u16, range: u16, upgradable: bool) {
        let skill = self.player.skills.entry(id).or_insert_with(|| SkillInfo {
            id,
            ..SkillInfo::default()
        });
        skill.level = level;
        skill.sp = sp;
        skill.range = range;
        skill.upgradable = upgradable;
    }

    pub fn remove_skill(&mut self, id: u16) -> Option<SkillInfo> {
        self.player.skills.remove(&id)
    }

    // === Inventory ===

    /// Add an item, stacking onto the same slot
    pub fn add_item(&mut self, item: InventoryItem) {
        match self.player.inventory.get_mut(&item.index) {
            Some(existing) if existing.item_id == item.item_id => {
                existing.amount = existing.amount.saturating_add(item.amount);
            }
            _ => {
                self.player.inventory.insert(item.index, item);
            }
        }
    }

    /// Take `amount` from a slot, emptying it at zero
    pub fn remove_item_amount(&mut self, index: i32, amount: u16) {
        if let Some(item) = self.player.inventory.get_mut(&index) {
            item.amount = item.amount.saturating_sub(amount);
            if item.amount == 0 {
                self.player.inventory.remove(&index);
            }
        }
    }

    /// Set a slot's remaining amount after use
    pub fn set_item_amount(&mut self, index: i32, amount: u16) {
        if amount == 0 {
            self.player.inventory.remove(&index);
        } else if let Some(item) = self.player.inventory.get_mut(&index) {
            item.amount = amount;
        }
    }

    // === NPC dialog ===

    pub fn npc_dialog(&self) -> Option<&NpcDialog> {
        self.npc.as_ref()
    }

    /// Dialog with `npc`, replacing any dialog with a different NPC
    pub fn npc_dialog_mut(&mut self, npc: u32) -> &mut NpcDialog {
        if matches!(&self.npc, Some(dialog) if dialog.npc != npc) {
            self.npc = None;
        }
        self.npc.get_or_insert_with(|| NpcDialog {
            npc,
            ..NpcDialog::default()
        })
    }

    pub fn close_npc_dialog(&mut self) -> Option<NpcDialog> {
        self.npc.take()
    }

    // === Party ===

    pub fn party(&self) -> Option<&PartyInfo> {
        self.party.as_ref()
    }

    pub fn set_party(&mut self, party: PartyInfo) {
        self.party = Some(party);
    }

    /// Remove a member; leaving ourselves drops the whole party
    pub fn remove_party_member(&mut self, account_id: AccountId) {
        if account_id == self.token.account_id {
            self.party = None;
        } else if let Some(party) = &mut self.party {
            party.members.retain(|m| m.account_id != account_id);
        }
    }

    // === Elemental ===

    pub fn elemental(&self) -> Option<&ElementalInfo> {
        self.elemental.as_ref()
    }

    pub fn set_elemental(&mut self, elemental: ElementalInfo) {
        self.elemental = Some(elemental);
    }

    pub fn elemental_mut(&mut self) -> Option<&mut ElementalInfo> {
        self.elemental.as_mut()
    }

    // === Vending ===

    pub fn vending_boards(&self) -> &BTreeMap<u32, String> {
        &self.vending_boards
    }

    pub fn show_vending_board(&mut self, owner: u32, message: String) {
        self.vending_boards.insert(owner, message);
    }

    pub fn hide_vending_board(&mut self, owner: u32) {
        self.vending_boards.remove(&owner);
    }

    /// Forget everything tied to the current map server
    pub fn leave_map(&mut self) {
        self.npc = None;
        self.vending_boards.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: i32, item_id: u16, amount: u16) -> InventoryItem {
        InventoryItem {
            index,
            item_id,
            amount,
            ..InventoryItem::default()
        }
    }

    #[test]
    fn test_inventory_stacking_and_removal() {
        let mut state = GameState::new();
        state.add_item(item(0, 501, 3));
        state.add_item(item(0, 501, 2));
        assert_eq!(state.player().inventory[&0].amount, 5);

        state.remove_item_amount(0, 4);
        assert_eq!(state.player().inventory[&0].amount, 1);
        state.remove_item_amount(0, 1);
        assert!(state.player().inventory.is_empty());
    }

    #[test]
    fn test_pending_delete() {
        let mut state = GameState::new();
        let mut first = CharacterInfo::default();
        first.id = CharId::new(150_000);
        first.slot = 0;
        let mut second = CharacterInfo::default();
        second.id = CharId::new(150_001);
        second.slot = 1;
        state.set_characters(vec![first, second], None);

        assert_eq!(state.confirm_pending_delete(), None);
        state.set_pending_delete(CharId::new(150_000));
        assert_eq!(state.confirm_pending_delete(), Some(CharId::new(150_000)));
        assert_eq!(state.characters().len(), 1);
        assert!(state.character_in_slot(1).is_some());
    }

    #[test]
    fn test_npc_dialog_switches_npc() {
        let mut state = GameState::new();
        state.npc_dialog_mut(110_000_001).lines.push("Hello".into());
        assert_eq!(state.npc_dialog().map(|d| d.lines.len()), Some(1));

        state.npc_dialog_mut(110_000_002);
        assert_eq!(state.npc_dialog().map(|d| d.npc), Some(110_000_002));
        assert!(state.npc_dialog().map(|d| d.lines.is_empty()).unwrap_or(false));
    }

    #[test]
    fn test_leaving_party_clears_it() {
        let mut state = GameState::new();
        state.set_token(SessionToken {
            account_id: AccountId::new(2_000_000),
            ..SessionToken::default()
        });
        state.set_party(PartyInfo {
            name: "Crew".into(),
            members: vec![PartyMember {
                account_id: AccountId::new(2_000_001),
                nick: "friend".into(),
                map: "001-1".into(),
                leader: true,
                online: true,
            }],
        });

        state.remove_party_member(AccountId::new(2_000_001));
        assert_eq!(state.party().map(|p| p.members.len()), Some(0));
        state.remove_party_member(AccountId::new(2_000_000));
        assert!(state.party().is_none());
    }
}
