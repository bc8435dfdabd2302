//! # Char Server Handler
//!
//! Character list, creation, deletion and the hand-over to a map server.
//!
//! ## Character Entry Layouts
//!
//! ```text
//! tmwa    106 bytes  i32 stats block, i16 looks, name[24], 6 attributes, u8 slot
//! eathena 145 bytes  wider hp/exp fields, name[24], 6 attributes, i16 slot,
//!                    map[16], delete date, robe, rename data, u8 sex
//! ```

use athena_core::{CharId, ClientError, Dialect, Gender, Result, ServerInfo, SessionToken, TilePosition};
use athena_protocol::packets::{self, eathena, tmwa};
use athena_protocol::{MessageIn, MessageOut};

use crate::events::ClientEvent;
use crate::handler::{entry_count, HandlerContext, MessageHandler};
use crate::state::CharacterInfo;

pub const TMWA_CHARACTER_LEN: usize = 106;
pub const EATHENA_CHARACTER_LEN: usize = 145;

/// Protocol word in the char server connect request
const CHAR_PROTOCOL_VERSION: u16 = 1;

const NAME_LEN: usize = 24;
const MAP_NAME_LEN: usize = 16;
const EMAIL_LEN: usize = 40;

const MESSAGES: &[u16] = &[
    packets::SMSG_CHAR_LOGIN,
    packets::SMSG_CHAR_LOGIN_ERROR,
    packets::SMSG_CHAR_CREATE_SUCCEEDED,
    packets::SMSG_CHAR_CREATE_FAILED,
    packets::SMSG_CHAR_DELETE_SUCCEEDED,
    packets::SMSG_CHAR_DELETE_FAILED,
    packets::SMSG_CHAR_MAP_INFO,
    packets::SMSG_CHANGE_MAP_SERVER,
    packets::SMSG_CHAR_PING,
];

fn char_login_error_reason(code: u8) -> String {
    match code {
        0 => "Access denied. Most likely, there are too many players on this server".into(),
        1 => "Cannot use this ID".into(),
        _ => format!("Unknown char-server failure {}", code),
    }
}

fn create_error_reason(code: u8) -> String {
    match code {
        0 => "Character name already exists".into(),
        1 => "Character creation denied".into(),
        2 => "You are underaged".into(),
        3 => "Symbols in character names are not allowed".into(),
        0x0b => "No free character slot".into(),
        _ => format!("Unknown error {}", code),
    }
}

pub struct CharServerHandler {
    dialect: Dialect,
}

impl CharServerHandler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Size of one character entry for this dialect
    pub fn character_len(&self) -> usize {
        match self.dialect {
            Dialect::TmwAthena => TMWA_CHARACTER_LEN,
            Dialect::EAthena => EATHENA_CHARACTER_LEN,
        }
    }

    fn read_character(&self, msg: &mut MessageIn) -> Result<CharacterInfo> {
        match self.dialect {
            Dialect::TmwAthena => read_tmwa_character(msg),
            Dialect::EAthena => read_eathena_character(msg),
        }
    }

    fn process_char_login(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let slots = match self.dialect {
            Dialect::TmwAthena => None,
            Dialect::EAthena => {
                let slots = msg.read_u8("slots")?;
                msg.read_u8("premium start")?;
                msg.read_u8("premium end")?;
                Some(slots)
            }
        };
        msg.skip(20, "unused")?;

        let count = entry_count(msg, self.character_len(), "character");
        let mut characters = Vec::with_capacity(count);
        for _ in 0..count {
            characters.push(self.read_character(msg)?);
        }
        characters.sort_by_key(|c| c.slot);

        tracing::info!("Received {} characters", characters.len());
        ctx.state.set_characters(characters.clone(), slots);
        ctx.emit(ClientEvent::CharacterList { characters, slots });
        Ok(())
    }

    fn process_char_login_error(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let code = msg.read_u8("error")?;
        let reason = char_login_error_reason(code);
        tracing::warn!("Char server refused login: {}", reason);
        ctx.emit(ClientEvent::CharLoginFailed { code, reason });
        Ok(())
    }

    fn process_create_succeeded(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let character = self.read_character(msg)?;
        tracing::info!("Created character {} in slot {}", character.name, character.slot);
        ctx.state.add_character(character.clone());
        ctx.emit(ClientEvent::CharacterCreated { character });
        Ok(())
    }

    fn process_create_failed(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let code = msg.read_u8("error")?;
        ctx.emit(ClientEvent::CharacterCreateFailed {
            code,
            reason: create_error_reason(code),
        });
        Ok(())
    }

    fn process_map_info(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let char_id = CharId::new(msg.read_u32("char id")?);
        let map = msg.read_string(MAP_NAME_LEN, "map name")?;
        let ip = msg.read_ipv4("map ip")?;
        let port = msg.read_u16("map port")?;
        let server = ServerInfo::from_wire(ip, port).with_name(map.clone());

        tracing::info!("Character {} goes to {} on {}", char_id.get(), map, server.address());
        ctx.state.assign_map_server(char_id, map.clone(), server.clone());
        ctx.emit(ClientEvent::MapServerAssigned {
            char_id,
            map,
            server,
        });
        Ok(())
    }

    fn process_change_map_server(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let map = msg.read_string(MAP_NAME_LEN, "map name")?;
        let x = msg.read_u16("x")?;
        let y = msg.read_u16("y")?;
        let ip = msg.read_ipv4("map ip")?;
        let port = msg.read_u16("map port")?;
        let position = TilePosition::new(x, y);
        let server = ServerInfo::from_wire(ip, port).with_name(map.clone());

        tracing::info!("Changing map server to {} for {}", server.address(), map);
        ctx.state.leave_map();
        ctx.state.change_map_server(map.clone(), position, server.clone());
        ctx.emit(ClientEvent::MapServerChanged {
            map,
            position,
            server,
        });
        Ok(())
    }

    // === Outbound ===

    /// Authenticate with the char server using the login token
    pub fn connect(&self, token: &SessionToken) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_CHAR_SERVER_CONNECT);
        out.write_u32(token.account_id.get(), "account id")
            .write_u32(token.session_id1, "session id1")
            .write_u32(token.session_id2, "session id2")
            .write_u16(CHAR_PROTOCOL_VERSION, "protocol version")
            .write_u8(token.sex.as_u8(), "sex");
        out
    }

    pub fn select_character(&self, slot: u8) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_CHAR_SELECT);
        out.write_u8(slot, "slot");
        out
    }

    /// Character creation request
    ///
    /// eAthena servers roll stats themselves, so `stats` is only sent to
    /// TmwAthena.
    pub fn create_character(
        &self,
        name: &str,
        slot: u8,
        hair_color: u16,
        hair_style: u16,
        stats: [u8; 6],
    ) -> MessageOut {
        match self.dialect {
            Dialect::TmwAthena => {
                let mut out = MessageOut::new(tmwa::CMSG_CHAR_CREATE);
                out.write_string(name, NAME_LEN, "name");
                for stat in stats {
                    out.write_u8(stat, "stat");
                }
                out.write_u8(slot, "slot")
                    .write_u16(hair_color, "hair color")
                    .write_u16(hair_style, "hair style");
                out
            }
            Dialect::EAthena => {
                let mut out = MessageOut::new(eathena::CMSG_CHAR_CREATE);
                out.write_string(name, NAME_LEN, "name")
                    .write_u8(slot, "slot")
                    .write_u16(hair_color, "hair color")
                    .write_u16(hair_style, "hair style");
                out
            }
        }
    }

    pub fn delete_character(&self, char_id: CharId, email: &str) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_CHAR_DELETE);
        out.write_u32(char_id.get(), "char id")
            .write_string(email, EMAIL_LEN, "email");
        out
    }

    /// Rename a character (eAthena only)
    pub fn rename_character(&self, token: &SessionToken, char_id: CharId, name: &str) -> Option<MessageOut> {
        if self.dialect != Dialect::EAthena {
            return None;
        }
        let mut out = MessageOut::new(eathena::CMSG_CHAR_RENAME);
        out.write_u32(token.account_id.get(), "account id")
            .write_u32(char_id.get(), "char id")
            .write_string(name, NAME_LEN, "new name");
        Some(out)
    }

    /// Move a character to another slot (eAthena only)
    pub fn change_slot(&self, old_slot: u16, new_slot: u16) -> Option<MessageOut> {
        if self.dialect != Dialect::EAthena {
            return None;
        }
        let mut out = MessageOut::new(eathena::CMSG_CHAR_CHANGE_SLOT);
        out.write_u16(old_slot, "old slot")
            .write_u16(new_slot, "new slot")
            .write_u16(0, "unused");
        Some(out)
    }

    pub fn ping(&self, token: &SessionToken) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_CHAR_PING);
        out.write_u32(token.account_id.get(), "account id");
        out
    }
}

impl MessageHandler for CharServerHandler {
    fn name(&self) -> &'static str {
        "char server"
    }

    fn handled_messages(&self) -> &[u16] {
        MESSAGES
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            packets::SMSG_CHAR_LOGIN => self.process_char_login(msg, ctx),
            packets::SMSG_CHAR_LOGIN_ERROR => self.process_char_login_error(msg, ctx),
            packets::SMSG_CHAR_CREATE_SUCCEEDED => self.process_create_succeeded(msg, ctx),
            packets::SMSG_CHAR_CREATE_FAILED => self.process_create_failed(msg, ctx),
            packets::SMSG_CHAR_DELETE_SUCCEEDED => {
                let char_id = ctx.state.confirm_pending_delete();
                ctx.emit(ClientEvent::CharacterDeleted { char_id });
                Ok(())
            }
            packets::SMSG_CHAR_DELETE_FAILED => {
                let code = msg.read_u8("error")?;
                ctx.state.cancel_pending_delete();
                ctx.emit(ClientEvent::CharacterDeleteFailed { code });
                Ok(())
            }
            packets::SMSG_CHAR_MAP_INFO => self.process_map_info(msg, ctx),
            packets::SMSG_CHANGE_MAP_SERVER => self.process_change_map_server(msg, ctx),
            packets::SMSG_CHAR_PING => {
                msg.read_u32("account id")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn to_u32(value: i32) -> u32 {
    value.max(0) as u32
}

fn read_stats(msg: &mut MessageIn) -> Result<[u8; 6]> {
    let mut stats = [0u8; 6];
    for (stat, label) in stats.iter_mut().zip(["str", "agi", "vit", "int", "dex", "luk"]) {
        *stat = msg.read_u8(label)?;
    }
    Ok(stats)
}

fn read_tmwa_character(msg: &mut MessageIn) -> Result<CharacterInfo> {
    let id = CharId::new(msg.read_u32("id")?);
    let base_exp = to_u32(msg.read_i32("exp")?);
    let money = to_u32(msg.read_i32("money")?);
    let job_exp = to_u32(msg.read_i32("job exp")?);
    let job_level = to_u32(msg.read_i32("job level")?);
    msg.read_i16("shoes")?;
    msg.read_i16("gloves")?;
    msg.read_i16("cape")?;
    msg.read_i16("misc1")?;
    msg.read_i32("option")?;
    msg.read_i32("karma")?;
    msg.read_i32("manner")?;
    msg.read_i16("character points")?;
    let hp = to_u32(i32::from(msg.read_i16("hp")?));
    let max_hp = to_u32(i32::from(msg.read_i16("max hp")?));
    let sp = msg.read_i16("mp")?.max(0) as u16;
    let max_sp = msg.read_i16("max mp")?.max(0) as u16;
    msg.read_i16("speed")?;
    let class = msg.read_u16("class")?;
    let hair_style = msg.read_u16("hair style")?;
    msg.read_i16("weapon")?;
    let base_level = msg.read_u16("level")?;
    msg.read_i16("skill points")?;
    msg.read_i16("head bottom")?;
    msg.read_i16("shield")?;
    msg.read_i16("head top")?;
    msg.read_i16("head mid")?;
    let hair_color = msg.read_u16("hair color")?;
    msg.read_i16("misc2")?;
    let name = msg.read_string(NAME_LEN, "name")?;
    let stats = read_stats(msg)?;
    let slot = msg.read_u8("slot")?;
    msg.read_u8("unused")?;

    Ok(CharacterInfo {
        id,
        name,
        slot,
        class,
        base_level,
        job_level,
        base_exp,
        job_exp,
        money,
        hp,
        max_hp,
        sp,
        max_sp,
        hair_style,
        hair_color,
        stats,
        map: None,
        sex: None,
    })
}

fn read_eathena_character(msg: &mut MessageIn) -> Result<CharacterInfo> {
    let id = CharId::new(msg.read_u32("id")?);
    let base_exp = to_u32(msg.read_i32("exp")?);
    let money = to_u32(msg.read_i32("money")?);
    let job_exp = to_u32(msg.read_i32("job exp")?);
    let job_level = to_u32(msg.read_i32("job level")?);
    msg.read_i32("opt1")?;
    msg.read_i32("opt2")?;
    msg.read_i32("option")?;
    msg.read_i32("karma")?;
    msg.read_i32("manner")?;
    msg.read_i16("character points")?;
    let hp = to_u32(msg.read_i32("hp")?);
    let max_hp = to_u32(msg.read_i32("max hp")?);
    let sp = msg.read_i16("sp")?.max(0) as u16;
    let max_sp = msg.read_i16("max sp")?.max(0) as u16;
    msg.read_i16("speed")?;
    let class = msg.read_u16("class")?;
    let hair_style = msg.read_u16("hair style")?;
    msg.read_i16("weapon")?;
    let base_level = msg.read_u16("level")?;
    msg.read_i16("skill points")?;
    msg.read_i16("head bottom")?;
    msg.read_i16("shield")?;
    msg.read_i16("head top")?;
    msg.read_i16("head mid")?;
    let hair_color = msg.read_u16("hair color")?;
    msg.read_i16("clothes color")?;
    let name = msg.read_string(NAME_LEN, "name")?;
    let stats = read_stats(msg)?;
    let slot = msg.read_i16("slot")?;
    msg.read_i16("rename")?;
    let map = msg.read_string(MAP_NAME_LEN, "map name")?;
    msg.read_i32("delete date")?;
    msg.read_i32("robe")?;
    msg.read_i32("change slot")?;
    msg.read_i32("rename count")?;
    let sex = Gender::from_u8(msg.read_u8("sex")?);

    let slot = u8::try_from(slot)
        .map_err(|_| ClientError::InvalidData(format!("character slot {}", slot)))?;

    Ok(CharacterInfo {
        id,
        name,
        slot,
        class,
        base_level,
        job_level,
        base_exp,
        job_exp,
        money,
        hp,
        max_hp,
        sp,
        max_sp,
        hair_style,
        hair_color,
        stats,
        map: Some(map),
        sex: Some(sex),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use athena_core::AccountId;
    use crate::state::GameState;

    /// Character entry as a TmwAthena char server would send it
    pub(crate) fn write_tmwa_character(out: &mut MessageOut, id: u32, name: &str, slot: u8) {
        out.write_u32(id, "id")
            .write_i32(1200, "exp")
            .write_i32(5000, "money")
            .write_i32(300, "job exp")
            .write_i32(7, "job level");
        for _ in 0..4 {
            out.write_i16(0, "looks");
        }
        out.write_i32(0, "option").write_i32(0, "karma").write_i32(0, "manner");
        out.write_i16(0, "character points")
            .write_i16(150, "hp")
            .write_i16(180, "max hp")
            .write_i16(40, "mp")
            .write_i16(50, "max mp")
            .write_i16(150, "speed")
            .write_u16(0, "class")
            .write_u16(12, "hair style")
            .write_i16(0, "weapon")
            .write_u16(25, "level")
            .write_i16(3, "skill points")
            .write_i16(0, "head bottom")
            .write_i16(0, "shield")
            .write_i16(0, "head top")
            .write_i16(0, "head mid")
            .write_u16(4, "hair color")
            .write_i16(0, "misc2")
            .write_string(name, 24, "name")
            .write_raw(&[5, 6, 7, 8, 9, 10], "stats")
            .write_u8(slot, "slot")
            .write_u8(0, "unused");
    }

    fn write_eathena_character(out: &mut MessageOut, id: u32, name: &str, slot: i16) {
        out.write_u32(id, "id");
        for _ in 0..9 {
            out.write_i32(3, "exp block");
        }
        out.write_i16(0, "character points")
            .write_i32(4000, "hp")
            .write_i32(4200, "max hp");
        for _ in 0..13 {
            out.write_i16(1, "looks");
        }
        out.write_i16(0, "clothes color")
            .write_string(name, 24, "name")
            .write_raw(&[1, 1, 1, 1, 1, 1], "stats")
            .write_i16(slot, "slot")
            .write_i16(1, "rename")
            .write_string("prontera.gat", 16, "map")
            .write_i32(0, "delete date")
            .write_i32(0, "robe")
            .write_i32(0, "change slot")
            .write_i32(0, "rename count")
            .write_u8(0, "sex");
    }

    fn handle(handler: &mut CharServerHandler, state: &mut GameState, out: MessageOut) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
        handler
            .handle_message(&mut msg, &mut HandlerContext::new(state, &mut events))
            .unwrap();
        events
    }

    #[test]
    fn test_tmwa_character_list() {
        let mut handler = CharServerHandler::new(Dialect::TmwAthena);
        let mut state = GameState::new();

        let mut out = MessageOut::variable(packets::SMSG_CHAR_LOGIN);
        out.write_raw(&[0u8; 20], "unused");
        write_tmwa_character(&mut out, 150_001, "Second", 1);
        write_tmwa_character(&mut out, 150_000, "First", 0);
        assert_eq!(out.len(), 24 + 2 * TMWA_CHARACTER_LEN);

        handle(&mut handler, &mut state, out);
        let characters = state.characters();
        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0].name, "First");
        assert_eq!(characters[0].base_level, 25);
        assert_eq!(characters[0].job_level, 7);
        assert_eq!(characters[0].max_hp, 180);
        assert_eq!(characters[0].stats, [5, 6, 7, 8, 9, 10]);
        assert_eq!(characters[1].id, CharId::new(150_001));
        assert_eq!(state.char_slots(), None);
    }

    #[test]
    fn test_eathena_character_list() {
        let mut handler = CharServerHandler::new(Dialect::EAthena);
        let mut state = GameState::new();

        let mut out = MessageOut::variable(packets::SMSG_CHAR_LOGIN);
        out.write_u8(12, "slots")
            .write_u8(0, "premium start")
            .write_u8(0, "premium end")
            .write_raw(&[0u8; 20], "unused");
        write_eathena_character(&mut out, 150_010, "Knight", 3);
        assert_eq!(out.len(), 27 + EATHENA_CHARACTER_LEN);

        handle(&mut handler, &mut state, out);
        let character = state.character_in_slot(3).unwrap();
        assert_eq!(character.name, "Knight");
        assert_eq!(character.hp, 4000);
        assert_eq!(character.max_hp, 4200);
        assert_eq!(character.map.as_deref(), Some("prontera.gat"));
        assert_eq!(character.sex, Some(Gender::Female));
        assert_eq!(state.char_slots(), Some(12));
    }

    #[test]
    fn test_mismatched_entry_size_still_decodes_whole_entries() {
        let mut handler = CharServerHandler::new(Dialect::TmwAthena);
        let mut state = GameState::new();

        let mut out = MessageOut::variable(packets::SMSG_CHAR_LOGIN);
        out.write_raw(&[0u8; 20], "unused");
        write_tmwa_character(&mut out, 150_000, "Only", 0);
        out.write_raw(&[0xff; 5], "junk");

        handle(&mut handler, &mut state, out);
        assert_eq!(state.characters().len(), 1);
    }

    #[test]
    fn test_connect_embeds_token() {
        let handler = CharServerHandler::new(Dialect::TmwAthena);
        let token = SessionToken {
            account_id: AccountId::new(42),
            session_id1: 0xAABB_CCDD,
            session_id2: 7,
            sex: Gender::Male,
            ..SessionToken::default()
        };
        let bytes = handler.connect(&token).finish().unwrap();
        assert_eq!(bytes.len(), 17);
        assert_eq!(&bytes[2..6], &42u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &0xAABB_CCDDu32.to_le_bytes());
        assert_eq!(&bytes[14..16], &[1, 0]);
        assert_eq!(bytes[16], 1);
    }

    #[test]
    fn test_create_character_layouts() {
        let tmwa = CharServerHandler::new(Dialect::TmwAthena);
        let bytes = tmwa.create_character("Hero", 2, 3, 4, [5, 5, 5, 5, 5, 5]).finish().unwrap();
        assert_eq!(bytes.len(), 37);
        assert_eq!(&bytes[0..2], &[0x67, 0x00]);
        assert_eq!(bytes[32], 2);

        let eathena = CharServerHandler::new(Dialect::EAthena);
        let bytes = eathena.create_character("Hero", 2, 3, 4, [0; 6]).finish().unwrap();
        assert_eq!(bytes.len(), 31);
        assert_eq!(&bytes[0..2], &[0x70, 0x09]);
        assert_eq!(bytes[26], 2);
    }

    #[test]
    fn test_rename_and_change_slot_are_eathena_only() {
        let token = SessionToken {
            account_id: AccountId::new(42),
            ..SessionToken::default()
        };
        let tmwa = CharServerHandler::new(Dialect::TmwAthena);
        assert!(tmwa.rename_character(&token, CharId::new(150_000), "Hero").is_none());
        assert!(tmwa.change_slot(0, 2).is_none());

        let eathena = CharServerHandler::new(Dialect::EAthena);
        let bytes = eathena
            .rename_character(&token, CharId::new(150_000), "Hero")
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[0..2], &[0x8d, 0x02]);
        assert_eq!(&bytes[2..6], &42u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &150_000u32.to_le_bytes());
        assert_eq!(&bytes[10..14], b"Hero");

        let bytes = eathena.change_slot(0, 2).unwrap().finish().unwrap();
        assert_eq!(&bytes[..], &[0xd4, 0x08, 0, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn test_map_info_assigns_server() {
        let mut handler = CharServerHandler::new(Dialect::TmwAthena);
        let mut state = GameState::new();

        let mut out = MessageOut::new(packets::SMSG_CHAR_MAP_INFO);
        out.write_u32(150_000, "char id")
            .write_string("009-1.gat", 16, "map")
            .write_ipv4([192, 168, 0, 7], "ip")
            .write_u16(5122, "port");
        assert_eq!(out.len(), 28);

        let events = handle(&mut handler, &mut state, out);
        assert_eq!(state.token().char_id, CharId::new(150_000));
        assert_eq!(state.map_server().map(|s| s.address()), Some("192.168.0.7:5122".into()));
        assert_eq!(state.player().map, "009-1.gat");
        assert!(matches!(events[0], ClientEvent::MapServerAssigned { .. }));
    }

    #[test]
    fn test_delete_confirmation_removes_pending() {
        let mut handler = CharServerHandler::new(Dialect::TmwAthena);
        let mut state = GameState::new();
        state.add_character(CharacterInfo {
            id: CharId::new(9),
            ..CharacterInfo::default()
        });
        state.set_pending_delete(CharId::new(9));

        let events = handle(&mut handler, &mut state, MessageOut::new(packets::SMSG_CHAR_DELETE_SUCCEEDED));
        assert!(state.characters().is_empty());
        assert_eq!(
            events,
            vec![ClientEvent::CharacterDeleted {
                char_id: Some(CharId::new(9))
            }]
        );
    }
}
