//! # Map Session Handler
//!
//! Map server authentication, keep-alive, quitting and character switching.

use athena_core::{AccountId, Dialect, Result, SessionToken, TilePosition};
use athena_protocol::packets::{self, eathena, tmwa};
use athena_protocol::{MessageIn, MessageOut};

use crate::events::ClientEvent;
use crate::handler::{HandlerContext, MessageHandler};

const MAP_NAME_LEN: usize = 16;

/// Restart type asking to go back to character select
const RESTART_CHAR_SELECT: u8 = 1;

const TMWA_MESSAGES: &[u16] = &[
    tmwa::SMSG_MAP_LOGIN_SUCCESS,
    packets::SMSG_MAP_AUTH_REFUSE,
    packets::SMSG_SERVER_PING,
    packets::SMSG_WHO_ANSWER,
    packets::SMSG_CHAR_SWITCH_RESPONSE,
    packets::SMSG_MAP_QUIT_RESPONSE,
    packets::SMSG_PLAYER_WARP,
];

const EATHENA_MESSAGES: &[u16] = &[
    eathena::SMSG_MAP_LOGIN_SUCCESS,
    eathena::SMSG_MAP_ACCOUNT_ID,
    packets::SMSG_MAP_AUTH_REFUSE,
    packets::SMSG_SERVER_PING,
    packets::SMSG_WHO_ANSWER,
    packets::SMSG_CHAR_SWITCH_RESPONSE,
    packets::SMSG_MAP_QUIT_RESPONSE,
    packets::SMSG_PLAYER_WARP,
];

/// Why the map server turned the client away
pub fn map_auth_refuse_reason(code: u8) -> String {
    match code {
        1 => "Server closed".into(),
        2 => "Someone else is trying to use this account".into(),
        3 => "Speed hack detected".into(),
        8 => "Duplicated login".into(),
        _ => format!("Unknown reason {}", code),
    }
}

pub struct GameHandler {
    dialect: Dialect,
}

impl GameHandler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    fn process_map_login(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let tick = msg.read_u32("start time")?;
        let position = msg.read_coordinates("position")?;
        msg.read_u8("x size")?;
        msg.read_u8("y size")?;
        if self.dialect == Dialect::EAthena {
            msg.read_u16("font")?;
            msg.read_u8("sex")?;
        }

        tracing::info!(
            "Map login accepted, start position ({}, {}) facing {}",
            position.x,
            position.y,
            position.direction
        );
        ctx.state.set_server_tick(tick);
        ctx.state.set_position(position);
        ctx.emit(ClientEvent::MapLoginSucceeded { tick, position });
        Ok(())
    }

    fn process_account_id(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let account_id = AccountId::new(msg.read_u32("account id")?);
        if account_id != ctx.state.token().account_id {
            tracing::warn!(
                "Map server reports account {} but logged in as {}",
                account_id.get(),
                ctx.state.token().account_id.get()
            );
        }
        Ok(())
    }

    fn process_warp(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let map = msg.read_string(MAP_NAME_LEN, "map name")?;
        let x = msg.read_u16("x")?;
        let y = msg.read_u16("y")?;
        let position = TilePosition::new(x, y);

        tracing::info!("Warped to {} ({}, {})", map, x, y);
        ctx.state.leave_map();
        ctx.state.set_map(map.clone(), position);
        ctx.emit(ClientEvent::Warped { map, position });
        Ok(())
    }

    // === Outbound ===

    /// Authenticate with the map server
    pub fn connect(&self, token: &SessionToken) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_MAP_SERVER_CONNECT);
        out.write_u32(token.account_id.get(), "account id")
            .write_u32(token.char_id.get(), "char id")
            .write_u32(token.session_id1, "session id1")
            .write_u32(0, "tick")
            .write_u8(token.sex.as_u8(), "sex");
        out
    }

    /// Tell the server the map is loaded and the player can appear
    pub fn map_loaded(&self) -> MessageOut {
        MessageOut::new(packets::CMSG_MAP_LOADED)
    }

    pub fn ping(&self, tick: u32) -> MessageOut {
        let opcode = match self.dialect {
            Dialect::TmwAthena => tmwa::CMSG_MAP_PING,
            Dialect::EAthena => eathena::CMSG_MAP_PING,
        };
        let mut out = MessageOut::new(opcode);
        out.write_u32(tick, "tick");
        out
    }

    pub fn quit(&self) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_CLIENT_QUIT);
        out.write_u16(0, "unused");
        out
    }

    /// Ask to return to character select
    pub fn switch_character(&self) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_PLAYER_RESTART);
        out.write_u8(RESTART_CHAR_SELECT, "type");
        out
    }

    pub fn who_request(&self) -> MessageOut {
        MessageOut::new(packets::CMSG_WHO_REQUEST)
    }
}

impl MessageHandler for GameHandler {
    fn name(&self) -> &'static str {
        "game"
    }

    fn handled_messages(&self) -> &[u16] {
        match self.dialect {
            Dialect::TmwAthena => TMWA_MESSAGES,
            Dialect::EAthena => EATHENA_MESSAGES,
        }
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            tmwa::SMSG_MAP_LOGIN_SUCCESS | eathena::SMSG_MAP_LOGIN_SUCCESS => {
                self.process_map_login(msg, ctx)
            }
            eathena::SMSG_MAP_ACCOUNT_ID => self.process_account_id(msg, ctx),
            packets::SMSG_MAP_AUTH_REFUSE => {
                let code = msg.read_u8("error")?;
                let reason = map_auth_refuse_reason(code);
                tracing::warn!("Map server refused: {}", reason);
                ctx.emit(ClientEvent::MapAuthRefused { code, reason });
                Ok(())
            }
            packets::SMSG_SERVER_PING => {
                let tick = msg.read_u32("tick")?;
                ctx.state.set_server_tick(tick);
                Ok(())
            }
            packets::SMSG_WHO_ANSWER => {
                let count = msg.read_u32("online count")?;
                ctx.state.set_online_users(count);
                ctx.emit(ClientEvent::OnlineUsers { count });
                Ok(())
            }
            packets::SMSG_CHAR_SWITCH_RESPONSE => {
                let ok = msg.read_u8("response")? != 0;
                ctx.emit(ClientEvent::CharSwitchResponse { ok });
                Ok(())
            }
            packets::SMSG_MAP_QUIT_RESPONSE => {
                let ok = msg.read_u16("response")? == 0;
                ctx.emit(ClientEvent::QuitResponse { ok });
                Ok(())
            }
            packets::SMSG_PLAYER_WARP => self.process_warp(msg, ctx),
            _ => Ok(()),
        }
    }
}
