//! # Login Server Handler
//!
//! Version handshake, credential check and the char server list.

use athena_core::{AccountId, Dialect, Gender, Result, ServerInfo, SessionToken};
use athena_protocol::packets::{self, eathena};
use athena_protocol::{MessageIn, MessageOut};

use crate::events::ClientEvent;
use crate::handler::{entry_count, HandlerContext, MessageHandler};
use crate::state::ServerVersion;

/// Client type byte sent with the login request
const CLIENT_TYPE: u8 = 3;

/// One char server entry in the login data
const CHAR_SERVER_ENTRY_LEN: usize = 32;

const NAME_LEN: usize = 24;

/// One host in the eAthena update host list
const UPDATE_HOST_LEN: usize = 128;

const TMWA_MESSAGES: &[u16] = &[
    packets::SMSG_SERVER_VERSION_RESPONSE,
    packets::SMSG_UPDATE_HOST,
    packets::SMSG_LOGIN_DATA,
    packets::SMSG_LOGIN_ERROR,
    packets::SMSG_CHAR_PASSWORD_RESPONSE,
];

const EATHENA_MESSAGES: &[u16] = &[
    packets::SMSG_SERVER_VERSION_RESPONSE,
    packets::SMSG_UPDATE_HOST,
    packets::SMSG_LOGIN_DATA,
    packets::SMSG_LOGIN_ERROR,
    packets::SMSG_CHAR_PASSWORD_RESPONSE,
    eathena::SMSG_LOGIN_ERROR2,
    eathena::SMSG_UPDATE_HOST2,
    eathena::SMSG_LOGIN_CODING_KEY,
];

/// Human readable login error
pub fn login_error_reason(code: u32, date: &str) -> String {
    match code {
        0 => "Unregistered ID".into(),
        1 => "Wrong password".into(),
        2 => "Account expired".into(),
        3 => "Rejected from server".into(),
        4 => "You have been permanently banned from the game. Please contact the GM team".into(),
        5 => "Client too old".into(),
        6 => format!("You have been temporarily banned from the game until {}", date),
        7 => "Server overpopulated".into(),
        9 => "This user name is already taken".into(),
        99 => "Username permanently erased".into(),
        _ => format!("Unknown error {}", code),
    }
}

pub struct LoginHandler {
    dialect: Dialect,
    client_version: u32,
}

impl LoginHandler {
    pub fn new(dialect: Dialect, client_version: u32) -> Self {
        Self {
            dialect,
            client_version,
        }
    }

    fn process_server_version(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let version = match self.dialect {
            Dialect::TmwAthena => {
                let major = msg.read_u8("major")?;
                let minor = msg.read_u8("minor")?;
                let patch = msg.read_u8("patch")?;
                let devel = msg.read_u8("devel")?;
                let flags = msg.read_u8("flags")?;
                msg.read_u8("which")?;
                let vendor = msg.read_u16("vendor")?;
                ServerVersion::TmwAthena {
                    major,
                    minor,
                    patch,
                    devel,
                    flags,
                    vendor,
                }
            }
            Dialect::EAthena => {
                msg.read_u16("length")?;
                ServerVersion::EAthena {
                    server_type: msg.read_i32("server type")?,
                    version: msg.read_i32("server version")?,
                }
            }
        };

        tracing::info!("Server version: {:?}", version);
        ctx.state.set_server_version(version.clone());
        ctx.emit(ClientEvent::ServerVersion { version });
        Ok(())
    }

    fn process_update_host(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let host = msg.read_remaining_string("update host");
        ctx.state.set_update_host(host.clone());
        ctx.emit(ClientEvent::UpdateHost { host });
        Ok(())
    }

    /// eAthena list of fixed-width update hosts
    fn process_update_host2(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, UPDATE_HOST_LEN, "update host");
        let mut hosts = Vec::with_capacity(count);
        for _ in 0..count {
            let host = msg.read_string(UPDATE_HOST_LEN, "host")?;
            if !host.is_empty() {
                hosts.push(host);
            }
        }

        if let Some(first) = hosts.first() {
            ctx.state.set_update_host(first.clone());
        }
        ctx.emit(ClientEvent::UpdateHosts { hosts });
        Ok(())
    }

    fn process_coding_key(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let len = usize::from(msg.read_u16("length")?);
        let key = msg.read_bytes(len.saturating_sub(4), "coding key")?;
        tracing::debug!("Login server sent a {} byte coding key", key.len());
        ctx.state.set_coding_key(key);
        Ok(())
    }

    fn process_login_data(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let session_id1 = msg.read_u32("session id1")?;
        let account_id = AccountId::new(msg.read_u32("account id")?);
        let session_id2 = msg.read_u32("session id2")?;
        msg.read_ipv4("last ip")?;
        let last_login = msg.read_string(24, "last login")?;
        msg.skip(2, "unused")?;
        let sex = Gender::from_u8(msg.read_u8("sex")?);

        let count = entry_count(msg, CHAR_SERVER_ENTRY_LEN, "char server");
        let mut servers = Vec::with_capacity(count);
        for _ in 0..count {
            let ip = msg.read_ipv4("ip")?;
            let port = msg.read_u16("port")?;
            let name = msg.read_string(20, "name")?;
            let users = msg.read_u16("online users")?;
            msg.read_u16("maintenance")?;
            msg.read_u16("new")?;

            let mut server = ServerInfo::from_wire(ip, port).with_name(name);
            server.online_users = users;
            servers.push(server);
        }

        tracing::info!(
            "Login accepted for account {}, {} char servers",
            account_id.get(),
            servers.len()
        );

        ctx.state.set_token(SessionToken {
            account_id,
            session_id1,
            session_id2,
            sex,
            last_login,
            ..SessionToken::default()
        });
        ctx.state.set_char_servers(servers.clone());
        ctx.emit(ClientEvent::LoginSucceeded {
            account_id,
            char_servers: servers,
        });
        Ok(())
    }

    fn process_login_error(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let code = u32::from(msg.read_u8("error")?);
        self.login_refused(code, msg, ctx)
    }

    /// Same refusal with a 32-bit code (eAthena)
    fn process_login_error2(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let code = msg.read_u32("error")?;
        self.login_refused(code, msg, ctx)
    }

    fn login_refused(&self, code: u32, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let date = msg.read_string(20, "unban date")?;
        let reason = login_error_reason(code, &date);
        tracing::warn!("Login refused: {}", reason);
        ctx.emit(ClientEvent::LoginFailed { code, reason });
        Ok(())
    }

    fn process_password_response(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let code = msg.read_u8("status")?;
        ctx.emit(ClientEvent::PasswordChanged {
            ok: code == 1,
            code,
        });
        Ok(())
    }

    // === Outbound ===

    /// Version query sent before the login request (TmwAthena only)
    pub fn server_version_request(&self) -> Option<MessageOut> {
        match self.dialect {
            Dialect::TmwAthena => Some(MessageOut::new(packets::CMSG_SERVER_VERSION_REQUEST)),
            Dialect::EAthena => None,
        }
    }

    pub fn login_register(&self, username: &str, password: &str) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_LOGIN_REGISTER);
        out.write_u32(self.client_version, "client version")
            .write_string(username, NAME_LEN, "username")
            .write_string(password, NAME_LEN, "password")
            .write_u8(CLIENT_TYPE, "client type");
        out
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_CHAR_PASSWORD_CHANGE);
        out.write_string(old_password, NAME_LEN, "old password")
            .write_string(new_password, NAME_LEN, "new password");
        out
    }

    /// Login server keep-alive (eAthena only)
    pub fn ping(&self, username: &str) -> Option<MessageOut> {
        match self.dialect {
            Dialect::TmwAthena => None,
            Dialect::EAthena => {
                let mut out = MessageOut::new(eathena::CMSG_LOGIN_PING);
                out.write_string(username, NAME_LEN, "account name");
                Some(out)
            }
        }
    }
}

impl MessageHandler for LoginHandler {
    fn name(&self) -> &'static str {
        "login"
    }

    fn handled_messages(&self) -> &[u16] {
        match self.dialect {
            Dialect::TmwAthena => TMWA_MESSAGES,
            Dialect::EAthena => EATHENA_MESSAGES,
        }
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            packets::SMSG_SERVER_VERSION_RESPONSE => self.process_server_version(msg, ctx),
            packets::SMSG_UPDATE_HOST => self.process_update_host(msg, ctx),
            packets::SMSG_LOGIN_DATA => self.process_login_data(msg, ctx),
            packets::SMSG_LOGIN_ERROR => self.process_login_error(msg, ctx),
            packets::SMSG_CHAR_PASSWORD_RESPONSE => self.process_password_response(msg, ctx),
            eathena::SMSG_LOGIN_ERROR2 => self.process_login_error2(msg, ctx),
            eathena::SMSG_UPDATE_HOST2 => self.process_update_host2(msg, ctx),
            eathena::SMSG_LOGIN_CODING_KEY => self.process_coding_key(msg, ctx),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;

    fn handle(handler: &mut LoginHandler, out: MessageOut) -> (GameState, Vec<ClientEvent>) {
        let mut state = GameState::new();
        let mut events = Vec::new();
        let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
        handler
            .handle_message(&mut msg, &mut HandlerContext::new(&mut state, &mut events))
            .unwrap();
        (state, events)
    }

    fn login_data(account: u32, session1: u32, servers: &[([u8; 4], u16, &str)]) -> MessageOut {
        let mut out = MessageOut::variable(packets::SMSG_LOGIN_DATA);
        out.write_u32(session1, "session id1")
            .write_u32(account, "account id")
            .write_u32(0x1122_3344, "session id2")
            .write_ipv4([0, 0, 0, 0], "last ip")
            .write_string("2024-01-01 10:00:00", 24, "last login")
            .write_u16(0, "unused")
            .write_u8(1, "sex");
        for (ip, port, name) in servers {
            out.write_ipv4(*ip, "ip")
                .write_u16(*port, "port")
                .write_string(name, 20, "name")
                .write_u16(17, "users")
                .write_u16(0, "maintenance")
                .write_u16(0, "new");
        }
        out
    }

    #[test]
    fn test_login_register_layout() {
        let handler = LoginHandler::new(Dialect::TmwAthena, 20);
        let bytes = handler.login_register("tester", "secret").finish().unwrap();
        assert_eq!(bytes.len(), 55);
        assert_eq!(&bytes[0..2], &[0x64, 0x00]);
        assert_eq!(&bytes[2..6], &20u32.to_le_bytes());
        assert_eq!(&bytes[6..12], b"tester");
        assert_eq!(bytes[12], 0);
        assert_eq!(&bytes[30..36], b"secret");
        assert_eq!(bytes[54], 3);
    }

    #[test]
    fn test_version_request_only_for_tmwa() {
        assert!(LoginHandler::new(Dialect::TmwAthena, 20).server_version_request().is_some());
        assert!(LoginHandler::new(Dialect::EAthena, 20).server_version_request().is_none());
        assert!(LoginHandler::new(Dialect::TmwAthena, 20).ping("tester").is_none());
        assert_eq!(
            LoginHandler::new(Dialect::EAthena, 20).ping("tester").map(|m| m.finish().unwrap().len()),
            Some(26)
        );
    }

    #[test]
    fn test_login_data_fills_token_and_servers() {
        let mut handler = LoginHandler::new(Dialect::TmwAthena, 20);
        let out = login_data(42, 0xAABB_CCDD, &[([10, 0, 0, 2], 6122, "World")]);
        let (state, events) = handle(&mut handler, out);

        let token = state.token();
        assert_eq!(token.account_id, AccountId::new(42));
        assert_eq!(token.session_id1, 0xAABB_CCDD);
        assert_eq!(token.session_id2, 0x1122_3344);
        assert_eq!(token.sex, Gender::Male);
        assert_eq!(token.last_login, "2024-01-01 10:00:00");

        let servers = state.char_servers();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].address(), "10.0.0.2:6122");
        assert_eq!(servers[0].name, "World");
        assert_eq!(servers[0].online_users, 17);
        assert!(matches!(events[0], ClientEvent::LoginSucceeded { .. }));
    }

    #[test]
    fn test_login_error_reason() {
        let mut handler = LoginHandler::new(Dialect::EAthena, 20);
        let mut out = MessageOut::new(packets::SMSG_LOGIN_ERROR);
        out.write_u8(6, "error").write_string("2030-01-01", 20, "date");
        let (_, events) = handle(&mut handler, out);

        match &events[0] {
            ClientEvent::LoginFailed { code, reason } => {
                assert_eq!(*code, 6);
                assert!(reason.contains("2030-01-01"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(login_error_reason(1, ""), "Wrong password");
    }

    #[test]
    fn test_eathena_login_error2_matches_login_error() {
        let mut handler = LoginHandler::new(Dialect::EAthena, 20);
        let mut out = MessageOut::new(eathena::SMSG_LOGIN_ERROR2);
        out.write_u32(1, "error").write_string("", 20, "date");
        assert_eq!(out.len(), 26);

        let (_, events) = handle(&mut handler, out);
        assert_eq!(
            events,
            vec![ClientEvent::LoginFailed {
                code: 1,
                reason: "Wrong password".into()
            }]
        );
    }

    #[test]
    fn test_eathena_update_hosts_and_coding_key() {
        let mut handler = LoginHandler::new(Dialect::EAthena, 20);
        let mut hosts = MessageOut::variable(eathena::SMSG_UPDATE_HOST2);
        hosts
            .write_string("http://updates.example.org/", 128, "host")
            .write_string("http://mirror.example.org/", 128, "host");
        let (state, events) = handle(&mut handler, hosts);
        assert_eq!(state.update_host(), Some("http://updates.example.org/"));
        assert_eq!(
            events,
            vec![ClientEvent::UpdateHosts {
                hosts: vec![
                    "http://updates.example.org/".into(),
                    "http://mirror.example.org/".into()
                ]
            }]
        );

        let mut key = MessageOut::variable(eathena::SMSG_LOGIN_CODING_KEY);
        key.write_raw(&[9, 8, 7, 6], "key");
        let (state, events) = handle(&mut handler, key);
        assert_eq!(state.coding_key(), Some(&[9u8, 8, 7, 6][..]));
        assert!(events.is_empty());
    }

    #[test]
    fn test_eathena_only_login_messages() {
        let tmwa = LoginHandler::new(Dialect::TmwAthena, 20);
        assert!(!tmwa.handled_messages().contains(&eathena::SMSG_LOGIN_ERROR2));
        let eathena_handler = LoginHandler::new(Dialect::EAthena, 20);
        assert!(eathena_handler.handled_messages().contains(&eathena::SMSG_LOGIN_ERROR2));
    }

    #[test]
    fn test_server_version_per_dialect() {
        let mut tmwa = LoginHandler::new(Dialect::TmwAthena, 20);
        let mut out = MessageOut::new(packets::SMSG_SERVER_VERSION_RESPONSE);
        out.write_u8(14, "major")
            .write_u8(11, "minor")
            .write_u8(7, "patch")
            .write_u8(0, "devel")
            .write_u8(0x01, "flags")
            .write_u8(1, "which")
            .write_u16(1, "vendor");
        let (state, _) = handle(&mut tmwa, out);
        assert!(matches!(
            state.server_version(),
            Some(ServerVersion::TmwAthena { major: 14, minor: 11, patch: 7, .. })
        ));

        let mut eathena = LoginHandler::new(Dialect::EAthena, 20);
        let mut out = MessageOut::variable(packets::SMSG_SERVER_VERSION_RESPONSE);
        out.write_i32(1, "server type").write_i32(20151029, "version");
        let (state, _) = handle(&mut eathena, out);
        assert_eq!(
            state.server_version(),
            Some(&ServerVersion::EAthena {
                server_type: 1,
                version: 20151029
            })
        );
    }
}
