//! # Session Controller
//!
//! [`Session`] owns at most one [`Connection`] per server role, the handler
//! set and the [`GameState`]. It is driven by the caller's logic loop:
//! [`Session::tick`] drains queued inbound messages, runs them through the
//! handlers, reacts to the events that move the state machine, and keeps
//! the connections alive.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ─connect_login─→ ConnectingLogin ─┬─ login data ─→ LoginOk
//!                                                └─ login error → LoginError
//! LoginOk ─connect_char_server─→ ConnectingChar ─ char list ─→ CharSelect
//! CharSelect ─ map info ─→ ConnectingMap ─ map login ─→ InGame
//! InGame ─ warp / change map server ─→ ChangingMap ─ map login / map_loaded ─→ InGame
//! InGame ─ switch ok ─→ ConnectingChar
//! any ─ quit ok / disconnect / connection loss ─→ Disconnected
//! ```
//!
//! Every role switch tears the old connection down before anything from the
//! new one is dispatched; whatever the old connection still had queued is
//! discarded. After a map login, map dispatch stays paused until the caller
//! reports the map loaded with [`Session::map_loaded`].

use athena_config::{ClientConfig, PingTimeoutAction};
use athena_core::{CharId, ClientError, Dialect, Result, ServerInfo, ServerRole};
use athena_game::{ClientEvent, GameState, Handlers};
use athena_network::{Connection, ConnectionEvent, MessageFramer};
use athena_protocol::MessageOut;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::events::SessionEvent;
use crate::liveness::Liveness;
use crate::state::SessionState;

/// Raw bytes the eAthena char server sends before its first message
const EATHENA_CHAR_PREAMBLE: usize = 4;

/// Account name and password for the login server
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// One live connection and its keep-alive bookkeeping
struct Link {
    conn: Connection,
    liveness: Liveness,
}

/// How a connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkEnd {
    Closed,
    Failed,
}

pub struct Session {
    config: ClientConfig,
    handlers: Handlers,
    game: GameState,
    state: SessionState,
    login: Option<Link>,
    char_server: Option<Link>,
    map: Option<Link>,
    /// Char server picked after login, reused when returning from the game
    char_server_info: Option<ServerInfo>,
    username: String,
    map_load_pending: bool,
    started: Instant,
    subscribers: Vec<mpsc::UnboundedSender<SessionEvent>>,
}

impl Session {
    /// Build a session for the configured dialect
    ///
    /// # Errors
    /// `DuplicateOpcode` if the handler set is inconsistent.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let handlers = Handlers::new(config.dialect, config.features, config.client_version)?;
        Ok(Self {
            config,
            handlers,
            game: GameState::new(),
            state: SessionState::Disconnected,
            login: None,
            char_server: None,
            map: None,
            char_server_info: None,
            username: String::new(),
            map_load_pending: false,
            started: Instant::now(),
            subscribers: Vec::new(),
        })
    }

    /// Receive every event from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Everything learned from the servers so far
    #[inline]
    pub fn game(&self) -> &GameState {
        &self.game
    }

    #[inline]
    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether map dispatch is held until [`map_loaded`](Self::map_loaded)
    #[inline]
    pub fn map_load_pending(&self) -> bool {
        self.map_load_pending
    }

    pub fn is_connected(&self, role: ServerRole) -> bool {
        self.link(role).map_or(false, |link| link.conn.is_connected())
    }

    /// Address of the live connection for `role`
    pub fn server(&self, role: ServerRole) -> Option<&ServerInfo> {
        self.link(role).map(|link| link.conn.server())
    }

    // === Collaborator operations ===

    /// Connect to the login server and send the credentials
    ///
    /// # Errors
    /// `InvalidState` unless disconnected or after a login error;
    /// `Connection` if the login server cannot be reached.
    pub async fn connect_login(&mut self, credentials: Credentials) -> Result<()> {
        if !self.state.can_login() {
            return Err(self.wrong_state("connect_login"));
        }

        self.teardown_all();
        self.game = GameState::new();
        self.username = credentials.username.clone();
        self.set_state(SessionState::ConnectingLogin);

        let server = self.config.login_server();
        self.open(ServerRole::Login, server).await?;

        if let Some(version) = self.handlers.login().server_version_request() {
            self.send(ServerRole::Login, version)?;
        }
        let register = self
            .handlers
            .login()
            .login_register(&credentials.username, &credentials.password);
        self.send(ServerRole::Login, register)
    }

    /// Leave the login server for the char server at `index` in its list
    ///
    /// # Errors
    /// `InvalidState` unless logged in, `InvalidData` for an index outside the
    /// list, `Connection` if the char server cannot be reached.
    pub async fn connect_char_server(&mut self, index: usize) -> Result<()> {
        if self.state != SessionState::LoginOk {
            return Err(self.wrong_state("connect_char_server"));
        }

        let server = self.game.char_servers().get(index).cloned().ok_or_else(|| {
            ClientError::InvalidData(format!(
                "char server {} not in list of {}",
                index,
                self.game.char_servers().len()
            ))
        })?;
        let server = self.resolve_server(server);
        tracing::info!("Selected char server {} ({})", server.name, server.address());

        self.teardown(ServerRole::Login);
        self.char_server_info = Some(server.clone());
        self.enter_char_server(server).await
    }

    /// Play the character in `slot`
    pub fn select_character(&mut self, slot: u8) -> Result<()> {
        self.require(SessionState::CharSelect, "select_character")?;
        if self.game.character_in_slot(slot).is_none() {
            tracing::warn!("No known character in slot {}", slot);
        }
        let msg = self.handlers.char_server().select_character(slot);
        self.send(ServerRole::Char, msg)
    }

    pub fn create_character(
        &mut self,
        name: &str,
        slot: u8,
        hair_color: u16,
        hair_style: u16,
        stats: [u8; 6],
    ) -> Result<()> {
        self.require(SessionState::CharSelect, "create_character")?;
        let msg = self
            .handlers
            .char_server()
            .create_character(name, slot, hair_color, hair_style, stats);
        self.send(ServerRole::Char, msg)
    }

    /// Ask to delete a character; the list changes once the server confirms
    pub fn delete_character(&mut self, char_id: CharId, email: &str) -> Result<()> {
        self.require(SessionState::CharSelect, "delete_character")?;
        let msg = self.handlers.char_server().delete_character(char_id, email);
        self.send(ServerRole::Char, msg)?;
        self.game.set_pending_delete(char_id);
        Ok(())
    }

    /// Rename a character; only eAthena char servers support it
    ///
    /// # Errors
    /// `InvalidState` outside character select or on TmwAthena.
    pub fn rename_character(&mut self, char_id: CharId, name: &str) -> Result<()> {
        self.require(SessionState::CharSelect, "rename_character")?;
        let token = self.game.token().clone();
        self.send_to(ServerRole::Char, |h| h.char_server().rename_character(&token, char_id, name))
    }

    /// Move a character to another slot; only eAthena char servers support it
    pub fn change_slot(&mut self, old_slot: u16, new_slot: u16) -> Result<()> {
        self.require(SessionState::CharSelect, "change_slot")?;
        self.send_to(ServerRole::Char, |h| h.char_server().change_slot(old_slot, new_slot))
    }

    /// Report the map loaded and resume map dispatch
    ///
    /// # Errors
    /// `InvalidState` if no map load is pending.
    pub fn map_loaded(&mut self) -> Result<()> {
        if !self.map_load_pending || !self.state.on_map_server() {
            return Err(self.wrong_state("map_loaded"));
        }

        let msg = self.handlers.game().map_loaded();
        self.send(ServerRole::Map, msg)?;
        self.map_load_pending = false;
        if let Some(link) = self.map.as_mut() {
            link.conn.resume_dispatch();
        }
        if self.state == SessionState::ChangingMap {
            self.set_state(SessionState::InGame);
        }
        Ok(())
    }

    /// Send a keep-alive on every live connection now
    pub fn ping(&mut self) {
        let now = Instant::now();
        for role in ServerRole::ALL {
            self.send_ping(role, now);
        }
    }

    /// Ask the map server to return to character select
    pub fn switch_character(&mut self) -> Result<()> {
        self.require_map("switch_character")?;
        let msg = self.handlers.game().switch_character();
        self.send(ServerRole::Map, msg)
    }

    /// Ask the map server to log out; the session ends on its answer
    pub fn quit(&mut self) -> Result<()> {
        self.require_map("quit")?;
        let msg = self.handlers.game().quit();
        self.send(ServerRole::Map, msg)
    }

    /// Drop every connection immediately
    pub fn disconnect(&mut self) {
        self.teardown_all();
        self.set_state(SessionState::Disconnected);
    }

    /// Build a message with one of the handlers and send it to `role`
    ///
    /// The builder may return an `Option` for messages that only exist in one
    /// dialect.
    ///
    /// # Errors
    /// `InvalidState` when the message does not exist in this dialect,
    /// `Connection` when `role` is not connected.
    pub fn send_to<F, M>(&mut self, role: ServerRole, build: F) -> Result<()>
    where
        F: FnOnce(&Handlers) -> M,
        M: Into<Option<MessageOut>>,
    {
        match build(&self.handlers).into() {
            Some(msg) => self.send(role, msg),
            None => Err(ClientError::InvalidState(format!(
                "message not available on {}",
                self.config.dialect.as_str()
            ))),
        }
    }

    // === Logic loop ===

    /// Process everything queued and run keep-alives
    ///
    /// # Returns
    /// Number of messages dispatched
    pub async fn tick(&mut self) -> usize {
        let mut dispatched = 0;
        for role in ServerRole::ALL {
            dispatched += self.drain(role).await;
        }
        self.check_liveness(Instant::now());
        dispatched
    }

    async fn drain(&mut self, role: ServerRole) -> usize {
        let mut dispatched = 0;
        loop {
            let Some(link) = self.link_mut(role) else {
                break;
            };

            let event = match link.conn.next_event() {
                Some(event) => event,
                None => {
                    // A paused connection cannot deliver its close event
                    if link.conn.is_paused() && !link.conn.is_connected() {
                        self.connection_lost(role, LinkEnd::Closed, "connection closed while paused".into());
                    }
                    break;
                }
            };

            match event {
                ConnectionEvent::Message(mut msg) => {
                    tracing::debug!("<- {} 0x{:04x} ({} bytes)", role, msg.opcode(), msg.len());

                    let mut events = Vec::new();
                    match self.handlers.dispatch(&mut msg, &mut self.game, &mut events) {
                        Ok(true) => dispatched += 1,
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!("Dropped {} message 0x{:04x}: {}", role, msg.opcode(), e);
                            self.publish(SessionEvent::MessageDropped {
                                role,
                                opcode: msg.opcode(),
                                error: e.to_string(),
                            });
                        }
                    }

                    for event in events {
                        self.publish(SessionEvent::Decoded(event.clone()));
                        self.react(&event).await;
                    }
                }
                ConnectionEvent::Closed => {
                    self.connection_lost(role, LinkEnd::Closed, "closed by server".into());
                }
                ConnectionEvent::Failed(e) => {
                    self.connection_lost(role, LinkEnd::Failed, e.to_string());
                }
            }
        }
        dispatched
    }

    /// Drive the state machine from a decoded event
    async fn react(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::LoginSucceeded { .. } if self.state == SessionState::ConnectingLogin => {
                self.set_state(SessionState::LoginOk);
            }
            ClientEvent::LoginFailed { .. } if self.state == SessionState::ConnectingLogin => {
                self.teardown(ServerRole::Login);
                self.set_state(SessionState::LoginError);
            }
            ClientEvent::CharacterList { .. } if self.state == SessionState::ConnectingChar => {
                self.set_state(SessionState::CharSelect);
            }
            ClientEvent::CharLoginFailed { reason, .. } => {
                tracing::warn!("{}", ClientError::AuthRefused(reason.clone()));
                self.teardown_all();
                self.set_state(SessionState::Disconnected);
            }
            ClientEvent::MapServerAssigned { server, .. } if self.state == SessionState::CharSelect => {
                self.teardown(ServerRole::Char);
                self.set_state(SessionState::ConnectingMap);
                let server = self.resolve_server(server.clone());
                self.enter_map_server(server).await;
            }
            ClientEvent::MapLoginSucceeded { .. }
                if matches!(self.state, SessionState::ConnectingMap | SessionState::ChangingMap) =>
            {
                self.await_map_load();
                self.set_state(SessionState::InGame);
            }
            ClientEvent::MapAuthRefused { reason, .. } => {
                tracing::warn!("{}", ClientError::AuthRefused(reason.clone()));
                self.teardown_all();
                self.set_state(SessionState::Disconnected);
            }
            ClientEvent::Warped { .. } if self.state == SessionState::InGame => {
                self.await_map_load();
                self.set_state(SessionState::ChangingMap);
            }
            ClientEvent::MapServerChanged { server, .. } if self.state == SessionState::InGame => {
                self.teardown(ServerRole::Map);
                self.set_state(SessionState::ChangingMap);
                let server = self.resolve_server(server.clone());
                self.enter_map_server(server).await;
            }
            ClientEvent::CharSwitchResponse { ok: true } if self.state == SessionState::InGame => {
                self.teardown(ServerRole::Map);
                match self.char_server_info.clone() {
                    Some(server) => {
                        if let Err(e) = self.enter_char_server(server).await {
                            tracing::warn!("Could not return to character select: {}", e);
                        }
                    }
                    None => {
                        self.publish(SessionEvent::NetworkError {
                            role: ServerRole::Char,
                            error: "no char server to return to".into(),
                        });
                        self.teardown_all();
                        self.set_state(SessionState::Disconnected);
                    }
                }
            }
            ClientEvent::QuitResponse { ok: true } => {
                tracing::info!("Server accepted logout");
                self.disconnect();
            }
            _ => {}
        }
    }

    fn check_liveness(&mut self, now: Instant) {
        for role in ServerRole::ALL {
            // Messages held by a paused connection still prove the server is alive
            if let Some(link) = self.link_mut(role) {
                if let Some(received) = link.conn.last_received() {
                    link.liveness.record_reply(received);
                }
            }

            let due = self
                .link(role)
                .map_or(false, |link| link.liveness.ping_due(now));
            if due {
                self.send_ping(role, now);
            }

            let Some(silence) = self
                .link_mut(role)
                .and_then(|link| link.liveness.check_timeout(now))
            else {
                continue;
            };

            tracing::warn!("{} server silent for {:?}", role, silence);
            self.publish(SessionEvent::PingTimeout {
                role,
                silent_ms: u64::try_from(silence.as_millis()).unwrap_or(u64::MAX),
            });
            if self.config.ping_timeout_action == PingTimeoutAction::Disconnect {
                self.connection_lost(role, LinkEnd::Failed, format!("no answer for {:?}", silence));
            }
        }
    }

    fn send_ping(&mut self, role: ServerRole, now: Instant) {
        if !self.is_connected(role) {
            return;
        }

        let msg = match role {
            ServerRole::Login => self.handlers.login().ping(&self.username),
            ServerRole::Char => Some(self.handlers.char_server().ping(self.game.token())),
            ServerRole::Map => Some(self.handlers.game().ping(self.tick_millis())),
        };
        let Some(msg) = msg else {
            return;
        };

        match self.send(role, msg) {
            Ok(()) => {
                if let Some(link) = self.link_mut(role) {
                    link.liveness.record_ping(now);
                }
            }
            Err(e) => tracing::debug!("Ping to {} server not sent: {}", role, e),
        }
    }

    /// Client tick sent with map pings, milliseconds since the session began
    fn tick_millis(&self) -> u32 {
        (self.started.elapsed().as_millis() % (u128::from(u32::MAX) + 1)) as u32
    }

    // === Connections ===

    async fn enter_char_server(&mut self, server: ServerInfo) -> Result<()> {
        self.set_state(SessionState::ConnectingChar);
        self.open(ServerRole::Char, server).await?;
        let msg = self.handlers.char_server().connect(self.game.token());
        self.send(ServerRole::Char, msg)
    }

    /// Connect to a map server and authenticate; failures end the session
    async fn enter_map_server(&mut self, server: ServerInfo) {
        if self.open(ServerRole::Map, server).await.is_err() {
            return;
        }
        let msg = self.handlers.game().connect(self.game.token());
        if let Err(e) = self.send(ServerRole::Map, msg) {
            self.connection_lost(ServerRole::Map, LinkEnd::Failed, e.to_string());
        }
    }

    /// Open the connection for `role`, ending the session if that fails
    async fn open(&mut self, role: ServerRole, server: ServerInfo) -> Result<()> {
        let mut framer = MessageFramer::for_dialect(self.config.dialect);
        if role == ServerRole::Char && self.config.dialect == Dialect::EAthena {
            framer = framer.with_leading_skip(EATHENA_CHAR_PREAMBLE);
        }

        match Connection::connect(role, server, framer, self.config.connect_timeout).await {
            Ok(conn) => {
                let liveness = Liveness::new(
                    self.config.ping_interval,
                    self.config.ping_timeout,
                    Instant::now(),
                );
                *self.slot_mut(role) = Some(Link { conn, liveness });
                Ok(())
            }
            Err(e) => {
                self.publish(SessionEvent::NetworkError {
                    role,
                    error: e.to_string(),
                });
                self.teardown_all();
                self.set_state(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    fn send(&mut self, role: ServerRole, msg: MessageOut) -> Result<()> {
        match self.link(role) {
            Some(link) => link.conn.send(msg),
            None => Err(ClientError::Connection(format!("not connected to {} server", role))),
        }
    }

    fn await_map_load(&mut self) {
        self.map_load_pending = true;
        if let Some(link) = self.map.as_mut() {
            link.conn.pause_dispatch();
        }
    }

    fn connection_lost(&mut self, role: ServerRole, end: LinkEnd, error: String) {
        // Login servers may hang up once the char server list is sent
        if role == ServerRole::Login
            && matches!(self.state, SessionState::LoginOk | SessionState::LoginError)
        {
            match end {
                LinkEnd::Closed => tracing::debug!("Login server connection ended: {}", error),
                LinkEnd::Failed => tracing::warn!("Login server connection failed: {}", error),
            }
            self.teardown(ServerRole::Login);
            return;
        }

        tracing::warn!("Lost {} server connection: {}", role, error);
        self.publish(SessionEvent::NetworkError { role, error });
        self.teardown_all();
        self.set_state(SessionState::Disconnected);
    }

    fn teardown(&mut self, role: ServerRole) {
        if let Some(mut link) = self.slot_mut(role).take() {
            let discarded = link.conn.disconnect();
            if discarded > 0 {
                tracing::debug!("Discarded {} queued {} messages", discarded, role);
            }
        }
        if role == ServerRole::Map {
            self.map_load_pending = false;
            self.game.leave_map();
        }
    }

    fn teardown_all(&mut self) {
        for role in ServerRole::ALL {
            self.teardown(role);
        }
    }

    /// Replace a loopback address advertised by a remote server
    fn resolve_server(&self, mut server: ServerInfo) -> ServerInfo {
        let login = self.config.login_server();
        if self.config.resolve_loopback && server.is_local_only() && !login.is_local_only() {
            tracing::info!(
                "Server {} advertises {}, using {} instead",
                server.name,
                server.host,
                login.host
            );
            server.host = login.host;
        }
        server
    }

    // === Helpers ===

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        tracing::info!("Session state {} -> {}", from, to);
        self.state = to;
        self.publish(SessionEvent::StateChanged { from, to });
    }

    fn publish(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn require(&self, state: SessionState, operation: &str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.wrong_state(operation))
        }
    }

    fn require_map(&self, operation: &str) -> Result<()> {
        if matches!(self.state, SessionState::InGame | SessionState::ChangingMap) {
            Ok(())
        } else {
            Err(self.wrong_state(operation))
        }
    }

    fn wrong_state(&self, operation: &str) -> ClientError {
        ClientError::InvalidState(format!("{} not allowed while {}", operation, self.state))
    }

    fn link(&self, role: ServerRole) -> Option<&Link> {
        match role {
            ServerRole::Login => self.login.as_ref(),
            ServerRole::Char => self.char_server.as_ref(),
            ServerRole::Map => self.map.as_ref(),
        }
    }

    fn link_mut(&mut self, role: ServerRole) -> Option<&mut Link> {
        self.slot_mut(role).as_mut()
    }

    fn slot_mut(&mut self, role: ServerRole) -> &mut Option<Link> {
        match role {
            ServerRole::Login => &mut self.login,
            ServerRole::Char => &mut self.char_server,
            ServerRole::Map => &mut self.map,
        }
    }
}
