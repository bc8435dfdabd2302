//! # Handler Set
//!
//! Owns one instance of every dialect handler and routes inbound messages to
//! them through a [`HandlerRegistry`].
//!
//! Handlers are concrete fields; the registry stores a [`HandlerId`] per
//! opcode and dispatch is a `match` on it. Which handlers exist, and which
//! opcodes they claim, is fixed when the set is built.

use athena_core::{ClientError, Dialect, Result, ServerFeatures};
use athena_network::HandlerRegistry;
use athena_protocol::MessageIn;

use crate::char_server::CharServerHandler;
use crate::elemental::ElementalHandler;
use crate::events::ClientEvent;
use crate::game::GameHandler;
use crate::handler::{HandlerContext, MessageHandler};
use crate::inventory::InventoryHandler;
use crate::login::LoginHandler;
use crate::npc::NpcHandler;
use crate::party::PartyHandler;
use crate::skill::SkillHandler;
use crate::state::GameState;
use crate::vending::VendingHandler;

/// Registry key naming the handler that owns an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerId {
    Login,
    CharServer,
    Game,
    Npc,
    Skill,
    Elemental,
    Party,
    Inventory,
    Vending,
}

/// Features the dialect can actually honour
///
/// Item colors only exist on TmwAthena and vending only on eAthena. A flag
/// set for the other family is reported and turned off.
pub fn effective_features(dialect: Dialect, requested: ServerFeatures) -> ServerFeatures {
    let mut features = requested;
    if features.item_colors && dialect != Dialect::TmwAthena {
        let err = ClientError::ProtocolMismatch(format!(
            "item colors are not supported by {}",
            dialect.as_str()
        ));
        tracing::warn!("{}, ignoring", err);
        features.item_colors = false;
    }
    if features.vending && dialect != Dialect::EAthena {
        let err = ClientError::ProtocolMismatch(format!(
            "vending is not supported by {}",
            dialect.as_str()
        ));
        tracing::warn!("{}, ignoring", err);
        features.vending = false;
    }
    features
}

pub struct Handlers {
    dialect: Dialect,
    features: ServerFeatures,
    registry: HandlerRegistry<HandlerId>,
    login: LoginHandler,
    char_server: CharServerHandler,
    game: GameHandler,
    npc: NpcHandler,
    skill: SkillHandler,
    party: PartyHandler,
    inventory: InventoryHandler,
    elemental: Option<ElementalHandler>,
    vending: Option<VendingHandler>,
}

impl Handlers {
    /// Build every handler for `dialect` and register its opcodes
    ///
    /// # Errors
    /// `DuplicateOpcode` if two handlers claim the same opcode.
    pub fn new(dialect: Dialect, features: ServerFeatures, client_version: u32) -> Result<Self> {
        let features = effective_features(dialect, features);

        let mut handlers = Self {
            dialect,
            features,
            registry: HandlerRegistry::new(),
            login: LoginHandler::new(dialect, client_version),
            char_server: CharServerHandler::new(dialect),
            game: GameHandler::new(dialect),
            npc: NpcHandler::new(dialect, features),
            skill: SkillHandler::new(dialect),
            party: PartyHandler::new(),
            inventory: InventoryHandler::new(dialect, features),
            elemental: (dialect == Dialect::EAthena).then(ElementalHandler::new),
            vending: features.vending.then(VendingHandler::new),
        };
        handlers.register_all()?;

        tracing::debug!(
            "{} handlers registered for {} opcodes ({})",
            handlers.registry.handler_count(),
            handlers.registry.opcode_count(),
            dialect.as_str()
        );
        Ok(handlers)
    }

    fn register_all(&mut self) -> Result<()> {
        let registry = &mut self.registry;
        register(registry, HandlerId::Login, &self.login)?;
        register(registry, HandlerId::CharServer, &self.char_server)?;
        register(registry, HandlerId::Game, &self.game)?;
        register(registry, HandlerId::Npc, &self.npc)?;
        register(registry, HandlerId::Skill, &self.skill)?;
        register(registry, HandlerId::Party, &self.party)?;
        register(registry, HandlerId::Inventory, &self.inventory)?;
        if let Some(elemental) = &self.elemental {
            register(registry, HandlerId::Elemental, elemental)?;
        }
        if let Some(vending) = &self.vending {
            register(registry, HandlerId::Vending, vending)?;
        }
        Ok(())
    }

    /// Route one message to its handler
    ///
    /// Returns `false` when no handler claims the opcode; the message is
    /// dropped.
    ///
    /// # Errors
    /// Whatever the handler's decoder returns.
    pub fn dispatch(
        &mut self,
        msg: &mut MessageIn,
        state: &mut GameState,
        events: &mut Vec<ClientEvent>,
    ) -> Result<bool> {
        let opcode = msg.opcode();
        let Some(id) = self.registry.route(opcode) else {
            tracing::debug!("No handler for 0x{:04x}, dropping", opcode);
            return Ok(false);
        };

        let mut ctx = HandlerContext::new(state, events);
        match id {
            HandlerId::Login => self.login.handle_message(msg, &mut ctx)?,
            HandlerId::CharServer => self.char_server.handle_message(msg, &mut ctx)?,
            HandlerId::Game => self.game.handle_message(msg, &mut ctx)?,
            HandlerId::Npc => self.npc.handle_message(msg, &mut ctx)?,
            HandlerId::Skill => self.skill.handle_message(msg, &mut ctx)?,
            HandlerId::Party => self.party.handle_message(msg, &mut ctx)?,
            HandlerId::Inventory => self.inventory.handle_message(msg, &mut ctx)?,
            HandlerId::Elemental => {
                if let Some(elemental) = &mut self.elemental {
                    elemental.handle_message(msg, &mut ctx)?;
                }
            }
            HandlerId::Vending => {
                if let Some(vending) = &mut self.vending {
                    vending.handle_message(msg, &mut ctx)?;
                }
            }
        }

        if msg.remaining() > 0 {
            tracing::trace!(
                "0x{:04x}: {} trailing bytes ignored",
                opcode,
                msg.remaining()
            );
        }
        Ok(true)
    }

    pub fn has_handler(&self, opcode: u16) -> bool {
        self.registry.has_handler(opcode)
    }

    /// Name of the handler owning `opcode`
    pub fn handler_name(&self, opcode: u16) -> Option<&'static str> {
        self.registry.handler_name(opcode)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Feature flags after dialect gating
    pub fn features(&self) -> ServerFeatures {
        self.features
    }

    pub fn login(&self) -> &LoginHandler {
        &self.login
    }

    pub fn char_server(&self) -> &CharServerHandler {
        &self.char_server
    }

    pub fn game(&self) -> &GameHandler {
        &self.game
    }

    pub fn npc(&self) -> &NpcHandler {
        &self.npc
    }

    pub fn skill(&self) -> &SkillHandler {
        &self.skill
    }

    pub fn party(&self) -> &PartyHandler {
        &self.party
    }

    pub fn inventory(&self) -> &InventoryHandler {
        &self.inventory
    }

    /// Present on eAthena only
    pub fn elemental(&self) -> Option<&ElementalHandler> {
        self.elemental.as_ref()
    }

    /// Present when the vending feature is in effect
    pub fn vending(&self) -> Option<&VendingHandler> {
        self.vending.as_ref()
    }
}

fn register<H: MessageHandler>(
    registry: &mut HandlerRegistry<HandlerId>,
    id: HandlerId,
    handler: &H,
) -> Result<()> {
    registry.register(id, handler.name(), handler.handled_messages())
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_protocol::packets::{self, eathena, tmwa};
    use athena_protocol::MessageOut;

    fn features(item_colors: bool, vending: bool) -> ServerFeatures {
        ServerFeatures {
            item_colors,
            vending,
        }
    }

    #[test]
    fn test_no_duplicate_opcodes_in_either_dialect() {
        for dialect in [Dialect::TmwAthena, Dialect::EAthena] {
            for vending in [false, true] {
                assert!(Handlers::new(dialect, features(true, vending), 20).is_ok());
            }
        }
    }

    #[test]
    fn test_dialect_specific_handlers() {
        let tmwa_set = Handlers::new(Dialect::TmwAthena, features(false, true), 20).unwrap();
        assert!(tmwa_set.elemental().is_none());
        assert!(tmwa_set.vending().is_none());
        assert!(!tmwa_set.has_handler(eathena::SMSG_ELEMENTAL_INFO));
        assert_eq!(tmwa_set.handler_name(tmwa::SMSG_MAP_LOGIN_SUCCESS), Some("game"));

        let eathena_set = Handlers::new(Dialect::EAthena, features(false, true), 20).unwrap();
        assert!(eathena_set.elemental().is_some());
        assert_eq!(eathena_set.handler_name(eathena::SMSG_VENDING_SHOW_BOARD), Some("vending"));
        assert!(!eathena_set.has_handler(tmwa::SMSG_MAP_LOGIN_SUCCESS));
    }

    #[test]
    fn test_features_gated_by_dialect() {
        let tmwa_features = effective_features(Dialect::TmwAthena, features(true, true));
        assert_eq!(tmwa_features, features(true, false));
        let eathena_features = effective_features(Dialect::EAthena, features(true, true));
        assert_eq!(eathena_features, features(false, true));
    }

    #[test]
    fn test_dispatch_routes_and_drops() {
        let mut handlers = Handlers::new(Dialect::TmwAthena, ServerFeatures::default(), 20).unwrap();
        let mut state = GameState::new();
        let mut events = Vec::new();

        let mut out = MessageOut::new(packets::SMSG_WHO_ANSWER);
        out.write_u32(12, "count");
        let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
        assert!(handlers.dispatch(&mut msg, &mut state, &mut events).unwrap());
        assert_eq!(events, vec![ClientEvent::OnlineUsers { count: 12 }]);

        let mut out = MessageOut::new(packets::SMSG_BEING_REMOVE);
        out.write_u32(1, "id").write_u8(0, "type");
        let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
        assert!(!handlers.dispatch(&mut msg, &mut state, &mut events).unwrap());
        assert_eq!(events.len(), 1);
    }
}
