//! # Athena Client Game Layer
//!
//! Decodes server messages into [`GameState`] changes and [`ClientEvent`]s,
//! and builds the client's outbound messages.
//!
//! ## Modules
//!
//! - `state` - Everything learned from the servers
//! - `events` - Events pushed by handlers
//! - `handler` - The [`MessageHandler`] trait
//! - `dispatcher` - [`Handlers`], the per-dialect handler set
//! - `login`, `char_server`, `game` - Connection handshakes per server role
//! - `npc`, `skill`, `elemental`, `party`, `inventory`, `vending` - Game domains

pub mod char_server;
pub mod dispatcher;
pub mod elemental;
pub mod events;
pub mod game;
pub mod handler;
pub mod inventory;
pub mod login;
pub mod npc;
pub mod party;
pub mod skill;
pub mod state;
pub mod vending;

// Re-export commonly used types
pub use dispatcher::{effective_features, HandlerId, Handlers};
pub use events::{ClientEvent, ProduceRecipe, SellableItem, ShopItem};
pub use handler::{HandlerContext, MessageHandler};
pub use npc::BuyRequest;
pub use state::{
    CharacterInfo, ElementalInfo, GameState, InventoryItem, NpcDialog, NpcPrompt, PartyInfo,
    PartyMember, PlayerState, ServerVersion, SkillInfo,
};
