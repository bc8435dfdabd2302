//! # Message Handler Trait
//!
//! A handler owns a fixed set of inbound opcodes and builds the outbound
//! messages of its domain.
//!
//! # Contract
//!
//! - [`handled_messages`](MessageHandler::handled_messages) is chosen once at
//!   construction from the dialect and never changes.
//! - [`handle_message`](MessageHandler::handle_message) is only called with
//!   opcodes from that list. It reads the fields it knows, updates state,
//!   and pushes events. Unread trailing bytes are fine.
//! - Outbound builders are pure: they return a [`MessageOut`] and leave
//!   sending to the caller.
//!
//! [`MessageOut`]: athena_protocol::MessageOut

use athena_core::Result;
use athena_protocol::MessageIn;

use crate::events::ClientEvent;
use crate::state::GameState;

/// What a handler may touch while processing one message
pub struct HandlerContext<'a> {
    pub state: &'a mut GameState,
    events: &'a mut Vec<ClientEvent>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(state: &'a mut GameState, events: &'a mut Vec<ClientEvent>) -> Self {
        Self { state, events }
    }

    /// Queue an event for the session and its subscribers
    #[inline]
    pub fn emit(&mut self, event: ClientEvent) {
        tracing::debug!("Event: {:?}", event);
        self.events.push(event);
    }
}

pub trait MessageHandler {
    /// Name used in logs and duplicate-opcode errors
    fn name(&self) -> &'static str;

    /// Every inbound opcode this handler consumes
    fn handled_messages(&self) -> &[u16];

    /// Decode one message
    ///
    /// # Errors
    /// Decoding errors such as `Truncated`; the caller drops the message and
    /// keeps the connection.
    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()>;
}

/// Number of whole `entry_size` entries left in `msg`
///
/// A remainder means the server speaks a different layout than the one
/// configured. It is logged and the whole entries are still decoded.
pub(crate) fn entry_count(msg: &MessageIn, entry_size: usize, what: &str) -> usize {
    let remaining = msg.remaining();
    if remaining % entry_size != 0 {
        let err = athena_core::ClientError::ProtocolMismatch(format!(
            "0x{:04x}: {} bytes of {} entries is not a multiple of {}",
            msg.opcode(),
            remaining,
            what,
            entry_size
        ));
        tracing::warn!("{}", err);
    }
    remaining / entry_size
}
