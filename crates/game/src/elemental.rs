//! Elemental summon status (eAthena only)

use athena_core::Result;
use athena_protocol::packets::eathena;
use athena_protocol::MessageIn;

use crate::events::ClientEvent;
use crate::handler::{HandlerContext, MessageHandler};
use crate::state::ElementalInfo;

const MESSAGES: &[u16] = &[
    eathena::SMSG_ELEMENTAL_INFO,
    eathena::SMSG_ELEMENTAL_UPDATE_STATUS,
];

// Status update types
const STATUS_HP: u16 = 5;
const STATUS_MAX_HP: u16 = 6;
const STATUS_SP: u16 = 7;
const STATUS_MAX_SP: u16 = 8;

#[derive(Default)]
pub struct ElementalHandler;

impl ElementalHandler {
    pub fn new() -> Self {
        Self
    }

    fn process_status(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let kind = msg.read_u16("type")?;
        let value = msg.read_i32("value")?;

        match ctx.state.elemental_mut() {
            Some(elemental) => match kind {
                STATUS_HP => elemental.hp = value,
                STATUS_MAX_HP => elemental.max_hp = value,
                STATUS_SP => elemental.sp = value,
                STATUS_MAX_SP => elemental.max_sp = value,
                _ => tracing::debug!("Unhandled elemental status type {}", kind),
            },
            None => tracing::debug!("Elemental status {} without a summoned elemental", kind),
        }

        ctx.emit(ClientEvent::ElementalStatus { kind, value });
        Ok(())
    }
}

impl MessageHandler for ElementalHandler {
    fn name(&self) -> &'static str {
        "elemental"
    }

    fn handled_messages(&self) -> &[u16] {
        MESSAGES
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            eathena::SMSG_ELEMENTAL_INFO => {
                let elemental = ElementalInfo {
                    id: msg.read_u32("elemental id")?,
                    hp: msg.read_i32("hp")?,
                    max_hp: msg.read_i32("max hp")?,
                    sp: msg.read_i32("sp")?,
                    max_sp: msg.read_i32("max sp")?,
                };
                ctx.state.set_elemental(elemental);
                ctx.emit(ClientEvent::ElementalInfo { elemental });
                Ok(())
            }
            eathena::SMSG_ELEMENTAL_UPDATE_STATUS => self.process_status(msg, ctx),
            _ => Ok(()),
        }
    }
}
