//! Player vending shops (eAthena with the vending feature)

use athena_core::Result;
use athena_protocol::packets::eathena;
use athena_protocol::{MessageIn, MessageOut};

use crate::events::ClientEvent;
use crate::handler::{HandlerContext, MessageHandler};

const BOARD_MESSAGE_LEN: usize = 80;

const MESSAGES: &[u16] = &[
    eathena::SMSG_VENDING_OPEN_REQ,
    eathena::SMSG_VENDING_SHOW_BOARD,
    eathena::SMSG_VENDING_HIDE_BOARD,
];

#[derive(Default)]
pub struct VendingHandler;

impl VendingHandler {
    pub fn new() -> Self {
        Self
    }

    /// Close our own shop
    pub fn close(&self) -> MessageOut {
        MessageOut::new(eathena::CMSG_VENDING_CLOSE)
    }
}

impl MessageHandler for VendingHandler {
    fn name(&self) -> &'static str {
        "vending"
    }

    fn handled_messages(&self) -> &[u16] {
        MESSAGES
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            eathena::SMSG_VENDING_OPEN_REQ => {
                let slots = msg.read_u16("slots")?;
                ctx.emit(ClientEvent::VendingOpenRequest { slots });
            }
            eathena::SMSG_VENDING_SHOW_BOARD => {
                let owner = msg.read_u32("owner")?;
                let message = msg.read_string(BOARD_MESSAGE_LEN, "message")?;
                ctx.state.show_vending_board(owner, message.clone());
                ctx.emit(ClientEvent::VendingBoardShown { owner, message });
            }
            eathena::SMSG_VENDING_HIDE_BOARD => {
                let owner = msg.read_u32("owner")?;
                ctx.state.hide_vending_board(owner);
                ctx.emit(ClientEvent::VendingBoardHidden { owner });
            }
            _ => {}
        }
        Ok(())
    }
}
