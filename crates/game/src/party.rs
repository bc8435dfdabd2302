//! # Party Handler
//!
//! Party creation, membership, invitations and party chat.

use athena_core::{AccountId, Result};
use athena_protocol::packets;
use athena_protocol::{MessageIn, MessageOut};

use crate::events::ClientEvent;
use crate::handler::{entry_count, HandlerContext, MessageHandler};
use crate::state::{PartyInfo, PartyMember};

const NAME_LEN: usize = 24;
const MAP_NAME_LEN: usize = 16;
const MEMBER_ENTRY_LEN: usize = 46;

const MESSAGES: &[u16] = &[
    packets::SMSG_PARTY_CREATE,
    packets::SMSG_PARTY_INFO,
    packets::SMSG_PARTY_INVITE_RESPONSE,
    packets::SMSG_PARTY_INVITED,
    packets::SMSG_PARTY_LEAVE,
    packets::SMSG_PARTY_MESSAGE,
];

#[derive(Default)]
pub struct PartyHandler;

impl PartyHandler {
    pub fn new() -> Self {
        Self
    }

    fn process_info(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let name = msg.read_string(NAME_LEN, "party name")?;
        let count = entry_count(msg, MEMBER_ENTRY_LEN, "party member");

        let mut members = Vec::with_capacity(count);
        for _ in 0..count {
            let account_id = AccountId::new(msg.read_u32("account id")?);
            let nick = msg.read_string(NAME_LEN, "nick")?;
            let map = msg.read_string(MAP_NAME_LEN, "map")?;
            // Both flags are inverted on the wire
            let leader = msg.read_u8("leader")? == 0;
            let online = msg.read_u8("online")? == 0;
            members.push(PartyMember {
                account_id,
                nick,
                map,
                leader,
                online,
            });
        }

        let party = PartyInfo { name, members };
        tracing::debug!("Party {} has {} members", party.name, party.members.len());
        ctx.state.set_party(party.clone());
        ctx.emit(ClientEvent::PartyInfo { party });
        Ok(())
    }

    fn process_leave(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let account_id = AccountId::new(msg.read_u32("account id")?);
        let nick = msg.read_string(NAME_LEN, "nick")?;
        msg.read_u8("flag")?;

        ctx.state.remove_party_member(account_id);
        ctx.emit(ClientEvent::PartyMemberLeft { account_id, nick });
        Ok(())
    }

    // === Outbound ===

    pub fn create(&self, name: &str) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_PARTY_CREATE);
        out.write_string(name, NAME_LEN, "party name");
        out
    }

    pub fn invite(&self, account_id: AccountId) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_PARTY_INVITE);
        out.write_u32(account_id.get(), "account id");
        out
    }

    pub fn invite_reply(&self, inviter: AccountId, accept: bool) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_PARTY_INVITED);
        out.write_u32(inviter.get(), "inviter")
            .write_u32(u32::from(accept), "accept");
        out
    }

    pub fn leave(&self) -> MessageOut {
        MessageOut::new(packets::CMSG_PARTY_LEAVE)
    }

    pub fn message(&self, text: &str) -> MessageOut {
        let mut out = MessageOut::variable(packets::CMSG_PARTY_MESSAGE);
        out.write_raw(text.as_bytes(), "text");
        out
    }
}

impl MessageHandler for PartyHandler {
    fn name(&self) -> &'static str {
        "party"
    }

    fn handled_messages(&self) -> &[u16] {
        MESSAGES
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            packets::SMSG_PARTY_CREATE => {
                let ok = msg.read_u8("flag")? == 0;
                ctx.emit(ClientEvent::PartyCreated { ok });
                Ok(())
            }
            packets::SMSG_PARTY_INFO => self.process_info(msg, ctx),
            packets::SMSG_PARTY_INVITE_RESPONSE => {
                let nick = msg.read_string(NAME_LEN, "nick")?;
                let status = msg.read_u8("status")?;
                ctx.emit(ClientEvent::PartyInviteResponse { nick, status });
                Ok(())
            }
            packets::SMSG_PARTY_INVITED => {
                let inviter = AccountId::new(msg.read_u32("inviter")?);
                let party = msg.read_string(NAME_LEN, "party name")?;
                ctx.emit(ClientEvent::PartyInvited { inviter, party });
                Ok(())
            }
            packets::SMSG_PARTY_LEAVE => self.process_leave(msg, ctx),
            packets::SMSG_PARTY_MESSAGE => {
                msg.read_u16("length")?;
                let account_id = AccountId::new(msg.read_u32("account id")?);
                let text = msg.read_remaining_string("text");
                ctx.emit(ClientEvent::PartyMessage { account_id, text });
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
