//! # NPC Handler
//!
//! Scripted NPC dialogs and NPC shops.
//!
//! A dialog is driven by the server: text arrives in pieces, then a prompt
//! (next, close, menu, number, text) tells the client what to ask for. The
//! open dialog lives in [`GameState`](crate::GameState) until closed.

use athena_core::{Dialect, Result, ServerFeatures};
use athena_protocol::packets::{self, eathena};
use athena_protocol::{MessageIn, MessageOut};

use crate::events::{ClientEvent, SellableItem, ShopItem};
use crate::handler::{entry_count, HandlerContext, MessageHandler};
use crate::state::{InventoryItem, NpcPrompt};

const SHOP_ENTRY_LEN: usize = 11;
const SHOP_ENTRY_WITH_COLOR_LEN: usize = 12;
const SELL_ENTRY_LEN: usize = 10;

/// Server inventory indices start at 2
const INVENTORY_OFFSET: i32 = 2;

const SHARED_MESSAGES: &[u16] = &[
    packets::SMSG_NPC_MESSAGE,
    packets::SMSG_NPC_NEXT,
    packets::SMSG_NPC_CLOSE,
    packets::SMSG_NPC_CHOICE,
    packets::SMSG_NPC_INT_INPUT,
    packets::SMSG_NPC_STR_INPUT,
    packets::SMSG_NPC_BUY_SELL_CHOICE,
    packets::SMSG_NPC_BUY,
    packets::SMSG_NPC_SELL,
    packets::SMSG_NPC_BUY_RESPONSE,
    packets::SMSG_NPC_SELL_RESPONSE,
];

const EATHENA_ONLY: &[u16] = &[
    eathena::SMSG_NPC_CUTIN,
    eathena::SMSG_NPC_VIEWPOINT,
    eathena::SMSG_NPC_SHOW_PROGRESS_BAR,
    eathena::SMSG_NPC_CLOSE_TIMEOUT,
];

/// An item to buy from an NPC shop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyRequest {
    pub item_id: u16,
    pub amount: u16,
    pub color: u8,
}

pub struct NpcHandler {
    dialect: Dialect,
    item_colors: bool,
    messages: Vec<u16>,
}

impl NpcHandler {
    pub fn new(dialect: Dialect, features: ServerFeatures) -> Self {
        let mut messages = SHARED_MESSAGES.to_vec();
        if dialect == Dialect::EAthena {
            messages.extend_from_slice(EATHENA_ONLY);
        }

        Self {
            dialect,
            item_colors: features.item_colors,
            messages,
        }
    }

    fn set_prompt(ctx: &mut HandlerContext<'_>, npc: u32, prompt: NpcPrompt) {
        ctx.state.npc_dialog_mut(npc).prompt = prompt;
    }

    fn process_message(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let npc = msg.read_u32("npc id")?;
        let text = msg.read_remaining_string("message");

        let dialog = ctx.state.npc_dialog_mut(npc);
        dialog.lines.push(text.clone());
        dialog.prompt = NpcPrompt::Reading;
        ctx.emit(ClientEvent::NpcMessage { npc, text });
        Ok(())
    }

    fn process_choice(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let npc = msg.read_u32("npc id")?;
        let choices: Vec<String> = msg
            .read_remaining_string("choices")
            .split(':')
            .filter(|choice| !choice.is_empty())
            .map(str::to_string)
            .collect();

        let dialog = ctx.state.npc_dialog_mut(npc);
        dialog.choices = choices.clone();
        dialog.prompt = NpcPrompt::Choice;
        ctx.emit(ClientEvent::NpcChoice { npc, choices });
        Ok(())
    }

    fn shop_entry_len(&self) -> usize {
        if self.item_colors {
            SHOP_ENTRY_WITH_COLOR_LEN
        } else {
            SHOP_ENTRY_LEN
        }
    }

    fn process_buy_list(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, self.shop_entry_len(), "shop item");

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let price = msg.read_i32("price")?;
            msg.read_i32("dc price")?;
            let kind = msg.read_u8("type")?;
            let item_id = msg.read_u16("item id")?;
            let color = if self.item_colors {
                Some(msg.read_u8("item color")?)
            } else {
                None
            };
            items.push(ShopItem {
                item_id,
                price,
                kind,
                color,
            });
        }

        if let Some(dialog) = ctx.state.npc_dialog().map(|d| d.npc) {
            Self::set_prompt(ctx, dialog, NpcPrompt::Shop);
        }
        ctx.emit(ClientEvent::NpcBuyList { items });
        Ok(())
    }

    fn process_sell_list(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, SELL_ENTRY_LEN, "sellable item");

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let index = i32::from(msg.read_u16("index")?) - INVENTORY_OFFSET;
            let price = msg.read_i32("price")?;
            let overcharge = msg.read_i32("overcharge")?;
            items.push(SellableItem {
                index,
                price,
                overcharge,
            });
        }

        ctx.emit(ClientEvent::NpcSellList { items });
        Ok(())
    }

    fn process_viewpoint(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let npc = msg.read_u32("npc id")?;
        let kind = msg.read_u32("type")?;
        let x = msg.read_u32("x")?;
        let y = msg.read_u32("y")?;
        let id = msg.read_u8("id")?;
        let color = msg.read_u32("color")?;
        ctx.emit(ClientEvent::NpcViewpoint {
            npc,
            kind,
            x,
            y,
            id,
            color,
        });
        Ok(())
    }

    // === Outbound ===

    pub fn talk(&self, npc: u32) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_NPC_TALK);
        out.write_u32(npc, "npc id").write_u8(0, "unused");
        out
    }

    pub fn next_dialog(&self, npc: u32) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_NPC_NEXT_REQUEST);
        out.write_u32(npc, "npc id");
        out
    }

    pub fn close_dialog(&self, npc: u32) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_NPC_CLOSE);
        out.write_u32(npc, "npc id");
        out
    }

    /// Answer a menu; `choice` is 1-based, 0xff cancels
    pub fn list_input(&self, npc: u32, choice: u8) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_NPC_LIST_CHOICE);
        out.write_u32(npc, "npc id").write_u8(choice, "choice");
        out
    }

    pub fn integer_input(&self, npc: u32, value: i32) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_NPC_INT_RESPONSE);
        out.write_u32(npc, "npc id").write_i32(value, "value");
        out
    }

    pub fn string_input(&self, npc: u32, value: &str) -> MessageOut {
        let mut out = MessageOut::variable(packets::CMSG_NPC_STR_RESPONSE);
        out.write_u32(npc, "npc id")
            .write_raw(value.as_bytes(), "value")
            .write_u8(0, "terminator");
        out
    }

    pub fn buy_sell_choice(&self, npc: u32, sell: bool) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_NPC_BUY_SELL_REQUEST);
        out.write_u32(npc, "npc id").write_u8(u8::from(sell), "action");
        out
    }

    pub fn buy_items(&self, items: &[BuyRequest]) -> MessageOut {
        let mut out = MessageOut::variable(packets::CMSG_NPC_BUY_REQUEST);
        for item in items {
            out.write_u16(item.amount, "amount").write_u16(item.item_id, "item id");
            if self.item_colors {
                out.write_u8(item.color, "color").write_u8(0, "unused");
            }
        }
        out
    }

    /// Sell inventory items, given as `(client index, amount)`
    pub fn sell_items(&self, items: &[(i32, u16)]) -> MessageOut {
        let mut out = MessageOut::variable(packets::CMSG_NPC_SELL_REQUEST);
        for &(index, amount) in items {
            out.write_u16(Self::server_index(index), "index")
                .write_u16(amount, "amount");
        }
        out
    }

    /// Build an eAthena-only request; tmwa has no such message
    fn eathena_only(&self, opcode: u16, fill: impl FnOnce(&mut MessageOut)) -> Option<MessageOut> {
        match self.dialect {
            Dialect::EAthena => {
                let mut out = MessageOut::new(opcode);
                fill(&mut out);
                Some(out)
            }
            Dialect::TmwAthena => None,
        }
    }

    fn server_index(index: i32) -> u16 {
        (index + INVENTORY_OFFSET).clamp(0, i32::from(u16::MAX)) as u16
    }

    /// Report a finished progress bar (eAthena only)
    pub fn complete_progress_bar(&self) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_COMPLETE_PROGRESS_BAR, |_| {})
    }

    /// Forge or brew `item_id` from up to three extra materials
    pub fn produce_mix(&self, item_id: u16, materials: [u16; 3]) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_PRODUCE_MIX, |out| {
            out.write_u16(item_id, "item id");
            for material in materials {
                out.write_u16(material, "material");
            }
        })
    }

    pub fn cooking(&self, kind: u16, item_id: u16) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_COOKING, |out| {
            out.write_u16(kind, "type").write_u16(item_id, "item id");
        })
    }

    pub fn repair(&self, item: &InventoryItem) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_REPAIR, |out| {
            out.write_u16(Self::server_index(item.index), "index")
                .write_u16(item.item_id, "item id")
                .write_u8(item.refine, "refine");
            for card in item.cards {
                out.write_u16(card, "card");
            }
        })
    }

    pub fn refine(&self, index: i32) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_REFINE, |out| {
            out.write_u32(u32::from(Self::server_index(index)), "index");
        })
    }

    pub fn identify(&self, index: i32) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_IDENTIFY, |out| {
            out.write_u16(Self::server_index(index), "index");
        })
    }

    /// Pick the arrow to craft from an arrow creation list
    pub fn select_arrow(&self, item_id: u16) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_SELECT_ARROW, |out| {
            out.write_u16(item_id, "item id");
        })
    }

    pub fn select_auto_spell(&self, skill_id: u32) -> Option<MessageOut> {
        self.eathena_only(eathena::CMSG_NPC_SELECT_AUTO_SPELL, |out| {
            out.write_u32(skill_id, "skill id");
        })
    }
}

impl MessageHandler for NpcHandler {
    fn name(&self) -> &'static str {
        "npc"
    }

    fn handled_messages(&self) -> &[u16] {
        &self.messages
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            packets::SMSG_NPC_MESSAGE => self.process_message(msg, ctx),
            packets::SMSG_NPC_NEXT => {
                let npc = msg.read_u32("npc id")?;
                Self::set_prompt(ctx, npc, NpcPrompt::Next);
                ctx.emit(ClientEvent::NpcNext { npc });
                Ok(())
            }
            packets::SMSG_NPC_CLOSE => {
                let npc = msg.read_u32("npc id")?;
                Self::set_prompt(ctx, npc, NpcPrompt::Close);
                ctx.emit(ClientEvent::NpcClose { npc });
                Ok(())
            }
            packets::SMSG_NPC_CHOICE => self.process_choice(msg, ctx),
            packets::SMSG_NPC_INT_INPUT => {
                let npc = msg.read_u32("npc id")?;
                Self::set_prompt(ctx, npc, NpcPrompt::Integer);
                ctx.emit(ClientEvent::NpcIntegerInput { npc });
                Ok(())
            }
            packets::SMSG_NPC_STR_INPUT => {
                let npc = msg.read_u32("npc id")?;
                Self::set_prompt(ctx, npc, NpcPrompt::Text);
                ctx.emit(ClientEvent::NpcStringInput { npc });
                Ok(())
            }
            packets::SMSG_NPC_BUY_SELL_CHOICE => {
                let npc = msg.read_u32("npc id")?;
                Self::set_prompt(ctx, npc, NpcPrompt::BuySell);
                ctx.emit(ClientEvent::NpcBuySellChoice { npc });
                Ok(())
            }
            packets::SMSG_NPC_BUY => self.process_buy_list(msg, ctx),
            packets::SMSG_NPC_SELL => self.process_sell_list(msg, ctx),
            packets::SMSG_NPC_BUY_RESPONSE => {
                let code = msg.read_u8("result")?;
                ctx.emit(ClientEvent::NpcBuyResult { ok: code == 0, code });
                Ok(())
            }
            packets::SMSG_NPC_SELL_RESPONSE => {
                let code = msg.read_u8("result")?;
                ctx.emit(ClientEvent::NpcSellResult { ok: code == 0, code });
                Ok(())
            }
            eathena::SMSG_NPC_CUTIN => {
                let image = msg.read_string(64, "image")?;
                let kind = msg.read_u8("type")?;
                ctx.emit(ClientEvent::NpcCutin { image, kind });
                Ok(())
            }
            eathena::SMSG_NPC_VIEWPOINT => self.process_viewpoint(msg, ctx),
            eathena::SMSG_NPC_SHOW_PROGRESS_BAR => {
                let color = msg.read_u32("color")?;
                let seconds = msg.read_u32("seconds")?;
                ctx.emit(ClientEvent::NpcProgressBar { color, seconds });
                Ok(())
            }
            eathena::SMSG_NPC_CLOSE_TIMEOUT => {
                let npc = msg.read_u32("npc id")?;
                ctx.state.close_npc_dialog();
                ctx.emit(ClientEvent::NpcCloseTimeout { npc });
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;

    const NPC: u32 = 110_000_001;

    fn handle(handler: &mut NpcHandler, state: &mut GameState, out: MessageOut) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
        handler
            .handle_message(&mut msg, &mut HandlerContext::new(state, &mut events))
            .unwrap();
        events
    }

    fn colors(item_colors: bool) -> ServerFeatures {
        ServerFeatures {
            item_colors,
            vending: false,
        }
    }

    #[test]
    fn test_dialog_flow() {
        let mut handler = NpcHandler::new(Dialect::TmwAthena, colors(false));
        let mut state = GameState::new();

        let mut out = MessageOut::variable(packets::SMSG_NPC_MESSAGE);
        out.write_u32(NPC, "npc").write_raw(b"Welcome!\0", "text");
        handle(&mut handler, &mut state, out);

        let mut out = MessageOut::variable(packets::SMSG_NPC_CHOICE);
        out.write_u32(NPC, "npc").write_raw(b"Yes:No:\0", "choices");
        let events = handle(&mut handler, &mut state, out);

        assert_eq!(
            events,
            vec![ClientEvent::NpcChoice {
                npc: NPC,
                choices: vec!["Yes".into(), "No".into()]
            }]
        );
        let dialog = state.npc_dialog().unwrap();
        assert_eq!(dialog.lines, vec!["Welcome!".to_string()]);
        assert_eq!(dialog.prompt, NpcPrompt::Choice);
    }

    #[test]
    fn test_buy_list_with_and_without_colors() {
        let mut plain = NpcHandler::new(Dialect::TmwAthena, colors(false));
        let mut out = MessageOut::variable(packets::SMSG_NPC_BUY);
        out.write_i32(50, "price").write_i32(45, "dc").write_u8(0, "type").write_u16(501, "item");
        let events = handle(&mut plain, &mut GameState::new(), out);
        assert_eq!(
            events,
            vec![ClientEvent::NpcBuyList {
                items: vec![ShopItem {
                    item_id: 501,
                    price: 50,
                    kind: 0,
                    color: None
                }]
            }]
        );

        let mut colored = NpcHandler::new(Dialect::TmwAthena, colors(true));
        let mut out = MessageOut::variable(packets::SMSG_NPC_BUY);
        out.write_i32(50, "price").write_i32(45, "dc").write_u8(0, "type").write_u16(501, "item").write_u8(3, "color");
        let events = handle(&mut colored, &mut GameState::new(), out);
        match &events[0] {
            ClientEvent::NpcBuyList { items } => assert_eq!(items[0].color, Some(3)),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_buy_request_entry_sizes() {
        let request = [BuyRequest {
            item_id: 501,
            amount: 2,
            color: 1,
        }];
        let plain = NpcHandler::new(Dialect::TmwAthena, colors(false)).buy_items(&request).finish().unwrap();
        assert_eq!(plain.len(), 4 + 4);
        let colored = NpcHandler::new(Dialect::TmwAthena, colors(true)).buy_items(&request).finish().unwrap();
        assert_eq!(colored.len(), 4 + 6);
        assert_eq!(&colored[2..4], &[10, 0]);
    }

    #[test]
    fn test_sell_list_uses_client_indices() {
        let mut handler = NpcHandler::new(Dialect::EAthena, colors(false));
        let mut out = MessageOut::variable(packets::SMSG_NPC_SELL);
        out.write_u16(5, "index").write_i32(20, "price").write_i32(22, "overcharge");
        let events = handle(&mut handler, &mut GameState::new(), out);
        match &events[0] {
            ClientEvent::NpcSellList { items } => assert_eq!(items[0].index, 3),
            other => panic!("unexpected event {:?}", other),
        }

        let bytes = handler.sell_items(&[(3, 1)]).finish().unwrap();
        assert_eq!(&bytes[4..6], &[5, 0]);
    }

    #[test]
    fn test_eathena_only_opcodes() {
        let tmwa = NpcHandler::new(Dialect::TmwAthena, colors(false));
        assert!(!tmwa.handled_messages().contains(&eathena::SMSG_NPC_CUTIN));
        assert!(tmwa.complete_progress_bar().is_none());

        let eathena_handler = NpcHandler::new(Dialect::EAthena, colors(false));
        assert!(eathena_handler.handled_messages().contains(&eathena::SMSG_NPC_CLOSE_TIMEOUT));
        assert!(eathena_handler.complete_progress_bar().is_some());
    }

    #[test]
    fn test_crafting_requests() {
        let tmwa = NpcHandler::new(Dialect::TmwAthena, colors(false));
        assert!(tmwa.produce_mix(998, [0; 3]).is_none());
        assert!(tmwa.identify(0).is_none());

        let handler = NpcHandler::new(Dialect::EAthena, colors(false));
        let mix = handler.produce_mix(998, [1010, 0, 0]).unwrap().finish().unwrap();
        assert_eq!(mix.len(), 10);
        assert_eq!(&mix[0..2], &[0x8e, 0x01]);
        assert_eq!(&mix[4..6], &1010u16.to_le_bytes());

        assert_eq!(handler.cooking(1, 12_000).unwrap().finish().unwrap().len(), 6);
        assert_eq!(handler.select_arrow(1750).unwrap().finish().unwrap().len(), 4);
        assert_eq!(handler.select_auto_spell(14).unwrap().finish().unwrap().len(), 6);

        // client index 3 is server index 5
        let identify = handler.identify(3).unwrap().finish().unwrap();
        assert_eq!(&identify[..], &[0x78, 0x01, 5, 0]);
        let refine = handler.refine(3).unwrap().finish().unwrap();
        assert_eq!(&refine[2..], &[5, 0, 0, 0]);

        let item = InventoryItem {
            index: 3,
            item_id: 1201,
            refine: 4,
            cards: [4001, 0, 0, 0],
            ..InventoryItem::default()
        };
        let repair = handler.repair(&item).unwrap().finish().unwrap();
        assert_eq!(repair.len(), 15);
        assert_eq!(&repair[2..4], &[5, 0]);
        assert_eq!(repair[6], 4);
        assert_eq!(&repair[7..9], &4001u16.to_le_bytes());
    }

    #[test]
    fn test_close_timeout_closes_dialog() {
        let mut handler = NpcHandler::new(Dialect::EAthena, colors(false));
        let mut state = GameState::new();
        state.npc_dialog_mut(NPC);

        let mut out = MessageOut::new(eathena::SMSG_NPC_CLOSE_TIMEOUT);
        out.write_u32(NPC, "npc");
        handle(&mut handler, &mut state, out);
        assert!(state.npc_dialog().is_none());
    }
}
