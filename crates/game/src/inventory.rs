//! # Inventory Handler
//!
//! Items entering, leaving and being used from the player's inventory.
//! The server counts inventory slots from 2; everything past this module
//! uses client indices starting at 0.

use athena_core::{Dialect, Result, ServerFeatures};
use athena_protocol::packets::{self, eathena, tmwa};
use athena_protocol::{MessageIn, MessageOut};

use crate::events::ClientEvent;
use crate::handler::{HandlerContext, MessageHandler};
use crate::state::InventoryItem;

const INVENTORY_OFFSET: i32 = 2;

/// Color used when the server sends none
const DEFAULT_COLOR: u8 = 1;

const TMWA_MESSAGES: &[u16] = &[
    tmwa::SMSG_PLAYER_INVENTORY_ADD,
    packets::SMSG_PLAYER_INVENTORY_REMOVE,
    packets::SMSG_PLAYER_INVENTORY_USE,
];

const EATHENA_MESSAGES: &[u16] = &[
    eathena::SMSG_PLAYER_INVENTORY_ADD,
    packets::SMSG_PLAYER_INVENTORY_REMOVE,
    packets::SMSG_PLAYER_INVENTORY_USE,
];

fn client_index(server_index: u16) -> i32 {
    i32::from(server_index) - INVENTORY_OFFSET
}

fn server_index(index: i32) -> u16 {
    (index + INVENTORY_OFFSET).clamp(0, i32::from(u16::MAX)) as u16
}

fn read_cards(msg: &mut MessageIn) -> Result<[u16; 4]> {
    let mut cards = [0u16; 4];
    for card in &mut cards {
        *card = msg.read_u16("card")?;
    }
    Ok(cards)
}

pub struct InventoryHandler {
    dialect: Dialect,
    item_colors: bool,
}

impl InventoryHandler {
    pub fn new(dialect: Dialect, features: ServerFeatures) -> Self {
        Self {
            dialect,
            item_colors: features.item_colors,
        }
    }

    fn process_tmwa_add(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let index = client_index(msg.read_u16("index")?);
        let amount = msg.read_u16("amount")?;
        let item_id = msg.read_u16("item id")?;
        let identified = msg.read_u8("identified")?;
        msg.read_u8("attribute")?;
        let refine = msg.read_u8("refine")?;
        let cards = read_cards(msg)?;
        let equip_mask = u32::from(msg.read_u16("equip type")?);
        let kind = msg.read_u8("item type")?;
        let fail = msg.read_u8("fail")?;

        // With item colors the identified byte carries the dye instead
        let (identified, color) = if self.item_colors {
            let color = if identified == 0 { DEFAULT_COLOR } else { identified };
            (true, color)
        } else {
            (identified != 0, DEFAULT_COLOR)
        };

        let item = InventoryItem {
            index,
            item_id,
            amount,
            identified,
            refine,
            cards,
            equip_mask,
            kind,
            color,
        };
        self.finish_add(item, fail, ctx);
        Ok(())
    }

    fn process_eathena_add(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let index = client_index(msg.read_u16("index")?);
        let amount = msg.read_u16("amount")?;
        let item_id = msg.read_u16("item id")?;
        let identified = msg.read_u8("identified")? != 0;
        msg.read_u8("damaged")?;
        let refine = msg.read_u8("refine")?;
        let cards = read_cards(msg)?;
        let equip_mask = msg.read_u32("equip location")?;
        let kind = msg.read_u8("item type")?;
        let result = msg.read_u8("result")?;
        msg.read_u32("hire expire")?;
        msg.read_u16("bind on equip")?;

        let item = InventoryItem {
            index,
            item_id,
            amount,
            identified,
            refine,
            cards,
            equip_mask,
            kind,
            color: DEFAULT_COLOR,
        };
        self.finish_add(item, result, ctx);
        Ok(())
    }

    fn finish_add(&self, item: InventoryItem, code: u8, ctx: &mut HandlerContext<'_>) {
        if code != 0 {
            tracing::debug!("Could not pick up item {}, code {}", item.item_id, code);
            ctx.emit(ClientEvent::ItemAddFailed {
                index: item.index,
                item_id: item.item_id,
                code,
            });
            return;
        }

        ctx.state.add_item(item.clone());
        ctx.emit(ClientEvent::ItemAdded { item });
    }

    fn process_use(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let index = client_index(msg.read_u16("index")?);
        let item_id = msg.read_u16("item id")?;
        msg.read_u32("being id")?;
        let remaining = msg.read_u16("amount")?;
        msg.read_u8("type")?;

        ctx.state.set_item_amount(index, remaining);
        ctx.emit(ClientEvent::ItemUsed {
            index,
            item_id,
            remaining,
        });
        Ok(())
    }

    // === Outbound ===

    pub fn use_item(&self, index: i32, target: u32) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_PLAYER_INVENTORY_USE);
        out.write_u16(server_index(index), "index").write_u32(target, "target");
        out
    }

    pub fn drop_item(&self, index: i32, amount: u16) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_PLAYER_INVENTORY_DROP);
        out.write_u16(server_index(index), "index").write_u16(amount, "amount");
        out
    }
}

impl MessageHandler for InventoryHandler {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn handled_messages(&self) -> &[u16] {
        match self.dialect {
            Dialect::TmwAthena => TMWA_MESSAGES,
            Dialect::EAthena => EATHENA_MESSAGES,
        }
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            tmwa::SMSG_PLAYER_INVENTORY_ADD => self.process_tmwa_add(msg, ctx),
            eathena::SMSG_PLAYER_INVENTORY_ADD => self.process_eathena_add(msg, ctx),
            packets::SMSG_PLAYER_INVENTORY_REMOVE => {
                let index = client_index(msg.read_u16("index")?);
                let amount = msg.read_u16("amount")?;
                ctx.state.remove_item_amount(index, amount);
                ctx.emit(ClientEvent::ItemRemoved { index, amount });
                Ok(())
            }
            packets::SMSG_PLAYER_INVENTORY_USE => self.process_use(msg, ctx),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;

    fn handle(handler: &mut InventoryHandler, state: &mut GameState, out: MessageOut) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
        handler
            .handle_message(&mut msg, &mut HandlerContext::new(state, &mut events))
            .unwrap();
        events
    }

    fn tmwa_add(index: u16, identified: u8, fail: u8) -> MessageOut {
        let mut out = MessageOut::new(tmwa::SMSG_PLAYER_INVENTORY_ADD);
        out.write_u16(index, "index")
            .write_u16(5, "amount")
            .write_u16(501, "item")
            .write_u8(identified, "identified")
            .write_u8(0, "attribute")
            .write_u8(0, "refine");
        for _ in 0..4 {
            out.write_u16(0, "card");
        }
        out.write_u16(0, "equip").write_u8(0, "type").write_u8(fail, "fail");
        out
    }

    fn features(item_colors: bool) -> ServerFeatures {
        ServerFeatures {
            item_colors,
            vending: false,
        }
    }

    #[test]
    fn test_tmwa_add_uses_client_index() {
        let mut handler = InventoryHandler::new(Dialect::TmwAthena, features(false));
        let mut state = GameState::new();
        let out = tmwa_add(2, 1, 0);
        assert_eq!(out.len(), 23);

        handle(&mut handler, &mut state, out);
        let item = &state.player().inventory[&0];
        assert_eq!(item.item_id, 501);
        assert_eq!(item.amount, 5);
        assert!(item.identified);
        assert_eq!(item.color, 1);
    }

    #[test]
    fn test_tmwa_add_with_item_colors() {
        let mut handler = InventoryHandler::new(Dialect::TmwAthena, features(true));
        let mut state = GameState::new();
        handle(&mut handler, &mut state, tmwa_add(3, 4, 0));
        handle(&mut handler, &mut state, tmwa_add(4, 0, 0));

        assert_eq!(state.player().inventory[&1].color, 4);
        assert_eq!(state.player().inventory[&2].color, 1);
    }

    #[test]
    fn test_failed_pickup_leaves_inventory_alone() {
        let mut handler = InventoryHandler::new(Dialect::TmwAthena, features(false));
        let mut state = GameState::new();
        let events = handle(&mut handler, &mut state, tmwa_add(2, 1, 2));

        assert!(state.player().inventory.is_empty());
        assert_eq!(
            events,
            vec![ClientEvent::ItemAddFailed {
                index: 0,
                item_id: 501,
                code: 2
            }]
        );
    }

    #[test]
    fn test_eathena_add_then_use() {
        let mut handler = InventoryHandler::new(Dialect::EAthena, features(false));
        let mut state = GameState::new();

        let mut add = MessageOut::new(eathena::SMSG_PLAYER_INVENTORY_ADD);
        add.write_u16(2, "index")
            .write_u16(3, "amount")
            .write_u16(607, "item")
            .write_u8(1, "identified")
            .write_u8(0, "damaged")
            .write_u8(0, "refine");
        for _ in 0..4 {
            add.write_u16(0, "card");
        }
        add.write_u32(0, "equip")
            .write_u8(0, "type")
            .write_u8(0, "result")
            .write_u32(0, "expire")
            .write_u16(0, "bind");
        assert_eq!(add.len(), 31);
        handle(&mut handler, &mut state, add);

        let mut used = MessageOut::new(packets::SMSG_PLAYER_INVENTORY_USE);
        used.write_u16(2, "index")
            .write_u16(607, "item")
            .write_u32(150_000, "being")
            .write_u16(2, "amount")
            .write_u8(1, "type");
        assert_eq!(used.len(), 13);
        handle(&mut handler, &mut state, used);
        assert_eq!(state.player().inventory[&0].amount, 2);
    }

    #[test]
    fn test_outbound_indices() {
        let handler = InventoryHandler::new(Dialect::TmwAthena, features(false));
        let bytes = handler.use_item(0, 150_000).finish().unwrap();
        assert_eq!(&bytes[2..4], &[2, 0]);
        let bytes = handler.drop_item(5, 1).finish().unwrap();
        assert_eq!(&bytes[..], &[0xa2, 0x00, 7, 0, 1, 0]);
    }
}
