//! # Skill Handler
//!
//! The learned skill list, level-ups, failures and (eAthena) incremental
//! skill changes and cooldowns.

use athena_core::{Dialect, Result};
use athena_protocol::packets::{self, eathena};
use athena_protocol::{MessageIn, MessageOut};

use crate::events::{ClientEvent, ProduceRecipe};
use crate::handler::{entry_count, HandlerContext, MessageHandler};
use crate::state::SkillInfo;

const SKILL_ENTRY_LEN: usize = 37;
const SKILL_NAME_LEN: usize = 24;
const MAP_NAME_LEN: usize = 16;
const COOLDOWN_ENTRY_LEN: usize = 10;
const RECIPE_ENTRY_LEN: usize = 8;
const WARP_DESTINATIONS: usize = 4;
const AUTO_SPELL_SLOTS: usize = 7;
const DEVOTION_SLOTS: usize = 5;

const TMWA_MESSAGES: &[u16] = &[
    packets::SMSG_PLAYER_SKILLS,
    packets::SMSG_PLAYER_SKILL_UP,
    packets::SMSG_SKILL_FAILED,
];

const EATHENA_MESSAGES: &[u16] = &[
    packets::SMSG_PLAYER_SKILLS,
    packets::SMSG_PLAYER_SKILL_UP,
    packets::SMSG_SKILL_FAILED,
    eathena::SMSG_SKILL_ADD,
    eathena::SMSG_SKILL_COOLDOWN,
    eathena::SMSG_SKILL_DELETE,
    eathena::SMSG_SKILL_UPDATE,
    eathena::SMSG_SKILL_COOLDOWN_LIST,
    eathena::SMSG_SKILL_SNAP,
    eathena::SMSG_SKILL_WARP_POINT,
    eathena::SMSG_SKILL_MEMO_MESSAGE,
    eathena::SMSG_SKILL_PRODUCE_MIX_LIST,
    eathena::SMSG_SKILL_PRODUCE_EFFECT,
    eathena::SMSG_SKILL_UNIT_UPDATE,
    eathena::SMSG_SKILL_ARROW_CREATE_LIST,
    eathena::SMSG_SKILL_AUTO_SPELLS,
    eathena::SMSG_SKILL_DEVOTION_EFFECT,
    eathena::SMSG_SKILL_ITEM_LIST_WINDOW,
];

pub struct SkillHandler {
    dialect: Dialect,
}

impl SkillHandler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Target flags: a padded u16 on tmwa, a u32 on eAthena
    fn read_inf(&self, msg: &mut MessageIn) -> Result<u32> {
        match self.dialect {
            Dialect::TmwAthena => {
                let inf = msg.read_u16("inf")?;
                msg.skip(2, "padding")?;
                Ok(u32::from(inf))
            }
            Dialect::EAthena => msg.read_u32("inf"),
        }
    }

    fn process_skill_list(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, SKILL_ENTRY_LEN, "skill");

        let mut skills = Vec::with_capacity(count);
        for _ in 0..count {
            let id = msg.read_u16("skill id")?;
            let inf = self.read_inf(msg)?;
            let level = msg.read_u16("level")?;
            let sp = msg.read_u16("sp")?;
            let range = msg.read_u16("range")?;
            let name = msg.read_string(SKILL_NAME_LEN, "name")?;
            let upgradable = msg.read_u8("up")? != 0;
            skills.push(SkillInfo {
                id,
                name,
                level,
                sp,
                range,
                inf,
                upgradable,
            });
        }

        tracing::debug!("Received {} skills", skills.len());
        ctx.state.replace_skills(skills.iter().cloned());
        ctx.emit(ClientEvent::SkillList { skills });
        Ok(())
    }

    fn process_skill_up(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let id = msg.read_u16("skill id")?;
        let level = msg.read_u16("level")?;
        let sp = msg.read_u16("sp")?;
        let range = msg.read_u16("range")?;
        let upgradable = msg.read_u8("up")? != 0;

        ctx.state.update_skill(id, level, sp, range, upgradable);
        ctx.emit(ClientEvent::SkillUp { id, level });
        Ok(())
    }

    fn process_skill_failed(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let id = msg.read_u16("skill id")?;
        match self.dialect {
            Dialect::TmwAthena => {
                msg.read_u16("bskill")?;
                msg.read_u16("unused")?;
            }
            Dialect::EAthena => {
                msg.read_u32("btype")?;
            }
        }
        let success = msg.read_u8("success")?;
        let reason = msg.read_u8("reason")?;

        if success == 0 {
            tracing::debug!("Skill {} failed, reason {}", id, reason);
            ctx.emit(ClientEvent::SkillFailed { id, reason });
        }
        Ok(())
    }

    fn process_skill_add(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let id = msg.read_u16("skill id")?;
        let inf = msg.read_u32("inf")?;
        let level = msg.read_u16("level")?;
        let sp = msg.read_u16("sp")?;
        let range = msg.read_u16("range")?;
        let name = msg.read_string(SKILL_NAME_LEN, "name")?;
        let upgradable = msg.read_u8("up")? != 0;

        let skill = SkillInfo {
            id,
            name,
            level,
            sp,
            range,
            inf,
            upgradable,
        };
        ctx.state.upsert_skill(skill.clone());
        ctx.emit(ClientEvent::SkillAdded { skill });
        Ok(())
    }

    fn process_skill_update(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let id = msg.read_u16("skill id")?;
        msg.read_u32("inf")?;
        let level = msg.read_u16("level")?;
        let sp = msg.read_u16("sp")?;
        let range = msg.read_u16("range")?;
        let upgradable = msg.read_u8("up")? != 0;

        ctx.state.update_skill(id, level, sp, range, upgradable);
        ctx.emit(ClientEvent::SkillUp { id, level });
        Ok(())
    }

    fn process_cooldown_list(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, COOLDOWN_ENTRY_LEN, "cooldown");
        for _ in 0..count {
            let id = msg.read_u16("skill id")?;
            msg.read_u32("total")?;
            let millis = msg.read_u32("remaining")?;
            ctx.emit(ClientEvent::SkillCooldown { id, millis });
        }
        Ok(())
    }

    fn process_warp_point(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let skill = msg.read_u16("skill id")?;
        let mut destinations = Vec::with_capacity(WARP_DESTINATIONS);
        for _ in 0..WARP_DESTINATIONS {
            let map = msg.read_string(MAP_NAME_LEN, "destination")?;
            if !map.is_empty() {
                destinations.push(map);
            }
        }
        ctx.emit(ClientEvent::SkillWarpPoints { skill, destinations });
        Ok(())
    }

    fn process_produce_list(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, RECIPE_ENTRY_LEN, "recipe");
        let mut recipes = Vec::with_capacity(count);
        for _ in 0..count {
            let item_id = msg.read_u16("item id")?;
            let mut materials = Vec::new();
            for _ in 0..3 {
                let material = msg.read_u16("material")?;
                if material != 0 {
                    materials.push(material);
                }
            }
            recipes.push(ProduceRecipe { item_id, materials });
        }
        ctx.emit(ClientEvent::SkillProduceList { recipes });
        Ok(())
    }

    fn process_arrow_list(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        msg.read_u16("length")?;
        let count = entry_count(msg, 2, "arrow");
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(msg.read_u16("item id")?);
        }
        ctx.emit(ClientEvent::SkillArrowList { items });
        Ok(())
    }

    fn process_auto_spells(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let mut skills = Vec::with_capacity(AUTO_SPELL_SLOTS);
        for _ in 0..AUTO_SPELL_SLOTS {
            let skill = msg.read_u32("skill id")?;
            if skill != 0 {
                skills.push(skill);
            }
        }
        ctx.emit(ClientEvent::SkillAutoSpells { skills });
        Ok(())
    }

    fn process_devotion(&self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        let source = msg.read_u32("source")?;
        let mut targets = Vec::with_capacity(DEVOTION_SLOTS);
        for _ in 0..DEVOTION_SLOTS {
            let target = msg.read_u32("target")?;
            if target != 0 {
                targets.push(target);
            }
        }
        let range = msg.read_u16("range")?;
        ctx.emit(ClientEvent::SkillDevotion { source, targets, range });
        Ok(())
    }

    // === Outbound ===

    pub fn level_up(&self, id: u16) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_SKILL_LEVELUP_REQUEST);
        out.write_u16(id, "skill id");
        out
    }

    pub fn use_on_being(&self, id: u16, level: u16, target: u32) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_SKILL_USE_BEING);
        out.write_u16(level, "level")
            .write_u16(id, "skill id")
            .write_u32(target, "target");
        out
    }

    pub fn use_on_position(&self, id: u16, level: u16, x: u16, y: u16) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_SKILL_USE_POSITION);
        out.write_u16(level, "level")
            .write_u16(id, "skill id")
            .write_u16(x, "x")
            .write_u16(y, "y");
        out
    }

    /// Skills that take a map name, such as warp portals
    pub fn use_on_map(&self, id: u16, map: &str) -> MessageOut {
        let mut out = MessageOut::new(packets::CMSG_SKILL_USE_MAP);
        out.write_u16(id, "skill id")
            .write_string(map, MAP_NAME_LEN, "map");
        out
    }
}

impl MessageHandler for SkillHandler {
    fn name(&self) -> &'static str {
        "skill"
    }

    fn handled_messages(&self) -> &[u16] {
        match self.dialect {
            Dialect::TmwAthena => TMWA_MESSAGES,
            Dialect::EAthena => EATHENA_MESSAGES,
        }
    }

    fn handle_message(&mut self, msg: &mut MessageIn, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match msg.opcode() {
            packets::SMSG_PLAYER_SKILLS => self.process_skill_list(msg, ctx),
            packets::SMSG_PLAYER_SKILL_UP => self.process_skill_up(msg, ctx),
            packets::SMSG_SKILL_FAILED => self.process_skill_failed(msg, ctx),
            eathena::SMSG_SKILL_ADD => self.process_skill_add(msg, ctx),
            eathena::SMSG_SKILL_UPDATE => self.process_skill_update(msg, ctx),
            eathena::SMSG_SKILL_COOLDOWN => {
                let id = msg.read_u16("skill id")?;
                let millis = msg.read_u32("duration")?;
                ctx.emit(ClientEvent::SkillCooldown { id, millis });
                Ok(())
            }
            eathena::SMSG_SKILL_DELETE => {
                let id = msg.read_u16("skill id")?;
                ctx.state.remove_skill(id);
                ctx.emit(ClientEvent::SkillRemoved { id });
                Ok(())
            }
            eathena::SMSG_SKILL_COOLDOWN_LIST => self.process_cooldown_list(msg, ctx),
            eathena::SMSG_SKILL_SNAP => {
                let being = msg.read_u32("being")?;
                let x = msg.read_u16("x")?;
                let y = msg.read_u16("y")?;
                ctx.emit(ClientEvent::SkillSnap { being, x, y });
                Ok(())
            }
            eathena::SMSG_SKILL_WARP_POINT => self.process_warp_point(msg, ctx),
            eathena::SMSG_SKILL_MEMO_MESSAGE => {
                let kind = msg.read_u8("type")?;
                ctx.emit(ClientEvent::SkillMemo { kind });
                Ok(())
            }
            eathena::SMSG_SKILL_PRODUCE_MIX_LIST => self.process_produce_list(msg, ctx),
            eathena::SMSG_SKILL_PRODUCE_EFFECT => {
                let flag = msg.read_u16("flag")?;
                let item_id = msg.read_u16("item id")?;
                ctx.emit(ClientEvent::SkillProduceResult { flag, item_id });
                Ok(())
            }
            eathena::SMSG_SKILL_UNIT_UPDATE => {
                let being = msg.read_u32("being")?;
                ctx.emit(ClientEvent::SkillUnitUpdate { being });
                Ok(())
            }
            eathena::SMSG_SKILL_ARROW_CREATE_LIST => self.process_arrow_list(msg, ctx),
            eathena::SMSG_SKILL_AUTO_SPELLS => self.process_auto_spells(msg, ctx),
            eathena::SMSG_SKILL_DEVOTION_EFFECT => self.process_devotion(msg, ctx),
            eathena::SMSG_SKILL_ITEM_LIST_WINDOW => {
                let kind = msg.read_u32("type")?;
                ctx.emit(ClientEvent::SkillItemListWindow { kind });
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
