use mako_formats::cursor::{BinaryCursor, CursorError};
use serde::Serialize;

use crate::flags::{
    decode_flags, Element, StatusEffect, TargetFlag, ELEMENT_FLAGS, STATUS_FLAGS, TARGET_FLAGS,
};

pub const COMMAND_RECORD_SIZE: usize = 8;
pub const ATTACK_RECORD_SIZE: usize = 28;
pub const ITEM_RECORD_SIZE: usize = 28;
pub const WEAPON_RECORD_SIZE: usize = 44;
pub const ARMOR_RECORD_SIZE: usize = 36;
pub const ACCESSORY_RECORD_SIZE: usize = 16;
pub const MATERIA_RECORD_SIZE: usize = 20;
pub const CHARACTER_RECORD_SIZE: usize = 0x84;
pub const GROWTH_CURVE_SIZE: usize = 16;

/// Start of the character block inside the initial-save section.
pub const SAVE_CHARACTER_OFFSET: usize = 0;
pub const SAVE_ITEM_SLOTS: usize = 320;
pub const SAVE_MATERIA_SLOTS: usize = 200;

const EMPTY_ITEM_SLOT: u16 = 0xFFFF;
const EMPTY_MATERIA_SLOT: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PartyMember {
    Cloud,
    Barret,
    Tifa,
    Aeris,
    RedXIII,
    Yuffie,
    CaitSith,
    Vincent,
    Cid,
}

impl PartyMember {
    pub fn label(self) -> &'static str {
        match self {
            PartyMember::Cloud => "cloud",
            PartyMember::Barret => "barret",
            PartyMember::Tifa => "tifa",
            PartyMember::Aeris => "aeris",
            PartyMember::RedXIII => "red_xiii",
            PartyMember::Yuffie => "yuffie",
            PartyMember::CaitSith => "cait_sith",
            PartyMember::Vincent => "vincent",
            PartyMember::Cid => "cid",
        }
    }
}

pub const EQUIP_FLAGS: &[(u32, PartyMember)] = &[
    (0x0001, PartyMember::Cloud),
    (0x0002, PartyMember::Barret),
    (0x0004, PartyMember::Tifa),
    (0x0008, PartyMember::Aeris),
    (0x0010, PartyMember::RedXIII),
    (0x0020, PartyMember::Yuffie),
    (0x0040, PartyMember::CaitSith),
    (0x0080, PartyMember::Vincent),
    (0x0100, PartyMember::Cid),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatKind {
    Strength,
    Vitality,
    Magic,
    Spirit,
    Dexterity,
    Luck,
    HpPercent,
    MpPercent,
}

impl StatKind {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(StatKind::Strength),
            2 => Some(StatKind::Vitality),
            3 => Some(StatKind::Magic),
            4 => Some(StatKind::Spirit),
            5 => Some(StatKind::Dexterity),
            6 => Some(StatKind::Luck),
            7 => Some(StatKind::HpPercent),
            8 => Some(StatKind::MpPercent),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatKind::Strength => "strength",
            StatKind::Vitality => "vitality",
            StatKind::Magic => "magic",
            StatKind::Spirit => "spirit",
            StatKind::Dexterity => "dexterity",
            StatKind::Luck => "luck",
            StatKind::HpPercent => "hp_percent",
            StatKind::MpPercent => "mp_percent",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatBonus {
    pub kind: StatKind,
    pub amount: u8,
}

fn stat_bonuses(types: &[u8], amounts: &[u8]) -> Vec<StatBonus> {
    types
        .iter()
        .zip(amounts)
        .filter_map(|(kind, amount)| {
            StatKind::from_raw(*kind).map(|kind| StatBonus {
                kind,
                amount: *amount,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub initial_cursor_action: u8,
    pub target_raw: u8,
    pub target: Vec<TargetFlag>,
    pub camera_single: u16,
    pub camera_multiple: u16,
}

impl CommandRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        let initial_cursor_action = cursor.read_u8()?;
        let target_raw = cursor.read_u8()?;
        cursor.skip(2)?;
        let camera_single = cursor.read_u16_le()?;
        let camera_multiple = cursor.read_u16_le()?;
        Ok(CommandRecord {
            id,
            name: String::new(),
            description: String::new(),
            initial_cursor_action,
            target_raw,
            target: decode_flags(target_raw.into(), TARGET_FLAGS),
            camera_single,
            camera_multiple,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttackRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub accuracy: u8,
    pub impact_effect: u8,
    pub hurt_animation: u8,
    pub mp_cost: u16,
    pub impact_sound: u16,
    pub camera_single: u16,
    pub camera_multiple: u16,
    pub target_raw: u8,
    pub target: Vec<TargetFlag>,
    pub effect_id: u8,
    pub damage_raw: u8,
    pub power: u8,
    pub condition: u8,
    pub status_change_raw: u8,
    pub status_chance: u8,
    pub status_cures: bool,
    pub additional_effect: u8,
    pub additional_modifier: u8,
    pub status_raw: u32,
    pub statuses: Vec<StatusEffect>,
    pub element_raw: u16,
    pub elements: Vec<Element>,
    pub special_raw: u16,
}

impl AttackRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        let accuracy = cursor.read_u8()?;
        let impact_effect = cursor.read_u8()?;
        let hurt_animation = cursor.read_u8()?;
        cursor.skip(1)?;
        let mp_cost = cursor.read_u16_le()?;
        let impact_sound = cursor.read_u16_le()?;
        let camera_single = cursor.read_u16_le()?;
        let camera_multiple = cursor.read_u16_le()?;
        let target_raw = cursor.read_u8()?;
        let effect_id = cursor.read_u8()?;
        let damage_raw = cursor.read_u8()?;
        let power = cursor.read_u8()?;
        let condition = cursor.read_u8()?;
        let status_change_raw = cursor.read_u8()?;
        let additional_effect = cursor.read_u8()?;
        let additional_modifier = cursor.read_u8()?;
        let status_raw = cursor.read_u32_le()?;
        let element_raw = cursor.read_u16_le()?;
        let special_raw = cursor.read_u16_le()?;
        Ok(AttackRecord {
            id,
            name: String::new(),
            description: String::new(),
            accuracy,
            impact_effect,
            hurt_animation,
            mp_cost,
            impact_sound,
            camera_single,
            camera_multiple,
            target_raw,
            target: decode_flags(target_raw.into(), TARGET_FLAGS),
            effect_id,
            damage_raw,
            power,
            condition,
            status_change_raw,
            status_chance: status_change_raw & 0x3F,
            status_cures: status_change_raw & 0x40 != 0,
            additional_effect,
            additional_modifier,
            status_raw,
            statuses: decode_flags(status_raw, STATUS_FLAGS),
            element_raw,
            elements: decode_flags(element_raw.into(), ELEMENT_FLAGS),
            special_raw,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub camera: u16,
    pub restriction_raw: u16,
    pub sellable: bool,
    pub usable_in_battle: bool,
    pub usable_in_menu: bool,
    pub target_raw: u8,
    pub target: Vec<TargetFlag>,
    pub effect_id: u8,
    pub damage_raw: u8,
    pub power: u8,
    pub condition: u8,
    pub status_change_raw: u8,
    pub additional_effect: u8,
    pub additional_modifier: u8,
    pub status_raw: u32,
    pub statuses: Vec<StatusEffect>,
    pub element_raw: u16,
    pub elements: Vec<Element>,
    pub special_raw: u16,
}

impl ItemRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        cursor.skip(8)?;
        let camera = cursor.read_u16_le()?;
        let restriction_raw = cursor.read_u16_le()?;
        let target_raw = cursor.read_u8()?;
        let effect_id = cursor.read_u8()?;
        let damage_raw = cursor.read_u8()?;
        let power = cursor.read_u8()?;
        let condition = cursor.read_u8()?;
        let status_change_raw = cursor.read_u8()?;
        let additional_effect = cursor.read_u8()?;
        let additional_modifier = cursor.read_u8()?;
        let status_raw = cursor.read_u32_le()?;
        let element_raw = cursor.read_u16_le()?;
        let special_raw = cursor.read_u16_le()?;
        Ok(ItemRecord {
            id,
            name: String::new(),
            description: String::new(),
            camera,
            restriction_raw,
            sellable: restriction_raw & 0x01 != 0,
            usable_in_battle: restriction_raw & 0x02 != 0,
            usable_in_menu: restriction_raw & 0x04 != 0,
            target_raw,
            target: decode_flags(target_raw.into(), TARGET_FLAGS),
            effect_id,
            damage_raw,
            power,
            condition,
            status_change_raw,
            additional_effect,
            additional_modifier,
            status_raw,
            statuses: decode_flags(status_raw, STATUS_FLAGS),
            element_raw,
            elements: decode_flags(element_raw.into(), ELEMENT_FLAGS),
            special_raw,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeaponRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub target_raw: u8,
    pub target: Vec<TargetFlag>,
    pub damage_raw: u8,
    pub power: u8,
    pub status_index: u8,
    pub growth_rate: u8,
    pub critical_rate: u8,
    pub accuracy: u8,
    pub model_id: u8,
    pub high_sound_mask: u8,
    pub camera: u16,
    pub equip_raw: u16,
    pub equippable_by: Vec<PartyMember>,
    pub element_raw: u16,
    pub elements: Vec<Element>,
    pub stat_bonuses: Vec<StatBonus>,
    pub materia_slots: [u8; 8],
    pub sound_hit: u8,
    pub sound_critical: u8,
    pub sound_miss: u8,
    pub effect_id: u8,
    pub special_raw: u16,
    pub restriction_raw: u16,
}

impl WeaponRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        let target_raw = cursor.read_u8()?;
        let _attack_effect = cursor.read_u8()?;
        let damage_raw = cursor.read_u8()?;
        cursor.skip(1)?;
        let power = cursor.read_u8()?;
        let status_index = cursor.read_u8()?;
        let growth_rate = cursor.read_u8()?;
        let critical_rate = cursor.read_u8()?;
        let accuracy = cursor.read_u8()?;
        cursor.skip(2)?;
        let high_sound_mask = cursor.read_u8()?;
        let model_id = cursor.read_u8()?;
        cursor.skip(1)?;
        let camera = cursor.read_u16_le()?;
        let equip_raw = cursor.read_u16_le()?;
        let element_raw = cursor.read_u16_le()?;
        let mut stat_types = [0u8; 4];
        for value in stat_types.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let mut stat_amounts = [0u8; 4];
        for value in stat_amounts.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let mut materia_slots = [0u8; 8];
        for slot in materia_slots.iter_mut() {
            *slot = cursor.read_u8()?;
        }
        let sound_hit = cursor.read_u8()?;
        let sound_critical = cursor.read_u8()?;
        let sound_miss = cursor.read_u8()?;
        let effect_id = cursor.read_u8()?;
        let special_raw = cursor.read_u16_le()?;
        let restriction_raw = cursor.read_u16_le()?;
        Ok(WeaponRecord {
            id,
            name: String::new(),
            description: String::new(),
            target_raw,
            target: decode_flags(target_raw.into(), TARGET_FLAGS),
            damage_raw,
            power,
            status_index,
            growth_rate,
            critical_rate,
            accuracy,
            model_id,
            high_sound_mask,
            camera,
            equip_raw,
            equippable_by: decode_flags(equip_raw.into(), EQUIP_FLAGS),
            element_raw,
            elements: decode_flags(element_raw.into(), ELEMENT_FLAGS),
            stat_bonuses: stat_bonuses(&stat_types, &stat_amounts),
            materia_slots,
            sound_hit,
            sound_critical,
            sound_miss,
            effect_id,
            special_raw,
            restriction_raw,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArmorRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub element_defense_mode: u8,
    pub defense: u8,
    pub magic_defense: u8,
    pub evade: u8,
    pub magic_evade: u8,
    pub status_defense: u8,
    pub materia_slots: [u8; 8],
    pub growth_rate: u8,
    pub equip_raw: u16,
    pub equippable_by: Vec<PartyMember>,
    pub element_raw: u16,
    pub elements: Vec<Element>,
    pub stat_bonuses: Vec<StatBonus>,
    pub restriction_raw: u16,
}

impl ArmorRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        cursor.skip(1)?;
        let element_defense_mode = cursor.read_u8()?;
        let defense = cursor.read_u8()?;
        let magic_defense = cursor.read_u8()?;
        let evade = cursor.read_u8()?;
        let magic_evade = cursor.read_u8()?;
        let status_defense = cursor.read_u8()?;
        cursor.skip(1)?;
        let mut materia_slots = [0u8; 8];
        for slot in materia_slots.iter_mut() {
            *slot = cursor.read_u8()?;
        }
        let growth_rate = cursor.read_u8()?;
        cursor.skip(1)?;
        let equip_raw = cursor.read_u16_le()?;
        let element_raw = cursor.read_u16_le()?;
        cursor.skip(2)?;
        let mut stat_types = [0u8; 4];
        for value in stat_types.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let mut stat_amounts = [0u8; 4];
        for value in stat_amounts.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let restriction_raw = cursor.read_u16_le()?;
        cursor.skip(2)?;
        Ok(ArmorRecord {
            id,
            name: String::new(),
            description: String::new(),
            element_defense_mode,
            defense,
            magic_defense,
            evade,
            magic_evade,
            status_defense,
            materia_slots,
            growth_rate,
            equip_raw,
            equippable_by: decode_flags(equip_raw.into(), EQUIP_FLAGS),
            element_raw,
            elements: decode_flags(element_raw.into(), ELEMENT_FLAGS),
            stat_bonuses: stat_bonuses(&stat_types, &stat_amounts),
            restriction_raw,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessoryRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub stat_bonuses: Vec<StatBonus>,
    pub element_defense_mode: u8,
    pub special_effect: u8,
    pub element_raw: u16,
    pub elements: Vec<Element>,
    pub status_raw: u32,
    pub statuses: Vec<StatusEffect>,
    pub equip_raw: u16,
    pub equippable_by: Vec<PartyMember>,
    pub restriction_raw: u16,
}

impl AccessoryRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        let mut stat_types = [0u8; 2];
        for value in stat_types.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let mut stat_amounts = [0u8; 2];
        for value in stat_amounts.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let element_defense_mode = cursor.read_u8()?;
        let special_effect = cursor.read_u8()?;
        let element_raw = cursor.read_u16_le()?;
        let status_raw = cursor.read_u32_le()?;
        let equip_raw = cursor.read_u16_le()?;
        let restriction_raw = cursor.read_u16_le()?;
        Ok(AccessoryRecord {
            id,
            name: String::new(),
            description: String::new(),
            stat_bonuses: stat_bonuses(&stat_types, &stat_amounts),
            element_defense_mode,
            special_effect,
            element_raw,
            elements: decode_flags(element_raw.into(), ELEMENT_FLAGS),
            status_raw,
            statuses: decode_flags(status_raw, STATUS_FLAGS),
            equip_raw,
            equippable_by: decode_flags(equip_raw.into(), EQUIP_FLAGS),
            restriction_raw,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MateriaKind {
    Independent,
    Support,
    Magic,
    Summon,
    Command,
}

impl MateriaKind {
    fn from_raw(raw: u8) -> Self {
        match raw & 0x0F {
            0x01 => MateriaKind::Support,
            0x02 => MateriaKind::Magic,
            0x03 => MateriaKind::Summon,
            0x04 => MateriaKind::Command,
            _ => MateriaKind::Independent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MateriaKind::Independent => "independent",
            MateriaKind::Support => "support",
            MateriaKind::Magic => "magic",
            MateriaKind::Summon => "summon",
            MateriaKind::Command => "command",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MateriaRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
    /// AP thresholds per level, already multiplied out from the stored
    /// hundreds.
    pub level_ap: [u32; 4],
    pub equip_effect: u8,
    pub status_raw: u32,
    pub statuses: Vec<StatusEffect>,
    pub element_index: u8,
    pub type_raw: u8,
    pub kind: MateriaKind,
    pub attributes: [u8; 6],
    /// Display name of the attack the materia grants, resolved against the
    /// attack name table; magic and summon kinds only.
    pub attack_comment: Option<String>,
}

impl MateriaRecord {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        let mut level_ap = [0u32; 4];
        for level in level_ap.iter_mut() {
            *level = u32::from(cursor.read_u16_le()?) * 100;
        }
        let equip_effect = cursor.read_u8()?;
        let status_low = cursor.read_u16_le()?;
        let status_high = cursor.read_u8()?;
        let status_raw = u32::from(status_low) | u32::from(status_high) << 16;
        let element_index = cursor.read_u8()?;
        let type_raw = cursor.read_u8()?;
        let mut attributes = [0u8; 6];
        for attribute in attributes.iter_mut() {
            *attribute = cursor.read_u8()?;
        }
        Ok(MateriaRecord {
            id,
            name: String::new(),
            description: String::new(),
            level_ap,
            equip_effect,
            status_raw,
            statuses: decode_flags(status_raw, STATUS_FLAGS),
            element_index,
            type_raw,
            kind: MateriaKind::from_raw(type_raw),
            attributes,
            attack_comment: None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyItemRecord {
    pub id: usize,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummonNameRecord {
    pub id: usize,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterRecord {
    pub id: usize,
    pub name: String,
    pub level: u8,
    pub strength: u8,
    pub vitality: u8,
    pub magic: u8,
    pub spirit: u8,
    pub dexterity: u8,
    pub luck: u8,
    pub limit_level: u8,
    pub equipped_weapon: u8,
    pub equipped_armor: u8,
    pub equipped_accessory: u8,
    pub row: u8,
    pub current_hp: u16,
    pub base_hp: u16,
    pub current_mp: u16,
    pub base_mp: u16,
    pub experience: u32,
}

impl CharacterRecord {
    /// `name_bytes` are handed back raw; the reader decodes them through
    /// the text codec since character names use the game charset.
    pub fn parse<'a>(
        cursor: &mut BinaryCursor<'a>,
        id: usize,
    ) -> Result<(Self, &'a [u8]), CursorError> {
        let record_start = cursor.offset();
        let _char_id = cursor.read_u8()?;
        let level = cursor.read_u8()?;
        let strength = cursor.read_u8()?;
        let vitality = cursor.read_u8()?;
        let magic = cursor.read_u8()?;
        let spirit = cursor.read_u8()?;
        let dexterity = cursor.read_u8()?;
        let luck = cursor.read_u8()?;
        cursor.skip(6)?; // stat bonuses
        let limit_level = cursor.read_u8()?;
        let _limit_bar = cursor.read_u8()?;
        let name_bytes = cursor.read_bytes(12)?;
        let equipped_weapon = cursor.read_u8()?;
        let equipped_armor = cursor.read_u8()?;
        let equipped_accessory = cursor.read_u8()?;
        let _status = cursor.read_u8()?;
        let row = cursor.read_u8()?;
        let _level_progress = cursor.read_u8()?;
        let _learned_limits = cursor.read_u16_le()?;
        let _kills = cursor.read_u16_le()?;
        cursor.skip(6)?; // per-level limit uses
        let current_hp = cursor.read_u16_le()?;
        let base_hp = cursor.read_u16_le()?;
        let current_mp = cursor.read_u16_le()?;
        let base_mp = cursor.read_u16_le()?;
        cursor.skip(4)?;
        let _max_hp = cursor.read_u16_le()?;
        let _max_mp = cursor.read_u16_le()?;
        let experience = cursor.read_u32_le()?;
        cursor.seek(record_start + CHARACTER_RECORD_SIZE)?;
        Ok((
            CharacterRecord {
                id,
                name: String::new(),
                level,
                strength,
                vitality,
                magic,
                spirit,
                dexterity,
                luck,
                limit_level,
                equipped_weapon,
                equipped_armor,
                equipped_accessory,
                row,
                current_hp,
                base_hp,
                current_mp,
                base_mp,
                experience,
            },
            name_bytes,
        ))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct InventorySlot {
    pub item_id: u16,
    pub quantity: u8,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MateriaSlot {
    pub materia_id: u8,
    pub ap: u32,
}

/// The new-game save image: party roster, stocked items and materia, gil.
/// Character records live at the front and are read separately.
#[derive(Debug, Clone, Serialize)]
pub struct InitialSaveState {
    pub party: [u8; 3],
    pub items: Vec<InventorySlot>,
    pub materia: Vec<MateriaSlot>,
    pub gil: u32,
}

impl InitialSaveState {
    pub fn parse(cursor: &mut BinaryCursor<'_>) -> Result<Self, CursorError> {
        let mut party = [0u8; 3];
        for member in party.iter_mut() {
            *member = cursor.read_u8()?;
        }
        cursor.skip(1)?;
        let mut items = Vec::new();
        for _ in 0..SAVE_ITEM_SLOTS {
            let raw = cursor.read_u16_le()?;
            if raw != EMPTY_ITEM_SLOT {
                items.push(InventorySlot {
                    item_id: raw & 0x01FF,
                    quantity: (raw >> 9) as u8,
                });
            }
        }
        let mut materia = Vec::new();
        for _ in 0..SAVE_MATERIA_SLOTS {
            let raw = cursor.read_u32_le()?;
            if raw != EMPTY_MATERIA_SLOT {
                materia.push(MateriaSlot {
                    materia_id: (raw & 0xFF) as u8,
                    ap: raw >> 8,
                });
            }
        }
        let gil = cursor.read_u32_le()?;
        Ok(InitialSaveState {
            party,
            items,
            materia,
            gil,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthCurve {
    pub id: usize,
    pub gradients: [u8; 8],
    pub bases: [u8; 8],
}

impl GrowthCurve {
    pub fn parse(cursor: &mut BinaryCursor<'_>, id: usize) -> Result<Self, CursorError> {
        let mut gradients = [0u8; 8];
        for value in gradients.iter_mut() {
            *value = cursor.read_u8()?;
        }
        let mut bases = [0u8; 8];
        for value in bases.iter_mut() {
            *value = cursor.read_u8()?;
        }
        Ok(GrowthCurve {
            id,
            gradients,
            bases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_record_derives_flag_sets() {
        let mut raw = vec![0u8; ATTACK_RECORD_SIZE];
        raw[0] = 95; // accuracy
        raw[4] = 22; // mp cost
        raw[12] = 0x41; // selectable + random target
        raw[15] = 30; // power
        raw[17] = 0x44; // cures, 4% chance
        raw[20..24].copy_from_slice(&0x0000_0009u32.to_le_bytes()); // death + poison
        raw[24..26].copy_from_slice(&0x0001u16.to_le_bytes()); // fire

        let mut cursor = BinaryCursor::new(&raw);
        let attack = AttackRecord::parse(&mut cursor, 7).unwrap();
        assert_eq!(attack.id, 7);
        assert_eq!(attack.accuracy, 95);
        assert_eq!(attack.mp_cost, 22);
        assert_eq!(
            attack.target,
            vec![TargetFlag::Selectable, TargetFlag::RandomTarget]
        );
        assert_eq!(
            attack.statuses,
            vec![StatusEffect::Death, StatusEffect::Poison]
        );
        assert_eq!(attack.elements, vec![Element::Fire]);
        assert_eq!(attack.status_chance, 4);
        assert!(attack.status_cures);
        assert_eq!(cursor.offset(), ATTACK_RECORD_SIZE);
    }

    #[test]
    fn weapon_record_reads_equip_and_slots() {
        let mut raw = vec![0u8; WEAPON_RECORD_SIZE];
        raw[4] = 18; // power
        raw[12] = 3; // model
        raw[16..18].copy_from_slice(&0x0005u16.to_le_bytes()); // cloud + tifa
        raw[20] = 1; // strength bonus
        raw[24] = 5;
        raw[28] = 2;
        raw[29] = 2;

        let mut cursor = BinaryCursor::new(&raw);
        let weapon = WeaponRecord::parse(&mut cursor, 0).unwrap();
        assert_eq!(weapon.power, 18);
        assert_eq!(weapon.model_id, 3);
        assert_eq!(
            weapon.equippable_by,
            vec![PartyMember::Cloud, PartyMember::Tifa]
        );
        assert_eq!(weapon.stat_bonuses.len(), 1);
        assert_eq!(weapon.stat_bonuses[0].kind, StatKind::Strength);
        assert_eq!(weapon.stat_bonuses[0].amount, 5);
        assert_eq!(weapon.materia_slots[..2], [2, 2]);
        assert_eq!(cursor.offset(), WEAPON_RECORD_SIZE);
    }

    #[test]
    fn materia_record_scales_ap_thresholds() {
        let mut raw = vec![0u8; MATERIA_RECORD_SIZE];
        raw[0..2].copy_from_slice(&1u16.to_le_bytes());
        raw[2..4].copy_from_slice(&60u16.to_le_bytes());
        raw[13] = 0x02; // magic
        raw[14] = 9; // attack id attribute

        let mut cursor = BinaryCursor::new(&raw);
        let materia = MateriaRecord::parse(&mut cursor, 0).unwrap();
        assert_eq!(materia.level_ap[0], 100);
        assert_eq!(materia.level_ap[1], 6000);
        assert_eq!(materia.kind, MateriaKind::Magic);
        assert_eq!(materia.attributes[0], 9);
    }

    #[test]
    fn truncated_record_fails_without_panicking() {
        let raw = [0u8; 4];
        let mut cursor = BinaryCursor::new(&raw);
        assert!(AttackRecord::parse(&mut cursor, 0).is_err());
    }

    #[test]
    fn initial_save_skips_empty_slots() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&[0, 1, 2]); // party
        raw.push(0);
        for index in 0..SAVE_ITEM_SLOTS {
            if index == 2 {
                // item 20, quantity 3
                raw.extend_from_slice(&(20u16 | 3 << 9).to_le_bytes());
            } else {
                raw.extend_from_slice(&0xFFFFu16.to_le_bytes());
            }
        }
        for index in 0..SAVE_MATERIA_SLOTS {
            if index == 0 {
                raw.extend_from_slice(&(5u32 | 1000 << 8).to_le_bytes());
            } else {
                raw.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
            }
        }
        raw.extend_from_slice(&500u32.to_le_bytes());

        let mut cursor = BinaryCursor::new(&raw);
        let save = InitialSaveState::parse(&mut cursor).unwrap();
        assert_eq!(save.party, [0, 1, 2]);
        assert_eq!(save.items.len(), 1);
        assert_eq!(save.items[0].item_id, 20);
        assert_eq!(save.items[0].quantity, 3);
        assert_eq!(save.materia.len(), 1);
        assert_eq!(save.materia[0].materia_id, 5);
        assert_eq!(save.materia[0].ap, 1000);
        assert_eq!(save.gil, 500);
    }

    #[test]
    fn character_record_consumes_its_full_extent() {
        let mut raw = vec![0u8; CHARACTER_RECORD_SIZE * 2];
        raw[1] = 7; // level
        raw[CHARACTER_RECORD_SIZE + 1] = 9;

        let mut cursor = BinaryCursor::new(&raw);
        let (first, _) = CharacterRecord::parse(&mut cursor, 0).unwrap();
        assert_eq!(first.level, 7);
        assert_eq!(cursor.offset(), CHARACTER_RECORD_SIZE);
        let (second, _) = CharacterRecord::parse(&mut cursor, 1).unwrap();
        assert_eq!(second.level, 9);
    }
}
