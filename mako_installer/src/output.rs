use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mako_data::records::{
    AccessoryRecord, ArmorRecord, AttackRecord, CharacterRecord, CommandRecord, GrowthCurve,
    InitialSaveState, ItemRecord, KeyItemRecord, MateriaRecord, SummonNameRecord, WeaponRecord,
};
use mako_formats::text::sanitize_quotes;

use crate::spawn::ResolvedSpawn;

/// Values of the declarative `key = { field = value, … }` output format.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<DeclValue>),
}

impl DeclValue {
    pub fn str(value: impl Into<String>) -> Self {
        DeclValue::Str(value.into())
    }

    pub fn labels<T: Copy>(values: &[T], label: impl Fn(T) -> &'static str) -> Self {
        DeclValue::List(values.iter().map(|v| DeclValue::str(label(*v))).collect())
    }

    fn render(&self, out: &mut String) {
        match self {
            // The format delimits strings with double quotes, so embedded
            // quotes have already become apostrophes by here; sanitize
            // again to keep the writer safe on its own.
            DeclValue::Str(value) => {
                let _ = write!(out, "\"{}\"", sanitize_quotes(value));
            }
            DeclValue::Int(value) => {
                let _ = write!(out, "{value}");
            }
            DeclValue::Float(value) => {
                let _ = write!(out, "{value:.3}");
            }
            DeclValue::Bool(value) => {
                let _ = write!(out, "{value}");
            }
            DeclValue::List(values) => {
                out.push_str("{ ");
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    value.render(out);
                }
                out.push_str(" }");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeclRecord {
    pub key: String,
    pub fields: Vec<(String, DeclValue)>,
}

impl DeclRecord {
    pub fn new(key: impl Into<String>) -> Self {
        DeclRecord {
            key: key.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: DeclValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}

pub fn render_records(records: &[DeclRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "{} = {{", record.key);
        for (name, value) in &record.fields {
            out.push_str("    ");
            out.push_str(name);
            out.push_str(" = ");
            value.render(&mut out);
            out.push_str(",\n");
        }
        out.push_str("}\n\n");
    }
    out
}

pub fn write_records(path: &Path, records: &[DeclRecord]) -> Result<()> {
    fs::write(path, render_records(records))
        .with_context(|| format!("writing {}", path.display()))
}

/// Trigger line reference embedded in the per-map markup.
#[derive(Debug, Clone)]
pub struct TriggerRef {
    pub index: usize,
    pub destination: String,
    pub exit_line: [[i16; 3]; 2],
}

/// Everything the per-map markup file carries.
#[derive(Debug, Clone, Default)]
pub struct MapMarkup {
    pub name: String,
    pub field_id: u16,
    pub script: Option<String>,
    pub background: Option<String>,
    pub walkmesh: Option<String>,
    pub rotation: f32,
    pub default_entry: Option<(f32, f32, f32)>,
    pub spawns: Vec<ResolvedSpawn>,
    pub triggers: Vec<TriggerRef>,
    pub music: Vec<u32>,
    pub dialog: Vec<(u8, String)>,
}

pub fn map_markup_records(map: &MapMarkup) -> Vec<DeclRecord> {
    let mut records = Vec::new();

    let mut header = DeclRecord::new(format!("map_{}", map.name))
        .field("id", DeclValue::Int(map.field_id.into()))
        .field("rotation", DeclValue::Float(map.rotation.into()));
    if let Some(reference) = &map.script {
        header = header.field("script", DeclValue::str(reference));
    }
    if let Some(reference) = &map.background {
        header = header.field("background", DeclValue::str(reference));
    }
    if let Some(reference) = &map.walkmesh {
        header = header.field("walkmesh", DeclValue::str(reference));
    }
    if let Some((x, y, z)) = map.default_entry {
        header = header.field(
            "default_entry",
            DeclValue::List(vec![
                DeclValue::Float(x.into()),
                DeclValue::Float(y.into()),
                DeclValue::Float(z.into()),
            ]),
        );
    }
    header = header.field(
        "music",
        DeclValue::List(map.music.iter().map(|id| DeclValue::Int((*id).into())).collect()),
    );
    records.push(header);

    for spawn in &map.spawns {
        records.push(
            DeclRecord::new(&spawn.name)
                .field("from", DeclValue::str(&spawn.source_name))
                .field("x", DeclValue::Float(spawn.x.into()))
                .field("y", DeclValue::Float(spawn.y.into()))
                .field("z", DeclValue::Float(spawn.z.into()))
                .field("rotation", DeclValue::Float(spawn.rotation.into()))
                .field("script_origin", DeclValue::Bool(spawn.script_origin)),
        );
    }

    for trigger in &map.triggers {
        records.push(
            DeclRecord::new(format!("gateway_{}", trigger.index))
                .field("destination", DeclValue::str(&trigger.destination))
                .field(
                    "line",
                    DeclValue::List(
                        trigger
                            .exit_line
                            .iter()
                            .flatten()
                            .map(|axis| DeclValue::Int((*axis).into()))
                            .collect(),
                    ),
                ),
        );
    }

    for (id, text) in &map.dialog {
        records.push(
            DeclRecord::new(format!("dialog_{id}")).field("text", DeclValue::str(text)),
        );
    }

    records
}

pub fn walkmesh_records(walkmesh: &mako_formats::field::Walkmesh) -> Vec<DeclRecord> {
    walkmesh
        .triangles
        .iter()
        .enumerate()
        .map(|(index, triangle)| {
            DeclRecord::new(format!("triangle_{index}"))
                .field(
                    "vertices",
                    DeclValue::List(
                        triangle
                            .vertices
                            .iter()
                            .flat_map(|vertex| vertex[..3].iter())
                            .map(|axis| DeclValue::Int((*axis).into()))
                            .collect(),
                    ),
                )
                .field("z", DeclValue::Float(triangle.center_z().into()))
        })
        .collect()
}

/// Master index entry for one scanned map.
#[derive(Debug, Clone)]
pub struct MapIndexEntry {
    pub id: u16,
    pub name: String,
    pub converted: bool,
    pub crash_prone: bool,
}

pub fn field_index_records(entries: &[MapIndexEntry]) -> Vec<DeclRecord> {
    entries
        .iter()
        .map(|entry| {
            DeclRecord::new(format!("field_{}", entry.id))
                .field("name", DeclValue::str(&entry.name))
                .field("converted", DeclValue::Bool(entry.converted))
                .field("crash_prone", DeclValue::Bool(entry.crash_prone))
        })
        .collect()
}

pub fn command_records(commands: &[CommandRecord]) -> Vec<DeclRecord> {
    commands
        .iter()
        .map(|command| {
            DeclRecord::new(format!("command_{}", command.id))
                .field("name", DeclValue::str(&command.name))
                .field("description", DeclValue::str(&command.description))
                .field("cursor_action", DeclValue::Int(command.initial_cursor_action.into()))
                .field("target", DeclValue::labels(&command.target, |f| f.label()))
                .field("camera_single", DeclValue::Int(command.camera_single.into()))
                .field("camera_multiple", DeclValue::Int(command.camera_multiple.into()))
        })
        .collect()
}

pub fn attack_records(attacks: &[AttackRecord]) -> Vec<DeclRecord> {
    attacks
        .iter()
        .map(|attack| {
            DeclRecord::new(format!("attack_{}", attack.id))
                .field("name", DeclValue::str(&attack.name))
                .field("description", DeclValue::str(&attack.description))
                .field("accuracy", DeclValue::Int(attack.accuracy.into()))
                .field("mp_cost", DeclValue::Int(attack.mp_cost.into()))
                .field("power", DeclValue::Int(attack.power.into()))
                .field("target", DeclValue::labels(&attack.target, |f| f.label()))
                .field("elements", DeclValue::labels(&attack.elements, |e| e.label()))
                .field("statuses", DeclValue::labels(&attack.statuses, |s| s.label()))
                .field("status_chance", DeclValue::Int(attack.status_chance.into()))
        })
        .collect()
}

pub fn item_records(items: &[ItemRecord]) -> Vec<DeclRecord> {
    items
        .iter()
        .map(|item| {
            DeclRecord::new(format!("item_{}", item.id))
                .field("name", DeclValue::str(&item.name))
                .field("description", DeclValue::str(&item.description))
                .field("power", DeclValue::Int(item.power.into()))
                .field("usable_in_battle", DeclValue::Bool(item.usable_in_battle))
                .field("usable_in_menu", DeclValue::Bool(item.usable_in_menu))
                .field("target", DeclValue::labels(&item.target, |f| f.label()))
                .field("elements", DeclValue::labels(&item.elements, |e| e.label()))
                .field("statuses", DeclValue::labels(&item.statuses, |s| s.label()))
        })
        .collect()
}

pub fn weapon_records(weapons: &[WeaponRecord]) -> Vec<DeclRecord> {
    weapons
        .iter()
        .map(|weapon| {
            DeclRecord::new(format!("weapon_{}", weapon.id))
                .field("name", DeclValue::str(&weapon.name))
                .field("description", DeclValue::str(&weapon.description))
                .field("power", DeclValue::Int(weapon.power.into()))
                .field("accuracy", DeclValue::Int(weapon.accuracy.into()))
                .field("critical_rate", DeclValue::Int(weapon.critical_rate.into()))
                .field("growth_rate", DeclValue::Int(weapon.growth_rate.into()))
                .field("model", DeclValue::Int(weapon.model_id.into()))
                .field(
                    "equippable_by",
                    DeclValue::labels(&weapon.equippable_by, |m| m.label()),
                )
                .field("elements", DeclValue::labels(&weapon.elements, |e| e.label()))
                .field(
                    "materia_slots",
                    DeclValue::List(
                        weapon
                            .materia_slots
                            .iter()
                            .map(|slot| DeclValue::Int((*slot).into()))
                            .collect(),
                    ),
                )
        })
        .collect()
}

pub fn armor_records(armors: &[ArmorRecord]) -> Vec<DeclRecord> {
    armors
        .iter()
        .map(|armor| {
            DeclRecord::new(format!("armor_{}", armor.id))
                .field("name", DeclValue::str(&armor.name))
                .field("description", DeclValue::str(&armor.description))
                .field("defense", DeclValue::Int(armor.defense.into()))
                .field("magic_defense", DeclValue::Int(armor.magic_defense.into()))
                .field("evade", DeclValue::Int(armor.evade.into()))
                .field("growth_rate", DeclValue::Int(armor.growth_rate.into()))
                .field(
                    "equippable_by",
                    DeclValue::labels(&armor.equippable_by, |m| m.label()),
                )
                .field("elements", DeclValue::labels(&armor.elements, |e| e.label()))
                .field(
                    "materia_slots",
                    DeclValue::List(
                        armor
                            .materia_slots
                            .iter()
                            .map(|slot| DeclValue::Int((*slot).into()))
                            .collect(),
                    ),
                )
        })
        .collect()
}

pub fn accessory_records(accessories: &[AccessoryRecord]) -> Vec<DeclRecord> {
    accessories
        .iter()
        .map(|accessory| {
            DeclRecord::new(format!("accessory_{}", accessory.id))
                .field("name", DeclValue::str(&accessory.name))
                .field("description", DeclValue::str(&accessory.description))
                .field("special_effect", DeclValue::Int(accessory.special_effect.into()))
                .field(
                    "equippable_by",
                    DeclValue::labels(&accessory.equippable_by, |m| m.label()),
                )
                .field(
                    "elements",
                    DeclValue::labels(&accessory.elements, |e| e.label()),
                )
                .field(
                    "statuses",
                    DeclValue::labels(&accessory.statuses, |s| s.label()),
                )
        })
        .collect()
}

pub fn materia_records(materias: &[MateriaRecord]) -> Vec<DeclRecord> {
    materias
        .iter()
        .map(|materia| {
            let mut record = DeclRecord::new(format!("materia_{}", materia.id))
                .field("name", DeclValue::str(&materia.name))
                .field("description", DeclValue::str(&materia.description))
                .field("kind", DeclValue::str(materia.kind.label()))
                .field(
                    "level_ap",
                    DeclValue::List(
                        materia
                            .level_ap
                            .iter()
                            .map(|ap| DeclValue::Int((*ap).into()))
                            .collect(),
                    ),
                )
                .field(
                    "statuses",
                    DeclValue::labels(&materia.statuses, |s| s.label()),
                );
            if let Some(comment) = &materia.attack_comment {
                record = record.field("grants", DeclValue::str(comment));
            }
            record
        })
        .collect()
}

pub fn key_item_records(key_items: &[KeyItemRecord]) -> Vec<DeclRecord> {
    key_items
        .iter()
        .map(|key_item| {
            DeclRecord::new(format!("key_item_{}", key_item.id))
                .field("name", DeclValue::str(&key_item.name))
                .field("description", DeclValue::str(&key_item.description))
        })
        .collect()
}

pub fn summon_name_records(summons: &[SummonNameRecord]) -> Vec<DeclRecord> {
    summons
        .iter()
        .map(|summon| {
            DeclRecord::new(format!("summon_{}", summon.id))
                .field("name", DeclValue::str(&summon.name))
        })
        .collect()
}

pub fn character_records(characters: &[CharacterRecord]) -> Vec<DeclRecord> {
    characters
        .iter()
        .map(|character| {
            DeclRecord::new(format!("character_{}", character.id))
                .field("name", DeclValue::str(&character.name))
                .field("level", DeclValue::Int(character.level.into()))
                .field("strength", DeclValue::Int(character.strength.into()))
                .field("vitality", DeclValue::Int(character.vitality.into()))
                .field("magic", DeclValue::Int(character.magic.into()))
                .field("spirit", DeclValue::Int(character.spirit.into()))
                .field("dexterity", DeclValue::Int(character.dexterity.into()))
                .field("luck", DeclValue::Int(character.luck.into()))
                .field("base_hp", DeclValue::Int(character.base_hp.into()))
                .field("base_mp", DeclValue::Int(character.base_mp.into()))
                .field("weapon", DeclValue::Int(character.equipped_weapon.into()))
                .field("armor", DeclValue::Int(character.equipped_armor.into()))
        })
        .collect()
}

pub fn growth_records(curves: &[GrowthCurve]) -> Vec<DeclRecord> {
    curves
        .iter()
        .map(|curve| {
            DeclRecord::new(format!("growth_curve_{}", curve.id))
                .field(
                    "gradients",
                    DeclValue::List(
                        curve
                            .gradients
                            .iter()
                            .map(|g| DeclValue::Int((*g).into()))
                            .collect(),
                    ),
                )
                .field(
                    "bases",
                    DeclValue::List(
                        curve.bases.iter().map(|b| DeclValue::Int((*b).into())).collect(),
                    ),
                )
        })
        .collect()
}

pub fn savemap_records(save: &InitialSaveState) -> Vec<DeclRecord> {
    let mut records = vec![DeclRecord::new("initial_party")
        .field(
            "members",
            DeclValue::List(
                save.party
                    .iter()
                    .map(|member| DeclValue::Int((*member).into()))
                    .collect(),
            ),
        )
        .field("gil", DeclValue::Int(save.gil.into()))];
    for (index, slot) in save.items.iter().enumerate() {
        records.push(
            DeclRecord::new(format!("initial_item_{index}"))
                .field("item", DeclValue::Int(slot.item_id.into()))
                .field("quantity", DeclValue::Int(slot.quantity.into())),
        );
    }
    for (index, slot) in save.materia.iter().enumerate() {
        records.push(
            DeclRecord::new(format!("initial_materia_{index}"))
                .field("materia", DeclValue::Int(slot.materia_id.into()))
                .field("ap", DeclValue::Int(slot.ap.into())),
        );
    }
    records
}
