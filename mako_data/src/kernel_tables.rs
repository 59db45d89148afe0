use anyhow::{Context, Result};
use mako_formats::cursor::{BinaryCursor, CursorError};
use mako_formats::kernel::{KernelArchive, SectionId};
use mako_formats::text::{self, Charset};

use crate::names::NameTable;
use crate::records::*;

/// Fixed record counts per section. These are constants of the game
/// version, not self-describing data, so they are injected rather than
/// discovered.
#[derive(Debug, Clone)]
pub struct TableCounts {
    pub commands: usize,
    pub attacks: usize,
    pub items: usize,
    pub weapons: usize,
    pub armors: usize,
    pub accessories: usize,
    pub materias: usize,
    pub key_items: usize,
    pub summon_names: usize,
    pub characters: usize,
    pub growth_curves: usize,
}

/// Per-version configuration: section layout plus the field lists the
/// converter must special-case. Swappable wholesale for other releases.
#[derive(Debug, Clone)]
pub struct GameLayout {
    pub counts: TableCounts,
    /// Placeholder maps that only exist for the debug room; never convert.
    pub debug_fields: Vec<String>,
    /// Maps whose shipped scripts crash the original engine; converted but
    /// flagged in the index.
    pub crash_prone_fields: Vec<String>,
}

impl GameLayout {
    pub fn pc() -> Self {
        GameLayout {
            counts: TableCounts {
                commands: 32,
                attacks: 128,
                items: 128,
                weapons: 128,
                armors: 32,
                accessories: 32,
                materias: 96,
                key_items: 64,
                summon_names: 16,
                characters: 9,
                growth_curves: 64,
            },
            debug_fields: [
                "blackbg1", "blackbg2", "blackbg3", "blackbg4", "blackbg5", "blackbg6", "tin_1",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            crash_prone_fields: ["bugin1a", "convil_4"].into_iter().map(String::from).collect(),
        }
    }

    pub fn is_debug_field(&self, name: &str) -> bool {
        self.debug_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(name))
    }

    pub fn is_crash_prone_field(&self, name: &str) -> bool {
        self.crash_prone_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(name))
    }
}

/// Everything pulled out of the game-data blob, fully decoded. Built in one
/// pass and read-only afterwards.
#[derive(Debug)]
pub struct KernelData {
    pub commands: Vec<CommandRecord>,
    pub attacks: Vec<AttackRecord>,
    pub items: Vec<ItemRecord>,
    pub weapons: Vec<WeaponRecord>,
    pub armors: Vec<ArmorRecord>,
    pub accessories: Vec<AccessoryRecord>,
    pub materias: Vec<MateriaRecord>,
    pub key_items: Vec<KeyItemRecord>,
    pub summon_names: Vec<SummonNameRecord>,
    pub characters: Vec<CharacterRecord>,
    pub initial_save: InitialSaveState,
    pub growth_curves: Vec<GrowthCurve>,
    pub attack_names: NameTable,
    pub warnings: Vec<String>,
}

/// Reads the fixed-size record arrays out of the blob's named sections,
/// derives the bit-flag fields, and resolves display names through the
/// text codec. Decode failures cost one record, never the run.
pub struct RecordTableReader<'a> {
    archive: &'a KernelArchive,
    charset: &'a Charset,
    layout: &'a GameLayout,
    warnings: Vec<String>,
}

impl<'a> RecordTableReader<'a> {
    pub fn new(archive: &'a KernelArchive, charset: &'a Charset, layout: &'a GameLayout) -> Self {
        RecordTableReader {
            archive,
            charset,
            layout,
            warnings: Vec::new(),
        }
    }

    pub fn read_all(mut self) -> Result<KernelData> {
        let counts = self.layout.counts.clone();

        let command_names = self.read_text_table(SectionId::CommandNames, counts.commands)?;
        let command_descs = self.read_text_table(SectionId::CommandDescriptions, counts.commands)?;
        let attack_names = self.read_text_table(SectionId::AttackNames, counts.attacks)?;
        let attack_descs = self.read_text_table(SectionId::AttackDescriptions, counts.attacks)?;
        let item_names = self.read_text_table(SectionId::ItemNames, counts.items)?;
        let item_descs = self.read_text_table(SectionId::ItemDescriptions, counts.items)?;
        let weapon_names = self.read_text_table(SectionId::WeaponNames, counts.weapons)?;
        let weapon_descs = self.read_text_table(SectionId::WeaponDescriptions, counts.weapons)?;
        let armor_names = self.read_text_table(SectionId::ArmorNames, counts.armors)?;
        let armor_descs = self.read_text_table(SectionId::ArmorDescriptions, counts.armors)?;
        let accessory_names = self.read_text_table(SectionId::AccessoryNames, counts.accessories)?;
        let accessory_descs =
            self.read_text_table(SectionId::AccessoryDescriptions, counts.accessories)?;
        let materia_names = self.read_text_table(SectionId::MateriaNames, counts.materias)?;
        let materia_descs =
            self.read_text_table(SectionId::MateriaDescriptions, counts.materias)?;
        let key_item_names = self.read_text_table(SectionId::KeyItemNames, counts.key_items)?;
        let key_item_descs =
            self.read_text_table(SectionId::KeyItemDescriptions, counts.key_items)?;
        let summon_names_table = self.read_text_table(SectionId::SummonNames, counts.summon_names)?;

        let commands = self
            .read_table(
                SectionId::CommandData,
                counts.commands,
                COMMAND_RECORD_SIZE,
                "command",
                CommandRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&command_names, index);
                record.description = named(&command_descs, index);
                record
            })
            .collect();

        let attacks: Vec<AttackRecord> = self
            .read_table(
                SectionId::AttackData,
                counts.attacks,
                ATTACK_RECORD_SIZE,
                "attack",
                AttackRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&attack_names, index);
                record.description = named(&attack_descs, index);
                record
            })
            .collect();

        let items = self
            .read_table(
                SectionId::ItemData,
                counts.items,
                ITEM_RECORD_SIZE,
                "item",
                ItemRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&item_names, index);
                record.description = named(&item_descs, index);
                record
            })
            .collect();

        let weapons = self
            .read_table(
                SectionId::WeaponData,
                counts.weapons,
                WEAPON_RECORD_SIZE,
                "weapon",
                WeaponRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&weapon_names, index);
                record.description = named(&weapon_descs, index);
                record
            })
            .collect();

        let armors = self
            .read_table(
                SectionId::ArmorData,
                counts.armors,
                ARMOR_RECORD_SIZE,
                "armor",
                ArmorRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&armor_names, index);
                record.description = named(&armor_descs, index);
                record
            })
            .collect();

        let accessories = self
            .read_table(
                SectionId::AccessoryData,
                counts.accessories,
                ACCESSORY_RECORD_SIZE,
                "accessory",
                AccessoryRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&accessory_names, index);
                record.description = named(&accessory_descs, index);
                record
            })
            .collect();

        let materias = self
            .read_table(
                SectionId::MateriaData,
                counts.materias,
                MATERIA_RECORD_SIZE,
                "materia",
                MateriaRecord::parse,
            )?
            .into_iter()
            .map(|(index, mut record)| {
                record.name = named(&materia_names, index);
                record.description = named(&materia_descs, index);
                if matches!(record.kind, MateriaKind::Magic | MateriaKind::Summon) {
                    record.attack_comment = attack_names
                        .get(record.attributes[0] as usize)
                        .filter(|name| !name.is_empty())
                        .map(String::from);
                }
                record
            })
            .collect();

        let key_items = (0..counts.key_items)
            .map(|index| KeyItemRecord {
                id: index,
                name: named(&key_item_names, index),
                description: named(&key_item_descs, index),
            })
            .collect();

        let summon_names = (0..counts.summon_names)
            .map(|index| SummonNameRecord {
                id: index,
                name: named(&summon_names_table, index),
            })
            .collect();

        let (characters, initial_save) = self.read_initial_save(counts.characters)?;

        let growth_curves = self
            .read_table(
                SectionId::GrowthData,
                counts.growth_curves,
                GROWTH_CURVE_SIZE,
                "growth curve",
                GrowthCurve::parse,
            )?
            .into_iter()
            .map(|(_, record)| record)
            .collect();

        Ok(KernelData {
            commands,
            attacks,
            items,
            weapons,
            armors,
            accessories,
            materias,
            key_items,
            summon_names,
            characters,
            initial_save,
            growth_curves,
            attack_names,
            warnings: self.warnings,
        })
    }

    fn warn(&mut self, message: String) {
        eprintln!("[mako_data] warning: {message}");
        self.warnings.push(message);
    }

    fn section_bytes(&self, id: SectionId) -> Result<Vec<u8>> {
        self.archive
            .section(id)?
            .decompress()
            .with_context(|| format!("reading kernel section {:?}", id))
    }

    fn read_text_table(&mut self, id: SectionId, count: usize) -> Result<NameTable> {
        let data = self.section_bytes(id)?;
        let mut table_cursor = BinaryCursor::new(&data);
        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let offset = match table_cursor.read_u16_le() {
                Ok(offset) => offset,
                Err(err) => {
                    self.warn(format!(
                        "{id:?} offset table truncated at entry {index}: {err}"
                    ));
                    break;
                }
            };
            match text::decode_string(self.charset, &data, offset as usize) {
                Ok(decoded) => {
                    for byte in &decoded.unknown {
                        self.warn(format!("unknown glyph {byte:#04x} in {id:?} entry {index}"));
                    }
                    entries.push(decoded.text);
                }
                Err(err) => {
                    self.warn(format!("{id:?} entry {index} skipped: {err}"));
                    entries.push(String::new());
                }
            }
        }
        entries.resize(count, String::new());
        Ok(NameTable::new(entries))
    }

    fn read_table<T>(
        &mut self,
        id: SectionId,
        count: usize,
        record_size: usize,
        label: &str,
        parse: impl Fn(&mut BinaryCursor<'_>, usize) -> Result<T, CursorError>,
    ) -> Result<Vec<(usize, T)>> {
        let data = self.section_bytes(id)?;
        let mut records = Vec::with_capacity(count);
        for index in 0..count {
            let start = index * record_size;
            let mut cursor = match BinaryCursor::at(&data, start) {
                Ok(cursor) => cursor,
                Err(err) => {
                    self.warn(format!("{label} table truncated at record {index}: {err}"));
                    break;
                }
            };
            match parse(&mut cursor, index) {
                Ok(record) => records.push((index, record)),
                Err(err) => self.warn(format!("{label} {index} skipped: {err}")),
            }
        }
        Ok(records)
    }

    fn read_initial_save(
        &mut self,
        character_count: usize,
    ) -> Result<(Vec<CharacterRecord>, InitialSaveState)> {
        let data = self.section_bytes(SectionId::InitialSaveState)?;
        let mut cursor = BinaryCursor::new(&data);
        let mut characters = Vec::with_capacity(character_count);
        for index in 0..character_count {
            match CharacterRecord::parse(&mut cursor, index) {
                Ok((mut record, name_bytes)) => {
                    record.name = self.decode_fixed_text(name_bytes, "character name", index);
                    characters.push(record);
                }
                Err(err) => {
                    self.warn(format!("character {index} skipped: {err}"));
                    // Records are fixed-size; step over the bad one.
                    cursor.seek((index + 1) * CHARACTER_RECORD_SIZE)?;
                }
            }
        }
        let save = InitialSaveState::parse(&mut cursor)
            .context("initial save state after character block")?;
        Ok((characters, save))
    }

    /// Character names sit in fixed 12-byte buffers padded with terminator
    /// bytes; short buffers with no terminator decode via a padded copy.
    fn decode_fixed_text(&mut self, bytes: &[u8], what: &str, index: usize) -> String {
        let mut padded = bytes.to_vec();
        padded.push(text::STRING_TERMINATOR);
        match text::decode_string(self.charset, &padded, 0) {
            Ok(decoded) => decoded.text,
            Err(err) => {
                self.warn(format!("{what} {index} unreadable: {err}"));
                String::new()
            }
        }
    }
}

fn named(table: &NameTable, index: usize) -> String {
    table.get(index).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mako_formats::kernel::append_section;
    use mako_formats::text::STRING_TERMINATOR;

    fn tiny_layout() -> GameLayout {
        let mut layout = GameLayout::pc();
        layout.counts = TableCounts {
            commands: 2,
            attacks: 2,
            items: 1,
            weapons: 1,
            armors: 1,
            accessories: 1,
            materias: 1,
            key_items: 1,
            summon_names: 1,
            characters: 1,
            growth_curves: 1,
        };
        layout
    }

    fn text_section(charset: &Charset, entries: &[&str]) -> Vec<u8> {
        let table_len = entries.len() * 2;
        let mut bodies: Vec<Vec<u8>> = Vec::new();
        for entry in entries {
            let mut bytes = text::encode_string(charset, entry).unwrap();
            bytes.push(STRING_TERMINATOR);
            bodies.push(bytes);
        }
        let mut out = Vec::new();
        let mut offset = table_len;
        for body in &bodies {
            out.extend_from_slice(&(offset as u16).to_le_bytes());
            offset += body.len();
        }
        for body in &bodies {
            out.extend_from_slice(body);
        }
        out
    }

    fn build_blob(charset: &Charset, layout: &GameLayout) -> Vec<u8> {
        let counts = &layout.counts;
        let mut blob = Vec::new();
        let names = |prefix: &str, count: usize| -> Vec<String> {
            (0..count).map(|i| format!("{prefix}{i}")).collect()
        };

        let mut commands = vec![0u8; counts.commands * COMMAND_RECORD_SIZE];
        commands[1] = 0x01; // command 0 selectable
        append_section(&mut blob, SectionId::CommandData as u16, &commands).unwrap();

        let mut attacks = vec![0u8; counts.attacks * ATTACK_RECORD_SIZE];
        attacks[24] = 0x01; // attack 0 fire element
        append_section(&mut blob, SectionId::AttackData as u16, &attacks).unwrap();

        let mut save = Vec::new();
        save.resize(counts.characters * CHARACTER_RECORD_SIZE, 0);
        save[1] = 6; // level
        let name = text::encode_string(charset, "Cloud").unwrap();
        save[16..16 + name.len()].copy_from_slice(&name);
        for byte in save.iter_mut().skip(16 + name.len()).take(12 - name.len()) {
            *byte = STRING_TERMINATOR;
        }
        save.extend_from_slice(&[0, 1, 2, 0]);
        for _ in 0..SAVE_ITEM_SLOTS {
            save.extend_from_slice(&0xFFFFu16.to_le_bytes());
        }
        for _ in 0..SAVE_MATERIA_SLOTS {
            save.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        }
        save.extend_from_slice(&200u32.to_le_bytes());
        append_section(&mut blob, SectionId::InitialSaveState as u16, &save).unwrap();

        append_section(
            &mut blob,
            SectionId::GrowthData as u16,
            &vec![0u8; counts.growth_curves * GROWTH_CURVE_SIZE],
        )
        .unwrap();
        append_section(
            &mut blob,
            SectionId::ItemData as u16,
            &vec![0u8; counts.items * ITEM_RECORD_SIZE],
        )
        .unwrap();
        append_section(
            &mut blob,
            SectionId::WeaponData as u16,
            &vec![0u8; counts.weapons * WEAPON_RECORD_SIZE],
        )
        .unwrap();
        append_section(
            &mut blob,
            SectionId::ArmorData as u16,
            &vec![0u8; counts.armors * ARMOR_RECORD_SIZE],
        )
        .unwrap();
        append_section(
            &mut blob,
            SectionId::AccessoryData as u16,
            &vec![0u8; counts.accessories * ACCESSORY_RECORD_SIZE],
        )
        .unwrap();

        let mut materia = vec![0u8; counts.materias * MATERIA_RECORD_SIZE];
        materia[13] = 0x02; // magic kind
        materia[14] = 1; // grants attack 1
        append_section(&mut blob, SectionId::MateriaData as u16, &materia).unwrap();

        let text_pairs: &[(SectionId, &str, usize)] = &[
            (SectionId::CommandDescriptions, "cd", counts.commands),
            (SectionId::AttackDescriptions, "ad", counts.attacks),
            (SectionId::ItemDescriptions, "id", counts.items),
            (SectionId::WeaponDescriptions, "wd", counts.weapons),
            (SectionId::ArmorDescriptions, "rd", counts.armors),
            (SectionId::AccessoryDescriptions, "xd", counts.accessories),
            (SectionId::MateriaDescriptions, "md", counts.materias),
            (SectionId::KeyItemDescriptions, "kd", counts.key_items),
            (SectionId::CommandNames, "Cmd", counts.commands),
            (SectionId::AttackNames, "Atk", counts.attacks),
            (SectionId::ItemNames, "Itm", counts.items),
            (SectionId::WeaponNames, "Wpn", counts.weapons),
            (SectionId::ArmorNames, "Arm", counts.armors),
            (SectionId::AccessoryNames, "Acc", counts.accessories),
            (SectionId::MateriaNames, "Mat", counts.materias),
            (SectionId::KeyItemNames, "Key", counts.key_items),
            (SectionId::SummonNames, "Smn", counts.summon_names),
        ];
        for (id, prefix, count) in text_pairs {
            let entries = names(prefix, *count);
            let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
            append_section(&mut blob, *id as u16, &text_section(charset, &refs)).unwrap();
        }

        append_section(&mut blob, SectionId::BattleText as u16, &text_section(charset, &["Hit"]))
            .unwrap();
        blob
    }

    #[test]
    fn reads_every_table_with_names_attached() {
        let charset = Charset::international();
        let layout = tiny_layout();
        let blob = build_blob(&charset, &layout);
        let archive = KernelArchive::parse(&blob).unwrap();

        let data = RecordTableReader::new(&archive, &charset, &layout)
            .read_all()
            .unwrap();

        assert_eq!(data.commands.len(), 2);
        assert_eq!(data.commands[0].name, "Cmd0");
        assert_eq!(data.commands[0].description, "cd0");
        assert!(!data.commands[0].target.is_empty());

        assert_eq!(data.attacks.len(), 2);
        assert_eq!(data.attacks[0].name, "Atk0");
        assert_eq!(data.attacks[0].elements.len(), 1);

        assert_eq!(data.materias.len(), 1);
        assert_eq!(data.materias[0].attack_comment.as_deref(), Some("Atk1"));

        assert_eq!(data.characters.len(), 1);
        assert_eq!(data.characters[0].name, "Cloud");
        assert_eq!(data.characters[0].level, 6);
        assert_eq!(data.initial_save.gil, 200);
        assert_eq!(data.key_items[0].name, "Key0");
        assert_eq!(data.summon_names[0].name, "Smn0");
        assert!(data.warnings.is_empty());
    }

    #[test]
    fn truncated_record_table_skips_only_bad_records() {
        let charset = Charset::international();
        let mut layout = tiny_layout();
        let blob = build_blob(&charset, &layout);
        // Claim one more attack than the sections hold: the name table pads
        // and the record table skips exactly the missing record.
        layout.counts.attacks = 3;
        let archive = KernelArchive::parse(&blob).unwrap();
        let data = RecordTableReader::new(&archive, &charset, &layout)
            .read_all()
            .unwrap();
        assert_eq!(data.attacks.len(), 2);
        assert!(data
            .warnings
            .iter()
            .any(|warning| warning.contains("attack 2 skipped")));
    }
}
