use anyhow::{anyhow, bail, ensure, Result};

use crate::cursor::BinaryCursor;

/// Destination id a gateway carries when it is unused.
pub const GATEWAY_INACTIVE: u16 = 0x7FFF;

/// Every trigger section reserves exactly this many gateway slots.
pub const GATEWAY_COUNT: usize = 12;

/// Script entry-point slots per entity.
pub const ENTRY_POINTS: usize = 32;

const SECTION_COUNT: usize = 9;
const GATEWAY_TABLE_OFFSET: usize = 32;
const GATEWAY_SIZE: usize = 24;
const TRIANGLE_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSectionId {
    Script = 0,
    Camera = 1,
    ModelLoader = 2,
    Palette = 3,
    Walkmesh = 4,
    TileMap = 5,
    Encounter = 6,
    Triggers = 7,
    Background = 8,
}

/// A decompressed per-map field binary: a fixed table of nine section
/// offsets, each section carrying its own u32 length prefix.
#[derive(Debug)]
pub struct FieldFile<'a> {
    data: &'a [u8],
    offsets: Vec<u32>,
}

impl<'a> FieldFile<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut cursor = BinaryCursor::new(data);
        let blank = cursor.read_u16_le()?;
        ensure!(blank == 0, "field header starts with {blank:#06x}, expected zero");
        let section_count = cursor.read_u32_le()? as usize;
        ensure!(
            section_count == SECTION_COUNT,
            "field header declares {section_count} sections, expected {SECTION_COUNT}"
        );
        let mut offsets = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            offsets.push(cursor.read_u32_le()?);
        }
        Ok(FieldFile { data, offsets })
    }

    pub fn section(&self, id: FieldSectionId) -> Result<&'a [u8]> {
        let start = self.offsets[id as usize] as usize;
        let mut cursor = BinaryCursor::at(self.data, start)
            .map_err(|_| anyhow!("section {id:?} offset {start:#x} is outside the file"))?;
        let length = cursor.read_u32_le()? as usize;
        let body_start = cursor.offset();
        let body_end = body_start
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| anyhow!("section {id:?} length {length} runs past the file"))?;
        Ok(&self.data[body_start..body_end])
    }
}

#[derive(Debug, Clone)]
pub struct ScriptEntity {
    pub name: String,
    /// Byte offsets into the script section, one per slot; unused slots
    /// repeat the previous offset.
    pub entry_points: [u16; ENTRY_POINTS],
}

/// Header of the script section: entity roster, sound banks, the per-map
/// geometry zoom, and the location of the dialog text table.
#[derive(Debug, Clone)]
pub struct ScriptHeader {
    pub entity_count: u8,
    pub model_count: u8,
    pub text_table_offset: u16,
    pub scale_raw: u16,
    pub creator: String,
    pub name: String,
    pub sound_banks: Vec<u32>,
    pub entities: Vec<ScriptEntity>,
    /// First byte past the header tables, where bytecode begins.
    pub code_start: usize,
}

impl ScriptHeader {
    pub fn parse(section: &[u8]) -> Result<Self> {
        let mut cursor = BinaryCursor::new(section);
        let magic = cursor.read_u16_le()?;
        ensure!(magic == 0x0502, "script section magic {magic:#06x} unrecognized");
        let entity_count = cursor.read_u8()?;
        let model_count = cursor.read_u8()?;
        let text_table_offset = cursor.read_u16_le()?;
        let sound_bank_count = cursor.read_u16_le()?;
        let scale_raw = cursor.read_u16_le()?;
        cursor.skip(6)?;
        let creator = fixed_string(cursor.read_bytes(8)?);
        let name = fixed_string(cursor.read_bytes(8)?);

        let mut entity_names = Vec::with_capacity(entity_count as usize);
        for _ in 0..entity_count {
            entity_names.push(fixed_string(cursor.read_bytes(8)?));
        }

        let mut sound_banks = Vec::with_capacity(sound_bank_count as usize);
        for _ in 0..sound_bank_count {
            sound_banks.push(cursor.read_u32_le()?);
        }

        let mut entities = Vec::with_capacity(entity_count as usize);
        for name in entity_names {
            let mut entry_points = [0u16; ENTRY_POINTS];
            for slot in entry_points.iter_mut() {
                *slot = cursor.read_u16_le()?;
            }
            entities.push(ScriptEntity { name, entry_points });
        }

        Ok(ScriptHeader {
            entity_count,
            model_count,
            text_table_offset,
            scale_raw,
            creator,
            name,
            sound_banks,
            entities,
            code_start: cursor.offset(),
        })
    }

    /// Raw zoom as the projection divisor the converter wants. Zero means
    /// "unscaled" in the shipped data.
    pub fn scale_factor(&self) -> f32 {
        f32::from(self.scale_raw.max(1)) / 512.0
    }
}

/// Absolute section offsets of each dialog string, resolved through the
/// u16 count + u16 offset table at `text_table_offset`.
pub fn text_offsets(section: &[u8], text_table_offset: u16) -> Result<Vec<usize>> {
    let base = text_table_offset as usize;
    let mut cursor = BinaryCursor::at(section, base)
        .map_err(|_| anyhow!("text table offset {base:#x} is outside the script section"))?;
    let count = cursor.read_u16_le()? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        let relative = cursor.read_u16_le()? as usize;
        offsets.push(base + relative);
    }
    Ok(offsets)
}

/// A walkable trigger line on this map that teleports the player to a
/// coordinate on another map. The destination Z slot actually holds a
/// walkmesh triangle index on the target map.
#[derive(Debug, Clone, Copy)]
pub struct Gateway {
    pub exit_line: [[i16; 3]; 2],
    pub destination_x: i16,
    pub destination_y: i16,
    pub destination_triangle: u16,
    pub destination_field: u16,
    pub direction: u8,
}

impl Gateway {
    pub fn is_active(&self) -> bool {
        self.destination_field != GATEWAY_INACTIVE
    }
}

#[derive(Debug, Clone)]
pub struct TriggerSection {
    pub name: String,
    pub camera_height: i16,
    pub gateways: Vec<Gateway>,
}

pub fn parse_triggers(section: &[u8]) -> Result<TriggerSection> {
    let mut cursor = BinaryCursor::new(section);
    let name = fixed_string(cursor.read_bytes(9)?);
    let _control = cursor.read_u8()?;
    let camera_height = cursor.read_i16_le()?;
    cursor.skip(8)?; // camera range
    cursor.seek(GATEWAY_TABLE_OFFSET)?;

    ensure!(
        section.len() >= GATEWAY_TABLE_OFFSET + GATEWAY_COUNT * GATEWAY_SIZE,
        "trigger section too short for its gateway table"
    );

    let mut gateways = Vec::with_capacity(GATEWAY_COUNT);
    for _ in 0..GATEWAY_COUNT {
        let mut exit_line = [[0i16; 3]; 2];
        for vertex in exit_line.iter_mut() {
            for axis in vertex.iter_mut() {
                *axis = cursor.read_i16_le()?;
            }
        }
        let destination_x = cursor.read_i16_le()?;
        let destination_y = cursor.read_i16_le()?;
        let destination_triangle = cursor.read_u16_le()?;
        let destination_field = cursor.read_u16_le()?;
        let direction = cursor.read_u8()?;
        cursor.skip(3)?;
        gateways.push(Gateway {
            exit_line,
            destination_x,
            destination_y,
            destination_triangle,
            destination_field,
            direction,
        });
    }

    Ok(TriggerSection {
        name,
        camera_height,
        gateways,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct WalkmeshTriangle {
    /// Three vertices of (x, y, z, reserved).
    pub vertices: [[i16; 4]; 3],
}

impl WalkmeshTriangle {
    pub fn center_z(&self) -> f32 {
        let sum: i32 = self.vertices.iter().map(|v| i32::from(v[2])).sum();
        sum as f32 / 3.0
    }
}

#[derive(Debug, Clone)]
pub struct Walkmesh {
    pub triangles: Vec<WalkmeshTriangle>,
}

pub fn parse_walkmesh(section: &[u8]) -> Result<Walkmesh> {
    let mut cursor = BinaryCursor::new(section);
    let count = cursor.read_u32_le()? as usize;
    ensure!(
        section.len() >= 4 + count * TRIANGLE_SIZE,
        "walkmesh section declares {count} triangles but is too short"
    );
    let mut triangles = Vec::with_capacity(count);
    for _ in 0..count {
        let mut vertices = [[0i16; 4]; 3];
        for vertex in vertices.iter_mut() {
            for component in vertex.iter_mut() {
                *component = cursor.read_i16_le()?;
            }
        }
        triangles.push(WalkmeshTriangle { vertices });
    }
    Ok(Walkmesh { triangles })
}

/// One animated model placed on the map, with the animation set its field
/// scripts can request.
#[derive(Debug, Clone)]
pub struct FieldModel {
    pub file_name: String,
    pub animations: Vec<String>,
}

pub fn parse_model_loader(section: &[u8]) -> Result<Vec<FieldModel>> {
    let mut cursor = BinaryCursor::new(section);
    let blank = cursor.read_u16_le()?;
    ensure!(blank == 0, "model loader starts with {blank:#06x}, expected zero");
    let model_count = cursor.read_u16_le()? as usize;

    let mut models = Vec::with_capacity(model_count);
    for index in 0..model_count {
        let file_name = length_prefixed_string(&mut cursor)
            .map_err(|err| anyhow!("model {index}: {err}"))?;
        let animation_count = cursor.read_u16_le()? as usize;
        let mut animations = Vec::with_capacity(animation_count);
        for _ in 0..animation_count {
            animations.push(length_prefixed_string(&mut cursor)?);
        }
        models.push(FieldModel {
            file_name,
            animations,
        });
    }
    Ok(models)
}

fn length_prefixed_string(cursor: &mut BinaryCursor<'_>) -> Result<String> {
    let length = cursor.read_u16_le()? as usize;
    let bytes = cursor.read_bytes(length)?;
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => bail!("name at offset {} is not valid UTF-8", cursor.offset() - length),
    }
}

fn fixed_string(bytes: &[u8]) -> String {
    let nul = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..nul]).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_gateway(out: &mut Vec<u8>, destination_field: u16, triangle: u16) {
        for _ in 0..6 {
            out.extend_from_slice(&10i16.to_le_bytes());
        }
        out.extend_from_slice(&256i16.to_le_bytes());
        out.extend_from_slice(&(-512i16).to_le_bytes());
        out.extend_from_slice(&triangle.to_le_bytes());
        out.extend_from_slice(&destination_field.to_le_bytes());
        out.push(128);
        out.extend_from_slice(&[0, 0, 0]);
    }

    fn trigger_section(active: &[(u16, u16)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"gate\0\0\0\0\0");
        body.push(0);
        body.extend_from_slice(&0i16.to_le_bytes());
        body.extend_from_slice(&[0u8; 8]);
        while body.len() < GATEWAY_TABLE_OFFSET {
            body.push(0);
        }
        for (field, triangle) in active {
            push_gateway(&mut body, *field, *triangle);
        }
        for _ in active.len()..GATEWAY_COUNT {
            push_gateway(&mut body, GATEWAY_INACTIVE, 0);
        }
        body
    }

    #[test]
    fn parses_gateway_table() {
        let body = trigger_section(&[(3, 1), (7, 0)]);
        let triggers = parse_triggers(&body).unwrap();
        assert_eq!(triggers.name, "gate");
        assert_eq!(triggers.gateways.len(), GATEWAY_COUNT);

        let active: Vec<_> = triggers.gateways.iter().filter(|g| g.is_active()).collect();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].destination_field, 3);
        assert_eq!(active[0].destination_triangle, 1);
        assert_eq!(active[0].destination_x, 256);
        assert_eq!(active[0].destination_y, -512);
        assert_eq!(active[0].direction, 128);
    }

    #[test]
    fn short_trigger_section_is_rejected() {
        let mut body = trigger_section(&[]);
        body.truncate(GATEWAY_TABLE_OFFSET + 10);
        assert!(parse_triggers(&body).is_err());
    }

    #[test]
    fn walkmesh_center_z_averages_vertices() {
        let mut body = Vec::new();
        body.extend_from_slice(&1u32.to_le_bytes());
        for z in [30i16, 60, 90] {
            body.extend_from_slice(&1i16.to_le_bytes());
            body.extend_from_slice(&2i16.to_le_bytes());
            body.extend_from_slice(&z.to_le_bytes());
            body.extend_from_slice(&0i16.to_le_bytes());
        }
        let mesh = parse_walkmesh(&body).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert!((mesh.triangles[0].center_z() - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn model_loader_reads_animation_lists() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&5u16.to_le_bytes());
        body.extend_from_slice(b"cloud");
        body.extend_from_slice(&2u16.to_le_bytes());
        for name in ["idle", "run"] {
            body.extend_from_slice(&(name.len() as u16).to_le_bytes());
            body.extend_from_slice(name.as_bytes());
        }
        let models = parse_model_loader(&body).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].file_name, "cloud");
        assert_eq!(models[0].animations, vec!["idle", "run"]);
    }

    #[test]
    fn script_header_exposes_scale_and_entities() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0502u16.to_le_bytes());
        body.push(1); // entities
        body.push(1); // models
        let text_table_pos = 0x70u16;
        body.extend_from_slice(&text_table_pos.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes()); // sound banks
        body.extend_from_slice(&1024u16.to_le_bytes()); // scale
        body.extend_from_slice(&[0u8; 6]);
        body.extend_from_slice(b"makotool");
        body.extend_from_slice(b"demo\0\0\0\0");
        body.extend_from_slice(b"door\0\0\0\0");
        body.extend_from_slice(&0xAA00u32.to_le_bytes());
        let code_start = body.len() + ENTRY_POINTS * 2;
        for _ in 0..ENTRY_POINTS {
            body.extend_from_slice(&(code_start as u16).to_le_bytes());
        }
        while body.len() < text_table_pos as usize {
            body.push(0);
        }
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&4u16.to_le_bytes());
        body.push(0xFF);

        let header = ScriptHeader::parse(&body).unwrap();
        assert_eq!(header.name, "demo");
        assert_eq!(header.entities.len(), 1);
        assert_eq!(header.entities[0].name, "door");
        assert_eq!(header.entities[0].entry_points[0] as usize, code_start);
        assert!((header.scale_factor() - 2.0).abs() < f32::EPSILON);
        assert_eq!(header.code_start, code_start);

        let offsets = text_offsets(&body, header.text_table_offset).unwrap();
        assert_eq!(offsets, vec![text_table_pos as usize + 4]);
    }

    #[test]
    fn field_file_slices_sections() {
        // Two-section body is not valid; build all nine with tiny payloads.
        let payloads: Vec<Vec<u8>> = (0..9u8).map(|n| vec![n; (n as usize) + 1]).collect();
        let header_len = 2 + 4 + 9 * 4;
        let mut offsets = Vec::new();
        let mut cursor = header_len;
        for payload in &payloads {
            offsets.push(cursor as u32);
            cursor += 4 + payload.len();
        }
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&9u32.to_le_bytes());
        for offset in &offsets {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        for payload in &payloads {
            data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            data.extend_from_slice(payload);
        }

        let field = FieldFile::parse(&data).unwrap();
        assert_eq!(field.section(FieldSectionId::Script).unwrap(), &[0u8; 1][..]);
        assert_eq!(
            field.section(FieldSectionId::Walkmesh).unwrap(),
            &[4u8; 5][..]
        );
        assert_eq!(
            field.section(FieldSectionId::Background).unwrap(),
            &[8u8; 9][..]
        );
    }
}
