use std::collections::BTreeSet;

use anyhow::Result;
use mako_data::names;
use mako_formats::cursor::BinaryCursor;
use mako_formats::field::{ScriptEntity, ScriptHeader};

/// A script-issued teleport to another map, extracted during pass 1.
#[derive(Debug, Clone, PartialEq)]
pub struct MapJumpEvent {
    pub entity: String,
    pub function: String,
    pub address: usize,
    pub target_field: u16,
    pub x: i16,
    pub y: i16,
    pub triangle: u16,
    pub direction: u8,
}

/// What a full decompile hands back: the source listing plus the structured
/// data the converter consumes directly.
#[derive(Debug, Clone, Default)]
pub struct DecompiledScript {
    pub source: String,
    /// Dialog ids referenced by message opcodes, in first-use order.
    pub text_ids: Vec<u8>,
    pub entities: Vec<String>,
}

/// Turns raw identifiers into human-readable names, falling back to the
/// identifier itself when the static tables have no entry.
pub trait AssetNamer {
    fn variable_name(&self, bank: u8, address: u8) -> String;
    fn function_name(&self, entity: &str, slot: usize) -> String;
    fn animation_name(&self, model: &str, index: u8) -> String;
}

#[derive(Debug, Default)]
pub struct FriendlyNamer;

impl AssetNamer for FriendlyNamer {
    fn variable_name(&self, bank: u8, address: u8) -> String {
        match names::savemap_variable_name(bank, address) {
            Some(name) => name.to_string(),
            None => format!("var_{bank}_{address}"),
        }
    }

    fn function_name(&self, _entity: &str, slot: usize) -> String {
        match names::script_slot_name(slot) {
            Some(name) => name.to_string(),
            None => format!("script_{slot}"),
        }
    }

    fn animation_name(&self, model: &str, index: u8) -> String {
        match names::animation_label(index) {
            Some(name) => name.to_string(),
            None => format!("{model}_anim_{index}"),
        }
    }
}

/// Collaborator seam around the bytecode decompiler. The installer drives
/// it two ways: a full decompile during map conversion, and an
/// output-suppressed scan during pass 1 that only extracts map jumps.
pub trait ScriptDecompiler {
    fn decompile(
        &self,
        field: &str,
        script_section: &[u8],
        namer: &dyn AssetNamer,
        prelude: &str,
        epilogue: &str,
    ) -> Result<DecompiledScript>;

    fn scan_map_jumps(&self, field: &str, script_section: &[u8]) -> Result<Vec<MapJumpEvent>>;
}

pub const OP_RET: u8 = 0x00;
pub const OP_REQ: u8 = 0x01;
pub const OP_JMPF: u8 = 0x10;
pub const OP_JMPB: u8 = 0x11;
pub const OP_IFUB: u8 = 0x14;
pub const OP_WAIT: u8 = 0x24;
pub const OP_MESSAGE: u8 = 0x40;
pub const OP_STITM: u8 = 0x58;
pub const OP_NOP: u8 = 0x5F;
pub const OP_MAPJUMP: u8 = 0x60;
pub const OP_SETBYTE: u8 = 0x80;
pub const OP_BITON: u8 = 0x82;
pub const OP_DFANM: u8 = 0xA2;
pub const OP_XYZI: u8 = 0xA5;
pub const OP_MUSIC: u8 = 0xE5;

/// Fixed operand sizes, opcode byte included. Scripts are walked opcode by
/// opcode, so an unknown byte ends the walk for that entry point rather
/// than derailing the cursor.
fn opcode_length(opcode: u8) -> Option<usize> {
    match opcode {
        OP_RET | OP_NOP => Some(1),
        OP_JMPF | OP_JMPB | OP_MUSIC => Some(2),
        OP_REQ | OP_WAIT | OP_MESSAGE | OP_DFANM => Some(3),
        OP_SETBYTE | OP_BITON => Some(4),
        OP_STITM => Some(5),
        OP_IFUB => Some(6),
        OP_MAPJUMP => Some(10),
        OP_XYZI => Some(11),
        _ => None,
    }
}

fn opcode_name(opcode: u8) -> &'static str {
    match opcode {
        OP_RET => "ret",
        OP_REQ => "req",
        OP_JMPF => "jmpf",
        OP_JMPB => "jmpb",
        OP_IFUB => "ifub",
        OP_WAIT => "wait",
        OP_MESSAGE => "message",
        OP_STITM => "give_item",
        OP_NOP => "nop",
        OP_MAPJUMP => "map_jump",
        OP_SETBYTE => "set_byte",
        OP_BITON => "bit_on",
        OP_DFANM => "play_animation",
        OP_XYZI => "place",
        OP_MUSIC => "music",
        _ => "unknown",
    }
}

/// Default decompiler: a table-driven opcode walker. It emits a plain
/// listing rather than reconstructed source, which is all the conversion
/// pipeline needs from this seam.
#[derive(Debug, Default)]
pub struct OpcodeDecompiler;

struct WalkedOp {
    address: usize,
    opcode: u8,
    operands: Vec<u8>,
}

impl OpcodeDecompiler {
    /// Distinct entry points of one entity; unused slots repeat earlier
    /// offsets and are folded away.
    fn entry_points(entity: &ScriptEntity, code_start: usize) -> Vec<(usize, usize)> {
        let mut seen = BTreeSet::new();
        let mut points = Vec::new();
        for (slot, offset) in entity.entry_points.iter().enumerate() {
            let offset = *offset as usize;
            if offset < code_start {
                continue;
            }
            if seen.insert(offset) {
                points.push((slot, offset));
            }
        }
        points
    }

    fn walk(section: &[u8], start: usize) -> Vec<WalkedOp> {
        let mut ops = Vec::new();
        let mut pos = start;
        while pos < section.len() {
            let opcode = section[pos];
            let Some(length) = opcode_length(opcode) else {
                break;
            };
            if pos + length > section.len() {
                break;
            }
            ops.push(WalkedOp {
                address: pos,
                opcode,
                operands: section[pos + 1..pos + length].to_vec(),
            });
            if opcode == OP_RET {
                break;
            }
            pos += length;
        }
        ops
    }
}

impl ScriptDecompiler for OpcodeDecompiler {
    fn decompile(
        &self,
        field: &str,
        script_section: &[u8],
        namer: &dyn AssetNamer,
        prelude: &str,
        epilogue: &str,
    ) -> Result<DecompiledScript> {
        let header = ScriptHeader::parse(script_section)?;
        let mut source = String::new();
        let mut text_ids = Vec::new();
        let mut entities = Vec::new();

        source.push_str(prelude);
        source.push_str(&format!("-- field: {field}\n"));

        for entity in &header.entities {
            entities.push(entity.name.clone());
            for (slot, offset) in Self::entry_points(entity, header.code_start) {
                let function = namer.function_name(&entity.name, slot);
                source.push_str(&format!(
                    "\nfunction {}_{}() -- 0x{offset:04X}\n",
                    entity.name, function
                ));
                for op in Self::walk(script_section, offset) {
                    match op.opcode {
                        OP_MESSAGE => {
                            let id = op.operands[1];
                            if !text_ids.contains(&id) {
                                text_ids.push(id);
                            }
                            source.push_str(&format!("    message(dialog_{id})\n"));
                        }
                        OP_SETBYTE | OP_BITON => {
                            let bank = op.operands[0] >> 4;
                            let address = op.operands[1];
                            source.push_str(&format!(
                                "    {}({}, {})\n",
                                opcode_name(op.opcode),
                                namer.variable_name(bank, address),
                                op.operands[2]
                            ));
                        }
                        OP_DFANM => {
                            source.push_str(&format!(
                                "    play_animation(\"{}\")\n",
                                namer.animation_name(&entity.name, op.operands[0])
                            ));
                        }
                        OP_MAPJUMP => {
                            let mut cursor = BinaryCursor::new(&op.operands);
                            let target = cursor.read_u16_le()?;
                            source.push_str(&format!("    map_jump({target})\n"));
                        }
                        _ => {
                            let operands: Vec<String> =
                                op.operands.iter().map(|b| b.to_string()).collect();
                            source.push_str(&format!(
                                "    {}({})\n",
                                opcode_name(op.opcode),
                                operands.join(", ")
                            ));
                        }
                    }
                }
                source.push_str("end\n");
            }
        }

        source.push_str(epilogue);
        Ok(DecompiledScript {
            source,
            text_ids,
            entities,
        })
    }

    fn scan_map_jumps(&self, _field: &str, script_section: &[u8]) -> Result<Vec<MapJumpEvent>> {
        let header = ScriptHeader::parse(script_section)?;
        let mut events = Vec::new();
        let mut seen_addresses = BTreeSet::new();
        let namer = FriendlyNamer;

        for entity in &header.entities {
            for (slot, offset) in Self::entry_points(entity, header.code_start) {
                for op in Self::walk(script_section, offset) {
                    if op.opcode != OP_MAPJUMP {
                        continue;
                    }
                    if !seen_addresses.insert(op.address) {
                        continue;
                    }
                    let mut cursor = BinaryCursor::new(&op.operands);
                    let target_field = cursor.read_u16_le()?;
                    let x = cursor.read_i16_le()?;
                    let y = cursor.read_i16_le()?;
                    let triangle = cursor.read_u16_le()?;
                    let direction = cursor.read_u8()?;
                    events.push(MapJumpEvent {
                        entity: entity.name.clone(),
                        function: namer.function_name(&entity.name, slot),
                        address: op.address,
                        target_field,
                        x,
                        y,
                        triangle,
                        direction,
                    });
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use mako_formats::field::ENTRY_POINTS;

    /// Assemble a minimal script section: one entity, slot 0 pointing at
    /// `code`, remaining slots parked on a shared `ret`.
    pub fn section_with_code(entity: &str, scale_raw: u16, code: &[u8]) -> Vec<u8> {
        let header_len = 32 + 8 + ENTRY_POINTS * 2;
        let code_start = header_len;
        let ret_at = code_start + code.len();
        let text_table = ret_at + 1;

        let mut body = Vec::new();
        body.extend_from_slice(&0x0502u16.to_le_bytes());
        body.push(1); // entities
        body.push(0); // models
        body.extend_from_slice(&(text_table as u16).to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes()); // sound banks
        body.extend_from_slice(&scale_raw.to_le_bytes());
        body.extend_from_slice(&[0u8; 6]);
        body.extend_from_slice(b"makotool");
        body.extend_from_slice(b"test\0\0\0\0");
        let mut name = [0u8; 8];
        let copied = entity.len().min(8);
        name[..copied].copy_from_slice(&entity.as_bytes()[..copied]);
        body.extend_from_slice(&name);
        body.extend_from_slice(&(code_start as u16).to_le_bytes());
        for _ in 1..ENTRY_POINTS {
            body.extend_from_slice(&(ret_at as u16).to_le_bytes());
        }
        assert_eq!(body.len(), code_start);
        body.extend_from_slice(code);
        body.push(OP_RET);
        // Empty dialog table.
        body.extend_from_slice(&0u16.to_le_bytes());
        body
    }
}
