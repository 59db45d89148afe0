use std::io::{Cursor, Read, Write};

use anyhow::{bail, ensure, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Named sections of the monolithic game-data blob. Ids are fixed for a
/// given game version; the blob itself is not self-describing beyond them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SectionId {
    CommandData = 1,
    AttackData = 2,
    InitialSaveState = 3,
    GrowthData = 4,
    ItemData = 5,
    WeaponData = 6,
    ArmorData = 7,
    AccessoryData = 8,
    MateriaData = 9,
    CommandDescriptions = 10,
    AttackDescriptions = 11,
    ItemDescriptions = 12,
    WeaponDescriptions = 13,
    ArmorDescriptions = 14,
    AccessoryDescriptions = 15,
    MateriaDescriptions = 16,
    KeyItemDescriptions = 17,
    CommandNames = 18,
    AttackNames = 19,
    ItemNames = 20,
    WeaponNames = 21,
    ArmorNames = 22,
    AccessoryNames = 23,
    MateriaNames = 24,
    KeyItemNames = 25,
    BattleText = 26,
    SummonNames = 27,
}

/// One independently compressed section: 6-byte header (compressed size,
/// decompressed size, section id) followed by a gzip stream.
#[derive(Debug, Clone)]
pub struct KernelSection {
    pub id: u16,
    pub raw_size: u16,
    compressed: Vec<u8>,
}

impl KernelSection {
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(self.compressed.as_slice());
        let mut out = Vec::with_capacity(self.raw_size as usize);
        decoder
            .read_to_end(&mut out)
            .with_context(|| format!("decompressing kernel section {}", self.id))?;
        Ok(out)
    }
}

#[derive(Debug)]
pub struct KernelArchive {
    sections: Vec<KernelSection>,
}

impl KernelArchive {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(raw);
        let mut sections = Vec::new();

        while (reader.position() as usize) < raw.len() {
            ensure!(
                raw.len() - reader.position() as usize >= 6,
                "kernel blob truncated inside a section header"
            );
            let compressed_size = reader.read_u16::<LittleEndian>()? as usize;
            let raw_size = reader.read_u16::<LittleEndian>()?;
            let id = reader.read_u16::<LittleEndian>()?;

            let start = reader.position() as usize;
            let end = start
                .checked_add(compressed_size)
                .filter(|end| *end <= raw.len())
                .ok_or_else(|| {
                    anyhow::anyhow!("kernel section {id} data extends beyond the blob")
                })?;

            sections.push(KernelSection {
                id,
                raw_size,
                compressed: raw[start..end].to_vec(),
            });
            reader.set_position(end as u64);
        }

        Ok(KernelArchive { sections })
    }

    pub fn sections(&self) -> &[KernelSection] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Result<&KernelSection> {
        let wanted = id as u16;
        match self.sections.iter().find(|section| section.id == wanted) {
            Some(section) => Ok(section),
            None => bail!("kernel blob has no section {wanted}"),
        }
    }
}

/// Append one compressed section to a blob under construction. Fixture and
/// tooling support; the installer only reads the blob.
pub fn append_section(out: &mut Vec<u8>, id: u16, raw: &[u8]) -> Result<()> {
    let raw_size = u16::try_from(raw.len())
        .with_context(|| format!("section {id} exceeds the 64 KiB decompressed limit"))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    let compressed = encoder.finish()?;
    let compressed_size = u16::try_from(compressed.len())
        .with_context(|| format!("section {id} exceeds the 64 KiB compressed limit"))?;

    out.extend_from_slice(&compressed_size.to_le_bytes());
    out.extend_from_slice(&raw_size.to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_in_order() {
        let mut blob = Vec::new();
        append_section(&mut blob, SectionId::CommandData as u16, &[1, 2, 3, 4]).unwrap();
        append_section(&mut blob, SectionId::CommandNames as u16, b"names").unwrap();

        let archive = KernelArchive::parse(&blob).unwrap();
        assert_eq!(archive.sections().len(), 2);

        let commands = archive.section(SectionId::CommandData).unwrap();
        assert_eq!(commands.raw_size, 4);
        assert_eq!(commands.decompress().unwrap(), vec![1, 2, 3, 4]);

        let names = archive.section(SectionId::CommandNames).unwrap();
        assert_eq!(names.decompress().unwrap(), b"names");
    }

    #[test]
    fn missing_section_is_an_error() {
        let mut blob = Vec::new();
        append_section(&mut blob, SectionId::CommandData as u16, &[0]).unwrap();
        let archive = KernelArchive::parse(&blob).unwrap();
        assert!(archive.section(SectionId::MateriaData).is_err());
    }

    #[test]
    fn truncated_section_is_an_error() {
        let mut blob = Vec::new();
        append_section(&mut blob, SectionId::CommandData as u16, &[9; 32]).unwrap();
        blob.truncate(blob.len() - 4);
        assert!(KernelArchive::parse(&blob).is_err());
    }
}
