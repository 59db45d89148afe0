use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, ensure, Context, Result};
use memmap2::{Mmap, MmapOptions};

const CREATOR_LEN: usize = 12;
const TOC_START: usize = 16;
// 20-byte filename + u32 offset + 1 unused byte + u16 conflict counter.
const TOC_ENTRY_SIZE: usize = 27;
const ENTRY_HEADER_SIZE: usize = 24;

#[derive(Debug, Clone)]
pub struct LgpEntry {
    pub name: String,
    pub offset: u32,
}

/// Memory-mapped reader for the packed LGP archives the legacy game ships
/// its grouped assets in.
#[derive(Debug)]
pub struct LgpArchive {
    path: PathBuf,
    mmap: Mmap,
    entries: Vec<LgpEntry>,
}

impl LgpArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening LGP archive at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping LGP archive {}", path_buf.display()))?;

        let entries = parse_toc(&mmap)
            .with_context(|| format!("parsing LGP archive {}", path_buf.display()))?;

        Ok(LgpArchive {
            path: path_buf,
            mmap,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[LgpEntry] {
        &self.entries
    }

    pub fn find_entry(&self, name: &str) -> Option<&LgpEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Slice out an entry's body. Each entry repeats its name and carries a
    /// u32 length just before the data, which is what we trust here; the TOC
    /// offset only locates the header.
    pub fn entry_bytes(&self, entry: &LgpEntry) -> Result<&[u8]> {
        let header_start = entry.offset as usize;
        let body_start = header_start
            .checked_add(ENTRY_HEADER_SIZE)
            .ok_or_else(|| anyhow!("entry '{}' offset overflow", entry.name))?;
        ensure!(
            body_start <= self.mmap.len(),
            "entry '{}' header extends beyond archive",
            entry.name
        );
        let length_bytes = &self.mmap[header_start + 20..body_start];
        let length = u32::from_le_bytes(length_bytes.try_into().unwrap()) as usize;
        let body_end = body_start
            .checked_add(length)
            .ok_or_else(|| anyhow!("entry '{}' length overflow", entry.name))?;
        ensure!(
            body_end <= self.mmap.len(),
            "entry '{}' data extends beyond archive",
            entry.name
        );
        Ok(&self.mmap[body_start..body_end])
    }

    pub fn extract_entry<P: AsRef<Path>>(&self, entry: &LgpEntry, dest: P) -> Result<()> {
        let bytes = self.entry_bytes(entry)?;
        let mut file = File::create(dest.as_ref())
            .with_context(|| format!("creating {}", dest.as_ref().display()))?;
        file.write_all(bytes)
            .with_context(|| format!("writing {}", dest.as_ref().display()))?;
        Ok(())
    }
}

fn parse_toc(raw: &[u8]) -> Result<Vec<LgpEntry>> {
    ensure!(
        raw.len() >= TOC_START,
        "LGP archive too small to contain a header"
    );

    let file_count = u32::from_le_bytes(raw[12..16].try_into().unwrap()) as usize;
    let toc_len = file_count
        .checked_mul(TOC_ENTRY_SIZE)
        .ok_or_else(|| anyhow!("LGP entry count overflow"))?;
    ensure!(
        TOC_START + toc_len <= raw.len(),
        "LGP table of contents extends beyond end of archive"
    );

    let mut entries = Vec::with_capacity(file_count);
    for index in 0..file_count {
        let base = TOC_START + index * TOC_ENTRY_SIZE;
        let name_bytes = &raw[base..base + 20];
        let offset = u32::from_le_bytes(raw[base + 20..base + 24].try_into().unwrap());

        let nul = name_bytes
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..nul])
            .trim_end()
            .to_string();
        if name.is_empty() {
            bail!("LGP entry {index} has an empty name");
        }

        entries.push(LgpEntry { name, offset });
    }

    Ok(entries)
}

/// Assemble an archive from named payloads. Fixture and tooling support;
/// the installer itself only reads.
pub fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"MAKO-REPACK\0");
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    let data_start = TOC_START + entries.len() * TOC_ENTRY_SIZE;
    let mut offsets = Vec::with_capacity(entries.len());
    let mut cursor = data_start;
    for (_, body) in entries {
        offsets.push(cursor as u32);
        cursor += ENTRY_HEADER_SIZE + body.len();
    }

    for ((name, _), offset) in entries.iter().zip(&offsets) {
        let mut name_bytes = [0u8; 20];
        let copied = name.len().min(20);
        name_bytes[..copied].copy_from_slice(&name.as_bytes()[..copied]);
        out.extend_from_slice(&name_bytes);
        out.extend_from_slice(&offset.to_le_bytes());
        out.push(0);
        out.extend_from_slice(&1u16.to_le_bytes());
    }

    for ((name, body), _) in entries.iter().zip(&offsets) {
        let mut name_bytes = [0u8; 20];
        let copied = name.len().min(20);
        name_bytes[..copied].copy_from_slice(&name.as_bytes()[..copied]);
        out.extend_from_slice(&name_bytes);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn round_trips_a_built_archive() {
        let data = build_archive(&[("md1stin", b"field-one"), ("nrthmk", b"field-two")]);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        let archive = LgpArchive::open(file.path()).unwrap();
        assert_eq!(archive.entries().len(), 2);
        assert_eq!(archive.entries()[0].name, "md1stin");

        let entry = archive.find_entry("NRTHMK").expect("case-insensitive find");
        assert_eq!(archive.entry_bytes(entry).unwrap(), b"field-two");
    }

    #[test]
    fn rejects_truncated_toc() {
        let mut data = build_archive(&[("md1stin", b"x")]);
        data.truncate(TOC_START + 5);
        assert!(parse_toc(&data).is_err());
    }

    #[test]
    fn rejects_entry_data_past_end() {
        let mut data = build_archive(&[("md1stin", b"payload")]);
        let len = data.len();
        data.truncate(len - 3);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        let archive = LgpArchive::open(file.path()).unwrap();
        let entry = &archive.entries()[0];
        assert!(archive.entry_bytes(entry).is_err());
    }
}
