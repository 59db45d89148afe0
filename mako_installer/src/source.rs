use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mako_formats::LgpArchive;
use walkdir::WalkDir;

/// The asset groups the pipeline pulls from, wherever they physically live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryGroup {
    Fields,
    Kernel,
    Sounds,
    Music,
}

impl EntryGroup {
    fn dir_name(self) -> &'static str {
        match self {
            EntryGroup::Fields => "fields",
            EntryGroup::Kernel => "kernel",
            EntryGroup::Sounds => "sounds",
            EntryGroup::Music => "music",
        }
    }
}

/// Named-blob provider over the legacy install media. The pipeline never
/// cares whether bytes come out of a packed archive or loose files.
pub trait ArchiveSource {
    fn list_entries(&self, group: EntryGroup) -> Result<Vec<String>>;
    fn open(&self, group: EntryGroup, name: &str) -> Result<Vec<u8>>;
}

/// Retail layout: field maps packed in `flevel.lgp`, the game-data blob as
/// `KERNEL.BIN`, sounds and music in their own optional archives.
pub struct LgpSource {
    fields: LgpArchive,
    kernel_path: PathBuf,
    sounds: Option<LgpArchive>,
    music: Option<LgpArchive>,
}

impl LgpSource {
    pub fn open(root: &Path) -> Result<Self> {
        let fields = LgpArchive::open(root.join("flevel.lgp"))
            .context("field archive flevel.lgp is required")?;
        let kernel_path = root.join("KERNEL.BIN");
        if !kernel_path.is_file() {
            bail!("{} not found", kernel_path.display());
        }
        let sounds = Self::open_optional(root.join("sounds.lgp"));
        let music = Self::open_optional(root.join("music.lgp"));
        Ok(LgpSource {
            fields,
            kernel_path,
            sounds,
            music,
        })
    }

    fn open_optional(path: PathBuf) -> Option<LgpArchive> {
        if !path.is_file() {
            return None;
        }
        match LgpArchive::open(&path) {
            Ok(archive) => Some(archive),
            Err(err) => {
                eprintln!(
                    "[mako_installer] warning: ignoring unreadable archive {}: {err:?}",
                    path.display()
                );
                None
            }
        }
    }

    fn archive_for(&self, group: EntryGroup) -> Option<&LgpArchive> {
        match group {
            EntryGroup::Fields => Some(&self.fields),
            EntryGroup::Sounds => self.sounds.as_ref(),
            EntryGroup::Music => self.music.as_ref(),
            EntryGroup::Kernel => None,
        }
    }
}

impl ArchiveSource for LgpSource {
    fn list_entries(&self, group: EntryGroup) -> Result<Vec<String>> {
        if group == EntryGroup::Kernel {
            return Ok(vec!["KERNEL.BIN".to_string()]);
        }
        Ok(self
            .archive_for(group)
            .map(|archive| {
                archive
                    .entries()
                    .iter()
                    .map(|entry| entry.name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn open(&self, group: EntryGroup, name: &str) -> Result<Vec<u8>> {
        if group == EntryGroup::Kernel {
            return fs::read(&self.kernel_path)
                .with_context(|| format!("reading {}", self.kernel_path.display()));
        }
        let archive = self
            .archive_for(group)
            .with_context(|| format!("no archive mounted for {group:?}"))?;
        let entry = archive
            .find_entry(name)
            .with_context(|| format!("{name} not present in {group:?} archive"))?;
        Ok(archive.entry_bytes(entry)?.to_vec())
    }
}

/// Loose-file layout: one subdirectory per group. Used for pre-extracted
/// installs and fixtures.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }
        Ok(DirSource {
            root: root.to_path_buf(),
        })
    }

    fn group_dir(&self, group: EntryGroup) -> PathBuf {
        self.root.join(group.dir_name())
    }
}

impl ArchiveSource for DirSource {
    fn list_entries(&self, group: EntryGroup) -> Result<Vec<String>> {
        let dir = self.group_dir(group);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    fn open(&self, group: EntryGroup, name: &str) -> Result<Vec<u8>> {
        let path = self.group_dir(group).join(name);
        fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mako_formats::lgp::build_archive;
    use std::io::Write;

    #[test]
    fn dir_source_lists_sorted_entries_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let fields = dir.path().join("fields");
        fs::create_dir_all(&fields).unwrap();
        fs::write(fields.join("nrthmk"), b"two").unwrap();
        fs::write(fields.join("md1stin"), b"one").unwrap();

        let source = DirSource::new(dir.path()).unwrap();
        assert_eq!(
            source.list_entries(EntryGroup::Fields).unwrap(),
            vec!["md1stin", "nrthmk"]
        );
        assert_eq!(source.open(EntryGroup::Fields, "md1stin").unwrap(), b"one");
        assert!(source.list_entries(EntryGroup::Sounds).unwrap().is_empty());
    }

    #[test]
    fn lgp_source_reads_fields_and_kernel() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(&[("md1stin", b"payload")]);
        let mut file = fs::File::create(dir.path().join("flevel.lgp")).unwrap();
        file.write_all(&archive).unwrap();
        fs::write(dir.path().join("KERNEL.BIN"), b"blob").unwrap();

        let source = LgpSource::open(dir.path()).unwrap();
        assert_eq!(
            source.list_entries(EntryGroup::Fields).unwrap(),
            vec!["md1stin"]
        );
        assert_eq!(
            source.open(EntryGroup::Fields, "md1stin").unwrap(),
            b"payload"
        );
        assert_eq!(source.open(EntryGroup::Kernel, "KERNEL.BIN").unwrap(), b"blob");
        assert!(source.list_entries(EntryGroup::Music).unwrap().is_empty());
    }

    #[test]
    fn lgp_source_requires_the_field_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("KERNEL.BIN"), b"blob").unwrap();
        assert!(LgpSource::open(dir.path()).is_err());
    }
}
