use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Machine-readable summary of one conversion run, written next to the
/// converted assets so downstream tooling can audit what happened.
#[derive(Debug, Default, Serialize)]
pub struct ConversionReport {
    pub maps_converted: Vec<String>,
    pub maps_skipped: Vec<SkippedMap>,
    pub kernel_records: BTreeMap<String, usize>,
    pub spawn_points: usize,
    pub models_exported: usize,
    pub sounds_extracted: usize,
    pub music_extracted: usize,
    pub warnings: usize,
}

#[derive(Debug, Serialize)]
pub struct SkippedMap {
    pub name: String,
    pub reason: String,
}

impl ConversionReport {
    pub fn converted(&mut self, name: &str) {
        self.maps_converted.push(name.to_string());
    }

    pub fn skipped(&mut self, name: &str, reason: impl Into<String>) {
        self.maps_skipped.push(SkippedMap {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn record_table(&mut self, table: &str, count: usize) {
        self.kernel_records.insert(table.to_string(), count);
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("serializing report to {}", path.display()))
    }
}
