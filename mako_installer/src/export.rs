use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Opaque mesh/texture conversion seam. The pipeline decides *what* to
/// export and where it lands; how bytes become engine assets is this
/// collaborator's business.
pub trait AssetExporter {
    fn export_background(&mut self, field: &str, data: &[u8], dest: &Path) -> Result<()>;
    fn export_model(&mut self, model: &str, animations: &[String], dest: &Path) -> Result<()>;
}

/// Pass-through exporter: backgrounds are copied verbatim and models get a
/// stub, so the rest of the pipeline is exercisable without the real
/// converter mounted.
#[derive(Debug, Default)]
pub struct PassthroughExporter;

impl AssetExporter for PassthroughExporter {
    fn export_background(&mut self, _field: &str, data: &[u8], dest: &Path) -> Result<()> {
        fs::write(dest, data).with_context(|| format!("writing {}", dest.display()))
    }

    fn export_model(&mut self, model: &str, animations: &[String], dest: &Path) -> Result<()> {
        let mut stub = format!("model {model}\n");
        for animation in animations {
            stub.push_str(&format!("animation {animation}\n"));
        }
        fs::write(dest, stub).with_context(|| format!("writing {}", dest.display()))
    }
}
