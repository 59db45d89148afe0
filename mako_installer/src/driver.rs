use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use mako_data::{GameLayout, KernelData, RecordTableReader};
use mako_formats::field::{self, FieldFile, FieldSectionId, ScriptHeader};
use mako_formats::kernel::KernelArchive;
use mako_formats::lzs;
use mako_formats::text::{self, Charset};
use mako_formats::BinaryCursor;

use crate::error::InstallError;
use crate::export::AssetExporter;
use crate::output::{self, MapIndexEntry, MapMarkup, TriggerRef};
use crate::progress::{ProgressEstimator, StepCursor};
use crate::report::ConversionReport;
use crate::script::{AssetNamer, ScriptDecompiler};
use crate::source::{ArchiveSource, EntryGroup};
use crate::spawn::{
    resolve_arrivals, ModelAnimationCollector, ModelAnimationSet, SpawnCollector, SpawnDatabase,
};
use crate::status::StatusSink;

const SCRIPT_PRELUDE: &str = "-- converted field script\n";
const SCRIPT_EPILOGUE: &str = "-- end of field script\n";

const MAP_LIST_ENTRY: &str = "maplist";
const MAP_NAME_LEN: usize = 16;

const KERNEL_TABLES: [&str; 12] = [
    "commands",
    "attacks",
    "characters",
    "items",
    "growth",
    "weapons",
    "armors",
    "accessories",
    "materia",
    "key_items",
    "summon_names",
    "initial_save",
];

/// The strict linear sequence the run moves through. Multi-substep phases
/// track their position in a `StepCursor`; skippable phases stay in the
/// table so the weights never change shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Idle,
    CreateDirectories,
    ReadKernel,
    WriteKernelTables,
    ScanFields,
    ConvertFields,
    WriteFieldIndex,
    ExportModels,
    ExtractSounds,
    ExtractMusic,
    Finalize,
    Done,
}

impl InstallPhase {
    /// Static weights, proportional to measured cost on retail data. The
    /// audio phases dwarf the metadata writes on purpose.
    pub fn weight(self) -> u32 {
        match self {
            InstallPhase::Idle | InstallPhase::Done => 0,
            InstallPhase::CreateDirectories => 1,
            InstallPhase::ReadKernel => 2,
            InstallPhase::WriteKernelTables => 4,
            InstallPhase::ScanFields => 10,
            InstallPhase::ConvertFields => 20,
            InstallPhase::WriteFieldIndex => 1,
            InstallPhase::ExportModels => 8,
            InstallPhase::ExtractSounds => 30,
            InstallPhase::ExtractMusic => 20,
            InstallPhase::Finalize => 1,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            InstallPhase::Idle => "waiting to start",
            InstallPhase::CreateDirectories => "create output directories",
            InstallPhase::ReadKernel => "read game data tables",
            InstallPhase::WriteKernelTables => "write game data tables",
            InstallPhase::ScanFields => "scan field maps",
            InstallPhase::ConvertFields => "convert field maps",
            InstallPhase::WriteFieldIndex => "write field index",
            InstallPhase::ExportModels => "export field models",
            InstallPhase::ExtractSounds => "extract sounds",
            InstallPhase::ExtractMusic => "extract music",
            InstallPhase::Finalize => "finalize installation",
            InstallPhase::Done => "done",
        }
    }

    pub fn total_weight() -> u32 {
        ALL_PHASES.iter().map(|phase| phase.weight()).sum()
    }
}

const ALL_PHASES: [InstallPhase; 12] = [
    InstallPhase::Idle,
    InstallPhase::CreateDirectories,
    InstallPhase::ReadKernel,
    InstallPhase::WriteKernelTables,
    InstallPhase::ScanFields,
    InstallPhase::ConvertFields,
    InstallPhase::WriteFieldIndex,
    InstallPhase::ExportModels,
    InstallPhase::ExtractSounds,
    InstallPhase::ExtractMusic,
    InstallPhase::Finalize,
    InstallPhase::Done,
];

fn successor(phase: InstallPhase) -> InstallPhase {
    match phase {
        InstallPhase::Idle => InstallPhase::CreateDirectories,
        InstallPhase::CreateDirectories => InstallPhase::ReadKernel,
        InstallPhase::ReadKernel => InstallPhase::WriteKernelTables,
        InstallPhase::WriteKernelTables => InstallPhase::ScanFields,
        InstallPhase::ScanFields => InstallPhase::ConvertFields,
        InstallPhase::ConvertFields => InstallPhase::WriteFieldIndex,
        InstallPhase::WriteFieldIndex => InstallPhase::ExportModels,
        InstallPhase::ExportModels => InstallPhase::ExtractSounds,
        InstallPhase::ExtractSounds => InstallPhase::ExtractMusic,
        InstallPhase::ExtractMusic => InstallPhase::Finalize,
        InstallPhase::Finalize | InstallPhase::Done => InstallPhase::Done,
    }
}

fn phase_skipped(phase: InstallPhase, options: &InstallOptions) -> bool {
    match phase {
        InstallPhase::ReadKernel | InstallPhase::WriteKernelTables => options.skip_kernel,
        InstallPhase::ExportModels => options.skip_models,
        InstallPhase::ExtractSounds => options.skip_sounds,
        InstallPhase::ExtractMusic => options.skip_music,
        _ => false,
    }
}

/// Pure successor resolution: the next phase that will actually run.
pub fn next_phase(phase: InstallPhase, options: &InstallOptions) -> InstallPhase {
    let mut next = successor(phase);
    while next != InstallPhase::Done && phase_skipped(next, options) {
        next = successor(next);
    }
    next
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub skip_kernel: bool,
    pub skip_models: bool,
    pub skip_sounds: bool,
    pub skip_music: bool,
}

#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub output_root: PathBuf,
    pub options: InstallOptions,
    pub report_path: Option<PathBuf>,
}

/// Cooperative cancellation, checked between substeps. Clone it out of the
/// installer and trip it from wherever the run needs to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Step-driven conversion pipeline. The caller polls `advance()`: each call
/// does one bounded unit of work (one map, one record table, one archive
/// entry) and reports overall progress, so a UI thread can drive the whole
/// run without ever blocking.
pub struct Installer {
    source: Box<dyn ArchiveSource>,
    decompiler: Box<dyn ScriptDecompiler>,
    exporter: Box<dyn AssetExporter>,
    namer: Box<dyn AssetNamer>,
    sink: Box<dyn StatusSink>,
    charset: Charset,
    layout: GameLayout,
    config: InstallerConfig,
    cancel: CancelFlag,

    phase: InstallPhase,
    cursor: StepCursor,
    progress: ProgressEstimator,

    map_list: Vec<String>,
    kernel: Option<KernelData>,
    collector: SpawnCollector,
    spawns: Option<SpawnDatabase>,
    animations: ModelAnimationCollector,
    animation_set: ModelAnimationSet,
    model_names: Vec<String>,
    sound_entries: Vec<String>,
    music_entries: Vec<String>,
    skipped_fields: BTreeSet<usize>,
    converted_fields: BTreeSet<usize>,
    report: ConversionReport,
}

impl Installer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn ArchiveSource>,
        decompiler: Box<dyn ScriptDecompiler>,
        exporter: Box<dyn AssetExporter>,
        namer: Box<dyn AssetNamer>,
        sink: Box<dyn StatusSink>,
        charset: Charset,
        layout: GameLayout,
        config: InstallerConfig,
    ) -> Self {
        Installer {
            source,
            decompiler,
            exporter,
            namer,
            sink,
            charset,
            layout,
            config,
            cancel: CancelFlag::default(),
            phase: InstallPhase::Idle,
            cursor: StepCursor::new(1),
            progress: ProgressEstimator::new(InstallPhase::total_weight()),
            map_list: Vec::new(),
            kernel: None,
            collector: SpawnCollector::new(),
            spawns: None,
            animations: ModelAnimationCollector::new(),
            animation_set: ModelAnimationSet::default(),
            model_names: Vec::new(),
            sound_entries: Vec::new(),
            music_entries: Vec::new(),
            skipped_fields: BTreeSet::new(),
            converted_fields: BTreeSet::new(),
            report: ConversionReport::default(),
        }
    }

    pub fn phase(&self) -> InstallPhase {
        self.phase
    }

    pub fn report(&self) -> &ConversionReport {
        &self.report
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// One call, one bounded unit of work, one progress value in [0, 100].
    /// Once the terminal state is reached, further calls keep returning 100.
    pub fn advance(&mut self) -> Result<f64, InstallError> {
        if self.phase == InstallPhase::Done {
            return Ok(100.0);
        }
        if self.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        match self.phase {
            InstallPhase::Idle => {
                self.sink.info("starting installation");
                self.transition()?;
            }
            InstallPhase::CreateDirectories => {
                self.create_directories()?;
                self.complete_phase()?;
            }
            InstallPhase::ReadKernel => {
                self.read_kernel()?;
                self.complete_phase()?;
            }
            InstallPhase::WriteKernelTables => {
                let index = self.cursor.index;
                self.write_kernel_table(index)?;
                self.step()?;
            }
            InstallPhase::ScanFields => {
                let index = self.cursor.index;
                self.scan_field(index);
                self.step()?;
            }
            InstallPhase::ConvertFields => {
                let index = self.cursor.index;
                self.convert_field(index);
                self.step()?;
            }
            InstallPhase::WriteFieldIndex => {
                self.write_field_index()?;
                self.complete_phase()?;
            }
            InstallPhase::ExportModels => {
                let index = self.cursor.index;
                self.export_model(index);
                self.step()?;
            }
            InstallPhase::ExtractSounds => {
                let index = self.cursor.index;
                self.extract_entry(EntryGroup::Sounds, index);
                self.step()?;
            }
            InstallPhase::ExtractMusic => {
                let index = self.cursor.index;
                self.extract_entry(EntryGroup::Music, index);
                self.step()?;
            }
            InstallPhase::Finalize => {
                self.finalize()?;
                self.complete_phase()?;
            }
            InstallPhase::Done => {}
        }

        if self.phase == InstallPhase::Done {
            Ok(self.progress.finish())
        } else {
            Ok(self.progress.report(self.phase.weight(), &self.cursor))
        }
    }

    fn step(&mut self) -> Result<(), InstallError> {
        if self.cursor.advance() {
            self.complete_phase()?;
        }
        Ok(())
    }

    fn complete_phase(&mut self) -> Result<(), InstallError> {
        self.progress.phase_complete(self.phase.weight());
        self.transition()
    }

    fn transition(&mut self) -> Result<(), InstallError> {
        loop {
            let mut next = successor(self.phase);
            while next != InstallPhase::Done && phase_skipped(next, &self.config.options) {
                self.sink.info(&format!("skipping: {}", next.describe()));
                self.progress.phase_complete(next.weight());
                next = successor(next);
            }
            self.phase = next;
            if next == InstallPhase::Done {
                self.cursor = StepCursor::new(0);
                return Ok(());
            }
            // Keep the cursor sane even if preparation fails and the
            // caller polls again regardless.
            self.cursor = StepCursor::new(0);
            let total = self.prepare_phase(next)?;
            self.cursor = StepCursor::new(total);
            if total > 0 {
                self.sink.info(next.describe());
                return Ok(());
            }
            self.sink
                .info(&format!("{}: nothing to do", next.describe()));
            self.progress.phase_complete(next.weight());
        }
    }

    /// Phase entry hook: stage whatever the phase iterates over and return
    /// its substep count. This is also where pass-1 accumulators freeze
    /// into their read-only snapshots, so no later step can write to them.
    fn prepare_phase(&mut self, phase: InstallPhase) -> Result<usize, InstallError> {
        match phase {
            InstallPhase::CreateDirectories
            | InstallPhase::ReadKernel
            | InstallPhase::WriteFieldIndex
            | InstallPhase::Finalize => Ok(1),
            InstallPhase::WriteKernelTables => Ok(KERNEL_TABLES.len()),
            InstallPhase::ScanFields => {
                self.load_map_list()?;
                Ok(self.map_list.len())
            }
            InstallPhase::ConvertFields => {
                let collector = std::mem::take(&mut self.collector);
                self.spawns = Some(collector.finish());
                Ok(self.map_list.len())
            }
            InstallPhase::ExportModels => {
                let collector = std::mem::take(&mut self.animations);
                self.animation_set = collector.finish();
                self.model_names = self.animation_set.models().map(String::from).collect();
                Ok(self.model_names.len())
            }
            InstallPhase::ExtractSounds => {
                self.sound_entries = self.source.list_entries(EntryGroup::Sounds)?;
                Ok(self.sound_entries.len())
            }
            InstallPhase::ExtractMusic => {
                self.music_entries = self.source.list_entries(EntryGroup::Music)?;
                Ok(self.music_entries.len())
            }
            InstallPhase::Idle | InstallPhase::Done => Ok(0),
        }
    }

    fn warn(&mut self, message: &str) {
        self.report.warnings += 1;
        self.sink.warning(message);
    }

    fn fail_map(&mut self, message: &str) {
        self.report.warnings += 1;
        self.sink.error(message);
    }

    fn create_directories(&mut self) -> Result<(), InstallError> {
        for sub in ["", "fields", "kernel", "models", "sounds", "music"] {
            let path = self.config.output_root.join(sub);
            fs::create_dir_all(&path).map_err(|source| InstallError::DirectoryCreation {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn read_kernel(&mut self) -> Result<(), InstallError> {
        let raw = self
            .source
            .open(EntryGroup::Kernel, "KERNEL.BIN")
            .context("opening the game-data blob")?;
        let archive = KernelArchive::parse(&raw)?;
        let mut data = RecordTableReader::new(&archive, &self.charset, &self.layout).read_all()?;
        let warnings = std::mem::take(&mut data.warnings);
        for warning in &warnings {
            self.warn(warning);
        }
        self.kernel = Some(data);
        Ok(())
    }

    fn write_kernel_table(&mut self, index: usize) -> Result<(), InstallError> {
        let table = KERNEL_TABLES[index];
        let data = self
            .kernel
            .as_ref()
            .ok_or_else(|| anyhow!("kernel tables requested before the blob was read"))?;
        let records = match table {
            "commands" => output::command_records(&data.commands),
            "attacks" => output::attack_records(&data.attacks),
            "characters" => output::character_records(&data.characters),
            "items" => output::item_records(&data.items),
            "growth" => output::growth_records(&data.growth_curves),
            "weapons" => output::weapon_records(&data.weapons),
            "armors" => output::armor_records(&data.armors),
            "accessories" => output::accessory_records(&data.accessories),
            "materia" => output::materia_records(&data.materias),
            "key_items" => output::key_item_records(&data.key_items),
            "summon_names" => output::summon_name_records(&data.summon_names),
            "initial_save" => output::savemap_records(&data.initial_save),
            other => return Err(anyhow!("unknown kernel table {other}").into()),
        };
        let count = records.len();
        let path = self
            .config
            .output_root
            .join("kernel")
            .join(format!("{table}.dat"));
        output::write_records(&path, &records)?;
        self.report.record_table(table, count);
        Ok(())
    }

    fn load_map_list(&mut self) -> Result<(), InstallError> {
        let raw = self
            .source
            .open(EntryGroup::Fields, MAP_LIST_ENTRY)
            .context("the field archive must carry a map list")?;
        let mut cursor = BinaryCursor::new(&raw);
        let count = cursor.read_u16_le()? as usize;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let bytes = cursor.read_bytes(MAP_NAME_LEN)?;
            let nul = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            names.push(String::from_utf8_lossy(&bytes[..nul]).trim_end().to_string());
        }
        self.map_list = names;
        Ok(())
    }

    fn scan_field(&mut self, index: usize) {
        let Some(name) = self.map_list.get(index).cloned() else {
            return;
        };
        if name.is_empty() {
            self.skipped_fields.insert(index);
            return;
        }
        if self.layout.is_debug_field(&name) {
            self.sink.info(&format!("skipping debug map {name}"));
            self.report.skipped(&name, "debug map");
            self.skipped_fields.insert(index);
            return;
        }
        if let Err(err) = self.scan_field_inner(index, &name) {
            self.warn(&format!("scan of {name} failed, map dropped: {err:#}"));
            self.report.skipped(&name, format!("scan failed: {err}"));
            self.skipped_fields.insert(index);
        }
    }

    fn scan_field_inner(&mut self, index: usize, name: &str) -> anyhow::Result<()> {
        let compressed = self.source.open(EntryGroup::Fields, name)?;
        let data = lzs::decompress(&compressed)?;
        let file = FieldFile::parse(&data)?;
        let script_section = file.section(FieldSectionId::Script)?;
        let header = ScriptHeader::parse(script_section)?;
        self.collector.set_scale(index as u16, header.scale_factor());

        let triggers = field::parse_triggers(file.section(FieldSectionId::Triggers)?)?;
        for (gateway_index, gateway) in triggers.gateways.iter().enumerate() {
            if gateway.is_active() {
                self.collector
                    .record_gateway(index as u16, name, gateway_index, gateway);
            }
        }

        // Output-suppressed decompiler pass: only the map jumps matter here.
        match self.decompiler.scan_map_jumps(name, script_section) {
            Ok(events) => {
                for event in &events {
                    self.collector.record_map_jump(index as u16, name, event);
                }
            }
            Err(err) => {
                self.warn(&format!("map-jump scan failed on {name}: {err:#}"));
            }
        }
        Ok(())
    }

    fn convert_field(&mut self, index: usize) {
        if self.skipped_fields.contains(&index) {
            return;
        }
        let Some(name) = self.map_list.get(index).cloned() else {
            return;
        };
        match self.convert_field_inner(index, &name) {
            Ok(()) => {
                self.converted_fields.insert(index);
                self.report.converted(&name);
            }
            Err(InstallError::MissingCrossReference {
                what,
                field_id,
                needed_by,
            }) => {
                self.fail_map(&format!(
                    "no {what} for field {field_id}, skipping {needed_by}"
                ));
                self.report.skipped(&name, format!("missing {what}"));
            }
            Err(err) => {
                self.fail_map(&format!("conversion of {name} failed: {err:#}"));
                self.report.skipped(&name, format!("conversion failed: {err}"));
            }
        }
    }

    fn convert_field_inner(&mut self, index: usize, name: &str) -> Result<(), InstallError> {
        let field_id = index as u16;
        let compressed = self.source.open(EntryGroup::Fields, name)?;
        let data = lzs::decompress(&compressed)?;
        let file = FieldFile::parse(&data)?;
        let script_section = file.section(FieldSectionId::Script)?;
        let header = ScriptHeader::parse(script_section)?;
        let walkmesh = field::parse_walkmesh(file.section(FieldSectionId::Walkmesh)?)?;

        let mut resolved = {
            let database = self
                .spawns
                .as_ref()
                .ok_or_else(|| anyhow!("spawn database queried before pass 1 finished"))?;
            let scale =
                database
                    .scale(field_id)
                    .ok_or_else(|| InstallError::MissingCrossReference {
                        what: "scale factor",
                        field_id,
                        needed_by: name.to_string(),
                    })?;
            resolve_arrivals(database, field_id, scale, &walkmesh)
        };
        for warning in std::mem::take(&mut resolved.warnings) {
            self.warn(&warning);
        }
        self.report.spawn_points += resolved.spawns.len();

        match field::parse_model_loader(file.section(FieldSectionId::ModelLoader)?) {
            Ok(models) => {
                for model in &models {
                    self.animations.record(&model.file_name, &model.animations);
                }
            }
            Err(err) => self.warn(&format!("model loader unreadable on {name}: {err:#}")),
        }

        let triggers = field::parse_triggers(file.section(FieldSectionId::Triggers)?)?;
        let trigger_refs: Vec<TriggerRef> = triggers
            .gateways
            .iter()
            .enumerate()
            .filter(|(_, gateway)| gateway.is_active())
            .map(|(gateway_index, gateway)| TriggerRef {
                index: gateway_index,
                destination: self
                    .map_list
                    .get(gateway.destination_field as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("field_{}", gateway.destination_field)),
                exit_line: gateway.exit_line,
            })
            .collect();

        let fields_dir = self.config.output_root.join("fields");

        // Script and dialog; a decompiler failure costs this map its script
        // output, never its geometry.
        let mut script_reference = None;
        let mut dialog = Vec::new();
        match self.decompiler.decompile(
            name,
            script_section,
            self.namer.as_ref(),
            SCRIPT_PRELUDE,
            SCRIPT_EPILOGUE,
        ) {
            Ok(decompiled) => {
                let script_name = format!("{name}.script");
                fs::write(fields_dir.join(&script_name), &decompiled.source)
                    .with_context(|| format!("writing script for {name}"))?;
                script_reference = Some(script_name);
                dialog = self.decode_dialog(name, script_section, &header, &decompiled.text_ids);
            }
            Err(err) => {
                self.fail_map(&format!(
                    "decompiler failed on {name}: {err:#}; emitting geometry only"
                ));
            }
        }

        let background_reference = match file.section(FieldSectionId::Background) {
            Ok(bytes) => {
                let background_name = format!("{name}_bg.atlas");
                match self
                    .exporter
                    .export_background(name, bytes, &fields_dir.join(&background_name))
                {
                    Ok(()) => Some(background_name),
                    Err(err) => {
                        self.warn(&format!("background export failed on {name}: {err:#}"));
                        None
                    }
                }
            }
            Err(err) => {
                self.warn(&format!("background section unreadable on {name}: {err:#}"));
                None
            }
        };

        let rotation = resolved
            .spawns
            .iter()
            .find(|spawn| Some((spawn.x, spawn.y, spawn.z)) == resolved.default_entry)
            .map(|spawn| spawn.rotation)
            .unwrap_or(0.0);

        let walkmesh_name = format!("{name}.walkmesh");
        output::write_records(
            &fields_dir.join(&walkmesh_name),
            &output::walkmesh_records(&walkmesh),
        )?;

        let markup = MapMarkup {
            name: name.to_string(),
            field_id,
            script: script_reference,
            background: background_reference,
            walkmesh: Some(walkmesh_name),
            rotation,
            default_entry: resolved.default_entry,
            spawns: resolved.spawns,
            triggers: trigger_refs,
            music: header.sound_banks.clone(),
            dialog,
        };
        output::write_records(
            &fields_dir.join(format!("{name}.map")),
            &output::map_markup_records(&markup),
        )?;
        Ok(())
    }

    fn decode_dialog(
        &mut self,
        name: &str,
        script_section: &[u8],
        header: &ScriptHeader,
        text_ids: &[u8],
    ) -> Vec<(u8, String)> {
        let offsets = match field::text_offsets(script_section, header.text_table_offset) {
            Ok(offsets) => offsets,
            Err(err) => {
                self.warn(&format!("dialog table unreadable on {name}: {err:#}"));
                return Vec::new();
            }
        };
        let mut dialog = Vec::new();
        for id in text_ids {
            let Some(offset) = offsets.get(*id as usize) else {
                self.warn(&format!("dialog {id} referenced but not present on {name}"));
                continue;
            };
            match text::decode_string(&self.charset, script_section, *offset) {
                Ok(decoded) => {
                    for byte in &decoded.unknown {
                        self.warn(&format!("unknown glyph {byte:#04x} in dialog {id} of {name}"));
                    }
                    dialog.push((*id, decoded.text));
                }
                Err(err) => {
                    self.warn(&format!("dialog {id} undecodable on {name}: {err:#}"));
                }
            }
        }
        dialog
    }

    fn write_field_index(&mut self) -> Result<(), InstallError> {
        let entries: Vec<MapIndexEntry> = self
            .map_list
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| MapIndexEntry {
                id: index as u16,
                name: name.clone(),
                converted: self.converted_fields.contains(&index),
                crash_prone: self.layout.is_crash_prone_field(name),
            })
            .collect();
        output::write_records(
            &self.config.output_root.join("fields.index"),
            &output::field_index_records(&entries),
        )?;
        Ok(())
    }

    fn export_model(&mut self, index: usize) {
        let Some(model) = self.model_names.get(index).cloned() else {
            return;
        };
        let animations = self.animation_set.animations(&model);
        let models_dir = self.config.output_root.join("models");
        if let Err(err) =
            self.exporter
                .export_model(&model, &animations, &models_dir.join(format!("{model}.mesh")))
        {
            self.warn(&format!("model export failed for {model}: {err:#}"));
            return;
        }
        let manifest = output::DeclRecord::new(format!("model_{}", model.replace('.', "_")))
            .field("file", output::DeclValue::str(format!("{model}.mesh")))
            .field(
                "animations",
                output::DeclValue::List(
                    animations
                        .iter()
                        .map(|animation| output::DeclValue::str(animation))
                        .collect(),
                ),
            );
        if let Err(err) = output::write_records(
            &models_dir.join(format!("{model}.manifest")),
            &[manifest],
        ) {
            self.warn(&format!("manifest write failed for {model}: {err:#}"));
            return;
        }
        self.report.models_exported += 1;
    }

    fn extract_entry(&mut self, group: EntryGroup, index: usize) {
        let (entry, dir) = match group {
            EntryGroup::Sounds => (self.sound_entries.get(index).cloned(), "sounds"),
            EntryGroup::Music => (self.music_entries.get(index).cloned(), "music"),
            _ => return,
        };
        let Some(entry) = entry else {
            return;
        };
        match self.source.open(group, &entry) {
            Ok(bytes) => {
                let dest = self.config.output_root.join(dir).join(&entry);
                match fs::write(&dest, bytes) {
                    Ok(()) => match group {
                        EntryGroup::Sounds => self.report.sounds_extracted += 1,
                        EntryGroup::Music => self.report.music_extracted += 1,
                        _ => {}
                    },
                    Err(err) => self.warn(&format!("writing {} failed: {err}", dest.display())),
                }
            }
            Err(err) => self.warn(&format!("extracting {entry} failed: {err:#}")),
        }
    }

    fn finalize(&mut self) -> Result<(), InstallError> {
        if let Some(path) = self.config.report_path.clone() {
            self.report.write_json(&path)?;
        }
        self.sink.info("installation complete");
        Ok(())
    }
}
