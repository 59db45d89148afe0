mod cli;

use anyhow::Result;
use mako_data::GameLayout;
use mako_formats::text::Charset;
use mako_installer::export::PassthroughExporter;
use mako_installer::script::{FriendlyNamer, OpcodeDecompiler};
use mako_installer::{
    ArchiveSource, DirSource, Installer, InstallerConfig, LgpSource, StderrSink,
};

fn main() -> Result<()> {
    let args = cli::parse();

    let source: Box<dyn ArchiveSource> = if args.input.join("flevel.lgp").is_file() {
        Box::new(LgpSource::open(&args.input)?)
    } else {
        Box::new(DirSource::new(&args.input)?)
    };

    let config = InstallerConfig {
        output_root: args.output.clone(),
        options: args.options(),
        report_path: args.json_report.clone(),
    };

    let mut installer = Installer::new(
        source,
        Box::new(OpcodeDecompiler),
        Box::new(PassthroughExporter),
        Box::new(FriendlyNamer),
        Box::new(StderrSink),
        Charset::international(),
        GameLayout::pc(),
        config,
    );

    // The CLI is its own polling loop; a GUI would call advance() from its
    // event loop instead and never block.
    let mut last_whole = -1i64;
    loop {
        let progress = installer.advance()?;
        let whole = progress.floor() as i64;
        if whole > last_whole {
            println!("{whole:>3}% {}", installer.phase().describe());
            last_whole = whole;
        }
        if progress >= 100.0 {
            break;
        }
    }

    let report = installer.report();
    println!(
        "converted {} map(s), skipped {}, {} warning(s); output in {}",
        report.maps_converted.len(),
        report.maps_skipped.len(),
        report.warnings,
        args.output.display()
    );
    Ok(())
}
