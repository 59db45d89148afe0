use std::path::PathBuf;

use clap::Parser;

use mako_installer::driver::InstallOptions;

#[derive(Parser, Debug)]
#[command(
    about = "Convert a legacy field game's packed assets into engine-ready data",
    version
)]
pub struct Args {
    /// Legacy install directory (flevel.lgp + KERNEL.BIN), or a
    /// pre-extracted tree with fields/, kernel/, sounds/, music/
    #[arg(long, default_value = "game-data")]
    pub input: PathBuf,

    /// Destination directory for the converted assets
    #[arg(long, default_value = "converted")]
    pub output: PathBuf,

    /// Leave the game-data tables unconverted
    #[arg(long)]
    pub skip_kernel: bool,

    /// Leave field models unexported
    #[arg(long)]
    pub skip_models: bool,

    /// Leave sound effects unextracted
    #[arg(long)]
    pub skip_sounds: bool,

    /// Leave music tracks unextracted
    #[arg(long)]
    pub skip_music: bool,

    /// Optional path to write a JSON conversion report
    #[arg(long)]
    pub json_report: Option<PathBuf>,
}

impl Args {
    pub fn options(&self) -> InstallOptions {
        InstallOptions {
            skip_kernel: self.skip_kernel,
            skip_models: self.skip_models,
            skip_sounds: self.skip_sounds,
            skip_music: self.skip_music,
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
