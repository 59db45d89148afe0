pub mod driver;
pub mod error;
pub mod export;
pub mod output;
pub mod progress;
pub mod report;
pub mod script;
pub mod source;
pub mod spawn;
pub mod status;

pub use driver::{InstallOptions, InstallPhase, Installer, InstallerConfig};
pub use error::InstallError;
pub use source::{ArchiveSource, DirSource, EntryGroup, LgpSource};
pub use status::{MemorySink, StatusSink, StderrSink};
