pub mod flags;
pub mod kernel_tables;
pub mod names;
pub mod records;

pub use kernel_tables::{GameLayout, KernelData, RecordTableReader, TableCounts};
pub use names::NameTable;
