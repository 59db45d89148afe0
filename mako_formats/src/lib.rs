pub mod cursor;
pub mod field;
pub mod kernel;
pub mod lgp;
pub mod lzs;
pub mod text;

pub use cursor::{BinaryCursor, CursorError};
pub use kernel::{KernelArchive, KernelSection, SectionId};
pub use lgp::{LgpArchive, LgpEntry};
pub use text::{Charset, DecodedString, TextError};
