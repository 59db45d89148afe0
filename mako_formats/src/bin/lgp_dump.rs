use std::env;

use anyhow::{Context, Result};
use mako_formats::LgpArchive;

fn main() -> Result<()> {
    let path = env::args().nth(1).context("usage: lgp_dump <LGP file>")?;
    let archive = LgpArchive::open(&path)?;
    println!(
        "{} entries in {}",
        archive.entries().len(),
        archive.path().display()
    );
    for entry in archive.entries() {
        let size = archive
            .entry_bytes(entry)
            .map(|bytes| bytes.len().to_string())
            .unwrap_or_else(|_| String::from("<bad>"));
        println!(
            "{name:<20} {offset:>10} {size:>10}",
            name = entry.name,
            offset = entry.offset,
            size = size
        );
    }
    Ok(())
}
