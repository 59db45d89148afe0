use std::env;
use std::fs;

use anyhow::{Context, Result};
use mako_formats::KernelArchive;

fn main() -> Result<()> {
    let path = env::args()
        .nth(1)
        .context("usage: kernel_dump <kernel blob>")?;
    let raw = fs::read(&path).with_context(|| format!("reading {path}"))?;
    let archive = KernelArchive::parse(&raw)?;
    println!("{} sections in {path}", archive.sections().len());
    for section in archive.sections() {
        println!(
            "section {id:>2}  raw {raw:>6} byte(s)",
            id = section.id,
            raw = section.raw_size
        );
    }
    Ok(())
}
