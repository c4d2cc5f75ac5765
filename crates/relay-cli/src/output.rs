use std::io::{self, Write};

use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

/// Write a value as one compact JSON line on stdout.
pub fn print_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string(value)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{s}")?;
    Ok(())
}
