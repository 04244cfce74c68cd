//! Output modes for the stdout result.
//!
//! Text mode echoes input lines, one per line, so the output can be piped
//! straight into a delete command. JSON mode writes one pretty document with
//! every decision instead.

use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Filtered input lines.
    Text,
    /// A single JSON report.
    Json,
}

impl OutputMode {
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Write each line's bytes followed by a newline.
pub fn render_lines<'a>(
    w: &mut dyn Write,
    lines: impl IntoIterator<Item = &'a [u8]>,
) -> io::Result<()> {
    for line in lines {
        w.write_all(line)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Write a value as pretty JSON followed by a newline.
pub fn render_json<T: Serialize>(w: &mut dyn Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)
}
