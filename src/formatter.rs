//! Output of detection results for humans and machines

use crate::group::EntryGroup;
use lazy_static::lazy_static;
use regex::Regex;
use std::io;

lazy_static! {
    static ref SPACE_RE: Regex = Regex::new(r"[ \t]+").expect("hardcoded regex");
    static ref EOL_RE: Regex = Regex::new(r"[\r\n]+").expect("hardcoded regex");
}

/// Renders groups as an indented plain-text report.
#[derive(Debug, Default, Clone)]
pub struct PrintFormatter;

impl PrintFormatter {
    pub fn run<W: io::Write>(&self, groups: &[EntryGroup], out: &mut W) -> io::Result<()> {
        for (i, group) in groups.iter().enumerate() {
            let path = group
                .paths
                .first()
                .map(|p| p.path.join(" > "))
                .unwrap_or_default();
            writeln!(
                out,
                "\nGroup {} ({} items) {:.6}, {:.6}\n{}",
                i + 1,
                group.entries.len(),
                group.score,
                group.cbg_score,
                path
            )?;
            for entry in &group.entries {
                let title = SPACE_RE.replace_all(&entry.title, " ");
                let title = EOL_RE.replace_all(&title, "\n");
                writeln!(out, "  {} : {:.2}\n    {}", title, entry.score as f64, entry.url)?;
            }
        }
        Ok(())
    }
}

/// Renders groups as pretty-printed JSON.
#[cfg(feature = "serde_serialization")]
#[derive(Debug, Default, Clone)]
pub struct JsonFormatter;

#[cfg(feature = "serde_serialization")]
impl JsonFormatter {
    pub fn run<W: io::Write>(&self, groups: &[EntryGroup], out: &mut W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, groups)?;
        writeln!(out)
    }
}
