//! Jsonmend - JSONL record store
//!
//! Memory-mapped access to dataset files with pre-computed line offsets,
//! plus the buffered writer every pipeline phase persists through.

use anyhow::{Context, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One training example: a malformed JSON document paired with its repaired
/// form and the teacher model's description of the repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub invalid_json: String,
    pub fixed_json: String,
    #[serde(default)]
    pub fixed_reason: String,
}

/// Dataset file backed by a memory map.
///
/// Opening scans once for newlines so any line is O(1) afterwards.
pub struct Corpus {
    mmap: Mmap,
    line_offsets: Vec<usize>,
    pub path: String,
    pub size: u64,
}

impl Corpus {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .with_context(|| format!("Failed to open dataset: {}", path_ref.display()))?;

        let metadata = file.metadata()?;
        let size = metadata.len();

        let mmap = unsafe { Mmap::map(&file)? };

        let mut line_offsets = vec![0];
        for (i, &byte) in mmap.iter().enumerate() {
            if byte == b'\n' && i + 1 < mmap.len() {
                line_offsets.push(i + 1);
            }
        }

        Ok(Self {
            mmap,
            line_offsets,
            path: path_ref.display().to_string(),
            size,
        })
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Get a specific line by index (0-indexed), without its newline.
    pub fn get_line(&self, index: usize) -> Option<&str> {
        if index >= self.line_offsets.len() {
            return None;
        }

        let data: &[u8] = self.mmap.as_ref();
        let start = self.line_offsets[index];
        let end = if index + 1 < self.line_offsets.len() {
            self.line_offsets[index + 1] - 1
        } else {
            data.len()
        };

        let end = end.min(data.len());
        if start >= end {
            return Some("");
        }

        std::str::from_utf8(&data[start..end]).ok()
    }

    /// Parse every non-empty line as an [`Example`].
    pub fn examples(&self) -> Result<Vec<Example>> {
        let mut examples = Vec::with_capacity(self.line_count());
        for i in 0..self.line_count() {
            let Some(line) = self.get_line(i) else {
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            let example: Example = serde_json::from_str(line)
                .with_context(|| format!("{}: invalid record on line {}", self.path, i + 1))?;
            examples.push(example);
        }
        Ok(examples)
    }

    /// Formatted file size string.
    pub fn size_human(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size >= GB {
            format!("{:.2} GB", self.size as f64 / GB as f64)
        } else if self.size >= MB {
            format!("{:.2} MB", self.size as f64 / MB as f64)
        } else if self.size >= KB {
            format!("{:.2} KB", self.size as f64 / KB as f64)
        } else {
            format!("{} B", self.size)
        }
    }
}

/// Write records as compact line-delimited JSON, replacing `path`.
pub fn write_jsonl<P: AsRef<Path>, T: Serialize>(path: P, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(writer, "{}", line)?;
    }

    writer.flush()?;
    Ok(())
}
