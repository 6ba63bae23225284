//! Atlas label names
//!
//! A label file has one `index;name` entry per line, for example
//! `17;Left-Hippocampus`. Each label of an indexed atlas becomes its own
//! mesh file, named `<stem><name>.k<index><ext>` when the label has a name
//! and `<stem><index><ext>` otherwise.

use std::path::{Path, PathBuf};
use tracing::debug;
use voxmesh_core::Result;

/// Per-label name fragments for labels `0..=max_label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasLabels {
    names: Vec<String>,
}

impl AtlasLabels {
    /// Labels named by their index only.
    pub fn numbered(max_label: usize) -> Self {
        Self {
            names: (0..=max_label).map(|i| i.to_string()).collect(),
        }
    }

    /// Parse `index;name` lines. Lines with an index outside
    /// `0..=max_label`, an unparsable index or no name are skipped.
    pub fn parse(text: &str, max_label: usize) -> Self {
        let mut labels = Self::numbered(max_label);
        let mut named = 0;
        for line in text.lines() {
            let mut fields = line.split(';');
            let index = match fields.next().map(str::trim).map(str::parse::<i64>) {
                Some(Ok(index)) => index,
                _ => continue,
            };
            if index < 0 || index as u64 > max_label as u64 {
                continue;
            }
            let name = match fields.next().map(str::trim) {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            let name: String = name
                .chars()
                .map(|ch| if ch == '/' || ch == '\\' { '_' } else { ch })
                .collect();
            labels.names[index as usize] = format!("{}.k{}", name, index);
            named += 1;
        }
        debug!(named, max_label, "parsed atlas label names");
        labels
    }

    /// Read and parse a label file.
    pub fn from_file<P: AsRef<Path>>(path: P, max_label: usize) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text, max_label))
    }

    pub fn max_label(&self) -> usize {
        self.names.len().saturating_sub(1)
    }

    /// Name fragment of `label`, `None` when out of range.
    pub fn name(&self, label: usize) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    /// Output file for `label`, derived from the requested output path.
    pub fn output_path(&self, output: &Path, label: usize) -> Option<PathBuf> {
        let name = self.name(label)?;
        let (stem, ext) = split_extension(output);
        Some(PathBuf::from(format!("{}{}{}", stem, name, ext)))
    }
}

/// Split `path` into everything before its last extension and the
/// extension including the dot. `out/mesh.gii` gives `("out/mesh", ".gii")`.
pub fn split_extension(path: &Path) -> (String, String) {
    let full = path.to_string_lossy().into_owned();
    match path.extension() {
        Some(ext) => {
            let ext = format!(".{}", ext.to_string_lossy());
            let stem = full[..full.len() - ext.len()].to_string();
            (stem, ext)
        }
        None => (full, String::new()),
    }
}
