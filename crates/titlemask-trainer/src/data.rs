//! Title dataset readers.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Layout of a title dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// Two-column `id,title` CSV without a header row.
    Csv,
    /// One title per line.
    Lines,
}

impl DatasetFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Lines,
        }
    }
}

/// Reads the title column of an `id,title` CSV. Rows without exactly two
/// columns are skipped.
pub fn read_csv_titles<R: Read>(reader: R) -> anyhow::Result<Vec<String>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut titles = Vec::new();
    let mut skipped = 0usize;
    for record in csv.records() {
        let record = record.context("failed to read dataset row")?;
        match (record.len(), record.get(1)) {
            (2, Some(title)) => titles.push(title.to_string()),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "malformed dataset rows skipped");
    }
    Ok(titles)
}

/// Reads one title per line, ignoring blank lines.
pub fn read_line_titles<R: BufRead>(reader: R) -> anyhow::Result<Vec<String>> {
    let mut titles = Vec::new();
    for line in reader.lines() {
        let line = line.context("failed to read dataset line")?;
        let title = line.trim();
        if !title.is_empty() {
            titles.push(title.to_string());
        }
    }
    Ok(titles)
}

/// Loads every title of the dataset at `path`.
pub fn load_titles<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let titles = match DatasetFormat::from_path(path) {
        DatasetFormat::Csv => read_csv_titles(file)?,
        DatasetFormat::Lines => read_line_titles(BufReader::new(file))?,
    };
    debug!(file = %path.display(), titles = titles.len(), "dataset loaded");
    Ok(titles)
}
