//! Catalog lookup and torrent cross-reference.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use titlemask_core::{Engine, Normalizer, ParsedTitle};
use tracing::{debug, info};

/// Matches between two progress lines.
const PROGRESS_INTERVAL: usize = 100;

/// Known series keyed by clean title.
#[derive(Debug, Default)]
pub struct Catalog {
    shows: HashMap<String, String>,
}

impl Catalog {
    /// Reads an `imdb_id,title` CSV without header. Later rows win on
    /// duplicate clean titles; malformed rows are skipped.
    pub fn from_reader<R: Read>(reader: R, normalizer: &Normalizer) -> Result<Self> {
        let mut shows = HashMap::new();
        for row in rows(reader) {
            let (imdb_id, title) = row?;
            shows.insert(normalizer.clean(&title), imdb_id);
        }
        Ok(Self { shows })
    }

    pub fn load<P: AsRef<Path>>(path: P, normalizer: &Normalizer) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let catalog = Self::from_reader(file, normalizer)?;
        debug!(file = %path.display(), shows = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Catalog id of a clean series name.
    pub fn get(&self, series_name: &str) -> Option<&str> {
        self.shows.get(series_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }
}

/// Two-column rows of a header-less CSV. Rows with another column count
/// are skipped.
pub fn rows<R: Read>(reader: R) -> impl Iterator<Item = Result<(String, String)>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .into_records()
        .filter_map(|record| match record {
            Ok(record) if record.len() == 2 => Some(Ok((record[0].to_string(), record[1].to_string()))),
            Ok(_) => None,
            Err(e) => Some(Err(anyhow::Error::new(e).context("failed to read csv row"))),
        })
}

/// One classified torrent found in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    pub torrent_id: String,
    pub imdb_id: String,
    pub parsed: ParsedTitle,
}

impl CatalogMatch {
    /// Captured fields plus `torrent_id` and `imdb_id` as a flat object.
    pub fn to_json(&self) -> Value {
        let mut object: Map<String, Value> = self
            .parsed
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        object.insert("torrent_id".into(), Value::String(self.torrent_id.clone()));
        object.insert("imdb_id".into(), Value::String(self.imdb_id.clone()));
        Value::Object(object)
    }
}

/// Counters of a cross-reference run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Rows classified, excluding ids already resolved.
    pub classified: usize,
    /// Rows written to the output.
    pub found: usize,
}

/// Streams torrents through the engine and keeps those whose series is in
/// the catalog.
pub struct CrossReference<'a> {
    engine: &'a mut Engine,
    catalog: &'a Catalog,
    limit: usize,
    resolved: HashSet<String>,
}

impl<'a> CrossReference<'a> {
    pub fn new(engine: &'a mut Engine, catalog: &'a Catalog) -> Self {
        Self {
            engine,
            catalog,
            limit: 1000,
            resolved: HashSet::new(),
        }
    }

    /// Stop after `limit` matches; 0 means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Classifies one torrent. Ids are compared upper-cased and an id is
    /// resolved at most once.
    pub fn check(&mut self, torrent_id: &str, title: &str) -> Result<Option<CatalogMatch>> {
        let torrent_id = torrent_id.to_uppercase();
        if self.resolved.contains(&torrent_id) {
            return Ok(None);
        }

        let Some(parsed) = self.engine.parse_title(title)? else {
            return Ok(None);
        };
        let Some(imdb_id) = parsed.series_name().and_then(|name| self.catalog.get(name)) else {
            return Ok(None);
        };

        let imdb_id = imdb_id.to_string();
        self.resolved.insert(torrent_id.clone());
        Ok(Some(CatalogMatch {
            torrent_id,
            imdb_id,
            parsed,
        }))
    }

    /// Writes one JSON line per match to `out`.
    pub fn run<R: Read, W: Write>(&mut self, torrents: R, mut out: W) -> Result<Summary> {
        let mut summary = Summary::default();

        for row in rows(torrents) {
            let (torrent_id, title) = row?;
            if self.resolved.contains(&torrent_id.to_uppercase()) {
                continue;
            }
            summary.classified += 1;

            let Some(found) = self.check(&torrent_id, &title)? else {
                continue;
            };
            serde_json::to_writer(&mut out, &found.to_json())?;
            out.write_all(b"\n")?;
            summary.found += 1;

            if summary.found % PROGRESS_INTERVAL == 0 {
                info!(found = summary.found, "catalog torrents found");
            }
            if self.limit > 0 && summary.found >= self.limit {
                break;
            }
        }

        out.flush()?;
        Ok(summary)
    }
}
