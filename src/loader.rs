use crate::error::Result;
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Header row and data rows exactly as read, before any renaming.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

pub struct DatasetLoader {
    index_column: Regex,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self {
            // A written-out dataframe index: blank header or "Unnamed: 0".
            index_column: Regex::new(r"^\s*(Unnamed: \d+)?\s*$").expect("static pattern"),
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<RawTable> {
        debug!(path = %path.display(), "reading dataset");
        let file = File::open(path)?;
        self.load_reader(file)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<RawTable> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = mangle_duplicate_headers(reader.headers()?.iter());
        let drop_index = headers
            .first()
            .map(|first| self.index_column.is_match(first))
            .unwrap_or(false);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let record = if drop_index {
                record.iter().skip(1).collect::<StringRecord>()
            } else {
                record
            };
            rows.push(record);
        }

        let headers = if drop_index {
            debug!(column = %headers[0], "dropping index column");
            headers.into_iter().skip(1).collect()
        } else {
            headers
        };

        debug!(columns = headers.len(), rows = rows.len(), "dataset read");
        Ok(RawTable { headers, rows })
    }
}

/// Repeated headers get a numeric suffix: `Dosen, Dosen` becomes
/// `Dosen, Dosen.1`.
fn mangle_duplicate_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let headers: Vec<&str> = headers.collect();
    let mut used: HashSet<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let count = occurrences.entry(header).or_insert(0);
        if *count == 0 {
            result.push(header.to_string());
        } else {
            let mut suffix = *count;
            let mut candidate = format!("{}.{}", header, suffix);
            while used.contains(&candidate) {
                suffix += 1;
                candidate = format!("{}.{}", header, suffix);
            }
            used.insert(candidate.clone());
            result.push(candidate);
        }
        *count += 1;
    }

    result
}
