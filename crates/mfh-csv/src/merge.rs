use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fs_err as fs;
use mfh_harvester::NOT_AVAILABLE;

use crate::writer::CsvWriterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    /// Artifacts that contained a header
    pub artifacts: usize,
    /// Records read across all artifacts
    pub read: usize,
    /// Records in the combined artifact
    pub written: usize,
    pub duplicates: usize,
}

/// Deduplicated records, in the column order of the first artifact read.
#[derive(Debug, Clone, Default)]
pub struct Combined {
    pub schema: Option<csv::StringRecord>,
    pub records: Vec<csv::StringRecord>,
    pub summary: MergeSummary,
}

/// Concatenates per-query artifacts and drops listings already seen.
///
/// Two records are the same listing when their name and address match case-insensitively;
/// the first one read is kept.
#[derive(Debug, Clone)]
pub struct MergeReducer {
    csv: CsvWriterConfig,
    name_column: String,
    address_column: String,
}

impl Default for MergeReducer {
    fn default() -> Self {
        Self::new(CsvWriterConfig::default())
    }
}

impl MergeReducer {
    pub fn new(csv: CsvWriterConfig) -> Self {
        Self {
            csv,
            name_column: String::from("name"),
            address_column: String::from("address"),
        }
    }

    pub fn with_key_columns(mut self, name: &str, address: &str) -> Self {
        self.name_column = name.to_string();
        self.address_column = address.to_string();
        self
    }

    /// Reads `artifacts` in order and drops repeated listings.
    pub fn reduce<P>(&self, artifacts: &[P]) -> anyhow::Result<Combined>
    where
        P: AsRef<Path>,
    {
        let mut schema: Option<csv::StringRecord> = None;
        let mut seen = HashSet::new();
        let mut merged = vec![];
        let mut summary = MergeSummary::default();

        for path in artifacts {
            let path = path.as_ref();
            let mut rdr =
                csv::ReaderBuilder::from(&self.csv).from_reader(fs::File::open(path)?);
            let headers = rdr.headers()?.clone();
            if headers.is_empty() {
                log::debug!("Skipping empty artifact {}", path.display());
                continue;
            }
            summary.artifacts += 1;
            let schema = schema.get_or_insert_with(|| headers.clone());

            let column = |name: &str| headers.iter().position(|h| h == name);
            let name_at = column(&self.name_column);
            let address_at = column(&self.address_column);
            // Position in this artifact of every schema column
            let layout: Vec<Option<usize>> = schema.iter().map(column).collect();

            for record in rdr.records() {
                let record = record?;
                summary.read += 1;

                let field = |at: Option<usize>| at.and_then(|i| record.get(i)).unwrap_or("");
                let key = format!(
                    "{}-{}",
                    field(name_at).to_lowercase(),
                    field(address_at).to_lowercase()
                );
                if !seen.insert(key) {
                    summary.duplicates += 1;
                    continue;
                }

                let row: csv::StringRecord = layout
                    .iter()
                    .map(|at| at.and_then(|i| record.get(i)).unwrap_or(NOT_AVAILABLE))
                    .collect();
                merged.push(row);
            }
        }

        summary.written = merged.len();
        Ok(Combined {
            schema,
            records: merged,
            summary,
        })
    }

    /// Merges `artifacts` into `output`, which is left untouched when there is nothing to write.
    pub fn merge<P, Q>(&self, artifacts: &[P], output: Q) -> anyhow::Result<MergeSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let output = output.as_ref();
        let Combined {
            schema,
            records,
            summary,
        } = self.reduce(artifacts)?;

        let schema = match schema {
            Some(schema) if !records.is_empty() => schema,
            _ => {
                log::warn!("No records to merge, not writing {}", output.display());
                return Ok(summary);
            }
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::WriterBuilder::from(&self.csv).from_writer(fs::File::create(output)?);
        wtr.write_record(&schema)?;
        for record in &records {
            wtr.write_record(record)?;
        }
        wtr.flush()?;

        log::info!(
            "Merged {} records from {} artifacts into {} ({} duplicates dropped)",
            summary.written,
            summary.artifacts,
            output.display(),
            summary.duplicates
        );
        Ok(summary)
    }
}

/// CSV files matching `pattern`, sorted by path.
pub fn find_artifacts(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}
