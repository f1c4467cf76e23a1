use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use fs_err as fs;
use mfh_harvester::{Dataset, DatasetSink};

use crate::writer::{write_records, CsvWriterConfig};

/// Per-run directory holding one CSV artifact per query.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    path: PathBuf,
    csv: CsvWriterConfig,
}

impl ArtifactDir {
    /// Creates `harvest-<start time>` under `root`.
    pub fn create(
        root: impl AsRef<Path>,
        started: DateTime<Local>,
        csv: CsvWriterConfig,
    ) -> anyhow::Result<Self> {
        let path = root
            .as_ref()
            .join(format!("harvest-{}", started.format("%Y%m%dT%H%M%S")));
        fs::create_dir_all(&path)?;
        Ok(Self { path, csv })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn artifact_path(&self, position: usize, name: &str) -> PathBuf {
        self.path.join(format!("{position:04}-{}.csv", slug(name)))
    }

    /// Artifacts currently in the directory, in query order.
    pub fn artifacts(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = vec![];
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "csv") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn remove(self) -> anyhow::Result<()> {
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}

impl DatasetSink for ArtifactDir {
    fn write(&self, dataset: &Dataset) -> anyhow::Result<PathBuf> {
        let path = self.artifact_path(dataset.query.position, &dataset.query.name);
        let file = fs::File::create(&path)?;
        write_records(&self.csv, file, dataset.records())?;
        Ok(path)
    }
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-');
    if out.is_empty() {
        String::from("query")
    } else {
        out.to_string()
    }
}
