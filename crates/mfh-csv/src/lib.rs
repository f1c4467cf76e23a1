mod artifact;
mod merge;
mod writer;

pub use artifact::ArtifactDir;
pub use merge::{find_artifacts, Combined, MergeReducer, MergeSummary};
pub use writer::{write_records, CsvTerminator, CsvWriterConfig};

pub use anyhow;
