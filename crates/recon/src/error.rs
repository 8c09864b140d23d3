use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (no chains, duplicate chain, empty table name, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A source file, folder or sheet could not be read.
    #[error("cannot read {}: {message}", path.display())]
    SourceRead { path: PathBuf, message: String },
    /// Header row (or master table columns) did not match the expected layout.
    #[error(
        "{source_name}: expected columns [{}], found [{}]",
        expected.join(", "),
        found.join(", ")
    )]
    SchemaMismatch {
        source_name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// Date cell that is neither a serial, a date cell nor a recognised date string.
    #[error("{source_name}, row {row}: cannot parse date '{value}'")]
    DateParse {
        source_name: String,
        row: usize,
        value: String,
    },
    /// Units or amount cell that is not numeric.
    #[error("{source_name}, row {row}, column '{column}': cannot parse number '{value}'")]
    NumberParse {
        source_name: String,
        row: usize,
        column: String,
        value: String,
    },
    /// Master data store could not be opened or queried.
    #[error("master data error: {0}")]
    MasterData(String),
    /// A dimension table contains the same key twice at join time; joining
    /// would multiply sales rows.
    #[error("{dimension} dimension has duplicate key '{key}'")]
    DuplicateDimensionKey { dimension: &'static str, key: String },
    /// Distribution group whose units sum to zero.
    #[error("chain '{chain}', line '{line}': total units are zero")]
    ZeroVolumeGroup { chain: String, line: String },
    /// Writing the sales table failed; the destination state is unspecified.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ReconError {
    pub fn source_read(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
