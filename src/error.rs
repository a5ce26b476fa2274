//! Error types for dataset loading and zip code queries.

use std::io;

use thiserror::Error;

/// Errors returned by the loader and the query engine.
///
/// Load-time variants abort the whole load. `NotFound` is the only
/// query-time failure and is safe to branch on.
#[derive(Error, Debug)]
pub enum ZipcodesError {
    /// The caller handed the loader no source at all
    #[error("zipcodes: unexpected nil reader")]
    NilSource,

    /// A non-empty line did not split into the expected number of fields
    #[error("zipcodes: file line does not have {expected} fields")]
    MalformedLine {
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("zipcodes: error while converting {raw} to Latitude")]
    LatitudeParse { raw: String },

    #[error("zipcodes: error while converting {raw} to Longitude")]
    LongitudeParse { raw: String },

    /// A retained column held bytes that are not valid UTF-8
    #[error("zipcodes: line {line} column {column} is not valid UTF-8")]
    Encoding { line: u64, column: usize },

    #[error("zipcodes: zipcode {zip_code} not found !")]
    NotFound { zip_code: String },

    #[error("zipcodes: I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record reader failure
    #[error("zipcodes: read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zipcodes: invalid loader config: {0}")]
    InvalidConfig(String),
}

impl ZipcodesError {
    pub fn not_found(zip_code: &str) -> Self {
        ZipcodesError::NotFound {
            zip_code: zip_code.to_string(),
        }
    }

    /// True for failures caused by the dataset contents rather than I/O or misuse
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ZipcodesError::MalformedLine { .. }
                | ZipcodesError::LatitudeParse { .. }
                | ZipcodesError::LongitudeParse { .. }
                | ZipcodesError::Encoding { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ZipcodesError>;
