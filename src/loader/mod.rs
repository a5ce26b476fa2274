//! Dataset loader.
//!
//! Parses line-oriented postal code records into an in-memory index.
//! Loading is all-or-nothing: the first malformed line aborts the load
//! and no partial index is handed back.

mod config;

pub use config::{ColumnLayout, LoaderConfig};

use csv::{ByteRecord, ReaderBuilder};
use flate2::read::GzDecoder;
use hashbrown::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, ZipcodesError};
use crate::models::ZipCodeLocation;

/// Zip code -> record. Built once per load, read-only afterwards.
pub type ZipIndex = HashMap<String, ZipCodeLocation>;

/// Open `path` and load it with the default layout.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<ZipIndex> {
    load_from_path_with_config(path, &LoaderConfig::default())
}

/// Open `path` and load it. Files ending in `.gz` are decompressed on the fly.
pub fn load_from_path_with_config<P: AsRef<Path>>(
    path: P,
    config: &LoaderConfig,
) -> Result<ZipIndex> {
    let path = path.as_ref();
    info!("Loading zip code dataset from {}", path.display());

    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    load_from_stream_with_config(reader, config)
}

/// Load from a source that may be absent. `None` is reported as misuse
/// before any parsing happens.
pub fn load_from_source<R: Read>(source: Option<R>) -> Result<ZipIndex> {
    load_from_source_with_config(source, &LoaderConfig::default())
}

pub fn load_from_source_with_config<R: Read>(
    source: Option<R>,
    config: &LoaderConfig,
) -> Result<ZipIndex> {
    match source {
        Some(reader) => load_from_stream_with_config(reader, config),
        None => Err(ZipcodesError::NilSource),
    }
}

/// Load from an already open stream. Pass `&mut reader` to keep ownership;
/// the stream is never closed here.
pub fn load_from_stream<R: Read>(reader: R) -> Result<ZipIndex> {
    load_from_stream_with_config(reader, &LoaderConfig::default())
}

pub fn load_from_stream_with_config<R: Read>(
    reader: R,
    config: &LoaderConfig,
) -> Result<ZipIndex> {
    config.validate()?;

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(config.delimiter_byte())
        .from_reader(reader);

    let mut index = ZipIndex::new();
    let mut duplicates = 0usize;
    let mut record = ByteRecord::new();

    while csv_reader.read_byte_record(&mut record)? {
        // Whitespace-only lines, including delimiter-only ones, count as blank.
        if record
            .iter()
            .all(|field| field.iter().all(u8::is_ascii_whitespace))
        {
            continue;
        }

        let line = record.position().map_or(0, |p| p.line());
        let location = parse_record(&record, line, config)?;

        if let Some(previous) = index.insert(location.zip_code.clone(), location) {
            debug!(
                "Duplicate zip code {} on line {}, replacing earlier record",
                previous.zip_code, line
            );
            duplicates += 1;
        }
    }

    info!(
        "Loaded {} zip codes ({} duplicates replaced)",
        index.len(),
        duplicates
    );
    Ok(index)
}

fn parse_record(
    record: &ByteRecord,
    line: u64,
    config: &LoaderConfig,
) -> Result<ZipCodeLocation> {
    if record.len() != config.expected_fields {
        return Err(ZipcodesError::MalformedLine {
            line,
            expected: config.expected_fields,
            actual: record.len(),
        });
    }

    // Field count is checked above and validate() keeps columns in range.
    // Only retained columns are decoded; discarded ones may hold any bytes.
    let columns = &config.columns;
    let field = |column: usize| decode_field(record, line, column);

    let raw_lat = field(columns.latitude)?;
    let lat: f64 = raw_lat.parse().map_err(|_| ZipcodesError::LatitudeParse {
        raw: raw_lat.to_string(),
    })?;
    let raw_lon = field(columns.longitude)?;
    let lon: f64 = raw_lon.parse().map_err(|_| ZipcodesError::LongitudeParse {
        raw: raw_lon.to_string(),
    })?;

    Ok(ZipCodeLocation {
        zip_code: field(columns.zip_code)?.to_string(),
        place_name: field(columns.place_name)?.to_string(),
        admin_name: field(columns.admin_name)?.to_string(),
        admin_code: field(columns.admin_code)?.to_string(),
        lat,
        lon,
    })
}

fn decode_field(record: &ByteRecord, line: u64, column: usize) -> Result<&str> {
    std::str::from_utf8(&record[column]).map_err(|_| ZipcodesError::Encoding { line, column })
}
