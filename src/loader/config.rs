use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ZipcodesError;

/// Positions of the retained columns within a dataset line.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnLayout {
    pub zip_code: usize,
    pub place_name: usize,
    pub admin_name: usize,
    pub admin_code: usize,
    pub latitude: usize,
    pub longitude: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            zip_code: 0,
            place_name: 1,
            admin_name: 3,
            admin_code: 4,
            latitude: 9,
            longitude: 10,
        }
    }
}

impl ColumnLayout {
    /// Layout of the raw GeoNames postal code dump, which leads with the country code.
    pub fn geonames() -> Self {
        Self {
            zip_code: 1,
            place_name: 2,
            admin_name: 3,
            admin_code: 4,
            latitude: 9,
            longitude: 10,
        }
    }

    fn max_position(&self) -> usize {
        [
            self.zip_code,
            self.place_name,
            self.admin_name,
            self.admin_code,
            self.latitude,
            self.longitude,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    pub delimiter: char,
    pub expected_fields: usize,
    pub columns: ColumnLayout,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: '\t',
            expected_fields: 12,
            columns: ColumnLayout::default(),
        }
    }
}

impl LoaderConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read loader config file")?;
        let config: LoaderConfig =
            toml::from_str(&content).context("Failed to parse loader config file")?;
        config.validate().context("Loader config is invalid")?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(ZipcodesError::InvalidConfig(format!(
                "delimiter {:?} is not a single ASCII character",
                self.delimiter
            )));
        }
        if self.expected_fields == 0 {
            return Err(ZipcodesError::InvalidConfig(
                "expected_fields must be at least 1".to_string(),
            ));
        }
        let max = self.columns.max_position();
        if max >= self.expected_fields {
            return Err(ZipcodesError::InvalidConfig(format!(
                "column {} is out of range for {} fields",
                max, self.expected_fields
            )));
        }
        Ok(())
    }

    /// Delimiter as the byte the record reader expects. Only valid after `validate`.
    pub(crate) fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}
