use serde::{Deserialize, Serialize};

/// One postal code entry as kept in the index.
///
/// Only the columns needed for lookups and distance queries are retained;
/// the remaining dataset columns are validated for count and discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipCodeLocation {
    pub zip_code: String,
    pub place_name: String,
    /// Region / state name
    pub admin_name: String,
    /// Short region code (e.g. "HH"); empty when the dataset has none
    #[serde(default)]
    pub admin_code: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl ZipCodeLocation {
    pub fn new(
        zip_code: impl Into<String>,
        place_name: impl Into<String>,
        admin_name: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            zip_code: zip_code.into(),
            place_name: place_name.into(),
            admin_name: admin_name.into(),
            admin_code: String::new(),
            lat,
            lon,
        }
    }

    pub fn with_admin_code(mut self, admin_code: impl Into<String>) -> Self {
        self.admin_code = admin_code.into();
        self
    }

    /// Case-insensitive match on the place name and on either the region
    /// name or the region code
    pub fn matches_city_state(&self, place_name: &str, admin: &str) -> bool {
        if self.place_name.to_lowercase() != place_name.to_lowercase() {
            return false;
        }
        let admin = admin.to_lowercase();
        self.admin_name.to_lowercase() == admin
            || (!self.admin_code.is_empty() && self.admin_code.to_lowercase() == admin)
    }
}
