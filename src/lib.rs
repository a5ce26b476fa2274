//! Zipcodes - an in-memory postal code index with geospatial queries
//!
//! This library loads a flat-file postal code dataset once and answers exact,
//! city/region and distance/radius queries over it.

pub mod error;
pub mod loader;
pub mod models;
pub mod query;

pub use error::{Result, ZipcodesError};
pub use loader::{load_from_path, load_from_source, load_from_stream, LoaderConfig, ZipIndex};
pub use models::ZipCodeLocation;
pub use query::{
    distance_between_points, DistanceUnit, Zipcodes, EARTH_RADIUS_KM, EARTH_RADIUS_MI,
};
