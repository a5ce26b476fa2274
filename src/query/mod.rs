//! Geo query engine.
//!
//! Exact and city/region lookups plus haversine distance and radius
//! queries over a loaded index. Nothing here mutates the index.

mod dataset;
mod distance;

pub use dataset::Zipcodes;
pub use distance::{
    distance_between_points, round_to_hundredths, DistanceUnit, EARTH_RADIUS_KM, EARTH_RADIUS_MI,
};
