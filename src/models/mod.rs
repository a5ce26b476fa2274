//! Core data models for the zip code index.

pub mod location;

pub use location::ZipCodeLocation;
