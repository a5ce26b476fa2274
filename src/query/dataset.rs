//! Query handle over a loaded zip code index.

use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::distance::{distance_between_points, DistanceUnit, EARTH_RADIUS_KM, EARTH_RADIUS_MI};
use crate::error::{Result, ZipcodesError};
use crate::loader::{self, LoaderConfig, ZipIndex};
use crate::models::ZipCodeLocation;

/// A loaded dataset. Immutable after construction, so it can be shared
/// across threads behind a plain reference or `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Zipcodes {
    index: ZipIndex,
    /// Zip codes in ascending order, fixed at construction
    order: Vec<String>,
}

impl Zipcodes {
    /// Load the dataset at `path` using the reference column layout
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_index(loader::load_from_path(path)?))
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: &LoaderConfig) -> Result<Self> {
        Ok(Self::from_index(loader::load_from_path_with_config(
            path, config,
        )?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_index(loader::load_from_stream(reader)?))
    }

    pub fn from_index(index: ZipIndex) -> Self {
        let mut order: Vec<String> = index.keys().cloned().collect();
        order.sort();
        Self { index, order }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All records, ordered by zip code
    pub fn iter(&self) -> impl Iterator<Item = &ZipCodeLocation> {
        self.order.iter().filter_map(|code| self.index.get(code))
    }

    pub fn lookup(&self, zip_code: &str) -> Result<&ZipCodeLocation> {
        self.index.get(zip_code).ok_or_else(|| {
            debug!("Zip code {} not found", zip_code);
            ZipcodesError::not_found(zip_code)
        })
    }

    /// Every record whose place name equals `place_name` and whose region
    /// name or region code equals `admin`, ignoring case. Ordered by zip
    /// code; empty when nothing matches.
    pub fn lookup_by_city_state(&self, place_name: &str, admin: &str) -> Vec<&ZipCodeLocation> {
        self.iter()
            .filter(|loc| loc.matches_city_state(place_name, admin))
            .collect()
    }

    /// Distance between two stored zip codes on a sphere of `radius`.
    /// `code_a` is resolved first, so it is the one named when both are missing.
    pub fn calculate_distance(&self, code_a: &str, code_b: &str, radius: f64) -> Result<f64> {
        let a = self.lookup(code_a)?;
        let b = self.lookup(code_b)?;
        Ok(distance_between_points(a.lat, a.lon, b.lat, b.lon, radius))
    }

    pub fn distance(&self, code_a: &str, code_b: &str, unit: DistanceUnit) -> Result<f64> {
        self.calculate_distance(code_a, code_b, unit.earth_radius())
    }

    pub fn distance_in_km(&self, code_a: &str, code_b: &str) -> Result<f64> {
        self.calculate_distance(code_a, code_b, EARTH_RADIUS_KM)
    }

    pub fn distance_in_miles(&self, code_a: &str, code_b: &str) -> Result<f64> {
        self.calculate_distance(code_a, code_b, EARTH_RADIUS_MI)
    }

    /// Distance from a stored zip code to an arbitrary point
    pub fn distance_to_point(
        &self,
        zip_code: &str,
        lat: f64,
        lon: f64,
        unit: DistanceUnit,
    ) -> Result<f64> {
        let loc = self.lookup(zip_code)?;
        Ok(distance_between_points(
            loc.lat,
            loc.lon,
            lat,
            lon,
            unit.earth_radius(),
        ))
    }

    pub fn distance_in_km_to_zipcode(&self, zip_code: &str, lat: f64, lon: f64) -> Result<f64> {
        self.distance_to_point(zip_code, lat, lon, DistanceUnit::Kilometers)
    }

    pub fn distance_in_mil_to_zipcode(&self, zip_code: &str, lat: f64, lon: f64) -> Result<f64> {
        self.distance_to_point(zip_code, lat, lon, DistanceUnit::Miles)
    }

    /// Linear scan for every other zip code within `max_radius` of `origin`.
    ///
    /// Distances are computed on a sphere of `earth_radius` and rounded before
    /// the comparison, so `max_radius` is in the same unit. The origin's own
    /// code is never included. Output is ordered by zip code.
    pub fn find_zipcodes_within_radius(
        &self,
        origin: &ZipCodeLocation,
        max_radius: f64,
        earth_radius: f64,
    ) -> Vec<String> {
        let found: Vec<String> = self
            .iter()
            .filter(|candidate| candidate.zip_code != origin.zip_code)
            .filter(|candidate| {
                distance_between_points(
                    origin.lat,
                    origin.lon,
                    candidate.lat,
                    candidate.lon,
                    earth_radius,
                ) <= max_radius
            })
            .map(|candidate| candidate.zip_code.clone())
            .collect();

        debug!(
            "Radius search around {} ({} on radius {}): {} matches",
            origin.zip_code,
            max_radius,
            earth_radius,
            found.len()
        );
        found
    }

    pub fn zipcodes_within_radius(
        &self,
        zip_code: &str,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<Vec<String>> {
        let origin = self.lookup(zip_code)?;
        Ok(self.find_zipcodes_within_radius(origin, radius, unit.earth_radius()))
    }

    pub fn get_zipcodes_within_km_radius(
        &self,
        zip_code: &str,
        radius: f64,
    ) -> Result<Vec<String>> {
        self.zipcodes_within_radius(zip_code, radius, DistanceUnit::Kilometers)
    }

    pub fn get_zipcodes_within_ml_radius(
        &self,
        zip_code: &str,
        radius: f64,
    ) -> Result<Vec<String>> {
        self.zipcodes_within_radius(zip_code, radius, DistanceUnit::Miles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn valid_dataset() -> Zipcodes {
        Zipcodes::new(format!(
            "{}/datasets/valid_dataset.txt",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap()
    }

    fn guteborn() -> ZipCodeLocation {
        ZipCodeLocation::new("01945", "Guteborn", "Brandenburg", 51.4167, 13.9333)
            .with_admin_code("BB")
    }

    #[test]
    fn test_new() {
        let zipcodes = valid_dataset();
        assert_eq!(zipcodes.len(), 8);
        assert!(!zipcodes.is_empty());
    }

    #[test]
    fn test_new_propagates_load_errors() {
        let err = Zipcodes::new(format!(
            "{}/datasets/wrong_lat_dataset.txt",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_lookup() {
        let zipcodes = valid_dataset();
        assert_eq!(zipcodes.lookup("01945").unwrap(), &guteborn());

        let err = zipcodes.lookup("XYZ").unwrap_err();
        assert_eq!(err.to_string(), "zipcodes: zipcode XYZ not found !");
        assert!(matches!(err, ZipcodesError::NotFound { ref zip_code } if zip_code == "XYZ"));
    }

    #[test]
    fn test_every_record_round_trips_from_source_line() {
        let zipcodes = valid_dataset();
        let raw = std::fs::read_to_string(format!(
            "{}/datasets/valid_dataset.txt",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap();

        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let fields: Vec<&str> = line.split('\t').collect();
            let loc = zipcodes.lookup(fields[0]).unwrap();
            assert_eq!(loc.place_name, fields[1]);
            assert_eq!(loc.admin_name, fields[3]);
            assert_eq!(loc.admin_code, fields[4]);
            assert_eq!(loc.lat, fields[9].parse::<f64>().unwrap());
            assert_eq!(loc.lon, fields[10].parse::<f64>().unwrap());
        }
    }

    #[test]
    fn test_calculate_distance() {
        let zipcodes = valid_dataset();
        let cases = [("01945", "03058", 49.87), ("20457", "22525", 7.43), ("19053", "87787", 643.03)];
        for (a, b, expected) in cases {
            assert_eq!(zipcodes.calculate_distance(a, b, EARTH_RADIUS_KM).unwrap(), expected);
            assert_eq!(zipcodes.distance_in_km(a, b).unwrap(), expected);
        }
    }

    #[test]
    fn test_calculate_distance_not_found() {
        let zipcodes = valid_dataset();
        let cases = [
            ("01945", "11111", "zipcodes: zipcode 11111 not found !"),
            ("00000", "22525", "zipcodes: zipcode 00000 not found !"),
            ("00000", "11111", "zipcodes: zipcode 00000 not found !"),
        ];
        for (a, b, expected) in cases {
            let err = zipcodes.calculate_distance(a, b, EARTH_RADIUS_KM).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_distance_in_miles() {
        let zipcodes = valid_dataset();
        let cases = [("01945", "03058", 30.98), ("20457", "22525", 4.62), ("19053", "87787", 399.48)];
        for (a, b, expected) in cases {
            assert_eq!(zipcodes.distance_in_miles(a, b).unwrap(), expected);
            assert_eq!(zipcodes.distance(a, b, DistanceUnit::Miles).unwrap(), expected);
        }
    }

    #[test]
    fn test_distance_to_zipcode() {
        let zipcodes = valid_dataset();
        for lat in [51.4267, 51.4067] {
            assert_eq!(zipcodes.distance_in_km_to_zipcode("01945", lat, 13.9333).unwrap(), 1.11);
            assert_eq!(zipcodes.distance_in_mil_to_zipcode("01945", lat, 13.9333).unwrap(), 0.69);
        }
        assert!(zipcodes.distance_in_km_to_zipcode("99999", 0.0, 0.0).is_err());
    }

    #[test]
    fn test_get_zipcodes_within_radius() {
        let zipcodes = valid_dataset();
        for radius in [50.0, 100.0] {
            assert_eq!(
                zipcodes.get_zipcodes_within_km_radius("01945", radius).unwrap(),
                vec!["03058".to_string()]
            );
            assert_eq!(
                zipcodes.get_zipcodes_within_ml_radius("01945", radius).unwrap(),
                vec!["03058".to_string()]
            );
        }
        assert!(zipcodes.get_zipcodes_within_km_radius("01945", 10.0).unwrap().is_empty());

        let err = zipcodes.get_zipcodes_within_ml_radius("11111", 10.0).unwrap_err();
        assert!(matches!(err, ZipcodesError::NotFound { .. }));
    }

    #[test]
    fn test_find_zipcodes_within_radius() {
        let zipcodes = valid_dataset();
        let found = zipcodes.find_zipcodes_within_radius(&guteborn(), 50.0, EARTH_RADIUS_KM);
        assert_eq!(found, vec!["03058".to_string()]);
    }

    #[test]
    fn test_radius_search_is_monotonic() {
        let zipcodes = valid_dataset();
        let origin = zipcodes.lookup("20457").unwrap();

        let expected: [(f64, &[&str]); 4] = [
            (1.0, &["20459"]),
            (5.0, &["20354", "20459"]),
            (10.0, &["20354", "20459", "22525"]),
            (100.0, &["19053", "20354", "20459", "22525"]),
        ];

        let mut previous: Vec<String> = Vec::new();
        for (radius, codes) in expected {
            let found = zipcodes.find_zipcodes_within_radius(origin, radius, EARTH_RADIUS_KM);
            assert_eq!(found, codes.iter().map(|c| c.to_string()).collect::<Vec<_>>());
            assert!(previous.iter().all(|code| found.contains(code)));
            previous = found;
        }
    }

    #[test]
    fn test_lookup_by_city_state() {
        let zipcodes = valid_dataset();

        for (place, admin) in [
            ("Hamburg Neustadt", "Hamburg"),
            ("hamburg neustadt", "hamburg"),
            ("HAMBURG NEUSTADT", "HaMbUrG"),
            ("Hamburg Neustadt", "HH"),
            ("hamburg neustadt", "hh"),
        ] {
            let found: Vec<&str> = zipcodes
                .lookup_by_city_state(place, admin)
                .iter()
                .map(|loc| loc.zip_code.as_str())
                .collect();
            assert_eq!(found, vec!["20354", "20459"]);
        }

        assert!(zipcodes.lookup_by_city_state("something", "hamburg").is_empty());
        assert!(zipcodes.lookup_by_city_state("hamburg neustadt", "something").is_empty());
        assert!(zipcodes.lookup_by_city_state("Hamburg Neu", "Hamburg").is_empty());
        assert!(zipcodes.lookup_by_city_state("something", "hh").is_empty());
        assert!(zipcodes.lookup_by_city_state("Hamburg Neustadt", "BB").is_empty());
    }

    #[test]
    fn test_iter_is_sorted() {
        let zipcodes = valid_dataset();
        let codes: Vec<&str> = zipcodes.iter().map(|loc| loc.zip_code.as_str()).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
        assert_eq!(codes.len(), 8);
    }

    #[test]
    fn test_from_index_orders_records() {
        let mut index = ZipIndex::new();
        let records = [
            ("22525", "Hamburg"),
            ("01945", "Guteborn"),
            ("19053", "Schwerin"),
        ];
        for (code, place) in records {
            index.insert(
                code.to_string(),
                ZipCodeLocation::new(code, place, "", 50.0, 10.0),
            );
        }

        let zipcodes = Zipcodes::from_index(index);
        let codes: Vec<&str> = zipcodes.iter().map(|loc| loc.zip_code.as_str()).collect();
        assert_eq!(codes, vec!["01945", "19053", "22525"]);
        let again: Vec<&str> = zipcodes.iter().map(|loc| loc.zip_code.as_str()).collect();
        assert_eq!(codes, again);
        assert!(Zipcodes::default().iter().next().is_none());
    }

    #[test]
    fn test_empty_dataset() {
        let zipcodes = Zipcodes::from_reader("   \n".as_bytes()).unwrap();
        assert!(zipcodes.is_empty());
        assert!(zipcodes.lookup("01945").is_err());
        assert!(zipcodes.lookup_by_city_state("Guteborn", "Brandenburg").is_empty());
        assert!(zipcodes
            .find_zipcodes_within_radius(&guteborn(), 1000.0, EARTH_RADIUS_KM)
            .is_empty());
    }

    #[test]
    fn test_concurrent_readers() {
        let zipcodes = Arc::new(valid_dataset());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let zipcodes = Arc::clone(&zipcodes);
                std::thread::spawn(move || zipcodes.distance_in_km("01945", "03058").unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 49.87);
        }
    }
}
