//! Aircraft type → wake category classification.
//!
//! Deterministic lookup: the designator is trimmed and upper-cased, then
//! matched by substring against the heavy, medium and light keyword tables
//! in that order. Registration overrides take precedence over the tables.
//! Unknown designators yield `UnknownAircraftType`; the caller decides
//! whether to downgrade to a configured default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::models::{FlightRecord, WakeCategory};

const HEAVY_KEYWORDS: &[&str] = &[
    "380", "388", // A380
    "777", "77F", "77L", "77W", // B777
    "747", "74F", "748", // B747
    "787", "788", "789", // B787
    "330", "33F", "332", "333", "338", "339", // A330
    "340", "343", "346", // A340
    "350", "359", "35K", // A350
    "MD1", // MD-11
    "IL9", // IL-96
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "320", "32A", "32B", "32N", "32S", // A320 family
    "321", "32Q", "20N", "21N", "19N", // A321, neo family
    "319", "31F", // A319
    "737", "738", "739", "73G", "73H", "7M8", "38M", // B737
    "757", "75F", // B757
    "767", "76F", // B767
    "E90", "E75", "E19", // E-Jets
    "CRJ", "CR9", // CRJ
    "ARJ", "C909", "C919", "919", // COMAC
];

const LIGHT_KEYWORDS: &[&str] = &[
    "AT4", "AT5", "AT7", "AT9", "ATR", // ATR
    "DH8", "DHC", // Dash 8
    "E45", "E14", "J41", "SF3", // regional turboprops / small jets
    "MA6", // MA60
    "C25", "C56", "C68", "C208", "PC12", "BE2", // business / GA
];

/// Wake category classifier.
#[derive(Debug, Clone, Default)]
pub struct AircraftClassifier {
    registration_overrides: HashMap<String, WakeCategory>,
}

impl AircraftClassifier {
    /// Creates a classifier using the built-in tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins a registration to a category (takes precedence over the type).
    pub fn with_registration_override(
        mut self,
        registration: impl AsRef<str>,
        wake: WakeCategory,
    ) -> Self {
        self.registration_overrides
            .insert(normalize(registration.as_ref()), wake);
        self
    }

    /// Classifies a type designator.
    ///
    /// Returns `None` if the designator matches no table.
    pub fn lookup(&self, designator: &str) -> Option<WakeCategory> {
        let designator = normalize(designator);
        if designator.is_empty() {
            return None;
        }
        let tables = [
            (WakeCategory::Heavy, HEAVY_KEYWORDS),
            (WakeCategory::Medium, MEDIUM_KEYWORDS),
            (WakeCategory::Light, LIGHT_KEYWORDS),
        ];
        tables
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| designator.contains(k)))
            .map(|(wake, _)| *wake)
    }

    /// Classifies a flight by registration override, then by type.
    pub fn classify(
        &self,
        flight_id: &str,
        designator: &str,
        registration: Option<&str>,
    ) -> Result<WakeCategory> {
        if let Some(wake) = registration
            .map(normalize)
            .and_then(|reg| self.registration_overrides.get(&reg).copied())
        {
            return Ok(wake);
        }
        self.lookup(designator)
            .ok_or_else(|| SimError::UnknownAircraftType {
                flight_id: flight_id.to_string(),
                designator: designator.to_string(),
            })
    }

    /// Whether the registration has an override.
    pub fn has_override(&self, registration: &str) -> bool {
        self.registration_overrides
            .contains_key(&normalize(registration))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Count and share of one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    /// Number of flights.
    pub count: usize,
    /// Share of all flights (percent).
    pub percentage: f64,
}

/// Fleet-mix summary of a classified flight set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Total flights.
    pub total: usize,
    /// Heavy share.
    pub heavy: CategoryShare,
    /// Medium share.
    pub medium: CategoryShare,
    /// Light share.
    pub light: CategoryShare,
    /// Flights without a category.
    pub unclassified: usize,
    /// Most frequent designators per category, most frequent first.
    pub top_types: HashMap<WakeCategory, Vec<(String, usize)>>,
}

impl ClassificationReport {
    /// Number of designators listed per category.
    const TOP_N: usize = 5;

    /// Summarizes the fleet mix.
    pub fn from_records(records: &[FlightRecord]) -> Self {
        let total = records.len();
        let share = |wake: WakeCategory| {
            let count = records.iter().filter(|r| r.wake == Some(wake)).count();
            let percentage = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            CategoryShare { count, percentage }
        };

        let mut top_types = HashMap::new();
        for wake in WakeCategory::ALL {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for r in records.iter().filter(|r| r.wake == Some(wake)) {
                *counts.entry(r.aircraft_type.as_str()).or_insert(0) += 1;
            }
            let mut ranked: Vec<(String, usize)> = counts
                .into_iter()
                .map(|(t, c)| (t.to_string(), c))
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(Self::TOP_N);
            top_types.insert(wake, ranked);
        }

        Self {
            total,
            heavy: share(WakeCategory::Heavy),
            medium: share(WakeCategory::Medium),
            light: share(WakeCategory::Light),
            unclassified: records.iter().filter(|r| r.wake.is_none()).count(),
            top_types,
        }
    }

    /// Heavy share within the typical hub range (5–25 %).
    pub fn heavy_ratio_plausible(&self) -> bool {
        (5.0..=25.0).contains(&self.heavy.percentage)
    }

    /// Medium share within the typical hub range (40–85 %).
    pub fn medium_ratio_plausible(&self) -> bool {
        (40.0..=85.0).contains(&self.medium.percentage)
    }

    /// All plausibility checks pass.
    pub fn is_plausible(&self) -> bool {
        self.heavy_ratio_plausible() && self.medium_ratio_plausible() && self.unclassified == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    #[test]
    fn test_table_lookup() {
        let c = AircraftClassifier::new();
        assert_eq!(c.lookup("B77W"), Some(WakeCategory::Heavy));
        assert_eq!(c.lookup("a333"), Some(WakeCategory::Heavy));
        assert_eq!(c.lookup(" B738 "), Some(WakeCategory::Medium));
        assert_eq!(c.lookup("A320"), Some(WakeCategory::Medium));
        assert_eq!(c.lookup("AT76"), Some(WakeCategory::Light));
        assert_eq!(c.lookup("ZZZ"), None);
        assert_eq!(c.lookup(""), None);
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let c = AircraftClassifier::new();
        let err = c.classify("CZ3101", "XYZ", None).unwrap_err();
        assert_eq!(
            err,
            SimError::UnknownAircraftType {
                flight_id: "CZ3101".into(),
                designator: "XYZ".into(),
            }
        );
    }

    #[test]
    fn test_registration_override_wins() {
        let c = AircraftClassifier::new().with_registration_override("b-1234", WakeCategory::Heavy);
        assert!(c.has_override("B-1234"));
        assert_eq!(
            c.classify("CZ1", "B738", Some("B-1234")).unwrap(),
            WakeCategory::Heavy
        );
        assert_eq!(
            c.classify("CZ2", "B738", Some("B-9999")).unwrap(),
            WakeCategory::Medium
        );
        assert_eq!(c.classify("CZ3", "", Some("B-1234")).unwrap(), WakeCategory::Heavy);
    }

    #[test]
    fn test_classification_report() {
        let mut records = Vec::new();
        for i in 0..2 {
            records.push(
                FlightRecord::new(format!("H{i}"), Direction::Departure, 0, 0)
                    .with_aircraft_type("A333")
                    .with_wake(WakeCategory::Heavy),
            );
        }
        for i in 0..7 {
            records.push(
                FlightRecord::new(format!("M{i}"), Direction::Departure, 0, 0)
                    .with_aircraft_type(if i < 5 { "B738" } else { "A320" })
                    .with_wake(WakeCategory::Medium),
            );
        }
        records.push(FlightRecord::new("L0", Direction::Arrival, 0, 0).with_wake(WakeCategory::Light));

        let report = ClassificationReport::from_records(&records);
        assert_eq!(report.total, 10);
        assert_eq!(report.heavy.count, 2);
        assert!((report.medium.percentage - 70.0).abs() < 1e-10);
        assert_eq!(report.top_types[&WakeCategory::Medium][0], ("B738".to_string(), 5));
        assert!(report.is_plausible());
    }

    #[test]
    fn test_empty_report() {
        let report = ClassificationReport::from_records(&[]);
        assert_eq!(report.total, 0);
        assert!(!report.heavy_ratio_plausible());
    }
}
